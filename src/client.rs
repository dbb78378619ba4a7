//! main client
//!
//! includes helpers for raw graphql execution, typed responses, and the
//! operation entry point used by generated clients.

use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::graphql::GraphQlResponse;
use crate::operation::OperationDef;
use crate::selection::FieldSelection;
use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::future::Future;
use std::sync::Arc;
use url::Url;

/// graphql client used directly or through a generated client
#[derive(Clone)]
pub struct Client {
    config: Arc<ClientConfig>,
    http: reqwest::Client,
}

impl Client {
    /// create a new client
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        // surface bad auth headers at construction, not on first request
        config.auth_headers()?;

        let http = match &config.http_client {
            Some(http) => http.clone(),
            None => {
                let mut builder = reqwest::Client::builder()
                    .default_headers(config.extra_headers.clone())
                    .user_agent(config.user_agent.clone())
                    .timeout(config.timeout)
                    .danger_accept_invalid_certs(!config.verify_ssl);
                if let Some(customize) = &config.http_client_builder {
                    builder = customize(builder);
                }
                builder.build()?
            }
        };

        Ok(Self {
            config: Arc::new(config),
            http,
        })
    }

    /// access the client configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// execute a raw graphql query
    pub async fn execute_raw(
        &self,
        query: &str,
        variables: Option<Value>,
    ) -> Result<GraphQlResponse<Value>> {
        self.execute_with(query, variables, |url, headers, body| {
            self.send(url, headers, body)
        })
        .await
    }

    /// execute a raw graphql query and deserialize into a typed response
    pub async fn execute<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: Option<Value>,
    ) -> Result<GraphQlResponse<T>> {
        self.execute_with(query, variables, |url, headers, body| {
            self.send(url, headers, body)
        })
        .await
    }

    /// execute a generated operation.
    ///
    /// the response value at the operation's path is checked against the
    /// selection plan before it is deserialized into `T`.
    pub async fn execute_operation<T: DeserializeOwned>(
        &self,
        operation: &OperationDef,
        variables: Map<String, Value>,
        selection: Option<&FieldSelection>,
        shape_json: &str,
    ) -> Result<T> {
        self.execute_operation_with(
            operation,
            variables,
            selection,
            shape_json,
            |url, headers, body| self.send(url, headers, body),
        )
        .await
    }

    async fn send(
        &self,
        url: Url,
        headers: HeaderMap,
        body: Value,
    ) -> Result<(StatusCode, String)> {
        let response = self
            .http
            .post(url)
            .headers(headers)
            .json(&body)
            .send()
            .await?;
        let status = response.status();
        let text = response.text().await?;
        Ok((status, text))
    }
}

fn parse_graphql_response<T: DeserializeOwned>(
    status: StatusCode,
    text: String,
) -> Result<GraphQlResponse<T>> {
    let parsed: GraphQlResponse<Value> = match serde_json::from_str(&text) {
        Ok(parsed) => parsed,
        Err(_) if !status.is_success() => return Err(http_error(status, text)),
        Err(err) => return Err(err.into()),
    };

    if let Some(message) = parsed.error_summary() {
        return Err(Error::GraphQl {
            status: Some(status.as_u16()),
            errors: parsed.errors,
            body: text,
            message,
        });
    }

    if !status.is_success() {
        return Err(http_error(status, text));
    }

    let data = parsed.data.map(serde_json::from_value).transpose()?;
    Ok(GraphQlResponse {
        data,
        errors: parsed.errors,
    })
}

fn http_error(status: StatusCode, body: String) -> Error {
    Error::GraphQl {
        status: Some(status.as_u16()),
        errors: Vec::new(),
        body,
        message: format!("graphql http error: {}", status),
    }
}

impl Client {
    pub(crate) async fn execute_with<T, F, Fut>(
        &self,
        query: &str,
        variables: Option<Value>,
        send: F,
    ) -> Result<GraphQlResponse<T>>
    where
        T: DeserializeOwned,
        F: FnOnce(Url, HeaderMap, Value) -> Fut,
        Fut: Future<Output = Result<(StatusCode, String)>>,
    {
        let url = self.config.graphql_url()?;
        let headers = self.config.auth_headers()?;
        let body = serde_json::json!({
            "query": query,
            "variables": variables.unwrap_or_else(|| serde_json::json!({})),
        });

        let (status, text) = send(url, headers, body).await?;
        parse_graphql_response(status, text)
    }

    pub(crate) async fn execute_operation_with<T, F, Fut>(
        &self,
        operation: &OperationDef,
        variables: Map<String, Value>,
        selection: Option<&FieldSelection>,
        shape_json: &str,
        send: F,
    ) -> Result<T>
    where
        T: DeserializeOwned,
        F: FnOnce(Url, HeaderMap, Value) -> Fut,
        Fut: Future<Output = Result<(StatusCode, String)>>,
    {
        let prepared = operation.prepare(selection, shape_json)?;
        tracing::debug!(
            operation = operation.name,
            kind = operation.kind.keyword(),
            "executing operation"
        );

        let response: GraphQlResponse<Value> = self
            .execute_with(&prepared.document, Some(Value::Object(variables)), send)
            .await?;
        let data = response.data_at(operation.response_path);
        prepared.plan.check(&data)?;
        Ok(serde_json::from_value(data)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::BearerAuth;
    use crate::operation::OperationKind;
    use serde::Deserialize;

    const SHAPE: &str = r#"{"types":{"Rule":{"kind":"object","fields":[{"name":"id","type":"ID","identifier":true},{"name":"port","type":"Int"}]}}}"#;

    const ADD_RULE: OperationDef = OperationDef {
        name: "addRule",
        kind: OperationKind::Mutation,
        response_path: &["firewall", "addRule"],
        return_type: "Rule",
        document_prefix: "mutation AddRule($port: Int!) { firewall { addRule(port: $port)",
        document_suffix: " } }",
        query_all: "{ id port }",
        query_minimal: "{ id }",
        plan_all: r#"{"root":{"node":"object","type":"Rule","fields":[{"name":"id"},{"name":"port"}]}}"#,
        plan_minimal: r#"{"root":{"node":"object","type":"Rule","fields":[{"name":"id"}]}}"#,
    };

    #[derive(Debug, Deserialize)]
    struct Rule {
        id: Option<String>,
        port: Option<i64>,
    }

    fn test_client(config: ClientConfig) -> Client {
        config.validate().unwrap();
        let http = reqwest::Client::builder()
            .no_proxy()
            .build()
            .expect("test http client");
        Client {
            config: Arc::new(config),
            http,
        }
    }

    #[cfg_attr(miri, ignore)]
    #[tokio::test]
    async fn test_execute_raw_sets_auth_and_url() {
        let config = ClientConfig::new("http://localhost:1234/graphql")
            .with_auth(BearerAuth::new("test-token"));
        let client = test_client(config);
        let response: GraphQlResponse<Value> = client
            .execute_with("query { ok }", None, |url, headers, body| async move {
                assert_eq!(url.path(), "/graphql");
                assert_eq!(headers.get("authorization").unwrap(), "Bearer test-token");
                assert_eq!(body["query"], "query { ok }");
                assert_eq!(body["variables"], serde_json::json!({}));
                Ok((StatusCode::OK, "{\"data\": {\"ok\": true}}".to_string()))
            })
            .await
            .unwrap();

        assert_eq!(response.data.unwrap()["ok"], true);
    }

    #[cfg_attr(miri, ignore)]
    #[tokio::test]
    async fn test_execute_graphql_error() {
        let client = test_client(ClientConfig::new("http://localhost:1234/graphql"));
        let err = client
            .execute_with::<Value, _, _>("query { ok }", None, |_url, _headers, _body| async move {
                Ok((
                    StatusCode::OK,
                    "{\"data\": null, \"errors\": [{\"message\": \"boom\"}, {\"message\": \"bang\"}]}"
                        .to_string(),
                ))
            })
            .await
            .unwrap_err();

        match err {
            Error::GraphQl {
                message, errors, ..
            } => {
                assert_eq!(message, "boom; bang");
                assert_eq!(errors.len(), 2);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[cfg_attr(miri, ignore)]
    #[tokio::test]
    async fn test_execute_typed_success() {
        #[derive(Debug, Deserialize)]
        struct Data {
            value: i64,
        }
        let client = test_client(ClientConfig::new("http://localhost:1234/graphql"));
        let response = client
            .execute_with::<Data, _, _>(
                "query { value }",
                None,
                |_url, _headers, _body| async move {
                    Ok((StatusCode::OK, "{\"data\": {\"value\": 7}}".to_string()))
                },
            )
            .await
            .unwrap();

        assert_eq!(response.data.unwrap().value, 7);
    }

    #[cfg_attr(miri, ignore)]
    #[tokio::test]
    async fn test_execute_operation_walks_response_path() {
        let client = test_client(ClientConfig::new("http://localhost:1234/graphql"));
        let mut variables = Map::new();
        variables.insert("port".to_string(), Value::from(443));

        let rule: Rule = client
            .execute_operation_with(
                &ADD_RULE,
                variables,
                Some(&FieldSelection::Minimal),
                SHAPE,
                |_url, _headers, body| async move {
                    assert_eq!(
                        body["query"],
                        "mutation AddRule($port: Int!) { firewall { addRule(port: $port) { id } } }"
                    );
                    assert_eq!(body["variables"]["port"], 443);
                    Ok((
                        StatusCode::OK,
                        "{\"data\": {\"firewall\": {\"addRule\": {\"id\": \"r1\"}}}}".to_string(),
                    ))
                },
            )
            .await
            .unwrap();

        assert_eq!(rule.id.as_deref(), Some("r1"));
        assert_eq!(rule.port, None);
    }

    #[cfg_attr(miri, ignore)]
    #[tokio::test]
    async fn test_execute_operation_rejects_shape_mismatch() {
        let client = test_client(ClientConfig::new("http://localhost:1234/graphql"));
        let err = client
            .execute_operation_with::<Rule, _, _>(
                &ADD_RULE,
                Map::new(),
                None,
                SHAPE,
                |_url, _headers, _body| async move {
                    Ok((
                        StatusCode::OK,
                        "{\"data\": {\"firewall\": {\"addRule\": {\"id\": \"r1\"}}}}".to_string(),
                    ))
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, Error::ResponseShape { .. }));
    }

    #[cfg_attr(miri, ignore)]
    #[tokio::test]
    async fn test_execute_operation_invalid_custom_path_sends_nothing() {
        let client = test_client(ClientConfig::new("http://localhost:1234/graphql"));
        let sent = std::cell::Cell::new(false);
        let err = client
            .execute_operation_with::<Rule, _, _>(
                &ADD_RULE,
                Map::new(),
                Some(&FieldSelection::custom(["protocol"])),
                SHAPE,
                |_url, _headers, _body| {
                    sent.set(true);
                    async move { Ok((StatusCode::OK, "{}".to_string())) }
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, Error::InvalidFieldPath { .. }));
        assert!(!sent.get());
    }

    #[test]
    fn test_invalid_auth_header() {
        let config = ClientConfig::new("http://localhost:1234/graphql")
            .with_auth(BearerAuth::new("bad\ntoken"));
        let err = Client::new(config).err().expect("expected error");
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_parse_graphql_response_success() {
        #[derive(Debug, Deserialize)]
        struct Data {
            value: i64,
        }

        let text = "{\"data\": {\"value\": 9}}".to_string();
        let parsed = parse_graphql_response::<Data>(StatusCode::OK, text).unwrap();
        assert_eq!(parsed.data.unwrap().value, 9);
    }

    #[test]
    fn test_parse_graphql_response_http_error() {
        let err =
            parse_graphql_response::<Value>(StatusCode::BAD_GATEWAY, "{\"data\": null}".to_string())
                .unwrap_err();
        assert!(matches!(err, Error::GraphQl { status: Some(502), .. }));

        let err = parse_graphql_response::<Value>(StatusCode::BAD_GATEWAY, "<html>".to_string())
            .unwrap_err();
        assert!(matches!(err, Error::GraphQl { status: Some(502), .. }));
    }

    #[test]
    fn test_parse_graphql_response_malformed_body() {
        let err = parse_graphql_response::<Value>(StatusCode::OK, "not json".to_string())
            .unwrap_err();
        assert!(matches!(err, Error::Json(_)));
    }
}
