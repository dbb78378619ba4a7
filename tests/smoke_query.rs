use gqlkit::{BearerAuth, Client, ClientConfig, FieldSelection, OperationDef, OperationKind};

// runs against a live endpoint only when GQLKIT_URL is set
fn live_client() -> Option<Client> {
    let base_url = std::env::var("GQLKIT_URL").ok()?;
    let mut config = ClientConfig::new(base_url);
    if let Ok(token) = std::env::var("GQLKIT_TOKEN") {
        config = config.with_auth(BearerAuth::new(token));
    }
    Some(Client::new(config).expect("client"))
}

#[cfg_attr(miri, ignore)]
#[tokio::test]
async fn smoke_typename() {
    let Some(client) = live_client() else {
        return;
    };

    let response = client
        .execute_raw("query { __typename }", None)
        .await
        .expect("graphql query");

    assert!(response.data.is_some());
}

#[cfg_attr(miri, ignore)]
#[tokio::test]
async fn smoke_operation_def() {
    let Some(client) = live_client() else {
        return;
    };

    const TYPENAME: OperationDef = OperationDef {
        name: "__typename",
        kind: OperationKind::Query,
        response_path: &["__typename"],
        return_type: "String",
        document_prefix: "query Typename { __typename",
        document_suffix: " }",
        query_all: "",
        query_minimal: "",
        plan_all: r#"{"root":{"node":"leaf"}}"#,
        plan_minimal: r#"{"root":{"node":"leaf"}}"#,
    };

    let name: String = client
        .execute_operation(
            &TYPENAME,
            serde_json::Map::new(),
            Some(&FieldSelection::Minimal),
            r#"{"types":{}}"#,
        )
        .await
        .expect("operation");
    assert!(!name.is_empty());
}
