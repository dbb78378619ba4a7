//! client configuration
//!
//! build a [`ClientConfig`] with the graphql endpoint, an [`Auth`], and
//! optional transport overrides. pass it to [`crate::Client::new`] or to the
//! constructor of a generated client.

use crate::auth::{Auth, NoAuth};
use crate::error::{Error, Result};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// configuration for the runtime client
#[derive(Clone)]
pub struct ClientConfig {
    /// original endpoint input
    pub(crate) raw_base_url: String,

    /// graphql endpoint (e.g., "<https://api.example.com/graphql>")
    pub(crate) base_url: Option<Url>,

    /// header source evaluated per request
    pub(crate) auth: Arc<dyn Auth>,

    /// request timeout duration
    pub(crate) timeout: Duration,

    /// user agent string
    pub(crate) user_agent: String,

    /// whether to verify ssl certificates
    pub(crate) verify_ssl: bool,

    /// additional headers to send with every request
    pub(crate) extra_headers: HeaderMap,

    /// prebuilt http client (takes precedence over http_client_builder)
    pub(crate) http_client: Option<reqwest::Client>,

    /// callback to customize the http client builder before building
    pub(crate) http_client_builder:
        Option<Arc<dyn Fn(reqwest::ClientBuilder) -> reqwest::ClientBuilder + Send + Sync>>,
}

impl ClientConfig {
    /// create a new client configuration
    ///
    /// `base_url` is the graphql endpoint itself; a missing scheme defaults
    /// to https.
    ///
    /// ```
    /// use gqlkit::{BearerAuth, ClientConfig};
    ///
    /// let config = ClientConfig::new("https://api.example.com/graphql")
    ///     .with_auth(BearerAuth::new("token"));
    /// ```
    pub fn new(base_url: impl AsRef<str>) -> Self {
        let raw = base_url.as_ref();
        let normalized = raw.trim_end_matches('/');
        let base_url = Url::parse(normalized)
            .or_else(|_| Url::parse(&format!("https://{}", normalized)))
            .ok();

        Self {
            raw_base_url: raw.to_string(),
            base_url,
            auth: Arc::new(NoAuth),
            timeout: Duration::from_secs(30),
            user_agent: format!("gqlkit/{} (Rust)", env!("CARGO_PKG_VERSION")),
            verify_ssl: true,
            extra_headers: HeaderMap::new(),
            http_client: None,
            http_client_builder: None,
        }
    }

    /// set the authentication capability
    ///
    /// default: [`NoAuth`]
    pub fn with_auth(mut self, auth: impl Auth + 'static) -> Self {
        self.auth = Arc::new(auth);
        self
    }

    /// set the request timeout
    ///
    /// default: 30 seconds
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// set a custom user agent string
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// disable ssl certificate verification (not recommended for production)
    pub fn with_ssl_verification(mut self, verify: bool) -> Self {
        self.verify_ssl = verify;
        self
    }

    /// add a header to every request
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.extra_headers.insert(name, value);
        self
    }

    /// add a set of headers to every request
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.extra_headers.extend(headers);
        self
    }

    /// access extra headers configured on this client
    pub fn extra_headers(&self) -> &HeaderMap {
        &self.extra_headers
    }

    /// inject a prebuilt http client.
    ///
    /// the prebuilt client owns tls, timeouts, and the user agent. auth
    /// headers are still added per request.
    pub fn with_http_client(mut self, http_client: reqwest::Client) -> Self {
        self.http_client = Some(http_client);
        self
    }

    /// customize the http client builder before the client is created.
    ///
    /// ignored if `with_http_client` is also set.
    pub fn with_http_client_builder<F>(mut self, f: F) -> Self
    where
        F: Fn(reqwest::ClientBuilder) -> reqwest::ClientBuilder + Send + Sync + 'static,
    {
        self.http_client_builder = Some(Arc::new(f));
        self
    }

    /// validate the configuration
    pub(crate) fn validate(&self) -> Result<()> {
        let Some(url) = &self.base_url else {
            return Err(Error::Config(format!(
                "invalid base url: {}",
                self.raw_base_url
            )));
        };

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(Error::Config(format!(
                "invalid url scheme: {}. must be http or https",
                url.scheme()
            )));
        }

        Ok(())
    }

    /// the graphql endpoint
    pub(crate) fn graphql_url(&self) -> Result<Url> {
        self.base_url
            .clone()
            .ok_or_else(|| Error::Config(format!("invalid base url: {}", self.raw_base_url)))
    }

    /// per-request auth headers
    pub(crate) fn auth_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        for (name, value) in self.auth.headers() {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|err| Error::Config(format!("invalid auth header name {name}: {err}")))?;
            let value = HeaderValue::from_str(&value)
                .map_err(|err| Error::Config(format!("invalid auth header value: {err}")))?;
            headers.insert(name, value);
        }
        Ok(headers)
    }
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.raw_base_url)
            .field("timeout", &self.timeout)
            .field("user_agent", &self.user_agent)
            .field("verify_ssl", &self.verify_ssl)
            .field("extra_headers", &self.extra_headers.len())
            .field("http_client", &self.http_client.is_some())
            .field("http_client_builder", &self.http_client_builder.is_some())
            .field("auth", &"<redacted>")
            .finish()
    }
}
