//! request authentication
//!
//! an [`Auth`] produces the headers attached to each request. the client
//! asks for them on every call, so implementations can rotate credentials.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::collections::BTreeMap;

/// header mapping produced by an [`Auth`]
pub type AuthHeaders = BTreeMap<String, String>;

/// authentication capability used by [`crate::Client`]
pub trait Auth: Send + Sync {
    /// headers to include in the next request
    fn headers(&self) -> AuthHeaders;
}

/// no authentication
#[derive(Debug, Clone, Default)]
pub struct NoAuth;

impl Auth for NoAuth {
    fn headers(&self) -> AuthHeaders {
        AuthHeaders::new()
    }
}

/// api key sent in a custom header
#[derive(Clone)]
pub struct ApiKeyAuth {
    key: String,
    header: String,
}

impl ApiKeyAuth {
    /// default header name used by [`ApiKeyAuth::new`]
    pub const DEFAULT_HEADER: &'static str = "x-api-key";

    pub fn new(key: impl Into<String>) -> Self {
        Self::with_header(key, Self::DEFAULT_HEADER)
    }

    pub fn with_header(key: impl Into<String>, header: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            header: header.into(),
        }
    }
}

impl Auth for ApiKeyAuth {
    fn headers(&self) -> AuthHeaders {
        AuthHeaders::from([(self.header.clone(), self.key.clone())])
    }
}

/// bearer token in the `Authorization` header
#[derive(Clone)]
pub struct BearerAuth {
    token: String,
}

impl BearerAuth {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl Auth for BearerAuth {
    fn headers(&self) -> AuthHeaders {
        AuthHeaders::from([(
            "Authorization".to_string(),
            format!("Bearer {}", self.token),
        )])
    }
}

/// http basic authentication
#[derive(Clone)]
pub struct BasicAuth {
    username: String,
    password: String,
}

impl BasicAuth {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl Auth for BasicAuth {
    fn headers(&self) -> AuthHeaders {
        let encoded = STANDARD.encode(format!("{}:{}", self.username, self.password));
        AuthHeaders::from([("Authorization".to_string(), format!("Basic {encoded}"))])
    }
}

/// fixed set of custom headers
#[derive(Debug, Clone, Default)]
pub struct HeaderAuth {
    headers: AuthHeaders,
}

impl HeaderAuth {
    pub fn new<I, K, V>(headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            headers: headers
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl Auth for HeaderAuth {
    fn headers(&self) -> AuthHeaders {
        self.headers.clone()
    }
}

impl<F> Auth for F
where
    F: Fn() -> AuthHeaders + Send + Sync,
{
    fn headers(&self) -> AuthHeaders {
        self()
    }
}

// credentials stay out of debug output
macro_rules! redacted_debug {
    ($($ty:ident),*) => {
        $(impl std::fmt::Debug for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.debug_struct(stringify!($ty)).finish_non_exhaustive()
            }
        })*
    };
}

redacted_debug!(ApiKeyAuth, BearerAuth, BasicAuth);

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_api_key_default_header() {
        let headers = ApiKeyAuth::new("secret").headers();
        assert_eq!(headers.get("x-api-key").map(String::as_str), Some("secret"));

        let headers = ApiKeyAuth::with_header("secret", "X-Custom").headers();
        assert_eq!(headers.get("X-Custom").map(String::as_str), Some("secret"));
    }

    #[test]
    fn test_bearer_and_basic() {
        let headers = BearerAuth::new("tok").headers();
        assert_eq!(headers["Authorization"], "Bearer tok");

        let headers = BasicAuth::new("user", "pass").headers();
        assert_eq!(headers["Authorization"], "Basic dXNlcjpwYXNz");
    }

    #[test]
    fn test_header_and_no_auth() {
        let headers = HeaderAuth::new([("X-Tenant", "t1"), ("X-Key", "k")]).headers();
        assert_eq!(headers.len(), 2);
        assert!(NoAuth.headers().is_empty());
    }

    #[test]
    fn test_closure_auth_evaluated_each_call() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let auth = move || {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            AuthHeaders::from([("X-Nonce".to_string(), n.to_string())])
        };
        assert_eq!(auth.headers()["X-Nonce"], "0");
        assert_eq!(auth.headers()["X-Nonce"], "1");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let debug = format!("{:?}", BearerAuth::new("top-secret"));
        assert!(!debug.contains("top-secret"));
    }
}
