//! error types
//!
//! one error enum for the generator pipeline and the runtime client.
//! generation errors are fatal to a run; none of them are retried.

use crate::graphql::GraphQlError;
use std::fmt;
use std::path::PathBuf;

/// library result type
pub type Result<T> = std::result::Result<T, Error>;

/// boxed error returned by user hooks
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// error type for the generator and the runtime client
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("io error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("archive error in {}: {message}", path.display())]
    Archive { path: PathBuf, message: String },

    #[error("failed to parse schema {source_name}: {message}")]
    Parse { source_name: String, message: String },

    /// two schema fragments define the same name with different shapes
    #[error("conflicting definitions of `{name}` in {first} and {second}")]
    SchemaConflict {
        name: String,
        first: String,
        second: String,
    },

    #[error("unknown type `{type_name}` referenced by `{referenced_by}`{}", source_suffix(source_file))]
    UnresolvedType {
        type_name: String,
        referenced_by: String,
        source_file: Option<String>,
    },

    /// two schema names normalize to the same rust identifier
    #[error("`{first}` and `{second}` in {scope} both normalize to `{normalized}`")]
    NameCollision {
        scope: String,
        first: String,
        second: String,
        normalized: String,
    },

    #[error("operations `{first}` and `{second}` both resolve to `{method}` in namespace `{namespace}`")]
    DuplicateOperation {
        namespace: String,
        method: String,
        first: String,
        second: String,
    },

    #[error("invalid field path `{path}`: `{segment}` not found on `{type_name}`")]
    InvalidFieldPath {
        path: String,
        segment: String,
        type_name: String,
    },

    #[error("hook `{hook}` failed on {target}: {source}")]
    HookExecution {
        hook: String,
        target: String,
        #[source]
        source: BoxError,
    },

    #[error("failed to render template `{template}`: {source}")]
    TemplateRender {
        template: String,
        #[source]
        source: tera::Error,
    },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("url error: {0}")]
    Url(#[from] url::ParseError),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("graphql error: {message}")]
    GraphQl {
        /// http status if available
        status: Option<u16>,
        /// graphql error list
        errors: Vec<GraphQlError>,
        /// raw response body
        body: String,
        /// top-level message
        message: String,
    },

    /// response does not match the selection plan it was requested with
    #[error("unexpected response shape at `{path}`: {message}")]
    ResponseShape { path: String, message: String },
}

fn source_suffix(source: &Option<String>) -> String {
    match source {
        Some(file) => format!(" (in {file})"),
        None => String::new(),
    }
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    /// true if the error looks like an auth failure
    pub fn is_auth_error(&self) -> bool {
        matches!(self, Error::GraphQl { status: Some(401 | 403), .. })
            || matches!(
                self,
                Error::Http(err) if err.status() == Some(reqwest::StatusCode::UNAUTHORIZED)
            )
    }

    /// true for connection, timeout and other transport failures
    pub fn is_transport_error(&self) -> bool {
        matches!(self, Error::Http(_))
    }

    /// true for errors raised while generating code
    pub fn is_generation_error(&self) -> bool {
        matches!(
            self,
            Error::Io { .. }
                | Error::Archive { .. }
                | Error::Parse { .. }
                | Error::SchemaConflict { .. }
                | Error::UnresolvedType { .. }
                | Error::NameCollision { .. }
                | Error::DuplicateOperation { .. }
                | Error::HookExecution { .. }
                | Error::TemplateRender { .. }
        )
    }
}

impl fmt::Display for GraphQlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}
