//! typed graphql clients generated from a schema
//!
//! this crate has two halves. the runtime ([`Client`], [`ClientConfig`],
//! the [`Auth`] implementations and [`FieldSelection`]) is what generated
//! clients depend on; it also works on its own for raw documents. the
//! [`codegen`] module (and the `gqlkit-codegen` binary) turns a schema into
//! a crate of models plus a client whose methods are grouped into
//! namespaces, with queries under `query()` and mutations under
//! `mutation()`.
//!
//! ## quick start
//!
//! ```no_run
//! use gqlkit::{BearerAuth, Client, ClientConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ClientConfig::new("https://api.example.com/graphql")
//!     .with_auth(BearerAuth::new("token"));
//! let client = Client::new(config)?;
//! let response = client.execute_raw("{ viewer { id } }", None).await?;
//! println!("{:?}", response.data);
//! # Ok(())
//! # }
//! ```
//!
//! ## generated clients
//!
//! ```text
//! gqlkit-codegen --schema schema/ --out my-client --crate-name my-client
//! ```
//!
//! every generated method takes an optional [`FieldSelection`]: `None` or
//! [`FieldSelection::All`] requests every field, [`FieldSelection::Minimal`]
//! only identifiers, and [`FieldSelection::custom`] dotted paths.

mod auth;
mod client;
mod config;
mod error;
mod graphql;
mod operation;
mod selection;

pub mod codegen;

pub use auth::{ApiKeyAuth, Auth, AuthHeaders, BasicAuth, BearerAuth, HeaderAuth, NoAuth};
pub use client::Client;
pub use config::ClientConfig;
pub use error::{BoxError, Error, Result};
pub use graphql::{GraphQlError, GraphQlLocation, GraphQlResponse};
pub use operation::{compose_document, OperationDef, OperationKind, PreparedOperation};
pub use selection::{
    FieldPlan, FieldSelection, FieldShape, ObjectPlan, PlanNode, Planner, PolymorphicPlan,
    SchemaShape, SelectionPlan, ShapeKind, TypeShape, DEFAULT_MAX_DEPTH,
};
