//! MERIDIAN.SYNC Schema
//!
//! Declarative per-field synchronization policies and the schema table
//! built once at registration time: field patterns, path hashes, and the
//! shared contract consumed by the client side. No runtime reflection;
//! policies are a closed tagged union carrying strongly-typed functions.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod contract;
pub mod field;
pub mod policy;
pub mod schema;
pub mod viewer;

pub use contract::{FieldContract, PayloadShape, SchemaContract};
pub use field::FieldDecl;
pub use policy::{CustomFn, KeyFn, MaskFn, PolicyKind, Resolution, SyncPolicy};
pub use schema::{Schema, SchemaBuilder};
pub use viewer::Viewer;
