//! Thrifty
//!
//! Schema-driven Thrift to JSON transcoding. Thrift IDL documents are parsed
//! into a [`SchemaRegistry`]; binary or compact wire messages are decoded
//! without a schema, then mapped onto a root struct so that field ids become
//! field names, enum ordinals become labels and nested structs become nested
//! objects.
//!
//! ## Example
//!
//! ```no_run
//! use thrifty::{decode, SchemaRegistry};
//!
//! # fn main() -> thrifty::Result<()> {
//! let registry = SchemaRegistry::build(r#"
//!     namespace go sh.batch.schema
//!     struct Account {
//!         1: i32 id
//!         2: string email
//!     }
//! "#)?;
//! # let wire: Vec<u8> = Vec::new();
//! let json = decode(&registry, &wire, "sh.batch.schema.Account")?;
//! # let _ = json;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! IDL text ──► idl::parse ──► SchemaRegistry ─┐
//!                                            ▼
//! wire bytes ──► wire::read_struct ──► ValueMapper ──► serde_json
//! ```

pub mod checksum;
pub mod config;
pub mod error;
pub mod idl;
pub mod mapper;
pub mod names;
pub mod registry;
pub mod schema;
pub mod sources;
pub mod transcode;
pub mod wire;

pub use checksum::Fingerprint;
pub use config::ThriftyConfig;
pub use error::{Result, ThriftyError};
pub use mapper::{MapOptions, MissingPolicy, OutputTree, OutputValue, ValueMapper};
pub use names::split_qualified_name;
pub use registry::SchemaRegistry;
pub use schema::{EnumDef, FieldDef, FieldType, StructDef, TypedefDef};
pub use sources::SchemaSources;
pub use transcode::{decode, decode_or_empty, decode_raw, DecodeOptions, Protocol, Transcoder};
