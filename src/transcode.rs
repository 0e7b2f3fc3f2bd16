//! Transcoding entry points
//!
//! Decode wire bytes, map them onto a root struct and encode the result as
//! JSON. The free functions use default options; [`Transcoder`] carries
//! explicit ones.

use tracing::trace;

use crate::error::Result;
use crate::mapper::{MapOptions, OutputTree, ValueMapper};
use crate::registry::SchemaRegistry;
use crate::wire::{self, Value};

pub use crate::wire::Protocol;

/// Options for a [`Transcoder`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DecodeOptions {
    pub protocol: Protocol,
    pub mapping: MapOptions,
    /// Pretty-print the JSON output
    pub pretty: bool,
}

/// Decodes messages against a shared registry
#[derive(Debug, Clone, Copy)]
pub struct Transcoder<'r> {
    registry: &'r SchemaRegistry,
    options: DecodeOptions,
}

impl<'r> Transcoder<'r> {
    pub fn new(registry: &'r SchemaRegistry) -> Self {
        Self {
            registry,
            options: DecodeOptions::default(),
        }
    }

    pub fn with_options(mut self, options: DecodeOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &DecodeOptions {
        &self.options
    }

    /// Decode `wire` as an instance of `root` and encode it as JSON
    pub fn decode(&self, wire: &[u8], root: &str) -> Result<Vec<u8>> {
        let tree = self.map_bytes(wire, root)?;
        self.encode(&tree)
    }

    /// Like [`decode`](Self::decode), but an unknown root yields `{}`
    pub fn decode_or_empty(&self, wire: &[u8], root: &str) -> Result<Vec<u8>> {
        let value = self.read(wire)?;
        let tree = self.mapper().map_or_empty(root, &value)?;
        self.encode(&tree)
    }

    /// Decode into a `serde_json::Value` instead of bytes
    pub fn decode_value(&self, wire: &[u8], root: &str) -> Result<serde_json::Value> {
        let tree = self.map_bytes(wire, root)?;
        Ok(serde_json::to_value(&tree)?)
    }

    /// Decode and map without encoding
    pub fn map_bytes(&self, wire: &[u8], root: &str) -> Result<OutputTree> {
        let value = self.read(wire)?;
        self.mapper().map(root, &value)
    }

    fn read(&self, wire: &[u8]) -> Result<Value> {
        trace!(
            bytes = wire.len(),
            protocol = %self.options.protocol,
            fingerprint = self.registry.fingerprint().short(),
            "decoding message"
        );
        let value = wire::read_struct(wire, self.options.protocol, self.options.mapping.max_depth)?;
        Ok(Value::Struct(value))
    }

    fn mapper(&self) -> ValueMapper<'r> {
        ValueMapper::new(self.registry).with_options(self.options.mapping)
    }

    fn encode(&self, tree: &OutputTree) -> Result<Vec<u8>> {
        let json = if self.options.pretty {
            serde_json::to_vec_pretty(tree)?
        } else {
            serde_json::to_vec(tree)?
        };
        Ok(json)
    }
}

/// Decode binary-protocol `wire` as `root` into compact JSON
pub fn decode(registry: &SchemaRegistry, wire: &[u8], root: &str) -> Result<Vec<u8>> {
    Transcoder::new(registry).decode(wire, root)
}

/// Like [`decode`], but an unknown root yields `{}` and a warning
pub fn decode_or_empty(registry: &SchemaRegistry, wire: &[u8], root: &str) -> Result<Vec<u8>> {
    Transcoder::new(registry).decode_or_empty(wire, root)
}

/// Build a registry from `schema` and decode in one step
pub fn decode_raw(schema: &str, wire: &[u8], root: &str) -> Result<Vec<u8>> {
    let registry = SchemaRegistry::build(schema)?;
    decode(&registry, wire, root)
}
