//! Schema-less Thrift values
//!
//! The wire reader knows field ids and wire types but no names. A decoded
//! [`StructValue`] is a map from field id to [`Value`]; the mapper attaches
//! names from the schema afterwards.

pub mod reader;

pub use reader::{read_struct, Protocol};

use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::ser::{Error as _, SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

/// A decoded wire value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Scalar(Scalar),
    /// Lists and sets
    List(Vec<Value>),
    /// Map entries in wire order
    Map(Vec<(Value, Value)>),
    Struct(StructValue),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Bool(bool),
    Byte(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    Double(f64),
    String(String),
    /// Binary fields and strings that are not valid UTF-8
    Binary(Vec<u8>),
}

/// Fields of a decoded struct, keyed by field id
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StructValue {
    pub fields: BTreeMap<i16, Value>,
}

impl StructValue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value at `id`; `None` means the field was not on the wire
    pub fn get(&self, id: i16) -> Option<&Value> {
        self.fields.get(&id)
    }

    pub fn insert(&mut self, id: i16, value: Value) -> Option<Value> {
        self.fields.insert(id, value)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl FromIterator<(i16, Value)> for StructValue {
    fn from_iter<T: IntoIterator<Item = (i16, Value)>>(iter: T) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

impl Value {
    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Value::Scalar(scalar) => Some(scalar),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<&StructValue> {
        match self {
            Value::Struct(value) => Some(value),
            _ => None,
        }
    }

    /// Integer scalar that fits an enum ordinal
    pub fn as_enum_ordinal(&self) -> Option<i32> {
        match self.as_scalar()? {
            Scalar::Byte(v) => Some(i32::from(*v)),
            Scalar::I16(v) => Some(i32::from(*v)),
            Scalar::I32(v) => Some(*v),
            Scalar::I64(v) => i32::try_from(*v).ok(),
            _ => None,
        }
    }

    /// Short name of the value's wire shape, used in mismatch errors
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Scalar(scalar) => scalar.kind(),
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Struct(_) => "struct",
        }
    }
}

impl Scalar {
    pub fn kind(&self) -> &'static str {
        match self {
            Scalar::Bool(_) => "bool",
            Scalar::Byte(_) => "byte",
            Scalar::I16(_) => "i16",
            Scalar::I32(_) => "i32",
            Scalar::I64(_) => "i64",
            Scalar::Double(_) => "double",
            Scalar::String(_) => "string",
            Scalar::Binary(_) => "binary",
        }
    }

    /// Render as a JSON object key
    fn to_key(&self) -> String {
        match self {
            Scalar::Bool(v) => v.to_string(),
            Scalar::Byte(v) => v.to_string(),
            Scalar::I16(v) => v.to_string(),
            Scalar::I32(v) => v.to_string(),
            Scalar::I64(v) => v.to_string(),
            Scalar::Double(v) => v.to_string(),
            Scalar::String(v) => v.clone(),
            Scalar::Binary(v) => STANDARD.encode(v),
        }
    }
}

impl From<Scalar> for Value {
    fn from(scalar: Scalar) -> Self {
        Value::Scalar(scalar)
    }
}

impl From<StructValue> for Value {
    fn from(value: StructValue) -> Self {
        Value::Struct(value)
    }
}

// =============================================================================
// Pass-through JSON encoding
// =============================================================================

impl Serialize for Scalar {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Scalar::Bool(v) => serializer.serialize_bool(*v),
            Scalar::Byte(v) => serializer.serialize_i8(*v),
            Scalar::I16(v) => serializer.serialize_i16(*v),
            Scalar::I32(v) => serializer.serialize_i32(*v),
            Scalar::I64(v) => serializer.serialize_i64(*v),
            Scalar::Double(v) => serializer.serialize_f64(*v),
            Scalar::String(v) => serializer.serialize_str(v),
            Scalar::Binary(v) => serializer.serialize_str(&STANDARD.encode(v)),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Scalar(scalar) => scalar.serialize(serializer),
            Value::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Map(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries {
                    let key = key.as_scalar().ok_or_else(|| {
                        S::Error::custom(format!("map key must be a scalar, found {}", key.kind()))
                    })?;
                    map.serialize_entry(&key.to_key(), value)?;
                }
                map.end()
            }
            Value::Struct(value) => value.serialize(serializer),
        }
    }
}

impl Serialize for StructValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (id, value) in &self.fields {
            map.serialize_entry(&id.to_string(), value)?;
        }
        map.end()
    }
}
