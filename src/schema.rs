//! Schema model types
//!
//! The structural model a registry is built from: struct, enum and typedef
//! declarations plus the field types they reference.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Thrift base types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BaseType {
    Bool,
    /// `byte` and `i8` share a wire representation
    I8,
    I16,
    I32,
    I64,
    Double,
    String,
    Binary,
    Uuid,
}

impl BaseType {
    /// Map an IDL keyword to a base type
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "bool" => Some(BaseType::Bool),
            "byte" | "i8" => Some(BaseType::I8),
            "i16" => Some(BaseType::I16),
            "i32" => Some(BaseType::I32),
            "i64" => Some(BaseType::I64),
            "double" => Some(BaseType::Double),
            "string" => Some(BaseType::String),
            "binary" => Some(BaseType::Binary),
            "uuid" => Some(BaseType::Uuid),
            _ => None,
        }
    }

    /// The IDL keyword for this type
    pub fn keyword(&self) -> &'static str {
        match self {
            BaseType::Bool => "bool",
            BaseType::I8 => "i8",
            BaseType::I16 => "i16",
            BaseType::I32 => "i32",
            BaseType::I64 => "i64",
            BaseType::Double => "double",
            BaseType::String => "string",
            BaseType::Binary => "binary",
            BaseType::Uuid => "uuid",
        }
    }
}

/// Type of a field, typedef target or constant
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Base(BaseType),
    List(Box<FieldType>),
    Set(Box<FieldType>),
    Map(Box<FieldType>, Box<FieldType>),
    /// Reference to a struct, enum or typedef, resolved at mapping time
    Named(String),
}

impl FieldType {
    /// Name of the referenced declaration, if this is a named reference
    pub fn named(&self) -> Option<&str> {
        match self {
            FieldType::Named(name) => Some(name),
            _ => None,
        }
    }

    /// Every named reference reachable through this type (containers included)
    pub fn referenced_names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_names(&mut names);
        names
    }

    fn collect_names<'a>(&'a self, names: &mut Vec<&'a str>) {
        match self {
            FieldType::Base(_) => {}
            FieldType::List(inner) | FieldType::Set(inner) => inner.collect_names(names),
            FieldType::Map(key, value) => {
                key.collect_names(names);
                value.collect_names(names);
            }
            FieldType::Named(name) => names.push(name),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Base(base) => write!(f, "{}", base.keyword()),
            FieldType::List(inner) => write!(f, "list<{}>", inner),
            FieldType::Set(inner) => write!(f, "set<{}>", inner),
            FieldType::Map(key, value) => write!(f, "map<{}, {}>", key, value),
            FieldType::Named(name) => write!(f, "{}", name),
        }
    }
}

/// Field requiredness as declared in the IDL (recorded, never enforced)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Requiredness {
    #[default]
    Default,
    Required,
    Optional,
}

/// Constant value literal (defaults and `const` declarations)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstValue {
    Int(i64),
    Double(f64),
    Literal(String),
    /// Reference to another constant or enum item, never resolved
    Identifier(String),
    List(Vec<ConstValue>),
    Map(Vec<(ConstValue, ConstValue)>),
}

/// A single field of a struct, union or exception
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDef {
    /// Wire tag
    pub id: i16,
    pub name: String,
    pub field_type: FieldType,
    #[serde(default)]
    pub requiredness: Requiredness,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<ConstValue>,
}

/// Kind of struct-like declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructKind {
    Struct,
    Union,
    Exception,
}

/// A struct-like declaration with its fields in declaration order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructDef {
    pub name: String,
    pub kind: StructKind,
    pub fields: Vec<FieldDef>,
    /// Id of the document that declared this struct
    pub document: String,
}

/// An enum declaration: ordinal -> label table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumDef {
    pub name: String,
    pub values: BTreeMap<i32, String>,
    pub document: String,
}

impl EnumDef {
    /// Label for an ordinal
    pub fn label(&self, ordinal: i32) -> Option<&str> {
        self.values.get(&ordinal).map(String::as_str)
    }
}

/// A typedef: alias -> underlying type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypedefDef {
    pub alias: String,
    pub target: FieldType,
    pub document: String,
}

/// A `const` declaration. Parsed so documents validate, never retained.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstDef {
    pub name: String,
    pub field_type: FieldType,
    pub value: ConstValue,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_type_keywords() {
        assert_eq!(BaseType::from_keyword("byte"), Some(BaseType::I8));
        assert_eq!(BaseType::from_keyword("i8"), Some(BaseType::I8));
        assert_eq!(BaseType::from_keyword("binary"), Some(BaseType::Binary));
        assert_eq!(BaseType::from_keyword("Account"), None);
    }

    #[test]
    fn test_field_type_display() {
        let ty = FieldType::Map(
            Box::new(FieldType::Base(BaseType::String)),
            Box::new(FieldType::List(Box::new(FieldType::Named("Address".into())))),
        );
        assert_eq!(ty.to_string(), "map<string, list<Address>>");
    }

    #[test]
    fn test_referenced_names() {
        let ty = FieldType::Map(
            Box::new(FieldType::Named("Key".into())),
            Box::new(FieldType::Set(Box::new(FieldType::Named("Value".into())))),
        );
        assert_eq!(ty.referenced_names(), vec!["Key", "Value"]);
        assert!(FieldType::Base(BaseType::I32).referenced_names().is_empty());
    }
}
