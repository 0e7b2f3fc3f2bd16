//! Declarations produced by the IDL parser

use crate::schema::{ConstDef, EnumDef, StructDef, TypedefDef};

/// A parsed IDL document
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    pub headers: Vec<Header>,
    pub definitions: Vec<Definition>,
}

impl Document {
    /// Namespace declarations as `(scope, name)` pairs, in declaration order
    pub fn namespaces(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers.iter().filter_map(|h| match h {
            Header::Namespace { scope, name } => Some((scope.as_str(), name.as_str())),
            _ => None,
        })
    }

    /// Paths named by `include` statements
    pub fn includes(&self) -> impl Iterator<Item = &str> {
        self.headers.iter().filter_map(|h| match h {
            Header::Include(path) => Some(path.as_str()),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Header {
    Include(String),
    CppInclude(String),
    Namespace { scope: String, name: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Definition {
    Const(ConstDef),
    Typedef(TypedefDef),
    Enum(EnumDef),
    Struct(StructDef),
    /// Services are recognized so documents parse; only the name is kept
    Service { name: String, extends: Option<String> },
}
