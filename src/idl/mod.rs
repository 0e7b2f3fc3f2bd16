//! Thrift IDL parsing
//!
//! A small lexer and recursive-descent parser for the declarations a
//! registry needs: headers (`include`, `namespace`), structs, unions,
//! exceptions, enums, typedefs and constants. Services are parsed and
//! dropped.

pub mod ast;
pub mod lexer;
pub mod parser;

pub use ast::{Definition, Document, Header};
pub use parser::Parser;

use crate::error::{Result, ThriftyError};

/// Position-tagged syntax error, attached to a document id by [`parse`]
#[derive(Debug, Clone, PartialEq)]
pub struct SyntaxError {
    pub line: usize,
    pub column: usize,
    pub message: String,
}

impl SyntaxError {
    fn into_error(self, document: &str) -> ThriftyError {
        ThriftyError::SchemaSyntax {
            document: document.to_string(),
            line: self.line,
            column: self.column,
            message: self.message,
        }
    }
}

/// Parse one IDL document
pub fn parse(document_id: &str, source: &str) -> Result<Document> {
    Parser::parse(document_id, source).map_err(|e| e.into_error(document_id))
}
