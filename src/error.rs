//! Error types for schema building and transcoding

use thiserror::Error;

/// Result type for thrifty operations
pub type Result<T> = std::result::Result<T, ThriftyError>;

/// Errors raised while building a registry or transcoding a message
#[derive(Error, Debug)]
pub enum ThriftyError {
    #[error("unable to parse IDL {document}:{line}:{column}: {message}")]
    SchemaSyntax {
        document: String,
        line: usize,
        column: usize,
        message: String,
    },

    #[error("'{0}' must contain a namespace")]
    MissingNamespace(String),

    #[error("field '{struct_name}.{field}' expected {expected} on the wire, found {found}")]
    FieldTypeMismatch {
        struct_name: String,
        field: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("ordinal {ordinal} of field '{field}' is not a member of enum '{enum_name}'")]
    UnknownEnumOrdinal {
        enum_name: String,
        field: String,
        ordinal: i32,
    },

    #[error("struct '{name}' not found in IDL{}", suggestion_hint(.suggestions))]
    UnknownStruct {
        name: String,
        suggestions: Vec<String>,
    },

    #[error("recursion limit of {limit} exceeded at {path}")]
    RecursionLimitExceeded { limit: usize, path: String },

    #[error("unable to read thrift message: {0}")]
    WireFormat(#[from] thrift::Error),

    #[error("unsupported wire type: {0}")]
    UnsupportedWireType(String),

    #[error("unable to marshal decoded thrift message to JSON: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn suggestion_hint(suggestions: &[String]) -> String {
    if suggestions.is_empty() {
        String::new()
    } else {
        format!(" (did you mean {}?)", suggestions.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_namespace_message() {
        let err = ThriftyError::MissingNamespace("Account".to_string());
        assert_eq!(err.to_string(), "'Account' must contain a namespace");
    }

    #[test]
    fn test_unknown_struct_hint() {
        let err = ThriftyError::UnknownStruct {
            name: "Acount".to_string(),
            suggestions: vec!["Account".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "struct 'Acount' not found in IDL (did you mean Account?)"
        );

        let err = ThriftyError::UnknownStruct {
            name: "Nothing".to_string(),
            suggestions: vec![],
        };
        assert_eq!(err.to_string(), "struct 'Nothing' not found in IDL");
    }
}
