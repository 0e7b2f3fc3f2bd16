//! Qualified name handling
//!
//! Thrift references types from other documents (and callers name root
//! structs) as `<qualifier>.<Name>`, where the qualifier is either a
//! namespace (`sh.batch.schema.Account`) or an include prefix
//! (`incfile.Account`).

use crate::error::{Result, ThriftyError};

/// Separator between a qualifier and the bare declaration name
pub const NAMESPACE_SEPARATOR: char = '.';

/// Split a qualified struct name into `(struct_name, namespace)`.
///
/// The split happens on the last separator, so dotted namespaces stay
/// intact. A name without a separator, or with an empty side, fails with
/// [`ThriftyError::MissingNamespace`].
pub fn split_qualified_name(qualified: &str) -> Result<(String, String)> {
    match qualified.rsplit_once(NAMESPACE_SEPARATOR) {
        Some((namespace, name)) if !namespace.is_empty() && !name.is_empty() => {
            Ok((name.to_string(), namespace.to_string()))
        }
        _ => Err(ThriftyError::MissingNamespace(qualified.to_string())),
    }
}

/// Include prefix for a document id (`incfile.thrift` -> `incfile`)
pub fn include_prefix(document_id: &str) -> &str {
    let file_name = document_id
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(document_id);
    file_name.strip_suffix(".thrift").unwrap_or(file_name)
}
