//! Fingerprints for schema sources

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// SHA256 fingerprint of the documents a registry was built from
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Compute fingerprint over `(document id, source)` pairs.
    ///
    /// Callers pass documents in id order; ids and sources are NUL-delimited
    /// so `("a", "bc")` and `("ab", "c")` hash differently.
    pub fn from_documents<'a>(documents: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut hasher = Sha256::new();
        for (id, source) in documents {
            hasher.update(id.as_bytes());
            hasher.update([0u8]);
            hasher.update(source.as_bytes());
            hasher.update([0u8]);
        }
        Self(format!("{:x}", hasher.finalize()))
    }

    /// Get the hex string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 12 hex characters, for log lines
    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(12)]
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_consistency() {
        let docs = [("simple.thrift", "struct A { 1: i32 id }")];
        assert_eq!(
            Fingerprint::from_documents(docs),
            Fingerprint::from_documents(docs)
        );
    }

    #[test]
    fn test_fingerprint_boundaries() {
        let a = Fingerprint::from_documents([("a", "bc")]);
        let b = Fingerprint::from_documents([("ab", "c")]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_fingerprint_format() {
        let fp = Fingerprint::from_documents([("schema.thrift", "struct A {}")]);
        assert_eq!(fp.as_str().len(), 64);
        assert_eq!(fp.short().len(), 12);
        assert!(fp.as_str().starts_with(fp.short()));
    }
}
