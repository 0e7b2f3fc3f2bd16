//! Schema source loading
//!
//! Collects `.thrift` documents from the filesystem, keyed by file name so
//! that `include "incfile.thrift"` and `incfile.Account` line up with the
//! document ids the registry sees.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::Result;
use crate::registry::SchemaRegistry;

const IDL_EXTENSION: &str = "thrift";

/// IDL documents keyed by document id
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaSources {
    documents: BTreeMap<String, String>,
}

impl SchemaSources {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load explicit files and every `.thrift` file below `dirs`
    pub fn load(paths: &[PathBuf], dirs: &[PathBuf]) -> Result<Self> {
        let mut sources = Self::new();
        for path in paths {
            sources.add_file(path)?;
        }
        for dir in dirs {
            sources.add_dir(dir)?;
        }
        Ok(sources)
    }

    /// Add one file; its file name becomes the document id
    pub fn add_file(&mut self, path: &Path) -> Result<()> {
        let content = fs::read_to_string(path)?;
        let id = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        self.insert(id, content, path);
        Ok(())
    }

    /// Walk `dir` recursively for `.thrift` files
    pub fn add_dir(&mut self, dir: &Path) -> Result<()> {
        let mut files: Vec<PathBuf> = Vec::new();
        for entry in WalkDir::new(dir).into_iter() {
            let entry = entry.map_err(std::io::Error::from)?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            if path.extension().map(|e| e != IDL_EXTENSION).unwrap_or(true) {
                continue;
            }
            files.push(path.to_path_buf());
        }
        files.sort();

        debug!(dir = %dir.display(), files = files.len(), "collected IDL documents");
        for path in files {
            self.add_file(&path)?;
        }
        Ok(())
    }

    /// Add an in-memory document
    pub fn add_document(&mut self, id: impl Into<String>, source: impl Into<String>) {
        self.documents.insert(id.into(), source.into());
    }

    fn insert(&mut self, id: String, content: String, path: &Path) {
        if self.documents.insert(id.clone(), content).is_some() {
            warn!(document = %id, path = %path.display(), "document id loaded twice, keeping the later file");
        }
    }

    pub fn documents(&self) -> &BTreeMap<String, String> {
        &self.documents
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Build a merged registry from every loaded document
    pub fn build_registry(&self) -> Result<SchemaRegistry> {
        SchemaRegistry::build_merged(&self.documents)
    }
}
