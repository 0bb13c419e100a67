//! Source file catalogs.
//!
//! The analyzer never touches the filesystem: COPY members and library
//! macros come from a [`FileCatalog`]. [`MemoryCatalog`] is the in-memory
//! implementation used by callers that already hold the member texts.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A named source member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFile {
    pub name: String,
    pub content: String,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }

    /// Name without its extension, upper-cased.
    pub fn stem(&self) -> String {
        let upper = self.name.to_uppercase();
        match upper.rfind('.') {
            Some(dot) if dot > 0 => upper[..dot].to_string(),
            _ => upper,
        }
    }

    /// Physical records of the member.
    pub fn lines(&self) -> Vec<&str> {
        self.content.lines().collect()
    }
}

/// Read-only access to the members available to COPY and macro preload.
pub trait FileCatalog {
    /// Exact, case-insensitive lookup by file name.
    fn find(&self, name: &str) -> Option<&SourceFile>;

    /// Every member, in a stable order.
    fn list(&self) -> Vec<&SourceFile>;
}

/// [`FileCatalog`] backed by a map keyed on the upper-cased name.
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    files: HashMap<String, SourceFile>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a member.
    pub fn add_file(&mut self, name: impl Into<String>, content: impl Into<String>) {
        let file = SourceFile::new(name, content);
        self.files.insert(file.name.to_uppercase(), file);
    }

    /// Builder form of [`add_file`](Self::add_file).
    pub fn with_file(mut self, name: impl Into<String>, content: impl Into<String>) -> Self {
        self.add_file(name, content);
        self
    }

    pub fn remove_file(&mut self, name: &str) -> Option<SourceFile> {
        self.files.remove(&name.to_uppercase())
    }

    pub fn clear(&mut self) {
        self.files.clear();
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl FileCatalog for MemoryCatalog {
    fn find(&self, name: &str) -> Option<&SourceFile> {
        self.files.get(&name.to_uppercase())
    }

    fn list(&self) -> Vec<&SourceFile> {
        let mut files: Vec<&SourceFile> = self.files.values().collect();
        files.sort_by(|a, b| a.name.to_uppercase().cmp(&b.name.to_uppercase()));
        files
    }
}
