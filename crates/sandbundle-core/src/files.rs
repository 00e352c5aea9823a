//! In-memory file table.
//!
//! Maps normalized virtual paths (no leading slash, `/` separators) to file
//! contents. Built once per build from caller-supplied content and read-only
//! afterwards.

use rustc_hash::FxHashMap as HashMap;

use crate::resolver::path::normalize;

/// The virtual file table for one build.
#[derive(Debug, Clone, Default)]
pub struct FileTable {
    /// Entries in insertion order.
    entries: Vec<(String, String)>,
    /// Key to index in `entries`.
    index: HashMap<String, usize>,
}

impl FileTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a file. The key is normalized; a repeated key replaces the
    /// content but keeps its original position.
    pub fn insert(&mut self, path: impl AsRef<str>, content: impl Into<String>) {
        let key = normalize(path.as_ref());
        let content = content.into();
        if let Some(&idx) = self.index.get(&key) {
            self.entries[idx].1 = content;
        } else {
            self.index.insert(key.clone(), self.entries.len());
            self.entries.push((key, content));
        }
    }

    /// Builder-style insert.
    pub fn with_file(mut self, path: impl AsRef<str>, content: impl Into<String>) -> Self {
        self.insert(path, content);
        self
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.index
            .get(key)
            .map(|&idx| self.entries[idx].1.as_str())
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for FileTable {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut table = Self::new();
        for (k, v) in iter {
            table.insert(k, v);
        }
        table
    }
}
