//! Open-document store
//!
//! Full-text synchronization: every change replaces the document text.
//! Snapshots are cheap clones taken under the map shard lock only.

use dashmap::DashMap;
use tower_lsp::lsp_types::Url;

use crate::docmodel::Dialect;

#[derive(Debug, Clone)]
pub struct DocumentState {
    pub text: String,
    pub version: i32,
    pub dialect: Dialect,
}

#[derive(Debug, Default)]
pub struct DocumentStore {
    documents: DashMap<Url, DocumentState>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&self, uri: Url, text: String, version: i32) {
        let dialect = Dialect::for_path(uri.path());
        self.documents.insert(
            uri,
            DocumentState {
                text,
                version,
                dialect,
            },
        );
    }

    /// Replace the text of an open document. Returns false when the
    /// document is unknown.
    pub fn update(&self, uri: &Url, text: String, version: i32) -> bool {
        match self.documents.get_mut(uri) {
            Some(mut state) => {
                state.text = text;
                state.version = version;
                true
            }
            None => false,
        }
    }

    pub fn close(&self, uri: &Url) -> bool {
        self.documents.remove(uri).is_some()
    }

    pub fn snapshot(&self, uri: &Url) -> Option<DocumentState> {
        self.documents.get(uri).map(|state| state.value().clone())
    }

    pub fn version(&self, uri: &Url) -> Option<i32> {
        self.documents.get(uri).map(|state| state.version)
    }

    pub fn uris(&self) -> Vec<Url> {
        self.documents.iter().map(|e| e.key().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}
