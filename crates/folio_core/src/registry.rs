//! Document registry: document key to session, one lock per document.
//!
//! The key map sits behind a `RwLock` that is only held long enough to look
//! up or insert an entry. Edits then take the document's own `Mutex`, so work
//! on different documents runs concurrently while edits to one document are
//! serialised. Entries live until [`DocumentRegistry::clear`] is called.

use crate::builder::DocumentSession;
use folio_common::{FolioError, Result};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

pub type SharedSession = Arc<Mutex<DocumentSession>>;

#[derive(Debug, Default)]
pub struct DocumentRegistry {
    documents: RwLock<HashMap<String, SharedSession>>,
}

impl DocumentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `session` under `key`. An existing entry is never replaced.
    pub fn create(&self, key: &str, session: DocumentSession) -> Result<SharedSession> {
        let mut documents = self.documents.write().unwrap_or_else(PoisonError::into_inner);
        if documents.contains_key(key) {
            return Err(FolioError::AlreadyExists(format!(
                "document-key: {} is already in the cache",
                key
            )));
        }

        let shared = Arc::new(Mutex::new(session));
        documents.insert(key.to_string(), Arc::clone(&shared));
        tracing::info!("Registered document {} ({} cached)", key, documents.len());
        Ok(shared)
    }

    pub fn get(&self, key: &str) -> Result<SharedSession> {
        let documents = self.documents.read().unwrap_or_else(PoisonError::into_inner);
        match documents.get(key) {
            Some(shared) => Ok(Arc::clone(shared)),
            None => {
                let mut known: Vec<String> = documents.keys().cloned().collect();
                known.sort();
                Err(FolioError::unknown_document(key, known))
            }
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.documents
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(key)
    }

    /// Registered keys, sorted
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .documents
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.documents
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Evicts every document. Returns how many were removed.
    pub fn clear(&self) -> usize {
        let mut documents = self.documents.write().unwrap_or_else(PoisonError::into_inner);
        let evicted = documents.len();
        documents.clear();
        tracing::info!("Evicted {} documents", evicted);
        evicted
    }

    /// Runs `f` while holding the exclusive lock of the document at `key`
    pub fn with_session<T>(
        &self,
        key: &str,
        f: impl FnOnce(&mut DocumentSession) -> Result<T>,
    ) -> Result<T> {
        let shared = self.get(key)?;
        let mut session = shared.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut session)
    }
}
