use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::error::StoreError;
use crate::traits::{apply_patch, doc_key, Document, DocumentStore, Transaction, TxBody};

/// In-memory DocumentStore.
///
/// Transactions serialize on the store mutex, so every body runs against
/// a stable snapshot and commits atomically. Used by tests and by the
/// binary's `--mem` mode; data does not survive a restart.
#[derive(Default)]
pub struct MemoryDocStore {
    docs: Mutex<BTreeMap<String, Document>>,
}

impl MemoryDocStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Staged view used inside a transaction body. Writes land in `staged`
/// and only reach the base map when the body returns Ok.
struct MemTx<'a> {
    base: &'a BTreeMap<String, Document>,
    staged: BTreeMap<String, Option<Document>>,
}

impl Transaction for MemTx<'_> {
    fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let key = doc_key(collection, id);
        if let Some(staged) = self.staged.get(&key) {
            return Ok(staged.clone());
        }
        Ok(self.base.get(&key).cloned())
    }

    fn set(&mut self, collection: &str, id: &str, doc: &Document) -> Result<(), StoreError> {
        self.staged.insert(doc_key(collection, id), Some(doc.clone()));
        Ok(())
    }

    fn update(&mut self, collection: &str, id: &str, patch: &Document) -> Result<(), StoreError> {
        let key = doc_key(collection, id);
        let mut doc = self
            .get(collection, id)?
            .ok_or_else(|| StoreError::NotFound(key.clone()))?;
        apply_patch(&mut doc, patch)?;
        self.staged.insert(key, Some(doc));
        Ok(())
    }

    fn delete(&mut self, collection: &str, id: &str) -> Result<(), StoreError> {
        self.staged.insert(doc_key(collection, id), None);
        Ok(())
    }
}

impl DocumentStore for MemoryDocStore {
    fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let docs = self.docs.lock().unwrap();
        Ok(docs.get(&doc_key(collection, id)).cloned())
    }

    fn set(&self, collection: &str, id: &str, doc: &Document) -> Result<(), StoreError> {
        let mut docs = self.docs.lock().unwrap();
        docs.insert(doc_key(collection, id), doc.clone());
        Ok(())
    }

    fn update(&self, collection: &str, id: &str, patch: &Document) -> Result<(), StoreError> {
        let mut docs = self.docs.lock().unwrap();
        let key = doc_key(collection, id);
        let doc = docs
            .get_mut(&key)
            .ok_or_else(|| StoreError::NotFound(key.clone()))?;
        apply_patch(doc, patch)
    }

    fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let mut docs = self.docs.lock().unwrap();
        docs.remove(&doc_key(collection, id));
        Ok(())
    }

    fn scan(&self, collection: &str) -> Result<Vec<(String, Document)>, StoreError> {
        let docs = self.docs.lock().unwrap();
        let prefix = format!("{}/", collection);
        let mut result = Vec::new();
        for (key, doc) in docs.range(prefix.clone()..) {
            match key.strip_prefix(&prefix) {
                Some(id) => result.push((id.to_string(), doc.clone())),
                None => break,
            }
        }
        Ok(result)
    }

    fn run_transaction(&self, body: &mut TxBody<'_>) -> Result<(), StoreError> {
        // Writers serialize on the store mutex, so a body never observes a
        // concurrent write and Conflict retries do not arise here.
        let mut docs = self.docs.lock().unwrap();
        let mut tx = MemTx {
            base: &docs,
            staged: BTreeMap::new(),
        };
        body(&mut tx)?;
        let staged = tx.staged;
        for (key, doc) in staged {
            match doc {
                Some(doc) => {
                    docs.insert(key, doc);
                }
                None => {
                    docs.remove(&key);
                }
            }
        }
        Ok(())
    }
}
