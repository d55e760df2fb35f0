use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableTable, TableDefinition};

use crate::error::StoreError;
use crate::traits::{
    apply_patch, doc_key, run_with_retry, Document, DocumentStore, Transaction, TxBody,
};

const DOCS: TableDefinition<&str, &[u8]> = TableDefinition::new("docs");

/// RedbDocStore is a DocumentStore backed by redb — a pure-Rust embedded
/// database with ACID transactions. Writers serialize on redb's single
/// write transaction, which gives the isolation the engine relies on.
pub struct RedbDocStore {
    db: Arc<Database>,
}

impl RedbDocStore {
    /// Open or create a redb database at the given path.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let db = Database::create(path).map_err(|e| StoreError::Storage(e.to_string()))?;

        // Ensure the table exists by doing a write transaction.
        let write_txn = db
            .begin_write()
            .map_err(|e| StoreError::Storage(e.to_string()))?;
        {
            let _table = write_txn
                .open_table(DOCS)
                .map_err(|e| StoreError::Storage(e.to_string()))?;
        }
        write_txn
            .commit()
            .map_err(|e| StoreError::Storage(e.to_string()))?;

        Ok(Self { db: Arc::new(db) })
    }
}

fn encode(doc: &Document) -> Result<Vec<u8>, StoreError> {
    serde_json::to_vec(doc).map_err(|e| StoreError::Serialization(e.to_string()))
}

fn decode(bytes: &[u8]) -> Result<Document, StoreError> {
    serde_json::from_slice(bytes).map_err(|e| StoreError::Serialization(e.to_string()))
}

impl DocumentStore for RedbDocStore {
    fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| StoreError::Storage(e.to_string()))?;
        let table = read_txn
            .open_table(DOCS)
            .map_err(|e| StoreError::Storage(e.to_string()))?;

        match table.get(doc_key(collection, id).as_str()) {
            Ok(Some(val)) => Ok(Some(decode(val.value())?)),
            Ok(None) => Ok(None),
            Err(e) => Err(StoreError::Storage(e.to_string())),
        }
    }

    fn set(&self, collection: &str, id: &str, doc: &Document) -> Result<(), StoreError> {
        let bytes = encode(doc)?;
        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| StoreError::Storage(e.to_string()))?;
        {
            let mut table = write_txn
                .open_table(DOCS)
                .map_err(|e| StoreError::Storage(e.to_string()))?;
            table
                .insert(doc_key(collection, id).as_str(), bytes.as_slice())
                .map_err(|e| StoreError::Storage(e.to_string()))?;
        }
        write_txn
            .commit()
            .map_err(|e| StoreError::Storage(e.to_string()))?;
        Ok(())
    }

    fn update(&self, collection: &str, id: &str, patch: &Document) -> Result<(), StoreError> {
        let key = doc_key(collection, id);
        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| StoreError::Storage(e.to_string()))?;
        {
            let mut table = write_txn
                .open_table(DOCS)
                .map_err(|e| StoreError::Storage(e.to_string()))?;

            let mut doc = match table.get(key.as_str()) {
                Ok(Some(val)) => decode(val.value())?,
                Ok(None) => return Err(StoreError::NotFound(key)),
                Err(e) => return Err(StoreError::Storage(e.to_string())),
            };
            apply_patch(&mut doc, patch)?;
            let bytes = encode(&doc)?;
            table
                .insert(key.as_str(), bytes.as_slice())
                .map_err(|e| StoreError::Storage(e.to_string()))?;
        }
        write_txn
            .commit()
            .map_err(|e| StoreError::Storage(e.to_string()))?;
        Ok(())
    }

    fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| StoreError::Storage(e.to_string()))?;
        {
            let mut table = write_txn
                .open_table(DOCS)
                .map_err(|e| StoreError::Storage(e.to_string()))?;
            table
                .remove(doc_key(collection, id).as_str())
                .map_err(|e| StoreError::Storage(e.to_string()))?;
        }
        write_txn
            .commit()
            .map_err(|e| StoreError::Storage(e.to_string()))?;
        Ok(())
    }

    fn scan(&self, collection: &str) -> Result<Vec<(String, Document)>, StoreError> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| StoreError::Storage(e.to_string()))?;
        let table = read_txn
            .open_table(DOCS)
            .map_err(|e| StoreError::Storage(e.to_string()))?;

        let prefix = format!("{}/", collection);
        let mut result = Vec::new();
        let range = table
            .range(prefix.as_str()..)
            .map_err(|e| StoreError::Storage(e.to_string()))?;
        for entry in range {
            let (key, val) = entry.map_err(|e| StoreError::Storage(e.to_string()))?;
            match key.value().strip_prefix(&prefix) {
                Some(id) => result.push((id.to_string(), decode(val.value())?)),
                None => break,
            }
        }
        Ok(result)
    }

    fn run_transaction(&self, body: &mut TxBody<'_>) -> Result<(), StoreError> {
        run_with_retry(|| {
            let write_txn = self
                .db
                .begin_write()
                .map_err(|e| StoreError::Storage(e.to_string()))?;

            let result = {
                let mut table = write_txn
                    .open_table(DOCS)
                    .map_err(|e| StoreError::Storage(e.to_string()))?;
                let mut tx = RedbTx { table: &mut table };
                body(&mut tx)
            };

            match result {
                Ok(()) => write_txn
                    .commit()
                    .map_err(|e| StoreError::Storage(e.to_string())),
                Err(e) => {
                    let _ = write_txn.abort();
                    Err(e)
                }
            }
        })
    }
}

/// Transaction view over the open redb write table.
struct RedbTx<'a, 'txn> {
    table: &'a mut redb::Table<'txn, &'static str, &'static [u8]>,
}

impl Transaction for RedbTx<'_, '_> {
    fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        match self.table.get(doc_key(collection, id).as_str()) {
            Ok(Some(val)) => Ok(Some(decode(val.value())?)),
            Ok(None) => Ok(None),
            Err(e) => Err(StoreError::Storage(e.to_string())),
        }
    }

    fn set(&mut self, collection: &str, id: &str, doc: &Document) -> Result<(), StoreError> {
        let bytes = encode(doc)?;
        self.table
            .insert(doc_key(collection, id).as_str(), bytes.as_slice())
            .map_err(|e| StoreError::Storage(e.to_string()))?;
        Ok(())
    }

    fn update(&mut self, collection: &str, id: &str, patch: &Document) -> Result<(), StoreError> {
        let key = doc_key(collection, id);
        let mut doc = self
            .get(collection, id)?
            .ok_or_else(|| StoreError::NotFound(key.clone()))?;
        apply_patch(&mut doc, patch)?;
        let bytes = encode(&doc)?;
        self.table
            .insert(key.as_str(), bytes.as_slice())
            .map_err(|e| StoreError::Storage(e.to_string()))?;
        Ok(())
    }

    fn delete(&mut self, collection: &str, id: &str) -> Result<(), StoreError> {
        self.table
            .remove(doc_key(collection, id).as_str())
            .map_err(|e| StoreError::Storage(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn test_store() -> (RedbDocStore, tempfile::NamedTempFile) {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let store = RedbDocStore::open(tmp.path()).unwrap();
        (store, tmp)
    }

    #[test]
    fn set_get_roundtrip() {
        let (store, _tmp) = test_store();
        store.set("reviews", "r1", &json!({"title": "Oldboy"})).unwrap();
        let doc = store.get("reviews", "r1").unwrap().unwrap();
        assert_eq!(doc["title"], "Oldboy");
        assert!(store.get("reviews", "missing").unwrap().is_none());
    }

    #[test]
    fn update_patches_fields() {
        let (store, _tmp) = test_store();
        store.set("profiles", "u1", &json!({"likedTicketsCount": 0, "displayName": "kim"})).unwrap();
        store.update("profiles", "u1", &json!({"likedTicketsCount": 7})).unwrap();
        let doc = store.get("profiles", "u1").unwrap().unwrap();
        assert_eq!(doc["likedTicketsCount"], 7);
        assert_eq!(doc["displayName"], "kim");
    }

    #[test]
    fn scan_is_sorted_and_prefix_isolated() {
        let (store, _tmp) = test_store();
        store.set("likes", "r1:u2", &json!({"uid": "u2"})).unwrap();
        store.set("likes", "r1:u1", &json!({"uid": "u1"})).unwrap();
        store.set("likes2", "x", &json!({})).unwrap();

        let rows = store.scan("likes").unwrap();
        let ids: Vec<_> = rows.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["r1:u1", "r1:u2"]);
    }

    #[test]
    fn transaction_commits_atomically() {
        let (store, _tmp) = test_store();
        store.set("reviews", "r1", &json!({"likeCount": 0})).unwrap();

        store
            .run_transaction(&mut |tx| {
                tx.set("likes", "r1:u1", &json!({"uid": "u1"}))?;
                tx.update("reviews", "r1", &json!({"likeCount": 1}))?;
                Ok(())
            })
            .unwrap();

        assert_eq!(store.get("reviews", "r1").unwrap().unwrap()["likeCount"], 1);
        assert!(store.get("likes", "r1:u1").unwrap().is_some());
    }

    #[test]
    fn aborted_transaction_leaves_no_trace() {
        let (store, _tmp) = test_store();
        store.set("reviews", "r1", &json!({"likeCount": 0})).unwrap();

        let err = store
            .run_transaction(&mut |tx| {
                tx.update("reviews", "r1", &json!({"likeCount": 1}))?;
                Err(StoreError::Aborted("already liked".into()))
            })
            .unwrap_err();

        assert!(matches!(err, StoreError::Aborted(_)));
        assert_eq!(store.get("reviews", "r1").unwrap().unwrap()["likeCount"], 0);
    }
}
