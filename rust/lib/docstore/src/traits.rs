use crate::error::StoreError;

/// A stored document. All collections hold JSON objects; typed models
/// (de)serialize at the service layer.
pub type Document = serde_json::Value;

/// Number of times `run_transaction` re-runs a body that failed with
/// [`StoreError::Conflict`] before giving up.
pub const MAX_TX_ATTEMPTS: u32 = 5;

/// Operations available inside a transaction body.
///
/// Reads see a consistent snapshot; writes are staged and become visible
/// only when the transaction commits. Returning `Err` from the body
/// discards every staged write.
pub trait Transaction {
    /// Read a document. Sees the transaction's own staged writes.
    fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;

    /// Create or overwrite a document.
    fn set(&mut self, collection: &str, id: &str, doc: &Document) -> Result<(), StoreError>;

    /// Shallow-merge `patch` into an existing document: each top-level
    /// field of `patch` overwrites the stored field. Missing document is
    /// an error — use `set` to create.
    fn update(&mut self, collection: &str, id: &str, patch: &Document) -> Result<(), StoreError>;

    /// Delete a document. Deleting a missing document is a no-op.
    fn delete(&mut self, collection: &str, id: &str) -> Result<(), StoreError>;
}

/// The transaction body signature. The body may run more than once when
/// the backend retries on write conflict, so it must be re-entrant —
/// capture results through its environment, not by side effects outside
/// the store.
pub type TxBody<'a> = dyn FnMut(&mut dyn Transaction) -> Result<(), StoreError> + 'a;

/// Narrow document-store interface.
///
/// This is the only storage surface the engagement services consume.
/// Any store with per-document reads/writes and serializable, retryable
/// transactions can implement it; this crate ships an embedded redb
/// backend and an in-memory backend.
pub trait DocumentStore: Send + Sync {
    /// Read a single document outside any transaction.
    fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;

    /// Create or overwrite a single document outside any transaction.
    /// Last writer wins.
    fn set(&self, collection: &str, id: &str, doc: &Document) -> Result<(), StoreError>;

    /// Shallow-merge a patch into a single document outside any
    /// transaction. Missing document → `StoreError::NotFound`.
    fn update(&self, collection: &str, id: &str, patch: &Document) -> Result<(), StoreError>;

    /// Delete a single document outside any transaction. No-op if absent.
    fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError>;

    /// All documents in a collection, sorted by id.
    fn scan(&self, collection: &str) -> Result<Vec<(String, Document)>, StoreError>;

    /// Run `body` as a single atomic transaction. The body is re-run
    /// automatically on [`StoreError::Conflict`], up to
    /// [`MAX_TX_ATTEMPTS`] times. [`StoreError::Aborted`] is never
    /// retried and nothing is committed.
    fn run_transaction(&self, body: &mut TxBody<'_>) -> Result<(), StoreError>;
}

/// Shallow merge used by `update`: each top-level field of `patch`
/// overwrites the stored field. `null` removes the field.
pub(crate) fn apply_patch(base: &mut Document, patch: &Document) -> Result<(), StoreError> {
    let Some(base_obj) = base.as_object_mut() else {
        return Err(StoreError::Serialization("stored document is not an object".into()));
    };
    let Some(patch_obj) = patch.as_object() else {
        return Err(StoreError::Serialization("patch is not an object".into()));
    };
    for (key, value) in patch_obj {
        if value.is_null() {
            base_obj.remove(key);
        } else {
            base_obj.insert(key.clone(), value.clone());
        }
    }
    Ok(())
}

/// Encode a (collection, id) pair as a flat store key.
pub(crate) fn doc_key(collection: &str, id: &str) -> String {
    format!("{}/{}", collection, id)
}

/// Re-run `attempt` while it fails with [`StoreError::Conflict`], up to
/// [`MAX_TX_ATTEMPTS`] times. Any other outcome is returned as-is.
pub(crate) fn run_with_retry(
    mut attempt: impl FnMut() -> Result<(), StoreError>,
) -> Result<(), StoreError> {
    let mut last = String::new();
    for n in 1..=MAX_TX_ATTEMPTS {
        match attempt() {
            Err(StoreError::Conflict(msg)) => {
                tracing::debug!("transaction conflict (attempt {n}): {msg}");
                last = msg;
            }
            other => return other,
        }
    }
    Err(StoreError::Conflict(last))
}
