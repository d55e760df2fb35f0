use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    /// Write conflict with a concurrent transaction. `run_transaction`
    /// retries these automatically; callers only see one after the
    /// attempt budget is exhausted.
    #[error("write conflict: {0}")]
    Conflict(String),

    /// The transaction body requested an abort. Never retried; nothing
    /// is committed. The message is the business-level rejection.
    #[error("{0}")]
    Aborted(String),

    /// Document does not exist.
    #[error("document not found: {0}")]
    NotFound(String),

    /// Document bytes are not valid JSON.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Backend failure.
    #[error("storage error: {0}")]
    Storage(String),
}
