pub mod error;
pub mod memory;
pub mod redb;
pub mod traits;

pub use error::StoreError;
pub use memory::MemoryDocStore;
pub use redb::RedbDocStore;
pub use traits::{Document, DocumentStore, Transaction, TxBody, MAX_TX_ATTEMPTS};
