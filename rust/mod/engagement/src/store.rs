use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use ticket_core::ServiceError;
use ticket_docstore::{Document, DocumentStore, StoreError, TxBody};

use crate::model::{Comment, LikeRecord, Review, UserProfile};

/// Collection names.
pub const REVIEWS: &str = "reviews";
pub const COMMENTS: &str = "comments";
pub const LIKES: &str = "likes";
pub const PROFILES: &str = "profiles";

/// Composite like-record id.
pub fn like_id(review_id: &str, uid: &str) -> String {
    format!("{}:{}", review_id, uid)
}

/// Serialize a typed model into a stored document.
pub fn to_doc<T: Serialize>(value: &T) -> Result<Document, ServiceError> {
    serde_json::to_value(value).map_err(|e| ServiceError::Internal(e.to_string()))
}

/// Deserialize a stored document into a typed model.
pub fn from_doc<T: DeserializeOwned>(doc: Document) -> Result<T, ServiceError> {
    serde_json::from_value(doc).map_err(|e| ServiceError::Internal(e.to_string()))
}

/// Map a backend failure outside a transaction.
pub fn storage_err(e: StoreError) -> ServiceError {
    ServiceError::Storage(e.to_string())
}

/// Serialize a typed model inside a transaction body.
pub fn tx_to_doc<T: Serialize>(value: &T) -> Result<Document, StoreError> {
    serde_json::to_value(value).map_err(|e| StoreError::Serialization(e.to_string()))
}

/// Deserialize a stored document inside a transaction body.
pub fn tx_from_doc<T: DeserializeOwned>(doc: Document) -> Result<T, StoreError> {
    serde_json::from_value(doc).map_err(|e| StoreError::Serialization(e.to_string()))
}

/// Typed storage access for the engagement collections, backed by the
/// narrow DocumentStore interface. Single-document reads/writes and
/// scans live here; the engine composes the transactional paths itself.
#[derive(Clone)]
pub struct EngagementStore {
    store: Arc<dyn DocumentStore>,
}

impl EngagementStore {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Run a transaction against the underlying store.
    pub fn transaction(&self, body: &mut TxBody<'_>) -> Result<(), StoreError> {
        self.store.run_transaction(body)
    }

    // -----------------------------------------------------------------------
    // Single-document reads
    // -----------------------------------------------------------------------

    pub fn get_review(&self, id: &str) -> Result<Option<Review>, ServiceError> {
        self.get(REVIEWS, id)
    }

    pub fn get_comment(&self, id: &str) -> Result<Option<Comment>, ServiceError> {
        self.get(COMMENTS, id)
    }

    pub fn get_profile(&self, uid: &str) -> Result<Option<UserProfile>, ServiceError> {
        self.get(PROFILES, uid)
    }

    pub fn get_like(&self, review_id: &str, uid: &str) -> Result<Option<LikeRecord>, ServiceError> {
        self.get(LIKES, &like_id(review_id, uid))
    }

    fn get<T: DeserializeOwned>(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<T>, ServiceError> {
        match self.store.get(collection, id).map_err(storage_err)? {
            Some(doc) => Ok(Some(from_doc(doc)?)),
            None => Ok(None),
        }
    }

    // -----------------------------------------------------------------------
    // Single-document writes (non-transactional)
    // -----------------------------------------------------------------------

    /// Overwrite a document. Last writer wins — the reconciler's
    /// convergence mechanism relies on exactly this.
    pub fn put<T: Serialize>(
        &self,
        collection: &str,
        id: &str,
        value: &T,
    ) -> Result<(), ServiceError> {
        self.store
            .set(collection, id, &to_doc(value)?)
            .map_err(storage_err)
    }

    /// Patch fields of one document.
    pub fn patch(
        &self,
        collection: &str,
        id: &str,
        patch: &Document,
    ) -> Result<(), ServiceError> {
        self.store.update(collection, id, patch).map_err(|e| match e {
            StoreError::NotFound(m) => ServiceError::NotFound(m),
            other => storage_err(other),
        })
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Comments for one review, ascending by creation time.
    pub fn comments_for_review(&self, review_id: &str) -> Result<Vec<Comment>, ServiceError> {
        let mut comments: Vec<Comment> = self
            .scan_typed::<Comment>(COMMENTS)?
            .into_iter()
            .filter(|c| c.review_id == review_id)
            .collect();
        comments.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(comments)
    }

    /// Every comment authored by `uid`, with document ids (fan-out set).
    pub fn comments_by_author(&self, uid: &str) -> Result<Vec<Comment>, ServiceError> {
        Ok(self
            .scan_typed::<Comment>(COMMENTS)?
            .into_iter()
            .filter(|c| c.author_id == uid)
            .collect())
    }

    /// Authoritative count of likes given by `uid`.
    pub fn count_likes_by_user(&self, uid: &str) -> Result<i64, ServiceError> {
        Ok(self
            .scan_typed::<LikeRecord>(LIKES)?
            .iter()
            .filter(|l| l.uid == uid)
            .count() as i64)
    }

    /// Authoritative count of likes on one review.
    pub fn count_likes_for_review(&self, review_id: &str) -> Result<i64, ServiceError> {
        Ok(self
            .scan_typed::<LikeRecord>(LIKES)?
            .iter()
            .filter(|l| l.review_id == review_id)
            .count() as i64)
    }

    /// Authoritative count of comments on one review.
    pub fn count_comments_for_review(&self, review_id: &str) -> Result<i64, ServiceError> {
        Ok(self
            .scan_typed::<Comment>(COMMENTS)?
            .iter()
            .filter(|c| c.review_id == review_id)
            .count() as i64)
    }

    /// Authoritative count of reviews authored by `uid`.
    pub fn count_reviews_by_author(&self, uid: &str) -> Result<i64, ServiceError> {
        Ok(self
            .scan_typed::<Review>(REVIEWS)?
            .iter()
            .filter(|r| r.author_id == uid)
            .count() as i64)
    }

    /// Like record ids for one review (cascade-delete set).
    pub fn like_ids_for_review(&self, review_id: &str) -> Result<Vec<String>, ServiceError> {
        Ok(self
            .scan_typed::<LikeRecord>(LIKES)?
            .iter()
            .filter(|l| l.review_id == review_id)
            .map(|l| like_id(&l.review_id, &l.uid))
            .collect())
    }

    fn scan_typed<T: DeserializeOwned>(&self, collection: &str) -> Result<Vec<T>, ServiceError> {
        self.store
            .scan(collection)
            .map_err(storage_err)?
            .into_iter()
            .map(|(_, doc)| from_doc(doc))
            .collect()
    }
}
