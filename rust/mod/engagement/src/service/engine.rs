use std::sync::Arc;

use serde_json::json;

use ticket_auth::{AuthGate, Principal};
use ticket_core::{new_id, now_rfc3339, Localizer, ServiceError};
use ticket_docstore::StoreError;

use crate::model::{
    ActivityLevel, Comment, CreateComment, CreateReview, LikeRecord, Review, UpdateComment,
    UpdateProfile, UpdateReview, UserProfile,
};
use crate::service::propagator::ActivityPropagator;
use crate::store::{
    like_id, tx_from_doc, tx_to_doc, EngagementStore, COMMENTS, LIKES, PROFILES, REVIEWS,
};

/// The engagement transaction engine.
///
/// Every mutation is one store transaction pairing the primary write
/// with its denormalized counter update. Validation and ownership
/// checks run before the transaction and short-circuit without
/// consuming an attempt; business rejections discovered inside the
/// body (a like record that already exists) abort the transaction and
/// surface with their own status, not as 500s.
pub struct EngagementEngine {
    store: EngagementStore,
    gate: Arc<AuthGate>,
    propagator: Arc<ActivityPropagator>,
    i18n: Arc<dyn Localizer>,
}

impl EngagementEngine {
    pub fn new(
        store: EngagementStore,
        gate: Arc<AuthGate>,
        propagator: Arc<ActivityPropagator>,
        i18n: Arc<dyn Localizer>,
    ) -> Self {
        Self {
            store,
            gate,
            propagator,
            i18n,
        }
    }

    // =======================================================================
    // Comments
    // =======================================================================

    /// Create a comment under a review. Returns the new comment id.
    ///
    /// The author snapshot is read before the transaction; a failed
    /// profile lookup falls back to the anonymous defaults and never
    /// blocks the comment.
    pub fn create_comment(
        &self,
        review_id: &str,
        principal: &Principal,
        input: CreateComment,
    ) -> Result<String, ServiceError> {
        let content = input.content.trim();
        if content.is_empty() {
            return Err(ServiceError::InvalidArgument(
                self.i18n.t("error.comment.content_required", &[]),
            ));
        }
        if let Some(author_id) = &input.author_id {
            self.gate.verify_ownership(&principal.uid, author_id)?;
        }

        // Existence probe — a plain 404 must not consume a transaction
        // attempt.
        if self.store.get_review(review_id)?.is_none() {
            return Err(self.review_not_found(review_id));
        }

        let (display_name, photo_key, activity_level) = self.author_snapshot(&principal.uid);
        let now = now_rfc3339();
        let comment = Comment {
            id: new_id(),
            review_id: review_id.to_string(),
            author_id: principal.uid.clone(),
            content: content.to_string(),
            display_name,
            photo_key,
            activity_level,
            created_at: now.clone(),
            updated_at: now,
        };

        let comment_id = comment.id.clone();
        let mut failure: Option<ServiceError> = None;
        let result = self.store.transaction(&mut |tx| {
            let Some(doc) = tx.get(REVIEWS, review_id)? else {
                // The review vanished between the probe and the
                // transaction — a race the caller sees as a 500.
                tracing::error!("review {review_id} disappeared during comment create");
                failure = Some(ServiceError::Internal(self.i18n.t("error.internal", &[])));
                return Err(StoreError::Aborted("review missing".into()));
            };
            let review: Review = tx_from_doc(doc)?;
            tx.set(COMMENTS, &comment.id, &tx_to_doc(&comment)?)?;
            tx.update(
                REVIEWS,
                review_id,
                &json!({"commentsCount": review.comments_count + 1}),
            )?;
            Ok(())
        });
        self.finish_tx("create_comment", review_id, result, &mut failure)?;

        self.propagator.dispatch(&principal.uid);
        Ok(comment_id)
    }

    /// Comments for one review, oldest first. Public.
    pub fn list_comments(&self, review_id: &str) -> Result<Vec<Comment>, ServiceError> {
        self.store.comments_for_review(review_id)
    }

    /// Update a comment's content. Owner only.
    pub fn update_comment(
        &self,
        review_id: &str,
        comment_id: &str,
        principal: &Principal,
        input: UpdateComment,
    ) -> Result<(), ServiceError> {
        let content = input.content.trim();
        if content.is_empty() {
            return Err(ServiceError::InvalidArgument(
                self.i18n.t("error.comment.content_required", &[]),
            ));
        }

        let comment = self.owned_comment(review_id, comment_id, principal)?;

        let mut failure: Option<ServiceError> = None;
        let content = content.to_string();
        let result = self.store.transaction(&mut |tx| {
            if tx.get(COMMENTS, &comment.id)?.is_none() {
                failure = Some(self.comment_not_found(&comment.id));
                return Err(StoreError::Aborted("comment missing".into()));
            }
            tx.update(
                COMMENTS,
                &comment.id,
                &json!({"content": content, "updatedAt": now_rfc3339()}),
            )?;
            Ok(())
        });
        self.finish_tx("update_comment", comment_id, result, &mut failure)
    }

    /// Delete a comment and decrement the parent review's counter.
    pub fn delete_comment(
        &self,
        review_id: &str,
        comment_id: &str,
        principal: &Principal,
    ) -> Result<(), ServiceError> {
        let comment = self.owned_comment(review_id, comment_id, principal)?;

        let mut failure: Option<ServiceError> = None;
        let result = self.store.transaction(&mut |tx| {
            if tx.get(COMMENTS, &comment.id)?.is_none() {
                failure = Some(self.comment_not_found(&comment.id));
                return Err(StoreError::Aborted("comment missing".into()));
            }
            tx.delete(COMMENTS, &comment.id)?;
            // A concurrently-deleted review just means no counter to fix.
            if let Some(doc) = tx.get(REVIEWS, review_id)? {
                let review: Review = tx_from_doc(doc)?;
                tx.update(
                    REVIEWS,
                    review_id,
                    &json!({"commentsCount": (review.comments_count - 1).max(0)}),
                )?;
            }
            Ok(())
        });
        self.finish_tx("delete_comment", comment_id, result, &mut failure)?;

        self.propagator.dispatch(&principal.uid);
        Ok(())
    }

    // =======================================================================
    // Likes
    // =======================================================================

    /// Like a review. Returns the new like count.
    ///
    /// Duplicate likes are rejected with 409 rather than silently
    /// ignored — the client applied the increment optimistically and a
    /// silent no-op would desynchronize it.
    pub fn like(&self, review_id: &str, uid: &str) -> Result<i64, ServiceError> {
        if self.store.get_review(review_id)?.is_none() {
            return Err(self.review_not_found(review_id));
        }

        let record = LikeRecord {
            review_id: review_id.to_string(),
            uid: uid.to_string(),
            created_at: now_rfc3339(),
        };
        let record_id = like_id(review_id, uid);

        let mut new_count = 0i64;
        let mut failure: Option<ServiceError> = None;
        let result = self.store.transaction(&mut |tx| {
            // The duplicate check must live inside the transaction:
            // two concurrent likes for the same pair race to it, and
            // exactly one may win.
            if tx.get(LIKES, &record_id)?.is_some() {
                failure = Some(ServiceError::Conflict(
                    self.i18n.t("error.like.already_liked", &[]),
                ));
                return Err(StoreError::Aborted("already liked".into()));
            }
            let Some(doc) = tx.get(REVIEWS, review_id)? else {
                tracing::error!("review {review_id} disappeared during like");
                failure = Some(ServiceError::Internal(self.i18n.t("error.internal", &[])));
                return Err(StoreError::Aborted("review missing".into()));
            };
            let review: Review = tx_from_doc(doc)?;
            new_count = review.like_count + 1;

            tx.set(LIKES, &record_id, &tx_to_doc(&record)?)?;
            tx.update(REVIEWS, review_id, &json!({"likeCount": new_count}))?;

            // A missing profile skips the per-user counter; the
            // reconciler is the repair path for the resulting drift.
            if let Some(doc) = tx.get(PROFILES, uid)? {
                let profile: UserProfile = tx_from_doc(doc)?;
                tx.update(
                    PROFILES,
                    uid,
                    &json!({"likedTicketsCount": profile.liked_tickets_count + 1}),
                )?;
            }
            Ok(())
        });
        self.finish_tx("like", review_id, result, &mut failure)?;

        self.propagator.dispatch(uid);
        Ok(new_count)
    }

    /// Remove a like. Unliking without a prior like is 409.
    pub fn unlike(&self, review_id: &str, uid: &str) -> Result<(), ServiceError> {
        let record_id = like_id(review_id, uid);
        if self.store.get_like(review_id, uid)?.is_none() {
            return Err(ServiceError::Conflict(
                self.i18n.t("error.like.not_liked", &[]),
            ));
        }

        let mut failure: Option<ServiceError> = None;
        let result = self.store.transaction(&mut |tx| {
            // Re-checked inside the transaction for the concurrent
            // double-unlike race.
            if tx.get(LIKES, &record_id)?.is_none() {
                failure = Some(ServiceError::Conflict(
                    self.i18n.t("error.like.not_liked", &[]),
                ));
                return Err(StoreError::Aborted("not liked".into()));
            }
            tx.delete(LIKES, &record_id)?;

            if let Some(doc) = tx.get(REVIEWS, review_id)? {
                let review: Review = tx_from_doc(doc)?;
                tx.update(
                    REVIEWS,
                    review_id,
                    &json!({"likeCount": (review.like_count - 1).max(0)}),
                )?;
            }
            if let Some(doc) = tx.get(PROFILES, uid)? {
                let profile: UserProfile = tx_from_doc(doc)?;
                tx.update(
                    PROFILES,
                    uid,
                    &json!({"likedTicketsCount": (profile.liked_tickets_count - 1).max(0)}),
                )?;
            }
            Ok(())
        });
        self.finish_tx("unlike", review_id, result, &mut failure)?;

        self.propagator.dispatch(uid);
        Ok(())
    }

    // =======================================================================
    // Reviews
    // =======================================================================

    /// Create a review. Returns the new review id.
    pub fn create_review(
        &self,
        principal: &Principal,
        input: CreateReview,
    ) -> Result<String, ServiceError> {
        let title = input.title.trim();
        if title.is_empty() {
            return Err(ServiceError::InvalidArgument(
                self.i18n.t("error.review.title_required", &[]),
            ));
        }
        let content = input.content.trim();
        if content.is_empty() {
            return Err(ServiceError::InvalidArgument(
                self.i18n.t("error.review.content_required", &[]),
            ));
        }
        if !(0.5..=5.0).contains(&input.rating) {
            return Err(ServiceError::InvalidArgument(
                self.i18n.t("error.review.rating_range", &[]),
            ));
        }

        let now = now_rfc3339();
        let review = Review {
            id: new_id(),
            author_id: principal.uid.clone(),
            movie_id: input.movie_id,
            movie_title: input.movie_title,
            genre_ids: input.genre_ids,
            poster_path: input.poster_path,
            title: title.to_string(),
            content: content.to_string(),
            rating: input.rating,
            like_count: 0,
            comments_count: 0,
            created_at: now.clone(),
            updated_at: now,
        };

        let review_id = review.id.clone();
        let uid = principal.uid.clone();
        let mut failure: Option<ServiceError> = None;
        let result = self.store.transaction(&mut |tx| {
            tx.set(REVIEWS, &review.id, &tx_to_doc(&review)?)?;
            if let Some(doc) = tx.get(PROFILES, &uid)? {
                let profile: UserProfile = tx_from_doc(doc)?;
                tx.update(
                    PROFILES,
                    &uid,
                    &json!({"myTicketsCount": profile.my_tickets_count + 1}),
                )?;
            }
            Ok(())
        });
        self.finish_tx("create_review", &review_id, result, &mut failure)?;

        self.propagator.dispatch(&principal.uid);
        Ok(review_id)
    }

    /// Fetch one review. Public.
    pub fn get_review(&self, review_id: &str) -> Result<Review, ServiceError> {
        self.store
            .get_review(review_id)?
            .ok_or_else(|| self.review_not_found(review_id))
    }

    /// Update a review's content fields. Owner only.
    pub fn update_review(
        &self,
        review_id: &str,
        principal: &Principal,
        input: UpdateReview,
    ) -> Result<(), ServiceError> {
        let review = self.owned_review(review_id, principal)?;

        let mut patch = serde_json::Map::new();
        if let Some(title) = &input.title {
            if title.trim().is_empty() {
                return Err(ServiceError::InvalidArgument(
                    self.i18n.t("error.review.title_required", &[]),
                ));
            }
            patch.insert("title".into(), json!(title.trim()));
        }
        if let Some(content) = &input.content {
            if content.trim().is_empty() {
                return Err(ServiceError::InvalidArgument(
                    self.i18n.t("error.review.content_required", &[]),
                ));
            }
            patch.insert("content".into(), json!(content.trim()));
        }
        if let Some(rating) = input.rating {
            if !(0.5..=5.0).contains(&rating) {
                return Err(ServiceError::InvalidArgument(
                    self.i18n.t("error.review.rating_range", &[]),
                ));
            }
            patch.insert("rating".into(), json!(rating));
        }
        patch.insert("updatedAt".into(), json!(now_rfc3339()));
        let patch = serde_json::Value::Object(patch);

        let mut failure: Option<ServiceError> = None;
        let result = self.store.transaction(&mut |tx| {
            if tx.get(REVIEWS, &review.id)?.is_none() {
                failure = Some(self.review_not_found(&review.id));
                return Err(StoreError::Aborted("review missing".into()));
            }
            tx.update(REVIEWS, &review.id, &patch)?;
            Ok(())
        });
        self.finish_tx("update_review", review_id, result, &mut failure)
    }

    /// Delete a review with its comments and like records, and repair
    /// the author's ticket count.
    ///
    /// The likers' per-user counters are intentionally left behind —
    /// that drift is the liked-count reconciler's territory.
    pub fn delete_review(
        &self,
        review_id: &str,
        principal: &Principal,
    ) -> Result<(), ServiceError> {
        let review = self.owned_review(review_id, principal)?;

        let comment_ids: Vec<String> = self
            .store
            .comments_for_review(review_id)?
            .into_iter()
            .map(|c| c.id)
            .collect();
        let like_ids = self.store.like_ids_for_review(review_id)?;
        let uid = review.author_id.clone();

        let mut failure: Option<ServiceError> = None;
        let result = self.store.transaction(&mut |tx| {
            if tx.get(REVIEWS, review_id)?.is_none() {
                failure = Some(self.review_not_found(review_id));
                return Err(StoreError::Aborted("review missing".into()));
            }
            tx.delete(REVIEWS, review_id)?;
            for id in &comment_ids {
                tx.delete(COMMENTS, id)?;
            }
            for id in &like_ids {
                tx.delete(LIKES, id)?;
            }
            if let Some(doc) = tx.get(PROFILES, &uid)? {
                let profile: UserProfile = tx_from_doc(doc)?;
                tx.update(
                    PROFILES,
                    &uid,
                    &json!({"myTicketsCount": (profile.my_tickets_count - 1).max(0)}),
                )?;
            }
            Ok(())
        });
        self.finish_tx("delete_review", review_id, result, &mut failure)?;

        self.propagator.dispatch(&principal.uid);
        Ok(())
    }

    // =======================================================================
    // Profiles
    // =======================================================================

    /// Fetch one profile. Public.
    pub fn get_profile(&self, uid: &str) -> Result<UserProfile, ServiceError> {
        self.store.get_profile(uid)?.ok_or_else(|| {
            ServiceError::NotFound(self.i18n.t("error.profile.not_found", &[("id", uid)]))
        })
    }

    /// Update profile fields. Self only; derived fields are not
    /// client-writable.
    pub fn update_profile(
        &self,
        uid: &str,
        principal: &Principal,
        input: UpdateProfile,
    ) -> Result<UserProfile, ServiceError> {
        self.gate.verify_ownership(&principal.uid, uid)?;
        if self.store.get_profile(uid)?.is_none() {
            return Err(ServiceError::NotFound(
                self.i18n.t("error.profile.not_found", &[("id", uid)]),
            ));
        }

        let mut patch = serde_json::Map::new();
        if let Some(name) = &input.display_name {
            if name.trim().is_empty() {
                return Err(ServiceError::InvalidArgument(
                    self.i18n.t("error.profile.name_required", &[]),
                ));
            }
            patch.insert("displayName".into(), json!(name.trim()));
        }
        if let Some(biography) = &input.biography {
            patch.insert("biography".into(), json!(biography));
        }
        if let Some(photo_key) = &input.photo_key {
            patch.insert("photoKey".into(), json!(photo_key));
        }
        patch.insert("updatedAt".into(), json!(now_rfc3339()));

        self.store
            .patch(PROFILES, uid, &serde_json::Value::Object(patch))?;
        self.get_profile(uid)
    }

    // =======================================================================
    // Helpers
    // =======================================================================

    /// Author display snapshot for a new comment. Lookup failure never
    /// blocks the comment — fall back to the anonymous defaults.
    fn author_snapshot(&self, uid: &str) -> (String, Option<String>, ActivityLevel) {
        match self.store.get_profile(uid) {
            Ok(Some(profile)) => (
                profile.display_name,
                profile.photo_key,
                profile.activity_level,
            ),
            Ok(None) => (
                self.i18n.t("label.profile.anonymous", &[]),
                None,
                ActivityLevel::default(),
            ),
            Err(e) => {
                tracing::warn!("author profile read failed for {uid}: {e}");
                (
                    self.i18n.t("label.profile.anonymous", &[]),
                    None,
                    ActivityLevel::default(),
                )
            }
        }
    }

    /// Load a review and verify the principal owns it. The owner is the
    /// stored field, never anything the client sent.
    fn owned_review(&self, review_id: &str, principal: &Principal) -> Result<Review, ServiceError> {
        let review = self
            .store
            .get_review(review_id)?
            .ok_or_else(|| self.review_not_found(review_id))?;
        self.gate.verify_ownership(&principal.uid, &review.author_id)?;
        Ok(review)
    }

    /// Load a comment, check it belongs to the addressed review, and
    /// verify ownership against the stored author.
    fn owned_comment(
        &self,
        review_id: &str,
        comment_id: &str,
        principal: &Principal,
    ) -> Result<Comment, ServiceError> {
        let comment = self
            .store
            .get_comment(comment_id)?
            .filter(|c| c.review_id == review_id)
            .ok_or_else(|| self.comment_not_found(comment_id))?;
        self.gate.verify_ownership(&principal.uid, &comment.author_id)?;
        Ok(comment)
    }

    /// Translate a transaction result: aborts carry the business error
    /// captured by the body; anything else is an internal failure.
    fn finish_tx(
        &self,
        op: &str,
        resource_id: &str,
        result: Result<(), StoreError>,
        failure: &mut Option<ServiceError>,
    ) -> Result<(), ServiceError> {
        match result {
            Ok(()) => Ok(()),
            Err(StoreError::Aborted(reason)) => Err(failure.take().unwrap_or_else(|| {
                tracing::error!("{op} aborted without captured failure: {reason}");
                ServiceError::Internal(self.i18n.t("error.internal", &[]))
            })),
            Err(e) => {
                tracing::error!("{op} transaction failed for {resource_id}: {e}");
                Err(ServiceError::Internal(self.i18n.t("error.internal", &[])))
            }
        }
    }

    fn review_not_found(&self, review_id: &str) -> ServiceError {
        ServiceError::NotFound(self.i18n.t("error.review.not_found", &[("id", review_id)]))
    }

    fn comment_not_found(&self, comment_id: &str) -> ServiceError {
        ServiceError::NotFound(self.i18n.t("error.comment.not_found", &[("id", comment_id)]))
    }
}
