use serde_json::json;

use ticket_core::{Localizer, ServiceError};

use crate::model::{ReviewSyncReport, SyncReport};
use crate::store::{EngagementStore, PROFILES, REVIEWS};

/// Repairs denormalized counters from the authoritative records.
///
/// Increment/decrement under partial failure can drift a cached counter
/// from ground truth; this is the explicit repair path. Every operation
/// recomputes the authoritative count, overwrites the stored value
/// unconditionally, and reports the drift it found.
///
/// Idempotent and safe to run concurrently with itself: the overwrite is
/// a single-document write of an authoritative value, so last writer
/// wins and repeated runs converge — no transaction needed.
pub struct CounterReconciler {
    store: EngagementStore,
    i18n: std::sync::Arc<dyn Localizer>,
}

impl CounterReconciler {
    pub fn new(store: EngagementStore, i18n: std::sync::Arc<dyn Localizer>) -> Self {
        Self { store, i18n }
    }

    /// Recount the like records given by `uid` and overwrite the
    /// profile's `likedTicketsCount` with the result.
    pub fn reconcile_liked_count(&self, uid: &str) -> Result<SyncReport, ServiceError> {
        let profile = self.store.get_profile(uid)?.ok_or_else(|| {
            ServiceError::NotFound(self.i18n.t("error.profile.not_found", &[("id", uid)]))
        })?;

        let authoritative = self.store.count_likes_by_user(uid)?;
        self.store
            .patch(PROFILES, uid, &json!({"likedTicketsCount": authoritative}))?;

        let report = SyncReport::new(profile.liked_tickets_count, authoritative);
        if report.difference != 0 {
            tracing::info!(
                "likedTicketsCount for {uid} reconciled: {} -> {}",
                report.before,
                report.after,
            );
        }
        Ok(report)
    }

    /// Recount a review's likes and comments and overwrite both cached
    /// counters. Same mechanism as the liked-count repair, applied to
    /// the review side.
    pub fn reconcile_review_counters(
        &self,
        review_id: &str,
    ) -> Result<ReviewSyncReport, ServiceError> {
        let review = self.store.get_review(review_id)?.ok_or_else(|| {
            ServiceError::NotFound(self.i18n.t("error.review.not_found", &[("id", review_id)]))
        })?;

        let likes = self.store.count_likes_for_review(review_id)?;
        let comments = self.store.count_comments_for_review(review_id)?;
        self.store.patch(
            REVIEWS,
            review_id,
            &json!({"likeCount": likes, "commentsCount": comments}),
        )?;

        let report = ReviewSyncReport {
            like_count: SyncReport::new(review.like_count, likes),
            comments_count: SyncReport::new(review.comments_count, comments),
        };
        if report.like_count.difference != 0 || report.comments_count.difference != 0 {
            tracing::info!(
                "counters for review {review_id} reconciled: likes {} -> {}, comments {} -> {}",
                report.like_count.before,
                report.like_count.after,
                report.comments_count.before,
                report.comments_count.after,
            );
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use serde_json::json;
    use ticket_core::{new_id, now_rfc3339, DefaultLocalizer};
    use ticket_docstore::MemoryDocStore;

    use crate::model::{ActivityLevel, LikeRecord, Review, UserProfile};
    use crate::store::{like_id, LIKES};

    fn setup() -> (EngagementStore, CounterReconciler) {
        let store = EngagementStore::new(Arc::new(MemoryDocStore::new()));
        let reconciler = CounterReconciler::new(store.clone(), Arc::new(DefaultLocalizer));
        (store, reconciler)
    }

    fn seed_profile(store: &EngagementStore, uid: &str, liked: i64) {
        let now = now_rfc3339();
        let profile = UserProfile {
            uid: uid.into(),
            display_name: "kim".into(),
            biography: None,
            provider: None,
            photo_key: None,
            activity_level: ActivityLevel::Newbie,
            my_tickets_count: 0,
            liked_tickets_count: liked,
            created_at: now.clone(),
            updated_at: now,
        };
        store.put(PROFILES, uid, &profile).unwrap();
    }

    fn seed_like(store: &EngagementStore, review_id: &str, uid: &str) {
        let record = LikeRecord {
            review_id: review_id.into(),
            uid: uid.into(),
            created_at: now_rfc3339(),
        };
        store.put(LIKES, &like_id(review_id, uid), &record).unwrap();
    }

    fn seed_review(store: &EngagementStore, likes: i64, comments: i64) -> String {
        let id = new_id();
        let now = now_rfc3339();
        let review = Review {
            id: id.clone(),
            author_id: "u1".into(),
            movie_id: 1,
            movie_title: "m".into(),
            genre_ids: vec![],
            poster_path: None,
            title: "t".into(),
            content: "c".into(),
            rating: 4.0,
            like_count: likes,
            comments_count: comments,
            created_at: now.clone(),
            updated_at: now,
        };
        store.put(REVIEWS, &id, &review).unwrap();
        id
    }

    #[test]
    fn converges_from_arbitrary_drift() {
        let (store, reconciler) = setup();
        seed_like(&store, "r1", "u1");
        seed_like(&store, "r2", "u1");
        seed_like(&store, "r3", "other");

        // Wildly wrong cached values, including negative.
        for drifted in [-5i64, 0, 999] {
            seed_profile(&store, "u1", drifted);
            let report = reconciler.reconcile_liked_count("u1").unwrap();
            assert_eq!(report.before, drifted);
            assert_eq!(report.after, 2);
            assert_eq!(report.difference, 2 - drifted);

            let profile = store.get_profile("u1").unwrap().unwrap();
            assert_eq!(profile.liked_tickets_count, 2);
        }
    }

    #[test]
    fn second_run_reports_zero_difference() {
        let (store, reconciler) = setup();
        seed_profile(&store, "u1", 42);
        seed_like(&store, "r1", "u1");

        reconciler.reconcile_liked_count("u1").unwrap();
        let second = reconciler.reconcile_liked_count("u1").unwrap();
        assert_eq!(second.before, 1);
        assert_eq!(second.after, 1);
        assert_eq!(second.difference, 0);
    }

    #[test]
    fn overwrites_even_when_unchanged() {
        let (store, reconciler) = setup();
        seed_profile(&store, "u1", 1);
        seed_like(&store, "r1", "u1");

        // Tamper with an unrelated field to prove the write happened to
        // the counter only.
        store
            .patch(PROFILES, "u1", &json!({"biography": "bio"}))
            .unwrap();

        let report = reconciler.reconcile_liked_count("u1").unwrap();
        assert_eq!(report.difference, 0);
        let profile = store.get_profile("u1").unwrap().unwrap();
        assert_eq!(profile.liked_tickets_count, 1);
        assert_eq!(profile.biography.as_deref(), Some("bio"));
    }

    #[test]
    fn missing_profile_is_not_found() {
        let (_, reconciler) = setup();
        let err = reconciler.reconcile_liked_count("ghost").unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[test]
    fn review_counters_reconcile_both_fields() {
        let (store, reconciler) = setup();
        let review_id = seed_review(&store, 99, -3);
        seed_like(&store, &review_id, "u1");
        seed_like(&store, &review_id, "u2");

        let report = reconciler.reconcile_review_counters(&review_id).unwrap();
        assert_eq!(report.like_count.before, 99);
        assert_eq!(report.like_count.after, 2);
        assert_eq!(report.comments_count.before, -3);
        assert_eq!(report.comments_count.after, 0);

        let review = store.get_review(&review_id).unwrap().unwrap();
        assert_eq!(review.like_count, 2);
        assert_eq!(review.comments_count, 0);
    }

    #[test]
    fn missing_review_is_not_found() {
        let (_, reconciler) = setup();
        let err = reconciler.reconcile_review_counters("ghost").unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }
}
