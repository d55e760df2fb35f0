use std::sync::Arc;

use serde_json::json;

use ticket_core::ServiceError;

use crate::model::ActivityLevel;
use crate::store::{EngagementStore, COMMENTS, PROFILES};

/// Outcome of one recompute run. Returned for observability and tests;
/// callers on the request path never see it — they fire and forget.
#[derive(Debug, Clone, Copy)]
pub struct PropagationReport {
    pub level: ActivityLevel,
    pub changed: bool,
    /// Denormalized comment copies rewritten.
    pub fanned_out: usize,
    /// Fan-out writes that failed (logged, not retried).
    pub failed: usize,
}

/// Recomputes a user's activity tier from the authoritative engagement
/// records and fans a changed tier out to the denormalized copies on
/// that user's comments.
///
/// The fan-out is eventually consistent by design: it is not
/// transactional with the write that triggered it, may partially fail,
/// and is logged rather than retried.
pub struct ActivityPropagator {
    store: EngagementStore,
}

impl ActivityPropagator {
    pub fn new(store: EngagementStore) -> Self {
        Self { store }
    }

    /// Recompute the tier for `uid` and propagate a change.
    ///
    /// The engagement score is reviews authored plus likes given, both
    /// counted from the authoritative records — not from the cached
    /// profile counters, which may be drifting.
    pub fn recompute(&self, uid: &str) -> Result<PropagationReport, ServiceError> {
        let Some(profile) = self.store.get_profile(uid)? else {
            // No profile yet — nothing to update.
            return Ok(PropagationReport {
                level: ActivityLevel::default(),
                changed: false,
                fanned_out: 0,
                failed: 0,
            });
        };

        let score = self.store.count_reviews_by_author(uid)?
            + self.store.count_likes_by_user(uid)?;
        let level = ActivityLevel::from_score(score);

        if level == profile.activity_level {
            return Ok(PropagationReport {
                level,
                changed: false,
                fanned_out: 0,
                failed: 0,
            });
        }

        self.store
            .patch(PROFILES, uid, &json!({"activityLevel": level}))?;
        tracing::info!(
            "activity level for {uid}: {} -> {} (score {score})",
            profile.activity_level.as_str(),
            level.as_str(),
        );

        // Fan out to historical comments. Best-effort per comment.
        let mut fanned_out = 0;
        let mut failed = 0;
        for comment in self.store.comments_by_author(uid)? {
            match self
                .store
                .patch(COMMENTS, &comment.id, &json!({"activityLevel": level}))
            {
                Ok(()) => fanned_out += 1,
                Err(e) => {
                    failed += 1;
                    tracing::warn!("activity fan-out to comment {} failed: {e}", comment.id);
                }
            }
        }

        Ok(PropagationReport {
            level,
            changed: true,
            fanned_out,
            failed,
        })
    }

    /// Fire-and-forget trigger. The caller returns to its client
    /// immediately; the spawned task owns its own error boundary and
    /// only logs. Runs inline when no runtime is available (CLI tools).
    pub fn dispatch(self: &Arc<Self>, uid: &str) {
        let propagator = Arc::clone(self);
        let uid = uid.to_string();

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    propagator.run_logged(&uid);
                });
            }
            Err(_) => propagator.run_logged(&uid),
        }
    }

    fn run_logged(&self, uid: &str) {
        match self.recompute(uid) {
            Ok(report) if report.changed => {
                tracing::debug!(
                    "activity propagation for {uid}: {} comments updated, {} failed",
                    report.fanned_out,
                    report.failed,
                );
            }
            Ok(_) => {}
            Err(e) => tracing::warn!("activity propagation for {uid} failed: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use ticket_core::{new_id, now_rfc3339};
    use ticket_docstore::MemoryDocStore;

    use crate::model::{Comment, LikeRecord, Review, UserProfile};
    use crate::store::{like_id, LIKES, REVIEWS};

    fn seed_profile(store: &EngagementStore, uid: &str) {
        let now = now_rfc3339();
        let profile = UserProfile {
            uid: uid.into(),
            display_name: "kim".into(),
            biography: None,
            provider: None,
            photo_key: None,
            activity_level: ActivityLevel::Newbie,
            my_tickets_count: 0,
            liked_tickets_count: 0,
            created_at: now.clone(),
            updated_at: now,
        };
        store.put(PROFILES, uid, &profile).unwrap();
    }

    fn seed_review(store: &EngagementStore, author: &str) -> String {
        let id = new_id();
        let now = now_rfc3339();
        let review = Review {
            id: id.clone(),
            author_id: author.into(),
            movie_id: 1,
            movie_title: "m".into(),
            genre_ids: vec![],
            poster_path: None,
            title: "t".into(),
            content: "c".into(),
            rating: 4.0,
            like_count: 0,
            comments_count: 0,
            created_at: now.clone(),
            updated_at: now,
        };
        store.put(REVIEWS, &id, &review).unwrap();
        id
    }

    fn seed_comment(store: &EngagementStore, author: &str, review_id: &str) -> String {
        let id = new_id();
        let now = now_rfc3339();
        let comment = Comment {
            id: id.clone(),
            review_id: review_id.into(),
            author_id: author.into(),
            content: "nice".into(),
            display_name: "kim".into(),
            photo_key: None,
            activity_level: ActivityLevel::Newbie,
            created_at: now.clone(),
            updated_at: now,
        };
        store.put(COMMENTS, &id, &comment).unwrap();
        id
    }

    fn seed_likes(store: &EngagementStore, uid: &str, n: usize) {
        for i in 0..n {
            let review_id = format!("ext-{i}");
            let record = LikeRecord {
                review_id: review_id.clone(),
                uid: uid.into(),
                created_at: now_rfc3339(),
            };
            store.put(LIKES, &like_id(&review_id, uid), &record).unwrap();
        }
    }

    fn setup() -> (EngagementStore, ActivityPropagator) {
        let store = EngagementStore::new(Arc::new(MemoryDocStore::new()));
        (store.clone(), ActivityPropagator::new(store))
    }

    #[test]
    fn unchanged_tier_does_nothing() {
        let (store, propagator) = setup();
        seed_profile(&store, "u1");

        let report = propagator.recompute("u1").unwrap();
        assert!(!report.changed);
        assert_eq!(report.level, ActivityLevel::Newbie);
    }

    #[test]
    fn missing_profile_is_a_quiet_noop() {
        let (_, propagator) = setup();
        let report = propagator.recompute("ghost").unwrap();
        assert!(!report.changed);
    }

    #[test]
    fn tier_change_persists_and_fans_out() {
        let (store, propagator) = setup();
        seed_profile(&store, "u1");
        let review = seed_review(&store, "someone-else");
        let c1 = seed_comment(&store, "u1", &review);
        let c2 = seed_comment(&store, "u1", &review);
        let other = seed_comment(&store, "u2", &review);
        // 5 likes puts the score at the PRO threshold.
        seed_likes(&store, "u1", 5);

        let report = propagator.recompute("u1").unwrap();
        assert!(report.changed);
        assert_eq!(report.level, ActivityLevel::Pro);
        assert_eq!(report.fanned_out, 2);
        assert_eq!(report.failed, 0);

        let profile = store.get_profile("u1").unwrap().unwrap();
        assert_eq!(profile.activity_level, ActivityLevel::Pro);
        for id in [&c1, &c2] {
            let comment = store.get_comment(id).unwrap().unwrap();
            assert_eq!(comment.activity_level, ActivityLevel::Pro);
        }
        // Another author's comment is untouched.
        let untouched = store.get_comment(&other).unwrap().unwrap();
        assert_eq!(untouched.activity_level, ActivityLevel::Newbie);
    }

    #[test]
    fn score_counts_reviews_and_likes() {
        let (store, propagator) = setup();
        seed_profile(&store, "u1");
        // 3 reviews + 2 likes = 5 → PRO.
        for _ in 0..3 {
            seed_review(&store, "u1");
        }
        seed_likes(&store, "u1", 2);

        let report = propagator.recompute("u1").unwrap();
        assert_eq!(report.level, ActivityLevel::Pro);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn dispatch_runs_off_the_caller() {
        let (store, propagator) = setup();
        let propagator = Arc::new(propagator);
        seed_profile(&store, "u1");
        seed_likes(&store, "u1", 25);

        propagator.dispatch("u1");

        // The spawned task has no completion signal by design; poll.
        for _ in 0..50 {
            tokio::time::sleep(Duration::from_millis(10)).await;
            let profile = store.get_profile("u1").unwrap().unwrap();
            if profile.activity_level == ActivityLevel::Master {
                return;
            }
        }
        panic!("propagation did not land");
    }
}
