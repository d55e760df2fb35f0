use serde::{Deserialize, Serialize};

// ── Activity level ──────────────────────────────────────────────────

/// User activity tier, ascending by engagement.
///
/// Derived from the authoritative engagement records — never set by
/// clients. The propagator recomputes it and fans changes out to the
/// denormalized copies on comments.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ActivityLevel {
    #[default]
    Newbie,
    Pro,
    Master,
}

impl ActivityLevel {
    /// Step function from the engagement score (reviews authored plus
    /// likes given). Monotonic: a higher score never yields a lower tier.
    pub fn from_score(score: i64) -> Self {
        if score >= 20 {
            ActivityLevel::Master
        } else if score >= 5 {
            ActivityLevel::Pro
        } else {
            ActivityLevel::Newbie
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityLevel::Newbie => "NEWBIE",
            ActivityLevel::Pro => "PRO",
            ActivityLevel::Master => "MASTER",
        }
    }
}

// ── Review ──────────────────────────────────────────────────────────

/// A movie review ("ticket").
///
/// `like_count` and `comments_count` are derived caches over the like
/// records and comments; only the engine and the reconciler write them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: String,

    /// Owner. Immutable; the sole basis for authorization decisions.
    pub author_id: String,

    /// External movie id (metadata provider key).
    pub movie_id: u64,

    pub movie_title: String,

    #[serde(default)]
    pub genre_ids: Vec<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poster_path: Option<String>,

    pub title: String,

    pub content: String,

    /// Star rating, 0.5–5.0.
    pub rating: f64,

    #[serde(default)]
    pub like_count: i64,

    #[serde(default)]
    pub comments_count: i64,

    /// RFC 3339 creation timestamp.
    pub created_at: String,

    /// RFC 3339 last update timestamp.
    pub updated_at: String,
}

/// Input for creating a review.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReview {
    pub movie_id: u64,
    pub movie_title: String,
    #[serde(default)]
    pub genre_ids: Vec<u64>,
    #[serde(default)]
    pub poster_path: Option<String>,
    pub title: String,
    pub content: String,
    pub rating: f64,
}

/// Input for updating a review. Only content fields — counters and the
/// movie reference are not client-writable.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateReview {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub rating: Option<f64>,
}

// ── Comment ─────────────────────────────────────────────────────────

/// A comment on a review.
///
/// Carries a denormalized author snapshot (display name, photo,
/// activity level) captured at write time so listings need no join.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,

    /// Parent review. Immutable.
    pub review_id: String,

    /// Owner. Immutable.
    pub author_id: String,

    pub content: String,

    pub display_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_key: Option<String>,

    #[serde(default)]
    pub activity_level: ActivityLevel,

    pub created_at: String,

    pub updated_at: String,
}

/// Input for creating a comment.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateComment {
    #[serde(default)]
    pub content: String,

    /// Optional client echo of the author. When present it must match
    /// the authenticated principal; the stored author is always the
    /// principal, never this field.
    #[serde(default)]
    pub author_id: Option<String>,
}

/// Input for updating a comment.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateComment {
    #[serde(default)]
    pub content: String,
}

// ── Like record ─────────────────────────────────────────────────────

/// A like. Document id is `"{review_id}:{uid}"`; the record's existence
/// is the single source of truth for "uid likes review".
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeRecord {
    pub review_id: String,
    pub uid: String,
    pub created_at: String,
}

// ── User profile ────────────────────────────────────────────────────

/// A user profile. Created at signup (outside this subsystem).
///
/// `activity_level`, `my_tickets_count` and `liked_tickets_count` are
/// derived; reviews and like records are the primary record of truth.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub uid: String,

    pub display_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub biography: Option<String>,

    /// Identity provider that issued the account.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_key: Option<String>,

    #[serde(default)]
    pub activity_level: ActivityLevel,

    #[serde(default)]
    pub my_tickets_count: i64,

    #[serde(default)]
    pub liked_tickets_count: i64,

    pub created_at: String,

    pub updated_at: String,
}

/// Input for updating profile fields. Derived fields are not here —
/// they belong to the propagator and the reconciler.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfile {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub biography: Option<String>,
    #[serde(default)]
    pub photo_key: Option<String>,
}

// ── Reconciliation reports ──────────────────────────────────────────

/// Drift report for one reconciled counter.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub before: i64,
    pub after: i64,
    pub difference: i64,
}

impl SyncReport {
    pub fn new(before: i64, after: i64) -> Self {
        Self {
            before,
            after,
            difference: after - before,
        }
    }
}

/// Drift report for a review's two derived counters.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewSyncReport {
    pub like_count: SyncReport,
    pub comments_count: SyncReport,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn activity_level_step_function() {
        assert_eq!(ActivityLevel::from_score(0), ActivityLevel::Newbie);
        assert_eq!(ActivityLevel::from_score(4), ActivityLevel::Newbie);
        assert_eq!(ActivityLevel::from_score(5), ActivityLevel::Pro);
        assert_eq!(ActivityLevel::from_score(19), ActivityLevel::Pro);
        assert_eq!(ActivityLevel::from_score(20), ActivityLevel::Master);
        assert_eq!(ActivityLevel::from_score(1000), ActivityLevel::Master);
    }

    #[test]
    fn activity_level_is_monotonic() {
        let mut prev = ActivityLevel::from_score(0);
        for score in 0..50 {
            let level = ActivityLevel::from_score(score);
            assert!(level >= prev);
            prev = level;
        }
    }

    #[test]
    fn activity_level_serializes_uppercase() {
        let json = serde_json::to_string(&ActivityLevel::Newbie).unwrap();
        assert_eq!(json, "\"NEWBIE\"");
        let level: ActivityLevel = serde_json::from_str("\"MASTER\"").unwrap();
        assert_eq!(level, ActivityLevel::Master);
    }

    #[test]
    fn review_json_uses_camel_case() {
        let review = Review {
            id: "r1".into(),
            author_id: "u1".into(),
            movie_id: 603,
            movie_title: "The Matrix".into(),
            genre_ids: vec![28],
            poster_path: None,
            title: "good".into(),
            content: "loved it".into(),
            rating: 4.5,
            like_count: 2,
            comments_count: 1,
            created_at: "2024-01-01T00:00:00+00:00".into(),
            updated_at: "2024-01-01T00:00:00+00:00".into(),
        };
        let value = serde_json::to_value(&review).unwrap();
        assert_eq!(value["likeCount"], 2);
        assert_eq!(value["commentsCount"], 1);
        assert_eq!(value["authorId"], "u1");
    }

    #[test]
    fn sync_report_difference() {
        let report = SyncReport::new(7, 3);
        assert_eq!(report.difference, -4);
    }
}
