//! Internationalization.
//!
//! Provides a `Localizer` trait for all user-facing strings.
//! The default implementation carries the product's launch strings —
//! Korean where the client copy is Korean, English elsewhere.
//! Error *codes* are never localized; only messages go through here.

/// Localizer trait — translates keys to localized strings.
///
/// All user-facing error messages go through this.
/// Implementations can load translations from files, databases, etc.
pub trait Localizer: Send + Sync + 'static {
    /// Translate a key to a localized string.
    ///
    /// `key` is a dot-separated identifier: "error.comment.content_required".
    /// `args` are named substitutions: [("id", "abc")] → "review 'abc' not found".
    fn t(&self, key: &str, args: &[(&str, &str)]) -> String;
}

/// Default localizer — returns the launch copy for known keys,
/// or the key itself for unknown keys.
pub struct DefaultLocalizer;

impl Localizer for DefaultLocalizer {
    fn t(&self, key: &str, args: &[(&str, &str)]) -> String {
        let text = match key {
            // Auth
            "error.auth.missing_token" => "login required",
            "error.auth.malformed_token" => "invalid token format",
            "error.auth.token_expired" => "token expired, please log in again",
            "error.auth.verify_failed" => "authentication failed",
            "error.auth.no_permission" => "no permission",

            // Comment
            "error.comment.content_required" => "content가 필요합니다.",
            "error.comment.not_found" => "comment '{id}' not found",
            "message.comment.created" => "댓글이 작성되었습니다.",

            // Review
            "error.review.not_found" => "review '{id}' not found",
            "error.review.title_required" => "title이 필요합니다.",
            "error.review.content_required" => "content가 필요합니다.",
            "error.review.rating_range" => "rating은 0.5에서 5 사이여야 합니다.",
            "message.review.created" => "리뷰가 작성되었습니다.",

            // Like
            "error.like.already_liked" => "already liked",
            "error.like.not_liked" => "not liked",

            // Profile
            "error.profile.not_found" => "user '{id}' not found",
            "error.profile.name_required" => "displayName이 필요합니다.",
            "label.profile.anonymous" => "익명",

            // Generic
            "error.internal" => "internal server error",

            // Unknown key — return the key itself.
            _ => return key.to_string(),
        };

        // Substitute args: {name} → value.
        let mut result = text.to_string();
        for (name, value) in args {
            result = result.replace(&format!("{{{}}}", name), value);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_key_returns_launch_copy() {
        let l = DefaultLocalizer;
        assert_eq!(l.t("error.comment.content_required", &[]), "content가 필요합니다.");
        assert_eq!(l.t("error.auth.missing_token", &[]), "login required");
    }

    #[test]
    fn args_substituted() {
        let l = DefaultLocalizer;
        assert_eq!(
            l.t("error.review.not_found", &[("id", "abc")]),
            "review 'abc' not found"
        );
    }

    #[test]
    fn unknown_key_returns_key() {
        let l = DefaultLocalizer;
        assert_eq!(l.t("some.unknown.key", &[]), "some.unknown.key");
    }
}
