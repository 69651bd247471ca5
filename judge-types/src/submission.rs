//! The normalized submission record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Source-scoped identifier of a submission.
///
/// Unique within one platform's store; two platforms may reuse the same value.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct SubmissionId(i64);

impl SubmissionId {
    /// Create a SubmissionId from the platform's numeric id.
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Get the numeric value of this SubmissionId.
    pub fn value(&self) -> i64 {
        self.0
    }
}

impl From<i64> for SubmissionId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl fmt::Display for SubmissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl fmt::Debug for SubmissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SubmissionId({})", self.0)
    }
}

/// A submission as reported by one platform's listing page.
///
/// Produced by a page fetcher and never mutated afterwards. A platform may
/// report the same id several times while it is being evaluated; only the
/// observation with `finalized == true` is ever persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    /// Primary key within the platform.
    pub id: SubmissionId,

    /// Account handle of the author (may be empty if unresolved).
    pub username: String,
    /// Human-readable author name (may be empty if unresolved).
    pub display_name: String,

    /// Problem identifier, absent while the platform hides it.
    pub problem_id: Option<String>,
    /// Problem title, absent while the platform hides it.
    pub problem_name: Option<String>,

    /// Source size in kilobytes, if known.
    pub size_kb: Option<f64>,
    /// When the submission was made.
    pub date: DateTime<Utc>,

    /// The platform marked the submission as ignored.
    pub ignored: bool,
    /// The submission did not compile.
    pub compile_error: bool,
    /// The evaluator failed (system or problem configuration error).
    pub internal_error: bool,
    /// Score, if the platform reported one.
    pub score: Option<i64>,

    /// Evaluation is complete (not queued or running).
    pub finalized: bool,
}

impl Submission {
    /// Create a finalized submission with empty optional fields.
    ///
    /// Convenience for fetchers that fill the record field by field.
    pub fn new(id: impl Into<SubmissionId>, date: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            username: String::new(),
            display_name: String::new(),
            problem_id: None,
            problem_name: None,
            size_kb: None,
            date,
            ignored: false,
            compile_error: false,
            internal_error: false,
            score: None,
            finalized: true,
        }
    }

    /// Set the score.
    pub fn with_score(mut self, score: i64) -> Self {
        self.score = Some(score);
        self
    }

    /// Set the author fields.
    pub fn with_author(mut self, username: &str, display_name: &str) -> Self {
        self.username = username.to_string();
        self.display_name = display_name.to_string();
        self
    }

    /// Set the problem id.
    pub fn with_problem(mut self, problem_id: &str) -> Self {
        self.problem_id = Some(problem_id.to_string());
        self
    }

    /// Mark the submission as still pending evaluation.
    pub fn pending(mut self) -> Self {
        self.finalized = false;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn submission_id_ordering() {
        let a = SubmissionId::new(10);
        let b = SubmissionId::new(20);
        assert!(a < b);
        assert_eq!(b.value(), 20);
    }

    #[test]
    fn submission_id_display() {
        assert_eq!(SubmissionId::new(42).to_string(), "#42");
        assert_eq!(format!("{:?}", SubmissionId::new(42)), "SubmissionId(42)");
    }

    #[test]
    fn new_submission_is_finalized_and_unscored() {
        let date = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let sub = Submission::new(7, date);

        assert!(sub.finalized);
        assert!(sub.score.is_none());
        assert!(sub.problem_id.is_none());
        assert_eq!(sub.date, date);
    }

    #[test]
    fn builders_set_fields() {
        let date = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let sub = Submission::new(7, date)
            .with_author("alice", "Alice A.")
            .with_problem("adunare")
            .with_score(100)
            .pending();

        assert_eq!(sub.username, "alice");
        assert_eq!(sub.display_name, "Alice A.");
        assert_eq!(sub.problem_id.as_deref(), Some("adunare"));
        assert_eq!(sub.score, Some(100));
        assert!(!sub.finalized);
    }

    #[test]
    fn submission_serializes_to_json() {
        let date = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let sub = Submission::new(7, date).with_score(55);

        let json = serde_json::to_string(&sub).unwrap();
        let back: Submission = serde_json::from_str(&json).unwrap();
        assert_eq!(back, sub);
    }
}
