//! Storage abstraction for reviews, bugs, and users.
//!
//! The orchestrators depend on this trait rather than on SQLite directly,
//! so tests can pair a real in-memory database with a stubbed reasoning
//! service without touching the filesystem.

use anyhow::Result;
use async_trait::async_trait;

use critique_core::model::Bug;

/// A persisted review, as much of it as the cache path needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewRecord {
    pub id: i64,
    pub quality_score: i64,
}

/// A registered user, without the credential column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

/// Aggregates across one user's review history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserStats {
    pub total_reviews: i64,
    pub bugs_detected: i64,
    pub avg_quality_score: i64,
}

/// One row of the recent-reviews listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecentReview {
    pub id: i64,
    pub language: String,
    pub quality_score: i64,
    /// Creation date as `YYYY-MM-DD`.
    pub date: String,
}

/// Storage operations the service depends on.
///
/// Implementations must guarantee read-after-write visibility within one
/// logical session: a review inserted by a request is visible to that
/// request's (and any later request's) reads.
#[async_trait]
pub trait ReviewStore: Send + Sync {
    /// Most recent review matching (user, language, code) exactly, or None.
    /// The code comparison is byte-for-byte: no whitespace or case
    /// normalization.
    async fn find_latest_review(
        &self,
        user_id: i64,
        language: &str,
        code: &str,
    ) -> Result<Option<ReviewRecord>>;

    /// Insert a review row and return its id.
    async fn insert_review(
        &self,
        user_id: Option<i64>,
        language: &str,
        code: &str,
        quality_score: i64,
    ) -> Result<i64>;

    /// Replace a review's quality score. Used once per review, on the
    /// fallback path, after its bugs exist.
    async fn update_review_score(&self, review_id: i64, quality_score: i64) -> Result<()>;

    /// Insert a batch of bugs belonging to one review.
    async fn insert_bugs(&self, review_id: i64, bugs: &[Bug]) -> Result<()>;

    /// All bugs for a review, with their stored ids.
    async fn list_bugs(&self, review_id: i64) -> Result<Vec<Bug>>;

    /// Register a user. Returns None when the email is already taken.
    async fn insert_user(
        &self,
        first_name: &str,
        last_name: &str,
        email: &str,
        password: &str,
    ) -> Result<Option<UserRecord>>;

    /// Plain equality check against the stored credential.
    async fn authenticate(&self, email: &str, password: &str) -> Result<Option<UserRecord>>;

    async fn user_stats(&self, user_id: i64) -> Result<UserStats>;

    /// The user's five most recent reviews, newest first.
    async fn recent_reviews(&self, user_id: i64) -> Result<Vec<RecentReview>>;
}
