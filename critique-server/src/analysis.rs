//! The analysis pipeline.
//!
//! One request walks: cache check -> external call -> validate -> persist,
//! with a synthetic fallback when the reasoning service fails or replies
//! with garbage. The decision points branch on typed results; no failure
//! from the service boundary escapes to the caller.

use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};

use critique_core::model::{AnalysisResult, Submission};
use critique_core::service::{request_analysis, ReasoningService};
use critique_core::synthetic;
use critique_core::validate::normalize_analysis;

use crate::store::ReviewStore;

/// Placeholder returned instead of suggestions on the cache path;
/// suggestions are not persisted.
pub const CACHED_SUGGESTION: &str = "Retrieved from previous analysis";

/// The analysis orchestrator. Holds its collaborators explicitly so tests
/// can inject a stub service and an in-memory store.
pub struct AnalysisPipeline {
    store: Arc<dyn ReviewStore>,
    service: Arc<dyn ReasoningService>,
}

impl AnalysisPipeline {
    pub fn new(store: Arc<dyn ReviewStore>, service: Arc<dyn ReasoningService>) -> Self {
        Self { store, service }
    }

    /// Analyze a submission, reusing a prior identical analysis when one
    /// exists for this user.
    ///
    /// Errors here are storage failures only; reasoning-service trouble is
    /// absorbed by the fallback path.
    pub async fn analyze(&self, submission: &Submission) -> Result<AnalysisResult> {
        if let Some(user_id) = submission.user_id {
            if let Some(prior) = self
                .store
                .find_latest_review(user_id, &submission.language, &submission.code)
                .await?
            {
                info!("Using cached analysis for review {}", prior.id);
                let bugs = self.store.list_bugs(prior.id).await?;
                return Ok(AnalysisResult {
                    quality_score: prior.quality_score,
                    bugs,
                    suggestions: vec![CACHED_SUGGESTION.to_string()],
                });
            }
        }

        match request_analysis(
            self.service.as_ref(),
            &submission.language,
            &submission.code,
        )
        .await
        {
            Ok(raw) => {
                let result = normalize_analysis(&raw);
                let review_id = self
                    .store
                    .insert_review(
                        submission.user_id,
                        &submission.language,
                        &submission.code,
                        result.quality_score,
                    )
                    .await?;
                self.store.insert_bugs(review_id, &result.bugs).await?;
                info!(
                    "Stored analysis as review {} ({} bugs)",
                    review_id,
                    result.bugs.len()
                );
                Ok(result)
            }
            Err(err) => {
                warn!("Falling back to synthetic analysis: {err}");
                self.synthesize(submission).await
            }
        }
    }

    /// The fallback path: insert the review with a provisional score, insert
    /// the generated bugs, then replace the score with the one derived from
    /// their severities. The review row must exist before its bugs, and the
    /// bugs before the score that reflects them.
    async fn synthesize(&self, submission: &Submission) -> Result<AnalysisResult> {
        // ThreadRng is not Send, so it is never held across an await.
        let provisional = synthetic::provisional_score(&mut rand::rng());
        let bugs = synthetic::synthetic_bugs(&submission.code, &mut rand::rng());
        let suggestions = synthetic::improvement_suggestions(&mut rand::rng());

        let review_id = self
            .store
            .insert_review(
                submission.user_id,
                &submission.language,
                &submission.code,
                provisional,
            )
            .await?;

        self.store.insert_bugs(review_id, &bugs).await?;

        let quality_score = synthetic::derived_score(&bugs);
        self.store
            .update_review_score(review_id, quality_score)
            .await?;

        Ok(AnalysisResult {
            quality_score,
            bugs,
            suggestions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use anyhow::anyhow;
    use async_trait::async_trait;

    use crate::db::SqliteStore;

    /// Stub service: returns a canned reply and counts invocations.
    struct Canned {
        reply: &'static str,
        calls: AtomicUsize,
    }

    impl Canned {
        fn new(reply: &'static str) -> Arc<Self> {
            Arc::new(Self {
                reply,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl ReasoningService for Canned {
        async fn complete(&self, _system: &str, _user: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.reply.to_string())
        }
    }

    struct Down;

    #[async_trait]
    impl ReasoningService for Down {
        async fn complete(&self, _system: &str, _user: &str) -> Result<String> {
            Err(anyhow!("quota exhausted"))
        }
    }

    const GOOD_REPLY: &str = r#"{
        "quality_score": 85,
        "bugs": [
            { "line": 2, "severity": "high", "message": "Unchecked index", "suggestion": "Use get()" }
        ],
        "suggestions": ["Add tests", "Name things better"]
    }"#;

    fn pipeline_with(service: Arc<dyn ReasoningService>) -> AnalysisPipeline {
        let store = SqliteStore::new_in_memory().expect("should create in-memory db");
        AnalysisPipeline::new(Arc::new(store), service)
    }

    fn submission(user_id: Option<i64>, code: &str) -> Submission {
        Submission {
            language: "python".to_string(),
            code: code.to_string(),
            user_id,
        }
    }

    #[tokio::test]
    async fn second_identical_submission_hits_the_cache() {
        let service = Canned::new(GOOD_REPLY);
        let pipeline = pipeline_with(service.clone());
        let submission = submission(Some(1), "x=1\ny=2");

        let first = pipeline.analyze(&submission).await.expect("should analyze");
        let second = pipeline.analyze(&submission).await.expect("should analyze");

        assert_eq!(service.calls.load(Ordering::SeqCst), 1);
        assert_eq!(second.quality_score, first.quality_score);
        assert_eq!(second.bugs, first.bugs);
        assert_eq!(second.suggestions, vec![CACHED_SUGGESTION.to_string()]);
    }

    #[tokio::test]
    async fn anonymous_submissions_never_hit_the_cache() {
        let service = Canned::new(GOOD_REPLY);
        let pipeline = pipeline_with(service.clone());
        let submission = submission(None, "x=1");

        pipeline.analyze(&submission).await.expect("should analyze");
        pipeline.analyze(&submission).await.expect("should analyze");

        assert_eq!(service.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn different_code_misses_the_cache() {
        let service = Canned::new(GOOD_REPLY);
        let pipeline = pipeline_with(service.clone());

        pipeline
            .analyze(&submission(Some(1), "x=1"))
            .await
            .expect("should analyze");
        // Whitespace matters: no normalization of the cache key.
        pipeline
            .analyze(&submission(Some(1), "x = 1"))
            .await
            .expect("should analyze");

        assert_eq!(service.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn service_path_persists_what_it_returns() {
        let store = Arc::new(SqliteStore::new_in_memory().expect("should create in-memory db"));
        let pipeline = AnalysisPipeline::new(store.clone(), Canned::new(GOOD_REPLY));

        let result = pipeline
            .analyze(&submission(Some(1), "x=1"))
            .await
            .expect("should analyze");
        assert_eq!(result.quality_score, 85);
        assert_eq!(result.suggestions.len(), 2);

        let stored = store
            .find_latest_review(1, "python", "x=1")
            .await
            .expect("should query")
            .expect("should be stored");
        assert_eq!(stored.quality_score, 85);

        let bugs = store.list_bugs(stored.id).await.expect("should list");
        assert_eq!(bugs.len(), 1);
        assert_eq!(bugs[0].message, "Unchecked index");
    }

    #[tokio::test]
    async fn service_failure_falls_back_and_persists_derived_score() {
        let store = Arc::new(SqliteStore::new_in_memory().expect("should create in-memory db"));
        let pipeline = AnalysisPipeline::new(store.clone(), Arc::new(Down));
        let code = "a\nb\nc\nd\ne\nf\ng\nh\ni\nj\nk\nl";

        let result = pipeline
            .analyze(&submission(Some(3), code))
            .await
            .expect("fallback must not fail");

        // 12 lines: two synthetic bugs, score from the penalty formula.
        assert_eq!(result.bugs.len(), 2);
        assert!((50..=100).contains(&result.quality_score));
        let expected: i64 = 100 - result.bugs.iter().map(|b| b.severity.penalty()).sum::<i64>();
        assert_eq!(result.quality_score, expected.max(50));

        // The provisional score was replaced by the derived one.
        let stored = store
            .find_latest_review(3, "python", code)
            .await
            .expect("should query")
            .expect("should be stored");
        assert_eq!(stored.quality_score, result.quality_score);
        assert_eq!(
            store.list_bugs(stored.id).await.expect("should list").len(),
            2
        );
    }

    #[tokio::test]
    async fn malformed_reply_falls_back_to_synthetic() {
        let service = Canned::new("I am not JSON at all");
        let pipeline = pipeline_with(service.clone());

        let result = pipeline
            .analyze(&submission(None, "x=1"))
            .await
            .expect("fallback must not fail");

        assert_eq!(service.calls.load(Ordering::SeqCst), 1);
        // One line of code: exactly one synthetic bug, three suggestions.
        assert_eq!(result.bugs.len(), 1);
        assert_eq!(result.bugs[0].line, 1);
        assert_eq!(result.suggestions.len(), 3);
        assert!((50..=100).contains(&result.quality_score));
    }

    #[tokio::test]
    async fn fallback_analysis_is_cached_like_any_other() {
        let store = Arc::new(SqliteStore::new_in_memory().expect("should create in-memory db"));
        let pipeline = AnalysisPipeline::new(store.clone(), Arc::new(Down));
        let submission = submission(Some(9), "x=1");

        let first = pipeline.analyze(&submission).await.expect("should analyze");
        let second = pipeline.analyze(&submission).await.expect("should analyze");

        assert_eq!(second.quality_score, first.quality_score);
        assert_eq!(second.suggestions, vec![CACHED_SUGGESTION.to_string()]);
        // Severity/message/suggestion come back verbatim from storage.
        assert_eq!(second.bugs.len(), first.bugs.len());
        for (a, b) in first.bugs.iter().zip(&second.bugs) {
            assert_eq!(a.severity, b.severity);
            assert_eq!(a.message, b.message);
            assert_eq!(a.suggestion, b.suggestion);
        }
    }
}
