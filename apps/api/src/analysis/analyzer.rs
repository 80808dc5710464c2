//! Pipeline orchestrator: one call runs extraction output through
//! segmentation, normalization, matching, scoring, suggestion generation,
//! and the hybrid dispatch decision.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::dispatch::cache::ResponseCache;
use crate::dispatch::{
    merge_ai_suggestions, run_ai_path, AiCollaborator, AnalysisMode, DispatchPolicy, PolicyInputs,
};
use crate::errors::AppError;
use crate::extract::RawDocumentText;
use crate::job_spec::JobSpecification;
use crate::parsing::builder::{RecordBuilder, StructuredResumeRecord};
use crate::parsing::segmenter::VocabClassifier;
use crate::scoring::engine::{ScoreBreakdown, ScoringConfig, ScoringEngine};
use crate::scoring::matcher::match_keywords;
use crate::scoring::suggestions::{self, SuggestionItem};

/// The response body for both analyze endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResponse {
    pub analysis_id: Uuid,
    pub mode: AnalysisMode,
    pub ats_score: u8,
    pub breakdown: ScoreBreakdown,
    pub explanation: String,
    pub suggestions: Vec<SuggestionItem>,
    pub record: StructuredResumeRecord,
    /// Advisory AI score; present only when the AI path ran and returned a
    /// valid response. Never replaces the deterministic breakdown.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_score: Option<u8>,
}

pub struct Analyzer {
    builder: RecordBuilder,
    engine: ScoringEngine,
    policy: DispatchPolicy,
    cache: Arc<dyn ResponseCache>,
    ai: Option<Arc<dyn AiCollaborator>>,
    ai_timeout: Duration,
    cache_ttl: Duration,
}

impl Analyzer {
    pub fn new(
        cfg: ScoringConfig,
        cache: Arc<dyn ResponseCache>,
        ai: Option<Arc<dyn AiCollaborator>>,
        ai_timeout: Duration,
        cache_ttl: Duration,
    ) -> Result<Self> {
        let policy = DispatchPolicy::from_config(&cfg);
        Ok(Self {
            builder: RecordBuilder::new(Arc::new(VocabClassifier::new()))?,
            engine: ScoringEngine::new(cfg)?,
            policy,
            cache,
            ai,
            ai_timeout,
            cache_ttl,
        })
    }

    /// Builds the structured record for a document without scoring it.
    pub fn build_record(&self, doc: &RawDocumentText) -> StructuredResumeRecord {
        self.builder.build(doc)
    }

    /// Full analysis of one resume against one job. The deterministic path
    /// cannot fail on resume content; the only error here is an unusable
    /// job specification.
    pub async fn analyze(
        &self,
        doc: &RawDocumentText,
        job_role: &str,
        job_desc: Option<&str>,
        allow_ai: bool,
    ) -> Result<AnalysisResponse, AppError> {
        let job = JobSpecification::build(job_role, job_desc)?;

        let record = self.builder.build(doc);
        debug!(
            experience = record.experience.len(),
            skills = record.all_skills().len(),
            reliable = record.reliable,
            "structured record built"
        );

        let report = match_keywords(&record, &job);
        let analysis = self.engine.evaluate(&record, doc, &job, report);
        let mut suggestion_list = suggestions::generate(&analysis, self.engine.config());
        let explanation = suggestions::explanation(&analysis);

        let inputs = PolicyInputs {
            ai_requested: allow_ai,
            ai_available: self.ai.is_some(),
            record_reliable: record.reliable,
            deterministic_overall: analysis.breakdown.overall,
            niche_vocabulary: job.unknown_fraction() > self.engine.config().niche_fraction,
        };
        let mut mode = self.policy.resolve(&inputs);

        let mut ai_score = None;
        if mode == AnalysisMode::AiAugmented {
            // The policy only resolves AiAugmented when a collaborator is
            // configured; a failed AI path degrades silently.
            let outcome = match self.ai.as_deref() {
                Some(collaborator) => {
                    run_ai_path(
                        collaborator,
                        self.cache.as_ref(),
                        &record,
                        &job,
                        self.ai_timeout,
                        self.cache_ttl,
                    )
                    .await
                }
                None => None,
            };
            match outcome {
                Some(ai) => {
                    merge_ai_suggestions(&mut suggestion_list, &ai);
                    ai_score = Some(ai.score);
                }
                None => mode = AnalysisMode::DeterministicOnly,
            }
        }

        let response = AnalysisResponse {
            analysis_id: Uuid::new_v4(),
            mode,
            ats_score: analysis.breakdown.overall,
            breakdown: analysis.breakdown,
            explanation,
            suggestions: suggestion_list,
            record,
            ai_score,
        };
        info!(
            analysis_id = %response.analysis_id,
            score = response.ats_score,
            mode = ?response.mode,
            "analysis complete"
        );
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai_client::{AiAnalysis, AiError};
    use crate::dispatch::cache::InMemoryCache;
    use async_trait::async_trait;
    use std::collections::BTreeMap;

    fn analyzer(ai: Option<Arc<dyn AiCollaborator>>) -> Analyzer {
        Analyzer::new(
            ScoringConfig::default(),
            Arc::new(InMemoryCache::new()),
            ai,
            Duration::from_secs(20),
            Duration::from_secs(3600),
        )
        .unwrap()
    }

    const RESUME: &str = "\
Jane Doe
jane@example.com | 555-123-4567

Summary
Software engineer building scalable Python services.

Experience
Software Engineer | Acme Corp
Jan 2020 - Present
• Built scalable Python apis, improved latency by 40%

Skills
Languages: Python, SQL
Tools: Docker, Git

Education
BS Computer Science, State University
2013 - 2017";

    #[tokio::test]
    async fn test_analysis_is_idempotent_with_ai_disabled() {
        let analyzer = analyzer(None);
        let doc = RawDocumentText::from_text(RESUME);

        let a = analyzer
            .analyze(&doc, "Software Engineer", Some("python sql"), false)
            .await
            .unwrap();
        let b = analyzer
            .analyze(&doc, "Software Engineer", Some("python sql"), false)
            .await
            .unwrap();

        assert_eq!(a.breakdown, b.breakdown);
        assert_eq!(a.ats_score, b.ats_score);
        assert_eq!(a.explanation, b.explanation);
        assert_eq!(a.suggestions.len(), b.suggestions.len());
        assert_eq!(a.mode, AnalysisMode::DeterministicOnly);
        // Request identity differs; everything analytical matches.
        assert_ne!(a.analysis_id, b.analysis_id);
    }

    #[tokio::test]
    async fn test_empty_job_spec_is_rejected() {
        let analyzer = analyzer(None);
        let doc = RawDocumentText::from_text(RESUME);
        let err = analyzer.analyze(&doc, "", None, false).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_empty_document_still_analyzes() {
        let analyzer = analyzer(None);
        let doc = RawDocumentText::from_text("");
        let response = analyzer
            .analyze(&doc, "Software Engineer", Some("python"), false)
            .await
            .unwrap();
        assert_eq!(response.ats_score, 0);
        assert!(!response.suggestions.is_empty());
    }

    struct FixedCollaborator(AiAnalysis);

    #[async_trait]
    impl AiCollaborator for FixedCollaborator {
        async fn analyze(
            &self,
            _record: &StructuredResumeRecord,
            _job: &JobSpecification,
        ) -> Result<AiAnalysis, AiError> {
            Ok(self.0.clone())
        }
    }

    struct FailingCollaborator;

    #[async_trait]
    impl AiCollaborator for FailingCollaborator {
        async fn analyze(
            &self,
            _record: &StructuredResumeRecord,
            _job: &JobSpecification,
        ) -> Result<AiAnalysis, AiError> {
            Err(AiError::EmptyContent)
        }
    }

    // Scenario: unreliable record (no headings at all) with AI allowed and
    // configured escalates to the AI path.
    #[tokio::test]
    async fn test_unreliable_record_uses_ai_when_allowed() {
        let ai = FixedCollaborator(AiAnalysis {
            score: 62,
            breakdown: BTreeMap::new(),
            suggestions: vec!["Restructure with standard section headings".to_string()],
        });
        let analyzer = analyzer(Some(Arc::new(ai)));
        let doc = RawDocumentText::from_text("just one unstructured paragraph of text");

        let response = analyzer
            .analyze(&doc, "Software Engineer", Some("python"), true)
            .await
            .unwrap();

        assert_eq!(response.mode, AnalysisMode::AiAugmented);
        assert_eq!(response.ai_score, Some(62));
        assert!(response
            .suggestions
            .iter()
            .any(|s| s.message.contains("standard section headings")));
        // Deterministic breakdown stays authoritative.
        assert_eq!(response.ats_score, response.breakdown.overall);
    }

    #[tokio::test]
    async fn test_ai_failure_degrades_to_deterministic_only() {
        let analyzer = analyzer(Some(Arc::new(FailingCollaborator)));
        let doc = RawDocumentText::from_text("just one unstructured paragraph of text");

        let response = analyzer
            .analyze(&doc, "Software Engineer", Some("python"), true)
            .await
            .unwrap();

        assert_eq!(response.mode, AnalysisMode::DeterministicOnly);
        assert_eq!(response.ai_score, None);
    }

    #[tokio::test]
    async fn test_ai_not_requested_never_calls_ai() {
        let ai = FixedCollaborator(AiAnalysis {
            score: 99,
            breakdown: BTreeMap::new(),
            suggestions: vec![],
        });
        let analyzer = analyzer(Some(Arc::new(ai)));
        let doc = RawDocumentText::from_text("unstructured text with no sections");

        let response = analyzer
            .analyze(&doc, "Software Engineer", Some("python"), false)
            .await
            .unwrap();
        assert_eq!(response.mode, AnalysisMode::DeterministicOnly);
        assert_eq!(response.ai_score, None);
    }
}
