//! Hybrid dispatch: decides per request whether the deterministic analysis
//! stands alone or gets AI augmentation, and owns the cache-call-validate-
//! merge sequence for the AI path.
//!
//! The deterministic result is always computed first and is always the
//! authority; the AI path can only add to it, and every AI failure mode
//! (timeout, transport, malformed response) silently degrades to
//! deterministic-only.

pub mod cache;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::ai_client::{AiAnalysis, AiClient, AiError};
use crate::job_spec::JobSpecification;
use crate::parsing::builder::StructuredResumeRecord;
use crate::scoring::engine::ScoringConfig;
use crate::scoring::suggestions::{
    Priority, ScoreComponent, SuggestionItem, SuggestionOrigin,
};

use cache::ResponseCache;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisMode {
    DeterministicOnly,
    AiAugmented,
}

/// Everything the policy needs to decide, gathered by the analyzer.
#[derive(Debug, Clone, Copy)]
pub struct PolicyInputs {
    pub ai_requested: bool,
    pub ai_available: bool,
    pub record_reliable: bool,
    pub deterministic_overall: u8,
    /// More than the configured fraction of job keywords is unknown to the
    /// expansion vocabulary.
    pub niche_vocabulary: bool,
}

/// Seam for the AI collaborator so the dispatch path is testable without a
/// network.
#[async_trait]
pub trait AiCollaborator: Send + Sync {
    async fn analyze(
        &self,
        record: &StructuredResumeRecord,
        job: &JobSpecification,
    ) -> Result<AiAnalysis, AiError>;
}

#[async_trait]
impl AiCollaborator for AiClient {
    async fn analyze(
        &self,
        record: &StructuredResumeRecord,
        job: &JobSpecification,
    ) -> Result<AiAnalysis, AiError> {
        AiClient::analyze(self, record, job).await
    }
}

pub struct DispatchPolicy {
    decision_threshold: u8,
    ambiguity_band: u8,
}

impl DispatchPolicy {
    pub fn from_config(cfg: &ScoringConfig) -> Self {
        Self {
            decision_threshold: cfg.decision_threshold,
            ambiguity_band: cfg.ambiguity_band,
        }
    }

    /// Deterministic-only unless the caller opted in, AI is configured, and
    /// the deterministic verdict is genuinely uncertain: an unreliable
    /// record, a score inside the ambiguity band (edges inclusive), or a
    /// niche job vocabulary.
    pub fn resolve(&self, inputs: &PolicyInputs) -> AnalysisMode {
        if !inputs.ai_requested || !inputs.ai_available {
            return AnalysisMode::DeterministicOnly;
        }

        let distance = (inputs.deterministic_overall as i16 - self.decision_threshold as i16)
            .unsigned_abs();
        let clear_verdict = distance > self.ambiguity_band as u16;

        if inputs.record_reliable && clear_verdict && !inputs.niche_vocabulary {
            AnalysisMode::DeterministicOnly
        } else {
            AnalysisMode::AiAugmented
        }
    }
}

/// Runs the full AI path: cache lookup, bounded call, validation, cache
/// write. `None` means the caller proceeds deterministic-only.
pub async fn run_ai_path(
    collaborator: &dyn AiCollaborator,
    cache: &dyn ResponseCache,
    record: &StructuredResumeRecord,
    job: &JobSpecification,
    call_timeout: Duration,
    cache_ttl: Duration,
) -> Option<AiAnalysis> {
    let key = job.content_hash();

    if let Some(hit) = cache.get(&key).await {
        debug!("AI cache hit for job hash {}", &key[..12]);
        return Some(hit);
    }

    let analysis = match tokio::time::timeout(call_timeout, collaborator.analyze(record, job))
        .await
    {
        Ok(Ok(analysis)) => analysis,
        Ok(Err(e)) => {
            warn!("AI analysis failed, continuing deterministic-only: {e}");
            return None;
        }
        Err(_) => {
            warn!(
                "AI analysis timed out after {}s, continuing deterministic-only",
                call_timeout.as_secs()
            );
            return None;
        }
    };

    // Trait implementations outside AiClient are not trusted to have
    // validated.
    if let Err(e) = analysis.validate() {
        warn!("discarding invalid AI analysis: {e}");
        return None;
    }

    cache.put(&key, &analysis, cache_ttl).await;
    Some(analysis)
}

/// Appends AI suggestions to the deterministic list with their origin
/// marked, skipping near-duplicates of existing messages.
pub fn merge_ai_suggestions(base: &mut Vec<SuggestionItem>, ai: &AiAnalysis) {
    for suggestion in &ai.suggestions {
        let trimmed = suggestion.trim();
        let duplicate = base
            .iter()
            .any(|s| s.message.trim().eq_ignore_ascii_case(trimmed));
        if duplicate {
            continue;
        }
        base.push(SuggestionItem {
            message: trimmed.to_string(),
            component: ScoreComponent::General,
            origin: SuggestionOrigin::Ai,
            priority: Priority::Medium,
        });
    }
}
