use std::sync::Arc;

use crate::analysis::analyzer::Analyzer;
use crate::config::Config;
use crate::extract::TextExtractor;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// The full pipeline: parse, score, suggest, dispatch. Owns the cache
    /// and the optional AI collaborator.
    pub analyzer: Arc<Analyzer>,
    /// Upload-to-text boundary. Plain text in production; swap for tests.
    pub extractor: Arc<dyn TextExtractor>,
    pub config: Config,
}
