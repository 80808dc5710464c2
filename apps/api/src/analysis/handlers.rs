use axum::{
    extract::{Multipart, State},
    Json,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::analysis::analyzer::AnalysisResponse;
use crate::analysis::enhance::apply_suggestions;
use crate::errors::AppError;
use crate::extract::RawDocumentText;
use crate::job_spec::JobSpecification;
use crate::parsing::builder::StructuredResumeRecord;
use crate::scoring::suggestions::SuggestionItem;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AnalyzeTextRequest {
    pub resume_text: String,
    pub job_role: String,
    pub job_desc: Option<String>,
    #[serde(default)]
    pub allow_ai: bool,
}

#[derive(Debug, Deserialize)]
pub struct OptimizeRequest {
    pub resume_text: String,
    pub job_role: String,
    pub job_desc: Option<String>,
    pub accepted: Vec<SuggestionItem>,
}

#[derive(Debug, Serialize)]
pub struct OptimizeResponse {
    pub record: StructuredResumeRecord,
    /// Messages of the accepted suggestions a mechanical rule could apply.
    pub applied: Vec<String>,
}

/// POST /api/v1/analyze — multipart upload surface.
pub async fn handle_analyze(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<AnalysisResponse>, AppError> {
    let mut resume: Option<(String, Bytes)> = None;
    let mut job_role = String::new();
    let mut job_desc: Option<String> = None;
    let mut allow_ai = false;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("invalid multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "resume" => {
                let filename = field.file_name().unwrap_or("resume.txt").to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("could not read resume part: {e}")))?;
                resume = Some((filename, data));
            }
            "job_role" => job_role = read_text_field(field).await?,
            "job_desc" => job_desc = Some(read_text_field(field).await?),
            "allow_ai" => {
                let value = read_text_field(field).await?;
                allow_ai = matches!(value.trim(), "true" | "1" | "yes");
            }
            // Unknown parts ignored for forward compatibility.
            _ => {}
        }
    }

    let (filename, data) = resume
        .ok_or_else(|| AppError::Validation("missing 'resume' file part".to_string()))?;
    let doc = state.extractor.extract(&filename, &data)?;

    let response = state
        .analyzer
        .analyze(&doc, &job_role, job_desc.as_deref(), allow_ai)
        .await?;
    Ok(Json(response))
}

async fn read_text_field(field: axum::extract::multipart::Field<'_>) -> Result<String, AppError> {
    field
        .text()
        .await
        .map_err(|e| AppError::Validation(format!("could not read form field: {e}")))
}

/// POST /api/v1/analyze/text — JSON convenience surface.
pub async fn handle_analyze_text(
    State(state): State<AppState>,
    Json(req): Json<AnalyzeTextRequest>,
) -> Result<Json<AnalysisResponse>, AppError> {
    let doc = RawDocumentText::from_text(&req.resume_text);
    let response = state
        .analyzer
        .analyze(&doc, &req.job_role, req.job_desc.as_deref(), req.allow_ai)
        .await?;
    Ok(Json(response))
}

/// POST /api/v1/optimize — applies accepted suggestions rule-based and
/// returns the updated record. Binary rendering stays external.
pub async fn handle_optimize(
    State(state): State<AppState>,
    Json(req): Json<OptimizeRequest>,
) -> Result<Json<OptimizeResponse>, AppError> {
    let job = JobSpecification::build(&req.job_role, req.job_desc.as_deref())?;
    let doc = RawDocumentText::from_text(&req.resume_text);
    let mut record = state.analyzer.build_record(&doc);

    let applied = apply_suggestions(&mut record, &job, &req.accepted);
    Ok(Json(OptimizeResponse { record, applied }))
}

/// GET /api/v1/config — processing mode and limits for clients.
pub async fn handle_config(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "processing_mode": "hybrid",
        "primary_method": "deterministic_pipeline",
        "ai_augmentation_available": state.config.ai_api_key.is_some(),
        "supported_formats": ["txt"],
        "limits": {
            "max_upload_bytes": state.config.max_upload_bytes,
            "max_concurrent_requests": state.config.max_concurrent_requests,
            "ai_timeout_secs": state.config.ai_timeout_secs,
            "cache_ttl_secs": state.config.cache_ttl_secs,
        }
    }))
}
