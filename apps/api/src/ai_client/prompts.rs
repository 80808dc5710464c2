// Prompt construction for the resume-versus-job analysis call. The prompt
// is bounded: the job description is truncated and the record is already a
// distillation of the resume, so prompt size cannot grow with pathological
// input.

use serde_json::json;

use crate::ai_client::AiError;
use crate::job_spec::JobSpecification;
use crate::parsing::builder::StructuredResumeRecord;

/// Descriptions beyond this length add tokens without adding signal.
const MAX_DESCRIPTION_CHARS: usize = 2000;

pub const SYSTEM: &str = "You are an expert ATS (applicant tracking system) \
    and technical recruiter evaluating how well a resume fits a job. \
    You MUST respond with valid JSON only, matching this schema exactly: \
    {\"score\": <integer 0-100>, \
    \"breakdown\": {\"<component>\": <integer 0-100>, ...}, \
    \"suggestions\": [\"<specific, actionable improvement>\", ...]}. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences.";

/// Serializes the structured record and job spec into the analysis prompt.
pub fn build_analysis_prompt(
    record: &StructuredResumeRecord,
    job: &JobSpecification,
) -> Result<String, AiError> {
    let description = job
        .description
        .as_deref()
        .map(|d| truncate_chars(d, MAX_DESCRIPTION_CHARS))
        .unwrap_or_default();

    let keywords: Vec<&str> = job.keywords.iter().map(|k| k.term.as_str()).collect();

    let payload = json!({
        "job": {
            "role": job.role,
            "description": description,
            "keywords": keywords,
            "required_years": job.required_years,
            "required_degree": job.required_degree,
        },
        "resume": record,
    });

    Ok(format!(
        "Evaluate this structured resume against the job below. Score overall \
         fit 0-100, give a per-component breakdown, and list at most five \
         specific suggestions the candidate could act on.\n\n{}",
        serde_json::to_string_pretty(&payload)?
    ))
}

fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::RawDocumentText;
    use crate::parsing::builder::RecordBuilder;
    use crate::parsing::segmenter::VocabClassifier;
    use std::sync::Arc;

    #[test]
    fn test_prompt_truncates_long_description() {
        let builder = RecordBuilder::new(Arc::new(VocabClassifier::new())).unwrap();
        let record = builder.build(&RawDocumentText::from_text("Skills\nPython"));
        let long_desc = "python ".repeat(2000);
        let job = JobSpecification::build("Engineer", Some(&long_desc)).unwrap();

        let prompt = build_analysis_prompt(&record, &job).unwrap();
        assert!(prompt.len() < long_desc.len());
        assert!(prompt.contains("\"role\": \"Engineer\""));
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        let text = "résumé".repeat(10);
        let cut = truncate_chars(&text, 7);
        assert_eq!(cut.chars().count(), 7);
    }
}
