//! Rule-based application of accepted suggestions onto a structured record.
//!
//! Only mechanical edits are performed: inserting skills the job expects,
//! reordering experience, and scaffolding a missing education entry. The
//! enhancer never invents achievements — a suggestion like "quantify your
//! bullets" requires facts only the candidate has, so it is reported as not
//! applied.

use crate::job_spec::{DegreeLevel, JobSpecification};
use crate::parsing::builder::StructuredResumeRecord;
use crate::parsing::normalizer::{LineRange, ResumeEntry, SkillGroup};
use crate::scoring::suggestions::{ScoreComponent, SuggestionItem};

/// Applies each accepted suggestion where a mechanical rule exists and
/// returns the messages actually applied.
pub fn apply_suggestions(
    record: &mut StructuredResumeRecord,
    job: &JobSpecification,
    accepted: &[SuggestionItem],
) -> Vec<String> {
    let mut applied = Vec::new();

    for suggestion in accepted {
        let done = match suggestion.component {
            ScoreComponent::Skills | ScoreComponent::Keyword => {
                insert_missing_skills(record, job)
            }
            ScoreComponent::Format if suggestion.message.contains("chronological") => {
                reorder_experience(record)
            }
            ScoreComponent::Education if record.education.is_empty() => {
                scaffold_education(record, job);
                true
            }
            _ => false,
        };
        if done {
            applied.push(suggestion.message.clone());
        }
    }

    applied
}

/// Adds job-expected skills the record lacks, without duplicating existing
/// ones (case-insensitive).
fn insert_missing_skills(record: &mut StructuredResumeRecord, job: &JobSpecification) -> bool {
    let existing: Vec<String> = record
        .all_skills()
        .iter()
        .map(|s| s.to_lowercase())
        .collect();

    let additions: Vec<String> = job
        .expected_skills
        .iter()
        .filter(|skill| {
            let lower = skill.to_lowercase();
            !existing
                .iter()
                .any(|e| e == &lower || e.contains(&lower) || lower.contains(e.as_str()))
        })
        .cloned()
        .collect();

    if additions.is_empty() {
        return false;
    }

    // Prefer the existing flat group; create one only if every group is
    // categorized.
    match record.skills.iter_mut().find(|g| g.category.is_none()) {
        Some(group) => group.skills.extend(additions),
        None => record.skills.push(SkillGroup {
            category: None,
            skills: additions,
        }),
    }
    true
}

/// Stable sort into reverse chronological order; undated entries keep their
/// relative order after dated ones.
fn reorder_experience(record: &mut StructuredResumeRecord) -> bool {
    let key = |entry: &ResumeEntry| {
        entry
            .start
            .as_ref()
            .filter(|d| !d.unparsed)
            .map(|d| d.sort_key())
    };

    let before: Vec<_> = record.experience.iter().map(key).collect();
    record.experience.sort_by(|a, b| match (key(a), key(b)) {
        (Some(ka), Some(kb)) => kb.cmp(&ka),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
    let after: Vec<_> = record.experience.iter().map(key).collect();
    before != after
}

/// Placeholder education entry the candidate fills in; flagged for review
/// so it is never mistaken for parsed content.
fn scaffold_education(record: &mut StructuredResumeRecord, job: &JobSpecification) {
    let title = match job.required_degree {
        Some(DegreeLevel::Doctorate) => "Doctorate (add field, institution, year)",
        Some(DegreeLevel::Master) => "Master's degree (add field, institution, year)",
        Some(DegreeLevel::Bachelor) => "Bachelor's degree (add field, institution, year)",
        _ => "Education (add degree, institution, year)",
    };
    record.education.push(ResumeEntry {
        title: title.to_string(),
        organization: None,
        location: None,
        start: None,
        end: None,
        is_current: false,
        bullets: Vec::new(),
        needs_review: true,
        reconstructed: false,
        source: LineRange { start: 0, end: 0 },
    });
}
