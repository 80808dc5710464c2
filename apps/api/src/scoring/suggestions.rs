//! Rule-based suggestion generation from the deterministic findings.
//!
//! Every suggestion names a concrete defect the engine actually measured.
//! A missing section is reported once, by the component that owns it: the
//! format component only speaks for summary and contact, while experience,
//! skills, and education each announce their own absence.

use serde::{Deserialize, Serialize};

use crate::scoring::engine::{DeterministicAnalysis, ScoringConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreComponent {
    Keyword,
    Format,
    Experience,
    Skills,
    Education,
    /// Advice not tied to one scored component; AI-origin suggestions land
    /// here.
    General,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionOrigin {
    Deterministic,
    Ai,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestionItem {
    pub message: String,
    pub component: ScoreComponent,
    pub origin: SuggestionOrigin,
    pub priority: Priority,
}

fn item(component: ScoreComponent, priority: Priority, message: String) -> SuggestionItem {
    SuggestionItem {
        message,
        component,
        origin: SuggestionOrigin::Deterministic,
        priority,
    }
}

fn band(score: u8) -> Priority {
    if score < 50 {
        Priority::High
    } else {
        Priority::Medium
    }
}

const NAMED_TERMS: usize = 5;

fn join_terms(terms: &[String]) -> String {
    terms
        .iter()
        .take(NAMED_TERMS)
        .cloned()
        .collect::<Vec<_>>()
        .join(", ")
}

/// Generates deterministic suggestions for every component scoring below
/// the suggestion threshold.
pub fn generate(analysis: &DeterministicAnalysis, cfg: &ScoringConfig) -> Vec<SuggestionItem> {
    let b = analysis.breakdown;
    let threshold = cfg.suggestion_threshold;
    let mut out = Vec::new();

    if b.keyword < threshold {
        if analysis.keyword.missing.is_empty() {
            out.push(item(
                ScoreComponent::Keyword,
                band(b.keyword),
                "Work the job description's key terms into your experience bullets rather than \
                 only listing them."
                    .to_string(),
            ));
        } else {
            out.push(item(
                ScoreComponent::Keyword,
                band(b.keyword),
                format!(
                    "Add the job's missing keywords where you actually used them: {}.",
                    join_terms(&analysis.keyword.missing)
                ),
            ));
        }
    }

    if b.format < threshold {
        let f = &analysis.format;
        for section in &f.missing_sections {
            // Experience, skills, and education absences are reported by
            // their own components.
            match section.as_str() {
                "summary" => out.push(item(
                    ScoreComponent::Format,
                    Priority::Medium,
                    "Add a short professional summary at the top of the resume.".to_string(),
                )),
                "contact" => out.push(item(
                    ScoreComponent::Format,
                    Priority::High,
                    "Add contact details (email and phone) at the top of the resume.".to_string(),
                )),
                _ => {}
            }
        }
        if f.inverted_pairs > 0 {
            out.push(item(
                ScoreComponent::Format,
                Priority::High,
                "List work experience in reverse chronological order, most recent role first."
                    .to_string(),
            ));
        }
        if f.mixed_date_styles {
            out.push(item(
                ScoreComponent::Format,
                Priority::Low,
                "Use one date format consistently (for example \"Jan 2020 - Mar 2022\")."
                    .to_string(),
            ));
        }
        if f.unparsed_dates > 0 {
            out.push(item(
                ScoreComponent::Format,
                Priority::Medium,
                "Some dates could not be read; write them as month and year.".to_string(),
            ));
        }
        if !f.bullet_ratio_ok {
            let message = if f.bullet_ratio < cfg.bullet_ratio_band.0 {
                "Break long paragraphs into bullet points so trackers can parse each achievement."
            } else {
                "Too much of the resume is bullets; add role and section context around them."
            };
            out.push(item(
                ScoreComponent::Format,
                Priority::Low,
                message.to_string(),
            ));
        }
    }

    if b.experience < threshold {
        let e = &analysis.experience;
        if e.section_missing {
            out.push(item(
                ScoreComponent::Experience,
                Priority::High,
                "Add a work experience section with roles, employers, and dates.".to_string(),
            ));
        } else {
            if e.quantified_ratio.map_or(true, |r| r < 0.2) {
                out.push(item(
                    ScoreComponent::Experience,
                    Priority::High,
                    "Quantify achievements with numbers (\"reduced latency by 40%\", \
                     \"served 200+ clients\")."
                        .to_string(),
                ));
            }
            if e.title_overlap.map_or(false, |t| t < 0.5) {
                out.push(item(
                    ScoreComponent::Experience,
                    Priority::Medium,
                    "Align your job titles with the target role's wording where truthful."
                        .to_string(),
                ));
            }
            if let (Some(required), Some(detected)) = (e.required_years, e.detected_years) {
                if detected < required {
                    out.push(item(
                        ScoreComponent::Experience,
                        Priority::Medium,
                        format!(
                            "The role asks for {required:.0}+ years; make your {detected:.0} \
                             years of relevant work as visible as possible."
                        ),
                    ));
                }
            }
        }
    }

    if b.skills < threshold {
        let s = &analysis.skills;
        if !s.missing.is_empty() {
            out.push(item(
                ScoreComponent::Skills,
                band(b.skills),
                format!(
                    "Add the skills this role expects if you have them: {}.",
                    join_terms(&s.missing)
                ),
            ));
        }
        if !s.sentence_like.is_empty() {
            out.push(item(
                ScoreComponent::Skills,
                Priority::Low,
                "List skills as short comma-separated terms, not sentences.".to_string(),
            ));
        }
        if s.category_count < 2 && (s.missing.is_empty() && s.sentence_like.is_empty()) {
            out.push(item(
                ScoreComponent::Skills,
                Priority::Low,
                "Group skills under categories such as Languages, Frameworks, and Tools."
                    .to_string(),
            ));
        }
    }

    if b.education < threshold {
        let e = &analysis.education;
        if e.section_missing {
            out.push(item(
                ScoreComponent::Education,
                Priority::Medium,
                "Add an education section with your degree, institution, and graduation year."
                    .to_string(),
            ));
        } else if let (Some(required), detected) = (e.required_degree, e.detected_degree) {
            let below = detected.map_or(true, |d| d < required);
            if below {
                out.push(item(
                    ScoreComponent::Education,
                    Priority::Medium,
                    "State your highest completed degree explicitly; the role lists a degree \
                     requirement."
                        .to_string(),
                ));
            }
        }
    }

    out.sort_by_key(|s| s.priority);
    out
}

/// Human-readable summary of where the score came from.
pub fn explanation(analysis: &DeterministicAnalysis) -> String {
    let b = analysis.breakdown;
    let components = [
        ("keyword match", b.keyword),
        ("formatting", b.format),
        ("experience relevance", b.experience),
        ("skills coverage", b.skills),
        ("education", b.education),
    ];

    let strengths: Vec<String> = components
        .iter()
        .filter(|(_, score)| *score >= 80)
        .map(|(name, score)| format!("{name} ({score}/100)"))
        .collect();
    let gaps: Vec<String> = components
        .iter()
        .filter(|(_, score)| *score < 60)
        .map(|(name, score)| format!("{name} ({score}/100)"))
        .collect();

    let mut parts = vec![format!("Overall ATS score {}/100.", b.overall)];
    if !strengths.is_empty() {
        parts.push(format!("Strong areas: {}.", strengths.join(", ")));
    }
    if !gaps.is_empty() {
        parts.push(format!("Needs work: {}.", gaps.join(", ")));
    }
    if !analysis.keyword.missing.is_empty() {
        parts.push(format!(
            "Top missing keywords: {}.",
            join_terms(&analysis.keyword.missing)
        ));
    }
    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::RawDocumentText;
    use crate::job_spec::JobSpecification;
    use crate::parsing::builder::RecordBuilder;
    use crate::parsing::segmenter::VocabClassifier;
    use crate::scoring::engine::{ScoringConfig, ScoringEngine};
    use crate::scoring::matcher::match_keywords;
    use std::sync::Arc;

    fn analyze(resume: &str, role: &str, desc: Option<&str>) -> DeterministicAnalysis {
        let doc = RawDocumentText::from_text(resume);
        let builder = RecordBuilder::new(Arc::new(VocabClassifier::new())).unwrap();
        let record = builder.build(&doc);
        let job = JobSpecification::build(role, desc).unwrap();
        let report = match_keywords(&record, &job);
        ScoringEngine::new(ScoringConfig::default())
            .unwrap()
            .evaluate(&record, &doc, &job, report)
    }

    fn suggest(resume: &str, role: &str, desc: Option<&str>) -> Vec<SuggestionItem> {
        generate(&analyze(resume, role, desc), &ScoringConfig::default())
    }

    #[test]
    fn test_missing_education_reported_exactly_once() {
        let resume = "\
Jane Doe
jane@example.com

Summary
Backend engineer building Python services.

Experience
Engineer | Acme Corp
Jan 2020 - Present
• Built scalable Python services daily

Skills
Python, SQL";
        let suggestions = suggest(
            resume,
            "Software Engineer",
            Some("Bachelor's degree required. Python."),
        );

        let education_mentions = suggestions
            .iter()
            .filter(|s| s.message.to_lowercase().contains("education"))
            .count();
        assert_eq!(education_mentions, 1);
        let owner = suggestions
            .iter()
            .find(|s| s.message.to_lowercase().contains("education"))
            .unwrap();
        assert_eq!(owner.component, ScoreComponent::Education);
    }

    #[test]
    fn test_missing_keywords_named_in_message() {
        let resume = "\
Experience
Writer | Paper Co
Jan 2020 - Dec 2021
• Wrote long reports about many things";
        let suggestions = suggest(resume, "Engineer", Some("kubernetes kubernetes terraform"));

        let keyword = suggestions
            .iter()
            .find(|s| s.component == ScoreComponent::Keyword)
            .unwrap();
        assert!(keyword.message.contains("kubernetes"));
        assert!(keyword.message.contains("terraform"));
        assert_eq!(keyword.priority, Priority::High);
    }

    #[test]
    fn test_chronology_suggestion_names_ordering() {
        let resume = "\
Jane Doe
jane@example.com

Experience
Engineer | Initech
Jan 2017 - Dec 2019
• Shipped reporting pipelines for analysts

Engineer | Acme Corp
Jan 2020 - Present
• Built scalable Python services daily

Skills
Python

Education
BS Computer Science, State University
2013 - 2017";
        let suggestions = suggest(resume, "Engineer", Some("python"));
        assert!(suggestions
            .iter()
            .any(|s| s.component == ScoreComponent::Format
                && s.message.contains("reverse chronological order")));
    }

    #[test]
    fn test_high_scoring_resume_yields_few_suggestions() {
        let resume = "\
Jane Doe
jane@example.com | 555-123-4567
Austin, Texas

Summary
Software engineer building scalable Python services.

Experience
Software Engineer | Acme Corp
Jan 2020 - Present
• Built scalable Python apis, improved latency by 40%
• Reduced costs by 30% with docker and sql tuning

Skills
Languages: Python, SQL
Tools: Docker, Git

Education
BS Computer Science, State University
2013 - 2017";
        let analysis = analyze(resume, "Software Engineer", Some("python sql docker"));
        let suggestions = generate(&analysis, &ScoringConfig::default());
        // Nothing suggested for components above the threshold.
        for s in &suggestions {
            let score = match s.component {
                ScoreComponent::Keyword => analysis.breakdown.keyword,
                ScoreComponent::Format => analysis.breakdown.format,
                ScoreComponent::Experience => analysis.breakdown.experience,
                ScoreComponent::Skills => analysis.breakdown.skills,
                ScoreComponent::Education => analysis.breakdown.education,
                ScoreComponent::General => 100,
            };
            assert!(score < 80, "suggestion for healthy component {:?}", s.component);
        }
    }

    #[test]
    fn test_suggestions_sorted_by_priority() {
        let suggestions = suggest("", "Software Engineer", Some("python kubernetes"));
        let priorities: Vec<Priority> = suggestions.iter().map(|s| s.priority).collect();
        let mut sorted = priorities.clone();
        sorted.sort();
        assert_eq!(priorities, sorted);
        assert!(!suggestions.is_empty());
    }

    #[test]
    fn test_explanation_names_strengths_and_gaps() {
        let analysis = analyze("", "Software Engineer", Some("python"));
        let text = explanation(&analysis);
        assert!(text.contains("Overall ATS score 0/100"));
        assert!(text.contains("Needs work"));
        assert!(text.contains("python"));
    }
}
