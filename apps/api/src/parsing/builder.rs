//! Structured record assembly — the last structuring stage.
//!
//! Aggregates segmenter and normalizer output into one canonical
//! `StructuredResumeRecord`. When an expected section produced zero entries
//! the builder re-scans the whole document for that section's marker
//! vocabulary before declaring it missing, so no input text can produce an
//! unrecoverable state. Worst case is a record with every section `Missing`,
//! low scores, and suggestions pointing at the gaps.

use std::sync::Arc;

use anyhow::Result;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::extract::{Line, RawDocumentText};
use crate::parsing::normalizer::{Normalizer, ResumeEntry, SkillGroup};
use crate::parsing::segmenter::{HeadingClassifier, SectionLabel, SectionSpan, Segmenter};

/// How a section's content was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Completeness {
    Present,
    Reconstructed,
    Missing,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionCompleteness {
    pub contact: Completeness,
    pub summary: Completeness,
    pub experience: Completeness,
    pub skills: Completeness,
    pub education: Completeness,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContactInfo {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub linkedin: Option<String>,
    pub location: Option<String>,
}

/// The canonical per-request aggregate every scoring stage reads from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredResumeRecord {
    pub contact: ContactInfo,
    pub summary: Option<String>,
    pub experience: Vec<ResumeEntry>,
    pub education: Vec<ResumeEntry>,
    pub projects: Vec<ResumeEntry>,
    pub skills: Vec<SkillGroup>,
    pub certifications: Vec<String>,
    pub completeness: SectionCompleteness,
    /// True when at most one of experience, skills, education is missing.
    /// Feeds the hybrid dispatch policy.
    pub reliable: bool,
}

impl StructuredResumeRecord {
    pub fn all_skills(&self) -> Vec<&str> {
        self.skills
            .iter()
            .flat_map(|g| g.skills.iter().map(|s| s.as_str()))
            .collect()
    }
}

/// Skill vocabulary used for whole-document reconstruction when no skills
/// section was found. Terms here also seed the job-side expansion table.
pub const KNOWN_SKILL_TERMS: &[&str] = &[
    "python", "java", "javascript", "typescript", "c++", "c#", "go", "rust", "sql", "html",
    "css", "react", "angular", "vue", "node.js", "django", "flask", "spring", "docker",
    "kubernetes", "terraform", "ansible", "aws", "azure", "gcp", "git", "jenkins", "ci/cd",
    "machine learning", "deep learning", "tensorflow", "pytorch", "pandas", "numpy", "spark",
    "kafka", "redis", "mongodb", "postgresql", "mysql", "elasticsearch", "graphql", "rest",
    "api", "microservices", "agile", "scrum", "linux", "excel", "tableau", "power bi",
];

const DEGREE_KEYWORDS: &[&str] = &[
    "bachelor", "master", "phd", "doctorate", "b.tech", "m.tech", "b.sc", "m.sc", "b.s.",
    "m.s.", "bs ", "ms ", "mba", "associate", "diploma",
];

pub struct RecordBuilder {
    segmenter: Segmenter,
    normalizer: Normalizer,
    email: Regex,
    phone: Regex,
    linkedin: Regex,
    location: Regex,
}

impl RecordBuilder {
    pub fn new(classifier: Arc<dyn HeadingClassifier>) -> Result<Self> {
        Ok(Self {
            segmenter: Segmenter::new(classifier),
            normalizer: Normalizer::new()?,
            email: Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b")?,
            phone: Regex::new(r"(?:\+\d{1,3}[\s-]?)?\(?\d{3}\)?[\s.-]?\d{3}[\s.-]?\d{4}\b")?,
            linkedin: Regex::new(r"(?i)linkedin\.com/in/[^\s|]+")?,
            location: Regex::new(r"\b[A-Z][a-z]+,\s*[A-Z][A-Za-z]+\b")?,
        })
    }

    /// Builds the canonical record. Pure over its input and never fails:
    /// an empty document yields a record with every section `Missing`.
    pub fn build(&self, doc: &RawDocumentText) -> StructuredResumeRecord {
        let spans = self.segmenter.segment(doc);

        let mut summary = None;
        let mut experience = Vec::new();
        let mut education = Vec::new();
        let mut projects = Vec::new();
        let mut skills = Vec::new();
        let mut certifications = Vec::new();

        for span in &spans {
            let body = self.span_body(doc, span);
            match span.label {
                SectionLabel::Summary => summary = self.normalizer.summary(body),
                SectionLabel::Experience => experience = self.normalizer.entries(body),
                SectionLabel::Education => education = self.normalizer.entries(body),
                SectionLabel::Projects => projects = self.normalizer.entries(body),
                SectionLabel::Skills => skills = self.normalizer.skills(body),
                SectionLabel::Certifications => {
                    certifications = self.normalizer.certifications(body)
                }
                SectionLabel::Contact | SectionLabel::Other => {}
            }
        }

        let contact = self.extract_contact(doc);

        // Reconstruction: an expected section with zero entries gets one
        // whole-document re-scan for its marker vocabulary before being
        // declared missing. Entries found this way are marked as such.
        let experience_state = if !experience.is_empty() {
            Completeness::Present
        } else {
            experience = self.reconstruct_experience(doc, &spans);
            if experience.is_empty() {
                Completeness::Missing
            } else {
                debug!("reconstructed {} experience entries", experience.len());
                Completeness::Reconstructed
            }
        };

        let education_state = if !education.is_empty() {
            Completeness::Present
        } else {
            education = self.reconstruct_education(doc);
            if education.is_empty() {
                Completeness::Missing
            } else {
                Completeness::Reconstructed
            }
        };

        let skills_state = if !skills.is_empty() {
            Completeness::Present
        } else {
            skills = reconstruct_skills(doc);
            if skills.is_empty() {
                Completeness::Missing
            } else {
                Completeness::Reconstructed
            }
        };

        let completeness = SectionCompleteness {
            contact: presence(contact.email.is_some() || contact.name.is_some()),
            summary: presence(summary.is_some()),
            experience: experience_state,
            skills: skills_state,
            education: education_state,
        };

        let missing_expected = [
            completeness.experience,
            completeness.skills,
            completeness.education,
        ]
        .iter()
        .filter(|c| **c == Completeness::Missing)
        .count();

        StructuredResumeRecord {
            contact,
            summary,
            experience,
            education,
            projects,
            skills,
            certifications,
            completeness,
            reliable: missing_expected <= 1,
        }
    }

    fn span_body<'a>(&self, doc: &'a RawDocumentText, span: &SectionSpan) -> &'a [Line] {
        let start = self.segmenter.content_start(doc, span);
        &doc.lines[start.min(span.end)..span.end]
    }

    fn extract_contact(&self, doc: &RawDocumentText) -> ContactInfo {
        let text = doc
            .lines
            .iter()
            .map(|l| l.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        let email = self.email.find(&text).map(|m| m.as_str().to_string());
        let phone = self.phone.find(&text).map(|m| m.as_str().to_string());
        let linkedin = self.linkedin.find(&text).map(|m| m.as_str().to_string());

        // Name: first five non-empty lines, 2-4 title-case words, no contact
        // keywords. Positional heuristic only; works even with zero headings.
        let name = doc
            .lines
            .iter()
            .filter(|l| !l.text.is_empty())
            .take(5)
            .find(|l| is_likely_name(&l.text))
            .map(|l| l.text.clone());

        let location = doc
            .lines
            .iter()
            .filter(|l| !l.text.is_empty())
            .take(10)
            .find_map(|l| {
                if self.email.is_match(&l.text) || self.linkedin.is_match(&l.text) {
                    return None;
                }
                self.location.find(&l.text).map(|m| m.as_str().to_string())
            });

        ContactInfo {
            name,
            email,
            phone,
            linkedin,
            location,
        }
    }

    /// Re-scan for experience markers: any line carrying a date range opens
    /// an entry, lines after it attach until the next marker or a blank line.
    fn reconstruct_experience(
        &self,
        doc: &RawDocumentText,
        spans: &[SectionSpan],
    ) -> Vec<ResumeEntry> {
        let dates = self.normalizer.date_parser();
        // Only mine regions that were not claimed by another recognized
        // section; education date ranges must not leak into experience.
        let candidate_lines: Vec<Line> = spans
            .iter()
            .filter(|s| s.label == SectionLabel::Other || s.label == SectionLabel::Experience)
            .flat_map(|s| doc.lines[s.start..s.end].iter().cloned())
            .collect();

        let has_marker = candidate_lines
            .iter()
            .any(|l| dates.contains_range(&l.text));
        if !has_marker {
            return Vec::new();
        }

        let mut entries = self.normalizer.entries(&candidate_lines);
        entries.retain(|e| e.start.is_some());
        for entry in entries.iter_mut() {
            entry.reconstructed = true;
            entry.needs_review = true;
        }
        entries
    }

    /// Re-scan for degree keywords anywhere in the document.
    fn reconstruct_education(&self, doc: &RawDocumentText) -> Vec<ResumeEntry> {
        let degree_lines: Vec<Line> = doc
            .lines
            .iter()
            .filter(|l| {
                let lowered = l.text.to_lowercase();
                DEGREE_KEYWORDS.iter().any(|k| lowered.contains(k))
            })
            .cloned()
            .collect();

        let mut entries = self.normalizer.entries(&degree_lines);
        entries.retain(|e| !e.title.is_empty());
        for entry in entries.iter_mut() {
            entry.reconstructed = true;
            entry.needs_review = true;
        }
        entries
    }
}

/// Flat skill group mined from known terms across the whole document.
fn reconstruct_skills(doc: &RawDocumentText) -> Vec<SkillGroup> {
    let text = doc
        .lines
        .iter()
        .map(|l| l.text.to_lowercase())
        .collect::<Vec<_>>()
        .join("\n");

    let mut found: Vec<String> = Vec::new();
    for term in KNOWN_SKILL_TERMS {
        if contains_term(&text, term) && !found.iter().any(|f| f.eq_ignore_ascii_case(term)) {
            found.push(term.to_string());
        }
    }

    if found.is_empty() {
        Vec::new()
    } else {
        vec![SkillGroup {
            category: None,
            skills: found,
        }]
    }
}

/// Word-boundary-aware containment that tolerates terms with punctuation
/// ("c++", "node.js").
pub fn contains_term(haystack_lower: &str, term: &str) -> bool {
    let term = term.to_lowercase();
    let mut from = 0;
    while let Some(pos) = haystack_lower[from..].find(&term) {
        let start = from + pos;
        let end = start + term.len();
        let before_ok = start == 0
            || !haystack_lower[..start]
                .chars()
                .next_back()
                .map_or(false, |c| c.is_alphanumeric());
        let term_ends_alnum = term.chars().next_back().map_or(false, |c| c.is_alphanumeric());
        let after_ok = !term_ends_alnum
            || !haystack_lower[end..]
                .chars()
                .next()
                .map_or(false, |c| c.is_alphanumeric());
        if before_ok && after_ok {
            return true;
        }
        from = end;
    }
    false
}

fn presence(found: bool) -> Completeness {
    if found {
        Completeness::Present
    } else {
        Completeness::Missing
    }
}

fn is_likely_name(line: &str) -> bool {
    let lowered = line.to_lowercase();
    if ["email", "phone", "linkedin", "address", "location", "@", "http"]
        .iter()
        .any(|k| lowered.contains(k))
    {
        return false;
    }
    let words: Vec<&str> = line.split_whitespace().collect();
    (2..=4).contains(&words.len())
        && words
            .iter()
            .all(|w| w.chars().next().map_or(false, |c| c.is_uppercase()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::segmenter::VocabClassifier;

    fn builder() -> RecordBuilder {
        RecordBuilder::new(Arc::new(VocabClassifier::new())).unwrap()
    }

    const SAMPLE: &str = "\
Jane Doe
jane.doe@example.com | 555-123-4567 | linkedin.com/in/janedoe
Austin, Texas

Summary
Backend engineer focused on data platforms.

Experience
Senior Engineer | Acme Corp
Jan 2020 - Present
• Built scalable Python services
• Improved latency by 40%

Skills
Python, SQL, Docker

Education
BS Computer Science, State University
2015 - 2019";

    #[test]
    fn test_full_record_assembly() {
        let record = builder().build(&RawDocumentText::from_text(SAMPLE));

        assert_eq!(record.contact.name.as_deref(), Some("Jane Doe"));
        assert_eq!(record.contact.email.as_deref(), Some("jane.doe@example.com"));
        assert_eq!(record.contact.phone.as_deref(), Some("555-123-4567"));
        assert_eq!(
            record.contact.linkedin.as_deref(),
            Some("linkedin.com/in/janedoe")
        );
        assert!(record.summary.is_some());
        assert_eq!(record.experience.len(), 1);
        assert_eq!(record.education.len(), 1);
        assert_eq!(record.all_skills(), vec!["Python", "SQL", "Docker"]);
        assert_eq!(record.completeness.experience, Completeness::Present);
        assert!(record.reliable);
    }

    #[test]
    fn test_empty_document_is_all_missing_and_does_not_raise() {
        let record = builder().build(&RawDocumentText::from_text(""));

        assert_eq!(record.completeness.experience, Completeness::Missing);
        assert_eq!(record.completeness.skills, Completeness::Missing);
        assert_eq!(record.completeness.education, Completeness::Missing);
        assert_eq!(record.completeness.contact, Completeness::Missing);
        assert!(record.experience.is_empty());
        assert!(!record.reliable);
    }

    #[test]
    fn test_reliability_tolerates_one_missing_section() {
        // No education anywhere; experience and skills present.
        let text = "Experience\nEngineer | Acme Corp\nJan 2020 - Present\n• Shipped things quickly\n\nSkills\nPython, SQL";
        let record = builder().build(&RawDocumentText::from_text(text));
        assert_eq!(record.completeness.education, Completeness::Missing);
        assert!(record.reliable);
    }

    #[test]
    fn test_experience_reconstruction_without_heading() {
        // No recognizable headings at all, but a date-range line exists.
        let text = "Jane Doe\nAcme Corp Engineer Jan 2020 - Dec 2021\n• Built the data pipeline for analytics";
        let record = builder().build(&RawDocumentText::from_text(text));

        assert_eq!(record.completeness.experience, Completeness::Reconstructed);
        assert_eq!(record.experience.len(), 1);
        assert!(record.experience[0].reconstructed);
        assert!(record.experience[0].needs_review);
    }

    #[test]
    fn test_skills_reconstruction_from_known_terms() {
        let text = "Jane Doe\nWorked with Python and Docker on AWS infrastructure";
        let record = builder().build(&RawDocumentText::from_text(text));

        assert_eq!(record.completeness.skills, Completeness::Reconstructed);
        let skills = record.all_skills();
        assert!(skills.contains(&"python"));
        assert!(skills.contains(&"docker"));
        assert!(skills.contains(&"aws"));
    }

    #[test]
    fn test_education_reconstruction_from_degree_keywords() {
        let text = "Jane Doe\nSomewhere in the text: Bachelor of Science, State University 2018";
        let record = builder().build(&RawDocumentText::from_text(text));
        assert_eq!(record.completeness.education, Completeness::Reconstructed);
        assert!(!record.education.is_empty());
    }

    #[test]
    fn test_education_dates_do_not_leak_into_experience() {
        let text = "Education\nBS Computer Science, State University\n2015 - 2019";
        let record = builder().build(&RawDocumentText::from_text(text));
        assert_eq!(record.completeness.experience, Completeness::Missing);
        assert!(record.experience.is_empty());
    }

    #[test]
    fn test_contains_term_boundaries() {
        assert!(contains_term("expert in c++ and go", "c++"));
        assert!(contains_term("uses node.js daily", "node.js"));
        assert!(!contains_term("javascript", "java"));
        assert!(contains_term("java and javascript", "java"));
    }
}
