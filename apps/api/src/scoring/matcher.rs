//! Keyword and relevance matching between a structured record and a job
//! specification.
//!
//! Every keyword occurrence is weighted by the section it appears in and
//! discounted for repetition so keyword stuffing stops paying off after two
//! occurrences. Synonym matches earn a fixed fraction of an exact match.

use serde::{Deserialize, Serialize};

use crate::job_spec::{JobKeyword, JobSpecification};
use crate::parsing::builder::{contains_term, StructuredResumeRecord};
use crate::parsing::segmenter::SectionLabel;

/// Ordinal section multipliers: a keyword proven in experience is worth
/// more than the same keyword merely listed under skills.
fn section_multiplier(label: SectionLabel) -> f64 {
    match label {
        SectionLabel::Experience => 1.0,
        SectionLabel::Skills => 0.9,
        SectionLabel::Summary => 0.75,
        SectionLabel::Projects => 0.6,
        SectionLabel::Education => 0.5,
        SectionLabel::Certifications | SectionLabel::Contact | SectionLabel::Other => 0.4,
    }
}

/// Occurrences beyond this count per keyword contribute at the discount.
const FULL_WEIGHT_OCCURRENCES: usize = 2;
const STUFFING_DISCOUNT: f64 = 0.25;
/// A synonym match is worth this fraction of an exact match.
const SYNONYM_CREDIT: f64 = 0.8;
/// Frequency contribution to keyword importance is capped to keep one
/// obsessively repeated job-description term from dominating the score.
const MAX_IMPORTANCE: u32 = 3;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchedKeyword {
    pub term: String,
    pub occurrences: u32,
    pub sections: Vec<SectionLabel>,
    /// Saturating per-keyword credit in [0, 1].
    pub credit: f64,
    pub via_synonym: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordMatchReport {
    pub score: u8,
    pub matched: Vec<MatchedKeyword>,
    /// Job keywords with zero credit, most important first.
    pub missing: Vec<String>,
}

/// Section-tagged text pieces extracted once per record.
fn section_texts(record: &StructuredResumeRecord) -> Vec<(SectionLabel, String)> {
    let mut texts = Vec::new();

    if let Some(summary) = &record.summary {
        texts.push((SectionLabel::Summary, summary.to_lowercase()));
    }

    let entry_text = |entries: &[crate::parsing::normalizer::ResumeEntry]| {
        entries
            .iter()
            .map(|e| {
                let mut parts = vec![e.title.clone()];
                if let Some(org) = &e.organization {
                    parts.push(org.clone());
                }
                parts.extend(e.bullets.iter().cloned());
                parts.join("\n")
            })
            .collect::<Vec<_>>()
            .join("\n")
            .to_lowercase()
    };

    if !record.experience.is_empty() {
        texts.push((SectionLabel::Experience, entry_text(&record.experience)));
    }
    if !record.projects.is_empty() {
        texts.push((SectionLabel::Projects, entry_text(&record.projects)));
    }
    if !record.education.is_empty() {
        texts.push((SectionLabel::Education, entry_text(&record.education)));
    }
    if !record.skills.is_empty() {
        let skills = record
            .skills
            .iter()
            .flat_map(|g| {
                g.category
                    .iter()
                    .cloned()
                    .chain(g.skills.iter().cloned())
                    .collect::<Vec<_>>()
            })
            .collect::<Vec<_>>()
            .join("\n")
            .to_lowercase();
        texts.push((SectionLabel::Skills, skills));
    }
    if !record.certifications.is_empty() {
        texts.push((
            SectionLabel::Certifications,
            record.certifications.join("\n").to_lowercase(),
        ));
    }

    texts
}

fn count_in(text: &str, term: &str) -> usize {
    let term_lower = term.to_lowercase();
    let mut count = 0;
    let mut rest = text;
    while contains_term(rest, &term_lower) {
        count += 1;
        match rest.find(&term_lower) {
            Some(pos) => rest = &rest[pos + term_lower.len()..],
            None => break,
        }
    }
    count
}

/// Computes the keyword match score and the matched/missing keyword lists.
pub fn match_keywords(
    record: &StructuredResumeRecord,
    job: &JobSpecification,
) -> KeywordMatchReport {
    let texts = section_texts(record);

    let mut matched = Vec::new();
    let mut missing: Vec<&JobKeyword> = Vec::new();
    let mut earned = 0.0_f64;
    let mut available = 0.0_f64;

    for keyword in &job.keywords {
        let importance = keyword.frequency.min(MAX_IMPORTANCE).max(1) as f64;
        available += importance;

        // Collect every occurrence's contribution, exact first, synonyms at
        // the reduced rate, then apply the stuffing discount by rank.
        let mut contributions: Vec<f64> = Vec::new();
        let mut sections = Vec::new();
        let mut via_synonym = false;

        for (label, text) in &texts {
            let exact = count_in(text, &keyword.term);
            if exact > 0 {
                sections.push(*label);
            }
            for _ in 0..exact {
                contributions.push(section_multiplier(*label));
            }
            for synonym in &keyword.synonyms {
                let syn = count_in(text, synonym);
                if syn > 0 {
                    via_synonym = true;
                    if !sections.contains(label) {
                        sections.push(*label);
                    }
                }
                for _ in 0..syn {
                    contributions.push(section_multiplier(*label) * SYNONYM_CREDIT);
                }
            }
        }

        if contributions.is_empty() {
            missing.push(keyword);
            continue;
        }

        contributions.sort_by(|a, b| b.partial_cmp(a).expect("finite weights"));
        let credit: f64 = contributions
            .iter()
            .enumerate()
            .map(|(rank, w)| {
                if rank < FULL_WEIGHT_OCCURRENCES {
                    *w
                } else {
                    *w * STUFFING_DISCOUNT
                }
            })
            .sum::<f64>()
            .min(1.0);

        earned += importance * credit;
        matched.push(MatchedKeyword {
            term: keyword.term.clone(),
            occurrences: contributions.len() as u32,
            sections,
            credit,
            via_synonym,
        });
    }

    let score = if available > 0.0 {
        ((earned / available) * 100.0).round().clamp(0.0, 100.0) as u8
    } else {
        0
    };

    // Most important first; ties alphabetical for determinism.
    missing.sort_by(|a, b| b.frequency.cmp(&a.frequency).then_with(|| a.term.cmp(&b.term)));
    let missing = missing.into_iter().map(|k| k.term.clone()).collect();

    KeywordMatchReport {
        score,
        matched,
        missing,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::builder::{
        Completeness, ContactInfo, SectionCompleteness, StructuredResumeRecord,
    };
    use crate::parsing::normalizer::{LineRange, ResumeEntry, SkillGroup};

    fn make_entry(title: &str, bullets: &[&str]) -> ResumeEntry {
        ResumeEntry {
            title: title.to_string(),
            organization: None,
            location: None,
            start: None,
            end: None,
            is_current: false,
            bullets: bullets.iter().map(|b| b.to_string()).collect(),
            needs_review: false,
            reconstructed: false,
            source: LineRange { start: 0, end: 1 },
        }
    }

    fn make_record(experience: Vec<ResumeEntry>, skills: Vec<&str>) -> StructuredResumeRecord {
        StructuredResumeRecord {
            contact: ContactInfo::default(),
            summary: None,
            experience,
            education: Vec::new(),
            projects: Vec::new(),
            skills: if skills.is_empty() {
                Vec::new()
            } else {
                vec![SkillGroup {
                    category: None,
                    skills: skills.iter().map(|s| s.to_string()).collect(),
                }]
            },
            certifications: Vec::new(),
            completeness: SectionCompleteness {
                contact: Completeness::Missing,
                summary: Completeness::Missing,
                experience: Completeness::Present,
                skills: Completeness::Present,
                education: Completeness::Missing,
            },
            reliable: true,
        }
    }

    fn job(desc: &str) -> JobSpecification {
        JobSpecification::build("Engineer", Some(desc)).unwrap()
    }

    #[test]
    fn test_scenario_a_strong_overlap_scores_high() {
        let record = make_record(
            vec![make_entry(
                "Software Engineer",
                &["Built scalable Python services, improved latency by 40%"],
            )],
            vec!["Python"],
        );
        let spec = job("Python python scalable latency");
        let report = match_keywords(&record, &spec);

        assert!(
            report.score >= 80,
            "expected >= 80, got {}",
            report.score
        );
        assert!(report.missing.is_empty());
    }

    #[test]
    fn test_missing_keywords_sorted_by_frequency_then_alpha() {
        let record = make_record(vec![], vec![]);
        let spec = job("kafka kafka kafka airflow airflow zookeeper zookeeper spark spark");
        let report = match_keywords(&record, &spec);

        assert_eq!(report.score, 0);
        let kafka_pos = report.missing.iter().position(|m| m == "kafka").unwrap();
        let airflow_pos = report.missing.iter().position(|m| m == "airflow").unwrap();
        let spark_pos = report.missing.iter().position(|m| m == "spark").unwrap();
        assert!(kafka_pos < airflow_pos);
        // Equal frequency resolves alphabetically.
        assert!(airflow_pos < spark_pos);
    }

    #[test]
    fn test_stuffing_discount_caps_repeated_matches() {
        let stuffed = make_record(
            vec![make_entry(
                "Engineer",
                &["python python python python python python python python"],
            )],
            vec![],
        );
        let honest = make_record(
            vec![make_entry("Engineer", &["python services in production"])],
            vec!["python"],
        );
        let spec = job("python developer python");

        let stuffed_credit = match_keywords(&stuffed, &spec).matched[0].credit;
        let honest_credit = match_keywords(&honest, &spec).matched[0].credit;

        // Two honest occurrences already saturate; eight stuffed ones earn
        // no more than that.
        assert!(stuffed_credit <= 1.0);
        assert!(honest_credit >= 1.0 - f64::EPSILON);
    }

    #[test]
    fn test_synonym_matches_at_reduced_credit() {
        let record = make_record(
            vec![make_entry("Engineer", &["Deployed workloads to k8s clusters"])],
            vec![],
        );
        let spec = job("kubernetes kubernetes");
        let report = match_keywords(&record, &spec);

        let m = report
            .matched
            .iter()
            .find(|m| m.term == "kubernetes")
            .unwrap();
        assert!(m.via_synonym);
        assert!((m.credit - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_experience_outweighs_other_sections() {
        let in_experience = make_record(
            vec![make_entry("Engineer", &["shipped docker deployments"])],
            vec![],
        );
        let in_certs_only = {
            let mut r = make_record(vec![], vec![]);
            r.certifications = vec!["Docker Certified Associate".to_string()];
            r
        };
        let spec = job("docker docker");

        let exp_credit = match_keywords(&in_experience, &spec).matched[0].credit;
        let cert_credit = match_keywords(&in_certs_only, &spec).matched[0].credit;
        assert!(exp_credit > cert_credit);
    }

    #[test]
    fn test_empty_record_scores_zero_without_panic() {
        let record = make_record(vec![], vec![]);
        let spec = job("python sql docker");
        let report = match_keywords(&record, &spec);
        assert_eq!(report.score, 0);
        assert!(report.matched.is_empty());
    }
}
