//! ATS scoring engine — five weighted components over the structured record.
//!
//! Component weights are fixed (keyword 35, format 25, experience 20,
//! skills 15, education 5); the numeric penalties and thresholds inside each
//! component are policy defaults carried in `ScoringConfig`, not spec
//! constants. Every component clamps to [0, 100] before weighting and the
//! overall score is the rounded weighted sum of the stored components.

use anyhow::Result;
use chrono::Datelike;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::extract::RawDocumentText;
use crate::job_spec::{DegreeLevel, JobSpecification};
use crate::parsing::builder::{contains_term, Completeness, StructuredResumeRecord};
use crate::parsing::dates::DateStyle;
use crate::parsing::normalizer::ResumeEntry;
use crate::scoring::matcher::KeywordMatchReport;

pub const WEIGHT_KEYWORD: f64 = 0.35;
pub const WEIGHT_FORMAT: f64 = 0.25;
pub const WEIGHT_EXPERIENCE: f64 = 0.20;
pub const WEIGHT_SKILLS: f64 = 0.15;
pub const WEIGHT_EDUCATION: f64 = 0.05;

/// Tunable scoring policy. Defaults are the documented baseline; nothing
/// here changes the component weights, which are fixed.
#[derive(Debug, Clone)]
pub struct ScoringConfig {
    /// Components below this score generate suggestions.
    pub suggestion_threshold: u8,
    /// Hybrid dispatch: deterministic scores within `ambiguity_band` of
    /// this threshold count as genuinely ambiguous.
    pub decision_threshold: u8,
    pub ambiguity_band: u8,
    /// Jobs whose keyword set is more than this fraction unknown to the
    /// expansion vocabulary count as niche.
    pub niche_fraction: f64,
    pub missing_section_penalty: f64,
    /// Scales with the fraction of inverted adjacent experience pairs.
    pub chronology_penalty: f64,
    pub mixed_date_style_penalty: f64,
    pub unparsed_date_penalty: f64,
    pub unparsed_date_penalty_cap: f64,
    pub layout_penalty: f64,
    pub bullet_ratio_band: (f64, f64),
    pub skill_category_bonus: f64,
    pub sentence_skill_penalty: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            suggestion_threshold: 80,
            decision_threshold: 65,
            ambiguity_band: 10,
            niche_fraction: 0.25,
            missing_section_penalty: 20.0,
            chronology_penalty: 25.0,
            mixed_date_style_penalty: 10.0,
            unparsed_date_penalty: 2.0,
            unparsed_date_penalty_cap: 10.0,
            layout_penalty: 10.0,
            bullet_ratio_band: (0.15, 0.85),
            skill_category_bonus: 10.0,
            sentence_skill_penalty: 15.0,
        }
    }
}

/// The five component scores plus the weighted overall.
/// Invariant: `overall == round(Σ componentᵢ · weightᵢ)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub keyword: u8,
    pub format: u8,
    pub experience: u8,
    pub skills: u8,
    pub education: u8,
    pub overall: u8,
}

impl ScoreBreakdown {
    pub fn from_components(
        keyword: u8,
        format: u8,
        experience: u8,
        skills: u8,
        education: u8,
    ) -> Self {
        let overall = (keyword as f64 * WEIGHT_KEYWORD
            + format as f64 * WEIGHT_FORMAT
            + experience as f64 * WEIGHT_EXPERIENCE
            + skills as f64 * WEIGHT_SKILLS
            + education as f64 * WEIGHT_EDUCATION)
            .round() as u8;
        Self {
            keyword,
            format,
            experience,
            skills,
            education,
            overall,
        }
    }

    pub fn zero() -> Self {
        Self::from_components(0, 0, 0, 0, 0)
    }
}

/// What the format component found; feeds suggestion generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormatFindings {
    pub missing_sections: Vec<String>,
    pub inverted_pairs: usize,
    pub dated_pairs: usize,
    pub mixed_date_styles: bool,
    pub unparsed_dates: usize,
    pub bullet_ratio: f64,
    pub bullet_ratio_ok: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperienceFindings {
    pub section_missing: bool,
    pub title_overlap: Option<f64>,
    pub detected_years: Option<f64>,
    pub required_years: Option<f64>,
    /// Quantified bullets over total bullets; `None` when there are no
    /// bullets to judge.
    pub quantified_ratio: Option<f64>,
    pub tech_overlap: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillsFindings {
    pub matched: Vec<String>,
    pub missing: Vec<String>,
    pub category_count: usize,
    pub sentence_like: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EducationFindings {
    pub section_missing: bool,
    pub detected_degree: Option<DegreeLevel>,
    pub required_degree: Option<DegreeLevel>,
}

/// Full deterministic analysis: the breakdown plus per-component findings
/// that suggestion generation names concretely.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeterministicAnalysis {
    pub breakdown: ScoreBreakdown,
    pub keyword: KeywordMatchReport,
    pub format: FormatFindings,
    pub experience: ExperienceFindings,
    pub skills: SkillsFindings,
    pub education: EducationFindings,
}

pub struct ScoringEngine {
    cfg: ScoringConfig,
    quantified: Vec<Regex>,
}

impl ScoringEngine {
    pub fn new(cfg: ScoringConfig) -> Result<Self> {
        let quantified = [
            r"\d+(?:\.\d+)?%",
            r"\d+(?:\.\d+)?x\b",
            r"[$€£]\s?\d",
            r"\d+\+",
            r"(?i)\b(?:increased|reduced|improved|grew|decreased|saved|cut)\b.*\d",
        ]
        .iter()
        .map(|p| Regex::new(p))
        .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { cfg, quantified })
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.cfg
    }

    /// Computes the full deterministic analysis. Pure: identical inputs
    /// always yield an identical analysis.
    pub fn evaluate(
        &self,
        record: &StructuredResumeRecord,
        doc: &RawDocumentText,
        job: &JobSpecification,
        keyword: KeywordMatchReport,
    ) -> DeterministicAnalysis {
        let format = self.format_findings(record, doc);
        let experience = self.experience_findings(record, job);
        let skills = self.skills_findings(record, job);
        let education = EducationFindings {
            section_missing: record.education.is_empty(),
            detected_degree: best_degree(&record.education),
            required_degree: job.required_degree,
        };

        let breakdown = ScoreBreakdown::from_components(
            keyword.score,
            self.format_score(&format),
            self.experience_score(&experience),
            self.skills_score(record, &skills, job),
            education_score(&education, record, job),
        );

        DeterministicAnalysis {
            breakdown,
            keyword,
            format,
            experience,
            skills,
            education,
        }
    }

    fn format_findings(
        &self,
        record: &StructuredResumeRecord,
        doc: &RawDocumentText,
    ) -> FormatFindings {
        // Reconstructed counts as present: the content exists even if the
        // candidate's headings were unusual.
        let mut missing_sections = Vec::new();
        let expected = [
            ("contact", record.completeness.contact),
            ("summary", record.completeness.summary),
            ("experience", record.completeness.experience),
            ("skills", record.completeness.skills),
            ("education", record.completeness.education),
        ];
        for (name, state) in expected {
            if state == Completeness::Missing {
                missing_sections.push(name.to_string());
            }
        }

        // Reverse-chronological order expected: each adjacent pair of dated
        // experience entries should not ascend.
        let mut inverted_pairs = 0;
        let mut dated_pairs = 0;
        let dated: Vec<(i32, u32)> = record
            .experience
            .iter()
            .filter_map(|e| e.start.as_ref())
            .filter(|d| !d.unparsed)
            .map(|d| d.sort_key())
            .collect();
        for pair in dated.windows(2) {
            dated_pairs += 1;
            if pair[0] < pair[1] {
                inverted_pairs += 1;
            }
        }

        let mut styles: Vec<DateStyle> = Vec::new();
        let mut unparsed_dates = 0;
        for entry in record.experience.iter().chain(record.education.iter()) {
            for date in entry.start.iter().chain(entry.end.iter()) {
                if date.unparsed {
                    unparsed_dates += 1;
                } else if let Some(style) = date.style {
                    if !styles.contains(&style) {
                        styles.push(style);
                    }
                }
            }
        }

        let bullet_count: usize = record
            .experience
            .iter()
            .chain(record.projects.iter())
            .map(|e| e.bullets.len())
            .sum();
        let content_lines = doc.non_empty_count();
        let bullet_ratio = if content_lines > 0 {
            bullet_count as f64 / content_lines as f64
        } else {
            0.0
        };
        let (lo, hi) = self.cfg.bullet_ratio_band;
        // Only judge layout when there is content to judge.
        let bullet_ratio_ok = content_lines == 0 || (bullet_ratio >= lo && bullet_ratio <= hi);

        FormatFindings {
            missing_sections,
            inverted_pairs,
            dated_pairs,
            mixed_date_styles: styles.len() > 1,
            unparsed_dates,
            bullet_ratio,
            bullet_ratio_ok,
        }
    }

    fn format_score(&self, f: &FormatFindings) -> u8 {
        let mut score = 100.0;
        score -= f.missing_sections.len() as f64 * self.cfg.missing_section_penalty;
        if f.dated_pairs > 0 {
            score -=
                self.cfg.chronology_penalty * (f.inverted_pairs as f64 / f.dated_pairs as f64);
        }
        if f.mixed_date_styles {
            score -= self.cfg.mixed_date_style_penalty;
        }
        score -= (f.unparsed_dates as f64 * self.cfg.unparsed_date_penalty)
            .min(self.cfg.unparsed_date_penalty_cap);
        if !f.bullet_ratio_ok {
            score -= self.cfg.layout_penalty;
        }
        clamp_score(score)
    }

    fn experience_findings(
        &self,
        record: &StructuredResumeRecord,
        job: &JobSpecification,
    ) -> ExperienceFindings {
        if record.experience.is_empty() {
            return ExperienceFindings {
                section_missing: true,
                title_overlap: None,
                detected_years: None,
                required_years: job.required_years,
                quantified_ratio: None,
                tech_overlap: None,
            };
        }

        let title_overlap = title_token_overlap(&job.role, &record.experience);

        let detected_years = total_years(&record.experience);

        let bullets: Vec<&str> = record
            .experience
            .iter()
            .flat_map(|e| e.bullets.iter().map(|b| b.as_str()))
            .collect();
        let quantified_ratio = if bullets.is_empty() {
            None
        } else {
            let quantified = bullets
                .iter()
                .filter(|b| self.quantified.iter().any(|re| re.is_match(b)))
                .count();
            Some(quantified as f64 / bullets.len() as f64)
        };

        // Technology overlap restricted to the experience section.
        let tech_terms: Vec<&str> = {
            let mut terms: Vec<&str> = job.skill_keywords().iter().map(|k| k.term.as_str()).collect();
            for skill in &job.expected_skills {
                if !terms.contains(&skill.as_str()) {
                    terms.push(skill);
                }
            }
            terms
        };
        let tech_overlap = if tech_terms.is_empty() {
            None
        } else {
            let text = record
                .experience
                .iter()
                .flat_map(|e| {
                    std::iter::once(e.title.as_str())
                        .chain(e.organization.as_deref())
                        .chain(e.bullets.iter().map(|b| b.as_str()))
                })
                .collect::<Vec<_>>()
                .join("\n")
                .to_lowercase();
            let hits = tech_terms
                .iter()
                .filter(|t| contains_term(&text, t))
                .count();
            Some(hits as f64 / tech_terms.len() as f64)
        };

        ExperienceFindings {
            section_missing: false,
            title_overlap,
            detected_years,
            required_years: job.required_years,
            quantified_ratio,
            tech_overlap,
        }
    }

    /// Weighted sub-signals; inactive signals abstain and their weight
    /// redistributes proportionally to the rest.
    fn experience_score(&self, f: &ExperienceFindings) -> u8 {
        if f.section_missing {
            return 0;
        }

        let years_signal = match (f.required_years, f.detected_years) {
            (Some(required), Some(detected)) if required > 0.0 => {
                Some((detected / required).min(1.0))
            }
            (Some(_), None) => Some(0.0),
            _ => None,
        };

        let signals: [(f64, Option<f64>); 4] = [
            (0.30, f.title_overlap),
            (0.25, years_signal),
            (0.25, f.quantified_ratio.map(quantified_value)),
            (0.20, f.tech_overlap),
        ];

        let mut weight_sum = 0.0;
        let mut value_sum = 0.0;
        for (weight, value) in signals {
            if let Some(v) = value {
                weight_sum += weight;
                value_sum += weight * v;
            }
        }
        if weight_sum == 0.0 {
            return 0;
        }
        clamp_score(100.0 * value_sum / weight_sum)
    }

    fn skills_findings(
        &self,
        record: &StructuredResumeRecord,
        job: &JobSpecification,
    ) -> SkillsFindings {
        let resume_skills: Vec<String> = record
            .all_skills()
            .iter()
            .map(|s| s.to_lowercase())
            .collect();

        let mut matched = Vec::new();
        let mut missing = Vec::new();
        for expected in &job.expected_skills {
            let expected_lower = expected.to_lowercase();
            let hit = resume_skills.iter().any(|rs| {
                rs == &expected_lower
                    || rs.contains(&expected_lower)
                    || expected_lower.contains(rs.as_str())
            });
            if hit {
                matched.push(expected.clone());
            } else {
                missing.push(expected.clone());
            }
        }

        let category_count = record
            .skills
            .iter()
            .filter(|g| g.category.is_some())
            .count();

        // Skills written as sentences parse badly in real trackers.
        let sentence_like = record
            .all_skills()
            .iter()
            .filter(|s| s.split_whitespace().count() > 6 || s.ends_with('.'))
            .map(|s| s.to_string())
            .collect();

        SkillsFindings {
            matched,
            missing,
            category_count,
            sentence_like,
        }
    }

    fn skills_score(
        &self,
        record: &StructuredResumeRecord,
        f: &SkillsFindings,
        job: &JobSpecification,
    ) -> u8 {
        let expected_count = job.expected_skills.len();
        let mut score = if expected_count > 0 {
            100.0 * f.matched.len() as f64 / expected_count as f64
        } else {
            // No job-side skills to compare against: credit breadth.
            (record.all_skills().len() as f64 * 10.0).min(100.0)
        };

        if f.category_count >= 2 {
            score += self.cfg.skill_category_bonus;
        }
        if !f.sentence_like.is_empty() {
            score -= self.cfg.sentence_skill_penalty;
        }
        clamp_score(score)
    }
}

/// Diminishing expectation: a third of bullets carrying metrics is already
/// excellent; demanding 100% would punish normal resumes.
fn quantified_value(ratio: f64) -> f64 {
    (ratio * 3.0).min(1.0)
}

fn education_score(
    f: &EducationFindings,
    record: &StructuredResumeRecord,
    job: &JobSpecification,
) -> u8 {
    if f.section_missing {
        return 0;
    }

    let degree_signal = f.required_degree.map(|required| match f.detected_degree {
        Some(level) if level >= required => 1.0,
        Some(level) => level.rank() as f64 / required.rank() as f64,
        None => 0.0,
    });

    // Field relevance: capped keyword overlap of the education text.
    let text = record
        .education
        .iter()
        .flat_map(|e| {
            std::iter::once(e.title.as_str())
                .chain(e.organization.as_deref())
                .chain(e.bullets.iter().map(|b| b.as_str()))
        })
        .collect::<Vec<_>>()
        .join("\n")
        .to_lowercase();
    let overlap_hits = job
        .keywords
        .iter()
        .filter(|k| contains_term(&text, &k.term))
        .count();
    let field_signal = (overlap_hits as f64 / 3.0).min(1.0);

    let score = match degree_signal {
        Some(degree) => 100.0 * (0.7 * degree + 0.3 * field_signal),
        // No stated requirement: holding any detected degree is full credit,
        // otherwise fall back to field relevance alone.
        None if f.detected_degree.is_some() => 100.0,
        None => 100.0 * field_signal,
    };
    clamp_score(score)
}

fn best_degree(education: &[ResumeEntry]) -> Option<DegreeLevel> {
    education
        .iter()
        .filter_map(|e| {
            let mut text = e.title.clone();
            if let Some(org) = &e.organization {
                text.push(' ');
                text.push_str(org);
            }
            DegreeLevel::detect(&text)
        })
        .max()
}

fn title_token_overlap(role: &str, experience: &[ResumeEntry]) -> Option<f64> {
    let role_tokens: Vec<String> = role
        .to_lowercase()
        .split_whitespace()
        .filter(|t| t.len() > 2)
        .map(|t| t.to_string())
        .collect();
    if role_tokens.is_empty() {
        return None;
    }

    let best = experience
        .iter()
        .map(|e| {
            let title = e.title.to_lowercase();
            let hits = role_tokens
                .iter()
                .filter(|t| contains_term(&title, t))
                .count();
            hits as f64 / role_tokens.len() as f64
        })
        .fold(0.0_f64, f64::max);
    Some(best)
}

/// Sum of per-entry durations; open-ended entries run to the current month.
fn total_years(experience: &[ResumeEntry]) -> Option<f64> {
    let now = chrono::Utc::now();
    let mut total = 0.0;
    let mut any = false;

    for entry in experience {
        let Some(start) = entry.start.as_ref().filter(|d| !d.unparsed) else {
            continue;
        };
        let Some(start_year) = start.year else { continue };
        let start_month = start.month.unwrap_or(1);

        let (end_year, end_month) = match (&entry.end, entry.is_current) {
            (Some(end), _) if !end.unparsed && end.year.is_some() => {
                (end.year.unwrap_or(start_year), end.month.unwrap_or(12))
            }
            (None, true) => (now.year(), now.month()),
            _ => continue,
        };

        let months =
            (end_year - start_year) * 12 + end_month as i32 - start_month as i32;
        if months > 0 {
            total += months as f64 / 12.0;
            any = true;
        }
    }

    if any {
        Some(total)
    } else {
        None
    }
}

fn clamp_score(score: f64) -> u8 {
    score.clamp(0.0, 100.0).round() as u8
}
