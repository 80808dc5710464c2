//! Section segmentation — splits raw resume lines into labeled spans.
//!
//! Heading detection is a pluggable strategy (`HeadingClassifier`) so the
//! vocabulary and fuzzy tolerance can be tested and swapped without touching
//! the span-emission logic. Output spans always cover every input line: text
//! before the first heading, and any unrecognized region, lands in `Other`.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use strsim::jaro_winkler;

use crate::extract::RawDocumentText;

/// Closed set of section labels a span can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionLabel {
    Contact,
    Summary,
    Experience,
    Skills,
    Education,
    Projects,
    Certifications,
    Other,
}

/// A contiguous run of lines belonging to one section. `end` is exclusive.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SectionSpan {
    pub label: SectionLabel,
    pub start: usize,
    pub end: usize,
}

/// Position context handed to the classifier alongside the line text.
#[derive(Debug, Clone, Copy)]
pub struct HeadingContext {
    pub line_index: usize,
    pub total_lines: usize,
}

/// Pluggable heading-detection strategy.
///
/// Returns the section a line opens, or `None` when the line is body text.
pub trait HeadingClassifier: Send + Sync {
    fn classify(&self, line: &str, ctx: &HeadingContext) -> Option<SectionLabel>;
}

const MAX_HEADING_WORDS: usize = 6;
const MAX_HEADING_CHARS: usize = 48;
/// Jaro-Winkler bound for plain lines; all-caps or colon-terminated lines
/// get a weaker bound since the formatting itself signals a heading.
const FUZZY_STRICT: f64 = 0.88;
const FUZZY_RELAXED: f64 = 0.82;

const BULLET_MARKERS: &[char] = &['•', '-', '*', '◦', '▪', '·'];

/// Default vocabulary-driven classifier.
///
/// A line is accepted as a heading only when it is short, not a bullet, and
/// matches the section vocabulary exactly, by containment ("work experience"
/// contains "experience"), or within fuzzy tolerance ("experiance").
pub struct VocabClassifier {
    vocab: Vec<(SectionLabel, &'static [&'static str])>,
}

impl VocabClassifier {
    pub fn new() -> Self {
        Self {
            vocab: vec![
                (
                    SectionLabel::Summary,
                    &[
                        "summary",
                        "professional summary",
                        "career summary",
                        "objective",
                        "profile",
                        "about me",
                        "personal statement",
                    ],
                ),
                (
                    SectionLabel::Experience,
                    &[
                        "experience",
                        "work experience",
                        "employment",
                        "work history",
                        "professional experience",
                        "career history",
                    ],
                ),
                (
                    SectionLabel::Education,
                    &[
                        "education",
                        "academic",
                        "qualifications",
                        "educational background",
                        "academic background",
                    ],
                ),
                (
                    SectionLabel::Skills,
                    &[
                        "skills",
                        "technical skills",
                        "core competencies",
                        "expertise",
                        "technical expertise",
                        "key skills",
                    ],
                ),
                (
                    SectionLabel::Projects,
                    &[
                        "projects",
                        "personal projects",
                        "academic projects",
                        "key projects",
                        "notable projects",
                    ],
                ),
                (
                    SectionLabel::Certifications,
                    &[
                        "certifications",
                        "certification",
                        "licenses",
                        "certificates",
                        "professional certifications",
                    ],
                ),
                (
                    SectionLabel::Contact,
                    &["contact", "contact information", "contact details"],
                ),
            ],
        }
    }

    fn match_vocab(&self, normalized: &str, fuzzy_bound: f64) -> Option<SectionLabel> {
        // Exact and containment matches first; longer vocab phrases are
        // checked before shorter ones implicitly by containment both ways.
        for (label, phrases) in &self.vocab {
            for phrase in phrases.iter() {
                if normalized == *phrase {
                    return Some(*label);
                }
            }
        }
        for (label, phrases) in &self.vocab {
            for phrase in phrases.iter() {
                if normalized.contains(phrase) || phrase.contains(normalized) {
                    return Some(*label);
                }
            }
        }
        // Fuzzy pass for near-variants like "experiance".
        let mut best: Option<(f64, SectionLabel)> = None;
        for (label, phrases) in &self.vocab {
            for phrase in phrases.iter() {
                let sim = jaro_winkler(normalized, phrase);
                if sim >= fuzzy_bound && best.map_or(true, |(b, _)| sim > b) {
                    best = Some((sim, *label));
                }
            }
        }
        best.map(|(_, label)| label)
    }
}

impl Default for VocabClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadingClassifier for VocabClassifier {
    fn classify(&self, line: &str, _ctx: &HeadingContext) -> Option<SectionLabel> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return None;
        }
        if trimmed.starts_with(BULLET_MARKERS) {
            return None;
        }
        if trimmed.chars().count() > MAX_HEADING_CHARS
            || trimmed.split_whitespace().count() > MAX_HEADING_WORDS
        {
            return None;
        }

        let decorated = trimmed.ends_with(':')
            || (trimmed.len() > 2 && trimmed.chars().all(|c| !c.is_lowercase()));
        let bound = if decorated { FUZZY_RELAXED } else { FUZZY_STRICT };

        let normalized = normalize_heading(trimmed);
        if normalized.is_empty() {
            return None;
        }
        self.match_vocab(&normalized, bound)
    }
}

fn normalize_heading(line: &str) -> String {
    line.trim()
        .trim_end_matches(':')
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Emits ordered, gap-free `SectionSpan`s over a document.
pub struct Segmenter {
    classifier: Arc<dyn HeadingClassifier>,
}

impl Segmenter {
    pub fn new(classifier: Arc<dyn HeadingClassifier>) -> Self {
        Self { classifier }
    }

    /// Splits the document into spans covering `0..lines.len()` exactly.
    ///
    /// A recurring recognized heading relabels the earlier span to `Other`
    /// (last wins). Never errors: a document with no headings at all comes
    /// back as a single `Other` span.
    pub fn segment(&self, doc: &RawDocumentText) -> Vec<SectionSpan> {
        let total = doc.lines.len();
        if total == 0 {
            return Vec::new();
        }

        let mut spans: Vec<SectionSpan> = Vec::new();
        let mut open: Option<SectionSpan> = Some(SectionSpan {
            label: SectionLabel::Other,
            start: 0,
            end: 0,
        });

        for line in &doc.lines {
            let ctx = HeadingContext {
                line_index: line.index,
                total_lines: total,
            };
            if let Some(label) = self.classifier.classify(&line.text, &ctx) {
                if let Some(mut span) = open.take() {
                    span.end = line.index;
                    if span.end > span.start {
                        spans.push(span);
                    }
                }
                // Last wins: an earlier span with the same recognized label
                // demotes to Other.
                for prior in spans.iter_mut() {
                    if prior.label == label {
                        prior.label = SectionLabel::Other;
                    }
                }
                open = Some(SectionSpan {
                    label,
                    start: line.index,
                    end: line.index,
                });
            }
        }

        if let Some(mut span) = open.take() {
            span.end = total;
            if span.end > span.start {
                spans.push(span);
            }
        }

        spans
    }

    /// First line index of a span's body, skipping its heading line when the
    /// span opens with one.
    pub fn content_start(&self, doc: &RawDocumentText, span: &SectionSpan) -> usize {
        if span.label == SectionLabel::Other {
            return span.start;
        }
        let ctx = HeadingContext {
            line_index: span.start,
            total_lines: doc.lines.len(),
        };
        match doc.lines.get(span.start) {
            Some(line) if self.classifier.classify(&line.text, &ctx) == Some(span.label) => {
                span.start + 1
            }
            _ => span.start,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segmenter() -> Segmenter {
        Segmenter::new(Arc::new(VocabClassifier::new()))
    }

    fn doc(text: &str) -> RawDocumentText {
        RawDocumentText::from_text(text)
    }

    fn assert_full_coverage(spans: &[SectionSpan], total: usize) {
        let mut cursor = 0;
        for span in spans {
            assert_eq!(span.start, cursor, "gap or overlap before {:?}", span);
            assert!(span.end > span.start);
            cursor = span.end;
        }
        assert_eq!(cursor, total);
    }

    #[test]
    fn test_basic_segmentation() {
        let d = doc("Jane Doe\njane@x.com\n\nExperience\nEngineer at Acme\n\nSkills\nRust, SQL\n\nEducation\nBS Computer Science");
        let spans = segmenter().segment(&d);

        assert_full_coverage(&spans, d.len());
        let labels: Vec<SectionLabel> = spans.iter().map(|s| s.label).collect();
        assert_eq!(
            labels,
            vec![
                SectionLabel::Other,
                SectionLabel::Experience,
                SectionLabel::Skills,
                SectionLabel::Education,
            ]
        );
    }

    #[test]
    fn test_zero_headings_yields_single_other_span() {
        let d = doc("just some text\nwith no structure\nat all");
        let spans = segmenter().segment(&d);
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].label, SectionLabel::Other);
        assert_eq!((spans[0].start, spans[0].end), (0, 3));
    }

    #[test]
    fn test_empty_document_yields_no_spans() {
        assert!(segmenter().segment(&doc("")).is_empty());
    }

    #[test]
    fn test_vocabulary_variants() {
        let c = VocabClassifier::new();
        let ctx = HeadingContext {
            line_index: 0,
            total_lines: 10,
        };
        assert_eq!(
            c.classify("WORK EXPERIENCE", &ctx),
            Some(SectionLabel::Experience)
        );
        assert_eq!(
            c.classify("Technical Skills:", &ctx),
            Some(SectionLabel::Skills)
        );
        assert_eq!(c.classify("About Me", &ctx), Some(SectionLabel::Summary));
        assert_eq!(
            c.classify("Licenses", &ctx),
            Some(SectionLabel::Certifications)
        );
    }

    #[test]
    fn test_fuzzy_tolerance_for_misspelled_heading() {
        let c = VocabClassifier::new();
        let ctx = HeadingContext {
            line_index: 3,
            total_lines: 10,
        };
        assert_eq!(
            c.classify("Work Experiance", &ctx),
            Some(SectionLabel::Experience)
        );
    }

    #[test]
    fn test_long_or_bullet_lines_are_not_headings() {
        let c = VocabClassifier::new();
        let ctx = HeadingContext {
            line_index: 5,
            total_lines: 10,
        };
        assert_eq!(
            c.classify(
                "I have ten years of industry experience building distributed systems",
                &ctx
            ),
            None
        );
        assert_eq!(c.classify("• experience with Rust", &ctx), None);
    }

    #[test]
    fn test_recurring_heading_last_wins() {
        let d = doc("Skills\nRust\nExperience\nAcme Corp\nSkills\nSQL");
        let spans = segmenter().segment(&d);
        assert_full_coverage(&spans, d.len());

        let skill_spans: Vec<&SectionSpan> = spans
            .iter()
            .filter(|s| s.label == SectionLabel::Skills)
            .collect();
        assert_eq!(skill_spans.len(), 1);
        assert_eq!(skill_spans[0].start, 4);
        // The earlier skills span is demoted, not dropped.
        assert_eq!(spans[0].label, SectionLabel::Other);
    }

    #[test]
    fn test_adjacent_headings_close_former_early() {
        let d = doc("Experience\nEducation\nBS Computer Science");
        let spans = segmenter().segment(&d);
        assert_full_coverage(&spans, d.len());
        assert_eq!(spans[0].label, SectionLabel::Experience);
        assert_eq!((spans[0].start, spans[0].end), (0, 1));
        assert_eq!(spans[1].label, SectionLabel::Education);
    }

    #[test]
    fn test_content_start_skips_heading_line() {
        let d = doc("Experience\nEngineer at Acme");
        let seg = segmenter();
        let spans = seg.segment(&d);
        assert_eq!(seg.content_start(&d, &spans[0]), 1);
    }

    #[test]
    fn test_coverage_property_on_ragged_input() {
        let texts = [
            "\n\nExperience\n\nSkills\n",
            "EDUCATION",
            "a\nb\nc\nEXPERIENCE\nd\n\n\nSKILLS\nx, y",
        ];
        for text in texts {
            let d = doc(text);
            let spans = segmenter().segment(&d);
            assert_full_coverage(&spans, d.len());
        }
    }
}
