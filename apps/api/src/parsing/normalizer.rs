//! Entry normalization — turns one section's ragged lines into structured
//! entries.
//!
//! The normalizer only structures; it never judges quality. Chronology and
//! format defects are the scoring engine's concern. Dangling dates anchor
//! backward to the nearest open entry; when nothing is open they start a
//! blank-titled entry flagged `needs_review` rather than being dropped.

use anyhow::Result;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::extract::Line;
use crate::parsing::dates::{DateParser, EntryDate};

/// Provenance: the contiguous line range an entry was built from.
/// `end` is exclusive, indices into the original document.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct LineRange {
    pub start: usize,
    pub end: usize,
}

/// One normalized unit within an experience, education, or projects section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResumeEntry {
    pub title: String,
    pub organization: Option<String>,
    pub location: Option<String>,
    pub start: Option<EntryDate>,
    /// `None` with `is_current` means an open-ended "Present" range.
    pub end: Option<EntryDate>,
    pub is_current: bool,
    pub bullets: Vec<String>,
    /// Set when the entry was opened by a dangling date or rebuilt by the
    /// record builder's reconstruction pass.
    pub needs_review: bool,
    pub reconstructed: bool,
    pub source: LineRange,
}

impl ResumeEntry {
    fn open_at(index: usize) -> Self {
        Self {
            title: String::new(),
            organization: None,
            location: None,
            start: None,
            end: None,
            is_current: false,
            bullets: Vec::new(),
            needs_review: false,
            reconstructed: false,
            source: LineRange {
                start: index,
                end: index + 1,
            },
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_empty() && self.organization.is_none() && self.bullets.is_empty()
    }
}

/// Skills grouped by category where the resume names one ("Languages: ...").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillGroup {
    pub category: Option<String>,
    pub skills: Vec<String>,
}

const BULLET_MARKERS: &[char] = &['•', '-', '*', '◦', '▪', '·'];
/// Non-bullet lines longer than this attach as detail bullets.
const DETAIL_LINE_MIN: usize = 20;
/// How far back a date-only line may anchor to an open entry.
const DATE_ANCHOR_WINDOW: usize = 2;

pub struct Normalizer {
    dates: DateParser,
    org_keyword: Regex,
}

impl Normalizer {
    pub fn new() -> Result<Self> {
        Ok(Self {
            dates: DateParser::new()?,
            org_keyword: Regex::new(
                r"(?i)\b(inc|ltd|llc|corp|corporation|company|university|college|institute|school|technologies|labs|solutions|systems|consulting|group)\b",
            )?,
        })
    }

    pub fn date_parser(&self) -> &DateParser {
        &self.dates
    }

    /// Groups a section's body lines into entries (experience/education/
    /// projects shape). `lines` are the span's lines with the heading already
    /// skipped; indices are original document positions.
    pub fn entries(&self, lines: &[Line]) -> Vec<ResumeEntry> {
        let mut entries: Vec<ResumeEntry> = Vec::new();
        let mut last_content_line: Option<usize> = None;

        for line in lines {
            let text = line.text.trim();
            if text.is_empty() {
                continue;
            }

            let is_bullet = text.starts_with(BULLET_MARKERS);

            // Dangling date line: anchor backward within the window, else
            // open a blank entry for review.
            if !is_bullet && self.dates.is_date_only_line(text) {
                let anchored = match (entries.last_mut(), last_content_line) {
                    (Some(open), Some(prev))
                        if open.start.is_none()
                            && line.index.saturating_sub(prev) <= DATE_ANCHOR_WINDOW =>
                    {
                        self.apply_dates(open, text);
                        open.source.end = line.index + 1;
                        true
                    }
                    _ => false,
                };
                if !anchored {
                    let mut entry = ResumeEntry::open_at(line.index);
                    self.apply_dates(&mut entry, text);
                    entry.needs_review = true;
                    entries.push(entry);
                }
                last_content_line = Some(line.index);
                continue;
            }

            // Entry-start markers: a line carrying a date range, or a
            // title-cased line followed by an organization-like line.
            let opens_entry = !is_bullet
                && (self.dates.contains_range(text)
                    || (is_title_case(text) && entries.is_empty())
                    || (is_title_case(text)
                        && entries
                            .last()
                            .map_or(false, |e| !e.bullets.is_empty() || e.start.is_some())));

            if opens_entry {
                let mut entry = ResumeEntry::open_at(line.index);
                self.parse_header(&mut entry, text);
                entries.push(entry);
                last_content_line = Some(line.index);
                continue;
            }

            // Everything else attaches to the most recently opened entry.
            let bullet = if is_bullet {
                text.trim_start_matches(BULLET_MARKERS).trim().to_string()
            } else if text.len() > DETAIL_LINE_MIN {
                text.to_string()
            } else {
                // Short non-bullet line: organization for a header-only
                // entry, otherwise a detail bullet.
                if let Some(open) = entries.last_mut() {
                    if open.organization.is_none() && open.bullets.is_empty() {
                        open.organization = Some(text.to_string());
                        open.source.end = line.index + 1;
                        last_content_line = Some(line.index);
                        continue;
                    }
                }
                text.to_string()
            };

            if bullet.is_empty() {
                continue;
            }
            match entries.last_mut() {
                Some(open) => {
                    open.bullets.push(bullet);
                    open.source.end = line.index + 1;
                }
                None => {
                    let mut entry = ResumeEntry::open_at(line.index);
                    entry.title = text.to_string();
                    entries.push(entry);
                }
            }
            last_content_line = Some(line.index);
        }

        entries.retain(|e| !e.is_empty() || e.start.is_some());
        entries
    }

    /// Splits a skills span into groups: `Category: a, b, c` lines become
    /// named groups, everything else lands in the unnamed group. Duplicate
    /// skills collapse case-insensitively across the whole section.
    pub fn skills(&self, lines: &[Line]) -> Vec<SkillGroup> {
        let mut groups: Vec<SkillGroup> = Vec::new();
        let mut flat: Vec<String> = Vec::new();
        let mut seen: Vec<String> = Vec::new();

        for line in lines {
            let text = line.text.trim_start_matches(BULLET_MARKERS).trim();
            if text.is_empty() {
                continue;
            }

            let (category, body) = match text.split_once(':') {
                Some((head, rest))
                    if !head.trim().is_empty()
                        && head.trim().split_whitespace().count() <= 4
                        && !rest.trim().is_empty() =>
                {
                    (Some(head.trim().to_string()), rest)
                }
                _ => (None, text),
            };

            let mut skills: Vec<String> = Vec::new();
            for fragment in split_skill_fragments(body) {
                let lowered = fragment.to_lowercase();
                if seen.contains(&lowered) {
                    continue;
                }
                seen.push(lowered);
                skills.push(fragment);
            }

            match category {
                Some(name) if !skills.is_empty() => groups.push(SkillGroup {
                    category: Some(name),
                    skills,
                }),
                _ => flat.extend(skills),
            }
        }

        if !flat.is_empty() {
            groups.push(SkillGroup {
                category: None,
                skills: flat,
            });
        }
        groups
    }

    /// Joins a summary span's lines into one paragraph.
    pub fn summary(&self, lines: &[Line]) -> Option<String> {
        let text = lines
            .iter()
            .map(|l| l.text.trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }

    /// One certification per non-empty line, bullet markers stripped,
    /// case-insensitive dedup.
    pub fn certifications(&self, lines: &[Line]) -> Vec<String> {
        let mut certs: Vec<String> = Vec::new();
        for line in lines {
            let text = line.text.trim_start_matches(BULLET_MARKERS).trim();
            if text.is_empty() {
                continue;
            }
            if !certs.iter().any(|c| c.eq_ignore_ascii_case(text)) {
                certs.push(text.to_string());
            }
        }
        certs
    }

    fn apply_dates(&self, entry: &mut ResumeEntry, text: &str) {
        if let Some(range) = self.dates.parse_range(text) {
            entry.start = Some(range.start);
            entry.end = range.end;
            entry.is_current = range.is_current;
        } else if let Some(date) = self.dates.scan(text).into_iter().next() {
            entry.start = Some(date);
        }
    }

    /// Parses an entry-opening line into title, organization, location, and
    /// dates: "Senior Engineer | Acme Corp" or "Acme Corp, Intern 11/2023 –
    /// 02/2024 | Chennai".
    fn parse_header(&self, entry: &mut ResumeEntry, text: &str) {
        self.apply_dates(entry, text);

        // Strip date tokens before splitting on separators.
        let mut remaining = text.to_string();
        for (start, end) in self.dates.token_spans(text).into_iter().rev() {
            remaining.replace_range(start..end, "");
        }
        let remaining = remaining
            .replace("Present", "")
            .replace("present", "")
            .replace(" to ", " ")
            .replace('–', "-")
            .replace('—', "-");
        let remaining = remaining.trim().trim_matches(|c| c == '-' || c == ',');

        let mut parts = remaining.splitn(2, '|');
        let head = parts.next().unwrap_or("").trim().to_string();
        let tail = parts.next().map(|t| t.trim().to_string());

        if let Some(tail) = tail {
            if !tail.is_empty() {
                // "Title | Company" unless the tail reads like a location.
                if self.org_keyword.is_match(&tail) || !head.contains(',') {
                    entry.title = clean_header_fragment(&head);
                    entry.organization = non_empty(clean_header_fragment(&tail));
                } else {
                    entry.location = Some(tail);
                    self.split_comma_header(entry, &head);
                }
                return;
            }
        }
        self.split_comma_header(entry, &head);
    }

    fn split_comma_header(&self, entry: &mut ResumeEntry, head: &str) {
        match head.split_once(',') {
            Some((first, second)) => {
                let first = clean_header_fragment(first);
                let second = clean_header_fragment(second);
                // "Company, Title" when the left side names an organization.
                if self.org_keyword.is_match(&first) {
                    entry.organization = non_empty(first);
                    entry.title = second;
                } else {
                    entry.title = first;
                    entry.organization = non_empty(second);
                }
            }
            None => entry.title = clean_header_fragment(head),
        }
    }
}

fn split_skill_fragments(body: &str) -> Vec<String> {
    body.split(|c| matches!(c, ',' | '|' | '/' | ';' | '•'))
        .map(|s| s.trim().trim_matches(|c| c == '.').trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

fn clean_header_fragment(text: &str) -> String {
    text.trim()
        .trim_matches(|c| c == ',' || c == '-' || c == '|')
        .trim()
        .to_string()
}

fn non_empty(text: String) -> Option<String> {
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Most words capitalized and nothing reading like a sentence fragment.
fn is_title_case(text: &str) -> bool {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() || words.len() > 8 {
        return false;
    }
    let capitalized = words
        .iter()
        .filter(|w| w.chars().next().map_or(false, |c| c.is_uppercase()))
        .count();
    capitalized * 2 >= words.len() && !text.ends_with('.')
}
