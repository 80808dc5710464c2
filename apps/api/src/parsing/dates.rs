//! Date recognition for entry lines.
//!
//! Handles the three styles resumes actually use — "Jan 2020", "01/2020",
//! bare "2020" — plus open-ended ranges ("2019 – Present"). Unparseable
//! date fragments are kept verbatim with `unparsed = true` so no text is
//! silently dropped and scoring can penalize them later.

use anyhow::Result;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Which textual convention a parsed date used. Mixing styles across one
/// resume is a format-quality signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateStyle {
    MonthYear,
    Numeric,
    YearOnly,
}

/// A single normalized date as written in the resume.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EntryDate {
    /// Original text exactly as it appeared.
    pub raw: String,
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub style: Option<DateStyle>,
    pub unparsed: bool,
}

impl EntryDate {
    fn parsed(raw: &str, year: i32, month: Option<u32>, style: DateStyle) -> Self {
        Self {
            raw: raw.to_string(),
            year: Some(year),
            month,
            style: Some(style),
            unparsed: false,
        }
    }

    pub fn unparsed(raw: &str) -> Self {
        Self {
            raw: raw.to_string(),
            year: None,
            month: None,
            style: None,
            unparsed: true,
        }
    }

    /// (year, month-or-0) ordering key; unparsed dates sort lowest.
    pub fn sort_key(&self) -> (i32, u32) {
        (self.year.unwrap_or(i32::MIN), self.month.unwrap_or(0))
    }
}

/// A date range detected on one line.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRange {
    pub start: EntryDate,
    /// `None` with `is_current` set means an open-ended "Present" range.
    pub end: Option<EntryDate>,
    pub is_current: bool,
}

pub struct DateParser {
    month_year: Regex,
    numeric: Regex,
    year_only: Regex,
    separator: Regex,
    present_after_sep: Regex,
    tail_after_sep: Regex,
    present_word: Regex,
}

impl DateParser {
    pub fn new() -> Result<Self> {
        Ok(Self {
            month_year: Regex::new(
                r"(?i)\b(jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?\s+(\d{4})\b",
            )?,
            numeric: Regex::new(r"\b(0?[1-9]|1[0-2])/(\d{4})\b")?,
            year_only: Regex::new(r"\b(19|20)\d{2}\b")?,
            separator: Regex::new(r"^\s*(?:-|–|—|to)\s*$")?,
            present_after_sep: Regex::new(r"(?i)^\s*(?:-|–|—|to)\s*(?:present|current|now|ongoing)\b")?,
            tail_after_sep: Regex::new(r"^\s*(?:-|–|—|to)\s+(\S[^|]*)")?,
            present_word: Regex::new(r"(?i)\b(?:present|current|now|ongoing)\b")?,
        })
    }

    /// Every date token in the line, in order of appearance. Month-year
    /// matches win over the bare year inside them.
    pub fn scan(&self, line: &str) -> Vec<EntryDate> {
        let mut found: Vec<(usize, usize, EntryDate)> = Vec::new();

        for caps in self.month_year.captures_iter(line) {
            let m = caps.get(0).expect("match group 0");
            let year: i32 = caps[2].parse().unwrap_or(0);
            let month = month_number(&caps[1]);
            found.push((
                m.start(),
                m.end(),
                EntryDate::parsed(m.as_str(), year, month, DateStyle::MonthYear),
            ));
        }

        for caps in self.numeric.captures_iter(line) {
            let m = caps.get(0).expect("match group 0");
            if overlaps(&found, m.start(), m.end()) {
                continue;
            }
            let month: u32 = caps[1].parse().unwrap_or(0);
            let year: i32 = caps[2].parse().unwrap_or(0);
            found.push((
                m.start(),
                m.end(),
                EntryDate::parsed(m.as_str(), year, Some(month), DateStyle::Numeric),
            ));
        }

        for m in self.year_only.find_iter(line) {
            if overlaps(&found, m.start(), m.end()) {
                continue;
            }
            let year: i32 = m.as_str().parse().unwrap_or(0);
            found.push((
                m.start(),
                m.end(),
                EntryDate::parsed(m.as_str(), year, None, DateStyle::YearOnly),
            ));
        }

        found.sort_by_key(|(start, _, _)| *start);
        found.into_iter().map(|(_, _, d)| d).collect()
    }

    /// Byte spans of every date token, in order. Used to strip dates out of
    /// a line before title parsing.
    pub fn token_spans(&self, line: &str) -> Vec<(usize, usize)> {
        let mut spans: Vec<(usize, usize)> = Vec::new();
        for m in self.month_year.find_iter(line) {
            spans.push((m.start(), m.end()));
        }
        for m in self.numeric.find_iter(line) {
            if !overlaps_span(&spans, m.start(), m.end()) {
                spans.push((m.start(), m.end()));
            }
        }
        for m in self.year_only.find_iter(line) {
            if !overlaps_span(&spans, m.start(), m.end()) {
                spans.push((m.start(), m.end()));
            }
        }
        spans.sort_by_key(|(start, _)| *start);
        spans
    }

    /// Detects `<date> <sep> <date|present|unreadable>` on a line.
    pub fn parse_range(&self, line: &str) -> Option<ParsedRange> {
        let spans = self.token_spans(line);
        let dates = self.scan(line);
        let (first_start, first_end) = *spans.first()?;
        let start = dates.into_iter().next()?;
        let _ = first_start;

        let rest = &line[first_end..];

        // Second date token with only a separator between them.
        if let Some(&(second_start, _)) = spans.get(1) {
            let between = &line[first_end..second_start];
            if self.separator.is_match(between) {
                let end = self.scan(&line[second_start..]).into_iter().next()?;
                return Some(ParsedRange {
                    start,
                    end: Some(end),
                    is_current: false,
                });
            }
        }

        // Open-ended range: "2019 – Present".
        if self.present_after_sep.is_match(rest) {
            return Some(ParsedRange {
                start,
                end: None,
                is_current: true,
            });
        }

        // "Jan 2020 - <unreadable>": keep the tail verbatim as an unparsed
        // end so the format checks can flag it.
        if let Some(caps) = self.tail_after_sep.captures(rest) {
            let tail = caps[1].trim();
            if !tail.is_empty() {
                return Some(ParsedRange {
                    start,
                    end: Some(EntryDate::unparsed(tail)),
                    is_current: false,
                });
            }
        }

        None
    }

    pub fn contains_range(&self, line: &str) -> bool {
        self.parse_range(line).is_some()
    }

    /// True when the line carries nothing but dates, separators, and
    /// punctuation — the dangling-date case.
    pub fn is_date_only_line(&self, line: &str) -> bool {
        if self.scan(line).is_empty() {
            return false;
        }
        let mut stripped = line.to_string();
        for (start, end) in self.token_spans(line).into_iter().rev() {
            stripped.replace_range(start..end, "");
        }
        let stripped = self.present_word.replace_all(&stripped, "");
        let lowered = stripped.to_lowercase().replace("to", "");
        !lowered
            .chars()
            .any(|c| c.is_alphanumeric())
    }
}

fn month_number(token: &str) -> Option<u32> {
    let prefix: String = token.to_lowercase().chars().take(3).collect();
    let n = match prefix.as_str() {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(n)
}

fn overlaps(found: &[(usize, usize, EntryDate)], start: usize, end: usize) -> bool {
    found.iter().any(|(s, e, _)| start < *e && end > *s)
}

fn overlaps_span(spans: &[(usize, usize)], start: usize, end: usize) -> bool {
    spans.iter().any(|(s, e)| start < *e && end > *s)
}
