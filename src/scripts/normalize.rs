//! Turns raw model output into a clean, ordered list of ad scripts.
//!
//! The pipeline never fails: malformed or empty output degrades to a short or
//! empty list and the caller decides what to do about missing scripts.
//!
//! 1. Block lists are mapped to their texts (`{ "text": .. }` objects are
//!    unwrapped, other values stringified) and empty texts dropped.
//! 2. Texts are split in front of each `Script <N>:` marker, the marker staying
//!    with the segment it introduces. A plain string with no such markers falls
//!    back to line-leading `1.`/`1:` numerals counted upwards from 1.
//! 3. Each segment loses nested markers, quotes, asterisks, hashes and dash runs.
//! 4. With required sections configured, incomplete segments are rejected.
//! 5. Segments without a `Script <N>` header get a sequential one.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;

use crate::config::GenerationConfig;
use crate::llm::RawContent;

lazy_static! {
    static ref SCRIPT_MARKER: Regex = Regex::new(r"(?i)\bscript\s*#?\s*(\d+)\s*:").unwrap();
    static ref NUMERAL_MARKER: Regex =
        Regex::new(r"(?m)^[ \t]*[*#]*[ \t]*(\d+)[ \t]*[:.](?:[ \t]|$)").unwrap();
    static ref LEADING_SCRIPT: Regex = Regex::new(r"(?i)^script\s*#?\s*(\d+)\s*[:.]").unwrap();
    static ref LEADING_NUMERAL: Regex = Regex::new(r"^\d+[ \t]*[:.]").unwrap();
    static ref DASH_RUN: Regex = Regex::new(r"(?m)[ \t]*-{2,}[ \t]*$").unwrap();
    static ref TRAILING_SPACE: Regex = Regex::new(r"(?m)[ \t]+$").unwrap();
    static ref BLANK_LINES: Regex = Regex::new(r"\n{3,}").unwrap();
}

fn is_noise(c: char) -> bool {
    matches!(c, '*' | '#' | '"' | '\u{201C}' | '\u{201D}')
}

/// Text normalizer, optionally enforcing that every script has all required sections.
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    /// Lowercased section labels; empty disables validation.
    required_sections: Vec<String>,
}

impl Normalizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_required_sections<I, S>(sections: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            required_sections: sections
                .into_iter()
                .map(|s| s.as_ref().trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }

    pub fn from_profile(profile: &GenerationConfig) -> Self {
        if profile.require_sections {
            Self::with_required_sections(&profile.sections)
        } else {
            Self::new()
        }
    }

    pub fn normalize(&self, raw: &RawContent) -> Vec<String> {
        self.normalize_from(raw, 1)
    }

    /// Like [`normalize`](Self::normalize), but untitled segments are numbered
    /// starting at `first_position`.
    pub fn normalize_from(&self, raw: &RawContent, first_position: usize) -> Vec<String> {
        let mut cleaned = Vec::new();
        match raw {
            RawContent::Text(text) => {
                cleaned.extend(split_segments(text, true).into_iter().filter_map(clean_segment));
            }
            RawContent::Blocks(blocks) => {
                for text in block_texts(blocks) {
                    cleaned.extend(split_segments(&text, false).into_iter().filter_map(clean_segment));
                }
            }
        }

        cleaned
            .into_iter()
            .filter(|seg| self.has_required_sections(&seg.body))
            .enumerate()
            .map(|(i, seg)| seg.render(first_position + i))
            .collect()
    }

    fn has_required_sections(&self, body: &str) -> bool {
        if self.required_sections.is_empty() {
            return true;
        }
        let lower = body.to_lowercase();
        self.required_sections.iter().all(|s| lower.contains(s.as_str()))
    }
}

/// Retitles already normalized scripts `Script 1:`, `Script 2:`, ... in list order.
pub fn renumber(scripts: Vec<String>) -> Vec<String> {
    scripts
        .into_iter()
        .enumerate()
        .map(|(i, script)| match LEADING_SCRIPT.find(&script) {
            Some(m) => format!("Script {}:{}", i + 1, &script[m.end()..]),
            None => format!("Script {}:\n{}", i + 1, script),
        })
        .collect()
}

/// Maps content blocks to their texts, dropping blank ones.
pub fn block_texts(blocks: &[Value]) -> Vec<String> {
    blocks
        .iter()
        .filter_map(|block| {
            let text = match block {
                Value::Null => return None,
                Value::String(s) => s.clone(),
                Value::Object(map) => match map.get("text") {
                    Some(Value::String(t)) => t.clone(),
                    _ => block.to_string(),
                },
                other => other.to_string(),
            };
            (!text.trim().is_empty()).then_some(text)
        })
        .collect()
}

/// Splits `text` in front of every script marker without consuming it.
///
/// Text before the first marker is dropped. Without any marker the whole text
/// is one segment. `allow_numerals` enables the `1.`/`1:` fallback.
pub fn split_segments(text: &str, allow_numerals: bool) -> Vec<&str> {
    let mut markers = marker_spans(&SCRIPT_MARKER, text);
    if markers.is_empty() && allow_numerals {
        markers = numeral_markers(text);
    }
    if markers.is_empty() {
        return vec![text];
    }

    // a marker directly repeating the previous one (same number) opens no new segment
    let mut merged: Vec<Marker> = Vec::with_capacity(markers.len());
    for marker in markers {
        match merged.last_mut() {
            Some(last)
                if last.number == marker.number
                    && text[last.end..marker.start]
                        .chars()
                        .all(|c| c.is_whitespace() || is_noise(c)) =>
            {
                last.end = marker.end;
            }
            _ => merged.push(marker),
        }
    }

    merged
        .iter()
        .enumerate()
        .map(|(i, m)| {
            let end = merged.get(i + 1).map_or(text.len(), |next| next.start);
            &text[m.start..end]
        })
        .collect()
}

#[derive(Debug, Clone, Copy)]
struct Marker {
    start: usize,
    end: usize,
    number: Option<u32>,
}

fn marker_spans(re: &Regex, text: &str) -> Vec<Marker> {
    re.captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            Some(Marker {
                start: whole.start(),
                end: whole.end(),
                number: caps.get(1).and_then(|n| n.as_str().parse().ok()),
            })
        })
        .collect()
}

/// Line-leading numerals forming the sequence 1, 2, 3, ...
fn numeral_markers(text: &str) -> Vec<Marker> {
    let mut expected = 1u32;
    let mut out = Vec::new();
    for marker in marker_spans(&NUMERAL_MARKER, text) {
        if marker.number == Some(expected) {
            out.push(marker);
            expected += 1;
        }
    }
    out
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Segment {
    /// Number from the segment's own `Script <N>` header.
    number: Option<u32>,
    /// What followed that header: a line break or a space.
    separator: &'static str,
    body: String,
}

impl Segment {
    fn render(self, position: usize) -> String {
        match self.number {
            Some(n) => format!("Script {n}:{}{}", self.separator, self.body),
            None => format!("Script {position}:\n{}", self.body),
        }
    }
}

fn clean_segment(segment: &str) -> Option<Segment> {
    let text = segment.replace("\r\n", "\n");
    let mut rest = text.as_str();
    let mut number = None;
    let mut separator = " ";

    loop {
        let trimmed = rest.trim_start_matches(|c: char| c.is_whitespace() || is_noise(c));
        if let Some(caps) = LEADING_SCRIPT.captures(trimmed) {
            if number.is_none() {
                number = caps.get(1).and_then(|m| m.as_str().parse().ok());
            }
            rest = &trimmed[caps.get(0).map_or(0, |m| m.end())..];
            separator = separator_after(rest);
            continue;
        }
        if let Some(m) = LEADING_NUMERAL.find(trimmed) {
            let after = &trimmed[m.end()..];
            if after.chars().next().map_or(true, char::is_whitespace) {
                rest = after;
                separator = separator_after(rest);
                continue;
            }
        }
        rest = trimmed;
        break;
    }

    let body = scrub(rest);
    if body.is_empty() {
        return None;
    }
    Some(Segment {
        number,
        separator,
        body,
    })
}

fn separator_after(rest: &str) -> &'static str {
    let next = rest.trim_start_matches(|c: char| c == ' ' || c == '\t' || is_noise(c));
    if next.starts_with('\n') {
        "\n"
    } else {
        " "
    }
}

fn scrub(text: &str) -> String {
    let stripped: String = text.chars().filter(|c| !is_noise(*c)).collect();
    let no_dashes = DASH_RUN.replace_all(&stripped, "");
    let no_trailing = TRAILING_SPACE.replace_all(&no_dashes, "");
    let collapsed = BLANK_LINES.replace_all(&no_trailing, "\n\n");
    collapsed.trim().to_string()
}
