//! Side-effect term highlighting.
//!
//! Severe terms are matched first; common terms are only searched for in
//! the text between severe matches, so a common term that happens to sit
//! inside a severe one is never tagged twice.

use std::ops::Range;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::markup::{self, Document, Inline};

pub const COMMON_EFFECTS: &[&str] = &[
    "Nausea",
    "Dizziness",
    "Headache",
    "Dry mouth",
    "Drowsiness",
    "Insomnia",
    "Constipation",
    "Fatigue",
    "Vomiting",
    "Anxiety",
];

pub const SEVERE_EFFECTS: &[&str] = &[
    "Dyskinesia",
    "Hallucinations",
    "Impulse control disorders",
    "Sudden sleep episodes",
    "Hypotension",
    "Confusion",
    "Psychosis",
    "Hypertensive crisis",
    "Heart rhythm",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Common,
    Severe,
}

impl Severity {
    pub fn css_class(&self) -> &'static str {
        match self {
            Severity::Common => "side-effect-tag",
            Severity::Severe => "side-effect-tag severe-tag",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Highlighter {
    severe: Option<Regex>,
    common: Option<Regex>,
}

impl Highlighter {
    pub fn new<S: AsRef<str>>(common: &[S], severe: &[S]) -> Result<Self, regex::Error> {
        Ok(Self {
            severe: term_pattern(severe)?,
            common: term_pattern(common)?,
        })
    }

    /// The built-in Parkinson's medication side-effect vocabulary.
    pub fn builtin() -> Result<Self, regex::Error> {
        Self::new(COMMON_EFFECTS, SEVERE_EFFECTS)
    }

    /// Built-in vocabulary plus user-supplied extra terms.
    pub fn with_extra_terms(common: &[String], severe: &[String]) -> Result<Self, regex::Error> {
        let common: Vec<&str> = COMMON_EFFECTS
            .iter()
            .copied()
            .chain(common.iter().map(String::as_str))
            .collect();
        let severe: Vec<&str> = SEVERE_EFFECTS
            .iter()
            .copied()
            .chain(severe.iter().map(String::as_str))
            .collect();
        Self::new(common.as_slice(), severe.as_slice())
    }

    /// Byte ranges of every term in `text`, in order and non-overlapping.
    pub fn find_terms(&self, text: &str) -> Vec<(Range<usize>, Severity)> {
        let mut found: Vec<(Range<usize>, Severity)> = Vec::new();

        let severe: Vec<Range<usize>> = match &self.severe {
            Some(re) => re.find_iter(text).map(|m| m.range()).collect(),
            None => Vec::new(),
        };

        let mut gap_start = 0;
        for range in severe.iter().cloned().chain(std::iter::once(text.len()..text.len())) {
            if let Some(re) = &self.common {
                let gap = &text[gap_start..range.start];
                for m in re.find_iter(gap) {
                    found.push((gap_start + m.start()..gap_start + m.end(), Severity::Common));
                }
            }
            if !range.is_empty() {
                found.push((range.clone(), Severity::Severe));
            }
            gap_start = range.end;
        }

        found
    }

    /// Split every untagged run in the document around recognised terms.
    /// Runs that already carry a term are left alone.
    pub fn annotate(&self, document: &mut Document) {
        for block in &mut document.blocks {
            let mut inlines = Vec::with_capacity(block.inlines.len());
            for inline in block.inlines.drain(..) {
                if inline.term.is_some() {
                    inlines.push(inline);
                    continue;
                }
                self.split_inline(inline, &mut inlines);
            }
            block.inlines = inlines;
        }
    }

    fn split_inline(&self, inline: Inline, out: &mut Vec<Inline>) {
        let terms = self.find_terms(&inline.text);
        if terms.is_empty() {
            out.push(inline);
            return;
        }

        let mut last = 0;
        for (range, severity) in terms {
            if range.start > last {
                out.push(Inline {
                    text: inline.text[last..range.start].to_string(),
                    marks: inline.marks.clone(),
                    term: None,
                });
            }
            out.push(Inline {
                text: inline.text[range.clone()].to_string(),
                marks: inline.marks.clone(),
                term: Some(severity),
            });
            last = range.end;
        }
        if last < inline.text.len() {
            out.push(Inline {
                text: inline.text[last..].to_string(),
                marks: inline.marks,
                term: None,
            });
        }
    }

    /// Highlight response markup, returning markup with terms wrapped in
    /// `<span class="side-effect-tag">` (plus `severe-tag` for severe terms).
    pub fn highlight_markup(&self, markup: &str) -> String {
        let mut document = markup::parse(markup);
        self.annotate(&mut document);
        document.to_markup()
    }
}

/// One case-insensitive alternation for a term list, longest terms first so
/// "Impulse control disorders" wins over any shorter overlapping term.
/// Word boundaries are only required on edges that are word characters.
fn term_pattern<S: AsRef<str>>(terms: &[S]) -> Result<Option<Regex>, regex::Error> {
    let mut terms: Vec<&str> = terms
        .iter()
        .map(|t| t.as_ref().trim())
        .filter(|t| !t.is_empty())
        .collect();
    if terms.is_empty() {
        return Ok(None);
    }
    // Case variants must sit next to each other for dedup
    terms.sort_by_cached_key(|t| (std::cmp::Reverse(t.len()), t.to_lowercase()));
    terms.dedup_by(|a, b| a.to_lowercase() == b.to_lowercase());

    let alternatives: Vec<String> = terms
        .iter()
        .map(|term| {
            let starts_word = term.chars().next().is_some_and(is_word_char);
            let ends_word = term.chars().last().is_some_and(is_word_char);
            format!(
                "{}{}{}",
                if starts_word { r"\b" } else { "" },
                regex::escape(term),
                if ends_word { r"\b" } else { "" },
            )
        })
        .collect();

    RegexBuilder::new(&format!("(?:{})", alternatives.join("|")))
        .case_insensitive(true)
        .build()
        .map(Some)
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}
