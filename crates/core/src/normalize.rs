use thiserror::Error;

use crate::candidate::{Candidate, ID_DIGITS, ID_PREFIX};
use crate::rules::{confusable_digit, rewrite_prefix, STRIPPED_CHARS};

/// Furthest position at which a stray `NG` may still anchor the identifier.
const MAX_ANCHOR_OFFSET: usize = 4;

/// Why a line produced no candidate. Rejections are routine, not failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("line is empty after cleaning")]
    Empty,
    #[error("no NG anchor near the start of the line")]
    MissingAnchor,
    #[error("only {found} of 7 digits after the NG anchor")]
    TooFewDigits { found: usize },
}

/// Turns a single raw OCR line into at most one identifier candidate.
pub struct LineNormalizer;

impl LineNormalizer {
    /// Normalize one raw OCR line. Returns `None` if the line cannot hold an identifier.
    pub fn normalize(line: &str) -> Option<Candidate> {
        Self::inspect(line).ok()
    }

    /// Like [`LineNormalizer::normalize`] but reports why a line was rejected.
    pub fn inspect(line: &str) -> Result<Candidate, Rejection> {
        let cleaned = clean(line);
        if cleaned.is_empty() {
            return Err(Rejection::Empty);
        }

        let rewritten = rewrite_prefix(&cleaned).unwrap_or(cleaned);
        let filtered = repair_glyphs(&rewritten);
        let anchored = anchor(&filtered).ok_or(Rejection::MissingAnchor)?;

        let digits: Vec<char> = anchored[ID_PREFIX.len()..]
            .chars()
            .filter_map(as_digit)
            .take(ID_DIGITS)
            .collect();
        if digits.len() < ID_DIGITS {
            return Err(Rejection::TooFewDigits { found: digits.len() });
        }

        Ok(Candidate::from_digits(&digits))
    }

    /// Normalize every line, keeping only the ones that yield a candidate.
    pub fn normalize_all<I, S>(lines: I) -> Vec<Candidate>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        lines
            .into_iter()
            .filter_map(|l| Self::normalize(l.as_ref()))
            .collect()
    }
}

fn clean(line: &str) -> String {
    line.trim_matches(|c: char| c.is_whitespace() || c == '\u{feff}')
        .to_uppercase()
        .chars()
        .filter(|c| !STRIPPED_CHARS.contains(c))
        .collect()
}

/// Keep ASCII letters and digits, map confusable glyphs, drop the rest.
fn repair_glyphs(s: &str) -> String {
    s.chars()
        .filter_map(|c| {
            if c.is_ascii_alphanumeric() {
                Some(c)
            } else {
                confusable_digit(c)
            }
        })
        .collect()
}

/// Slice `s` so it starts at the `NG` anchor. `s` is ASCII after glyph repair.
fn anchor(s: &str) -> Option<&str> {
    if s.starts_with(ID_PREFIX) {
        return Some(s);
    }
    match s.find(ID_PREFIX) {
        Some(idx) if idx <= MAX_ANCHOR_OFFSET => Some(&s[idx..]),
        _ => None,
    }
}

fn as_digit(c: char) -> Option<char> {
    if c.is_ascii_digit() {
        Some(c)
    } else {
        confusable_digit(c)
    }
}
