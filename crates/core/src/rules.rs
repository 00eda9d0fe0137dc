//! Repair tables for the identifier grammar.
//!
//! Both tables are plain data evaluated in order, so each rule can be audited
//! and tested on its own.

/// Characters removed outright before any other processing.
pub const STRIPPED_CHARS: &[char] = &[' ', ',', '-', '(', ')'];

/// Glyphs that OCR commonly returns in place of a digit.
pub const CONFUSIONS: &[(char, char)] = &[
    ('O', '0'),
    ('o', '0'),
    ('Q', '0'),
    ('D', '0'),
    ('I', '1'),
    ('i', '1'),
    ('l', '1'),
    ('L', '1'),
    ('T', '1'),
    ('|', '1'),
    ('Z', '2'),
    ('z', '2'),
    ('S', '5'),
    ('s', '5'),
    ('G', '6'),
    ('b', '6'),
    ('B', '8'),
    ('°', '0'),
    ('º', '0'),
];

/// Look up the digit a confusable glyph stands for.
pub fn confusable_digit(c: char) -> Option<char> {
    CONFUSIONS
        .iter()
        .find(|(glyph, _)| *glyph == c)
        .map(|(_, digit)| *digit)
}

/// Extra condition a rewrite needs beyond the leading pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guard {
    Always,
    /// The character right after the matched pattern exists and is not a digit.
    NextIsNonDigit,
}

/// One known misread of the leading text, replaced wholesale when it leads a line.
#[derive(Debug, Clone, Copy)]
pub struct PrefixRewrite {
    pub patterns: &'static [&'static str],
    pub replacement: &'static str,
    pub guard: Guard,
}

impl PrefixRewrite {
    /// Returns the rewritten line if this rule applies to `line`.
    pub fn apply(&self, line: &str) -> Option<String> {
        let pattern = self
            .patterns
            .iter()
            .find(|p| line.starts_with(**p) && self.guard_holds(&line[p.len()..]))?;
        let mut out = String::with_capacity(line.len() + self.replacement.len());
        out.push_str(self.replacement);
        out.push_str(&line[pattern.len()..]);
        Some(out)
    }

    fn guard_holds(&self, rest: &str) -> bool {
        match self.guard {
            Guard::Always => true,
            Guard::NextIsNonDigit => rest.chars().next().is_some_and(|c| !c.is_ascii_digit()),
        }
    }
}

/// Misreads of the common leading text `NG013`, highest priority first.
pub const PREFIX_REWRITES: &[PrefixRewrite] = &[
    PrefixRewrite { patterns: &["NGOIS", "NGO1S", "NGOLS"], replacement: "NG013", guard: Guard::Always },
    PrefixRewrite { patterns: &["NGOI", "NGOL"], replacement: "NG013", guard: Guard::Always },
    PrefixRewrite { patterns: &["NGO1"], replacement: "NG013", guard: Guard::NextIsNonDigit },
    PrefixRewrite { patterns: &["NEOS"], replacement: "NG013", guard: Guard::Always },
    PrefixRewrite { patterns: &["NEO"], replacement: "NG013", guard: Guard::Always },
    PrefixRewrite { patterns: &["WG", "W6"], replacement: "NG", guard: Guard::Always },
    PrefixRewrite { patterns: &["MG", "M6"], replacement: "NG", guard: Guard::Always },
    PrefixRewrite { patterns: &["N6"], replacement: "NG", guard: Guard::Always },
];

/// Apply the first matching rewrite, if any. At most one rule ever fires.
pub fn rewrite_prefix(line: &str) -> Option<String> {
    PREFIX_REWRITES.iter().find_map(|rule| rule.apply(line))
}
