use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;
use thiserror::Error;

/// Literal every identifier starts with.
pub const ID_PREFIX: &str = "NG";
/// Number of digits following [`ID_PREFIX`].
pub const ID_DIGITS: usize = 7;
/// Length of the prefix used for dominance voting: `NG` plus three digits.
pub const GROUP_PREFIX_LEN: usize = 5;

fn re_candidate() -> &'static Regex {
    static R: OnceLock<Regex> = OnceLock::new();
    R.get_or_init(|| Regex::new(r"^NG[0-9]{7}$").expect("invalid regex"))
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CandidateError {
    #[error("Not an identifier (expected NG followed by 7 digits): '{0}'")]
    Malformed(String),
}

/// A well-formed identifier: `NG` followed by exactly seven ASCII digits.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Candidate(String);

impl Candidate {
    /// Builds a candidate from seven digits. Callers guarantee the digits are ASCII.
    pub(crate) fn from_digits(digits: &[char]) -> Self {
        debug_assert_eq!(digits.len(), ID_DIGITS);
        debug_assert!(digits.iter().all(char::is_ascii_digit));
        let mut s = String::with_capacity(ID_PREFIX.len() + ID_DIGITS);
        s.push_str(ID_PREFIX);
        s.extend(digits);
        Candidate(s)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `NG` plus the first three digits.
    pub fn group_prefix(&self) -> &str {
        &self.0[..GROUP_PREFIX_LEN]
    }

    /// The seven digits after `NG`.
    pub fn digits(&self) -> &str {
        &self.0[ID_PREFIX.len()..]
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Candidate {
    type Err = CandidateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if re_candidate().is_match(s) {
            Ok(Candidate(s.to_string()))
        } else {
            Err(CandidateError::Malformed(s.to_string()))
        }
    }
}

impl TryFrom<String> for Candidate {
    type Error = CandidateError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        if re_candidate().is_match(&s) {
            Ok(Candidate(s))
        } else {
            Err(CandidateError::Malformed(s))
        }
    }
}

impl From<Candidate> for String {
    fn from(c: Candidate) -> Self {
        c.0
    }
}

impl AsRef<str> for Candidate {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
