use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::SubjectError;

/// Normalized identifier of the thing being reviewed, e.g. `amazon.com`.
///
/// Normalization trims surrounding whitespace, lowercases, and strips one leading `www.`.
/// The result is what the content provider is pointed at, so it must be non-empty and
/// must not contain inner whitespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct SubjectId(String);

impl SubjectId {
    pub fn parse(raw: &str) -> Result<Self, SubjectError> {
        let lowered = raw.trim().to_lowercase();
        let normalized = lowered.strip_prefix("www.").unwrap_or(&lowered).trim();

        if normalized.is_empty() {
            return Err(SubjectError::Empty);
        }
        if normalized.chars().any(char::is_whitespace) {
            return Err(SubjectError::Whitespace(normalized.to_string()));
        }
        Ok(Self(normalized.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for SubjectId {
    type Err = SubjectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
