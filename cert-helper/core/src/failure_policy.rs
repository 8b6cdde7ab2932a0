use std::{fmt, str::FromStr};

/// Governs whether the API server fails closed or open when a webhook call
/// errors.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FailurePolicy {
    Fail,
    Ignore,
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("invalid failure policy {0:?}; expected Fail or Ignore")]
pub struct InvalidFailurePolicy(pub String);

// === impl FailurePolicy ===

impl FailurePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fail => "Fail",
            Self::Ignore => "Ignore",
        }
    }

    /// Parses an optional policy, where an empty string means "leave the
    /// existing policy alone".
    pub fn parse_optional(s: &str) -> Result<Option<Self>, InvalidFailurePolicy> {
        if s.trim().is_empty() {
            return Ok(None);
        }
        s.parse().map(Some)
    }
}

impl FromStr for FailurePolicy {
    type Err = InvalidFailurePolicy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            v if v.eq_ignore_ascii_case("fail") => Ok(Self::Fail),
            v if v.eq_ignore_ascii_case("ignore") => Ok(Self::Ignore),
            _ => Err(InvalidFailurePolicy(s.to_string())),
        }
    }
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
