//! Normalization of user-supplied issue references.
//!
//! Accepts a bare identifier (`del-163`, `DEL-163`) or a full tracker URL
//! (`https://linear.app/acme/issue/DEL-163/some-slug?tab=comments`) and yields
//! the canonical `TEAM-NUMBER` form with an uppercase team key.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

use crate::errors::TrackerError;

static ISSUE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Z]+)-(\d+)$").expect("valid issue regex"));

/// Canonical tracker issue identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IssueRef {
    team: String,
    number: u64,
}

impl IssueRef {
    /// Resolve raw user input (bare ID or URL) into a canonical reference.
    pub fn resolve(input: &str) -> Result<Self, TrackerError> {
        let candidate = extract_identifier(input.trim());
        let upper = candidate.to_uppercase();
        let caps = ISSUE_PATTERN
            .captures(&upper)
            .ok_or_else(|| TrackerError::InvalidIssueRef {
                input: input.to_string(),
            })?;
        let number = caps[2]
            .parse::<u64>()
            .map_err(|_| TrackerError::InvalidIssueRef {
                input: input.to_string(),
            })?;
        Ok(Self {
            team: caps[1].to_string(),
            number,
        })
    }

    pub fn team(&self) -> &str {
        &self.team
    }

    pub fn number(&self) -> u64 {
        self.number
    }
}

impl fmt::Display for IssueRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.team, self.number)
    }
}

impl FromStr for IssueRef {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::resolve(s)
    }
}

/// Pull the identifier segment out of a tracker URL; anything that is not a
/// URL is returned unchanged.
fn extract_identifier(input: &str) -> &str {
    if !input.contains("linear.app") {
        return input;
    }
    let without_query = input.split(['?', '#']).next().unwrap_or(input);
    let mut parts = without_query.split('/');
    while let Some(part) = parts.next() {
        if part == "issue"
            && let Some(id) = parts.next()
            && !id.is_empty()
        {
            return id;
        }
    }
    input
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_id_is_canonical() {
        let r = IssueRef::resolve("DEL-163").unwrap();
        assert_eq!(r.to_string(), "DEL-163");
        assert_eq!(r.team(), "DEL");
        assert_eq!(r.number(), 163);
    }

    #[test]
    fn test_lowercase_input_is_uppercased() {
        assert_eq!(IssueRef::resolve("eng-42").unwrap().to_string(), "ENG-42");
    }

    #[test]
    fn test_full_url() {
        let r = IssueRef::resolve("https://linear.app/company/issue/DEL-163").unwrap();
        assert_eq!(r.to_string(), "DEL-163");
    }

    #[test]
    fn test_url_with_query_and_slug() {
        let r = IssueRef::resolve("https://linear.app/acme/issue/ENG-42/fix-login?tab=comments")
            .unwrap();
        assert_eq!(r.to_string(), "ENG-42");
        let r = IssueRef::resolve("https://linear.app/acme/issue/ENG-7?tab=activity").unwrap();
        assert_eq!(r.to_string(), "ENG-7");
    }

    #[test]
    fn test_long_team_prefix() {
        assert_eq!(
            IssueRef::resolve("BACKEND-123").unwrap().to_string(),
            "BACKEND-123"
        );
    }

    #[test]
    fn test_leading_zeros_normalize() {
        assert_eq!(IssueRef::resolve("DEL-007").unwrap().to_string(), "DEL-7");
    }

    #[test]
    fn test_rejects_malformed() {
        for bad in ["", "DEL", "163", "DEL-", "-163", "DEL_163", "DEL-16a", "D3L-1"] {
            assert!(
                matches!(
                    IssueRef::resolve(bad),
                    Err(TrackerError::InvalidIssueRef { .. })
                ),
                "expected rejection for {:?}",
                bad
            );
        }
    }

    #[test]
    fn test_from_str() {
        let r: IssueRef = "ops-9".parse().unwrap();
        assert_eq!(r.team(), "OPS");
    }
}
