use std::sync::LazyLock;

use regex::Regex;
use semver::{Version, VersionReq};

use super::EngineError;

static NUMERIC_VERSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+)(?:\.(\d+))?(?:\.(\d+))?").expect("static regex is valid")
});

/// Coerces loosely formatted versions (`v2.1`, `2.1.0.0`) to `major.minor.patch`.
///
/// Returns `None` when the string contains no number at all.
pub fn coerce_version(raw: &str) -> Option<Version> {
    let caps = NUMERIC_VERSION.captures(raw)?;
    let part = |i: usize| -> Option<u64> {
        match caps.get(i) {
            Some(m) => m.as_str().parse().ok(),
            None => Some(0),
        }
    };
    Some(Version::new(part(1)?, part(2)?, part(3)?))
}

/// npm-style semver range: `||`-separated alternatives, each a
/// whitespace- or comma-separated set of comparators.
#[derive(Debug, Clone)]
pub struct VersionRange {
    raw: String,
    alternatives: Vec<VersionReq>,
}

impl VersionRange {
    pub fn parse(raw: &str) -> Result<Self, EngineError> {
        let mut alternatives = Vec::new();
        for alt in raw.split("||") {
            let alt = alt.trim();
            let req = if alt.is_empty() || alt == "*" || alt.eq_ignore_ascii_case("x") {
                VersionReq::STAR
            } else {
                VersionReq::parse(&normalize_comparators(alt)).map_err(|e| {
                    EngineError::InvalidRange {
                        range: raw.to_string(),
                        reason: e.to_string(),
                    }
                })?
            };
            alternatives.push(req);
        }
        Ok(Self {
            raw: raw.to_string(),
            alternatives,
        })
    }

    pub fn matches(&self, version: &Version) -> bool {
        self.alternatives.iter().any(|req| req.matches(version))
    }

    /// Coerces `raw` before matching; unparseable versions never match.
    pub fn matches_str(&self, raw: &str) -> bool {
        coerce_version(raw).is_some_and(|v| self.matches(&v))
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl std::fmt::Display for VersionRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

// `>= 1.2.0 < 2` -> `>=1.2.0, <2`
fn normalize_comparators(alt: &str) -> String {
    let mut parts: Vec<String> = Vec::new();
    let mut pending_op: Option<&str> = None;
    for token in alt.split(|c: char| c.is_whitespace() || c == ',') {
        if token.is_empty() {
            continue;
        }
        if token.chars().all(|c| matches!(c, '<' | '>' | '=' | '^' | '~')) {
            pending_op = Some(token);
            continue;
        }
        match pending_op.take() {
            Some(op) => parts.push(format!("{}{}", op, token)),
            // a bare full version is an exact pin, not semver's implicit caret
            None if is_full_version(token) => parts.push(format!("={}", token)),
            None => parts.push(token.to_string()),
        }
    }
    parts.join(", ")
}

fn is_full_version(token: &str) -> bool {
    let parts: Vec<&str> = token.split('.').collect();
    parts.len() == 3
        && parts
            .iter()
            .all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()))
}
