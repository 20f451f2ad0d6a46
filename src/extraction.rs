//! Target-line extraction from raw OCR text
//!
//! Two patterns are in play. The exact pattern (`<digits>_1_<digits>`) is run
//! first as a validation pass; the line actually selected is the first one
//! containing the `_1_` marker at all. Which of the two may decide the result
//! is controlled by [`MatchPolicy`], and the winning line reports the
//! [`MatchTier`] it satisfied.

use crate::context::RequestContext;
use crate::error::ExtractError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

/// Marker-only pattern: any line containing `_1_`
pub const FALLBACK_PATTERN: &str = r"(?m)^.*_1_.*$";

/// Digits, the `_1_` marker, then more digits
pub const EXACT_PATTERN: &str = r"(?m)^.*\d+_1_\d+.*$";

static FALLBACK_RE: Lazy<Regex> = Lazy::new(|| Regex::new(FALLBACK_PATTERN).unwrap());
static EXACT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(EXACT_PATTERN).unwrap());

/// Which lines are acceptable as a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum MatchPolicy {
    /// Return the first `_1_` line, whether or not the exact pattern accepts it
    #[default]
    AllowFallback,
    /// Only lines matching `<digits>_1_<digits>` are accepted
    ExactOnly,
}

impl MatchPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AllowFallback => "allow-fallback",
            Self::ExactOnly => "exact-only",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchTier {
    /// The line matches the exact pattern
    Exact,
    /// The line only contains the `_1_` marker
    Fallback,
}

impl MatchTier {
    /// Pattern that characterizes this tier
    pub fn pattern(&self) -> &'static str {
        match self {
            Self::Exact => EXACT_PATTERN,
            Self::Fallback => FALLBACK_PATTERN,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineMatch {
    /// The matched line, surrounding whitespace trimmed
    pub line: String,
    pub tier: MatchTier,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LineExtractor {
    policy: MatchPolicy,
}

impl LineExtractor {
    pub fn new(policy: MatchPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> MatchPolicy {
        self.policy
    }

    /// Count the lines the exact pattern accepts
    pub fn validate(&self, text: &str) -> usize {
        EXACT_RE.find_iter(text).count()
    }

    /// Find the first line of `text` matching the target pattern
    pub fn extract(&self, text: &str, ctx: &RequestContext) -> Result<LineMatch, ExtractError> {
        if text.trim().is_empty() {
            tracing::warn!(request_id = %ctx.request_id, "Extraction failed: OCR text is empty");
            return Err(ExtractError::EmptyText);
        }

        tracing::debug!(
            request_id = %ctx.request_id,
            "OCR output has {} line(s)",
            text.lines().count()
        );
        for (number, line) in candidate_lines(text) {
            tracing::debug!(request_id = %ctx.request_id, "Candidate line {}: {}", number, line);
        }

        let exact_candidates = self.validate(text);
        if exact_candidates == 0 {
            tracing::warn!(
                request_id = %ctx.request_id,
                "Exact pattern '{}' not found in OCR output",
                EXACT_PATTERN
            );
        } else {
            tracing::debug!(
                request_id = %ctx.request_id,
                "Exact pattern matched {} line(s)",
                exact_candidates
            );
        }

        let selected = match self.policy {
            MatchPolicy::ExactOnly => EXACT_RE.find(text).map(|m| LineMatch {
                line: m.as_str().trim().to_string(),
                tier: MatchTier::Exact,
            }),
            MatchPolicy::AllowFallback => FALLBACK_RE.find(text).map(|m| {
                let tier = if EXACT_RE.is_match(m.as_str()) {
                    MatchTier::Exact
                } else {
                    MatchTier::Fallback
                };
                LineMatch {
                    line: m.as_str().trim().to_string(),
                    tier,
                }
            }),
        };

        match selected {
            Some(found) => {
                tracing::info!(
                    request_id = %ctx.request_id,
                    "Target line extracted ({:?}): {}",
                    found.tier,
                    found.line
                );
                Ok(found)
            }
            None => {
                tracing::warn!(
                    request_id = %ctx.request_id,
                    "No line satisfies the {} policy",
                    self.policy.as_str()
                );
                Err(ExtractError::NoMatch)
            }
        }
    }
}

/// Lines containing both `_` and `1`, numbered from 1
///
/// Loose enough to show near misses such as `12_l_34` when nothing matches.
pub fn candidate_lines(text: &str) -> Vec<(usize, &str)> {
    text.lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| line.contains('_') && line.contains('1'))
        .collect()
}
