//! Route pattern matching.
//!
//! # Responsibilities
//! - Compile a textual pattern into an anchored regular expression
//! - Extract positional captures from a path or host string
//!
//! # Design Decisions
//! - Patterns match the entire input; partial prefix matches never succeed
//! - Optional groups that do not take part in a match yield an empty string;
//!   the router drops those so handler defaults apply
//! - Host patterns are case-insensitive (per HTTP), path patterns are not

use regex::{Regex, RegexBuilder};

use crate::error::RouteError;

/// A compiled route pattern.
#[derive(Debug, Clone)]
pub struct RoutePattern {
    source: String,
    regex: Regex,
}

impl RoutePattern {
    /// Compile a path pattern.
    pub fn compile(pattern: &str) -> Result<Self, RouteError> {
        Self::build(pattern, false)
    }

    /// Compile a host pattern (case-insensitive).
    pub fn compile_host(pattern: &str) -> Result<Self, RouteError> {
        Self::build(pattern, true)
    }

    fn build(pattern: &str, case_insensitive: bool) -> Result<Self, RouteError> {
        let anchored = format!("^(?:{})$", pattern);
        let regex = RegexBuilder::new(&anchored)
            .case_insensitive(case_insensitive)
            .build()
            .map_err(|source| RouteError::InvalidPattern {
                pattern: pattern.to_string(),
                source,
            })?;
        Ok(Self {
            source: pattern.to_string(),
            regex,
        })
    }

    /// The pattern as written.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Match `input` in full. Returns every capture group in order,
    /// non-participating groups as empty strings.
    pub fn captures(&self, input: &str) -> Option<Vec<String>> {
        let caps = self.regex.captures(input)?;
        Some(
            caps.iter()
                .skip(1)
                .map(|m| m.map(|m| m.as_str().to_string()).unwrap_or_default())
                .collect(),
        )
    }

    pub fn is_match(&self, input: &str) -> bool {
        self.regex.is_match(input)
    }
}
