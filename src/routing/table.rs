//! Compiled route table.
//!
//! # Design Decisions
//! - Ordered; the first matching entry wins, there is no specificity scoring
//! - Built once, never mutated, shared without locks

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::error::RouteError;
use crate::provider::ProviderType;
use crate::routing::matcher::RoutePattern;

/// Methods a route accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MethodSet {
    All,
    Only(BTreeSet<String>),
}

impl MethodSet {
    /// Normalize a list of method names to uppercase.
    ///
    /// `"ALL"` anywhere in the list means every method. An empty list is rejected.
    pub fn from_list<I, S>(pattern: &str, methods: I) -> Result<Self, RouteError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let set: BTreeSet<String> = methods
            .into_iter()
            .map(|m| m.as_ref().trim().to_ascii_uppercase())
            .filter(|m| !m.is_empty())
            .collect();
        if set.is_empty() {
            return Err(RouteError::EmptyMethodSet {
                pattern: pattern.to_string(),
            });
        }
        if set.contains("ALL") {
            return Ok(MethodSet::All);
        }
        Ok(MethodSet::Only(set))
    }

    pub fn allows(&self, method: &str) -> bool {
        match self {
            MethodSet::All => true,
            MethodSet::Only(set) => set.contains(method),
        }
    }
}

/// Host constraint of a route.
#[derive(Debug, Clone)]
pub enum HostPattern {
    Any,
    Pattern(RoutePattern),
}

impl HostPattern {
    /// `"*"` is the wildcard; anything else is compiled.
    pub fn parse(pattern: &str) -> Result<Self, RouteError> {
        if pattern == "*" {
            Ok(HostPattern::Any)
        } else {
            RoutePattern::compile_host(pattern).map(HostPattern::Pattern)
        }
    }

    /// Host captures, or `None` when the host does not match.
    pub fn captures(&self, host: &str) -> Option<Vec<String>> {
        match self {
            HostPattern::Any => Some(Vec::new()),
            HostPattern::Pattern(pattern) => pattern.captures(host),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RouteEntry {
    pub path: RoutePattern,
    pub handler: String,
    pub methods: MethodSet,
    pub host: HostPattern,
    pub provider: Arc<ProviderType>,
}

#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    entries: Vec<RouteEntry>,
}

impl RouteTable {
    pub fn new(entries: Vec<RouteEntry>) -> Self {
        Self { entries }
    }

    pub fn iter(&self) -> impl Iterator<Item = &RouteEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
