//! Record selection policy
//!
//! The operator opts record names into monitoring. An empty policy monitors
//! every record the provider returns.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Set of record names eligible for updates
///
/// Names are stored lowercased without a trailing root dot, so membership is
/// case-insensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct SelectionPolicy {
    names: BTreeSet<String>,
}

impl SelectionPolicy {
    /// A policy that selects every record
    pub fn all() -> Self {
        Self::default()
    }

    /// Build a policy from a list of names
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let names = names
            .into_iter()
            .map(|name| normalize(name.as_ref()))
            .filter(|name| !name.is_empty())
            .collect();
        Self { names }
    }

    /// Parse a comma-separated list of names
    ///
    /// Whitespace around entries is ignored, as are empty entries, so
    /// `"a.example.com, ,b.example.com,"` yields two names.
    pub fn parse(csv: &str) -> Self {
        Self::from_names(csv.split(','))
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether a record name is selected
    pub fn contains(&self, name: &str) -> bool {
        self.is_empty() || self.names.contains(&normalize(name))
    }

    /// The configured names, normalized and sorted
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

fn normalize(name: &str) -> String {
    name.trim().trim_end_matches('.').to_ascii_lowercase()
}

impl From<Vec<String>> for SelectionPolicy {
    fn from(names: Vec<String>) -> Self {
        Self::from_names(names)
    }
}

impl From<SelectionPolicy> for Vec<String> {
    fn from(policy: SelectionPolicy) -> Self {
        policy.names.into_iter().collect()
    }
}

impl fmt::Display for SelectionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("*");
        }
        let names: Vec<&str> = self.names().collect();
        f.write_str(&names.join(","))
    }
}
