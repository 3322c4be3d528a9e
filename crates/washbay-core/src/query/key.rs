use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable identity for a cached query.
///
/// An ordered list of string segments, displayed as `seg/seg/...`. Two
/// calls with equal keys share one cache entry and one in-flight fetch.
/// Prefix matching drives bulk invalidation: `["appointments"]` covers
/// `["appointments", "all"]` and `["appointments", "scheduled"]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryKey(Vec<String>);

impl QueryKey {
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    /// Append a segment, returning the extended key.
    pub fn child(mut self, segment: impl Into<String>) -> Self {
        self.0.push(segment.into());
        self
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Returns `true` if `prefix` matches this key's leading segments.
    pub fn starts_with(&self, prefix: &QueryKey) -> bool {
        self.0.starts_with(&prefix.0)
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("/"))
    }
}

impl From<&str> for QueryKey {
    fn from(segment: &str) -> Self {
        Self(vec![segment.to_owned()])
    }
}

impl<const N: usize> From<[&str; N]> for QueryKey {
    fn from(segments: [&str; N]) -> Self {
        Self::new(segments)
    }
}

impl From<Vec<String>> for QueryKey {
    fn from(segments: Vec<String>) -> Self {
        Self(segments)
    }
}
