//! Parent-first allow-list.

/// Unit prefixes that always resolve from the parent scope: the language
/// runtime, the shared contract crate, the host runtime and the logging
/// facade shared with providers.
pub const DEFAULT_PARENT_FIRST: &[&str] = &[
    "std::",
    "core::",
    "alloc::",
    "kiln_types::",
    "kiln_runtime::",
    "tracing::",
    "serde::",
];

/// Decides which unit names bypass the artifacts entirely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentFirstPolicy {
    prefixes: Vec<String>,
}

impl ParentFirstPolicy {
    /// Creates a policy from the built-in prefixes plus `extra`.
    pub fn with_extra<I, S>(extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut policy = Self::default();
        for prefix in extra {
            let prefix = prefix.into();
            if !prefix.is_empty() && !policy.prefixes.contains(&prefix) {
                policy.prefixes.push(prefix);
            }
        }
        policy
    }

    /// Returns `true` if `name` must resolve from the parent scope.
    pub fn is_parent_first(&self, name: &str) -> bool {
        self.prefixes.iter().any(|p| name.starts_with(p.as_str()))
    }

    /// Returns the configured prefixes.
    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }
}

impl Default for ParentFirstPolicy {
    fn default() -> Self {
        Self {
            prefixes: DEFAULT_PARENT_FIRST.iter().map(|p| p.to_string()).collect(),
        }
    }
}
