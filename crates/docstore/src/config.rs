//! Store configuration.
//!
//! Configuration is plain YAML with kebab-case keys; every key is optional:
//!
//! ```yaml
//! unknown-fields: error      # or no-match (default)
//! max-filter-depth: 16       # default 32
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ConfigError;

/// Default limit on filter nesting.
pub const DEFAULT_MAX_FILTER_DEPTH: usize = 32;

/// What a field key that does not resolve on the queried kind does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnknownFieldPolicy {
    /// The filter entry simply does not match.
    #[default]
    NoMatch,
    /// The query fails with [`EvalError::UnknownField`](crate::EvalError::UnknownField).
    Error,
}

/// Settings shared by every query a store runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct StoreConfig {
    /// Handling of unresolvable field names.
    pub unknown_fields: UnknownFieldPolicy,

    /// Maximum nesting of `$and`/`$or`/field sub-filters.
    pub max_filter_depth: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            unknown_fields: UnknownFieldPolicy::default(),
            max_filter_depth: DEFAULT_MAX_FILTER_DEPTH,
        }
    }
}

impl StoreConfig {
    /// Parse and validate a YAML document.
    ///
    /// An empty document yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed YAML or unknown keys and
    /// [`ConfigError::Invalid`] for out-of-range values.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config = if content.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?
        };
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] when the file cannot be read, otherwise
    /// see [`StoreConfig::from_yaml`].
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when `max-filter-depth` is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_filter_depth == 0 {
            return Err(ConfigError::Invalid {
                key: "max-filter-depth",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Set the unknown field policy.
    #[must_use]
    pub fn with_unknown_fields(mut self, policy: UnknownFieldPolicy) -> Self {
        self.unknown_fields = policy;
        self
    }

    /// Set the filter nesting limit.
    #[must_use]
    pub fn with_max_filter_depth(mut self, depth: usize) -> Self {
        self.max_filter_depth = depth;
        self
    }
}
