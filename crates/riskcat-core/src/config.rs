//! Service configuration
//!
//! Loaded from TOML; every section and field is optional.
//!
//! ```toml
//! log_level = "debug"
//!
//! [incarnation]
//! default_lookup = "ALWAYS"
//! default_exclude = ["LINK_EXTERNAL"]
//! merge_bidirectional_references = true
//!
//! [migration]
//! inert_change_kinds = ["TranslationDiff"]
//!
//! [repository]
//! enforce_unique_names = true
//! ```

use riskcat_migration::ChangeKind;
use riskcat_model::{IncarnationConfiguration, IncarnationLookup, RequestMode, TailoringReferenceType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File is not valid TOML for this schema
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Core configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub incarnation: IncarnationSettings,
    pub migration: MigrationSettings,
    pub repository: RepositorySettings,
    /// Default tracing filter when `RUST_LOG` is unset
    pub log_level: String,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            incarnation: IncarnationSettings::default(),
            migration: MigrationSettings::default(),
            repository: RepositorySettings::default(),
            log_level: "info".to_string(),
        }
    }
}

impl CoreConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Read and parse a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    #[inline]
    #[must_use]
    pub fn with_default_mode(mut self, mode: RequestMode) -> Self {
        self.incarnation.default_mode = Some(mode);
        self
    }

    #[inline]
    #[must_use]
    pub fn with_default_lookup(mut self, lookup: IncarnationLookup) -> Self {
        self.incarnation.default_lookup = Some(lookup);
        self
    }

    /// Default include/exclude sets, always replaced together
    #[must_use]
    pub fn with_default_filter(
        mut self,
        include: Option<BTreeSet<TailoringReferenceType>>,
        exclude: Option<BTreeSet<TailoringReferenceType>>,
    ) -> Self {
        self.incarnation.default_include = include;
        self.incarnation.default_exclude = exclude;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_merge_bidirectional_references(mut self, merge: bool) -> Self {
        self.incarnation.merge_bidirectional_references = merge;
        self
    }

    #[must_use]
    pub fn with_inert_change_kinds(mut self, kinds: impl IntoIterator<Item = ChangeKind>) -> Self {
        self.migration.inert_change_kinds = kinds.into_iter().collect();
        self
    }

    #[inline]
    #[must_use]
    pub fn with_unique_names(mut self, enforce: bool) -> Self {
        self.repository.enforce_unique_names = enforce;
        self
    }

    #[must_use]
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }
}

/// Incarnation defaults, applied over the domain's own configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IncarnationSettings {
    pub default_mode: Option<RequestMode>,
    pub default_lookup: Option<IncarnationLookup>,
    pub default_include: Option<BTreeSet<TailoringReferenceType>>,
    pub default_exclude: Option<BTreeSet<TailoringReferenceType>>,
    pub merge_bidirectional_references: bool,
}

impl IncarnationSettings {
    /// Domain configuration with the values set here taking precedence
    #[must_use]
    pub fn over(&self, domain: &IncarnationConfiguration) -> IncarnationConfiguration {
        let mut effective = domain.clone();
        if let Some(mode) = self.default_mode {
            effective.mode = mode;
        }
        if let Some(lookup) = self.default_lookup {
            effective.lookup = lookup;
        }
        if self.default_include.is_some() || self.default_exclude.is_some() {
            effective.include.clone_from(&self.default_include);
            effective.exclude.clone_from(&self.default_exclude);
        }
        effective
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MigrationSettings {
    /// Change kinds accepted without the caller listing them
    pub inert_change_kinds: BTreeSet<ChangeKind>,
}

impl Default for MigrationSettings {
    fn default() -> Self {
        Self {
            inert_change_kinds: ChangeKind::default_inert(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositorySettings {
    /// Reject duplicate element names within a unit
    pub enforce_unique_names: bool,
}
