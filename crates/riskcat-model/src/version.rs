//! Template versions
//!
//! Domain templates are published as `major.minor.patch`. Elements remember
//! the version of the item they were incarnated from, which the
//! `SAME_VERSION` lookup policy compares against.

use crate::error::ModelError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Semantic version of a domain template
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TemplateVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl TemplateVersion {
    /// Create version from parts
    #[inline]
    #[must_use]
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Whether moving from `self` to `other` crosses a major version
    #[inline]
    #[must_use]
    pub fn is_major_upgrade_to(&self, other: &Self) -> bool {
        other.major > self.major
    }
}

impl Display for TemplateVersion {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for TemplateVersion {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ModelError::InvalidVersion(s.to_string());
        let mut parts = s.trim().split('.');
        let mut next = || -> Result<u32, ModelError> {
            parts
                .next()
                .ok_or_else(invalid)?
                .parse::<u32>()
                .map_err(|_| invalid())
        };
        let version = Self::new(next()?, next()?, next()?);
        if parts.next().is_some() {
            return Err(invalid());
        }
        Ok(version)
    }
}

impl Serialize for TemplateVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TemplateVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_valid_version() {
        let v: TemplateVersion = "2.10.3".parse().unwrap();
        assert_eq!(v, TemplateVersion::new(2, 10, 3));
        assert_eq!(v.to_string(), "2.10.3");
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!("1.2".parse::<TemplateVersion>().is_err());
        assert!("1.2.3.4".parse::<TemplateVersion>().is_err());
        assert!("a.b.c".parse::<TemplateVersion>().is_err());
    }

    #[test]
    fn ordering_follows_components() {
        let old = TemplateVersion::new(1, 9, 0);
        let new = TemplateVersion::new(2, 0, 0);
        assert!(old < new);
        assert!(old.is_major_upgrade_to(&new));
        assert!(!new.is_major_upgrade_to(&old));
    }

    #[test]
    fn serializes_as_string() {
        let json = serde_json::to_string(&TemplateVersion::new(1, 0, 2)).unwrap();
        assert_eq!(json, "\"1.0.2\"");
        let back: TemplateVersion = serde_json::from_str(&json).unwrap();
        assert_eq!(back, TemplateVersion::new(1, 0, 2));
    }
}
