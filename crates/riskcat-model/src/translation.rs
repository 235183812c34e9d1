//! Localized texts

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Translated fields keyed by locale, then by field name
///
/// `{"en": {"name": "High", "description": "..."}, "de": {...}}`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Translations(BTreeMap<String, BTreeMap<String, String>>);

impl Translations {
    /// Empty translations
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a translated field, returning self
    #[must_use]
    pub fn with(
        mut self,
        locale: impl Into<String>,
        field: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        self.insert(locale, field, text);
        self
    }

    /// Insert a translated field
    pub fn insert(
        &mut self,
        locale: impl Into<String>,
        field: impl Into<String>,
        text: impl Into<String>,
    ) {
        self.0
            .entry(locale.into())
            .or_default()
            .insert(field.into(), text.into());
    }

    /// Look up a field in a locale
    #[must_use]
    pub fn get(&self, locale: &str, field: &str) -> Option<&str> {
        self.0.get(locale)?.get(field).map(String::as_str)
    }

    /// Name in `locale`, else the first name in any locale
    #[must_use]
    pub fn name(&self, locale: &str) -> Option<&str> {
        self.get(locale, "name").or_else(|| {
            self.0
                .values()
                .find_map(|fields| fields.get("name"))
                .map(String::as_str)
        })
    }

    /// Locales present
    pub fn locales(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Every `(locale, field)` present in either side, in sorted order
    #[must_use]
    pub fn keys_union<'a>(&'a self, other: &'a Self) -> Vec<(&'a str, &'a str)> {
        let mut keys: Vec<(&str, &str)> = self
            .0
            .iter()
            .chain(other.0.iter())
            .flat_map(|(locale, fields)| {
                fields
                    .keys()
                    .map(move |field| (locale.as_str(), field.as_str()))
            })
            .collect();
        keys.sort_unstable();
        keys.dedup();
        keys
    }

    /// Whether no translation is present
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.values().all(BTreeMap::is_empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_of_keys_is_sorted_and_distinct() {
        let a = Translations::new()
            .with("en", "name", "High")
            .with("de", "name", "Hoch");
        let b = Translations::new()
            .with("en", "name", "Very high")
            .with("en", "abbreviation", "VH");

        assert_eq!(
            a.keys_union(&b),
            vec![("de", "name"), ("en", "abbreviation"), ("en", "name")]
        );
    }

    #[test]
    fn lookup_missing_locale() {
        let t = Translations::new().with("en", "name", "Low");
        assert_eq!(t.get("en", "name"), Some("Low"));
        assert_eq!(t.get("fr", "name"), None);
    }
}
