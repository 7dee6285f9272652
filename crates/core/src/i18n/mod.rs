//! Localized strings for conversation prompts and order labels.
//!
//! Catalogs are flat `key -> string` tables embedded at build time, one per
//! [`Locale`]. A [`Localizer`] is a borrowed, per-turn view over the
//! requester's catalog with the default locale behind it, so concurrent turns
//! in different locales never share a "current locale".
//!
//! Lookup order: active catalog, then the default-locale catalog, then the key
//! itself as a visible placeholder.

mod catalog;


use std::fmt;
use std::str::FromStr;

pub use catalog::{Catalog, CatalogError, Catalogs};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Locale {
    EnUs,
    JaJp,
}

pub const SUPPORTED_LOCALES: &[Locale] = &[Locale::EnUs, Locale::JaJp];

impl Locale {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::EnUs => "en-US",
            Self::JaJp => "ja-JP",
        }
    }

    const fn language(self) -> &'static str {
        match self {
            Self::EnUs => "en",
            Self::JaJp => "ja",
        }
    }

    /// Matches a tag exactly (case-insensitive, `_` accepted as separator).
    pub fn parse(tag: &str) -> Option<Self> {
        let normalized = tag.trim().replace('_', "-");
        SUPPORTED_LOCALES
            .iter()
            .copied()
            .find(|locale| locale.as_str().eq_ignore_ascii_case(&normalized))
    }

    /// Picks the best supported locale for a user tag, falling back to `default`.
    ///
    /// An exact match wins; otherwise the first locale sharing the language
    /// subtag (`ja`, `en-GB`) is used. Never fails.
    pub fn resolve(tag: &str, default: Locale) -> Self {
        if let Some(exact) = Self::parse(tag) {
            return exact;
        }

        let normalized = tag.trim().replace('_', "-").to_ascii_lowercase();
        let language = normalized.split('-').next().unwrap_or_default();
        if language.is_empty() {
            return default;
        }

        SUPPORTED_LOCALES
            .iter()
            .copied()
            .find(|locale| locale.language() == language)
            .unwrap_or(default)
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Locale {
    type Err = CatalogError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value).ok_or_else(|| CatalogError::UnsupportedLocale(value.to_owned()))
    }
}

/// Per-turn string lookup bound to one resolved locale.
#[derive(Clone, Copy, Debug)]
pub struct Localizer<'a> {
    locale: Locale,
    active: &'a Catalog,
    fallback: &'a Catalog,
}

impl<'a> Localizer<'a> {
    pub(crate) fn new(locale: Locale, active: &'a Catalog, fallback: &'a Catalog) -> Self {
        Self { locale, active, fallback }
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    pub fn t(&self, key: &str) -> String {
        if let Some(value) = self.active.get(key) {
            return value.to_owned();
        }

        if let Some(value) = self.fallback.get(key) {
            tracing::debug!(
                event_name = "i18n.lookup.fallback",
                locale = %self.locale,
                key,
                "catalog key missing, using default locale"
            );
            return value.to_owned();
        }

        tracing::warn!(
            event_name = "i18n.lookup.miss",
            locale = %self.locale,
            key,
            "catalog key missing in every locale"
        );
        key.to_owned()
    }
}
