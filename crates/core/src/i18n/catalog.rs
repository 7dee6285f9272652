use std::collections::HashMap;

use thiserror::Error;

use super::{Locale, Localizer, SUPPORTED_LOCALES};

const EMBEDDED: &[(Locale, &str)] = &[
    (Locale::EnUs, include_str!("../../locales/en-US.json")),
    (Locale::JaJp, include_str!("../../locales/ja-JP.json")),
];

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("could not parse `{locale}` catalog: {source}")]
    Parse { locale: Locale, source: serde_json::Error },
    #[error("no catalog was provided for `{0}`")]
    MissingLocale(Locale),
    #[error("unsupported locale `{0}` (expected en-US|ja-JP)")]
    UnsupportedLocale(String),
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Catalog {
    entries: HashMap<String, String>,
}

impl Catalog {
    pub fn parse(locale: Locale, raw: &str) -> Result<Self, CatalogError> {
        let entries = serde_json::from_str::<HashMap<String, String>>(raw)
            .map_err(|source| CatalogError::Parse { locale, source })?;
        Ok(Self { entries })
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for Catalog
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self { entries: iter.into_iter().map(|(key, value)| (key.into(), value.into())).collect() }
    }
}

/// Every supported locale's catalog, loaded once and shared read-only.
#[derive(Clone, Debug)]
pub struct Catalogs {
    default_locale: Locale,
    catalogs: HashMap<Locale, Catalog>,
    empty: Catalog,
}

impl Catalogs {
    /// Loads the catalogs compiled into the binary.
    pub fn embedded(default_locale: Locale) -> Result<Self, CatalogError> {
        let catalogs = EMBEDDED
            .iter()
            .map(|(locale, raw)| Catalog::parse(*locale, raw).map(|catalog| (*locale, catalog)))
            .collect::<Result<HashMap<_, _>, _>>()?;
        Self::from_catalogs(default_locale, catalogs)
    }

    pub fn from_catalogs(
        default_locale: Locale,
        catalogs: HashMap<Locale, Catalog>,
    ) -> Result<Self, CatalogError> {
        let missing = SUPPORTED_LOCALES.iter().find(|locale| !catalogs.contains_key(*locale));
        if let Some(missing) = missing {
            return Err(CatalogError::MissingLocale(*missing));
        }
        Ok(Self { default_locale, catalogs, empty: Catalog::default() })
    }

    pub fn default_locale(&self) -> Locale {
        self.default_locale
    }

    pub fn catalog(&self, locale: Locale) -> &Catalog {
        self.catalogs.get(&locale).unwrap_or(&self.empty)
    }

    /// Resolves the user's locale tag and returns a lookup view scoped to it.
    pub fn localizer(&self, tag: &str) -> Localizer<'_> {
        self.localizer_for(Locale::resolve(tag, self.default_locale))
    }

    pub fn localizer_for(&self, locale: Locale) -> Localizer<'_> {
        Localizer::new(locale, self.catalog(locale), self.catalog(self.default_locale))
    }

    pub fn loaded_locales(&self) -> Vec<Locale> {
        SUPPORTED_LOCALES
            .iter()
            .copied()
            .filter(|locale| self.catalogs.contains_key(locale))
            .collect()
    }
}
