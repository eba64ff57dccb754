//! Static source catalog: how to query and parse each external catalog.
//!
//! Source profiles are loaded at compile time from `sources.json` via
//! `include_str!`, parsed once, and never mutated afterwards. Every field
//! carries an ordered list of candidate selectors. Order is a curated
//! reliability ranking: earlier candidates are more specific and more likely
//! to match the current page layout.
//!
//! A candidate is a CSS selector optionally suffixed with `@attr`, meaning
//! the attribute value is read instead of the element text
//! (e.g. `a.product-title@href`).

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Raw JSON content of the built-in catalog, embedded at compile time.
const SOURCES_JSON: &str = include_str!("sources.json");

/// A field extracted from each listing container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    /// The repeating element wrapping one listing.
    Container,
    PartNumber,
    Name,
    Price,
    Availability,
    ProductUrl,
}

impl Field {
    /// Fields extracted inside a container, in record order.
    pub const RECORD_FIELDS: [Field; 5] = [
        Field::PartNumber,
        Field::Name,
        Field::Price,
        Field::Availability,
        Field::ProductUrl,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Container => "container",
            Field::PartNumber => "part_number",
            Field::Name => "name",
            Field::Price => "price",
            Field::Availability => "availability",
            Field::ProductUrl => "product_url",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One candidate extraction rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub struct FieldSelector {
    /// CSS selector.
    pub css: String,
    /// Attribute to read; element text when `None`.
    pub attr: Option<String>,
}

impl FieldSelector {
    /// Parse `"css"` or `"css@attr"`.
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        let (css, attr) = match raw.rsplit_once('@') {
            Some((css, attr)) if is_attr_name(attr) => (css.trim(), Some(attr.to_string())),
            _ => (raw, None),
        };
        if css.is_empty() {
            bail!("empty selector in {raw:?}");
        }
        Ok(Self {
            css: css.to_string(),
            attr,
        })
    }
}

impl TryFrom<String> for FieldSelector {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

fn is_attr_name(s: &str) -> bool {
    !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Ordered candidate lists for every field of one source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldSelectorSet {
    pub container: Vec<FieldSelector>,
    pub part_number: Vec<FieldSelector>,
    pub name: Vec<FieldSelector>,
    pub price: Vec<FieldSelector>,
    #[serde(default)]
    pub availability: Vec<FieldSelector>,
    #[serde(default)]
    pub product_url: Vec<FieldSelector>,
}

impl FieldSelectorSet {
    pub fn get(&self, field: Field) -> &[FieldSelector] {
        match field {
            Field::Container => &self.container,
            Field::PartNumber => &self.part_number,
            Field::Name => &self.name,
            Field::Price => &self.price,
            Field::Availability => &self.availability,
            Field::ProductUrl => &self.product_url,
        }
    }
}

/// Static description of how to query and parse one external catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceProfile {
    /// Stable identifier, reported on every listing.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Scheme and host, no trailing slash.
    pub base_url: String,
    /// Path and query template; `{query}` is replaced by the encoded query.
    pub search_path: String,
    pub selectors: FieldSelectorSet,
}

impl SourceProfile {
    /// Build the search URL for a query.
    pub fn search_url(&self, query: &str) -> String {
        let encoded: String = url::form_urlencoded::byte_serialize(query.trim().as_bytes()).collect();
        let base = self.base_url.trim_end_matches('/');
        if self.search_path.contains("{query}") {
            format!("{base}{}", self.search_path.replace("{query}", &encoded))
        } else {
            format!("{base}{}{encoded}", self.search_path)
        }
    }

    /// Ordered candidates for a field.
    pub fn selectors(&self, field: Field) -> &[FieldSelector] {
        self.selectors.get(field)
    }

    fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            bail!("source with empty id");
        }
        url::Url::parse(&self.base_url)
            .with_context(|| format!("source '{}' has invalid base_url", self.id))?;
        for field in [Field::Container, Field::PartNumber, Field::Name, Field::Price] {
            if self.selectors(field).is_empty() {
                bail!("source '{}' has no {field} selectors", self.id);
            }
        }
        Ok(())
    }
}

#[derive(Deserialize)]
struct CatalogFile {
    sources: Vec<SourceProfile>,
}

/// Immutable, process-wide table of source profiles.
#[derive(Debug, Clone)]
pub struct SourceCatalog {
    sources: Vec<SourceProfile>,
}

impl SourceCatalog {
    /// Load the catalog embedded in the binary.
    pub fn builtin() -> Result<Self> {
        Self::from_json(SOURCES_JSON).context("built-in source catalog is invalid")
    }

    /// Parse and validate a catalog document.
    pub fn from_json(json: &str) -> Result<Self> {
        let file: CatalogFile =
            serde_json::from_str(json).context("failed to parse source catalog")?;
        Self::new(file.sources)
    }

    /// Build from profiles, rejecting duplicate ids and incomplete selector sets.
    pub fn new(sources: Vec<SourceProfile>) -> Result<Self> {
        let mut seen = HashSet::new();
        for source in &sources {
            source.validate()?;
            if !seen.insert(source.id.as_str()) {
                bail!("duplicate source id '{}'", source.id);
            }
        }
        Ok(Self { sources })
    }

    /// Sources in configured iteration order.
    pub fn sources(&self) -> &[SourceProfile] {
        &self.sources
    }

    pub fn get(&self, source_id: &str) -> Option<&SourceProfile> {
        self.sources.iter().find(|s| s.id == source_id)
    }

    /// Ordered candidate list for `(source, field)`. `None` for an unknown source.
    pub fn selectors_for(&self, source_id: &str, field: Field) -> Option<&[FieldSelector]> {
        self.get(source_id).map(|s| s.selectors(field))
    }

    /// Keep only the named sources, preserving catalog order.
    pub fn restricted_to(&self, ids: &[String]) -> Result<Self> {
        for id in ids {
            if self.get(id).is_none() {
                bail!("unknown source '{id}'");
            }
        }
        Ok(Self {
            sources: self
                .sources
                .iter()
                .filter(|s| ids.iter().any(|id| id == &s.id))
                .cloned()
                .collect(),
        })
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}
