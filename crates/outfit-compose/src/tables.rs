//! Compatibility tables.
//!
//! Style, occasion-fallback and mood adjacency maps plus brand → occasion
//! hints. The shipped tables are a versioned JSON asset compiled into the
//! binary and parsed once per process; after that they are read-only and
//! shared across requests.
//!
//! Every relationship is meant to be bidirectional. That is a property of
//! the data, checked by [`CompatibilityTables::asymmetric_edges`] in tests,
//! not enforced on lookup. Unknown keys return an empty set.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::{Arc, OnceLock};

use outfit_types::normalize_tag;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::error::ComposeError;

const BUILTIN_TABLES: &str = include_str!("../data/compatibility.json");

type Adjacency = BTreeMap<String, BTreeSet<String>>;

/// On-disk shape of the asset.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct TablesAsset {
    version: u32,
    #[serde(default)]
    styles: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    occasions: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    moods: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    brand_occasions: BTreeMap<String, Vec<String>>,
}

/// Which adjacency map an edge belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableKind {
    Style,
    Occasion,
    Mood,
}

/// A one-way relationship: `to` is listed under `from` but not vice versa.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AsymmetricEdge {
    pub table: TableKind,
    pub from: String,
    pub to: String,
}

/// How an item's style tags relate to a requested style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum StyleMatch {
    /// No tag is the style or compatible with it
    None,
    /// The item carries no style tags at all
    Untagged,
    /// A tag is in the compatible set
    Compatible,
    /// A tag equals the requested style
    Exact,
}

/// Read-only compatibility lookups.
#[derive(Debug, Clone, Default)]
pub struct CompatibilityTables {
    version: u32,
    styles: Adjacency,
    occasions: Adjacency,
    moods: Adjacency,
    brand_occasions: Adjacency,
    empty: BTreeSet<String>,
}

impl CompatibilityTables {
    /// The tables shipped with the crate, parsed on first use.
    pub fn builtin() -> Arc<CompatibilityTables> {
        static TABLES: OnceLock<Arc<CompatibilityTables>> = OnceLock::new();
        TABLES
            .get_or_init(|| match Self::from_json(BUILTIN_TABLES) {
                Ok(tables) => Arc::new(tables),
                Err(e) => {
                    error!(error = %e, "Built-in compatibility tables failed to parse");
                    Arc::new(CompatibilityTables::default())
                }
            })
            .clone()
    }

    /// Parse tables from a JSON document.
    pub fn from_json(json: &str) -> Result<Self, ComposeError> {
        let asset: TablesAsset =
            serde_json::from_str(json).map_err(|e| ComposeError::Tables(e.to_string()))?;

        let tables = Self {
            version: asset.version,
            styles: normalize_map(asset.styles),
            occasions: normalize_map(asset.occasions),
            moods: normalize_map(asset.moods),
            brand_occasions: normalize_map(asset.brand_occasions),
            empty: BTreeSet::new(),
        };

        debug!(
            version = tables.version,
            styles = tables.styles.len(),
            occasions = tables.occasions.len(),
            moods = tables.moods.len(),
            brands = tables.brand_occasions.len(),
            "Loaded compatibility tables"
        );
        Ok(tables)
    }

    /// Load tables from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ComposeError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| ComposeError::Tables(format!("{}: {e}", path.display())))?;
        Self::from_json(&json)
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn compatible_styles(&self, style: &str) -> &BTreeSet<String> {
        lookup(&self.styles, &self.empty, style)
    }

    pub fn fallback_occasions(&self, occasion: &str) -> &BTreeSet<String> {
        lookup(&self.occasions, &self.empty, occasion)
    }

    pub fn compatible_moods(&self, mood: &str) -> &BTreeSet<String> {
        lookup(&self.moods, &self.empty, mood)
    }

    /// Occasions a brand is typical for.
    pub fn brand_occasions(&self, brand: &str) -> &BTreeSet<String> {
        lookup(&self.brand_occasions, &self.empty, brand)
    }

    /// Known style keys.
    pub fn styles(&self) -> impl Iterator<Item = &str> {
        self.styles.keys().map(String::as_str)
    }

    /// Classify an item's style tags against a requested style.
    pub fn style_match(&self, tags: &[String], style: &str) -> StyleMatch {
        if tags.is_empty() {
            return StyleMatch::Untagged;
        }
        let style = normalize_tag(style);
        if tags.iter().any(|t| *t == style) {
            return StyleMatch::Exact;
        }
        let compatible = self.compatible_styles(&style);
        if tags.iter().any(|t| compatible.contains(t)) {
            StyleMatch::Compatible
        } else {
            StyleMatch::None
        }
    }

    /// Every one-way edge across the style, occasion and mood tables.
    pub fn asymmetric_edges(&self) -> Vec<AsymmetricEdge> {
        let mut edges = Vec::new();
        for (kind, map) in [
            (TableKind::Style, &self.styles),
            (TableKind::Occasion, &self.occasions),
            (TableKind::Mood, &self.moods),
        ] {
            for (from, targets) in map {
                for to in targets {
                    let back = map.get(to).is_some_and(|set| set.contains(from));
                    if !back {
                        edges.push(AsymmetricEdge {
                            table: kind,
                            from: from.clone(),
                            to: to.clone(),
                        });
                    }
                }
            }
        }
        edges
    }
}

fn normalize_map(raw: BTreeMap<String, Vec<String>>) -> Adjacency {
    let mut out = Adjacency::new();
    for (key, values) in raw {
        let key = normalize_tag(&key);
        if key.is_empty() {
            continue;
        }
        let entry = out.entry(key.clone()).or_default();
        for value in values {
            let value = normalize_tag(&value);
            // Self-loops carry no information
            if !value.is_empty() && value != key {
                entry.insert(value);
            }
        }
    }
    out
}

fn lookup<'a>(map: &'a Adjacency, empty: &'a BTreeSet<String>, key: &str) -> &'a BTreeSet<String> {
    map.get(&normalize_tag(key)).unwrap_or(empty)
}
