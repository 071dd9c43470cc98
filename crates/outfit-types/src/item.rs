//! Wardrobe item types.
//!
//! `ClothingItem` is the well-formed record every pipeline stage works with.
//! `WardrobeRecord` is the loosely typed shape handed over by storage; it is
//! converted exactly once, at the wardrobe-source boundary, by
//! [`ingest_wardrobe`]. Past that point no stage needs to guard against
//! missing fields.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::TypesError;

/// Normalize a free-form tag or label.
///
/// Lowercases, trims, maps `_` and `-` to spaces and collapses runs of
/// whitespace, so "Business_Formal" and "business  formal" compare equal.
pub fn normalize_tag(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .replace(['_', '-'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Normalize a tag list: drop empties, dedup, keep first-seen order.
pub fn normalize_tags<I, S>(raw: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for tag in raw {
        let tag = normalize_tag(tag.as_ref());
        if !tag.is_empty() && !out.contains(&tag) {
            out.push(tag);
        }
    }
    out
}

/// Ordinal formality scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Formality {
    /// Gym and sports wear
    Athletic = 1,
    /// Everyday casual
    Casual = 2,
    /// Smart casual / business casual
    SmartCasual = 3,
    /// Office and business wear
    Business = 4,
    /// Black tie, gala, wedding
    Formal = 5,
}

impl Formality {
    /// Numeric level (1-5).
    pub fn level(&self) -> u8 {
        *self as u8
    }

    /// Map a numeric level back to a formality, clamping out-of-range values.
    pub fn from_level(level: u8) -> Self {
        match level {
            0 | 1 => Formality::Athletic,
            2 => Formality::Casual,
            3 => Formality::SmartCasual,
            4 => Formality::Business,
            _ => Formality::Formal,
        }
    }

    /// Parse a label; unknown labels yield `None`.
    pub fn parse(label: &str) -> Option<Self> {
        match normalize_tag(label).as_str() {
            "athletic" | "sport" | "sporty" | "active" => Some(Formality::Athletic),
            "casual" | "relaxed" => Some(Formality::Casual),
            "smart casual" | "business casual" | "semi formal" => Some(Formality::SmartCasual),
            "business" | "professional" => Some(Formality::Business),
            "formal" | "black tie" => Some(Formality::Formal),
            _ => None,
        }
    }

    /// Returns the display name for this level.
    pub fn as_str(&self) -> &'static str {
        match self {
            Formality::Athletic => "athletic",
            Formality::Casual => "casual",
            Formality::SmartCasual => "smart casual",
            Formality::Business => "business",
            Formality::Formal => "formal",
        }
    }
}

/// Which layer of an outfit an item is worn in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WearLayer {
    Base,
    Mid,
    Outer,
}

impl WearLayer {
    pub fn parse(label: &str) -> Option<Self> {
        match normalize_tag(label).as_str() {
            "base" | "base layer" | "inner" => Some(WearLayer::Base),
            "mid" | "mid layer" | "middle" => Some(WearLayer::Mid),
            "outer" | "outer layer" | "outerwear" => Some(WearLayer::Outer),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WearLayer::Base => "base",
            WearLayer::Mid => "mid",
            WearLayer::Outer => "outer",
        }
    }
}

/// Fabric weight class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FabricWeight {
    Light,
    Medium,
    Heavy,
}

impl FabricWeight {
    pub fn parse(label: &str) -> Option<Self> {
        match normalize_tag(label).as_str() {
            "light" | "lightweight" | "thin" => Some(FabricWeight::Light),
            "medium" | "midweight" | "mid" => Some(FabricWeight::Medium),
            "heavy" | "heavyweight" | "thick" => Some(FabricWeight::Heavy),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FabricWeight::Light => "light",
            FabricWeight::Medium => "medium",
            FabricWeight::Heavy => "heavy",
        }
    }
}

/// Structured visual metadata. Every field is independently optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemMetadata {
    #[serde(default)]
    pub material: Option<String>,

    #[serde(default)]
    pub pattern: Option<String>,

    #[serde(default)]
    pub fit: Option<String>,

    #[serde(default)]
    pub sleeve_length: Option<String>,

    #[serde(default)]
    pub formality: Option<Formality>,

    #[serde(default)]
    pub wear_layer: Option<WearLayer>,

    #[serde(default)]
    pub fabric_weight: Option<FabricWeight>,
}

/// A wardrobe entry owned by exactly one user.
///
/// Tag vectors hold normalized lowercase strings and are treated as
/// unordered sets. The pipeline only reads items; it never writes back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClothingItem {
    /// Stable identifier, unique per user (may be empty for legacy records)
    #[serde(default)]
    pub id: String,

    /// Owner
    pub user_id: String,

    /// Display name ("Navy wool sweater")
    #[serde(default)]
    pub name: String,

    /// Free-form type, normalized to a category by the classifier
    #[serde(rename = "type", default)]
    pub item_type: String,

    #[serde(default)]
    pub sub_type: Option<String>,

    #[serde(default)]
    pub brand: Option<String>,

    /// Primary color
    #[serde(default)]
    pub color: Option<String>,

    #[serde(default)]
    pub style: Vec<String>,

    #[serde(default)]
    pub occasion: Vec<String>,

    #[serde(default)]
    pub mood: Vec<String>,

    #[serde(default)]
    pub season: Vec<String>,

    #[serde(default)]
    pub metadata: ItemMetadata,

    #[serde(default)]
    pub wear_count: u32,

    #[serde(default)]
    pub favorite: bool,

    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub last_worn: Option<DateTime<Utc>>,
}

impl ClothingItem {
    /// Create an item with the required identity fields; everything else defaults.
    pub fn new(id: &str, user_id: &str, name: &str, item_type: &str) -> Self {
        Self {
            id: id.trim().to_string(),
            user_id: user_id.trim().to_string(),
            name: name.trim().to_string(),
            item_type: item_type.trim().to_lowercase(),
            sub_type: None,
            brand: None,
            color: None,
            style: Vec::new(),
            occasion: Vec::new(),
            mood: Vec::new(),
            season: Vec::new(),
            metadata: ItemMetadata::default(),
            wear_count: 0,
            favorite: false,
            last_worn: None,
        }
    }

    pub fn with_sub_type(mut self, sub_type: &str) -> Self {
        self.sub_type = Some(sub_type.trim().to_lowercase());
        self
    }

    pub fn with_brand(mut self, brand: &str) -> Self {
        self.brand = Some(normalize_tag(brand));
        self
    }

    pub fn with_color(mut self, color: &str) -> Self {
        self.color = Some(normalize_tag(color));
        self
    }

    pub fn with_style(mut self, tags: &[&str]) -> Self {
        self.style = normalize_tags(tags);
        self
    }

    pub fn with_occasion(mut self, tags: &[&str]) -> Self {
        self.occasion = normalize_tags(tags);
        self
    }

    pub fn with_mood(mut self, tags: &[&str]) -> Self {
        self.mood = normalize_tags(tags);
        self
    }

    pub fn with_season(mut self, tags: &[&str]) -> Self {
        self.season = normalize_tags(tags);
        self
    }

    pub fn with_material(mut self, material: &str) -> Self {
        self.metadata.material = Some(normalize_tag(material));
        self
    }

    pub fn with_pattern(mut self, pattern: &str) -> Self {
        self.metadata.pattern = Some(normalize_tag(pattern));
        self
    }

    pub fn with_fit(mut self, fit: &str) -> Self {
        self.metadata.fit = Some(normalize_tag(fit));
        self
    }

    pub fn with_formality(mut self, formality: Formality) -> Self {
        self.metadata.formality = Some(formality);
        self
    }

    pub fn with_wear_layer(mut self, layer: WearLayer) -> Self {
        self.metadata.wear_layer = Some(layer);
        self
    }

    pub fn with_fabric_weight(mut self, weight: FabricWeight) -> Self {
        self.metadata.fabric_weight = Some(weight);
        self
    }

    pub fn with_favorite(mut self, favorite: bool) -> Self {
        self.favorite = favorite;
        self
    }

    pub fn with_wear_count(mut self, count: u32) -> Self {
        self.wear_count = count;
        self
    }

    pub fn with_last_worn(mut self, at: DateTime<Utc>) -> Self {
        self.last_worn = Some(at);
        self
    }

    /// Name if set, otherwise the type.
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.item_type
        } else {
            &self.name
        }
    }

    /// Lowercased name, type and sub-type joined for keyword matching.
    pub fn searchable_text(&self) -> String {
        let mut text = format!("{} {}", self.name, self.item_type);
        if let Some(sub) = &self.sub_type {
            text.push(' ');
            text.push_str(sub);
        }
        text.to_lowercase()
    }

    /// True if any tag in `tags` intersects `wanted`.
    pub fn tags_intersect<'a, I>(tags: &[String], wanted: I) -> bool
    where
        I: IntoIterator<Item = &'a str>,
    {
        wanted.into_iter().any(|w| tags.iter().any(|t| t == w))
    }

    /// Serialize to JSON bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Deserialize from JSON bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

/// Formality as stored by older records: either a label or a 1-5 level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FormalityValue {
    Level(u8),
    Label(String),
}

/// Loosely typed metadata as delivered by storage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordMetadata {
    #[serde(default)]
    pub material: Option<String>,
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub fit: Option<String>,
    #[serde(default, alias = "sleeveLength")]
    pub sleeve_length: Option<String>,
    #[serde(default)]
    pub formality: Option<FormalityValue>,
    #[serde(default, alias = "wearLayer")]
    pub wear_layer: Option<String>,
    #[serde(default, alias = "fabricWeight")]
    pub fabric_weight: Option<String>,
}

/// Raw wardrobe record; every field may be missing or null.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WardrobeRecord {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, alias = "userId")]
    pub user_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "type")]
    pub item_type: Option<String>,
    #[serde(default, alias = "subType")]
    pub sub_type: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub style: Option<Vec<String>>,
    #[serde(default)]
    pub occasion: Option<Vec<String>>,
    #[serde(default)]
    pub mood: Option<Vec<String>>,
    #[serde(default)]
    pub season: Option<Vec<String>>,
    #[serde(default)]
    pub metadata: Option<RecordMetadata>,
    #[serde(default, alias = "wearCount")]
    pub wear_count: Option<u32>,
    #[serde(default, alias = "isFavorite")]
    pub favorite: Option<bool>,
    #[serde(default, alias = "lastWorn")]
    pub last_worn: Option<DateTime<Utc>>,
}

impl WardrobeRecord {
    /// Parse a JSON array of records.
    pub fn parse_many(json: &str) -> Result<Vec<WardrobeRecord>, TypesError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// The stored form of an item, as a source would hand it back.
impl From<&ClothingItem> for WardrobeRecord {
    fn from(item: &ClothingItem) -> Self {
        let optional = |s: &str| (!s.is_empty()).then(|| s.to_string());
        let meta = &item.metadata;
        WardrobeRecord {
            id: optional(&item.id),
            user_id: optional(&item.user_id),
            name: optional(&item.name),
            item_type: optional(&item.item_type),
            sub_type: item.sub_type.clone(),
            brand: item.brand.clone(),
            color: item.color.clone(),
            style: Some(item.style.clone()),
            occasion: Some(item.occasion.clone()),
            mood: Some(item.mood.clone()),
            season: Some(item.season.clone()),
            metadata: Some(RecordMetadata {
                material: meta.material.clone(),
                pattern: meta.pattern.clone(),
                fit: meta.fit.clone(),
                sleeve_length: meta.sleeve_length.clone(),
                formality: meta.formality.map(|f| FormalityValue::Level(f.level())),
                wear_layer: meta.wear_layer.map(|l| l.as_str().to_string()),
                fabric_weight: meta.fabric_weight.map(|w| w.as_str().to_string()),
            }),
            wear_count: Some(item.wear_count),
            favorite: Some(item.favorite),
            last_worn: item.last_worn,
        }
    }
}

/// A record rejected at ingestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DroppedRecord {
    pub id: Option<String>,
    pub reason: String,
}

/// Summary of one ingestion pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IngestReport {
    /// Records converted to items
    pub accepted: usize,
    /// Records rejected, with reasons
    pub dropped: Vec<DroppedRecord>,
    /// Number of optional fields that were missing or unparseable and defaulted
    pub defaulted_fields: usize,
}

/// Convert raw records into well-formed items owned by `user_id`.
///
/// Records without an owner are attributed to `user_id`; records owned by
/// someone else are dropped. Missing tags become empty vectors and
/// unparseable enum labels become `None`.
pub fn ingest_wardrobe(
    user_id: &str,
    records: Vec<WardrobeRecord>,
) -> (Vec<ClothingItem>, IngestReport) {
    let mut report = IngestReport::default();
    let mut items = Vec::with_capacity(records.len());

    for record in records {
        if let Some(owner) = record.user_id.as_deref().map(str::trim) {
            if !owner.is_empty() && owner != user_id {
                warn!(
                    item_id = ?record.id,
                    owner = owner,
                    "Dropping wardrobe record owned by another user"
                );
                report.dropped.push(DroppedRecord {
                    id: record.id.clone(),
                    reason: format!("owned by {owner}"),
                });
                continue;
            }
        }

        let (item, defaulted) = convert_record(user_id, record);
        report.defaulted_fields += defaulted;
        items.push(item);
    }

    report.accepted = items.len();
    debug!(
        accepted = report.accepted,
        dropped = report.dropped.len(),
        defaulted = report.defaulted_fields,
        "Wardrobe ingestion complete"
    );
    (items, report)
}

fn convert_record(user_id: &str, record: WardrobeRecord) -> (ClothingItem, usize) {
    let mut defaulted = 0usize;
    let mut take_tags = |tags: Option<Vec<String>>| match tags {
        Some(tags) => normalize_tags(tags),
        None => {
            defaulted += 1;
            Vec::new()
        }
    };

    let style = take_tags(record.style);
    let occasion = take_tags(record.occasion);
    let mood = take_tags(record.mood);
    let season = take_tags(record.season);

    let raw_meta = record.metadata.unwrap_or_default();
    let formality = match raw_meta.formality {
        Some(FormalityValue::Level(level)) => Some(Formality::from_level(level)),
        Some(FormalityValue::Label(label)) => Formality::parse(&label),
        None => None,
    };
    let wear_layer = raw_meta.wear_layer.as_deref().and_then(WearLayer::parse);
    let fabric_weight = raw_meta.fabric_weight.as_deref().and_then(FabricWeight::parse);
    defaulted += [formality.is_none(), wear_layer.is_none(), fabric_weight.is_none()]
        .iter()
        .filter(|missing| **missing)
        .count();

    let clean = |value: Option<String>| {
        value
            .map(|v| normalize_tag(&v))
            .filter(|v| !v.is_empty())
    };

    let item = ClothingItem {
        id: record.id.unwrap_or_default().trim().to_string(),
        user_id: user_id.to_string(),
        name: record.name.unwrap_or_default().trim().to_string(),
        item_type: record.item_type.unwrap_or_default().trim().to_lowercase(),
        sub_type: record.sub_type.map(|s| s.trim().to_lowercase()),
        brand: clean(record.brand),
        color: clean(record.color),
        style,
        occasion,
        mood,
        season,
        metadata: ItemMetadata {
            material: clean(raw_meta.material),
            pattern: clean(raw_meta.pattern),
            fit: clean(raw_meta.fit),
            sleeve_length: clean(raw_meta.sleeve_length),
            formality,
            wear_layer,
            fabric_weight,
        },
        wear_count: record.wear_count.unwrap_or(0),
        favorite: record.favorite.unwrap_or(false),
        last_worn: record.last_worn,
    };

    (item, defaulted)
}
