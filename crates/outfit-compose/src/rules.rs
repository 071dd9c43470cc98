//! Shared item predicates.
//!
//! The filter, validator and healing strategies must agree on what "heavy",
//! "warm-weather only" or "contradicts the occasion" mean, so those
//! judgements live here and nowhere else.

use std::collections::BTreeSet;

use outfit_types::{ClothingItem, FabricWeight, Formality};
use serde::{Deserialize, Serialize};

use crate::classifier::{has_phrase, tokenize, ItemProfile};
use crate::tables::CompatibilityTables;
use crate::types::{Category, OccasionClass};

const HEAVY_MATERIALS: &[&str] = &[
    "wool", "cashmere", "fleece", "down", "fur", "faux fur", "shearling", "tweed", "flannel",
    "corduroy", "sherpa", "mohair",
];

const HEAVY_TYPES: &[&str] = &[
    "parka", "puffer", "overcoat", "winter coat", "peacoat", "snow boots", "down jacket",
];

const WARM_WEATHER_TYPES: &[&str] = &[
    "shorts", "sandal", "sandals", "flip flops", "slides", "tank", "cami", "camisole",
    "sundress", "espadrille", "espadrilles",
];

const ATHLETIC_FOOTWEAR: &[&str] = &[
    "sneaker", "sneakers", "trainer", "trainers", "running", "flip flops", "slides", "cleats",
];

const OPEN_FOOTWEAR: &[&str] = &["sandal", "sandals", "flip flops", "slides", "espadrille", "espadrilles"];

const WATER_SENSITIVE: &[&str] = &["suede", "silk", "velvet", "satin", "nubuck"];

/// A name phrase that rules an item out, for one category or any.
type NameRule = (&'static str, Option<Category>);

/// Item names that cannot be worn to an athletic occasion whatever their tags say.
const NOT_ATHLETIC: &[NameRule] = &[
    ("dress shoes", Some(Category::Shoes)),
    ("dress shoe", Some(Category::Shoes)),
    ("heels", Some(Category::Shoes)),
    ("heel", Some(Category::Shoes)),
    ("stiletto", Some(Category::Shoes)),
    ("stilettos", Some(Category::Shoes)),
    ("pumps", Some(Category::Shoes)),
    ("loafers", Some(Category::Shoes)),
    ("loafer", Some(Category::Shoes)),
    ("oxfords", Some(Category::Shoes)),
    ("derby", Some(Category::Shoes)),
    ("brogue", Some(Category::Shoes)),
    ("brogues", Some(Category::Shoes)),
    ("blazer", Some(Category::Outerwear)),
    ("dress shirt", Some(Category::Top)),
    ("dress pants", Some(Category::Bottom)),
    ("gown", Some(Category::Dress)),
    ("tie", Some(Category::Accessory)),
    ("necktie", Some(Category::Accessory)),
    ("suit", Some(Category::Other)),
    ("tuxedo", None),
];

/// Item names that cannot be worn to a formal occasion whatever their tags say.
const NOT_FORMAL: &[NameRule] = &[
    ("running", None),
    ("gym", None),
    ("yoga", None),
    ("track", None),
    ("sweatpants", Some(Category::Bottom)),
    ("joggers", Some(Category::Bottom)),
    ("hoodie", Some(Category::Top)),
    ("sweatshirt", Some(Category::Top)),
    ("flip flops", Some(Category::Shoes)),
    ("slides", Some(Category::Shoes)),
    ("sneakers", Some(Category::Shoes)),
    ("sneaker", Some(Category::Shoes)),
    ("trainers", Some(Category::Shoes)),
    ("trainer", Some(Category::Shoes)),
];

const SEASONLESS: &[&str] = &["all", "all season", "all seasons", "year round"];

fn text_has_any(item: &ClothingItem, phrases: &[&str]) -> bool {
    let tokens = tokenize(&item.searchable_text());
    phrases.iter().any(|p| has_phrase(&tokens, p))
}

fn season_only(item: &ClothingItem, season: &str, others: &[&str]) -> bool {
    let tags = &item.season;
    tags.iter().any(|t| t == season)
        && !tags
            .iter()
            .any(|t| others.contains(&t.as_str()) || SEASONLESS.contains(&t.as_str()))
}

/// Heavy fabric, heavy material or an intrinsically heavy garment.
pub fn is_heavy(item: &ClothingItem) -> bool {
    match item.metadata.fabric_weight {
        Some(FabricWeight::Heavy) => return true,
        Some(FabricWeight::Light) => return text_has_any(item, HEAVY_TYPES),
        _ => {}
    }
    let material_heavy = item.metadata.material.as_deref().is_some_and(|m| {
        let tokens = tokenize(m);
        HEAVY_MATERIALS.iter().any(|h| has_phrase(&tokens, h))
    });
    material_heavy || text_has_any(item, HEAVY_TYPES)
}

/// Garments that only make sense in warm weather.
pub fn is_warm_weather_only(item: &ClothingItem) -> bool {
    text_has_any(item, WARM_WEATHER_TYPES)
}

pub fn is_winter_only(item: &ClothingItem) -> bool {
    season_only(item, "winter", &["spring", "summer", "fall", "autumn"])
}

pub fn is_summer_only(item: &ClothingItem) -> bool {
    season_only(item, "summer", &["spring", "winter", "fall", "autumn"])
}

pub fn is_athletic_footwear(item: &ClothingItem) -> bool {
    text_has_any(item, ATHLETIC_FOOTWEAR)
}

pub fn is_open_footwear(item: &ClothingItem) -> bool {
    text_has_any(item, OPEN_FOOTWEAR)
}

/// Material that suffers in rain or snow.
pub fn is_water_sensitive(item: &ClothingItem) -> bool {
    item.metadata
        .material
        .as_deref()
        .is_some_and(|m| WATER_SENSITIVE.iter().any(|w| has_phrase(&tokenize(m), w)))
}

fn name_rule_hits(item: &ClothingItem, category: Category, rules: &[NameRule]) -> bool {
    let tokens = tokenize(&item.searchable_text());
    rules.iter().any(|(phrase, only)| {
        only.map_or(true, |c| c == category) && has_phrase(&tokens, phrase)
    })
}

/// The item's own name or type rules it out for this occasion class.
///
/// A phrase counts only for the category it names, so "tie" rules out a
/// tie but not a tie-dye tee. Items that read as athletic wear are never
/// ruled out of an athletic occasion by name.
pub fn name_contradicts(class: OccasionClass, item: &ClothingItem, profile: &ItemProfile) -> bool {
    match class {
        OccasionClass::Athletic => {
            profile.formality != Formality::Athletic
                && name_rule_hits(item, profile.category, NOT_ATHLETIC)
        }
        OccasionClass::Formal => name_rule_hits(item, profile.category, NOT_FORMAL),
        _ => false,
    }
}

/// Fits discouraged for a body type.
pub fn discouraged_fits(body_type: &str) -> &'static [&'static str] {
    match body_type {
        "apple" => &["crop", "cropped", "bodycon"],
        "pear" | "triangle" => &["skinny"],
        "petite" => &["oversized", "maxi"],
        "hourglass" => &["boxy", "oversized"],
        "rectangle" => &["boxy"],
        _ => &[],
    }
}

/// True if the item's fit is discouraged for the body type.
pub fn fit_discouraged(body_type: Option<&str>, item: &ClothingItem) -> bool {
    let (Some(body_type), Some(fit)) = (body_type, item.metadata.fit.as_deref()) else {
        return false;
    };
    let tokens = tokenize(fit);
    discouraged_fits(body_type)
        .iter()
        .any(|f| has_phrase(&tokens, f))
}

/// How an item relates to the requested occasion, strongest signal first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OccasionVerdict {
    /// Occasion tag equals the requested occasion
    Match,
    /// Occasion tag is in the fallback set
    FallbackMatch,
    /// Brand is typical for the occasion
    Brand,
    /// Category or plain garment suits any occasion
    Agnostic,
    /// No occasion tags and nothing contradicts
    Untagged,
    /// Item name rules it out
    Contradiction,
    /// Tagged for other occasions only
    Mismatch,
}

impl OccasionVerdict {
    pub fn passes(&self) -> bool {
        !matches!(self, OccasionVerdict::Contradiction | OccasionVerdict::Mismatch)
    }

    /// Score contribution in [0, 1].
    pub fn score(&self) -> f32 {
        match self {
            OccasionVerdict::Match => 1.0,
            OccasionVerdict::FallbackMatch => 0.8,
            OccasionVerdict::Brand => 0.7,
            OccasionVerdict::Agnostic => 0.5,
            OccasionVerdict::Untagged => 0.4,
            OccasionVerdict::Mismatch => 0.1,
            OccasionVerdict::Contradiction => 0.0,
        }
    }
}

const AGNOSTIC_TOPS: &[&str] = &["shirt", "blouse", "top", "tee", "t shirt", "tshirt"];

/// Everything the occasion judgement needs from the request.
#[derive(Debug, Clone, Copy)]
pub struct OccasionQuery<'a> {
    pub occasion: &'a str,
    pub fallbacks: &'a BTreeSet<String>,
    pub class: OccasionClass,
}

/// Judge an item against the requested occasion.
///
/// Order: tag match, name contradiction, category agnosticism, brand hint,
/// tag mismatch. Names decide only when they contradict outright; an
/// untagged item is rejected only when its explicit formality is out of
/// range for the occasion.
pub fn occasion_verdict(
    item: &ClothingItem,
    profile: &ItemProfile,
    query: &OccasionQuery<'_>,
    tables: &CompatibilityTables,
) -> OccasionVerdict {
    if query.occasion.is_empty() {
        return OccasionVerdict::Agnostic;
    }
    if item.occasion.iter().any(|t| t == query.occasion) {
        return OccasionVerdict::Match;
    }
    if item.occasion.iter().any(|t| query.fallbacks.contains(t)) {
        return OccasionVerdict::FallbackMatch;
    }
    if name_contradicts(query.class, item, profile) {
        return OccasionVerdict::Contradiction;
    }

    let plain_top = profile.category == Category::Top
        && AGNOSTIC_TOPS.contains(&tokenize(&item.item_type).join(" ").as_str());
    let athletic_in_formal =
        query.class == OccasionClass::Formal && profile.formality == Formality::Athletic;
    if !athletic_in_formal
        && (matches!(profile.category, Category::Accessory | Category::Other) || plain_top)
    {
        return OccasionVerdict::Agnostic;
    }

    if let Some(brand) = item.brand.as_deref() {
        let typical = tables.brand_occasions(brand);
        if typical.contains(query.occasion) || typical.iter().any(|o| query.fallbacks.contains(o)) {
            return OccasionVerdict::Brand;
        }
    }

    if !item.occasion.is_empty() {
        return OccasionVerdict::Mismatch;
    }

    match item.metadata.formality {
        Some(explicit) if !query.class.accepts_formality(explicit) => OccasionVerdict::Mismatch,
        _ => OccasionVerdict::Untagged,
    }
}
