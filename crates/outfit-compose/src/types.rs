//! Core composition types.
//!
//! - `Category`: functional wardrobe slot assigned by the classifier
//! - `OccasionClass`: coarse occasion family driving target counts and rules
//! - `LayeringRule`: temperature-banded layering requirement
//! - `TargetCounts`: required / preferred / optional category counts

use std::collections::BTreeMap;
use std::fmt;

use outfit_types::Formality;
use serde::{Deserialize, Serialize};

use crate::classifier::{has_phrase, tokenize};

/// Functional wardrobe slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Top,
    Bottom,
    /// One-piece garment; subsumes top and bottom
    Dress,
    Shoes,
    Outerwear,
    Accessory,
    /// Unknown type; participates in no hard invariant
    Other,
}

impl Category {
    /// All categories, in selection order.
    pub const ALL: [Category; 7] = [
        Category::Dress,
        Category::Top,
        Category::Bottom,
        Category::Shoes,
        Category::Outerwear,
        Category::Accessory,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Top => "top",
            Category::Bottom => "bottom",
            Category::Dress => "dress",
            Category::Shoes => "shoes",
            Category::Outerwear => "outerwear",
            Category::Accessory => "accessory",
            Category::Other => "other",
        }
    }

    /// Categories the invariant gate never blocks.
    pub fn is_gate_exempt(&self) -> bool {
        matches!(
            self,
            Category::Outerwear | Category::Accessory | Category::Other
        )
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Coarse occasion family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OccasionClass {
    Athletic,
    Loungewear,
    Formal,
    Business,
    Casual,
    /// Empty or unrecognized occasion
    #[default]
    Generic,
}

const ATHLETIC_WORDS: &[&str] = &[
    "athletic", "gym", "workout", "sport", "sports", "running", "yoga", "hiking",
    "hike", "training", "exercise", "fitness", "tennis", "cycling", "pilates",
];
const LOUNGE_WORDS: &[&str] = &[
    "lounge", "loungewear", "home", "sleep", "relaxing", "pajama", "stay in",
];
const FORMAL_WORDS: &[&str] = &[
    "formal", "black tie", "gala", "wedding", "cocktail", "prom", "ceremony", "opera",
    "funeral",
];
const BUSINESS_WORDS: &[&str] = &[
    "business", "work", "office", "interview", "meeting", "conference", "professional",
];
const CASUAL_WORDS: &[&str] = &[
    "casual", "party", "date", "brunch", "dinner", "weekend", "travel", "shopping",
    "school", "outdoor", "beach", "concert", "everyday", "errands", "night out", "vacation",
];

impl OccasionClass {
    /// Derive the class from a free-form occasion.
    ///
    /// Families are checked athletic, lounge, formal, business, casual, so
    /// "business formal" is Formal and "business casual" is Business.
    pub fn from_occasion(occasion: &str) -> Self {
        let tokens = tokenize(occasion);
        if tokens.is_empty() {
            return OccasionClass::Generic;
        }
        let any = |words: &[&str]| words.iter().any(|w| has_phrase(&tokens, w));

        if any(ATHLETIC_WORDS) {
            OccasionClass::Athletic
        } else if any(LOUNGE_WORDS) {
            OccasionClass::Loungewear
        } else if any(FORMAL_WORDS) {
            OccasionClass::Formal
        } else if any(BUSINESS_WORDS) {
            OccasionClass::Business
        } else if any(CASUAL_WORDS) {
            OccasionClass::Casual
        } else {
            OccasionClass::Generic
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OccasionClass::Athletic => "athletic",
            OccasionClass::Loungewear => "loungewear",
            OccasionClass::Formal => "formal",
            OccasionClass::Business => "business",
            OccasionClass::Casual => "casual",
            OccasionClass::Generic => "generic",
        }
    }

    /// Whether a dress can structurally replace top + bottom.
    pub fn allows_dress(&self) -> bool {
        !matches!(self, OccasionClass::Athletic | OccasionClass::Loungewear)
    }

    /// Inclusive formality range considered appropriate.
    pub fn formality_range(&self) -> (Formality, Formality) {
        match self {
            OccasionClass::Athletic | OccasionClass::Loungewear => {
                (Formality::Athletic, Formality::Casual)
            }
            OccasionClass::Formal => (Formality::Business, Formality::Formal),
            OccasionClass::Business => (Formality::SmartCasual, Formality::Formal),
            OccasionClass::Casual => (Formality::Athletic, Formality::Business),
            OccasionClass::Generic => (Formality::Athletic, Formality::Formal),
        }
    }

    pub fn accepts_formality(&self, formality: Formality) -> bool {
        let (lo, hi) = self.formality_range();
        formality >= lo && formality <= hi
    }
}

/// Temperature-banded layering requirement.
///
/// Step function over Fahrenheit:
/// - `>= 80`: Minimal
/// - `65..80`: Light
/// - `50..65`: Layered (outerwear preferred)
/// - `32..50`: Warm (outerwear required, mid layer preferred)
/// - `< 32`: Heavy (outerwear required, mid layer preferred, heavy outerwear advised)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LayeringRule {
    Minimal,
    /// Also used when temperature is unknown
    #[default]
    Light,
    Layered,
    Warm,
    Heavy,
}

impl LayeringRule {
    pub fn for_temperature(temperature_f: Option<f64>) -> Self {
        match temperature_f {
            None => LayeringRule::Light,
            Some(t) if t >= 80.0 => LayeringRule::Minimal,
            Some(t) if t >= 65.0 => LayeringRule::Light,
            Some(t) if t >= 50.0 => LayeringRule::Layered,
            Some(t) if t >= 32.0 => LayeringRule::Warm,
            Some(_) => LayeringRule::Heavy,
        }
    }

    pub fn requires_outerwear(&self) -> bool {
        matches!(self, LayeringRule::Warm | LayeringRule::Heavy)
    }

    pub fn prefers_outerwear(&self) -> bool {
        matches!(self, LayeringRule::Layered)
    }

    pub fn prefers_mid_layer(&self) -> bool {
        matches!(self, LayeringRule::Warm | LayeringRule::Heavy)
    }

    /// Number of layers (base + mid + outer) this rule aims for.
    pub fn layer_count(&self) -> usize {
        match self {
            LayeringRule::Minimal | LayeringRule::Light => 1,
            LayeringRule::Layered => 2,
            LayeringRule::Warm | LayeringRule::Heavy => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LayeringRule::Minimal => "minimal",
            LayeringRule::Light => "light",
            LayeringRule::Layered => "layered",
            LayeringRule::Warm => "warm",
            LayeringRule::Heavy => "heavy",
        }
    }
}

/// Category counts for one outfit shape.
///
/// Counts are totals: `preferred[Top] = 2` means aim for two tops overall.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TargetCounts {
    /// Piece selected before anything else (the dress, in dress mode)
    pub anchor: Option<Category>,
    pub required: BTreeMap<Category, usize>,
    pub preferred: BTreeMap<Category, usize>,
    pub optional: BTreeMap<Category, usize>,
}

impl TargetCounts {
    pub fn require(mut self, category: Category, count: usize) -> Self {
        self.optional.remove(&category);
        self.required.insert(category, count);
        self
    }

    pub fn prefer(mut self, category: Category, count: usize) -> Self {
        self.optional.remove(&category);
        self.preferred.insert(category, count);
        self
    }

    pub fn allow(mut self, category: Category, count: usize) -> Self {
        if !self.required.contains_key(&category) && !self.preferred.contains_key(&category) {
            self.optional.insert(category, count);
        }
        self
    }

    pub fn with_anchor(mut self, category: Category) -> Self {
        self.anchor = Some(category);
        self
    }

    pub fn is_required(&self, category: Category) -> bool {
        self.required.get(&category).copied().unwrap_or(0) > 0
    }

    pub fn required_count(&self, category: Category) -> usize {
        self.required.get(&category).copied().unwrap_or(0)
    }

    /// Count the selector aims for before optional extras.
    pub fn desired_count(&self, category: Category) -> usize {
        let required = self.required_count(category);
        let preferred = self.preferred.get(&category).copied().unwrap_or(0);
        required.max(preferred)
    }

    pub fn optional_count(&self, category: Category) -> usize {
        self.optional.get(&category).copied().unwrap_or(0)
    }

    pub fn required_categories(&self) -> impl Iterator<Item = Category> + '_ {
        self.required
            .iter()
            .filter(|(_, count)| **count > 0)
            .map(|(category, _)| *category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_occasion_class_from_occasion() {
        assert_eq!(OccasionClass::from_occasion("Business Formal"), OccasionClass::Formal);
        assert_eq!(OccasionClass::from_occasion("business casual"), OccasionClass::Business);
        assert_eq!(OccasionClass::from_occasion("Athletic"), OccasionClass::Athletic);
        assert_eq!(OccasionClass::from_occasion("gym session"), OccasionClass::Athletic);
        assert_eq!(OccasionClass::from_occasion("loungewear"), OccasionClass::Loungewear);
        assert_eq!(OccasionClass::from_occasion("first date"), OccasionClass::Casual);
        assert_eq!(OccasionClass::from_occasion(""), OccasionClass::Generic);
        assert_eq!(OccasionClass::from_occasion("zorbing"), OccasionClass::Generic);
    }

    #[test]
    fn test_occasion_class_does_not_match_substrings() {
        // "network" contains "work" but is not a business occasion
        assert_eq!(OccasionClass::from_occasion("network"), OccasionClass::Generic);
    }

    #[test]
    fn test_dress_eligibility() {
        assert!(OccasionClass::Formal.allows_dress());
        assert!(OccasionClass::Generic.allows_dress());
        assert!(!OccasionClass::Athletic.allows_dress());
        assert!(!OccasionClass::Loungewear.allows_dress());
    }

    #[test]
    fn test_formality_range() {
        assert!(OccasionClass::Formal.accepts_formality(Formality::Business));
        assert!(!OccasionClass::Formal.accepts_formality(Formality::Casual));
        assert!(OccasionClass::Generic.accepts_formality(Formality::Athletic));
    }

    #[test]
    fn test_layering_rule_steps() {
        assert_eq!(LayeringRule::for_temperature(None), LayeringRule::Light);
        assert_eq!(LayeringRule::for_temperature(Some(85.0)), LayeringRule::Minimal);
        assert_eq!(LayeringRule::for_temperature(Some(80.0)), LayeringRule::Minimal);
        assert_eq!(LayeringRule::for_temperature(Some(70.0)), LayeringRule::Light);
        assert_eq!(LayeringRule::for_temperature(Some(55.0)), LayeringRule::Layered);
        assert_eq!(LayeringRule::for_temperature(Some(40.0)), LayeringRule::Warm);
        assert_eq!(LayeringRule::for_temperature(Some(10.0)), LayeringRule::Heavy);
        assert!(LayeringRule::Warm.requires_outerwear());
        assert!(!LayeringRule::Layered.requires_outerwear());
        assert!(LayeringRule::Layered.prefers_outerwear());
    }

    #[test]
    fn test_target_counts_precedence() {
        let counts = TargetCounts::default()
            .allow(Category::Outerwear, 1)
            .require(Category::Outerwear, 1)
            .allow(Category::Outerwear, 1);
        assert!(counts.is_required(Category::Outerwear));
        assert_eq!(counts.optional_count(Category::Outerwear), 0);

        let counts = TargetCounts::default()
            .require(Category::Top, 1)
            .prefer(Category::Top, 2);
        assert_eq!(counts.desired_count(Category::Top), 2);
        assert_eq!(counts.required_count(Category::Top), 1);
    }
}
