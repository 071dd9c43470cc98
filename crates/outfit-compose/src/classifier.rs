//! Item classification.
//!
//! `ItemClassifier` maps an item's free-form type to a `Category` and derives
//! the predicates the invariant gate and validators rely on (is-shirt,
//! is-dress, formality, wear layer).
//!
//! Classification looks at the head noun of the type: tokens are scanned
//! right to left and the first one (or two-word phrase) found in the keyword
//! tables decides. "dress shirt" is a top, "shirt dress" is a dress and
//! "dress shoes" are shoes. When the type carries no known noun the sub-type
//! and then the name are tried; anything still unknown is `Other`.

use std::collections::{HashMap, HashSet};

use outfit_types::{ClothingItem, Formality, WearLayer};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::types::Category;

/// Split text into lowercase alphanumeric tokens.
pub(crate) fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// True if `phrase` (space separated) occurs as a contiguous token run.
pub(crate) fn has_phrase(tokens: &[String], phrase: &str) -> bool {
    let words: Vec<&str> = phrase.split_whitespace().collect();
    if words.is_empty() || words.len() > tokens.len() {
        return false;
    }
    tokens
        .windows(words.len())
        .any(|window| window.iter().zip(&words).all(|(t, w)| t == w))
}

/// Derived facts about one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemProfile {
    pub category: Category,
    pub is_shirt: bool,
    pub is_dress: bool,
    pub formality: Formality,
    pub layer: Option<WearLayer>,
}

/// Keyword tables for classification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    pub top_keywords: Vec<String>,
    pub bottom_keywords: Vec<String>,
    pub dress_keywords: Vec<String>,
    pub shoes_keywords: Vec<String>,
    pub outerwear_keywords: Vec<String>,
    pub accessory_keywords: Vec<String>,

    /// Top nouns that count as a shirt for the one-shirt rule
    pub shirt_keywords: Vec<String>,

    /// Top nouns worn over a base layer
    pub mid_layer_keywords: Vec<String>,

    /// Phrases implying each formality level, checked formal first
    pub formal_phrases: Vec<String>,
    pub business_phrases: Vec<String>,
    /// Words that make an item business wear only as its final type word
    #[serde(default)]
    pub business_heads: Vec<String>,
    pub athletic_phrases: Vec<String>,
    pub casual_phrases: Vec<String>,
}

fn strings(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| w.to_string()).collect()
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            top_keywords: strings(&[
                "shirt", "tshirt", "t shirt", "tee", "blouse", "top", "tank", "cami",
                "camisole", "sweater", "hoodie", "sweatshirt", "polo", "tunic", "jersey",
                "turtleneck", "pullover", "henley", "bodysuit", "vest", "button down",
                "jumper",
            ]),
            bottom_keywords: strings(&[
                "pants", "jeans", "trousers", "shorts", "skirt", "leggings", "chinos",
                "joggers", "slacks", "sweatpants", "culottes", "capris", "trackpants",
                "bottoms", "khakis", "skort",
            ]),
            dress_keywords: strings(&[
                "dress", "gown", "jumpsuit", "romper", "sundress", "playsuit",
            ]),
            shoes_keywords: strings(&[
                "shoe", "shoes", "sneaker", "boot", "sandal", "loafer", "heel", "heels",
                "oxford", "oxfords", "flat", "flats", "trainer", "pump", "pumps",
                "slipper", "mule", "clog", "espadrille", "moccasin", "derby", "brogue",
                "stiletto", "flip flops", "slides", "wedges", "cleats",
            ]),
            outerwear_keywords: strings(&[
                "jacket", "coat", "blazer", "parka", "windbreaker", "trench", "puffer",
                "raincoat", "overcoat", "anorak", "poncho", "cardigan", "shacket",
                "gilet", "peacoat", "cape", "fleece",
            ]),
            accessory_keywords: strings(&[
                "hat", "cap", "beanie", "scarf", "belt", "bag", "handbag", "purse",
                "backpack", "watch", "necklace", "earrings", "earring", "bracelet",
                "ring", "sunglasses", "tie", "bowtie", "bow tie", "gloves", "jewelry",
                "clutch", "tote", "headband", "brooch", "socks",
            ]),
            shirt_keywords: strings(&[
                "shirt", "tshirt", "t shirt", "tee", "blouse", "top", "tank", "cami",
                "camisole", "polo", "tunic", "jersey", "henley", "bodysuit",
                "button down", "turtleneck",
            ]),
            mid_layer_keywords: strings(&[
                "sweater", "hoodie", "sweatshirt", "pullover", "vest", "jumper",
            ]),
            formal_phrases: strings(&[
                "tuxedo", "gown", "evening", "black tie", "stiletto", "bow tie", "bowtie",
                "cufflinks", "ball",
            ]),
            business_phrases: strings(&[
                "blazer", "suit", "dress shirt", "dress pants", "dress shoes", "dress shoe",
                "trousers", "slacks", "oxford", "oxfords", "loafer", "loafers", "pump",
                "pumps", "pencil skirt", "necktie", "derby", "brogue", "brogues", "overcoat",
            ]),
            business_heads: strings(&["tie", "suit"]),
            athletic_phrases: strings(&[
                "running", "gym", "athletic", "sport", "sports", "yoga", "training",
                "sweatpants", "joggers", "leggings", "trainer", "trainers", "track",
                "moisture wicking", "compression", "cleats", "workout", "tracksuit",
            ]),
            casual_phrases: strings(&[
                "sneaker", "sneakers", "jeans", "tshirt", "t shirt", "tee", "hoodie",
                "sweatshirt", "shorts", "sandal", "sandals", "flip flops", "denim",
                "slides", "beanie", "cap",
            ]),
        }
    }
}

/// Item classifier using head-noun keyword heuristics.
pub struct ItemClassifier {
    config: ClassifierConfig,
    lookup: HashMap<String, Category>,
    shirt_set: HashSet<String>,
    mid_set: HashSet<String>,
}

impl ItemClassifier {
    /// Create a new classifier with default configuration.
    pub fn new() -> Self {
        Self::with_config(ClassifierConfig::default())
    }

    /// Create a classifier with custom configuration.
    pub fn with_config(config: ClassifierConfig) -> Self {
        let mut lookup = HashMap::new();
        let tables = [
            (&config.accessory_keywords, Category::Accessory),
            (&config.outerwear_keywords, Category::Outerwear),
            (&config.shoes_keywords, Category::Shoes),
            (&config.bottom_keywords, Category::Bottom),
            (&config.top_keywords, Category::Top),
            (&config.dress_keywords, Category::Dress),
        ];
        // Later tables win on overlap
        for (words, category) in tables {
            for word in words {
                lookup.insert(tokenize(word).join(" "), category);
            }
        }

        let normalize = |words: &[String]| -> HashSet<String> {
            words.iter().map(|w| tokenize(w).join(" ")).collect()
        };
        let shirt_set = normalize(&config.shirt_keywords);
        let mid_set = normalize(&config.mid_layer_keywords);

        Self {
            config,
            lookup,
            shirt_set,
            mid_set,
        }
    }

    /// Classify an item into a category.
    pub fn classify(&self, item: &ClothingItem) -> Category {
        self.head(item).map(|(c, _)| c).unwrap_or(Category::Other)
    }

    /// Classify a bare type string.
    pub fn classify_type(&self, raw_type: &str) -> Category {
        self.head_noun(&tokenize(raw_type))
            .map(|(c, _)| c)
            .unwrap_or(Category::Other)
    }

    /// Whether the item is a shirt-like base top.
    pub fn is_shirt(&self, item: &ClothingItem) -> bool {
        match self.head(item) {
            Some((Category::Top, noun)) => self.shirt_set.contains(&noun),
            _ => false,
        }
    }

    pub fn is_dress(&self, item: &ClothingItem) -> bool {
        self.classify(item) == Category::Dress
    }

    /// Formality: explicit metadata wins, otherwise keyword-derived.
    pub fn formality_level(&self, item: &ClothingItem) -> Formality {
        if let Some(formality) = item.metadata.formality {
            return formality;
        }

        let tokens = tokenize(&item.searchable_text());
        let hit = |phrases: &[String]| phrases.iter().any(|p| has_phrase(&tokens, p));

        if hit(&self.config.formal_phrases) {
            Formality::Formal
        } else if hit(&self.config.athletic_phrases) {
            Formality::Athletic
        } else if hit(&self.config.business_phrases)
            || final_word_in(item, &self.config.business_heads)
        {
            Formality::Business
        } else if hit(&self.config.casual_phrases) {
            Formality::Casual
        } else {
            Formality::SmartCasual
        }
    }

    /// Wear layer: explicit metadata wins, otherwise derived from the head noun.
    pub fn wear_layer(&self, item: &ClothingItem) -> Option<WearLayer> {
        if let Some(layer) = item.metadata.wear_layer {
            return Some(layer);
        }
        match self.head(item) {
            Some((Category::Outerwear, _)) => Some(WearLayer::Outer),
            Some((Category::Top, noun)) if self.mid_set.contains(&noun) => Some(WearLayer::Mid),
            Some((Category::Top | Category::Bottom | Category::Dress, _)) => Some(WearLayer::Base),
            _ => None,
        }
    }

    /// All derived facts in one pass.
    pub fn describe(&self, item: &ClothingItem) -> ItemProfile {
        let head = self.head(item);
        let category = head.as_ref().map(|(c, _)| *c).unwrap_or(Category::Other);
        let is_shirt = matches!(&head, Some((Category::Top, noun)) if self.shirt_set.contains(noun));
        ItemProfile {
            category,
            is_shirt,
            is_dress: category == Category::Dress,
            formality: self.formality_level(item),
            layer: self.wear_layer(item),
        }
    }

    fn head(&self, item: &ClothingItem) -> Option<(Category, String)> {
        let sources = [
            Some(item.item_type.as_str()),
            item.sub_type.as_deref(),
            Some(item.name.as_str()),
        ];
        let found = sources
            .into_iter()
            .flatten()
            .find_map(|text| self.head_noun(&tokenize(text)));

        if found.is_none() {
            trace!(item_id = %item.id, item_type = %item.item_type, "Unclassified item type");
        }
        found
    }

    fn head_noun(&self, tokens: &[String]) -> Option<(Category, String)> {
        for i in (0..tokens.len()).rev() {
            if i > 0 {
                let bigram = format!("{} {}", tokens[i - 1], tokens[i]);
                if let Some(category) = self.lookup.get(&bigram) {
                    return Some((*category, bigram));
                }
            }
            for candidate in singular_forms(&tokens[i]) {
                if let Some(category) = self.lookup.get(&candidate) {
                    return Some((*category, candidate));
                }
            }
        }
        None
    }
}

impl Default for ItemClassifier {
    fn default() -> Self {
        Self::new()
    }
}

/// Whether the last word of the item's type (or sub-type, or name when
/// those are empty) is one of `words`.
fn final_word_in(item: &ClothingItem, words: &[String]) -> bool {
    let last = [
        Some(item.item_type.as_str()),
        item.sub_type.as_deref(),
        Some(item.name.as_str()),
    ]
    .into_iter()
    .flatten()
    .map(tokenize)
    .find_map(|tokens| tokens.last().cloned());

    last.is_some_and(|word| singular_forms(&word).iter().any(|form| words.contains(form)))
}

/// The token itself, then with "es" and "s" stripped.
fn singular_forms(token: &str) -> Vec<String> {
    let mut forms = vec![token.to_string()];
    if let Some(stem) = token.strip_suffix("es") {
        if stem.len() > 2 {
            forms.push(stem.to_string());
        }
    }
    if let Some(stem) = token.strip_suffix('s') {
        if stem.len() > 2 {
            forms.push(stem.to_string());
        }
    }
    forms
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(item_type: &str) -> ClothingItem {
        ClothingItem::new("i", "u", "", item_type)
    }

    #[test]
    fn test_classify_basic_types() {
        let classifier = ItemClassifier::new();
        assert_eq!(classifier.classify(&item("shirt")), Category::Top);
        assert_eq!(classifier.classify(&item("jeans")), Category::Bottom);
        assert_eq!(classifier.classify(&item("dress")), Category::Dress);
        assert_eq!(classifier.classify(&item("sneakers")), Category::Shoes);
        assert_eq!(classifier.classify(&item("blazer")), Category::Outerwear);
        assert_eq!(classifier.classify(&item("scarf")), Category::Accessory);
        assert_eq!(classifier.classify(&item("widget")), Category::Other);
        assert_eq!(classifier.classify(&item("")), Category::Other);
    }

    #[test]
    fn test_head_noun_wins() {
        let classifier = ItemClassifier::new();
        assert_eq!(classifier.classify(&item("dress shirt")), Category::Top);
        assert_eq!(classifier.classify(&item("shirt dress")), Category::Dress);
        assert_eq!(classifier.classify(&item("dress shoes")), Category::Shoes);
        assert_eq!(classifier.classify(&item("dress pants")), Category::Bottom);
        assert_eq!(classifier.classify(&item("sweater dress")), Category::Dress);
        assert_eq!(classifier.classify(&item("Oxford Shirt")), Category::Top);
        assert_eq!(classifier.classify(&item("oxfords")), Category::Shoes);
    }

    #[test]
    fn test_plural_and_punctuation() {
        let classifier = ItemClassifier::new();
        assert_eq!(classifier.classify(&item("T-Shirt")), Category::Top);
        assert_eq!(classifier.classify(&item("flip-flops")), Category::Shoes);
        assert_eq!(classifier.classify(&item("dresses")), Category::Dress);
        assert_eq!(classifier.classify(&item("ankle boots")), Category::Shoes);
    }

    #[test]
    fn test_tank_and_cami_are_shirt_tops() {
        let classifier = ItemClassifier::new();
        for t in ["tank", "tank top", "cami", "camisole"] {
            let it = item(t);
            assert_eq!(classifier.classify(&it), Category::Top, "{t}");
            assert!(classifier.is_shirt(&it), "{t} should count as a shirt");
        }
    }

    #[test]
    fn test_is_shirt_excludes_mid_layers() {
        let classifier = ItemClassifier::new();
        assert!(classifier.is_shirt(&item("button-down shirt")));
        assert!(!classifier.is_shirt(&item("sweater")));
        assert!(!classifier.is_shirt(&item("hoodie")));
        assert_eq!(classifier.wear_layer(&item("sweater")), Some(WearLayer::Mid));
        assert_eq!(classifier.wear_layer(&item("t-shirt")), Some(WearLayer::Base));
        assert_eq!(classifier.wear_layer(&item("parka")), Some(WearLayer::Outer));
    }

    #[test]
    fn test_falls_back_to_name() {
        let classifier = ItemClassifier::new();
        let it = ClothingItem::new("i", "u", "Navy Blazer", "clothing");
        assert_eq!(classifier.classify(&it), Category::Outerwear);
    }

    #[test]
    fn test_formality_level() {
        let classifier = ItemClassifier::new();
        assert_eq!(classifier.formality_level(&item("tuxedo jacket")), Formality::Formal);
        assert_eq!(classifier.formality_level(&item("dress shoes")), Formality::Business);
        assert_eq!(classifier.formality_level(&item("running shoes")), Formality::Athletic);
        assert_eq!(classifier.formality_level(&item("sneakers")), Formality::Casual);
        assert_eq!(classifier.formality_level(&item("blouse")), Formality::SmartCasual);
        // "jumpsuit" must not read as "suit"
        assert_eq!(classifier.formality_level(&item("jumpsuit")), Formality::SmartCasual);
        assert_eq!(classifier.formality_level(&item("suit")), Formality::Business);
        assert_eq!(classifier.formality_level(&item("silk ties")), Formality::Business);

        let explicit = item("sneakers").with_formality(Formality::Business);
        assert_eq!(classifier.formality_level(&explicit), Formality::Business);
    }

    #[test]
    fn test_describe() {
        let classifier = ItemClassifier::new();
        let profile = classifier.describe(&item("wrap dress"));
        assert!(profile.is_dress);
        assert!(!profile.is_shirt);
        assert_eq!(profile.category, Category::Dress);
        assert_eq!(profile.layer, Some(WearLayer::Base));
    }

    #[test]
    fn test_has_phrase() {
        let tokens = tokenize("Moisture-Wicking running shirt");
        assert!(has_phrase(&tokens, "moisture wicking"));
        assert!(has_phrase(&tokens, "running"));
        assert!(!has_phrase(&tokens, "run"));
        assert!(!has_phrase(&tokens, ""));
    }

    #[test]
    fn test_custom_config() {
        let mut config = ClassifierConfig::default();
        config.bottom_keywords.push("hakama".to_string());
        let classifier = ItemClassifier::with_config(config);
        assert_eq!(classifier.classify(&item("hakama")), Category::Bottom);
    }

    #[test]
    fn test_tie_and_suit_only_count_as_head_words() {
        let classifier = ItemClassifier::new();
        let tie_dye = ClothingItem::new("t", "u", "Tie-dye tee", "t-shirt");
        assert_eq!(classifier.formality_level(&tie_dye), Formality::Casual);

        let track = ClothingItem::new("j", "u", "Track suit jacket", "jacket");
        assert_eq!(classifier.formality_level(&track), Formality::Athletic);

        let untyped = ClothingItem::new("s", "u", "Navy suit", "");
        assert_eq!(classifier.formality_level(&untyped), Formality::Business);
    }
}
