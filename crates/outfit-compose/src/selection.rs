//! Selection state.
//!
//! Mutable accumulator owned by one generation attempt. Items are appended
//! in selection order; healing may rebuild it wholesale but never shares it
//! across requests.

use std::collections::BTreeMap;

use outfit_types::{CategoryLimits, ClothingItem};
use serde::{Deserialize, Serialize};

use crate::classifier::{ItemClassifier, ItemProfile};
use crate::types::Category;

/// An item the selector or integrity checker declined, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkipRecord {
    pub item_id: String,
    pub category: Category,
    pub reason: String,
}

/// Where a gap-filling item came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepairSource {
    Candidates,
    Wardrobe,
}

/// An item appended by the structural integrity checker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepairRecord {
    pub category: Category,
    pub item_id: String,
    /// Position of the added item in `selected_items`
    #[serde(default)]
    pub index: usize,
    pub source: RepairSource,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SelectionState {
    /// Items per category; read by the invariant gate
    pub categories_filled: BTreeMap<Category, usize>,
    /// Shirt-like tops selected
    pub shirts: usize,
    pub selected_items: Vec<ClothingItem>,
    pub skipped: Vec<SkipRecord>,
    /// Required categories nothing in the wardrobe could fill
    pub unfillable: Vec<Category>,
    pub repairs: Vec<RepairRecord>,
}

/// Same wardrobe item: by id, or by value when either side has none.
pub fn same_item(a: &ClothingItem, b: &ClothingItem) -> bool {
    if a.id.is_empty() || b.id.is_empty() {
        a == b
    } else {
        a.id == b.id
    }
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild counters for an existing outfit without consulting the gate.
    pub fn from_items(items: &[ClothingItem], classifier: &ItemClassifier) -> Self {
        let mut state = Self::new();
        for item in items {
            state.push(item.clone(), &classifier.describe(item));
        }
        state
    }

    /// Append an item. Callers check the gate first.
    pub fn push(&mut self, item: ClothingItem, profile: &ItemProfile) {
        *self.categories_filled.entry(profile.category).or_insert(0) += 1;
        if profile.is_shirt {
            self.shirts += 1;
        }
        self.selected_items.push(item);
    }

    pub fn record_skip(&mut self, item: &ClothingItem, category: Category, reason: impl Into<String>) {
        self.skipped.push(SkipRecord {
            item_id: item.id.clone(),
            category,
            reason: reason.into(),
        });
    }

    pub fn mark_unfillable(&mut self, category: Category) {
        if !self.unfillable.contains(&category) {
            self.unfillable.push(category);
        }
    }

    pub fn count(&self, category: Category) -> usize {
        self.categories_filled.get(&category).copied().unwrap_or(0)
    }

    pub fn has_dress(&self) -> bool {
        self.count(Category::Dress) > 0
    }

    pub fn contains_id(&self, id: &str) -> bool {
        !id.is_empty() && self.selected_items.iter().any(|i| i.id == id)
    }

    /// True if this exact item (by id, or by value when it has none) is selected.
    pub fn contains(&self, item: &ClothingItem) -> bool {
        self.selected_items.iter().any(|selected| same_item(selected, item))
    }

    pub fn len(&self) -> usize {
        self.selected_items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected_items.is_empty()
    }

    pub fn into_items(self) -> Vec<ClothingItem> {
        self.selected_items
    }
}

/// Quantity limit for a category. Minimalist outfits carry fewer accessories.
pub fn category_limit(limits: &CategoryLimits, category: Category, minimalist: bool) -> usize {
    match category {
        Category::Top => limits.max_tops,
        Category::Bottom => limits.max_bottoms,
        Category::Dress => limits.max_dresses,
        Category::Shoes => limits.max_shoes,
        Category::Outerwear => limits.max_outerwear,
        Category::Accessory if minimalist => limits.minimalist_accessories,
        Category::Accessory => limits.max_accessories,
        Category::Other => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_items_counts() {
        let classifier = ItemClassifier::new();
        let items = vec![
            ClothingItem::new("a", "u", "", "t-shirt"),
            ClothingItem::new("b", "u", "", "sweater"),
            ClothingItem::new("c", "u", "", "jeans"),
        ];
        let state = SelectionState::from_items(&items, &classifier);
        assert_eq!(state.count(Category::Top), 2);
        assert_eq!(state.shirts, 1);
        assert_eq!(state.count(Category::Bottom), 1);
        assert!(state.contains_id("b"));
        assert!(!state.contains_id(""));
        assert!(!state.has_dress());
        assert_eq!(state.len(), 3);
    }

    #[test]
    fn test_unfillable_not_duplicated() {
        let mut state = SelectionState::new();
        state.mark_unfillable(Category::Shoes);
        state.mark_unfillable(Category::Shoes);
        assert_eq!(state.unfillable, vec![Category::Shoes]);
    }

    #[test]
    fn test_category_limit() {
        let limits = CategoryLimits::default();
        assert_eq!(category_limit(&limits, Category::Top, false), 2);
        assert_eq!(category_limit(&limits, Category::Accessory, false), 3);
        assert_eq!(category_limit(&limits, Category::Accessory, true), 1);
        assert_eq!(category_limit(&limits, Category::Other, false), 0);
    }

    #[test]
    fn test_deserialized_state_still_finds_items() {
        let classifier = ItemClassifier::new();
        let items = vec![
            ClothingItem::new("a", "u", "", "t-shirt"),
            ClothingItem::new("", "u", "Old jeans", "jeans"),
        ];
        let state = SelectionState::from_items(&items, &classifier);
        let json = serde_json::to_string(&state).unwrap();
        let loaded: SelectionState = serde_json::from_str(&json).unwrap();

        assert!(loaded.contains_id("a"));
        assert!(loaded.contains(&items[1]));
        assert_eq!(loaded.count(Category::Bottom), 1);
    }

    #[test]
    fn test_same_item_compares_idless_by_value() {
        let tee = ClothingItem::new("", "u", "Tee", "t-shirt");
        let boots = ClothingItem::new("", "u", "Boots", "boots");
        assert!(same_item(&tee, &tee.clone()));
        assert!(!same_item(&tee, &boots));

        let stored = ClothingItem::new("t1", "u", "Tee", "t-shirt");
        assert!(same_item(&stored, &stored.clone().with_color("red")));
        assert!(!same_item(&stored, &tee));
    }
}
