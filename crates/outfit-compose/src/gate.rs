//! Invariant gate.
//!
//! Hard structural rules checked before any item joins an outfit:
//! - no item twice
//! - at most one dress
//! - a dress excludes separate tops and bottoms, in both directions
//! - at most one shirt
//!
//! Outerwear, accessories and unclassified items are exempt from all but
//! the first rule. A rejection is a value, never an error; the selector
//! records the reason as a skip.

use outfit_types::ClothingItem;
use serde::{Deserialize, Serialize};

use crate::classifier::{ItemClassifier, ItemProfile};
use crate::selection::SelectionState;
use crate::types::Category;

/// Why the gate refused an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateReason {
    DuplicateItem,
    DuplicateDress,
    DressWithBottom,
    DressWithTop,
    BottomWithDress,
    TopWithDress,
    DuplicateShirt,
}

impl GateReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            GateReason::DuplicateItem => "duplicate item",
            GateReason::DuplicateDress => "duplicate dress",
            GateReason::DressWithBottom => "dress with bottom already selected",
            GateReason::DressWithTop => "dress with top already selected",
            GateReason::BottomWithDress => "bottom with dress already selected",
            GateReason::TopWithDress => "top with dress already selected",
            GateReason::DuplicateShirt => "duplicate shirt",
        }
    }

    /// Dress and separates conflicts, in either direction.
    pub fn is_dress_conflict(&self) -> bool {
        matches!(
            self,
            GateReason::DressWithBottom
                | GateReason::DressWithTop
                | GateReason::BottomWithDress
                | GateReason::TopWithDress
        )
    }
}

/// Gate answer: `(can_add, reason)` plus the typed reason when refused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateDecision {
    pub can_add: bool,
    pub reason: String,
    pub code: Option<GateReason>,
}

impl GateDecision {
    fn allow() -> Self {
        Self {
            can_add: true,
            reason: String::new(),
            code: None,
        }
    }

    fn deny(code: GateReason) -> Self {
        Self {
            can_add: false,
            reason: code.as_str().to_string(),
            code: Some(code),
        }
    }
}

/// A gate rule broken by an already assembled outfit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateViolation {
    /// Position of the offending item in the outfit
    pub index: usize,
    pub item_id: String,
    pub category: Category,
    pub reason: GateReason,
}

/// Check whether `item` may join the outfit in `state`.
pub fn can_add(state: &SelectionState, item: &ClothingItem, profile: &ItemProfile) -> GateDecision {
    if state.contains(item) {
        return GateDecision::deny(GateReason::DuplicateItem);
    }
    if profile.category.is_gate_exempt() {
        return GateDecision::allow();
    }

    let dresses = state.count(Category::Dress);
    match profile.category {
        Category::Dress if dresses > 0 => GateDecision::deny(GateReason::DuplicateDress),
        Category::Dress if state.count(Category::Bottom) > 0 => {
            GateDecision::deny(GateReason::DressWithBottom)
        }
        Category::Dress if state.count(Category::Top) > 0 => {
            GateDecision::deny(GateReason::DressWithTop)
        }
        Category::Bottom if dresses > 0 => GateDecision::deny(GateReason::BottomWithDress),
        Category::Top if dresses > 0 => GateDecision::deny(GateReason::TopWithDress),
        Category::Top if profile.is_shirt && state.shirts > 0 => {
            GateDecision::deny(GateReason::DuplicateShirt)
        }
        _ => GateDecision::allow(),
    }
}

/// Replay an outfit through the gate in order. Earlier items take
/// priority; each later item that breaks a rule is reported and left out of
/// the replay state.
pub fn violations(items: &[ClothingItem], classifier: &ItemClassifier) -> Vec<GateViolation> {
    let mut state = SelectionState::new();
    let mut found = Vec::new();

    for (index, item) in items.iter().enumerate() {
        let profile = classifier.describe(item);
        let decision = can_add(&state, item, &profile);
        match decision.code {
            Some(reason) => found.push(GateViolation {
                index,
                item_id: item.id.clone(),
                category: profile.category,
                reason,
            }),
            None => state.push(item.clone(), &profile),
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    fn add(state: &mut SelectionState, classifier: &ItemClassifier, item: &ClothingItem) -> GateDecision {
        let profile = classifier.describe(item);
        let decision = can_add(state, item, &profile);
        if decision.can_add {
            state.push(item.clone(), &profile);
        }
        decision
    }

    #[test]
    fn test_duplicate_dress_rejected() {
        let classifier = ItemClassifier::new();
        let mut state = SelectionState::new();
        assert!(add(&mut state, &classifier, &ClothingItem::new("d1", "u", "", "dress")).can_add);

        let decision = add(&mut state, &classifier, &ClothingItem::new("d2", "u", "", "maxi dress"));
        assert!(!decision.can_add);
        assert_eq!(decision.reason, "duplicate dress");
        assert_eq!(decision.code, Some(GateReason::DuplicateDress));
    }

    #[test]
    fn test_dress_and_separates_exclusive_both_ways() {
        let classifier = ItemClassifier::new();
        let dress = ClothingItem::new("d", "u", "", "dress");
        let skirt = ClothingItem::new("s", "u", "", "skirt");
        let blouse = ClothingItem::new("b", "u", "", "blouse");

        let mut state = SelectionState::new();
        add(&mut state, &classifier, &dress);
        assert_eq!(add(&mut state, &classifier, &skirt).code, Some(GateReason::BottomWithDress));
        assert_eq!(add(&mut state, &classifier, &blouse).code, Some(GateReason::TopWithDress));

        let mut state = SelectionState::new();
        add(&mut state, &classifier, &skirt);
        assert_eq!(add(&mut state, &classifier, &dress).code, Some(GateReason::DressWithBottom));

        let mut state = SelectionState::new();
        add(&mut state, &classifier, &blouse);
        assert_eq!(add(&mut state, &classifier, &dress).code, Some(GateReason::DressWithTop));
    }

    #[test]
    fn test_two_shirts_rejected_but_sweater_allowed() {
        let classifier = ItemClassifier::new();
        let mut state = SelectionState::new();
        add(&mut state, &classifier, &ClothingItem::new("a", "u", "", "t-shirt"));
        assert_eq!(
            add(&mut state, &classifier, &ClothingItem::new("b", "u", "", "polo")).code,
            Some(GateReason::DuplicateShirt)
        );
        assert!(add(&mut state, &classifier, &ClothingItem::new("c", "u", "", "sweater")).can_add);
    }

    #[test]
    fn test_exempt_categories() {
        let classifier = ItemClassifier::new();
        let mut state = SelectionState::new();
        add(&mut state, &classifier, &ClothingItem::new("d", "u", "", "dress"));
        assert!(add(&mut state, &classifier, &ClothingItem::new("j", "u", "", "jacket")).can_add);
        assert!(add(&mut state, &classifier, &ClothingItem::new("k", "u", "", "jacket")).can_add);
        assert!(add(&mut state, &classifier, &ClothingItem::new("x", "u", "", "gizmo")).can_add);
        // Exempt items still cannot appear twice
        assert_eq!(
            add(&mut state, &classifier, &ClothingItem::new("j", "u", "", "jacket")).code,
            Some(GateReason::DuplicateItem)
        );
    }

    #[test]
    fn test_violations_replay() {
        let classifier = ItemClassifier::new();
        let items = vec![
            ClothingItem::new("d", "u", "", "dress"),
            ClothingItem::new("t1", "u", "", "shirt"),
            ClothingItem::new("t2", "u", "", "shirt"),
            ClothingItem::new("d", "u", "", "dress"),
            ClothingItem::new("s", "u", "", "sneakers"),
        ];
        let found = violations(&items, &classifier);
        let reasons: Vec<(usize, GateReason)> = found.iter().map(|v| (v.index, v.reason)).collect();
        assert_eq!(
            reasons,
            vec![
                (1, GateReason::TopWithDress),
                (2, GateReason::TopWithDress),
                (3, GateReason::DuplicateItem),
            ]
        );
        assert!(found[0].reason.is_dress_conflict());
    }
}
