//! Wardrobe deduplication.
//!
//! Items are keyed by id, or by name plus type for legacy records without an
//! id. The first occurrence of a key wins and relative order is preserved.
//! Items with neither id nor name have no key and are always kept.

use std::collections::HashSet;

use outfit_types::ClothingItem;
use tracing::debug;

/// Identity key used for deduplication.
pub fn dedupe_key(item: &ClothingItem) -> Option<String> {
    if !item.id.is_empty() {
        return Some(format!("id:{}", item.id));
    }
    let name = item.name.trim().to_lowercase();
    if name.is_empty() {
        None
    } else {
        Some(format!("name:{name}::{}", item.item_type))
    }
}

/// Stable first-wins deduplication. The input is not modified.
pub fn dedupe(items: &[ClothingItem]) -> Vec<ClothingItem> {
    let mut seen = HashSet::with_capacity(items.len());
    let mut removed = Vec::new();
    let mut out = Vec::with_capacity(items.len());

    for item in items {
        match dedupe_key(item) {
            Some(key) if !seen.insert(key.clone()) => removed.push(key),
            _ => out.push(item.clone()),
        }
    }

    if !removed.is_empty() {
        debug!(removed = ?removed, kept = out.len(), "Removed duplicate wardrobe items");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(items: &[ClothingItem]) -> Vec<&str> {
        items.iter().map(|i| i.name.as_str()).collect()
    }

    #[test]
    fn test_first_occurrence_wins() {
        let items = vec![
            ClothingItem::new("a", "u", "first", "shirt"),
            ClothingItem::new("b", "u", "other", "jeans"),
            ClothingItem::new("a", "u", "second", "shirt"),
        ];
        let result = dedupe(&items);
        assert_eq!(names(&result), vec!["first", "other"]);
    }

    #[test]
    fn test_name_fallback_key() {
        let items = vec![
            ClothingItem::new("", "u", "Blue Tee", "t-shirt"),
            ClothingItem::new("", "u", "blue tee", "t-shirt"),
            ClothingItem::new("", "u", "Blue Tee", "jeans"),
        ];
        let result = dedupe(&items);
        assert_eq!(result.len(), 2);
        assert_eq!(result[1].item_type, "jeans");
    }

    #[test]
    fn test_keyless_items_kept() {
        let items = vec![
            ClothingItem::new("", "u", "", "shirt"),
            ClothingItem::new("", "u", "", "shirt"),
        ];
        assert_eq!(dedupe(&items).len(), 2);
    }

    #[test]
    fn test_idempotent() {
        let items = vec![
            ClothingItem::new("a", "u", "x", "shirt"),
            ClothingItem::new("", "u", "y", "shirt"),
            ClothingItem::new("a", "u", "z", "shirt"),
            ClothingItem::new("", "u", "Y", "shirt"),
        ];
        let once = dedupe(&items);
        let twice = dedupe(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_empty() {
        assert!(dedupe(&[]).is_empty());
    }
}
