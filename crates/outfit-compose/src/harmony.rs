//! Color and material harmony heuristics.
//!
//! Used for scoring during selection and for the harmony validator, which
//! only ever warns.

use outfit_types::{normalize_tag, ClothingItem};

const NEUTRALS: &[&str] = &[
    "black", "white", "gray", "grey", "charcoal", "navy", "beige", "cream", "ivory", "tan",
    "khaki", "brown", "camel", "denim", "taupe", "nude", "off white", "silver", "gold",
];

/// Pairs that read as a clash when worn together.
const CLASHING: &[(&str, &str)] = &[
    ("red", "pink"),
    ("red", "orange"),
    ("orange", "pink"),
    ("orange", "purple"),
    ("red", "green"),
    ("purple", "yellow"),
    ("brown", "black"),
];

const PLAIN_PATTERNS: &[&str] = &["solid", "plain", "none", "heather"];

const SPORTY_MATERIALS: &[&str] = &["mesh", "spandex", "polyester", "nylon", "lycra", "jersey"];
const DRESSY_MATERIALS: &[&str] = &["silk", "satin", "velvet", "tweed", "cashmere", "chiffon", "lace"];

/// Max distinct non-neutral colors before an outfit reads as busy.
pub const MAX_ACCENT_COLORS: usize = 3;

/// Base color word of a possibly compound color ("dark navy" -> "navy").
pub fn base_color(color: &str) -> String {
    let color = normalize_tag(color);
    if NEUTRALS.contains(&color.as_str()) {
        return color;
    }
    color.rsplit(' ').next().unwrap_or_default().to_string()
}

pub fn is_neutral(color: &str) -> bool {
    NEUTRALS.contains(&base_color(color).as_str())
}

/// Whether two colors clash.
pub fn colors_clash(a: &str, b: &str) -> bool {
    let (a, b) = (base_color(a), base_color(b));
    CLASHING
        .iter()
        .any(|(x, y)| (a == *x && b == *y) || (a == *y && b == *x))
}

/// Distinct non-neutral colors across the items.
pub fn accent_colors<'a>(items: impl IntoIterator<Item = &'a ClothingItem>) -> Vec<String> {
    let mut accents: Vec<String> = Vec::new();
    for item in items {
        if let Some(color) = item.color.as_deref() {
            let base = base_color(color);
            if !is_neutral(&base) && !accents.contains(&base) {
                accents.push(base);
            }
        }
    }
    accents
}

/// Harmony of a candidate color with already selected items, in [0, 1].
pub fn color_score(candidate: Option<&str>, selected: &[&ClothingItem]) -> f32 {
    let Some(color) = candidate else {
        return 0.5;
    };
    let chosen: Vec<&str> = selected.iter().filter_map(|i| i.color.as_deref()).collect();
    if chosen.is_empty() {
        return 0.7;
    }
    if chosen.iter().any(|c| colors_clash(color, c)) {
        return 0.1;
    }
    if is_neutral(color) {
        return 1.0;
    }
    let base = base_color(color);
    if chosen.iter().any(|c| base_color(c) == base) {
        return 0.8;
    }
    let accents = accent_colors(selected.iter().copied());
    if accents.len() + 1 > MAX_ACCENT_COLORS {
        0.3
    } else {
        0.6
    }
}

pub fn is_patterned(item: &ClothingItem) -> bool {
    item.metadata
        .pattern
        .as_deref()
        .is_some_and(|p| !PLAIN_PATTERNS.contains(&p))
}

/// A sporty and a dressy material in the same outfit.
pub fn material_clash(items: &[&ClothingItem]) -> Option<(String, String)> {
    let materials: Vec<&str> = items
        .iter()
        .filter_map(|i| i.metadata.material.as_deref())
        .collect();
    let sporty = materials.iter().find(|m| SPORTY_MATERIALS.contains(*m))?;
    let dressy = materials.iter().find(|m| DRESSY_MATERIALS.contains(*m))?;
    Some((sporty.to_string(), dressy.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn colored(color: &str) -> ClothingItem {
        ClothingItem::new("c", "u", "", "shirt").with_color(color)
    }

    #[test]
    fn test_base_color() {
        assert_eq!(base_color("Dark Navy"), "navy");
        assert_eq!(base_color("off-white"), "off white");
        assert!(is_neutral("light gray"));
        assert!(!is_neutral("red"));
    }

    #[test]
    fn test_clash_is_symmetric() {
        assert!(colors_clash("red", "pink"));
        assert!(colors_clash("hot pink", "red"));
        assert!(!colors_clash("red", "navy"));
    }

    #[test]
    fn test_color_score() {
        let red = colored("red");
        let navy = colored("navy");
        assert_eq!(color_score(None, &[&red]), 0.5);
        assert_eq!(color_score(Some("red"), &[]), 0.7);
        assert_eq!(color_score(Some("pink"), &[&red]), 0.1);
        assert_eq!(color_score(Some("white"), &[&red, &navy]), 1.0);
        assert_eq!(color_score(Some("red"), &[&red]), 0.8);
        assert_eq!(color_score(Some("teal"), &[&red]), 0.6);
    }

    #[test]
    fn test_accent_colors_dedup() {
        let items = [colored("red"), colored("dark red"), colored("black"), colored("teal")];
        assert_eq!(accent_colors(items.iter()), vec!["red".to_string(), "teal".to_string()]);
    }

    #[test]
    fn test_material_clash() {
        let mesh = ClothingItem::new("a", "u", "", "shirt").with_material("mesh");
        let silk = ClothingItem::new("b", "u", "", "skirt").with_material("silk");
        assert!(material_clash(&[&mesh, &silk]).is_some());
        assert!(material_clash(&[&mesh]).is_none());
    }

    #[test]
    fn test_is_patterned() {
        assert!(is_patterned(&ClothingItem::new("a", "u", "", "shirt").with_pattern("striped")));
        assert!(!is_patterned(&ClothingItem::new("a", "u", "", "shirt").with_pattern("Solid")));
        assert!(!is_patterned(&ClothingItem::new("a", "u", "", "shirt")));
    }
}
