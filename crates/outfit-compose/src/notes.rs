//! Human-readable style notes for a finished outfit.

use outfit_types::ClothingItem;

use crate::classifier::ItemClassifier;
use crate::context::GenerationContext;
use crate::types::{Category, LayeringRule};

/// Notes describing the anchor piece, layering for the weather and the
/// requested mood and style. Empty outfits get no notes.
pub fn style_notes(
    items: &[ClothingItem],
    ctx: &GenerationContext,
    classifier: &ItemClassifier,
) -> Vec<String> {
    let mut notes = Vec::new();
    if items.is_empty() {
        return notes;
    }

    let profiled: Vec<(&ClothingItem, Category)> =
        items.iter().map(|i| (i, classifier.classify(i))).collect();
    let first = |category: Category| {
        profiled
            .iter()
            .find(|(_, c)| *c == category)
            .map(|(item, _)| *item)
    };

    if let Some(dress) = first(Category::Dress) {
        notes.push(format!("Built around the {}.", describe(dress)));
    } else if let (Some(top), Some(bottom)) = (first(Category::Top), first(Category::Bottom)) {
        notes.push(format!(
            "Pairs the {} with the {}.",
            describe(top),
            describe(bottom)
        ));
    }

    if let Some(note) = layering_note(ctx, first(Category::Outerwear)) {
        notes.push(note);
    }

    match (ctx.mood.as_deref(), ctx.style.is_empty()) {
        (Some(mood), false) => notes.push(format!("A {mood} take on {} style.", ctx.style)),
        (Some(mood), true) => notes.push(format!("Chosen for a {mood} mood.")),
        (None, false) => notes.push(format!("Keeps to a {} look.", ctx.style)),
        (None, true) => {}
    }

    if !ctx.occasion.is_empty() {
        notes.push(format!("Suited to {}.", ctx.occasion));
    }
    notes
}

fn describe(item: &ClothingItem) -> String {
    match item.color.as_deref() {
        Some(color) if !item.display_name().to_lowercase().contains(color) => {
            format!("{color} {}", item.display_name().to_lowercase())
        }
        _ => item.display_name().to_lowercase(),
    }
}

fn layering_note(ctx: &GenerationContext, outerwear: Option<&ClothingItem>) -> Option<String> {
    let temp = ctx.weather.temperature_f?;
    let note = match (ctx.layering_rule, outerwear) {
        (LayeringRule::Minimal, _) => format!("Kept light for {temp:.0}°F."),
        (LayeringRule::Light, _) => return None,
        (LayeringRule::Layered, Some(o)) => {
            format!("Bring the {} for a cooler {temp:.0}°F.", describe(o))
        }
        (LayeringRule::Layered, None) => format!("A light layer helps at {temp:.0}°F."),
        (LayeringRule::Warm, Some(o)) => format!("Layer up under the {} at {temp:.0}°F.", describe(o)),
        (LayeringRule::Heavy, Some(o)) => {
            format!("Bundle up: the {} is a must at {temp:.0}°F.", describe(o))
        }
        (LayeringRule::Warm | LayeringRule::Heavy, None) => {
            format!("Add a coat before heading out at {temp:.0}°F.")
        }
    };
    Some(note)
}
