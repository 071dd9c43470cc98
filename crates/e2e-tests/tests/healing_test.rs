//! Healing E2E tests for the outfit composer.
//!
//! Outfits edited by a caller are re-validated through
//! `OutfitComposer::revalidate_at`; invalid ones go through the healing
//! orchestrator, which must repair them within its attempt budget or hand
//! back a best-effort outfit with its remaining errors.

use pretty_assertions::assert_eq;

use e2e_tests::{business_wardrobe, capsule_wardrobe, composer, fixed_now, ids, init_tracing, item};
use outfit_compose::{
    Category, GenerationStrategy, HealingState, HealingStrategy, IssueCode, OutfitComposer,
};
use outfit_types::{ClothingItem, ComposerSettings, OutfitRequest, Weather, WeatherCondition};

fn pick(wardrobe: &[ClothingItem], wanted: &[&str]) -> Vec<ClothingItem> {
    wanted
        .iter()
        .filter_map(|id| wardrobe.iter().find(|i| i.id == *id).cloned())
        .collect()
}

/// Two shirts in one outfit: the later shirt is dropped.
#[test]
fn test_duplicate_shirt_healed() {
    init_tracing();
    let wardrobe = capsule_wardrobe();
    let outfit = pick(&wardrobe, &["oxford", "tee", "chinos", "loafers"]);

    let response =
        composer().revalidate_at(&OutfitRequest::default(), &outfit, &wardrobe, fixed_now());

    assert!(response.validation.valid);
    assert_eq!(response.generation_strategy, GenerationStrategy::HealedDuplicate);
    assert_eq!(ids(&response.items), vec!["oxford", "chinos", "loafers"]);

    let log = response.healing_log.expect("healing ran");
    assert_eq!(log.strategy_used, Some(HealingStrategy::DuplicateFix));
    assert_eq!(log.items_fixed, vec!["tee".to_string()]);
    assert_eq!(log.final_state, HealingState::Healed);
    assert_eq!(log.transitions.first(), Some(&HealingState::Diagnosed));
    assert_eq!(log.transitions.last(), Some(&HealingState::Healed));
}

/// A parka on an 85°F day is swapped for the lighter jacket.
#[test]
fn test_heavy_parka_healed_on_hot_day() {
    init_tracing();
    let wardrobe = vec![
        item("tee", "Crew tee", "t-shirt"),
        item("shorts", "Chino shorts", "shorts"),
        item("sandals", "Leather sandals", "sandals"),
        item("parka", "Down parka", "parka"),
        item("denim", "Denim jacket", "denim jacket"),
    ];
    let outfit = pick(&wardrobe, &["tee", "shorts", "sandals", "parka"]);
    let request = OutfitRequest::default().with_weather(Weather::new(85.0, "clear"));

    let response = composer().revalidate_at(&request, &outfit, &wardrobe, fixed_now());

    assert!(response.validation.valid);
    assert_eq!(response.generation_strategy, GenerationStrategy::HealedWeather);
    assert!(!response.items.iter().any(|i| i.id == "parka"));

    let log = response.healing_log.expect("healing ran");
    assert_eq!(log.strategies_tried, vec![HealingStrategy::WeatherFix]);
    assert!(log.initial_errors >= 1);
    assert!(log.remaining_errors.is_empty());
}

/// Items without ids are swapped by position and reported by name.
#[test]
fn test_idless_sandals_healed_in_snow() {
    init_tracing();
    let outfit = vec![
        item("", "Tee", "t-shirt"),
        item("", "Jeans", "jeans"),
        item("", "Sandals", "sandals"),
    ];
    let mut wardrobe = outfit.clone();
    wardrobe.push(item("", "Boots", "boots"));
    let weather = Weather { temperature_f: None, condition: WeatherCondition::Snow };
    let request = OutfitRequest::default().with_weather(weather);

    let response = composer().revalidate_at(&request, &outfit, &wardrobe, fixed_now());

    assert!(response.validation.valid);
    assert_eq!(response.generation_strategy, GenerationStrategy::HealedWeather);
    let names: Vec<&str> = response.items.iter().map(|i| i.name.as_str()).collect();
    assert_eq!(names, vec!["Tee", "Jeans", "Boots"]);

    let log = response.healing_log.expect("healing ran");
    assert_eq!(log.items_fixed, vec!["Sandals".to_string()]);
    let change = &log.items_replaced[0];
    assert_eq!(change.removed.as_deref(), Some("Sandals"));
    assert_eq!(change.added.as_deref(), Some("Boots"));
}

/// A second id-less pair of shoes is dropped without touching the first.
#[test]
fn test_idless_extra_shoes_dropped() {
    init_tracing();
    let outfit = vec![
        item("", "Tee", "t-shirt"),
        item("", "Jeans", "jeans"),
        item("", "Canvas sneakers", "sneakers"),
        item("", "White sneakers", "sneakers"),
    ];

    let response =
        composer().revalidate_at(&OutfitRequest::default(), &outfit, &outfit, fixed_now());

    assert!(response.validation.valid);
    assert_eq!(response.generation_strategy, GenerationStrategy::HealedDuplicate);
    let names: Vec<&str> = response.items.iter().map(|i| i.name.as_str()).collect();
    assert_eq!(names, vec!["Tee", "Jeans", "Canvas sneakers"]);
}

/// Sneakers at a business formal event are swapped for loafers.
#[test]
fn test_sneakers_healed_with_loafers() {
    init_tracing();
    let mut wardrobe = business_wardrobe();
    wardrobe.push(
        item("loafers", "Leather loafers", "loafers")
            .with_color("black")
            .with_occasion(&["business"]),
    );
    let outfit = business_wardrobe();

    let response = composer().revalidate_at(
        &OutfitRequest::new("Business Formal", ""),
        &outfit,
        &wardrobe,
        fixed_now(),
    );

    assert!(response.validation.valid);
    assert_eq!(response.generation_strategy, GenerationStrategy::HealedStyle);
    assert_eq!(ids(&response.items), vec!["dress-shirt", "dress-pants", "loafers"]);

    let log = response.healing_log.expect("healing ran");
    let change = &log.items_replaced[0];
    assert_eq!(change.strategy, HealingStrategy::StyleFix);
    assert_eq!(change.removed.as_deref(), Some("sneakers"));
    assert_eq!(change.added.as_deref(), Some("loafers"));
}

/// An emptied outfit is regenerated from the wardrobe.
#[test]
fn test_empty_outfit_regenerated() {
    init_tracing();
    let wardrobe = capsule_wardrobe();
    let response = composer().revalidate_at(
        &OutfitRequest::new("casual", ""),
        &[],
        &wardrobe,
        fixed_now(),
    );

    assert_eq!(response.generation_strategy, GenerationStrategy::ScratchRegenerated);
    assert!(response.is_complete());

    let log = response.healing_log.expect("healing ran");
    assert_eq!(log.strategies_tried[0], HealingStrategy::ScratchRegeneration);
    assert_eq!(log.final_state, HealingState::ScratchRegenerated);
}

/// Nothing can replace the sneakers: the result is best effort and the
/// remaining error is reported.
#[test]
fn test_unfixable_outfit_is_best_effort() {
    init_tracing();
    let wardrobe = business_wardrobe();
    let response = composer().revalidate_at(
        &OutfitRequest::new("Business Formal", ""),
        &wardrobe,
        &wardrobe,
        fixed_now(),
    );

    assert_eq!(response.generation_strategy, GenerationStrategy::BestEffort);
    assert_eq!(response.items.len(), 3);

    let log = response.healing_log.expect("healing ran");
    assert_eq!(log.final_state, HealingState::PartiallyHealed);
    assert_eq!(log.remaining_errors.len(), 1);
    assert_eq!(log.remaining_errors[0].code, IssueCode::OccasionMismatch);
    assert!(log.attempts_made <= ComposerSettings::default().healing.max_attempts());
}

/// With no escalations allowed only one strategy is attempted.
#[test]
fn test_attempt_budget_from_settings() {
    init_tracing();
    let mut settings = ComposerSettings::default();
    settings.healing.max_escalations = 0;
    let composer = OutfitComposer::new(settings).expect("valid settings");

    let wardrobe = business_wardrobe();
    let response = composer.revalidate_at(
        &OutfitRequest::new("Business Formal", ""),
        &wardrobe,
        &wardrobe,
        fixed_now(),
    );

    let log = response.healing_log.expect("healing ran");
    assert_eq!(log.attempts_made, 1);
    assert_eq!(log.strategies_tried.len(), 1);
}

/// A wardrobe with no shoes at all: healing cannot invent any, and the
/// response names the missing category.
#[test]
fn test_missing_shoes_reported() {
    init_tracing();
    let wardrobe = vec![
        item("tee", "Crew tee", "t-shirt"),
        item("jeans", "Dark jeans", "jeans"),
    ];
    let response =
        composer().compose_at(&OutfitRequest::new("casual", ""), &wardrobe, fixed_now());

    assert_eq!(response.generation_strategy, GenerationStrategy::BestEffort);
    assert_eq!(response.missing_categories, vec![Category::Shoes]);
    assert_eq!(ids(&response.items), vec!["tee", "jeans"]);
    assert!(response
        .validation
        .errors
        .iter()
        .any(|e| e.code == IssueCode::MissingCategory));
}
