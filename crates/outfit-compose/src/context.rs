//! Generation context.
//!
//! A `GenerationContext` is built once per request and is read-only after
//! that. It resolves everything later stages would otherwise recompute:
//! the occasion class and its formality rule, target counts for both outfit
//! shapes (separates and dress), the layering rule for the temperature and
//! the compatibility sets for the requested style, occasion and mood.
//!
//! Building never fails. Missing inputs fall back to permissive defaults:
//! an unknown occasion requires top, bottom and shoes and accepts any
//! formality; unknown weather selects the `Light` layering rule.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use outfit_types::{normalize_tag, ClothingItem, Formality, OutfitRequest, UserProfile, Weather};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::classifier::ItemClassifier;
use crate::rules::{occasion_verdict, OccasionQuery, OccasionVerdict};
use crate::tables::{CompatibilityTables, StyleMatch};
use crate::types::{Category, LayeringRule, OccasionClass, TargetCounts};

/// Styles that carry more than one accessory.
const ACCESSORY_HEAVY_STYLES: &[&str] = &["bohemian", "glamorous", "glam", "maximalist"];

/// Formality rule resolved for the occasion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OccasionRule {
    pub class: OccasionClass,
    pub min_formality: Formality,
    pub max_formality: Formality,
    /// Sneakers, trainers and similar are blocking errors
    pub forbids_athletic_footwear: bool,
}

impl OccasionRule {
    pub fn for_class(class: OccasionClass) -> Self {
        let (min_formality, max_formality) = class.formality_range();
        Self {
            class,
            min_formality,
            max_formality,
            forbids_athletic_footwear: class == OccasionClass::Formal,
        }
    }

    pub fn accepts(&self, formality: Formality) -> bool {
        formality >= self.min_formality && formality <= self.max_formality
    }

    /// Distance in levels from the accepted range (0 when inside).
    pub fn formality_gap(&self, formality: Formality) -> u8 {
        if formality < self.min_formality {
            self.min_formality.level() - formality.level()
        } else if formality > self.max_formality {
            formality.level() - self.max_formality.level()
        } else {
            0
        }
    }
}

/// Per-request context shared by every pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationContext {
    pub occasion: String,
    pub occasion_class: OccasionClass,
    pub style: String,
    pub mood: Option<String>,
    pub weather: Weather,
    pub profile: UserProfile,
    pub generated_at: DateTime<Utc>,

    /// Targets for the shape the selector should build
    pub target_counts: TargetCounts,
    /// Targets when top and bottom are worn
    pub separates_counts: TargetCounts,
    /// Targets when a dress is the anchor
    pub dress_counts: TargetCounts,
    /// Whether the dress shape is chosen for this request
    pub dress_eligible: bool,

    pub layering_rule: LayeringRule,
    /// Requested and preferred styles mapped to their compatible styles
    pub style_matrix: BTreeMap<String, BTreeSet<String>>,
    pub occasion_fallbacks: BTreeSet<String>,
    pub compatible_moods: BTreeSet<String>,
    pub occasion_rule: OccasionRule,
}

impl GenerationContext {
    /// Targets for an outfit with or without a dress.
    pub fn effective_targets(&self, has_dress: bool) -> &TargetCounts {
        if has_dress {
            &self.dress_counts
        } else {
            &self.separates_counts
        }
    }

    /// Categories the filter must never empty.
    pub fn protected_categories(&self) -> BTreeSet<Category> {
        let mut protected: BTreeSet<Category> = self
            .separates_counts
            .required_categories()
            .chain(self.dress_counts.required_categories())
            .collect();
        if self.dress_eligible {
            protected.insert(Category::Dress);
        }
        protected
    }

    pub fn occasion_query(&self) -> OccasionQuery<'_> {
        OccasionQuery {
            occasion: &self.occasion,
            fallbacks: &self.occasion_fallbacks,
            class: self.occasion_class,
        }
    }

    /// Match an item's style tags against the requested style.
    pub fn style_match(&self, tags: &[String]) -> StyleMatch {
        if tags.is_empty() {
            return StyleMatch::Untagged;
        }
        if tags.iter().any(|t| *t == self.style) {
            return StyleMatch::Exact;
        }
        match self.style_matrix.get(&self.style) {
            Some(compatible) if tags.iter().any(|t| compatible.contains(t)) => {
                StyleMatch::Compatible
            }
            _ => StyleMatch::None,
        }
    }

    /// Whether any tag matches one of the user's stated style preferences.
    pub fn matches_preferences(&self, tags: &[String]) -> bool {
        self.profile.style_preferences.iter().any(|pref| {
            tags.iter().any(|t| {
                t == pref
                    || self
                        .style_matrix
                        .get(pref)
                        .is_some_and(|compatible| compatible.contains(t))
            })
        })
    }

    /// Whether the item's mood tags fit the requested mood.
    pub fn mood_match(&self, tags: &[String]) -> Option<bool> {
        let mood = self.mood.as_deref()?;
        if tags.is_empty() {
            return None;
        }
        Some(
            tags.iter()
                .any(|t| t == mood || self.compatible_moods.contains(t)),
        )
    }

    pub fn is_minimalist(&self) -> bool {
        self.style == "minimalist" || self.style == "minimal"
    }
}

/// Builds `GenerationContext` values from requests.
pub struct ContextBuilder {
    tables: Arc<CompatibilityTables>,
    classifier: Arc<ItemClassifier>,
}

impl ContextBuilder {
    pub fn new(tables: Arc<CompatibilityTables>, classifier: Arc<ItemClassifier>) -> Self {
        Self { tables, classifier }
    }

    pub fn build(&self, request: &OutfitRequest, wardrobe: &[ClothingItem]) -> GenerationContext {
        self.build_at(request, wardrobe, Utc::now())
    }

    /// Build with an explicit clock, used for recency scoring.
    pub fn build_at(
        &self,
        request: &OutfitRequest,
        wardrobe: &[ClothingItem],
        now: DateTime<Utc>,
    ) -> GenerationContext {
        let occasion = normalize_tag(&request.occasion);
        let style = normalize_tag(&request.style);
        let mood = request
            .mood
            .as_deref()
            .map(normalize_tag)
            .filter(|m| !m.is_empty());

        let occasion_class = OccasionClass::from_occasion(&occasion);
        let layering_rule = LayeringRule::for_temperature(request.weather.temperature_f);
        let occasion_fallbacks = self.tables.fallback_occasions(&occasion).clone();
        let compatible_moods = mood
            .as_deref()
            .map(|m| self.tables.compatible_moods(m).clone())
            .unwrap_or_default();

        let mut style_matrix = BTreeMap::new();
        for s in std::iter::once(&style).chain(&request.profile.style_preferences) {
            if !s.is_empty() {
                style_matrix.insert(s.clone(), self.tables.compatible_styles(s).clone());
            }
        }

        let separates_counts = separates_targets(occasion_class, &style, layering_rule);
        let dress_counts = dress_targets(layering_rule);

        let query = OccasionQuery {
            occasion: &occasion,
            fallbacks: &occasion_fallbacks,
            class: occasion_class,
        };
        let dress_eligible =
            occasion_class.allows_dress() && self.has_suitable_dress(wardrobe, &query);
        let target_counts = if dress_eligible {
            dress_counts.clone()
        } else {
            separates_counts.clone()
        };

        debug!(
            occasion = %occasion,
            class = occasion_class.as_str(),
            layering = layering_rule.as_str(),
            dress_eligible,
            "Built generation context"
        );

        GenerationContext {
            occasion,
            occasion_class,
            style,
            mood,
            weather: request.weather,
            profile: request.profile.clone(),
            generated_at: now,
            target_counts,
            separates_counts,
            dress_counts,
            dress_eligible,
            layering_rule,
            style_matrix,
            occasion_fallbacks,
            compatible_moods,
            occasion_rule: OccasionRule::for_class(occasion_class),
        }
    }

    /// A dress is chosen when one is tagged for the occasion, or when the
    /// wardrobe cannot make a separates outfit at all.
    fn has_suitable_dress(&self, wardrobe: &[ClothingItem], query: &OccasionQuery<'_>) -> bool {
        let mut has_top = false;
        let mut has_bottom = false;
        let mut tagged_dress = false;
        let mut any_dress = false;

        for item in wardrobe {
            let profile = self.classifier.describe(item);
            match profile.category {
                Category::Top => has_top = true,
                Category::Bottom => has_bottom = true,
                Category::Dress => {
                    any_dress = true;
                    let verdict = occasion_verdict(item, &profile, query, &self.tables);
                    if matches!(
                        verdict,
                        OccasionVerdict::Match | OccasionVerdict::FallbackMatch
                    ) {
                        tagged_dress = true;
                    }
                }
                _ => {}
            }
        }

        any_dress && (tagged_dress || !has_top || !has_bottom)
    }
}

fn apply_layering(mut counts: TargetCounts, rule: LayeringRule) -> TargetCounts {
    if rule.requires_outerwear() {
        counts = counts.require(Category::Outerwear, 1);
    } else if rule.prefers_outerwear() {
        counts = counts.prefer(Category::Outerwear, 1);
    }
    counts
}

fn separates_targets(class: OccasionClass, style: &str, rule: LayeringRule) -> TargetCounts {
    let accessories = if ACCESSORY_HEAVY_STYLES.contains(&style) { 2 } else { 1 };

    let mut counts = match class {
        OccasionClass::Athletic => TargetCounts::default()
            .require(Category::Top, 1)
            .require(Category::Bottom, 1)
            .require(Category::Shoes, 1)
            .allow(Category::Outerwear, 1)
            .allow(Category::Accessory, 1),
        OccasionClass::Loungewear => TargetCounts::default()
            .require(Category::Top, 1)
            .require(Category::Shoes, 1)
            .allow(Category::Bottom, 1)
            .allow(Category::Accessory, 1),
        OccasionClass::Formal | OccasionClass::Business => TargetCounts::default()
            .require(Category::Top, 1)
            .require(Category::Bottom, 1)
            .require(Category::Shoes, 1)
            .prefer(Category::Outerwear, 1)
            .allow(Category::Accessory, accessories),
        OccasionClass::Casual | OccasionClass::Generic => TargetCounts::default()
            .require(Category::Top, 1)
            .require(Category::Bottom, 1)
            .require(Category::Shoes, 1)
            .allow(Category::Outerwear, 1)
            .allow(Category::Accessory, accessories),
    };

    counts = apply_layering(counts, rule);
    if rule.prefers_mid_layer() {
        counts = counts.prefer(Category::Top, 2);
    }
    counts
}

/// A dress subsumes top and bottom: only shoes are required.
fn dress_targets(rule: LayeringRule) -> TargetCounts {
    let counts = TargetCounts::default()
        .with_anchor(Category::Dress)
        .require(Category::Shoes, 1)
        .prefer(Category::Outerwear, 1)
        .allow(Category::Accessory, 2);
    apply_layering(counts, rule)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder() -> ContextBuilder {
        ContextBuilder::new(CompatibilityTables::builtin(), Arc::new(ItemClassifier::new()))
    }

    #[test]
    fn test_unknown_occasion_is_permissive() {
        let ctx = builder().build(&OutfitRequest::default(), &[]);
        assert_eq!(ctx.occasion_class, OccasionClass::Generic);
        assert_eq!(ctx.layering_rule, LayeringRule::Light);
        assert!(!ctx.dress_eligible);
        let required: Vec<Category> = ctx.target_counts.required_categories().collect();
        assert_eq!(required, vec![Category::Top, Category::Bottom, Category::Shoes]);
        assert!(ctx.occasion_rule.accepts(Formality::Athletic));
    }

    #[test]
    fn test_athletic_targets() {
        let ctx = builder().build(&OutfitRequest::new("Athletic", "sporty"), &[]);
        assert_eq!(ctx.occasion_class, OccasionClass::Athletic);
        assert!(ctx.target_counts.is_required(Category::Bottom));
        assert!(!ctx.target_counts.is_required(Category::Outerwear));
    }

    #[test]
    fn test_loungewear_bottom_optional() {
        let ctx = builder().build(&OutfitRequest::new("loungewear", "cozy"), &[]);
        assert!(!ctx.target_counts.is_required(Category::Bottom));
        assert_eq!(ctx.target_counts.optional_count(Category::Bottom), 1);
    }

    #[test]
    fn test_dress_with_no_bottoms_requires_only_shoes() {
        let wardrobe = vec![
            ClothingItem::new("d", "u", "Black dress", "dress").with_occasion(&["formal"]),
            ClothingItem::new("h", "u", "Heels", "heels"),
        ];
        let ctx = builder().build(&OutfitRequest::new("formal", "elegant"), &wardrobe);
        assert!(ctx.dress_eligible);
        let required: Vec<Category> = ctx.target_counts.required_categories().collect();
        assert_eq!(required, vec![Category::Shoes]);
        assert_eq!(ctx.target_counts.anchor, Some(Category::Dress));
        assert!(ctx.protected_categories().contains(&Category::Dress));
    }

    #[test]
    fn test_untagged_dress_loses_to_complete_separates() {
        let wardrobe = vec![
            ClothingItem::new("d", "u", "", "dress"),
            ClothingItem::new("t", "u", "", "blouse"),
            ClothingItem::new("b", "u", "", "skirt"),
        ];
        let ctx = builder().build(&OutfitRequest::new("dinner", ""), &wardrobe);
        assert!(!ctx.dress_eligible);
    }

    #[test]
    fn test_dress_never_eligible_for_athletic() {
        let wardrobe = vec![ClothingItem::new("d", "u", "", "dress").with_occasion(&["gym"])];
        let ctx = builder().build(&OutfitRequest::new("gym", ""), &wardrobe);
        assert!(!ctx.dress_eligible);
    }

    #[test]
    fn test_cold_weather_requires_outerwear() {
        let request = OutfitRequest::new("casual", "classic").with_weather(Weather::new(35.0, "snow"));
        let ctx = builder().build(&request, &[]);
        assert_eq!(ctx.layering_rule, LayeringRule::Warm);
        assert!(ctx.target_counts.is_required(Category::Outerwear));
        assert_eq!(ctx.target_counts.desired_count(Category::Top), 2);
        assert!(ctx.dress_counts.is_required(Category::Outerwear));
    }

    #[test]
    fn test_style_match_via_matrix() {
        let request = OutfitRequest::new("casual", "minimalist")
            .with_profile(UserProfile::default().with_style_preferences(&["vintage"]));
        let ctx = builder().build(&request, &[]);
        assert_eq!(ctx.style_match(&["minimalist".to_string()]), StyleMatch::Exact);
        assert_eq!(ctx.style_match(&["classic".to_string()]), StyleMatch::Compatible);
        assert_eq!(ctx.style_match(&["grunge".to_string()]), StyleMatch::None);
        assert!(ctx.matches_preferences(&["vintage".to_string()]));
        assert!(!ctx.matches_preferences(&["sporty".to_string()]));
        assert!(ctx.is_minimalist());
    }

    #[test]
    fn test_mood_match() {
        let request = OutfitRequest::new("casual", "").with_mood("Relaxed");
        let ctx = builder().build(&request, &[]);
        assert_eq!(ctx.mood_match(&["cozy".to_string()]), Some(true));
        assert_eq!(ctx.mood_match(&["bold".to_string()]), Some(false));
        assert_eq!(ctx.mood_match(&[]), None);
    }

    #[test]
    fn test_formality_gap() {
        let rule = OccasionRule::for_class(OccasionClass::Formal);
        assert_eq!(rule.formality_gap(Formality::Casual), 2);
        assert_eq!(rule.formality_gap(Formality::Formal), 0);
        assert!(rule.forbids_athletic_footwear);
    }
}
