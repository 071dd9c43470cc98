//! Scored selector.
//!
//! Picks items category by category from the filtered candidates. Within a
//! category candidates are ranked by relevance (harmony is computed against
//! what is already selected, so ranking is redone per category) and the best
//! item the invariant gate accepts is appended.
//!
//! Order: the dress anchor first when the context chose the dress shape,
//! then tops, bottoms, shoes, outerwear and accessories. Required and
//! preferred counts are filled first; optional extras are only added when
//! they score at least [`OPTIONAL_MIN_SCORE`]. Category limits cap
//! everything; `max_total_items` caps the extras across the whole outfit.

use std::sync::Arc;

use outfit_types::{CategoryLimits, ClothingItem};
use tracing::debug;

use crate::classifier::{ItemClassifier, ItemProfile};
use crate::context::GenerationContext;
use crate::gate;
use crate::scoring::{RelevanceScorer, ScoredItem};
use crate::selection::{category_limit, SelectionState};
use crate::types::Category;

/// Minimum relevance for an optional extra.
pub const OPTIONAL_MIN_SCORE: f32 = 0.45;

/// Fill order after the anchor.
const FILL_ORDER: [Category; 5] = [
    Category::Top,
    Category::Bottom,
    Category::Shoes,
    Category::Outerwear,
    Category::Accessory,
];

pub struct ScoredSelector {
    classifier: Arc<ItemClassifier>,
    scorer: RelevanceScorer,
    limits: CategoryLimits,
}

impl ScoredSelector {
    pub fn new(
        classifier: Arc<ItemClassifier>,
        scorer: RelevanceScorer,
        limits: CategoryLimits,
    ) -> Self {
        Self {
            classifier,
            scorer,
            limits,
        }
    }

    pub fn classifier(&self) -> &Arc<ItemClassifier> {
        &self.classifier
    }

    pub fn scorer(&self) -> &RelevanceScorer {
        &self.scorer
    }

    /// Select an outfit from `candidates`.
    pub fn select(&self, candidates: &[ClothingItem], ctx: &GenerationContext) -> SelectionState {
        let profiled: Vec<(&ClothingItem, ItemProfile)> = candidates
            .iter()
            .map(|item| (item, self.classifier.describe(item)))
            .collect();
        let mut state = SelectionState::new();

        if ctx.target_counts.anchor == Some(Category::Dress) {
            self.fill(&mut state, &profiled, ctx, Category::Dress, 1, 0);
            if !state.has_dress() {
                debug!("No dress passed selection, falling back to separates");
            }
        }

        let targets = ctx.effective_targets(state.has_dress()).clone();
        for category in FILL_ORDER {
            let desired = targets.desired_count(category);
            let optional = targets.optional_count(category);
            if desired == 0 && optional == 0 {
                continue;
            }
            self.fill(&mut state, &profiled, ctx, category, desired, optional);
        }

        debug!(
            selected = state.len(),
            skipped = state.skipped.len(),
            has_dress = state.has_dress(),
            "Selection complete"
        );
        state
    }

    /// Fill one category up to `desired`, then up to `optional` extras.
    fn fill(
        &self,
        state: &mut SelectionState,
        profiled: &[(&ClothingItem, ItemProfile)],
        ctx: &GenerationContext,
        category: Category,
        desired: usize,
        optional: usize,
    ) {
        let limit = category_limit(&self.limits, category, ctx.is_minimalist());
        let want = desired.min(limit);
        let ceiling = (desired + optional).min(limit);

        // Every ranked candidate passes through the gate so the skip log
        // explains each item left out
        for scored in self.rank_category(state, profiled, ctx, category) {
            let decision = gate::can_add(state, scored.item, &scored.profile);
            if !decision.can_add {
                state.record_skip(scored.item, category, decision.reason);
                continue;
            }

            let count = state.count(category);
            if count >= ceiling {
                state.record_skip(scored.item, category, "category limit reached");
                continue;
            }
            if count >= want && state.len() >= self.limits.max_total_items {
                state.record_skip(scored.item, category, "outfit item limit reached");
                continue;
            }
            if count >= want && scored.score.total < OPTIONAL_MIN_SCORE {
                state.record_skip(
                    scored.item,
                    category,
                    format!("score {:.2} below optional threshold", scored.score.total),
                );
                continue;
            }

            debug!(
                item_id = %scored.item.id,
                category = %category,
                score = scored.score.total,
                "Selected item"
            );
            state.push(scored.item.clone(), &scored.profile);
        }
    }

    fn rank_category<'a>(
        &self,
        state: &SelectionState,
        profiled: &[(&'a ClothingItem, ItemProfile)],
        ctx: &GenerationContext,
        category: Category,
    ) -> Vec<ScoredItem<'a>> {
        let selected: Vec<&ClothingItem> = state.selected_items.iter().collect();
        self.scorer.rank(
            profiled
                .iter()
                .filter(|(_, profile)| profile.category == category)
                .map(|(item, profile)| (*item, *profile)),
            ctx,
            &selected,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ContextBuilder;
    use crate::tables::CompatibilityTables;
    use outfit_types::{OutfitRequest, ScoringWeights, Weather};

    fn setup() -> (ScoredSelector, ContextBuilder) {
        let classifier = Arc::new(ItemClassifier::new());
        let tables = CompatibilityTables::builtin();
        (
            ScoredSelector::new(
                classifier.clone(),
                RelevanceScorer::new(ScoringWeights::default(), tables.clone()),
                CategoryLimits::default(),
            ),
            ContextBuilder::new(tables, classifier),
        )
    }

    fn ids(state: &SelectionState) -> Vec<&str> {
        state.selected_items.iter().map(|i| i.id.as_str()).collect()
    }

    #[test]
    fn test_selects_one_per_required_category() {
        let (selector, builder) = setup();
        let wardrobe = vec![
            ClothingItem::new("tee", "u", "", "t-shirt").with_style(&["casual"]),
            ClothingItem::new("jeans", "u", "", "jeans").with_style(&["casual"]),
            ClothingItem::new("chinos", "u", "", "chinos").with_style(&["preppy"]),
            ClothingItem::new("sneakers", "u", "", "sneakers").with_style(&["casual"]),
        ];
        let ctx = builder.build(&OutfitRequest::new("casual", "casual"), &wardrobe);
        let state = selector.select(&wardrobe, &ctx);
        assert_eq!(ids(&state), vec!["tee", "jeans", "sneakers"]);
    }

    #[test]
    fn test_second_dress_rejected_with_reason() {
        let (selector, builder) = setup();
        let wardrobe = vec![
            ClothingItem::new("d1", "u", "", "dress").with_occasion(&["party"]),
            ClothingItem::new("d2", "u", "", "dress").with_occasion(&["party"]),
            ClothingItem::new("heels", "u", "", "heels"),
        ];
        let ctx = builder.build(&OutfitRequest::new("party", ""), &wardrobe);
        assert!(ctx.dress_eligible);

        let state = selector.select(&wardrobe, &ctx);
        assert_eq!(state.count(Category::Dress), 1);
        assert!(state
            .skipped
            .iter()
            .any(|s| s.item_id == "d2" && s.reason == "duplicate dress"));
    }

    #[test]
    fn test_dress_anchor_excludes_separates() {
        let (selector, builder) = setup();
        let wardrobe = vec![
            ClothingItem::new("dress", "u", "", "dress").with_occasion(&["wedding"]),
            ClothingItem::new("blouse", "u", "", "blouse").with_occasion(&["wedding"]),
            ClothingItem::new("skirt", "u", "", "skirt").with_occasion(&["wedding"]),
            ClothingItem::new("pumps", "u", "", "pumps").with_occasion(&["wedding"]),
        ];
        let ctx = builder.build(&OutfitRequest::new("wedding", ""), &wardrobe);
        let state = selector.select(&wardrobe, &ctx);
        assert_eq!(ids(&state), vec!["dress", "pumps"]);
    }

    #[test]
    fn test_cold_weather_adds_mid_layer_not_second_shirt() {
        let (selector, builder) = setup();
        let wardrobe = vec![
            ClothingItem::new("shirt", "u", "", "shirt"),
            ClothingItem::new("polo", "u", "", "polo"),
            ClothingItem::new("sweater", "u", "", "sweater"),
            ClothingItem::new("jeans", "u", "", "jeans"),
            ClothingItem::new("boots", "u", "", "boots"),
            ClothingItem::new("coat", "u", "", "coat"),
        ];
        let request = OutfitRequest::new("", "").with_weather(Weather::new(40.0, "cloudy"));
        let ctx = builder.build(&request, &wardrobe);
        let state = selector.select(&wardrobe, &ctx);

        assert_eq!(state.count(Category::Top), 2);
        assert_eq!(state.shirts, 1);
        assert_eq!(state.count(Category::Outerwear), 1);
        assert!(state.skipped.iter().any(|s| s.reason == "duplicate shirt"));
    }

    #[test]
    fn test_minimalist_limits_accessories() {
        let (selector, builder) = setup();
        let mut wardrobe = vec![
            ClothingItem::new("tee", "u", "", "t-shirt"),
            ClothingItem::new("jeans", "u", "", "jeans"),
            ClothingItem::new("shoes", "u", "", "loafers"),
        ];
        for i in 0..4 {
            wardrobe.push(
                ClothingItem::new(&format!("acc{i}"), "u", "", "necklace")
                    .with_style(&["minimalist"])
                    .with_favorite(true),
            );
        }
        let ctx = builder.build(&OutfitRequest::new("", "minimalist"), &wardrobe);
        let state = selector.select(&wardrobe, &ctx);
        assert_eq!(state.count(Category::Accessory), 1);
    }

    #[test]
    fn test_total_limit_stops_extras_not_required_items() {
        let classifier = Arc::new(ItemClassifier::new());
        let tables = CompatibilityTables::builtin();
        let limits = CategoryLimits {
            max_total_items: 3,
            ..CategoryLimits::default()
        };
        let selector = ScoredSelector::new(
            classifier.clone(),
            RelevanceScorer::new(ScoringWeights::default(), tables.clone()),
            limits,
        );
        let builder = ContextBuilder::new(tables, classifier);
        let wardrobe = vec![
            ClothingItem::new("tee", "u", "", "t-shirt"),
            ClothingItem::new("jeans", "u", "", "jeans"),
            ClothingItem::new("shoes", "u", "", "loafers"),
            ClothingItem::new("necklace", "u", "", "necklace")
                .with_style(&["minimalist"])
                .with_favorite(true),
        ];
        let ctx = builder.build(&OutfitRequest::new("", "minimalist"), &wardrobe);
        let state = selector.select(&wardrobe, &ctx);

        assert_eq!(ids(&state), vec!["tee", "jeans", "shoes"]);
        assert!(state
            .skipped
            .iter()
            .any(|s| s.item_id == "necklace" && s.reason == "outfit item limit reached"));
    }

    #[test]
    fn test_empty_candidates() {
        let (selector, builder) = setup();
        let ctx = builder.build(&OutfitRequest::default(), &[]);
        let state = selector.select(&[], &ctx);
        assert!(state.is_empty());
    }
}
