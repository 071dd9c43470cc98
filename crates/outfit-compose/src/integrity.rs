//! Structural integrity checker.
//!
//! Makes sure every required category of the outfit's shape is present.
//! Gaps are filled from the filtered candidates first and the full wardrobe
//! second, always through the invariant gate. A category nothing can fill
//! is recorded as unfillable and left for the validator to report.

use std::sync::Arc;

use outfit_types::ClothingItem;
use tracing::{debug, warn};

use crate::classifier::{ItemClassifier, ItemProfile};
use crate::context::GenerationContext;
use crate::gate;
use crate::scoring::RelevanceScorer;
use crate::selection::{RepairRecord, RepairSource, SelectionState};
use crate::types::Category;

pub struct IntegrityChecker {
    classifier: Arc<ItemClassifier>,
    scorer: RelevanceScorer,
}

impl IntegrityChecker {
    pub fn new(classifier: Arc<ItemClassifier>, scorer: RelevanceScorer) -> Self {
        Self { classifier, scorer }
    }

    /// Fill missing required categories. Items already selected are kept.
    pub fn ensure_complete(
        &self,
        mut state: SelectionState,
        candidates: &[ClothingItem],
        wardrobe: &[ClothingItem],
        ctx: &GenerationContext,
    ) -> SelectionState {
        let targets = ctx.effective_targets(state.has_dress()).clone();

        for category in targets.required_categories() {
            let needed = targets.required_count(category);
            while state.count(category) < needed {
                let found = self
                    .find(&state, candidates, category, ctx)
                    .map(|hit| (hit, RepairSource::Candidates))
                    .or_else(|| {
                        self.find(&state, wardrobe, category, ctx)
                            .map(|hit| (hit, RepairSource::Wardrobe))
                    });

                let Some(((item, profile), source)) = found else {
                    warn!(category = %category, "No item can fill required category");
                    state.mark_unfillable(category);
                    break;
                };

                debug!(
                    item_id = %item.id,
                    category = %category,
                    source = ?source,
                    "Filled missing category"
                );
                state.repairs.push(RepairRecord {
                    category,
                    item_id: item.id.clone(),
                    index: state.len(),
                    source,
                });
                state.push(item, &profile);
            }
        }

        state
    }

    /// Required categories of the state's shape that are still empty.
    pub fn missing(&self, state: &SelectionState, ctx: &GenerationContext) -> Vec<Category> {
        ctx.effective_targets(state.has_dress())
            .required_categories()
            .filter(|c| state.count(*c) == 0)
            .collect()
    }

    /// Best-ranked item of `category` in `pool` that the gate accepts.
    fn find(
        &self,
        state: &SelectionState,
        pool: &[ClothingItem],
        category: Category,
        ctx: &GenerationContext,
    ) -> Option<(ClothingItem, ItemProfile)> {
        let selected: Vec<&ClothingItem> = state.selected_items.iter().collect();
        let matching = pool.iter().filter_map(|item| {
            let profile = self.classifier.describe(item);
            (profile.category == category && !state.contains(item)).then_some((item, profile))
        });

        self.scorer
            .rank(matching, ctx, &selected)
            .into_iter()
            .find(|scored| gate::can_add(state, scored.item, &scored.profile).can_add)
            .map(|scored| (scored.item.clone(), scored.profile))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ContextBuilder;
    use crate::tables::CompatibilityTables;
    use outfit_types::{OutfitRequest, ScoringWeights};

    fn setup() -> (IntegrityChecker, ContextBuilder, Arc<ItemClassifier>) {
        let classifier = Arc::new(ItemClassifier::new());
        let tables = CompatibilityTables::builtin();
        (
            IntegrityChecker::new(
                classifier.clone(),
                RelevanceScorer::new(ScoringWeights::default(), tables.clone()),
            ),
            ContextBuilder::new(tables, classifier.clone()),
            classifier,
        )
    }

    #[test]
    fn test_fills_from_candidates_then_wardrobe() {
        let (checker, builder, classifier) = setup();
        let tee = ClothingItem::new("tee", "u", "", "t-shirt");
        let jeans = ClothingItem::new("jeans", "u", "", "jeans");
        let boots = ClothingItem::new("boots", "u", "", "boots");
        let wardrobe = vec![tee.clone(), jeans.clone(), boots];
        let ctx = builder.build(&OutfitRequest::default(), &wardrobe);

        let state = SelectionState::from_items(&[tee], &classifier);
        let state = checker.ensure_complete(state, &[jeans], &wardrobe, &ctx);

        assert_eq!(state.len(), 3);
        assert_eq!(state.repairs.len(), 2);
        assert_eq!(state.repairs[0].source, RepairSource::Candidates);
        assert_eq!(state.repairs[1].category, Category::Shoes);
        assert_eq!(state.repairs[1].source, RepairSource::Wardrobe);
        assert!(state.unfillable.is_empty());
    }

    #[test]
    fn test_unfillable_category_recorded() {
        let (checker, builder, classifier) = setup();
        let wardrobe = vec![
            ClothingItem::new("tee", "u", "", "t-shirt"),
            ClothingItem::new("jeans", "u", "", "jeans"),
        ];
        let ctx = builder.build(&OutfitRequest::default(), &wardrobe);
        let state = SelectionState::from_items(&wardrobe, &classifier);
        let state = checker.ensure_complete(state, &wardrobe, &wardrobe, &ctx);

        assert_eq!(state.unfillable, vec![Category::Shoes]);
        assert_eq!(checker.missing(&state, &ctx), vec![Category::Shoes]);
    }

    #[test]
    fn test_dress_outfit_needs_no_bottom() {
        let (checker, builder, classifier) = setup();
        let dress = ClothingItem::new("dress", "u", "", "dress").with_occasion(&["formal"]);
        let heels = ClothingItem::new("heels", "u", "", "heels");
        let wardrobe = vec![dress.clone(), heels];
        let ctx = builder.build(&OutfitRequest::new("formal", ""), &wardrobe);

        let state = SelectionState::from_items(&[dress], &classifier);
        let state = checker.ensure_complete(state, &wardrobe, &wardrobe, &ctx);

        assert_eq!(state.count(Category::Bottom), 0);
        assert_eq!(state.count(Category::Shoes), 1);
        assert!(state.unfillable.is_empty());
    }

    #[test]
    fn test_selected_id_never_reused() {
        let (checker, builder, classifier) = setup();
        let shirt = ClothingItem::new("x", "u", "", "shirt");
        // Same id under a different type must not fill the bottom slot
        let wardrobe = vec![
            shirt.clone(),
            ClothingItem::new("x", "u", "", "jeans"),
            ClothingItem::new("flats", "u", "", "flats"),
        ];
        let ctx = builder.build(&OutfitRequest::default(), &wardrobe);
        let state = SelectionState::from_items(&[shirt], &classifier);
        let state = checker.ensure_complete(state, &wardrobe, &wardrobe, &ctx);
        assert_eq!(state.unfillable, vec![Category::Bottom]);
        assert_eq!(state.count(Category::Shoes), 1);
    }
}
