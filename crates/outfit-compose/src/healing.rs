//! Fallback and healing orchestrator.
//!
//! A bounded state machine over `(outfit, errors)`:
//!
//! ```text
//! Diagnosed -> Fixing(strategy) -> Revalidating -> ... -> Healed
//!                                                      | PartiallyHealed
//!                                                      | ScratchRegenerated
//! ```
//!
//! Strategies run in a fixed order, one pass each, and the orchestrator
//! only escalates while blocking errors remain:
//!
//! 1. Duplicate fix: replay the outfit through the invariant gate, drop the
//!    later offender and refill gaps through the integrity checker.
//! 2. Weather fix: swap a flagged item for a weather-appropriate one in the
//!    same category, or drop it when the category is not required.
//! 3. Style fix: same, for occasion and formality errors.
//! 4. Scratch regeneration: rerun the whole pipeline with relaxed filters.
//!    It runs first instead when the outfit is empty or every required
//!    category is missing.
//!
//! A strategy's outfit is adopted only when it has strictly fewer errors
//! than the current one, so healing never makes an outfit worse. The
//! attempt budget bounds the loop; on exhaustion the best outfit so far is
//! returned with its remaining errors.

use std::fmt;
use std::sync::Arc;

use outfit_types::{CategoryLimits, ClothingItem, HealingSettings};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::classifier::ItemProfile;
use crate::context::GenerationContext;
use crate::filter::FilterMode;
use crate::gate;
use crate::pipeline::Pipeline;
use crate::selection::{category_limit, same_item, SelectionState};
use crate::types::Category;
use crate::validator::{
    FinalValidator, IssueCode, IssueLevel, OccasionValidator, OutfitValidator, ProfiledOutfit,
    ValidationIssue, ValidationResult, WeatherValidator, FORMALITY_CLASH_SPREAD,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealingStrategy {
    DuplicateFix,
    WeatherFix,
    StyleFix,
    ScratchRegeneration,
}

impl HealingStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealingStrategy::DuplicateFix => "duplicate-fix",
            HealingStrategy::WeatherFix => "weather-fix",
            HealingStrategy::StyleFix => "style-fix",
            HealingStrategy::ScratchRegeneration => "scratch-regeneration",
        }
    }
}

impl fmt::Display for HealingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealingState {
    Diagnosed,
    Fixing(HealingStrategy),
    Revalidating,
    Healed,
    PartiallyHealed,
    ScratchRegenerated,
}

/// Which path produced the returned outfit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GenerationStrategy {
    /// Valid straight out of the pipeline
    Direct,
    HealedDuplicate,
    HealedWeather,
    HealedStyle,
    ScratchRegenerated,
    /// Errors remain after the attempt budget
    BestEffort,
}

impl GenerationStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationStrategy::Direct => "direct",
            GenerationStrategy::HealedDuplicate => "healed-duplicate",
            GenerationStrategy::HealedWeather => "healed-weather",
            GenerationStrategy::HealedStyle => "healed-style",
            GenerationStrategy::ScratchRegenerated => "scratch-regenerated",
            GenerationStrategy::BestEffort => "best-effort",
        }
    }

    fn healed_by(strategy: HealingStrategy) -> Self {
        match strategy {
            HealingStrategy::DuplicateFix => GenerationStrategy::HealedDuplicate,
            HealingStrategy::WeatherFix => GenerationStrategy::HealedWeather,
            HealingStrategy::StyleFix => GenerationStrategy::HealedStyle,
            HealingStrategy::ScratchRegeneration => GenerationStrategy::ScratchRegenerated,
        }
    }
}

impl fmt::Display for GenerationStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One item-level change made by a strategy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemChange {
    pub strategy: HealingStrategy,
    pub removed: Option<String>,
    pub added: Option<String>,
    pub reason: String,
}

/// Record of one healing run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealingLog {
    /// Last strategy whose outfit was adopted
    pub strategy_used: Option<HealingStrategy>,
    pub strategies_tried: Vec<HealingStrategy>,
    pub attempts_made: u32,
    pub initial_errors: usize,
    /// Ids of items removed or replaced
    pub items_fixed: Vec<String>,
    pub items_replaced: Vec<ItemChange>,
    pub remaining_errors: Vec<ValidationIssue>,
    pub transitions: Vec<HealingState>,
    pub final_state: HealingState,
}

/// Outfit proposed by a strategy.
#[derive(Debug, Clone)]
pub struct StrategyOutcome {
    pub outfit: Vec<ClothingItem>,
    pub changes: Vec<ItemChange>,
}

/// Everything a strategy may consult. Read-only.
pub struct HealingResources<'a> {
    pub ctx: &'a GenerationContext,
    /// Deduplicated wardrobe
    pub wardrobe: &'a [ClothingItem],
    /// Strict filter output for this request
    pub candidates: &'a [ClothingItem],
    pub pipeline: &'a Pipeline,
}

/// A single repair strategy.
pub trait HealingStep: Send + Sync {
    fn strategy(&self) -> HealingStrategy;

    /// Whether the current errors give this step something to do.
    fn applicable(&self, outfit: &[ClothingItem], validation: &ValidationResult) -> bool;

    /// Propose a repaired outfit, or `None` when nothing could be changed.
    fn apply(
        &self,
        outfit: &[ClothingItem],
        validation: &ValidationResult,
        resources: &HealingResources<'_>,
    ) -> Option<StrategyOutcome>;
}

/// Result of healing an outfit.
#[derive(Debug, Clone)]
pub struct HealingOutcome {
    pub outfit: Vec<ClothingItem>,
    pub validation: ValidationResult,
    pub log: HealingLog,
    pub strategy: GenerationStrategy,
}

pub struct HealingOrchestrator {
    validator: Arc<FinalValidator>,
    steps: Vec<Box<dyn HealingStep>>,
    max_attempts: u32,
}

impl HealingOrchestrator {
    /// Standard strategy chain.
    pub fn new(
        validator: Arc<FinalValidator>,
        weather: WeatherValidator,
        occasion: OccasionValidator,
        limits: CategoryLimits,
        settings: &HealingSettings,
    ) -> Self {
        Self::with_steps(
            validator,
            vec![
                Box::new(DuplicateFix { limits }),
                Box::new(WeatherFix { weather }),
                Box::new(StyleFix { occasion }),
                Box::new(ScratchRegeneration),
            ],
            settings.max_attempts(),
        )
    }

    pub fn with_steps(
        validator: Arc<FinalValidator>,
        steps: Vec<Box<dyn HealingStep>>,
        max_attempts: u32,
    ) -> Self {
        Self {
            validator,
            steps,
            max_attempts,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Heal an outfit the validator rejected.
    pub fn heal(
        &self,
        outfit: Vec<ClothingItem>,
        validation: ValidationResult,
        resources: &HealingResources<'_>,
    ) -> HealingOutcome {
        let ctx = resources.ctx;
        let mut current = outfit;
        let mut current_validation = validation;
        let mut log = HealingLog {
            strategy_used: None,
            strategies_tried: Vec::new(),
            attempts_made: 0,
            initial_errors: current_validation.errors.len(),
            items_fixed: Vec::new(),
            items_replaced: Vec::new(),
            remaining_errors: Vec::new(),
            transitions: vec![HealingState::Diagnosed],
            final_state: HealingState::PartiallyHealed,
        };
        let mut scratch_adopted = false;

        let scratch_first = self.irrecoverable(&current, resources);
        for step in self.plan(scratch_first) {
            if current_validation.valid || log.attempts_made >= self.max_attempts {
                break;
            }
            let strategy = step.strategy();
            let forced = scratch_first && strategy == HealingStrategy::ScratchRegeneration;
            if !forced && !step.applicable(&current, &current_validation) {
                continue;
            }

            log.transitions.push(HealingState::Fixing(strategy));
            log.strategies_tried.push(strategy);
            log.attempts_made += 1;

            let Some(proposal) = step.apply(&current, &current_validation, resources) else {
                debug!(strategy = %strategy, "Strategy made no change");
                continue;
            };

            log.transitions.push(HealingState::Revalidating);
            let revalidated = self.validator.validate(&proposal.outfit, ctx);
            let before = current_validation.errors.len();
            let after = revalidated.errors.len();

            if after < before {
                debug!(strategy = %strategy, before, after, "Adopted healed outfit");
                for change in &proposal.changes {
                    if let Some(id) = &change.removed {
                        log.items_fixed.push(id.clone());
                    }
                }
                log.items_replaced.extend(proposal.changes);
                log.strategy_used = Some(strategy);
                scratch_adopted |= strategy == HealingStrategy::ScratchRegeneration;
                current = proposal.outfit;
                current_validation = revalidated;
            } else {
                debug!(strategy = %strategy, before, after, "Strategy did not reduce errors");
            }
        }

        log.final_state = if scratch_adopted {
            HealingState::ScratchRegenerated
        } else if current_validation.valid {
            HealingState::Healed
        } else {
            HealingState::PartiallyHealed
        };
        log.transitions.push(log.final_state);
        log.remaining_errors = current_validation.errors.clone();

        let strategy = match (scratch_adopted, current_validation.valid, log.strategy_used) {
            (true, _, _) => GenerationStrategy::ScratchRegenerated,
            (false, true, Some(used)) => GenerationStrategy::healed_by(used),
            _ => GenerationStrategy::BestEffort,
        };

        info!(
            strategy = strategy.as_str(),
            attempts = log.attempts_made,
            initial_errors = log.initial_errors,
            remaining_errors = log.remaining_errors.len(),
            "Healing finished"
        );

        HealingOutcome {
            outfit: current,
            validation: current_validation,
            log,
            strategy,
        }
    }

    fn plan(&self, scratch_first: bool) -> Vec<&dyn HealingStep> {
        let mut plan: Vec<&dyn HealingStep> = self.steps.iter().map(|s| s.as_ref()).collect();
        if scratch_first {
            plan.sort_by_key(|s| s.strategy() != HealingStrategy::ScratchRegeneration);
        }
        plan
    }

    /// Empty, or missing every required category of its shape.
    fn irrecoverable(&self, outfit: &[ClothingItem], resources: &HealingResources<'_>) -> bool {
        if outfit.is_empty() {
            return true;
        }
        let classifier = resources.pipeline.selector().classifier();
        let state = SelectionState::from_items(outfit, classifier);
        let mut required = resources
            .ctx
            .effective_targets(state.has_dress())
            .required_categories()
            .peekable();
        required.peek().is_some() && required.all(|c| state.count(c) == 0)
    }
}

/// Items of `category` in candidates, then the wardrobe, that `accept`
/// allows and the gate admits alongside the outfit minus `outfit[skip]`.
fn find_alternative(
    resources: &HealingResources<'_>,
    outfit: &[ClothingItem],
    skip: usize,
    category: Category,
    accept: impl Fn(&ClothingItem, &ItemProfile) -> bool,
) -> Option<ClothingItem> {
    let classifier = resources.pipeline.selector().classifier();
    let scorer = resources.pipeline.selector().scorer();
    let rest: Vec<ClothingItem> = outfit
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != skip)
        .map(|(_, item)| item.clone())
        .collect();
    let state = SelectionState::from_items(&rest, classifier);
    let selected: Vec<&ClothingItem> = rest.iter().collect();

    for pool in [resources.candidates, resources.wardrobe] {
        let matching = pool.iter().filter_map(|item| {
            if outfit.iter().any(|o| same_item(o, item)) {
                return None;
            }
            let profile = classifier.describe(item);
            (profile.category == category && accept(item, &profile)).then_some((item, profile))
        });
        let found = scorer
            .rank(matching, resources.ctx, &selected)
            .into_iter()
            .find(|scored| gate::can_add(&state, scored.item, &scored.profile).can_add);
        if let Some(scored) = found {
            return Some(scored.item.clone());
        }
    }
    None
}

/// Swap `outfit[index]` for an alternative, or drop it when its category is
/// not required for the outfit's shape.
fn swap_or_drop(
    outfit: &mut Vec<ClothingItem>,
    index: usize,
    category: Category,
    alternative: Option<ClothingItem>,
    reason: &str,
    strategy: HealingStrategy,
    resources: &HealingResources<'_>,
) -> Option<ItemChange> {
    let removed = item_label(&outfit[index]);
    let added = match alternative {
        Some(item) => {
            let label = item_label(&item);
            outfit[index] = item;
            Some(label)
        }
        None => {
            let classifier = resources.pipeline.selector().classifier();
            let has_dress = SelectionState::from_items(outfit, classifier).has_dress();
            if resources.ctx.effective_targets(has_dress).is_required(category) {
                return None;
            }
            outfit.remove(index);
            None
        }
    };
    Some(ItemChange {
        strategy,
        removed: Some(removed),
        added,
        reason: reason.to_string(),
    })
}

/// Item-level errors matching `wanted`, first issue per item, with the
/// item's position. Positions come last-first so dropping an item leaves
/// the positions still to visit intact.
fn flagged<'a>(
    validation: &'a ValidationResult,
    wanted: impl Fn(IssueCode) -> bool,
) -> Vec<(usize, &'a ValidationIssue)> {
    let mut out: Vec<(usize, &ValidationIssue)> = Vec::new();
    for issue in &validation.errors {
        let Some(index) = issue.item_index else {
            continue;
        };
        if wanted(issue.code) && !out.iter().any(|(seen, _)| *seen == index) {
            out.push((index, issue));
        }
    }
    out.sort_by(|a, b| b.0.cmp(&a.0));
    out
}

/// Id for logs, or the display name for records without one.
fn item_label(item: &ClothingItem) -> String {
    if item.id.is_empty() {
        item.display_name().to_string()
    } else {
        item.id.clone()
    }
}

/// Replays the outfit through the gate and refills gaps.
pub struct DuplicateFix {
    limits: CategoryLimits,
}

impl HealingStep for DuplicateFix {
    fn strategy(&self) -> HealingStrategy {
        HealingStrategy::DuplicateFix
    }

    fn applicable(&self, _outfit: &[ClothingItem], validation: &ValidationResult) -> bool {
        validation.errors.iter().any(|e| e.code.is_structural())
    }

    fn apply(
        &self,
        outfit: &[ClothingItem],
        _validation: &ValidationResult,
        resources: &HealingResources<'_>,
    ) -> Option<StrategyOutcome> {
        let integrity = resources.pipeline.integrity();
        let classifier = resources.pipeline.selector().classifier();
        let mut state = SelectionState::new();
        let mut changes = Vec::new();

        for item in outfit {
            let profile = classifier.describe(item);
            let decision = gate::can_add(&state, item, &profile);
            let reason = if !decision.can_add {
                Some(decision.reason)
            } else if state.count(profile.category)
                >= category_limit(&self.limits, profile.category, false)
                && profile.category != Category::Other
            {
                Some("category limit reached".to_string())
            } else {
                None
            };

            match reason {
                Some(reason) => changes.push(ItemChange {
                    strategy: self.strategy(),
                    removed: Some(item_label(item)),
                    added: None,
                    reason,
                }),
                None => state.push(item.clone(), &profile),
            }
        }

        let before = state.repairs.len();
        let state = integrity.ensure_complete(state, resources.candidates, resources.wardrobe, resources.ctx);
        for repair in &state.repairs[before..] {
            changes.push(ItemChange {
                strategy: self.strategy(),
                removed: None,
                added: state.selected_items.get(repair.index).map(item_label),
                reason: format!("filled missing {}", repair.category),
            });
        }

        if changes.is_empty() {
            return None;
        }
        Some(StrategyOutcome {
            outfit: state.into_items(),
            changes,
        })
    }
}

/// Swaps items the weather validator flagged.
pub struct WeatherFix {
    weather: WeatherValidator,
}

impl WeatherFix {
    fn suits_weather(&self, item: &ClothingItem, resources: &HealingResources<'_>) -> bool {
        let classifier = resources.pipeline.selector().classifier();
        let single = ProfiledOutfit::new(std::slice::from_ref(item), classifier);
        self.weather
            .check(&single, resources.ctx)
            .iter()
            .all(|issue| issue.item_index.is_none())
    }
}

impl HealingStep for WeatherFix {
    fn strategy(&self) -> HealingStrategy {
        HealingStrategy::WeatherFix
    }

    fn applicable(&self, _outfit: &[ClothingItem], validation: &ValidationResult) -> bool {
        validation
            .errors
            .iter()
            .any(|e| e.code.is_weather() && e.item_index.is_some())
    }

    fn apply(
        &self,
        outfit: &[ClothingItem],
        validation: &ValidationResult,
        resources: &HealingResources<'_>,
    ) -> Option<StrategyOutcome> {
        let mut working = outfit.to_vec();
        let mut changes = Vec::new();

        for (index, issue) in flagged(validation, |c| c.is_weather()) {
            if index >= working.len() {
                continue;
            }
            let Some(category) = issue.category else {
                continue;
            };
            let alternative = find_alternative(resources, &working, index, category, |item, _| {
                self.suits_weather(item, resources)
            });
            if let Some(change) = swap_or_drop(
                &mut working,
                index,
                category,
                alternative,
                &issue.message,
                self.strategy(),
                resources,
            ) {
                changes.push(change);
            }
        }

        (!changes.is_empty()).then_some(StrategyOutcome {
            outfit: working,
            changes,
        })
    }
}

/// Swaps items with blocking occasion, formality or style errors.
pub struct StyleFix {
    occasion: OccasionValidator,
}

impl StyleFix {
    fn suits_occasion(&self, item: &ClothingItem, resources: &HealingResources<'_>) -> bool {
        let classifier = resources.pipeline.selector().classifier();
        let single = ProfiledOutfit::new(std::slice::from_ref(item), classifier);
        self.occasion
            .check(&single, resources.ctx)
            .iter()
            .all(|issue| issue.level != IssueLevel::Error)
    }
}

impl HealingStep for StyleFix {
    fn strategy(&self) -> HealingStrategy {
        HealingStrategy::StyleFix
    }

    fn applicable(&self, _outfit: &[ClothingItem], validation: &ValidationResult) -> bool {
        validation.errors.iter().any(|e| {
            matches!(
                e.code,
                IssueCode::OccasionMismatch | IssueCode::FormalityMismatch | IssueCode::StyleClash
            ) && e.item_index.is_some()
        })
    }

    fn apply(
        &self,
        outfit: &[ClothingItem],
        validation: &ValidationResult,
        resources: &HealingResources<'_>,
    ) -> Option<StrategyOutcome> {
        let classifier = resources.pipeline.selector().classifier();
        let mut working = outfit.to_vec();
        let mut changes = Vec::new();

        let targets = flagged(validation, |c| {
            matches!(
                c,
                IssueCode::OccasionMismatch | IssueCode::FormalityMismatch | IssueCode::StyleClash
            )
        });
        for (index, issue) in targets {
            if index >= working.len() {
                continue;
            }
            let Some(category) = issue.category else {
                continue;
            };

            // Formality levels of the other garments bound a clash swap
            let others: Vec<u8> = working
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != index)
                .map(|(_, item)| classifier.describe(item))
                .filter(|p| !matches!(p.category, Category::Accessory | Category::Other))
                .map(|p| p.formality.level())
                .collect();
            let clash = issue.code == IssueCode::StyleClash;

            let alternative = find_alternative(resources, &working, index, category, |item, profile| {
                if clash {
                    let level = profile.formality.level();
                    let lo = others.iter().copied().chain([level]).min().unwrap_or(level);
                    let hi = others.iter().copied().chain([level]).max().unwrap_or(level);
                    if hi - lo >= FORMALITY_CLASH_SPREAD {
                        return false;
                    }
                }
                self.suits_occasion(item, resources)
            });
            if let Some(change) = swap_or_drop(
                &mut working,
                index,
                category,
                alternative,
                &issue.message,
                self.strategy(),
                resources,
            ) {
                changes.push(change);
            }
        }

        (!changes.is_empty()).then_some(StrategyOutcome {
            outfit: working,
            changes,
        })
    }
}

/// Reruns the pipeline with relaxed filters.
pub struct ScratchRegeneration;

impl HealingStep for ScratchRegeneration {
    fn strategy(&self) -> HealingStrategy {
        HealingStrategy::ScratchRegeneration
    }

    fn applicable(&self, outfit: &[ClothingItem], validation: &ValidationResult) -> bool {
        outfit.is_empty() || validation.has_error(IssueCode::MissingCategory)
    }

    fn apply(
        &self,
        outfit: &[ClothingItem],
        _validation: &ValidationResult,
        resources: &HealingResources<'_>,
    ) -> Option<StrategyOutcome> {
        let run = resources
            .pipeline
            .run(resources.wardrobe, resources.ctx, FilterMode::Relaxed);
        let regenerated = run.state.into_items();
        if regenerated.is_empty() {
            return None;
        }

        let reason = "regenerated with relaxed filters";
        let mut changes: Vec<ItemChange> = outfit
            .iter()
            .filter(|old| !regenerated.iter().any(|new| same_item(new, old)))
            .map(|old| ItemChange {
                strategy: self.strategy(),
                removed: Some(item_label(old)),
                added: None,
                reason: reason.to_string(),
            })
            .collect();
        changes.extend(
            regenerated
                .iter()
                .filter(|new| !outfit.iter().any(|old| same_item(old, new)))
                .map(|new| ItemChange {
                    strategy: self.strategy(),
                    removed: None,
                    added: Some(item_label(new)),
                    reason: reason.to_string(),
                }),
        );

        Some(StrategyOutcome {
            outfit: regenerated,
            changes,
        })
    }
}
