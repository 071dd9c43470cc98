//! Strict filter.
//!
//! Hard exclusions applied to the wardrobe before scoring, in a fixed order:
//! weather, occasion, style, personal preference. Each stage only sees what
//! the previous one kept.
//!
//! Fail-open is per category: when a stage would remove every item of a
//! category the context protects, that stage is skipped for that category
//! and a note is recorded. The preference stage fails open for every
//! category, protected or not.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use outfit_types::{ClothingItem, WeatherCondition, WeatherThresholds};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::classifier::{ItemClassifier, ItemProfile};
use crate::context::GenerationContext;
use crate::harmony::base_color;
use crate::rules::{self, occasion_verdict, OccasionVerdict};
use crate::tables::{CompatibilityTables, StyleMatch};
use crate::types::Category;

/// Filter stages, in application order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterStage {
    Weather,
    Occasion,
    Style,
    Preference,
}

impl FilterStage {
    pub const ORDER: [FilterStage; 4] = [
        FilterStage::Weather,
        FilterStage::Occasion,
        FilterStage::Style,
        FilterStage::Preference,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FilterStage::Weather => "weather",
            FilterStage::Occasion => "occasion",
            FilterStage::Style => "style",
            FilterStage::Preference => "preference",
        }
    }
}

impl fmt::Display for FilterStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How much filtering to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterMode {
    /// All four stages
    #[default]
    Strict,
    /// Weather only; used by scratch regeneration
    Relaxed,
}

impl FilterMode {
    fn stages(&self) -> &'static [FilterStage] {
        match self {
            FilterMode::Strict => &FilterStage::ORDER,
            FilterMode::Relaxed => &[FilterStage::Weather],
        }
    }
}

/// A stage that was skipped for one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterNote {
    pub stage: FilterStage,
    pub category: Category,
    pub reason: String,
}

/// An item a stage excluded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemovedItem {
    pub item_id: String,
    pub stage: FilterStage,
    pub reason: String,
}

/// Result of one filter pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterOutcome {
    pub candidates: Vec<ClothingItem>,
    pub notes: Vec<FilterNote>,
    pub removed: Vec<RemovedItem>,
    /// Items remaining after each stage that ran
    pub stage_counts: BTreeMap<FilterStage, usize>,
}

/// Staged hard-exclusion filter.
pub struct StrictFilter {
    classifier: Arc<ItemClassifier>,
    tables: Arc<CompatibilityTables>,
    thresholds: WeatherThresholds,
}

impl StrictFilter {
    pub fn new(
        classifier: Arc<ItemClassifier>,
        tables: Arc<CompatibilityTables>,
        thresholds: WeatherThresholds,
    ) -> Self {
        Self {
            classifier,
            tables,
            thresholds,
        }
    }

    /// Apply every stage of `mode` to the wardrobe.
    pub fn filter(
        &self,
        wardrobe: &[ClothingItem],
        ctx: &GenerationContext,
        mode: FilterMode,
    ) -> FilterOutcome {
        let mut current: Vec<(ClothingItem, ItemProfile)> = wardrobe
            .iter()
            .map(|item| (item.clone(), self.classifier.describe(item)))
            .collect();
        let protected = ctx.protected_categories();
        let mut outcome = FilterOutcome::default();

        for &stage in mode.stages() {
            if !self.stage_applies(stage, ctx) {
                debug!(stage = %stage, "Filter stage not applicable, skipping");
                continue;
            }

            let reasons: Vec<Option<String>> = current
                .iter()
                .map(|(item, profile)| self.reject_reason(stage, item, profile, ctx))
                .collect();
            let mut keep: Vec<bool> = reasons.iter().map(Option::is_none).collect();

            self.fail_open(stage, &current, &reasons, &mut keep, &protected, &mut outcome);

            let before = current.len();
            let mut kept = Vec::with_capacity(before);
            for (((item, profile), reason), keep) in current.into_iter().zip(reasons).zip(keep) {
                if keep {
                    kept.push((item, profile));
                } else {
                    outcome.removed.push(RemovedItem {
                        item_id: item.id.clone(),
                        stage,
                        reason: reason.unwrap_or_default(),
                    });
                }
            }
            current = kept;

            debug!(stage = %stage, before, after = current.len(), "Filter stage applied");
            outcome.stage_counts.insert(stage, current.len());
        }

        outcome.candidates = current.into_iter().map(|(item, _)| item).collect();
        outcome
    }

    fn stage_applies(&self, stage: FilterStage, ctx: &GenerationContext) -> bool {
        match stage {
            FilterStage::Weather => {
                ctx.weather.temperature_f.is_some()
                    || ctx.weather.condition == WeatherCondition::Snow
            }
            FilterStage::Occasion => !ctx.occasion.is_empty(),
            FilterStage::Style => !ctx.style.is_empty(),
            FilterStage::Preference => {
                ctx.profile.body_type.is_some()
                    || !ctx.profile.disliked_styles.is_empty()
                    || !ctx.profile.disliked_colors.is_empty()
            }
        }
    }

    /// Restore every item of a category the stage would empty.
    fn fail_open(
        &self,
        stage: FilterStage,
        current: &[(ClothingItem, ItemProfile)],
        reasons: &[Option<String>],
        keep: &mut [bool],
        protected: &BTreeSet<Category>,
        outcome: &mut FilterOutcome,
    ) {
        let present: BTreeSet<Category> = current.iter().map(|(_, p)| p.category).collect();

        for category in present {
            if stage != FilterStage::Preference && !protected.contains(&category) {
                continue;
            }
            let in_category = |i: &usize| current[*i].1.category == category;
            let survives = (0..current.len()).filter(in_category).any(|i| keep[i]);
            if survives {
                continue;
            }

            let restored: Vec<usize> = (0..current.len()).filter(in_category).collect();
            for &i in &restored {
                keep[i] = true;
            }

            let reason = restored
                .first()
                .and_then(|&i| reasons[i].clone())
                .unwrap_or_default();
            warn!(
                stage = %stage,
                category = %category,
                restored = restored.len(),
                "Filter would empty category, skipping stage for it"
            );
            outcome.notes.push(FilterNote {
                stage,
                category,
                reason: format!(
                    "{stage} filter skipped for {category}: would remove all {} item(s) ({reason})",
                    restored.len()
                ),
            });
        }
    }

    /// Why the stage rejects an item, or `None` if it passes.
    fn reject_reason(
        &self,
        stage: FilterStage,
        item: &ClothingItem,
        profile: &ItemProfile,
        ctx: &GenerationContext,
    ) -> Option<String> {
        match stage {
            FilterStage::Weather => self.weather_reason(item, profile, ctx),
            FilterStage::Occasion => {
                let verdict = occasion_verdict(item, profile, &ctx.occasion_query(), &self.tables);
                match verdict {
                    OccasionVerdict::Contradiction => {
                        Some(format!("name contradicts occasion '{}'", ctx.occasion))
                    }
                    OccasionVerdict::Mismatch => {
                        Some(format!("not suited to occasion '{}'", ctx.occasion))
                    }
                    _ => None,
                }
            }
            FilterStage::Style => match ctx.style_match(&item.style) {
                StyleMatch::None => Some(format!("style incompatible with '{}'", ctx.style)),
                _ => None,
            },
            FilterStage::Preference => preference_reason(item, ctx),
        }
    }

    fn weather_reason(
        &self,
        item: &ClothingItem,
        profile: &ItemProfile,
        ctx: &GenerationContext,
    ) -> Option<String> {
        if ctx.weather.condition == WeatherCondition::Snow
            && profile.category == Category::Shoes
            && rules::is_open_footwear(item)
        {
            return Some("open footwear in snow".to_string());
        }

        let t = ctx.weather.temperature_f?;
        if t >= self.thresholds.warm_exclusion_f {
            if rules::is_heavy(item) {
                return Some(format!("too heavy for {t:.0}°F"));
            }
            if rules::is_winter_only(item) {
                return Some(format!("winter-only item at {t:.0}°F"));
            }
        }
        if t <= self.thresholds.cold_exclusion_f {
            if rules::is_warm_weather_only(item) {
                return Some(format!("warm-weather item at {t:.0}°F"));
            }
            if rules::is_summer_only(item) {
                return Some(format!("summer-only item at {t:.0}°F"));
            }
        }
        None
    }
}

fn preference_reason(item: &ClothingItem, ctx: &GenerationContext) -> Option<String> {
    let profile = &ctx.profile;

    if let Some(style) = item.style.iter().find(|s| profile.disliked_styles.contains(*s)) {
        return Some(format!("disliked style '{style}'"));
    }
    if let Some(color) = item.color.as_deref() {
        let base = base_color(color);
        if profile
            .disliked_colors
            .iter()
            .any(|c| c == color || *c == base)
        {
            return Some(format!("disliked color '{color}'"));
        }
    }
    if rules::fit_discouraged(profile.body_type.as_deref(), item) {
        return Some(format!(
            "fit '{}' discouraged for body type",
            item.metadata.fit.as_deref().unwrap_or_default()
        ));
    }
    None
}
