//! Relevance scoring.
//!
//! Each component is normalized to [0, 1] and combined with the configured
//! weights; the total is divided by the weight sum so it stays in [0, 1]
//! whatever the configuration.
//!
//! | component  | signal                                              |
//! |------------|-----------------------------------------------------|
//! | style      | exact 1.0, compatible 0.7, untagged 0.4, none 0.0   |
//! | occasion   | occasion verdict (tag, fallback, brand, agnostic)   |
//! | mood       | matching 1.0, mismatched 0.2, unknown 0.5           |
//! | usage      | favorite, wear count, days since last worn          |
//! | harmony    | color fit with already selected items               |
//! | preference | profile style preferences and body-type fit         |
//!
//! Ties break by favorite, then wear count, then id, so ranking is total.

use std::cmp::Ordering;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use outfit_types::{ClothingItem, ScoringWeights};
use serde::{Deserialize, Serialize};

use crate::classifier::ItemProfile;
use crate::context::GenerationContext;
use crate::harmony;
use crate::rules::{self, occasion_verdict};
use crate::tables::{CompatibilityTables, StyleMatch};

/// Wear count at which the usage signal saturates.
const WEAR_SATURATION: f32 = 20.0;

/// Days since last worn after which an item counts as fully rested.
const REST_DAYS: f32 = 14.0;

/// Per-component scores and the weighted total.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub style: f32,
    pub occasion: f32,
    pub mood: f32,
    pub usage: f32,
    pub harmony: f32,
    pub preference: f32,
    pub total: f32,
}

/// A candidate with its score.
#[derive(Debug, Clone)]
pub struct ScoredItem<'a> {
    pub item: &'a ClothingItem,
    pub profile: ItemProfile,
    pub score: ScoreBreakdown,
}

#[derive(Clone)]
pub struct RelevanceScorer {
    weights: ScoringWeights,
    tables: Arc<CompatibilityTables>,
}

impl RelevanceScorer {
    pub fn new(weights: ScoringWeights, tables: Arc<CompatibilityTables>) -> Self {
        Self { weights, tables }
    }

    pub fn score(
        &self,
        item: &ClothingItem,
        profile: &ItemProfile,
        ctx: &GenerationContext,
        selected: &[&ClothingItem],
    ) -> ScoreBreakdown {
        let style = if ctx.style.is_empty() {
            0.5
        } else {
            match ctx.style_match(&item.style) {
                StyleMatch::Exact => 1.0,
                StyleMatch::Compatible => 0.7,
                StyleMatch::Untagged => 0.4,
                StyleMatch::None => 0.0,
            }
        };

        let occasion = occasion_verdict(item, profile, &ctx.occasion_query(), &self.tables).score();

        let mood = match ctx.mood_match(&item.mood) {
            Some(true) => 1.0,
            Some(false) => 0.2,
            None => 0.5,
        };

        let usage = usage_score(item, ctx.generated_at);
        let harmony = harmony::color_score(item.color.as_deref(), selected);

        let preference = if rules::fit_discouraged(ctx.profile.body_type.as_deref(), item) {
            0.0
        } else if ctx.matches_preferences(&item.style) {
            1.0
        } else {
            0.5
        };

        let w = &self.weights;
        let weighted = w.style * style
            + w.occasion * occasion
            + w.mood * mood
            + w.usage * usage
            + w.harmony * harmony
            + w.preference * preference;
        let total = if w.total() > 0.0 { weighted / w.total() } else { 0.0 };

        ScoreBreakdown {
            style,
            occasion,
            mood,
            usage,
            harmony,
            preference,
            total,
        }
    }

    /// Score and rank candidates, best first.
    pub fn rank<'a>(
        &self,
        candidates: impl IntoIterator<Item = (&'a ClothingItem, ItemProfile)>,
        ctx: &GenerationContext,
        selected: &[&ClothingItem],
    ) -> Vec<ScoredItem<'a>> {
        let mut scored: Vec<ScoredItem<'a>> = candidates
            .into_iter()
            .map(|(item, profile)| ScoredItem {
                item,
                profile,
                score: self.score(item, &profile, ctx, selected),
            })
            .collect();
        scored.sort_by(compare_ranked);
        scored
    }
}

/// Usage signal: favorites, frequently worn items and rested items rank higher.
pub fn usage_score(item: &ClothingItem, now: DateTime<Utc>) -> f32 {
    let favorite = if item.favorite { 1.0 } else { 0.0 };
    let wear = (item.wear_count as f32 / WEAR_SATURATION).min(1.0);
    let rested = match item.last_worn {
        None => 1.0,
        Some(at) => {
            let days = (now - at).num_hours().max(0) as f32 / 24.0;
            (days / REST_DAYS).min(1.0)
        }
    };
    0.4 * favorite + 0.3 * wear + 0.3 * rested
}

/// Total order: score, favorite, wear count, then id ascending.
pub fn compare_ranked(a: &ScoredItem<'_>, b: &ScoredItem<'_>) -> Ordering {
    b.score
        .total
        .total_cmp(&a.score.total)
        .then_with(|| b.item.favorite.cmp(&a.item.favorite))
        .then_with(|| b.item.wear_count.cmp(&a.item.wear_count))
        .then_with(|| a.item.id.cmp(&b.item.id))
}
