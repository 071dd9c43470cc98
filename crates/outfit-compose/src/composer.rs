//! Outfit composer facade.
//!
//! Wires the stages together for one request:
//!
//! ```text
//! dedupe -> context -> strict filter -> scored selector -> integrity
//!        -> final validator -> (healing) -> response
//! ```
//!
//! `compose` never fails. Whatever the wardrobe holds, the caller gets an
//! outfit (possibly partial), its validation result and the list of
//! required categories nothing could fill.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use outfit_types::{ClothingItem, ComposerSettings, IngestReport, OutfitRequest};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use ulid::Ulid;

use crate::classifier::ItemClassifier;
use crate::context::{ContextBuilder, GenerationContext};
use crate::dedupe::dedupe;
use crate::error::ComposeError;
use crate::filter::{FilterMode, FilterNote, FilterOutcome, StrictFilter};
use crate::healing::{GenerationStrategy, HealingLog, HealingOrchestrator, HealingResources};
use crate::integrity::IntegrityChecker;
use crate::notes::style_notes;
use crate::pipeline::Pipeline;
use crate::scoring::RelevanceScorer;
use crate::selection::{SelectionState, SkipRecord};
use crate::selector::ScoredSelector;
use crate::source::{load_wardrobe, WardrobeSource};
use crate::tables::CompatibilityTables;
use crate::types::Category;
use crate::validator::{FinalValidator, OccasionValidator, ValidationResult, WeatherValidator};

/// Everything returned for one request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutfitResponse {
    pub outfit_id: String,
    /// Selected items in selection order
    pub items: Vec<ClothingItem>,
    pub style_notes: Vec<String>,
    pub validation: ValidationResult,
    /// Present when healing ran
    pub healing_log: Option<HealingLog>,
    pub generation_strategy: GenerationStrategy,
    /// Required categories the wardrobe could not fill
    pub missing_categories: Vec<Category>,
    pub filter_notes: Vec<FilterNote>,
    pub skipped: Vec<SkipRecord>,
    /// Ingestion summary when the wardrobe came from a source
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wardrobe_report: Option<IngestReport>,
}

impl OutfitResponse {
    /// Whether every required category is present.
    pub fn is_complete(&self) -> bool {
        self.missing_categories.is_empty()
    }
}

pub struct OutfitComposer {
    settings: ComposerSettings,
    classifier: Arc<ItemClassifier>,
    contexts: ContextBuilder,
    pipeline: Pipeline,
    validator: Arc<FinalValidator>,
    healer: HealingOrchestrator,
}

impl OutfitComposer {
    /// Create a composer over the built-in compatibility tables.
    pub fn new(settings: ComposerSettings) -> Result<Self, ComposeError> {
        Self::with_tables(settings, CompatibilityTables::builtin())
    }

    /// Create a composer over custom compatibility tables.
    pub fn with_tables(
        settings: ComposerSettings,
        tables: Arc<CompatibilityTables>,
    ) -> Result<Self, ComposeError> {
        settings.validate()?;

        let classifier = Arc::new(ItemClassifier::new());
        let scorer = RelevanceScorer::new(settings.scoring.clone(), tables.clone());
        let pipeline = Pipeline::new(
            StrictFilter::new(classifier.clone(), tables.clone(), settings.weather.clone()),
            ScoredSelector::new(classifier.clone(), scorer.clone(), settings.limits.clone()),
            IntegrityChecker::new(classifier.clone(), scorer),
        );
        let validator = Arc::new(FinalValidator::new(
            classifier.clone(),
            tables.clone(),
            settings.weather.clone(),
            settings.limits.clone(),
        ));
        let healer = HealingOrchestrator::new(
            validator.clone(),
            WeatherValidator::new(settings.weather.clone()),
            OccasionValidator::new(tables.clone()),
            settings.limits.clone(),
            &settings.healing,
        );

        Ok(Self {
            contexts: ContextBuilder::new(tables, classifier.clone()),
            settings,
            classifier,
            pipeline,
            validator,
            healer,
        })
    }

    pub fn settings(&self) -> &ComposerSettings {
        &self.settings
    }

    pub fn validator(&self) -> &FinalValidator {
        &self.validator
    }

    pub fn build_context(&self, request: &OutfitRequest, wardrobe: &[ClothingItem]) -> GenerationContext {
        self.contexts.build(request, wardrobe)
    }

    /// Compose an outfit from a wardrobe snapshot.
    pub fn compose(&self, request: &OutfitRequest, wardrobe: &[ClothingItem]) -> OutfitResponse {
        self.compose_at(request, wardrobe, Utc::now())
    }

    /// Compose with an explicit clock.
    pub fn compose_at(
        &self,
        request: &OutfitRequest,
        wardrobe: &[ClothingItem],
        now: DateTime<Utc>,
    ) -> OutfitResponse {
        let wardrobe = dedupe(wardrobe);
        let ctx = self.contexts.build_at(request, &wardrobe, now);

        let run = self.pipeline.run(&wardrobe, &ctx, FilterMode::Strict);
        let skipped = run.state.skipped.clone();
        self.finish(&ctx, &wardrobe, run.state.into_items(), run.filter, skipped)
    }

    /// Validate a caller-supplied outfit, for example one a user edited, and
    /// heal it when it is invalid. Replacements come from `wardrobe`.
    pub fn revalidate(
        &self,
        request: &OutfitRequest,
        outfit: &[ClothingItem],
        wardrobe: &[ClothingItem],
    ) -> OutfitResponse {
        self.revalidate_at(request, outfit, wardrobe, Utc::now())
    }

    pub fn revalidate_at(
        &self,
        request: &OutfitRequest,
        outfit: &[ClothingItem],
        wardrobe: &[ClothingItem],
        now: DateTime<Utc>,
    ) -> OutfitResponse {
        let wardrobe = dedupe(wardrobe);
        let ctx = self.contexts.build_at(request, &wardrobe, now);
        let filtered = self.pipeline.filter().filter(&wardrobe, &ctx, FilterMode::Strict);
        self.finish(&ctx, &wardrobe, outfit.to_vec(), filtered, Vec::new())
    }

    /// Validate, heal if needed and assemble the response.
    fn finish(
        &self,
        ctx: &GenerationContext,
        wardrobe: &[ClothingItem],
        items: Vec<ClothingItem>,
        filter: FilterOutcome,
        skipped: Vec<SkipRecord>,
    ) -> OutfitResponse {
        let validation = self.validator.validate(&items, ctx);

        let (items, validation, healing_log, strategy) = if validation.valid {
            (items, validation, None, GenerationStrategy::Direct)
        } else {
            let resources = HealingResources {
                ctx,
                wardrobe,
                candidates: &filter.candidates,
                pipeline: &self.pipeline,
            };
            let healed = self.healer.heal(items, validation, &resources);
            (healed.outfit, healed.validation, Some(healed.log), healed.strategy)
        };

        let missing_categories = self.missing_categories(&items, ctx);
        if !missing_categories.is_empty() {
            warn!(missing = ?missing_categories, "Returning partial outfit");
        }

        let response = OutfitResponse {
            outfit_id: Ulid::new().to_string(),
            style_notes: style_notes(&items, ctx, &self.classifier),
            items,
            validation,
            healing_log,
            generation_strategy: strategy,
            missing_categories,
            filter_notes: filter.notes,
            skipped,
            wardrobe_report: None,
        };

        info!(
            outfit_id = %response.outfit_id,
            strategy = response.generation_strategy.as_str(),
            items = response.items.len(),
            valid = response.validation.valid,
            severity = ?response.validation.severity,
            "Outfit composed"
        );
        response
    }

    /// Fetch a user's wardrobe and compose from it.
    ///
    /// The fetch is bounded by `source_timeout_ms`; a failed fetch composes
    /// from an empty wardrobe. The ingestion summary rides along on the
    /// response.
    pub async fn compose_for_user(
        &self,
        source: &dyn WardrobeSource,
        user_id: &str,
        request: &OutfitRequest,
    ) -> OutfitResponse {
        let (wardrobe, report) = load_wardrobe(source, user_id, self.settings.source_timeout()).await;
        debug!(
            user_id,
            accepted = report.accepted,
            dropped = report.dropped.len(),
            defaulted = report.defaulted_fields,
            "Wardrobe loaded"
        );

        let mut response = self.compose(request, &wardrobe);
        response.wardrobe_report = Some(report);
        response
    }

    fn missing_categories(&self, items: &[ClothingItem], ctx: &GenerationContext) -> Vec<Category> {
        let state = SelectionState::from_items(items, &self.classifier);
        ctx.effective_targets(state.has_dress())
            .required_categories()
            .filter(|c| state.count(*c) == 0)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MockWardrobeSource;
    use outfit_types::{WardrobeRecord, Weather};
    use std::time::Duration;

    fn composer() -> OutfitComposer {
        OutfitComposer::new(ComposerSettings::default()).unwrap()
    }

    fn basics() -> Vec<ClothingItem> {
        vec![
            ClothingItem::new("tee", "u1", "White tee", "t-shirt").with_color("white"),
            ClothingItem::new("jeans", "u1", "Blue jeans", "jeans").with_color("blue"),
            ClothingItem::new("sneakers", "u1", "Canvas sneakers", "sneakers"),
        ]
    }

    #[test]
    fn test_direct_compose() {
        let response = composer().compose(&OutfitRequest::new("casual", ""), &basics());
        assert_eq!(response.generation_strategy, GenerationStrategy::Direct);
        assert!(response.validation.valid);
        assert!(response.healing_log.is_none());
        assert!(response.is_complete());
        assert_eq!(response.items.len(), 3);
        assert!(!response.style_notes.is_empty());
        assert_eq!(response.outfit_id.len(), 26);
    }

    #[test]
    fn test_duplicate_records_collapse() {
        let mut wardrobe = basics();
        wardrobe.extend(basics());
        let response = composer().compose(&OutfitRequest::default(), &wardrobe);
        let mut ids: Vec<&str> = response.items.iter().map(|i| i.id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), response.items.len());
    }

    #[test]
    fn test_empty_wardrobe_reports_missing_categories() {
        let response = composer().compose(&OutfitRequest::default(), &[]);
        assert!(response.items.is_empty());
        assert_eq!(
            response.missing_categories,
            vec![Category::Top, Category::Bottom, Category::Shoes]
        );
        assert_eq!(response.generation_strategy, GenerationStrategy::BestEffort);
        assert!(response.healing_log.is_some());
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let mut settings = ComposerSettings::default();
        settings.weather.cold_exclusion_f = 90.0;
        assert!(OutfitComposer::new(settings).is_err());
    }

    #[test]
    fn test_cold_day_adds_outerwear() {
        let mut wardrobe = basics();
        wardrobe.push(ClothingItem::new("coat", "u1", "Wool coat", "coat").with_material("wool"));
        let request = OutfitRequest::default().with_weather(Weather::new(38.0, "cloudy"));
        let response = composer().compose(&request, &wardrobe);
        assert!(response.items.iter().any(|i| i.id == "coat"));
        assert!(response.is_complete());
    }

    #[test]
    fn test_revalidate_valid_outfit_is_direct() {
        let wardrobe = basics();
        let response =
            composer().revalidate(&OutfitRequest::new("casual", ""), &wardrobe, &wardrobe);
        assert_eq!(response.generation_strategy, GenerationStrategy::Direct);
        assert_eq!(response.items, wardrobe);
        assert!(response.skipped.is_empty());
    }

    #[tokio::test]
    async fn test_compose_for_user_degrades_on_timeout() {
        let mut settings = ComposerSettings::default();
        settings.source_timeout_ms = 10;
        let composer = OutfitComposer::new(settings).unwrap();
        let source = MockWardrobeSource::default()
            .with_items("u1", &basics())
            .with_delay(Duration::from_millis(200));

        let response = composer
            .compose_for_user(&source, "u1", &OutfitRequest::default())
            .await;
        assert!(response.items.is_empty());
        assert!(!response.is_complete());
    }

    #[tokio::test]
    async fn test_compose_for_user() {
        let source = MockWardrobeSource::default().with_items("u1", &basics());
        let response = composer()
            .compose_for_user(&source, "u1", &OutfitRequest::new("casual", ""))
            .await;
        assert_eq!(response.items.len(), 3);
    }

    #[tokio::test]
    async fn test_compose_for_user_reports_dropped_records() {
        let foreign = ClothingItem::new("borrowed", "u2", "Borrowed tee", "t-shirt");
        let source = MockWardrobeSource::default()
            .with_items("u1", &basics())
            .with_records("u1", vec![WardrobeRecord::from(&foreign)]);

        let response = composer()
            .compose_for_user(&source, "u1", &OutfitRequest::new("casual", ""))
            .await;

        let report = response.wardrobe_report.expect("report attached");
        assert_eq!(report.accepted, 3);
        assert_eq!(report.dropped.len(), 1);
        assert_eq!(report.dropped[0].id.as_deref(), Some("borrowed"));
        assert!(!response.items.iter().any(|i| i.id == "borrowed"));
    }

    #[test]
    fn test_compose_without_source_has_no_report() {
        let response = composer().compose(&OutfitRequest::default(), &basics());
        assert!(response.wardrobe_report.is_none());
    }
}
