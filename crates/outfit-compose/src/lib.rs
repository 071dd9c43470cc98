//! # outfit-compose
//!
//! Outfit composition pipeline for the outfit composer.
//!
//! Given a wardrobe snapshot and a request (occasion, style, mood, weather,
//! profile), this crate selects a structurally valid, context-appropriate
//! outfit, validates it and repairs it when validation finds blocking
//! problems.
//!
//! ## Core Concepts
//!
//! - **Category**: functional wardrobe slot assigned by the item classifier
//! - **Generation Context**: per-request targets, layering rule and compatibility sets
//! - **Strict Filter**: staged hard exclusion that fails open per required category
//! - **Invariant Gate**: hard structural rules checked before any item joins an outfit
//! - **Healing**: bounded repair of an outfit the final validator rejected
//!
//! ## Usage
//!
//! ```rust
//! use outfit_compose::OutfitComposer;
//! use outfit_types::{ClothingItem, ComposerSettings, OutfitRequest, Weather};
//!
//! let composer = OutfitComposer::new(ComposerSettings::default()).unwrap();
//! let wardrobe = vec![
//!     ClothingItem::new("1", "u1", "Oxford shirt", "shirt"),
//!     ClothingItem::new("2", "u1", "Chinos", "chinos"),
//!     ClothingItem::new("3", "u1", "Loafers", "loafers"),
//! ];
//! let request = OutfitRequest::new("business casual", "classic")
//!     .with_weather(Weather::new(68.0, "clear"));
//!
//! let response = composer.compose(&request, &wardrobe);
//! assert_eq!(response.items.len(), 3);
//! ```
//!
//! ## Modules
//!
//! - [`tables`]: Process-wide style, occasion and mood compatibility tables
//! - [`classifier`]: Category, shirt, formality and layer classification
//! - [`dedupe`]: Stable wardrobe deduplication
//! - [`context`]: Generation context builder
//! - [`filter`]: Staged strict filter
//! - [`gate`]: Invariant gate
//! - [`selector`]: Scored category-by-category selection
//! - [`integrity`]: Structural integrity checker
//! - [`validator`]: Final validator battery
//! - [`healing`]: Healing orchestrator
//! - [`composer`]: Facade wiring every stage together; also re-validates
//!   caller-edited outfits
//! - [`source`]: Async wardrobe source seam

pub mod classifier;
pub mod composer;
pub mod context;
pub mod dedupe;
pub mod error;
pub mod filter;
pub mod gate;
pub mod harmony;
pub mod healing;
pub mod integrity;
pub mod notes;
pub mod pipeline;
pub mod rules;
pub mod scoring;
pub mod selection;
pub mod selector;
pub mod source;
pub mod tables;
pub mod types;
pub mod validator;

// Re-export main types at crate root
pub use classifier::{ClassifierConfig, ItemClassifier, ItemProfile};
pub use composer::{OutfitComposer, OutfitResponse};
pub use context::{ContextBuilder, GenerationContext, OccasionRule};
pub use dedupe::{dedupe, dedupe_key};
pub use error::ComposeError;
pub use filter::{FilterMode, FilterNote, FilterOutcome, FilterStage, RemovedItem, StrictFilter};
pub use gate::{can_add, GateDecision, GateReason, GateViolation};
pub use healing::{
    GenerationStrategy, HealingLog, HealingOrchestrator, HealingState, HealingStrategy, ItemChange,
};
pub use integrity::IntegrityChecker;
pub use pipeline::{Pipeline, PipelineRun};
pub use scoring::{RelevanceScorer, ScoreBreakdown};
pub use selection::{same_item, RepairRecord, RepairSource, SelectionState, SkipRecord};
pub use selector::ScoredSelector;
pub use source::{load_wardrobe, MockWardrobeSource, WardrobeSource};
pub use tables::{CompatibilityTables, StyleMatch};
pub use types::{Category, LayeringRule, OccasionClass, TargetCounts};
pub use validator::{
    FinalValidator, IssueCode, IssueLevel, OutfitValidator, Severity, ValidationIssue,
    ValidationResult,
};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::composer::{OutfitComposer, OutfitResponse};
    pub use crate::healing::GenerationStrategy;
    pub use crate::types::Category;
    pub use crate::validator::{IssueCode, Severity, ValidationResult};
}
