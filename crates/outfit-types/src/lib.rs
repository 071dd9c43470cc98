//! # outfit-types
//!
//! Shared domain types for the outfit composer.
//!
//! This crate defines the data that flows through the composition pipeline:
//! - Items: `ClothingItem` and its metadata, plus `WardrobeRecord` ingestion
//! - Requests: occasion, style, mood, weather and user profile
//! - Settings: layered configuration for weights, thresholds and limits
//!
//! ## Usage
//!
//! ```rust
//! use outfit_types::{ClothingItem, OutfitRequest, Weather};
//!
//! let shirt = ClothingItem::new("i1", "u1", "White oxford", "shirt").with_style(&["classic"]);
//! let request = OutfitRequest::new("business", "classic").with_weather(Weather::new(68.0, "clear"));
//! assert_eq!(shirt.style, vec!["classic".to_string()]);
//! assert_eq!(request.occasion, "business");
//! ```

pub mod config;
pub mod error;
pub mod item;
pub mod request;

pub use config::{CategoryLimits, ComposerSettings, HealingSettings, ScoringWeights, WeatherThresholds};
pub use error::TypesError;
pub use item::{
    ingest_wardrobe, normalize_tag, normalize_tags, ClothingItem, DroppedRecord, FabricWeight,
    Formality, FormalityValue, IngestReport, ItemMetadata, RecordMetadata, WardrobeRecord,
    WearLayer,
};
pub use request::{OutfitRequest, UserProfile, Weather, WeatherCondition};
