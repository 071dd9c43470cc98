//! Configuration loading for the outfit composer.
//!
//! Layered config: defaults -> config file -> explicit file -> env vars.
//! The config file lives at `<config dir>/outfit-composer/config.toml`.

use config::{Config, Environment, File};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::TypesError;

/// Relevance score weights used by the selector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    #[serde(default = "default_style_weight")]
    pub style: f32,
    #[serde(default = "default_occasion_weight")]
    pub occasion: f32,
    #[serde(default = "default_mood_weight")]
    pub mood: f32,
    #[serde(default = "default_usage_weight")]
    pub usage: f32,
    #[serde(default = "default_harmony_weight")]
    pub harmony: f32,
    #[serde(default = "default_preference_weight")]
    pub preference: f32,
}

fn default_style_weight() -> f32 {
    0.30
}
fn default_occasion_weight() -> f32 {
    0.30
}
fn default_mood_weight() -> f32 {
    0.10
}
fn default_usage_weight() -> f32 {
    0.10
}
fn default_harmony_weight() -> f32 {
    0.15
}
fn default_preference_weight() -> f32 {
    0.05
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            style: default_style_weight(),
            occasion: default_occasion_weight(),
            mood: default_mood_weight(),
            usage: default_usage_weight(),
            harmony: default_harmony_weight(),
            preference: default_preference_weight(),
        }
    }
}

impl ScoringWeights {
    pub fn total(&self) -> f32 {
        self.style + self.occasion + self.mood + self.usage + self.harmony + self.preference
    }

    pub fn validate(&self) -> Result<(), String> {
        let all = [
            self.style,
            self.occasion,
            self.mood,
            self.usage,
            self.harmony,
            self.preference,
        ];
        if all.iter().any(|w| *w < 0.0 || !w.is_finite()) {
            return Err("scoring weights must be finite and >= 0".to_string());
        }
        if self.total() <= 0.0 {
            return Err("scoring weights must sum to > 0".to_string());
        }
        Ok(())
    }
}

/// Temperature bands (Fahrenheit) for the weather filter and validator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherThresholds {
    /// At or above: heavy/winter-only items are filtered out
    #[serde(default = "default_warm_exclusion")]
    pub warm_exclusion_f: f64,
    /// At or below: shorts, sandals and summer-only items are filtered out
    #[serde(default = "default_cold_exclusion")]
    pub cold_exclusion_f: f64,
    /// Above: heavy outerwear is a validation error
    #[serde(default = "default_heavy_error")]
    pub heavy_error_above_f: f64,
    /// Above (and up to the error band): heavy outerwear is a warning
    #[serde(default = "default_heavy_warning")]
    pub heavy_warning_above_f: f64,
    /// Below: warm-weather items are a validation error
    #[serde(default = "default_light_error")]
    pub light_error_below_f: f64,
    /// Below (and down to the error band): warm-weather items are a warning
    #[serde(default = "default_light_warning")]
    pub light_warning_below_f: f64,
    /// Below: an outfit without outerwear gets a warning
    #[serde(default = "default_outerwear_advised")]
    pub outerwear_advised_below_f: f64,
}

fn default_warm_exclusion() -> f64 {
    70.0
}
fn default_cold_exclusion() -> f64 {
    50.0
}
fn default_heavy_error() -> f64 {
    75.0
}
fn default_heavy_warning() -> f64 {
    60.0
}
fn default_light_error() -> f64 {
    40.0
}
fn default_light_warning() -> f64 {
    55.0
}
fn default_outerwear_advised() -> f64 {
    45.0
}

impl Default for WeatherThresholds {
    fn default() -> Self {
        Self {
            warm_exclusion_f: default_warm_exclusion(),
            cold_exclusion_f: default_cold_exclusion(),
            heavy_error_above_f: default_heavy_error(),
            heavy_warning_above_f: default_heavy_warning(),
            light_error_below_f: default_light_error(),
            light_warning_below_f: default_light_warning(),
            outerwear_advised_below_f: default_outerwear_advised(),
        }
    }
}

impl WeatherThresholds {
    pub fn validate(&self) -> Result<(), String> {
        if self.cold_exclusion_f >= self.warm_exclusion_f {
            return Err(format!(
                "cold_exclusion_f ({}) must be below warm_exclusion_f ({})",
                self.cold_exclusion_f, self.warm_exclusion_f
            ));
        }
        if self.heavy_warning_above_f > self.heavy_error_above_f {
            return Err("heavy_warning_above_f must not exceed heavy_error_above_f".to_string());
        }
        if self.light_error_below_f > self.light_warning_below_f {
            return Err("light_error_below_f must not exceed light_warning_below_f".to_string());
        }
        Ok(())
    }
}

/// Per-category quantity limits enforced by the selector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryLimits {
    #[serde(default = "default_max_tops")]
    pub max_tops: usize,
    #[serde(default = "default_one")]
    pub max_bottoms: usize,
    #[serde(default = "default_one")]
    pub max_dresses: usize,
    #[serde(default = "default_one")]
    pub max_shoes: usize,
    #[serde(default = "default_one")]
    pub max_outerwear: usize,
    #[serde(default = "default_max_accessories")]
    pub max_accessories: usize,
    /// Accessory cap when the requested style is minimalist
    #[serde(default = "default_one")]
    pub minimalist_accessories: usize,
    /// Optional extras stop once the outfit holds this many items; the
    /// style validator warns above it
    #[serde(default = "default_max_items")]
    pub max_total_items: usize,
}

fn default_max_tops() -> usize {
    2
}
fn default_one() -> usize {
    1
}
fn default_max_accessories() -> usize {
    3
}
fn default_max_items() -> usize {
    7
}

impl Default for CategoryLimits {
    fn default() -> Self {
        Self {
            max_tops: default_max_tops(),
            max_bottoms: default_one(),
            max_dresses: default_one(),
            max_shoes: default_one(),
            max_outerwear: default_one(),
            max_accessories: default_max_accessories(),
            minimalist_accessories: default_one(),
            max_total_items: default_max_items(),
        }
    }
}

/// Healing orchestrator bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealingSettings {
    /// Escalations after the first strategy; attempts are bounded by this + 1
    #[serde(default = "default_max_escalations")]
    pub max_escalations: u32,
}

fn default_max_escalations() -> u32 {
    3
}

impl Default for HealingSettings {
    fn default() -> Self {
        Self {
            max_escalations: default_max_escalations(),
        }
    }
}

impl HealingSettings {
    pub fn max_attempts(&self) -> u32 {
        self.max_escalations + 1
    }
}

/// Main composer settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComposerSettings {
    #[serde(default)]
    pub scoring: ScoringWeights,

    #[serde(default)]
    pub weather: WeatherThresholds,

    #[serde(default)]
    pub limits: CategoryLimits,

    #[serde(default)]
    pub healing: HealingSettings,

    /// Timeout for wardrobe source fetches (ms)
    #[serde(default = "default_source_timeout")]
    pub source_timeout_ms: u64,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_source_timeout() -> u64 {
    2000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ComposerSettings {
    fn default() -> Self {
        Self {
            scoring: ScoringWeights::default(),
            weather: WeatherThresholds::default(),
            limits: CategoryLimits::default(),
            healing: HealingSettings::default(),
            source_timeout_ms: default_source_timeout(),
            log_level: default_log_level(),
        }
    }
}

impl ComposerSettings {
    /// Load settings with layered precedence:
    /// 1. Built-in defaults
    /// 2. Config file (<config dir>/outfit-composer/config.toml)
    /// 3. Explicit config file (optional)
    /// 4. Environment variables (OUTFIT_*)
    pub fn load(config_path: Option<&str>) -> Result<Self, TypesError> {
        let config_dir = ProjectDirs::from("", "", "outfit-composer")
            .map(|p| p.config_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        let default_config_path = config_dir.join("config");

        let mut builder = Config::builder()
            .set_default("source_timeout_ms", default_source_timeout() as i64)
            .map_err(|e| TypesError::Config(e.to_string()))?
            .set_default("log_level", default_log_level())
            .map_err(|e| TypesError::Config(e.to_string()))?
            .add_source(File::with_name(&default_config_path.to_string_lossy()).required(false));

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // OUTFIT_LOG_LEVEL, OUTFIT_HEALING__MAX_ESCALATIONS, OUTFIT_SCORING__STYLE, ...
        builder = builder.add_source(
            Environment::with_prefix("OUTFIT")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings: ComposerSettings = builder
            .build()
            .map_err(|e| TypesError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| TypesError::Config(e.to_string()))?;

        settings.validate()?;
        Ok(settings)
    }

    /// Validate all sections.
    pub fn validate(&self) -> Result<(), TypesError> {
        self.scoring.validate().map_err(TypesError::Config)?;
        self.weather.validate().map_err(TypesError::Config)?;
        if self.limits.max_tops == 0 || self.limits.max_shoes == 0 {
            return Err(TypesError::Config(
                "limits for tops and shoes must be > 0".to_string(),
            ));
        }
        if self.source_timeout_ms == 0 {
            return Err(TypesError::Config("source_timeout_ms must be > 0".to_string()));
        }
        Ok(())
    }

    pub fn source_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.source_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = ComposerSettings::default();
        assert_eq!(settings.healing.max_escalations, 3);
        assert_eq!(settings.healing.max_attempts(), 4);
        assert_eq!(settings.limits.max_tops, 2);
        assert_eq!(settings.log_level, "info");
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_default_weights_sum_to_one() {
        let weights = ScoringWeights::default();
        assert!((weights.total() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_load_with_defaults() {
        let settings = ComposerSettings::load(None).unwrap();
        assert_eq!(settings.source_timeout_ms, 2000);
    }

    #[test]
    fn test_weather_threshold_validation() {
        let mut thresholds = WeatherThresholds::default();
        assert!(thresholds.validate().is_ok());

        thresholds.cold_exclusion_f = 80.0;
        assert!(thresholds.validate().is_err());
    }

    #[test]
    fn test_negative_weight_rejected() {
        let settings = ComposerSettings {
            scoring: ScoringWeights {
                style: -1.0,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(matches!(settings.validate(), Err(TypesError::Config(_))));
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let settings: ComposerSettings =
            serde_json::from_str(r#"{"healing": {"max_escalations": 1}}"#).unwrap();
        assert_eq!(settings.healing.max_escalations, 1);
        assert_eq!(settings.limits.max_accessories, 3);
    }
}
