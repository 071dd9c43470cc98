//! Final validator.
//!
//! A fixed battery of independent, read-only checks over a finished outfit:
//!
//! | name      | checks                                                   |
//! |-----------|----------------------------------------------------------|
//! | harmony   | color clashes, too many colors, patterns, materials      |
//! | occasion  | athletic footwear at formal events, formality gaps       |
//! | structure | missing categories, gate violations, category limits     |
//! | style     | formality spread, style mismatch, item and accessory count |
//! | weather   | graduated heavy/light thresholds, outerwear, wet weather |
//!
//! Validators run in name order and their issues are concatenated in that
//! order, so results are identical however the battery is assembled.
//! Every issue carries a typed [`IssueCode`]; healing dispatches on codes.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use outfit_types::{CategoryLimits, ClothingItem, WeatherCondition, WeatherThresholds};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::classifier::{ItemClassifier, ItemProfile};
use crate::context::GenerationContext;
use crate::gate::{self, GateReason};
use crate::harmony;
use crate::rules::{self, occasion_verdict, OccasionVerdict};
use crate::selection::category_limit;
use crate::tables::{CompatibilityTables, StyleMatch};
use crate::types::Category;

/// What an issue is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCode {
    // structure
    MissingCategory,
    MissingPreferred,
    DuplicateItem,
    DuplicateDress,
    DuplicateShirt,
    DressWithSeparates,
    CategoryOverLimit,
    // occasion
    OccasionMismatch,
    FormalityMismatch,
    // weather
    TooWarm,
    TooCold,
    MissingOuterwear,
    WetWeatherMaterial,
    // style
    StyleClash,
    StyleMismatch,
    TooManyItems,
    TooManyAccessories,
    // harmony
    ColorClash,
    TooManyColors,
    PatternOverload,
    MaterialClash,
}

impl IssueCode {
    /// Structural problems the duplicate fix repairs.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            IssueCode::MissingCategory
                | IssueCode::DuplicateItem
                | IssueCode::DuplicateDress
                | IssueCode::DuplicateShirt
                | IssueCode::DressWithSeparates
                | IssueCode::CategoryOverLimit
        )
    }

    pub fn is_weather(&self) -> bool {
        matches!(
            self,
            IssueCode::TooWarm
                | IssueCode::TooCold
                | IssueCode::MissingOuterwear
                | IssueCode::WetWeatherMaterial
        )
    }

    /// Occasion and style problems the style fix repairs.
    pub fn is_style(&self) -> bool {
        matches!(
            self,
            IssueCode::OccasionMismatch
                | IssueCode::FormalityMismatch
                | IssueCode::StyleClash
                | IssueCode::StyleMismatch
        )
    }
}

impl From<GateReason> for IssueCode {
    fn from(reason: GateReason) -> Self {
        match reason {
            GateReason::DuplicateItem => IssueCode::DuplicateItem,
            GateReason::DuplicateDress => IssueCode::DuplicateDress,
            GateReason::DuplicateShirt => IssueCode::DuplicateShirt,
            GateReason::DressWithBottom
            | GateReason::DressWithTop
            | GateReason::BottomWithDress
            | GateReason::TopWithDress => IssueCode::DressWithSeparates,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueLevel {
    /// Blocking
    Error,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    /// Name of the validator that raised it
    pub validator: String,
    pub code: IssueCode,
    pub level: IssueLevel,
    pub message: String,
    pub item_id: Option<String>,
    /// Position of the item in the validated outfit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_index: Option<usize>,
    pub category: Option<Category>,
    pub suggestion: Option<String>,
}

impl ValidationIssue {
    fn new(validator: &str, code: IssueCode, level: IssueLevel, message: impl Into<String>) -> Self {
        Self {
            validator: validator.to_string(),
            code,
            level,
            message: message.into(),
            item_id: None,
            item_index: None,
            category: None,
            suggestion: None,
        }
    }

    fn error(validator: &str, code: IssueCode, message: impl Into<String>) -> Self {
        Self::new(validator, code, IssueLevel::Error, message)
    }

    fn warning(validator: &str, code: IssueCode, message: impl Into<String>) -> Self {
        Self::new(validator, code, IssueLevel::Warning, message)
    }

    fn for_item(mut self, index: usize, item: &ClothingItem, category: Category) -> Self {
        self.item_id = (!item.id.is_empty()).then(|| item.id.clone());
        self.item_index = Some(index);
        self.category = Some(category);
        self
    }

    fn in_category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    fn suggest(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.validator, self.message)
    }
}

/// Aggregate severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    #[default]
    None,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Warning count at which severity becomes high.
    pub const HIGH_WARNING_COUNT: usize = 3;

    pub fn from_counts(errors: usize, warnings: usize) -> Self {
        if errors > 0 {
            Severity::Critical
        } else if warnings >= Self::HIGH_WARNING_COUNT {
            Severity::High
        } else if warnings > 0 {
            Severity::Medium
        } else {
            Severity::None
        }
    }
}

/// Output of the final validator. Immutable once built.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
    pub suggestions: Vec<String>,
    pub severity: Severity,
}

impl ValidationResult {
    /// Split issues by level and derive validity and severity.
    pub fn from_issues(issues: Vec<ValidationIssue>) -> Self {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();
        let mut suggestions: Vec<String> = Vec::new();

        for issue in issues {
            if let Some(suggestion) = &issue.suggestion {
                if !suggestions.contains(suggestion) {
                    suggestions.push(suggestion.clone());
                }
            }
            match issue.level {
                IssueLevel::Error => errors.push(issue),
                IssueLevel::Warning => warnings.push(issue),
            }
        }

        let severity = Severity::from_counts(errors.len(), warnings.len());
        Self {
            valid: errors.is_empty(),
            errors,
            warnings,
            suggestions,
            severity,
        }
    }

    pub fn has_error(&self, code: IssueCode) -> bool {
        self.errors.iter().any(|e| e.code == code)
    }

    /// Distinct error codes, sorted.
    pub fn error_codes(&self) -> BTreeSet<IssueCode> {
        self.errors.iter().map(|e| e.code).collect()
    }
}

/// An outfit with each item's derived profile.
pub struct ProfiledOutfit<'a> {
    pub items: Vec<(&'a ClothingItem, ItemProfile)>,
}

impl<'a> ProfiledOutfit<'a> {
    pub fn new(items: &'a [ClothingItem], classifier: &ItemClassifier) -> Self {
        Self {
            items: items.iter().map(|i| (i, classifier.describe(i))).collect(),
        }
    }

    pub fn count(&self, category: Category) -> usize {
        self.items
            .iter()
            .filter(|(_, p)| p.category == category)
            .count()
    }

    pub fn has_dress(&self) -> bool {
        self.count(Category::Dress) > 0
    }

    pub fn raw(&self) -> Vec<&'a ClothingItem> {
        self.items.iter().map(|(i, _)| *i).collect()
    }
}

/// One independent check.
pub trait OutfitValidator: Send + Sync {
    /// Stable name; determines output order.
    fn name(&self) -> &'static str;

    fn check(&self, outfit: &ProfiledOutfit<'_>, ctx: &GenerationContext) -> Vec<ValidationIssue>;
}

/// Runs the validator battery.
pub struct FinalValidator {
    classifier: Arc<ItemClassifier>,
    validators: Vec<Box<dyn OutfitValidator>>,
}

impl FinalValidator {
    /// The standard battery.
    pub fn new(
        classifier: Arc<ItemClassifier>,
        tables: Arc<CompatibilityTables>,
        thresholds: WeatherThresholds,
        limits: CategoryLimits,
    ) -> Self {
        Self::with_validators(
            classifier.clone(),
            vec![
                Box::new(WeatherValidator::new(thresholds)),
                Box::new(StyleValidator {
                    limits: limits.clone(),
                }),
                Box::new(StructureValidator { classifier, limits }),
                Box::new(OccasionValidator::new(tables)),
                Box::new(HarmonyValidator),
            ],
        )
    }

    pub fn with_validators(
        classifier: Arc<ItemClassifier>,
        mut validators: Vec<Box<dyn OutfitValidator>>,
    ) -> Self {
        validators.sort_by_key(|v| v.name());
        Self {
            classifier,
            validators,
        }
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.validators.iter().map(|v| v.name()).collect()
    }

    pub fn validate(&self, outfit: &[ClothingItem], ctx: &GenerationContext) -> ValidationResult {
        let profiled = ProfiledOutfit::new(outfit, &self.classifier);
        let issues: Vec<ValidationIssue> = self
            .validators
            .iter()
            .flat_map(|v| v.check(&profiled, ctx))
            .collect();

        let result = ValidationResult::from_issues(issues);
        debug!(
            valid = result.valid,
            errors = result.errors.len(),
            warnings = result.warnings.len(),
            severity = ?result.severity,
            "Outfit validated"
        );
        result
    }
}

const FORMAL_FOOTWEAR_SUGGESTION: &str = "Swap for dress shoes, loafers, or oxfords";

/// Occasion appropriateness.
pub struct OccasionValidator {
    tables: Arc<CompatibilityTables>,
}

impl OccasionValidator {
    pub fn new(tables: Arc<CompatibilityTables>) -> Self {
        Self { tables }
    }
}

impl OutfitValidator for OccasionValidator {
    fn name(&self) -> &'static str {
        "occasion"
    }

    fn check(&self, outfit: &ProfiledOutfit<'_>, ctx: &GenerationContext) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        if ctx.occasion.is_empty() {
            return issues;
        }
        let rule = &ctx.occasion_rule;
        let query = ctx.occasion_query();

        for (index, (item, profile)) in outfit.items.iter().enumerate() {
            let category = profile.category;
            if category == Category::Other {
                continue;
            }
            let name = item.display_name();

            // One issue per item, most specific first
            if rule.forbids_athletic_footwear
                && category == Category::Shoes
                && rules::is_athletic_footwear(item)
            {
                issues.push(
                    ValidationIssue::error(
                        self.name(),
                        IssueCode::OccasionMismatch,
                        format!("'{name}' is athletic footwear, not appropriate for {}", ctx.occasion),
                    )
                    .for_item(index, item, category)
                    .suggest(FORMAL_FOOTWEAR_SUGGESTION),
                );
                continue;
            }

            let verdict = occasion_verdict(item, profile, &query, &self.tables);
            if verdict == OccasionVerdict::Contradiction {
                issues.push(
                    ValidationIssue::error(
                        self.name(),
                        IssueCode::OccasionMismatch,
                        format!("'{name}' does not suit {}", ctx.occasion),
                    )
                    .for_item(index, item, category)
                    .suggest(format!("Choose a {category} meant for {}", ctx.occasion)),
                );
                continue;
            }

            if category != Category::Accessory {
                let gap = rule.formality_gap(profile.formality);
                if gap > 0 {
                    let message = format!(
                        "'{name}' is {} but {} calls for {} to {}",
                        profile.formality.as_str(),
                        ctx.occasion,
                        rule.min_formality.as_str(),
                        rule.max_formality.as_str()
                    );
                    let issue = if gap >= 2 {
                        ValidationIssue::error(self.name(), IssueCode::FormalityMismatch, message)
                    } else {
                        ValidationIssue::warning(self.name(), IssueCode::FormalityMismatch, message)
                    };
                    issues.push(issue.for_item(index, item, category));
                    continue;
                }
            }

            if verdict == OccasionVerdict::Mismatch {
                issues.push(
                    ValidationIssue::warning(
                        self.name(),
                        IssueCode::OccasionMismatch,
                        format!("'{name}' is tagged for other occasions"),
                    )
                    .for_item(index, item, category),
                );
            }
        }
        issues
    }
}

/// Graduated temperature and condition checks.
pub struct WeatherValidator {
    thresholds: WeatherThresholds,
}

impl WeatherValidator {
    pub fn new(thresholds: WeatherThresholds) -> Self {
        Self { thresholds }
    }
}

impl OutfitValidator for WeatherValidator {
    fn name(&self) -> &'static str {
        "weather"
    }

    fn check(&self, outfit: &ProfiledOutfit<'_>, ctx: &GenerationContext) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        let th = &self.thresholds;
        let condition = ctx.weather.condition;

        for (index, (item, profile)) in outfit.items.iter().enumerate() {
            let category = profile.category;
            let name = item.display_name();

            if condition == WeatherCondition::Snow
                && category == Category::Shoes
                && rules::is_open_footwear(item)
            {
                issues.push(
                    ValidationIssue::error(
                        self.name(),
                        IssueCode::TooCold,
                        format!("'{name}' leaves feet exposed in snow"),
                    )
                    .for_item(index, item, category)
                    .suggest("Wear closed boots"),
                );
                continue;
            }

            if let Some(t) = ctx.weather.temperature_f {
                if rules::is_heavy(item) && t > th.heavy_warning_above_f {
                    let message = format!("'{name}' is too heavy for {t:.0}°F");
                    let issue = if t > th.heavy_error_above_f {
                        ValidationIssue::error(self.name(), IssueCode::TooWarm, message)
                    } else {
                        ValidationIssue::warning(self.name(), IssueCode::TooWarm, message)
                    };
                    issues.push(issue.for_item(index, item, category).suggest(format!(
                        "Swap for a lighter {category}"
                    )));
                    continue;
                }
                if rules::is_warm_weather_only(item) && t < th.light_warning_below_f {
                    let message = format!("'{name}' is too light for {t:.0}°F");
                    let issue = if t < th.light_error_below_f {
                        ValidationIssue::error(self.name(), IssueCode::TooCold, message)
                    } else {
                        ValidationIssue::warning(self.name(), IssueCode::TooCold, message)
                    };
                    issues.push(issue.for_item(index, item, category).suggest(format!(
                        "Swap for a warmer {category}"
                    )));
                    continue;
                }
            }

            if condition.is_wet() && rules::is_water_sensitive(item) {
                issues.push(
                    ValidationIssue::warning(
                        self.name(),
                        IssueCode::WetWeatherMaterial,
                        format!("'{name}' may be damaged by {}", condition.as_str()),
                    )
                    .for_item(index, item, category),
                );
            }
        }

        if let Some(t) = ctx.weather.temperature_f {
            if t < th.outerwear_advised_below_f && outfit.count(Category::Outerwear) == 0 {
                issues.push(
                    ValidationIssue::warning(
                        self.name(),
                        IssueCode::MissingOuterwear,
                        format!("No outerwear at {t:.0}°F"),
                    )
                    .in_category(Category::Outerwear)
                    .suggest("Add a coat or jacket"),
                );
            }
        }
        issues
    }
}

/// Formality spread across these levels or more is a clash.
pub(crate) const FORMALITY_CLASH_SPREAD: u8 = 3;

/// Minimalist outfits above this many items read as cluttered.
const MINIMALIST_MAX_ITEMS: usize = 5;

/// Style cohesion.
pub struct StyleValidator {
    limits: CategoryLimits,
}

impl OutfitValidator for StyleValidator {
    fn name(&self) -> &'static str {
        "style"
    }

    fn check(&self, outfit: &ProfiledOutfit<'_>, ctx: &GenerationContext) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();

        let garments: Vec<(usize, &(&ClothingItem, ItemProfile))> = outfit
            .items
            .iter()
            .enumerate()
            .filter(|(_, (_, p))| !matches!(p.category, Category::Accessory | Category::Other))
            .collect();

        if let Some((index, item, profile)) = formality_outlier(&garments) {
            issues.push(
                ValidationIssue::error(
                    self.name(),
                    IssueCode::StyleClash,
                    format!(
                        "'{}' ({}) clashes with the formality of the rest of the outfit",
                        item.display_name(),
                        profile.formality.as_str()
                    ),
                )
                .for_item(index, item, profile.category)
                .suggest(format!("Swap the {} for one closer in formality", profile.category)),
            );
        }

        if !ctx.style.is_empty() {
            for &(index, (item, profile)) in &garments {
                if ctx.style_match(&item.style) == StyleMatch::None {
                    issues.push(
                        ValidationIssue::warning(
                            self.name(),
                            IssueCode::StyleMismatch,
                            format!("'{}' does not match {} style", item.display_name(), ctx.style),
                        )
                        .for_item(index, item, profile.category),
                    );
                }
            }
        }

        let total = outfit.items.len();
        let accessories = outfit.count(Category::Accessory);
        if ctx.is_minimalist() {
            if accessories > self.limits.minimalist_accessories {
                issues.push(
                    ValidationIssue::warning(
                        self.name(),
                        IssueCode::TooManyAccessories,
                        format!("{accessories} accessories is a lot for a minimalist look"),
                    )
                    .in_category(Category::Accessory)
                    .suggest("Keep one statement accessory"),
                );
            }
            if total > MINIMALIST_MAX_ITEMS {
                issues.push(ValidationIssue::warning(
                    self.name(),
                    IssueCode::TooManyItems,
                    format!("{total} items is busy for a minimalist look"),
                ));
            }
        } else if total > self.limits.max_total_items {
            issues.push(ValidationIssue::warning(
                self.name(),
                IssueCode::TooManyItems,
                format!("{total} items exceeds the usual {}", self.limits.max_total_items),
            ));
        }
        issues
    }
}

/// The item farthest from the median formality, when the spread is too wide.
/// Ties go to the later item, which was selected with lower priority.
fn formality_outlier<'a>(
    garments: &[(usize, &'a (&'a ClothingItem, ItemProfile))],
) -> Option<(usize, &'a ClothingItem, ItemProfile)> {
    let mut levels: Vec<u8> = garments.iter().map(|(_, (_, p))| p.formality.level()).collect();
    levels.sort_unstable();
    let (min, max) = (*levels.first()?, *levels.last()?);
    if max - min < FORMALITY_CLASH_SPREAD {
        return None;
    }
    let median = levels[(levels.len() - 1) / 2];

    garments
        .iter()
        .max_by_key(|(_, (_, p))| p.formality.level().abs_diff(median))
        .map(|&(index, &(item, profile))| (index, item, profile))
}

/// Completeness and invariant-gate rules.
pub struct StructureValidator {
    classifier: Arc<ItemClassifier>,
    limits: CategoryLimits,
}

impl OutfitValidator for StructureValidator {
    fn name(&self) -> &'static str {
        "structure"
    }

    fn check(&self, outfit: &ProfiledOutfit<'_>, ctx: &GenerationContext) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        let raw: Vec<ClothingItem> = outfit.raw().into_iter().cloned().collect();

        for violation in gate::violations(&raw, &self.classifier) {
            let item = &raw[violation.index];
            issues.push(
                ValidationIssue::error(
                    self.name(),
                    IssueCode::from(violation.reason),
                    format!("'{}': {}", item.display_name(), violation.reason.as_str()),
                )
                .for_item(violation.index, item, violation.category),
            );
        }

        let targets = ctx.effective_targets(outfit.has_dress());
        for category in targets.required_categories() {
            if outfit.count(category) == 0 {
                issues.push(
                    ValidationIssue::error(
                        self.name(),
                        IssueCode::MissingCategory,
                        format!("Outfit has no {category}"),
                    )
                    .in_category(category)
                    .suggest(format!("Add a {category}")),
                );
            }
        }
        for category in targets.preferred.keys() {
            if outfit.count(*category) == 0 && !targets.is_required(*category) {
                issues.push(
                    ValidationIssue::warning(
                        self.name(),
                        IssueCode::MissingPreferred,
                        format!("Consider adding a {category}"),
                    )
                    .in_category(*category),
                );
            }
        }

        for category in Category::ALL {
            if category == Category::Other {
                continue;
            }
            let limit = category_limit(&self.limits, category, false);
            let count = outfit.count(category);
            if count > limit {
                issues.push(
                    ValidationIssue::error(
                        self.name(),
                        IssueCode::CategoryOverLimit,
                        format!("{count} items in {category}, limit is {limit}"),
                    )
                    .in_category(category),
                );
            }
        }
        issues
    }
}

/// Color and material harmony. Warnings only.
pub struct HarmonyValidator;

impl OutfitValidator for HarmonyValidator {
    fn name(&self) -> &'static str {
        "harmony"
    }

    fn check(&self, outfit: &ProfiledOutfit<'_>, _ctx: &GenerationContext) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        let items = outfit.raw();

        for (i, a) in items.iter().enumerate() {
            for b in &items[i + 1..] {
                if let (Some(ca), Some(cb)) = (a.color.as_deref(), b.color.as_deref()) {
                    if harmony::colors_clash(ca, cb) {
                        issues.push(ValidationIssue::warning(
                            self.name(),
                            IssueCode::ColorClash,
                            format!(
                                "{ca} '{}' clashes with {cb} '{}'",
                                a.display_name(),
                                b.display_name()
                            ),
                        ));
                    }
                }
            }
        }

        let accents = harmony::accent_colors(items.iter().copied());
        if accents.len() > harmony::MAX_ACCENT_COLORS {
            issues.push(
                ValidationIssue::warning(
                    self.name(),
                    IssueCode::TooManyColors,
                    format!("{} accent colors: {}", accents.len(), accents.join(", ")),
                )
                .suggest("Anchor the outfit with a neutral piece"),
            );
        }

        let patterned = items.iter().filter(|i| harmony::is_patterned(i)).count();
        if patterned > 1 {
            issues.push(ValidationIssue::warning(
                self.name(),
                IssueCode::PatternOverload,
                format!("{patterned} patterned items compete for attention"),
            ));
        }

        if let Some((sporty, dressy)) = harmony::material_clash(&items) {
            issues.push(ValidationIssue::warning(
                self.name(),
                IssueCode::MaterialClash,
                format!("{sporty} and {dressy} rarely work together"),
            ));
        }
        issues
    }
}
