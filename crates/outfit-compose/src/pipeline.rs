//! One generation pass: strict filter, scored selector, integrity check.
//!
//! The composer runs this once in strict mode; scratch regeneration runs it
//! again in relaxed mode.

use outfit_types::ClothingItem;
use tracing::debug;

use crate::context::GenerationContext;
use crate::filter::{FilterMode, FilterOutcome, StrictFilter};
use crate::integrity::IntegrityChecker;
use crate::selection::SelectionState;
use crate::selector::ScoredSelector;

/// Output of one pass.
#[derive(Debug, Clone)]
pub struct PipelineRun {
    pub state: SelectionState,
    pub filter: FilterOutcome,
    pub mode: FilterMode,
}

pub struct Pipeline {
    filter: StrictFilter,
    selector: ScoredSelector,
    integrity: IntegrityChecker,
}

impl Pipeline {
    pub fn new(filter: StrictFilter, selector: ScoredSelector, integrity: IntegrityChecker) -> Self {
        Self {
            filter,
            selector,
            integrity,
        }
    }

    pub fn filter(&self) -> &StrictFilter {
        &self.filter
    }

    pub fn selector(&self) -> &ScoredSelector {
        &self.selector
    }

    pub fn integrity(&self) -> &IntegrityChecker {
        &self.integrity
    }

    /// Filter, select and complete an outfit from a deduplicated wardrobe.
    pub fn run(&self, wardrobe: &[ClothingItem], ctx: &GenerationContext, mode: FilterMode) -> PipelineRun {
        let filter = self.filter.filter(wardrobe, ctx, mode);
        let selected = self.selector.select(&filter.candidates, ctx);
        let state = self
            .integrity
            .ensure_complete(selected, &filter.candidates, wardrobe, ctx);

        debug!(
            mode = ?mode,
            candidates = filter.candidates.len(),
            selected = state.len(),
            unfillable = state.unfillable.len(),
            "Pipeline pass complete"
        );

        PipelineRun {
            state,
            filter,
            mode,
        }
    }
}
