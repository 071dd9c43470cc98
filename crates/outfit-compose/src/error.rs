//! Compose error types.
//!
//! None of these escape `OutfitComposer::compose`; they surface only from
//! table loading and the wardrobe-source seam.

use thiserror::Error;

use outfit_types::TypesError;

/// Errors that can occur around the composition pipeline.
#[derive(Debug, Error)]
pub enum ComposeError {
    /// Error from the types layer (config, ingestion)
    #[error(transparent)]
    Types(#[from] TypesError),

    /// Compatibility table asset could not be parsed
    #[error("Compatibility tables error: {0}")]
    Tables(String),

    /// Wardrobe source failed
    #[error("Wardrobe source error: {0}")]
    Source(String),

    /// Wardrobe source did not answer in time
    #[error("Wardrobe source timed out after {0}ms")]
    Timeout(u64),
}
