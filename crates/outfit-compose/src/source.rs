//! Wardrobe source seam.
//!
//! The wardrobe lives in external storage. The composer reads it through
//! [`WardrobeSource`] with a timeout; a failed or slow fetch narrows the
//! request to an empty wardrobe instead of failing it.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use outfit_types::{ingest_wardrobe, ClothingItem, IngestReport, WardrobeRecord};
use tracing::{debug, warn};

use crate::error::ComposeError;

/// Read-only access to a user's stored wardrobe.
#[async_trait]
pub trait WardrobeSource: Send + Sync {
    /// Fetch every record stored for `user_id`.
    async fn fetch_records(&self, user_id: &str) -> Result<Vec<WardrobeRecord>, ComposeError>;

    /// Name used in logs.
    fn name(&self) -> &str {
        "wardrobe"
    }
}

/// Fetch and ingest a user's wardrobe, bounded by `timeout`.
///
/// Errors and timeouts yield an empty wardrobe and a `warn!`.
pub async fn load_wardrobe(
    source: &dyn WardrobeSource,
    user_id: &str,
    timeout: Duration,
) -> (Vec<ClothingItem>, IngestReport) {
    let fetched = tokio::time::timeout(timeout, source.fetch_records(user_id)).await;

    let records = match fetched {
        Ok(Ok(records)) => {
            debug!(source = source.name(), records = records.len(), "Fetched wardrobe");
            records
        }
        Ok(Err(e)) => {
            warn!(source = source.name(), error = %e, "Wardrobe fetch failed, using empty wardrobe");
            Vec::new()
        }
        Err(_) => {
            let e = ComposeError::Timeout(timeout.as_millis() as u64);
            warn!(source = source.name(), error = %e, "Wardrobe fetch timed out, using empty wardrobe");
            Vec::new()
        }
    };

    ingest_wardrobe(user_id, records)
}

/// In-memory source for tests and benches.
#[derive(Default)]
pub struct MockWardrobeSource {
    /// Records per user
    pub records: HashMap<String, Vec<WardrobeRecord>>,
    /// Simulated latency
    pub delay: Option<Duration>,
    /// Fail every fetch
    pub fail: bool,
}

impl MockWardrobeSource {
    /// Store items for a user.
    pub fn with_items(mut self, user_id: &str, items: &[ClothingItem]) -> Self {
        self.records
            .entry(user_id.to_string())
            .or_default()
            .extend(items.iter().map(WardrobeRecord::from));
        self
    }

    /// Store raw records for a user.
    pub fn with_records(mut self, user_id: &str, records: Vec<WardrobeRecord>) -> Self {
        self.records
            .entry(user_id.to_string())
            .or_default()
            .extend(records);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_failure(mut self) -> Self {
        self.fail = true;
        self
    }
}

#[async_trait]
impl WardrobeSource for MockWardrobeSource {
    async fn fetch_records(&self, user_id: &str) -> Result<Vec<WardrobeRecord>, ComposeError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(ComposeError::Source("mock source failure".to_string()));
        }
        Ok(self.records.get(user_id).cloned().unwrap_or_default())
    }

    fn name(&self) -> &str {
        "mock"
    }
}
