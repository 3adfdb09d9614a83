use serde::{Deserialize, Serialize};

use crate::{DEFAULT_ZOOM, EngineError, MAX_BATCH, MAX_TAKE, MAX_ZOOM, MIN_ZOOM, PARALLEL_CHUNKS, Result};

/// Tunables of an [`crate::Engine`]. Every field has a default, so partial
/// configuration files are fine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Largest number of cells per read.
    pub max_take: usize,
    /// Capacity of the edit overlay, also the largest commit batch.
    pub max_batch: usize,
    /// Reads in flight at once during a resync.
    pub parallel_chunks: usize,
    pub min_zoom: u32,
    pub max_zoom: u32,
    pub initial_zoom: u32,
    /// Fill the `created_at` idempotency field of committed cells.
    pub stamp_commits: bool,
    /// Buffered events per subscriber before slow subscribers start lagging.
    pub event_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_take: MAX_TAKE,
            max_batch: MAX_BATCH,
            parallel_chunks: PARALLEL_CHUNKS,
            min_zoom: MIN_ZOOM,
            max_zoom: MAX_ZOOM,
            initial_zoom: DEFAULT_ZOOM,
            stamp_commits: true,
            event_capacity: 1024,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_take == 0 {
            return Err(EngineError::invalid_config("max_take must be at least 1"));
        }
        if self.max_batch == 0 {
            return Err(EngineError::invalid_config("max_batch must be at least 1"));
        }
        if self.parallel_chunks == 0 {
            return Err(EngineError::invalid_config("parallel_chunks must be at least 1"));
        }
        if self.event_capacity == 0 {
            return Err(EngineError::invalid_config("event_capacity must be at least 1"));
        }
        if self.min_zoom == 0 || self.min_zoom > self.max_zoom {
            return Err(EngineError::invalid_config(format!(
                "zoom range {}..={} is empty or starts at 0",
                self.min_zoom, self.max_zoom
            )));
        }
        if !(self.min_zoom..=self.max_zoom).contains(&self.initial_zoom) {
            return Err(EngineError::invalid_config(format!(
                "initial_zoom {} is outside {}..={}",
                self.initial_zoom, self.min_zoom, self.max_zoom
            )));
        }
        Ok(())
    }
}
