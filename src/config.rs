//! Configuration of a complete detector.
//!
//! Every field falls back to its default, so a config document only needs to name what differs:
//!
//! ```json
//! {
//!     "spatial_pooler": { "input_size": 256, "column_count": 1024 },
//!     "temporal_memory": { "column_count": 1024 },
//!     "scorer": { "anomaly_threshold": 0.6 }
//! }
//! ```

use crate::core::{
    anomaly::{AnomalyScorer, AnomalyScorerParams},
    spatial_pooler::{SpatialPooler, SpatialPoolerParams},
    temporal_memory::{TemporalMemory, TemporalMemoryParams},
};
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Parameters of the pooler, the memory and the scorer of one detector.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    pub spatial_pooler: SpatialPoolerParams,
    pub temporal_memory: TemporalMemoryParams,
    pub scorer: AnomalyScorerParams,
}

impl DetectorConfig {
    /// Parses a config from a JSON document.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Builds the pooler, the memory and the scorer wrapping them.
    pub fn build(&self) -> Result<AnomalyScorer> {
        let sp = SpatialPooler::new(self.spatial_pooler.clone())?;
        let tm = TemporalMemory::new(self.temporal_memory.clone())?;
        AnomalyScorer::new(sp, tm, self.scorer.clone())
    }
}
