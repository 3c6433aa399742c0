//! Online, HTM-inspired anomaly detection for streams of binary observation vectors.
//!
//! An [`encoders::Encoder`] turns each structured record into a fixed-width binary vector.
//! The [`AnomalyScorer`] feeds every vector through a [`SpatialPooler`], which picks a sparse
//! set of active columns, and a [`TemporalMemory`], which learns which column activations tend
//! to follow each other. The score of an observation is the fraction of its active cells that
//! were not predicted by the step before.
//!
//! ```rust
//! use htm_anomaly::{
//!     AnomalyScorer, AnomalyScorerParams, SpatialPooler, SpatialPoolerParams, TemporalMemory,
//!     TemporalMemoryParams,
//! };
//!
//! let sp = SpatialPooler::new(SpatialPoolerParams {
//!     input_size: 100,
//!     column_count: 500,
//!     ..Default::default()
//! })?;
//! let tm = TemporalMemory::new(TemporalMemoryParams {
//!     column_count: 500,
//!     ..Default::default()
//! })?;
//! let mut scorer = AnomalyScorer::new(sp, tm, AnomalyScorerParams::default())?;
//!
//! let score = scorer.compute_anomaly(&[false; 100], true);
//! assert!((0.0..=1.0).contains(&score));
//! # Ok::<(), htm_anomaly::HtmError>(())
//! ```

pub mod config;
pub mod core;
pub mod encoders;
pub mod error;

pub use crate::config::DetectorConfig;
pub use crate::core::{
    anomaly::{AnomalyScorer, AnomalyScorerParams, Metrics},
    spatial_pooler::{SpatialPooler, SpatialPoolerParams},
    temporal_memory::{CellAddress, TemporalMemory, TemporalMemoryParams},
};
pub use crate::error::{HtmError, Result};
