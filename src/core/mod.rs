//! The HTM pipeline: spatial pooling, sequence memory and anomaly scoring.

pub mod anomaly;
pub mod spatial_pooler;
pub mod synapses;
pub mod temporal_memory;
