//! The `SpatialPooler` turns a binary input vector into a fixed-size set of active columns:
//! - Every column has a potential synapse to every input bit, with a learned permanence.
//! - Computes an "overlap" score for each column: the number of active input bits it is connected to.
//! - Enforces sparse activity via global inhibition, only the top columns by overlap become active.
//! - Learns by increasing/decreasing the permanence of the active columns' synapses depending on
//!   whether the corresponding input bit was active/inactive.
//!
//! Each active column thereby "tunes" its connections toward the input patterns it wins for,
//! producing a sparse distributed representation of the input space.
//!
//! Exactly `round(num_columns * sparsity)` columns are active after every call, even when no
//! column overlaps the input at all. Ties are broken by ascending column index, so the output is
//! fully determined by the permanences and the input.

use super::synapses::{SynapsePermanenceOptions, Synapses};
use crate::error::{HtmError, Result};
use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// Construction parameters of a `SpatialPooler`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpatialPoolerParams {
    /// Width of the binary input vector.
    pub input_size: usize,
    /// Number of columns.
    pub column_count: usize,
    /// Target fraction of active columns.
    pub sparsity: f64,
    /// Seed of the random source used to draw the permanences.
    pub seed: u64,
}

impl Default for SpatialPoolerParams {
    fn default() -> Self {
        Self {
            input_size: 2048,
            column_count: 2048,
            sparsity: 0.02,
            seed: 42,
        }
    }
}

impl SpatialPoolerParams {
    /// Checks that the parameters describe a usable pooler.
    pub fn validate(&self) -> Result<()> {
        if self.input_size == 0 {
            return Err(HtmError::invalid("input_size", "must be greater than zero"));
        }
        if self.column_count == 0 {
            return Err(HtmError::invalid("column_count", "must be greater than zero"));
        }
        if !(0.0..=1.0).contains(&self.sparsity) {
            return Err(HtmError::invalid(
                "sparsity",
                format!("must lie in [0, 1], got {}", self.sparsity),
            ));
        }
        Ok(())
    }
}

/// The SpatialPooler manages a set of columns that compete to represent the input space.
/// It computes overlaps, applies global inhibition, and adapts synapses of the winners during learning.
/// Synapse management is performed via the embedded `Synapses` pool.
#[derive(Debug)]
pub struct SpatialPooler {
    /// A seeded pseudo-random number generator, drawn from on construction and on every reset.
    pub rand: StdRng,

    /// The total number of compute iterations performed so far (whether learning or not).
    pub iteration_num: u32,

    /// The number of compute iterations performed so far with learning enabled.
    pub iteration_learn_num: u32,

    /// The total number of bits/inputs available.
    pub num_inputs: usize,

    /// The total number of columns in the Spatial Pooler.
    pub num_columns: usize,

    /// Settings for how synapse permanence is initialized, incremented/decremented and connected.
    pub synapse_permanence_options: SynapsePermanenceOptions,

    sparsity: f64,

    num_active_columns: usize,

    /// A pool managing all synapse data. Stores a contiguous block of synapses for every column in one big array.
    pub synapses: Synapses,

    /// Represents each iteration how many connected synapses map to active input bits for each column.
    pub overlaps: Vec<u32>,

    /// The indices of columns that won the inhibition process this iteration (i.e., the active columns).
    pub active_columns: Vec<usize>,
}

impl SpatialPooler {
    /// Creates a new `SpatialPooler` whose random source is seeded from `params.seed`.
    #[inline]
    pub fn new(params: SpatialPoolerParams) -> Result<Self> {
        let rng = StdRng::seed_from_u64(params.seed);
        Self::with_rng(params, rng)
    }

    /// Creates a new `SpatialPooler` drawing its initial permanences from `rng`.
    pub fn with_rng(params: SpatialPoolerParams, rng: StdRng) -> Result<Self> {
        params.validate()?;

        let num_active_columns = (params.column_count as f64 * params.sparsity).round() as usize;

        let mut pooler = Self {
            rand: rng,
            iteration_num: 0,
            iteration_learn_num: 0,
            num_inputs: params.input_size,
            num_columns: params.column_count,
            synapse_permanence_options: SynapsePermanenceOptions::default(),
            sparsity: params.sparsity,
            num_active_columns,
            synapses: Synapses::new(params.column_count, params.input_size),
            overlaps: vec![0; params.column_count],
            active_columns: Vec::with_capacity(num_active_columns),
        };
        pooler.connect_and_configure_inputs();

        debug!(
            inputs = pooler.num_inputs,
            columns = pooler.num_columns,
            active = num_active_columns,
            "spatial pooler initialized"
        );

        Ok(pooler)
    }

    /// Processes the current `input_pattern`:
    /// - Updates iteration counters.
    /// - Calculates overlaps between columns and the input.
    /// - Performs inhibition to pick the active columns.
    ///
    /// If learning is enabled, updates the synapse permanence values of the active columns.
    ///
    /// # Panics
    ///
    /// If `input_pattern` is not exactly `num_inputs` bits wide.
    #[inline]
    pub fn compute(&mut self, input_pattern: &[bool], learn: bool) -> &[usize] {
        assert_eq!(
            input_pattern.len(),
            self.num_inputs,
            "Input vector has {} bits, the spatial pooler expects {}",
            input_pattern.len(),
            self.num_inputs
        );

        self.update_iteration_number(learn);
        self.calculate_overlaps(input_pattern);
        self.inhibit_columns();

        if learn {
            self.adapt_synapses(input_pattern);
        }

        trace!(
            iteration = self.iteration_num,
            learn,
            max_overlap = self.overlaps.iter().copied().max().unwrap_or(0),
            "spatial pooler step"
        );

        &self.active_columns
    }

    /// Adjusts synapses for each active column after an input is processed:
    /// - Increments permanence of synapses whose input bit was active.
    /// - Decrements permanence of synapses whose input bit was inactive.
    /// - Clamps permanence values to their valid bounds.
    ///
    /// Columns that did not win are left untouched.
    #[inline]
    pub fn adapt_synapses(&mut self, input_pattern: &[bool]) {
        for &col in &self.active_columns {
            self.synapses
                .adapt_column(col, input_pattern, &self.synapse_permanence_options);
        }
    }

    /// Calculates the raw overlap for each column with the current input:
    /// - Counts how many connected synapses map to an active input bit, storing that count in `self.overlaps[col]`.
    #[inline]
    pub fn calculate_overlaps(&mut self, input_pattern: &[bool]) {
        let connected = self.synapse_permanence_options.connected;
        for (col, overlap) in self.overlaps.iter_mut().enumerate() {
            *overlap = self.synapses.overlap(col, input_pattern, connected);
        }
    }

    /// Increments the global iteration counters, including a separate counter if `learn` is true.
    #[inline]
    pub fn update_iteration_number(&mut self, learn: bool) {
        self.iteration_num = self.iteration_num.wrapping_add(1);
        if learn {
            self.iteration_learn_num = self.iteration_learn_num.wrapping_add(1);
        }
    }

    /// Implements global inhibition: columns are sorted by overlap, and the top ones are selected.
    /// - Sorts every column by overlap descending, equal overlaps by ascending index.
    /// - Keeps exactly `num_active_columns` of them, whatever their overlap.
    #[inline]
    pub fn inhibit_columns(&mut self) {
        let mut candidates: Vec<_> = (0..self.num_columns).collect();
        candidates.sort_unstable_by(|&a, &b| {
            self.overlaps[b]
                .cmp(&self.overlaps[a])
                .then_with(|| a.cmp(&b))
        });
        self.active_columns.clear();
        self.active_columns
            .extend(&candidates[..self.num_active_columns.min(self.num_columns)]);
    }

    /// Draws a fresh permanence for every (column, input) synapse from the random source.
    #[inline]
    pub fn connect_and_configure_inputs(&mut self) {
        self.synapses
            .randomize(&self.synapse_permanence_options, &mut self.rand);
    }

    /// Forgets everything learned: redraws the whole permanence matrix.
    ///
    /// The random source is not reseeded, so the new matrix differs from the initial one.
    pub fn reset(&mut self) {
        self.connect_and_configure_inputs();
        self.overlaps.fill(0);
        self.active_columns.clear();
        debug!("spatial pooler reset");
    }

    /// The configured fraction of active columns.
    pub fn sparsity(&self) -> f64 {
        self.sparsity
    }

    /// The number of columns active after every `compute`.
    pub fn active_columns_count(&self) -> usize {
        self.num_active_columns
    }
}
