//! The `TemporalMemory` module learns short sequences of column activations and predicts the next step.
//!
//! It models a set of columns, where each column contains multiple cells.
//! Each cell can own dendritic segments, which in turn consist of synapses onto other cells.
//!
//! Cell:
//! - An individual processing unit within a column, addressed by `CellAddress { col, cell }`.
//! - Cells of the same column represent different temporal contexts of the same input.
//!
//! Dendritic Segment (Segment):
//! - A cluster of synapses on a cell that detects a pattern of activity among other cells.
//! - A segment is active once enough of its connected synapses point at active cells;
//!   its owning cell then becomes predictive for the next step.
//!
//! Synapse:
//! - A connection from a presynaptic cell to a segment, with a permanence value.
//! - Synapses store the presynaptic cell's address, never a reference, so the cell graph
//!   is a plain arena with no ownership cycles.
//!
//! Bursting:
//! - When a column becomes active but none of its cells was predicted, all of its cells are
//!   activated and cell 0 is taken as the column's winner.
//!
//! Learning:
//! - A winner cell that owns no segment yet grows exactly one, connected to a random subset
//!   of the previous step's active cells.
//! - Existing segments are never reinforced, punished or removed. `permanence_increment` and
//!   `permanence_decrement` are accepted as parameters but the rule does not apply them.

use crate::error::{HtmError, Result};
use fxhash::FxHashSet;
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use serde::{Deserialize, Serialize};
use std::mem;
use tracing::{debug, trace};

/// Represents an address that uniquely identifies a cell by its column and cell indices.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellAddress {
    pub col: usize,
    pub cell: usize,
}

impl CellAddress {
    pub fn new(col: usize, cell: usize) -> Self {
        Self { col, cell }
    }
}

/// Represents a synapse that connects a segment to a presynaptic cell, holding a permanence value.
#[derive(Clone, Debug)]
pub struct Synapse {
    pub presynaptic_cell: CellAddress,
    pub permanence: f64,
}

/// Represents a dendritic segment which contains a list of synapses and belongs to a cell.
#[derive(Clone, Debug, Default)]
pub struct Segment {
    pub synapses: Vec<Synapse>,
}

/// Represents a cell that contains zero or more dendritic segments.
#[derive(Clone, Debug, Default)]
pub struct Cell {
    pub segments: Vec<Segment>,
}

/// Holds the parameters of the Temporal Memory.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemporalMemoryParams {
    pub column_count: usize,
    pub cells_per_column: usize,
    /// Minimum number of active, connected synapses for a segment to be active.
    pub activation_threshold: usize,
    pub connected_permanence: f64,
    /// Permanence of synapses on newly grown segments.
    pub initial_permanence: f64,
    /// Upper bound on the synapses of a newly grown segment.
    pub max_new_synapses: usize,
    /// Not applied by the learning rule.
    pub permanence_increment: f64,
    /// Not applied by the learning rule.
    pub permanence_decrement: f64,
    /// Seed of the random source used to sample presynaptic cells.
    pub seed: u64,
}

impl Default for TemporalMemoryParams {
    fn default() -> Self {
        Self {
            column_count: 2048,
            cells_per_column: 32,
            activation_threshold: 13,
            connected_permanence: 0.5,
            initial_permanence: 0.6,
            max_new_synapses: 15,
            permanence_increment: 0.1,
            permanence_decrement: 0.05,
            seed: 42,
        }
    }
}

impl TemporalMemoryParams {
    /// Checks that the parameters describe a usable memory.
    pub fn validate(&self) -> Result<()> {
        if self.column_count == 0 {
            return Err(HtmError::invalid("column_count", "must be greater than zero"));
        }
        if self.cells_per_column == 0 {
            return Err(HtmError::invalid("cells_per_column", "must be greater than zero"));
        }
        for (name, value) in [
            ("connected_permanence", self.connected_permanence),
            ("initial_permanence", self.initial_permanence),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(HtmError::invalid(name, format!("must lie in [0, 1], got {value}")));
            }
        }
        Ok(())
    }
}

/// Implements the simplified Temporal Memory used for anomaly detection.
///
/// Each call to `compute` activates the cells of the active columns (the predicted ones, or the
/// whole column when nothing was predicted), derives which cells are predictive for the next step,
/// and, when learning, grows first segments on winner cells.
#[derive(Debug)]
pub struct TemporalMemory {
    params: TemporalMemoryParams,

    /// Flat arena of all cells, indexed by `col * cells_per_column + cell`.
    cells: Vec<Cell>,

    // Prediction that was in force when the current step began.
    prev_predictive_cells: FxHashSet<CellAddress>,

    // Current state (t)
    active_cells: FxHashSet<CellAddress>,
    winner_cells: FxHashSet<CellAddress>,
    predictive_cells: FxHashSet<CellAddress>,

    // Current time step.
    t: u64,

    rand: StdRng,
}

impl TemporalMemory {
    /// Constructs a new Temporal Memory whose random source is seeded from `params.seed`.
    #[inline]
    pub fn new(params: TemporalMemoryParams) -> Result<Self> {
        let rng = StdRng::seed_from_u64(params.seed);
        Self::with_rng(params, rng)
    }

    /// Constructs a new Temporal Memory sampling presynaptic cells with `rng`:
    /// - Initializes `column_count * cells_per_column` cells without segments.
    /// - Pre-allocates the cell sets to avoid re-hashing.
    pub fn with_rng(params: TemporalMemoryParams, rng: StdRng) -> Result<Self> {
        params.validate()?;

        let num_cells = params.column_count * params.cells_per_column;
        let capacity = num_cells / 4;

        debug!(
            columns = params.column_count,
            cells_per_column = params.cells_per_column,
            "temporal memory initialized"
        );

        Ok(TemporalMemory {
            cells: vec![Cell::default(); num_cells],
            prev_predictive_cells: FxHashSet::with_capacity_and_hasher(capacity, Default::default()),
            active_cells: FxHashSet::with_capacity_and_hasher(capacity, Default::default()),
            winner_cells: FxHashSet::with_capacity_and_hasher(capacity, Default::default()),
            predictive_cells: FxHashSet::with_capacity_and_hasher(capacity, Default::default()),
            t: 0,
            rand: rng,
            params,
        })
    }

    /// Executes one time step of the Temporal Memory.
    ///
    /// - Snapshots the previous active and predictive cells, then clears the current state.
    /// - For each active column, activates the cells that were predicted or, failing that, bursts it.
    /// - Recomputes the predictive cells from the new active cells.
    /// - If `learn` is true, grows a first segment on every winner cell that has none.
    ///
    /// # Panics
    ///
    /// If an index in `active_columns` is not below `column_count`.
    #[inline]
    pub fn compute(
        &mut self,
        active_columns: &[usize],
        learn: bool,
    ) -> (&FxHashSet<CellAddress>, &FxHashSet<CellAddress>) {
        mem::swap(&mut self.prev_predictive_cells, &mut self.predictive_cells);
        let prev_active_cells = mem::take(&mut self.active_cells);
        self.winner_cells.clear();

        let mut bursts = 0;
        for &col in active_columns {
            assert!(
                col < self.params.column_count,
                "Active column {} out of range for {} columns",
                col,
                self.params.column_count
            );
            if !self.activate_predicted_column(col) {
                self.burst_column(col);
                bursts += 1;
            }
        }

        self.predictive_cells = self.compute_predictive_cells();

        if learn {
            self.learn(&prev_active_cells);
        }

        self.t += 1;

        trace!(
            t = self.t,
            columns = active_columns.len(),
            bursts,
            active = self.active_cells.len(),
            predictive = self.predictive_cells.len(),
            "temporal memory step"
        );

        (&self.active_cells, &self.predictive_cells)
    }

    /// Activates the cells in a column that were predicted in the previous time step.
    /// Every predicted cell becomes both active and a winner.
    ///
    /// Returns false if no cell of the column was predicted.
    #[inline]
    pub fn activate_predicted_column(&mut self, col: usize) -> bool {
        let mut predicted = false;

        for cell in 0..self.params.cells_per_column {
            let addr = CellAddress::new(col, cell);
            if self.prev_predictive_cells.contains(&addr) {
                self.active_cells.insert(addr);
                self.winner_cells.insert(addr);
                predicted = true;
            }
        }

        predicted
    }

    /// Bursts a column when no cell in the column was predicted to become active:
    /// - Marks all cells in the column as active.
    /// - Takes the first cell of the column as the winner.
    #[inline]
    pub fn burst_column(&mut self, col: usize) {
        for cell in 0..self.params.cells_per_column {
            self.active_cells.insert(CellAddress::new(col, cell));
        }
        self.winner_cells.insert(CellAddress::new(col, 0));
    }

    /// Collects the cells that own at least one active segment.
    fn compute_predictive_cells(&self) -> FxHashSet<CellAddress> {
        let mut predictive = FxHashSet::default();

        if self.active_cells.is_empty() {
            return predictive;
        }

        for (index, cell) in self.cells.iter().enumerate() {
            if cell
                .segments
                .iter()
                .any(|segment| self.segment_is_active(segment))
            {
                predictive.insert(self.address(index));
            }
        }

        predictive
    }

    /// Whether at least `activation_threshold` connected synapses of the segment target active cells.
    /// Stops counting as soon as the threshold is reached.
    #[inline]
    fn segment_is_active(&self, segment: &Segment) -> bool {
        let threshold = self.params.activation_threshold;
        segment
            .synapses
            .iter()
            .filter(|syn| {
                syn.permanence >= self.params.connected_permanence
                    && self.active_cells.contains(&syn.presynaptic_cell)
            })
            .take(threshold)
            .count()
            >= threshold
    }

    /// Grows one segment on every winner cell that owns none, provided there was previous activity.
    ///
    /// Winners are visited in address order, so for a fixed seed the sampled subsets are reproducible.
    fn learn(&mut self, prev_active_cells: &FxHashSet<CellAddress>) {
        if prev_active_cells.is_empty() {
            return;
        }

        let mut candidates: Vec<CellAddress> = prev_active_cells.iter().copied().collect();
        candidates.sort_unstable();

        let mut winners: Vec<CellAddress> = self
            .winner_cells
            .iter()
            .copied()
            .filter(|&addr| self.cell(addr).segments.is_empty())
            .collect();
        winners.sort_unstable();

        for &winner in &winners {
            self.grow_new_segment(winner, &mut candidates);
        }

        if !winners.is_empty() {
            debug!(t = self.t, grown = winners.len(), "grew new segments");
        }
    }

    /// Grows a new dendritic segment on the specified cell and returns the new segment's index:
    /// - Shuffles the candidate presynaptic cells.
    /// - Connects the segment to the first `max_new_synapses` of them with the initial permanence.
    #[inline]
    pub fn grow_new_segment(
        &mut self,
        cell_addr: CellAddress,
        candidates: &mut [CellAddress],
    ) -> usize {
        candidates.shuffle(&mut self.rand);

        let synapses = candidates
            .iter()
            .take(self.params.max_new_synapses)
            .map(|&presynaptic_cell| Synapse {
                presynaptic_cell,
                permanence: self.params.initial_permanence,
            })
            .collect();

        let cell = self.cell_mut(cell_addr);
        cell.segments.push(Segment { synapses });
        cell.segments.len() - 1
    }

    /// Returns `1 - |active ∩ predicted| / |active|` for the last step, where "predicted" is the
    /// prediction made by the step before it. Returns 0.0 when no cell is active.
    pub fn anomaly_score(&self) -> f64 {
        if self.active_cells.is_empty() {
            return 0.0;
        }

        let predicted_active = self
            .active_cells
            .iter()
            .filter(|addr| self.prev_predictive_cells.contains(addr))
            .count();

        1.0 - predicted_active as f64 / self.active_cells.len() as f64
    }

    /// Clears the active, winner and predictive cells. Learned segments are kept.
    pub fn reset(&mut self) {
        self.active_cells.clear();
        self.winner_cells.clear();
        self.predictive_cells.clear();
        self.prev_predictive_cells.clear();
        debug!(segments = self.segment_count(), "temporal memory reset");
    }

    /// Returns the cells active after the last step.
    pub fn active_cells(&self) -> &FxHashSet<CellAddress> {
        &self.active_cells
    }

    /// Returns the cells predicted to become active in the next step.
    pub fn predictive_cells(&self) -> &FxHashSet<CellAddress> {
        &self.predictive_cells
    }

    /// Returns the winner cells of the last step.
    pub fn winner_cells(&self) -> &FxHashSet<CellAddress> {
        &self.winner_cells
    }

    /// Returns the total number of segments over all cells.
    pub fn segment_count(&self) -> usize {
        self.cells.iter().map(|cell| cell.segments.len()).sum()
    }

    /// Returns the cell at the given address.
    ///
    /// # Panics
    ///
    /// If the address lies outside the memory.
    pub fn cell(&self, addr: CellAddress) -> &Cell {
        &self.cells[self.index(addr)]
    }

    fn cell_mut(&mut self, addr: CellAddress) -> &mut Cell {
        let index = self.index(addr);
        &mut self.cells[index]
    }

    fn index(&self, addr: CellAddress) -> usize {
        assert!(
            addr.col < self.params.column_count && addr.cell < self.params.cells_per_column,
            "Cell {:?} out of range",
            addr
        );
        addr.col * self.params.cells_per_column + addr.cell
    }

    fn address(&self, index: usize) -> CellAddress {
        CellAddress::new(
            index / self.params.cells_per_column,
            index % self.params.cells_per_column,
        )
    }

    pub fn column_count(&self) -> usize {
        self.params.column_count
    }

    pub fn cells_per_column(&self) -> usize {
        self.params.cells_per_column
    }

    pub fn params(&self) -> &TemporalMemoryParams {
        &self.params
    }

    /// Number of `compute` calls since construction.
    pub fn time_step(&self) -> u64 {
        self.t
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory(column_count: usize) -> TemporalMemory {
        TemporalMemory::new(TemporalMemoryParams {
            column_count,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_initialization() {
        let tm = memory(100);
        assert_eq!(tm.column_count(), 100);
        assert_eq!(tm.cells_per_column(), 32);
        assert_eq!(tm.segment_count(), 0);
        assert_eq!(tm.params().activation_threshold, 13);
        assert!(tm.cell(CellAddress::new(99, 31)).segments.is_empty());
    }

    #[test]
    fn test_invalid_params() {
        let params = TemporalMemoryParams {
            cells_per_column: 0,
            ..Default::default()
        };
        assert!(matches!(
            TemporalMemory::new(params),
            Err(HtmError::InvalidParameter { name: "cells_per_column", .. })
        ));
    }

    #[test]
    fn test_unpredicted_columns_burst() {
        let mut tm = memory(100);
        let (active, predictive) = tm.compute(&[0, 1, 2], false);

        assert_eq!(active.len(), 3 * 32);
        assert!(predictive.is_empty());
        assert_eq!(tm.winner_cells().len(), 3);
        assert!(tm.winner_cells().contains(&CellAddress::new(1, 0)));
        assert_eq!(tm.anomaly_score(), 1.0);
    }

    #[test]
    fn test_no_segments_without_previous_activity() {
        let mut tm = memory(100);
        tm.compute(&[0, 1, 2], true);
        assert_eq!(tm.segment_count(), 0);

        tm.compute(&[0, 1, 2], true);
        assert_eq!(tm.segment_count(), 3);
        let segment = &tm.cell(CellAddress::new(0, 0)).segments[0];
        assert_eq!(segment.synapses.len(), 15);
        assert!(segment.synapses.iter().all(|syn| syn.permanence == 0.6));
        assert!(segment.synapses.iter().all(|syn| syn.presynaptic_cell.col < 3));
    }

    #[test]
    fn test_segment_grows_at_most_once_per_cell() {
        let mut tm = memory(100);
        for _ in 0..6 {
            tm.compute(&[4, 5], true);
        }
        assert_eq!(tm.segment_count(), 2);
    }

    #[test]
    fn test_small_context_limits_synapses() {
        let mut tm = TemporalMemory::new(TemporalMemoryParams {
            column_count: 10,
            cells_per_column: 4,
            ..Default::default()
        })
        .unwrap();

        tm.compute(&[1], true);
        tm.compute(&[2], true);

        let segment = &tm.cell(CellAddress::new(2, 0)).segments[0];
        assert_eq!(segment.synapses.len(), 4);
    }

    #[test]
    fn test_learned_transition_is_predicted() {
        let mut tm = TemporalMemory::new(TemporalMemoryParams {
            column_count: 50,
            cells_per_column: 4,
            activation_threshold: 3,
            ..Default::default()
        })
        .unwrap();

        let a = [0, 1, 2, 3];
        let b = [10, 11, 12, 13];

        tm.compute(&a, true);
        tm.compute(&b, true);
        assert_eq!(tm.segment_count(), 4);

        tm.reset();
        tm.compute(&a, false);
        let predictive = tm.predictive_cells().clone();
        assert_eq!(predictive.len(), 4);
        assert!(predictive.iter().all(|addr| addr.cell == 0 && b.contains(&addr.col)));

        let (active, _) = tm.compute(&b, false);
        assert_eq!(active.len(), 4);
        assert_eq!(tm.anomaly_score(), 0.0);
    }

    #[test]
    fn test_partial_prediction_score() {
        let mut tm = TemporalMemory::new(TemporalMemoryParams {
            column_count: 50,
            cells_per_column: 4,
            activation_threshold: 3,
            ..Default::default()
        })
        .unwrap();

        tm.compute(&[0, 1, 2, 3], true);
        tm.compute(&[10, 11], true);
        tm.reset();

        tm.compute(&[0, 1, 2, 3], false);
        tm.compute(&[10, 11, 20], false);

        // Columns 10 and 11 contribute one predicted cell each, column 20 bursts.
        assert_eq!(tm.active_cells().len(), 2 + 4);
        assert!((tm.anomaly_score() - (1.0 - 2.0 / 6.0)).abs() < 1e-12);
    }

    #[test]
    fn test_activation_threshold_gates_prediction() {
        let mut tm = TemporalMemory::new(TemporalMemoryParams {
            column_count: 50,
            cells_per_column: 4,
            activation_threshold: 5,
            ..Default::default()
        })
        .unwrap();

        tm.compute(&[0], true);
        tm.compute(&[10], true);
        tm.reset();

        tm.compute(&[0], false);
        assert!(tm.predictive_cells().is_empty());
    }

    #[test]
    fn test_empty_step_scores_zero() {
        let mut tm = memory(10);
        assert_eq!(tm.anomaly_score(), 0.0);
        tm.compute(&[], true);
        assert_eq!(tm.anomaly_score(), 0.0);
    }

    #[test]
    fn test_reset_keeps_segments() {
        let mut tm = memory(100);
        tm.compute(&[0, 1, 2], true);
        tm.compute(&[3, 4, 5], true);
        assert!(!tm.active_cells().is_empty());
        let segments = tm.segment_count();

        tm.reset();

        assert!(tm.active_cells().is_empty());
        assert!(tm.predictive_cells().is_empty());
        assert!(tm.winner_cells().is_empty());
        assert_eq!(tm.segment_count(), segments);
        assert_eq!(tm.anomaly_score(), 0.0);
    }

    #[test]
    fn test_same_seed_same_segments() {
        let mut a = memory(20);
        let mut b = memory(20);
        for step in [[0, 1], [2, 3], [4, 5]] {
            a.compute(&step, true);
            b.compute(&step, true);
        }

        for col in 0..20 {
            let left = &a.cell(CellAddress::new(col, 0)).segments;
            let right = &b.cell(CellAddress::new(col, 0)).segments;
            assert_eq!(left.len(), right.len());
            for (l, r) in left.iter().zip(right) {
                let l: Vec<_> = l.synapses.iter().map(|s| s.presynaptic_cell).collect();
                let r: Vec<_> = r.synapses.iter().map(|s| s.presynaptic_cell).collect();
                assert_eq!(l, r);
            }
        }
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_column_out_of_range_panics() {
        let mut tm = memory(10);
        tm.compute(&[10], false);
    }
}
