//! Proximal synapses of the Spatial Pooler.
//!
//! Every column holds one potential synapse for every input bit, so the pool is a dense
//! `num_columns × num_inputs` matrix of permanence values kept in a single contiguous vec.
//! Each column's synapses occupy the contiguous subrange `column * num_inputs..`, and the
//! synapse at offset `i` inside that range connects to input bit `i`.
//!
//! If the permanence is at least the connected threshold, the synapse is considered "connected"
//! and counts toward the column's overlap. During learning, permanence is increased where the
//! input bit was active and decreased where it was not, then clamped back into bounds.

use rand::Rng;
use std::ops::Range;

/// Options governing how synapse permanence is initialized and adjusted.
#[derive(Debug, Clone)]
pub struct SynapsePermanenceOptions {
    pub active_increment: f32,
    pub inactive_decrement: f32,
    pub connected: f32,
    /// Permanences are initially drawn from `init_min..init_max`.
    pub init_min: f32,
    pub init_max: f32,
    pub min: f32,
    pub max: f32,
}

impl Default for SynapsePermanenceOptions {
    fn default() -> Self {
        Self {
            active_increment: 0.05,
            inactive_decrement: 0.01,
            connected: 0.5,
            init_min: 0.3,
            init_max: 0.5,
            min: 0.0,
            max: 1.0,
        }
    }
}

/// A flat pool of proximal synapse permanences for all columns.
#[derive(Debug, Clone)]
pub struct Synapses {
    /// Permanence of every (column, input) pair, row-major by column.
    permanences: Vec<f32>,

    /// Number of input bits, i.e. the length of every column's row.
    num_inputs: usize,
}

impl Synapses {
    /// Creates a pool for `num_columns` columns over `num_inputs` input bits, all permanences zero.
    pub fn new(num_columns: usize, num_inputs: usize) -> Self {
        Self {
            permanences: vec![0.0; num_columns * num_inputs],
            num_inputs,
        }
    }

    /// Draws a fresh permanence for every synapse in the pool.
    pub fn randomize<R: Rng>(&mut self, options: &SynapsePermanenceOptions, rng: &mut R) {
        for permanence in self.permanences.iter_mut() {
            *permanence = rng.random_range(options.init_min..options.init_max);
        }
    }

    /// Counts the synapses of a column that are connected and whose input bit is active.
    #[inline]
    pub fn overlap(&self, column: usize, input_pattern: &[bool], connected: f32) -> u32 {
        self.column(column)
            .iter()
            .zip(input_pattern)
            .filter(|&(&permanence, &bit)| bit && permanence >= connected)
            .count() as u32
    }

    /// Hebbian update of one column:
    /// - active input bits get `active_increment`,
    /// - inactive input bits lose `inactive_decrement`,
    /// - everything is then clamped to `[options.min, options.max]`.
    pub fn adapt_column(
        &mut self,
        column: usize,
        input_pattern: &[bool],
        options: &SynapsePermanenceOptions,
    ) {
        for (permanence, &bit) in self.column_mut(column).iter_mut().zip(input_pattern) {
            if bit {
                *permanence += options.active_increment;
            } else {
                *permanence -= options.inactive_decrement;
            }
            *permanence = permanence.clamp(options.min, options.max);
        }
    }

    /// Returns the number of connected synapses of a column.
    pub fn connected_count(&self, column: usize, connected: f32) -> usize {
        self.column(column)
            .iter()
            .filter(|&&permanence| permanence >= connected)
            .count()
    }

    /// Returns the index range corresponding to the synapses stored for the given column.
    fn col_range(&self, column: usize) -> Range<usize> {
        let start = column * self.num_inputs;
        start..start + self.num_inputs
    }

    /// Returns an immutable slice of the permanences in the given column.
    pub fn column(&self, column: usize) -> &[f32] {
        &self.permanences[self.col_range(column)]
    }

    /// Returns a mutable slice of the permanences in the given column.
    pub fn column_mut(&mut self, column: usize) -> &mut [f32] {
        let range = self.col_range(column);
        &mut self.permanences[range]
    }

    /// Returns the whole permanence matrix, row-major by column.
    pub fn permanences(&self) -> &[f32] {
        &self.permanences
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn test_randomize_stays_in_init_range() {
        let options = SynapsePermanenceOptions::default();
        let mut synapses = Synapses::new(8, 16);
        synapses.randomize(&options, &mut StdRng::seed_from_u64(7));

        assert!(synapses
            .permanences()
            .iter()
            .all(|&p| (options.init_min..options.init_max).contains(&p)));
        assert_eq!(synapses.connected_count(3, options.connected), 0);
    }

    #[test]
    fn test_adapt_column_only_touches_that_column() {
        let options = SynapsePermanenceOptions::default();
        let mut synapses = Synapses::new(2, 4);
        synapses.column_mut(0).copy_from_slice(&[0.48, 0.48, 0.005, 0.99]);
        synapses.column_mut(1).copy_from_slice(&[0.4; 4]);

        synapses.adapt_column(0, &[true, false, false, true], &options);

        let col = synapses.column(0);
        assert!((col[0] - 0.53).abs() < 1e-6);
        assert!((col[1] - 0.47).abs() < 1e-6);
        assert_eq!(col[2], 0.0);
        assert_eq!(col[3], 1.0);
        assert_eq!(synapses.column(1), &[0.4; 4]);
    }

    #[test]
    fn test_overlap_counts_connected_active_bits() {
        let mut synapses = Synapses::new(1, 4);
        synapses.column_mut(0).copy_from_slice(&[0.6, 0.5, 0.2, 0.9]);

        assert_eq!(synapses.overlap(0, &[true, true, true, false], 0.5), 2);
        assert_eq!(synapses.overlap(0, &[false; 4], 0.5), 0);
    }
}
