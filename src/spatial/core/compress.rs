//! Capture compressor — deduplication of binary detection patterns.
//!
//! Identical rows of the binary capture history share their
//! detection-function term in the likelihood, so they are collapsed into a
//! [`PatternTable`] of distinct patterns with multiplicities. Auxiliary
//! measurements are never compressed; the table keeps, for every pattern,
//! the original detection indices so that per-detection densities can still
//! be evaluated.
//!
//! Patterns are stored in order of first appearance, which is stable for the
//! lifetime of a fit.
use ndarray::Array2;
use std::collections::HashMap;

/// Unique binary patterns with their multiplicities.
///
/// Invariants
/// ----------
/// - `frequencies[p] > 0` and `frequencies.iter().sum() == row_to_pattern.len()`.
/// - `members[p].len() == frequencies[p]`.
/// - `fired[p]` lists the detectors set in `patterns[p]`, ascending.
#[derive(Debug, Clone, PartialEq)]
pub struct PatternTable {
    pub patterns: Vec<Vec<bool>>,
    pub frequencies: Vec<usize>,
    pub row_to_pattern: Vec<usize>,
    pub members: Vec<Vec<usize>>,
    pub fired: Vec<Vec<usize>>,
}

impl PatternTable {
    /// Compress a validated binary capture matrix.
    pub fn from_binary(binary: &Array2<f64>) -> Self {
        let mut index: HashMap<Vec<bool>, usize> = HashMap::new();
        let mut table = PatternTable {
            patterns: Vec::new(),
            frequencies: Vec::new(),
            row_to_pattern: Vec::with_capacity(binary.nrows()),
            members: Vec::new(),
            fired: Vec::new(),
        };
        for (row, values) in binary.rows().into_iter().enumerate() {
            let pattern: Vec<bool> = values.iter().map(|&v| v == 1.0).collect();
            let p = match index.get(&pattern) {
                Some(&p) => p,
                None => {
                    let p = table.patterns.len();
                    table.fired.push(
                        pattern.iter().enumerate().filter(|(_, f)| **f).map(|(j, _)| j).collect(),
                    );
                    table.patterns.push(pattern.clone());
                    table.frequencies.push(0);
                    table.members.push(Vec::new());
                    index.insert(pattern, p);
                    p
                }
            };
            table.frequencies[p] += 1;
            table.members[p].push(row);
            table.row_to_pattern.push(p);
        }
        table
    }

    pub fn n_patterns(&self) -> usize {
        self.patterns.len()
    }

    pub fn n_detections(&self) -> usize {
        self.row_to_pattern.len()
    }

    /// Re-expand the table into one pattern per original detection.
    pub fn expand(&self) -> Vec<Vec<bool>> {
        self.row_to_pattern.iter().map(|&p| self.patterns[p].clone()).collect()
    }
}
