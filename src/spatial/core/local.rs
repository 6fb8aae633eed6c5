//! Local selector — per-pattern reduction of the integration domain.
//!
//! Purpose
//! -------
//! For every unique binary pattern, choose the mask points over which the
//! pattern's location is integrated. Under [`Integration::Local`] this is the
//! set of points within the mask buffer of *every* detector that fired
//! (intersection across firing detectors); under [`Integration::Global`]
//! every pattern uses the whole mask.
//!
//! Key behaviors
//! -------------
//! - Sets are computed once per fit and shared read-only across all
//!   likelihood evaluations.
//! - An empty intersection never yields an empty set: the selector falls
//!   back to the single mask point whose largest distance to the firing
//!   detectors is smallest, records the pattern in
//!   [`LocalSets::fallbacks`], and logs a warning.
//!
//! Invariants & assumptions
//! ------------------------
//! - Every returned set is non-empty and sorted ascending.
//! - Local integration is an approximation: it is exact only when the
//!   detection surface beyond the buffer is negligible.
use crate::spatial::core::{compress::PatternTable, options::Integration};
use log::warn;
use ndarray::Array2;

/// Integration point sets, one per unique pattern.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalSets {
    pub points: Vec<Vec<usize>>,
    pub fallbacks: Vec<usize>,
}

impl LocalSets {
    /// Mean number of integration points per pattern.
    pub fn mean_size(&self) -> f64 {
        if self.points.is_empty() {
            return 0.0;
        }
        self.points.iter().map(Vec::len).sum::<usize>() as f64 / self.points.len() as f64
    }
}

/// Build the integration sets for every pattern in `table`.
///
/// `distances` is the `(detectors × mask points)` matrix from the geometry
/// engine.
pub fn select_local(
    table: &PatternTable, distances: &Array2<f64>, buffer: f64, integration: Integration,
) -> LocalSets {
    let m = distances.ncols();
    let mut fallbacks = Vec::new();
    let points = table
        .fired
        .iter()
        .enumerate()
        .map(|(p, fired)| {
            if integration == Integration::Global || fired.is_empty() {
                return (0..m).collect();
            }
            let set: Vec<usize> =
                (0..m).filter(|&x| fired.iter().all(|&j| distances[[j, x]] <= buffer)).collect();
            if set.is_empty() {
                let nearest = nearest_point(fired, distances);
                warn!(
                    "local integration set for pattern {p} is empty at buffer {buffer}; \
                     falling back to mask point {nearest}"
                );
                fallbacks.push(p);
                vec![nearest]
            } else {
                set
            }
        })
        .collect();
    LocalSets { points, fallbacks }
}

// ---- Helper Methods ----

/// Mask point minimizing the largest distance to the firing detectors.
fn nearest_point(fired: &[usize], distances: &Array2<f64>) -> usize {
    let worst = |x: usize| fired.iter().map(|&j| distances[[j, x]]).fold(0.0_f64, f64::max);
    (0..distances.ncols())
        .min_by(|&a, &b| worst(a).total_cmp(&worst(b)))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Intersection (not union) semantics across firing detectors.
    // - Global integration returning the full mask.
    // - Fallback to a single point for an empty intersection.
    // -------------------------------------------------------------------------

    fn table_and_distances() -> (PatternTable, Array2<f64>) {
        // Detector 0 near points 0..=1, detector 1 near points 1..=2.
        let distances = array![[0.5, 1.0, 3.0, 9.0], [3.0, 1.0, 0.5, 9.0]];
        let binary = array![[1.0, 0.0], [1.0, 1.0]];
        (PatternTable::from_binary(&binary), distances)
    }

    #[test]
    // Purpose
    // -------
    // Local sets are the intersection of the firing detectors' buffers.
    //
    // Given
    // -----
    // - Buffer 1.0; pattern [1,0] and pattern [1,1].
    //
    // Expect
    // ------
    // - Pattern [1,0] uses points {0, 1}; pattern [1,1] uses {1} only.
    fn local_sets_intersect_detector_buffers() {
        let (table, distances) = table_and_distances();
        let sets = select_local(&table, &distances, 1.0, Integration::Local);
        assert_eq!(sets.points, vec![vec![0, 1], vec![1]]);
        assert!(sets.fallbacks.is_empty());
    }

    #[test]
    // Purpose
    // -------
    // Global integration ignores the buffer.
    //
    // Given
    // -----
    // - Buffer 0.0 with `Integration::Global`.
    //
    // Expect
    // ------
    // - Every pattern integrates over all four points.
    fn global_integration_uses_full_mask() {
        let (table, distances) = table_and_distances();
        let sets = select_local(&table, &distances, 0.0, Integration::Global);
        assert!(sets.points.iter().all(|s| s == &vec![0, 1, 2, 3]));
    }

    #[test]
    // Purpose
    // -------
    // An empty intersection falls back to one point instead of an empty set.
    //
    // Given
    // -----
    // - Buffer 0.6, so pattern [1,1] has no common point.
    //
    // Expect
    // ------
    // - Pattern 1 is recorded as a fallback and uses point 1, the point with
    //   the smallest maximum distance.
    fn empty_intersection_falls_back_to_nearest_point() {
        let (table, distances) = table_and_distances();
        let sets = select_local(&table, &distances, 0.6, Integration::Local);
        assert_eq!(sets.points[0], vec![0]);
        assert_eq!(sets.points[1], vec![1]);
        assert_eq!(sets.fallbacks, vec![1]);
    }
}
