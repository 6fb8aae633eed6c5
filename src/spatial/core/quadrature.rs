//! Quadrature rules for latent call characteristics.
//!
//! Signal-strength models with directional calling or heterogeneous source
//! strength integrate a latent variable out of the detection surfaces. Both
//! cases reduce to a weighted sum over a fixed set of nodes:
//!
//! - call direction: `n` equally spaced directions on `[0, 2π)` with equal
//!   weights `1/n`;
//! - source strength: `n`-point probabilists' Gauss–Hermite rule for a
//!   standard normal variable, built with the Golub–Welsch algorithm
//!   (eigendecomposition of the symmetric Jacobi matrix).
//!
//! Weights always sum to one.
use nalgebra::{DMatrix, SymmetricEigen};
use std::f64::consts::TAU;

/// Nodes and weights of a quadrature rule.
#[derive(Debug, Clone, PartialEq)]
pub struct Quadrature {
    pub nodes: Vec<f64>,
    pub weights: Vec<f64>,
}

impl Quadrature {
    /// One node at zero with unit weight (no latent variable).
    pub fn single() -> Self {
        Self { nodes: vec![0.0], weights: vec![1.0] }
    }

    /// `n` equally spaced call directions `2πq/n`.
    pub fn directions(n: usize) -> Self {
        let n = n.max(1);
        let nodes = (0..n).map(|q| TAU * q as f64 / n as f64).collect();
        Self { nodes, weights: vec![1.0 / n as f64; n] }
    }

    /// Probabilists' Gauss–Hermite rule with `n` nodes, sorted ascending.
    ///
    /// Integrates `E[f(Z)]` for `Z ~ N(0, 1)` exactly for polynomials of
    /// degree `< 2n`.
    pub fn gauss_hermite(n: usize) -> Self {
        if n <= 1 {
            return Self::single();
        }
        let jacobi = DMatrix::from_fn(n, n, |i, j| {
            if i + 1 == j || j + 1 == i { (i.max(j) as f64).sqrt() } else { 0.0 }
        });
        let eigen = SymmetricEigen::new(jacobi);
        let mut pairs: Vec<(f64, f64)> = (0..n)
            .map(|i| (eigen.eigenvalues[i], eigen.eigenvectors[(0, i)].powi(2)))
            .collect();
        pairs.sort_by(|a, b| a.0.total_cmp(&b.0));
        let total: f64 = pairs.iter().map(|p| p.1).sum();
        Self {
            nodes: pairs.iter().map(|p| p.0).collect(),
            weights: pairs.iter().map(|p| p.1 / total).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
