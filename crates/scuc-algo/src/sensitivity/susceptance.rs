//! Sparse susceptance matrix (B') for the DC power flow.
//!
//! ```text
//! P = B' × θ
//!
//! where:
//!   B'[i,j] = -b_ij        for i ≠ j (off-diagonal = -susceptance)
//!   B'[i,i] = Σ_k b_ik     (diagonal = sum of connected susceptances)
//! ```
//!
//! Rows and columns follow the instance's bus order (ascending ID). The
//! reference bus is the flagged one, or the first bus when none is flagged.

use std::collections::HashMap;

use scuc_core::{Instance, ScucError};
use sprs::{CsMat, TriMat};
use thiserror::Error;

/// Errors from susceptance matrix operations
#[derive(Debug, Error)]
pub enum SusceptanceError {
    #[error("No buses in instance")]
    NoBuses,

    #[error("Line {0} has zero or near-zero susceptance")]
    ZeroSusceptance(String),

    #[error("Line {line} references unknown bus {bus}")]
    UnknownBus { line: String, bus: String },

    #[error("Network has {islands} islands; bus {bus} is not connected to the reference bus")]
    Disconnected { islands: usize, bus: String },

    #[error("Matrix factorization failed: {0}")]
    FactorizationFailed(String),
}

impl From<SusceptanceError> for ScucError {
    fn from(err: SusceptanceError) -> Self {
        match err {
            SusceptanceError::UnknownBus { ref line, .. } => {
                ScucError::validation(line.clone(), err.to_string())
            }
            other => ScucError::SingularNetwork(other.to_string()),
        }
    }
}

/// Sparse B' susceptance matrix in CSR format.
#[derive(Debug, Clone)]
pub struct SparseSusceptance {
    matrix: CsMat<f64>,
    /// Per line (instance order): (from_idx, to_idx, susceptance)
    line_data: Vec<(usize, usize, f64)>,
    slack_idx: usize,
}

impl SparseSusceptance {
    /// Build B' from the instance's lines.
    ///
    /// Fails when the bus/line graph has more than one island: the reduced
    /// matrix would be singular.
    pub fn from_instance(instance: &Instance) -> Result<Self, SusceptanceError> {
        let n = instance.buses().len();
        if n == 0 {
            return Err(SusceptanceError::NoBuses);
        }

        let islands = instance.islands();
        if islands.len() > 1 {
            let slack = instance.reference_bus_index();
            let stray = islands
                .iter()
                .find(|members| !members.contains(&slack))
                .and_then(|members| members.first())
                .map(|&idx| instance.buses()[idx].id.to_string())
                .unwrap_or_default();
            return Err(SusceptanceError::Disconnected {
                islands: islands.len(),
                bus: stray,
            });
        }

        let mut triplets = TriMat::new((n, n));
        let mut line_data = Vec::with_capacity(instance.lines().len());

        for line in instance.lines() {
            let b = line.susceptance;
            if !b.is_finite() || b.abs() < 1e-12 {
                return Err(SusceptanceError::ZeroSusceptance(line.id.to_string()));
            }
            let lookup = |bus: &scuc_core::BusId| {
                instance
                    .bus_index(bus)
                    .ok_or_else(|| SusceptanceError::UnknownBus {
                        line: line.id.to_string(),
                        bus: bus.to_string(),
                    })
            };
            let i = lookup(&line.source)?;
            let j = lookup(&line.target)?;

            // Off-diagonal: B'[i,j] = B'[j,i] = -b
            triplets.add_triplet(i, j, -b);
            triplets.add_triplet(j, i, -b);

            // Diagonal: B'[i,i] += b, B'[j,j] += b
            triplets.add_triplet(i, i, b);
            triplets.add_triplet(j, j, b);

            line_data.push((i, j, b));
        }

        Ok(Self {
            matrix: triplets.to_csr(),
            line_data,
            slack_idx: instance.reference_bus_index(),
        })
    }

    /// Element B'[i,j] by matrix indices.
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.matrix.get(i, j).copied().unwrap_or(0.0)
    }

    pub fn n_bus(&self) -> usize {
        self.matrix.rows()
    }

    pub fn nnz(&self) -> usize {
        self.matrix.nnz()
    }

    pub fn slack_idx(&self) -> usize {
        self.slack_idx
    }

    /// (from_idx, to_idx, susceptance) of line `idx`.
    pub fn line_data(&self, idx: usize) -> (usize, usize, f64) {
        self.line_data[idx]
    }

    pub fn num_lines(&self) -> usize {
        self.line_data.len()
    }

    /// X = (B'_reduced)⁻¹ extended with a zero row/column for the slack bus.
    pub fn inverse_with_slack(&self) -> Result<Vec<Vec<f64>>, SusceptanceError> {
        let n = self.n_bus();
        let reduced_to_full: Vec<usize> = (0..n).filter(|&i| i != self.slack_idx).collect();
        let full_to_reduced: HashMap<usize, usize> = reduced_to_full
            .iter()
            .enumerate()
            .map(|(reduced, &full)| (full, reduced))
            .collect();
        let m = reduced_to_full.len();

        let mut x = vec![vec![0.0; n]; n];
        if m == 0 {
            return Ok(x);
        }

        let mut dense = vec![vec![0.0; m]; m];
        for (val, (i, j)) in self.matrix.iter() {
            if let (Some(&ri), Some(&rj)) = (full_to_reduced.get(&i), full_to_reduced.get(&j)) {
                dense[ri][rj] += *val;
            }
        }

        let inv = lu_inverse(&dense)?;
        for (ri, &fi) in reduced_to_full.iter().enumerate() {
            for (rj, &fj) in reduced_to_full.iter().enumerate() {
                x[fi][fj] = inv[ri][rj];
            }
        }
        Ok(x)
    }
}

/// Dense inverse via LU decomposition with partial pivoting.
fn lu_inverse(a: &[Vec<f64>]) -> Result<Vec<Vec<f64>>, SusceptanceError> {
    let n = a.len();
    let mut lu: Vec<Vec<f64>> = a.to_vec();
    // perm[i] = original row now stored at position i
    let mut perm: Vec<usize> = (0..n).collect();

    for k in 0..n {
        let mut max_val = lu[k][k].abs();
        let mut max_row = k;
        for (i, row) in lu.iter().enumerate().skip(k + 1) {
            if row[k].abs() > max_val {
                max_val = row[k].abs();
                max_row = i;
            }
        }

        if max_val < 1e-12 {
            return Err(SusceptanceError::FactorizationFailed(
                "susceptance matrix is singular".into(),
            ));
        }

        if max_row != k {
            lu.swap(k, max_row);
            perm.swap(k, max_row);
        }

        for i in (k + 1)..n {
            let factor = lu[i][k] / lu[k][k];
            lu[i][k] = factor;
            for j in (k + 1)..n {
                lu[i][j] -= factor * lu[k][j];
            }
        }
    }

    let mut inv = vec![vec![0.0; n]; n];
    for col in 0..n {
        // P·e_col
        let b: Vec<f64> = perm.iter().map(|&p| if p == col { 1.0 } else { 0.0 }).collect();

        let mut y = vec![0.0; n];
        for i in 0..n {
            y[i] = b[i] - (0..i).map(|j| lu[i][j] * y[j]).sum::<f64>();
        }

        let mut x = vec![0.0; n];
        for i in (0..n).rev() {
            let upper: f64 = ((i + 1)..n).map(|j| lu[i][j] * x[j]).sum();
            x[i] = (y[i] - upper) / lu[i][i];
        }

        for (i, value) in x.into_iter().enumerate() {
            inv[i][col] = value;
        }
    }

    Ok(inv)
}
