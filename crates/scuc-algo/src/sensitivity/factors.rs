//! Injection shift factors (ISF) and line outage distribution factors (LODF).
//!
//! ## ISF
//!
//! ISF[ℓ,n] = change of flow on line ℓ per MW injected at bus n (withdrawn at
//! the reference bus):
//! ```text
//! ISF[ℓ,n] = b_ℓ × (X[i,n] - X[j,n])        ℓ = (i → j), X = (B'_reduced)⁻¹
//! ```
//!
//! ## LODF
//!
//! LODF[ℓ,m] = fraction of line m's pre-outage flow that moves onto ℓ when m trips:
//! ```text
//! LODF[ℓ,m] = (ISF[ℓ,i_m] - ISF[ℓ,j_m]) / (1 - (ISF[m,i_m] - ISF[m,j_m]))
//! f_ℓ_post  = f_ℓ + LODF[ℓ,m] × f_m
//! ```
//! A denominator near zero means removing m islands the network; such
//! columns are flagged and never used.
//!
//! ## Multi-line outages
//!
//! For an outage set M the post-outage flow is `f_ℓ + Σ_k D[ℓ,k] f_{m_k}` with
//! `D[ℓ,·] = LODF[ℓ,M] × A⁻¹`, `A = -LODF[M,M]` (unit diagonal).
//!
//! LODF columns are independent per outaged line; with the `parallel`
//! feature they are computed on a rayon pool and concatenated in line order.

use std::time::Instant;

use faer::prelude::SpSolver;
use faer::{FaerMat, Mat};
use scuc_core::{BusId, Instance, LineId, ScucError, ScucResult};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::susceptance::SparseSusceptance;
use crate::config::ParallelConfig;

/// |1 - transfer ISF| below this means the outage islands the network.
const ISLANDING_THRESHOLD: f64 = 1e-10;

/// Outage factors this large come from a near-singular outage set.
const MAX_OUTAGE_FACTOR: f64 = 1e8;

/// Dense ISF matrix: rows are lines, columns buses, both in instance order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IsfMatrix {
    pub line_ids: Vec<LineId>,
    pub bus_ids: Vec<BusId>,
    pub values: Vec<Vec<f64>>,
}

impl IsfMatrix {
    pub fn get(&self, line: usize, bus: usize) -> f64 {
        self.values[line][bus]
    }

    pub fn row(&self, line: usize) -> &[f64] {
        &self.values[line]
    }

    pub fn num_lines(&self) -> usize {
        self.line_ids.len()
    }

    pub fn num_buses(&self) -> usize {
        self.bus_ids.len()
    }

    /// Flow on every line for the given bus injections.
    pub fn flows(&self, injections: &[f64]) -> Vec<f64> {
        self.values
            .iter()
            .map(|row| row.iter().zip(injections).map(|(a, b)| a * b).sum())
            .collect()
    }
}

/// Dense LODF matrix: `values[ℓ][m]`, diagonal -1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LodfMatrix {
    pub line_ids: Vec<LineId>,
    pub values: Vec<Vec<f64>>,
    /// `islanding[m]` is true when tripping line m alone splits the network
    pub islanding: Vec<bool>,
}

impl LodfMatrix {
    pub fn get(&self, monitored: usize, outaged: usize) -> f64 {
        self.values[monitored][outaged]
    }

    pub fn num_lines(&self) -> usize {
        self.line_ids.len()
    }

    /// `flow_l_post = flow_l_pre + LODF[ℓ,m] × flow_m_pre`
    pub fn estimate_post_outage_flow(
        &self,
        monitored: usize,
        outaged: usize,
        flow_l_pre: f64,
        flow_m_pre: f64,
    ) -> Option<f64> {
        if self.islanding[outaged] {
            return None;
        }
        Some(flow_l_pre + self.get(monitored, outaged) * flow_m_pre)
    }
}

/// Flow redistribution for one outage set.
#[derive(Debug, Clone, PartialEq)]
pub struct OutageFactors {
    /// Outaged line positions
    pub outaged: Vec<usize>,
    /// `rows[ℓ][k]`: share of outaged line `outaged[k]`'s flow moving onto ℓ
    pub rows: Vec<Vec<f64>>,
}

impl OutageFactors {
    pub fn is_outaged(&self, line: usize) -> bool {
        self.outaged.contains(&line)
    }

    /// Non-zero `(outaged line, factor)` terms for monitored line `line`.
    pub fn terms(&self, line: usize) -> Vec<(usize, f64)> {
        self.outaged
            .iter()
            .zip(&self.rows[line])
            .filter(|(_, &factor)| factor != 0.0)
            .map(|(&m, &factor)| (m, factor))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityFactors {
    pub isf: IsfMatrix,
    pub lodf: LodfMatrix,
}

impl SensitivityFactors {
    /// Compute ISF and LODF from the instance topology.
    pub fn compute(instance: &Instance, parallel: &ParallelConfig) -> ScucResult<Self> {
        let started = Instant::now();
        let b_prime = SparseSusceptance::from_instance(instance)?;
        let x = b_prime.inverse_with_slack()?;
        let n_bus = b_prime.n_bus();
        let n_lines = b_prime.num_lines();

        let values: Vec<Vec<f64>> = (0..n_lines)
            .map(|l| {
                let (i, j, b) = b_prime.line_data(l);
                (0..n_bus).map(|n| b * (x[i][n] - x[j][n])).collect()
            })
            .collect();
        let isf = IsfMatrix {
            line_ids: instance.lines().iter().map(|l| l.id.clone()).collect(),
            bus_ids: instance.buses().iter().map(|b| b.id.clone()).collect(),
            values,
        };

        let terminals: Vec<(usize, usize)> = (0..n_lines)
            .map(|l| {
                let (i, j, _) = b_prime.line_data(l);
                (i, j)
            })
            .collect();
        let columns = compute_lodf_columns(&isf, &terminals, parallel);
        let mut lodf_values = vec![vec![0.0; n_lines]; n_lines];
        let mut islanding = vec![false; n_lines];
        for (m, column) in columns.into_iter().enumerate() {
            match column {
                Some(column) => {
                    for (l, value) in column.into_iter().enumerate() {
                        lodf_values[l][m] = value;
                    }
                }
                None => {
                    islanding[m] = true;
                    lodf_values[m][m] = -1.0;
                }
            }
        }

        let islanding_count = islanding.iter().filter(|&&flag| flag).count();
        if islanding_count > 0 {
            warn!(
                lines = islanding_count,
                "some single-line outages split the network and will not be monitored"
            );
        }
        info!(
            buses = n_bus,
            lines = n_lines,
            nnz_b = b_prime.nnz(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "computed sensitivity factors"
        );

        Ok(Self {
            isf,
            lodf: LodfMatrix {
                line_ids: instance.lines().iter().map(|l| l.id.clone()).collect(),
                values: lodf_values,
                islanding,
            },
        })
    }

    /// Accept externally computed factors after checking they match `instance`.
    pub fn from_precomputed(instance: &Instance, isf: IsfMatrix, lodf: LodfMatrix) -> ScucResult<Self> {
        let lines: Vec<&LineId> = instance.lines().iter().map(|l| &l.id).collect();
        let buses: Vec<&BusId> = instance.buses().iter().map(|b| &b.id).collect();
        let mismatch = |what: &str| ScucError::validation("factors", format!("precomputed {} do not match the instance", what));

        if isf.line_ids.iter().collect::<Vec<_>>() != lines {
            return Err(mismatch("ISF line ids"));
        }
        if isf.bus_ids.iter().collect::<Vec<_>>() != buses {
            return Err(mismatch("ISF bus ids"));
        }
        if isf.values.len() != lines.len() || isf.values.iter().any(|row| row.len() != buses.len()) {
            return Err(mismatch("ISF dimensions"));
        }
        if lodf.line_ids.iter().collect::<Vec<_>>() != lines {
            return Err(mismatch("LODF line ids"));
        }
        if lodf.values.len() != lines.len()
            || lodf.values.iter().any(|row| row.len() != lines.len())
            || lodf.islanding.len() != lines.len()
        {
            return Err(mismatch("LODF dimensions"));
        }
        let finite = isf.values.iter().chain(&lodf.values).flatten().all(|v| v.is_finite());
        if !finite {
            return Err(ScucError::validation("factors", "precomputed factors contain non-finite values"));
        }
        debug!(lines = lines.len(), buses = buses.len(), "using precomputed sensitivity factors");
        Ok(Self { isf, lodf })
    }

    /// Copy with |ISF| < `isf_cutoff` and |LODF| < `lodf_cutoff` set to zero.
    pub fn sparsified(&self, isf_cutoff: f64, lodf_cutoff: f64) -> Self {
        let cut = |rows: &[Vec<f64>], cutoff: f64| -> Vec<Vec<f64>> {
            rows.iter()
                .map(|row| {
                    row.iter()
                        .map(|&v| if v.abs() < cutoff { 0.0 } else { v })
                        .collect()
                })
                .collect()
        };
        Self {
            isf: IsfMatrix {
                values: cut(&self.isf.values, isf_cutoff),
                ..self.isf.clone()
            },
            lodf: LodfMatrix {
                values: cut(&self.lodf.values, lodf_cutoff),
                ..self.lodf.clone()
            },
        }
    }

    /// Redistribution factors for the simultaneous outage of `outaged`.
    ///
    /// Returns `None` when the outage set splits the network.
    pub fn outage_factors(&self, outaged: &[usize]) -> Option<OutageFactors> {
        if outaged.iter().any(|&m| self.lodf.islanding[m]) {
            return None;
        }
        let n_lines = self.lodf.num_lines();
        if let [m] = outaged {
            let rows = (0..n_lines).map(|l| vec![self.lodf.get(l, *m)]).collect();
            return Some(OutageFactors {
                outaged: vec![*m],
                rows,
            });
        }

        let k = outaged.len();
        let mut a = Mat::<f64>::zeros(k, k);
        for (r, &mr) in outaged.iter().enumerate() {
            for (c, &mc) in outaged.iter().enumerate() {
                let value = if r == c { 1.0 } else { -self.lodf.get(mr, mc) };
                a.write(r, c, value);
            }
        }
        let inverse = a.partial_piv_lu().solve(&Mat::<f64>::identity(k, k));
        let mut a_inv = vec![vec![0.0f64; k]; k];
        for (r, row) in a_inv.iter_mut().enumerate() {
            for (c, value) in row.iter_mut().enumerate() {
                *value = inverse.read(r, c);
            }
        }
        if a_inv.iter().flatten().any(|v| !v.is_finite() || v.abs() > MAX_OUTAGE_FACTOR) {
            return None;
        }

        let rows = (0..n_lines)
            .map(|l| {
                (0..k)
                    .map(|c| {
                        (0..k)
                            .map(|r| self.lodf.get(l, outaged[r]) * a_inv[r][c])
                            .sum()
                    })
                    .collect()
            })
            .collect();
        Some(OutageFactors {
            outaged: outaged.to_vec(),
            rows,
        })
    }
}

/// One LODF column per outaged line; `None` marks an islanding outage.
fn compute_lodf_columns(
    isf: &IsfMatrix,
    terminals: &[(usize, usize)],
    parallel: &ParallelConfig,
) -> Vec<Option<Vec<f64>>> {
    let column = |m: usize| -> Option<Vec<f64>> {
        let (i, j) = terminals[m];
        let transfer_m = isf.get(m, i) - isf.get(m, j);
        let denom = 1.0 - transfer_m;
        if denom.abs() < ISLANDING_THRESHOLD {
            return None;
        }
        Some(
            (0..terminals.len())
                .map(|l| {
                    if l == m {
                        -1.0
                    } else {
                        (isf.get(l, i) - isf.get(l, j)) / denom
                    }
                })
                .collect(),
        )
    };

    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;

        let run = || {
            (0..terminals.len())
                .into_par_iter()
                .map(column)
                .collect::<Vec<_>>()
        };
        if parallel.threads > 0 {
            match rayon::ThreadPoolBuilder::new()
                .num_threads(parallel.threads)
                .build()
            {
                Ok(pool) => return pool.install(run),
                Err(err) => warn!(error = %err, "falling back to the global rayon pool"),
            }
        }
        run()
    }

    #[cfg(not(feature = "parallel"))]
    {
        let _ = parallel;
        (0..terminals.len()).map(column).collect()
    }
}
