//! Screening of base-case and post-contingency flow limits.
//!
//! For every period the net injection at bus b lies in a box
//! `[lo_b, hi_b]`:
//!
//! ```text
//! lo_b = -(load_b + price-sensitive demand_b)
//! hi_b = Σ Pmax at b + curtailment allowance_b - load_b
//! ```
//!
//! The largest flow a coefficient vector `c` can produce over that box is
//! `Σ_b max(c_b·lo_b, c_b·hi_b)`. A limit row is kept only when this bound
//! exceeds the limit in that direction; every other row can never bind.
//!
//! Screened mode works on factors with |ISF| below `isf_cutoff` and |LODF|
//! below `lodf_cutoff` zeroed. Exhaustive mode is the same pass over raw
//! factors.

use std::collections::BTreeSet;

use scuc_core::{ContingencyId, Instance};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::factors::{OutageFactors, SensitivityFactors};
use crate::config::FormulationConfig;

/// Per-period box on bus net injections (MW), indexed `[t][bus]`.
#[derive(Debug, Clone, PartialEq)]
pub struct InjectionBounds {
    pub lower: Vec<Vec<f64>>,
    pub upper: Vec<Vec<f64>>,
}

impl InjectionBounds {
    pub fn from_instance(instance: &Instance) -> Self {
        let periods = instance.time_horizon();
        let curtailment = instance.power_balance_penalty().is_some();
        let mut lower = vec![vec![0.0; instance.buses().len()]; periods];
        let mut upper = lower.clone();

        for (b, bus) in instance.buses().iter().enumerate() {
            let units: Vec<usize> = instance.generators_at_bus(&bus.id).collect();
            for t in 0..periods {
                let load = bus.load[t];
                let flexible: f64 = instance
                    .price_sensitive_loads()
                    .iter()
                    .filter(|psl| psl.bus == bus.id)
                    .map(|psl| psl.demand[t])
                    .sum();
                let capacity: f64 = units
                    .iter()
                    .map(|&g| instance.generators()[g].max_power[t])
                    .sum();
                let curtail = if curtailment { load.max(0.0) } else { 0.0 };
                lower[t][b] = -(load + flexible);
                upper[t][b] = capacity + curtail - load;
            }
        }
        Self { lower, upper }
    }

    /// Largest value of `Σ c_b·inj_b` over the box of period `t`.
    pub fn max_flow(&self, t: usize, coefficients: &[f64]) -> f64 {
        coefficients
            .iter()
            .zip(self.lower[t].iter().zip(&self.upper[t]))
            .map(|(&c, (&lo, &hi))| (c * lo).max(c * hi))
            .sum()
    }

    /// Largest value of `-Σ c_b·inj_b` over the box of period `t`.
    pub fn min_flow_magnitude(&self, t: usize, coefficients: &[f64]) -> f64 {
        coefficients
            .iter()
            .zip(self.lower[t].iter().zip(&self.upper[t]))
            .map(|(&c, (&lo, &hi))| (-c * lo).max(-c * hi))
            .sum()
    }
}

/// A limit row kept by screening.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SecurityPair {
    /// Monitored line position
    pub monitored: usize,
    /// Contingency position; `None` for the base case
    pub contingency: Option<usize>,
    pub period: usize,
    /// Emit the source → target limit
    pub forward: bool,
    /// Emit the target → source limit
    pub reverse: bool,
    /// `(outaged line, factor)` terms of the post-contingency flow
    pub outage_terms: Vec<(usize, f64)>,
}

impl SecurityPair {
    pub fn is_base_case(&self) -> bool {
        self.contingency.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScreeningResult {
    pub pairs: Vec<SecurityPair>,
    /// Contingencies that split the network and were not modeled
    pub skipped_contingencies: Vec<ContingencyId>,
    /// Candidate (line, contingency-or-base, period) combinations examined
    pub examined: usize,
}

impl ScreeningResult {
    pub fn base_case(&self) -> impl Iterator<Item = &SecurityPair> {
        self.pairs.iter().filter(|p| p.is_base_case())
    }

    pub fn contingency_pairs(&self) -> impl Iterator<Item = &SecurityPair> {
        self.pairs.iter().filter(|p| !p.is_base_case())
    }

    /// Lines whose flow appears in at least one kept row of period `t`.
    pub fn flow_lines(&self, t: usize) -> BTreeSet<usize> {
        let mut lines = BTreeSet::new();
        for pair in self.pairs.iter().filter(|p| p.period == t) {
            lines.insert(pair.monitored);
            lines.extend(pair.outage_terms.iter().map(|&(m, _)| m));
        }
        lines
    }

    /// `(monitored, contingency, period)` keys of the kept rows.
    pub fn keys(&self) -> BTreeSet<(usize, Option<usize>, usize)> {
        self.pairs
            .iter()
            .map(|p| (p.monitored, p.contingency, p.period))
            .collect()
    }
}

/// Keep the rows that can bind under cutoff-sparsified factors.
pub fn screen(
    instance: &Instance,
    factors: &SensitivityFactors,
    bounds: &InjectionBounds,
    config: &FormulationConfig,
) -> ScreeningResult {
    let result = screen_with_cutoffs(
        instance,
        factors,
        bounds,
        config.isf_cutoff,
        config.lodf_cutoff,
        config.enforce_security,
    );
    info!(
        examined = result.examined,
        base = result.base_case().count(),
        contingency = result.contingency_pairs().count(),
        skipped = result.skipped_contingencies.len(),
        "screened transmission limits"
    );
    result
}

/// Same pass over raw factors: every pair that can bind under the DC model.
pub fn screen_exhaustive(
    instance: &Instance,
    factors: &SensitivityFactors,
    bounds: &InjectionBounds,
) -> ScreeningResult {
    screen_with_cutoffs(instance, factors, bounds, 0.0, 0.0, true)
}

fn screen_with_cutoffs(
    instance: &Instance,
    factors: &SensitivityFactors,
    bounds: &InjectionBounds,
    isf_cutoff: f64,
    lodf_cutoff: f64,
    enforce_security: bool,
) -> ScreeningResult {
    let sparse = factors.sparsified(isf_cutoff, 0.0);
    let n_lines = instance.lines().len();
    let mut result = ScreeningResult::default();
    if n_lines == 0 {
        return result;
    }

    // Outage factors per contingency, computed once from raw LODF.
    let mut outages: Vec<(usize, OutageFactors)> = Vec::new();
    if enforce_security {
        for (c, contingency) in instance.contingencies().iter().enumerate() {
            let lines: Vec<usize> = contingency
                .lines
                .iter()
                .filter_map(|id| instance.line_index(id))
                .collect();
            match factors.outage_factors(&lines) {
                Some(outage) => outages.push((c, outage)),
                None => {
                    warn!(contingency = %contingency.id, "contingency splits the network, skipping");
                    result.skipped_contingencies.push(contingency.id.clone());
                }
            }
        }
    }

    for t in 0..instance.time_horizon() {
        for (l, line) in instance.lines().iter().enumerate() {
            result.examined += 1;
            let row = sparse.isf.row(l);
            let forward = bounds.max_flow(t, row) > line.normal_limit.forward[t];
            let reverse = bounds.min_flow_magnitude(t, row) > line.normal_limit.reverse[t];
            if forward || reverse {
                result.pairs.push(SecurityPair {
                    monitored: l,
                    contingency: None,
                    period: t,
                    forward,
                    reverse,
                    outage_terms: Vec::new(),
                });
            }
        }

        for (c, outage) in &outages {
            for (l, line) in instance.lines().iter().enumerate() {
                if outage.is_outaged(l) {
                    continue;
                }
                result.examined += 1;
                let terms: Vec<(usize, f64)> = outage
                    .terms(l)
                    .into_iter()
                    .filter(|(_, factor)| factor.abs() >= lodf_cutoff)
                    .collect();
                let tighter = line.emergency_limit.forward[t] < line.normal_limit.forward[t]
                    || line.emergency_limit.reverse[t] < line.normal_limit.reverse[t];
                // unchanged flow is already covered by the base-case row
                if terms.is_empty() && !tighter {
                    continue;
                }

                let mut coefficients = sparse.isf.row(l).to_vec();
                for &(m, factor) in &terms {
                    for (coef, &isf_m) in coefficients.iter_mut().zip(sparse.isf.row(m)) {
                        *coef += factor * isf_m;
                    }
                }
                let forward = bounds.max_flow(t, &coefficients) > line.emergency_limit.forward[t];
                let reverse =
                    bounds.min_flow_magnitude(t, &coefficients) > line.emergency_limit.reverse[t];
                if forward || reverse {
                    result.pairs.push(SecurityPair {
                        monitored: l,
                        contingency: Some(*c),
                        period: t,
                        forward,
                        reverse,
                        outage_terms: terms,
                    });
                }
            }
        }
    }

    debug!(
        isf_cutoff,
        lodf_cutoff,
        kept = result.pairs.len(),
        "limit screening pass finished"
    );
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ParallelConfig;
    use scuc_core::{Bus, Contingency, CostCurve, FlowLimit, Generator, InstanceBuilder, Line};

    fn unit(id: &str, bus: &str, pmax: f64) -> Generator {
        Generator::new(id, bus, 1)
            .with_limits(0.0, pmax)
            .with_cost_curve(CostCurve::piecewise(vec![(0.0, 0.0), (pmax, 10.0 * pmax)]))
    }

    fn triangle(limit: f64) -> Instance {
        InstanceBuilder::new(1)
            .bus(Bus::new("b1", vec![0.0]))
            .bus(Bus::new("b2", vec![0.0]))
            .bus(Bus::new("b3", vec![90.0]))
            .generator(unit("g1", "b1", 100.0))
            .generator(unit("g2", "b2", 100.0))
            .line(Line::new("l12", "b1", "b2", 0.1, 1).with_limit(limit))
            .line(Line::new("l13", "b1", "b3", 0.1, 1).with_limit(limit))
            .line(Line::new("l23", "b2", "b3", 0.2, 1).with_limit(limit))
            .contingency(Contingency::single("l12"))
            .contingency(Contingency::single("l13"))
            .contingency(Contingency::single("l23"))
            .build()
            .unwrap()
    }

    fn factors(instance: &Instance) -> SensitivityFactors {
        SensitivityFactors::compute(instance, &ParallelConfig::default()).unwrap()
    }

    #[test]
    fn injection_box_spans_load_and_capacity() {
        let instance = triangle(50.0);
        let bounds = InjectionBounds::from_instance(&instance);
        assert_eq!(bounds.lower[0], vec![0.0, 0.0, -90.0]);
        // curtailment at b3 may offset its whole load
        assert_eq!(bounds.upper[0], vec![100.0, 100.0, 0.0]);
        assert_eq!(bounds.max_flow(0, &[1.0, 0.0, -1.0]), 190.0);
        assert_eq!(bounds.min_flow_magnitude(0, &[1.0, 0.0, -1.0]), 0.0);
    }

    #[test]
    fn loose_limits_keep_nothing() {
        let instance = triangle(1000.0);
        let f = factors(&instance);
        let bounds = InjectionBounds::from_instance(&instance);
        let result = screen(&instance, &f, &bounds, &FormulationConfig::default());
        assert!(result.pairs.is_empty());
        assert_eq!(result.examined, 3 + 3 * 2);
    }

    #[test]
    fn tight_limits_are_kept() {
        let instance = triangle(20.0);
        let f = factors(&instance);
        let bounds = InjectionBounds::from_instance(&instance);
        let result = screen(&instance, &f, &bounds, &FormulationConfig::default());
        assert_eq!(result.base_case().count(), 3);
        assert!(result.contingency_pairs().count() > 0);
        for pair in result.contingency_pairs() {
            assert!(!pair.outage_terms.is_empty());
        }
    }

    #[test]
    fn screening_matches_exhaustive_when_cutoffs_are_below_factors() {
        for limit in [5.0, 20.0, 45.0, 60.0, 95.0, 500.0] {
            let instance = triangle(limit);
            let f = factors(&instance);
            let bounds = InjectionBounds::from_instance(&instance);
            let config = FormulationConfig {
                isf_cutoff: 1e-4,
                lodf_cutoff: 1e-4,
                ..FormulationConfig::default()
            };
            let screened = screen(&instance, &f, &bounds, &config);
            let exhaustive = screen_exhaustive(&instance, &f, &bounds);
            assert_eq!(screened.keys(), exhaustive.keys(), "limit {}", limit);
        }
    }

    #[test]
    fn one_directional_limit() {
        // g1 can only push power from b1 towards b2
        let instance = InstanceBuilder::new(1)
            .bus(Bus::new("b1", vec![0.0]))
            .bus(Bus::new("b2", vec![40.0]))
            .generator(unit("g1", "b1", 100.0))
            .line(Line::new("l12", "b1", "b2", 0.1, 1).with_limits(
                FlowLimit {
                    forward: vec![30.0],
                    reverse: vec![1.0],
                },
                FlowLimit::symmetric(vec![30.0]),
            ))
            .power_balance_penalty(None)
            .build()
            .unwrap();
        let f = factors(&instance);
        let bounds = InjectionBounds::from_instance(&instance);
        let result = screen(&instance, &f, &bounds, &FormulationConfig::default());
        let pair = &result.pairs[0];
        assert!(pair.forward);
        assert!(!pair.reverse);
    }

    #[test]
    fn islanding_contingency_is_skipped() {
        let instance = InstanceBuilder::new(1)
            .bus(Bus::new("b1", vec![0.0]))
            .bus(Bus::new("b2", vec![10.0]))
            .generator(unit("g1", "b1", 100.0))
            .line(Line::new("l12", "b1", "b2", 0.1, 1).with_limit(5.0))
            .contingency(Contingency::single("l12"))
            .build()
            .unwrap();
        let f = factors(&instance);
        let bounds = InjectionBounds::from_instance(&instance);
        let result = screen(&instance, &f, &bounds, &FormulationConfig::default());
        assert_eq!(result.skipped_contingencies.len(), 1);
        assert_eq!(result.contingency_pairs().count(), 0);
        assert_eq!(result.base_case().count(), 1);
    }

    #[test]
    fn security_can_be_disabled() {
        let instance = triangle(20.0);
        let f = factors(&instance);
        let bounds = InjectionBounds::from_instance(&instance);
        let config = FormulationConfig {
            enforce_security: false,
            ..FormulationConfig::default()
        };
        let result = screen(&instance, &f, &bounds, &config);
        assert_eq!(result.contingency_pairs().count(), 0);
        assert_eq!(result.flow_lines(0).len(), 3);
    }
}
