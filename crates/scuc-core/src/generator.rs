//! Generating units: limits, inter-temporal parameters, cost data.

use crate::{BusId, GenId};

/// One breakpoint of a piecewise-linear production cost curve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostPoint {
    /// Output (MW)
    pub power: f64,
    /// Total hourly cost at that output ($)
    pub cost: f64,
}

impl CostPoint {
    pub fn new(power: f64, cost: f64) -> Self {
        Self { power, cost }
    }
}

/// Production cost curve.
///
/// Piecewise curves are used verbatim by the linearizer. Polynomial curves
/// (`c0 + c1·P + c2·P² + ...`) are sampled at evenly spaced points between the
/// period's limits and interpolated linearly.
#[derive(Debug, Clone, PartialEq)]
pub enum CostCurve {
    Piecewise(Vec<CostPoint>),
    Polynomial(Vec<f64>),
}

impl Default for CostCurve {
    fn default() -> Self {
        CostCurve::Polynomial(Vec::new())
    }
}

impl CostCurve {
    pub fn piecewise(points: Vec<(f64, f64)>) -> Self {
        CostCurve::Piecewise(
            points
                .into_iter()
                .map(|(power, cost)| CostPoint::new(power, cost))
                .collect(),
        )
    }

    pub fn polynomial(coeffs: Vec<f64>) -> Self {
        CostCurve::Polynomial(coeffs)
    }

    /// Total cost at output `p`. Piecewise curves extrapolate with their end segments.
    pub fn evaluate(&self, p: f64) -> f64 {
        match self {
            CostCurve::Polynomial(coeffs) => coeffs
                .iter()
                .rev()
                .fold(0.0, |acc, &coeff| acc * p + coeff),
            CostCurve::Piecewise(points) => match points.len() {
                0 => 0.0,
                1 => points[0].cost,
                n => {
                    let idx = points
                        .windows(2)
                        .position(|w| p <= w[1].power)
                        .unwrap_or(n - 2);
                    let (a, b) = (points[idx], points[idx + 1]);
                    let width = b.power - a.power;
                    if width.abs() < f64::EPSILON {
                        return a.cost;
                    }
                    a.cost + (b.cost - a.cost) * (p - a.power) / width
                }
            },
        }
    }

    /// Marginal cost ($/MWh) at output `p`.
    pub fn marginal_cost(&self, p: f64) -> f64 {
        match self {
            CostCurve::Polynomial(coeffs) => coeffs
                .iter()
                .enumerate()
                .skip(1)
                .map(|(k, &c)| k as f64 * c * p.powi(k as i32 - 1))
                .sum(),
            CostCurve::Piecewise(points) => {
                if points.len() < 2 {
                    return 0.0;
                }
                let idx = points
                    .windows(2)
                    .position(|w| p < w[1].power)
                    .unwrap_or(points.len() - 2);
                let (a, b) = (points[idx], points[idx + 1]);
                let width = b.power - a.power;
                if width.abs() < f64::EPSILON {
                    0.0
                } else {
                    (b.cost - a.cost) / width
                }
            }
        }
    }

    /// Points the linearizer interpolates between on `[pmin, pmax]`.
    ///
    /// Piecewise curves return their own breakpoints clipped to the interval;
    /// polynomials are sampled at `samples + 1` evenly spaced outputs.
    pub fn breakpoints(&self, pmin: f64, pmax: f64, samples: usize) -> Vec<CostPoint> {
        match self {
            CostCurve::Piecewise(points) => {
                let mut clipped = vec![CostPoint::new(pmin, self.evaluate(pmin))];
                clipped.extend(
                    points
                        .iter()
                        .filter(|pt| pt.power > pmin && pt.power < pmax)
                        .copied(),
                );
                if pmax > pmin {
                    clipped.push(CostPoint::new(pmax, self.evaluate(pmax)));
                }
                clipped
            }
            CostCurve::Polynomial(_) => {
                if pmax <= pmin {
                    return vec![CostPoint::new(pmin, self.evaluate(pmin))];
                }
                let samples = samples.max(1);
                let step = (pmax - pmin) / samples as f64;
                (0..=samples)
                    .map(|k| {
                        let p = if k == samples { pmax } else { pmin + step * k as f64 };
                        CostPoint::new(p, self.evaluate(p))
                    })
                    .collect()
            }
        }
    }

    /// Output range a piecewise curve is defined on; polynomials cover everything.
    pub fn domain(&self) -> Option<(f64, f64)> {
        match self {
            CostCurve::Piecewise(points) => match (points.first(), points.last()) {
                (Some(first), Some(last)) => Some((first.power, last.power)),
                _ => None,
            },
            CostCurve::Polynomial(_) => Some((f64::NEG_INFINITY, f64::INFINITY)),
        }
    }
}

/// True when `slope` drops below `previous` by more than the relative `tolerance`.
pub fn slope_decreases(previous: f64, slope: f64, tolerance: f64) -> bool {
    slope < previous - tolerance * previous.abs().max(1.0)
}

/// First place where the marginal cost of `curve` decreases on `[lo, hi]`.
///
/// Returns `(segment, slope, previous_slope)`. Piecewise curves are checked on
/// all of their own breakpoints, polynomials on `samples` chords.
pub fn first_non_convex_segment(
    curve: &CostCurve,
    lo: f64,
    hi: f64,
    samples: usize,
    tolerance: f64,
) -> Option<(usize, f64, f64)> {
    let points = match curve {
        CostCurve::Piecewise(points) => points.clone(),
        CostCurve::Polynomial(_) => curve.breakpoints(lo, hi, samples),
    };
    let slopes: Vec<f64> = points
        .windows(2)
        .filter(|w| w[1].power - w[0].power > f64::EPSILON)
        .map(|w| (w[1].cost - w[0].cost) / (w[1].power - w[0].power))
        .collect();
    slopes
        .windows(2)
        .enumerate()
        .find(|(_, w)| slope_decreases(w[0], w[1], tolerance))
        .map(|(idx, w)| (idx + 1, w[1], w[0]))
}

/// Startup cost category: a start after at least `delay` offline periods costs `cost`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StartupCategory {
    pub delay: u32,
    pub cost: f64,
}

impl StartupCategory {
    pub fn new(delay: u32, cost: f64) -> Self {
        Self { delay, cost }
    }
}

/// Commitment state at the start of the horizon.
///
/// `periods` counts how long the unit has been in that state (always >= 1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InitialState {
    pub online: bool,
    pub periods: u32,
}

impl Default for InitialState {
    fn default() -> Self {
        InitialState::offline(1)
    }
}

impl InitialState {
    pub fn online(periods: u32) -> Self {
        Self {
            online: true,
            periods,
        }
    }

    pub fn offline(periods: u32) -> Self {
        Self {
            online: false,
            periods,
        }
    }

    /// Signed status hours: positive when online, negative when offline.
    pub fn from_status(status: i64) -> Option<Self> {
        match status {
            0 => None,
            s if s > 0 => Some(Self::online(u32::try_from(s).ok()?)),
            s => Some(Self::offline(u32::try_from(-s).ok()?)),
        }
    }

    pub fn status(&self) -> i64 {
        if self.online {
            i64::from(self.periods)
        } else {
            -i64::from(self.periods)
        }
    }
}

/// A dispatchable generating unit.
#[derive(Debug, Clone, PartialEq)]
pub struct Generator {
    pub id: GenId,
    pub bus: BusId,
    /// Per-period minimum output when committed (MW)
    pub min_power: Vec<f64>,
    /// Per-period maximum output when committed (MW)
    pub max_power: Vec<f64>,
    pub cost_curve: CostCurve,
    /// Ordered by strictly increasing delay
    pub startup_categories: Vec<StartupCategory>,
    /// MW per period; `f64::INFINITY` means unlimited
    pub ramp_up: f64,
    pub ramp_down: f64,
    /// Largest output reachable in the period the unit starts
    pub startup_limit: f64,
    /// Largest output allowed in the period before the unit stops
    pub shutdown_limit: f64,
    pub min_uptime: u32,
    pub min_downtime: u32,
    pub initial_state: InitialState,
    /// Output in the period before the horizon (MW)
    pub initial_power: f64,
    pub must_run: bool,
    /// Per-period fixed commitment (`Some(true)` on, `Some(false)` off)
    pub commitment_status: Vec<Option<bool>>,
}

impl Generator {
    /// Zero-limit, zero-cost unit over `periods` periods; fill in with the `with_*` builders.
    pub fn new(id: impl Into<GenId>, bus: impl Into<BusId>, periods: usize) -> Self {
        Self {
            id: id.into(),
            bus: bus.into(),
            min_power: vec![0.0; periods],
            max_power: vec![0.0; periods],
            cost_curve: CostCurve::default(),
            startup_categories: Vec::new(),
            ramp_up: f64::INFINITY,
            ramp_down: f64::INFINITY,
            startup_limit: f64::INFINITY,
            shutdown_limit: f64::INFINITY,
            min_uptime: 1,
            min_downtime: 1,
            initial_state: InitialState::default(),
            initial_power: 0.0,
            must_run: false,
            commitment_status: vec![None; periods],
        }
    }

    /// Constant limits for every period.
    pub fn with_limits(mut self, min: f64, max: f64) -> Self {
        self.min_power.iter_mut().for_each(|v| *v = min);
        self.max_power.iter_mut().for_each(|v| *v = max);
        self
    }

    pub fn with_limit_series(mut self, min: Vec<f64>, max: Vec<f64>) -> Self {
        self.min_power = min;
        self.max_power = max;
        self
    }

    pub fn with_cost_curve(mut self, curve: CostCurve) -> Self {
        self.cost_curve = curve;
        self
    }

    pub fn with_startup_categories(mut self, categories: Vec<StartupCategory>) -> Self {
        self.startup_categories = categories;
        self
    }

    pub fn with_ramp_limits(mut self, up: f64, down: f64) -> Self {
        self.ramp_up = up;
        self.ramp_down = down;
        self
    }

    pub fn with_startup_shutdown_limits(mut self, startup: f64, shutdown: f64) -> Self {
        self.startup_limit = startup;
        self.shutdown_limit = shutdown;
        self
    }

    pub fn with_min_up_down(mut self, uptime: u32, downtime: u32) -> Self {
        self.min_uptime = uptime;
        self.min_downtime = downtime;
        self
    }

    pub fn with_initial_state(mut self, state: InitialState, power: f64) -> Self {
        self.initial_state = state;
        self.initial_power = power;
        self
    }

    pub fn with_must_run(mut self, must_run: bool) -> Self {
        self.must_run = must_run;
        self
    }

    pub fn with_commitment_status(mut self, status: Vec<Option<bool>>) -> Self {
        self.commitment_status = status;
        self
    }

    /// Fixed commitment for period `t`: must-run units are always on.
    pub fn fixed_commitment(&self, t: usize) -> Option<bool> {
        if self.must_run {
            return Some(true);
        }
        self.commitment_status.get(t).copied().flatten()
    }

    /// Index of the startup category used after `off_periods` periods offline.
    ///
    /// Nearest breakpoint at or below the duration wins; durations shorter than
    /// the first delay fall into the first category, longer ones than the last
    /// into the last.
    pub fn startup_category_index(&self, off_periods: u32) -> Option<usize> {
        if self.startup_categories.is_empty() {
            return None;
        }
        let idx = self
            .startup_categories
            .iter()
            .rposition(|cat| cat.delay <= off_periods)
            .unwrap_or(0);
        Some(idx)
    }

    /// Startup cost after `off_periods` periods offline.
    pub fn startup_cost(&self, off_periods: u32) -> f64 {
        self.startup_category_index(off_periods)
            .map(|idx| self.startup_categories[idx].cost)
            .unwrap_or(0.0)
    }

    pub fn peak_capacity(&self) -> f64 {
        self.max_power.iter().copied().fold(0.0, f64::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_with_categories() -> Generator {
        Generator::new("g1", "b1", 4).with_startup_categories(vec![
            StartupCategory::new(1, 100.0),
            StartupCategory::new(4, 250.0),
            StartupCategory::new(8, 400.0),
        ])
    }

    #[test]
    fn startup_lookup_is_nearest_below_inclusive() {
        let g = unit_with_categories();
        assert_eq!(g.startup_cost(1), 100.0);
        assert_eq!(g.startup_cost(3), 100.0);
        // exact breakpoint belongs to the category it names
        assert_eq!(g.startup_cost(4), 250.0);
        assert_eq!(g.startup_cost(7), 250.0);
        assert_eq!(g.startup_cost(8), 400.0);
    }

    #[test]
    fn startup_lookup_extrapolates_at_both_ends() {
        let g = unit_with_categories();
        assert_eq!(g.startup_cost(0), 100.0);
        assert_eq!(g.startup_cost(500), 400.0);
        assert_eq!(g.startup_category_index(u32::MAX), Some(2));
    }

    #[test]
    fn no_categories_means_free_starts() {
        let g = Generator::new("g1", "b1", 2);
        assert_eq!(g.startup_cost(3), 0.0);
        assert_eq!(g.startup_category_index(3), None);
    }

    #[test]
    fn piecewise_evaluate_interpolates() {
        let curve = CostCurve::piecewise(vec![(10.0, 100.0), (20.0, 250.0), (40.0, 650.0)]);
        assert!((curve.evaluate(15.0) - 175.0).abs() < 1e-9);
        assert!((curve.evaluate(30.0) - 450.0).abs() < 1e-9);
        assert!((curve.marginal_cost(12.0) - 15.0).abs() < 1e-9);
        assert!((curve.marginal_cost(25.0) - 20.0).abs() < 1e-9);
    }

    #[test]
    fn polynomial_evaluate_and_marginal() {
        let curve = CostCurve::polynomial(vec![100.0, 20.0, 0.05]);
        assert!((curve.evaluate(100.0) - 2600.0).abs() < 1e-9);
        assert!((curve.marginal_cost(100.0) - 30.0).abs() < 1e-9);
    }

    #[test]
    fn breakpoints_clip_piecewise_curve() {
        let curve = CostCurve::piecewise(vec![(0.0, 0.0), (10.0, 50.0), (20.0, 150.0)]);
        let pts = curve.breakpoints(5.0, 15.0, 10);
        let powers: Vec<f64> = pts.iter().map(|p| p.power).collect();
        assert_eq!(powers, vec![5.0, 10.0, 15.0]);
        assert!((pts[0].cost - 25.0).abs() < 1e-9);
        assert!((pts[2].cost - 100.0).abs() < 1e-9);
    }

    #[test]
    fn breakpoints_sample_polynomial() {
        let curve = CostCurve::polynomial(vec![0.0, 0.0, 1.0]);
        let pts = curve.breakpoints(0.0, 4.0, 4);
        assert_eq!(pts.len(), 5);
        assert_eq!(pts[4].power, 4.0);
        assert_eq!(pts[2].cost, 4.0);
    }

    #[test]
    fn convexity_check_flags_decreasing_slope() {
        let convex = CostCurve::piecewise(vec![(0.0, 0.0), (10.0, 50.0), (20.0, 150.0)]);
        assert!(first_non_convex_segment(&convex, 0.0, 20.0, 10, 1e-6).is_none());

        let concave = CostCurve::piecewise(vec![(0.0, 0.0), (10.0, 100.0), (20.0, 150.0)]);
        let (segment, slope, previous) =
            first_non_convex_segment(&concave, 0.0, 20.0, 10, 1e-6).unwrap();
        assert_eq!(segment, 1);
        assert!((slope - 5.0).abs() < 1e-9);
        assert!((previous - 10.0).abs() < 1e-9);
    }

    #[test]
    fn convexity_check_tolerates_rounding() {
        // slopes 10.0 then 9.999_999_99: equal after rounding
        let curve = CostCurve::piecewise(vec![(0.0, 0.0), (1.0, 10.0), (2.0, 19.999_999_99)]);
        assert!(first_non_convex_segment(&curve, 0.0, 2.0, 10, 1e-6).is_none());
    }

    #[test]
    fn concave_polynomial_is_rejected() {
        let curve = CostCurve::polynomial(vec![0.0, 10.0, -0.1]);
        assert!(first_non_convex_segment(&curve, 0.0, 40.0, 8, 1e-6).is_some());
    }

    #[test]
    fn initial_status_sign_convention() {
        assert_eq!(InitialState::from_status(3), Some(InitialState::online(3)));
        assert_eq!(InitialState::from_status(-2), Some(InitialState::offline(2)));
        assert_eq!(InitialState::from_status(0), None);
        assert_eq!(InitialState::offline(5).status(), -5);
    }

    #[test]
    fn must_run_overrides_status() {
        let g = Generator::new("g1", "b1", 2)
            .with_commitment_status(vec![Some(false), None])
            .with_must_run(true);
        assert_eq!(g.fixed_commitment(0), Some(true));
        assert_eq!(g.fixed_commitment(1), Some(true));
    }
}
