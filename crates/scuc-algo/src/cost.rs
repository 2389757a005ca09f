//! Piecewise-linear production cost segments.
//!
//! For every generator and period the cost curve is cut into consecutive
//! segments over `[Pmin_t, Pmax_t]`:
//!
//! ```text
//! cost($)
//!   │                  ╱ slope s₃
//!   │             ╱───╱
//!   │        ╱───╱ s₂
//!   │ ──────╱ s₁
//!   │ cost_at_min
//!   └─┬─────┬────┬────┬── P (MW)
//!    Pmin                Pmax
//! ```
//!
//! Piecewise curves keep their own breakpoints (clipped to the period's
//! limits); polynomial curves are sampled at `cost_segments + 1` evenly spaced
//! outputs. Consecutive samples are joined by straight lines, nothing is
//! re-fitted. A decreasing slope is rejected with
//! [`ScucError::NonConvexCost`], never repaired.

use scuc_core::{slope_decreases, CostCurve, Generator, Instance, ScucError, ScucResult};
use serde::Serialize;
use tracing::debug;

use crate::config::FormulationConfig;

/// Linear piece `cost = intercept + slope·P` valid on `[lower, upper]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CostSegment {
    pub slope: f64,
    pub intercept: f64,
    pub lower: f64,
    pub upper: f64,
}

impl CostSegment {
    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }

    pub fn value_at(&self, p: f64) -> f64 {
        self.intercept + self.slope * p
    }
}

/// Segments of one generator in one period.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Linearization {
    pub pmin: f64,
    pub pmax: f64,
    /// Cost of running at exactly `pmin`
    pub cost_at_min: f64,
    /// Ordered by increasing power, slopes non-decreasing
    pub segments: Vec<CostSegment>,
}

impl Linearization {
    /// Cost of output `p` assuming cheaper segments fill first.
    pub fn evaluate(&self, p: f64) -> f64 {
        let mut cost = self.cost_at_min;
        for seg in &self.segments {
            let filled = (p.min(seg.upper) - seg.lower).max(0.0);
            cost += seg.slope * filled;
        }
        cost
    }

    /// Union of segment ranges equals `[pmin, pmax]` with no gaps or overlaps.
    pub fn covers_limits(&self, tolerance: f64) -> bool {
        let scale = self.pmax.abs().max(1.0);
        if self.segments.is_empty() {
            return (self.pmax - self.pmin).abs() <= tolerance * scale;
        }
        let first = self.segments[0].lower;
        let last = self.segments[self.segments.len() - 1].upper;
        (first - self.pmin).abs() <= tolerance * scale
            && (last - self.pmax).abs() <= tolerance * scale
            && self
                .segments
                .windows(2)
                .all(|w| (w[1].lower - w[0].upper).abs() <= tolerance * scale)
    }

    /// Neighbouring segments agree at their shared breakpoint.
    pub fn is_continuous(&self, tolerance: f64) -> bool {
        self.segments.windows(2).all(|w| {
            let left = w[0].value_at(w[0].upper);
            let right = w[1].value_at(w[1].lower);
            (left - right).abs() <= tolerance * left.abs().max(1.0)
        })
    }

    pub fn is_convex(&self, tolerance: f64) -> bool {
        self.segments
            .windows(2)
            .all(|w| !slope_decreases(w[0].slope, w[1].slope, tolerance))
    }
}

/// Cut `curve` into segments over `[pmin, pmax]`.
pub fn linearize(
    generator: &str,
    curve: &CostCurve,
    pmin: f64,
    pmax: f64,
    cost_segments: usize,
    tolerance: f64,
) -> ScucResult<Linearization> {
    if pmin > pmax {
        return Err(ScucError::validation(
            generator,
            format!("minimum power {} exceeds maximum power {}", pmin, pmax),
        ));
    }
    if let Some((lo, hi)) = curve.domain() {
        let slack = tolerance * pmax.abs().max(1.0);
        if lo > pmin + slack || hi < pmax - slack {
            return Err(ScucError::validation(
                generator,
                format!("cost curve covers [{}, {}] but limits span [{}, {}]", lo, hi, pmin, pmax),
            ));
        }
    }

    let points = curve.breakpoints(pmin, pmax, cost_segments);
    let cost_at_min = points.first().map(|p| p.cost).unwrap_or(0.0);

    let mut segments: Vec<CostSegment> = Vec::with_capacity(points.len().saturating_sub(1));
    for w in points.windows(2) {
        let width = w[1].power - w[0].power;
        if width <= f64::EPSILON * pmax.abs().max(1.0) {
            continue;
        }
        let slope = (w[1].cost - w[0].cost) / width;
        if let Some(previous) = segments.last() {
            if slope_decreases(previous.slope, slope, tolerance) {
                return Err(ScucError::NonConvexCost {
                    generator: generator.to_string(),
                    segment: segments.len(),
                    slope,
                    previous: previous.slope,
                });
            }
        }
        segments.push(CostSegment {
            slope,
            intercept: w[0].cost - slope * w[0].power,
            lower: w[0].power,
            upper: w[1].power,
        });
    }

    Ok(Linearization {
        pmin,
        pmax,
        cost_at_min,
        segments,
    })
}

/// One linearization per period of `generator`; identical limits share the work.
pub fn linearize_generator(
    generator: &Generator,
    config: &FormulationConfig,
) -> ScucResult<Vec<Linearization>> {
    let mut out: Vec<Linearization> = Vec::with_capacity(generator.min_power.len());
    for (&pmin, &pmax) in generator.min_power.iter().zip(&generator.max_power) {
        let reused = out
            .iter()
            .rev()
            .find(|lin| lin.pmin == pmin && lin.pmax == pmax)
            .cloned();
        let lin = match reused {
            Some(lin) => lin,
            None => linearize(
                generator.id.as_str(),
                &generator.cost_curve,
                pmin,
                pmax,
                config.cost_segments,
                config.convexity_tolerance,
            )?,
        };
        out.push(lin);
    }
    Ok(out)
}

/// Segments for every generator (outer, instance order) and period (inner).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostTable {
    pub per_generator: Vec<Vec<Linearization>>,
}

impl CostTable {
    pub fn build(instance: &Instance, config: &FormulationConfig) -> ScucResult<Self> {
        let per_generator = instance
            .generators()
            .iter()
            .map(|g| linearize_generator(g, config))
            .collect::<ScucResult<Vec<_>>>()?;
        let segments: usize = per_generator
            .iter()
            .flat_map(|periods| periods.iter().map(|l| l.segments.len()))
            .sum();
        debug!(
            generators = per_generator.len(),
            segments, "linearized production cost curves"
        );
        Ok(Self { per_generator })
    }

    pub fn get(&self, generator: usize, period: usize) -> &Linearization {
        &self.per_generator[generator][period]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scuc_core::CostPoint;

    const TOL: f64 = 1e-6;

    #[test]
    fn piecewise_curve_is_reused_verbatim() {
        let curve = CostCurve::piecewise(vec![(10.0, 100.0), (20.0, 250.0), (40.0, 650.0)]);
        let lin = linearize("g1", &curve, 10.0, 40.0, 10, TOL).unwrap();
        assert_eq!(lin.segments.len(), 2);
        assert_eq!(lin.cost_at_min, 100.0);
        assert_eq!(lin.segments[0].lower, 10.0);
        assert_eq!(lin.segments[0].upper, 20.0);
        assert!((lin.segments[0].slope - 15.0).abs() < 1e-12);
        assert!((lin.segments[1].slope - 20.0).abs() < 1e-12);
        assert!((lin.evaluate(30.0) - 450.0).abs() < 1e-9);
    }

    #[test]
    fn clipping_to_period_limits() {
        let curve = CostCurve::piecewise(vec![(0.0, 0.0), (10.0, 50.0), (20.0, 150.0), (30.0, 300.0)]);
        let lin = linearize("g1", &curve, 5.0, 25.0, 10, TOL).unwrap();
        assert!(lin.covers_limits(TOL));
        assert!(lin.is_continuous(TOL));
        assert_eq!(lin.segments.len(), 3);
        assert!((lin.cost_at_min - 25.0).abs() < 1e-9);
        assert!((lin.evaluate(25.0) - curve.evaluate(25.0)).abs() < 1e-9);
    }

    #[test]
    fn polynomial_is_sampled() {
        let curve = CostCurve::polynomial(vec![100.0, 10.0, 0.02]);
        let lin = linearize("g1", &curve, 20.0, 120.0, 5, TOL).unwrap();
        assert_eq!(lin.segments.len(), 5);
        assert!(lin.is_convex(TOL));
        assert!(lin.covers_limits(TOL));
        assert!(lin.is_continuous(TOL));
        for seg in &lin.segments {
            assert!((seg.value_at(seg.lower) - curve.evaluate(seg.lower)).abs() < 1e-9);
            assert!((seg.value_at(seg.upper) - curve.evaluate(seg.upper)).abs() < 1e-9);
        }
    }

    #[test]
    fn non_convex_curve_is_an_error() {
        let curve = CostCurve::piecewise(vec![(0.0, 0.0), (10.0, 100.0), (20.0, 150.0)]);
        let err = linearize("g9", &curve, 0.0, 20.0, 10, TOL).unwrap_err();
        match err {
            ScucError::NonConvexCost {
                generator,
                segment,
                slope,
                previous,
            } => {
                assert_eq!(generator, "g9");
                assert_eq!(segment, 1);
                assert!((slope - 5.0).abs() < 1e-12);
                assert!((previous - 10.0).abs() < 1e-12);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn fixed_output_has_no_segments() {
        let curve = CostCurve::piecewise(vec![(0.0, 0.0), (50.0, 500.0)]);
        let lin = linearize("g1", &curve, 30.0, 30.0, 10, TOL).unwrap();
        assert!(lin.segments.is_empty());
        assert!((lin.cost_at_min - 300.0).abs() < 1e-9);
        assert!(lin.covers_limits(TOL));
    }

    #[test]
    fn curve_not_covering_limits_is_rejected() {
        let curve = CostCurve::Piecewise(vec![CostPoint::new(10.0, 0.0), CostPoint::new(20.0, 10.0)]);
        assert!(matches!(
            linearize("g1", &curve, 0.0, 20.0, 10, TOL),
            Err(ScucError::Validation { .. })
        ));
    }

    #[test]
    fn convexity_and_coverage_hold_for_many_curves() {
        // quadratic family with varying curvature and limits
        for k in 0..20 {
            let a = 0.001 * k as f64;
            let pmin = k as f64;
            let pmax = pmin + 10.0 + 3.0 * k as f64;
            let curve = CostCurve::polynomial(vec![50.0, 8.0 + k as f64, a]);
            let lin = linearize("g", &curve, pmin, pmax, 1 + k % 7, TOL).unwrap();
            assert!(lin.is_convex(TOL), "k={}", k);
            assert!(lin.covers_limits(TOL), "k={}", k);
            assert!(lin.is_continuous(TOL), "k={}", k);
            let total: f64 = lin.segments.iter().map(|s| s.width()).sum();
            assert!((total - (pmax - pmin)).abs() < 1e-9);
        }
    }
}
