//! The validated instance and its builder.
//!
//! ```text
//!   InstanceBuilder ──validate()──▶ Diagnostics
//!          │
//!          └──build()──▶ sort by ID ─▶ structural checks ─▶ convexity ─▶ Instance
//! ```
//!
//! Structural problems are collected as diagnostics; `build` fails with the
//! first one as [`ScucError::Validation`]. A cost curve whose marginal cost
//! decreases fails with [`ScucError::NonConvexCost`].

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

use petgraph::unionfind::UnionFind;
use serde::Serialize;

use crate::diagnostics::Diagnostics;
use crate::generator::first_non_convex_segment;
use crate::{
    Bus, BusId, Contingency, ContingencyId, CostCurve, FlowLimit, GenId, Generator, Line, LineId,
    LoadId, PriceSensitiveLoad, ReserveId, ReserveProduct, ScucError, ScucResult,
    DEFAULT_CONVEXITY_TOLERANCE,
};

/// Chords used when checking polynomial curves for convexity.
const POLYNOMIAL_CHECK_SAMPLES: usize = 32;

/// Accumulates entities before validation.
#[derive(Debug, Clone)]
pub struct InstanceBuilder {
    time_horizon: usize,
    time_step_minutes: u32,
    power_balance_penalty: Option<f64>,
    convexity_tolerance: f64,
    buses: Vec<Bus>,
    generators: Vec<Generator>,
    lines: Vec<Line>,
    reserves: Vec<ReserveProduct>,
    contingencies: Vec<Contingency>,
    price_sensitive_loads: Vec<PriceSensitiveLoad>,
}

impl InstanceBuilder {
    pub fn new(time_horizon: usize) -> Self {
        Self {
            time_horizon,
            time_step_minutes: 60,
            power_balance_penalty: Some(1000.0),
            convexity_tolerance: DEFAULT_CONVEXITY_TOLERANCE,
            buses: Vec::new(),
            generators: Vec::new(),
            lines: Vec::new(),
            reserves: Vec::new(),
            contingencies: Vec::new(),
            price_sensitive_loads: Vec::new(),
        }
    }

    pub fn time_step_minutes(mut self, minutes: u32) -> Self {
        self.time_step_minutes = minutes;
        self
    }

    /// Curtailment price ($/MW); `None` forbids curtailment.
    pub fn power_balance_penalty(mut self, penalty: Option<f64>) -> Self {
        self.power_balance_penalty = penalty;
        self
    }

    pub fn convexity_tolerance(mut self, tolerance: f64) -> Self {
        self.convexity_tolerance = tolerance;
        self
    }

    pub fn bus(mut self, bus: Bus) -> Self {
        self.buses.push(bus);
        self
    }

    pub fn generator(mut self, generator: Generator) -> Self {
        self.generators.push(generator);
        self
    }

    pub fn line(mut self, line: Line) -> Self {
        self.lines.push(line);
        self
    }

    pub fn reserve(mut self, reserve: ReserveProduct) -> Self {
        self.reserves.push(reserve);
        self
    }

    pub fn contingency(mut self, contingency: Contingency) -> Self {
        self.contingencies.push(contingency);
        self
    }

    pub fn price_sensitive_load(mut self, load: PriceSensitiveLoad) -> Self {
        self.price_sensitive_loads.push(load);
        self
    }

    /// Collect every structural problem without building.
    pub fn validate(&self) -> Diagnostics {
        let mut diag = Diagnostics::new();
        let t = self.time_horizon;

        if t == 0 {
            diag.add_error_with_entity("horizon", "time horizon must be at least 1", "instance");
        }
        if self.time_step_minutes == 0 || 60 % self.time_step_minutes != 0 {
            diag.add_error_with_entity(
                "horizon",
                &format!("time step of {} minutes does not divide an hour", self.time_step_minutes),
                "instance",
            );
        }
        if let Some(penalty) = self.power_balance_penalty {
            check_non_negative(&mut diag, "instance", "power balance penalty", penalty);
        }

        let bus_ids = unique_ids(&mut diag, "bus", self.buses.iter().map(|b| &b.id));
        let gen_ids = unique_ids(&mut diag, "generator", self.generators.iter().map(|g| &g.id));
        let line_ids = unique_ids(&mut diag, "line", self.lines.iter().map(|l| &l.id));
        unique_ids(&mut diag, "reserve", self.reserves.iter().map(|r| &r.id));
        unique_ids(
            &mut diag,
            "contingency",
            self.contingencies.iter().map(|c| &c.id),
        );
        unique_ids(
            &mut diag,
            "price-sensitive load",
            self.price_sensitive_loads.iter().map(|l| &l.id),
        );

        if self.buses.is_empty() {
            diag.add_error_with_entity("network", "instance has no buses", "instance");
        }
        let references = self.buses.iter().filter(|b| b.is_reference).count();
        if references > 1 {
            diag.add_error_with_entity(
                "network",
                &format!("{} buses are flagged as reference, expected at most one", references),
                "instance",
            );
        }

        for bus in &self.buses {
            let entity = bus.id.as_str();
            check_series(&mut diag, entity, "load", &bus.load, t, false);
        }

        for gen in &self.generators {
            self.validate_generator(&mut diag, gen, &bus_ids);
        }

        for line in &self.lines {
            let entity = line.id.as_str();
            for bus in [&line.source, &line.target] {
                if !bus_ids.contains(bus) {
                    diag.add_error_with_entity(
                        "reference",
                        &format!("line references unknown bus {}", bus),
                        entity,
                    );
                }
            }
            if line.source == line.target {
                diag.add_error_with_entity("network", "line connects a bus to itself", entity);
            }
            if !(line.reactance.is_finite() && line.reactance > 0.0) {
                diag.add_error_with_entity("network", "reactance must be positive", entity);
            }
            if !(line.susceptance.is_finite() && line.susceptance > 0.0) {
                diag.add_error_with_entity("network", "susceptance must be positive", entity);
            }
            check_limit(&mut diag, entity, "normal flow limit", &line.normal_limit, t);
            check_limit(&mut diag, entity, "emergency flow limit", &line.emergency_limit, t);
            if let Some(penalty) = line.flow_penalty {
                check_non_negative(&mut diag, entity, "flow limit penalty", penalty);
            }
        }

        for reserve in &self.reserves {
            let entity = reserve.id.as_str();
            check_series(&mut diag, entity, "requirement", &reserve.requirement, t, true);
            check_non_negative(&mut diag, entity, "shortfall penalty", reserve.shortfall_penalty);
            for gen in &reserve.eligible {
                if !gen_ids.contains(gen) {
                    diag.add_error_with_entity(
                        "reference",
                        &format!("reserve eligibility references unknown generator {}", gen),
                        entity,
                    );
                }
            }
            for bus in &reserve.zone {
                if !bus_ids.contains(bus) {
                    diag.add_error_with_entity(
                        "reference",
                        &format!("reserve zone references unknown bus {}", bus),
                        entity,
                    );
                }
            }
        }

        for contingency in &self.contingencies {
            let entity = contingency.id.as_str();
            if contingency.lines.is_empty() {
                diag.add_error_with_entity("reference", "contingency has no lines", entity);
            }
            let mut seen = HashSet::new();
            for line in &contingency.lines {
                if !line_ids.contains(line) {
                    diag.add_error_with_entity(
                        "reference",
                        &format!("contingency references unknown line {}", line),
                        entity,
                    );
                }
                if !seen.insert(line) {
                    diag.add_error_with_entity(
                        "reference",
                        &format!("line {} listed twice", line),
                        entity,
                    );
                }
            }
        }

        for load in &self.price_sensitive_loads {
            let entity = load.id.as_str();
            if !bus_ids.contains(&load.bus) {
                diag.add_error_with_entity(
                    "reference",
                    &format!("price-sensitive load references unknown bus {}", load.bus),
                    entity,
                );
            }
            check_series(&mut diag, entity, "demand", &load.demand, t, true);
            check_series(&mut diag, entity, "revenue", &load.revenue, t, false);
        }

        if !diag.has_errors() && t > 0 {
            self.capacity_warnings(&mut diag);
        }

        diag
    }

    fn validate_generator(&self, diag: &mut Diagnostics, gen: &Generator, bus_ids: &HashSet<&BusId>) {
        let entity = gen.id.as_str();
        let t = self.time_horizon;

        if !bus_ids.contains(&gen.bus) {
            diag.add_error_with_entity(
                "reference",
                &format!("generator references unknown bus {}", gen.bus),
                entity,
            );
        }
        check_series(diag, entity, "minimum power", &gen.min_power, t, true);
        check_series(diag, entity, "maximum power", &gen.max_power, t, true);
        for (period, (min, max)) in gen.min_power.iter().zip(&gen.max_power).enumerate() {
            if min > max {
                diag.add_error_with_entity(
                    "limits",
                    &format!(
                        "minimum power {} exceeds maximum power {} in period {}",
                        min,
                        max,
                        period + 1
                    ),
                    entity,
                );
            }
        }

        for (name, value) in [
            ("ramp up limit", gen.ramp_up),
            ("ramp down limit", gen.ramp_down),
            ("startup limit", gen.startup_limit),
            ("shutdown limit", gen.shutdown_limit),
            ("initial power", gen.initial_power),
        ] {
            if value.is_nan() || value < 0.0 {
                diag.add_error_with_entity("limits", &format!("{} must be non-negative", name), entity);
            }
        }
        if gen.initial_state.periods == 0 {
            diag.add_error_with_entity(
                "initial",
                "initial status must be non-zero",
                entity,
            );
        }
        if !gen.initial_state.online && gen.initial_power > 0.0 {
            diag.add_error_with_entity(
                "initial",
                "initial power must be zero for a unit that is initially off",
                entity,
            );
        }
        if gen.commitment_status.len() != t {
            diag.add_error_with_entity(
                "series",
                &format!(
                    "commitment status has {} entries, expected {}",
                    gen.commitment_status.len(),
                    t
                ),
                entity,
            );
        }

        match &gen.cost_curve {
            CostCurve::Piecewise(points) => {
                if points.is_empty() {
                    diag.add_error_with_entity("cost", "cost curve has no points", entity);
                }
                if points.iter().any(|p| !p.power.is_finite() || !p.cost.is_finite()) {
                    diag.add_error_with_entity("cost", "cost curve has non-finite points", entity);
                }
                if points.windows(2).any(|w| w[1].power <= w[0].power) {
                    diag.add_error_with_entity(
                        "cost",
                        "cost curve power values must be strictly increasing",
                        entity,
                    );
                }
                if let (Some((lo, hi)), false) = (gen.cost_curve.domain(), gen.min_power.is_empty()) {
                    let pmin = gen.min_power.iter().copied().fold(f64::INFINITY, f64::min);
                    let pmax = gen.peak_capacity();
                    let slack = self.convexity_tolerance * pmax.abs().max(1.0);
                    if lo > pmin + slack || hi < pmax - slack {
                        diag.add_error_with_entity(
                            "cost",
                            &format!(
                                "cost curve covers [{}, {}] but limits span [{}, {}]",
                                lo, hi, pmin, pmax
                            ),
                            entity,
                        );
                    }
                }
            }
            CostCurve::Polynomial(coeffs) => {
                if coeffs.iter().any(|c| !c.is_finite()) {
                    diag.add_error_with_entity("cost", "cost polynomial has non-finite coefficients", entity);
                }
            }
        }

        for pair in gen.startup_categories.windows(2) {
            if pair[1].delay <= pair[0].delay {
                diag.add_error_with_entity(
                    "startup",
                    "startup delays must be strictly increasing",
                    entity,
                );
            }
            if pair[1].cost < pair[0].cost {
                diag.add_error_with_entity(
                    "startup",
                    "startup costs must not decrease with longer delays",
                    entity,
                );
            }
        }
        for category in &gen.startup_categories {
            if category.delay == 0 {
                diag.add_error_with_entity("startup", "startup delays start at 1", entity);
            }
            if category.cost.is_nan() || category.cost < 0.0 {
                diag.add_error_with_entity("startup", "startup costs must be non-negative", entity);
            }
        }
    }

    fn capacity_warnings(&self, diag: &mut Diagnostics) {
        for t in 0..self.time_horizon {
            let load: f64 = self.buses.iter().map(|b| b.load[t]).sum();
            let capacity: f64 = self.generators.iter().map(|g| g.max_power[t]).sum();
            if capacity < load {
                diag.add_warning_with_entity(
                    "capacity",
                    &format!(
                        "installed capacity {} MW is below load {} MW in period {}",
                        capacity,
                        load,
                        t + 1
                    ),
                    "instance",
                );
            }
        }
    }

    /// Validate and freeze the instance.
    pub fn build(self) -> ScucResult<Instance> {
        self.build_with_diagnostics().map(|(instance, _)| instance)
    }

    /// Like [`build`](Self::build), also returning the warnings found.
    pub fn build_with_diagnostics(mut self) -> ScucResult<(Instance, Diagnostics)> {
        self.buses.sort_by(|a, b| a.id.cmp(&b.id));
        self.generators.sort_by(|a, b| a.id.cmp(&b.id));
        self.lines.sort_by(|a, b| a.id.cmp(&b.id));
        self.reserves.sort_by(|a, b| a.id.cmp(&b.id));
        self.contingencies.sort_by(|a, b| a.id.cmp(&b.id));
        self.price_sensitive_loads.sort_by(|a, b| a.id.cmp(&b.id));

        let diagnostics = self.validate().into_result()?;

        for gen in &self.generators {
            let lo = gen.min_power.iter().copied().fold(f64::INFINITY, f64::min);
            let hi = gen.peak_capacity();
            if let Some((segment, slope, previous)) = first_non_convex_segment(
                &gen.cost_curve,
                lo,
                hi,
                POLYNOMIAL_CHECK_SAMPLES,
                self.convexity_tolerance,
            ) {
                return Err(ScucError::NonConvexCost {
                    generator: gen.id.to_string(),
                    segment,
                    slope,
                    previous,
                });
            }
        }

        let instance = Instance {
            time_horizon: self.time_horizon,
            time_step_minutes: self.time_step_minutes,
            power_balance_penalty: self.power_balance_penalty,
            bus_index: index_of(self.buses.iter().map(|b| &b.id)),
            gen_index: index_of(self.generators.iter().map(|g| &g.id)),
            line_index: index_of(self.lines.iter().map(|l| &l.id)),
            reserve_index: index_of(self.reserves.iter().map(|r| &r.id)),
            contingency_index: index_of(self.contingencies.iter().map(|c| &c.id)),
            load_index: index_of(self.price_sensitive_loads.iter().map(|l| &l.id)),
            buses: self.buses,
            generators: self.generators,
            lines: self.lines,
            reserves: self.reserves,
            contingencies: self.contingencies,
            price_sensitive_loads: self.price_sensitive_loads,
        };
        Ok((instance, diagnostics))
    }
}

fn unique_ids<'a, I, T>(diag: &mut Diagnostics, kind: &str, ids: I) -> HashSet<&'a T>
where
    I: Iterator<Item = &'a T>,
    T: Eq + Hash + std::fmt::Display + 'a,
{
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            diag.add_error_with_entity("duplicate", &format!("duplicate {} id", kind), &id.to_string());
        }
    }
    seen
}

fn index_of<'a, T: Clone + Eq + Hash + 'a>(ids: impl Iterator<Item = &'a T>) -> HashMap<T, usize> {
    ids.enumerate().map(|(idx, id)| (id.clone(), idx)).collect()
}

fn check_series(
    diag: &mut Diagnostics,
    entity: &str,
    name: &str,
    series: &[f64],
    periods: usize,
    non_negative: bool,
) {
    if series.len() != periods {
        diag.add_error_with_entity(
            "series",
            &format!("{} has {} entries, expected {}", name, series.len(), periods),
            entity,
        );
    }
    if series.iter().any(|v| !v.is_finite()) {
        diag.add_error_with_entity("series", &format!("{} has non-finite values", name), entity);
    } else if non_negative && series.iter().any(|&v| v < 0.0) {
        diag.add_error_with_entity("series", &format!("{} must be non-negative", name), entity);
    }
}

fn check_limit(diag: &mut Diagnostics, entity: &str, name: &str, limit: &FlowLimit, periods: usize) {
    for series in [&limit.forward, &limit.reverse] {
        if series.len() != periods {
            diag.add_error_with_entity(
                "series",
                &format!("{} has {} entries, expected {}", name, series.len(), periods),
                entity,
            );
        }
        if series.iter().any(|v| v.is_nan() || *v < 0.0) {
            diag.add_error_with_entity("limits", &format!("{} must be non-negative", name), entity);
        }
    }
}

fn check_non_negative(diag: &mut Diagnostics, entity: &str, name: &str, value: f64) {
    if value.is_nan() || value < 0.0 {
        diag.add_error_with_entity("limits", &format!("{} must be non-negative", name), entity);
    }
}

/// Validated, immutable unit commitment instance.
///
/// Entity slices are sorted by ID; the `*_index` lookups return positions in
/// those slices.
#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    time_horizon: usize,
    time_step_minutes: u32,
    power_balance_penalty: Option<f64>,
    buses: Vec<Bus>,
    generators: Vec<Generator>,
    lines: Vec<Line>,
    reserves: Vec<ReserveProduct>,
    contingencies: Vec<Contingency>,
    price_sensitive_loads: Vec<PriceSensitiveLoad>,
    bus_index: HashMap<BusId, usize>,
    gen_index: HashMap<GenId, usize>,
    line_index: HashMap<LineId, usize>,
    reserve_index: HashMap<ReserveId, usize>,
    contingency_index: HashMap<ContingencyId, usize>,
    load_index: HashMap<LoadId, usize>,
}

impl Instance {
    pub fn time_horizon(&self) -> usize {
        self.time_horizon
    }

    pub fn time_step_minutes(&self) -> u32 {
        self.time_step_minutes
    }

    /// Periods in one hour; the time step always divides 60.
    pub fn periods_per_hour(&self) -> u32 {
        60 / self.time_step_minutes
    }

    pub fn power_balance_penalty(&self) -> Option<f64> {
        self.power_balance_penalty
    }

    pub fn buses(&self) -> &[Bus] {
        &self.buses
    }

    pub fn generators(&self) -> &[Generator] {
        &self.generators
    }

    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    pub fn reserves(&self) -> &[ReserveProduct] {
        &self.reserves
    }

    pub fn contingencies(&self) -> &[Contingency] {
        &self.contingencies
    }

    pub fn price_sensitive_loads(&self) -> &[PriceSensitiveLoad] {
        &self.price_sensitive_loads
    }

    pub fn bus(&self, id: &BusId) -> Option<&Bus> {
        self.bus_index(id).map(|idx| &self.buses[idx])
    }

    pub fn bus_index(&self, id: &BusId) -> Option<usize> {
        self.bus_index.get(id).copied()
    }

    pub fn generator(&self, id: &GenId) -> Option<&Generator> {
        self.generator_index(id).map(|idx| &self.generators[idx])
    }

    pub fn generator_index(&self, id: &GenId) -> Option<usize> {
        self.gen_index.get(id).copied()
    }

    pub fn line(&self, id: &LineId) -> Option<&Line> {
        self.line_index(id).map(|idx| &self.lines[idx])
    }

    pub fn line_index(&self, id: &LineId) -> Option<usize> {
        self.line_index.get(id).copied()
    }

    pub fn reserve(&self, id: &ReserveId) -> Option<&ReserveProduct> {
        self.reserve_index.get(id).map(|&idx| &self.reserves[idx])
    }

    pub fn contingency(&self, id: &ContingencyId) -> Option<&Contingency> {
        self.contingency_index
            .get(id)
            .map(|&idx| &self.contingencies[idx])
    }

    pub fn price_sensitive_load(&self, id: &LoadId) -> Option<&PriceSensitiveLoad> {
        self.load_index
            .get(id)
            .map(|&idx| &self.price_sensitive_loads[idx])
    }

    /// Position of the angle reference: the flagged bus, else the first bus.
    pub fn reference_bus_index(&self) -> usize {
        self.buses
            .iter()
            .position(|b| b.is_reference)
            .unwrap_or(0)
    }

    /// Generator positions located at `bus`, ascending.
    pub fn generators_at_bus(&self, bus: &BusId) -> impl Iterator<Item = usize> + '_ {
        let bus = bus.clone();
        self.generators
            .iter()
            .enumerate()
            .filter(move |(_, g)| g.bus == bus)
            .map(|(idx, _)| idx)
    }

    /// Generator positions allowed to provide `reserve`, ascending.
    pub fn reserve_eligible(&self, reserve: &ReserveProduct) -> Vec<usize> {
        let mut eligible: Vec<usize> = if !reserve.eligible.is_empty() {
            reserve
                .eligible
                .iter()
                .filter_map(|id| self.generator_index(id))
                .collect()
        } else if !reserve.zone.is_empty() {
            let zone: HashSet<&BusId> = reserve.zone.iter().collect();
            self.generators
                .iter()
                .enumerate()
                .filter(|(_, g)| zone.contains(&g.bus))
                .map(|(idx, _)| idx)
                .collect()
        } else {
            (0..self.generators.len()).collect()
        };
        eligible.sort_unstable();
        eligible.dedup();
        eligible
    }

    /// Connected components of the bus/line graph, each sorted by bus position.
    pub fn islands(&self) -> Vec<Vec<usize>> {
        let mut components = UnionFind::<usize>::new(self.buses.len());
        for line in &self.lines {
            if let (Some(from), Some(to)) = (self.bus_index(&line.source), self.bus_index(&line.target)) {
                components.union(from, to);
            }
        }
        let labels = components.into_labeling();
        let mut by_root: Vec<(usize, Vec<usize>)> = Vec::new();
        for (bus, root) in labels.into_iter().enumerate() {
            match by_root.iter_mut().find(|(r, _)| *r == root) {
                Some((_, members)) => members.push(bus),
                None => by_root.push((root, vec![bus])),
            }
        }
        by_root.into_iter().map(|(_, members)| members).collect()
    }

    /// Total fixed load in period `t` (MW).
    pub fn total_load(&self, t: usize) -> f64 {
        self.buses.iter().map(|b| b.load[t]).sum()
    }

    pub fn stats(&self) -> InstanceStats {
        InstanceStats {
            periods: self.time_horizon,
            buses: self.buses.len(),
            generators: self.generators.len(),
            lines: self.lines.len(),
            reserves: self.reserves.len(),
            contingencies: self.contingencies.len(),
            price_sensitive_loads: self.price_sensitive_loads.len(),
            peak_load: (0..self.time_horizon)
                .map(|t| self.total_load(t))
                .fold(0.0, f64::max),
            installed_capacity: self.generators.iter().map(|g| g.peak_capacity()).sum(),
        }
    }
}

/// Entity counts for reporting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstanceStats {
    pub periods: usize,
    pub buses: usize,
    pub generators: usize,
    pub lines: usize,
    pub reserves: usize,
    pub contingencies: usize,
    pub price_sensitive_loads: usize,
    pub peak_load: f64,
    pub installed_capacity: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_bus() -> InstanceBuilder {
        InstanceBuilder::new(2)
            .bus(Bus::new("b2", vec![5.0, 5.0]))
            .bus(Bus::new("b1", vec![10.0, 20.0]))
            .generator(
                Generator::new("g1", "b1", 2)
                    .with_limits(0.0, 50.0)
                    .with_cost_curve(CostCurve::piecewise(vec![(0.0, 0.0), (50.0, 250.0)])),
            )
            .line(Line::new("l1", "b1", "b2", 0.1, 2).with_limit(40.0))
    }

    #[test]
    fn build_sorts_and_indexes() {
        let instance = two_bus().build().unwrap();
        assert_eq!(instance.buses()[0].id.as_str(), "b1");
        assert_eq!(instance.bus_index(&BusId::new("b2")), Some(1));
        assert_eq!(instance.line(&LineId::new("l1")).unwrap().source.as_str(), "b1");
        assert!(instance.generator(&GenId::new("nope")).is_none());
    }

    #[test]
    fn dangling_generator_bus_is_rejected() {
        let err = two_bus()
            .generator(Generator::new("g2", "b9", 2).with_limits(0.0, 10.0))
            .build()
            .unwrap_err();
        match err {
            ScucError::Validation { entity, message } => {
                assert_eq!(entity, "g2");
                assert!(message.contains("b9"));
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn time_step_must_divide_an_hour() {
        let err = two_bus().time_step_minutes(45).build().unwrap_err();
        assert!(matches!(err, ScucError::Validation { ref message, .. } if message.contains("45")));
        two_bus().time_step_minutes(15).build().unwrap();
    }

    #[test]
    fn dangling_line_bus_is_rejected() {
        let err = two_bus()
            .line(Line::new("l2", "b1", "b7", 0.1, 2))
            .build()
            .unwrap_err();
        assert!(matches!(err, ScucError::Validation { ref entity, .. } if entity == "l2"));
    }

    #[test]
    fn pmin_above_pmax_is_rejected() {
        let err = two_bus()
            .generator(
                Generator::new("g2", "b1", 2)
                    .with_limit_series(vec![5.0, 30.0], vec![20.0, 20.0])
                    .with_cost_curve(CostCurve::polynomial(vec![0.0, 1.0])),
            )
            .build()
            .unwrap_err();
        match err {
            ScucError::Validation { entity, message } => {
                assert_eq!(entity, "g2");
                assert!(message.contains("period 2"));
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn unknown_reserve_generator_is_rejected() {
        let err = two_bus()
            .reserve(
                ReserveProduct::new("r1", vec![1.0, 1.0]).with_eligible(vec![GenId::new("ghost")]),
            )
            .build()
            .unwrap_err();
        assert!(matches!(err, ScucError::Validation { ref entity, .. } if entity == "r1"));
    }

    #[test]
    fn non_convex_curve_is_rejected() {
        let err = InstanceBuilder::new(1)
            .bus(Bus::new("b1", vec![10.0]))
            .generator(
                Generator::new("g1", "b1", 1)
                    .with_limits(0.0, 20.0)
                    .with_cost_curve(CostCurve::piecewise(vec![
                        (0.0, 0.0),
                        (10.0, 100.0),
                        (20.0, 150.0),
                    ])),
            )
            .build()
            .unwrap_err();
        assert!(matches!(err, ScucError::NonConvexCost { ref generator, segment: 1, .. } if generator == "g1"));
    }

    #[test]
    fn curve_must_cover_limits() {
        let err = InstanceBuilder::new(1)
            .bus(Bus::new("b1", vec![10.0]))
            .generator(
                Generator::new("g1", "b1", 1)
                    .with_limits(0.0, 60.0)
                    .with_cost_curve(CostCurve::piecewise(vec![(0.0, 0.0), (50.0, 250.0)])),
            )
            .build()
            .unwrap_err();
        assert!(matches!(err, ScucError::Validation { .. }));
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let diag = two_bus().bus(Bus::new("b1", vec![0.0, 0.0])).validate();
        assert!(diag.errors().any(|i| i.category == "duplicate"));
    }

    #[test]
    fn series_length_is_checked() {
        let diag = two_bus().bus(Bus::new("b3", vec![1.0])).validate();
        assert!(diag
            .errors()
            .any(|i| i.category == "series" && i.entity.as_deref() == Some("b3")));
    }

    #[test]
    fn capacity_shortfall_is_only_a_warning() {
        let (_, diag) = InstanceBuilder::new(1)
            .bus(Bus::new("b1", vec![100.0]))
            .generator(Generator::new("g1", "b1", 1).with_limits(0.0, 10.0))
            .build_with_diagnostics()
            .unwrap();
        assert_eq!(diag.warning_count(), 1);
    }

    #[test]
    fn reserve_eligibility_falls_back_to_zone_then_all() {
        let instance = two_bus()
            .generator(Generator::new("g2", "b2", 2).with_limits(0.0, 10.0))
            .reserve(ReserveProduct::new("r_all", vec![1.0, 1.0]))
            .reserve(ReserveProduct::new("r_zone", vec![1.0, 1.0]).with_zone(vec![BusId::new("b2")]))
            .reserve(
                ReserveProduct::new("r_list", vec![1.0, 1.0])
                    .with_eligible(vec![GenId::new("g1")])
                    .with_zone(vec![BusId::new("b2")]),
            )
            .build()
            .unwrap();
        let all = instance.reserve(&ReserveId::new("r_all")).unwrap();
        let zone = instance.reserve(&ReserveId::new("r_zone")).unwrap();
        let list = instance.reserve(&ReserveId::new("r_list")).unwrap();
        assert_eq!(instance.reserve_eligible(all), vec![0, 1]);
        assert_eq!(instance.reserve_eligible(zone), vec![1]);
        assert_eq!(instance.reserve_eligible(list), vec![0]);
    }

    #[test]
    fn islands_group_connected_buses() {
        let instance = two_bus()
            .bus(Bus::new("b3", vec![0.0, 0.0]))
            .build()
            .unwrap();
        let islands = instance.islands();
        assert_eq!(islands.len(), 2);
        assert_eq!(islands[0], vec![0, 1]);
        assert_eq!(islands[1], vec![2]);
    }
}
