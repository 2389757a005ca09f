//! Turning a raw solver assignment back into a schedule.
//!
//! A failed solve (infeasible, unbounded, timeout, error) becomes a
//! [`SolveFailure`] and never a schedule. A successful one is mapped back onto
//! generators, buses, lines and reserves, and output limits and ramp rates
//! are re-checked:
//!
//! | drift                       | outcome                                 |
//! |-----------------------------|-----------------------------------------|
//! | `<= epsilon`                | accepted silently                       |
//! | `epsilon < d <= hard`       | accepted, [`ToleranceViolation`] listed |
//! | `> hard_threshold`          | `SolveFailure { status: error }`        |

use std::collections::BTreeMap;

use scuc_core::{BusId, GenId, Instance, LineId, LoadId, ReserveId};
use scuc_solver_common::{ConstraintClass, RawSolution, SolverStatus};
use serde::Serialize;
use tracing::{info, warn};

use crate::builder::UcModel;
use crate::config::ToleranceConfig;

/// One generator in one period.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScheduleEntry {
    pub generator: GenId,
    pub period: usize,
    pub is_on: bool,
    pub power: f64,
    pub startup: bool,
    pub shutdown: bool,
    /// Contribution per reserve product (MW)
    pub reserves: BTreeMap<ReserveId, f64>,
    pub production_cost: f64,
    pub startup_cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BusPeriod {
    pub bus: BusId,
    pub period: usize,
    pub curtailment: f64,
    pub net_injection: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineFlow {
    pub line: LineId,
    pub period: usize,
    pub flow: f64,
    pub overflow: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReserveShortfall {
    pub reserve: ReserveId,
    pub period: usize,
    pub shortfall: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServedLoad {
    pub load: LoadId,
    pub period: usize,
    pub served: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CostBreakdown {
    pub production: f64,
    pub startup: f64,
    pub reserve_shortfall: f64,
    pub curtailment: f64,
    pub overflow: f64,
    /// Subtracted from the total
    pub price_sensitive_revenue: f64,
    pub total: f64,
}

/// Slack summary of one constraint family.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassReport {
    pub class: ConstraintClass,
    pub count: usize,
    pub binding: usize,
    pub min_slack: f64,
    /// Row duals by constraint name, when the backend reports them
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shadow_prices: Option<BTreeMap<String, f64>>,
}

/// Small numerical drift accepted in a returned schedule.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToleranceViolation {
    pub generator: GenId,
    pub period: usize,
    /// `min_power`, `max_power`, `off_output`, `ramp_up` or `ramp_down`
    pub check: &'static str,
    pub drift: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Schedule {
    pub status: SolverStatus,
    pub objective: f64,
    pub costs: CostBreakdown,
    pub entries: Vec<ScheduleEntry>,
    pub buses: Vec<BusPeriod>,
    pub flows: Vec<LineFlow>,
    pub shortfalls: Vec<ReserveShortfall>,
    pub served: Vec<ServedLoad>,
    pub constraints: Vec<ClassReport>,
    pub warnings: Vec<ToleranceViolation>,
    pub solve_time_ms: u64,
}

impl Schedule {
    pub fn entry(&self, generator: &str, period: usize) -> Option<&ScheduleEntry> {
        self.entries
            .iter()
            .find(|e| e.generator.as_str() == generator && e.period == period)
    }

    /// Commitment bits of `generator`, by period.
    pub fn commitment(&self, generator: &str) -> Vec<bool> {
        self.entries
            .iter()
            .filter(|e| e.generator.as_str() == generator)
            .map(|e| e.is_on)
            .collect()
    }

    pub fn total_curtailment(&self) -> f64 {
        self.buses.iter().map(|b| b.curtailment).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SolveFailure {
    pub status: SolverStatus,
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SolveOutcome {
    Solved(Schedule),
    Failed(SolveFailure),
}

impl SolveOutcome {
    pub fn schedule(&self) -> Option<&Schedule> {
        match self {
            SolveOutcome::Solved(schedule) => Some(schedule),
            SolveOutcome::Failed(_) => None,
        }
    }

    pub fn status(&self) -> SolverStatus {
        match self {
            SolveOutcome::Solved(schedule) => schedule.status,
            SolveOutcome::Failed(failure) => failure.status,
        }
    }
}

/// Map `raw` back onto the instance.
pub fn extract(
    instance: &Instance,
    uc: &UcModel,
    raw: &RawSolution,
    tolerances: &ToleranceConfig,
) -> SolveOutcome {
    if !raw.status.is_success() {
        info!(status = %raw.status, "solver returned no schedule");
        return SolveOutcome::Failed(SolveFailure {
            status: raw.status,
            message: raw.message.clone(),
        });
    }

    let values = uc.model.column_values(&raw.values);
    let value = |var: scuc_solver_common::VarId| values[var.index()];
    let periods = instance.time_horizon();
    let mut costs = CostBreakdown::default();
    let mut warnings = Vec::new();
    let mut worst: Option<(f64, String)> = None;

    let mut entries = Vec::with_capacity(instance.generators().len() * periods);
    for (g, gen) in instance.generators().iter().enumerate() {
        let cols = &uc.index.units[g];
        let mut was_on = gen.initial_state.online;
        let mut prev_power = gen.initial_power;
        let mut off_periods = if was_on { 0 } else { gen.initial_state.periods };

        for t in 0..periods {
            let is_on = cols.on[t].value(&values) > 0.5;
            let raw_power = value(cols.power[t]);
            let reserves: BTreeMap<ReserveId, f64> = uc
                .index
                .unit_reserves(g, t)
                .into_iter()
                .map(|(r, var)| (instance.reserves()[r].id.clone(), value(var).max(0.0)))
                .collect();
            let held: f64 = reserves.values().sum();

            let mut check = |name: &'static str, drift: f64| {
                if drift > tolerances.epsilon {
                    warnings.push(ToleranceViolation {
                        generator: gen.id.clone(),
                        period: t,
                        check: name,
                        drift,
                    });
                    if worst.as_ref().map_or(true, |(d, _)| drift > *d) {
                        worst = Some((drift, format!("{} of {} in period {}", name, gen.id, t + 1)));
                    }
                }
            };
            if is_on {
                check("min_power", gen.min_power[t] - raw_power);
                check("max_power", raw_power + held - gen.max_power[t]);
            } else {
                check("off_output", raw_power.abs());
            }
            let ramp_up = if was_on { gen.ramp_up } else { gen.startup_limit };
            let ramp_down = if is_on { gen.ramp_down } else { gen.shutdown_limit };
            let (cap, prev_cap) = (gen.max_power[t], if t == 0 { gen.initial_power } else { gen.max_power[t - 1] });
            if ramp_up.min(cap) < cap {
                check("ramp_up", raw_power + held - prev_power - ramp_up.min(cap));
            }
            if ramp_down.min(prev_cap) < prev_cap {
                check("ramp_down", prev_power - raw_power - ramp_down.min(prev_cap));
            }

            let power = if is_on { raw_power.max(0.0) } else { 0.0 };
            let startup = is_on && !was_on;
            let shutdown = !is_on && was_on;
            let startup_cost = if startup { gen.startup_cost(off_periods) } else { 0.0 };
            let production_cost = if is_on { uc.costs.get(g, t).evaluate(power) } else { 0.0 };
            costs.production += production_cost;
            costs.startup += startup_cost;

            entries.push(ScheduleEntry {
                generator: gen.id.clone(),
                period: t,
                is_on,
                power,
                startup,
                shutdown,
                reserves,
                production_cost,
                startup_cost,
            });
            off_periods = if is_on { 0 } else { off_periods.saturating_add(1) };
            was_on = is_on;
            prev_power = power;
        }
    }

    if let Some((drift, at)) = &worst {
        if *drift > tolerances.hard_threshold {
            warn!(drift, at = %at, "solution violates limits beyond the hard threshold");
            return SolveOutcome::Failed(SolveFailure {
                status: SolverStatus::Error,
                message: Some(format!(
                    "solution drift {:.3e} at {} exceeds hard threshold {:.3e}",
                    drift, at, tolerances.hard_threshold
                )),
            });
        }
    }
    if !warnings.is_empty() {
        warn!(count = warnings.len(), "schedule accepted with tolerance violations");
    }

    let penalty = instance.power_balance_penalty().unwrap_or(0.0);
    let mut buses = Vec::with_capacity(instance.buses().len() * periods);
    for (b, bus) in instance.buses().iter().enumerate() {
        for t in 0..periods {
            let curtailment = uc.index.curtailment[b][t].map(|v| value(v).max(0.0)).unwrap_or(0.0);
            costs.curtailment += penalty * curtailment;
            buses.push(BusPeriod {
                bus: bus.id.clone(),
                period: t,
                curtailment,
                net_injection: value(uc.index.injection[b][t]),
            });
        }
    }

    let mut flows = Vec::new();
    if let Some(factors) = &uc.factors {
        for t in 0..periods {
            let injections: Vec<f64> = (0..instance.buses().len())
                .map(|b| value(uc.index.injection[b][t]))
                .collect();
            for (l, flow) in factors.isf.flows(&injections).into_iter().enumerate() {
                let line = &instance.lines()[l];
                let overflow = uc.index.overflow.get(&(l, t)).map(|&v| value(v).max(0.0)).unwrap_or(0.0);
                costs.overflow += line.flow_penalty.unwrap_or(0.0) * overflow;
                flows.push(LineFlow {
                    line: line.id.clone(),
                    period: t,
                    flow,
                    overflow,
                });
            }
        }
    }

    let mut shortfalls = Vec::new();
    for (r, product) in instance.reserves().iter().enumerate() {
        for t in 0..periods {
            let shortfall = value(uc.index.shortfall[r][t]).max(0.0);
            costs.reserve_shortfall += product.shortfall_penalty * shortfall;
            shortfalls.push(ReserveShortfall {
                reserve: product.id.clone(),
                period: t,
                shortfall,
            });
        }
    }

    let mut served = Vec::new();
    for (k, load) in instance.price_sensitive_loads().iter().enumerate() {
        for t in 0..periods {
            let amount = value(uc.index.served[k][t]).max(0.0);
            costs.price_sensitive_revenue += load.revenue[t] * amount;
            served.push(ServedLoad {
                load: load.id.clone(),
                period: t,
                served: amount,
            });
        }
    }

    costs.total = costs.production + costs.startup + costs.reserve_shortfall + costs.curtailment
        + costs.overflow
        - costs.price_sensitive_revenue;
    let objective = raw.objective.unwrap_or(costs.total);
    let constraints = class_reports(uc, &values, raw, tolerances.epsilon);

    info!(
        objective,
        recomputed = costs.total,
        warnings = warnings.len(),
        "extracted schedule"
    );
    SolveOutcome::Solved(Schedule {
        status: raw.status,
        objective,
        costs,
        entries,
        buses,
        flows,
        shortfalls,
        served,
        constraints,
        warnings,
        solve_time_ms: raw.solve_time_ms,
    })
}

fn class_reports(uc: &UcModel, values: &[f64], raw: &RawSolution, epsilon: f64) -> Vec<ClassReport> {
    let mut reports: BTreeMap<ConstraintClass, ClassReport> = BTreeMap::new();
    for row in uc.model.constraints() {
        let slack = row.slack(values);
        let report = reports.entry(row.class).or_insert_with(|| ClassReport {
            class: row.class,
            count: 0,
            binding: 0,
            min_slack: f64::INFINITY,
            shadow_prices: raw.duals.as_ref().map(|_| BTreeMap::new()),
        });
        report.count += 1;
        if slack.abs() <= epsilon * row.rhs.abs().max(1.0) {
            report.binding += 1;
        }
        report.min_slack = report.min_slack.min(slack);
        if let (Some(prices), Some(duals)) = (report.shadow_prices.as_mut(), raw.duals.as_ref()) {
            if let Some(&dual) = duals.get(&row.name) {
                prices.insert(row.name.clone(), dual);
            }
        }
    }
    reports.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::ModelBuilder;
    use crate::config::ScucConfig;
    use scuc_core::{Bus, CostCurve, Generator, InstanceBuilder, StartupCategory};

    fn instance() -> Instance {
        InstanceBuilder::new(2)
            .bus(Bus::new("b1", vec![10.0, 20.0]))
            .generator(
                Generator::new("g1", "b1", 2)
                    .with_limits(5.0, 30.0)
                    .with_cost_curve(CostCurve::piecewise(vec![(0.0, 0.0), (30.0, 150.0)]))
                    .with_startup_categories(vec![StartupCategory::new(1, 40.0)]),
            )
            .build()
            .unwrap()
    }

    fn assignment(uc: &UcModel, power: [f64; 2]) -> RawSolution {
        let mut values = BTreeMap::new();
        for var in uc.model.variables() {
            values.insert(var.name.clone(), 0.0);
        }
        for t in 0..2 {
            values.insert(format!("on[g1,{}]", t + 1), 1.0);
            values.insert(format!("power[g1,{}]", t + 1), power[t]);
            values.insert(format!("inj[b1,{}]", t + 1), 0.0);
        }
        values.insert("startup[g1,1]".to_string(), 1.0);
        RawSolution::new(SolverStatus::Optimal, None, values)
    }

    fn build(instance: &Instance) -> UcModel {
        ModelBuilder::new(instance, &ScucConfig::default()).build().unwrap()
    }

    #[test]
    fn failure_status_yields_no_schedule() {
        let instance = instance();
        let uc = build(&instance);
        let raw = RawSolution::failed(SolverStatus::Infeasible, "nope");
        let outcome = extract(&instance, &uc, &raw, &ToleranceConfig::default());
        assert_eq!(
            outcome,
            SolveOutcome::Failed(SolveFailure {
                status: SolverStatus::Infeasible,
                message: Some("nope".into())
            })
        );
        assert!(outcome.schedule().is_none());
    }

    #[test]
    fn schedule_and_costs_are_reconstructed() {
        let instance = instance();
        let uc = build(&instance);
        let outcome = extract(&instance, &uc, &assignment(&uc, [10.0, 20.0]), &ToleranceConfig::default());
        let schedule = outcome.schedule().unwrap();
        assert_eq!(schedule.commitment("g1"), vec![true, true]);
        let first = schedule.entry("g1", 0).unwrap();
        assert!(first.startup);
        assert_eq!(first.startup_cost, 40.0);
        assert!((first.production_cost - 50.0).abs() < 1e-9);
        assert!((schedule.costs.total - 190.0).abs() < 1e-9);
        assert!(schedule.warnings.is_empty());
        assert!(schedule.flows.is_empty());
    }

    #[test]
    fn small_drift_is_a_warning() {
        let instance = instance();
        let uc = build(&instance);
        let outcome = extract(&instance, &uc, &assignment(&uc, [10.0, 30.0001]), &ToleranceConfig::default());
        let schedule = outcome.schedule().unwrap();
        assert_eq!(schedule.warnings.len(), 1);
        assert_eq!(schedule.warnings[0].check, "max_power");
        assert_eq!(schedule.warnings[0].period, 1);
    }

    #[test]
    fn large_drift_rejects_the_solution() {
        let instance = instance();
        let uc = build(&instance);
        let outcome = extract(&instance, &uc, &assignment(&uc, [2.0, 20.0]), &ToleranceConfig::default());
        assert_eq!(outcome.status(), SolverStatus::Error);
    }

    #[test]
    fn class_report_counts_rows() {
        let instance = instance();
        let uc = build(&instance);
        let outcome = extract(&instance, &uc, &assignment(&uc, [10.0, 20.0]), &ToleranceConfig::default());
        let schedule = outcome.schedule().unwrap();
        let production = schedule
            .constraints
            .iter()
            .find(|r| r.class == ConstraintClass::Production)
            .unwrap();
        assert_eq!(production.count, uc.model.constraints_of(ConstraintClass::Production).count());
        assert!(production.shadow_prices.is_none());
    }
}
