//! Serde mirror of the JSON instance document.
//!
//! Field names are the human-readable keys of the document format, e.g.
//! `"Ramp up limit (MW)"`. Time series may be given as a scalar (repeated over
//! the horizon) or as an explicit array. Unlimited quantities are written as
//! `null` or omitted.
//!
//! Durations are given in hours and converted to periods with the time step:
//! `Time horizon (h)`, `Minimum uptime (h)`, `Minimum downtime (h)`,
//! `Startup delays (h)` and `Initial status (h)` are multiplied by
//! `60 / Time step (min)`. Per-period series have one entry per period.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use scuc_core::{
    Bus, Contingency, CostCurve, FlowLimit, GenId, Generator, InitialState, Instance,
    InstanceBuilder, Line, LineId, PriceSensitiveLoad, ReserveProduct, StartupCategory,
};

#[derive(Debug, Error, PartialEq)]
pub enum DocumentError {
    #[error("{entity}: {field} has {found} entries, expected {expected}")]
    Length {
        entity: String,
        field: &'static str,
        found: usize,
        expected: usize,
    },
    #[error("{entity}: {message}")]
    Field { entity: String, message: String },
}

impl DocumentError {
    fn field(entity: &str, message: impl Into<String>) -> Self {
        DocumentError::Field {
            entity: entity.to_string(),
            message: message.into(),
        }
    }
}

/// Scalar or per-period value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Series<T> {
    Scalar(T),
    Values(Vec<T>),
}

impl<T: Clone + PartialEq> Series<T> {
    pub fn expand(&self, periods: usize) -> Vec<T> {
        match self {
            Series::Scalar(value) => vec![value.clone(); periods],
            Series::Values(values) => values.clone(),
        }
    }

    /// Collapse constant series to a scalar.
    pub fn compact(values: Vec<T>) -> Self {
        match values.first() {
            Some(first) if values.iter().all(|v| v == first) => Series::Scalar(first.clone()),
            _ => Series::Values(values),
        }
    }
}

/// Distinguishes an absent key (`None`) from an explicit `null` (`Some(None)`).
fn nullable<'de, D>(deserializer: D) -> Result<Option<Option<f64>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<f64>::deserialize(deserializer).map(Some)
}

fn is_false(value: &bool) -> bool {
    !*value
}

fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}

/// Finite entries as numbers, unlimited ones as `null`.
fn limit_series(values: &[f64]) -> Series<Option<f64>> {
    match Series::compact(values.iter().map(|&v| finite(v)).collect()) {
        // a bare `null` reads back as an absent key
        Series::Scalar(None) => Series::Values(vec![None; values.len()]),
        series => series,
    }
}

fn expand_limit(series: Option<&Series<Option<f64>>>, periods: usize) -> Vec<f64> {
    match series {
        Some(series) => series
            .expand(periods)
            .into_iter()
            .map(|v| v.unwrap_or(f64::INFINITY))
            .collect(),
        None => vec![f64::INFINITY; periods],
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceDocument {
    #[serde(rename = "Parameters")]
    pub parameters: ParametersDocument,
    #[serde(rename = "Buses", default)]
    pub buses: BTreeMap<String, BusDocument>,
    #[serde(rename = "Generators", default)]
    pub generators: BTreeMap<String, GeneratorDocument>,
    #[serde(rename = "Transmission lines", default, skip_serializing_if = "BTreeMap::is_empty")]
    pub lines: BTreeMap<String, LineDocument>,
    #[serde(rename = "Reserves", default, skip_serializing_if = "BTreeMap::is_empty")]
    pub reserves: BTreeMap<String, ReserveDocument>,
    #[serde(rename = "Contingencies", default, skip_serializing_if = "BTreeMap::is_empty")]
    pub contingencies: BTreeMap<String, ContingencyDocument>,
    #[serde(
        rename = "Price-sensitive loads",
        default,
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub price_sensitive_loads: BTreeMap<String, PriceSensitiveLoadDocument>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParametersDocument {
    #[serde(rename = "Time horizon (h)")]
    pub time_horizon: f64,
    #[serde(rename = "Time step (min)", default = "default_time_step")]
    pub time_step_minutes: u32,
    /// Absent: default price; `null`: curtailment disabled
    #[serde(
        rename = "Power balance penalty ($/MW)",
        default,
        deserialize_with = "nullable",
        skip_serializing_if = "Option::is_none"
    )]
    pub power_balance_penalty: Option<Option<f64>>,
}

fn default_time_step() -> u32 {
    60
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusDocument {
    #[serde(rename = "Load (MW)", default = "zero_series")]
    pub load: Series<f64>,
    #[serde(rename = "Reference bus?", default, skip_serializing_if = "is_false")]
    pub is_reference: bool,
    #[serde(rename = "Base voltage (kV)", default, skip_serializing_if = "Option::is_none")]
    pub base_kv: Option<f64>,
}

fn zero_series() -> Series<f64> {
    Series::Scalar(0.0)
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GeneratorDocument {
    #[serde(rename = "Bus")]
    pub bus: String,
    #[serde(rename = "Production cost curve (MW)", default, skip_serializing_if = "Vec::is_empty")]
    pub curve_power: Vec<f64>,
    #[serde(rename = "Production cost curve ($)", default, skip_serializing_if = "Vec::is_empty")]
    pub curve_cost: Vec<f64>,
    #[serde(rename = "Cost polynomial", default, skip_serializing_if = "Option::is_none")]
    pub cost_polynomial: Option<Vec<f64>>,
    #[serde(rename = "Minimum power (MW)", default, skip_serializing_if = "Option::is_none")]
    pub min_power: Option<Series<f64>>,
    #[serde(rename = "Maximum power (MW)", default, skip_serializing_if = "Option::is_none")]
    pub max_power: Option<Series<f64>>,
    #[serde(rename = "Startup costs ($)", default, skip_serializing_if = "Vec::is_empty")]
    pub startup_costs: Vec<f64>,
    #[serde(rename = "Startup delays (h)", default, skip_serializing_if = "Vec::is_empty")]
    pub startup_delays: Vec<f64>,
    #[serde(rename = "Ramp up limit (MW)", default, skip_serializing_if = "Option::is_none")]
    pub ramp_up: Option<f64>,
    #[serde(rename = "Ramp down limit (MW)", default, skip_serializing_if = "Option::is_none")]
    pub ramp_down: Option<f64>,
    #[serde(rename = "Startup limit (MW)", default, skip_serializing_if = "Option::is_none")]
    pub startup_limit: Option<f64>,
    #[serde(rename = "Shutdown limit (MW)", default, skip_serializing_if = "Option::is_none")]
    pub shutdown_limit: Option<f64>,
    #[serde(rename = "Minimum uptime (h)", default = "one_hour")]
    pub min_uptime: f64,
    #[serde(rename = "Minimum downtime (h)", default = "one_hour")]
    pub min_downtime: f64,
    /// Positive: hours online; negative: hours offline
    #[serde(rename = "Initial status (h)", default, skip_serializing_if = "Option::is_none")]
    pub initial_status: Option<f64>,
    #[serde(rename = "Initial power (MW)", default)]
    pub initial_power: f64,
    #[serde(rename = "Must run?", default, skip_serializing_if = "is_false")]
    pub must_run: bool,
    #[serde(rename = "Commitment status", default, skip_serializing_if = "Option::is_none")]
    pub commitment_status: Option<Vec<Option<bool>>>,
}

fn one_hour() -> f64 {
    1.0
}

const PARAMETERS: &str = "Parameters";

fn periods_per_hour(step_minutes: u32) -> Result<u32, DocumentError> {
    if step_minutes == 0 || 60 % step_minutes != 0 {
        return Err(DocumentError::field(
            PARAMETERS,
            format!("Time step (min) must divide 60, got {}", step_minutes),
        ));
    }
    Ok(60 / step_minutes)
}

/// Whole number of periods in `hours`; signed for initial statuses.
fn hours_to_periods(
    entity: &str,
    field: &str,
    hours: f64,
    per_hour: u32,
) -> Result<i64, DocumentError> {
    let periods = hours * f64::from(per_hour);
    let rounded = periods.round();
    if !periods.is_finite() || (periods - rounded).abs() > 1e-6 {
        return Err(DocumentError::field(
            entity,
            format!(
                "{} = {} is not a whole number of {}-minute periods",
                field,
                hours,
                60 / per_hour
            ),
        ));
    }
    Ok(rounded as i64)
}

fn hours_to_count(entity: &str, field: &str, hours: f64, per_hour: u32) -> Result<u32, DocumentError> {
    let periods = hours_to_periods(entity, field, hours, per_hour)?;
    u32::try_from(periods)
        .map_err(|_| DocumentError::field(entity, format!("{} must be non-negative, got {}", field, hours)))
}

fn periods_to_hours(periods: i64, per_hour: u32) -> f64 {
    periods as f64 / f64::from(per_hour)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineDocument {
    #[serde(rename = "Source bus")]
    pub source: String,
    #[serde(rename = "Target bus")]
    pub target: String,
    #[serde(rename = "Reactance (ohms)")]
    pub reactance: f64,
    #[serde(rename = "Susceptance (S)", default, skip_serializing_if = "Option::is_none")]
    pub susceptance: Option<f64>,
    #[serde(rename = "Normal flow limit (MW)", default, skip_serializing_if = "Option::is_none")]
    pub normal_limit: Option<Series<Option<f64>>>,
    /// Target to source direction; defaults to the normal limit
    #[serde(
        rename = "Reverse normal flow limit (MW)",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub reverse_normal_limit: Option<Series<Option<f64>>>,
    #[serde(rename = "Emergency flow limit (MW)", default, skip_serializing_if = "Option::is_none")]
    pub emergency_limit: Option<Series<Option<f64>>>,
    #[serde(
        rename = "Reverse emergency flow limit (MW)",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub reverse_emergency_limit: Option<Series<Option<f64>>>,
    #[serde(
        rename = "Flow limit penalty ($/MW)",
        default,
        deserialize_with = "nullable",
        skip_serializing_if = "Option::is_none"
    )]
    pub flow_penalty: Option<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReserveDocument {
    #[serde(rename = "Requirement (MW)")]
    pub requirement: Series<f64>,
    #[serde(rename = "Eligible generators", default, skip_serializing_if = "Vec::is_empty")]
    pub eligible: Vec<String>,
    #[serde(rename = "Zone buses", default, skip_serializing_if = "Vec::is_empty")]
    pub zone: Vec<String>,
    #[serde(rename = "Shortfall penalty ($/MW)", default, skip_serializing_if = "Option::is_none")]
    pub shortfall_penalty: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContingencyDocument {
    #[serde(rename = "Affected lines")]
    pub lines: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSensitiveLoadDocument {
    #[serde(rename = "Bus")]
    pub bus: String,
    #[serde(rename = "Demand (MW)")]
    pub demand: Series<f64>,
    #[serde(rename = "Revenue ($/MW)")]
    pub revenue: Series<f64>,
}

impl InstanceDocument {
    /// Convert to an unvalidated builder; [`InstanceBuilder::build`] does the checking.
    pub fn to_builder(&self) -> Result<InstanceBuilder, DocumentError> {
        let per_hour = periods_per_hour(self.parameters.time_step_minutes)?;
        let t = hours_to_count(PARAMETERS, "Time horizon (h)", self.parameters.time_horizon, per_hour)?
            as usize;
        let mut builder = InstanceBuilder::new(t).time_step_minutes(self.parameters.time_step_minutes);
        if let Some(penalty) = self.parameters.power_balance_penalty {
            builder = builder.power_balance_penalty(penalty);
        }

        for (id, doc) in &self.buses {
            let mut bus = Bus::new(id.as_str(), doc.load.expand(t)).with_reference(doc.is_reference);
            if let Some(kv) = doc.base_kv {
                bus = bus.with_base_kv(kv);
            }
            builder = builder.bus(bus);
        }
        for (id, doc) in &self.generators {
            builder = builder.generator(doc.to_generator(id, t, per_hour)?);
        }
        for (id, doc) in &self.lines {
            builder = builder.line(doc.to_line(id, t));
        }
        for (id, doc) in &self.reserves {
            let mut reserve = ReserveProduct::new(id.as_str(), doc.requirement.expand(t))
                .with_eligible(doc.eligible.iter().map(|g| GenId::new(g.as_str())).collect())
                .with_zone(doc.zone.iter().map(|b| b.as_str().into()).collect());
            if let Some(penalty) = doc.shortfall_penalty {
                reserve = reserve.with_shortfall_penalty(penalty);
            }
            builder = builder.reserve(reserve);
        }
        for (id, doc) in &self.contingencies {
            builder = builder.contingency(Contingency::new(
                id.as_str(),
                doc.lines.iter().map(|l| LineId::new(l.as_str())).collect(),
            ));
        }
        for (id, doc) in &self.price_sensitive_loads {
            builder = builder.price_sensitive_load(PriceSensitiveLoad::new(
                id.as_str(),
                doc.bus.as_str(),
                doc.demand.expand(t),
                doc.revenue.expand(t),
            ));
        }
        Ok(builder)
    }

    pub fn from_instance(instance: &Instance) -> Self {
        let per_hour = instance.periods_per_hour();
        let parameters = ParametersDocument {
            time_horizon: periods_to_hours(instance.time_horizon() as i64, per_hour),
            time_step_minutes: instance.time_step_minutes(),
            power_balance_penalty: Some(instance.power_balance_penalty()),
        };
        InstanceDocument {
            parameters,
            buses: instance
                .buses()
                .iter()
                .map(|bus| {
                    let doc = BusDocument {
                        load: Series::compact(bus.load.clone()),
                        is_reference: bus.is_reference,
                        base_kv: bus.base_kv,
                    };
                    (bus.id.to_string(), doc)
                })
                .collect(),
            generators: instance
                .generators()
                .iter()
                .map(|g| (g.id.to_string(), GeneratorDocument::from_generator(g, per_hour)))
                .collect(),
            lines: instance
                .lines()
                .iter()
                .map(|l| (l.id.to_string(), LineDocument::from_line(l)))
                .collect(),
            reserves: instance
                .reserves()
                .iter()
                .map(|r| {
                    let doc = ReserveDocument {
                        requirement: Series::compact(r.requirement.clone()),
                        eligible: r.eligible.iter().map(|g| g.to_string()).collect(),
                        zone: r.zone.iter().map(|b| b.to_string()).collect(),
                        shortfall_penalty: Some(r.shortfall_penalty),
                    };
                    (r.id.to_string(), doc)
                })
                .collect(),
            contingencies: instance
                .contingencies()
                .iter()
                .map(|c| {
                    let doc = ContingencyDocument {
                        lines: c.lines.iter().map(|l| l.to_string()).collect(),
                    };
                    (c.id.to_string(), doc)
                })
                .collect(),
            price_sensitive_loads: instance
                .price_sensitive_loads()
                .iter()
                .map(|k| {
                    let doc = PriceSensitiveLoadDocument {
                        bus: k.bus.to_string(),
                        demand: Series::compact(k.demand.clone()),
                        revenue: Series::compact(k.revenue.clone()),
                    };
                    (k.id.to_string(), doc)
                })
                .collect(),
        }
    }
}

impl GeneratorDocument {
    fn to_generator(
        &self,
        id: &str,
        periods: usize,
        per_hour: u32,
    ) -> Result<Generator, DocumentError> {
        let curve = match (&self.cost_polynomial, self.curve_power.is_empty()) {
            (Some(_), false) => {
                return Err(DocumentError::field(
                    id,
                    "give either a production cost curve or a cost polynomial, not both",
                ))
            }
            (Some(coeffs), true) => CostCurve::polynomial(coeffs.clone()),
            (None, _) => {
                if self.curve_power.len() != self.curve_cost.len() {
                    return Err(DocumentError::Length {
                        entity: id.to_string(),
                        field: "Production cost curve ($)",
                        found: self.curve_cost.len(),
                        expected: self.curve_power.len(),
                    });
                }
                if self.curve_power.is_empty() {
                    return Err(DocumentError::field(id, "missing production cost curve"));
                }
                CostCurve::piecewise(
                    self.curve_power
                        .iter()
                        .copied()
                        .zip(self.curve_cost.iter().copied())
                        .collect(),
                )
            }
        };

        let (curve_min, curve_max) = match (self.curve_power.first(), self.curve_power.last()) {
            (Some(&lo), Some(&hi)) => (Some(lo), Some(hi)),
            _ => (None, None),
        };
        let min_power = match (&self.min_power, curve_min) {
            (Some(series), _) => series.expand(periods),
            (None, Some(lo)) => vec![lo; periods],
            (None, None) => return Err(DocumentError::field(id, "missing Minimum power (MW)")),
        };
        let max_power = match (&self.max_power, curve_max) {
            (Some(series), _) => series.expand(periods),
            (None, Some(hi)) => vec![hi; periods],
            (None, None) => return Err(DocumentError::field(id, "missing Maximum power (MW)")),
        };

        if self.startup_costs.len() != self.startup_delays.len() {
            return Err(DocumentError::Length {
                entity: id.to_string(),
                field: "Startup delays (h)",
                found: self.startup_delays.len(),
                expected: self.startup_costs.len(),
            });
        }
        let categories = self
            .startup_delays
            .iter()
            .zip(&self.startup_costs)
            .map(|(&delay, &cost)| {
                hours_to_count(id, "Startup delays (h)", delay, per_hour)
                    .map(|delay| StartupCategory::new(delay, cost))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let min_uptime = hours_to_count(id, "Minimum uptime (h)", self.min_uptime, per_hour)?;
        let min_downtime = hours_to_count(id, "Minimum downtime (h)", self.min_downtime, per_hour)?;
        let initial_state = match self.initial_status {
            Some(status) => {
                let periods = hours_to_periods(id, "Initial status (h)", status, per_hour)?;
                InitialState::from_status(periods)
                    .ok_or_else(|| DocumentError::field(id, "Initial status (h) must not be zero"))?
            }
            None => InitialState::offline(min_downtime.max(1)),
        };

        let mut generator = Generator::new(id, self.bus.as_str(), periods)
            .with_limit_series(min_power, max_power)
            .with_cost_curve(curve)
            .with_startup_categories(categories)
            .with_ramp_limits(
                self.ramp_up.unwrap_or(f64::INFINITY),
                self.ramp_down.unwrap_or(f64::INFINITY),
            )
            .with_startup_shutdown_limits(
                self.startup_limit.unwrap_or(f64::INFINITY),
                self.shutdown_limit.unwrap_or(f64::INFINITY),
            )
            .with_min_up_down(min_uptime, min_downtime)
            .with_initial_state(initial_state, self.initial_power)
            .with_must_run(self.must_run);
        if let Some(status) = &self.commitment_status {
            generator = generator.with_commitment_status(status.clone());
        }
        Ok(generator)
    }

    fn from_generator(g: &Generator, per_hour: u32) -> Self {
        let mut doc = GeneratorDocument {
            bus: g.bus.to_string(),
            min_power: Some(Series::compact(g.min_power.clone())),
            max_power: Some(Series::compact(g.max_power.clone())),
            startup_costs: g.startup_categories.iter().map(|c| c.cost).collect(),
            startup_delays: g
                .startup_categories
                .iter()
                .map(|c| periods_to_hours(i64::from(c.delay), per_hour))
                .collect(),
            ramp_up: finite(g.ramp_up),
            ramp_down: finite(g.ramp_down),
            startup_limit: finite(g.startup_limit),
            shutdown_limit: finite(g.shutdown_limit),
            min_uptime: periods_to_hours(i64::from(g.min_uptime), per_hour),
            min_downtime: periods_to_hours(i64::from(g.min_downtime), per_hour),
            initial_status: Some(periods_to_hours(g.initial_state.status(), per_hour)),
            initial_power: g.initial_power,
            must_run: g.must_run,
            commitment_status: g
                .commitment_status
                .iter()
                .any(Option::is_some)
                .then(|| g.commitment_status.clone()),
            ..GeneratorDocument::default()
        };
        match &g.cost_curve {
            CostCurve::Piecewise(points) => {
                doc.curve_power = points.iter().map(|p| p.power).collect();
                doc.curve_cost = points.iter().map(|p| p.cost).collect();
            }
            CostCurve::Polynomial(coeffs) => doc.cost_polynomial = Some(coeffs.clone()),
        }
        doc
    }
}

impl LineDocument {
    fn to_line(&self, id: &str, periods: usize) -> Line {
        let forward = expand_limit(self.normal_limit.as_ref(), periods);
        let reverse = match &self.reverse_normal_limit {
            Some(series) => expand_limit(Some(series), periods),
            None => forward.clone(),
        };
        let emergency_forward = match &self.emergency_limit {
            Some(series) => expand_limit(Some(series), periods),
            None => forward.clone(),
        };
        let emergency_reverse = match (&self.reverse_emergency_limit, &self.emergency_limit) {
            (Some(series), _) => expand_limit(Some(series), periods),
            (None, Some(_)) => emergency_forward.clone(),
            (None, None) => reverse.clone(),
        };

        let mut line = Line::new(id, self.source.as_str(), self.target.as_str(), self.reactance, periods)
            .with_limits(
                FlowLimit { forward, reverse },
                FlowLimit {
                    forward: emergency_forward,
                    reverse: emergency_reverse,
                },
            );
        if let Some(susceptance) = self.susceptance {
            line = line.with_susceptance(susceptance);
        }
        if let Some(penalty) = self.flow_penalty {
            line = line.with_flow_penalty(penalty);
        }
        line
    }

    fn from_line(line: &Line) -> Self {
        let normal = &line.normal_limit;
        let emergency = &line.emergency_limit;
        let emergency_written = emergency.forward != normal.forward;
        let implied_reverse = if emergency_written {
            &emergency.forward
        } else {
            &normal.reverse
        };
        LineDocument {
            source: line.source.to_string(),
            target: line.target.to_string(),
            reactance: line.reactance,
            susceptance: Some(line.susceptance),
            normal_limit: (!normal.forward.iter().all(|v| v.is_infinite()))
                .then(|| limit_series(&normal.forward)),
            reverse_normal_limit: (!normal.is_symmetric()).then(|| limit_series(&normal.reverse)),
            emergency_limit: emergency_written.then(|| limit_series(&emergency.forward)),
            reverse_emergency_limit: (&emergency.reverse != implied_reverse)
                .then(|| limit_series(&emergency.reverse)),
            flow_penalty: Some(line.flow_penalty),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_series_expands() {
        let series: Series<f64> = serde_json::from_str("5.0").unwrap();
        assert_eq!(series.expand(3), vec![5.0; 3]);
        let series: Series<f64> = serde_json::from_str("[1, 2]").unwrap();
        assert_eq!(series.expand(2), vec![1.0, 2.0]);
        assert_eq!(Series::compact(vec![4.0, 4.0]), Series::Scalar(4.0));
    }

    #[test]
    fn null_penalty_differs_from_absent() {
        let absent: ParametersDocument = serde_json::from_str(r#"{"Time horizon (h)": 2}"#).unwrap();
        assert_eq!(absent.power_balance_penalty, None);
        let null: ParametersDocument =
            serde_json::from_str(r#"{"Time horizon (h)": 2, "Power balance penalty ($/MW)": null}"#)
                .unwrap();
        assert_eq!(null.power_balance_penalty, Some(None));
    }

    #[test]
    fn generator_defaults() {
        let doc: GeneratorDocument = serde_json::from_str(
            r#"{
                "Bus": "b1",
                "Production cost curve (MW)": [10, 50],
                "Production cost curve ($)": [100, 400],
                "Minimum downtime (h)": 3
            }"#,
        )
        .unwrap();
        let g = doc.to_generator("g1", 2, 1).unwrap();
        assert_eq!(g.min_power, vec![10.0, 10.0]);
        assert_eq!(g.max_power, vec![50.0, 50.0]);
        assert!(g.ramp_up.is_infinite());
        assert_eq!(g.min_uptime, 1);
        assert_eq!(g.initial_state, InitialState::offline(3));
    }

    #[test]
    fn mismatched_curve_is_rejected() {
        let doc = GeneratorDocument {
            bus: "b1".into(),
            curve_power: vec![0.0, 10.0],
            curve_cost: vec![0.0],
            ..GeneratorDocument::default()
        };
        assert!(matches!(doc.to_generator("g1", 1, 1), Err(DocumentError::Length { .. })));
    }

    #[test]
    fn reverse_limit_defaults_to_forward() {
        let doc: LineDocument = serde_json::from_str(
            r#"{
                "Source bus": "b1", "Target bus": "b2", "Reactance (ohms)": 0.1,
                "Normal flow limit (MW)": [100, null],
                "Reverse emergency flow limit (MW)": 80,
                "Flow limit penalty ($/MW)": null
            }"#,
        )
        .unwrap();
        let line = doc.to_line("l1", 2);
        assert_eq!(line.normal_limit.reverse[0], 100.0);
        assert!(line.normal_limit.forward[1].is_infinite());
        assert_eq!(line.emergency_limit.forward[0], 100.0);
        assert_eq!(line.emergency_limit.reverse, vec![80.0, 80.0]);
        assert_eq!(line.flow_penalty, None);
    }

    const HALF_HOURLY: &str = r#"{
        "Parameters": {"Time horizon (h)": 2, "Time step (min)": 30},
        "Buses": {"b1": {"Load (MW)": [10, 20, 30, 40]}},
        "Generators": {
            "g1": {
                "Bus": "b1",
                "Production cost curve (MW)": [0, 50],
                "Production cost curve ($)": [0, 250],
                "Minimum uptime (h)": 1.5,
                "Minimum downtime (h)": 1,
                "Startup costs ($)": [10, 20],
                "Startup delays (h)": [1, 2.5],
                "Initial status (h)": -0.5
            }
        }
    }"#;

    #[test]
    fn half_hour_step_scales_hour_fields() {
        let doc: InstanceDocument = serde_json::from_str(HALF_HOURLY).unwrap();
        let instance = doc.to_builder().unwrap().build().unwrap();
        assert_eq!(instance.time_horizon(), 4);
        assert_eq!(instance.periods_per_hour(), 2);

        let g = &instance.generators()[0];
        assert_eq!(g.min_uptime, 3);
        assert_eq!(g.min_downtime, 2);
        let delays: Vec<u32> = g.startup_categories.iter().map(|c| c.delay).collect();
        assert_eq!(delays, vec![2, 5]);
        assert_eq!(g.initial_state, InitialState::offline(1));

        let written = InstanceDocument::from_instance(&instance);
        assert_eq!(written.parameters.time_horizon, 2.0);
        let g_doc = &written.generators["g1"];
        assert_eq!(g_doc.min_uptime, 1.5);
        assert_eq!(g_doc.startup_delays, vec![1.0, 2.5]);
        assert_eq!(g_doc.initial_status, Some(-0.5));
        let reread = written.to_builder().unwrap().build().unwrap();
        assert_eq!(reread, instance);
    }

    #[test]
    fn missing_uptime_defaults_to_one_hour() {
        let json = HALF_HOURLY.replace(r#""Minimum uptime (h)": 1.5,"#, "");
        let doc: InstanceDocument = serde_json::from_str(&json).unwrap();
        let instance = doc.to_builder().unwrap().build().unwrap();
        assert_eq!(instance.generators()[0].min_uptime, 2);
    }

    #[test]
    fn durations_must_fill_whole_periods() {
        let json = HALF_HOURLY.replace(r#""Minimum uptime (h)": 1.5"#, r#""Minimum uptime (h)": 1.25"#);
        let doc: InstanceDocument = serde_json::from_str(&json).unwrap();
        let err = doc.to_builder().unwrap_err();
        assert!(matches!(err, DocumentError::Field { ref entity, .. } if entity == "g1"));

        let json = HALF_HOURLY.replace(r#""Time step (min)": 30"#, r#""Time step (min)": 45"#);
        let doc: InstanceDocument = serde_json::from_str(&json).unwrap();
        assert!(matches!(doc.to_builder(), Err(DocumentError::Field { .. })));
    }
}
