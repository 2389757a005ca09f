//! Schedule export.
//!
//! The JSON solution document groups the extracted schedule by entity, with
//! one array entry per period:
//!
//! ```text
//! {
//!   "Status": "optimal",
//!   "Objective value": 150.0,
//!   "Generators": { "g1": { "Is on?": [true, true], "Power (MW)": [10, 20], ... } },
//!   "Buses": { ... }, "Transmission lines": { ... }, "Reserves": { ... },
//!   "Cost breakdown": { ... }, "Constraints": [ ... ], "Warnings": [ ... ]
//! }
//! ```
//!
//! A failed solve produces only `Status` and `Message`.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use scuc_algo::{ClassReport, CostBreakdown, Schedule, SolveOutcome, ToleranceViolation};
use serde::Serialize;

/// Export of solver results to files or a JSON value.
pub trait SolutionExport {
    fn to_json(&self, path: &Path) -> Result<()>;

    /// One row per generator and period
    #[cfg(feature = "native-io")]
    fn to_csv(&self, path: &Path) -> Result<()>;

    fn to_json_value(&self) -> Result<serde_json::Value>;
}

#[derive(Debug, Default, Serialize)]
struct GeneratorSeries {
    #[serde(rename = "Is on?")]
    is_on: Vec<bool>,
    #[serde(rename = "Power (MW)")]
    power: Vec<f64>,
    #[serde(rename = "Startup")]
    startup: Vec<bool>,
    #[serde(rename = "Shutdown")]
    shutdown: Vec<bool>,
    #[serde(rename = "Reserve (MW)", skip_serializing_if = "BTreeMap::is_empty")]
    reserves: BTreeMap<String, Vec<f64>>,
    #[serde(rename = "Production cost ($)")]
    production_cost: Vec<f64>,
    #[serde(rename = "Startup cost ($)")]
    startup_cost: Vec<f64>,
}

#[derive(Debug, Default, Serialize)]
struct BusSeries {
    #[serde(rename = "Curtailment (MW)")]
    curtailment: Vec<f64>,
    #[serde(rename = "Net injection (MW)")]
    net_injection: Vec<f64>,
}

#[derive(Debug, Default, Serialize)]
struct LineSeries {
    #[serde(rename = "Flow (MW)")]
    flow: Vec<f64>,
    #[serde(rename = "Overflow (MW)")]
    overflow: Vec<f64>,
}

#[derive(Debug, Serialize)]
struct SolutionDocument<'a> {
    #[serde(rename = "Status")]
    status: String,
    #[serde(rename = "Objective value")]
    objective: f64,
    #[serde(rename = "Solve time (ms)")]
    solve_time_ms: u64,
    #[serde(rename = "Generators")]
    generators: BTreeMap<String, GeneratorSeries>,
    #[serde(rename = "Buses")]
    buses: BTreeMap<String, BusSeries>,
    #[serde(rename = "Transmission lines", skip_serializing_if = "BTreeMap::is_empty")]
    lines: BTreeMap<String, LineSeries>,
    #[serde(rename = "Reserves", skip_serializing_if = "BTreeMap::is_empty")]
    reserves: BTreeMap<String, BTreeMap<&'static str, Vec<f64>>>,
    #[serde(rename = "Price-sensitive loads", skip_serializing_if = "BTreeMap::is_empty")]
    served: BTreeMap<String, BTreeMap<&'static str, Vec<f64>>>,
    #[serde(rename = "Cost breakdown")]
    costs: &'a CostBreakdown,
    #[serde(rename = "Constraints")]
    constraints: &'a [ClassReport],
    #[serde(rename = "Warnings", skip_serializing_if = "no_warnings")]
    warnings: &'a [ToleranceViolation],
}

fn no_warnings(warnings: &&[ToleranceViolation]) -> bool {
    warnings.is_empty()
}

impl<'a> SolutionDocument<'a> {
    fn new(schedule: &'a Schedule) -> Self {
        let mut generators: BTreeMap<String, GeneratorSeries> = BTreeMap::new();
        for entry in &schedule.entries {
            let series = generators.entry(entry.generator.to_string()).or_default();
            series.is_on.push(entry.is_on);
            series.power.push(entry.power);
            series.startup.push(entry.startup);
            series.shutdown.push(entry.shutdown);
            series.production_cost.push(entry.production_cost);
            series.startup_cost.push(entry.startup_cost);
            for (reserve, &amount) in &entry.reserves {
                series.reserves.entry(reserve.to_string()).or_default().push(amount);
            }
        }

        let mut buses: BTreeMap<String, BusSeries> = BTreeMap::new();
        for bus in &schedule.buses {
            let series = buses.entry(bus.bus.to_string()).or_default();
            series.curtailment.push(bus.curtailment);
            series.net_injection.push(bus.net_injection);
        }

        let mut lines: BTreeMap<String, LineSeries> = BTreeMap::new();
        for flow in &schedule.flows {
            let series = lines.entry(flow.line.to_string()).or_default();
            series.flow.push(flow.flow);
            series.overflow.push(flow.overflow);
        }

        let mut reserves: BTreeMap<String, BTreeMap<&'static str, Vec<f64>>> = BTreeMap::new();
        for shortfall in &schedule.shortfalls {
            reserves
                .entry(shortfall.reserve.to_string())
                .or_default()
                .entry("Shortfall (MW)")
                .or_default()
                .push(shortfall.shortfall);
        }

        let mut served: BTreeMap<String, BTreeMap<&'static str, Vec<f64>>> = BTreeMap::new();
        for load in &schedule.served {
            served
                .entry(load.load.to_string())
                .or_default()
                .entry("Served (MW)")
                .or_default()
                .push(load.served);
        }

        SolutionDocument {
            status: schedule.status.to_string(),
            objective: schedule.objective,
            solve_time_ms: schedule.solve_time_ms,
            generators,
            buses,
            lines,
            reserves,
            served,
            costs: &schedule.costs,
            constraints: &schedule.constraints,
            warnings: &schedule.warnings,
        }
    }
}

#[derive(Debug, Serialize)]
struct FailureDocument<'a> {
    #[serde(rename = "Status")]
    status: String,
    #[serde(rename = "Message", skip_serializing_if = "Option::is_none")]
    message: Option<&'a str>,
}

#[cfg(feature = "native-io")]
#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    generator: &'a str,
    period: usize,
    is_on: bool,
    power_mw: f64,
    reserve_mw: f64,
    startup: bool,
    shutdown: bool,
    production_cost: f64,
    startup_cost: f64,
}

impl SolutionExport for SolveOutcome {
    fn to_json(&self, path: &Path) -> Result<()> {
        let value = self.to_json_value()?;
        let json = serde_json::to_string_pretty(&value).context("serializing solution")?;
        fs::write(path, json).with_context(|| format!("writing solution '{}'", path.display()))
    }

    #[cfg(feature = "native-io")]
    fn to_csv(&self, path: &Path) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)
            .with_context(|| format!("creating CSV file '{}'", path.display()))?;
        if let Some(schedule) = self.schedule() {
            for entry in &schedule.entries {
                writer.serialize(CsvRow {
                    generator: entry.generator.as_str(),
                    period: entry.period + 1,
                    is_on: entry.is_on,
                    power_mw: entry.power,
                    reserve_mw: entry.reserves.values().sum(),
                    startup: entry.startup,
                    shutdown: entry.shutdown,
                    production_cost: entry.production_cost,
                    startup_cost: entry.startup_cost,
                })?;
            }
        }
        writer.flush()?;
        Ok(())
    }

    fn to_json_value(&self) -> Result<serde_json::Value> {
        let value = match self {
            SolveOutcome::Solved(schedule) => serde_json::to_value(SolutionDocument::new(schedule)),
            SolveOutcome::Failed(failure) => serde_json::to_value(FailureDocument {
                status: failure.status.to_string(),
                message: failure.message.as_deref(),
            }),
        };
        value.context("building solution document")
    }
}
