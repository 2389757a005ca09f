//! End-to-end unit commitment solves on small systems.

use scuc_algo::{pipeline, FormulationConfig, ScucConfig, SolveOutcome};
use scuc_core::{
    Bus, Contingency, CostCurve, Generator, InitialState, Instance, InstanceBuilder, Line,
    ReserveProduct, StartupCategory,
};
use scuc_solver_common::{to_lp_string, SolverStatus};

const TOL: f64 = 1e-4;

fn linear_unit(id: &str, bus: &str, periods: usize, pmax: f64, price: f64) -> Generator {
    Generator::new(id, bus, periods)
        .with_limits(0.0, pmax)
        .with_cost_curve(CostCurve::piecewise(vec![(0.0, 0.0), (pmax, pmax * price)]))
}

fn run(instance: &Instance, config: &ScucConfig) -> SolveOutcome {
    let solver = pipeline::solver_for(config).unwrap();
    pipeline::solve(instance, config, &solver).unwrap()
}

fn two_bus(periods_load: f64, shedding: Option<f64>, line_penalty: Option<f64>) -> Instance {
    InstanceBuilder::new(1)
        .power_balance_penalty(shedding)
        .bus(Bus::new("b1", vec![0.0]))
        .bus(Bus::new("b2", vec![periods_load]))
        .generator(linear_unit("g1", "b1", 1, 100.0, 5.0))
        .line(
            Line::new("l12", "b1", "b2", 0.1, 1)
                .with_limit(15.0)
                .with_flow_penalty(line_penalty),
        )
        .build()
        .unwrap()
}

#[test]
fn single_bus_follows_load() {
    let instance = InstanceBuilder::new(2)
        .bus(Bus::new("b1", vec![10.0, 20.0]))
        .generator(linear_unit("g1", "b1", 2, 30.0, 5.0))
        .build()
        .unwrap();
    let outcome = run(&instance, &ScucConfig::default());
    let schedule = outcome.schedule().expect("solved");

    assert_eq!(schedule.status, SolverStatus::Optimal);
    assert!((schedule.objective - 150.0).abs() < TOL, "objective {}", schedule.objective);
    assert_eq!(schedule.commitment("g1"), vec![true, true]);
    let output: Vec<f64> = schedule.entries.iter().map(|e| e.power).collect();
    assert!((output[0] - 10.0).abs() < TOL);
    assert!((output[1] - 20.0).abs() < TOL);
    assert!((schedule.costs.total - schedule.objective).abs() < TOL);
}

#[test]
fn congested_line_sheds_load() {
    let instance = two_bus(20.0, Some(1000.0), None);
    let outcome = run(&instance, &ScucConfig::default());
    let schedule = outcome.schedule().expect("solved");

    assert!((schedule.total_curtailment() - 5.0).abs() < TOL);
    assert!((schedule.objective - (15.0 * 5.0 + 5.0 * 1000.0)).abs() < 1e-3);
    assert!((schedule.flows[0].flow - 15.0).abs() < TOL);
}

#[test]
fn congested_line_without_shedding_is_infeasible() {
    let instance = two_bus(20.0, None, None);
    let outcome = run(&instance, &ScucConfig::default());
    match outcome {
        SolveOutcome::Failed(failure) => assert_eq!(failure.status, SolverStatus::Infeasible),
        SolveOutcome::Solved(s) => panic!("expected infeasible, got objective {}", s.objective),
    }
}

#[test]
fn congested_line_overflow_is_priced() {
    let instance = two_bus(20.0, None, Some(50.0));
    let outcome = run(&instance, &ScucConfig::default());
    let schedule = outcome.schedule().expect("solved");

    assert!((schedule.flows[0].overflow - 5.0).abs() < TOL);
    assert!((schedule.objective - (20.0 * 5.0 + 5.0 * 50.0)).abs() < 1e-3);
}

#[test]
fn minimum_uptime_carries_over_from_initial_state() {
    let expensive = linear_unit("g1", "b1", 2, 30.0, 50.0)
        .with_limits(5.0, 30.0)
        .with_min_up_down(3, 1)
        .with_initial_state(InitialState::online(1), 10.0);
    let cheap = linear_unit("g2", "b1", 2, 30.0, 1.0);
    let instance = InstanceBuilder::new(2)
        .bus(Bus::new("b1", vec![10.0, 5.0]))
        .generator(expensive)
        .generator(cheap)
        .build()
        .unwrap();
    let outcome = run(&instance, &ScucConfig::default());
    let schedule = outcome.schedule().expect("solved");

    assert_eq!(schedule.commitment("g1"), vec![true, true]);
    assert!(schedule.entries.iter().all(|e| !e.shutdown));
    assert!((schedule.entry("g1", 1).unwrap().power - 5.0).abs() < TOL);
}

#[test]
fn startup_cost_follows_offline_duration() {
    let unit = linear_unit("g1", "b1", 3, 30.0, 5.0)
        .with_limits(5.0, 30.0)
        .with_startup_categories(vec![StartupCategory::new(1, 10.0), StartupCategory::new(4, 80.0)])
        .with_initial_state(InitialState::offline(4), 0.0);
    let instance = InstanceBuilder::new(3)
        .bus(Bus::new("b1", vec![0.0, 10.0, 10.0]))
        .generator(unit)
        .build()
        .unwrap();
    let outcome = run(&instance, &ScucConfig::default());
    let schedule = outcome.schedule().expect("solved");

    assert_eq!(schedule.commitment("g1"), vec![false, true, true]);
    // offline 5 periods at the start in period 2: cold start
    assert!((schedule.costs.startup - 80.0).abs() < TOL);
    assert!((schedule.objective - (80.0 + 100.0)).abs() < 1e-3);
}

#[test]
fn ramp_and_startup_limits_shape_dispatch() {
    // cheap unit starts at 6 MW then climbs 8 MW per period; the rest comes from g2
    let cheap = linear_unit("g1", "b1", 3, 50.0, 1.0)
        .with_ramp_limits(8.0, 8.0)
        .with_startup_shutdown_limits(6.0, 50.0)
        .with_initial_state(InitialState::offline(10), 0.0);
    let expensive = linear_unit("g2", "b1", 3, 100.0, 10.0);
    let instance = InstanceBuilder::new(3)
        .bus(Bus::new("b1", vec![30.0, 30.0, 30.0]))
        .generator(cheap)
        .generator(expensive)
        .build()
        .unwrap();
    let outcome = run(&instance, &ScucConfig::default());
    let schedule = outcome.schedule().expect("solved");

    assert_eq!(schedule.commitment("g1"), vec![true, true, true]);
    for (t, expected) in [6.0, 14.0, 22.0].into_iter().enumerate() {
        let cheap = schedule.entry("g1", t).unwrap().power;
        let expensive = schedule.entry("g2", t).unwrap().power;
        assert!((cheap - expected).abs() < TOL, "g1 at {}: {}", t, cheap);
        assert!((expensive - (30.0 - expected)).abs() < TOL, "g2 at {}: {}", t, expensive);
    }
    assert!((schedule.objective - (42.0 + 48.0 * 10.0)).abs() < 1e-3);
}

#[test]
fn reserve_shortfall_is_penalized() {
    let instance = InstanceBuilder::new(1)
        .bus(Bus::new("b1", vec![25.0]))
        .generator(linear_unit("g1", "b1", 1, 30.0, 5.0))
        .reserve(ReserveProduct::new("spin", vec![10.0]).with_shortfall_penalty(100.0))
        .build()
        .unwrap();
    let outcome = run(&instance, &ScucConfig::default());
    let schedule = outcome.schedule().expect("solved");

    assert!((schedule.shortfalls[0].shortfall - 5.0).abs() < TOL);
    let held: f64 = schedule.entries[0].reserves.values().sum();
    assert!((held - 5.0).abs() < TOL);
    assert!((schedule.objective - (125.0 + 500.0)).abs() < 1e-3);
}

fn triangle() -> Instance {
    InstanceBuilder::new(1)
        .bus(Bus::new("b1", vec![0.0]))
        .bus(Bus::new("b2", vec![0.0]))
        .bus(Bus::new("b3", vec![30.0]))
        .generator(linear_unit("g1", "b1", 1, 100.0, 10.0))
        .generator(linear_unit("g2", "b3", 1, 100.0, 20.0))
        .line(Line::new("l12", "b1", "b2", 0.1, 1).with_flow_penalty(None))
        .line(Line::new("l13", "b1", "b3", 0.1, 1).with_limit(25.0).with_flow_penalty(None))
        .line(Line::new("l23", "b2", "b3", 0.1, 1).with_flow_penalty(None))
        .contingency(Contingency::single("l12"))
        .contingency(Contingency::single("l23"))
        .build()
        .unwrap()
}

#[test]
fn contingency_limits_redispatch() {
    let instance = triangle();
    let outcome = run(&instance, &ScucConfig::default());
    let schedule = outcome.schedule().expect("solved");

    // losing l12 or l23 pushes the whole transfer onto l13
    assert!((schedule.entry("g1", 0).unwrap().power - 25.0).abs() < TOL);
    assert!((schedule.entry("g2", 0).unwrap().power - 5.0).abs() < TOL);
    assert!((schedule.objective - 350.0).abs() < 1e-3);
}

#[test]
fn disabling_security_keeps_base_case_only() {
    let instance = triangle();
    let config = ScucConfig {
        formulation: FormulationConfig {
            enforce_security: false,
            ..FormulationConfig::default()
        },
        ..ScucConfig::default()
    };
    let outcome = run(&instance, &config);
    let schedule = outcome.schedule().expect("solved");

    assert!((schedule.entry("g1", 0).unwrap().power - 30.0).abs() < TOL);
    assert!((schedule.objective - 300.0).abs() < 1e-3);
}

#[test]
fn building_twice_gives_identical_models() {
    let instance = triangle();
    let config = ScucConfig::default();
    let first = pipeline::build_model(&instance, &config, None).unwrap();
    let second = pipeline::build_model(&instance, &config, None).unwrap();

    assert_eq!(first.model, second.model);
    assert_eq!(to_lp_string(&first.model), to_lp_string(&second.model));
}

#[test]
fn precomputed_factors_match_derived_ones() {
    let instance = triangle();
    let config = ScucConfig::default();
    let derived = pipeline::build_model(&instance, &config, None).unwrap();
    let factors = derived.factors.clone().unwrap();
    let reused = pipeline::build_model(&instance, &config, Some(factors)).unwrap();

    assert_eq!(derived.model, reused.model);
}
