//! Structural feasibility checks done before any column is created.
//!
//! Initial conditions carry over into the horizon: a unit online for `h`
//! periods with minimum uptime `UT > h` must stay on for `UT - h` more
//! periods, and symmetrically for downtime. These forced states are merged
//! with must-run flags and commitment statuses; contradictions, and fixed
//! startups or shutdowns that cannot complete their minimum run inside the
//! fixed pattern, are reported as [`ScucError::InfeasibleInstance`].

use scuc_core::{Generator, Instance, ScucError, ScucResult};
use tracing::debug;

/// Periods at the start of the horizon whose state is forced by the initial condition.
pub fn carryover(generator: &Generator, periods: usize) -> (bool, usize) {
    let state = generator.initial_state;
    let required = if state.online {
        generator.min_uptime
    } else {
        generator.min_downtime
    };
    let remaining = required.saturating_sub(state.periods) as usize;
    (state.online, remaining.min(periods))
}

/// Per-period fixed state after merging carryover, must-run and commitment status.
pub fn effective_commitment(generator: &Generator, periods: usize) -> ScucResult<Vec<Option<bool>>> {
    let (initial_on, forced) = carryover(generator, periods);
    let mut fixed = Vec::with_capacity(periods);
    for t in 0..periods {
        let declared = generator.fixed_commitment(t);
        let state = if t < forced {
            if declared == Some(!initial_on) {
                return Err(ScucError::infeasible(
                    generator.id.as_str(),
                    format!(
                        "initial state forces the unit {} through period {} but period {} is fixed {}",
                        on_off(initial_on),
                        forced,
                        t + 1,
                        on_off(!initial_on)
                    ),
                ));
            }
            Some(initial_on)
        } else {
            declared
        };
        fixed.push(state);
    }
    Ok(fixed)
}

/// Reject fixed transitions whose minimum run cannot be honoured.
pub fn check_generator(generator: &Generator, periods: usize) -> ScucResult<Vec<Option<bool>>> {
    let fixed = effective_commitment(generator, periods)?;
    let mut previous = Some(generator.initial_state.online);
    for (t, &state) in fixed.iter().enumerate() {
        if let (Some(before), Some(now)) = (previous, state) {
            if before != now {
                let (run, label) = if now {
                    (generator.min_uptime, "startup")
                } else {
                    (generator.min_downtime, "shutdown")
                };
                let end = (t + run as usize).min(periods);
                if let Some(offset) = fixed[t..end].iter().position(|&s| s == Some(!now)) {
                    return Err(ScucError::infeasible(
                        generator.id.as_str(),
                        format!(
                            "fixed {} in period {} requires {} periods {} but period {} is fixed {}",
                            label,
                            t + 1,
                            run,
                            on_off(now),
                            t + offset + 1,
                            on_off(!now)
                        ),
                    ));
                }
            }
        }
        previous = state;
    }
    Ok(fixed)
}

/// Fixed states of every generator, instance order.
pub fn check_instance(instance: &Instance) -> ScucResult<Vec<Vec<Option<bool>>>> {
    let periods = instance.time_horizon();
    let fixed = instance
        .generators()
        .iter()
        .map(|g| check_generator(g, periods))
        .collect::<ScucResult<Vec<_>>>()?;
    let count: usize = fixed.iter().flatten().filter(|s| s.is_some()).count();
    debug!(fixed_states = count, "structural pre-solve check passed");
    Ok(fixed)
}

fn on_off(on: bool) -> &'static str {
    if on {
        "on"
    } else {
        "off"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scuc_core::InitialState;

    fn unit(periods: usize) -> Generator {
        Generator::new("g1", "b1", periods).with_limits(0.0, 10.0)
    }

    #[test]
    fn uptime_carries_over() {
        let g = unit(4)
            .with_min_up_down(3, 1)
            .with_initial_state(InitialState::online(1), 5.0);
        assert_eq!(carryover(&g, 4), (true, 2));
        let fixed = check_generator(&g, 4).unwrap();
        assert_eq!(fixed, vec![Some(true), Some(true), None, None]);
    }

    #[test]
    fn carryover_is_clipped_to_horizon() {
        let g = unit(1)
            .with_min_up_down(3, 1)
            .with_initial_state(InitialState::online(1), 5.0);
        assert_eq!(check_generator(&g, 1).unwrap(), vec![Some(true)]);
    }

    #[test]
    fn satisfied_downtime_leaves_unit_free() {
        let g = unit(3)
            .with_min_up_down(1, 2)
            .with_initial_state(InitialState::offline(5), 0.0);
        assert_eq!(check_generator(&g, 3).unwrap(), vec![None; 3]);
    }

    #[test]
    fn carryover_conflicting_with_status_is_infeasible() {
        let g = unit(3)
            .with_min_up_down(1, 3)
            .with_initial_state(InitialState::offline(1), 0.0)
            .with_must_run(true);
        let err = check_generator(&g, 3).unwrap_err();
        assert!(matches!(err, ScucError::InfeasibleInstance { ref generator, .. } if generator == "g1"));
    }

    #[test]
    fn fixed_startup_too_short_is_infeasible() {
        let g = unit(4)
            .with_min_up_down(3, 1)
            .with_commitment_status(vec![Some(false), Some(true), Some(false), None]);
        let err = check_generator(&g, 4).unwrap_err();
        assert!(err.to_string().contains("period 2"));
    }

    #[test]
    fn fixed_pattern_respecting_limits_passes() {
        let g = unit(4)
            .with_min_up_down(2, 2)
            .with_initial_state(InitialState::offline(4), 0.0)
            .with_commitment_status(vec![Some(true), Some(true), Some(false), Some(false)]);
        assert!(check_generator(&g, 4).is_ok());
    }
}
