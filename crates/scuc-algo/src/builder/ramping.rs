//! Inter-period ramping with startup and shutdown limits.
//!
//! ```text
//! power[t] + reserve[t] - power[t-1] <= SU + (RU - SU)·on[t-1]
//! power[t-1] - power[t]              <= SD + (RD - SD)·on[t]
//! ```
//!
//! All four rates are capped at the unit's capacity; rows that can never
//! bind are not emitted. Period 0 uses the initial output and state.

use scuc_solver_common::{ConstraintClass, ConstraintSense, LinearExpr};

use super::index::{column_name, Decision};
use super::BuildContext;

pub(crate) fn add_ramping(ctx: &mut BuildContext<'_>) {
    let instance = ctx.instance;
    let periods = instance.time_horizon();

    for (g, gen) in instance.generators().iter().enumerate() {
        let id = gen.id.as_str();
        let initial_on = Decision::Fixed(if gen.initial_state.online { 1.0 } else { 0.0 });

        for t in 0..periods {
            let power = ctx.index.units[g].power[t];
            let on = ctx.index.units[g].on[t];
            let (prev_power, prev_on, prev_cap) = if t == 0 {
                (None, initial_on, gen.initial_power)
            } else {
                (
                    Some(ctx.index.units[g].power[t - 1]),
                    ctx.index.units[g].on[t - 1],
                    gen.max_power[t - 1],
                )
            };

            let cap = gen.max_power[t];
            let ramp_up = gen.ramp_up.min(cap);
            let startup = gen.startup_limit.min(cap);
            if ramp_up < cap || startup < cap {
                let mut expr = LinearExpr::new().term(power, 1.0);
                for (_, var) in ctx.index.unit_reserves(g, t) {
                    expr.add_term(var, 1.0);
                }
                match prev_power {
                    Some(var) => expr.add_term(var, -1.0),
                    None => expr.add_constant(-gen.initial_power),
                }
                prev_on.add_to(&mut expr, -(ramp_up - startup));
                ctx.model.add_constraint(
                    column_name("ramp_up", &[id], t),
                    ConstraintClass::Ramping,
                    expr,
                    ConstraintSense::LessEqual,
                    startup,
                );
            }

            let ramp_down = gen.ramp_down.min(prev_cap);
            let shutdown = gen.shutdown_limit.min(prev_cap);
            if ramp_down < prev_cap || shutdown < prev_cap {
                let mut expr = LinearExpr::new().term(power, -1.0);
                match prev_power {
                    Some(var) => expr.add_term(var, 1.0),
                    None => expr.add_constant(gen.initial_power),
                }
                on.add_to(&mut expr, -(ramp_down - shutdown));
                ctx.model.add_constraint(
                    column_name("ramp_down", &[id], t),
                    ConstraintClass::Ramping,
                    expr,
                    ConstraintSense::LessEqual,
                    shutdown,
                );
            }
        }
    }
}
