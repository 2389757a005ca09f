//! Reserve contributions, headroom and requirement rows.

use scuc_solver_common::{ConstraintClass, ConstraintSense, LinearExpr};

use super::index::column_name;
use super::BuildContext;

pub(crate) fn add_reserves(ctx: &mut BuildContext<'_>) {
    let instance = ctx.instance;
    let periods = instance.time_horizon();

    for (r, product) in instance.reserves().iter().enumerate() {
        let rid = product.id.as_str();
        let eligible = instance.reserve_eligible(product);
        for &g in &eligible {
            let gen = &instance.generators()[g];
            let mut per_period = Vec::with_capacity(periods);
            for t in 0..periods {
                if ctx.index.units[g].on[t].is_fixed_to(0.0) {
                    per_period.push(None);
                    continue;
                }
                let pmax = gen.max_power[t];
                let upper = gen.ramp_up.min(pmax).max(0.0);
                let var = ctx.model.add_continuous(
                    column_name("reserve", &[rid, gen.id.as_str()], t),
                    0.0,
                    upper,
                );
                per_period.push(Some(var));
            }
            ctx.index.reserves.insert((r, g), per_period);
        }

        let mut shortfalls = Vec::with_capacity(periods);
        for t in 0..periods {
            let shortfall = ctx
                .model
                .add_continuous(column_name("shortfall", &[rid], t), 0.0, f64::INFINITY);
            ctx.model.add_objective_term(shortfall, product.shortfall_penalty);

            let mut expr = LinearExpr::new().term(shortfall, 1.0);
            for &g in &eligible {
                if let Some(var) = ctx.index.reserves[&(r, g)][t] {
                    expr.add_term(var, 1.0);
                }
            }
            ctx.model.add_constraint(
                column_name("reserve_req", &[rid], t),
                ConstraintClass::Reserve,
                expr,
                ConstraintSense::GreaterEqual,
                product.requirement[t],
            );
            shortfalls.push(shortfall);
        }
        ctx.index.shortfall.push(shortfalls);
    }

    // output plus held reserve stays within capacity and ramp capability
    for (g, gen) in instance.generators().iter().enumerate() {
        let id = gen.id.as_str();
        for t in 0..periods {
            let held = ctx.index.unit_reserves(g, t);
            if held.is_empty() {
                continue;
            }
            let mut headroom = LinearExpr::new().term(ctx.index.units[g].power[t], 1.0);
            for &(_, var) in &held {
                headroom.add_term(var, 1.0);
            }
            ctx.index.units[g].on[t].add_to(&mut headroom, -gen.max_power[t]);
            ctx.model.add_constraint(
                column_name("headroom", &[id], t),
                ConstraintClass::Reserve,
                headroom,
                ConstraintSense::LessEqual,
                0.0,
            );

            if held.len() > 1 && gen.ramp_up.is_finite() {
                let mut total = LinearExpr::new();
                for &(_, var) in &held {
                    total.add_term(var, 1.0);
                }
                ctx.model.add_constraint(
                    column_name("reserve_ramp", &[id], t),
                    ConstraintClass::Reserve,
                    total,
                    ConstraintSense::LessEqual,
                    gen.ramp_up,
                );
            }
        }
    }
}
