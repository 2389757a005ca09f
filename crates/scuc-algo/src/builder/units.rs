//! Commitment, startup and production columns of each generator.
//!
//! ```text
//! on[t] - on[t-1] = startup[t] - shutdown[t]
//! Σ_{i=t-UT+1..t} startup[i]  <= on[t]          (minimum uptime)
//! Σ_{i=t-DT+1..t} shutdown[i] <= 1 - on[t]      (minimum downtime)
//! power[t] = Pmin·on[t] + Σ_k seg[k,t],  0 <= seg[k,t] <= width_k·on[t]
//! ```

use scuc_solver_common::{ConstraintClass, ConstraintSense, LinearExpr};

use super::index::{column_name, Decision, UnitColumns};
use super::BuildContext;

/// On/startup/shutdown columns, transition linking and minimum up/down rows.
pub(crate) fn add_commitment(ctx: &mut BuildContext<'_>) {
    let instance = ctx.instance;
    let fixed = ctx.fixed;
    let periods = instance.time_horizon();
    for (g, gen) in instance.generators().iter().enumerate() {
        let id = gen.id.as_str();
        let mut cols = UnitColumns::default();

        for t in 0..periods {
            let on = match fixed[g][t] {
                Some(state) => Decision::Fixed(if state { 1.0 } else { 0.0 }),
                None => Decision::Var(ctx.model.add_binary(column_name("on", &[id], t))),
            };
            cols.on.push(on);
        }

        let initial = Decision::Fixed(if gen.initial_state.online { 1.0 } else { 0.0 });
        for t in 0..periods {
            let prev = if t == 0 { initial } else { cols.on[t - 1] };
            let on = cols.on[t];
            let (startup, shutdown) = match (prev.fixed(), on.fixed()) {
                (Some(before), Some(now)) => (
                    Decision::Fixed((now - before).max(0.0)),
                    Decision::Fixed((before - now).max(0.0)),
                ),
                _ => {
                    let startup = if prev.is_fixed_to(1.0) || on.is_fixed_to(0.0) {
                        Decision::Fixed(0.0)
                    } else {
                        Decision::Var(ctx.model.add_binary(column_name("startup", &[id], t)))
                    };
                    let shutdown = if prev.is_fixed_to(0.0) || on.is_fixed_to(1.0) {
                        Decision::Fixed(0.0)
                    } else {
                        Decision::Var(ctx.model.add_binary(column_name("shutdown", &[id], t)))
                    };
                    (startup, shutdown)
                }
            };

            let mut link = LinearExpr::new();
            on.add_to(&mut link, 1.0);
            prev.add_to(&mut link, -1.0);
            startup.add_to(&mut link, -1.0);
            shutdown.add_to(&mut link, 1.0);
            if !link.is_empty() {
                ctx.model.add_constraint(
                    column_name("commit", &[id], t),
                    ConstraintClass::Commitment,
                    link,
                    ConstraintSense::Equal,
                    0.0,
                );
            }
            if let (Some(su), Some(sd)) = (startup.var(), shutdown.var()) {
                ctx.model.add_constraint(
                    column_name("transition", &[id], t),
                    ConstraintClass::Commitment,
                    LinearExpr::new().term(su, 1.0).term(sd, 1.0),
                    ConstraintSense::LessEqual,
                    1.0,
                );
            }
            cols.startup.push(startup);
            cols.shutdown.push(shutdown);
        }

        for t in 0..periods {
            if gen.min_uptime > 1 {
                let first = (t + 1).saturating_sub(gen.min_uptime as usize);
                let mut expr = LinearExpr::new();
                for su in &cols.startup[first..=t] {
                    su.add_to(&mut expr, 1.0);
                }
                cols.on[t].add_to(&mut expr, -1.0);
                if !expr.is_empty() {
                    ctx.model.add_constraint(
                        column_name("min_up", &[id], t),
                        ConstraintClass::MinUpDown,
                        expr,
                        ConstraintSense::LessEqual,
                        0.0,
                    );
                }
            }
            if gen.min_downtime > 1 {
                let first = (t + 1).saturating_sub(gen.min_downtime as usize);
                let mut expr = LinearExpr::new();
                for sd in &cols.shutdown[first..=t] {
                    sd.add_to(&mut expr, 1.0);
                }
                cols.on[t].add_to(&mut expr, 1.0);
                if !expr.is_empty() {
                    ctx.model.add_constraint(
                        column_name("min_down", &[id], t),
                        ConstraintClass::MinUpDown,
                        expr,
                        ConstraintSense::LessEqual,
                        1.0,
                    );
                }
            }
        }

        ctx.index.units.push(cols);
    }
}

/// Startup cost terms, with one selector binary per category when the cost
/// depends on how long the unit has been offline.
///
/// Category `s` may be chosen at `t` only if the unit shut down `i` periods
/// earlier with `delay_s <= i < delay_{s+1}`; the first window starts at one
/// period and the last category is always admissible.
pub(crate) fn add_startup_costs(ctx: &mut BuildContext<'_>) {
    let instance = ctx.instance;
    let periods = instance.time_horizon();
    for (g, gen) in instance.generators().iter().enumerate() {
        let id = gen.id.as_str();
        let categories = &gen.startup_categories;
        match categories.len() {
            0 => {
                ctx.index.units[g].startup_category = vec![Vec::new(); periods];
                continue;
            }
            1 => {
                for t in 0..periods {
                    let startup = ctx.index.units[g].startup[t];
                    add_objective(ctx, startup, categories[0].cost);
                }
                ctx.index.units[g].startup_category = vec![Vec::new(); periods];
                continue;
            }
            _ => {}
        }

        // shutdown that started the initial off period, as an offset before t = 0
        let initial_off = (!gen.initial_state.online).then_some(gen.initial_state.periods as usize);

        for t in 0..periods {
            let startup = ctx.index.units[g].startup[t];
            if startup.is_fixed_to(0.0) {
                ctx.index.units[g].startup_category.push(Vec::new());
                continue;
            }
            let selectors: Vec<_> = (0..categories.len())
                .map(|s| {
                    let var = ctx
                        .model
                        .add_binary(column_name("startup_cat", &[id, &(s + 1).to_string()], t));
                    ctx.model.add_objective_term(var, categories[s].cost);
                    var
                })
                .collect();

            let mut select = LinearExpr::new();
            for &var in &selectors {
                select.add_term(var, 1.0);
            }
            startup.add_to(&mut select, -1.0);
            ctx.model.add_constraint(
                column_name("startup_select", &[id], t),
                ConstraintClass::StartupCategory,
                select,
                ConstraintSense::Equal,
                0.0,
            );

            for s in 0..categories.len() - 1 {
                let lo = if s == 0 { 1 } else { categories[s].delay.max(1) as usize };
                let hi = (categories[s + 1].delay as usize).saturating_sub(1);
                let mut window = LinearExpr::new().term(selectors[s], 1.0);
                for i in lo..=hi.min(t) {
                    ctx.index.units[g].shutdown[t - i].add_to(&mut window, -1.0);
                }
                if let Some(k) = initial_off {
                    if (lo..=hi).contains(&(t + k)) {
                        window.add_constant(-1.0);
                    }
                }
                ctx.model.add_constraint(
                    column_name("startup_window", &[id, &(s + 1).to_string()], t),
                    ConstraintClass::StartupCategory,
                    window,
                    ConstraintSense::LessEqual,
                    0.0,
                );
            }
            ctx.index.units[g].startup_category.push(selectors);
        }
    }
}

/// Output columns, cost segments and production cost.
pub(crate) fn add_production(ctx: &mut BuildContext<'_>) {
    let instance = ctx.instance;
    let costs = ctx.costs;
    let periods = instance.time_horizon();
    for (g, gen) in instance.generators().iter().enumerate() {
        let id = gen.id.as_str();
        for t in 0..periods {
            let lin = costs.get(g, t);
            let on = ctx.index.units[g].on[t];
            let off = on.is_fixed_to(0.0);
            let upper = if off { 0.0 } else { lin.pmax };
            let power = ctx.model.add_continuous(column_name("power", &[id], t), 0.0, upper);

            let mut output = LinearExpr::new().term(power, 1.0);
            on.add_to(&mut output, -lin.pmin);
            let mut segments = Vec::with_capacity(lin.segments.len());
            if !off {
                for (k, seg) in lin.segments.iter().enumerate() {
                    let key = (k + 1).to_string();
                    let var = ctx
                        .model
                        .add_continuous(column_name("seg", &[id, &key], t), 0.0, seg.width());
                    if let Some(on_var) = on.var() {
                        ctx.model.add_constraint(
                            column_name("seg_gate", &[id, &key], t),
                            ConstraintClass::Production,
                            LinearExpr::new().term(var, 1.0).term(on_var, -seg.width()),
                            ConstraintSense::LessEqual,
                            0.0,
                        );
                    }
                    ctx.model.add_objective_term(var, seg.slope);
                    output.add_term(var, -1.0);
                    segments.push(var);
                }
                add_objective(ctx, on, lin.cost_at_min);
            }
            ctx.model.add_constraint(
                column_name("output", &[id], t),
                ConstraintClass::Production,
                output,
                ConstraintSense::Equal,
                0.0,
            );

            let cols = &mut ctx.index.units[g];
            cols.power.push(power);
            cols.segments.push(segments);
        }
    }
}

fn add_objective(ctx: &mut BuildContext<'_>, decision: Decision, coef: f64) {
    match decision {
        Decision::Fixed(value) => ctx.model.add_objective_constant(coef * value),
        Decision::Var(var) => ctx.model.add_objective_term(var, coef),
    }
}
