//! Bus balance, line flows and screened transmission limits.
//!
//! ```text
//! inj[b,t] = Σ power[g∈b,t] + curtail[b,t] - served[k∈b,t] - load[b,t]
//! Σ_b inj[b,t] = 0
//! flow[l,t] = Σ_b ISF[l,b]·inj[b,t]
//! -rev - overflow <= flow[l,t] + Σ_k D[l,k]·flow[m_k,t] <= fwd + overflow
//! ```
//!
//! Flow columns exist only for lines that appear in a kept limit row. Without
//! lines the system balance alone remains (copper plate).

use scuc_solver_common::{ConstraintClass, ConstraintSense, LinearExpr, VarId};

use super::index::column_name;
use super::BuildContext;
use crate::sensitivity::{ScreeningResult, SensitivityFactors, SecurityPair};

pub(crate) fn add_balance(ctx: &mut BuildContext<'_>) {
    let instance = ctx.instance;
    let periods = instance.time_horizon();
    let penalty = instance.power_balance_penalty();

    for load in instance.price_sensitive_loads() {
        let lid = load.id.as_str();
        let served: Vec<VarId> = (0..periods)
            .map(|t| {
                let var = ctx
                    .model
                    .add_continuous(column_name("served", &[lid], t), 0.0, load.demand[t]);
                ctx.model.add_objective_term(var, -load.revenue[t]);
                var
            })
            .collect();
        ctx.index.served.push(served);
    }

    for bus in instance.buses() {
        let bid = bus.id.as_str();
        let units: Vec<usize> = instance.generators_at_bus(&bus.id).collect();
        let flexible: Vec<usize> = instance
            .price_sensitive_loads()
            .iter()
            .enumerate()
            .filter(|(_, psl)| psl.bus == bus.id)
            .map(|(k, _)| k)
            .collect();

        let mut injections = Vec::with_capacity(periods);
        let mut curtailments = Vec::with_capacity(periods);
        for t in 0..periods {
            let curtail = match penalty {
                Some(price) if bus.load[t] > 0.0 => {
                    let var = ctx
                        .model
                        .add_continuous(column_name("curtail", &[bid], t), 0.0, bus.load[t]);
                    ctx.model.add_objective_term(var, price);
                    Some(var)
                }
                _ => None,
            };
            let injection = ctx.model.add_continuous(
                column_name("inj", &[bid], t),
                f64::NEG_INFINITY,
                f64::INFINITY,
            );

            let mut expr = LinearExpr::new().term(injection, 1.0);
            for &g in &units {
                expr.add_term(ctx.index.units[g].power[t], -1.0);
            }
            if let Some(var) = curtail {
                expr.add_term(var, -1.0);
            }
            for &k in &flexible {
                expr.add_term(ctx.index.served[k][t], 1.0);
            }
            ctx.model.add_constraint(
                column_name("inj_def", &[bid], t),
                ConstraintClass::PowerBalance,
                expr,
                ConstraintSense::Equal,
                -bus.load[t],
            );
            injections.push(injection);
            curtailments.push(curtail);
        }
        ctx.index.injection.push(injections);
        ctx.index.curtailment.push(curtailments);
    }

    for t in 0..periods {
        let mut expr = LinearExpr::new();
        for per_bus in &ctx.index.injection {
            expr.add_term(per_bus[t], 1.0);
        }
        ctx.model.add_constraint(
            column_name("balance", &[], t),
            ConstraintClass::PowerBalance,
            expr,
            ConstraintSense::Equal,
            0.0,
        );
    }
}

/// Flow definitions and the limit rows kept by screening.
///
/// `factors` must already be sparsified with the ISF cutoff.
pub(crate) fn add_transmission(
    ctx: &mut BuildContext<'_>,
    factors: &SensitivityFactors,
    screening: &ScreeningResult,
) {
    let instance = ctx.instance;
    for t in 0..instance.time_horizon() {
        for l in screening.flow_lines(t) {
            let line = &instance.lines()[l];
            let flow = ctx.model.add_continuous(
                column_name("flow", &[line.id.as_str()], t),
                f64::NEG_INFINITY,
                f64::INFINITY,
            );
            let mut expr = LinearExpr::new().term(flow, 1.0);
            for (b, &isf) in factors.isf.row(l).iter().enumerate() {
                if isf != 0.0 {
                    expr.add_term(ctx.index.injection[b][t], -isf);
                }
            }
            ctx.model.add_constraint(
                column_name("flow_def", &[line.id.as_str()], t),
                ConstraintClass::FlowDefinition,
                expr,
                ConstraintSense::Equal,
                0.0,
            );
            ctx.index.flow.insert((l, t), flow);
        }

        for pair in screening.pairs.iter().filter(|p| p.period == t) {
            add_limit_rows(ctx, pair);
        }
    }
}

fn add_limit_rows(ctx: &mut BuildContext<'_>, pair: &SecurityPair) {
    let instance = ctx.instance;
    let t = pair.period;
    let line = &instance.lines()[pair.monitored];
    let lid = line.id.as_str();

    let key = (pair.monitored, t);
    let overflow = match line.flow_penalty {
        Some(price) => Some(match ctx.index.overflow.get(&key) {
            Some(&var) => var,
            None => {
                let var = ctx
                    .model
                    .add_continuous(column_name("overflow", &[lid], t), 0.0, f64::INFINITY);
                ctx.model.add_objective_term(var, price);
                ctx.index.overflow.insert(key, var);
                var
            }
        }),
        None => None,
    };

    let mut expr = LinearExpr::new().term(ctx.index.flow[&key], 1.0);
    for &(m, factor) in &pair.outage_terms {
        expr.add_term(ctx.index.flow[&(m, t)], factor);
    }

    let (class, prefix, limit) = match pair.contingency {
        None => (ConstraintClass::FlowLimit, "flow_limit", &line.normal_limit),
        Some(_) => (ConstraintClass::ContingencyLimit, "ctg_limit", &line.emergency_limit),
    };
    let mut keys = Vec::with_capacity(2);
    if let Some(c) = pair.contingency {
        keys.push(instance.contingencies()[c].id.as_str());
    }
    keys.push(lid);

    if pair.forward {
        let mut row = expr.clone();
        if let Some(var) = overflow {
            row.add_term(var, -1.0);
        }
        ctx.model.add_constraint(
            column_name(&format!("{}_fwd", prefix), &keys, t),
            class,
            row,
            ConstraintSense::LessEqual,
            limit.forward[t],
        );
    }
    if pair.reverse {
        let mut row = expr;
        if let Some(var) = overflow {
            row.add_term(var, 1.0);
        }
        ctx.model.add_constraint(
            column_name(&format!("{}_rev", prefix), &keys, t),
            class,
            row,
            ConstraintSense::GreaterEqual,
            -limit.reverse[t],
        );
    }
}
