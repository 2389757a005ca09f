//! Column bookkeeping for the unit commitment model.

use std::collections::BTreeMap;

use scuc_solver_common::{LinearExpr, VarId};

/// A model quantity that is either a column or a known constant.
///
/// Commitment states fixed by must-run flags, commitment statuses or the
/// initial carryover never become binaries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Decision {
    Fixed(f64),
    Var(VarId),
}

impl Decision {
    /// Add `coef · self` to `expr`.
    pub fn add_to(&self, expr: &mut LinearExpr, coef: f64) {
        match *self {
            Decision::Fixed(value) => expr.add_constant(coef * value),
            Decision::Var(var) => expr.add_term(var, coef),
        }
    }

    pub fn var(&self) -> Option<VarId> {
        match *self {
            Decision::Var(var) => Some(var),
            Decision::Fixed(_) => None,
        }
    }

    pub fn fixed(&self) -> Option<f64> {
        match *self {
            Decision::Fixed(value) => Some(value),
            Decision::Var(_) => None,
        }
    }

    pub fn is_fixed_to(&self, value: f64) -> bool {
        self.fixed() == Some(value)
    }

    /// Value under a full column assignment.
    pub fn value(&self, values: &[f64]) -> f64 {
        match *self {
            Decision::Fixed(value) => value,
            Decision::Var(var) => values.get(var.index()).copied().unwrap_or(0.0),
        }
    }
}

/// Columns of one generator, indexed by period.
#[derive(Debug, Clone, Default)]
pub struct UnitColumns {
    pub on: Vec<Decision>,
    pub startup: Vec<Decision>,
    pub shutdown: Vec<Decision>,
    pub power: Vec<VarId>,
    /// `segments[t][k]`: output on cost segment k
    pub segments: Vec<Vec<VarId>>,
    /// `startup_category[t][s]`; empty with fewer than two categories
    pub startup_category: Vec<Vec<VarId>>,
}

/// Every column the builder created, addressed by entity position and period.
#[derive(Debug, Clone, Default)]
pub struct VarIndex {
    /// One entry per generator in instance order
    pub units: Vec<UnitColumns>,
    /// `(reserve, generator)` → per-period contribution
    pub reserves: BTreeMap<(usize, usize), Vec<Option<VarId>>>,
    /// `[reserve][t]`
    pub shortfall: Vec<Vec<VarId>>,
    /// `[bus][t]`
    pub injection: Vec<Vec<VarId>>,
    /// `[bus][t]`; `None` without a power balance penalty or load
    pub curtailment: Vec<Vec<Option<VarId>>>,
    /// `[price-sensitive load][t]`
    pub served: Vec<Vec<VarId>>,
    /// `(line, t)`
    pub flow: BTreeMap<(usize, usize), VarId>,
    /// `(line, t)`
    pub overflow: BTreeMap<(usize, usize), VarId>,
}

impl VarIndex {
    /// Reserve columns of generator `g` in period `t`.
    pub fn unit_reserves(&self, g: usize, t: usize) -> Vec<(usize, VarId)> {
        self.reserves
            .iter()
            .filter(|((_, unit), _)| *unit == g)
            .filter_map(|(&(r, _), per_period)| per_period[t].map(|var| (r, var)))
            .collect()
    }
}

/// `prefix[key1,key2,...,t+1]`
pub(crate) fn column_name(prefix: &str, keys: &[&str], t: usize) -> String {
    let mut name = String::with_capacity(prefix.len() + 16);
    name.push_str(prefix);
    name.push('[');
    for key in keys {
        name.push_str(key);
        name.push(',');
    }
    name.push_str(&(t + 1).to_string());
    name.push(']');
    name
}
