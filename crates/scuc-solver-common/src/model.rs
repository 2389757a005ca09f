//! Solver-neutral mixed-integer linear model.
//!
//! A [`Model`] is a plain list of variables (bounds + domain), linear
//! constraints tagged with a [`ConstraintClass`], and a linear objective that
//! is always minimised. Any MILP backend can consume it; nothing here knows
//! about a particular solver binding.
//!
//! Rows and columns keep insertion order, so a builder that inserts in a
//! stable order produces identical models (and identical LP text) every time.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

/// Column handle into a [`Model`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VarId(usize);

impl VarId {
    #[inline]
    pub fn index(&self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VarDomain {
    Continuous,
    Binary,
    Integer,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    pub lower: f64,
    pub upper: f64,
    pub domain: VarDomain,
}

impl Variable {
    pub fn is_integral(&self) -> bool {
        !matches!(self.domain, VarDomain::Continuous)
    }
}

/// Sparse affine expression `Σ coef·var + constant`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinearExpr {
    terms: Vec<(VarId, f64)>,
    constant: f64,
}

impl LinearExpr {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn constant(value: f64) -> Self {
        Self {
            terms: Vec::new(),
            constant: value,
        }
    }

    /// Builder-style term.
    pub fn term(mut self, var: VarId, coef: f64) -> Self {
        self.add_term(var, coef);
        self
    }

    pub fn add_term(&mut self, var: VarId, coef: f64) {
        self.terms.push((var, coef));
    }

    pub fn add_constant(&mut self, value: f64) {
        self.constant += value;
    }

    /// Add `scale · other`.
    pub fn add_scaled(&mut self, other: &LinearExpr, scale: f64) {
        self.terms
            .extend(other.terms.iter().map(|&(var, coef)| (var, coef * scale)));
        self.constant += other.constant * scale;
    }

    pub fn terms(&self) -> &[(VarId, f64)] {
        &self.terms
    }

    pub fn constant_term(&self) -> f64 {
        self.constant
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Merge repeated variables (first occurrence keeps its position) and drop zeros.
    pub fn canonicalize(mut self) -> Self {
        let mut position: HashMap<VarId, usize> = HashMap::with_capacity(self.terms.len());
        let mut merged: Vec<(VarId, f64)> = Vec::with_capacity(self.terms.len());
        for (var, coef) in self.terms.drain(..) {
            match position.get(&var) {
                Some(&idx) => merged[idx].1 += coef,
                None => {
                    position.insert(var, merged.len());
                    merged.push((var, coef));
                }
            }
        }
        merged.retain(|&(_, coef)| coef != 0.0);
        self.terms = merged;
        self
    }

    /// Value of the expression for a full column assignment.
    pub fn evaluate(&self, values: &[f64]) -> f64 {
        self.terms
            .iter()
            .map(|&(var, coef)| coef * values.get(var.0).copied().unwrap_or(0.0))
            .sum::<f64>()
            + self.constant
    }
}

impl From<VarId> for LinearExpr {
    fn from(var: VarId) -> Self {
        LinearExpr::new().term(var, 1.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConstraintSense {
    #[serde(rename = "<=")]
    LessEqual,
    #[serde(rename = ">=")]
    GreaterEqual,
    #[serde(rename = "=")]
    Equal,
}

impl std::fmt::Display for ConstraintSense {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConstraintSense::LessEqual => write!(f, "<="),
            ConstraintSense::GreaterEqual => write!(f, ">="),
            ConstraintSense::Equal => write!(f, "="),
        }
    }
}

/// Family a constraint row belongs to, used for reporting slacks and duals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintClass {
    /// Output gating, segment widths and segment sums
    Production,
    /// Startup/shutdown linking with consecutive commitment states
    Commitment,
    MinUpDown,
    Ramping,
    /// Downtime-dependent startup category selection
    StartupCategory,
    Reserve,
    /// Bus net injection definitions and system balance
    PowerBalance,
    /// Base-case flow definitions
    FlowDefinition,
    FlowLimit,
    ContingencyLimit,
}

impl ConstraintClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConstraintClass::Production => "production",
            ConstraintClass::Commitment => "commitment",
            ConstraintClass::MinUpDown => "min_up_down",
            ConstraintClass::Ramping => "ramping",
            ConstraintClass::StartupCategory => "startup_category",
            ConstraintClass::Reserve => "reserve",
            ConstraintClass::PowerBalance => "power_balance",
            ConstraintClass::FlowDefinition => "flow_definition",
            ConstraintClass::FlowLimit => "flow_limit",
            ConstraintClass::ContingencyLimit => "contingency_limit",
        }
    }
}

impl std::fmt::Display for ConstraintClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Row `expr (sense) rhs`. `expr` carries no constant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constraint {
    pub name: String,
    pub class: ConstraintClass,
    pub expr: LinearExpr,
    pub sense: ConstraintSense,
    pub rhs: f64,
}

impl Constraint {
    /// Distance to violation: non-negative when satisfied, zero when binding.
    pub fn slack(&self, values: &[f64]) -> f64 {
        let lhs = self.expr.evaluate(values);
        match self.sense {
            ConstraintSense::LessEqual => self.rhs - lhs,
            ConstraintSense::GreaterEqual => lhs - self.rhs,
            ConstraintSense::Equal => -(lhs - self.rhs).abs(),
        }
    }
}

/// Size summary for logging and reports.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelStats {
    pub variables: usize,
    pub binaries: usize,
    pub constraints: usize,
    pub nonzeros: usize,
    pub constraints_by_class: BTreeMap<ConstraintClass, usize>,
}

/// Minimisation MILP.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Model {
    pub name: String,
    variables: Vec<Variable>,
    constraints: Vec<Constraint>,
    objective: LinearExpr,
    names: HashMap<String, VarId>,
}

impl Model {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Add a column. Names must be unique within the model.
    pub fn add_variable(
        &mut self,
        name: impl Into<String>,
        lower: f64,
        upper: f64,
        domain: VarDomain,
    ) -> VarId {
        let name = name.into();
        let id = VarId(self.variables.len());
        debug_assert!(!self.names.contains_key(&name), "duplicate variable {}", name);
        self.names.insert(name.clone(), id);
        let (lower, upper) = match domain {
            VarDomain::Binary => (lower.max(0.0), upper.min(1.0)),
            _ => (lower, upper),
        };
        self.variables.push(Variable {
            name,
            lower,
            upper,
            domain,
        });
        id
    }

    pub fn add_continuous(&mut self, name: impl Into<String>, lower: f64, upper: f64) -> VarId {
        self.add_variable(name, lower, upper, VarDomain::Continuous)
    }

    pub fn add_binary(&mut self, name: impl Into<String>) -> VarId {
        self.add_variable(name, 0.0, 1.0, VarDomain::Binary)
    }

    /// Add a row; the expression's constant moves to the right-hand side.
    pub fn add_constraint(
        &mut self,
        name: impl Into<String>,
        class: ConstraintClass,
        expr: LinearExpr,
        sense: ConstraintSense,
        rhs: f64,
    ) -> usize {
        let expr = expr.canonicalize();
        let rhs = rhs - expr.constant;
        let expr = LinearExpr {
            terms: expr.terms,
            constant: 0.0,
        };
        self.constraints.push(Constraint {
            name: name.into(),
            class,
            expr,
            sense,
            rhs,
        });
        self.constraints.len() - 1
    }

    pub fn add_objective_term(&mut self, var: VarId, coef: f64) {
        if coef != 0.0 {
            self.objective.add_term(var, coef);
        }
    }

    pub fn add_objective_constant(&mut self, value: f64) {
        self.objective.add_constant(value);
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn variable(&self, id: VarId) -> &Variable {
        &self.variables[id.0]
    }

    pub fn var_id(&self, name: &str) -> Option<VarId> {
        self.names.get(name).copied()
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn objective(&self) -> &LinearExpr {
        &self.objective
    }

    /// Objective with repeated columns merged, as handed to backends.
    pub fn canonical_objective(&self) -> LinearExpr {
        self.objective.clone().canonicalize()
    }

    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    pub fn num_binaries(&self) -> usize {
        self.variables
            .iter()
            .filter(|v| v.domain == VarDomain::Binary)
            .count()
    }

    pub fn constraints_of(&self, class: ConstraintClass) -> impl Iterator<Item = &Constraint> {
        self.constraints.iter().filter(move |c| c.class == class)
    }

    pub fn stats(&self) -> ModelStats {
        let mut by_class = BTreeMap::new();
        for row in &self.constraints {
            *by_class.entry(row.class).or_insert(0) += 1;
        }
        ModelStats {
            variables: self.variables.len(),
            binaries: self.num_binaries(),
            constraints: self.constraints.len(),
            nonzeros: self.constraints.iter().map(|c| c.expr.terms.len()).sum(),
            constraints_by_class: by_class,
        }
    }

    /// Column values in model order from a name-keyed assignment (missing → 0).
    pub fn column_values(&self, values: &BTreeMap<String, f64>) -> Vec<f64> {
        self.variables
            .iter()
            .map(|v| values.get(&v.name).copied().unwrap_or(0.0))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonicalize_merges_and_drops_zeros() {
        let mut model = Model::new("t");
        let x = model.add_continuous("x", 0.0, 1.0);
        let y = model.add_continuous("y", 0.0, 1.0);
        let expr = LinearExpr::new()
            .term(y, 2.0)
            .term(x, 1.0)
            .term(y, -2.0)
            .term(x, 0.5)
            .canonicalize();
        assert_eq!(expr.terms(), &[(x, 1.5)]);
    }

    #[test]
    fn constraint_constant_moves_to_rhs() {
        let mut model = Model::new("t");
        let x = model.add_continuous("x", 0.0, 10.0);
        let mut expr = LinearExpr::from(x);
        expr.add_constant(3.0);
        let row = model.add_constraint("c", ConstraintClass::Production, expr, ConstraintSense::LessEqual, 5.0);
        let c = &model.constraints()[row];
        assert_eq!(c.rhs, 2.0);
        assert_eq!(c.expr.constant_term(), 0.0);
        assert_eq!(c.slack(&[1.0]), 1.0);
        assert_eq!(c.slack(&[2.0]), 0.0);
    }

    #[test]
    fn binary_bounds_are_clamped() {
        let mut model = Model::new("t");
        let b = model.add_variable("b", -3.0, 7.0, VarDomain::Binary);
        assert_eq!(model.variable(b).lower, 0.0);
        assert_eq!(model.variable(b).upper, 1.0);
        assert_eq!(model.num_binaries(), 1);
    }

    #[test]
    fn stats_count_rows_per_class() {
        let mut model = Model::new("t");
        let x = model.add_continuous("x", 0.0, 10.0);
        let y = model.add_binary("y");
        model.add_constraint("a", ConstraintClass::Ramping, LinearExpr::from(x), ConstraintSense::LessEqual, 1.0);
        model.add_constraint(
            "b",
            ConstraintClass::Ramping,
            LinearExpr::new().term(x, 1.0).term(y, -10.0),
            ConstraintSense::LessEqual,
            0.0,
        );
        model.add_constraint("c", ConstraintClass::Reserve, LinearExpr::from(y), ConstraintSense::Equal, 1.0);
        let stats = model.stats();
        assert_eq!(stats.variables, 2);
        assert_eq!(stats.nonzeros, 4);
        assert_eq!(stats.constraints_by_class[&ConstraintClass::Ramping], 2);
        assert_eq!(stats.constraints_by_class[&ConstraintClass::Reserve], 1);
    }

    #[test]
    fn column_values_follow_model_order() {
        let mut model = Model::new("t");
        model.add_continuous("b", 0.0, 1.0);
        model.add_continuous("a", 0.0, 1.0);
        let values = BTreeMap::from([("a".to_string(), 0.25), ("b".to_string(), 0.75)]);
        assert_eq!(model.column_values(&values), vec![0.75, 0.25]);
    }
}
