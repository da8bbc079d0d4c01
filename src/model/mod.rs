//! Solver-agnostic mixed-integer linear model.
//!
//! Variables and expressions are `good_lp` ones. The formulation is assembled
//! here once per problem and handed, read-only, to a [`crate::solver::Solver`]
//! backend which translates it to its own API.

use ahash::HashMap;
use good_lp::{variable, Expression, IntoAffineExpression, ProblemVariables, Solution, Variable};

/// Domain of a variable.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum VarKind {
    Continuous,
    Binary,
}

/// Declaration of a single variable.
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq)]
pub struct VarDef {
    pub var: Variable,
    pub name: String,
    pub kind: VarKind,
    pub lower: f64,
    pub upper: Option<f64>,
}

/// Direction of a linear row.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Sense {
    Le,
    Ge,
    Eq,
}

/// The row `expr (sense) 0`. The constant of `expr` is the negated right-hand side.
#[derive(Clone, Debug, PartialEq)]
pub struct Comparison {
    pub expr: Expression,
    pub sense: Sense,
}

impl Comparison {
    /// Returns the nonzero linear terms of the row.
    pub fn terms(&self) -> impl Iterator<Item = (Variable, f64)> + '_ {
        (&self.expr)
            .linear_coefficients()
            .filter(|&(_, coefficient)| coefficient.abs() > 0.0)
    }

    /// Returns the right-hand side once every variable is moved to the left.
    #[must_use]
    pub fn rhs(&self) -> f64 {
        -self.expr.constant()
    }

    /// Returns the largest magnitude among the row's coefficients and right-hand side, at least 1.
    #[must_use]
    pub fn scale(&self) -> f64 {
        self.terms()
            .map(|(_, coefficient)| coefficient.abs())
            .fold(self.rhs().abs().max(1.0), f64::max)
    }

    /// Returns how far the assignment is from satisfying the row, 0 if it does.
    #[must_use]
    pub fn violation(&self, assignment: &Assignment) -> f64 {
        let value = self.expr.clone().eval_with(assignment);
        match self.sense {
            Sense::Le => value.max(0.0),
            Sense::Ge => (-value).max(0.0),
            Sense::Eq => value.abs(),
        }
    }
}

fn compare(lhs: impl Into<Expression>, sense: Sense, rhs: impl Into<Expression>) -> Comparison {
    let lhs: Expression = lhs.into();
    let rhs: Expression = rhs.into();
    let expr = lhs - rhs;
    Comparison { expr, sense }
}

/// Builds the row `lhs <= rhs`.
pub fn leq(lhs: impl Into<Expression>, rhs: impl Into<Expression>) -> Comparison {
    compare(lhs, Sense::Le, rhs)
}

/// Builds the row `lhs >= rhs`.
pub fn geq(lhs: impl Into<Expression>, rhs: impl Into<Expression>) -> Comparison {
    compare(lhs, Sense::Ge, rhs)
}

/// Builds the row `lhs == rhs`.
pub fn eq(lhs: impl Into<Expression>, rhs: impl Into<Expression>) -> Comparison {
    compare(lhs, Sense::Eq, rhs)
}

/// A named linear constraint.
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq)]
pub struct Constraint {
    pub name: String,
    pub comparison: Comparison,
}

/// A minimization model: variables, constraints and an objective expression.
#[derive(Default)]
pub struct Model {
    name: String,
    variables: ProblemVariables,
    vars: Vec<VarDef>,
    constraints: Vec<Constraint>,
    objective: Expression,
}

impl std::fmt::Debug for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Model")
            .field("name", &self.name)
            .field("vars", &self.vars.len())
            .field("constraints", &self.constraints.len())
            .finish_non_exhaustive()
    }
}

impl Model {
    /// Creates an empty model.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Adds a continuous variable bounded by `lower..=upper` (`None` means unbounded above).
    pub fn add_continuous(&mut self, name: String, lower: f64, upper: Option<f64>) -> Variable {
        let mut definition = variable().name(name.clone()).min(lower);
        if let Some(upper) = upper {
            definition = definition.max(upper);
        }
        let var = self.variables.add(definition);
        self.vars.push(VarDef {
            var,
            name,
            kind: VarKind::Continuous,
            lower,
            upper,
        });
        var
    }

    /// Adds a binary variable.
    pub fn add_binary(&mut self, name: String) -> Variable {
        let var = self.variables.add(variable().binary().name(name.clone()));
        self.vars.push(VarDef {
            var,
            name,
            kind: VarKind::Binary,
            lower: 0.0,
            upper: Some(1.0),
        });
        var
    }

    /// Adds a named constraint.
    pub fn add_constr(&mut self, name: String, comparison: Comparison) {
        self.constraints.push(Constraint { name, comparison });
    }

    /// Sets the expression to minimize.
    pub fn set_objective(&mut self, objective: Expression) {
        self.objective = objective;
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn vars(&self) -> &[VarDef] {
        &self.vars
    }

    /// Returns the declaration of a variable of this model.
    #[must_use]
    pub fn var(&self, var: Variable) -> Option<&VarDef> {
        self.vars.iter().find(|def| def.var == var)
    }

    #[must_use]
    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    #[must_use]
    pub const fn objective(&self) -> &Expression {
        &self.objective
    }

    /// Returns the number of binary variables.
    #[must_use]
    pub fn binary_count(&self) -> usize {
        self.vars.iter().filter(|v| v.kind == VarKind::Binary).count()
    }

    /// Returns the names of all bounds and constraints violated by the assignment.
    ///
    /// `tolerance` is relative: a bound may be missed by `tolerance·max(1, |bound|)`
    /// and a row by `tolerance` times its largest coefficient, so big-M rows get
    /// slack in proportion to their M while plain capacity rows stay tight.
    /// Binary variables must be within `tolerance` of 0 or 1.
    #[must_use]
    pub fn violations(&self, assignment: &Assignment, tolerance: f64) -> Vec<String> {
        let slack = |bound: f64| tolerance * bound.abs().max(1.0);
        let mut violated = Vec::new();

        for def in &self.vars {
            let value = assignment.value(def.var);
            let below = value < def.lower - slack(def.lower);
            let above = def.upper.is_some_and(|upper| value > upper + slack(upper));
            let integral = def.kind == VarKind::Continuous
                || (value - value.round()).abs() <= tolerance;
            if below || above || !integral {
                violated.push(def.name.clone());
            }
        }

        for constraint in &self.constraints {
            let comparison = &constraint.comparison;
            if comparison.violation(assignment) > tolerance * comparison.scale() {
                violated.push(constraint.name.clone());
            }
        }

        violated
    }
}

/// Values of the variables of a solved model. Variables without a value read as 0.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Assignment {
    values: HashMap<Variable, f64>,
}

impl Assignment {
    /// Returns the value of a variable.
    #[must_use]
    pub fn value(&self, var: Variable) -> f64 {
        self.values.get(&var).copied().unwrap_or_default()
    }

    /// Returns whether a binary variable is set.
    #[must_use]
    pub fn is_set(&self, var: Variable) -> bool {
        self.value(var) > 0.5
    }

    /// Overrides the value of a variable.
    pub fn set(&mut self, var: Variable, value: f64) {
        self.values.insert(var, value);
    }

    /// Evaluates an expression.
    #[must_use]
    pub fn evaluate(&self, expr: &Expression) -> f64 {
        expr.eval_with(self)
    }
}

impl FromIterator<(Variable, f64)> for Assignment {
    fn from_iter<T: IntoIterator<Item = (Variable, f64)>>(iter: T) -> Self {
        let values = iter.into_iter().collect();
        Self { values }
    }
}

impl Solution for Assignment {
    fn value(&self, variable: Variable) -> f64 {
        Self::value(self, variable)
    }
}
