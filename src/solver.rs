//! Provides a solver-agnostic representation of a (mixed-integer) linear program and a solver
//! backed by HiGHS.
//!
//! The allocation model is assembled as a [`Problem`] and handed to anything implementing
//! [`Solver`], so the model-building code does not depend on a particular solver library.
use highs::{HighsModelStatus, RowProblem, Sense};
use log::debug;
use std::ops::{Bound, RangeBounds};
use std::time::Duration;

/// A decision variable in a [`Problem`].
///
/// This does **not** hold the value of the variable; it refers to a column of the problem.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Variable(usize);

impl Variable {
    /// The column index of the variable
    pub fn index(self) -> usize {
        self.0
    }
}

/// Whether a variable may take any value or only integer values
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VariableKind {
    /// A real-valued variable
    Continuous,
    /// An integer-valued variable
    Integer,
}

/// The definition of a variable to be optimised.
///
/// The coefficient is the multiplying factor for the variable in the objective function, i.e. the
/// Cs in:
///
/// f = c1*x1 + c2*x2 + ...
///
/// with x1, x2... taking values between min and max.
#[derive(Clone, Debug, PartialEq)]
pub struct VariableDefinition {
    /// The variable's minimum value
    pub min: f64,
    /// The variable's maximum value
    pub max: f64,
    /// The coefficient of the variable in the objective
    pub coefficient: f64,
    /// Whether the variable is integral
    pub kind: VariableKind,
}

/// A constraint for an optimisation.
///
/// Each constraint adds an inequality to the problem of the form:
///
/// min <= a1*x1 + a2*x2 + ... <= max
///
/// Often, constraints will impose only a min or a max value, with the other set to infinity or
/// minus infinity. Only variables with a non-zero coefficient are listed.
#[derive(Clone, Debug, PartialEq)]
pub struct Constraint {
    /// The minimum value for the constraint
    pub min: f64,
    /// The maximum value for the constraint
    pub max: f64,
    /// The variables in the constraint with their coefficients
    pub terms: Vec<(Variable, f64)>,
}

/// A minimisation problem
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Problem {
    variables: Vec<VariableDefinition>,
    constraints: Vec<Constraint>,
    time_limit: Option<Duration>,
}

/// Convert range bounds into a (min, max) pair, with infinities for open ends
fn bounds_to_limits<B: RangeBounds<f64>>(bounds: &B) -> (f64, f64) {
    let min = match bounds.start_bound() {
        Bound::Included(&x) | Bound::Excluded(&x) => x,
        Bound::Unbounded => f64::NEG_INFINITY,
    };
    let max = match bounds.end_bound() {
        Bound::Included(&x) | Bound::Excluded(&x) => x,
        Bound::Unbounded => f64::INFINITY,
    };

    (min, max)
}

impl Problem {
    /// Add a continuous variable with the given objective coefficient and bounds
    pub fn add_column<B: RangeBounds<f64>>(&mut self, coefficient: f64, bounds: B) -> Variable {
        self.add_variable(coefficient, &bounds, VariableKind::Continuous)
    }

    /// Add an integer variable with the given objective coefficient and bounds
    pub fn add_integer_column<B: RangeBounds<f64>>(
        &mut self,
        coefficient: f64,
        bounds: B,
    ) -> Variable {
        self.add_variable(coefficient, &bounds, VariableKind::Integer)
    }

    fn add_variable<B: RangeBounds<f64>>(
        &mut self,
        coefficient: f64,
        bounds: &B,
        kind: VariableKind,
    ) -> Variable {
        let (min, max) = bounds_to_limits(bounds);
        self.variables.push(VariableDefinition {
            min,
            max,
            coefficient,
            kind,
        });

        Variable(self.variables.len() - 1)
    }

    /// Add a constraint row
    pub fn add_row<B, I>(&mut self, bounds: B, terms: I)
    where
        B: RangeBounds<f64>,
        I: IntoIterator<Item = (Variable, f64)>,
    {
        let (min, max) = bounds_to_limits(&bounds);
        let terms: Vec<_> = terms.into_iter().collect();
        assert!(
            terms.iter().all(|(var, _)| var.0 < self.variables.len()),
            "Constraint refers to unknown variable"
        );

        self.constraints.push(Constraint { min, max, terms });
    }

    /// Set a time limit for solving the problem
    pub fn set_time_limit(&mut self, time_limit: Option<Duration>) {
        self.time_limit = time_limit;
    }

    /// The time limit for solving the problem, if any
    pub fn time_limit(&self) -> Option<Duration> {
        self.time_limit
    }

    /// The variables of the problem, in column order
    pub fn variables(&self) -> &[VariableDefinition] {
        &self.variables
    }

    /// The constraints of the problem, in row order
    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// The number of variables
    pub fn num_cols(&self) -> usize {
        self.variables.len()
    }

    /// The number of constraints
    pub fn num_rows(&self) -> usize {
        self.constraints.len()
    }

    /// Evaluate the objective function for the given variable values
    pub fn objective_value(&self, values: &[f64]) -> f64 {
        self.variables
            .iter()
            .zip(values)
            .map(|(def, value)| def.coefficient * value)
            .sum()
    }
}

/// The result of attempting to solve a [`Problem`]
#[derive(Clone, Debug, PartialEq)]
pub enum SolverOutcome {
    /// An optimal solution was found, with a value for every variable in column order
    Optimal(Vec<f64>),
    /// No assignment satisfies the constraints
    Infeasible,
    /// The objective can be decreased without limit
    Unbounded,
    /// The time limit was reached before optimality was proven
    TimedOut,
    /// The solver could not reach a conclusion for another reason
    Failed(String),
}

/// Something which can solve minimisation problems
pub trait Solver {
    /// Solve the problem, blocking until a conclusion is reached or the time limit expires
    fn solve(&self, problem: &Problem) -> SolverOutcome;
}

/// A [`Solver`] which uses the HiGHS library
#[derive(Clone, Debug, Default)]
pub struct HighsSolver {
    /// Whether to let HiGHS write its own output to the console
    pub verbose: bool,
}

impl HighsSolver {
    /// Create a new [`HighsSolver`]
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl Solver for HighsSolver {
    fn solve(&self, problem: &Problem) -> SolverOutcome {
        let mut pb = RowProblem::default();

        // Add variables
        let mut cols = Vec::with_capacity(problem.num_cols());
        for def in problem.variables() {
            let col = match def.kind {
                VariableKind::Continuous => pb.add_column(def.coefficient, def.min..=def.max),
                VariableKind::Integer => pb.add_integer_column(def.coefficient, def.min..=def.max),
            };
            cols.push(col);
        }

        // Add constraints
        for constraint in problem.constraints() {
            let terms = constraint
                .terms
                .iter()
                .map(|(var, coeff)| (cols[var.index()], *coeff));
            pb.add_row(constraint.min..=constraint.max, terms);
        }

        let mut model = pb.optimise(Sense::Minimise);
        model.set_option("output_flag", self.verbose);
        if let Some(time_limit) = problem.time_limit() {
            model.set_option("time_limit", time_limit.as_secs_f64());
        }

        debug!(
            "Solving problem with {} variables and {} constraints",
            problem.num_cols(),
            problem.num_rows()
        );
        let solved = match model.try_solve() {
            Ok(solved) => solved,
            Err(status) => return SolverOutcome::Failed(format!("HiGHS error: {status:?}")),
        };
        match solved.status() {
            HighsModelStatus::Optimal => {
                SolverOutcome::Optimal(solved.get_solution().columns().to_vec())
            }
            status => outcome_from_status(status),
        }
    }
}

/// Map a HiGHS model status other than [`HighsModelStatus::Optimal`] to an outcome
fn outcome_from_status(status: HighsModelStatus) -> SolverOutcome {
    match status {
        // The problem is trivially solved by an empty assignment
        HighsModelStatus::ModelEmpty => SolverOutcome::Optimal(Vec::new()),
        HighsModelStatus::Infeasible => SolverOutcome::Infeasible,
        HighsModelStatus::Unbounded => SolverOutcome::Unbounded,
        // Our problems are bounded below, so if HiGHS can't tell which it is, it's infeasible
        HighsModelStatus::UnboundedOrInfeasible => SolverOutcome::Infeasible,
        HighsModelStatus::ReachedTimeLimit => SolverOutcome::TimedOut,
        status => SolverOutcome::Failed(format!("{status:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    #[rstest]
    #[case(HighsModelStatus::ModelEmpty, SolverOutcome::Optimal(Vec::new()))]
    #[case(HighsModelStatus::Infeasible, SolverOutcome::Infeasible)]
    #[case(HighsModelStatus::UnboundedOrInfeasible, SolverOutcome::Infeasible)]
    #[case(HighsModelStatus::Unbounded, SolverOutcome::Unbounded)]
    #[case(HighsModelStatus::ReachedTimeLimit, SolverOutcome::TimedOut)]
    #[case(
        HighsModelStatus::ReachedIterationLimit,
        SolverOutcome::Failed("ReachedIterationLimit".into())
    )]
    fn test_outcome_from_status(
        #[case] status: HighsModelStatus,
        #[case] expected: SolverOutcome,
    ) {
        assert_eq!(outcome_from_status(status), expected);
    }

    #[test]
    fn test_bounds_to_limits() {
        assert_eq!(bounds_to_limits(&(0.0..)), (0.0, f64::INFINITY));
        assert_eq!(bounds_to_limits(&(..=5.0)), (f64::NEG_INFINITY, 5.0));
        assert_eq!(bounds_to_limits(&(1.0..=2.0)), (1.0, 2.0));
    }

    #[test]
    fn test_problem_building() {
        let mut problem = Problem::default();
        let x = problem.add_integer_column(0.0, 0.0..);
        let y = problem.add_column(2.0, 0.0..);
        problem.add_row(10.0.., [(x, 1.0), (y, 1.0)]);

        assert_eq!(problem.num_cols(), 2);
        assert_eq!(problem.num_rows(), 1);
        assert_eq!(problem.variables()[0].kind, VariableKind::Integer);
        assert_eq!(problem.constraints()[0].terms, [(x, 1.0), (y, 1.0)]);
        assert_approx_eq!(f64, problem.objective_value(&[3.0, 7.0]), 14.0);
    }

    #[test]
    #[should_panic(expected = "Constraint refers to unknown variable")]
    fn test_add_row_unknown_variable() {
        let mut problem = Problem::default();
        problem.add_row(..=1.0, [(Variable(3), 1.0)]);
    }

    #[test]
    fn test_highs_solve_integer() {
        // Minimise shortage below a demand of 7.5 with at most 10 units to give
        let mut problem = Problem::default();
        let alloc = problem.add_integer_column(0.0, 0.0..);
        let unmet = problem.add_column(1.0, 0.0..);
        problem.add_row(..=10.0, [(alloc, 1.0)]);
        problem.add_row(7.5.., [(unmet, 1.0), (alloc, 1.0)]);
        problem.add_row(..=7.2, [(alloc, 1.0)]);

        let SolverOutcome::Optimal(values) = HighsSolver::default().solve(&problem) else {
            panic!("Expected optimal solution");
        };
        assert_approx_eq!(f64, values[alloc.index()], 7.0, epsilon = 1e-6);
        assert_approx_eq!(f64, values[unmet.index()], 0.5, epsilon = 1e-6);
    }

    #[test]
    fn test_highs_solve_infeasible() {
        let mut problem = Problem::default();
        let x = problem.add_integer_column(1.0, 0.0..);
        problem.add_row(..=5.0, [(x, 1.0)]);
        problem.add_row(6.0.., [(x, 1.0)]);

        assert_eq!(HighsSolver::default().solve(&problem), SolverOutcome::Infeasible);
    }
}
