use std::fmt::Debug;
use crate::core::{Index, Value};
use crate::problem::{Problem, ProblemState};

/// Potential violation of a constraint. The optimized approach to use in the
/// solver is to stop at the first violation found without building any
/// detailed information. For debugging or UI purposes, evaluators may instead
/// be asked to report the violation along with the cells that caused it.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstraintResult {
    Simple(&'static str),
    Details(Vec<ConstraintViolationDetail>),
    NoViolation,
}

impl ConstraintResult {
    pub fn is_none(&self) -> bool {
        matches!(self, ConstraintResult::NoViolation)
    }

    /// The attribution of the first violation, if any.
    pub fn attribution(&self) -> Option<&'static str> {
        match self {
            ConstraintResult::Simple(a) => Some(*a),
            ConstraintResult::Details(d) => d.first().map(|d| d.attribution),
            ConstraintResult::NoViolation => None,
        }
    }

    /// A human-readable description of the first violation, if any.
    pub fn message(&self) -> Option<String> {
        match self {
            ConstraintResult::Simple(a) => Some(a.to_string()),
            ConstraintResult::Details(d) => d.first().map(|d| d.message.clone()),
            ConstraintResult::NoViolation => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintViolationDetail {
    pub attribution: &'static str,
    pub message: String,
    pub highlight: Option<Vec<Index>>,
}

pub const EMPTY_DOMAIN_ATTRIBUTION: &str = "EMPTY_DOMAIN";

/// Marks the problem infeasible and builds the result for a violation. The
/// message is only rendered when a report was requested.
pub fn infeasible<V: Value, F: FnOnce() -> (String, Vec<Index>)>(
    problem: &mut Problem<V>,
    report: bool,
    attribution: &'static str,
    describe: F,
) -> ConstraintResult {
    problem.mark(ProblemState::Infeasible);
    if !report {
        return ConstraintResult::Simple(attribution);
    }
    let (message, highlight) = describe();
    ConstraintResult::Details(vec![ConstraintViolationDetail {
        attribution,
        message,
        highlight: Some(highlight),
    }])
}

/// A cell whose domain has been emptied can never be satisfied.
pub fn check_empty_domains<V: Value>(problem: &mut Problem<V>, report: bool) -> ConstraintResult {
    match problem.first_empty_domain() {
        Some(index) => infeasible(problem, report, EMPTY_DOMAIN_ATTRIBUTION, || {
            (format!("empty domain at {:?}", index), vec![index])
        }),
        None => ConstraintResult::NoViolation,
    }
}

/// Local inference rule. Propagators remove values from the domains of cells
/// that are not yet decided, and report whether they changed anything.
pub trait Propagator<V: Value>: Debug {
    fn name(&self) -> &'static str;
    fn propagate(&self, problem: &mut Problem<V>) -> bool;
}

/// Global check of a (possibly partial) assignment. Evaluators must mark the
/// problem infeasible if they find a violation, and solved if the problem is
/// complete and consistent; the returned result only describes what was found.
pub trait Evaluator<V: Value>: Debug {
    fn evaluate(&self, problem: &mut Problem<V>, report: bool) -> ConstraintResult;
}

/// Runs several propagators as a unit. One call to propagate() runs every
/// member once, in order, regardless of whether earlier members changed
/// anything.
#[derive(Debug)]
pub struct MultiPropagator<V: Value> {
    propagators: Vec<Box<dyn Propagator<V>>>,
}

impl <V: Value> MultiPropagator<V> {
    pub fn new(propagators: Vec<Box<dyn Propagator<V>>>) -> Self {
        Self { propagators }
    }
}

impl <V: Value> Propagator<V> for MultiPropagator<V> {
    fn name(&self) -> &'static str { "MultiPropagator" }

    fn propagate(&self, problem: &mut Problem<V>) -> bool {
        let mut changed = false;
        for p in &self.propagators {
            changed |= p.propagate(problem);
        }
        changed
    }
}

/// Repeats the propagator until it stops narrowing anything. Returns the
/// number of cycles run, including the final one that changed nothing.
pub fn propagate_to_fixpoint<V: Value>(problem: &mut Problem<V>, propagator: &dyn Propagator<V>) -> usize {
    let mut cycles = 1;
    while propagator.propagate(problem) {
        cycles += 1;
    }
    cycles
}

#[cfg(any(test, feature = "test-util"))]
pub mod test_util {
    use super::*;

    pub fn assert_violation<V: Value>(
        problem: &Problem<V>,
        evaluator: &dyn Evaluator<V>,
        attribution: &'static str,
        message: &str,
    ) {
        let mut quiet = problem.clone();
        assert_eq!(evaluator.evaluate(&mut quiet, false), ConstraintResult::Simple(attribution));
        assert_eq!(quiet.state(), ProblemState::Infeasible);
        let mut reported = problem.clone();
        let result = evaluator.evaluate(&mut reported, true);
        assert_eq!(result.attribution(), Some(attribution));
        assert_eq!(result.message().as_deref(), Some(message));
        assert_eq!(reported.state(), ProblemState::Infeasible);
    }

    pub fn assert_no_violation<V: Value>(
        problem: &Problem<V>,
        evaluator: &dyn Evaluator<V>,
        expected_state: ProblemState,
    ) {
        let mut p = problem.clone();
        assert_eq!(evaluator.evaluate(&mut p, true), ConstraintResult::NoViolation);
        assert_eq!(p.state(), expected_state);
    }
}
