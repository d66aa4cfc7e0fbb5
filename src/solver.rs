use tracing::debug;
use crate::core::{Index, Value};
use crate::constraint::{check_empty_domains, propagate_to_fixpoint, Evaluator, Propagator};
use crate::problem::{Problem, ProblemState};
use crate::ranker::Ranker;

// Mostly for debugging purposes, a BranchObserver allows the caller of the
// solver to dump or otherwise inspect the search as it happens. Depth counts
// the branching decisions taken to reach a problem; the root is at depth 0.
pub trait BranchObserver<V: Value> {
    // Called once a branch has been created, before it is refined.
    fn on_branch(&mut self, _depth: usize, _index: Index, _value: V, _problem: &Problem<V>) {}
    // Called after propagation and evaluation of every node of the search.
    fn after_refine(&mut self, _depth: usize, _cycles: usize, _problem: &Problem<V>) {}
}

/// Depth-first search with propagation. Each node of the search is refined
/// (propagated to a fixpoint, then evaluated); unresolved nodes branch on the
/// variable chosen by the ranker, trying its values in order.
pub struct DfsSolver<'a, V, P, E, R>
where V: Value, P: Propagator<V>, E: Evaluator<V>, R: Ranker<V> {
    propagator: &'a P,
    evaluator: &'a E,
    ranker: &'a R,
    observer: Option<&'a mut dyn BranchObserver<V>>,
}

impl <'a, V, P, E, R> DfsSolver<'a, V, P, E, R>
where V: Value, P: Propagator<V>, E: Evaluator<V>, R: Ranker<V> {
    pub fn new(
        propagator: &'a P,
        evaluator: &'a E,
        ranker: &'a R,
        observer: Option<&'a mut dyn BranchObserver<V>>,
    ) -> Self {
        DfsSolver { propagator, evaluator, ranker, observer }
    }

    fn refine(&mut self, problem: &mut Problem<V>, depth: usize) {
        let mut cycles = 0;
        if check_empty_domains(problem, false).is_none() {
            cycles = propagate_to_fixpoint(problem, self.propagator);
            self.evaluator.evaluate(problem, false);
        }
        if let Some(observer) = &mut self.observer {
            observer.after_refine(depth, cycles, problem);
        }
    }

    fn notify_branch(&mut self, depth: usize, index: Index, value: V, branch: &Problem<V>) {
        if let Some(observer) = &mut self.observer {
            observer.on_branch(depth, index, value, branch);
        }
    }

    /// Returns the first solved problem found, or else the last dead end that
    /// was explored (which is infeasible). A problem on which no constraint is
    /// violated but that cannot be branched on is returned as-is.
    pub fn solve(&mut self, problem: Problem<V>) -> Problem<V> {
        debug!(size = problem.size(), "starting search");
        let result = self.search(problem, 0);
        debug!(state = %result.state(), "search finished");
        result
    }

    fn search(&mut self, mut problem: Problem<V>, depth: usize) -> Problem<V> {
        self.refine(&mut problem, depth);
        if problem.state().is_terminal() {
            return problem;
        }
        let bp = match self.ranker.select(&problem) {
            Some(bp) => bp,
            None => return problem,
        };
        let mut last = None;
        for v in bp.values {
            let branch = problem.fix(bp.index, v);
            self.notify_branch(depth + 1, bp.index, v, &branch);
            let result = self.search(branch, depth + 1);
            if result.state() == ProblemState::Solved {
                return result;
            }
            last = Some(result);
        }
        match last {
            Some(result) => result,
            None => {
                problem.mark(ProblemState::Infeasible);
                problem
            }
        }
    }

    // Returns false once the limit has been reached.
    fn search_all(
        &mut self,
        mut problem: Problem<V>,
        depth: usize,
        limit: Option<usize>,
        solutions: &mut Vec<Problem<V>>,
    ) -> bool {
        self.refine(&mut problem, depth);
        match problem.state() {
            ProblemState::Solved => {
                solutions.push(problem);
                return !matches!(limit, Some(n) if solutions.len() >= n);
            },
            ProblemState::Infeasible => return true,
            ProblemState::Unsolved => {},
        }
        let Some(bp) = self.ranker.select(&problem) else {
            return true;
        };
        for v in bp.values {
            let branch = problem.fix(bp.index, v);
            self.notify_branch(depth + 1, bp.index, v, &branch);
            if !self.search_all(branch, depth + 1, limit, solutions) {
                return false;
            }
        }
        true
    }
}

/// Find all solutions to the puzzle using the given components, optionally
/// stopping early once a number of them have been found.
pub struct FindAllSolutions<'a, V, P, E, R>
where V: Value, P: Propagator<V>, E: Evaluator<V>, R: Ranker<V> {
    solver: DfsSolver<'a, V, P, E, R>,
    limit: Option<usize>,
}

impl <'a, V, P, E, R> FindAllSolutions<'a, V, P, E, R>
where V: Value, P: Propagator<V>, E: Evaluator<V>, R: Ranker<V> {
    pub fn new(
        propagator: &'a P,
        evaluator: &'a E,
        ranker: &'a R,
        observer: Option<&'a mut dyn BranchObserver<V>>,
    ) -> Self {
        FindAllSolutions {
            solver: DfsSolver::new(propagator, evaluator, ranker, observer),
            limit: None,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// The solutions in the order the search reaches them.
    pub fn solve_all(&mut self, problem: Problem<V>) -> Vec<Problem<V>> {
        debug!(size = problem.size(), limit = ?self.limit, "starting exhaustive search");
        let mut solutions = Vec::new();
        if self.limit != Some(0) {
            self.solver.search_all(problem, 0, self.limit, &mut solutions);
        }
        debug!(found = solutions.len(), "exhaustive search finished");
        solutions
    }

    pub fn count(&mut self, problem: Problem<V>) -> usize {
        self.solve_all(problem).len()
    }
}

/// Bundles the components needed to solve a family of puzzles.
pub trait PuzzleSetter {
    type Value: Value;
    type Propagator: Propagator<Self::Value>;
    type Evaluator: Evaluator<Self::Value>;
    type Ranker: Ranker<Self::Value>;

    fn setup() -> (Self::Propagator, Self::Evaluator, Self::Ranker);
}
