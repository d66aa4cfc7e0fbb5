use crate::core::{unpack_values, Index, Value};
use crate::problem::Problem;

/// The variable to branch on, along with the candidate values to try, in the
/// order they should be tried.
#[derive(Debug, Clone, PartialEq)]
pub struct BranchPoint<V: Value> {
    pub index: Index,
    pub values: Vec<V>,
}

impl <V: Value> BranchPoint<V> {
    pub fn for_cell(index: Index, values: Vec<V>) -> Self {
        Self { index, values }
    }

    pub fn len(&self) -> usize { self.values.len() }

    pub fn is_empty(&self) -> bool { self.values.is_empty() }
}

/// A ranker finds the "best" place in the grid to make a guess. Each call
/// returns a single variable, since the values of one variable already make a
/// mutually exclusive and exhaustive set of guesses.
pub trait Ranker<V: Value> {
    // Note: the ranker must not suggest already decided cells. None means
    // every cell is decided.
    fn select(&self, problem: &Problem<V>) -> Option<BranchPoint<V>>;
}

/// Picks the first undecided cell in row-major order and tries its values in
/// their natural order.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstUndecidedRanker;

impl <V: Value> Ranker<V> for FirstUndecidedRanker {
    fn select(&self, problem: &Problem<V>) -> Option<BranchPoint<V>> {
        problem.first_undecided().map(|index| {
            BranchPoint::for_cell(index, unpack_values(problem.domain(index)))
        })
    }
}

/// Picks the undecided cell with the fewest remaining values, breaking ties in
/// row-major order. Cells with empty domains are never selected.
#[derive(Debug, Clone, Copy, Default)]
pub struct FewestValuesRanker;

impl <V: Value> Ranker<V> for FewestValuesRanker {
    fn select(&self, problem: &Problem<V>) -> Option<BranchPoint<V>> {
        let mut top: Option<(Index, usize)> = None;
        for index in problem.indices() {
            let n = problem.domain(index).len();
            if n < 2 {
                continue;
            }
            match top {
                Some((_, best)) if best <= n => {},
                _ => top = Some((index, n)),
            }
        }
        top.map(|(index, _)| BranchPoint::for_cell(index, unpack_values(problem.domain(index))))
    }
}
