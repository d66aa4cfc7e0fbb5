use std::collections::HashMap;
use std::fmt::Display;
use tracing::{debug, trace};
use crate::core::{Index, Value};
use crate::problem::{Problem, ProblemState};
use crate::solver::BranchObserver;

#[derive(PartialEq, Clone, Debug)]
pub struct DistStat {
    pub total: i32,
    pub count: i32,
    pub max: i32,
    pub max_count: i32,
    pub mean: f32,
    pub median: f32,
}

impl DistStat {
    pub fn from_histogram(hist: &HashMap<usize, usize>) -> Option<DistStat> {
        let mut val_counts = hist.iter().map(|(v, c)| (*v as i32, *c as i32)).collect::<Vec<_>>();
        val_counts.sort();
        let total = val_counts.iter().fold(0, |n, (v, c)| n + v*c);
        let count = val_counts.iter().fold(0, |n, (_, c)| n + c);
        if count == 0 {
            return None;
        }
        let max = val_counts.iter().fold(0, |n, (v, _)| std::cmp::max(*v, n));
        let max_count = val_counts.iter().fold(0, |n, (_, c)| std::cmp::max(*c, n));
        let mean = (total as f32)/(count as f32);
        let median_lo_index = (count - 1) / 2;
        let median_hi_index = count / 2;
        let mut median_lo = None;
        let mut median_hi = None;
        let mut n = 0;
        for (v, c) in val_counts {
            let next_n = n + c;
            if median_lo.is_none() && median_lo_index < next_n {
                median_lo = Some(v);
            }
            if median_hi.is_none() && median_hi_index < next_n {
                median_hi = Some(v);
            }
            n = next_n;
            if median_lo.is_some() && median_hi.is_some() {
                break;
            }
        }
        let median = (median_lo.unwrap_or(0) as f32 + median_hi.unwrap_or(0) as f32)/2.0;
        Some(DistStat { total, count, max, max_count, mean, median })
    }
}

/// Observer that does nothing.
pub struct NullObserver;
impl <V: Value> BranchObserver<V> for NullObserver {}

/// Emits every branching decision as a debug event, and the outcome of each
/// refinement as a trace event.
pub struct TracingObserver;
impl <V: Value> BranchObserver<V> for TracingObserver {
    fn on_branch(&mut self, depth: usize, index: Index, value: V, _problem: &Problem<V>) {
        debug!(depth, "choosing: {:?} {}", index, value);
    }

    fn after_refine(&mut self, depth: usize, cycles: usize, problem: &Problem<V>) {
        trace!(depth, cycles, state = %problem.state(), "refined");
    }
}

/// Counters describing the shape of a search. A leaf is a node whose
/// refinement left it solved or infeasible.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchStats {
    pub branches: usize,
    pub refinements: usize,
    pub solved_leaves: usize,
    pub infeasible_leaves: usize,
    pub max_depth: usize,
    pub propagation_cycles: usize,
    pub leaf_depths: HashMap<usize, usize>,
}

impl SearchStats {
    pub fn leaf_depth_stats(&self) -> Option<DistStat> {
        DistStat::from_histogram(&self.leaf_depths)
    }
}

impl Display for SearchStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Branches: {}", self.branches)?;
        writeln!(f, "Refinements: {}", self.refinements)?;
        writeln!(f, "Solved leaves: {}", self.solved_leaves)?;
        writeln!(f, "Infeasible leaves: {}", self.infeasible_leaves)?;
        writeln!(f, "Max depth: {}", self.max_depth)?;
        write!(f, "Propagation cycles: {}", self.propagation_cycles)?;
        if let Some(stats) = self.leaf_depth_stats() {
            write!(f, "\nLeaf depth: mean = {:.2}, med = {:.1}, max = {}", stats.mean, stats.median, stats.max)?;
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct StatsObserver {
    stats: SearchStats,
}

impl StatsObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> &SearchStats {
        &self.stats
    }
}

impl <V: Value> BranchObserver<V> for StatsObserver {
    fn on_branch(&mut self, depth: usize, _index: Index, _value: V, _problem: &Problem<V>) {
        self.stats.branches += 1;
        self.stats.max_depth = std::cmp::max(self.stats.max_depth, depth);
    }

    fn after_refine(&mut self, depth: usize, cycles: usize, problem: &Problem<V>) {
        self.stats.refinements += 1;
        self.stats.propagation_cycles += cycles;
        match problem.state() {
            ProblemState::Solved => self.stats.solved_leaves += 1,
            ProblemState::Infeasible => self.stats.infeasible_leaves += 1,
            ProblemState::Unsolved => return,
        }
        *self.stats.leaf_depths.entry(depth).or_default() += 1;
    }
}

/// Both observers see every event, the first one first.
impl <V: Value, A: BranchObserver<V>, B: BranchObserver<V>> BranchObserver<V> for (A, B) {
    fn on_branch(&mut self, depth: usize, index: Index, value: V, problem: &Problem<V>) {
        self.0.on_branch(depth, index, value, problem);
        self.1.on_branch(depth, index, value, problem);
    }

    fn after_refine(&mut self, depth: usize, cycles: usize, problem: &Problem<V>) {
        self.0.after_refine(depth, cycles, problem);
        self.1.after_refine(depth, cycles, problem);
    }
}
