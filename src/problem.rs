use std::fmt::{Debug, Display};
use std::rc::Rc;
use crate::core::{full_set, singleton_set, unpack_singleton, Error, GridIndex, Index, UVSet, Value};

/// Where a problem is in the solving process. Problems start out unsolved and
/// may be marked solved or infeasible exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
pub enum ProblemState {
    Unsolved,
    Solved,
    Infeasible,
}

impl ProblemState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ProblemState::Unsolved)
    }
}

/// Lines of the grid. A row line is indexed by its row, a column line by its
/// column; positions along a line count from the top-left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Axis {
    Row,
    Column,
}

impl Axis {
    pub fn index(&self, line: usize, pos: usize) -> Index {
        match self {
            Axis::Row => [line, pos],
            Axis::Column => [pos, line],
        }
    }

    /// Inverse of index(): (line, pos).
    pub fn split(&self, index: Index) -> (usize, usize) {
        match self {
            Axis::Row => (index[0], index[1]),
            Axis::Column => (index[1], index[0]),
        }
    }
}

/// The unit of solver state: a square grid of variables, each with its domain
/// of still-admissible values, plus the problem's state.
///
/// Domains live in a shared buffer. Cloning a Problem is cheap, and the first
/// narrowing performed on a clone copies the buffer, so sibling branches of
/// the search never observe each other's choices.
#[derive(Clone)]
pub struct Problem<V: Value> {
    size: usize,
    domains: Rc<Vec<UVSet<V>>>,
    state: ProblemState,
}

pub struct Indices {
    next: Index,
    size: usize,
}

impl Iterator for Indices {
    type Item = Index;
    fn next(&mut self) -> Option<Self::Item> {
        if !self.next.in_bounds(self.size, self.size) {
            return None;
        }
        let ret = self.next;
        self.next.increment(self.size, self.size);
        Some(ret)
    }
}

impl <V: Value> Problem<V> {
    /// A problem in which every variable can take any value.
    pub fn new(size: usize) -> Self {
        Self {
            size,
            domains: Rc::new(vec![full_set::<V>(); size * size]),
            state: ProblemState::Unsolved,
        }
    }

    /// Parses a grid with one row per line: '.' for a cell that could take
    /// any value, otherwise whatever V::parse accepts. Leading and trailing
    /// whitespace on each line, and trailing blank lines, are ignored.
    pub fn parse(s: &str) -> Result<Self, Error> {
        let mut lines: Vec<&str> = s.lines().map(str::trim).collect();
        while lines.last().is_some_and(|l| l.is_empty()) {
            lines.pop();
        }
        let size = lines.len();
        let mut problem = Self::new(size);
        for (r, line) in lines.iter().enumerate() {
            let len = line.chars().count();
            if len != size {
                return Err(Error::new(format!("Row {} has {} cells; expected {}", r, len, size)));
            }
            for (c, ch) in line.chars().enumerate() {
                if ch == '.' {
                    continue;
                }
                let v = V::parse(ch.to_string().as_str())?;
                problem.assign([r, c], v);
            }
        }
        Ok(problem)
    }

    pub fn serialize(&self) -> String {
        self.to_string()
    }

    pub fn size(&self) -> usize { self.size }

    pub fn state(&self) -> ProblemState { self.state }

    /// Moves an unsolved problem into the given state. Terminal states are
    /// never left again.
    pub fn mark(&mut self, state: ProblemState) {
        if self.state == ProblemState::Unsolved {
            self.state = state;
        }
    }

    fn offset(&self, index: Index) -> usize {
        index[0] * self.size + index[1]
    }

    pub fn domain(&self, index: Index) -> &UVSet<V> {
        &self.domains[self.offset(index)]
    }

    pub fn is_decided(&self, index: Index) -> bool {
        self.domain(index).len() == 1
    }

    pub fn decided(&self, index: Index) -> Option<V> {
        unpack_singleton(self.domain(index))
    }

    /// Intersects the domain at index with allowed. Returns whether the domain
    /// shrank.
    pub fn narrow(&mut self, index: Index, allowed: &UVSet<V>) -> bool {
        let offset = self.offset(index);
        let narrowed = self.domains[offset].intersection(allowed);
        if narrowed.len() == self.domains[offset].len() {
            return false;
        }
        Rc::make_mut(&mut self.domains)[offset] = narrowed;
        true
    }

    pub fn assign(&mut self, index: Index, value: V) -> bool {
        self.narrow(index, &singleton_set(value))
    }

    /// The branching step: a new problem in which the variable at index is
    /// fixed to value. This problem is left untouched.
    pub fn fix(&self, index: Index, value: V) -> Self {
        let mut branch = self.clone();
        branch.assign(index, value);
        branch
    }

    /// All indices in row-major order.
    pub fn indices(&self) -> Indices {
        Indices { next: [0, 0], size: self.size }
    }

    pub fn first_undecided(&self) -> Option<Index> {
        self.indices().find(|i| self.domain(*i).len() > 1)
    }

    pub fn first_empty_domain(&self) -> Option<Index> {
        self.indices().find(|i| self.domain(*i).is_empty())
    }

    pub fn all_decided(&self) -> bool {
        self.indices().all(|i| self.is_decided(i))
    }

    pub fn line_indices(&self, axis: Axis, line: usize) -> Vec<Index> {
        (0..self.size).map(|pos| axis.index(line, pos)).collect()
    }

    /// The decided values along a line (None where undecided).
    pub fn line(&self, axis: Axis, line: usize) -> Vec<Option<V>> {
        (0..self.size).map(|pos| self.decided(axis.index(line, pos))).collect()
    }
}

impl <V: Value> Display for Problem<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for r in 0..self.size {
            for c in 0..self.size {
                match self.decided([r, c]) {
                    Some(v) => write!(f, "{}", v)?,
                    None => write!(f, ".")?,
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

impl <V: Value> Debug for Problem<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}x{}\n{}", self.state, self.size, self.size, self)
    }
}
