use std::path::Path;
use std::str::FromStr;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use strum::{EnumCount, IntoEnumIterator};
use vec_box::vec_box;
use crate::constraint::{check_empty_domains, infeasible, ConstraintResult, Evaluator, MultiPropagator, Propagator};
use crate::core::{Error, Index, Value};
use crate::problem::{Axis, Problem, ProblemState};
use crate::ranker::FirstUndecidedRanker;
use crate::solver::{BranchObserver, DfsSolver, FindAllSolutions, PuzzleSetter};

/// The two colors of a 0h h1 grid. Reds are tried before blues when
/// branching.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive,
    strum_macros::Display, strum_macros::EnumString, strum_macros::EnumIter, strum_macros::EnumCount,
)]
#[repr(u8)]
pub enum Color {
    #[strum(to_string = "r")]
    Red = 0,
    #[strum(to_string = "b")]
    Blue = 1,
}

impl Color {
    pub fn other(&self) -> Self {
        match self {
            Color::Red => Color::Blue,
            Color::Blue => Color::Red,
        }
    }
}

impl Value for Color {
    fn cardinality() -> usize { Color::COUNT }
    fn possibilities() -> Vec<Self> { Color::iter().collect() }
    fn nth(ord: usize) -> Option<Self> {
        u8::try_from(ord).ok().and_then(|u| Color::try_from(u).ok())
    }
    fn parse(s: &str) -> Result<Self, Error> {
        Color::from_str(s).map_err(|_| Error::new(format!("Invalid cell character: '{}'", s)))
    }
    fn ordinal(&self) -> usize { u8::from(*self) as usize }
}

pub const EMPTY_GRID: Error = Error::new_const("Puzzle grid is empty");
pub const ODD_SIZE: Error = Error::new_const("Puzzle size must be even");

/// Parses a puzzle: one row per line, 'r' for red, 'b' for blue and '.' for
/// a cell that is still open.
pub fn parse(s: &str) -> Result<Problem<Color>, Error> {
    let problem = Problem::<Color>::parse(s)?;
    if problem.size() == 0 {
        return Err(EMPTY_GRID);
    } else if problem.size() % 2 != 0 {
        return Err(ODD_SIZE);
    }
    Ok(problem)
}

pub fn read_problem<P: AsRef<Path>>(path: P) -> Result<Problem<Color>, Error> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path)
        .map_err(|e| Error::new(format!("Failed to read {}: {}", path.display(), e)))?;
    parse(&contents)
}

// Pairs of neighbors that, if they share a color, force the cell they are
// relative to. Column windows first, then row windows.
const WINDOWS: [[(isize, isize); 2]; 6] = [
    [(1, 0), (2, 0)],
    [(-1, 0), (-2, 0)],
    [(1, 0), (-1, 0)],
    [(0, 1), (0, 2)],
    [(0, -1), (0, -2)],
    [(0, 1), (0, -1)],
];

fn neighbor(index: Index, delta: (isize, isize), size: usize) -> Option<Index> {
    let r = index[0].checked_add_signed(delta.0)?;
    let c = index[1].checked_add_signed(delta.1)?;
    if r < size && c < size { Some([r, c]) } else { None }
}

/// No more than two consecutive cells of a line may share a color: an open
/// cell next to (or between) two cells of the same color takes the other.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTriplePropagator;

impl Propagator<Color> for NoTriplePropagator {
    fn name(&self) -> &'static str { "NoTriplePropagator" }

    fn propagate(&self, problem: &mut Problem<Color>) -> bool {
        let size = problem.size();
        let mut changed = false;
        for window in &WINDOWS {
            for index in problem.indices() {
                if problem.is_decided(index) {
                    continue;
                }
                let (Some(a), Some(b)) = (neighbor(index, window[0], size), neighbor(index, window[1], size)) else {
                    continue;
                };
                match (problem.decided(a), problem.decided(b)) {
                    (Some(x), Some(y)) if x == y => {
                        changed |= problem.assign(index, x.other());
                    },
                    _ => {},
                }
            }
        }
        changed
    }
}

/// Each line holds as many reds as blues: once either color has its quota,
/// the rest of the line gets the other color. Rows are handled before columns.
#[derive(Debug, Clone, Copy, Default)]
pub struct BalancePropagator;

impl Propagator<Color> for BalancePropagator {
    fn name(&self) -> &'static str { "BalancePropagator" }

    fn propagate(&self, problem: &mut Problem<Color>) -> bool {
        let size = problem.size();
        let half = size / 2;
        let mut changed = false;
        for axis in [Axis::Row, Axis::Column] {
            for line in 0..size {
                let vals = problem.line(axis, line);
                let reds = count(&vals, Color::Red);
                let blues = count(&vals, Color::Blue);
                let fill = if reds == half && blues == half {
                    continue;
                } else if reds == half {
                    Color::Blue
                } else if blues == half {
                    Color::Red
                } else {
                    continue;
                };
                for index in problem.line_indices(axis, line) {
                    if !problem.is_decided(index) {
                        changed |= problem.assign(index, fill);
                    }
                }
            }
        }
        changed
    }
}

fn count(vals: &[Option<Color>], color: Color) -> usize {
    vals.iter().filter(|v| **v == Some(color)).count()
}

pub const TOO_MANY_REDS_ATTRIBUTION: &str = "TOO_MANY_REDS";
pub const TOO_MANY_BLUES_ATTRIBUTION: &str = "TOO_MANY_BLUES";
pub const THREE_IN_A_ROW_ATTRIBUTION: &str = "THREE_IN_A_ROW";
pub const DUPLICATE_LINES_ATTRIBUTION: &str = "DUPLICATE_LINES";

/// Checks a partially filled grid against all the rules of the puzzle. Lines
/// are visited column i then row i, for increasing i, and only the first
/// violation is reported. Two lines count as duplicates as soon as one color
/// is fully matched between them, since the rest of both lines is then
/// forced to the other color.
#[derive(Debug, Clone, Copy, Default)]
pub struct OhhiChecker;

impl OhhiChecker {
    fn check_line(&self, problem: &mut Problem<Color>, axis: Axis, i: usize, report: bool) -> ConstraintResult {
        let size = problem.size();
        let half = size / 2;
        let vals = problem.line(axis, i);
        let cells = problem.line_indices(axis, i);
        if count(&vals, Color::Red) > half {
            return infeasible(problem, report, TOO_MANY_REDS_ATTRIBUTION, move || {
                (format!("too many reds on {} {}", axis, i), cells)
            });
        }
        if count(&vals, Color::Blue) > half {
            return infeasible(problem, report, TOO_MANY_BLUES_ATTRIBUTION, move || {
                (format!("too many blues on {} {}", axis, i), cells)
            });
        }
        let triple = vals.windows(3).position(|w| w[0].is_some() && w[0] == w[1] && w[1] == w[2]);
        if let Some(start) = triple {
            return infeasible(problem, report, THREE_IN_A_ROW_ATTRIBUTION, move || {
                (format!("three in a row - {} {}", axis, i), cells[start..start + 3].to_vec())
            });
        }
        for j in (i + 1)..size {
            let other = problem.line(axis, j);
            let matched = |color| {
                vals.iter().zip(other.iter()).filter(|(a, b)| **a == Some(color) && **b == Some(color)).count()
            };
            if matched(Color::Red) >= half || matched(Color::Blue) >= half {
                let mut highlight = cells;
                highlight.extend(problem.line_indices(axis, j));
                return infeasible(problem, report, DUPLICATE_LINES_ATTRIBUTION, move || {
                    (format!("duplicate {}s {} {}", axis, i, j), highlight)
                });
            }
        }
        ConstraintResult::NoViolation
    }
}

impl Evaluator<Color> for OhhiChecker {
    fn evaluate(&self, problem: &mut Problem<Color>, report: bool) -> ConstraintResult {
        let empty = check_empty_domains(problem, report);
        if !empty.is_none() {
            return empty;
        }
        for i in 0..problem.size() {
            for axis in [Axis::Column, Axis::Row] {
                let result = self.check_line(problem, axis, i, report);
                if !result.is_none() {
                    return result;
                }
            }
        }
        if problem.all_decided() {
            problem.mark(ProblemState::Solved);
        }
        ConstraintResult::NoViolation
    }
}

pub struct OhhiSetter;

impl PuzzleSetter for OhhiSetter {
    type Value = Color;
    type Propagator = MultiPropagator<Color>;
    type Evaluator = OhhiChecker;
    type Ranker = FirstUndecidedRanker;

    fn setup() -> (Self::Propagator, Self::Evaluator, Self::Ranker) {
        (
            MultiPropagator::new(vec_box![NoTriplePropagator, BalancePropagator]),
            OhhiChecker,
            FirstUndecidedRanker,
        )
    }
}

// Grids built with Problem::new rather than parse() skip the size checks.
fn debug_check_size(problem: &Problem<Color>) {
    debug_assert!(problem.size() > 0 && problem.size() % 2 == 0, "0h h1 grids have a nonzero even size");
}

/// Solves the puzzle, returning the first solution in red-first order or the
/// last dead end reached. The grid must have a nonzero even size, as enforced
/// by [`parse`].
pub fn solve(problem: Problem<Color>) -> Problem<Color> {
    debug_check_size(&problem);
    let (propagator, evaluator, ranker) = OhhiSetter::setup();
    DfsSolver::new(&propagator, &evaluator, &ranker, None).solve(problem)
}

pub fn solve_with_observer(problem: Problem<Color>, observer: &mut dyn BranchObserver<Color>) -> Problem<Color> {
    debug_check_size(&problem);
    let (propagator, evaluator, ranker) = OhhiSetter::setup();
    DfsSolver::new(&propagator, &evaluator, &ranker, Some(observer)).solve(problem)
}

pub fn count_solutions(problem: Problem<Color>, limit: Option<usize>, observer: Option<&mut dyn BranchObserver<Color>>) -> usize {
    debug_check_size(&problem);
    let (propagator, evaluator, ranker) = OhhiSetter::setup();
    let observer = observer.map(|o| o as &mut dyn BranchObserver<Color>);
    let finder = FindAllSolutions::new(&propagator, &evaluator, &ranker, observer);
    let mut finder = match limit {
        Some(n) => finder.with_limit(n),
        None => finder,
    };
    finder.count(problem)
}

/// Describes the first rule the problem violates, if any.
pub fn report_violation(problem: &Problem<Color>) -> Option<String> {
    let mut p = problem.clone();
    OhhiChecker.evaluate(&mut p, true).message()
}

#[cfg(any(test, feature = "test-util"))]
pub mod test_util {
    use super::*;

    pub fn from_rows(rows: &[&str]) -> Problem<Color> {
        match parse(&rows.join("\n")) {
            Ok(p) => p,
            Err(e) => panic!("bad test grid {:?}: {}", rows, e),
        }
    }

    /// Every line of the given length that is balanced and has no triple, in
    /// red-first lexicographic order.
    pub fn valid_lines(size: usize) -> Vec<Vec<Color>> {
        (0..(1usize << size)).filter_map(|bits| {
            let line: Vec<Color> = (0..size)
                .map(|p| if (bits >> (size - 1 - p)) & 1 == 0 { Color::Red } else { Color::Blue })
                .collect();
            let reds = line.iter().filter(|c| **c == Color::Red).count();
            let triple = line.windows(3).any(|w| w[0] == w[1] && w[1] == w[2]);
            if reds * 2 == size && !triple { Some(line) } else { None }
        }).collect()
    }

    fn columns_ok(rows: &[&Vec<Color>], size: usize, complete: bool) -> bool {
        let half = size / 2;
        let cols: Vec<Vec<Color>> = (0..size).map(|c| rows.iter().map(|r| r[c]).collect()).collect();
        for col in &cols {
            let reds = col.iter().filter(|c| **c == Color::Red).count();
            if reds > half || col.len() - reds > half {
                return false;
            }
            if col.windows(3).any(|w| w[0] == w[1] && w[1] == w[2]) {
                return false;
            }
        }
        if complete {
            for a in 0..size {
                for b in (a + 1)..size {
                    if cols[a] == cols[b] {
                        return false;
                    }
                }
            }
        }
        true
    }

    fn extend(
        lines: &[Vec<Color>],
        size: usize,
        rows: &mut Vec<usize>,
        out: &mut Vec<Problem<Color>>,
    ) {
        let chosen: Vec<&Vec<Color>> = rows.iter().map(|r| &lines[*r]).collect();
        if !columns_ok(&chosen, size, rows.len() == size) {
            return;
        }
        if rows.len() == size {
            let mut p = Problem::new(size);
            for (r, line) in chosen.iter().enumerate() {
                for (c, color) in line.iter().enumerate() {
                    p.assign([r, c], *color);
                }
            }
            out.push(p);
            return;
        }
        for next in 0..lines.len() {
            if rows.contains(&next) {
                continue;
            }
            rows.push(next);
            extend(lines, size, rows, out);
            rows.pop();
        }
    }

    /// All complete, valid grids of the given size, found by brute force
    /// over rows rather than by the solver.
    pub fn valid_solutions(size: usize) -> Vec<Problem<Color>> {
        let lines = valid_lines(size);
        let mut out = Vec::new();
        extend(&lines, size, &mut Vec::new(), &mut out);
        out
    }

    /// Checks a grid against the rules from scratch.
    pub fn satisfies_rules(problem: &Problem<Color>) -> bool {
        let size = problem.size();
        if !problem.all_decided() {
            return false;
        }
        for axis in [Axis::Row, Axis::Column] {
            let lines: Vec<Vec<Option<Color>>> = (0..size).map(|i| problem.line(axis, i)).collect();
            for line in &lines {
                if count(line, Color::Red) * 2 != size {
                    return false;
                }
                if line.windows(3).any(|w| w[0] == w[1] && w[1] == w[2]) {
                    return false;
                }
            }
            for a in 0..size {
                for b in (a + 1)..size {
                    if lines[a] == lines[b] {
                        return false;
                    }
                }
            }
        }
        true
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use super::test_util::*;
    use crate::constraint::propagate_to_fixpoint;
    use crate::constraint::test_util::{assert_no_violation, assert_violation};
    use crate::core::{empty_set, unpack_singleton};
    use crate::constraint::EMPTY_DOMAIN_ATTRIBUTION;
    use crate::debug::StatsObserver;
    use crate::ranker::FewestValuesRanker;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha20Rng;

    const GOLDEN: &str = "r..b\n..r.\nb...\n...r\n";

    fn random_grid(rng: &mut ChaCha20Rng, size: usize) -> Problem<Color> {
        let mut p = Problem::new(size);
        for i in p.indices() {
            match rng.random_range(0..3) {
                0 => { p.assign(i, Color::Red); },
                1 => { p.assign(i, Color::Blue); },
                _ => {},
            }
        }
        p
    }

    // Keeps each cell of a solution with probability p.
    fn givens_from(rng: &mut ChaCha20Rng, solution: &Problem<Color>, p: f64) -> Problem<Color> {
        let mut givens = Problem::new(solution.size());
        for i in solution.indices() {
            if rng.random_bool(p) {
                if let Some(c) = solution.decided(i) {
                    givens.assign(i, c);
                }
            }
        }
        givens
    }

    #[test]
    fn test_color_value() {
        assert_eq!(Color::cardinality(), 2);
        assert_eq!(Color::possibilities(), vec![Color::Red, Color::Blue]);
        assert_eq!(Color::nth(0), Some(Color::Red));
        assert_eq!(Color::nth(1), Some(Color::Blue));
        assert_eq!(Color::nth(2), None);
        assert_eq!(Color::Blue.ordinal(), 1);
        assert_eq!(Color::Red.to_string(), "r");
        assert_eq!(Color::Red.other(), Color::Blue);
        assert_eq!(<Color as Value>::parse("b"), Ok(Color::Blue));
        assert_eq!(<Color as Value>::parse("x"), Err(Error::new("Invalid cell character: 'x'")));
    }

    #[test]
    fn test_parse_render() {
        let problem = parse(GOLDEN).unwrap();
        assert_eq!(problem.size(), 4);
        assert_eq!(problem.decided([0, 0]), Some(Color::Red));
        assert_eq!(problem.decided([0, 3]), Some(Color::Blue));
        assert_eq!(problem.decided([0, 1]), None);
        assert_eq!(problem.state(), ProblemState::Unsolved);
        assert_eq!(problem.to_string(), GOLDEN);
        assert_eq!(parse("  rb\nbr  \n\n").unwrap().serialize(), "rb\nbr\n");
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(parse("rb..\nrb.\n....\n....").unwrap_err(), Error::new("Row 1 has 3 cells; expected 4"));
        assert_eq!(parse("rx\n..").unwrap_err(), Error::new("Invalid cell character: 'x'"));
        assert_eq!(parse("").unwrap_err(), EMPTY_GRID);
        assert_eq!(parse("\n\n").unwrap_err(), EMPTY_GRID);
        assert_eq!(parse("r..\n...\n...").unwrap_err(), ODD_SIZE);
    }

    #[test]
    fn test_read_problem() {
        let path = std::env::temp_dir().join(format!("ohhi_dfs_read_{}.txt", std::process::id()));
        std::fs::write(&path, GOLDEN).unwrap();
        let problem = read_problem(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(problem.serialize(), GOLDEN);
        assert!(read_problem(&path).is_err());
    }

    #[test]
    fn test_no_triple_windows() {
        for (input, expected) in [
            ("rr..", "rrb."),
            (".rr.", "brrb"),
            ("r.r.", "rbr."),
            ("..rr", ".brr"),
            ("bb..", "bbr."),
        ] {
            let mut p = from_rows(&[input, "....", "....", "...."]);
            assert!(NoTriplePropagator.propagate(&mut p), "{}", input);
            assert_eq!(p.serialize().lines().next(), Some(expected), "{}", input);
        }
        let mut p = from_rows(&["r...", "r...", "....", "...."]);
        assert!(NoTriplePropagator.propagate(&mut p));
        assert_eq!(p.decided([2, 0]), Some(Color::Blue));
        let mut p = from_rows(&["b...", "....", "b...", "...."]);
        assert!(NoTriplePropagator.propagate(&mut p));
        assert_eq!(p.decided([1, 0]), Some(Color::Red));
        let mut p = from_rows(&["rb..", "....", "....", "...."]);
        assert!(!NoTriplePropagator.propagate(&mut p));
    }

    #[test]
    fn test_no_triple_sees_earlier_changes() {
        // The column window forces [2, 0], which completes a row window.
        let mut p = from_rows(&["r...", "r...", ".b..", "...."]);
        assert!(NoTriplePropagator.propagate(&mut p));
        assert_eq!(p.serialize(), "r...\nr...\nbbr.\n....\n");
        assert!(!NoTriplePropagator.propagate(&mut p));
    }

    #[test]
    fn test_balance() {
        let mut p = from_rows(&["rr..", "....", "....", "...."]);
        assert!(BalancePropagator.propagate(&mut p));
        assert_eq!(p.serialize(), "rrbb\n....\n....\n....\n");
        assert!(!BalancePropagator.propagate(&mut p));
        let mut p = from_rows(&["b...", "....", "b...", "...."]);
        assert!(BalancePropagator.propagate(&mut p));
        assert_eq!(p.serialize(), "b...\nr...\nb...\nr...\n");
        let mut p = from_rows(&["rb..", "....", "....", "...."]);
        assert!(!BalancePropagator.propagate(&mut p));
    }

    #[test]
    fn test_balance_rows_before_columns() {
        // Filling row 0 with blues gives column 3 its quota of blues.
        let mut p = from_rows(&["rr..", "...b", "....", "...."]);
        assert!(BalancePropagator.propagate(&mut p));
        assert_eq!(p.serialize(), "rrbb\n...b\n...r\n...r\n");
    }

    #[test]
    fn test_propagators_idempotent_and_monotonic() {
        let mut rng = ChaCha20Rng::seed_from_u64(0x0b0b);
        let (propagator, _, _) = OhhiSetter::setup();
        for trial in 0..200 {
            let size = if trial % 2 == 0 { 4 } else { 6 };
            let before = random_grid(&mut rng, size);
            let mut after = before.clone();
            propagate_to_fixpoint(&mut after, &propagator);
            for i in before.indices() {
                assert!(after.domain(i).is_subset(before.domain(i)), "{:?}", before);
                if let Some(c) = before.decided(i) {
                    assert_eq!(after.decided(i), Some(c));
                }
            }
            let mut again = after.clone();
            assert!(!NoTriplePropagator.propagate(&mut again));
            assert!(!BalancePropagator.propagate(&mut again));
            assert_eq!(again.serialize(), after.serialize());
        }
    }

    #[test]
    fn test_propagators_skip_empty_domains() {
        let mut p = from_rows(&["rr..", "....", "....", "...."]);
        p.narrow([0, 2], &empty_set());
        assert!(!NoTriplePropagator.propagate(&mut p));
        assert!(p.domain([0, 2]).is_empty());
    }

    #[test]
    fn test_valid_solutions_are_sound() {
        for size in [2, 4, 6] {
            for solution in valid_solutions(size) {
                assert!(satisfies_rules(&solution));
                assert_no_violation(&solution, &OhhiChecker, ProblemState::Solved);
            }
        }
        assert_eq!(valid_solutions(2).len(), 2);
        assert_eq!(valid_solutions(4).len(), 72);
        assert_eq!(valid_lines(6).len(), 14);
    }

    #[test]
    fn test_partial_grid_not_solved() {
        assert_no_violation(&parse(GOLDEN).unwrap(), &OhhiChecker, ProblemState::Unsolved);
        assert_no_violation(&Problem::new(4), &OhhiChecker, ProblemState::Unsolved);
    }

    #[test]
    fn test_checker_messages() {
        assert_violation(
            &from_rows(&["rrr.", "....", "....", "...."]),
            &OhhiChecker, TOO_MANY_REDS_ATTRIBUTION, "too many reds on row 0",
        );
        assert_violation(
            &from_rows(&["b...", "b...", "b...", "...."]),
            &OhhiChecker, TOO_MANY_BLUES_ATTRIBUTION, "too many blues on column 0",
        );
        assert_violation(
            &from_rows(&["rrrbbb", "......", "......", "......", "......", "......"]),
            &OhhiChecker, THREE_IN_A_ROW_ATTRIBUTION, "three in a row - row 0",
        );
        assert_violation(
            &from_rows(&["......", "b.....", "b.....", "b.....", "......", "......"]),
            &OhhiChecker, THREE_IN_A_ROW_ATTRIBUTION, "three in a row - column 0",
        );
        assert_violation(
            &from_rows(&[".rr.", ".rr.", "....", "...."]),
            &OhhiChecker, DUPLICATE_LINES_ATTRIBUTION, "duplicate rows 0 1",
        );
        assert_violation(
            &from_rows(&["rrbb", "....", "rr..", "...."]),
            &OhhiChecker, DUPLICATE_LINES_ATTRIBUTION, "duplicate columns 0 1",
        );
        let mut empty = Problem::new(4);
        empty.narrow([1, 2], &empty_set());
        assert_violation(&empty, &OhhiChecker, EMPTY_DOMAIN_ATTRIBUTION, "empty domain at [1, 2]");
    }

    #[test]
    fn test_checker_highlights() {
        let mut p = from_rows(&["rrrbbb", "......", "......", "......", "......", "......"]);
        match OhhiChecker.evaluate(&mut p, true) {
            ConstraintResult::Details(d) => {
                assert_eq!(d.len(), 1);
                assert_eq!(d[0].highlight, Some(vec![[0, 0], [0, 1], [0, 2]]));
            },
            other => panic!("expected details, got {:?}", other),
        }
    }

    #[test]
    fn test_checker_column_before_row() {
        // Row 0 has too many reds, but column 0 is checked first.
        let p = from_rows(&["rrr.", "r...", "r...", "...."]);
        assert_violation(&p, &OhhiChecker, TOO_MANY_REDS_ATTRIBUTION, "too many reds on column 0");
    }

    #[test]
    fn test_checker_rejects_complete_invalid_grids() {
        let mut rng = ChaCha20Rng::seed_from_u64(72);
        for _ in 0..200 {
            let mut p = Problem::new(4);
            for i in p.indices() {
                p.assign(i, if rng.random_bool(0.5) { Color::Red } else { Color::Blue });
            }
            let valid = satisfies_rules(&p);
            OhhiChecker.evaluate(&mut p, false);
            let expected = if valid { ProblemState::Solved } else { ProblemState::Infeasible };
            assert_eq!(p.state(), expected, "{}", p);
        }
    }

    #[test]
    fn test_golden() {
        let solved = solve(parse(GOLDEN).unwrap());
        assert_eq!(solved.state(), ProblemState::Solved);
        assert_eq!(solved.serialize(), "rrbb\nrbrb\nbrbr\nbbrr\n");
        assert!(satisfies_rules(&solved));
        assert_eq!(report_violation(&solved), None);
    }

    #[test]
    fn test_golden_is_not_unique() {
        assert_eq!(count_solutions(parse(GOLDEN).unwrap(), None, None), 5);
        assert_eq!(count_solutions(parse(GOLDEN).unwrap(), Some(2), None), 2);
    }

    #[test]
    fn test_infeasible() {
        let result = solve(from_rows(&["rrbb", "....", "rr..", "...."]));
        assert_eq!(result.state(), ProblemState::Infeasible);
        assert_eq!(result.serialize(), "rrbb\nbbrr\nrrbb\nbbrr\n");
        assert_eq!(report_violation(&result).as_deref(), Some("duplicate columns 0 1"));
    }

    #[test]
    fn test_infeasible_givens() {
        let result = solve(from_rows(&["rrr.", "....", "....", "...."]));
        assert_eq!(result.state(), ProblemState::Infeasible);
        assert_eq!(report_violation(&result).as_deref(), Some("too many reds on row 0"));
    }

    #[test]
    fn test_infeasible_after_branching() {
        let rows = [".b...r", ".b.rb.", ".rr...", ".....b", "r.b...", ".....r"];
        let mut observer = StatsObserver::new();
        let result = solve_with_observer(from_rows(&rows), &mut observer);
        assert_eq!(result.state(), ProblemState::Infeasible);
        assert_eq!(observer.stats().branches, 4);
        assert_eq!(observer.stats().max_depth, 2);
        assert_eq!(observer.stats().infeasible_leaves, 3);
        // The last candidate explored is the one returned.
        assert_eq!(result.serialize(), "bbr..r\nrbbrbr\nbrrbrb\n.....b\nr.b..b\n.....r\n");
        assert_eq!(report_violation(&result).as_deref(), Some("three in a row - column 5"));
        assert_eq!(count_solutions(from_rows(&rows), None, None), 0);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "nonzero even size")]
    fn test_solve_rejects_odd_size() {
        solve(Problem::<Color>::new(3));
    }

    #[test]
    fn test_solved_input() {
        let result = solve(from_rows(&["rrbb", "rbrb", "brbr", "bbrr"]));
        assert_eq!(result.state(), ProblemState::Solved);
        assert_eq!(result.serialize(), "rrbb\nrbrb\nbrbr\nbbrr\n");
    }

    #[test]
    fn test_empty_grids() {
        let solved = solve(Problem::new(4));
        assert_eq!(solved.state(), ProblemState::Solved);
        assert!(satisfies_rules(&solved));
        let solved = solve(Problem::new(6));
        assert_eq!(solved.state(), ProblemState::Solved);
        assert!(satisfies_rules(&solved));
    }

    #[test]
    fn test_count_empty_grids() {
        assert_eq!(count_solutions(Problem::new(2), None, None), 2);
        assert_eq!(count_solutions(Problem::new(4), None, None), 72);
        assert_eq!(count_solutions(Problem::new(6), None, None), 4140);
    }

    #[test]
    fn test_all_solutions_match_brute_force() {
        let (propagator, evaluator, ranker) = OhhiSetter::setup();
        let mut finder = FindAllSolutions::new(&propagator, &evaluator, &ranker, None);
        let mut found: Vec<String> = finder.solve_all(Problem::new(4)).iter().map(|p| p.serialize()).collect();
        let mut expected: Vec<String> = valid_solutions(4).iter().map(|p| p.serialize()).collect();
        found.sort();
        expected.sort();
        assert_eq!(found, expected);
    }

    #[test]
    fn test_fewest_values_ranker_finds_same_solutions() {
        let (propagator, evaluator, _) = OhhiSetter::setup();
        let ranker = FewestValuesRanker;
        let mut finder = FindAllSolutions::new(&propagator, &evaluator, &ranker, None);
        assert_eq!(finder.count(Problem::new(4)), 72);
        let mut solver = DfsSolver::new(&propagator, &evaluator, &ranker, None);
        let solved = solver.solve(parse(GOLDEN).unwrap());
        assert_eq!(solved.state(), ProblemState::Solved);
        assert!(satisfies_rules(&solved));
    }

    #[test]
    fn test_complete_4x4() {
        let mut rng = ChaCha20Rng::seed_from_u64(4);
        for solution in valid_solutions(4) {
            for p in [0.0, 0.3, 0.6, 1.0] {
                let givens = givens_from(&mut rng, &solution, p);
                let result = solve(givens.clone());
                assert_eq!(result.state(), ProblemState::Solved, "{}", givens);
                assert!(satisfies_rules(&result), "{}", result);
                for i in givens.indices() {
                    if let Some(c) = givens.decided(i) {
                        assert_eq!(result.decided(i), Some(c));
                    }
                }
            }
        }
    }

    #[test]
    fn test_complete_6x6_sample() {
        let mut rng = ChaCha20Rng::seed_from_u64(6);
        let solutions = valid_solutions(6);
        assert_eq!(solutions.len(), 4140);
        for _ in 0..60 {
            let solution = &solutions[rng.random_range(0..solutions.len())];
            let givens = givens_from(&mut rng, solution, 0.4);
            let result = solve(givens.clone());
            assert_eq!(result.state(), ProblemState::Solved, "{}", givens);
            assert!(satisfies_rules(&result), "{}", result);
            for i in givens.indices() {
                if let Some(c) = givens.decided(i) {
                    assert_eq!(unpack_singleton(result.domain(i)), Some(c));
                }
            }
        }
    }

    #[test]
    fn test_puzzle_files() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("puzzles");
        for (file, state, expected) in [
            ("golden-4x4.txt", ProblemState::Solved, "rrbb\nrbrb\nbrbr\nbbrr\n"),
            ("infeasible-4x4.txt", ProblemState::Infeasible, "rrbb\nbbrr\nrrbb\nbbrr\n"),
            ("unique-6x6.txt", ProblemState::Solved, "rrbbrb\nrrbrbb\nbbrrbr\nrbrbrb\nbrbrbr\nbbrbrr\n"),
            (
                "unique-8x8.txt",
                ProblemState::Solved,
                "rrbrbrbb\nrrbrbbrb\nbbrbrrbr\nrbrrbrbb\nbrbbrbrr\nrbrbrrbb\nbrbrbbrr\nbbrbrbrr\n",
            ),
        ] {
            let problem = read_problem(dir.join(file)).unwrap();
            let result = solve(problem.clone());
            assert_eq!(result.state(), state, "{}", file);
            assert_eq!(result.serialize(), expected, "{}", file);
            if file.starts_with("unique") {
                assert_eq!(count_solutions(problem, None, None), 1, "{}", file);
            }
        }
    }

    #[test]
    fn test_deterministic() {
        for input in [GOLDEN, "rrbb\n....\nrr..\n....\n", "......\n......\n......\n......\n......\n......\n"] {
            let a = solve(parse(input).unwrap());
            let b = solve(parse(input).unwrap());
            assert_eq!(a.state(), b.state());
            assert_eq!(a.serialize(), b.serialize());
        }
    }
}
