use std::borrow::Cow;
use std::fmt::{Debug, Display};
use std::marker::PhantomData;
use bit_set::BitSet;

/// Error type. This is used to indicate something wrong with either the
/// puzzle input or with the way the solver components were put together.
/// Infeasible puzzles and exhausted searches are not errors.
#[derive(Debug, Clone, PartialEq)]
pub struct Error(Cow<'static, str>);
impl Error {
    pub const fn new_const(s: &'static str) -> Self {
        Error(Cow::Borrowed(s))
    }

    pub fn new<S: Into<String>>(s: S) -> Self {
        Error(Cow::Owned(s.into()))
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for Error {}

/// Puzzles are made up of a square grid of cells, each of which is a variable
/// whose domain is drawn from a finite set of possible values.
pub type Index = [usize; 2];

pub trait GridIndex {
    // Is the index still valid or has it gone off the end of the grid?
    fn in_bounds(&self, rows: usize, cols: usize) -> bool;
    // Increment the index (supposing a grid of given dimensions).
    fn increment(&mut self, rows: usize, cols: usize);
}

impl GridIndex for Index {
    fn in_bounds(&self, rows: usize, cols: usize) -> bool {
        self[0] < rows && self[1] < cols
    }

    fn increment(&mut self, _rows: usize, cols: usize) {
        self[1] += 1;
        if self[1] >= cols {
            self[1] = 0;
            self[0] += 1;
        }
    }
}

/// Values in puzzles are drawn from a small finite alphabet. Each value has an
/// ordinal in 0..cardinality(), and the ordinal order is the natural
/// enumeration order used when branching.
pub trait Value: Copy + Clone + Display + Debug + PartialEq + Eq {
    fn cardinality() -> usize;
    fn possibilities() -> Vec<Self>;
    fn nth(ord: usize) -> Option<Self>;
    fn parse(s: &str) -> Result<Self, Error>;

    fn ordinal(&self) -> usize;
}

/// This a set of values (e.g., the values still admissible for a cell). They
/// are represented as a bitset over the ordinals of the values.
#[derive(Clone)]
pub struct UVSet<V: Value> {
    s: BitSet,
    _marker: PhantomData<V>,
}

pub fn empty_set<V: Value>() -> UVSet<V> {
    UVSet {
        s: BitSet::with_capacity(V::cardinality()),
        _marker: PhantomData,
    }
}

pub fn full_set<V: Value>() -> UVSet<V> {
    let mut s = empty_set::<V>();
    for ord in 0..V::cardinality() {
        s.s.insert(ord);
    }
    s
}

pub fn pack_values<V: Value>(vals: &[V]) -> UVSet<V> {
    let mut res = empty_set::<V>();
    for v in vals {
        res.insert(*v);
    }
    res
}

pub fn singleton_set<V: Value>(v: V) -> UVSet<V> {
    let mut s = empty_set::<V>();
    s.insert(v);
    s
}

pub fn unpack_values<V: Value>(s: &UVSet<V>) -> Vec<V> {
    s.iter().collect::<Vec<_>>()
}

pub fn unpack_singleton<V: Value>(s: &UVSet<V>) -> Option<V> {
    if s.len() == 1 {
        s.iter().next()
    } else {
        None
    }
}

impl <V: Value> UVSet<V> {
    pub fn insert(&mut self, value: V) {
        self.s.insert(value.ordinal());
    }

    pub fn remove(&mut self, value: V) {
        self.s.remove(value.ordinal());
    }

    pub fn contains(&self, value: V) -> bool {
        self.s.contains(value.ordinal())
    }

    pub fn is_empty(&self) -> bool {
        self.s.is_empty()
    }

    pub fn len(&self) -> usize {
        self.s.len()
    }

    pub fn iter<'a>(&'a self) -> impl Iterator<Item = V> + 'a {
        self.s.iter().filter_map(V::nth)
    }

    pub fn intersect_with(&mut self, other: &UVSet<V>) {
        self.s.intersect_with(&other.s);
    }

    pub fn intersection(&self, other: &UVSet<V>) -> UVSet<V> {
        let mut i = self.clone();
        i.s.intersect_with(&other.s);
        i
    }

    pub fn is_subset(&self, other: &UVSet<V>) -> bool {
        self.s.is_subset(&other.s)
    }
}

impl <V: Value> PartialEq for UVSet<V> {
    fn eq(&self, other: &Self) -> bool {
        self.s.iter().eq(other.s.iter())
    }
}

impl <V: Value> Eq for UVSet<V> {}

impl <V: Value> Debug for UVSet<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{")?;
        for (i, v) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", v)?;
        }
        write!(f, "}}")
    }
}

#[cfg(any(test, feature = "test-util"))]
pub mod test_util {
    use super::*;

    /// Values for use in testing: the digits 1 through 3.
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    pub struct TestVal(pub u8);
    impl Display for TestVal {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{}", self.0)
        }
    }
    impl Value for TestVal {
        fn parse(s: &str) -> Result<Self, Error> {
            match s.parse::<u8>() {
                Ok(u) if (1..=3).contains(&u) => Ok(Self(u)),
                _ => Err(Error::new_const("not a valid TestVal")),
            }
        }
        fn cardinality() -> usize { 3 }
        fn possibilities() -> Vec<Self> { (1..=3).map(TestVal).collect() }
        fn nth(ord: usize) -> Option<TestVal> {
            if ord < 3 { Some(TestVal((ord as u8)+1)) } else { None }
        }
        fn ordinal(&self) -> usize { self.0 as usize - 1 }
    }
}
