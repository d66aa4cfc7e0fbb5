pub mod core;
pub mod problem;
pub mod constraint;
pub mod ranker;
pub mod solver;
pub mod debug;
pub mod ohhi;
