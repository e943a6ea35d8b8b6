// fixtures/tables/mod.rs
//
// Tables that scenarios create inside the cluster before scoring.
// Each test table is a struct that implements the TestTable trait.

pub mod census;

pub use census::{CensusRow, CensusTable};
