// lib.rs - Root module for the mleap_sql_tests library
//
// Integration checks for SQL Server big data cluster external script
// execution: the Java language extension and MLeap model scoring. The
// library holds the reusable pieces; `tests/` and `src/bin/` drive them
// against a live cluster.

pub mod config;
pub mod error;
/// Module fixture, scenario runner and reusable test tables
pub mod fixtures;
pub mod process;
pub mod row;
pub mod scenarios;
#[cfg(feature = "cluster-tests")]
pub mod session;
pub mod spark;
pub mod sql;

pub use error::{HarnessError, Result};
