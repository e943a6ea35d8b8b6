// scenarios/mod.rs - The end-to-end checks run against the cluster
//
// - java_passthrough: register the Java runtime and echo `SELECT 1` back
// - mleap: train, stage and score the census pipeline against golden rows

pub mod java_passthrough;
pub mod mleap;

pub use java_passthrough::JavaPassthrough;
pub use mleap::{ModelArtifact, MleapScoring, ScoredIncome};
