// spark.rs - Spark job submission
//
// Training jobs are black boxes: the only contract is that exit code 0 means
// the job wrote its artifact to the output path it was given.

use crate::error::Result;
use crate::process::{run_checked, CommandRunner};
use std::path::Path;

/// Launches a distributed job and waits for it.
pub trait JobLauncher {
    /// Run `script` with positional `args`. Any non-zero exit is an error.
    fn submit(&self, script: &Path, args: &[String]) -> Result<()>;
}

/// `spark-submit <script> <args...>` through a command runner.
pub struct SparkSubmit<R> {
    runner: R,
    program: String,
}

impl<R: CommandRunner> SparkSubmit<R> {
    pub fn new(runner: R, program: impl Into<String>) -> Self {
        Self {
            runner,
            program: program.into(),
        }
    }
}

impl<R: CommandRunner> JobLauncher for SparkSubmit<R> {
    fn submit(&self, script: &Path, args: &[String]) -> Result<()> {
        tracing::info!("Submitting Spark job {}", script.display());
        let mut argv = Vec::with_capacity(args.len() + 1);
        argv.push(script.display().to_string());
        argv.extend(args.iter().cloned());
        run_checked(&self.runner, &self.program, &argv)
    }
}
