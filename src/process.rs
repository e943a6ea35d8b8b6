// process.rs - External command execution
//
// Commands run to completion on the calling thread with their output
// captured. Only the exit status decides success; whatever the tool printed
// is logged at debug level and otherwise ignored.

use crate::error::{HarnessError, Result};
use std::process::{Command, Stdio};

/// What a finished command left behind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// `None` when the process was killed by a signal.
    pub code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Seam between the harness and the operating system.
pub trait CommandRunner {
    fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput>;
}

/// Runs commands with `std::process::Command`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput> {
        tracing::debug!("Running: {}", command_line(program, args));

        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .map_err(|source| HarnessError::ProcessSpawn {
                program: program.to_string(),
                source,
            })?;

        if !output.stdout.is_empty() {
            tracing::debug!("{} stdout:\n{}", program, String::from_utf8_lossy(&output.stdout));
        }
        if !output.stderr.is_empty() {
            tracing::debug!("{} stderr:\n{}", program, String::from_utf8_lossy(&output.stderr));
        }

        Ok(CommandOutput {
            code: output.status.code(),
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }
}

pub fn command_line(program: &str, args: &[String]) -> String {
    std::iter::once(program)
        .chain(args.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Run a command and require exit status 0.
pub fn run_checked<R>(runner: &R, program: &str, args: &[String]) -> Result<()>
where
    R: CommandRunner + ?Sized,
{
    let output = runner.run(program, args)?;
    if output.success() {
        tracing::info!("✓ {}", command_line(program, args));
        Ok(())
    } else {
        Err(HarnessError::ProcessFailed {
            command: command_line(program, args),
            code: output.code,
        })
    }
}

/// Join a directory and a file name with exactly one `/` between them.
pub fn join_path(dir: &str, name: &str) -> String {
    format!("{}/{}", dir.trim_end_matches('/'), name.trim_start_matches('/'))
}

/// `hdfs dfs -get -f <path>`: copy an HDFS file into the working directory,
/// overwriting any local copy.
pub fn hdfs_get<R>(runner: &R, hdfs: &str, hdfs_path: &str) -> Result<()>
where
    R: CommandRunner + ?Sized,
{
    let args = ["dfs", "-get", "-f", hdfs_path].map(String::from);
    run_checked(runner, hdfs, &args)
}

/// Where a file lands inside a pod.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodTarget {
    pub pod: String,
    pub dir: String,
    pub container: String,
}

impl PodTarget {
    /// `pod:dir`, as `kubectl cp` expects it.
    pub fn spec(&self) -> String {
        format!("{}:{}", self.pod, self.dir)
    }
}

/// `kubectl cp <local> <pod>:<dir> -c <container>`.
pub fn kubectl_cp<R>(runner: &R, kubectl: &str, local: &str, target: &PodTarget) -> Result<()>
where
    R: CommandRunner + ?Sized,
{
    let args = [
        "cp".to_string(),
        local.to_string(),
        target.spec(),
        "-c".to_string(),
        target.container.clone(),
    ];
    run_checked(runner, kubectl, &args)
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::cell::RefCell;
    use std::collections::VecDeque;

    /// Records every call and replays scripted exit codes (default 0).
    #[derive(Default)]
    pub struct FakeRunner {
        pub calls: RefCell<Vec<String>>,
        pub codes: RefCell<VecDeque<Option<i32>>>,
    }

    impl FakeRunner {
        pub fn with_codes(codes: &[Option<i32>]) -> Self {
            Self {
                calls: RefCell::default(),
                codes: RefCell::new(codes.iter().copied().collect()),
            }
        }
    }

    impl CommandRunner for FakeRunner {
        fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput> {
            self.calls.borrow_mut().push(command_line(program, args));
            let code = self.codes.borrow_mut().pop_front().unwrap_or(Some(0));
            Ok(CommandOutput {
                code,
                stdout: b"all good".to_vec(),
                stderr: Vec::new(),
            })
        }
    }
}
