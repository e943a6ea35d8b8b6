// error.rs - Failure taxonomy for the cluster harness
//
// Every failure here is fatal for the scenario that hit it. Nothing is retried:
// the checks validate exact, deterministic cluster behavior, so a deviation is
// reported as-is with enough context to attribute it.

use thiserror::Error;

pub type Result<T, E = HarnessError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum HarnessError {
    /// A required environment variable is missing or empty.
    #[error("configuration error: environment variable {name} is missing or empty")]
    Config { name: &'static str },

    /// An administrative statement reported a row count other than the sentinel.
    #[error("unexpected row count for `{statement}`: expected {expected}, got {actual}")]
    UnexpectedRowCount {
        statement: String,
        expected: i64,
        actual: i64,
    },

    /// The executable could not be started at all.
    #[error("failed to spawn `{program}`: {source}")]
    ProcessSpawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The process ran but did not exit with status 0.
    #[error("`{command}` exited with {}", describe_code(.code))]
    ProcessFailed { command: String, code: Option<i32> },

    /// Fetched rows differ from the golden expectation.
    #[error("result mismatch in {context}:\nexpected: {expected}\nactual:   {actual}")]
    ResultMismatch {
        context: String,
        expected: String,
        actual: String,
    },

    /// A script template was given a value it refuses to render.
    #[error("invalid script template: {0}")]
    InvalidTemplate(String),

    #[cfg(feature = "cluster-tests")]
    #[error("database error: {0}")]
    Database(#[from] odbc_api::Error),
}

fn describe_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "no exit code (terminated by signal)".to_string(),
    }
}

impl HarnessError {
    /// Builds a mismatch error, rendering both sides as pretty JSON.
    pub fn mismatch<E, A>(context: impl Into<String>, expected: &E, actual: &A) -> Self
    where
        E: serde::Serialize + std::fmt::Debug + ?Sized,
        A: serde::Serialize + std::fmt::Debug + ?Sized,
    {
        HarnessError::ResultMismatch {
            context: context.into(),
            expected: serde_json::to_string_pretty(expected)
                .unwrap_or_else(|_| format!("{:?}", expected)),
            actual: serde_json::to_string_pretty(actual).unwrap_or_else(|_| format!("{:?}", actual)),
        }
    }
}
