// config.rs - Cluster connection settings and credentials
//
// The head node, database and ODBC driver are fixed for the big data cluster
// test environment. Only the SQL login comes from the environment, and it is
// validated before anything touches the network.

use crate::error::{HarnessError, Result};
use std::fmt;

pub const ODBC_DRIVER: &str = "ODBC Driver 13 for SQL Server";
pub const HEAD_NODE: &str = "master-0.master-svc";
pub const DATABASE_NAME: &str = "tempdb";

pub const USER_VAR: &str = "EXTENSIBILITY_TEST_SQL_USER";
pub const PASSWORD_VAR: &str = "EXTENSIBILITY_TEST_SQL_PASSWORD";

pub const SPARK_SUBMIT_VAR: &str = "EXTENSIBILITY_TEST_SPARK_SUBMIT";
pub const HDFS_VAR: &str = "EXTENSIBILITY_TEST_HDFS";
pub const KUBECTL_VAR: &str = "EXTENSIBILITY_TEST_KUBECTL";

/// SQL login used for the whole test module.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub user: String,
    password: String,
}

impl Credentials {
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
        }
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    /// Read credentials from the process environment (and `.env`, if present).
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read credentials through an arbitrary lookup.
    ///
    /// Both variables must be set and non-empty. The user is checked first,
    /// so a run with neither set reports the user variable.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let user = required(&lookup, USER_VAR)?;
        let password = required(&lookup, PASSWORD_VAR)?;
        Ok(Self { user, password })
    }
}

// Keep the password out of logs and assertion output.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"***")
            .finish()
    }
}

fn required<F>(lookup: &F, name: &'static str) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(HarnessError::Config { name }),
    }
}

/// Where and how to connect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterConfig {
    pub driver: String,
    pub server: String,
    pub database: String,
    pub autocommit: bool,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            driver: ODBC_DRIVER.to_string(),
            server: HEAD_NODE.to_string(),
            database: DATABASE_NAME.to_string(),
            autocommit: true,
        }
    }
}

impl ClusterConfig {
    /// ODBC connection string for the given login.
    pub fn connection_string(&self, credentials: &Credentials) -> String {
        format!(
            "DRIVER={};SERVER={};DATABASE={};UID={};PWD={};",
            attribute(&self.driver, true),
            attribute(&self.server, false),
            attribute(&self.database, false),
            attribute(&credentials.user, false),
            attribute(credentials.password(), false),
        )
    }

    /// Same as [`connection_string`](Self::connection_string) with the
    /// password masked, for logging.
    pub fn redacted_connection_string(&self, credentials: &Credentials) -> String {
        let masked = Credentials::new(credentials.user.clone(), "***");
        self.connection_string(&masked)
    }
}

// ODBC attribute values containing separators must be wrapped in braces, with
// any closing brace doubled. The driver name is always braced.
fn attribute(value: &str, always_brace: bool) -> String {
    let needs_braces = always_brace
        || value.contains([';', '{', '}', '='])
        || value.starts_with(' ')
        || value.ends_with(' ');
    if needs_braces {
        format!("{{{}}}", value.replace('}', "}}"))
    } else {
        value.to_string()
    }
}

/// Executables used by the artifact staging steps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolPaths {
    pub spark_submit: String,
    pub hdfs: String,
    pub kubectl: String,
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            spark_submit: "spark-submit".to_string(),
            hdfs: "hdfs".to_string(),
            kubectl: "kubectl".to_string(),
        }
    }
}

impl ToolPaths {
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Defaults, with any non-empty override applied.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let pick = |name: &str, default: String| {
            lookup(name).filter(|v| !v.is_empty()).unwrap_or(default)
        };
        Self {
            spark_submit: pick(SPARK_SUBMIT_VAR, defaults.spark_submit),
            hdfs: pick(HDFS_VAR, defaults.hdfs),
            kubectl: pick(KUBECTL_VAR, defaults.kubectl),
        }
    }
}
