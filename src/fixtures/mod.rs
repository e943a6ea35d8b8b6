// fixtures/mod.rs - Module-scoped test fixture
//
// What is the module fixture?
// Every scenario in a test module shares one database session. The fixture
// opens it once, switches on external script execution, hands it to each
// scenario in turn and releases it when it goes out of scope.
//
// Setup order matters:
//   1. credentials are read and validated (no network yet)
//   2. the session is opened
//   3. `sp_configure` + `RECONFIGURE` enable external scripts
// If any step fails the fixture is never built and no scenario runs.

pub mod tables;

use crate::config::{ClusterConfig, Credentials};
use crate::error::{HarnessError, Result};
use crate::row::ResultSet;
use crate::sql::Script;
use serde::Serialize;
use std::time::Instant;

/// Row count reported by statements that don't produce one.
pub const NO_ROW_COUNT: i64 = -1;

pub const ENABLE_EXTERNAL_SCRIPTS: &str = "EXEC sp_configure 'external scripts enabled', 1";
pub const RECONFIGURE: &str = "RECONFIGURE";

/// A reusable table that tests can (re)create on demand.
pub trait TestTable {
    /// The statements that drop, create and populate this table, in order.
    fn setup_sql() -> Result<Script>;
}

/// What the harness needs from a database session.
pub trait SqlExecutor {
    /// Execute a statement and return its row count, or [`NO_ROW_COUNT`].
    fn execute(&mut self, sql: &str) -> Result<i64>;

    /// Execute a batch and fetch every row of its first result set.
    fn query(&mut self, sql: &str) -> Result<ResultSet>;
}

/// Execute `sql` and require that it reports no row count.
pub fn expect_no_row_count<S>(session: &mut S, sql: &str) -> Result<()>
where
    S: SqlExecutor + ?Sized,
{
    let actual = session.execute(sql)?;
    if actual != NO_ROW_COUNT {
        return Err(HarnessError::UnexpectedRowCount {
            statement: sql.to_string(),
            expected: NO_ROW_COUNT,
            actual,
        });
    }
    Ok(())
}

/// Turn on external script execution (SPEES) for the instance.
pub fn enable_external_scripts<S>(session: &mut S) -> Result<()>
where
    S: SqlExecutor + ?Sized,
{
    expect_no_row_count(session, ENABLE_EXTERNAL_SCRIPTS)?;
    expect_no_row_count(session, RECONFIGURE)?;
    tracing::info!("External script execution enabled");
    Ok(())
}

/// One shared session for the lifetime of a test module.
pub struct ModuleFixture<S: SqlExecutor> {
    session: S,
}

impl<S: SqlExecutor> ModuleFixture<S> {
    /// Build the fixture from explicit environment lookups.
    ///
    /// `connect` is only called once both credentials are present.
    pub fn setup<L, F>(config: &ClusterConfig, lookup: L, connect: F) -> Result<Self>
    where
        L: Fn(&str) -> Option<String>,
        F: FnOnce(&ClusterConfig, &Credentials) -> Result<S>,
    {
        tracing::info!("setting up module ...");
        let credentials = Credentials::from_lookup(lookup)?;

        tracing::info!(
            "Connecting with {}",
            config.redacted_connection_string(&credentials)
        );
        let mut session = connect(config, &credentials)?;
        enable_external_scripts(&mut session)?;

        Ok(Self { session })
    }

    /// Same as [`setup`](Self::setup), reading the process environment.
    pub fn from_env<F>(config: &ClusterConfig, connect: F) -> Result<Self>
    where
        F: FnOnce(&ClusterConfig, &Credentials) -> Result<S>,
    {
        dotenv::dotenv().ok();
        Self::setup(config, |name| std::env::var(name).ok(), connect)
    }

    pub fn session(&mut self) -> &mut S {
        &mut self.session
    }
}

impl<S: SqlExecutor> Drop for ModuleFixture<S> {
    fn drop(&mut self) {
        tracing::info!("tearing down module ...");
    }
}

/// Run `body` with a fixture that is released on every exit path.
pub fn with_module_fixture<S, L, F, B, T>(
    config: &ClusterConfig,
    lookup: L,
    connect: F,
    body: B,
) -> Result<T>
where
    S: SqlExecutor,
    L: Fn(&str) -> Option<String>,
    F: FnOnce(&ClusterConfig, &Credentials) -> Result<S>,
    B: FnOnce(&mut ModuleFixture<S>) -> Result<T>,
{
    let mut fixture = ModuleFixture::setup(config, lookup, connect)?;
    body(&mut fixture)
}

/// A named check run against the shared session.
pub trait Scenario {
    fn name(&self) -> &str;
    fn run(&self, session: &mut dyn SqlExecutor) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioOutcome {
    pub name: String,
    pub passed: bool,
    pub error: Option<String>,
    pub elapsed_ms: u128,
}

/// Outcome of every scenario in a module run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ModuleReport {
    pub outcomes: Vec<ScenarioOutcome>,
}

impl ModuleReport {
    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(|o| o.passed)
    }

    pub fn failures(&self) -> impl Iterator<Item = &ScenarioOutcome> {
        self.outcomes.iter().filter(|o| !o.passed)
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

/// Run scenarios one after another against the fixture's session.
///
/// A failing scenario is recorded and the next one still runs; each starts
/// by re-provisioning whatever it needs.
pub fn run_module<S: SqlExecutor>(
    fixture: &mut ModuleFixture<S>,
    scenarios: &[&dyn Scenario],
) -> ModuleReport {
    let mut report = ModuleReport::default();

    for (idx, scenario) in scenarios.iter().enumerate() {
        tracing::info!("[{}/{}] {}", idx + 1, scenarios.len(), scenario.name());
        let started = Instant::now();
        let result = scenario.run(fixture.session());
        let elapsed_ms = started.elapsed().as_millis();

        let outcome = match result {
            Ok(()) => {
                tracing::info!("✓ {} ({} ms)", scenario.name(), elapsed_ms);
                ScenarioOutcome {
                    name: scenario.name().to_string(),
                    passed: true,
                    error: None,
                    elapsed_ms,
                }
            }
            Err(e) => {
                tracing::error!("✗ {}: {}", scenario.name(), e);
                ScenarioOutcome {
                    name: scenario.name().to_string(),
                    passed: false,
                    error: Some(e.to_string()),
                    elapsed_ms,
                }
            }
        };
        report.outcomes.push(outcome);
    }

    report
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::VecDeque;

    /// In-memory session: records SQL, replays scripted responses.
    #[derive(Default)]
    pub struct FakeSession {
        pub executed: Vec<String>,
        pub row_counts: VecDeque<i64>,
        pub results: VecDeque<Result<ResultSet>>,
    }

    impl SqlExecutor for FakeSession {
        fn execute(&mut self, sql: &str) -> Result<i64> {
            self.executed.push(sql.to_string());
            Ok(self.row_counts.pop_front().unwrap_or(NO_ROW_COUNT))
        }

        fn query(&mut self, sql: &str) -> Result<ResultSet> {
            self.executed.push(sql.to_string());
            self.results
                .pop_front()
                .unwrap_or_else(|| Ok(ResultSet::default()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::FakeSession;
    use super::*;
    use crate::config::{PASSWORD_VAR, USER_VAR};
    use std::cell::Cell;

    fn creds(name: &str) -> Option<String> {
        match name {
            USER_VAR => Some("sa".to_string()),
            PASSWORD_VAR => Some("secret".to_string()),
            _ => None,
        }
    }

    #[test]
    fn test_setup_enables_external_scripts() {
        let mut fixture = ModuleFixture::setup(&ClusterConfig::default(), creds, |_, c| {
            assert_eq!(c.user, "sa");
            Ok(FakeSession::default())
        })
        .unwrap();

        assert_eq!(
            fixture.session().executed,
            vec![ENABLE_EXTERNAL_SCRIPTS.to_string(), RECONFIGURE.to_string()]
        );
    }

    #[test]
    fn test_missing_credentials_never_connect() {
        let connected = Cell::new(false);
        let result = ModuleFixture::setup(
            &ClusterConfig::default(),
            |name| (name == USER_VAR).then(|| "sa".to_string()),
            |_, _| {
                connected.set(true);
                Ok(FakeSession::default())
            },
        );

        assert!(matches!(result, Err(HarnessError::Config { name }) if name == PASSWORD_VAR));
        assert!(!connected.get());
    }

    #[test]
    fn test_unexpected_row_count_aborts_setup() {
        let result = ModuleFixture::setup(&ClusterConfig::default(), creds, |_, _| {
            let mut session = FakeSession::default();
            session.row_counts.extend([NO_ROW_COUNT, 0]);
            Ok(session)
        });

        match result {
            Err(HarnessError::UnexpectedRowCount { statement, expected, actual }) => {
                assert_eq!(statement, RECONFIGURE);
                assert_eq!(expected, -1);
                assert_eq!(actual, 0);
            }
            Err(e) => panic!("unexpected error: {e}"),
            Ok(_) => panic!("setup should fail"),
        }
    }

    #[test]
    fn test_bad_sp_configure_count_skips_reconfigure() {
        let mut session = FakeSession::default();
        session.row_counts.push_back(1);

        let err = enable_external_scripts(&mut session).unwrap_err();
        assert!(matches!(
            err,
            HarnessError::UnexpectedRowCount { ref statement, actual: 1, .. }
                if statement == ENABLE_EXTERNAL_SCRIPTS
        ));
        assert_eq!(session.executed, vec![ENABLE_EXTERNAL_SCRIPTS.to_string()]);
    }

    struct Named(&'static str, bool);

    impl Scenario for Named {
        fn name(&self) -> &str {
            self.0
        }

        fn run(&self, session: &mut dyn SqlExecutor) -> Result<()> {
            session.execute(self.0)?;
            if self.1 {
                Ok(())
            } else {
                Err(HarnessError::mismatch(self.0, &1, &2))
            }
        }
    }

    #[test]
    fn test_run_module_shares_session_and_continues_after_failure() {
        let mut fixture =
            ModuleFixture::setup(&ClusterConfig::default(), creds, |_, _| Ok(FakeSession::default()))
                .unwrap();

        let report = run_module(
            &mut fixture,
            &[&Named("first", false), &Named("second", true)],
        );

        assert!(!report.is_success());
        assert_eq!(report.failures().count(), 1);
        assert_eq!(report.outcomes[1].name, "second");
        assert!(report.outcomes[1].passed);
        // setup statements + both scenarios on the same session
        assert_eq!(fixture.session().executed.len(), 4);
        assert!(report.to_json().contains("\"first\""));
    }

    #[test]
    fn test_with_module_fixture_propagates_body_error() {
        let result: Result<()> = with_module_fixture(
            &ClusterConfig::default(),
            creds,
            |_, _| Ok(FakeSession::default()),
            |fixture| Named("boom", false).run(fixture.session()),
        );
        assert!(matches!(result, Err(HarnessError::ResultMismatch { .. })));
    }
}
