// common/mod.rs - Shared helpers for the live cluster tests
//
// Every cluster test file builds its module fixture through here so that:
// 1. logging is initialised once per test binary
// 2. credentials are checked before any connection attempt
// 3. the session is released when the fixture goes out of scope

#![allow(dead_code)]

use mleap_sql_tests::config::{ClusterConfig, ToolPaths};
use mleap_sql_tests::fixtures::ModuleFixture;
use mleap_sql_tests::process::SystemRunner;
use mleap_sql_tests::scenarios::MleapScoring;
use mleap_sql_tests::session::OdbcSession;
use mleap_sql_tests::spark::SparkSubmit;
use std::sync::{Mutex, MutexGuard, Once};

static TRACING: Once = Once::new();
static CLUSTER: Mutex<()> = Mutex::new(());

pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
            )
            .try_init();
    });
}

/// Serialize tests that provision the same cluster objects.
pub fn cluster_lock() -> MutexGuard<'static, ()> {
    CLUSTER.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Open the shared session and enable external scripts.
pub fn setup_module() -> anyhow::Result<ModuleFixture<OdbcSession>> {
    init_tracing();
    let fixture = ModuleFixture::from_env(&ClusterConfig::default(), OdbcSession::connect)?;
    Ok(fixture)
}

/// MLeap scenario wired to the real spark-submit, hdfs and kubectl.
pub fn mleap_scenario() -> MleapScoring<SparkSubmit<SystemRunner>, SystemRunner> {
    let tools = ToolPaths::from_env();
    MleapScoring::new(
        SparkSubmit::new(SystemRunner, tools.spark_submit.clone()),
        SystemRunner,
        tools,
    )
}
