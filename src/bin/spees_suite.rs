// Runs every cluster scenario against one shared session, the same way the
// cluster test module does, and prints a JSON report.
//
// Exit status is 1 when any scenario fails.

use anyhow::Result;
use mleap_sql_tests::config::{ClusterConfig, ToolPaths};
use mleap_sql_tests::fixtures::{run_module, ModuleFixture, Scenario};
use mleap_sql_tests::process::SystemRunner;
use mleap_sql_tests::scenarios::{JavaPassthrough, MleapScoring};
use mleap_sql_tests::session::OdbcSession;
use mleap_sql_tests::spark::SparkSubmit;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_thread_ids(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let tools = ToolPaths::from_env();
    let java = JavaPassthrough::new()?;
    let mleap = MleapScoring::new(
        SparkSubmit::new(SystemRunner, tools.spark_submit.clone()),
        SystemRunner,
        tools,
    );

    let report = {
        let mut fixture = ModuleFixture::from_env(&ClusterConfig::default(), OdbcSession::connect)?;
        let scenarios: [&dyn Scenario; 2] = [&java, &mleap];
        run_module(&mut fixture, &scenarios)
    };

    println!("{}", report.to_json());

    if report.is_success() {
        println!("✓ All {} scenarios passed", report.outcomes.len());
        Ok(())
    } else {
        for failure in report.failures() {
            eprintln!("✗ {}: {}", failure.name, failure.error.as_deref().unwrap_or(""));
        }
        std::process::exit(1);
    }
}
