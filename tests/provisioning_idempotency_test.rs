// tests/provisioning_idempotency_test.rs
// Provisioning must succeed no matter what a previous run left behind.
//
// One test, one session: the module fixture is opened and external scripts
// are enabled once for the whole file.

mod common;

use mleap_sql_tests::fixtures::SqlExecutor;
use mleap_sql_tests::scenarios::JavaPassthrough;

#[test]
fn test_provisioning_is_idempotent() -> anyhow::Result<()> {
    let _guard = common::cluster_lock();
    let mut fixture = common::setup_module()?;
    let scenario = JavaPassthrough::new()?;
    let provisioning = scenario.provisioning_script().render();

    // 1. First run registers everything
    fixture.session().execute(&provisioning)?;

    // 2. Second run drops and recreates the libraries
    fixture.session().execute(&provisioning)?;

    // 3. Both libraries are registered exactly once
    let libraries = fixture.session().query(
        "SELECT name FROM sys.external_libraries \
         WHERE name IN ('SdkPackage', 'TestPackage') ORDER BY name",
    )?;
    let names: Vec<String> = libraries
        .rows
        .iter()
        .filter_map(|row| row[0].as_str().map(str::to_string))
        .collect();
    assert_eq!(names, vec!["SdkPackage", "TestPackage"]);

    // 4. The full passthrough batch can be rerun on the same session
    let sql = scenario.script()?.render();
    for _ in 0..2 {
        let result = fixture.session().query(&sql)?;
        JavaPassthrough::verify(&result)?;
    }

    Ok(())
}
