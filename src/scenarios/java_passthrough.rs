// scenarios/java_passthrough.rs
//
// Registers the Java language extension plus the SDK and test jars, then runs
// the PassThrough class over `SELECT 1`. The script must hand back exactly the
// row it was given.

use crate::error::{HarnessError, Result};
use crate::fixtures::{Scenario, SqlExecutor};
use crate::row::{ResultSet, SqlValue};
use crate::sql::{ExternalLanguage, ExternalLibrary, ExternalScriptCall, Provisioning, Script};

pub const SDK_JAR: &str = "/opt/mssql/lib/mssql-java-lang-extension.jar";
pub const TEST_JAR: &str = "/opt/mssql/java/jars/JavaTestPackage.jar";
pub const PASSTHROUGH_CLASS: &str = "JavaTestPackage.PassThrough";
pub const INPUT_QUERY: &str = "SELECT 1";

pub struct JavaPassthrough {
    provisioning: Provisioning,
    call: ExternalScriptCall,
}

impl JavaPassthrough {
    pub fn new() -> Result<Self> {
        let java = ExternalLanguage::java();
        let call = ExternalScriptCall::new(&java.name, PASSTHROUGH_CLASS)?.input_data(INPUT_QUERY)?;
        let provisioning = Provisioning::new()
            .library(ExternalLibrary::new("SdkPackage", SDK_JAR, &java.name)?)
            .library(ExternalLibrary::new("TestPackage", TEST_JAR, &java.name)?)
            .language(java);

        Ok(Self { provisioning, call })
    }

    /// Language and library registration only.
    pub fn provisioning_script(&self) -> Script {
        self.provisioning.script()
    }

    /// Provisioning followed by the script call, as one batch.
    pub fn script(&self) -> Result<Script> {
        let mut script = Script::nocount();
        script
            .extend(self.provisioning.script())
            .extend(self.call.script()?);
        Ok(script)
    }

    /// One row, whose first column is the integer 1.
    pub fn verify(result: &ResultSet) -> Result<()> {
        if result.len() != 1 {
            return Err(HarnessError::mismatch("passthrough row count", &1, &result.len()));
        }
        let expected = SqlValue::Int(1);
        match result.value(0, 0) {
            Some(value) if *value == expected => Ok(()),
            other => Err(HarnessError::mismatch("passthrough value", &expected, &other)),
        }
    }
}

impl Scenario for JavaPassthrough {
    fn name(&self) -> &str {
        "java_spees"
    }

    fn run(&self, session: &mut dyn SqlExecutor) -> Result<()> {
        let sql = self.script()?.render();
        tracing::debug!("Java passthrough batch:\n{}", sql);
        let result = session.query(&sql)?;
        Self::verify(&result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::testing::FakeSession;
    use crate::row::Column;

    fn one_row(value: SqlValue) -> ResultSet {
        let mut rs = ResultSet::new(vec![Column::new("")]);
        rs.push_row(vec![value]).unwrap();
        rs
    }

    #[test]
    fn test_script_layout() {
        let text = JavaPassthrough::new().unwrap().script().unwrap().render();

        assert!(text.starts_with("SET NOCOUNT ON;\nIF NOT EXISTS (SELECT * FROM sys.external_languages"));
        assert!(text.contains("DROP EXTERNAL LIBRARY [SdkPackage]"));
        assert!(text.contains("CREATE EXTERNAL LIBRARY [TestPackage]"));
        assert!(text.contains("N'JavaTestPackage.PassThrough'"));
        assert!(text.contains("DECLARE @input_data_1 NVARCHAR(MAX) = N'SELECT 1';"));
        assert!(!text.contains("DROP EXTERNAL LANGUAGE"));
    }

    #[test]
    fn test_run_accepts_single_one() {
        let mut session = FakeSession::default();
        session.results.push_back(Ok(one_row(SqlValue::Int(1))));

        JavaPassthrough::new().unwrap().run(&mut session).unwrap();
        assert_eq!(session.executed.len(), 1);
    }

    #[test]
    fn test_verify_rejects_wrong_value_and_row_count() {
        assert!(JavaPassthrough::verify(&one_row(SqlValue::Int(2))).is_err());
        assert!(JavaPassthrough::verify(&one_row(SqlValue::Text("1".to_string()))).is_err());

        let mut two = one_row(SqlValue::Int(1));
        two.push_row(vec![SqlValue::Int(1)]).unwrap();
        assert!(JavaPassthrough::verify(&two).is_err());
        assert!(JavaPassthrough::verify(&ResultSet::default()).is_err());
    }

    #[test]
    fn test_sql_errors_propagate() {
        let mut session = FakeSession::default();
        session
            .results
            .push_back(Err(HarnessError::InvalidTemplate("server said no".to_string())));
        assert!(JavaPassthrough::new().unwrap().run(&mut session).is_err());
    }
}
