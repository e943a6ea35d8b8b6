// scenarios/mleap.rs
//
// Train the adult census pipeline with Spark, export it as an MLeap bundle,
// stage the bundle inside the SQL Server container and score three sample
// rows through the Java MLeap scorer. The scores must match the golden rows
// bit for bit.
//
// Staging steps, each of which must exit 0:
//   1. spark-submit mleap_pyspark.py /spark_ml adult_census_pipeline.zip
//   2. hdfs dfs -get -f /spark_ml/adult_census_pipeline.zip
//   3. kubectl cp adult_census_pipeline.zip master-0:/tmp -c mssql-server

use crate::config::ToolPaths;
use crate::error::{HarnessError, Result};
use crate::fixtures::tables::CensusTable;
use crate::fixtures::{Scenario, SqlExecutor, TestTable};
use crate::process::{hdfs_get, join_path, kubectl_cp, CommandRunner, PodTarget};
use crate::row::{FromRecord, Record, RecordReader, ResultSet};
use crate::spark::JobLauncher;
use crate::sql::{
    ExternalLanguage, ExternalLibrary, ExternalScriptCall, Literal, Provisioning, ResultColumn,
    Script, SqlType,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const MLEAP_APP_JAR: &str = "/opt/mssql/java/jars/mssql-mleap-app-assembly-1.0.jar";
pub const SCORER_CLASS: &str = "com.microsoft.sqlserver.mleap.Scorer";
pub const OUTPUT_FIELDS: &str = "prediction,probability,education,sex,income,predictedIncome";
pub const LOG_LEVEL: &str = "INFO";

/// Where the trained bundle is produced and where it has to end up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelArtifact {
    pub training_script: PathBuf,
    pub hdfs_dir: String,
    pub bundle_name: String,
    pub target: PodTarget,
}

impl Default for ModelArtifact {
    fn default() -> Self {
        Self {
            training_script: PathBuf::from("mleap_pyspark.py"),
            hdfs_dir: "/spark_ml".to_string(),
            bundle_name: "adult_census_pipeline.zip".to_string(),
            target: PodTarget {
                pod: "master-0".to_string(),
                dir: "/tmp".to_string(),
                container: "mssql-server".to_string(),
            },
        }
    }
}

impl ModelArtifact {
    /// Positional arguments for the training job.
    pub fn training_args(&self) -> Vec<String> {
        vec![self.hdfs_dir.clone(), self.bundle_name.clone()]
    }

    pub fn hdfs_path(&self) -> String {
        join_path(&self.hdfs_dir, &self.bundle_name)
    }

    /// Path of the bundle as seen by the SQL Server container.
    pub fn model_path(&self) -> String {
        join_path(&self.target.dir, &self.bundle_name)
    }
}

/// One scored row, as declared in `WITH RESULT SETS`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredIncome {
    pub prediction: i64,
    pub probability0: f64,
    pub probability1: f64,
    pub education: String,
    pub sex: String,
    pub income: String,
    #[serde(rename = "predictedIncome")]
    pub predicted_income: String,
}

impl ScoredIncome {
    pub fn result_columns() -> Result<Vec<ResultColumn>> {
        let text = SqlType::NVarChar(Some(20));
        [
            ("prediction", SqlType::Int),
            ("probability0", SqlType::Float),
            ("probability1", SqlType::Float),
            ("education", text),
            ("sex", text),
            ("income", text),
            ("predictedIncome", text),
        ]
        .into_iter()
        .map(|(name, ty)| ResultColumn::new(name, ty))
        .collect()
    }
}

impl FromRecord for ScoredIncome {
    fn from_record(record: Record) -> Result<Self> {
        let mut r = RecordReader::new(record);
        let row = ScoredIncome {
            prediction: r.int("prediction")?,
            probability0: r.float("probability0")?,
            probability1: r.float("probability1")?,
            education: r.text("education")?,
            sex: r.text("sex")?,
            income: r.text("income")?,
            predicted_income: r.text("predictedIncome")?,
        };
        r.finish()?;
        Ok(row)
    }
}

fn scored(probability0: f64, probability1: f64, education: &str) -> ScoredIncome {
    ScoredIncome {
        prediction: 0,
        probability0,
        probability1,
        education: education.to_string(),
        sex: "Male".to_string(),
        income: "<=50K".to_string(),
        predicted_income: "<=50K".to_string(),
    }
}

/// Expected scores for the census sample rows, in input order.
pub fn golden_rows() -> Vec<ScoredIncome> {
    vec![
        scored(0.6544871023375456, 0.3455128976624544, "Bachelors"),
        scored(0.7363751868447964, 0.2636248131552036, "Bachelors"),
        scored(0.8324466132959966, 0.16755338670400344, "HS-grad"),
    ]
}

pub struct MleapScoring<L, R> {
    launcher: L,
    runner: R,
    tools: ToolPaths,
    artifact: ModelArtifact,
}

impl<L: JobLauncher, R: CommandRunner> MleapScoring<L, R> {
    pub fn new(launcher: L, runner: R, tools: ToolPaths) -> Self {
        Self {
            launcher,
            runner,
            tools,
            artifact: ModelArtifact::default(),
        }
    }

    pub fn with_artifact(mut self, artifact: ModelArtifact) -> Self {
        self.artifact = artifact;
        self
    }

    pub fn artifact(&self) -> &ModelArtifact {
        &self.artifact
    }

    /// Train the model and copy the bundle into the SQL Server container.
    pub fn stage(&self) -> Result<()> {
        let artifact = &self.artifact;
        self.launcher
            .submit(&artifact.training_script, &artifact.training_args())?;
        hdfs_get(&self.runner, &self.tools.hdfs, &artifact.hdfs_path())?;
        kubectl_cp(
            &self.runner,
            &self.tools.kubectl,
            &artifact.bundle_name,
            &artifact.target,
        )?;
        tracing::info!("MLeap bundle staged at {}", artifact.model_path());
        Ok(())
    }

    pub fn scoring_call(&self) -> Result<ExternalScriptCall> {
        let java = ExternalLanguage::java();
        let param = SqlType::NVarChar(Some(100));
        Ok(ExternalScriptCall::new(&java.name, SCORER_CLASS)?
            .parallel(false)?
            .input_data(&CensusTable::input_query())?
            .param("modelPath", param, Literal::text(self.artifact.model_path()))?
            .param("outputFields", param, Literal::text(OUTPUT_FIELDS))?
            .param("logLevel", param, Literal::text(LOG_LEVEL))?
            .result_set(ScoredIncome::result_columns()?))
    }

    /// Library registration, input table and scorer call, as one batch.
    pub fn script(&self) -> Result<Script> {
        let java = ExternalLanguage::java();
        let provisioning = Provisioning::new()
            .library(ExternalLibrary::new("MleapApp", MLEAP_APP_JAR, &java.name)?)
            .language(java);

        let mut script = Script::nocount();
        script
            .extend(provisioning.script())
            .extend(CensusTable::setup_sql()?)
            .extend(self.scoring_call()?.script()?);
        Ok(script)
    }
}

/// Decode the fetched rows and compare them with the golden set.
pub fn verify(result: &ResultSet) -> Result<()> {
    let actual: Vec<ScoredIncome> = result.decode()?;
    let expected = golden_rows();
    if actual != expected {
        return Err(HarnessError::mismatch("MLeap scores", &expected, &actual));
    }
    Ok(())
}

impl<L: JobLauncher, R: CommandRunner> Scenario for MleapScoring<L, R> {
    fn name(&self) -> &str {
        "mleap_pyspark"
    }

    fn run(&self, session: &mut dyn SqlExecutor) -> Result<()> {
        self.stage()?;
        let sql = self.script()?.render();
        tracing::debug!("MLeap scoring batch:\n{}", sql);
        let result = session.query(&sql)?;
        tracing::info!("Scorer returned {} rows", result.len());
        verify(&result)
    }
}
