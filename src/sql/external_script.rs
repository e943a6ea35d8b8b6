// sql/external_script.rs - sp_execute_external_script call builder
//
// Every argument becomes a declared variable and the EXEC passes those
// variables by name. Extra script parameters are declared the same way and
// listed in the `@params` signature the procedure requires.

use crate::error::{HarnessError, Result};
use crate::sql::template::{Declared, Identifier, Literal, Script, SqlType};

const RESERVED: &[&str] = &["language", "script", "parallel", "input_data_1", "params"];

/// One column of a `WITH RESULT SETS` declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultColumn {
    pub name: Identifier,
    pub ty: SqlType,
}

impl ResultColumn {
    pub fn new(name: &str, ty: SqlType) -> Result<Self> {
        Ok(Self {
            name: Identifier::new(name)?,
            ty,
        })
    }

    fn render(&self) -> String {
        format!("{} {}", self.name, self.ty)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExternalScriptCall {
    language: Declared,
    script: Declared,
    parallel: Option<Declared>,
    input_data: Option<Declared>,
    params: Vec<Declared>,
    result_set: Option<Vec<ResultColumn>>,
}

impl ExternalScriptCall {
    /// Call `script` (a fully qualified class name) in `language`.
    ///
    /// The external runtime rejects class names containing whitespace, so
    /// they are refused here.
    pub fn new(language: &Identifier, script: &str) -> Result<Self> {
        if script.is_empty() || script.chars().any(char::is_whitespace) {
            return Err(HarnessError::InvalidTemplate(format!(
                "external script name `{}` must be non-empty and contain no whitespace",
                script
            )));
        }
        Ok(Self {
            language: Declared::new(
                "language",
                SqlType::NVarChar(Some(128)),
                Literal::text(language.as_str()),
            )?,
            script: Declared::new("script", SqlType::NVarChar(None), Literal::text(script))?,
            parallel: None,
            input_data: None,
            params: Vec::new(),
            result_set: None,
        })
    }

    pub fn parallel(mut self, parallel: bool) -> Result<Self> {
        self.parallel = Some(Declared::new("parallel", SqlType::Bit, Literal::Bit(parallel))?);
        Ok(self)
    }

    /// Query whose rows are streamed into the external script.
    pub fn input_data(mut self, query: &str) -> Result<Self> {
        self.input_data = Some(Declared::new(
            "input_data_1",
            SqlType::NVarChar(None),
            Literal::text(query),
        )?);
        Ok(self)
    }

    /// Add a named script parameter.
    pub fn param(mut self, name: &str, ty: SqlType, value: Literal) -> Result<Self> {
        // variable names are case-insensitive on the server
        if RESERVED.iter().any(|r| r.eq_ignore_ascii_case(name)) {
            return Err(HarnessError::InvalidTemplate(format!(
                "`{}` is reserved by sp_execute_external_script",
                name
            )));
        }
        if self
            .params
            .iter()
            .any(|p| p.name.as_str().eq_ignore_ascii_case(name))
        {
            return Err(HarnessError::InvalidTemplate(format!(
                "parameter `{}` declared twice",
                name
            )));
        }
        self.params.push(Declared::new(name, ty, value)?);
        Ok(self)
    }

    /// Declare the shape of the rows the script returns.
    pub fn result_set(mut self, columns: Vec<ResultColumn>) -> Self {
        self.result_set = Some(columns);
        self
    }

    /// `@params` value: the signature of the extra parameters.
    pub fn params_signature(&self) -> Option<String> {
        if self.params.is_empty() {
            return None;
        }
        Some(
            self.params
                .iter()
                .map(Declared::signature)
                .collect::<Vec<_>>()
                .join(", "),
        )
    }

    /// Declarations followed by the EXEC.
    pub fn script(&self) -> Result<Script> {
        let signature = self
            .params_signature()
            .map(|sig| Declared::new("params", SqlType::NVarChar(None), Literal::Text(sig)))
            .transpose()?;

        let mut declared: Vec<&Declared> = vec![&self.language, &self.script];
        declared.extend(self.parallel.as_ref());
        declared.extend(self.input_data.as_ref());
        declared.extend(signature.as_ref());
        declared.extend(self.params.iter());

        let mut script = Script::new();
        for d in &declared {
            script.push(d.render());
        }

        let args = declared
            .iter()
            .map(|d| format!("{} = {}", d.name.variable(), d.name.variable()))
            .collect::<Vec<_>>()
            .join("\n    , ");
        let mut exec = format!("EXEC sp_execute_external_script\n    {}", args);

        if let Some(columns) = &self.result_set {
            let columns = columns
                .iter()
                .map(ResultColumn::render)
                .collect::<Vec<_>>()
                .join(", ");
            exec.push_str(&format!("\nWITH RESULT SETS (({}))", columns));
        }
        exec.push(';');
        script.push(exec);
        Ok(script)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn java() -> Identifier {
        Identifier::new("Java").unwrap()
    }

    #[test]
    fn test_minimal_call() {
        let call = ExternalScriptCall::new(&java(), "JavaTestPackage.PassThrough")
            .unwrap()
            .input_data("SELECT 1")
            .unwrap();
        let text = call.script().unwrap().render();

        assert!(text.contains("DECLARE @script NVARCHAR(MAX) = N'JavaTestPackage.PassThrough';"));
        assert!(text.contains("DECLARE @input_data_1 NVARCHAR(MAX) = N'SELECT 1';"));
        assert!(text.ends_with(
            "EXEC sp_execute_external_script\n    @language = @language\n    \
             , @script = @script\n    , @input_data_1 = @input_data_1;"
        ));
        assert!(!text.contains("@params"));
        assert!(!text.contains("WITH RESULT SETS"));
    }

    #[test]
    fn test_script_name_without_whitespace() {
        assert!(ExternalScriptCall::new(&java(), "JavaTestPackage. PassThrough").is_err());
        assert!(ExternalScriptCall::new(&java(), "").is_err());
    }

    #[test]
    fn test_params_and_result_set() {
        let call = ExternalScriptCall::new(&java(), "com.example.Scorer")
            .unwrap()
            .parallel(false)
            .unwrap()
            .param("modelPath", SqlType::NVarChar(Some(100)), Literal::text("/tmp/m.zip"))
            .unwrap()
            .param("logLevel", SqlType::NVarChar(Some(100)), Literal::text("INFO"))
            .unwrap()
            .result_set(vec![
                ResultColumn::new("prediction", SqlType::Int).unwrap(),
                ResultColumn::new("probability0", SqlType::Float).unwrap(),
            ]);

        assert_eq!(
            call.params_signature().as_deref(),
            Some("@modelPath NVARCHAR(100), @logLevel NVARCHAR(100)")
        );

        let text = call.script().unwrap().render();
        assert!(text.contains("DECLARE @parallel BIT = 0;"));
        assert!(text.contains(
            "DECLARE @params NVARCHAR(MAX) = N'@modelPath NVARCHAR(100), @logLevel NVARCHAR(100)';"
        ));
        assert!(text.contains("    , @params = @params\n    , @modelPath = @modelPath\n    , @logLevel = @logLevel"));
        assert!(text.ends_with("WITH RESULT SETS ((prediction INT, probability0 FLOAT));"));
    }

    #[test]
    fn test_reserved_and_duplicate_params_rejected() {
        let call = ExternalScriptCall::new(&java(), "a.B").unwrap();
        assert!(call
            .clone()
            .param("script", SqlType::Int, Literal::Int(1))
            .is_err());

        let call = call.param("x", SqlType::Int, Literal::Int(1)).unwrap();
        assert!(call.param("x", SqlType::Int, Literal::Int(2)).is_err());
    }

    #[test]
    fn test_param_names_compare_without_case() {
        let call = ExternalScriptCall::new(&java(), "a.B").unwrap();
        assert!(call
            .clone()
            .param("Script", SqlType::Int, Literal::Int(1))
            .is_err());
        assert!(call
            .clone()
            .param("INPUT_DATA_1", SqlType::Int, Literal::Int(1))
            .is_err());

        let call = call.param("modelPath", SqlType::Int, Literal::Int(1)).unwrap();
        assert!(call.param("MODELPATH", SqlType::Int, Literal::Int(2)).is_err());
    }

    #[test]
    fn test_input_query_quotes_are_escaped() {
        let call = ExternalScriptCall::new(&java(), "a.B")
            .unwrap()
            .input_data("SELECT 'x'")
            .unwrap();
        let text = call.script().unwrap().render();
        assert!(text.contains("N'SELECT ''x'''"));
    }
}
