// fixtures/tables/census.rs
//
// The adult census sample rows fed to the MLeap scorer. They live in a
// global temporary table so the external script's input query can see them
// from its own session.

use crate::error::Result;
use crate::fixtures::TestTable;
use crate::sql::template::{Literal, Script, SqlType};
use serde::{Deserialize, Serialize};

pub const TABLE_NAME: &str = "##test";

/// Columns of the census table, in declaration order.
pub const COLUMNS: &[(&str, SqlType)] = &[
    ("income", SqlType::NVarChar(Some(10))),
    ("age", SqlType::Int),
    ("hours_per_week", SqlType::Int),
    ("education", SqlType::NVarChar(Some(10))),
    ("sex", SqlType::NVarChar(Some(10))),
];

/// One input row for the scorer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CensusRow {
    pub income: String,
    pub age: i32,
    pub hours_per_week: i32,
    pub education: String,
    pub sex: String,
}

impl CensusRow {
    pub fn new(income: &str, age: i32, hours_per_week: i32, education: &str, sex: &str) -> Self {
        Self {
            income: income.to_string(),
            age,
            hours_per_week,
            education: education.to_string(),
            sex: sex.to_string(),
        }
    }

    fn literals(&self) -> [Literal; 5] {
        [
            Literal::text(self.income.as_str()),
            Literal::Int(self.age.into()),
            Literal::Int(self.hours_per_week.into()),
            Literal::text(self.education.as_str()),
            Literal::text(self.sex.as_str()),
        ]
    }

    /// `INSERT` for this row; every value is checked against its column type.
    pub fn insert_sql(&self) -> Result<String> {
        let mut values = Vec::with_capacity(COLUMNS.len());
        for ((_, ty), literal) in COLUMNS.iter().zip(self.literals()) {
            literal.check(*ty)?;
            values.push(literal.render());
        }
        Ok(format!(
            "INSERT INTO {} VALUES ({});",
            TABLE_NAME,
            values.join(", ")
        ))
    }
}

/// The three sample rows scored by the census pipeline.
pub fn sample_rows() -> Vec<CensusRow> {
    vec![
        CensusRow::new("<=50K", 39, 40, "Bachelors", "Male"),
        CensusRow::new("<=50K", 50, 13, "Bachelors", "Male"),
        CensusRow::new("<=50K", 38, 40, "HS-grad", "Male"),
    ]
}

pub struct CensusTable;

impl CensusTable {
    pub fn create_sql() -> String {
        let columns = COLUMNS
            .iter()
            .map(|(name, ty)| format!("{} {}", name, ty))
            .collect::<Vec<_>>()
            .join(", ");
        format!("CREATE TABLE {} ({});", TABLE_NAME, columns)
    }

    /// Query the scorer reads its input from.
    pub fn input_query() -> String {
        format!(
            "SELECT age, hours_per_week, education, sex, income FROM {}",
            TABLE_NAME
        )
    }
}

impl TestTable for CensusTable {
    fn setup_sql() -> Result<Script> {
        let mut script = Script::new();
        script
            .push(format!("DROP TABLE IF EXISTS {};", TABLE_NAME))
            .push(Self::create_sql());
        for row in sample_rows() {
            script.push(row.insert_sql()?);
        }
        Ok(script)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setup_sql_recreates_table() {
        let script = CensusTable::setup_sql().unwrap();
        let statements = script.statements();

        assert_eq!(statements.len(), 5);
        assert_eq!(statements[0], "DROP TABLE IF EXISTS ##test;");
        assert_eq!(
            statements[1],
            "CREATE TABLE ##test (income NVARCHAR(10), age INT, hours_per_week INT, \
             education NVARCHAR(10), sex NVARCHAR(10));"
        );
        assert_eq!(
            statements[2],
            "INSERT INTO ##test VALUES (N'<=50K', 39, 40, N'Bachelors', N'Male');"
        );
        assert_eq!(
            statements[4],
            "INSERT INTO ##test VALUES (N'<=50K', 38, 40, N'HS-grad', N'Male');"
        );
    }

    #[test]
    fn test_overlong_value_rejected() {
        let row = CensusRow::new("<=50K", 30, 40, "Prof-school-extended", "Female");
        assert!(row.insert_sql().is_err());
    }

    #[test]
    fn test_input_query_column_order() {
        assert_eq!(
            CensusTable::input_query(),
            "SELECT age, hours_per_week, education, sex, income FROM ##test"
        );
    }
}
