// sql/template.rs - Declared, typed script parameters
//
// Values never get pasted into T-SQL as raw text. Each one is declared as a
// typed variable (`DECLARE @name TYPE = literal;`) and rendered through the
// literal helpers below, so quotes are escaped and lengths are checked
// before the batch ever reaches the server.

use crate::error::{HarnessError, Result};
use std::fmt;

/// A validated T-SQL identifier: ASCII letter or underscore, then letters,
/// digits or underscores.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier(pub(crate) String);

impl Identifier {
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let mut chars = name.chars();
        let valid_start = chars
            .next()
            .map(|c| c.is_ascii_alphabetic() || c == '_')
            .unwrap_or(false);
        let valid_rest = chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
        // 128 is the sysname limit.
        if !valid_start || !valid_rest || name.len() > 128 {
            return Err(HarnessError::InvalidTemplate(format!(
                "`{}` is not a valid identifier",
                name
            )));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `[name]`, for use as an object name.
    pub fn bracketed(&self) -> String {
        format!("[{}]", self.0)
    }

    /// `N'name'`, for comparing against catalog views.
    pub fn literal(&self) -> String {
        nstring(&self.0)
    }

    /// `@name`, for use as a variable or procedure parameter.
    pub fn variable(&self) -> String {
        format!("@{}", self.0)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unicode string literal with embedded quotes doubled.
pub fn nstring(value: &str) -> String {
    format!("N'{}'", value.replace('\'', "''"))
}

/// Column / variable types the harness declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlType {
    Int,
    Bit,
    Float,
    /// `NVARCHAR(n)`; `None` is `NVARCHAR(MAX)`.
    NVarChar(Option<u32>),
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlType::Int => f.write_str("INT"),
            SqlType::Bit => f.write_str("BIT"),
            SqlType::Float => f.write_str("FLOAT"),
            SqlType::NVarChar(Some(n)) => write!(f, "NVARCHAR({})", n),
            SqlType::NVarChar(None) => f.write_str("NVARCHAR(MAX)"),
        }
    }
}

/// A typed literal value.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i64),
    Bit(bool),
    Float(f64),
    Text(String),
}

impl Literal {
    pub fn text(value: impl Into<String>) -> Self {
        Literal::Text(value.into())
    }

    /// Render as a T-SQL literal.
    pub fn render(&self) -> String {
        match self {
            Literal::Int(v) => v.to_string(),
            Literal::Bit(v) => u8::from(*v).to_string(),
            Literal::Float(v) => format!("{:?}", v),
            Literal::Text(v) => nstring(v),
        }
    }

    /// Check the literal fits the declared type.
    pub fn check(&self, ty: SqlType) -> Result<()> {
        match (self, ty) {
            (Literal::Int(v), SqlType::Int) => {
                if i32::try_from(*v).is_err() {
                    return Err(HarnessError::InvalidTemplate(format!(
                        "{} does not fit in INT",
                        v
                    )));
                }
                Ok(())
            }
            (Literal::Bit(_), SqlType::Bit) => Ok(()),
            (Literal::Float(v), SqlType::Float) if v.is_finite() => Ok(()),
            // NVARCHAR(n) counts UTF-16 code units, not characters.
            (Literal::Text(v), SqlType::NVarChar(limit)) => {
                let units = v.encode_utf16().count();
                match limit {
                    Some(n) if units > n as usize => Err(HarnessError::InvalidTemplate(format!(
                        "value of {} UTF-16 units does not fit in {}",
                        units, ty
                    ))),
                    _ => Ok(()),
                }
            }
            (literal, ty) => Err(HarnessError::InvalidTemplate(format!(
                "{:?} cannot be declared as {}",
                literal, ty
            ))),
        }
    }
}

/// A declared variable.
#[derive(Debug, Clone, PartialEq)]
pub struct Declared {
    pub name: Identifier,
    pub ty: SqlType,
    pub value: Literal,
}

impl Declared {
    pub fn new(name: &str, ty: SqlType, value: Literal) -> Result<Self> {
        value.check(ty)?;
        Ok(Self {
            name: Identifier::new(name)?,
            ty,
            value,
        })
    }

    /// `@name TYPE`, as used in an `@params` signature.
    pub fn signature(&self) -> String {
        format!("{} {}", self.name.variable(), self.ty)
    }

    pub fn render(&self) -> String {
        format!(
            "DECLARE {} {} = {};",
            self.name.variable(),
            self.ty,
            self.value.render()
        )
    }
}

/// A multi-statement batch, sent in one round trip.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Script {
    statements: Vec<String>,
}

impl Script {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with `SET NOCOUNT ON` so DML row counts don't hide the first
    /// result set.
    pub fn nocount() -> Self {
        let mut script = Self::new();
        script.push("SET NOCOUNT ON;");
        script
    }

    pub fn push(&mut self, statement: impl Into<String>) -> &mut Self {
        self.statements.push(statement.into());
        self
    }

    pub fn extend(&mut self, other: Script) -> &mut Self {
        self.statements.extend(other.statements);
        self
    }

    pub fn statements(&self) -> &[String] {
        &self.statements
    }

    pub fn render(&self) -> String {
        self.statements.join("\n")
    }
}

impl fmt::Display for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}
