// sql/provisioning.rs - External language and library registration
//
// Provisioning must be repeatable against a cluster in any prior state:
// libraries are dropped when present and then recreated, every time. The
// language is only created when missing; it is never dropped.

use crate::error::Result;
use crate::sql::template::{nstring, Identifier, Script};

/// An external language runtime registered from an extension archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalLanguage {
    pub name: Identifier,
    pub content: String,
    pub file_name: String,
}

impl ExternalLanguage {
    pub fn new(name: &str, content: &str, file_name: &str) -> Result<Self> {
        Ok(Self {
            name: Identifier::new(name)?,
            content: content.to_string(),
            file_name: file_name.to_string(),
        })
    }

    /// The Java language extension shipped with the SQL Server image.
    pub fn java() -> Self {
        Self {
            name: Identifier("Java".to_string()),
            content: "/opt/mssql/lib/extensibility/java-lang-extension.tar.gz".to_string(),
            file_name: "javaextension.so".to_string(),
        }
    }

    /// `CREATE EXTERNAL LANGUAGE` guarded by an existence check.
    pub fn ensure_sql(&self) -> String {
        format!(
            "IF NOT EXISTS (SELECT * FROM sys.external_languages WHERE language = {})\n    \
             CREATE EXTERNAL LANGUAGE {}\n        \
             FROM (CONTENT = {}, FILE_NAME = {});",
            self.name.literal(),
            self.name.bracketed(),
            nstring(&self.content),
            nstring(&self.file_name),
        )
    }
}

/// A jar registered for use by external scripts of one language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalLibrary {
    pub name: Identifier,
    pub content: String,
    pub language: Identifier,
}

impl ExternalLibrary {
    pub fn new(name: &str, content: &str, language: &Identifier) -> Result<Self> {
        Ok(Self {
            name: Identifier::new(name)?,
            content: content.to_string(),
            language: language.clone(),
        })
    }

    /// Drop the library if it exists.
    pub fn drop_sql(&self) -> String {
        format!(
            "IF EXISTS (SELECT * FROM sys.external_libraries WHERE name = {})\n    \
             DROP EXTERNAL LIBRARY {};",
            self.name.literal(),
            self.name.bracketed(),
        )
    }

    pub fn create_sql(&self) -> String {
        format!(
            "CREATE EXTERNAL LIBRARY {}\n    FROM (CONTENT = {}) WITH (LANGUAGE = {});",
            self.name.bracketed(),
            nstring(&self.content),
            self.language.literal(),
        )
    }

    /// Drop-then-create, so reruns start from a fresh registration.
    pub fn replace_sql(&self) -> Script {
        let mut script = Script::new();
        script.push(self.drop_sql()).push(self.create_sql());
        script
    }
}

/// Everything a scenario needs registered before it calls its script.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Provisioning {
    pub language: Option<ExternalLanguage>,
    pub libraries: Vec<ExternalLibrary>,
}

impl Provisioning {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn language(mut self, language: ExternalLanguage) -> Self {
        self.language = Some(language);
        self
    }

    pub fn library(mut self, library: ExternalLibrary) -> Self {
        self.libraries.push(library);
        self
    }

    pub fn script(&self) -> Script {
        let mut script = Script::new();
        if let Some(language) = &self.language {
            script.push(language.ensure_sql());
        }
        for library in &self.libraries {
            script.extend(library.replace_sql());
        }
        script
    }
}
