// sql/mod.rs - T-SQL batches sent to the cluster
//
// Scripts are built from typed pieces rather than format strings:
// - template: declared variables, literals and identifiers
// - provisioning: external language / library registration
// - external_script: the sp_execute_external_script call itself

pub mod external_script;
pub mod provisioning;
pub mod template;

pub use external_script::{ExternalScriptCall, ResultColumn};
pub use provisioning::{ExternalLanguage, ExternalLibrary, Provisioning};
pub use template::{nstring, Declared, Identifier, Literal, Script, SqlType};
