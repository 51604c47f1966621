//! Generator settings: environment loading, YAML parsing, validation.

pub mod parser;
pub mod settings;
pub mod validator;
