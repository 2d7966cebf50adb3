//! YAML document validation against JSON Schema.
//!
//! Every document of a multi-document YAML stream is checked; failures are
//! collected per file rather than aborting the run.

pub mod failure;
pub mod validator;

pub use failure::{DocumentFailure, FileReport, YAML_SYNTAX_KEYWORD};
pub use validator::SchemaValidator;
