//! JSON Schema validation of multi-document YAML files.

use std::path::Path;

use jsonschema::Validator;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use tracing::{debug, instrument, warn};

use docsync_shared::{DocSyncError, Result};

use crate::failure::{DocumentFailure, FileReport, YAML_SYNTAX_KEYWORD};

/// A compiled JSON Schema.
pub struct SchemaValidator {
    validator: Validator,
}

impl SchemaValidator {
    /// Compile a schema from an already parsed JSON value.
    pub fn from_value(schema: &JsonValue) -> Result<Self> {
        let validator = Validator::new(schema)
            .map_err(|e| DocSyncError::validation(format!("failed to compile schema: {e}")))?;
        Ok(Self { validator })
    }

    /// Read and compile a JSON Schema file.
    #[instrument(fields(path = %path.display()))]
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| DocSyncError::io(path, e))?;
        let schema: JsonValue = serde_json::from_str(&content).map_err(|e| {
            DocSyncError::parse(format!("failed to parse schema {}: {e}", path.display()))
        })?;
        debug!("schema loaded");
        Self::from_value(&schema)
    }

    /// Validate every document of a YAML file on disk.
    ///
    /// `display_name` is the name used in failure reports.
    #[instrument(skip(self), fields(path = %path.display()))]
    pub fn validate_file(&self, display_name: &str, path: &Path) -> Result<FileReport> {
        let content = std::fs::read_to_string(path).map_err(|e| DocSyncError::io(path, e))?;
        Ok(self.validate_str(display_name, &content))
    }

    /// Validate every document of a YAML stream.
    ///
    /// Each document contributes at most one failure. A syntax error is
    /// reported as a failure and stops reading the stream, since the parser
    /// cannot resynchronise after it.
    pub fn validate_str(&self, file: &str, content: &str) -> FileReport {
        let mut report = FileReport {
            file: file.to_string(),
            ..FileReport::default()
        };

        for (index, document) in serde_yaml::Deserializer::from_str(content).enumerate() {
            report.documents += 1;

            let yaml = match serde_yaml::Value::deserialize(document) {
                Ok(value) => value,
                Err(e) => {
                    warn!(file, index, error = %e, "unparseable YAML document");
                    report.failures.push(DocumentFailure {
                        file: file.to_string(),
                        document_index: index,
                        message: format!("invalid YAML: {e}"),
                        keyword: YAML_SYNTAX_KEYWORD.to_string(),
                        instance_yaml: String::new(),
                    });
                    break;
                }
            };

            if let Some(failure) = self.check_document(file, index, &yaml) {
                warn!(file, index, keyword = %failure.keyword, "document failed validation");
                report.failures.push(failure);
            }
        }

        debug!(
            file,
            documents = report.documents,
            failures = report.failures.len(),
            "file validated"
        );
        report
    }

    fn check_document(
        &self,
        file: &str,
        index: usize,
        yaml: &serde_yaml::Value,
    ) -> Option<DocumentFailure> {
        let instance = match serde_json::to_value(yaml) {
            Ok(v) => v,
            Err(e) => {
                return Some(DocumentFailure {
                    file: file.to_string(),
                    document_index: index,
                    message: format!("document cannot be represented as JSON: {e}"),
                    keyword: YAML_SYNTAX_KEYWORD.to_string(),
                    instance_yaml: dump_yaml(yaml),
                });
            }
        };

        let error = self.validator.iter_errors(&instance).next()?;

        let schema_path = error.schema_path.to_string();
        let keyword = schema_path
            .rsplit('/')
            .find(|segment| !segment.is_empty())
            .unwrap_or("schema")
            .to_string();
        let instance_path = error.instance_path.to_string();
        let message = if instance_path.is_empty() {
            error.to_string()
        } else {
            format!("{instance_path}: {error}")
        };

        Some(DocumentFailure {
            file: file.to_string(),
            document_index: index,
            message,
            keyword,
            instance_yaml: dump_yaml(&*error.instance),
        })
    }
}

fn dump_yaml<T: serde::Serialize + ?Sized>(value: &T) -> String {
    serde_yaml::to_string(value).unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
