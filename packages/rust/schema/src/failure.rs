//! Per-document validation failures and their console rendering.

use std::fmt;

const BEGIN_BANNER: &str =
    "****************************** BEGIN VALIDATION ERROR ******************************";
const END_BANNER: &str =
    "****************************** END VALIDATION ERROR ******************************";
const DOC_BANNER: &str = "++++++++++Failed YAML Doc+++++++++++";

/// Keyword reported for documents that are not valid YAML.
pub const YAML_SYNTAX_KEYWORD: &str = "yaml";

/// One YAML document that did not satisfy the schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentFailure {
    /// File name as given on the command line.
    pub file: String,
    /// Zero-based position of the document inside the file.
    pub document_index: usize,
    /// Human-readable error message.
    pub message: String,
    /// The schema keyword that failed (`required`, `type`, ...).
    pub keyword: String,
    /// The offending instance, dumped as YAML.
    pub instance_yaml: String,
}

impl fmt::Display for DocumentFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{BEGIN_BANNER}")?;
        writeln!(f)?;
        writeln!(f, "Validation error in file {}", self.file)?;
        writeln!(f, "{}", self.message)?;
        writeln!(f, "Failed schema attribute: {}", self.keyword)?;
        writeln!(f)?;
        writeln!(f, "{DOC_BANNER}")?;
        writeln!(f)?;
        writeln!(f, "{}", self.instance_yaml.trim_end())?;
        writeln!(f)?;
        writeln!(f, "{END_BANNER}")
    }
}

/// Validation outcome for one file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileReport {
    pub file: String,
    /// Number of YAML documents examined.
    pub documents: usize,
    pub failures: Vec<DocumentFailure>,
}

impl FileReport {
    pub fn is_valid(&self) -> bool {
        self.failures.is_empty()
    }
}
