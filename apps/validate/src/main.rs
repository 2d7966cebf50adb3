//! validate-yaml: check YAML documents against a JSON Schema.
//!
//! Every document of every file is validated. Failures are printed to stderr
//! as they are found and the process exits non-zero if any were reported.

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use color_eyre::eyre::Result;
use docsync_schema::SchemaValidator;
use tracing::{debug, info};

const BANNER: &str =
    "----------------------------------------------------------------------------";

/// Validate YAML files against a JSON Schema.
#[derive(Parser, Debug)]
#[command(name = "validate-yaml", version, long_about = None)]
struct Args {
    /// JSON Schema file.
    #[arg(short = 's', long)]
    schema_file: Option<PathBuf>,

    /// YAML files to validate, relative to --base-dir.
    #[arg(short = 'F', long, num_args = 0..)]
    filenames: Vec<String>,

    /// Directory the YAML file names are resolved against.
    #[arg(long, default_value = ".")]
    base_dir: PathBuf,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbose: u8) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match verbose {
        0 => "docsync=warn",
        1 => "docsync=debug",
        _ => "docsync=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<ExitCode> {
    color_eyre::install()?;
    let args = Args::parse();
    init_tracing(args.verbose);

    let code = run(&args, &mut std::io::stdout(), &mut std::io::stderr())?;
    Ok(ExitCode::from(code))
}

/// Validate everything named by `args`, returning the process exit status.
fn run(args: &Args, out: &mut impl Write, err: &mut impl Write) -> Result<u8> {
    writeln!(out, "{BANNER}")?;

    let Some(schema_path) = args.schema_file.as_ref().filter(|p| !p.as_os_str().is_empty())
    else {
        writeln!(err, "Argument Error: Schema file path is required")?;
        return Ok(1);
    };

    if !schema_path.exists() {
        writeln!(err, "The target directory for the schema file doesn't exist")?;
        return Ok(1);
    }

    let mut files = Vec::with_capacity(args.filenames.len());
    for name in &args.filenames {
        let path = args.base_dir.join(name);
        if !path.exists() {
            writeln!(err, "The target directory for the yaml file {name} doesn't exist")?;
            return Ok(1);
        }
        files.push((name.as_str(), path));
    }

    let validator = SchemaValidator::from_file(schema_path)?;

    writeln!(
        out,
        "Validating Schemas for {:?} against {}\n\n",
        args.filenames,
        schema_path.display()
    )?;

    let mut failures = 0usize;
    for (name, path) in &files {
        let report = validator.validate_file(name, path)?;
        debug!(file = name, documents = report.documents, "checked file");

        for failure in &report.failures {
            writeln!(err, "{failure}")?;
        }
        failures += report.failures.len();
    }

    writeln!(out, "\n\n")?;
    info!(files = files.len(), failures, "validation finished");

    if failures > 0 {
        writeln!(
            err,
            "Task failed with validation errors, check output for details"
        )?;
        writeln!(out, "{BANNER}")?;
        Ok(1)
    } else {
        writeln!(out, "All files validated successfully")?;
        writeln!(out, "{BANNER}")?;
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHEMA: &str = r#"{
        "type": "object",
        "required": ["name", "type"],
        "properties": {
            "name": { "type": "string" },
            "type": { "enum": ["metric alert", "query alert"] }
        }
    }"#;

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("validate-yaml-test-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn args(dir: &std::path::Path, schema: Option<&str>, files: &[&str]) -> Args {
        Args {
            schema_file: schema.map(|s| dir.join(s)),
            filenames: files.iter().map(|f| f.to_string()).collect(),
            base_dir: dir.to_path_buf(),
            verbose: 0,
        }
    }

    fn run_captured(args: &Args) -> (u8, String, String) {
        let mut out = Vec::new();
        let mut err = Vec::new();
        let code = run(args, &mut out, &mut err).unwrap();
        (
            code,
            String::from_utf8(out).unwrap(),
            String::from_utf8(err).unwrap(),
        )
    }

    #[test]
    fn all_valid_exits_zero() {
        let dir = temp_dir();
        std::fs::write(dir.join("schema.json"), SCHEMA).unwrap();
        std::fs::write(
            dir.join("monitors.yaml"),
            "name: cpu\ntype: metric alert\n---\nname: errors\ntype: query alert\n",
        )
        .unwrap();

        let (code, out, err) = run_captured(&args(&dir, Some("schema.json"), &["monitors.yaml"]));
        assert_eq!(code, 0);
        assert!(out.contains("All files validated successfully"));
        assert!(err.is_empty());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn failures_are_reported_and_counted() {
        let dir = temp_dir();
        std::fs::write(dir.join("schema.json"), SCHEMA).unwrap();
        std::fs::write(dir.join("a.yaml"), "name: cpu\ntype: log alert\n").unwrap();
        std::fs::write(dir.join("b.yaml"), "name: ok\ntype: metric alert\n---\ntype: query alert\n")
            .unwrap();

        let (code, out, err) = run_captured(&args(&dir, Some("schema.json"), &["a.yaml", "b.yaml"]));
        assert_eq!(code, 1);
        assert_eq!(err.matches("BEGIN VALIDATION ERROR").count(), 2);
        assert!(err.contains("Validation error in file a.yaml"));
        assert!(err.contains("Failed schema attribute: enum"));
        assert!(err.contains("Validation error in file b.yaml"));
        assert!(err.contains("Failed schema attribute: required"));
        assert!(err.contains("Task failed with validation errors"));
        assert!(!out.contains("All files validated successfully"));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_schema_argument() {
        let dir = temp_dir();
        let (code, _, err) = run_captured(&args(&dir, None, &[]));
        assert_eq!(code, 1);
        assert!(err.contains("Schema file path is required"));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_schema_file() {
        let dir = temp_dir();
        let (code, _, err) = run_captured(&args(&dir, Some("nope.json"), &[]));
        assert_eq!(code, 1);
        assert!(err.contains("schema file doesn't exist"));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_yaml_file_stops_before_validating() {
        let dir = temp_dir();
        std::fs::write(dir.join("schema.json"), SCHEMA).unwrap();
        std::fs::write(dir.join("bad.yaml"), "type: nope\n").unwrap();

        let (code, _, err) = run_captured(&args(&dir, Some("schema.json"), &["bad.yaml", "gone.yaml"]));
        assert_eq!(code, 1);
        assert!(err.contains("yaml file gone.yaml doesn't exist"));
        assert!(!err.contains("BEGIN VALIDATION ERROR"));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn no_files_is_success() {
        let dir = temp_dir();
        std::fs::write(dir.join("schema.json"), SCHEMA).unwrap();

        let (code, out, _) = run_captured(&args(&dir, Some("schema.json"), &[]));
        assert_eq!(code, 0);
        assert!(out.contains("All files validated successfully"));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn parses_short_flags() {
        let args = Args::try_parse_from(["validate-yaml", "-s", "schema.json", "-F", "a.yaml", "b.yaml"])
            .unwrap();
        assert_eq!(args.schema_file, Some(PathBuf::from("schema.json")));
        assert_eq!(args.filenames, vec!["a.yaml", "b.yaml"]);
    }
}
