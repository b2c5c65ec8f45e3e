use std::path::Path;
use std::process;

use crate::{report_error, OutputFormat};

static ENVELOPE_SCHEMA_STR: &str = include_str!("../../../../docs/envelope-schema.json");

pub(crate) fn cmd_validate(response_path: &Path, output: OutputFormat, quiet: bool) {
    let schema: serde_json::Value = match serde_json::from_str(ENVELOPE_SCHEMA_STR) {
        Ok(s) => s,
        Err(e) => {
            let msg = format!("internal error: failed to parse embedded envelope schema: {}", e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    };

    let doc_str = match std::fs::read_to_string(response_path) {
        Ok(s) => s,
        Err(e) => {
            let msg = format!("error reading file '{}': {}", response_path.display(), e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    };

    let doc: serde_json::Value = match serde_json::from_str(&doc_str) {
        Ok(v) => v,
        Err(e) => {
            let msg = format!("error parsing JSON in '{}': {}", response_path.display(), e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    };

    let validator = match jsonschema::validator_for(&schema) {
        Ok(v) => v,
        Err(e) => {
            let msg = format!("internal error: failed to compile schema: {}", e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    };

    let errors: Vec<String> = validator
        .iter_errors(&doc)
        .map(|e| format!("{}", e))
        .collect();

    if errors.is_empty() {
        if !quiet {
            match output {
                OutputFormat::Text => println!("valid"),
                OutputFormat::Json => println!("{}", serde_json::json!({ "valid": true })),
            }
        }
        return;
    }

    match output {
        OutputFormat::Text => {
            if !quiet {
                eprintln!("invalid response");
                for err in &errors {
                    eprintln!("  - {}", err);
                }
            }
        }
        OutputFormat::Json => {
            let json = serde_json::json!({
                "valid": false,
                "errors": errors
            });
            eprintln!(
                "{}",
                serde_json::to_string_pretty(&json).unwrap_or_default()
            );
        }
    }
    process::exit(1);
}
