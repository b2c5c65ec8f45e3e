pub(crate) mod describe;
pub(crate) mod processes;
pub(crate) mod resolve;
pub(crate) mod validate;

use std::path::{Path, PathBuf};
use std::process;

use bazaar_interchange::{from_response, ParsedResponse};
use bazaar_store::{EntityStore, FieldAllowList};

use crate::{report_error, OutputFormat};

/// Read and parse one response file.
pub(crate) fn read_response(path: &Path) -> Result<ParsedResponse, String> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("error reading file '{}': {}", path.display(), e))?;
    let value: serde_json::Value = serde_json::from_str(&content)
        .map_err(|e| format!("error parsing JSON in '{}': {}", path.display(), e))?;
    from_response(&value).map_err(|e| format!("invalid response '{}': {}", path.display(), e))
}

/// Merge every response into a fresh store, in order. Exits on the first
/// unreadable file. Returns the store and the last parsed response.
pub(crate) fn load_store(
    paths: &[PathBuf],
    allow: Option<&FieldAllowList>,
    output: OutputFormat,
    quiet: bool,
) -> (EntityStore, ParsedResponse) {
    let mut store = EntityStore::new();
    let mut last = ParsedResponse::default();
    for path in paths {
        let parsed = match read_response(path) {
            Ok(parsed) => parsed,
            Err(msg) => {
                report_error(&msg, output, quiet);
                process::exit(1);
            }
        };
        let report = store.merge_response(&parsed, allow);
        tracing::debug!(
            file = %path.display(),
            merged = report.merged,
            warnings = parsed.warnings.len(),
            "merged response file"
        );
        last = parsed;
    }
    (store, last)
}
