//! Shared utilities for CLI commands.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;

use anyhow::{Context, Result};

use ct_core::CycleTimes;

/// Opens `path` for reading, or stdin when no path is given.
pub fn open_input(path: Option<&Path>) -> Result<Box<dyn BufRead>> {
    match path {
        Some(path) => {
            let file =
                File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
            Ok(Box::new(BufReader::new(file)))
        }
        None => Ok(Box::new(BufReader::new(io::stdin()))),
    }
}

/// Parses a cycle-times document (`{"category": [nanoseconds, ...]}`).
pub fn read_cycle_times<R: Read>(reader: R) -> Result<CycleTimes> {
    let cycle_times: CycleTimes =
        serde_json::from_reader(reader).context("failed to parse cycle times")?;
    tracing::debug!(
        categories = cycle_times.len(),
        samples = cycle_times.total_samples(),
        "loaded cycle times"
    );
    Ok(cycle_times)
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::Duration;

    #[test]
    fn read_cycle_times_accepts_nanoseconds() {
        let json = r#"{"feature:3": [3600000000000, 7200000000000], "bug:0": []}"#;
        let cycle_times = read_cycle_times(json.as_bytes()).unwrap();
        assert_eq!(
            cycle_times.get("feature:3"),
            Some(&[Duration::hours(1), Duration::hours(2)][..])
        );
    }

    #[test]
    fn read_cycle_times_rejects_malformed_input() {
        let err = read_cycle_times("[1, 2]".as_bytes()).unwrap_err();
        assert!(err.to_string().contains("failed to parse cycle times"));
    }

    #[test]
    fn open_input_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.json");
        let Err(err) = open_input(Some(&missing)) else {
            panic!("expected an error");
        };
        assert!(err.to_string().contains("missing.json"));
    }
}
