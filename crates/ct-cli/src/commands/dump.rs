//! Dump command: every meaningful cycle time, in hours, ascending.

use std::io::{Read, Write};

use anyhow::Result;

use ct_core::{CycleTimes, duration_hours};

use super::util::read_cycle_times;

/// Durations below this many minutes are bookkeeping, not work.
const MIN_MINUTES: i64 = 5;

pub fn run<R: Read, W: Write>(reader: R, writer: &mut W) -> Result<()> {
    let cycle_times = read_cycle_times(reader)?;
    for hours in sorted_hours(&cycle_times) {
        writeln!(writer, "{hours:.3}")?;
    }
    Ok(())
}

fn sorted_hours(cycle_times: &CycleTimes) -> Vec<f64> {
    let mut hours: Vec<f64> = cycle_times
        .iter()
        .flat_map(|(_, durations)| durations.iter().copied())
        .filter(|duration| duration.num_minutes() >= MIN_MINUTES)
        .map(duration_hours)
        .collect();
    hours.sort_by(f64::total_cmp);
    hours
}

#[cfg(test)]
mod tests {
    use super::*;

    use insta::assert_snapshot;

    const MINUTE: i64 = 60_000_000_000;

    #[test]
    fn dump_filters_short_durations_and_sorts_across_categories() {
        let input = serde_json::json!({
            "feature:3": [90 * MINUTE, 4 * MINUTE, 600 * MINUTE],
            "bug:1": [5 * MINUTE, 20 * MINUTE],
            "chore:0": []
        })
        .to_string();

        let mut output = Vec::new();
        run(input.as_bytes(), &mut output).unwrap();

        assert_snapshot!(String::from_utf8(output).unwrap(), @r"
0.083
0.333
1.500
10.000
");
    }

    #[test]
    fn dump_of_empty_document_prints_nothing() {
        let mut output = Vec::new();
        run("{}".as_bytes(), &mut output).unwrap();
        assert!(output.is_empty());
    }
}
