//! Plan command: spread a batch of stories across parallel tracks.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::io::{BufRead, Write};
use std::num::NonZeroUsize;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use ct_core::{Category, ConfidenceInterval, EstimateKind, Plan, PlanSummary, TrackSet, plan};

use super::util::open_input;

/// Output options for the plan report.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlanOutput {
    pub debug: bool,
    pub json: bool,
}

#[derive(Serialize)]
struct PlanReport<'a> {
    summary: PlanSummary,
    #[serde(flatten)]
    plan: &'a Plan,
}

pub fn run<R: BufRead, W: Write>(
    reader: R,
    writer: &mut W,
    intervals: &BTreeMap<Category, ConfidenceInterval>,
    tracks: NonZeroUsize,
    output: PlanOutput,
) -> Result<()> {
    let items = read_items(reader)?;
    let plan = plan(&items, intervals, tracks).context("failed to plan stories")?;

    if output.json {
        let report = PlanReport {
            summary: plan.summary(),
            plan: &plan,
        };
        serde_json::to_writer_pretty(&mut *writer, &report)?;
        writeln!(writer)?;
    } else {
        write!(writer, "{}", format_plan(&plan, output.debug))?;
    }
    Ok(())
}

/// Loads the intervals produced by `ct estimate`.
pub fn load_intervals(path: &Path) -> Result<BTreeMap<Category, ConfidenceInterval>> {
    let reader = open_input(Some(path))?;
    serde_json::from_reader(reader)
        .with_context(|| format!("failed to parse intervals from {}", path.display()))
}

/// One category per line; blank lines are ignored.
fn read_items<R: BufRead>(reader: R) -> Result<Vec<Category>> {
    let mut items = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line.context("failed to read stories")?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let category = Category::new(line)
            .with_context(|| format!("invalid story on line {}", index + 1))?;
        items.push(category);
    }
    Ok(items)
}

/// Formats the plan as the summary line, optionally followed by every track.
pub fn format_plan(plan: &Plan, debug: bool) -> String {
    let summary = plan.summary();
    let mut output = String::new();
    let _ = writeln!(
        output,
        "Stories should take between {:.2} and {:.2} days (median {:.2} days)",
        summary.optimistic.makespan, summary.pessimistic.makespan, summary.median.makespan
    );

    if debug {
        for kind in [
            EstimateKind::Median,
            EstimateKind::Optimistic,
            EstimateKind::Pessimistic,
        ] {
            format_track_set(&mut output, plan.track_set(kind));
        }
    }
    output
}

fn format_track_set(output: &mut String, set: &TrackSet) {
    let label = match set.kind {
        EstimateKind::Optimistic => "Optimistic",
        EstimateKind::Median => "Median",
        EstimateKind::Pessimistic => "Pessimistic",
    };
    let _ = writeln!(output, "{label} tracks:");
    for (i, track) in set.tracks.iter().enumerate() {
        let _ = writeln!(output, "  Track {} ({:.2} days)", i + 1, track.total);
        for item in &track.items {
            let _ = writeln!(output, "    {item}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use insta::assert_snapshot;

    fn intervals() -> BTreeMap<Category, ConfidenceInterval> {
        serde_json::from_str(
            r#"{
                "feature:3": {"optimistic": 1.0, "pessimistic": 3.0, "median": 2.0},
                "bug:1": {"optimistic": 0.5, "pessimistic": 1.0}
            }"#,
        )
        .unwrap()
    }

    fn tracks(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    fn render(stories: &str, output: PlanOutput) -> String {
        let mut buffer = Vec::new();
        run(stories.as_bytes(), &mut buffer, &intervals(), tracks(2), output).unwrap();
        String::from_utf8(buffer).unwrap()
    }

    #[test]
    fn plan_prints_summary_line() {
        let output = render("feature:3\nbug:1\nfeature:3\n", PlanOutput::default());
        assert_snapshot!(output, @"Stories should take between 1.50 and 4.00 days (median 2.75 days)");
    }

    #[test]
    fn plan_debug_lists_every_track() {
        let output = render(
            "feature:3\n\nbug:1\n  feature:3  \n",
            PlanOutput {
                debug: true,
                json: false,
            },
        );
        assert_snapshot!(output, @r"
Stories should take between 1.50 and 4.00 days (median 2.75 days)
Median tracks:
  Track 1 (2.00 days)
    feature:3
  Track 2 (2.75 days)
    bug:1
    feature:3
Optimistic tracks:
  Track 1 (1.00 days)
    feature:3
  Track 2 (1.50 days)
    bug:1
    feature:3
Pessimistic tracks:
  Track 1 (3.00 days)
    feature:3
  Track 2 (4.00 days)
    bug:1
    feature:3
");
    }

    #[test]
    fn plan_json_includes_summary_and_tracks() {
        let output = render(
            "feature:3\nbug:1\n",
            PlanOutput {
                debug: false,
                json: true,
            },
        );
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["summary"]["pessimistic"]["makespan"], 3.0);
        assert_eq!(value["summary"]["pessimistic"]["lightest"], 1.0);
        assert_eq!(value["optimistic"]["kind"], "optimistic");
        assert_eq!(value["median"]["tracks"][1]["items"][0], "bug:1");
        assert_eq!(value["median"]["tracks"][1]["total"], 0.75);
    }

    #[test]
    fn unknown_story_category_fails() {
        let mut buffer = Vec::new();
        let err = run(
            "feature:3\nspike:2\n".as_bytes(),
            &mut buffer,
            &intervals(),
            tracks(2),
            PlanOutput::default(),
        )
        .unwrap_err();
        assert!(format!("{err:#}").contains("spike:2"));
        assert!(buffer.is_empty());
    }

    #[test]
    fn load_intervals_reads_estimate_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ci.json");
        std::fs::write(
            &path,
            r#"{"chore:0": {"optimistic": 0.1, "pessimistic": 0.4, "median": 0.2}}"#,
        )
        .unwrap();
        let intervals = load_intervals(&path).unwrap();
        assert_eq!(intervals.len(), 1);
        assert_eq!(intervals["chore:0"].median, Some(0.2));
    }
}
