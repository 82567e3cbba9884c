//! Estimate command: cycle times in, per-category confidence intervals out.

use std::io::{Read, Write};

use anyhow::{Context, Result};

use ct_core::{EstimatorConfig, estimate_all};

use super::util::read_cycle_times;

pub fn run<R: Read, W: Write>(reader: R, writer: &mut W, config: &EstimatorConfig) -> Result<()> {
    let cycle_times = read_cycle_times(reader)?;
    tracing::debug!(
        method = ?config.method,
        confidence = %config.confidence,
        seed = ?config.seed,
        "estimating"
    );

    let intervals = estimate_all(&cycle_times, config).context("failed to estimate intervals")?;

    serde_json::to_writer_pretty(&mut *writer, &intervals)?;
    writeln!(writer)?;
    Ok(())
}
