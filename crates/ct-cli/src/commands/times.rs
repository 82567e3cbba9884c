//! Times command: measure the cycle times of recently completed stories.

use std::io::Write;
use std::sync::Arc;

use anyhow::{Context, Result};

use ct_core::{Aggregation, AggregationConfig, Item, TransitionSource, collect_cycle_times};
use ct_tracker::Client;

use crate::Config;

pub fn run<W: Write>(writer: &mut W, config: &Config) -> Result<()> {
    let api_token = config
        .api_token
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| {
            anyhow::anyhow!("missing tracker API token (set CT_API_TOKEN or config.toml)")
        })?;
    let project_id = config.project_id.ok_or_else(|| {
        anyhow::anyhow!("missing tracker project (set CT_PROJECT_ID or config.toml)")
    })?;

    let client = Client::new(
        api_token,
        project_id,
        config.requests_per_minute,
        config.burst,
    )
    .context("failed to create tracker client")?
    .with_base_url(config.base_url.as_str());
    let client = Arc::new(client);

    let runtime = tokio::runtime::Runtime::new().context("failed to initialize tokio runtime")?;
    let aggregation = runtime.block_on(async {
        let items = client
            .stories_from_past_iterations(config.past_iterations)
            .await
            .context("failed to fetch iteration stories")?;
        anyhow::Ok(measure(client, &items, &config.aggregation()).await)
    })?;

    write_cycle_times(writer, &aggregation)
}

/// Measures `items` through `source`.
pub async fn measure<S>(source: Arc<S>, items: &[Item], config: &AggregationConfig) -> Aggregation
where
    S: TransitionSource + ?Sized + 'static,
{
    tracing::info!(items = items.len(), "measuring cycle times");
    collect_cycle_times(source, items, config).await
}

fn write_cycle_times<W: Write>(writer: &mut W, aggregation: &Aggregation) -> Result<()> {
    if aggregation.failed > 0 {
        tracing::warn!(
            failed = aggregation.failed,
            "some stories could not be fetched and were left out"
        );
    }
    serde_json::to_writer_pretty(&mut *writer, &aggregation.cycle_times)?;
    writeln!(writer)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashMap;

    use async_trait::async_trait;
    use chrono::{DateTime, TimeZone, Utc};
    use ct_core::{FetchError, TransitionEvent};

    struct StubSource(HashMap<u64, Vec<TransitionEvent>>);

    #[async_trait]
    impl TransitionSource for StubSource {
        async fn transitions(&self, item_id: u64) -> Result<Vec<TransitionEvent>, FetchError> {
            self.0
                .get(&item_id)
                .cloned()
                .ok_or_else(|| FetchError::new("not found"))
        }
    }

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 4, hour, 0, 0).unwrap()
    }

    #[test]
    fn missing_token_is_reported() {
        let mut output = Vec::new();
        let err = run(&mut output, &Config::default()).unwrap_err();
        assert!(err.to_string().contains("missing tracker API token"));

        let config = Config {
            api_token: Some("token".to_string()),
            ..Config::default()
        };
        let err = run(&mut output, &config).unwrap_err();
        assert!(err.to_string().contains("missing tracker project"));
    }

    #[tokio::test]
    async fn measured_stories_are_written_as_nanoseconds() {
        let source = StubSource(HashMap::from([
            (
                1,
                vec![
                    TransitionEvent::new("uncreated", "unstarted", at(1)),
                    TransitionEvent::new("unstarted", "started", at(2)),
                    TransitionEvent::new("started", "accepted", at(5)),
                ],
            ),
            (2, vec![TransitionEvent::new("uncreated", "started", at(1))]),
        ]));
        let items = [
            Item {
                id: 1,
                kind: "feature".to_string(),
                estimate: Some(2),
            },
            Item {
                id: 2,
                kind: "feature".to_string(),
                estimate: Some(2),
            },
            Item {
                id: 3,
                kind: "release".to_string(),
                estimate: None,
            },
        ];

        let aggregation = measure(Arc::new(source), &items, &Config::default().aggregation()).await;
        assert_eq!(aggregation.accepted, 1);
        assert_eq!(aggregation.rejected, 1);
        assert_eq!(aggregation.skipped, 1);

        let mut output = Vec::new();
        write_cycle_times(&mut output, &aggregation).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&output).unwrap();
        assert_eq!(value, serde_json::json!({ "feature:2": [3 * 3_600_000_000_000_i64] }));
    }
}
