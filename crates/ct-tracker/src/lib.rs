//! Tracker API integration for cycle time estimation.
//!
//! Provides:
//! - Iteration membership: the stories of recently completed iterations
//! - Story history: chronological state transitions from a story's activity
//!
//! All requests share one bursty [`RateLimiter`].

mod ratelimit;

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ct_core::cycle_time::UNCREATED;
use ct_core::{FetchError, Item, TransitionEvent, TransitionSource};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

pub use ratelimit::RateLimiter;

/// Default request timeout for API calls.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_BASE_URL: &str = "https://www.pivotaltracker.com/services/v5";
const TOKEN_HEADER: &str = "X-TrackerToken";
const ACTIVITY_LIMIT: &str = "500";
const STORY_FIELDS: &str = "stories(id,story_type,estimate)";
const ACTIVITY_FIELDS: &str = "occurred_at,changes";

/// Tracker client errors.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// The provided API token was invalid.
    #[error("invalid API token: {reason}")]
    InvalidToken { reason: &'static str },
    /// The rate limit allows no requests.
    #[error("rate limit must allow at least one request")]
    InvalidRateLimit,
    /// Failed to build HTTP client.
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),
    /// HTTP request failed.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// API returned an error response.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },
    /// Failed to parse response.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Tracker API client for one project.
///
/// # Thread Safety
///
/// The client is `Send + Sync` and is meant to be shared behind an `Arc`
/// by concurrent fetch tasks.
pub struct Client {
    http: reqwest::Client,
    token: String,
    project_id: u64,
    base_url: String,
    limiter: RateLimiter,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("token", &"[REDACTED]")
            .field("project_id", &self.project_id)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Creates a new client with the given API token.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is empty or whitespace-only, if the
    /// rate limit is zero, or if the HTTP client fails to build.
    pub fn new(
        token: impl Into<String>,
        project_id: u64,
        requests_per_minute: u32,
        burst: u32,
    ) -> Result<Self, TrackerError> {
        let token = token.into();

        if token.is_empty() {
            return Err(TrackerError::InvalidToken {
                reason: "API token cannot be empty",
            });
        }
        if token.trim().is_empty() {
            return Err(TrackerError::InvalidToken {
                reason: "API token cannot be whitespace-only",
            });
        }

        let limiter =
            RateLimiter::new(requests_per_minute, burst).ok_or(TrackerError::InvalidRateLimit)?;

        let http = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(TrackerError::ClientBuild)?;

        Ok(Self {
            http,
            token,
            project_id,
            base_url: DEFAULT_BASE_URL.to_string(),
            limiter,
        })
    }

    /// Points the client at a different API root.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Stories of the last `past` completed iterations.
    pub async fn stories_from_past_iterations(&self, past: u32) -> Result<Vec<Item>, TrackerError> {
        let url = format!("{}/projects/{}/iterations", self.base_url, self.project_id);
        let offset = format!("-{past}");
        let iterations: Vec<Iteration> = self
            .get(
                &url,
                &[
                    ("scope", "done"),
                    ("offset", offset.as_str()),
                    ("fields", STORY_FIELDS),
                ],
            )
            .await?;

        let stories: Vec<Item> = iterations
            .into_iter()
            .flat_map(|iteration| iteration.stories)
            .collect();
        tracing::debug!(stories = stories.len(), past, "loaded iteration membership");
        Ok(stories)
    }

    /// State transitions of a story, oldest first.
    pub async fn story_transitions(
        &self,
        story_id: u64,
    ) -> Result<Vec<TransitionEvent>, TrackerError> {
        let url = format!(
            "{}/projects/{}/stories/{story_id}/activity",
            self.base_url, self.project_id
        );
        let activity: Vec<ActivityItem> = self
            .get(&url, &[("limit", ACTIVITY_LIMIT), ("fields", ACTIVITY_FIELDS)])
            .await?;
        Ok(transitions_from_activity(activity))
    }

    async fn get<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T, TrackerError> {
        self.limiter.acquire().await;

        let response = self
            .http
            .get(url)
            .header(TOKEN_HEADER, &self.token)
            .query(query)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(parse_api_error(status.as_u16(), &body).unwrap_or_else(|| {
                TrackerError::Api {
                    status: status.as_u16(),
                    message: body,
                }
            }));
        }

        serde_json::from_str(&body).map_err(|err| TrackerError::InvalidResponse(err.to_string()))
    }
}

#[async_trait]
impl TransitionSource for Client {
    async fn transitions(&self, item_id: u64) -> Result<Vec<TransitionEvent>, FetchError> {
        self.story_transitions(item_id).await.map_err(FetchError::new)
    }
}

#[derive(Debug, Deserialize)]
struct Iteration {
    #[serde(default)]
    stories: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct ActivityItem {
    occurred_at: DateTime<Utc>,
    #[serde(default)]
    changes: Vec<ActivityChange>,
}

#[derive(Debug, Deserialize)]
struct ActivityChange {
    kind: String,
    #[serde(default)]
    original_values: Option<HashMap<String, Value>>,
    #[serde(default)]
    new_values: Option<HashMap<String, Value>>,
}

impl ActivityChange {
    fn state(values: Option<&HashMap<String, Value>>) -> Option<&str> {
        values?.get("current_state")?.as_str()
    }
}

/// Activity arrives newest first; transitions are returned oldest first.
fn transitions_from_activity(activity: Vec<ActivityItem>) -> Vec<TransitionEvent> {
    let mut transitions = Vec::new();
    for item in activity.into_iter().rev() {
        for change in item.changes.iter().filter(|c| c.kind == "story") {
            let Some(to_state) = ActivityChange::state(change.new_values.as_ref()) else {
                continue;
            };
            let from_state =
                ActivityChange::state(change.original_values.as_ref()).unwrap_or(UNCREATED);
            transitions.push(TransitionEvent::new(from_state, to_state, item.occurred_at));
        }
    }
    transitions
}

fn parse_api_error(status: u16, body: &str) -> Option<TrackerError> {
    #[derive(Deserialize)]
    struct ErrorPayload {
        error: String,
    }

    serde_json::from_str::<ErrorPayload>(body)
        .ok()
        .map(|payload| TrackerError::Api {
            status,
            message: payload.error,
        })
}
