//! Configuration loading and management.

use std::fmt;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

use ct_core::{
    AggregationConfig, Confidence, ConfigError, EstimatorConfig, Method, ParametricConfig,
    ResamplingConfig, WorkflowConfig,
};
use ct_tracker::DEFAULT_BASE_URL;

/// Application configuration.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Tracker API token.
    pub api_token: Option<String>,
    /// Tracker project to measure.
    pub project_id: Option<u64>,
    /// Tracker API root.
    pub base_url: String,
    /// How many completed iterations to measure.
    pub past_iterations: u32,
    pub confidence: f64,
    pub tracks: usize,
    pub method: Method,
    pub seed: Option<u64>,
    /// Story types that never produce a cycle time.
    pub skip_types: Vec<String>,
    pub requests_per_minute: u32,
    pub burst: u32,
    pub workflow: WorkflowConfig,
    pub parametric: ParametricConfig,
    pub resampling: ResamplingConfig,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("api_token", &self.api_token.as_ref().map(|_| "[REDACTED]"))
            .field("project_id", &self.project_id)
            .field("base_url", &self.base_url)
            .field("past_iterations", &self.past_iterations)
            .field("confidence", &self.confidence)
            .field("tracks", &self.tracks)
            .field("method", &self.method)
            .field("seed", &self.seed)
            .field("skip_types", &self.skip_types)
            .field("requests_per_minute", &self.requests_per_minute)
            .field("burst", &self.burst)
            .field("workflow", &self.workflow)
            .field("parametric", &self.parametric)
            .field("resampling", &self.resampling)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_token: None,
            project_id: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            past_iterations: 3,
            confidence: Confidence::default().value(),
            tracks: 1,
            method: Method::default(),
            seed: None,
            skip_types: AggregationConfig::default().skip_types,
            requests_per_minute: 300,
            burst: 15,
            workflow: WorkflowConfig::default(),
            parametric: ParametricConfig::default(),
            resampling: ResamplingConfig::default(),
        }
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Load from default config location
        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        // Load from specified config file
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // Load from environment variables (CT_*)
        figment = figment.merge(Env::prefixed("CT_"));

        figment.extract()
    }

    /// Checks every setting a command may depend on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.track_count()?;
        self.estimator()?;
        Ok(())
    }

    pub fn track_count(&self) -> Result<NonZeroUsize, ConfigError> {
        NonZeroUsize::new(self.tracks).ok_or(ConfigError::ZeroTracks)
    }

    /// Estimator settings, validated for the selected method.
    pub fn estimator(&self) -> Result<EstimatorConfig, ConfigError> {
        let config = EstimatorConfig {
            method: self.method,
            confidence: Confidence::new(self.confidence)?,
            seed: self.seed,
            parametric: self.parametric,
            resampling: self.resampling,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn aggregation(&self) -> AggregationConfig {
        AggregationConfig {
            skip_types: self.skip_types.clone(),
            workflow: self.workflow.clone(),
        }
    }
}

/// Returns the platform-specific config directory for ct.
///
/// On Linux: `~/.config/ct`
pub fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("ct"))
}
