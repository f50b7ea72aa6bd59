//! Configuration management for vel-cmd
//!
//! Handles loading, parsing, clamping and hot-reloading of YAML configuration files.

pub mod watcher;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::fs;

pub use watcher::ConfigWatcher;

use crate::publish::ChannelMode;
use crate::targets::PublishTarget;

/// Root configuration structure
///
/// Every section has defaults, so an empty file is a valid configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub control: ControlConfig,
    #[serde(default)]
    pub publish: PublishConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<TargetConfig>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub topics: Vec<TopicConfig>,
    #[serde(default)]
    pub api: ApiConfig,
}

/// Control loop settings
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct ControlConfig {
    /// Publish rate for both the drive and decay timers
    #[serde(default = "default_publish_rate")]
    pub publish_rate_hz: f64,
    /// Speed published at full vertical deflection
    #[serde(default = "default_max_speed")]
    pub max_linear_speed: f64,
    /// Multiplier for the angular axis
    #[serde(default = "default_max_speed")]
    pub max_angular_speed: f64,
    #[serde(default)]
    pub decay: DecayConfig,
}

/// Decay-to-stop settings
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct DecayConfig {
    /// Fraction of the remaining deflection removed per tick
    #[serde(default = "default_decay_blend")]
    pub blend: f64,
    /// Linear axis magnitude at which decay stops
    #[serde(default = "default_stop_threshold")]
    pub stop_threshold: f64,
}

/// Publisher settings
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct PublishConfig {
    #[serde(default)]
    pub channel_mode: ChannelMode,
    /// Log every published message
    #[serde(default = "default_true")]
    pub console: bool,
}

/// Initially selected publish target (the panel's saved topic)
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TargetConfig {
    pub topic: String,
    pub message_schema: String,
}

/// Known topic available for selection
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TopicConfig {
    pub name: String,
    pub schema: String,
}

/// HTTP/WebSocket API settings
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct ApiConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_api_port")]
    pub port: u16,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            publish_rate_hz: default_publish_rate(),
            max_linear_speed: default_max_speed(),
            max_angular_speed: default_max_speed(),
            decay: DecayConfig::default(),
        }
    }
}

impl ControlConfig {
    /// Clamp requested values into the supported range
    ///
    /// Rate is kept within 1 Hz..=1 kHz, negative maxima become 0.
    pub fn clamped(mut self) -> Self {
        if !(self.publish_rate_hz >= MIN_PUBLISH_RATE_HZ) {
            self.publish_rate_hz = MIN_PUBLISH_RATE_HZ;
        } else if self.publish_rate_hz > MAX_PUBLISH_RATE_HZ {
            self.publish_rate_hz = MAX_PUBLISH_RATE_HZ;
        }
        if !(self.max_linear_speed >= 0.0) {
            self.max_linear_speed = 0.0;
        }
        if !(self.max_angular_speed >= 0.0) {
            self.max_angular_speed = 0.0;
        }
        self
    }

    /// Timer period for the configured publish rate, never below 1 ms
    pub fn publish_period(&self) -> Duration {
        let rate = self.clamped().publish_rate_hz;
        Duration::from_secs_f64(1.0 / rate).max(MIN_PUBLISH_PERIOD)
    }
}

impl DecayConfig {
    /// Whether decay driven by these settings reaches its stop condition
    pub fn is_valid(&self) -> bool {
        self.blend > 0.0
            && self.blend <= 1.0
            && self.stop_threshold > 0.0
            && self.stop_threshold.is_finite()
    }

    /// Replace settings that would never stop decaying with the defaults
    pub fn sanitized(self) -> Self {
        let defaults = Self::default();
        Self {
            blend: if self.blend > 0.0 && self.blend <= 1.0 {
                self.blend
            } else {
                defaults.blend
            },
            stop_threshold: if self.stop_threshold > 0.0 && self.stop_threshold.is_finite() {
                self.stop_threshold
            } else {
                defaults.stop_threshold
            },
        }
    }
}

impl Default for DecayConfig {
    fn default() -> Self {
        Self {
            blend: default_decay_blend(),
            stop_threshold: default_stop_threshold(),
        }
    }
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            channel_mode: ChannelMode::default(),
            console: true,
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: default_api_port(),
        }
    }
}

impl From<&TargetConfig> for PublishTarget {
    fn from(target: &TargetConfig) -> Self {
        PublishTarget::new(target.topic.clone(), target.message_schema.clone())
    }
}

impl From<&TopicConfig> for PublishTarget {
    fn from(topic: &TopicConfig) -> Self {
        PublishTarget::new(topic.name.clone(), topic.schema.clone())
    }
}

impl AppConfig {
    /// Load configuration from file, clamp control values and validate
    pub async fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {}", path))?;

        Self::from_yaml(&contents).with_context(|| format!("Invalid config file: {}", path))
    }

    /// Parse, clamp and validate a YAML document
    pub fn from_yaml(contents: &str) -> Result<Self> {
        // serde_yaml rejects an empty document, treat it as all defaults
        let mut config: AppConfig = if contents.trim().is_empty() {
            AppConfig::default()
        } else {
            serde_yaml::from_str(contents).context("Failed to parse YAML config")?
        };

        config.control = config.control.clamped();
        config.validate()?;

        Ok(config)
    }

    /// Save configuration to file
    pub async fn save(&self, path: &str) -> Result<()> {
        let yaml = serde_yaml::to_string(self).context("Failed to serialize config to YAML")?;

        fs::write(path, yaml)
            .await
            .with_context(|| format!("Failed to write config file: {}", path))?;

        Ok(())
    }

    /// Validate configuration for correctness and consistency
    pub fn validate(&self) -> Result<()> {
        let control = &self.control;
        if !(MIN_PUBLISH_RATE_HZ..=MAX_PUBLISH_RATE_HZ).contains(&control.publish_rate_hz) {
            anyhow::bail!(
                "control.publish_rate_hz must be between {} and {} Hz, got {}",
                MIN_PUBLISH_RATE_HZ,
                MAX_PUBLISH_RATE_HZ,
                control.publish_rate_hz
            );
        }
        if !control.max_linear_speed.is_finite() || !control.max_angular_speed.is_finite() {
            anyhow::bail!("control max speeds must be finite");
        }

        let decay = &control.decay;
        if !(decay.blend > 0.0 && decay.blend <= 1.0) {
            anyhow::bail!(
                "control.decay.blend must be in (0, 1], got {}",
                decay.blend
            );
        }
        if !(decay.stop_threshold > 0.0 && decay.stop_threshold.is_finite()) {
            anyhow::bail!(
                "control.decay.stop_threshold must be positive, got {}",
                decay.stop_threshold
            );
        }

        if let Some(target) = &self.target {
            if target.topic.is_empty() {
                anyhow::bail!("target.topic cannot be empty");
            }
        }

        for (idx, topic) in self.topics.iter().enumerate() {
            if topic.name.is_empty() {
                anyhow::bail!("Topic {} name cannot be empty", idx);
            }
        }

        if self.api.enabled && self.api.port == 0 {
            anyhow::bail!("api.port cannot be 0 when the API is enabled");
        }

        Ok(())
    }

    /// Initial publish target from the saved topic, if any
    pub fn initial_target(&self) -> Option<PublishTarget> {
        self.target.as_ref().map(PublishTarget::from)
    }

    /// Known topics as publish targets
    pub fn known_topics(&self) -> Vec<PublishTarget> {
        self.topics.iter().map(PublishTarget::from).collect()
    }
}

/// Lowest accepted publish rate
pub const MIN_PUBLISH_RATE_HZ: f64 = 1.0;

/// Highest accepted publish rate
pub const MAX_PUBLISH_RATE_HZ: f64 = 1000.0;

/// Shortest timer period handed to the scheduler
pub const MIN_PUBLISH_PERIOD: Duration = Duration::from_millis(1);

// Default value functions
fn default_publish_rate() -> f64 { 5.0 }
fn default_max_speed() -> f64 { 1.0 }
fn default_decay_blend() -> f64 { crate::control::decay::DEFAULT_BLEND }
fn default_stop_threshold() -> f64 { crate::control::decay::DEFAULT_STOP_THRESHOLD }
fn default_true() -> bool { true }
fn default_api_port() -> u16 { crate::api::DEFAULT_API_PORT }
