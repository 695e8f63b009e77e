// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Configuration for the pilot loop.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Errors raised while loading or validating a [`PilotConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
    /// The configuration is not valid JSON for this schema.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
    /// A value is out of range.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Configuration for the pilot loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PilotConfig {
    /// Nominal tick period in milliseconds.
    pub period_ms: u64,
    /// Inference samples dropped at each end of the series before averaging.
    pub trim_samples: usize,
    /// Distance from the start pose under which the finish line is reached.
    pub finish_line_distance: f64,
    /// How long `shutdown` waits for the loop thread to exit.
    pub join_timeout_ms: u64,
    /// Window of the iterations-per-second meter in milliseconds.
    pub rate_window_ms: u64,
}

impl Default for PilotConfig {
    fn default() -> Self {
        Self {
            period_ms: 50,
            trim_samples: 10,
            finish_line_distance: 0.5,
            join_timeout_ms: 1000,
            rate_window_ms: 1000,
        }
    }
}

/// Upper bound accepted for `join_timeout_ms`: one hour.
pub const MAX_JOIN_TIMEOUT_MS: u64 = 60 * 60 * 1000;

impl PilotConfig {
    /// Parses and validates a JSON document. Missing fields take their
    /// default value.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses, and validates a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Checks value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.period_ms == 0 {
            return Err(ConfigError::Invalid("period_ms must be positive".into()));
        }
        if !self.finish_line_distance.is_finite() || self.finish_line_distance <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "finish_line_distance must be a positive number, got {}",
                self.finish_line_distance
            )));
        }
        if self.join_timeout_ms > MAX_JOIN_TIMEOUT_MS {
            return Err(ConfigError::Invalid(format!(
                "join_timeout_ms must be at most {MAX_JOIN_TIMEOUT_MS}, got {}",
                self.join_timeout_ms
            )));
        }
        if self.rate_window_ms == 0 {
            return Err(ConfigError::Invalid("rate_window_ms must be positive".into()));
        }
        Ok(())
    }

    /// The nominal tick period.
    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms)
    }

    /// The shutdown join timeout.
    pub fn join_timeout(&self) -> Duration {
        Duration::from_millis(self.join_timeout_ms)
    }

    /// The rate meter window.
    pub fn rate_window(&self) -> Duration {
        Duration::from_millis(self.rate_window_ms)
    }
}
