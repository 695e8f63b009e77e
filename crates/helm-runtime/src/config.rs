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

//! The runtime's configuration file.

use anyhow::{Context as _, Result};
use helm_control::PilotConfig;
use helm_core::Point2;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Everything the runtime reads from its JSON configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub pilot: PilotConfig,
    pub experiment: ExperimentConfig,
    pub brain: BrainConfig,
    pub simulation: SimulationConfig,
}

/// Describes the experiment being run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    pub name: Option<String>,
    pub description: Option<String>,
    pub world: String,
    pub brain_path: String,
    pub robot_type: String,
    pub model: Option<String>,
    pub repetition: Option<u32>,
    /// Wall-clock length of the run in seconds.
    pub duration_secs: f64,
    /// Ends the run early once the robot completes a lap.
    pub stop_on_lap: bool,
    pub start_pose: Point2,
    /// Where metrics documents are written. No metrics are stored when unset.
    pub metrics_dir: Option<PathBuf>,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            name: None,
            description: None,
            world: "simple_circuit.world".into(),
            brain_path: "brains/synthetic/circle_brain".into(),
            robot_type: "f1".into(),
            model: None,
            repetition: None,
            duration_secs: 10.0,
            stop_on_lap: true,
            start_pose: Point2::ZERO,
            metrics_dir: None,
        }
    }
}

impl ExperimentConfig {
    /// The run length. Saturates for values too large to represent.
    pub fn duration(&self) -> Duration {
        Duration::try_from_secs_f64(self.duration_secs.max(0.0)).unwrap_or(Duration::MAX)
    }
}

/// Behaviour of the synthetic decision step.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrainConfig {
    /// Mean inference latency in milliseconds.
    pub latency_ms: f64,
    /// Amplitude of the latency variation in milliseconds.
    pub jitter_ms: f64,
    /// Distance travelled per decision.
    pub speed: f64,
    /// Heading change per decision, in radians.
    pub turn_rate: f64,
    pub hardware_acceleration: bool,
}

impl Default for BrainConfig {
    fn default() -> Self {
        Self {
            latency_ms: 12.0,
            jitter_ms: 4.0,
            speed: 0.1,
            turn_rate: 0.05,
            hardware_acceleration: false,
        }
    }
}

/// The simulated clock feeding the pilot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Simulated seconds per wall-clock second.
    pub real_time_factor: f64,
    /// How often a clock event is published, in milliseconds.
    pub publish_interval_ms: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            real_time_factor: 1.0,
            publish_interval_ms: 10,
        }
    }
}

impl RuntimeConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).context("parsing runtime configuration")?;
        config.pilot.validate()?;
        anyhow::ensure!(
            config.simulation.real_time_factor.is_finite() && config.simulation.real_time_factor > 0.0,
            "real_time_factor must be positive"
        );
        anyhow::ensure!(
            config.simulation.publish_interval_ms > 0,
            "publish_interval_ms must be positive"
        );
        anyhow::ensure!(
            Duration::try_from_secs_f64(config.experiment.duration_secs).is_ok(),
            "duration_secs must be a non-negative number of seconds, got {}",
            config.experiment.duration_secs
        );
        let brain = &config.brain;
        anyhow::ensure!(
            Duration::try_from_secs_f64((brain.latency_ms + brain.jitter_ms.abs()) / 1000.0).is_ok(),
            "latency_ms and jitter_ms must describe a representable delay"
        );
        anyhow::ensure!(
            brain.speed.is_finite() && brain.turn_rate.is_finite(),
            "speed and turn_rate must be finite"
        );
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        Self::from_json_str(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_gives_defaults() {
        let config = RuntimeConfig::from_json_str("{}").unwrap();
        assert_eq!(config.pilot, PilotConfig::default());
        assert_eq!(config.experiment.duration(), Duration::from_secs(10));
        assert!(config.experiment.metrics_dir.is_none());
    }

    #[test]
    fn test_nested_sections() {
        let config = RuntimeConfig::from_json_str(
            r#"{
                "pilot": { "period_ms": 40 },
                "experiment": { "name": "lap-test", "metrics_dir": "out", "start_pose": { "x": 1.0, "y": 2.0 } },
                "brain": { "latency_ms": 5.0, "hardware_acceleration": true },
                "simulation": { "real_time_factor": 0.5 }
            }"#,
        )
        .unwrap();
        assert_eq!(config.pilot.period_ms, 40);
        assert_eq!(config.experiment.name.as_deref(), Some("lap-test"));
        assert_eq!(config.experiment.metrics_dir, Some(PathBuf::from("out")));
        assert_eq!(config.experiment.start_pose, Point2::new(1.0, 2.0));
        assert!(config.brain.hardware_acceleration);
        assert_eq!(config.brain.speed, 0.1);
        assert_eq!(config.simulation.real_time_factor, 0.5);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(RuntimeConfig::from_json_str(r#"{ "pilot": { "period_ms": 0 } }"#).is_err());
        assert!(
            RuntimeConfig::from_json_str(r#"{ "simulation": { "real_time_factor": 0.0 } }"#)
                .is_err()
        );
    }

    #[test]
    fn test_unrepresentable_durations_rejected() {
        for json in [
            r#"{ "experiment": { "duration_secs": 1e300 } }"#,
            r#"{ "experiment": { "duration_secs": -1.0 } }"#,
            r#"{ "brain": { "latency_ms": 1e300 } }"#,
            r#"{ "brain": { "jitter_ms": 1e300 } }"#,
        ] {
            assert!(RuntimeConfig::from_json_str(json).is_err(), "{json}");
        }
    }

    #[test]
    fn test_duration_saturates() {
        let experiment = ExperimentConfig {
            duration_secs: f64::INFINITY,
            ..Default::default()
        };
        assert_eq!(experiment.duration(), Duration::MAX);
    }
}
