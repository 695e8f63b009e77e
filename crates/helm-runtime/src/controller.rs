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

//! The experiment-side owner of the pilot.

use crate::config::ExperimentConfig;
use helm_core::{
    DecisionStep, LifecycleController, LoopState, MetricsSink, MetricsSummary, PilotControl,
};
use helm_telemetry::JsonFileSink;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Descriptive fields stored next to every metrics document.
#[derive(Debug, Clone, Serialize)]
pub struct ExperimentMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub world: String,
    pub brain_path: String,
    pub robot_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repetition: Option<u32>,
}

impl From<&ExperimentConfig> for ExperimentMetadata {
    fn from(config: &ExperimentConfig) -> Self {
        Self {
            name: config.name.clone(),
            description: config.description.clone(),
            world: config.world.clone(),
            brain_path: config.brain_path.clone(),
            robot_type: config.robot_type.clone(),
            model: config.model.clone(),
            repetition: config.repetition,
        }
    }
}

/// Keeps every summary in memory and forwards it to a JSON file sink.
struct ExperimentSink {
    files: JsonFileSink,
    history: Mutex<Vec<MetricsSummary>>,
}

impl MetricsSink for ExperimentSink {
    fn on_segment_metrics(&self, summary: &MetricsSummary) -> anyhow::Result<()> {
        lock(&self.history).push(summary.clone());
        self.files.on_segment_metrics(summary)
    }
}

/// Drives a pilot through an experiment and stores its metrics.
///
/// Metrics are only collected when the experiment names a `metrics_dir`.
pub struct ExperimentController {
    metadata: ExperimentMetadata,
    sink: Option<ExperimentSink>,
    pilot: Mutex<Option<Arc<dyn PilotControl>>>,
    created_at: Instant,
}

impl ExperimentController {
    pub fn new(config: &ExperimentConfig) -> anyhow::Result<Self> {
        let metadata = ExperimentMetadata::from(config);
        let sink = match &config.metrics_dir {
            Some(dir) => Some(ExperimentSink {
                files: JsonFileSink::new(dir.clone(), serde_json::to_value(&metadata)?),
                history: Mutex::new(Vec::new()),
            }),
            None => None,
        };
        Ok(Self {
            metadata,
            sink,
            pilot: Mutex::new(None),
            created_at: Instant::now(),
        })
    }

    pub fn metadata(&self) -> &ExperimentMetadata {
        &self.metadata
    }

    pub fn metrics_dir(&self) -> Option<PathBuf> {
        self.sink.as_ref().map(|s| s.files.dir().to_path_buf())
    }

    fn with_pilot<R>(&self, f: impl FnOnce(&dyn PilotControl) -> R) -> Option<R> {
        let pilot = lock(&self.pilot).clone();
        match pilot {
            Some(pilot) => Some(f(pilot.as_ref())),
            None => {
                log::warn!("ExperimentController: no pilot attached");
                None
            }
        }
    }

    pub fn resume_pilot(&self) -> bool {
        self.with_pilot(|p| p.play()).unwrap_or(false)
    }

    pub fn pause_pilot(&self) {
        self.with_pilot(|p| p.pause());
    }

    pub fn stop_pilot(&self) {
        self.with_pilot(|p| p.kill());
    }

    /// Pauses the pilot, then swaps its decision step.
    ///
    /// The segment ended by the pause is summarised with the old step.
    pub fn reload_brain(&self, step: Option<Box<dyn DecisionStep>>) {
        self.with_pilot(move |p| {
            p.pause();
            p.reload(step);
        });
    }

    pub fn pilot_state(&self) -> Option<LoopState> {
        self.with_pilot(|p| p.state())
    }

    /// Wall-clock time since the controller was created.
    pub fn total_real_time(&self) -> Duration {
        self.created_at.elapsed()
    }

    /// Summaries received so far, oldest first.
    pub fn history(&self) -> Vec<MetricsSummary> {
        self.sink
            .as_ref()
            .map(|s| lock(&s.history).clone())
            .unwrap_or_default()
    }
}

impl LifecycleController for ExperimentController {
    fn metrics_sink(&self) -> Option<&dyn MetricsSink> {
        self.sink.as_ref().map(|s| s as &dyn MetricsSink)
    }

    fn set_pilot(&self, pilot: Arc<dyn PilotControl>) {
        log::debug!("ExperimentController: pilot attached");
        *lock(&self.pilot) = Some(pilot);
    }
}
