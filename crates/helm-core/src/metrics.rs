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

//! Timing samples and the per-segment summary built from them.

use crate::decision::FirstOutput;
use serde::{Serialize, Serializer};
use std::time::Duration;

/// Timing of one successful loop iteration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IterationSample {
    /// Wall-clock duration of the whole tick, sleep included.
    pub wall_duration: Duration,
    /// Duration measured on the external clock, in seconds.
    ///
    /// `None` when the clock had no reading at the start or end of the tick.
    pub external_duration: Option<f64>,
}

impl IterationSample {
    /// Creates a sample.
    pub fn new(wall_duration: Duration, external_duration: Option<f64>) -> Self {
        Self {
            wall_duration,
            external_duration,
        }
    }
}

/// Summary statistics of one run segment.
///
/// All times are in seconds. Produced once when a segment ends and never
/// modified afterwards.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MetricsSummary {
    /// 1-based index of the segment within the pilot's lifetime.
    pub segment: u64,
    /// Number of successful iterations the segment covered.
    ///
    /// An iteration only counts if the pilot is still running once its tick
    /// has slept. The tick during which `pause` or `kill` lands is dropped,
    /// so this is usually one less than the number of successful
    /// `execute()` calls, and a segment with a single iteration produces no
    /// summary at all.
    pub iterations: usize,
    /// Mean wall-clock duration of an iteration.
    pub mean_iteration_time: f64,
    /// Mean external-clock duration of an iteration.
    pub mean_external_iteration_time: f64,
    /// Mean inference latency over the trimmed samples.
    pub mean_inference_time: f64,
    /// Inferences per second over the trimmed samples.
    pub inference_frame_rate: f64,
    /// Whether inference ran on an accelerator.
    pub used_hardware_acceleration: bool,
    /// The decision step's first output.
    #[serde(rename = "has_first_output", serialize_with = "serialize_presence")]
    pub first_output: Option<FirstOutput>,
}

fn serialize_presence<S: Serializer>(
    value: &Option<FirstOutput>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_bool(value.is_some())
}
