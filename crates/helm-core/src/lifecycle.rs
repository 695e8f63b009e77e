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

//! Contracts between the pilot and the code that owns its lifecycle.

use crate::decision::DecisionStep;
use crate::metrics::MetricsSummary;
use crate::state::LoopState;
use std::sync::Arc;

/// Receives the summary of every finished run segment.
///
/// Called on the pilot's loop thread. Errors are logged by the pilot and the
/// summary is dropped.
pub trait MetricsSink: Send + Sync {
    /// Consumes one summary.
    fn on_segment_metrics(&self, summary: &MetricsSummary) -> anyhow::Result<()>;
}

/// Commands accepted by a running pilot.
///
/// Every method only flips state; none waits for the loop thread.
pub trait PilotControl: Send + Sync {
    /// Starts the loop thread if needed and resumes execution.
    ///
    /// Returns `false` if the pilot has been killed.
    fn play(&self) -> bool;

    /// Suspends execution at the next tick.
    fn pause(&self);

    /// Terminates the loop at its next tick. Irreversible.
    fn kill(&self);

    /// Swaps the active decision step. `None` unloads it.
    ///
    /// A segment ended by an earlier `pause` is summarised with the old step
    /// before the swap takes effect.
    fn reload(&self, step: Option<Box<dyn DecisionStep>>);

    /// The current state.
    fn state(&self) -> LoopState;
}

/// The owner of a pilot: issues commands and collects metrics.
pub trait LifecycleController: Send + Sync {
    /// The sink that receives segment metrics, when one is configured.
    fn metrics_sink(&self) -> Option<&dyn MetricsSink> {
        None
    }

    /// Back-registration: called once when the controller is attached.
    fn set_pilot(&self, pilot: Arc<dyn PilotControl>);
}

/// Output devices that must be stopped when the pilot is killed.
pub trait Actuators: Send + Sync {
    /// Brings every actuator to a safe, inactive state.
    fn deactivate(&self);
}
