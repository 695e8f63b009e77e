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

//! # Helm Core
//!
//! Foundational crate containing the traits, core types, and interface
//! contracts shared by the pilot loop, its telemetry, and the code that
//! drives it.
//!
//! The crate defines the abstract "what": a clock the loop can query, the
//! decision step it invokes each tick, the controller that receives its
//! metrics. `helm-control` provides the loop itself and `helm-telemetry` the
//! aggregation of its measurements.

#![warn(missing_docs)]

pub mod clock;
pub mod decision;
pub mod lifecycle;
pub mod metrics;
pub mod pose;
pub mod state;

pub use clock::{ClockSource, SimulatedClock, WallClock};
pub use decision::{DecisionError, DecisionStep, FirstOutput};
pub use lifecycle::{Actuators, LifecycleController, MetricsSink, PilotControl};
pub use metrics::{IterationSample, MetricsSummary};
pub use pose::{Point2, PoseCell, PoseSource};
pub use state::{AtomicLoopState, LoopState};
