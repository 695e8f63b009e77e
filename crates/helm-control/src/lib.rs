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

//! The pilot: a fixed-rate loop that drives a robot's decision step on a
//! dedicated thread, accepts pause/resume/kill/reload commands from any other
//! thread, and summarises the timing of every run segment.

#![warn(missing_docs)]

pub mod config;
pub mod finish;
pub mod handle;
pub mod pilot;

pub use config::{ConfigError, PilotConfig};
pub use finish::FinishLine;
pub use handle::PilotHandle;
pub use pilot::{sleep_budget, Pilot};
