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

//! Telemetry for the pilot loop: raw sample storage, the reduction of a run
//! segment into a [`MetricsSummary`](helm_core::MetricsSummary), and stock
//! sinks for delivering it.

#![warn(missing_docs)]

pub mod aggregator;
pub mod iteration_log;
pub mod rate;
pub mod sink;
pub mod stats;

pub use aggregator::{AggregateError, InferenceStats, MetricsAggregator, DEFAULT_TRIM};
pub use iteration_log::IterationLog;
pub use rate::RateMeter;
pub use sink::{ChannelSink, JsonFileSink};
