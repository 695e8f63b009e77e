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

//! Reduction of a finished run segment into a [`MetricsSummary`].
//!
//! Inference latencies come from the decision step and are trimmed at both
//! ends to drop warm-up and cool-down outliers before averaging. Iteration
//! times come from the pilot's own [`IterationLog`]. Neither path ever fails
//! the summary: missing or unusable data degrades to zeros.

use crate::iteration_log::IterationLog;
use crate::stats;
use helm_core::{DecisionStep, MetricsSummary};

/// Samples dropped at each end of the inference series by default.
pub const DEFAULT_TRIM: usize = 10;

/// Why inference statistics could not be computed.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AggregateError {
    /// Too few samples survive trimming.
    #[error("not enough inference samples: have {available}, need {required}")]
    InsufficientData {
        /// Samples available before trimming.
        available: usize,
        /// Minimum sample count for at least one to survive.
        required: usize,
    },
    /// The samples produced a value that is not a finite positive number.
    #[error("invalid {0}")]
    NonFinite(&'static str),
}

/// Latency statistics over the trimmed inference samples.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InferenceStats {
    /// Mean latency in seconds.
    pub mean_inference_time: f64,
    /// Inferences per second.
    pub frame_rate: f64,
    /// Number of samples that survived trimming.
    pub samples: usize,
}

/// Turns raw timing samples into a per-segment summary.
#[derive(Debug, Clone, Copy)]
pub struct MetricsAggregator {
    trim: usize,
}

impl MetricsAggregator {
    /// Creates an aggregator that drops `trim` samples at each end of the
    /// inference series.
    pub fn new(trim: usize) -> Self {
        Self { trim }
    }

    /// Samples dropped at each end.
    pub fn trim(&self) -> usize {
        self.trim
    }

    /// Mean latency and frame rate over the trimmed `samples`.
    pub fn inference_stats(&self, samples: &[f64]) -> Result<InferenceStats, AggregateError> {
        let kept = stats::trimmed(samples, self.trim)?;
        let total: f64 = kept.iter().sum();
        if !total.is_finite() || total <= 0.0 {
            return Err(AggregateError::NonFinite("total inference time"));
        }
        Ok(InferenceStats {
            mean_inference_time: total / kept.len() as f64,
            frame_rate: kept.len() as f64 / total,
            samples: kept.len(),
        })
    }

    /// Builds the summary of segment number `segment`.
    ///
    /// `step` is the decision step active when the segment ended, if any.
    pub fn summarize(
        &self,
        step: Option<&dyn DecisionStep>,
        log: &IterationLog,
        segment: u64,
    ) -> MetricsSummary {
        let mut summary = MetricsSummary {
            segment,
            iterations: log.len(),
            mean_iteration_time: log.mean_wall(),
            mean_external_iteration_time: log.mean_external(),
            ..Default::default()
        };

        match step {
            None => log::info!("Aggregator: no decision step active"),
            Some(step) => match self.inference_stats(step.inference_samples()) {
                Ok(inference) => {
                    summary.mean_inference_time = inference.mean_inference_time;
                    summary.inference_frame_rate = inference.frame_rate;
                    summary.used_hardware_acceleration = step.used_hardware_acceleration();
                    summary.first_output = step.first_output();
                    log::info!(
                        "Aggregator: mean inference time -> {:.6} s",
                        inference.mean_inference_time
                    );
                    log::info!("Aggregator: frame rate -> {:.2} fps", inference.frame_rate);
                }
                Err(e @ AggregateError::InsufficientData { .. }) => {
                    log::info!("Aggregator: no decision step active ({e})");
                }
                Err(e) => {
                    log::error!("Aggregator: {e} from '{}'", step.name());
                }
            },
        }

        if log.is_empty() {
            log::debug!("Aggregator: segment {segment} has no successful iterations");
        }
        log::info!(
            "Aggregator: mean iteration time -> {:.6} s",
            summary.mean_iteration_time
        );
        log::info!(
            "Aggregator: mean external iteration time -> {:.6} s",
            summary.mean_external_iteration_time
        );

        summary
    }
}

impl Default for MetricsAggregator {
    fn default() -> Self {
        Self::new(DEFAULT_TRIM)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use helm_core::{DecisionError, FirstOutput, IterationSample};
    use std::time::Duration;

    struct RecordedStep {
        samples: Vec<f64>,
        gpu: bool,
    }

    impl DecisionStep for RecordedStep {
        fn execute(&mut self) -> Result<(), DecisionError> {
            Ok(())
        }
        fn inference_samples(&self) -> &[f64] {
            &self.samples
        }
        fn used_hardware_acceleration(&self) -> bool {
            self.gpu
        }
        fn first_output(&self) -> Option<FirstOutput> {
            Some(FirstOutput::new("frame-0"))
        }
    }

    /// 10 warm-up outliers, `middle`, 10 cool-down outliers.
    fn padded(middle: &[f64]) -> Vec<f64> {
        let mut samples = vec![9.0; 10];
        samples.extend_from_slice(middle);
        samples.extend(std::iter::repeat(7.0).take(10));
        samples
    }

    fn log_of(ms: &[u64]) -> IterationLog {
        let mut log = IterationLog::new();
        for &m in ms {
            log.push(IterationSample::new(
                Duration::from_millis(m),
                Some(m as f64 / 2000.0),
            ));
        }
        log
    }

    #[test]
    fn test_trim_at_threshold_of_25_samples() {
        let samples = padded(&[0.02, 0.02, 0.04, 0.04, 0.03]);
        assert_eq!(samples.len(), 25);

        let stats = MetricsAggregator::default()
            .inference_stats(&samples)
            .unwrap();
        assert_eq!(stats.samples, 5);
        assert_relative_eq!(stats.mean_inference_time, 0.03, epsilon = 1e-12);
        assert_relative_eq!(stats.frame_rate, 5.0 / 0.15, epsilon = 1e-9);
    }

    #[test]
    fn test_twenty_samples_fall_back_to_defaults() {
        let step = RecordedStep {
            samples: vec![0.01; 20],
            gpu: true,
        };
        let aggregator = MetricsAggregator::default();
        assert!(matches!(
            aggregator.inference_stats(&step.samples),
            Err(AggregateError::InsufficientData {
                available: 20,
                required: 21
            })
        ));

        let summary = aggregator.summarize(Some(&step), &log_of(&[50]), 1);
        assert_eq!(summary.mean_inference_time, 0.0);
        assert_eq!(summary.inference_frame_rate, 0.0);
        assert!(!summary.used_hardware_acceleration);
        assert!(summary.first_output.is_none());
    }

    #[test]
    fn test_twenty_one_samples_keep_one() {
        let samples = padded(&[0.25]);
        let stats = MetricsAggregator::default()
            .inference_stats(&samples)
            .unwrap();
        assert_eq!(stats.samples, 1);
        assert_relative_eq!(stats.frame_rate, 4.0);
    }

    #[test]
    fn test_zero_latencies_are_a_computation_error() {
        let samples = padded(&[0.0, 0.0]);
        assert_eq!(
            MetricsAggregator::default().inference_stats(&samples),
            Err(AggregateError::NonFinite("total inference time"))
        );
    }

    #[test]
    fn test_summary_with_inference_step() {
        let step = RecordedStep {
            samples: padded(&[0.01, 0.03]),
            gpu: true,
        };
        let summary = MetricsAggregator::default().summarize(Some(&step), &log_of(&[40, 60]), 3);

        assert_eq!(summary.segment, 3);
        assert_eq!(summary.iterations, 2);
        assert_relative_eq!(summary.mean_iteration_time, 0.05, epsilon = 1e-12);
        assert_relative_eq!(summary.mean_external_iteration_time, 0.025, epsilon = 1e-12);
        assert_relative_eq!(summary.mean_inference_time, 0.02, epsilon = 1e-12);
        assert_relative_eq!(summary.inference_frame_rate, 50.0, epsilon = 1e-9);
        assert!(summary.used_hardware_acceleration);
        let first = summary.first_output.unwrap();
        assert_eq!(first.downcast_ref::<&str>(), Some(&"frame-0"));
    }

    #[test]
    fn test_summary_without_step() {
        let summary = MetricsAggregator::default().summarize(None, &log_of(&[50, 50]), 1);
        assert_eq!(summary.mean_inference_time, 0.0);
        assert_eq!(summary.inference_frame_rate, 0.0);
        assert_relative_eq!(summary.mean_iteration_time, 0.05, epsilon = 1e-12);
    }

    #[test]
    fn test_summary_of_empty_log_does_not_divide_by_zero() {
        let summary = MetricsAggregator::default().summarize(None, &IterationLog::new(), 1);
        assert_eq!(summary.iterations, 0);
        assert_eq!(summary.mean_iteration_time, 0.0);
        assert_eq!(summary.mean_external_iteration_time, 0.0);
        assert!(summary.mean_iteration_time.is_finite());
    }
}
