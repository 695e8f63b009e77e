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

//! Append-only storage for the iterations of the current run segment.

use crate::stats;
use helm_core::IterationSample;

/// The iteration samples of one run segment, in the order they were taken.
///
/// Owned by the loop thread; cleared once the segment has been summarised.
#[derive(Debug, Default, Clone)]
pub struct IterationLog {
    samples: Vec<IterationSample>,
}

impl IterationLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a sample.
    pub fn push(&mut self, sample: IterationSample) {
        self.samples.push(sample);
    }

    /// Number of samples recorded.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Returns `true` if no sample has been recorded.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Forgets every sample.
    pub fn clear(&mut self) {
        self.samples.clear();
    }

    /// Iterates over the samples, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &IterationSample> {
        self.samples.iter()
    }

    /// Mean wall-clock iteration time in seconds, or 0.0 when empty.
    pub fn mean_wall(&self) -> f64 {
        let walls: Vec<f64> = self
            .samples
            .iter()
            .map(|s| s.wall_duration.as_secs_f64())
            .collect();
        stats::mean(&walls).unwrap_or(0.0)
    }

    /// Mean external-clock iteration time in seconds.
    ///
    /// Only samples with an external reading contribute. Returns 0.0 when
    /// none has one.
    pub fn mean_external(&self) -> f64 {
        let externals: Vec<f64> = self
            .samples
            .iter()
            .filter_map(|s| s.external_duration)
            .collect();
        stats::mean(&externals).unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::time::Duration;

    fn sample(ms: u64, external: Option<f64>) -> IterationSample {
        IterationSample::new(Duration::from_millis(ms), external)
    }

    #[test]
    fn test_empty_log_means_are_zero() {
        let log = IterationLog::new();
        assert!(log.is_empty());
        assert_eq!(log.mean_wall(), 0.0);
        assert_eq!(log.mean_external(), 0.0);
    }

    #[test]
    fn test_mean_wall_is_arithmetic_mean() {
        let mut log = IterationLog::new();
        for ms in [50, 52, 48, 61] {
            log.push(sample(ms, None));
        }
        assert_eq!(log.len(), 4);
        assert_relative_eq!(log.mean_wall(), 0.05275, epsilon = 1e-12);
    }

    #[test]
    fn test_mean_external_skips_missing_readings() {
        let mut log = IterationLog::new();
        log.push(sample(50, None));
        log.push(sample(50, Some(0.1)));
        log.push(sample(50, Some(0.3)));
        assert_relative_eq!(log.mean_external(), 0.2, epsilon = 1e-12);
    }

    #[test]
    fn test_clear() {
        let mut log = IterationLog::new();
        log.push(sample(50, Some(0.05)));
        log.clear();
        assert!(log.is_empty());
        assert_eq!(log.iter().count(), 0);
    }
}
