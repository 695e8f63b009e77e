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

//! Loop iteration rate over fixed windows.

use std::time::{Duration, Instant};

/// Counts loop iterations per fixed window.
///
/// The count of the window in progress is not reported; [`rate`](Self::rate)
/// returns the count of the last completed one.
#[derive(Debug, Clone)]
pub struct RateMeter {
    window: Duration,
    window_start: Instant,
    count: u32,
    last: Option<u32>,
}

impl RateMeter {
    /// Creates a meter whose first window starts now.
    pub fn new(window: Duration) -> Self {
        Self::starting_at(window, Instant::now())
    }

    /// Creates a meter whose first window starts at `start`.
    pub fn starting_at(window: Duration, start: Instant) -> Self {
        Self {
            window,
            window_start: start,
            count: 0,
            last: None,
        }
    }

    /// Records one iteration at `now`.
    ///
    /// Returns `true` if this call closed a window.
    pub fn tick(&mut self, now: Instant) -> bool {
        if now.duration_since(self.window_start) < self.window {
            self.count += 1;
            return false;
        }
        log::trace!("RateMeter: {} iterations in last window", self.count);
        self.last = Some(self.count);
        self.window_start = now;
        self.count = 1;
        true
    }

    /// Iterations counted in the last completed window.
    pub fn rate(&self) -> Option<u32> {
        self.last
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_rate_before_first_window_closes() {
        let start = Instant::now();
        let mut meter = RateMeter::starting_at(Duration::from_secs(1), start);
        for i in 0..5 {
            assert!(!meter.tick(start + Duration::from_millis(i * 100)));
        }
        assert_eq!(meter.rate(), None);
    }

    #[test]
    fn test_rate_counts_completed_window() {
        let start = Instant::now();
        let mut meter = RateMeter::starting_at(Duration::from_secs(1), start);
        for i in 0..20 {
            meter.tick(start + Duration::from_millis(i * 50));
        }
        assert!(meter.tick(start + Duration::from_millis(1000)));
        assert_eq!(meter.rate(), Some(20));

        // The closing tick opens the next window.
        for i in 1..10 {
            meter.tick(start + Duration::from_millis(1000 + i * 100));
        }
        assert!(meter.tick(start + Duration::from_millis(2000)));
        assert_eq!(meter.rate(), Some(10));
    }
}
