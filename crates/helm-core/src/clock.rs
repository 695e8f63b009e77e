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

//! External time references for the pilot loop.
//!
//! The loop measures each iteration twice: once against the wall clock and
//! once against a [`ClockSource`]. When the robot is driven by a simulator
//! the two diverge, and the external reading is the one that tells how much
//! simulated time a decision actually took.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Instant;

/// A monotonically non-decreasing time reference, in seconds.
pub trait ClockSource: Send + Sync {
    /// Returns the current time, or `None` while no time event has arrived yet.
    fn now(&self) -> Option<f64>;

    /// Releases whatever subscription feeds this clock.
    ///
    /// Called once by the loop thread when it terminates.
    fn detach(&self) {}
}

// No valid reading is ever stored with this bit pattern (it is a NaN).
const UNSET: u64 = u64::MAX;

/// A clock fed by external time events, such as a simulator's clock topic.
///
/// Readings are published from whichever thread receives the events and read
/// lock-free by the loop thread. Published values never move backwards.
#[derive(Debug)]
pub struct SimulatedClock {
    bits: AtomicU64,
    detached: AtomicBool,
}

impl SimulatedClock {
    /// Creates a clock with no reading.
    pub fn new() -> Self {
        Self {
            bits: AtomicU64::new(UNSET),
            detached: AtomicBool::new(false),
        }
    }

    /// Publishes a new time event.
    ///
    /// Returns `false` if the value was rejected: non-finite, older than the
    /// current reading, or published after [`detach`](ClockSource::detach).
    pub fn publish(&self, seconds: f64) -> bool {
        if !seconds.is_finite() || self.is_detached() {
            return false;
        }
        self.bits
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                if current == UNSET || f64::from_bits(current) <= seconds {
                    Some(seconds.to_bits())
                } else {
                    None
                }
            })
            .is_ok()
    }

    /// Returns `true` once the consumer has released the clock.
    pub fn is_detached(&self) -> bool {
        self.detached.load(Ordering::Acquire)
    }
}

impl Default for SimulatedClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ClockSource for SimulatedClock {
    fn now(&self) -> Option<f64> {
        match self.bits.load(Ordering::Acquire) {
            UNSET => None,
            bits => Some(f64::from_bits(bits)),
        }
    }

    fn detach(&self) {
        if !self.detached.swap(true, Ordering::AcqRel) {
            log::debug!("SimulatedClock: subscriber detached");
        }
    }
}

/// A clock that follows the host's monotonic clock, starting at zero.
///
/// Used when the robot runs in real time and no external time source exists.
#[derive(Debug, Clone, Copy)]
pub struct WallClock {
    origin: Instant,
}

impl WallClock {
    /// Creates a clock whose zero is the moment of construction.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for WallClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ClockSource for WallClock {
    fn now(&self) -> Option<f64> {
        Some(self.origin.elapsed().as_secs_f64())
    }
}
