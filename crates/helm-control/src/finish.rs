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

//! Lap completion check against the pose captured at startup.

use helm_core::Point2;

/// The start pose and the radius around it that counts as the finish line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FinishLine {
    start: Point2,
    max_distance: f64,
}

impl FinishLine {
    /// Creates a finish line around `start`.
    pub fn new(start: Point2, max_distance: f64) -> Self {
        Self {
            start,
            max_distance,
        }
    }

    /// The captured start pose.
    pub fn start(&self) -> Point2 {
        self.start
    }

    /// Distance from the start pose to `current`.
    pub fn distance(&self, current: Point2) -> f64 {
        self.start.distance(current)
    }

    /// Returns `true` when `current` is strictly closer than the threshold.
    pub fn reached(&self, current: Point2) -> bool {
        self.distance(current) < self.max_distance
    }
}
