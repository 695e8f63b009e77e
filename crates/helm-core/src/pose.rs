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

//! Planar robot position.

use serde::{Deserialize, Serialize};
use std::sync::{PoisonError, RwLock};

/// A point on the ground plane.
#[derive(Debug, Default, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point2 {
    /// The x coordinate.
    pub x: f64,
    /// The y coordinate.
    pub y: f64,
}

impl Point2 {
    /// The origin.
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    /// Creates a new point.
    #[inline]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    #[inline]
    pub fn distance(&self, other: Point2) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Anything that can report where the robot currently is.
pub trait PoseSource: Send + Sync {
    /// The robot's current position, or `None` if no pose is known yet.
    fn current_pose(&self) -> Option<Point2>;
}

/// A pose shared between the code that moves the robot and the code that
/// reads its position.
#[derive(Debug, Default)]
pub struct PoseCell {
    pose: RwLock<Option<Point2>>,
}

impl PoseCell {
    /// Creates a cell with no pose.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a cell holding `pose`.
    pub fn at(pose: Point2) -> Self {
        Self {
            pose: RwLock::new(Some(pose)),
        }
    }

    /// Replaces the stored pose.
    pub fn set(&self, pose: Point2) {
        *self.pose.write().unwrap_or_else(PoisonError::into_inner) = Some(pose);
    }
}

impl PoseSource for PoseCell {
    fn current_pose(&self) -> Option<Point2> {
        *self.pose.read().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_distance() {
        let a = Point2::new(1.0, 1.0);
        let b = Point2::new(4.0, 5.0);
        assert_relative_eq!(a.distance(b), 5.0);
        assert_relative_eq!(b.distance(a), 5.0);
        assert_relative_eq!(a.distance(a), 0.0);
    }

    #[test]
    fn test_pose_cell_updates() {
        let cell = PoseCell::new();
        assert_eq!(cell.current_pose(), None);
        cell.set(Point2::new(2.0, -1.0));
        assert_eq!(cell.current_pose(), Some(Point2::new(2.0, -1.0)));
        assert_eq!(PoseCell::at(Point2::ZERO).current_pose(), Some(Point2::ZERO));
    }
}
