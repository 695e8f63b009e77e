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

//! A synthetic decision step that drives the robot around a circle.

use crate::config::BrainConfig;
use helm_core::{Actuators, DecisionError, DecisionStep, FirstOutput, Point2, PoseCell, PoseSource};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

/// A velocity command sent to the motors.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct MotorCommand {
    pub linear: f64,
    pub angular: f64,
}

/// The robot's motors. Commands are ignored once deactivated.
#[derive(Debug)]
pub struct Motors {
    active: AtomicBool,
    command: Mutex<MotorCommand>,
}

impl Motors {
    pub fn new() -> Self {
        Self {
            active: AtomicBool::new(true),
            command: Mutex::new(MotorCommand::default()),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Applies `command`. Returns `false` if the motors are deactivated.
    pub fn send(&self, command: MotorCommand) -> bool {
        if !self.is_active() {
            return false;
        }
        *self.command.lock().unwrap_or_else(PoisonError::into_inner) = command;
        true
    }

    pub fn last_command(&self) -> MotorCommand {
        *self.command.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Actuators for Motors {
    fn deactivate(&self) {
        self.active.store(false, Ordering::Release);
        *self.command.lock().unwrap_or_else(PoisonError::into_inner) = MotorCommand::default();
        log::info!("Motors: deactivated");
    }
}

/// Pretends to run a network: waits a configurable, varying latency, then
/// moves the robot one step along a circle.
pub struct SyntheticBrain {
    config: BrainConfig,
    pose: Arc<PoseCell>,
    motors: Arc<Motors>,
    heading: f64,
    decisions: u64,
    samples: Vec<f64>,
    first_output: Option<FirstOutput>,
}

impl SyntheticBrain {
    pub fn new(config: BrainConfig, pose: Arc<PoseCell>, motors: Arc<Motors>) -> Self {
        Self {
            config,
            pose,
            motors,
            heading: 0.0,
            decisions: 0,
            samples: Vec::new(),
            first_output: None,
        }
    }

    fn latency(&self) -> Duration {
        let ms = self.config.latency_ms + self.config.jitter_ms * (self.decisions as f64 * 0.7).sin();
        Duration::try_from_secs_f64(ms.max(0.0) / 1000.0).unwrap_or(Duration::MAX)
    }
}

impl DecisionStep for SyntheticBrain {
    fn execute(&mut self) -> Result<(), DecisionError> {
        let start = Instant::now();
        thread::sleep(self.latency());

        let command = MotorCommand {
            linear: self.config.speed,
            angular: self.config.turn_rate,
        };
        if !self.motors.send(command) {
            return Err(DecisionError::Failed("motors are deactivated".into()));
        }

        self.heading += command.angular;
        let current = self.pose.current_pose().unwrap_or(Point2::ZERO);
        self.pose.set(Point2::new(
            current.x + command.linear * self.heading.cos(),
            current.y + command.linear * self.heading.sin(),
        ));

        self.decisions += 1;
        self.samples.push(start.elapsed().as_secs_f64());
        if self.first_output.is_none() {
            self.first_output = Some(FirstOutput::new(command));
        }
        Ok(())
    }

    fn inference_samples(&self) -> &[f64] {
        &self.samples
    }

    fn used_hardware_acceleration(&self) -> bool {
        self.config.hardware_acceleration
    }

    fn first_output(&self) -> Option<FirstOutput> {
        self.first_output.clone()
    }

    fn name(&self) -> &str {
        "synthetic-circle"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn instant_config() -> BrainConfig {
        BrainConfig {
            latency_ms: 0.0,
            jitter_ms: 0.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_execute_moves_robot_and_records_latency() {
        let pose = Arc::new(PoseCell::at(Point2::ZERO));
        let motors = Arc::new(Motors::new());
        let mut brain = SyntheticBrain::new(instant_config(), pose.clone(), motors.clone());

        brain.execute().unwrap();
        brain.execute().unwrap();

        let moved = pose.current_pose().unwrap();
        assert!(moved.distance(Point2::ZERO) > 0.15);
        assert_eq!(brain.inference_samples().len(), 2);
        assert_eq!(motors.last_command().linear, 0.1);

        let first = brain.first_output().unwrap();
        assert_relative_eq!(first.downcast_ref::<MotorCommand>().unwrap().angular, 0.05);
    }

    #[test]
    fn test_full_circle_returns_to_start() {
        let pose = Arc::new(PoseCell::at(Point2::ZERO));
        let mut brain = SyntheticBrain::new(instant_config(), pose.clone(), Arc::new(Motors::new()));
        let steps = (std::f64::consts::TAU / 0.05).round() as usize;
        for _ in 0..steps {
            brain.execute().unwrap();
        }
        assert!(pose.current_pose().unwrap().distance(Point2::ZERO) < 0.5);
    }

    #[test]
    fn test_huge_latency_saturates() {
        let brain = SyntheticBrain::new(
            BrainConfig {
                latency_ms: 1e300,
                jitter_ms: 0.0,
                ..Default::default()
            },
            Arc::new(PoseCell::new()),
            Arc::new(Motors::new()),
        );
        assert_eq!(brain.latency(), Duration::MAX);
    }

    #[test]
    fn test_deactivated_motors_fail_decision() {
        let motors = Arc::new(Motors::new());
        let mut brain = SyntheticBrain::new(
            instant_config(),
            Arc::new(PoseCell::at(Point2::ZERO)),
            motors.clone(),
        );
        motors.deactivate();
        assert!(!motors.is_active());
        assert!(matches!(brain.execute(), Err(DecisionError::Failed(_))));
        assert!(brain.inference_samples().is_empty());
        assert_eq!(motors.last_command(), MotorCommand::default());
    }
}
