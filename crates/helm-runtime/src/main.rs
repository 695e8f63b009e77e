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

mod brain;
mod config;
mod controller;
mod sim;

use anyhow::{Context as _, Result};
use brain::{Motors, SyntheticBrain};
use config::RuntimeConfig;
use controller::ExperimentController;
use helm_control::Pilot;
use helm_core::{PoseCell, SimulatedClock};
use sim::ClockPublisher;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

const POLL: Duration = Duration::from_millis(20);

/// How the experiment ended.
#[derive(Debug, PartialEq)]
enum RunOutcome {
    TimeUp,
    LapCompleted,
}

/// Keeps the pilot running until time is up or, when enabled, the robot
/// has left the start area and come back to it.
fn drive(pilot: &Pilot, controller: &ExperimentController, config: &RuntimeConfig) -> RunOutcome {
    // No deadline when the run length cannot be represented.
    let deadline = Instant::now().checked_add(config.experiment.duration());
    let mut left_start = false;

    controller.resume_pilot();
    let outcome = loop {
        if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            break RunOutcome::TimeUp;
        }
        if config.experiment.stop_on_lap {
            let at_start = pilot.finish_line();
            if !at_start {
                left_start = true;
            } else if left_start {
                break RunOutcome::LapCompleted;
            }
        }
        thread::sleep(POLL);
    };
    controller.pause_pilot();
    log::debug!("Runtime: pilot now {:?}", controller.pilot_state());

    let wait_until = Instant::now().checked_add(config.pilot.join_timeout());
    while !pilot.execution_completed() && wait_until.map_or(true, |t| Instant::now() < t) {
        thread::sleep(Duration::from_millis(1));
    }
    outcome
}

fn run(config: RuntimeConfig) -> Result<()> {
    let clock = Arc::new(SimulatedClock::new());
    let mut publisher = ClockPublisher::spawn(clock.clone(), &config.simulation)
        .context("spawning the simulated clock")?;

    let pose = Arc::new(PoseCell::at(config.experiment.start_pose));
    let motors = Arc::new(Motors::new());
    let controller = Arc::new(ExperimentController::new(&config.experiment)?);

    let brain = SyntheticBrain::new(config.brain.clone(), pose.clone(), motors.clone());
    let pilot = Pilot::new(config.pilot.clone(), clock, pose)
        .with_decision_step(Box::new(brain))
        .with_actuators(motors)
        .with_controller(controller.clone());

    log::info!(
        "Runtime: experiment {} on {} ({})",
        controller.metadata().name.as_deref().unwrap_or("unnamed"),
        controller.metadata().world,
        controller.metadata().brain_path,
    );

    let outcome = drive(&pilot, &controller, &config);
    match outcome {
        RunOutcome::LapCompleted => log::info!("Runtime: lap completed"),
        RunOutcome::TimeUp => log::info!("Runtime: time is up"),
    }
    match pilot.iterations_per_second() {
        Some(ips) => log::info!("Runtime: {ips} iterations per second"),
        None => log::info!("Runtime: iteration rate not available"),
    }
    let real_time = pilot
        .started_at()
        .map(|t| t.elapsed())
        .unwrap_or_else(|| controller.total_real_time());
    log::info!(
        "Runtime: total real time {:.2}s, {} segment(s)",
        real_time.as_secs_f64(),
        pilot.segments_completed()
    );
    if let Some(dir) = controller.metrics_dir() {
        log::info!(
            "Runtime: {} summaries stored in {}",
            controller.history().len(),
            dir.display()
        );
    }

    controller.stop_pilot();
    if !pilot.shutdown() {
        log::warn!("Runtime: pilot thread still running at exit");
    }
    publisher.stop();
    Ok(())
}

fn main() -> Result<()> {
    use env_logger::{Builder, Env};

    Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = match std::env::args().nth(1) {
        Some(path) => RuntimeConfig::from_json_file(path)?,
        None => {
            log::info!("Runtime: no configuration given, using defaults");
            RuntimeConfig::default()
        }
    };
    run(config)
}
