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

//! Stand-in for a simulator's clock topic.

use crate::config::SimulationConfig;
use helm_core::SimulatedClock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Publishes simulated time into a [`SimulatedClock`] from a background thread.
pub struct ClockPublisher {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl ClockPublisher {
    pub fn spawn(clock: Arc<SimulatedClock>, config: &SimulationConfig) -> std::io::Result<Self> {
        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);
        let factor = config.real_time_factor;
        let interval = Duration::from_millis(config.publish_interval_ms);

        let handle = thread::Builder::new()
            .name("helm-sim-clock".into())
            .spawn(move || {
                let origin = Instant::now();
                log::debug!("ClockPublisher: started (factor {factor})");
                // Stops on its own once the pilot has released the clock.
                while flag.load(Ordering::Relaxed) && !clock.is_detached() {
                    clock.publish(origin.elapsed().as_secs_f64() * factor);
                    thread::sleep(interval);
                }
                log::debug!("ClockPublisher: stopped");
            })?;

        Ok(Self {
            running,
            handle: Some(handle),
        })
    }

    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for ClockPublisher {
    fn drop(&mut self) {
        self.stop();
    }
}
