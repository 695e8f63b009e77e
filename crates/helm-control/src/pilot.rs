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

//! The fixed-rate pilot loop.

use crate::config::PilotConfig;
use crate::finish::FinishLine;
use crate::handle::PilotHandle;
use helm_core::{
    Actuators, AtomicLoopState, ClockSource, DecisionError, DecisionStep, IterationSample,
    LifecycleController, LoopState, MetricsSummary, Point2, PoseSource,
};
use helm_telemetry::{IterationLog, MetricsAggregator, RateMeter};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError, RwLock};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// How long a tick should sleep after spending `elapsed` of its `period`.
///
/// `None` when the tick already overran; the loop never tries to catch up.
pub fn sleep_budget(period: Duration, elapsed: Duration) -> Option<Duration> {
    period.checked_sub(elapsed).filter(|rest| !rest.is_zero())
}

fn lock<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

/// A decision step waiting for the loop thread to install it.
struct StepSwap(Option<Box<dyn DecisionStep>>);

/// State shared between the pilot, its handles, and the loop thread.
pub(crate) struct PilotShared {
    config: PilotConfig,
    state: AtomicLoopState,
    step: Mutex<Option<Box<dyn DecisionStep>>>,
    // Latest reload requested while the loop thread runs.
    pending_step: Mutex<Option<StepSwap>>,
    clock: Arc<dyn ClockSource>,
    pose_source: Arc<dyn PoseSource>,
    finish_line: FinishLine,
    controller: RwLock<Option<Arc<dyn LifecycleController>>>,
    actuators: RwLock<Option<Arc<dyn Actuators>>>,
    thread: Mutex<Option<JoinHandle<()>>>,
    started_at: OnceLock<Instant>,
    execution_completed: AtomicBool,
    segments_completed: AtomicU64,
    segment_iterations: AtomicUsize,
    // 0 until the first rate window closes.
    iterations_per_second: AtomicU32,
}

impl PilotShared {
    /// Spawns the loop thread on first use, then moves to `Running`.
    pub(crate) fn play(self: &Arc<Self>) -> bool {
        let mut worker = lock(&self.thread);
        let previous = self.state.transition(LoopState::Running);
        if previous.is_terminal() {
            log::warn!("Pilot: cannot resume a killed pilot");
            return false;
        }

        if worker.is_none() {
            self.started_at.get_or_init(Instant::now);
            let shared = Arc::clone(self);
            let spawned = thread::Builder::new()
                .name("helm-pilot".into())
                .spawn(move || LoopWorker::new(shared).run());
            match spawned {
                Ok(handle) => *worker = Some(handle),
                Err(e) => {
                    log::error!("Pilot: failed to spawn loop thread: {e}");
                    self.state.transition(LoopState::Paused);
                    return false;
                }
            }
        } else if previous == LoopState::Paused {
            log::info!("Pilot: resumed");
        }
        true
    }

    pub(crate) fn pause(&self) {
        if self.state.transition(LoopState::Paused) == LoopState::Running {
            log::info!("Pilot: paused");
        }
    }

    pub(crate) fn kill(&self) {
        if self.state.transition(LoopState::Killed).is_terminal() {
            return;
        }
        log::info!("Pilot: kill requested");
        let actuators = self
            .actuators
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(actuators) = actuators {
            actuators.deactivate();
        }
    }

    pub(crate) fn reload(&self, step: Option<Box<dyn DecisionStep>>) {
        match &step {
            Some(step) => log::info!("Pilot: loading decision step '{}'", step.name()),
            None => log::info!("Pilot: unloading decision step"),
        }
        let worker = lock(&self.thread);
        if worker.as_ref().is_some_and(|h| !h.is_finished()) {
            // The loop summarises the ending segment before swapping.
            *lock(&self.pending_step) = Some(StepSwap(step));
            return;
        }
        drop(worker);
        self.install(step);
    }

    fn install(&self, step: Option<Box<dyn DecisionStep>>) {
        let previous = std::mem::replace(&mut *lock(&self.step), step);
        drop(previous);
    }

    fn install_pending(&self) {
        let pending = lock(&self.pending_step).take();
        if let Some(StepSwap(step)) = pending {
            self.install(step);
        }
    }

    pub(crate) fn state(&self) -> LoopState {
        self.state.load()
    }
}

/// Drives a decision step at a fixed rate on a dedicated thread.
///
/// A new pilot is `Paused` and has no thread. [`start`](Self::start) spawns
/// the loop and sets it running; afterwards every command only flips state,
/// which the loop picks up at its next tick. Each time a run of `Running`
/// ticks ends, the loop summarises its timing and hands the summary to the
/// attached [`LifecycleController`]'s sink.
///
/// Dropping the pilot kills the loop and waits for the thread to exit.
pub struct Pilot {
    shared: Arc<PilotShared>,
}

impl Pilot {
    /// Creates a paused pilot and captures the start pose from `pose_source`.
    pub fn new(
        config: PilotConfig,
        clock: Arc<dyn ClockSource>,
        pose_source: Arc<dyn PoseSource>,
    ) -> Self {
        let start = pose_source.current_pose().unwrap_or_else(|| {
            log::warn!("Pilot: no pose available at startup, using origin as start pose");
            Point2::ZERO
        });
        let finish_line = FinishLine::new(start, config.finish_line_distance);

        Self {
            shared: Arc::new(PilotShared {
                config,
                state: AtomicLoopState::new(LoopState::Paused),
                step: Mutex::new(None),
                pending_step: Mutex::new(None),
                clock,
                pose_source,
                finish_line,
                controller: RwLock::new(None),
                actuators: RwLock::new(None),
                thread: Mutex::new(None),
                started_at: OnceLock::new(),
                execution_completed: AtomicBool::new(false),
                segments_completed: AtomicU64::new(0),
                segment_iterations: AtomicUsize::new(0),
                iterations_per_second: AtomicU32::new(0),
            }),
        }
    }

    /// Loads the initial decision step.
    pub fn with_decision_step(self, step: Box<dyn DecisionStep>) -> Self {
        self.shared.reload(Some(step));
        self
    }

    /// Attaches the actuators stopped by [`kill`](Self::kill).
    pub fn with_actuators(self, actuators: Arc<dyn Actuators>) -> Self {
        *self
            .shared
            .actuators
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(actuators);
        self
    }

    /// Attaches the controller and registers a handle with it.
    pub fn with_controller(self, controller: Arc<dyn LifecycleController>) -> Self {
        controller.set_pilot(Arc::new(self.handle()));
        *self
            .shared
            .controller
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(controller);
        self
    }

    /// A cloneable handle for issuing commands from other threads.
    pub fn handle(&self) -> PilotHandle {
        PilotHandle::new(&self.shared)
    }

    /// Spawns the loop thread if needed and sets the pilot running.
    ///
    /// Returns `false` if the pilot was killed.
    pub fn start(&self) -> bool {
        self.shared.play()
    }

    /// Same as [`start`](Self::start).
    pub fn play(&self) -> bool {
        self.shared.play()
    }

    /// Same as [`start`](Self::start).
    pub fn resume(&self) -> bool {
        self.shared.play()
    }

    /// Suspends execution from the next tick on. Does not wait.
    pub fn pause(&self) {
        self.shared.pause();
    }

    /// Same as [`pause`](Self::pause).
    pub fn stop(&self) {
        self.shared.pause();
    }

    /// Deactivates the actuators and terminates the loop at its next tick.
    pub fn kill(&self) {
        self.shared.kill();
    }

    /// Replaces the decision step. `None` unloads it.
    ///
    /// Before the loop thread exists the swap is immediate. Afterwards the
    /// loop installs the step at its next tick, once any segment ended by a
    /// preceding [`pause`](Self::pause) has been summarised with the old
    /// step. A reload while running swaps mid-segment. Only the latest
    /// pending reload is kept.
    pub fn reload(&self, step: Option<Box<dyn DecisionStep>>) {
        self.shared.reload(step);
    }

    /// The current state.
    pub fn state(&self) -> LoopState {
        self.shared.state()
    }

    /// Returns `true` while the loop thread exists and has not exited.
    pub fn is_alive(&self) -> bool {
        lock(&self.shared.thread)
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }

    /// Returns `true` once the robot is back within the finish-line radius of
    /// its start pose.
    pub fn finish_line(&self) -> bool {
        self.shared
            .pose_source
            .current_pose()
            .map(|pose| self.shared.finish_line.reached(pose))
            .unwrap_or(false)
    }

    /// The pose captured at construction.
    pub fn start_pose(&self) -> Point2 {
        self.shared.finish_line.start()
    }

    /// Loop iterations in the last completed rate window.
    pub fn iterations_per_second(&self) -> Option<u32> {
        match self.shared.iterations_per_second.load(Ordering::Relaxed) {
            0 => None,
            rate => Some(rate),
        }
    }

    /// Returns `true` after a segment has been summarised and until the next
    /// `Running` tick.
    pub fn execution_completed(&self) -> bool {
        self.shared.execution_completed.load(Ordering::Acquire)
    }

    /// Number of summaries produced so far.
    pub fn segments_completed(&self) -> u64 {
        self.shared.segments_completed.load(Ordering::Acquire)
    }

    /// Successful iterations recorded in the current segment.
    pub fn segment_iterations(&self) -> usize {
        self.shared.segment_iterations.load(Ordering::Acquire)
    }

    /// When the loop thread was first started.
    pub fn started_at(&self) -> Option<Instant> {
        self.shared.started_at.get().copied()
    }

    /// Kills the loop and waits up to the configured join timeout for the
    /// thread to exit.
    ///
    /// Returns `true` if the thread is gone.
    pub fn shutdown(&self) -> bool {
        self.kill();
        let Some(handle) = lock(&self.shared.thread).take() else {
            return true;
        };
        if handle.thread().id() == thread::current().id() {
            log::warn!("Pilot: shutdown called from the loop thread, not joining");
            return false;
        }

        // A timeout too large to represent means waiting for as long as it takes.
        let deadline = Instant::now().checked_add(self.shared.config.join_timeout());
        while !handle.is_finished() {
            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                log::warn!("Pilot: loop thread did not exit in time, detaching it");
                return false;
            }
            thread::sleep(Duration::from_millis(1));
        }
        if handle.join().is_err() {
            log::error!("Pilot: loop thread panicked");
        }
        true
    }
}

impl Drop for Pilot {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// The loop thread's private state.
struct LoopWorker {
    shared: Arc<PilotShared>,
    aggregator: MetricsAggregator,
    log: IterationLog,
    rate: RateMeter,
    segment_active: bool,
    warned_no_step: bool,
    segments: u64,
}

impl LoopWorker {
    fn new(shared: Arc<PilotShared>) -> Self {
        let aggregator = MetricsAggregator::new(shared.config.trim_samples);
        let rate = RateMeter::new(shared.config.rate_window());
        Self {
            shared,
            aggregator,
            log: IterationLog::new(),
            rate,
            segment_active: false,
            warned_no_step: false,
            segments: 0,
        }
    }

    fn run(mut self) {
        let period = self.shared.config.period();
        log::info!("Pilot: loop thread started (period {:?})", period);

        loop {
            let tick_start = Instant::now();
            let external_start = self.shared.clock.now();
            let mut successful = false;

            match self.shared.state.load() {
                LoopState::Killed => {
                    if self.segment_active {
                        self.finish_segment();
                    }
                    break;
                }
                LoopState::Running => {
                    self.shared.install_pending();
                    self.shared
                        .execution_completed
                        .store(false, Ordering::Release);
                    self.segment_active = true;
                    successful = self.execute_step();
                }
                LoopState::Paused => {
                    if self.segment_active {
                        self.finish_segment();
                    }
                    self.shared.install_pending();
                }
            }

            if self.rate.tick(Instant::now()) {
                if let Some(rate) = self.rate.rate() {
                    self.shared
                        .iterations_per_second
                        .store(rate, Ordering::Relaxed);
                }
            }

            if let Some(rest) = sleep_budget(period, tick_start.elapsed()) {
                thread::sleep(rest);
            }

            // A pause that landed during this tick discards its sample.
            if successful && self.shared.state.load() == LoopState::Running {
                let external = match (external_start, self.shared.clock.now()) {
                    (Some(start), Some(end)) => Some(end - start),
                    _ => None,
                };
                self.log
                    .push(IterationSample::new(tick_start.elapsed(), external));
                self.shared
                    .segment_iterations
                    .store(self.log.len(), Ordering::Release);
            }
        }

        self.shared.clock.detach();
        log::info!("Pilot: pilot killed.");
    }

    fn execute_step(&mut self) -> bool {
        let mut slot = lock(&self.shared.step);
        let Some(step) = slot.as_mut() else {
            warn_no_step(&mut self.warned_no_step, "no decision step loaded");
            return false;
        };
        match panic::catch_unwind(AssertUnwindSafe(|| step.execute())) {
            Ok(Ok(())) => true,
            Ok(Err(DecisionError::NotLoaded)) => {
                warn_no_step(&mut self.warned_no_step, "decision step not ready");
                false
            }
            Ok(Err(e)) => {
                log::warn!("Pilot: {e}");
                false
            }
            Err(payload) => {
                log::error!(
                    "Pilot: decision step '{}' panicked: {}",
                    step.name(),
                    panic_message(payload.as_ref())
                );
                false
            }
        }
    }

    fn finish_segment(&mut self) {
        self.segment_active = false;
        self.warned_no_step = false;

        if self.log.is_empty() {
            log::debug!("Pilot: segment ended without successful iterations");
            self.shared
                .execution_completed
                .store(true, Ordering::Release);
            return;
        }

        self.segments += 1;
        let segment = self.segments;
        let summary = {
            let slot = lock(&self.shared.step);
            let aggregator = &self.aggregator;
            let samples = &self.log;
            panic::catch_unwind(AssertUnwindSafe(|| {
                aggregator.summarize(slot.as_deref(), samples, segment)
            }))
            .unwrap_or_else(|payload| {
                log::error!(
                    "Pilot: metrics of segment {segment} failed: {}",
                    panic_message(payload.as_ref())
                );
                MetricsSummary {
                    segment,
                    iterations: samples.len(),
                    ..Default::default()
                }
            })
        };

        self.deliver(&summary);

        self.log.clear();
        self.shared.segment_iterations.store(0, Ordering::Release);
        self.shared
            .segments_completed
            .store(segment, Ordering::Release);
        self.shared
            .execution_completed
            .store(true, Ordering::Release);
    }

    fn deliver(&self, summary: &MetricsSummary) {
        let controller = self
            .shared
            .controller
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let Some(controller) = controller else {
            return;
        };
        let Some(sink) = controller.metrics_sink() else {
            log::debug!("Pilot: controller has no metrics sink");
            return;
        };

        log::info!("Pilot: delivering metrics of segment {}", summary.segment);
        match panic::catch_unwind(AssertUnwindSafe(|| sink.on_segment_metrics(summary))) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => log::error!(
                "Pilot: metrics of segment {} discarded: {e:#}",
                summary.segment
            ),
            Err(payload) => log::error!(
                "Pilot: metrics sink panicked: {}",
                panic_message(payload.as_ref())
            ),
        }
    }
}

fn warn_no_step(warned: &mut bool, reason: &str) {
    if !*warned {
        log::warn!("Pilot: No Brain selected ({reason})");
        *warned = true;
    } else {
        log::trace!("Pilot: No Brain selected ({reason})");
    }
}
