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

//! A cloneable remote control for a [`Pilot`](crate::Pilot).

use crate::pilot::PilotShared;
use helm_core::{DecisionStep, LoopState, PilotControl};
use std::fmt;
use std::sync::{Arc, Weak};

/// Issues commands to a pilot from any thread.
///
/// The handle does not keep the pilot alive: once the pilot is gone every
/// command is ignored and [`state`](PilotControl::state) reports `Killed`.
#[derive(Clone)]
pub struct PilotHandle {
    shared: Weak<PilotShared>,
}

impl PilotHandle {
    pub(crate) fn new(shared: &Arc<PilotShared>) -> Self {
        Self {
            shared: Arc::downgrade(shared),
        }
    }

    fn with<R>(&self, f: impl FnOnce(&Arc<PilotShared>) -> R) -> Option<R> {
        let shared = self.shared.upgrade();
        if shared.is_none() {
            log::debug!("PilotHandle: pilot dropped, command ignored");
        }
        shared.as_ref().map(f)
    }
}

impl PilotControl for PilotHandle {
    fn play(&self) -> bool {
        self.with(|s| s.play()).unwrap_or(false)
    }

    fn pause(&self) {
        self.with(|s| s.pause());
    }

    fn kill(&self) {
        self.with(|s| s.kill());
    }

    fn reload(&self, step: Option<Box<dyn DecisionStep>>) {
        self.with(move |s| s.reload(step));
    }

    fn state(&self) -> LoopState {
        self.with(|s| s.state()).unwrap_or(LoopState::Killed)
    }
}

impl fmt::Debug for PilotHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PilotHandle")
            .field("state", &self.state())
            .finish()
    }
}
