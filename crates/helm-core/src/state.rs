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

//! The pilot's run state and its lock-free cell.

use std::sync::atomic::{AtomicU8, Ordering};

/// The state of a pilot loop.
///
/// | From      | To        | Trigger            |
/// |-----------|-----------|--------------------|
/// | `Paused`  | `Running` | `play` / `resume`  |
/// | `Running` | `Paused`  | `pause` / `stop`   |
/// | any       | `Killed`  | `kill`             |
///
/// `Killed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum LoopState {
    /// Decisions are executed every tick.
    Running = 0,
    /// The loop keeps ticking but does nothing.
    #[default]
    Paused = 1,
    /// The loop thread exits at the top of its next tick.
    Killed = 2,
}

impl LoopState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => LoopState::Running,
            1 => LoopState::Paused,
            _ => LoopState::Killed,
        }
    }

    /// Returns `true` for the terminal state.
    pub fn is_terminal(self) -> bool {
        self == LoopState::Killed
    }
}

/// A [`LoopState`] shared between the loop thread and its controllers.
#[derive(Debug)]
pub struct AtomicLoopState(AtomicU8);

impl AtomicLoopState {
    /// Creates a cell holding `state`.
    pub fn new(state: LoopState) -> Self {
        Self(AtomicU8::new(state as u8))
    }

    /// Reads the current state.
    pub fn load(&self) -> LoopState {
        LoopState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Moves to `next` unless the cell is already `Killed`.
    ///
    /// Returns the state that was replaced. When the previous state was
    /// `Killed` the cell is left untouched.
    pub fn transition(&self, next: LoopState) -> LoopState {
        let previous = self
            .0
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |raw| {
                if LoopState::from_u8(raw).is_terminal() {
                    None
                } else {
                    Some(next as u8)
                }
            });
        match previous {
            Ok(raw) | Err(raw) => LoopState::from_u8(raw),
        }
    }
}

impl Default for AtomicLoopState {
    fn default() -> Self {
        Self::new(LoopState::default())
    }
}
