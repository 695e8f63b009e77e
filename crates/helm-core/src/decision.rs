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

//! The contract for the pluggable policy ("brain") invoked once per tick.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Reasons a single decision could not be produced.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecisionError {
    /// No policy is loaded, or the loaded one is not ready yet.
    #[error("no decision step loaded")]
    NotLoaded,
    /// The policy ran but could not produce a decision.
    #[error("decision step failed: {0}")]
    Failed(String),
}

/// The first output produced by a decision step, kept as an opaque value.
///
/// Typically the first camera frame a network saw. The pilot never looks
/// inside it; whoever consumes the metrics can downcast it back.
#[derive(Clone)]
pub struct FirstOutput(Arc<dyn Any + Send + Sync>);

impl FirstOutput {
    /// Wraps any shareable value.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self(Arc::new(value))
    }

    /// Returns the wrapped value if it has type `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }
}

impl fmt::Debug for FirstOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FirstOutput(..)")
    }
}

/// A stateful policy that computes the robot's behaviour.
///
/// The pilot calls [`execute`](Self::execute) once per tick from its own
/// thread. Implementations read sensors and write actuators as a side effect
/// and record how long each inference took.
pub trait DecisionStep: Send {
    /// Performs one control decision.
    fn execute(&mut self) -> Result<(), DecisionError>;

    /// Per-call inference latencies in seconds, oldest first.
    fn inference_samples(&self) -> &[f64];

    /// Whether inference ran on an accelerator.
    fn used_hardware_acceleration(&self) -> bool {
        false
    }

    /// The first output produced since the step was loaded, if any.
    fn first_output(&self) -> Option<FirstOutput> {
        None
    }

    /// A short name used in log lines.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Frame {
        width: u32,
    }

    #[test]
    fn test_first_output_downcast() {
        let output = FirstOutput::new(Frame { width: 640 });
        assert_eq!(output.downcast_ref::<Frame>().map(|f| f.width), Some(640));
        assert!(output.downcast_ref::<String>().is_none());
    }

    #[test]
    fn test_first_output_clone_shares_value() {
        let output = FirstOutput::new(7_u8);
        let copy = output.clone();
        assert_eq!(copy.downcast_ref::<u8>(), Some(&7));
        assert_eq!(format!("{output:?}"), "FirstOutput(..)");
    }

    #[test]
    fn test_decision_error_messages() {
        assert_eq!(DecisionError::NotLoaded.to_string(), "no decision step loaded");
        assert_eq!(
            DecisionError::Failed("camera timeout".into()).to_string(),
            "decision step failed: camera timeout"
        );
    }
}
