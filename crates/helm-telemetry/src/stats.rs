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

//! Small numeric helpers shared by the aggregator.

use crate::aggregator::AggregateError;

/// Arithmetic mean, or `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Drops `k` samples from each end of `values`.
///
/// At least one sample must survive, so `values` needs more than `2 * k`
/// entries.
pub fn trimmed(values: &[f64], k: usize) -> Result<&[f64], AggregateError> {
    let required = 2 * k + 1;
    if values.len() < required {
        return Err(AggregateError::InsufficientData {
            available: values.len(),
            required,
        });
    }
    Ok(&values[k..values.len() - k])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean() {
        assert_eq!(mean(&[]), None);
        assert_eq!(mean(&[2.0, 4.0, 9.0]), Some(5.0));
    }

    #[test]
    fn test_trimmed_keeps_middle() {
        let values: Vec<f64> = (0..7).map(f64::from).collect();
        assert_eq!(trimmed(&values, 2).unwrap(), &[2.0, 3.0, 4.0]);
        assert_eq!(trimmed(&values, 0).unwrap().len(), 7);
    }

    #[test]
    fn test_trimmed_requires_a_survivor() {
        let values = [1.0; 4];
        assert_eq!(
            trimmed(&values, 2),
            Err(AggregateError::InsufficientData {
                available: 4,
                required: 5
            })
        );
        assert!(trimmed(&[], 0).is_err());
    }
}
