//! Empirical discrete distributions.
//!
//! A table of cumulative probabilities `p[1..k]` sampled by inversion: a
//! uniform `u` maps to the smallest 1-based index `i` with `u < p[i]`.

use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};

/// How far the last cumulative entry may sit from 1.0.
pub const CUMULATIVE_TOLERANCE: f64 = 1e-6;

/// Validated cumulative distribution table.
///
/// Entries are finite, strictly increasing, inside `(0, 1]`, and the last
/// one is exactly `1.0`. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct EmpiricalDistribution {
    cumulative: Vec<f64>,
}

impl EmpiricalDistribution {
    /// Build from cumulative probabilities.
    ///
    /// A last entry within [`CUMULATIVE_TOLERANCE`] of 1.0 is pinned to 1.0.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` if the table is empty, not strictly
    /// increasing, leaves `(0, 1]`, or does not reach 1.0.
    pub fn new(mut cumulative: Vec<f64>) -> SimResult<Self> {
        let Some(&last) = cumulative.last() else {
            return Err(SimError::invalid_parameter(
                "distribution",
                "cumulative table is empty",
            ));
        };

        let mut previous = 0.0;
        for (i, &p) in cumulative.iter().enumerate() {
            if !p.is_finite() || p <= previous || p > 1.0 + CUMULATIVE_TOLERANCE {
                return Err(SimError::invalid_parameter(
                    "distribution",
                    format!(
                        "entry {} is {p}; cumulative probabilities must strictly increase from 0 to 1",
                        i + 1
                    ),
                ));
            }
            previous = p;
        }

        if (last - 1.0).abs() > CUMULATIVE_TOLERANCE {
            return Err(SimError::invalid_parameter(
                "distribution",
                format!("cumulative table must end at 1.0, ends at {last}"),
            ));
        }

        if let Some(end) = cumulative.last_mut() {
            *end = 1.0;
        }
        if let [.., before, _] = cumulative.as_slice() {
            if *before >= 1.0 {
                return Err(SimError::invalid_parameter(
                    "distribution",
                    format!(
                        "entry {} is {before}; only the last entry may reach 1.0",
                        cumulative.len() - 1
                    ),
                ));
            }
        }
        Ok(Self { cumulative })
    }

    /// Build from point probabilities of indices `1..=k`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` if any probability is not positive or the
    /// running sum does not reach 1.0.
    pub fn from_probabilities(probabilities: &[f64]) -> SimResult<Self> {
        let cumulative = probabilities
            .iter()
            .scan(0.0, |sum, &p| {
                *sum += p;
                Some(*sum)
            })
            .collect();
        Self::new(cumulative)
    }

    /// Number of outcomes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cumulative.len()
    }

    /// Always false for a validated table.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cumulative.is_empty()
    }

    /// Cumulative table.
    #[must_use]
    pub fn cumulative(&self) -> &[f64] {
        &self.cumulative
    }

    /// Probability of the 1-based `index`.
    #[must_use]
    pub fn probability(&self, index: usize) -> Option<f64> {
        let i = index.checked_sub(1)?;
        let upper = *self.cumulative.get(i)?;
        let lower = if i == 0 { 0.0 } else { self.cumulative[i - 1] };
        Some(upper - lower)
    }

    /// Mean of the 1-based outcome index.
    #[must_use]
    pub fn mean(&self) -> f64 {
        (1..=self.len())
            .filter_map(|i| self.probability(i).map(|p| i as f64 * p))
            .sum()
    }

    /// Invert a uniform draw to a 1-based index.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` if `u` is not below the last entry.
    pub fn index_for(&self, u: f64) -> SimResult<usize> {
        self.cumulative
            .iter()
            .position(|&p| u < p)
            .map(|i| i + 1)
            .ok_or_else(|| {
                SimError::invalid_parameter(
                    "distribution",
                    format!("draw {u} falls past the end of the cumulative table"),
                )
            })
    }
}

impl TryFrom<Vec<f64>> for EmpiricalDistribution {
    type Error = SimError;

    fn try_from(cumulative: Vec<f64>) -> Result<Self, Self::Error> {
        Self::new(cumulative)
    }
}

impl From<EmpiricalDistribution> for Vec<f64> {
    fn from(dist: EmpiricalDistribution) -> Self {
        dist.cumulative
    }
}
