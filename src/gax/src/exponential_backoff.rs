// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Truncated exponential backoff, scaled by the error classification.
//!
//! This module provides an implementation of truncated [exponential backoff].
//! The delay for the n-th failure is `initial * scaling^(n-1)`, truncated at
//! the maximum delay, and then multiplied by the
//! [backoff multiplier][crate::classify::TransientErrorClass::backoff_multiplier]
//! of the error. The multiplier is applied after truncation, a concurrent
//! operation conflict always waits four times longer than a server error.
//!
//! There is no jitter, a command-line tool does not contribute to a
//! thundering herd.
//!
//! [exponential backoff]: https://en.wikipedia.org/wiki/Exponential_backoff

use crate::classify::classify;
use crate::retry_state::RetryState;
use std::time::Duration;

/// The error type for exponential backoff creation.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("the scaling value ({0}) should be >= 1.0")]
    InvalidScalingFactor(f64),
    #[error(
        "the maximum delay ({maximum:?}) should be greater than or equal to the initial delay ({initial:?})"
    )]
    EmptyRange {
        maximum: Duration,
        initial: Duration,
    },
}

/// Builds [ExponentialBackoff] policies.
#[derive(Clone, Debug)]
pub struct ExponentialBackoffBuilder {
    initial_delay: Duration,
    maximum_delay: Duration,
    scaling: f64,
}

impl ExponentialBackoffBuilder {
    /// Creates a builder with the default parameters.
    ///
    /// The defaults wait two seconds between attempts, without growth.
    ///
    /// # Example
    /// ```
    /// # use gae_deploy_gax::exponential_backoff::Error;
    /// # use gae_deploy_gax::exponential_backoff::ExponentialBackoffBuilder;
    /// use std::time::Duration;
    ///
    /// let policy = ExponentialBackoffBuilder::new()
    ///         .with_initial_delay(Duration::from_millis(100))
    ///         .with_maximum_delay(Duration::from_secs(5))
    ///         .with_scaling(4.0)
    ///         .build()?;
    /// # Ok::<(), Error>(())
    /// ```
    pub fn new() -> Self {
        Self {
            initial_delay: Duration::from_secs(2),
            maximum_delay: Duration::from_secs(60),
            scaling: 1.0,
        }
    }

    /// Change the initial delay.
    ///
    /// A zero initial delay is valid, the policy then retries immediately.
    pub fn with_initial_delay<V: Into<Duration>>(mut self, v: V) -> Self {
        self.initial_delay = v.into();
        self
    }

    /// Change the maximum delay, before applying the error multiplier.
    pub fn with_maximum_delay<V: Into<Duration>>(mut self, v: V) -> Self {
        self.maximum_delay = v.into();
        self
    }

    /// Change the scaling factor in this backoff policy.
    pub fn with_scaling<V: Into<f64>>(mut self, v: V) -> Self {
        self.scaling = v.into();
        self
    }

    /// Creates a new exponential backoff policy.
    ///
    /// # Example
    /// ```
    /// # use gae_deploy_gax::exponential_backoff::Error;
    /// # use gae_deploy_gax::exponential_backoff::ExponentialBackoffBuilder;
    /// # use gae_deploy_gax::backoff_policy::BackoffPolicy;
    /// # use gae_deploy_gax::retry_state::RetryState;
    /// # use gae_deploy_gax::error::{Error as GaxError, rpc::Status};
    /// use std::time::Duration;
    /// let backoff = ExponentialBackoffBuilder::new()
    ///     .with_initial_delay(Duration::from_secs(5))
    ///     .with_maximum_delay(Duration::from_secs(50))
    ///     .with_scaling(2.0)
    ///     .build()?;
    /// let error = GaxError::service(Status::default().set_code(503));
    /// let p = backoff.on_failure(&RetryState::new().set_attempt_count(1_u32), &error);
    /// assert_eq!(p, Duration::from_secs(5));
    /// let p = backoff.on_failure(&RetryState::new().set_attempt_count(2_u32), &error);
    /// assert_eq!(p, Duration::from_secs(10));
    /// # Ok::<(), Error>(())
    /// ```
    pub fn build(self) -> Result<ExponentialBackoff, Error> {
        if self.scaling.is_nan() || self.scaling < 1.0 {
            return Err(Error::InvalidScalingFactor(self.scaling));
        }
        if self.maximum_delay < self.initial_delay {
            return Err(Error::EmptyRange {
                maximum: self.maximum_delay,
                initial: self.initial_delay,
            });
        }
        Ok(ExponentialBackoff {
            maximum_delay: self.maximum_delay,
            scaling: self.scaling,
            initial_delay: self.initial_delay,
        })
    }

    /// Creates a new exponential backoff policy clamping the ranges towards
    /// recommended values.
    ///
    /// The maximum delay is clamped first, to be between one second and one
    /// hour (both inclusive). Then the initial delay is clamped to be at most
    /// the maximum delay. Finally, the scaling factor is clamped to the
    /// `[1.0, 32.0]` range.
    ///
    /// # Example
    /// ```
    /// # use gae_deploy_gax::exponential_backoff::ExponentialBackoffBuilder;
    /// # use gae_deploy_gax::backoff_policy::BackoffPolicy;
    /// # use gae_deploy_gax::retry_state::RetryState;
    /// # use gae_deploy_gax::error::Error;
    /// use std::time::Duration;
    /// let backoff = ExponentialBackoffBuilder::new().clamp();
    /// let state = RetryState::new().set_attempt_count(1_u32);
    /// assert!(backoff.on_failure(&state, &Error::io("reset")) > Duration::ZERO);
    /// ```
    pub fn clamp(self) -> ExponentialBackoff {
        let scaling = if self.scaling.is_nan() {
            1.0
        } else {
            self.scaling.clamp(1.0, 32.0)
        };
        let maximum_delay = self
            .maximum_delay
            .clamp(Duration::from_secs(1), Duration::from_secs(60 * 60));
        let initial_delay = self.initial_delay.min(maximum_delay);
        ExponentialBackoff {
            initial_delay,
            maximum_delay,
            scaling,
        }
    }
}

impl Default for ExponentialBackoffBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Implements truncated exponential backoff.
#[derive(Clone, Debug)]
pub struct ExponentialBackoff {
    initial_delay: Duration,
    maximum_delay: Duration,
    scaling: f64,
}

impl ExponentialBackoff {
    /// The delay before applying the error multiplier.
    pub fn delay(&self, attempt_count: u32) -> Duration {
        if self.initial_delay.is_zero() {
            return Duration::ZERO;
        }
        let exp = std::cmp::min(i32::MAX as u32, attempt_count) as i32;
        let exp = exp.saturating_sub(1);
        let scaling = self.scaling.powi(exp);
        if scaling >= self.maximum_delay.div_duration_f64(self.initial_delay) {
            self.maximum_delay
        } else {
            // .mul_f64() cannot panic, scaling >= 1.0 and the product is
            // below the maximum delay.
            self.initial_delay.mul_f64(scaling)
        }
    }
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(2),
            maximum_delay: Duration::from_secs(60),
            scaling: 1.0,
        }
    }
}

impl crate::backoff_policy::BackoffPolicy for ExponentialBackoff {
    fn on_failure(&self, state: &RetryState, error: &crate::error::Error) -> Duration {
        let multiplier = classify(error).backoff_multiplier();
        self.delay(state.attempt_count).saturating_mul(multiplier)
    }
}
