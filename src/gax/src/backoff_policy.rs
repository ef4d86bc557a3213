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

//! Defines the trait for backoff policies.
//!
//! Retry strategies should avoid immediately resubmitting a request, the
//! service may need time to recover, or another operation may need time to
//! finish. [Exponential backoff] is a well known algorithm to find an
//! acceptable delay between retries.
//!
//! Unlike a general purpose backoff, the delay here also depends on the
//! error: concurrent operation conflicts wait longer than server errors.
//!
//! # Example
//! ```
//! # use gae_deploy_gax::backoff_policy::BackoffPolicy;
//! # use gae_deploy_gax::exponential_backoff::ExponentialBackoffBuilder;
//! # use gae_deploy_gax::retry_state::RetryState;
//! # use gae_deploy_gax::error::{Error, rpc::Status};
//! use std::time::Duration;
//!
//! let policy = ExponentialBackoffBuilder::new()
//!     .with_initial_delay(Duration::from_secs(2))
//!     .with_scaling(1.0)
//!     .build()?;
//! let state = RetryState::new().set_attempt_count(1_u32);
//! let unavailable = Error::service(Status::default().set_code(503));
//! assert_eq!(policy.on_failure(&state, &unavailable), Duration::from_secs(2));
//! # Ok::<(), gae_deploy_gax::exponential_backoff::Error>(())
//! ```
//!
//! [Exponential backoff]: https://en.wikipedia.org/wiki/Exponential_backoff

use crate::error::Error;
use crate::retry_state::RetryState;
use std::time::Duration;

/// Defines the trait implemented by all backoff strategies.
pub trait BackoffPolicy: Send + Sync + std::fmt::Debug {
    /// Returns the backoff delay on a failure.
    ///
    /// # Parameters
    /// * `state` - the retry loop state. The attempt count includes the
    ///   attempt that just failed. This method is always called after the
    ///   first attempt.
    /// * `error` - the error reported by the last attempt.
    fn on_failure(&self, state: &RetryState, error: &Error) -> Duration;
}
