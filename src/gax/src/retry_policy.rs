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

//! Defines traits for retry policies and some common implementations.
//!
//! The tool automatically resubmits mutating requests when they fail with a
//! transient error, as determined by [classify]. The number of attempts is
//! always capped, deployments use a higher cap because conflicts with other
//! deployments are common.
//!
//! # Example
//! ```
//! # use gae_deploy_gax::retry_policy::*;
//! // Retry transient errors, give up after 10 attempts.
//! let policy = TransientErrors.with_attempt_limit(10);
//! ```
//!
//! [classify]: crate::classify::classify

use crate::classify::classify;
use crate::error::Error;
use crate::retry_result::RetryResult;
use crate::retry_state::RetryState;

/// Determines how errors are handled in the retry loop.
pub trait RetryPolicy: Send + Sync + std::fmt::Debug {
    /// Query the retry policy after an error.
    ///
    /// # Parameters
    /// * `state` - the retry loop state. The attempt count includes the
    ///   attempt that just failed, it is always non-zero.
    /// * `error` - the last error when attempting the request.
    fn on_error(&self, state: &RetryState, error: Error) -> RetryResult;
}

/// Extension trait for [`RetryPolicy`]
pub trait RetryPolicyExt: RetryPolicy + Sized {
    /// Decorate a [`RetryPolicy`] to limit the number of attempts.
    ///
    /// # Example
    /// ```
    /// # use gae_deploy_gax::retry_policy::*;
    /// # use gae_deploy_gax::retry_state::RetryState;
    /// # use gae_deploy_gax::error::{Error, rpc::Status};
    /// let policy = TransientErrors.with_attempt_limit(3);
    /// let unavailable = || Error::service(Status::default().set_code(503));
    /// let state = RetryState::new().set_attempt_count(1_u32);
    /// assert!(policy.on_error(&state, unavailable()).is_continue());
    /// let state = RetryState::new().set_attempt_count(3_u32);
    /// assert!(policy.on_error(&state, unavailable()).is_exhausted());
    /// ```
    fn with_attempt_limit(self, maximum_attempts: u32) -> LimitedAttemptCount<Self> {
        LimitedAttemptCount::custom(self, maximum_attempts)
    }
}

impl<T: RetryPolicy> RetryPolicyExt for T {}

/// Continues the loop on transient errors.
///
/// Any error classified as rate limited, a concurrent operation conflict,
/// or a server error is transient. Everything else stops the loop
/// immediately.
///
/// This policy never stops the loop on its own, decorate it with
/// [with_attempt_limit][RetryPolicyExt::with_attempt_limit].
#[derive(Clone, Debug)]
pub struct TransientErrors;

impl RetryPolicy for TransientErrors {
    fn on_error(&self, _state: &RetryState, error: Error) -> RetryResult {
        if classify(&error).is_transient() {
            RetryResult::Continue(error)
        } else {
            RetryResult::Permanent(error)
        }
    }
}

/// A retry policy decorator that limits the number of attempts.
///
/// When the inner policy would continue, and the attempt count has reached
/// the limit, the loop stops and returns the last error unchanged.
#[derive(Debug)]
pub struct LimitedAttemptCount<P = TransientErrors>
where
    P: RetryPolicy,
{
    inner: P,
    maximum_attempts: u32,
}

impl LimitedAttemptCount {
    /// Creates a new instance, with the default inner policy.
    pub fn new(maximum_attempts: u32) -> Self {
        Self::custom(TransientErrors, maximum_attempts)
    }
}

impl<P> LimitedAttemptCount<P>
where
    P: RetryPolicy,
{
    /// Creates a new instance with a custom inner policy.
    pub fn custom(inner: P, maximum_attempts: u32) -> Self {
        Self {
            inner,
            maximum_attempts,
        }
    }

    /// The configured limit.
    pub fn maximum_attempts(&self) -> u32 {
        self.maximum_attempts
    }
}

impl<P> RetryPolicy for LimitedAttemptCount<P>
where
    P: RetryPolicy,
{
    fn on_error(&self, state: &RetryState, error: Error) -> RetryResult {
        match self.inner.on_error(state, error) {
            RetryResult::Continue(e) if state.attempt_count >= self.maximum_attempts => {
                RetryResult::Exhausted(e)
            }
            flow => flow,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::rpc::Status;

    fn from_status(code: i32, message: &str) -> Error {
        Error::service(Status::default().set_code(code).set_message(message))
    }

    fn unavailable() -> Error {
        from_status(503, "try again")
    }

    fn conflict() -> Error {
        from_status(409, "Operation is already in progress for project p")
    }

    fn permission_denied() -> Error {
        from_status(403, "uh-oh")
    }

    fn state(attempt_count: u32) -> RetryState {
        RetryState::new().set_attempt_count(attempt_count)
    }

    mockall::mock! {
        #[derive(Debug)]
        Policy {}
        impl RetryPolicy for Policy {
            fn on_error(&self, state: &RetryState, error: Error) -> RetryResult;
        }
    }

    #[test]
    fn transient_errors() {
        let p = TransientErrors;
        assert!(p.on_error(&state(1), unavailable()).is_continue());
        assert!(p.on_error(&state(1), conflict()).is_continue());
        assert!(p.on_error(&state(1), from_status(429, "slow down")).is_continue());
        assert!(p.on_error(&state(1), from_status(500, "oops")).is_continue());

        assert!(p.on_error(&state(1), permission_denied()).is_permanent());
        assert!(
            p.on_error(&state(1), from_status(400, "quotas were exceeded"))
                .is_permanent()
        );
        assert!(p.on_error(&state(1), Error::io("reset")).is_permanent());
        assert!(p.on_error(&state(1), Error::timeout("slow")).is_permanent());
    }

    #[test]
    fn limited_attempt_count_on_error() {
        let mut mock = MockPolicy::new();
        mock.expect_on_error()
            .times(1..)
            .returning(|_, e| RetryResult::Continue(e));

        let policy = LimitedAttemptCount::custom(mock, 3);
        assert_eq!(policy.maximum_attempts(), 3);
        assert!(policy.on_error(&state(1), unavailable()).is_continue());
        assert!(policy.on_error(&state(2), unavailable()).is_continue());
        assert!(policy.on_error(&state(3), unavailable()).is_exhausted());
        assert!(policy.on_error(&state(4), unavailable()).is_exhausted());
    }

    #[test]
    fn limited_attempt_count_forwards_permanent() {
        let mut mock = MockPolicy::new();
        mock.expect_on_error()
            .times(2)
            .returning(|_, e| RetryResult::Permanent(e));

        let policy = LimitedAttemptCount::custom(mock, 3);
        assert!(policy.on_error(&state(1), permission_denied()).is_permanent());
        assert!(policy.on_error(&state(5), permission_denied()).is_permanent());
    }

    #[test]
    fn limited_attempt_count_preserves_error() {
        let policy = LimitedAttemptCount::new(1);
        let flow = policy.on_error(&state(1), conflict());
        match flow {
            RetryResult::Exhausted(e) => {
                assert_eq!(e.status().map(|s| s.code), Some(409), "{e:?}");
            }
            _ => panic!("expected an exhausted result, got {flow:?}"),
        }
    }
}
