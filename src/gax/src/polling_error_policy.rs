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

//! Defines the types for polling error policies.
//!
//! The pollers in the `lro` crate fetch the status of an operation
//! repeatedly. By default any error fetching the status stops the polling
//! loop, the error is returned to the caller. Callers that want polling-level
//! tolerance can configure [TolerateTransient], then transient errors are
//! treated as "still in progress" and consume the timeout budget like any
//! other iteration.
//!
//! # Example
//! ```
//! # use gae_deploy_gax::polling_error_policy::*;
//! # use gae_deploy_gax::error::{Error, rpc::Status};
//! let policy = TolerateTransient;
//! let unavailable = Error::service(Status::default().set_code(503));
//! assert!(policy.on_error(1, unavailable).is_continue());
//! ```

use crate::classify::classify;
use crate::error::Error;
use crate::retry_result::RetryResult;
use std::sync::Arc;

/// Determines how errors are handled in the polling loop.
pub trait PollingErrorPolicy: Send + Sync + std::fmt::Debug {
    /// Query the polling policy after an error.
    ///
    /// # Parameters
    /// * `attempt_count` - the number of status requests so far, including
    ///   the one that failed.
    /// * `error` - the error fetching the status.
    fn on_error(&self, attempt_count: u32, error: Error) -> RetryResult;
}

/// Stops the polling loop on any error.
#[derive(Clone, Debug, Default)]
pub struct Propagate;

impl PollingErrorPolicy for Propagate {
    fn on_error(&self, _attempt_count: u32, error: Error) -> RetryResult {
        RetryResult::Permanent(error)
    }
}

/// Continues the polling loop on transient errors.
///
/// The classification is the same used to resubmit mutating requests, see
/// [classify][crate::classify::classify].
#[derive(Clone, Debug, Default)]
pub struct TolerateTransient;

impl PollingErrorPolicy for TolerateTransient {
    fn on_error(&self, attempt_count: u32, error: Error) -> RetryResult {
        let class = classify(&error);
        if class.is_transient() {
            tracing::debug!(attempt_count, ?class, "ignoring error while polling: {error}");
            RetryResult::Continue(error)
        } else {
            RetryResult::Permanent(error)
        }
    }
}

/// A helper type to use [PollingErrorPolicy] in client and request options.
#[derive(Clone, Debug)]
pub struct PollingErrorPolicyArg(pub(crate) Arc<dyn PollingErrorPolicy>);

impl PollingErrorPolicyArg {
    pub fn policy(&self) -> Arc<dyn PollingErrorPolicy> {
        self.0.clone()
    }
}

impl Default for PollingErrorPolicyArg {
    fn default() -> Self {
        Self(Arc::new(Propagate))
    }
}

impl<T: PollingErrorPolicy + 'static> std::convert::From<T> for PollingErrorPolicyArg {
    fn from(value: T) -> Self {
        Self(Arc::new(value))
    }
}

impl std::convert::From<Arc<dyn PollingErrorPolicy>> for PollingErrorPolicyArg {
    fn from(value: Arc<dyn PollingErrorPolicy>) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::rpc::Status;

    fn from_status(code: i32, message: &str) -> Error {
        Error::service(Status::default().set_code(code).set_message(message))
    }

    #[test]
    fn propagate() {
        let p = Propagate;
        assert!(p.on_error(1, from_status(503, "try again")).is_permanent());
        assert!(p.on_error(1, from_status(404, "not found")).is_permanent());
        assert!(p.on_error(1, Error::io("reset")).is_permanent());
    }

    #[test]
    fn tolerate_transient() {
        let p = TolerateTransient;
        assert!(p.on_error(1, from_status(503, "try again")).is_continue());
        assert!(p.on_error(2, from_status(500, "oops")).is_continue());
        assert!(p.on_error(3, from_status(429, "slow down")).is_continue());
        assert!(p.on_error(1, from_status(404, "not found")).is_permanent());
        assert!(p.on_error(1, Error::io("reset")).is_permanent());
    }

    #[test]
    fn arg() {
        let arg = PollingErrorPolicyArg::default();
        assert!(arg.policy().on_error(1, from_status(503, "x")).is_permanent());

        let arg = PollingErrorPolicyArg::from(TolerateTransient);
        assert!(arg.policy().on_error(1, from_status(503, "x")).is_continue());

        let policy: Arc<dyn PollingErrorPolicy> = Arc::new(Propagate);
        let arg = PollingErrorPolicyArg::from(policy);
        assert!(arg.policy().on_error(1, from_status(503, "x")).is_permanent());
    }
}
