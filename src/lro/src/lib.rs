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

//! Types and functions to wait for long-running operations (LROs).
//!
//! Mutating requests against App Engine, Cloud Build, and Service Usage
//! return an operation handle. The functions in this crate poll the status
//! of these operations until they complete, fail, or the timeout budget is
//! exhausted.
//!
//! The building block is [poll], a generic "repeat until done or timeout"
//! loop. The [operation] module knows what "done" and "failed" look like for
//! operation resources, including operations that turn into Cloud Build
//! builds. The [serving] module confirms changes by re-reading the resource
//! itself, for changes where the operation never reports completion.

pub use gax::Result;
pub use gax::error::Error;
use gax::polling_error_policy::{PollingErrorPolicy, PollingErrorPolicyArg};
use gax::retry_result::RetryResult;
use std::time::Duration;

pub mod operation;
pub mod serving;

// Zero intervals still consume budget, otherwise the loop would never end.
const MINIMUM_STEP: Duration = Duration::from_millis(1);

/// The outcome of a single polling iteration.
///
/// Verification functions return this type, or anything that converts into
/// it. Notably `Option<PollResult>` and `bool` convert into it: `None` and
/// `false` mean [Pending][PollResult::Pending], `true` means
/// [Done][PollResult::Done].
#[derive(Clone, Debug, PartialEq)]
pub enum PollResult {
    /// Keep waiting.
    Pending,
    /// The operation completed successfully, the poller returns the last
    /// response.
    Done,
    /// The operation completed with an error. The payload is preserved for
    /// diagnostics.
    Failed(serde_json::Value),
    /// Poll a different resource from now on, identified by this token.
    NextState(String),
}

impl From<Option<PollResult>> for PollResult {
    fn from(value: Option<PollResult>) -> Self {
        value.unwrap_or(PollResult::Pending)
    }
}

impl From<bool> for PollResult {
    fn from(value: bool) -> Self {
        if value {
            PollResult::Done
        } else {
            PollResult::Pending
        }
    }
}

/// Controls the polling loop.
///
/// # Example
/// ```
/// # use gae_deploy_lro::PollConfig;
/// use std::time::Duration;
/// let config = PollConfig::default()
///     .with_interval(Duration::from_secs(2))
///     .with_timeout(Duration::from_secs(120));
/// assert_eq!(config.interval(), Duration::from_secs(2));
/// ```
#[derive(Clone, Debug)]
pub struct PollConfig {
    interval: Duration,
    timeout: Duration,
    error_policy: PollingErrorPolicyArg,
    console_url: Option<String>,
}

impl PollConfig {
    /// The default interval between status requests.
    pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(4);
    /// The default timeout for operations.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5 * 60);
    /// The default timeout when confirming serving status changes.
    pub const SERVING_STATUS_TIMEOUT: Duration = Duration::from_secs(10 * 60);

    /// The configuration for serving status confirmations.
    ///
    /// Serving status changes propagate slowly, this uses a longer timeout.
    pub fn serving_status() -> Self {
        Self::default().with_timeout(Self::SERVING_STATUS_TIMEOUT)
    }

    /// Change the interval between status requests.
    pub fn with_interval<V: Into<Duration>>(mut self, v: V) -> Self {
        self.interval = v.into();
        self
    }

    /// Change the timeout budget.
    pub fn with_timeout<V: Into<Duration>>(mut self, v: V) -> Self {
        self.timeout = v.into();
        self
    }

    /// Change how errors fetching the status are handled.
    ///
    /// # Example
    /// ```
    /// # use gae_deploy_lro::PollConfig;
    /// use gax::polling_error_policy::TolerateTransient;
    /// let config = PollConfig::default().with_error_policy(TolerateTransient);
    /// ```
    pub fn with_error_policy<V: Into<PollingErrorPolicyArg>>(mut self, v: V) -> Self {
        self.error_policy = v.into();
        self
    }

    /// Where users can check the operation manually.
    ///
    /// Included in the diagnostics when fetching the status fails.
    pub fn with_console_url<V: Into<String>>(mut self, v: V) -> Self {
        self.console_url = Some(v.into());
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn console_url(&self) -> Option<&str> {
        self.console_url.as_deref()
    }

    pub(crate) fn error_policy(&self) -> std::sync::Arc<dyn PollingErrorPolicy> {
        self.error_policy.policy()
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Self::DEFAULT_INTERVAL,
            timeout: Self::DEFAULT_TIMEOUT,
            error_policy: PollingErrorPolicyArg::default(),
            console_url: None,
        }
    }
}

/// Polls until `verify` accepts a response, or the timeout budget expires.
///
/// Calls `request` and passes the response to `verify`:
/// * [Done][PollResult::Done] returns the response.
/// * [Failed][PollResult::Failed] returns an [Error::failed] with the payload.
/// * [NextState][PollResult::NextState] calls `request` again, immediately,
///   with the new token. The token is used for all subsequent requests.
/// * [Pending][PollResult::Pending] waits for the configured interval and
///   calls `request` again with the current token.
///
/// Each pending iteration consumes one interval from the timeout budget.
/// When the next wait would exceed the budget, the function returns
/// [Error::timeout]. The `Display` output of that error is `timeout`, use
/// [Error::is_timeout] to distinguish it from failures.
///
/// The first call to `request` receives `None`.
///
/// `verify` is a plain function, use [poll_with_async_verify] when it needs
/// to await.
///
/// # Example
/// ```
/// # tokio_test::block_on(async {
/// use gae_deploy_lro::{poll, PollConfig, PollResult};
/// use std::time::Duration;
/// let mut count = 0;
/// let config = PollConfig::default().with_interval(Duration::from_millis(1));
/// let response = poll(
///     async |_token| { count += 1; Ok(count) },
///     |n: &i32| (*n >= 3).then_some(PollResult::Done),
///     &config,
/// ).await?;
/// assert_eq!(response, 3);
/// # gae_deploy_lro::Result::<()>::Ok(()) }).unwrap();
/// ```
pub async fn poll<R, Q, V, P>(request: Q, verify: V, config: &PollConfig) -> Result<R>
where
    Q: AsyncFnMut(Option<String>) -> Result<R>,
    V: Fn(&R) -> P,
    P: Into<PollResult>,
{
    poll_with_sleep(request, verify, config, async |d| gax::delay::delay(d).await).await
}

/// Like [poll], using `sleep` to implement the waits.
pub async fn poll_with_sleep<R, Q, V, P, S>(
    request: Q,
    verify: V,
    config: &PollConfig,
    sleep: S,
) -> Result<R>
where
    Q: AsyncFnMut(Option<String>) -> Result<R>,
    V: Fn(&R) -> P,
    P: Into<PollResult>,
    S: AsyncFn(Duration) -> (),
{
    poll_loop(request, async |r: &R| verify(r), config, sleep).await
}

/// Like [poll], where `verify` may await, for example to fetch the details
/// of a failure.
///
/// # Example
/// ```
/// # tokio_test::block_on(async {
/// use gae_deploy_lro::{poll_with_async_verify, PollConfig, PollResult};
/// let response = poll_with_async_verify(
///     async |_token| Ok(42),
///     async |n: &i32| {
///         tokio::task::yield_now().await;
///         (*n == 42).then_some(PollResult::Done)
///     },
///     &PollConfig::default(),
/// ).await?;
/// assert_eq!(response, 42);
/// # gae_deploy_lro::Result::<()>::Ok(()) }).unwrap();
/// ```
pub async fn poll_with_async_verify<R, Q, V, P>(
    request: Q,
    verify: V,
    config: &PollConfig,
) -> Result<R>
where
    Q: AsyncFnMut(Option<String>) -> Result<R>,
    V: AsyncFn(&R) -> P,
    P: Into<PollResult>,
{
    poll_loop(request, verify, config, async |d| gax::delay::delay(d).await).await
}

async fn poll_loop<R, Q, V, P, S>(
    mut request: Q,
    verify: V,
    config: &PollConfig,
    sleep: S,
) -> Result<R>
where
    Q: AsyncFnMut(Option<String>) -> Result<R>,
    V: AsyncFn(&R) -> P,
    P: Into<PollResult>,
    S: AsyncFn(Duration) -> (),
{
    let step = config.interval.max(MINIMUM_STEP);
    let mut remaining = config.timeout;
    let mut token: Option<String> = None;
    let mut attempt_count = 0_u32;
    loop {
        attempt_count += 1;
        match request(token.clone()).await {
            Ok(response) => {
                let outcome: PollResult = verify(&response).await.into();
                match outcome {
                    PollResult::Done => return Ok(response),
                    PollResult::Failed(payload) => return Err(failed(payload, config)),
                    PollResult::NextState(next) => {
                        tracing::debug!(attempt_count, next = %next, "switching polling target");
                        token = Some(next);
                        continue;
                    }
                    PollResult::Pending => {}
                }
            }
            Err(e) => match config.error_policy().on_error(attempt_count, e) {
                RetryResult::Continue(_) => {}
                RetryResult::Permanent(e) | RetryResult::Exhausted(e) => return Err(e),
            },
        }
        remaining = match remaining.checked_sub(step) {
            Some(r) => r,
            None => {
                let message = format!(
                    "the operation did not complete after {attempt_count} status checks in {:?}",
                    config.timeout
                );
                return Err(Error::timeout(match config.console_url() {
                    Some(url) => format!("{message}, check its status at {url}"),
                    None => message,
                }));
            }
        };
        tracing::debug!(attempt_count, ?remaining, "operation in progress");
        sleep(config.interval).await;
    }
}

fn failed(payload: serde_json::Value, config: &PollConfig) -> Error {
    match config.console_url() {
        Some(url) => Error::failed_with_source(payload, format!("check the details at {url}")),
        None => Error::failed(payload),
    }
}
