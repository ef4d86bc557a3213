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

//! Configuration for [Client][crate::client::Client].

use gax::exponential_backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use gax::retry_policy::LimitedAttemptCount;
use lro::PollConfig;
use std::time::Duration;

pub const DEFAULT_APPENGINE_ENDPOINT: &str = "https://appengine.googleapis.com";
pub const DEFAULT_CLOUDBUILD_ENDPOINT: &str = "https://cloudbuild.googleapis.com";
pub const DEFAULT_SERVICEUSAGE_ENDPOINT: &str = "https://serviceusage.googleapis.com";
pub const DEFAULT_MAX_CONCURRENCY: usize = 8;

// Backoff grows with the attempt count, but never beyond this value.
const MAXIMUM_DELAY: Duration = Duration::from_secs(60);

/// Errors creating a client.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("invalid retry settings: {0}")]
    RetrySettings(#[from] gax::exponential_backoff::Error),
    #[error("cannot create the HTTP client: {0}")]
    Transport(#[source] reqwest::Error),
}

/// The configuration shared by all the requests made by a client.
///
/// # Example
/// ```
/// # use gae_deploy_appengine::options::ClientConfig;
/// use std::time::Duration;
/// let config = ClientConfig::default()
///     .with_access_token("ya29.abc")
///     .with_appengine_endpoint("http://localhost:8080");
/// assert_eq!(config.appengine_endpoint(), "http://localhost:8080");
/// ```
#[derive(Clone, Debug, Default)]
pub struct ClientConfig {
    pub appengine_endpoint: Option<String>,
    pub cloudbuild_endpoint: Option<String>,
    pub serviceusage_endpoint: Option<String>,
    /// A bearer token included in all requests.
    pub access_token: Option<String>,
    pub retry: RetrySettings,
    /// Controls polling for operations and builds.
    pub poll: PollConfig,
    /// Controls polling when confirming serving status changes.
    pub serving_poll: ServingPollConfig,
    /// The maximum number of requests in flight for workflows that fan out,
    /// such as enabling several APIs.
    pub max_concurrency: Option<usize>,
}

/// The polling configuration to confirm serving status changes.
///
/// A separate type only to change the default timeout.
#[derive(Clone, Debug)]
pub struct ServingPollConfig(pub PollConfig);

impl Default for ServingPollConfig {
    fn default() -> Self {
        Self(PollConfig::serving_status())
    }
}

impl ClientConfig {
    pub fn with_appengine_endpoint<V: Into<String>>(mut self, v: V) -> Self {
        self.appengine_endpoint = Some(v.into());
        self
    }

    pub fn with_cloudbuild_endpoint<V: Into<String>>(mut self, v: V) -> Self {
        self.cloudbuild_endpoint = Some(v.into());
        self
    }

    pub fn with_serviceusage_endpoint<V: Into<String>>(mut self, v: V) -> Self {
        self.serviceusage_endpoint = Some(v.into());
        self
    }

    pub fn with_access_token<V: Into<String>>(mut self, v: V) -> Self {
        self.access_token = Some(v.into());
        self
    }

    pub fn with_retry(mut self, v: RetrySettings) -> Self {
        self.retry = v;
        self
    }

    /// Changes the interval for all pollers.
    pub fn with_poll_interval<V: Into<Duration>>(mut self, v: V) -> Self {
        let v = v.into();
        self.poll = self.poll.with_interval(v);
        self.serving_poll.0 = self.serving_poll.0.with_interval(v);
        self
    }

    /// Changes the timeout for all pollers.
    pub fn with_poll_timeout<V: Into<Duration>>(mut self, v: V) -> Self {
        let v = v.into();
        self.poll = self.poll.with_timeout(v);
        self.serving_poll.0 = self.serving_poll.0.with_timeout(v);
        self
    }

    pub fn with_max_concurrency(mut self, v: usize) -> Self {
        self.max_concurrency = Some(v);
        self
    }

    /// The fan-out limit, never less than one.
    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency.unwrap_or(DEFAULT_MAX_CONCURRENCY).max(1)
    }

    pub fn appengine_endpoint(&self) -> &str {
        endpoint(&self.appengine_endpoint, DEFAULT_APPENGINE_ENDPOINT)
    }

    pub fn cloudbuild_endpoint(&self) -> &str {
        endpoint(&self.cloudbuild_endpoint, DEFAULT_CLOUDBUILD_ENDPOINT)
    }

    pub fn serviceusage_endpoint(&self) -> &str {
        endpoint(&self.serviceusage_endpoint, DEFAULT_SERVICEUSAGE_ENDPOINT)
    }
}

fn endpoint<'a>(value: &'a Option<String>, default: &'static str) -> &'a str {
    value.as_deref().unwrap_or(default).trim_end_matches('/')
}

/// Controls how mutating requests are resubmitted.
///
/// Only transient errors are retried, see [classify][gax::classify::classify].
#[derive(Clone, Debug)]
pub struct RetrySettings {
    /// The maximum number of attempts for most requests.
    pub max_attempts: u32,
    /// The maximum number of attempts to create a version.
    ///
    /// Deployments often collide with other operations in the same
    /// application, these conflicts are expected and resolve on their own.
    pub deploy_max_attempts: u32,
    /// The delay before the second attempt.
    pub base_interval: Duration,
    /// Each attempt waits this much longer than the previous one.
    pub backoff_factor: f64,
}

impl RetrySettings {
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;
    pub const DEFAULT_DEPLOY_MAX_ATTEMPTS: u32 = 30;
    pub const DEFAULT_BASE_INTERVAL: Duration = Duration::from_secs(2);

    pub fn with_max_attempts(mut self, v: u32) -> Self {
        self.max_attempts = v;
        self
    }

    pub fn with_deploy_max_attempts(mut self, v: u32) -> Self {
        self.deploy_max_attempts = v;
        self
    }

    pub fn with_base_interval<V: Into<Duration>>(mut self, v: V) -> Self {
        self.base_interval = v.into();
        self
    }

    pub fn with_backoff_factor<V: Into<f64>>(mut self, v: V) -> Self {
        self.backoff_factor = v.into();
        self
    }

    /// The retry policy for most requests.
    pub fn retry_policy(&self) -> LimitedAttemptCount {
        LimitedAttemptCount::new(self.max_attempts)
    }

    /// The retry policy to create versions.
    pub fn deploy_retry_policy(&self) -> LimitedAttemptCount {
        LimitedAttemptCount::new(self.deploy_max_attempts)
    }

    /// Creates the backoff policy, fails if the settings are invalid.
    pub fn backoff_policy(&self) -> Result<ExponentialBackoff, Error> {
        let backoff = ExponentialBackoffBuilder::new()
            .with_initial_delay(self.base_interval)
            .with_maximum_delay(MAXIMUM_DELAY.max(self.base_interval))
            .with_scaling(self.backoff_factor)
            .build()?;
        Ok(backoff)
    }
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: Self::DEFAULT_MAX_ATTEMPTS,
            deploy_max_attempts: Self::DEFAULT_DEPLOY_MAX_ATTEMPTS,
            base_interval: Self::DEFAULT_BASE_INTERVAL,
            backoff_factor: 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.appengine_endpoint(), DEFAULT_APPENGINE_ENDPOINT);
        assert_eq!(config.cloudbuild_endpoint(), DEFAULT_CLOUDBUILD_ENDPOINT);
        assert_eq!(config.serviceusage_endpoint(), DEFAULT_SERVICEUSAGE_ENDPOINT);
        assert!(config.access_token.is_none(), "{config:?}");
        assert_eq!(config.poll.timeout(), Duration::from_secs(300));
        assert_eq!(config.serving_poll.0.timeout(), Duration::from_secs(600));
        assert_eq!(config.max_concurrency(), DEFAULT_MAX_CONCURRENCY);

        let retry = config.retry;
        assert_eq!(retry.max_attempts, 10);
        assert_eq!(retry.deploy_max_attempts, 30);
        assert_eq!(retry.base_interval, Duration::from_secs(2));
        assert_eq!(retry.retry_policy().maximum_attempts(), 10);
        assert_eq!(retry.deploy_retry_policy().maximum_attempts(), 30);
    }

    #[test]
    fn endpoints() {
        let config = ClientConfig::default()
            .with_appengine_endpoint("http://localhost:8080/")
            .with_cloudbuild_endpoint("http://localhost:8081")
            .with_serviceusage_endpoint("http://localhost:8082");
        assert_eq!(config.appengine_endpoint(), "http://localhost:8080");
        assert_eq!(config.cloudbuild_endpoint(), "http://localhost:8081");
        assert_eq!(config.serviceusage_endpoint(), "http://localhost:8082");
    }

    #[test]
    fn max_concurrency() {
        let config = ClientConfig::default().with_max_concurrency(2);
        assert_eq!(config.max_concurrency(), 2);
        let config = ClientConfig::default().with_max_concurrency(0);
        assert_eq!(config.max_concurrency(), 1);
    }

    #[test]
    fn poll_settings() {
        let config = ClientConfig::default()
            .with_poll_interval(Duration::from_millis(10))
            .with_poll_timeout(Duration::from_secs(30));
        assert_eq!(config.poll.interval(), Duration::from_millis(10));
        assert_eq!(config.poll.timeout(), Duration::from_secs(30));
        assert_eq!(config.serving_poll.0.interval(), Duration::from_millis(10));
        assert_eq!(config.serving_poll.0.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn backoff_policy() -> anyhow::Result<()> {
        let backoff = RetrySettings::default().backoff_policy()?;
        assert_eq!(backoff.delay(1), Duration::from_secs(2));
        assert_eq!(backoff.delay(5), Duration::from_secs(2));

        let backoff = RetrySettings::default()
            .with_backoff_factor(2.0)
            .backoff_policy()?;
        assert_eq!(backoff.delay(3), Duration::from_secs(8));

        let backoff = RetrySettings::default()
            .with_base_interval(Duration::from_secs(120))
            .backoff_policy()?;
        assert_eq!(backoff.delay(1), Duration::from_secs(120));

        let err = RetrySettings::default()
            .with_backoff_factor(0.5)
            .backoff_policy()
            .unwrap_err();
        assert!(matches!(err, Error::RetrySettings(_)), "{err:?}");
        Ok(())
    }
}
