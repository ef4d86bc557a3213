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

//! Resolves operation resources.
//!
//! The App Engine Admin API and Service Usage use a (older) form of LROs,
//! where the "Operation" type does not include a typed result, and the
//! errors are reported in an `error` field. Each API defines its own
//! "Operation" type, the [DiscoveryOperation] trait abstracts over them.
//!
//! Deployments add a twist: the App Engine operation starts a Cloud Build
//! build, and the operation metadata includes the build id. From then on
//! the build is the better signal, the resolver stops polling the operation
//! and polls the build instead.

use crate::{Error, PollConfig, PollResult, Result, poll};
use gax::error::rpc::Status;
use serde::Serialize;

/// Defines the trait for an "Operation" type in the resolver.
///
/// The trait defines how to determine if an operation has completed, if it
/// completed with an error, and how to find the build (if any) started by
/// the operation.
pub trait DiscoveryOperation: Serialize {
    /// Returns true if the operation has completed, with or without an error.
    fn done(&self) -> bool;

    /// Returns the name of the operation.
    fn name(&self) -> Option<&str>;

    /// Determines if the operation reports an error.
    ///
    /// Operations may report errors before they are marked as done, any
    /// error is terminal.
    fn status(&self) -> Option<Status>;

    /// The id of the Cloud Build build tracking this operation, if any.
    fn build_id(&self) -> Option<&str> {
        None
    }
}

/// Defines the trait for a "Build" type in the resolver.
pub trait BuildResource: Serialize {
    /// The build status, for example `WORKING` or `SUCCESS`.
    fn build_status(&self) -> Option<&str>;
}

/// Build states that will never change to `SUCCESS`.
pub const BUILD_FAILURE_STATES: [&str; 5] =
    ["FAILURE", "INTERNAL_ERROR", "TIMEOUT", "CANCELLED", "EXPIRED"];

/// Classifies an operation.
///
/// # Example
/// ```
/// # use gae_deploy_lro::{PollResult, operation::*};
/// # use gax::error::rpc::Status;
/// #[derive(serde::Serialize)]
/// struct Op { done: bool }
/// impl DiscoveryOperation for Op {
///     fn done(&self) -> bool { self.done }
///     fn name(&self) -> Option<&str> { None }
///     fn status(&self) -> Option<Status> { None }
/// }
/// assert_eq!(operation_state(&Op { done: false }), PollResult::Pending);
/// assert_eq!(operation_state(&Op { done: true }), PollResult::Done);
/// ```
pub fn operation_state<O: DiscoveryOperation>(operation: &O) -> PollResult {
    if operation.status().is_some() {
        return PollResult::Failed(payload(operation));
    }
    if operation.done() {
        return PollResult::Done;
    }
    match operation.build_id() {
        Some(id) => PollResult::NextState(id.to_string()),
        None => PollResult::Pending,
    }
}

/// Classifies a build.
pub fn build_state<B: BuildResource>(build: &B) -> PollResult {
    match build.build_status() {
        Some("SUCCESS") => PollResult::Done,
        Some(s) if BUILD_FAILURE_STATES.contains(&s) => PollResult::Failed(payload(build)),
        _ => PollResult::Pending,
    }
}

/// The resource that signaled completion.
#[derive(Clone, Debug, PartialEq)]
pub enum Completion<O, B> {
    /// The operation completed without starting a build.
    Operation(O),
    /// The operation started a build, and the build completed.
    Build(B),
}

impl<O, B> Completion<O, B>
where
    O: DiscoveryOperation,
    B: BuildResource,
{
    fn state(&self) -> PollResult {
        match self {
            Self::Operation(o) => operation_state(o),
            Self::Build(b) => build_state(b),
        }
    }
}

/// Polls an operation until it completes, following builds.
///
/// Starts by calling `query_operation`. If the operation reports a build id,
/// the loop switches to `query_build` with that id. `on_success` is called
/// with the resource that signaled completion, `on_failure` with the payload
/// of the resource that reported the failure.
///
/// Errors fetching the status are logged with the console URL from the
/// configuration and returned. Whether they stop the loop is decided by the
/// error policy in `config`.
pub async fn check_operation<O, B, QO, QB, OnSuccess, OnFailure>(
    mut query_operation: QO,
    mut query_build: QB,
    on_success: OnSuccess,
    on_failure: OnFailure,
    config: &PollConfig,
) -> Result<Completion<O, B>>
where
    O: DiscoveryOperation,
    B: BuildResource,
    QO: AsyncFnMut() -> Result<O>,
    QB: AsyncFnMut(String) -> Result<B>,
    OnSuccess: FnOnce(&Completion<O, B>),
    OnFailure: FnOnce(&serde_json::Value),
{
    let request = async |token: Option<String>| -> Result<Completion<O, B>> {
        match token {
            None => query_operation().await.map(Completion::Operation),
            Some(id) => query_build(id).await.map(Completion::Build),
        }
    };
    let result = poll(request, Completion::state, config).await;
    finish(result, on_success, on_failure, config)
}

/// Polls an operation until it completes, ignoring any builds.
///
/// Use this for operations that never start builds, such as traffic
/// migrations or API enablement.
pub async fn wait_operation<O, Q>(query: Q, config: &PollConfig) -> Result<O>
where
    O: DiscoveryOperation,
    Q: AsyncFnMut() -> Result<O>,
{
    let mut query = query;
    let request = async |_token: Option<String>| query().await;
    let verify = |o: &O| match operation_state(o) {
        PollResult::NextState(_) => PollResult::Pending,
        state => state,
    };
    let result = poll(request, verify, config).await;
    finish(result, |_| {}, |_| {}, config)
}

pub(crate) fn finish<T, OnSuccess, OnFailure>(
    result: Result<T>,
    on_success: OnSuccess,
    on_failure: OnFailure,
    config: &PollConfig,
) -> Result<T>
where
    OnSuccess: FnOnce(&T),
    OnFailure: FnOnce(&serde_json::Value),
{
    match result {
        Ok(r) => {
            on_success(&r);
            Ok(r)
        }
        Err(e) => {
            if let Some(payload) = e.failure_payload() {
                on_failure(payload);
                if let Some(url) = config.console_url() {
                    tracing::error!("the operation failed, check the details at {url}");
                }
            } else if !e.is_timeout() {
                log_status_error(&e, config);
            }
            Err(e)
        }
    }
}

fn log_status_error(error: &Error, config: &PollConfig) {
    match config.console_url() {
        Some(url) => tracing::error!(
            "cannot fetch the operation status, check its progress at {url}: {error}"
        ),
        None => tracing::error!("cannot fetch the operation status: {error}"),
    }
}

pub(crate) fn payload<T: Serialize>(resource: &T) -> serde_json::Value {
    serde_json::to_value(resource).unwrap_or_else(
        |e| serde_json::json!({ "message": format!("cannot serialize the resource: {e}") }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;
    use test_case::test_case;

    #[derive(Debug, Default, PartialEq, Serialize)]
    struct TestOperation {
        done: bool,
        build: Option<String>,
        error: Option<Status>,
    }

    impl DiscoveryOperation for TestOperation {
        fn done(&self) -> bool {
            self.done
        }
        fn name(&self) -> Option<&str> {
            Some("apps/p/operations/o")
        }
        fn status(&self) -> Option<Status> {
            self.error.clone()
        }
        fn build_id(&self) -> Option<&str> {
            self.build.as_deref()
        }
    }

    #[derive(Debug, PartialEq, Serialize)]
    struct TestBuild {
        status: &'static str,
    }

    impl BuildResource for TestBuild {
        fn build_status(&self) -> Option<&str> {
            Some(self.status)
        }
    }

    #[test]
    fn operation_states() {
        let op = TestOperation::default();
        assert_eq!(operation_state(&op), PollResult::Pending);

        let op = TestOperation {
            done: true,
            ..Default::default()
        };
        assert_eq!(operation_state(&op), PollResult::Done);

        let op = TestOperation {
            build: Some("b-1".into()),
            ..Default::default()
        };
        assert_eq!(operation_state(&op), PollResult::NextState("b-1".into()));

        let op = TestOperation {
            done: true,
            build: Some("b-1".into()),
            ..Default::default()
        };
        assert_eq!(operation_state(&op), PollResult::Done);

        let op = TestOperation {
            error: Some(Status::default().set_code(13).set_message("boom")),
            ..Default::default()
        };
        let want = json!({"done": false, "build": null, "error": {"code": 13, "message": "boom"}});
        assert_eq!(operation_state(&op), PollResult::Failed(want));
    }

    #[test_case("SUCCESS", true, false)]
    #[test_case("FAILURE", false, true)]
    #[test_case("INTERNAL_ERROR", false, true)]
    #[test_case("TIMEOUT", false, true)]
    #[test_case("CANCELLED", false, true)]
    #[test_case("EXPIRED", false, true)]
    #[test_case("QUEUED", false, false)]
    #[test_case("WORKING", false, false)]
    #[test_case("STATUS_UNKNOWN", false, false)]
    fn build_states(status: &'static str, done: bool, failed: bool) {
        let state = build_state(&TestBuild { status });
        assert_eq!(state == PollResult::Done, done, "{state:?}");
        assert_eq!(matches!(state, PollResult::Failed(_)), failed, "{state:?}");
    }

    #[test]
    fn finish_calls_on_failure() {
        let config = PollConfig::default();
        let mut seen = None;
        let result: Result<()> = finish(
            Err(Error::failed(json!({"statusDetail": "bad"}))),
            |_| panic!("unexpected success"),
            |p| seen = Some(p.clone()),
            &config,
        );
        assert!(result.is_err(), "{result:?}");
        assert_eq!(seen, Some(json!({"statusDetail": "bad"})));
    }

    #[test]
    fn finish_passes_other_errors() {
        let config = PollConfig::default().with_console_url("https://console.cloud.google.com");
        let result: Result<()> = finish(
            Err(Error::io("connection reset")),
            |_| panic!("unexpected success"),
            |_| panic!("unexpected failure"),
            &config,
        );
        let err = result.expect_err("the error is returned");
        assert!(err.is_io(), "{err:?}");

        let result: Result<()> = finish(
            Err(Error::timeout("slow")),
            |_| panic!("unexpected success"),
            |_| panic!("unexpected failure"),
            &config,
        );
        let err = result.expect_err("the error is returned");
        assert!(err.is_timeout(), "{err:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn wait_operation_ignores_builds() -> anyhow::Result<()> {
        let mut responses = vec![
            TestOperation {
                build: Some("b-1".into()),
                ..Default::default()
            },
            TestOperation {
                done: true,
                build: Some("b-1".into()),
                ..Default::default()
            },
        ]
        .into_iter();
        let config = PollConfig::default().with_interval(Duration::from_millis(10));
        let got = wait_operation(
            async || responses.next().ok_or_else(|| Error::io("no more responses")),
            &config,
        )
        .await?;
        assert!(got.done, "{got:?}");
        Ok(())
    }
}
