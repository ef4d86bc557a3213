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

//! Confirms serving status changes by reading the resource.
//!
//! Starting or stopping an App Engine version returns an operation, but the
//! operation does not reliably report completion even after the change takes
//! effect. Instead of polling the operation, these functions re-read the
//! version until its `servingStatus` matches the desired value.
//!
//! The operation behavior has been observed, not documented. Callers should
//! keep the operation name around, [wait_operation] may be enough in future
//! versions of the API.
//!
//! [wait_operation]: crate::operation::wait_operation

use crate::operation::{finish, payload};
use crate::{PollConfig, PollResult, Result, poll};
use gax::error::rpc::Status;
use serde::Serialize;

/// Defines the trait for resources with a serving status.
pub trait ServingResource: Serialize {
    /// The current serving status, for example `SERVING` or `STOPPED`.
    fn serving_status(&self) -> Option<&str>;

    /// An error reported in the body of the resource, if any.
    fn error_status(&self) -> Option<Status> {
        None
    }
}

/// Raw JSON resources.
///
/// Errors may appear as an `{"error": {"code": ..., "message": ...}}`
/// envelope, or as top-level `code` and `message` fields.
impl ServingResource for serde_json::Value {
    fn serving_status(&self) -> Option<&str> {
        self.get("servingStatus").and_then(|s| s.as_str())
    }

    fn error_status(&self) -> Option<Status> {
        Status::from_envelope(self).or_else(|| {
            let code = self.get("code")?.as_i64()?;
            let message = self.get("message")?.as_str()?;
            Some(
                Status::default()
                    .set_code(i32::try_from(code).ok()?)
                    .set_message(message),
            )
        })
    }
}

/// Classifies a resource given the desired serving status.
///
/// # Example
/// ```
/// # use gae_deploy_lro::{PollResult, serving::serving_state};
/// let version = serde_json::json!({"id": "v1", "servingStatus": "STOPPED"});
/// assert_eq!(serving_state(&version, "STOPPED"), PollResult::Done);
/// assert_eq!(serving_state(&version, "SERVING"), PollResult::Pending);
/// ```
pub fn serving_state<R: ServingResource>(resource: &R, target: &str) -> PollResult {
    if resource.error_status().is_some() {
        return PollResult::Failed(payload(resource));
    }
    if resource.serving_status() == Some(target) {
        return PollResult::Done;
    }
    PollResult::Pending
}

/// Polls a resource until its serving status matches `target`.
///
/// Use [PollConfig::serving_status] unless the caller has better defaults,
/// the change takes longer to propagate than most operations.
pub async fn confirm_serving_status<R, Q>(query: Q, target: &str, config: &PollConfig) -> Result<R>
where
    R: ServingResource,
    Q: AsyncFnMut() -> Result<R>,
{
    let mut query = query;
    let request = async |_token: Option<String>| query().await;
    let verify = |r: &R| serving_state(r, target);
    let result = poll(request, verify, config).await;
    finish(result, |_| {}, |_| {}, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    #[test]
    fn json_resources() {
        let v = json!({"id": "v1", "servingStatus": "SERVING"});
        assert_eq!(v.serving_status(), Some("SERVING"));
        assert_eq!(v.error_status(), None);

        let v = json!({"error": {"code": 404, "message": "not found"}});
        assert_eq!(
            v.error_status(),
            Some(Status::default().set_code(404).set_message("not found"))
        );
        let v = json!({"code": 3, "message": "bad version"});
        assert_eq!(
            v.error_status(),
            Some(Status::default().set_code(3).set_message("bad version"))
        );
        let v = json!({"message": "no code"});
        assert_eq!(v.error_status(), None);
    }

    #[test]
    fn serving_states() {
        let v = json!({"servingStatus": "SERVING"});
        assert_eq!(serving_state(&v, "SERVING"), PollResult::Done);
        assert_eq!(serving_state(&v, "STOPPED"), PollResult::Pending);

        let v = json!({"id": "v1"});
        assert_eq!(serving_state(&v, "SERVING"), PollResult::Pending);

        let v = json!({"code": 9, "message": "cannot stop", "servingStatus": "SERVING"});
        assert_eq!(serving_state(&v, "SERVING"), PollResult::Failed(v.clone()));
    }

    #[tokio::test(start_paused = true)]
    async fn confirm() -> anyhow::Result<()> {
        let mut responses = vec![
            json!({"servingStatus": "SERVING"}),
            json!({"servingStatus": "SERVING"}),
            json!({"servingStatus": "STOPPED"}),
        ]
        .into_iter();
        let mut calls = 0;
        let config = PollConfig::serving_status().with_interval(Duration::from_secs(1));
        let got = confirm_serving_status(
            async || {
                calls += 1;
                responses
                    .next()
                    .ok_or_else(|| crate::Error::io("no more responses"))
            },
            "STOPPED",
            &config,
        )
        .await?;
        assert_eq!(got, json!({"servingStatus": "STOPPED"}));
        assert_eq!(calls, 3);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn confirm_failure() {
        let config = PollConfig::serving_status();
        let got = confirm_serving_status(
            async || Ok(json!({"code": 9, "message": "cannot stop the version"})),
            "STOPPED",
            &config,
        )
        .await;
        let err = got.expect_err("the resource reports an error");
        assert!(err.is_failed(), "{err:?}");
        assert!(err.to_string().contains("cannot stop the version"), "{err}");
    }

    #[tokio::test(start_paused = true)]
    async fn confirm_timeout() {
        let config = PollConfig::default()
            .with_interval(Duration::from_secs(10))
            .with_timeout(Duration::from_secs(25));
        let got = confirm_serving_status(
            async || Ok(json!({"servingStatus": "SERVING"})),
            "STOPPED",
            &config,
        )
        .await;
        let err = got.expect_err("the status never changes");
        assert!(err.is_timeout(), "{err:?}");
        assert_eq!(err.to_string(), "timeout");
    }
}
