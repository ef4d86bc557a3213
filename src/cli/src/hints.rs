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

//! Suggests what to do next when a command fails.

use appengine::Error;
use appengine::console;
use gax::classify::is_quota_exceeded;

/// Adds a hint to errors where the next step is not obvious.
///
/// Errors without a known remedy are returned unchanged.
pub fn annotate(error: anyhow::Error, project: Option<&str>) -> anyhow::Error {
    let Some(e) = error.downcast_ref::<Error>() else {
        return error;
    };
    match hint(e, project) {
        Some(hint) => error.context(hint),
        None => error,
    }
}

fn hint(error: &Error, project: Option<&str>) -> Option<String> {
    if error.is_timeout() {
        return Some(
            "gave up waiting for the operation, it may still complete. \
             Use `gae-deploy operations wait` or the Google Cloud console to check its status"
                .to_string(),
        );
    }
    if error.is_failed() {
        use std::error::Error as _;
        return Some(match error.source() {
            Some(details) => format!("the operation did not succeed, {details}"),
            None => "the operation did not succeed".to_string(),
        });
    }
    if is_quota_exceeded(error) {
        let quotas = project
            .map(|p| format!(" at {}", console::quotas_url(p)))
            .unwrap_or_default();
        return Some(format!(
            "the project ran out of quota. Delete unused versions, \
             use `gae-deploy versions list` to find them, or request more quota{quotas}"
        ));
    }
    match error.http_status_code() {
        Some(401) | Some(403) => Some(
            "the request was rejected, check that the access token is valid \
             and has permission to manage the project"
                .to_string(),
        ),
        _ => None,
    }
}
