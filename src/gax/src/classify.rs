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

//! Classifies errors as transient or permanent.
//!
//! The App Engine Admin API, Cloud Build, and Service Usage report most
//! errors as a `{"error": {"code": ..., "message": ...}}` payload. A few of
//! these errors are expected to go away if the request is resubmitted:
//! overloaded servers, rate limits, and conflicts with another operation
//! running against the same application.
//!
//! The classification only depends on the [Status] in the error. Errors
//! without a [Status] (transport problems, timeouts, definitive failures)
//! are never transient at this level.
//!
//! [Status]: crate::error::rpc::Status

use crate::error::Error;

const CONFLICT_PATTERN: &str = "operation is already in progress";
const QUOTA_PATTERN: &str = "quotas were exceeded";

/// The result of classifying an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TransientErrorClass {
    /// The service rejected the request because the caller is sending too
    /// many requests.
    RateLimited,
    /// Another operation is modifying the same application. These resolve
    /// slowly, the other operation must finish first.
    ConcurrentOperationConflict,
    /// The service reported an internal error or is temporarily unavailable.
    ServerError,
    /// Resubmitting the request will not help.
    NotTransient,
}

impl TransientErrorClass {
    /// Returns true if the request may succeed when resubmitted.
    pub fn is_transient(&self) -> bool {
        !matches!(self, Self::NotTransient)
    }

    /// How much longer to wait before retrying, relative to a server error.
    ///
    /// # Example
    /// ```
    /// # use gae_deploy_gax::classify::TransientErrorClass;
    /// assert_eq!(TransientErrorClass::ConcurrentOperationConflict.backoff_multiplier(), 4);
    /// assert_eq!(TransientErrorClass::ServerError.backoff_multiplier(), 1);
    /// ```
    pub fn backoff_multiplier(&self) -> u32 {
        match self {
            Self::ConcurrentOperationConflict => 4,
            Self::RateLimited => 2,
            Self::ServerError | Self::NotTransient => 1,
        }
    }
}

/// Classifies an error.
///
/// This is a pure function of the error [Status][crate::error::rpc::Status],
/// calling it twice with the same error returns the same result.
///
/// | code       | message contains                   | classification              |
/// | ---------- | ---------------------------------- | --------------------------- |
/// | 500 or 503 |                                    | ServerError                 |
/// | 409        | "operation is already in progress" | ConcurrentOperationConflict |
/// | 429        |                                    | RateLimited                 |
/// | other      |                                    | NotTransient                |
///
/// The message match ignores case.
///
/// # Example
/// ```
/// # use gae_deploy_gax::classify::{classify, TransientErrorClass};
/// # use gae_deploy_gax::error::{Error, rpc::Status};
/// let status = Status::default()
///     .set_code(409)
///     .set_message("Operation is already in progress for project my-project");
/// assert_eq!(classify(&Error::service(status)), TransientErrorClass::ConcurrentOperationConflict);
/// ```
pub fn classify(error: &Error) -> TransientErrorClass {
    let Some(status) = error.status() else {
        return TransientErrorClass::NotTransient;
    };
    match status.code {
        500 | 503 => TransientErrorClass::ServerError,
        429 => TransientErrorClass::RateLimited,
        409 if contains_ignore_case(&status.message, CONFLICT_PATTERN) => {
            TransientErrorClass::ConcurrentOperationConflict
        }
        _ => TransientErrorClass::NotTransient,
    }
}

/// Returns true if the error reports an exceeded quota.
///
/// These errors are not transient. The caller should tell the user to
/// request more quota, or to clean up unused versions.
pub fn is_quota_exceeded(error: &Error) -> bool {
    error
        .status()
        .is_some_and(|s| s.code == 400 && contains_ignore_case(&s.message, QUOTA_PATTERN))
}

/// A human-readable name for the service behind `url`.
///
/// Only used in diagnostics, it never changes the classification.
///
/// # Example
/// ```
/// # use gae_deploy_gax::classify::service_name;
/// let name = service_name("https://appengine.googleapis.com/v1/apps/p/services/default");
/// assert_eq!(name, "App Engine Admin API");
/// ```
pub fn service_name(url: &str) -> &'static str {
    let host = url
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(url)
        .split(['/', ':'])
        .next()
        .unwrap_or_default();
    match host.split('.').next().unwrap_or_default() {
        "appengine" => "App Engine Admin API",
        "cloudbuild" => "Cloud Build",
        "serviceusage" => "Service Usage",
        "cloudresourcemanager" => "Resource Manager",
        "storage" => "Cloud Storage",
        _ => "Google Cloud",
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::rpc::Status;
    use test_case::test_case;

    fn service_error(code: i32, message: &str) -> Error {
        Error::service(Status::default().set_code(code).set_message(message))
    }

    #[test_case(500, "internal error", TransientErrorClass::ServerError)]
    #[test_case(503, "The service is currently unavailable.", TransientErrorClass::ServerError)]
    #[test_case(503, "", TransientErrorClass::ServerError)]
    #[test_case(409, "Operation is already in progress for project my-project", TransientErrorClass::ConcurrentOperationConflict)]
    #[test_case(409, "OPERATION IS ALREADY IN PROGRESS", TransientErrorClass::ConcurrentOperationConflict)]
    #[test_case(409, "Version already exists", TransientErrorClass::NotTransient)]
    #[test_case(429, "Too many requests", TransientErrorClass::RateLimited)]
    #[test_case(400, "The following quotas were exceeded: versions", TransientErrorClass::NotTransient)]
    #[test_case(400, "Invalid runtime", TransientErrorClass::NotTransient)]
    #[test_case(404, "not found", TransientErrorClass::NotTransient)]
    #[test_case(502, "bad gateway", TransientErrorClass::NotTransient)]
    fn service_errors(code: i32, message: &str, want: TransientErrorClass) {
        let error = service_error(code, message);
        assert_eq!(classify(&error), want, "{error:?}");
    }

    #[test_case("my-project")]
    #[test_case("another-project-123")]
    #[test_case("x")]
    fn conflict_ignores_project(project: &str) {
        let error = service_error(
            409,
            &format!("Operation is already in progress for project {project}"),
        );
        let first = classify(&error);
        let second = classify(&error);
        assert_eq!(first, second);
        assert_eq!(first, TransientErrorClass::ConcurrentOperationConflict);
    }

    #[test]
    fn unstructured_errors() {
        let errors = [
            Error::http(503, bytes::Bytes::from_static(b"<html>unavailable</html>")),
            Error::io("connection reset"),
            Error::timeout("still running"),
            Error::failed(serde_json::json!({"status": "FAILURE"})),
            Error::deser("bad json"),
        ];
        for error in errors {
            assert_eq!(classify(&error), TransientErrorClass::NotTransient, "{error:?}");
        }
    }

    #[test]
    fn multipliers() {
        use TransientErrorClass::*;
        assert_eq!(
            ConcurrentOperationConflict.backoff_multiplier(),
            4 * ServerError.backoff_multiplier()
        );
        assert_eq!(RateLimited.backoff_multiplier(), 2);
        assert!(ServerError.is_transient());
        assert!(RateLimited.is_transient());
        assert!(ConcurrentOperationConflict.is_transient());
        assert!(!NotTransient.is_transient());
    }

    #[test]
    fn quota_exceeded() {
        let error = service_error(400, "The following quotas were exceeded: Versions");
        assert!(is_quota_exceeded(&error), "{error:?}");
        assert_eq!(classify(&error), TransientErrorClass::NotTransient);

        let error = service_error(400, "Invalid value for field 'runtime'");
        assert!(!is_quota_exceeded(&error), "{error:?}");

        let error = service_error(429, "quotas were exceeded");
        assert!(!is_quota_exceeded(&error), "{error:?}");
    }

    #[test_case("https://appengine.googleapis.com/v1/apps/p", "App Engine Admin API")]
    #[test_case("https://cloudbuild.googleapis.com/v1/projects/p/builds/b", "Cloud Build")]
    #[test_case("https://serviceusage.googleapis.com/v1/operations/x", "Service Usage")]
    #[test_case("http://127.0.0.1:8080/v1/apps/p", "Google Cloud")]
    #[test_case("appengine.googleapis.com", "App Engine Admin API")]
    fn service_names(url: &str, want: &str) {
        assert_eq!(service_name(url), want);
    }
}
