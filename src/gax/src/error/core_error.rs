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

use super::rpc::Status;
use std::error::Error as StdError;

type BoxError = Box<dyn StdError + Send + Sync>;

/// The core error returned by all the crates in this workspace.
///
/// Errors come from multiple sources. The service may return an error, the
/// transport may be unable to create the necessary connection, a polling loop
/// may run out of time before the operation completes, or the polled
/// resource may report that the operation failed.
///
/// Most callers will just return the error or log it. The command-line
/// interface needs to interrogate the error to print the right remedy, this
/// type offers a series of predicates to determine the error kind, and
/// accessors for the most common error details.
///
/// # Example
/// ```
/// use gae_deploy_gax::error::Error;
/// match example_function() {
///     Err(e) if e.is_timeout() => { println!("could not confirm in time {e}"); },
///     Err(e) if e.is_failed() => { println!("the operation failed {e}"); },
///     Err(e) => { println!("some other error {e}"); },
///     Ok(_) => { println!("success, how boring"); },
/// }
///
/// fn example_function() -> Result<String, Error> {
///     // ... details omitted ...
///     # Err(Error::timeout("operation still running"))
/// }
/// ```
#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    source: Option<BoxError>,
}

impl Error {
    /// Creates an error with the information returned by a service.
    ///
    /// # Example
    /// ```
    /// use gae_deploy_gax::error::Error;
    /// use gae_deploy_gax::error::rpc::Status;
    /// let status = Status::default().set_code(404).set_message("NOT FOUND");
    /// let error = Error::service(status.clone());
    /// assert_eq!(error.status(), Some(&status));
    /// ```
    pub fn service(status: Status) -> Self {
        Self::service_with_http_metadata(status, None)
    }

    /// Creates a service error including the HTTP status code.
    ///
    /// Some services report errors in the body of a `200 OK` response. In
    /// that case `status_code` is `Some(200)` and the error code lives in the
    /// [Status].
    pub fn service_with_http_metadata(status: Status, status_code: Option<u16>) -> Self {
        let details = ServiceDetails {
            status_code,
            status,
        };
        Self {
            kind: ErrorKind::Service(Box::new(details)),
            source: None,
        }
    }

    /// Creates an error representing an exhausted polling budget.
    ///
    /// The `Display` output of these errors is always `timeout`, the source
    /// carries any additional details.
    ///
    /// # Example
    /// ```
    /// use std::error::Error as _;
    /// use gae_deploy_gax::error::Error;
    /// let error = Error::timeout("operation still running");
    /// assert!(error.is_timeout());
    /// assert_eq!(error.to_string(), "timeout");
    /// assert!(error.source().is_some());
    /// ```
    pub fn timeout<T: Into<BoxError>>(source: T) -> Self {
        Self {
            kind: ErrorKind::Timeout,
            source: Some(source.into()),
        }
    }

    /// The polling loop ran out of time while the operation was in progress.
    ///
    /// This is always a client-side generated error. The operation may or may
    /// not complete in the service. Callers should tell the user the outcome
    /// is unknown, and point them to a page where they can check it manually.
    pub fn is_timeout(&self) -> bool {
        matches!(self.kind, ErrorKind::Timeout)
    }

    /// Creates an error representing a definitive failure.
    ///
    /// The `payload` is the resource (or the relevant fragment) that reported
    /// the failure. It is preserved as-is for diagnostics.
    ///
    /// # Example
    /// ```
    /// use gae_deploy_gax::error::Error;
    /// let payload = serde_json::json!({"error": {"code": 13, "message": "build failed"}});
    /// let error = Error::failed(payload.clone());
    /// assert!(error.is_failed());
    /// assert_eq!(error.failure_payload(), Some(&payload));
    /// assert!(error.to_string().contains("build failed"), "{error}");
    /// ```
    pub fn failed(payload: serde_json::Value) -> Self {
        Self {
            kind: ErrorKind::Failed(Box::new(payload)),
            source: None,
        }
    }

    /// Creates a definitive failure with additional details.
    ///
    /// The `Display` output is the same as [Error::failed], the details are
    /// available via [source][std::error::Error::source].
    ///
    /// # Example
    /// ```
    /// use std::error::Error as _;
    /// use gae_deploy_gax::error::Error;
    /// let payload = serde_json::json!({"error": {"code": 13, "message": "build failed"}});
    /// let error = Error::failed_with_source(payload, "see https://console.cloud.google.com");
    /// assert!(error.is_failed());
    /// assert!(error.source().is_some());
    /// ```
    pub fn failed_with_source<T: Into<BoxError>>(payload: serde_json::Value, source: T) -> Self {
        Self {
            kind: ErrorKind::Failed(Box::new(payload)),
            source: Some(source.into()),
        }
    }

    /// The polled resource reported that the operation failed.
    ///
    /// Unlike [is_timeout][Error::is_timeout] this is terminal, retrying the
    /// polling loop will not change the outcome.
    pub fn is_failed(&self) -> bool {
        matches!(self.kind, ErrorKind::Failed(_))
    }

    /// The raw payload reported by the polled resource, if this is a
    /// definitive failure.
    pub fn failure_payload(&self) -> Option<&serde_json::Value> {
        match &self.kind {
            ErrorKind::Failed(p) => Some(p.as_ref()),
            _ => None,
        }
    }

    /// Creates an error representing a deserialization problem.
    pub fn deser<T: Into<BoxError>>(source: T) -> Self {
        Self {
            kind: ErrorKind::Deserialization,
            source: Some(source.into()),
        }
    }

    /// The response could not be deserialized.
    pub fn is_deserialization(&self) -> bool {
        matches!(self.kind, ErrorKind::Deserialization)
    }

    /// A problem reported by the transport layer, with a full HTTP response
    /// whose body is not a structured error.
    pub fn http(status_code: u16, payload: bytes::Bytes) -> Self {
        let details = TransportDetails {
            status_code: Some(status_code),
            payload: Some(payload),
        };
        Self {
            kind: ErrorKind::Transport(Box::new(details)),
            source: None,
        }
    }

    /// A problem in the transport layer without a full HTTP response.
    ///
    /// Examples include: a broken connection after the request is sent, a
    /// DNS resolution failure, or a request timeout.
    pub fn io<T: Into<BoxError>>(source: T) -> Self {
        let details = TransportDetails {
            status_code: None,
            payload: None,
        };
        Self {
            kind: ErrorKind::Transport(Box::new(details)),
            source: Some(source.into()),
        }
    }

    /// The request failed before receiving any HTTP response.
    pub fn is_io(&self) -> bool {
        matches!(
            &self.kind,
            ErrorKind::Transport(d) if d.status_code.is_none() && d.payload.is_none()
        )
    }

    /// The request failed in the transport layer.
    pub fn is_transport(&self) -> bool {
        matches!(&self.kind, ErrorKind::Transport(_))
    }

    /// The [Status] payload associated with this error.
    ///
    /// # Examples
    /// ```
    /// use gae_deploy_gax::error::{Error, rpc::Status};
    /// let error = Error::service(Status::default().set_code(409).set_message("conflict"));
    /// if let Some(status) = error.status() {
    ///     if status.code == 409 {
    ///         println!("another operation is running: {}", status.message);
    ///     }
    /// }
    /// ```
    pub fn status(&self) -> Option<&Status> {
        match &self.kind {
            ErrorKind::Service(d) => Some(&d.as_ref().status),
            _ => None,
        }
    }

    /// The HTTP status code, if any, associated with this error.
    ///
    /// Note that `http_status_code()` and `status()` are represented as
    /// different fields. A soft error returned with a `200 OK` response has
    /// an HTTP status code of 200 and a [Status] with the real error code.
    pub fn http_status_code(&self) -> Option<u16> {
        match &self.kind {
            ErrorKind::Transport(d) => d.as_ref().status_code,
            ErrorKind::Service(d) => d.as_ref().status_code,
            _ => None,
        }
    }

    /// The payload, if any, associated with a transport error.
    pub fn http_payload(&self) -> Option<&bytes::Bytes> {
        match &self.kind {
            ErrorKind::Transport(d) => d.payload.as_ref(),
            _ => None,
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.kind, &self.source) {
            (ErrorKind::Deserialization, Some(e)) => {
                write!(f, "cannot deserialize the response {e}")
            }
            (ErrorKind::Timeout, _) => write!(f, "timeout"),
            (ErrorKind::Failed(payload), _) => {
                write!(f, "the operation failed: {}", failure_message(payload))
            }
            (ErrorKind::Transport(details), _) => details.display(self.source(), f),
            (ErrorKind::Service(d), _) => {
                write!(
                    f,
                    "the service reports an error with code {} described as: {}",
                    d.status.code, d.status.message
                )
            }
            (_, None) => unreachable!("no constructor allows this"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error))
    }
}

// Finds the most human-readable description in a failure payload.
//
// The operations report errors as `{"error": {"message": ...}}`, the builds
// use `statusDetail`, and other resources may use a top-level `message`.
fn failure_message(payload: &serde_json::Value) -> String {
    let candidates = [
        payload.pointer("/error/message"),
        payload.pointer("/statusDetail"),
        payload.pointer("/message"),
    ];
    candidates
        .into_iter()
        .flatten()
        .find_map(|v| v.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| payload.to_string())
}

/// The type of error held by an [Error] instance.
#[derive(Debug)]
enum ErrorKind {
    Deserialization,
    Timeout,
    Failed(Box<serde_json::Value>),
    Transport(Box<TransportDetails>),
    Service(Box<ServiceDetails>),
}

#[derive(Debug)]
struct TransportDetails {
    status_code: Option<u16>,
    payload: Option<bytes::Bytes>,
}

impl TransportDetails {
    fn display(
        &self,
        source: Option<&(dyn StdError + 'static)>,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        match (source, &self) {
            (
                _,
                TransportDetails {
                    status_code: Some(code),
                    payload: Some(p),
                },
            ) => {
                if let Ok(message) = std::str::from_utf8(p.as_ref()) {
                    write!(f, "the HTTP transport reports a [{code}] error: {message}")
                } else {
                    write!(f, "the HTTP transport reports a [{code}] error: {p:?}")
                }
            }
            (Some(source), _) => {
                write!(f, "the transport reports an error: {source}")
            }
            (None, _) => unreachable!("no Error constructor allows this"),
        }
    }
}

#[derive(Debug)]
struct ServiceDetails {
    status_code: Option<u16>,
    status: Status,
}
