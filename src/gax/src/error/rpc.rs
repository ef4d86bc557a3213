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

use crate::error::Error;
use serde::{Deserialize, Serialize};

/// The [Status] type defines the logical error model used by the REST APIs
/// this tool calls.
///
/// Each [Status] carries a numeric code, a human-readable message, and
/// (sometimes) the canonical status name. In the JSON representation of
/// errors the numeric code is the HTTP status code, for example `409` for
/// conflicts, or `503` for unavailable services.
///
/// You can find out more about this error model in the
/// [API Design Guide](https://cloud.google.com/apis/design/errors).
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
#[non_exhaustive]
pub struct Status {
    /// The status code.
    pub code: i32,

    /// A developer-facing error message, which should be in English.
    pub message: String,

    /// The canonical name of the status code, e.g. `ABORTED`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl Status {
    /// Sets the value for [code][Status::code].
    pub fn set_code<T: Into<i32>>(mut self, v: T) -> Self {
        self.code = v.into();
        self
    }

    /// Sets the value for [message][Status::message].
    pub fn set_message<T: Into<String>>(mut self, v: T) -> Self {
        self.message = v.into();
        self
    }

    /// Sets the value for [status][Status::status].
    pub fn set_status<T: Into<String>>(mut self, v: T) -> Self {
        self.status = Some(v.into());
        self
    }

    /// Extracts a status from a JSON error envelope.
    ///
    /// Returns `None` unless the value is an object with an `error` field,
    /// and that field holds at least a numeric `code` and a `message`.
    pub fn from_envelope(value: &serde_json::Value) -> Option<Self> {
        let error = value.as_object()?.get("error")?;
        let code = error.get("code")?.as_i64()?;
        let message = error.get("message")?.as_str()?;
        let status = error
            .get("status")
            .and_then(|s| s.as_str())
            .map(str::to_string);
        Some(Self {
            code: i32::try_from(code).ok()?,
            message: message.to_string(),
            status,
        })
    }
}

// The JSON representation of errors wraps the status in an `error` field.
#[derive(Deserialize)]
struct ErrorWrapper {
    error: Status,
}

impl TryFrom<&bytes::Bytes> for Status {
    type Error = Error;

    fn try_from(value: &bytes::Bytes) -> Result<Self, Self::Error> {
        serde_json::from_slice::<ErrorWrapper>(value)
            .map(|w| w.error)
            .map_err(Error::deser)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn status_setters() {
        let status = Status::default()
            .set_code(409)
            .set_message("conflict")
            .set_status("ABORTED");
        assert_eq!(status.code, 409);
        assert_eq!(status.message, "conflict");
        assert_eq!(status.status.as_deref(), Some("ABORTED"));
    }

    #[test]
    fn try_from_bytes() -> anyhow::Result<()> {
        let body = json!({"error": {
            "code": 409,
            "message": "Operation is already in progress for project my-project",
            "status": "ABORTED",
        }});
        let body = bytes::Bytes::from(body.to_string());
        let status = Status::try_from(&body)?;
        assert_eq!(
            status,
            Status::default()
                .set_code(409)
                .set_message("Operation is already in progress for project my-project")
                .set_status("ABORTED")
        );
        Ok(())
    }

    #[test]
    fn try_from_bytes_not_json() {
        let body = bytes::Bytes::from_static(b"<html>Bad Gateway</html>");
        let status = Status::try_from(&body);
        assert!(status.is_err(), "{status:?}");
    }

    #[test]
    fn from_envelope() {
        let value = json!({"error": {"code": 503, "message": "try again"}});
        let status = Status::from_envelope(&value);
        assert_eq!(
            status,
            Some(Status::default().set_code(503).set_message("try again"))
        );

        let value = json!({"name": "apps/p/operations/123", "done": false});
        assert_eq!(Status::from_envelope(&value), None);

        let value = json!({"error": "some string"});
        assert_eq!(Status::from_envelope(&value), None);

        let value = json!({"error": {"message": "missing code"}});
        assert_eq!(Status::from_envelope(&value), None);
    }

    #[test]
    fn serialize_skips_missing_status() -> anyhow::Result<()> {
        let status = Status::default().set_code(400).set_message("bad");
        let got = serde_json::to_value(&status)?;
        assert_eq!(got, json!({"code": 400, "message": "bad"}));
        Ok(())
    }
}
