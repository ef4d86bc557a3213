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

//! Resources in the Cloud Build API (v1).

use serde::{Deserialize, Serialize};

/// A build started by an App Engine deployment.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
#[non_exhaustive]
pub struct Build {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub project_id: String,

    /// The build status, e.g. `QUEUED`, `WORKING`, `SUCCESS`, or `FAILURE`.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub status: String,

    /// Customer-readable message about the current status.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub status_detail: String,

    /// The URL to the build logs in the Google Cloud console.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub log_url: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub create_time: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub finish_time: String,

    #[serde(flatten)]
    _unknown_fields: serde_json::Map<String, serde_json::Value>,
}

impl Build {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the value of [id][Build::id].
    pub fn set_id<T: Into<String>>(mut self, v: T) -> Self {
        self.id = v.into();
        self
    }

    /// Sets the value of [status][Build::status].
    pub fn set_status<T: Into<String>>(mut self, v: T) -> Self {
        self.status = v.into();
        self
    }

    /// Sets the value of [status_detail][Build::status_detail].
    pub fn set_status_detail<T: Into<String>>(mut self, v: T) -> Self {
        self.status_detail = v.into();
        self
    }

    /// Sets the value of [log_url][Build::log_url].
    pub fn set_log_url<T: Into<String>>(mut self, v: T) -> Self {
        self.log_url = v.into();
        self
    }
}
