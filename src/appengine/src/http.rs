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

//! Sends JSON requests and converts the responses into typed results.
//!
//! Every failure is reported as a [gax::error::Error]:
//! * Responses with a non-2xx status code and a `{"error": {...}}` body
//!   become [Error::service_with_http_metadata]. Bodies that cannot be
//!   parsed become [Error::http].
//! * Responses with a 2xx status code and a `{"error": {...}}` body (soft
//!   errors) also become [Error::service_with_http_metadata].
//! * Requests that never receive a response become [Error::io].
//!
//! The [ReqwestClient] makes a single attempt, callers decide if and how to
//! retry.

use gax::Result;
use gax::error::Error;
use gax::error::rpc::Status;

/// A request body for requests without one.
#[derive(serde::Serialize)]
pub struct NoBody;

#[derive(Clone, Debug)]
pub struct ReqwestClient {
    inner: reqwest::Client,
    endpoint: String,
    access_token: Option<String>,
}

impl ReqwestClient {
    pub fn new(
        inner: reqwest::Client,
        endpoint: impl Into<String>,
        access_token: Option<String>,
    ) -> Self {
        Self {
            inner,
            endpoint: endpoint.into(),
            access_token,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn builder(&self, method: reqwest::Method, path: String) -> reqwest::RequestBuilder {
        self.inner
            .request(method, format!("{}{path}", &self.endpoint))
    }

    pub async fn execute<I: serde::ser::Serialize, O: serde::de::DeserializeOwned + Default>(
        &self,
        mut builder: reqwest::RequestBuilder,
        body: Option<I>,
    ) -> Result<O> {
        if let Some(token) = &self.access_token {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = body {
            builder = builder.json(&body);
        }
        let response = builder.send().await.map_err(Error::io)?;
        if !response.status().is_success() {
            return self::to_http_error(response).await;
        }
        self::to_http_response(response).await
    }
}

async fn to_http_error<O>(response: reqwest::Response) -> Result<O> {
    let status_code = response.status().as_u16();
    let body = response.bytes().await.map_err(Error::io)?;

    let error = match Status::try_from(&body) {
        // Some services omit the code, the HTTP status is the next best thing.
        Ok(status) if status.code == 0 => Error::service_with_http_metadata(
            status.set_code(i32::from(status_code)),
            Some(status_code),
        ),
        Ok(status) => Error::service_with_http_metadata(status, Some(status_code)),
        Err(_) => Error::http(status_code, body),
    };
    Err(error)
}

async fn to_http_response<O: serde::de::DeserializeOwned + Default>(
    response: reqwest::Response,
) -> Result<O> {
    // 204 No Content has no body and throws EOF error if we try to parse with serde::json
    let no_content_status = response.status() == reqwest::StatusCode::NO_CONTENT;
    let status_code = response.status().as_u16();
    let body = response.bytes().await.map_err(Error::io)?;
    if body.is_empty() && no_content_status {
        return Ok(O::default());
    }

    let value = serde_json::from_slice::<serde_json::Value>(&body).map_err(Error::deser)?;
    if let Some(status) = Status::from_envelope(&value) {
        return Err(Error::service_with_http_metadata(status, Some(status_code)));
    }
    serde_json::from_value::<O>(value).map_err(Error::deser)
}
