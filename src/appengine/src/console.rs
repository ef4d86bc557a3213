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

//! Links to the Google Cloud console.
//!
//! When the tool cannot confirm the outcome of an operation, it points the
//! user to a console page where they can check it manually.

use crate::client::enc;

const CONSOLE: &str = "https://console.cloud.google.com";

fn link(path: &str, params: &[(&str, &str)]) -> String {
    let query = url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(params)
        .finish();
    format!("{CONSOLE}{path}?{query}")
}

/// The versions of a service.
///
/// # Example
/// ```
/// # use gae_deploy_appengine::console::versions_url;
/// assert_eq!(
///     versions_url("my-project", "default"),
///     "https://console.cloud.google.com/appengine/versions?project=my-project&serviceId=default"
/// );
/// ```
pub fn versions_url(project: &str, service: &str) -> String {
    link(
        "/appengine/versions",
        &[("project", project), ("serviceId", service)],
    )
}

/// The services in an application and their traffic allocation.
pub fn services_url(project: &str) -> String {
    link("/appengine/services", &[("project", project)])
}

pub fn build_url(project: &str, build_id: &str) -> String {
    link(
        &format!("/cloud-build/builds/{}", enc(build_id)),
        &[("project", project)],
    )
}

/// The quotas page, for errors such as "too many versions".
pub fn quotas_url(project: &str) -> String {
    link("/iam-admin/quotas", &[("project", project)])
}

/// The API library page for a single API.
pub fn api_url(project: &str, api: &str) -> String {
    link(
        &format!("/apis/library/{}", enc(api)),
        &[("project", project)],
    )
}
