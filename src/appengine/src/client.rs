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

use crate::Result;
use crate::http::{NoBody, ReqwestClient};
use crate::model::cloudbuild::Build;
use crate::model::{
    ListServicesResponse, ListVersionsResponse, Operation, Service, TrafficSplit, Version,
    serviceusage,
};
use crate::options::{ClientConfig, Error as ConfigError};
use gax::exponential_backoff::ExponentialBackoff;
use serde_json::json;

/// Implements a client for the App Engine Admin, Cloud Build, and Service
/// Usage APIs.
///
/// Each method makes a single request and returns the decoded response. Use
/// the functions in [workflow][crate::workflow] to resubmit requests and to
/// wait for the operations they start.
///
/// # Example
/// ```no_run
/// # async fn sample() -> anyhow::Result<()> {
/// use gae_deploy_appengine::client::Client;
/// use gae_deploy_appengine::options::ClientConfig;
/// let client = Client::new(ClientConfig::default().with_access_token("ya29.abc"))?;
/// for service in client.list_services("my-project").await? {
///     println!("{}", service.id);
/// }
/// # Ok(()) }
/// ```
///
/// `Client` holds a connection pool internally, it is advised to create one
/// and then reuse it. Cloning the client is cheap.
#[derive(Clone, Debug)]
pub struct Client {
    appengine: ReqwestClient,
    cloudbuild: ReqwestClient,
    serviceusage: ReqwestClient,
    backoff: ExponentialBackoff,
    config: ClientConfig,
}

impl Client {
    /// Creates a new client, fails if the configuration is invalid.
    pub fn new(config: ClientConfig) -> std::result::Result<Self, ConfigError> {
        let backoff = config.retry.backoff_policy()?;
        let inner = reqwest::Client::builder()
            .build()
            .map_err(ConfigError::Transport)?;
        let token = config.access_token.clone();
        Ok(Self {
            appengine: ReqwestClient::new(
                inner.clone(),
                config.appengine_endpoint(),
                token.clone(),
            ),
            cloudbuild: ReqwestClient::new(
                inner.clone(),
                config.cloudbuild_endpoint(),
                token.clone(),
            ),
            serviceusage: ReqwestClient::new(inner, config.serviceusage_endpoint(), token),
            backoff,
            config,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The backoff policy derived from the retry settings.
    pub fn backoff_policy(&self) -> &ExponentialBackoff {
        &self.backoff
    }

    pub(crate) fn appengine_endpoint(&self) -> &str {
        self.appengine.endpoint()
    }

    pub(crate) fn serviceusage_endpoint(&self) -> &str {
        self.serviceusage.endpoint()
    }

    /// Creates a new version, starting a deployment.
    pub async fn create_version(
        &self,
        project: &str,
        service: &str,
        version: &Version,
    ) -> Result<Operation> {
        let path = format!(
            "/v1/apps/{}/services/{}/versions",
            enc(project),
            enc(service)
        );
        let builder = self.appengine.builder(reqwest::Method::POST, path);
        self.appengine.execute(builder, Some(version)).await
    }

    pub async fn get_version(
        &self,
        project: &str,
        service: &str,
        version_id: &str,
    ) -> Result<Version> {
        let path = format!(
            "/v1/apps/{}/services/{}/versions/{}",
            enc(project),
            enc(service),
            enc(version_id)
        );
        let builder = self
            .appengine
            .builder(reqwest::Method::GET, path)
            .query(&[("view", "BASIC")]);
        self.appengine.execute(builder, None::<NoBody>).await
    }

    /// Lists all the versions of a service, following every page.
    pub async fn list_versions(&self, project: &str, service: &str) -> Result<Vec<Version>> {
        let path = format!(
            "/v1/apps/{}/services/{}/versions",
            enc(project),
            enc(service)
        );
        let mut versions = Vec::new();
        let mut page_token = String::new();
        loop {
            let builder = self.appengine.builder(reqwest::Method::GET, path.clone());
            let builder = page(builder, &page_token);
            let response: ListVersionsResponse =
                self.appengine.execute(builder, None::<NoBody>).await?;
            versions.extend(response.versions);
            if response.next_page_token.is_empty() {
                return Ok(versions);
            }
            page_token = response.next_page_token;
        }
    }

    /// Changes the serving status of a version.
    ///
    /// The returned operation may never complete, see
    /// [confirm_serving_status][lro::serving::confirm_serving_status].
    pub async fn update_serving_status(
        &self,
        project: &str,
        service: &str,
        version_id: &str,
        serving_status: &str,
    ) -> Result<Operation> {
        let path = format!(
            "/v1/apps/{}/services/{}/versions/{}",
            enc(project),
            enc(service),
            enc(version_id)
        );
        let builder = self
            .appengine
            .builder(reqwest::Method::PATCH, path)
            .query(&[("updateMask", "servingStatus")]);
        let body = json!({"servingStatus": serving_status});
        self.appengine.execute(builder, Some(body)).await
    }

    /// Lists all the services in an application, following every page.
    pub async fn list_services(&self, project: &str) -> Result<Vec<Service>> {
        let path = format!("/v1/apps/{}/services", enc(project));
        let mut services = Vec::new();
        let mut page_token = String::new();
        loop {
            let builder = self.appengine.builder(reqwest::Method::GET, path.clone());
            let builder = page(builder, &page_token);
            let response: ListServicesResponse =
                self.appengine.execute(builder, None::<NoBody>).await?;
            services.extend(response.services);
            if response.next_page_token.is_empty() {
                return Ok(services);
            }
            page_token = response.next_page_token;
        }
    }

    /// Routes all the traffic of `service` to `version_id`.
    ///
    /// Uses gradual migration, App Engine warms up the new version before
    /// moving the traffic.
    pub async fn migrate_traffic(
        &self,
        project: &str,
        service: &str,
        version_id: &str,
    ) -> Result<Operation> {
        let path = format!("/v1/apps/{}/services/{}", enc(project), enc(service));
        let builder = self
            .appengine
            .builder(reqwest::Method::PATCH, path)
            .query(&[("updateMask", "split"), ("migrateTraffic", "true")]);
        let body = Service::new().set_split(TrafficSplit::all_to(version_id));
        self.appengine.execute(builder, Some(body)).await
    }

    /// Fetches an App Engine operation, `name` is the full name, e.g.
    /// `apps/my-project/operations/123`.
    pub async fn get_operation(&self, name: &str) -> Result<Operation> {
        let builder = self
            .appengine
            .builder(reqwest::Method::GET, format!("/v1/{name}"));
        self.appengine.execute(builder, None::<NoBody>).await
    }

    pub async fn get_build(&self, project: &str, build_id: &str) -> Result<Build> {
        let path = format!("/v1/projects/{}/builds/{}", enc(project), enc(build_id));
        let builder = self.cloudbuild.builder(reqwest::Method::GET, path);
        self.cloudbuild.execute(builder, None::<NoBody>).await
    }

    /// Enables an API, e.g. `appengine.googleapis.com`, in a project.
    pub async fn enable_service(
        &self,
        project: &str,
        api: &str,
    ) -> Result<serviceusage::Operation> {
        let path = format!("/v1/projects/{}/services/{}:enable", enc(project), enc(api));
        let builder = self.serviceusage.builder(reqwest::Method::POST, path);
        self.serviceusage.execute(builder, Some(json!({}))).await
    }

    /// Fetches a Service Usage operation, `name` is the full name, e.g.
    /// `operations/acf.123`.
    pub async fn get_serviceusage_operation(
        &self,
        name: &str,
    ) -> Result<serviceusage::Operation> {
        let builder = self
            .serviceusage
            .builder(reqwest::Method::GET, format!("/v1/{name}"));
        self.serviceusage.execute(builder, None::<NoBody>).await
    }
}

fn page(builder: reqwest::RequestBuilder, page_token: &str) -> reqwest::RequestBuilder {
    if page_token.is_empty() {
        return builder;
    }
    builder.query(&[("pageToken", page_token)])
}

/// The set of characters that are percent encoded in path segments.
const ENCODED_CHARS: percent_encoding::AsciiSet = percent_encoding::CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

pub(crate) fn enc(value: &str) -> String {
    percent_encoding::utf8_percent_encode(value, &ENCODED_CHARS).to_string()
}
