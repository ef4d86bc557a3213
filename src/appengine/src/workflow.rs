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

//! Deployment workflows.
//!
//! Each function here is one logical call chain: it submits a mutating
//! request, resubmitting it while it fails with transient errors, and then
//! waits for the operation it starts. The retry state is created by each
//! call and never shared, concurrent workflows cannot interfere with each
//! other's attempt counts.

use crate::client::Client;
use crate::console;
use crate::model::cloudbuild::Build;
use crate::model::{Operation, Version, serviceusage};
use crate::{Error, Result};
use futures::stream::{self, StreamExt, TryStreamExt};
use gax::backoff_policy::BackoffPolicy;
use gax::classify::service_name;
use gax::retry_loop::retry_loop_with_state;
use gax::retry_policy::RetryPolicy;
use gax::retry_state::RetryState;
use lro::PollResult;
use lro::operation::{Completion, check_operation, operation_state};
use lro::serving::confirm_serving_status;
use std::time::Duration;

/// The serving status of a version.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ServingStatus {
    Serving,
    Stopped,
}

impl ServingStatus {
    /// The name used in the App Engine Admin API.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Serving => "SERVING",
            Self::Stopped => "STOPPED",
        }
    }
}

impl std::fmt::Display for ServingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// The result of a successful deployment.
pub type Deployment = Completion<Operation, Build>;

/// The versions of one service.
#[derive(Clone, Debug, PartialEq)]
pub struct ServiceVersions {
    pub project: String,
    pub service: String,
    pub versions: Vec<Version>,
}

/// Creates a new version and waits until it is deployed.
///
/// The source must be already uploaded, `version.deployment` points to it.
/// Creating a version fails with a conflict while another operation runs in
/// the same application, these conflicts are resubmitted up to
/// [deploy_max_attempts][crate::options::RetrySettings::deploy_max_attempts]
/// times.
///
/// Deployments start a Cloud Build build. Once the operation reports the
/// build id this function waits for the build instead of the operation.
///
/// With `promote`, the function also routes all the traffic to the new
/// version once it is deployed.
#[tracing::instrument(skip(client, version), fields(version = %version.id))]
pub async fn deploy_version(
    client: &Client,
    project: &str,
    service: &str,
    version: &Version,
    promote: bool,
) -> Result<Deployment> {
    let mut state = RetryState::new();
    let policy = client.config().retry.deploy_retry_policy();
    let operation = with_retry(
        &mut state,
        &policy,
        client.backoff_policy(),
        client.appengine_endpoint(),
        async || client.create_version(project, service, version).await,
    )
    .await?;
    let name = operation_name(&operation.name)?;
    tracing::info!("deploying version {} with operation {name}", version.id);

    let config = client
        .config()
        .poll
        .clone()
        .with_console_url(console::versions_url(project, service));
    let deployment = check_operation(
        async || client.get_operation(&name).await,
        async |id: String| client.get_build(project, &id).await,
        |completion: &Deployment| log_deployed(completion, &version.id),
        |payload: &serde_json::Value| log_deploy_failure(project, payload),
        &config,
    )
    .await?;

    if promote {
        migrate_traffic(client, project, service, &version.id).await?;
    }
    Ok(deployment)
}

fn log_deployed(completion: &Deployment, version_id: &str) {
    match completion {
        Completion::Build(b) if !b.log_url.is_empty() => {
            tracing::info!("version {version_id} deployed, build logs at {}", b.log_url)
        }
        _ => tracing::info!("version {version_id} deployed"),
    }
}

fn log_deploy_failure(project: &str, payload: &serde_json::Value) {
    let logs = payload
        .get("logUrl")
        .and_then(|u| u.as_str())
        .map(str::to_string)
        .or_else(|| {
            let id = payload.get("id")?.as_str()?;
            Some(console::build_url(project, id))
        });
    if let Some(logs) = logs {
        tracing::error!("the deployment failed, check the build logs at {logs}");
    }
}

/// Starts or stops a version, and waits until the change takes effect.
///
/// The operation returned by App Engine does not reliably report when the
/// change completes. Instead, this function reads the version until its
/// serving status matches `status`.
#[tracing::instrument(skip(client))]
pub async fn set_serving_status(
    client: &Client,
    project: &str,
    service: &str,
    version_id: &str,
    status: ServingStatus,
) -> Result<Version> {
    let mut state = RetryState::new();
    let policy = client.config().retry.retry_policy();
    let operation = with_retry(
        &mut state,
        &policy,
        client.backoff_policy(),
        client.appengine_endpoint(),
        async || {
            client
                .update_serving_status(project, service, version_id, status.name())
                .await
        },
    )
    .await?;
    tracing::info!(
        "changing version {version_id} to {status}, operation {}",
        operation.name
    );

    let config = client
        .config()
        .serving_poll
        .0
        .clone()
        .with_console_url(console::versions_url(project, service));
    let version = confirm_serving_status(
        async || client.get_version(project, service, version_id).await,
        status.name(),
        &config,
    )
    .await?;
    tracing::info!("version {version_id} is {status}");
    Ok(version)
}

/// Routes all the traffic of a service to one version.
#[tracing::instrument(skip(client))]
pub async fn migrate_traffic(
    client: &Client,
    project: &str,
    service: &str,
    version_id: &str,
) -> Result<Operation> {
    let mut state = RetryState::new();
    let policy = client.config().retry.retry_policy();
    let operation = with_retry(
        &mut state,
        &policy,
        client.backoff_policy(),
        client.appengine_endpoint(),
        async || client.migrate_traffic(project, service, version_id).await,
    )
    .await?;
    let name = operation_name(&operation.name)?;
    let config = client
        .config()
        .poll
        .clone()
        .with_console_url(console::services_url(project));
    let operation =
        lro::operation::wait_operation(async || client.get_operation(&name).await, &config)
            .await?;
    tracing::info!("all traffic for service {service} goes to version {version_id}");
    Ok(operation)
}

/// Enables several APIs in a project.
///
/// The APIs are enabled concurrently, up to
/// [max_concurrency][crate::options::ClientConfig::max_concurrency] at a time.
/// The function returns the operations in the order of `apis`, once all of
/// them are enabled, or the first error.
#[tracing::instrument(skip(client, apis))]
pub async fn enable_apis<I, S>(
    client: &Client,
    project: &str,
    apis: I,
) -> Result<Vec<serviceusage::Operation>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let limit = client.config().max_concurrency();
    stream::iter(apis)
        .map(|api| async move { enable_api(client, project, api.as_ref()).await })
        .buffered(limit)
        .try_collect()
        .await
}

async fn enable_api(client: &Client, project: &str, api: &str) -> Result<serviceusage::Operation> {
    let mut state = RetryState::new();
    let policy = client.config().retry.retry_policy();
    let operation = with_retry(
        &mut state,
        &policy,
        client.backoff_policy(),
        client.serviceusage_endpoint(),
        async || client.enable_service(project, api).await,
    )
    .await?;
    if operation.done {
        return match operation_state(&operation) {
            PollResult::Failed(payload) => Err(Error::failed(payload)),
            _ => Ok(operation),
        };
    }
    let name = operation_name(&operation.name)?;
    let config = client
        .config()
        .poll
        .clone()
        .with_console_url(console::api_url(project, api));
    let operation = lro::operation::wait_operation(
        async || client.get_serviceusage_operation(&name).await,
        &config,
    )
    .await?;
    tracing::info!("{api} is enabled in {project}");
    Ok(operation)
}

/// Lists the versions of every service in several projects.
///
/// The requests run concurrently, with at most
/// [max_concurrency][crate::options::ClientConfig::max_concurrency] projects
/// in flight. The results are grouped by project and service, in the order of
/// `projects`.
#[tracing::instrument(skip(client, projects))]
pub async fn list_versions<I, S>(client: &Client, projects: I) -> Result<Vec<ServiceVersions>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let limit = client.config().max_concurrency();
    let projects: Vec<Vec<ServiceVersions>> = stream::iter(projects)
        .map(|project| async move { project_versions(client, project.as_ref()).await })
        .buffered(limit)
        .try_collect()
        .await?;
    Ok(projects.into_iter().flatten().collect())
}

async fn project_versions(client: &Client, project: &str) -> Result<Vec<ServiceVersions>> {
    let mut state = RetryState::new();
    let policy = client.config().retry.retry_policy();
    let services = with_retry(
        &mut state,
        &policy,
        client.backoff_policy(),
        client.appengine_endpoint(),
        async || client.list_services(project).await,
    )
    .await?;
    let policy = &policy;
    let pending = services.into_iter().map(|service| async move {
        let mut state = RetryState::new();
        let versions = with_retry(
            &mut state,
            policy,
            client.backoff_policy(),
            client.appengine_endpoint(),
            async || client.list_versions(project, &service.id).await,
        )
        .await?;
        Ok::<_, Error>(ServiceVersions {
            project: project.to_string(),
            service: service.id,
            versions,
        })
    });
    stream::iter(pending)
        .buffered(client.config().max_concurrency())
        .try_collect()
        .await
}

/// Waits for an existing App Engine operation.
///
/// Deployments started by this function's caller, or by other tools, can be
/// resumed with this function.
#[tracing::instrument(skip(client))]
pub async fn wait_operation(client: &Client, name: &str) -> Result<Operation> {
    let config = client.config().poll.clone();
    let config = match project_from_operation(name) {
        Some(project) => config.with_console_url(console::services_url(project)),
        None => config,
    };
    lro::operation::wait_operation(async || client.get_operation(name).await, &config).await
}

// Operation names look like `apps/{project}/operations/{id}`.
fn project_from_operation(name: &str) -> Option<&str> {
    let mut parts = name.split('/');
    match (parts.next(), parts.next()) {
        (Some("apps"), Some(project)) if !project.is_empty() => Some(project),
        _ => None,
    }
}

fn operation_name(name: &str) -> Result<String> {
    if name.is_empty() {
        return Err(Error::deser("the response did not include an operation name"));
    }
    Ok(name.to_string())
}

/// Runs `action` until it succeeds, fails with a permanent error, or the
/// retry policy is exhausted.
///
/// Retries are only logged at the debug level.
async fn with_retry<T, F>(
    state: &mut RetryState,
    retry_policy: &dyn RetryPolicy,
    backoff_policy: &dyn BackoffPolicy,
    endpoint: &str,
    action: F,
) -> Result<T>
where
    F: AsyncFnMut() -> Result<T>,
{
    let service = service_name(endpoint);
    retry_loop_with_state(
        action,
        async |d: Duration| gax::delay::delay(d).await,
        state,
        retry_policy,
        backoff_policy,
        |attempt_count, error, delay| {
            tracing::debug!(
                attempt_count,
                ?delay,
                "request to {service} failed, trying again: {error}"
            )
        },
    )
    .await
}
