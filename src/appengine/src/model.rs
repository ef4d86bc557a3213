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

//! Resources in the App Engine Admin API (v1).
//!
//! Only the fields used by this tool are modeled. Any other fields are kept
//! in `_unknown_fields`, they are included when the resource is serialized,
//! for example as the payload of a failed operation.

use gax::error::rpc::Status;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub mod cloudbuild;
pub mod serviceusage;

type UnknownFields = serde_json::Map<String, serde_json::Value>;

/// An App Engine long-running operation.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
#[non_exhaustive]
pub struct Operation {
    /// The server-assigned name, e.g. `apps/my-project/operations/123`.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,

    /// If true, the operation has completed, with or without an error.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub done: bool,

    /// The error result of the operation, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<Status>,

    /// Service-specific metadata.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<OperationMetadataV1>,

    /// The result of a successful operation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<serde_json::Value>,

    #[serde(flatten)]
    _unknown_fields: UnknownFields,
}

impl Operation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the value of [name][Operation::name].
    pub fn set_name<T: Into<String>>(mut self, v: T) -> Self {
        self.name = v.into();
        self
    }

    /// Sets the value of [done][Operation::done].
    pub fn set_done<T: Into<bool>>(mut self, v: T) -> Self {
        self.done = v.into();
        self
    }

    /// Sets the value of [error][Operation::error].
    pub fn set_error<T: Into<Status>>(mut self, v: T) -> Self {
        self.error = Some(v.into());
        self
    }

    /// Sets the value of [metadata][Operation::metadata].
    pub fn set_metadata<T: Into<OperationMetadataV1>>(mut self, v: T) -> Self {
        self.metadata = Some(v.into());
        self
    }

    /// The id of the Cloud Build build started by this operation, if any.
    pub fn cloud_build_id(&self) -> Option<&str> {
        self.metadata
            .as_ref()?
            .create_version_metadata
            .as_ref()
            .map(|m| m.cloud_build_id.as_str())
            .filter(|id| !id.is_empty())
    }
}

/// Metadata for App Engine operations.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
#[non_exhaustive]
pub struct OperationMetadataV1 {
    /// The API method that started the operation.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub method: String,

    /// The resource affected by the operation.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub target: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub insert_time: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub end_time: String,

    /// Durable messages that persist on every operation poll.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warning: Vec<String>,

    /// Present for `CreateVersion` operations.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub create_version_metadata: Option<CreateVersionMetadataV1>,

    #[serde(flatten)]
    _unknown_fields: UnknownFields,
}

impl OperationMetadataV1 {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the value of [create_version_metadata][OperationMetadataV1::create_version_metadata].
    pub fn set_create_version_metadata<T: Into<CreateVersionMetadataV1>>(mut self, v: T) -> Self {
        self.create_version_metadata = Some(v.into());
        self
    }
}

/// Metadata for `CreateVersion` operations.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
#[non_exhaustive]
pub struct CreateVersionMetadataV1 {
    /// The Cloud Build id, if one was started as part of the deployment.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub cloud_build_id: String,
}

impl CreateVersionMetadataV1 {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the value of [cloud_build_id][CreateVersionMetadataV1::cloud_build_id].
    pub fn set_cloud_build_id<T: Into<String>>(mut self, v: T) -> Self {
        self.cloud_build_id = v.into();
        self
    }
}

/// A version of a service.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
#[non_exhaustive]
pub struct Version {
    /// The full path, e.g. `apps/my-project/services/default/versions/v1`.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,

    /// The relative name, e.g. `v1`.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,

    /// The runtime, e.g. `nodejs22`.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub runtime: String,

    /// The App Engine environment, `standard` or `flexible`.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub env: String,

    /// `SERVING` or `STOPPED`.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub serving_status: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub instance_class: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub entrypoint: Option<Entrypoint>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub deployment: Option<Deployment>,

    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub env_variables: BTreeMap<String, String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub automatic_scaling: Option<AutomaticScaling>,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub create_time: String,

    /// The URL serving this version.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub version_url: String,

    #[serde(flatten)]
    _unknown_fields: UnknownFields,
}

impl Version {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fields in the response without a counterpart in this type.
    ///
    /// Errors reported in the body of a version, e.g. top-level `code` and
    /// `message` fields, end up here.
    pub fn unknown_fields(&self) -> &serde_json::Map<String, serde_json::Value> {
        &self._unknown_fields
    }

    /// Sets the value of [id][Version::id].
    pub fn set_id<T: Into<String>>(mut self, v: T) -> Self {
        self.id = v.into();
        self
    }

    /// Sets the value of [runtime][Version::runtime].
    pub fn set_runtime<T: Into<String>>(mut self, v: T) -> Self {
        self.runtime = v.into();
        self
    }

    /// Sets the value of [env][Version::env].
    pub fn set_env<T: Into<String>>(mut self, v: T) -> Self {
        self.env = v.into();
        self
    }

    /// Sets the value of [serving_status][Version::serving_status].
    pub fn set_serving_status<T: Into<String>>(mut self, v: T) -> Self {
        self.serving_status = v.into();
        self
    }

    /// Sets the value of [instance_class][Version::instance_class].
    pub fn set_instance_class<T: Into<String>>(mut self, v: T) -> Self {
        self.instance_class = v.into();
        self
    }

    /// Sets the value of [entrypoint][Version::entrypoint].
    pub fn set_entrypoint<T: Into<Entrypoint>>(mut self, v: T) -> Self {
        self.entrypoint = Some(v.into());
        self
    }

    /// Sets the value of [deployment][Version::deployment].
    pub fn set_deployment<T: Into<Deployment>>(mut self, v: T) -> Self {
        self.deployment = Some(v.into());
        self
    }

    /// Sets the value of [env_variables][Version::env_variables].
    pub fn set_env_variables<T, K, V>(mut self, v: T) -> Self
    where
        T: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.env_variables = v.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        self
    }

    /// Sets the value of [automatic_scaling][Version::automatic_scaling].
    pub fn set_automatic_scaling<T: Into<AutomaticScaling>>(mut self, v: T) -> Self {
        self.automatic_scaling = Some(v.into());
        self
    }
}

/// The command used to start the application.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
#[non_exhaustive]
pub struct Entrypoint {
    /// A shell command, e.g. `node server.js`.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub shell: String,
}

impl Entrypoint {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the value of [shell][Entrypoint::shell].
    pub fn set_shell<T: Into<String>>(mut self, v: T) -> Self {
        self.shell = v.into();
        self
    }
}

/// The source code for a version.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
#[non_exhaustive]
pub struct Deployment {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zip: Option<ZipInfo>,
}

impl Deployment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the value of [zip][Deployment::zip].
    pub fn set_zip<T: Into<ZipInfo>>(mut self, v: T) -> Self {
        self.zip = Some(v.into());
        self
    }
}

/// A zip file with the application source, already uploaded to Cloud Storage.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
#[non_exhaustive]
pub struct ZipInfo {
    /// The URL of the zip file, e.g. `https://storage.googleapis.com/bucket/app.zip`.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub source_url: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub files_count: Option<i32>,
}

impl ZipInfo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the value of [source_url][ZipInfo::source_url].
    pub fn set_source_url<T: Into<String>>(mut self, v: T) -> Self {
        self.source_url = v.into();
        self
    }

    /// Sets the value of [files_count][ZipInfo::files_count].
    pub fn set_files_count<T: Into<i32>>(mut self, v: T) -> Self {
        self.files_count = Some(v.into());
        self
    }
}

/// Automatic scaling settings.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
#[non_exhaustive]
pub struct AutomaticScaling {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub standard_scheduler_settings: Option<StandardSchedulerSettings>,

    #[serde(flatten)]
    _unknown_fields: UnknownFields,
}

impl AutomaticScaling {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the value of [standard_scheduler_settings][AutomaticScaling::standard_scheduler_settings].
    pub fn set_standard_scheduler_settings<T: Into<StandardSchedulerSettings>>(
        mut self,
        v: T,
    ) -> Self {
        self.standard_scheduler_settings = Some(v.into());
        self
    }
}

/// Instance limits for the standard environment.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
#[non_exhaustive]
pub struct StandardSchedulerSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_instances: Option<i32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_instances: Option<i32>,
}

impl StandardSchedulerSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the value of [min_instances][StandardSchedulerSettings::min_instances].
    pub fn set_min_instances<T: Into<i32>>(mut self, v: T) -> Self {
        self.min_instances = Some(v.into());
        self
    }

    /// Sets the value of [max_instances][StandardSchedulerSettings::max_instances].
    pub fn set_max_instances<T: Into<i32>>(mut self, v: T) -> Self {
        self.max_instances = Some(v.into());
        self
    }
}

/// A service, that is, a collection of versions.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
#[non_exhaustive]
pub struct Service {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,

    /// The relative name, e.g. `default`.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,

    /// How traffic is split between versions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub split: Option<TrafficSplit>,

    #[serde(flatten)]
    _unknown_fields: UnknownFields,
}

impl Service {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the value of [id][Service::id].
    pub fn set_id<T: Into<String>>(mut self, v: T) -> Self {
        self.id = v.into();
        self
    }

    /// Sets the value of [split][Service::split].
    pub fn set_split<T: Into<TrafficSplit>>(mut self, v: T) -> Self {
        self.split = Some(v.into());
        self
    }
}

/// Traffic routing for a service.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
#[non_exhaustive]
pub struct TrafficSplit {
    /// `COOKIE`, `IP`, or `RANDOM`.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub shard_by: String,

    /// Maps version ids to the fraction of traffic they receive.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub allocations: BTreeMap<String, f64>,
}

impl TrafficSplit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sends all the traffic to a single version.
    pub fn all_to<T: Into<String>>(version_id: T) -> Self {
        Self::new().set_allocations([(version_id, 1.0)])
    }

    /// Sets the value of [allocations][TrafficSplit::allocations].
    pub fn set_allocations<T, K>(mut self, v: T) -> Self
    where
        T: IntoIterator<Item = (K, f64)>,
        K: Into<String>,
    {
        self.allocations = v.into_iter().map(|(k, v)| (k.into(), v)).collect();
        self
    }
}

/// The response for `services.list`.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
#[non_exhaustive]
pub struct ListServicesResponse {
    pub services: Vec<Service>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub next_page_token: String,
}

/// The response for `services.versions.list`.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
#[non_exhaustive]
pub struct ListVersionsResponse {
    pub versions: Vec<Version>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub next_page_token: String,
}
