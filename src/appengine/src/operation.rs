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

use crate::model::cloudbuild::Build;
use crate::model::{Operation, Version, serviceusage};
use gax::error::rpc::Status;
use lro::operation::{BuildResource, DiscoveryOperation};
use lro::serving::ServingResource;

impl DiscoveryOperation for Operation {
    fn done(&self) -> bool {
        self.done
    }
    fn name(&self) -> Option<&str> {
        Some(self.name.as_str()).filter(|n| !n.is_empty())
    }
    fn status(&self) -> Option<Status> {
        self.error.clone()
    }
    fn build_id(&self) -> Option<&str> {
        self.cloud_build_id()
    }
}

impl DiscoveryOperation for serviceusage::Operation {
    fn done(&self) -> bool {
        self.done
    }
    fn name(&self) -> Option<&str> {
        Some(self.name.as_str()).filter(|n| !n.is_empty())
    }
    fn status(&self) -> Option<Status> {
        self.error.clone()
    }
}

impl BuildResource for Build {
    fn build_status(&self) -> Option<&str> {
        Some(self.status.as_str()).filter(|s| !s.is_empty())
    }
}

impl ServingResource for Version {
    fn serving_status(&self) -> Option<&str> {
        Some(self.serving_status.as_str()).filter(|s| !s.is_empty())
    }
    fn error_status(&self) -> Option<Status> {
        serde_json::Value::Object(self.unknown_fields().clone()).error_status()
    }
}
