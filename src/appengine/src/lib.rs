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

//! Clients and workflows to deploy applications to App Engine.
//!
//! The [client::Client] type wraps the three REST APIs involved in a
//! deployment: the App Engine Admin API, Cloud Build, and Service Usage. Each
//! method makes a single request. The functions in [workflow] compose these
//! requests with the retry loop from `gax` and the pollers from `lro`.
//!
//! # Example
//! ```no_run
//! # async fn sample() -> anyhow::Result<()> {
//! use gae_deploy_appengine::client::Client;
//! use gae_deploy_appengine::options::ClientConfig;
//! use gae_deploy_appengine::workflow::{ServingStatus, set_serving_status};
//! let client = Client::new(ClientConfig::default().with_access_token("ya29.abc"))?;
//! let version = set_serving_status(&client, "my-project", "default", "v1", ServingStatus::Stopped).await?;
//! println!("{version:?}");
//! # Ok(()) }
//! ```

pub use gax::Result;
pub use gax::error::Error;

pub mod client;
pub mod console;
pub mod http;
pub mod model;
pub mod operation;
pub mod options;
pub mod workflow;
