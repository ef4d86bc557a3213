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

mod core_error;
pub use core_error::*;

/// Errors returned by Google Cloud services.
///
/// The tool distinguishes between errors detected while trying to send a
/// request (e.g. cannot open a connection), errors trying to receive a
/// response, and errors returned by the service itself.
///
/// The types in this module represent the structured error payload returned
/// by the services, typically `{"error": {"code": 409, "message": "..."}}`.
///
/// # Examples
///
/// ```
/// # use gae_deploy_gax::error;
/// use error::Error;
/// fn handle_error(e: Error) {
///     if let Some(status) = e.status() {
///         println!("the service reported {status:?}")
///     }
/// }
/// ```
pub mod rpc;
