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

//! Request helpers for the App Engine deployment tool.
//!
//! This crate contains the error model shared by all the crates in the
//! workspace, the policies controlling retry loops, and the retry loop
//! itself. The long-running operation pollers live in the `lro` crate, they
//! build on the types defined here.

/// An alias of [std::result::Result] where the error is always [crate::error::Error].
///
/// This is the result type used by all functions making requests.
pub type Result<T> = std::result::Result<T, crate::error::Error>;

/// The core error types.
pub mod error;

/// Suspends the current task without blocking the thread.
pub mod delay;

/// Decides if a failed request may succeed when resubmitted.
pub mod classify;

pub mod backoff_policy;
pub mod exponential_backoff;
pub mod polling_error_policy;
pub mod retry_loop;
pub mod retry_policy;
pub mod retry_result;
pub mod retry_state;
