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

//! Defines the state threaded through a retry loop.

/// The input into retry and backoff policy queries.
///
/// Each logical call chain owns one instance. The retry loop borrows it
/// mutably, so two concurrent actions can never share an attempt counter.
/// The loop resets [attempt_count][RetryState::attempt_count] to zero when
/// it returns, successful or not, so the same instance can be reused by the
/// next action in the chain.
#[derive(Clone, Debug, Default)]
#[non_exhaustive]
pub struct RetryState {
    /// The number of times the action has been attempted.
    pub attempt_count: u32,
}

impl RetryState {
    /// Create a new instance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Update the attempt count, useful in mocks.
    pub fn set_attempt_count<T: Into<u32>>(mut self, v: T) -> Self {
        self.attempt_count = v.into();
        self
    }

    pub(crate) fn reset(&mut self) {
        self.attempt_count = 0;
    }
}
