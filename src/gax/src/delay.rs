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

use std::time::Duration;

/// Suspends the current task for (at least) `period`.
///
/// This never blocks the thread, other tasks continue to make progress while
/// the caller waits. A zero `period` still yields to the scheduler.
///
/// # Example
/// ```
/// # tokio_test::block_on(async {
/// use gae_deploy_gax::delay::delay;
/// use std::time::Duration;
/// delay(Duration::from_millis(1)).await;
/// # });
/// ```
pub async fn delay(period: Duration) {
    tokio::time::sleep(period).await
}
