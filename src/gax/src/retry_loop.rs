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

//! Resubmits side-effecting actions that fail with transient errors.

use super::Result;
use super::backoff_policy::BackoffPolicy;
use super::error::Error;
use super::retry_policy::RetryPolicy;
use super::retry_result::RetryResult;
use super::retry_state::RetryState;
use std::time::Duration;

/// Runs the retry loop for a given action.
///
/// This functions calls `inner` as long as (1) the retry policy has not
/// expired, and (2) `inner` has not returned a successful response.
///
/// In between calls the function waits the amount of time prescribed by the
/// backoff policy, using `sleep` to implement any sleep.
///
/// Each invocation uses a fresh [RetryState]. Use [retry_loop_with_state]
/// to thread the state through a longer call chain.
pub async fn retry_loop<F, S, Response>(
    inner: F,
    sleep: S,
    retry_policy: &dyn RetryPolicy,
    backoff_policy: &dyn BackoffPolicy,
) -> Result<Response>
where
    F: AsyncFnMut() -> Result<Response>,
    S: AsyncFn(Duration) -> (),
{
    let mut state = RetryState::new();
    retry_loop_with_state(
        inner,
        sleep,
        &mut state,
        retry_policy,
        backoff_policy,
        |_, _, _| {},
    )
    .await
}

/// Runs the retry loop with an explicit state and a callback for retries.
///
/// The caller owns `state`, it is never stored anywhere else. When this
/// function returns the attempt count is zero, regardless of the outcome.
/// If the retry policy stops the loop the last error is returned unchanged.
///
/// The `on_retry` callback is called before sleeping, with the attempt count,
/// the error, and the delay.
pub async fn retry_loop_with_state<F, S, OnRetry, Response>(
    mut inner: F,
    sleep: S,
    state: &mut RetryState,
    retry_policy: &dyn RetryPolicy,
    backoff_policy: &dyn BackoffPolicy,
    mut on_retry: OnRetry,
) -> Result<Response>
where
    F: AsyncFnMut() -> Result<Response>,
    S: AsyncFn(Duration) -> (),
    OnRetry: FnMut(u32, &Error, Duration),
{
    loop {
        state.attempt_count += 1;
        let error = match inner().await {
            Ok(r) => {
                state.reset();
                return Ok(r);
            }
            Err(e) => e,
        };
        let delay = backoff_policy.on_failure(state, &error);
        match retry_policy.on_error(state, error) {
            RetryResult::Permanent(e) | RetryResult::Exhausted(e) => {
                state.reset();
                return Err(e);
            }
            RetryResult::Continue(e) => {
                on_retry(state.attempt_count, &e, delay);
                sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::rpc::Status;
    use crate::exponential_backoff::ExponentialBackoffBuilder;
    use crate::retry_policy::{RetryPolicyExt, TransientErrors};
    use std::sync::{Arc, Mutex};

    #[tokio::test]
    async fn immediate_success() -> anyhow::Result<()> {
        let mut call = MockCall::new();
        call.expect_call().once().returning(success);
        let inner = async move || call.call();

        let retry_policy = MockRetryPolicy::new();
        let backoff_policy = MockBackoffPolicy::new();
        let sleep = MockSleep::new();
        let backoff = async move |d| sleep.sleep(d).await;

        let response = retry_loop(inner, backoff, &retry_policy, &backoff_policy).await?;
        assert_eq!(response, "success");
        Ok(())
    }

    #[tokio::test]
    async fn immediate_failure() -> anyhow::Result<()> {
        let mut call = MockCall::new();
        call.expect_call().once().returning(permanent);
        let inner = async move || call.call();

        let mut retry_policy = MockRetryPolicy::new();
        retry_policy
            .expect_on_error()
            .once()
            .returning(|_, e| RetryResult::Permanent(e));
        let mut backoff_policy = MockBackoffPolicy::new();
        backoff_policy
            .expect_on_failure()
            .once()
            .return_const(Duration::from_secs(0));
        let sleep = MockSleep::new();
        let backoff = async move |d| sleep.sleep(d).await;

        let mut state = RetryState::new();
        let response = retry_loop_with_state(
            inner,
            backoff,
            &mut state,
            &retry_policy,
            &backoff_policy,
            |_, _, _| {},
        )
        .await;
        let err = response.expect_err("permanent errors stop the loop");
        assert_eq!(err.status().map(|s| s.code), Some(403), "{err:?}");
        assert_eq!(state.attempt_count, 0);
        Ok(())
    }

    #[tokio::test]
    async fn retry_success() -> anyhow::Result<()> {
        let mut call_seq = mockall::Sequence::new();
        let mut call = MockCall::new();
        call.expect_call()
            .once()
            .in_sequence(&mut call_seq)
            .returning(transient);
        call.expect_call()
            .once()
            .in_sequence(&mut call_seq)
            .returning(transient);
        call.expect_call()
            .once()
            .in_sequence(&mut call_seq)
            .returning(success);
        let inner = async move || call.call();

        let mut retry_seq = mockall::Sequence::new();
        let mut retry_policy = MockRetryPolicy::new();
        for n in 1..=2_u32 {
            retry_policy
                .expect_on_error()
                .once()
                .in_sequence(&mut retry_seq)
                .withf(move |state, _| state.attempt_count == n)
                .returning(|_, e| RetryResult::Continue(e));
        }

        let mut backoff_seq = mockall::Sequence::new();
        let mut backoff_policy = MockBackoffPolicy::new();
        let mut sleep_seq = mockall::Sequence::new();
        let mut sleep = MockSleep::new();
        for d in 1..=2 {
            backoff_policy
                .expect_on_failure()
                .once()
                .in_sequence(&mut backoff_seq)
                .return_const(Duration::from_millis(d));
            sleep
                .expect_sleep()
                .once()
                .in_sequence(&mut sleep_seq)
                .withf(move |got| got == &Duration::from_millis(d))
                .returning(|_| Box::pin(async {}));
        }
        let backoff = async move |d| sleep.sleep(d).await;

        let retries = Arc::new(Mutex::new(Vec::new()));
        let captured = retries.clone();
        let mut state = RetryState::new();
        let response = retry_loop_with_state(
            inner,
            backoff,
            &mut state,
            &retry_policy,
            &backoff_policy,
            move |n, _, d| captured.lock().expect("not poisoned").push((n, d)),
        )
        .await;
        assert!(matches!(&response, Ok(s) if s == "success"), "{response:?}");
        assert_eq!(state.attempt_count, 0);
        let retries = retries.lock().expect("not poisoned").clone();
        assert_eq!(
            retries,
            vec![(1, Duration::from_millis(1)), (2, Duration::from_millis(2))]
        );
        Ok(())
    }

    #[tokio::test]
    async fn exhausted_returns_last_error() -> anyhow::Result<()> {
        const ERRORS: usize = 3;
        let mut call_seq = mockall::Sequence::new();
        let mut call = MockCall::new();
        for i in 0..ERRORS {
            call.expect_call()
                .once()
                .in_sequence(&mut call_seq)
                .returning(move || numbered_transient(i));
        }
        let inner = async move || call.call();

        let mut retry_seq = mockall::Sequence::new();
        let mut retry_policy = MockRetryPolicy::new();
        for _ in 0..ERRORS - 1 {
            retry_policy
                .expect_on_error()
                .once()
                .in_sequence(&mut retry_seq)
                .returning(|_, e| RetryResult::Continue(e));
        }
        retry_policy
            .expect_on_error()
            .once()
            .in_sequence(&mut retry_seq)
            .returning(|_, e| RetryResult::Exhausted(e));

        let mut backoff_policy = MockBackoffPolicy::new();
        backoff_policy
            .expect_on_failure()
            .times(ERRORS)
            .return_const(Duration::from_millis(1));
        let mut sleep = MockSleep::new();
        sleep
            .expect_sleep()
            .times(ERRORS - 1)
            .returning(|_| Box::pin(async {}));
        let backoff = async move |d| sleep.sleep(d).await;

        let response = retry_loop(inner, backoff, &retry_policy, &backoff_policy).await;
        let err = response.expect_err("the policy stops the loop");
        let status = err.status().expect("the original error is preserved");
        assert_eq!(status.message, format!("transient-{}", ERRORS - 1));
        Ok(())
    }

    // A real policy: retry server errors, 10 attempts, 2s between them.
    #[tokio::test]
    async fn capped_attempts_with_real_policies() -> anyhow::Result<()> {
        const MAX_ATTEMPTS: u32 = 10;
        let retry_policy = TransientErrors.with_attempt_limit(MAX_ATTEMPTS);
        let backoff_policy = ExponentialBackoffBuilder::new()
            .with_initial_delay(Duration::from_secs(2))
            .with_scaling(1.0)
            .build()?;

        let calls = Arc::new(Mutex::new(0_u32));
        let counter = calls.clone();
        let inner = async move || {
            *counter.lock().expect("not poisoned") += 1;
            transient()
        };
        let delays = Arc::new(Mutex::new(Vec::new()));
        let recorded = delays.clone();
        let sleep = async move |d: Duration| recorded.lock().expect("not poisoned").push(d);

        let mut state = RetryState::new();
        let response = retry_loop_with_state(
            inner,
            sleep,
            &mut state,
            &retry_policy,
            &backoff_policy,
            |_, _, _| {},
        )
        .await;
        let err = response.expect_err("server errors never succeed");
        assert_eq!(err.status().map(|s| s.code), Some(503), "{err:?}");
        assert_eq!(*calls.lock().expect("not poisoned"), MAX_ATTEMPTS);
        assert_eq!(state.attempt_count, 0);
        let delays = delays.lock().expect("not poisoned").clone();
        assert_eq!(
            delays,
            vec![Duration::from_secs(2); MAX_ATTEMPTS as usize - 1]
        );
        Ok(())
    }

    #[tokio::test]
    async fn conflicts_wait_longer() -> anyhow::Result<()> {
        let retry_policy = TransientErrors.with_attempt_limit(3);
        let backoff_policy = ExponentialBackoffBuilder::new()
            .with_initial_delay(Duration::from_millis(100))
            .build()?;

        let mut errors = vec![conflict(), transient()].into_iter();
        let inner = async move || match errors.next() {
            Some(e) => e,
            None => success(),
        };
        let delays = Arc::new(Mutex::new(Vec::new()));
        let recorded = delays.clone();
        let sleep = async move |d: Duration| recorded.lock().expect("not poisoned").push(d);

        let response = retry_loop(inner, sleep, &retry_policy, &backoff_policy).await?;
        assert_eq!(response, "success");
        let delays = delays.lock().expect("not poisoned").clone();
        assert_eq!(
            delays,
            vec![Duration::from_millis(400), Duration::from_millis(100)]
        );
        Ok(())
    }

    #[tokio::test]
    async fn state_is_reused_across_actions() -> anyhow::Result<()> {
        let retry_policy = TransientErrors.with_attempt_limit(2);
        let backoff_policy = ExponentialBackoffBuilder::new()
            .with_initial_delay(Duration::ZERO)
            .build()?;
        let mut state = RetryState::new();
        let first = retry_loop_with_state(
            async || transient(),
            async |_| {},
            &mut state,
            &retry_policy,
            &backoff_policy,
            |_, _, _| {},
        )
        .await;
        assert!(first.is_err(), "{first:?}");
        assert_eq!(state.attempt_count, 0);

        // The second action gets the full budget.
        let mut errors = vec![transient()].into_iter();
        let second = retry_loop_with_state(
            async move || errors.next().unwrap_or_else(success),
            async |_| {},
            &mut state,
            &retry_policy,
            &backoff_policy,
            |_, _, _| {},
        )
        .await?;
        assert_eq!(second, "success");
        assert_eq!(state.attempt_count, 0);
        Ok(())
    }

    fn success() -> Result<String> {
        Ok("success".into())
    }

    fn transient() -> Result<String> {
        Err(Error::service(
            Status::default().set_code(503).set_message("try-again"),
        ))
    }

    fn conflict() -> Result<String> {
        Err(Error::service(
            Status::default()
                .set_code(409)
                .set_message("Operation is already in progress for project p"),
        ))
    }

    fn numbered_transient(i: usize) -> Result<String> {
        Err(Error::service(
            Status::default()
                .set_code(503)
                .set_message(format!("transient-{i}")),
        ))
    }

    fn permanent() -> Result<String> {
        Err(Error::service(
            Status::default().set_code(403).set_message("uh-oh"),
        ))
    }

    trait Call {
        fn call(&self) -> Result<String>;
    }

    mockall::mock! {
        Call {}
        impl Call for Call {
            fn call(&self) -> Result<String>;
        }
    }

    trait Sleep {
        fn sleep(&self, d: Duration) -> impl Future<Output = ()>;
    }

    mockall::mock! {
        Sleep {}
        impl Sleep for Sleep {
            fn sleep(&self, d: Duration) -> impl Future<Output = ()> + Send;
        }
    }

    mockall::mock! {
        #[derive(Debug)]
        RetryPolicy {}
        impl RetryPolicy for RetryPolicy {
            fn on_error(&self, state: &RetryState, error: Error) -> RetryResult;
        }
    }

    mockall::mock! {
        #[derive(Debug)]
        BackoffPolicy {}
        impl BackoffPolicy for BackoffPolicy {
            fn on_failure(&self, state: &RetryState, error: &Error) -> Duration;
        }
    }
}
