/*!
 * Attempt loop with linear backoff for model calls.
 *
 * The sleeping itself is injected through [`Sleeper`] so tests can run the
 * full retry schedule instantly and assert on the delays that would have
 * been taken.
 */

use std::fmt::{Debug, Display};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use parking_lot::Mutex;

/// Something that can wait
#[async_trait]
pub trait Sleeper: Send + Sync + Debug {
    /// Wait for `duration`
    async fn sleep(&self, duration: Duration);
}

/// Sleeps on the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }
}

/// Returns immediately and remembers every requested delay
#[derive(Debug, Clone, Default)]
pub struct RecordingSleeper {
    slept: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingSleeper {
    /// Create a sleeper with an empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays requested so far
    pub fn recorded(&self) -> Vec<Duration> {
        self.slept.lock().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.slept.lock().push(duration);
    }
}

/// All attempts failed
#[derive(Debug, Clone, PartialEq)]
pub struct RetryExhausted<E> {
    /// Attempts made
    pub attempts: u32,
    /// Error of the final attempt
    pub last_error: E,
}

/// Retry schedule: `max_retries` attempts, waiting `retry_delay × n` after failed attempt `n`
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_retries: u32,
    retry_delay: Duration,
    sleeper: Arc<dyn Sleeper>,
}

impl RetryPolicy {
    /// Create a policy sleeping on the tokio timer
    pub fn new(max_retries: u32, retry_delay: Duration) -> Self {
        Self {
            max_retries: max_retries.max(1),
            retry_delay,
            sleeper: Arc::new(TokioSleeper),
        }
    }

    /// Replace the sleeper
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Total attempts per operation
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Base delay
    pub fn retry_delay(&self) -> Duration {
        self.retry_delay
    }

    /// Delay after failed attempt `attempt` (1-based)
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.retry_delay * attempt
    }

    /// Wait through the injected sleeper
    pub async fn pause(&self, duration: Duration) {
        self.sleeper.sleep(duration).await;
    }

    /// Run `operation` until it succeeds or the attempts are used up.
    ///
    /// The closure receives the 1-based attempt number. No delay follows the
    /// final attempt.
    pub async fn run<T, E, F, Fut>(
        &self,
        operation_name: &str,
        operation: F,
    ) -> Result<T, RetryExhausted<E>>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        self.run_if(operation_name, |_| true, operation).await
    }

    /// Like [`run`](Self::run), but an error for which `is_retryable` is false ends the loop at once
    pub async fn run_if<T, E, F, Fut, P>(
        &self,
        operation_name: &str,
        is_retryable: P,
        mut operation: F,
    ) -> Result<T, RetryExhausted<E>>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
        P: Fn(&E) -> bool,
    {
        let mut attempt = 1;
        loop {
            match operation(attempt).await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!("{} succeeded on attempt {}", operation_name, attempt);
                    }
                    return Ok(value);
                }
                Err(e) if attempt < self.max_retries && is_retryable(&e) => {
                    let delay = self.delay_for_attempt(attempt);
                    warn!(
                        "{} failed (attempt {}/{}): {}. Retrying in {:?}",
                        operation_name, attempt, self.max_retries, e, delay
                    );
                    self.pause(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    warn!(
                        "{} gave up after {} attempts: {}",
                        operation_name, attempt, e
                    );
                    return Err(RetryExhausted {
                        attempts: attempt,
                        last_error: e,
                    });
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(1000))
    }
}
