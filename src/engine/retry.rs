use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tracing::warn;

use crate::engine::llm_client::ModelError;
use crate::error::CommentaryError;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_BACKOFF_BASE: Duration = Duration::from_secs(2);

/// Wait to apply after a failed attempt (1-based).
pub trait BackoffSchedule: Send + Sync {
    fn delay(&self, attempt: u32) -> Duration;
}

impl<F> BackoffSchedule for F
where
    F: Fn(u32) -> Duration + Send + Sync,
{
    fn delay(&self, attempt: u32) -> Duration {
        self(attempt)
    }
}

/// `base * attempt`, plus up to `jitter` (a fraction of `base`, kept below 1.0
/// so a later wait is never shorter than an earlier one).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearBackoff {
    base: Duration,
    jitter: f64,
}

impl LinearBackoff {
    pub fn new(base: Duration) -> Self {
        Self { base, jitter: 0.0 }
    }

    pub fn with_jitter(mut self, jitter: f64) -> Self {
        self.jitter = if jitter.is_finite() {
            jitter.clamp(0.0, 0.99)
        } else {
            0.0
        };
        self
    }

    pub fn base(&self) -> Duration {
        self.base
    }

    pub fn jitter(&self) -> f64 {
        self.jitter
    }
}

impl Default for LinearBackoff {
    fn default() -> Self {
        Self::new(DEFAULT_BACKOFF_BASE)
    }
}

impl BackoffSchedule for LinearBackoff {
    fn delay(&self, attempt: u32) -> Duration {
        let linear = self.base.saturating_mul(attempt.max(1));
        if !(self.jitter > 0.0 && self.jitter < 1.0) {
            return linear;
        }
        let extra = rand::thread_rng().gen_range(0.0..self.jitter);
        linear.saturating_add(self.base.mul_f64(extra))
    }
}

#[derive(Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub schedule: Arc<dyn BackoffSchedule>,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, schedule: impl BackoffSchedule + 'static) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            schedule: Arc::new(schedule),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, LinearBackoff::default())
    }
}

impl std::fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .finish_non_exhaustive()
    }
}

const TRANSIENT_STATUSES: [u16; 2] = [429, 503];

const TRANSIENT_MARKERS: [&str; 6] = [
    "429",
    "503",
    "resource_exhausted",
    "unavailable",
    "rate limit",
    "overloaded",
];

/// Rate limiting and overload are worth retrying; nothing else is.
pub fn is_transient(status: Option<u16>, message: &str) -> bool {
    if status.is_some_and(|code| TRANSIENT_STATUSES.contains(&code)) {
        return true;
    }
    let message = message.to_ascii_lowercase();
    TRANSIENT_MARKERS.iter().any(|m| message.contains(m))
}

fn is_transient_error(err: &ModelError) -> bool {
    match err {
        ModelError::Remote { status, message } => is_transient(*status, message),
        ModelError::EmptyResponse
        | ModelError::Timeout(_)
        | ModelError::Decode(_)
        | ModelError::Client(_) => false,
    }
}

/// Run `call` until it succeeds, fails terminally, or runs out of attempts.
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, mut call: F) -> Result<T, CommentaryError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ModelError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        let err = match call().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        if !is_transient_error(&err) {
            return Err(CommentaryError::Model(err));
        }

        if attempt >= max_attempts {
            warn!(attempts = attempt, error = %err, "giving up after transient failures");
            return Err(CommentaryError::RetriesExhausted {
                attempts: attempt,
                last: err,
            });
        }

        let wait = policy.schedule.delay(attempt);
        warn!(
            attempt,
            max_attempts,
            wait_ms = wait.as_millis() as u64,
            error = %err,
            "transient model failure, retrying"
        );
        tokio::time::sleep(wait).await;
        attempt += 1;
    }
}
