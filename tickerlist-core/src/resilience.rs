//! Retry, backoff and the fallback chain.
//!
//! A build walks this policy:
//! 1. Run the pipeline, retrying network, parse and validation failures with
//!    bounded exponential backoff
//! 2. On success → write the artifact if it changed
//! 3. Retries exhausted and a previous artifact that still passes validation
//!    exists → rewrite it byte for byte (degraded)
//! 4. Otherwise → persist the built-in seed list (failed, but an artifact exists)
//!
//! A persistence failure at any write is fatal and returned immediately.

use crate::config::BuildConfig;
use crate::error::{BuildError, PersistenceError};
use crate::fetch::Fetch;
use crate::pipeline::Pipeline;
use crate::seed::seed_set;
use crate::snapshot::{SnapshotStore, WriteOutcome};
use rand::Rng;
use serde::Serialize;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{error, info, warn};

/// Exit code for a build that produced no artifact at all.
pub const EXIT_NO_ARTIFACT: i32 = 30;

/// Bounded exponential backoff.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    pub factor: f64,
    pub min_delay: Duration,
    pub max_delay: Duration,
    /// Multiply each delay by a random factor in `[1, 2)`, still capped at `max_delay`.
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            factor: 2.0,
            min_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(5),
            jitter: false,
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `retry` (1 = the wait after the first failure).
    pub fn delay_for(&self, retry: u32) -> Duration {
        let exp = retry.saturating_sub(1).min(i32::MAX as u32) as i32;
        let secs = self.min_delay.as_secs_f64() * self.factor.powi(exp);
        let capped = secs.min(self.max_delay.as_secs_f64());
        Duration::from_secs_f64(capped.max(0.0))
    }

    fn jittered(&self, base: Duration) -> Duration {
        if !self.jitter {
            return base;
        }
        let factor: f64 = rand::thread_rng().gen_range(1.0..2.0);
        base.mul_f64(factor).min(self.max_delay)
    }
}

/// Blocking wait between attempts. Injected so tests never sleep.
pub trait Sleeper {
    fn sleep(&self, duration: Duration);
}

impl<S: Sleeper + ?Sized> Sleeper for Arc<S> {
    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration);
    }
}

/// Sleeps the current thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Records requested waits instead of sleeping.
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    waits: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn waits(&self) -> Vec<Duration> {
        self.waits.lock().unwrap().clone()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        self.waits.lock().unwrap().push(duration);
    }
}

/// Final result of a retried operation.
#[derive(Debug)]
pub struct Retried<T, E> {
    pub result: Result<T, E>,
    pub attempts: u32,
}

/// Run `op` until it succeeds or `policy.max_attempts` is spent.
///
/// `op` receives the 1-based attempt number. Every failure but the last is
/// followed by a backoff wait through `sleeper`.
pub fn retry_with_backoff<T, E, F>(policy: &RetryPolicy, sleeper: &dyn Sleeper, mut op: F) -> Retried<T, E>
where
    E: fmt::Display,
    F: FnMut(u32) -> Result<T, E>,
{
    let max = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match op(attempt) {
            Ok(value) => {
                return Retried {
                    result: Ok(value),
                    attempts: attempt,
                }
            }
            Err(e) => {
                let left = max - attempt;
                warn!("attempt {attempt} failed ({left} left): {e}");
                if left == 0 {
                    return Retried {
                        result: Err(e),
                        attempts: attempt,
                    };
                }
                let wait = policy.jittered(policy.delay_for(attempt));
                sleeper.sleep(wait);
                attempt += 1;
            }
        }
    }
}

/// Terminal state of a build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildStatus {
    /// Fresh list, identical to the artifact on disk.
    Unchanged,
    /// Fresh list, artifact rewritten.
    Changed,
    /// Source unusable; previous artifact re-persisted.
    Degraded,
    /// Source unusable and no previous artifact; seed list written.
    Seeded,
}

impl BuildStatus {
    pub fn exit_code(self) -> i32 {
        match self {
            BuildStatus::Unchanged => 0,
            BuildStatus::Changed => 10,
            BuildStatus::Degraded => 20,
            BuildStatus::Seeded => 21,
        }
    }

    /// Whether the build used fresh source data.
    pub fn is_success(self) -> bool {
        matches!(self, BuildStatus::Unchanged | BuildStatus::Changed)
    }

    pub fn label(self) -> &'static str {
        match self {
            BuildStatus::Unchanged => "unchanged",
            BuildStatus::Changed => "changed",
            BuildStatus::Degraded => "degraded",
            BuildStatus::Seeded => "seeded",
        }
    }
}

/// What a build did and why.
#[derive(Debug)]
pub struct BuildOutcome {
    pub status: BuildStatus,
    pub write: WriteOutcome,
    pub attempts: u32,
    pub warnings: Vec<String>,
    /// Last pipeline failure, for degraded and seeded builds.
    pub cause: Option<BuildError>,
}

impl BuildOutcome {
    pub fn exit_code(&self) -> i32 {
        self.status.exit_code()
    }

    /// One-line summary naming the failure kind when there was one.
    pub fn message(&self) -> String {
        let count = self.write.count;
        let attempts = self.attempts;
        match (&self.status, &self.cause) {
            (BuildStatus::Unchanged, _) => {
                format!("no change: {count} symbols ({attempts} attempt(s))")
            }
            (BuildStatus::Changed, _) => {
                format!("artifact updated: {count} symbols ({attempts} attempt(s))")
            }
            (BuildStatus::Degraded, Some(cause)) => format!(
                "build failed after {attempts} attempt(s) with {cause}; kept previous artifact ({count} symbols)"
            ),
            (BuildStatus::Seeded, Some(cause)) => format!(
                "build failed after {attempts} attempt(s) with {cause}; wrote built-in seed list ({count} symbols)"
            ),
            (status, None) => format!("{}: {count} symbols", status.label()),
        }
    }
}

/// Drives the pipeline through retries and the fallback chain.
pub struct Controller {
    pipeline: Pipeline,
    policy: RetryPolicy,
    sleeper: Box<dyn Sleeper>,
}

impl Controller {
    pub fn new(pipeline: Pipeline, policy: RetryPolicy) -> Self {
        Self {
            pipeline,
            policy,
            sleeper: Box::new(ThreadSleeper),
        }
    }

    pub fn from_config(config: &BuildConfig) -> Self {
        let pipeline = Pipeline::new(
            config.source.url.clone(),
            config.normalizer(),
            config.validator(),
        );
        Self::new(pipeline, config.retry.policy())
    }

    pub fn with_sleeper(mut self, sleeper: impl Sleeper + 'static) -> Self {
        self.sleeper = Box::new(sleeper);
        self
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn run(
        &self,
        fetcher: &dyn Fetch,
        store: &dyn SnapshotStore,
    ) -> Result<BuildOutcome, PersistenceError> {
        let previous = store.load()?.filter(|snapshot| {
            let usable = self.pipeline.validator().accepts(&snapshot.symbols);
            if !usable {
                warn!(
                    count = snapshot.symbols.len(),
                    "previous artifact fails validation; it will not be used as a fallback"
                );
            }
            usable
        });

        info!(url = self.pipeline.url(), "building symbol list");
        let retried = retry_with_backoff(&self.policy, self.sleeper.as_ref(), |attempt| {
            info!(attempt, "fetching source");
            self.pipeline.run_once(fetcher)
        });
        let attempts = retried.attempts;

        let cause = match retried.result {
            Ok(validated) => {
                let write = store.diff_and_write(&validated.symbols)?;
                let status = if write.written {
                    BuildStatus::Changed
                } else {
                    BuildStatus::Unchanged
                };
                info!(count = write.count, status = status.label(), "build succeeded");
                return Ok(BuildOutcome {
                    status,
                    write,
                    attempts,
                    warnings: validated.warnings,
                    cause: None,
                });
            }
            Err(cause) => cause,
        };

        error!(kind = cause.kind(), "retries exhausted: {cause}");
        let warnings = vec![format!("{} after {attempts} attempt(s): {cause}", cause.kind())];

        if let Some(snapshot) = previous {
            warn!(count = snapshot.symbols.len(), "re-persisting previous artifact");
            let write = store.restore(&snapshot)?;
            return Ok(BuildOutcome {
                status: BuildStatus::Degraded,
                write,
                attempts,
                warnings,
                cause: Some(cause),
            });
        }

        warn!("no previous artifact; writing built-in seed list");
        let write = store.write(&seed_set(self.pipeline.normalizer()))?;
        Ok(BuildOutcome {
            status: BuildStatus::Seeded,
            write,
            attempts,
            warnings,
            cause: Some(cause),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> RetryPolicy {
        RetryPolicy::default()
    }

    #[test]
    fn delays_grow_and_cap() {
        let p = policy();
        assert_eq!(p.delay_for(1), Duration::from_secs(1));
        assert_eq!(p.delay_for(2), Duration::from_secs(2));
        assert_eq!(p.delay_for(3), Duration::from_secs(4));
        assert_eq!(p.delay_for(4), Duration::from_secs(5));
        assert_eq!(p.delay_for(40), Duration::from_secs(5));
    }

    #[test]
    fn jitter_stays_within_bounds() {
        let p = RetryPolicy {
            jitter: true,
            ..policy()
        };
        for retry in 1..6 {
            let base = p.delay_for(retry);
            let d = p.jittered(base);
            assert!(d >= base);
            assert!(d <= p.max_delay);
        }
    }

    #[test]
    fn succeeds_without_waiting() {
        let sleeper = RecordingSleeper::new();
        let out: Retried<u32, String> = retry_with_backoff(&policy(), &sleeper, |n| Ok(n));
        assert_eq!(out.result.unwrap(), 1);
        assert_eq!(out.attempts, 1);
        assert!(sleeper.waits().is_empty());
    }

    #[test]
    fn retries_then_succeeds() {
        let sleeper = RecordingSleeper::new();
        let out = retry_with_backoff(&policy(), &sleeper, |n| {
            if n < 3 {
                Err(format!("boom {n}"))
            } else {
                Ok("done")
            }
        });
        assert_eq!(out.result.unwrap(), "done");
        assert_eq!(out.attempts, 3);
        assert_eq!(
            sleeper.waits(),
            vec![Duration::from_secs(1), Duration::from_secs(2)]
        );
    }

    #[test]
    fn exhaustion_returns_last_error() {
        let sleeper = RecordingSleeper::new();
        let out: Retried<(), String> =
            retry_with_backoff(&policy(), &sleeper, |n| Err(format!("fail {n}")));
        assert_eq!(out.result.unwrap_err(), "fail 3");
        assert_eq!(out.attempts, 3);
        assert_eq!(sleeper.waits().len(), 2);
    }

    #[test]
    fn zero_attempts_still_tries_once() {
        let sleeper = RecordingSleeper::new();
        let p = RetryPolicy {
            max_attempts: 0,
            ..policy()
        };
        let out: Retried<(), &str> = retry_with_backoff(&p, &sleeper, |_| Err("x"));
        assert_eq!(out.attempts, 1);
        assert!(sleeper.waits().is_empty());
    }

    #[test]
    fn exit_codes_are_distinct() {
        let mut codes: Vec<i32> = [
            BuildStatus::Unchanged,
            BuildStatus::Changed,
            BuildStatus::Degraded,
            BuildStatus::Seeded,
        ]
        .iter()
        .map(|s| s.exit_code())
        .collect();
        codes.push(EXIT_NO_ARTIFACT);
        let mut dedup = codes.clone();
        dedup.sort();
        dedup.dedup();
        assert_eq!(dedup.len(), codes.len());
        assert_eq!(BuildStatus::Unchanged.exit_code(), 0);
    }
}
