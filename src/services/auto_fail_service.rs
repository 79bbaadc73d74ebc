use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{Notify, RwLock};
use tokio::task::JoinHandle;

use crate::{
    models::domain::AttemptStatus,
    repositories::{AttemptCompletion, AttemptRepository, QuizRepository},
};

/// Buffer added to a quiz's time limit before an in-progress attempt is
/// force-completed, so a legitimate submission racing the sweep at the
/// boundary still wins.
pub const EXPIRY_GRACE_SECONDS: i64 = 30;

const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// True when the attempt has outlived its quiz's time limit plus grace.
/// Strictly greater-than: at exactly limit+grace the attempt is still alive.
pub fn is_expired(started_at: DateTime<Utc>, time_limit_minutes: i64, now: DateTime<Utc>) -> bool {
    let allowed =
        chrono::Duration::minutes(time_limit_minutes) + chrono::Duration::seconds(EXPIRY_GRACE_SECONDS);
    now.signed_duration_since(started_at) > allowed
}

/// Background expiry enforcer. One sweep runs at startup and then once per
/// minute; sweeps are sequential, a tick never overlaps a running pass.
/// Force-completion goes through the same conditional transition as
/// submission, so losing the race to a last-instant submit is silent and
/// expected.
pub struct AutoFailService {
    attempt_repo: Arc<dyn AttemptRepository>,
    quiz_repo: Arc<dyn QuizRepository>,
    handle: RwLock<Option<JoinHandle<()>>>,
    stop_signal: Notify,
    stopped: AtomicBool,
}

impl AutoFailService {
    pub fn new(attempt_repo: Arc<dyn AttemptRepository>, quiz_repo: Arc<dyn QuizRepository>) -> Self {
        Self {
            attempt_repo,
            quiz_repo,
            handle: RwLock::new(None),
            stop_signal: Notify::new(),
            stopped: AtomicBool::new(false),
        }
    }

    /// Spawn the recurring sweep. Call once at startup, after repositories
    /// are wired.
    pub async fn start(self: &Arc<Self>) {
        let service = Arc::clone(self);

        let handle = tokio::spawn(async move {
            log::info!("Auto-fail sweep started, checking for expired attempts every minute");

            let mut interval = tokio::time::interval(SWEEP_INTERVAL);
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        service.sweep_once().await;
                    }
                    _ = service.stop_signal.notified() => {
                        log::info!("Auto-fail sweep stopped");
                        break;
                    }
                }
            }
        });

        *self.handle.write().await = Some(handle);
    }

    /// Stop the sweep. Idempotent: a second call is a no-op rather than a
    /// panic, per the check-and-set on `stopped`.
    pub async fn stop(&self) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return;
        }

        self.stop_signal.notify_one();
        if let Some(handle) = self.handle.write().await.take() {
            let _ = handle.await;
        }
    }

    /// One full pass over every in-progress attempt, cluster-wide. Returns
    /// the number of attempts expired this pass. Never fails: per-record
    /// errors are logged and skipped so one bad record cannot halt the sweep.
    pub async fn sweep_once(&self) -> usize {
        let attempts = match self.attempt_repo.find_in_progress().await {
            Ok(attempts) => attempts,
            Err(e) => {
                log::error!("Failed to fetch in-progress attempts: {}", e);
                return 0;
            }
        };

        if attempts.is_empty() {
            return 0;
        }

        log::debug!("Checking {} in-progress attempts for expiry", attempts.len());

        let mut expired_count = 0;
        for attempt in attempts {
            let quiz = match self.quiz_repo.find_by_id(&attempt.quiz_id).await {
                Ok(Some(quiz)) => quiz,
                Ok(None) => {
                    log::warn!(
                        "Quiz {} missing for attempt {}, skipping",
                        attempt.quiz_id,
                        attempt.id
                    );
                    continue;
                }
                Err(e) => {
                    log::warn!(
                        "Failed to fetch quiz {} for attempt {}: {}",
                        attempt.quiz_id,
                        attempt.id,
                        e
                    );
                    continue;
                }
            };

            let now = Utc::now();
            if !is_expired(attempt.started_at, quiz.time_limit_minutes, now) {
                continue;
            }

            // Finished attempt with no submission: zero score, no answers.
            // Status stays `completed` for consumer compatibility even though
            // an auto_failed variant exists in the model.
            let completion = AttemptCompletion {
                completed_at: now,
                answers: Vec::new(),
                score: 0.0,
                passed: false,
                time_taken: attempt.elapsed_seconds(now),
                status: AttemptStatus::Completed,
            };

            match self
                .attempt_repo
                .complete_if_in_progress(&attempt.id, &completion)
                .await
            {
                Ok(true) => {
                    expired_count += 1;
                    log::info!(
                        "Auto-failed expired attempt {} for user {} on quiz {} (limit {}m + {}s grace)",
                        attempt.id,
                        attempt.user_id,
                        attempt.quiz_id,
                        quiz.time_limit_minutes,
                        EXPIRY_GRACE_SECONDS
                    );
                }
                // The user submitted first; this is the designed race
                // resolution, not an error.
                Ok(false) => {}
                Err(e) => {
                    log::warn!("Failed to auto-fail attempt {}: {}", attempt.id, e);
                }
            }
        }

        if expired_count > 0 {
            log::info!("Auto-failed {} expired attempts this pass", expired_count);
        }

        expired_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minutes_ago_plus_seconds(minutes: i64, seconds: i64) -> DateTime<Utc> {
        Utc::now() - chrono::Duration::minutes(minutes) - chrono::Duration::seconds(seconds)
    }

    #[test]
    fn attempt_within_grace_is_not_expired() {
        // 10 minute limit, 10m29s elapsed: inside the 30s grace window.
        let started_at = minutes_ago_plus_seconds(10, 29);
        assert!(!is_expired(started_at, 10, Utc::now()));
    }

    #[test]
    fn attempt_past_grace_is_expired() {
        // 10 minute limit, 10m31s elapsed: one second past the grace window.
        let started_at = minutes_ago_plus_seconds(10, 31);
        assert!(is_expired(started_at, 10, Utc::now()));
    }

    #[test]
    fn exact_boundary_is_not_expired() {
        let started_at = Utc::now();
        let now = started_at
            + chrono::Duration::minutes(10)
            + chrono::Duration::seconds(EXPIRY_GRACE_SECONDS);
        assert!(!is_expired(started_at, 10, now));

        let one_past = now + chrono::Duration::seconds(1);
        assert!(is_expired(started_at, 10, one_past));
    }

    #[test]
    fn fresh_attempt_is_not_expired() {
        assert!(!is_expired(Utc::now(), 1, Utc::now()));
    }
}
