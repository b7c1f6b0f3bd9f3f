//! Presence heartbeat
//!
//! A background task that periodically marks the current user active and
//! stamps `last_active` on their profile row. Presence is best-effort: a
//! failed write is logged and the next tick simply tries again, so the
//! heartbeat can never fail the caller. No "going offline" signal exists;
//! readers infer staleness from `last_active` age (see
//! [`crate::store::Profile::is_online_at`]).

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::store::Backend;

/// Default interval between presence writes
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(60);

/// Background task keeping one user's presence fresh
///
/// Several views may each run their own heartbeat for the same user; the
/// writes are commutative, so no coordination is needed. The task is
/// cancelled by [`stop`](Self::stop) or by dropping the handle, so a view
/// teardown cannot leak the timer.
pub struct PresenceHeartbeat {
    user_id: String,
    task: JoinHandle<()>,
}

impl PresenceHeartbeat {
    /// Start a heartbeat at the default 60-second interval.
    ///
    /// The first beat fires immediately, covering the "on mount" write.
    pub fn start(backend: Arc<dyn Backend>, user_id: impl Into<String>) -> Self {
        Self::start_with_interval(backend, user_id, HEARTBEAT_INTERVAL)
    }

    /// Start a heartbeat with a custom interval
    pub fn start_with_interval(
        backend: Arc<dyn Backend>,
        user_id: impl Into<String>,
        interval: Duration,
    ) -> Self {
        let user_id = user_id.into();
        let id = user_id.clone();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                match backend.touch_presence(&id, Utc::now()) {
                    Ok(()) => debug!("Presence heartbeat written for {}", id),
                    Err(e) => warn!("Presence heartbeat for {} failed: {}", id, e),
                }
            }
        });

        Self { user_id, task }
    }

    /// The user this heartbeat reports for
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Whether the background task is still alive
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Stop the heartbeat.
    ///
    /// The profile keeps its last `is_active`/`last_active` values;
    /// readers age them out via the freshness window.
    pub fn stop(self) {
        self.task.abort();
    }
}

impl Drop for PresenceHeartbeat {
    fn drop(&mut self) {
        // Cancel the timer on drop so no detached task keeps writing
        self.task.abort();
    }
}
