//! Recompute Coordinator — serializes recompute per user.
//!
//! A second in-flight recompute for the same user blocks behind the
//! first; recomputes for different users run concurrently, bounded by a
//! worker count so a full sweep does not overload the catalog or the
//! store. The blocking SQLite work runs off the async runtime.

use crate::computer::ExclusionComputer;
use crate::models::RecomputeSummary;
use crate::{VisibilityError, VisibilityResult};
use curio_catalog::UserDirectory;
use curio_types::UserId;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, Semaphore};
use tracing::{info, warn};

const DEFAULT_WORKERS: usize = 4;

/// Triggers single-user and all-user recomputation.
pub struct RecomputeCoordinator {
    computer: Arc<ExclusionComputer>,
    users: Arc<dyn UserDirectory>,
    locks: Mutex<HashMap<UserId, Arc<Mutex<()>>>>,
    workers: usize,
}

impl RecomputeCoordinator {
    pub fn new(computer: Arc<ExclusionComputer>, users: Arc<dyn UserDirectory>) -> Self {
        Self::with_workers(computer, users, DEFAULT_WORKERS)
    }

    pub fn with_workers(
        computer: Arc<ExclusionComputer>,
        users: Arc<dyn UserDirectory>,
        workers: usize,
    ) -> Self {
        Self {
            computer,
            users,
            locks: Mutex::new(HashMap::new()),
            workers: workers.max(1),
        }
    }

    async fn lock_for(&self, user: UserId) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks
            .entry(user)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Recomputes one user's exclusion set. Concurrent calls for the
    /// same user are serialized behind the per-user lock.
    pub async fn recompute_user(&self, user: UserId) -> VisibilityResult<()> {
        let lock = self.lock_for(user).await;
        let _guard = lock.lock().await;
        let computer = Arc::clone(&self.computer);
        tokio::task::spawn_blocking(move || computer.recompute_user(user))
            .await
            .map_err(|e| VisibilityError::Storage(format!("recompute task failed: {e}")))?
    }

    /// Recomputes every known user. Per-user failures are counted and
    /// logged, never raised; the batch always runs to completion.
    pub async fn recompute_all(&self) -> VisibilityResult<RecomputeSummary> {
        let directory = Arc::clone(&self.users);
        let user_ids = tokio::task::spawn_blocking(move || directory.all_user_ids())
            .await
            .map_err(|e| VisibilityError::Storage(format!("user enumeration failed: {e}")))?
            .map_err(VisibilityError::from)?;

        info!("recomputing exclusions for {} users", user_ids.len());
        let semaphore = Arc::new(Semaphore::new(self.workers));
        let mut handles = Vec::with_capacity(user_ids.len());
        for user in user_ids {
            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|e| VisibilityError::Storage(format!("worker pool closed: {e}")))?;
            let lock = self.lock_for(user).await;
            let computer = Arc::clone(&self.computer);
            handles.push(tokio::spawn(async move {
                let _permit = permit;
                let _guard = lock.lock().await;
                match tokio::task::spawn_blocking(move || computer.recompute_user(user)).await {
                    Ok(Ok(())) => true,
                    Ok(Err(e)) => {
                        warn!("recompute failed for user {user}: {e}");
                        false
                    }
                    Err(e) => {
                        warn!("recompute task for user {user} panicked: {e}");
                        false
                    }
                }
            }));
        }

        let mut summary = RecomputeSummary::default();
        for handle in handles {
            if handle.await.unwrap_or(false) {
                summary.success += 1;
            } else {
                summary.failed += 1;
            }
        }
        info!(
            "recompute sweep done: {} succeeded, {} failed",
            summary.success, summary.failed
        );
        Ok(summary)
    }
}
