//! Stale session reaper
//!
//! The TTL is anchored on `createdAt` alone. A round still being played
//! past the cutoff is deleted exactly like an abandoned lobby. A subtree
//! without `createdAt` or `hostId` was recreated by a write racing an earlier
//! delete; it is removed on the first sweep that sees it.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use mole_core::session::fields;
use mole_core::{Clock, MoleResult, Session, SessionId, SystemClock, Timestamp};
use mole_store::{SessionStore, StorePath};

use crate::ReaperConfig;

/// Outcome of one sweep
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub scanned: usize,
    /// Stale sessions and remnants removed, in key order
    pub deleted: Vec<SessionId>,
    /// Deleted entries that were remnants without `createdAt` or `hostId`
    pub remnants: usize,
    /// Deletes the store refused; retried on the next sweep
    pub failed: usize,
}

/// Periodic TTL sweep over the session collection
pub struct StaleSessionReaper<S, C = SystemClock> {
    store: Arc<S>,
    clock: C,
    config: ReaperConfig,
}

impl<S: SessionStore> StaleSessionReaper<S> {
    pub fn new(store: Arc<S>, config: ReaperConfig) -> Self {
        Self::with_clock(store, SystemClock, config)
    }
}

impl<S, C> StaleSessionReaper<S, C>
where
    S: SessionStore,
    C: Clock,
{
    pub fn with_clock(store: Arc<S>, clock: C, config: ReaperConfig) -> Self {
        StaleSessionReaper {
            store,
            clock,
            config,
        }
    }

    pub fn config(&self) -> &ReaperConfig {
        &self.config
    }

    /// Sessions created before this instant are stale
    pub fn cutoff(&self) -> Timestamp {
        self.clock.now() - self.config.ttl
    }

    /// Delete every session created before the cutoff, whatever its status,
    /// along with remnants that no longer form a session.
    ///
    /// Only a failed listing aborts the sweep; a failed delete is logged and
    /// the remaining entries are still visited.
    pub async fn sweep(&self) -> MoleResult<SweepReport> {
        let collection = StorePath::parse(&self.config.collection)?;
        let cutoff = self.cutoff();
        let mut report = SweepReport::default();

        for (key, value) in self.store.list_children(&collection).await? {
            report.scanned += 1;

            let created_at = match created_at(&value) {
                Some(created_at) if Session::is_complete(&value) => Some(created_at),
                _ => None,
            };
            if created_at.is_some_and(|created_at| created_at >= cutoff) {
                continue;
            }

            if let Err(err) = self.delete(&collection, &key).await {
                tracing::warn!(session = %key, error = %err, "failed to reap session");
                report.failed += 1;
                continue;
            }

            match created_at {
                Some(created_at) => tracing::info!(
                    session = %key,
                    created_at = created_at.as_millis(),
                    cutoff = cutoff.as_millis(),
                    "reaped stale session"
                ),
                None => {
                    tracing::info!(session = %key, "reaped session remnant");
                    report.remnants += 1;
                }
            }
            report.deleted.push(SessionId::new(key));
        }

        Ok(report)
    }

    async fn delete(&self, collection: &StorePath, key: &str) -> MoleResult<()> {
        self.store.delete(&collection.child(key)?).await
    }

    /// Sweep every `interval` until `shutdown` flips to true or its sender
    /// is dropped. The first sweep runs immediately. A failed sweep is
    /// logged and retried on the next tick.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let period = self.config.interval.max(Duration::from_millis(1));
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(interval = ?self.config.interval, ttl = ?self.config.ttl, "reaper started");
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.sweep().await {
                        Ok(report) => tracing::info!(
                            scanned = report.scanned,
                            deleted = report.deleted.len(),
                            remnants = report.remnants,
                            failed = report.failed,
                            "sweep finished"
                        ),
                        Err(err) => tracing::warn!(error = %err, "sweep failed"),
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        tracing::info!("reaper stopped");
    }
}

impl<S, C> StaleSessionReaper<S, C>
where
    S: SessionStore + 'static,
    C: Clock + 'static,
{
    /// Run on a background task
    pub fn spawn(self) -> ReaperHandle {
        let (tx, rx) = watch::channel(false);
        ReaperHandle {
            shutdown: tx,
            task: tokio::spawn(self.run(rx)),
        }
    }
}

/// Handle to a reaper running on a background task
pub struct ReaperHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl ReaperHandle {
    /// Signal the reaper and wait for it to stop
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(err) = self.task.await {
            tracing::warn!(error = %err, "reaper task ended abnormally");
        }
    }
}

fn created_at(session: &Value) -> Option<Timestamp> {
    session
        .get(fields::CREATED_AT)
        .and_then(Value::as_i64)
        .map(Timestamp::from_millis)
}
