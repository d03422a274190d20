//! The store capability consumed by the session engine

use std::future::Future;

use serde_json::Value;
use tokio::sync::mpsc;

use mole_core::{MoleError, MoleResult};

use crate::StorePath;

/// One path-scoped mutation inside an aggregate update
#[derive(Clone, Debug, PartialEq)]
pub struct Change {
    pub path: StorePath,
    /// `None` deletes the path
    pub value: Option<Value>,
}

impl Change {
    pub fn set(path: StorePath, value: impl Into<Value>) -> Self {
        Change {
            path,
            value: Some(value.into()),
        }
    }

    pub fn delete(path: StorePath) -> Self {
        Change { path, value: None }
    }
}

/// Reject updates where one change would clobber another
pub fn check_disjoint(changes: &[Change]) -> MoleResult<()> {
    for (i, a) in changes.iter().enumerate() {
        for b in &changes[i + 1..] {
            if a.path.overlaps(&b.path) {
                return Err(MoleError::OverlappingPaths {
                    first: a.path.to_string(),
                    second: b.path.to_string(),
                });
            }
        }
    }
    Ok(())
}

/// Value of a subscribed path after a change. `None` means absent.
#[derive(Clone, Debug, PartialEq)]
pub struct Snapshot {
    pub path: StorePath,
    pub value: Option<Value>,
}

/// Live subscription to one path.
///
/// Snapshots arrive in the order the store committed them. Dropping the
/// subscription unsubscribes.
pub struct Subscription {
    path: StorePath,
    rx: mpsc::UnboundedReceiver<Snapshot>,
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(
        path: StorePath,
        rx: mpsc::UnboundedReceiver<Snapshot>,
        cancel: impl FnOnce() + Send + 'static,
    ) -> Self {
        Subscription {
            path,
            rx,
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn path(&self) -> &StorePath {
        &self.path
    }

    /// Wait for the next snapshot. `None` once the store has gone away.
    pub async fn recv(&mut self) -> Option<Snapshot> {
        self.rx.recv().await
    }

    /// Next snapshot if one is already queued
    pub fn try_recv(&mut self) -> Option<Snapshot> {
        self.rx.try_recv().ok()
    }

    fn cancel_now(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
        self.rx.close();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel_now();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("path", &self.path)
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

/// Durable, subscribable key-value tree shared by every client.
///
/// Each method is one store mutation or read; `update` is the only way to
/// change several paths atomically. Transport failures surface as
/// [`MoleError::StoreUnavailable`] and are never retried here.
pub trait SessionStore: Send + Sync {
    /// Point-in-time fetch
    fn read(&self, path: &StorePath) -> impl Future<Output = MoleResult<Option<Value>>> + Send;

    /// Upsert the value at a path. Writing `null` removes it.
    fn write(&self, path: &StorePath, value: Value) -> impl Future<Output = MoleResult<()>> + Send;

    /// Apply several disjoint changes as one mutation
    fn update(&self, changes: Vec<Change>) -> impl Future<Output = MoleResult<()>> + Send;

    fn delete(&self, path: &StorePath) -> impl Future<Output = MoleResult<()>> + Send;

    /// Direct children of a collection, in key order
    fn list_children(
        &self,
        path: &StorePath,
    ) -> impl Future<Output = MoleResult<Vec<(String, Value)>>> + Send;

    /// Deliver the current value immediately, then every change
    fn subscribe(&self, path: &StorePath) -> MoleResult<Subscription>;
}
