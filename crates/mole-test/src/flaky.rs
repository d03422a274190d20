//! Fault-injecting store wrapper

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;

use mole_core::{MoleError, MoleResult};
use mole_store::{Change, SessionStore, StorePath, Subscription};

/// Wraps a store and turns reads or mutations into transport failures
/// while the matching switch is on. It can also slip a delete in front of
/// the next mutation, the way another client racing this one would.
pub struct FlakyStore<S> {
    inner: Arc<S>,
    fail_reads: AtomicBool,
    fail_mutations: AtomicBool,
    injected: AtomicU64,
    delete_before_mutation: Mutex<Option<StorePath>>,
}

impl<S: SessionStore> FlakyStore<S> {
    pub fn new(inner: Arc<S>) -> Self {
        FlakyStore {
            inner,
            fail_reads: AtomicBool::new(false),
            fail_mutations: AtomicBool::new(false),
            injected: AtomicU64::new(0),
            delete_before_mutation: Mutex::new(None),
        }
    }

    pub fn inner(&self) -> &Arc<S> {
        &self.inner
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_mutations(&self, fail: bool) {
        self.fail_mutations.store(fail, Ordering::SeqCst);
    }

    /// Number of failures handed out so far
    pub fn injected_failures(&self) -> u64 {
        self.injected.load(Ordering::SeqCst)
    }

    /// Delete `path` on the inner store just before the next mutation
    /// reaches it. Fires once.
    pub fn delete_before_next_mutation(&self, path: StorePath) {
        *self.delete_before_mutation.lock() = Some(path);
    }

    async fn interleave(&self) -> MoleResult<()> {
        let armed = self.delete_before_mutation.lock().take();
        if let Some(path) = armed {
            tracing::debug!(%path, "interleaving delete");
            self.inner.delete(&path).await?;
        }
        Ok(())
    }

    fn check(&self, switch: &AtomicBool, op: &str) -> MoleResult<()> {
        if !switch.load(Ordering::SeqCst) {
            return Ok(());
        }
        self.injected.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(op, "injecting store failure");
        Err(MoleError::StoreUnavailable(format!("{op}: connection lost")))
    }
}

impl<S: SessionStore> SessionStore for FlakyStore<S> {
    async fn read(&self, path: &StorePath) -> MoleResult<Option<Value>> {
        self.check(&self.fail_reads, "read")?;
        self.inner.read(path).await
    }

    async fn write(&self, path: &StorePath, value: Value) -> MoleResult<()> {
        self.check(&self.fail_mutations, "write")?;
        self.interleave().await?;
        self.inner.write(path, value).await
    }

    async fn update(&self, changes: Vec<Change>) -> MoleResult<()> {
        self.check(&self.fail_mutations, "update")?;
        self.interleave().await?;
        self.inner.update(changes).await
    }

    async fn delete(&self, path: &StorePath) -> MoleResult<()> {
        self.check(&self.fail_mutations, "delete")?;
        self.interleave().await?;
        self.inner.delete(path).await
    }

    async fn list_children(&self, path: &StorePath) -> MoleResult<Vec<(String, Value)>> {
        self.check(&self.fail_reads, "list")?;
        self.inner.list_children(path).await
    }

    fn subscribe(&self, path: &StorePath) -> MoleResult<Subscription> {
        self.check(&self.fail_reads, "subscribe")?;
        self.inner.subscribe(path)
    }
}
