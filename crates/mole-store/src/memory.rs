//! In-process session store

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::mpsc;

use mole_core::MoleResult;

use crate::{check_disjoint, tree, Change, SessionStore, Snapshot, StorePath, Subscription};

/// Subscriber registered on one path
struct Subscriber {
    path: StorePath,
    tx: mpsc::UnboundedSender<Snapshot>,
    /// Last value delivered, to skip notifications that change nothing
    last: Option<Value>,
}

#[derive(Default)]
struct State {
    root: Value,
    subscribers: HashMap<u64, Subscriber>,
    next_subscriber: u64,
    mutations: u64,
}

impl State {
    /// Apply changes and fan out to affected subscribers.
    /// Runs under the store lock, so every subscriber sees commit order.
    fn commit(&mut self, changes: Vec<Change>) {
        let touched: Vec<StorePath> = changes.iter().map(|c| c.path.clone()).collect();

        for change in changes {
            match change.value {
                Some(value) => tree::set(&mut self.root, &change.path, value),
                None => {
                    tree::remove(&mut self.root, &change.path);
                }
            }
        }
        self.mutations += 1;

        let root = &self.root;
        self.subscribers.retain(|id, sub| {
            if !touched.iter().any(|t| t.overlaps(&sub.path)) {
                return true;
            }
            let current = tree::get(root, &sub.path).cloned();
            if current == sub.last {
                return true;
            }
            sub.last = current.clone();
            let delivered = sub
                .tx
                .send(Snapshot {
                    path: sub.path.clone(),
                    value: current,
                })
                .is_ok();
            if !delivered {
                tracing::debug!(subscriber = id, path = %sub.path, "dropping closed subscriber");
            }
            delivered
        });
    }
}

/// Shared tree held in memory. Clones share the same tree.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    /// Copy of the whole tree
    pub fn dump(&self) -> Value {
        self.state.lock().root.clone()
    }

    /// Number of committed mutations so far
    pub fn mutation_count(&self) -> u64 {
        self.state.lock().mutations
    }

    /// Number of live subscriptions
    pub fn subscriber_count(&self) -> usize {
        self.state.lock().subscribers.len()
    }

    fn commit(&self, changes: Vec<Change>) {
        for change in &changes {
            tracing::debug!(path = %change.path, delete = change.value.is_none(), "store mutation");
        }
        self.state.lock().commit(changes);
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("MemoryStore")
            .field("mutations", &state.mutations)
            .field("subscribers", &state.subscribers.len())
            .finish()
    }
}

impl SessionStore for MemoryStore {
    async fn read(&self, path: &StorePath) -> MoleResult<Option<Value>> {
        let state = self.state.lock();
        Ok(tree::get(&state.root, path).cloned())
    }

    async fn write(&self, path: &StorePath, value: Value) -> MoleResult<()> {
        self.commit(vec![Change {
            path: path.clone(),
            value: Some(value),
        }]);
        Ok(())
    }

    async fn update(&self, changes: Vec<Change>) -> MoleResult<()> {
        check_disjoint(&changes)?;
        if changes.is_empty() {
            return Ok(());
        }
        self.commit(changes);
        Ok(())
    }

    async fn delete(&self, path: &StorePath) -> MoleResult<()> {
        self.commit(vec![Change::delete(path.clone())]);
        Ok(())
    }

    async fn list_children(&self, path: &StorePath) -> MoleResult<Vec<(String, Value)>> {
        let state = self.state.lock();
        Ok(tree::children(&state.root, path))
    }

    fn subscribe(&self, path: &StorePath) -> MoleResult<Subscription> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut state = self.state.lock();

        let current = tree::get(&state.root, path).cloned();
        // The receiver is still held here, so the send cannot fail
        let _ = tx.send(Snapshot {
            path: path.clone(),
            value: current.clone(),
        });

        let id = state.next_subscriber;
        state.next_subscriber += 1;
        state.subscribers.insert(
            id,
            Subscriber {
                path: path.clone(),
                tx,
                last: current,
            },
        );
        drop(state);
        tracing::debug!(subscriber = id, %path, "subscribed");

        let weak: Weak<Mutex<State>> = Arc::downgrade(&self.state);
        Ok(Subscription::new(path.clone(), rx, move || {
            if let Some(state) = weak.upgrade() {
                state.lock().subscribers.remove(&id);
                tracing::debug!(subscriber = id, "unsubscribed");
            }
        }))
    }
}
