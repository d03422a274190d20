//! Multi-client table harness
//!
//! Every client gets its own seeded identifier issuer and role generator, so
//! a table built from the same seed replays the same ids and deals.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;

use mole_core::{ManualClock, MoleResult, SeededIdIssuer, SessionId, Timestamp};
use mole_game::{GameConfig, ReaperConfig, SessionManager, StaleSessionReaper};
use mole_store::{MemoryStore, SessionStore};

/// A client as the harness builds it
pub type Client<S> = SessionManager<S, SeededIdIssuer, Arc<ManualClock>>;

/// Wall-clock start of every table
pub const TABLE_EPOCH: Timestamp = Timestamp(1_700_000_000_000);

/// A seated session: the host, the guests, and the session they share
pub struct Seating<S> {
    pub session_id: SessionId,
    pub host: Client<S>,
    pub guests: Vec<Client<S>>,
}

impl<S: SessionStore> Seating<S> {
    /// Host first, then guests in joining order
    pub fn everyone(&self) -> impl Iterator<Item = &Client<S>> {
        std::iter::once(&self.host).chain(&self.guests)
    }
}

/// Several clients sharing one store and one clock
pub struct Table<S = MemoryStore> {
    store: Arc<S>,
    clock: Arc<ManualClock>,
    config: GameConfig,
    seed: u64,
    clients: u64,
}

impl Table<MemoryStore> {
    pub fn new(seed: u64) -> Self {
        Self::with_store(Arc::new(MemoryStore::new()), seed)
    }
}

impl<S: SessionStore> Table<S> {
    pub fn with_store(store: Arc<S>, seed: u64) -> Self {
        Table {
            store,
            clock: Arc::new(ManualClock::new(TABLE_EPOCH)),
            config: GameConfig::default(),
            seed,
            clients: 0,
        }
    }

    pub fn with_config(mut self, config: GameConfig) -> Self {
        self.config = config;
        self
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn clock(&self) -> &Arc<ManualClock> {
        &self.clock
    }

    /// A new client with its own player id
    pub fn client(&mut self) -> Client<S> {
        self.clients += 1;
        let seed = self.seed.wrapping_mul(1_000).wrapping_add(self.clients);
        SessionManager::with_parts(
            Arc::clone(&self.store),
            SeededIdIssuer::new(seed),
            Arc::clone(&self.clock),
            StdRng::seed_from_u64(seed),
            self.config.clone(),
        )
    }

    /// Create a session and have `guests` more clients join it
    pub async fn seat(&mut self, guests: usize) -> MoleResult<Seating<S>> {
        let host = self.client();
        let session_id = host.create_game("Host").await?;

        let mut seated = Vec::with_capacity(guests);
        for i in 0..guests {
            let guest = self.client();
            guest.join_game(&session_id, &format!("Guest {}", i + 1)).await?;
            seated.push(guest);
        }

        Ok(Seating {
            session_id,
            host,
            guests: seated,
        })
    }

    /// Reaper over this table's store, driven by the table clock
    pub fn reaper(&self) -> StaleSessionReaper<S, Arc<ManualClock>> {
        StaleSessionReaper::with_clock(
            Arc::clone(&self.store),
            Arc::clone(&self.clock),
            ReaperConfig {
                collection: self.config.collection.clone(),
                ..ReaperConfig::default()
            },
        )
    }
}
