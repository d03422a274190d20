//! Session lifecycle for one client
//!
//! A [`SessionManager`] is the handle a single client uses to act on shared
//! sessions. It carries the client's own player id, and every host-only
//! operation compares that id against the session's `hostId`. The check is
//! an assertion, not an authentication: any client can claim any id.
//!
//! Every operation re-reads the session before acting, so an operation on a
//! reaped session reports [`MoleError::GameNotFound`].

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::Value;

use mole_core::session::fields;
use mole_core::{
    Clock, IdIssuer, MoleError, MoleResult, Player, PlayerId, RandomIdIssuer, Role, Session,
    SessionId, Status, SystemClock,
};
use mole_store::{Change, SessionStore, StorePath};

use crate::{roles, GameConfig, SessionWatch};

/// Client-side session operations against a shared store
pub struct SessionManager<S, I = RandomIdIssuer, C = SystemClock> {
    store: Arc<S>,
    ids: I,
    clock: C,
    rng: Mutex<StdRng>,
    player_id: PlayerId,
    config: GameConfig,
}

impl<S: SessionStore> SessionManager<S> {
    /// Manager with a fresh player id, OS randomness and the system clock
    pub fn new(store: Arc<S>) -> Self {
        Self::with_config(store, GameConfig::default())
    }

    pub fn with_config(store: Arc<S>, config: GameConfig) -> Self {
        Self::with_parts(store, RandomIdIssuer, SystemClock, StdRng::from_entropy(), config)
    }
}

impl<S, I, C> SessionManager<S, I, C>
where
    S: SessionStore,
    I: IdIssuer,
    C: Clock,
{
    /// Assemble a manager from explicit collaborators. The player id is
    /// drawn from `ids` once and kept for the manager's lifetime.
    pub fn with_parts(store: Arc<S>, ids: I, clock: C, rng: StdRng, config: GameConfig) -> Self {
        let player_id = PlayerId::new(ids.new_id(config.player_id_len));
        SessionManager {
            store,
            ids,
            clock,
            rng: Mutex::new(rng),
            player_id,
            config,
        }
    }

    /// Reuse a player id persisted by an earlier run of the same client
    pub fn with_player_id(mut self, player_id: PlayerId) -> Self {
        self.player_id = player_id;
        self
    }

    /// This client's own player id
    pub fn player_id(&self) -> &PlayerId {
        &self.player_id
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Open a new waiting session hosted by this client.
    ///
    /// The host is seated in the roster straight away, so they are dealt a
    /// role like everyone else.
    pub async fn create_game(&self, display_name: &str) -> MoleResult<SessionId> {
        let name = match display_name.trim() {
            "" => self.config.default_host_name.as_str(),
            trimmed => trimmed,
        };

        let id = SessionId::new(self.ids.new_id(self.config.session_id_len));
        let mut session = Session::new(
            id.clone(),
            self.player_id.clone(),
            self.clock.now(),
            self.config.clamp_spies(self.config.default_spies),
        );
        session
            .players
            .insert(self.player_id.clone(), Player::new(name));

        self.store
            .write(&self.session_path(&id)?, session.to_value()?)
            .await?;

        tracing::info!(session = %id, host = %self.player_id, "game created");
        Ok(id)
    }

    /// Seat this client in a session, or rename them if already seated.
    ///
    /// The role is reset to unassigned whatever the session status; a
    /// mid-round join waits for the next round.
    pub async fn join_game(&self, session_id: &SessionId, display_name: &str) -> MoleResult<()> {
        let name = display_name.trim();
        if name.is_empty() {
            return Err(MoleError::InvalidName);
        }

        let path = self.session_path(session_id)?;
        let exists = self
            .store
            .read(&path)
            .await?
            .is_some_and(|value| Session::is_complete(&value));
        if !exists {
            tracing::warn!(session = %session_id, player = %self.player_id, "join of missing game");
            return Err(MoleError::GameNotFound(session_id.clone()));
        }

        self.store
            .write(&self.player_path(&path, &self.player_id)?, Player::new(name).to_value())
            .await?;

        tracing::info!(session = %session_id, player = %self.player_id, display_name = name, "player joined");
        Ok(())
    }

    /// Deal roles and start the round. Host only.
    ///
    /// Every role and the status change land in one store update, so no
    /// subscriber sees a half-dealt round.
    pub async fn start_game(&self, session_id: &SessionId) -> MoleResult<BTreeMap<PlayerId, Role>> {
        let path = self.session_path(session_id)?;
        let session = self.load(session_id, &path).await?;
        self.authorize(&session)?;

        if session.status == Status::InProgress {
            return Err(MoleError::AlreadyInProgress);
        }
        if session.location.trim().is_empty() {
            return Err(MoleError::MissingLocation);
        }
        if session.players.is_empty() {
            return Err(MoleError::EmptyRoster);
        }

        let deal = {
            let mut rng = self.rng.lock();
            roles::assign(&session.player_ids(), session.spy_count, &mut *rng)
        };

        let mut changes = Vec::with_capacity(deal.len() + 1);
        for (player, role) in &deal {
            changes.push(Change::set(self.role_path(&path, player)?, role.as_str()));
        }
        changes.push(Change::set(path.child(fields::STATUS)?, Status::InProgress.as_str()));
        self.store.update(changes).await?;

        tracing::info!(
            session = %session_id,
            players = deal.len(),
            spies = deal.values().filter(|r| **r == Role::Spy).count(),
            "round started"
        );
        Ok(deal)
    }

    /// Clear roles and location and return to waiting. Host only.
    pub async fn new_round(&self, session_id: &SessionId) -> MoleResult<()> {
        let path = self.session_path(session_id)?;
        let session = self.load(session_id, &path).await?;
        self.authorize(&session)?;

        let mut changes = Vec::with_capacity(session.players.len() + 2);
        changes.push(Change::set(path.child(fields::STATUS)?, Status::Waiting.as_str()));
        changes.push(Change::set(path.child(fields::LOCATION)?, ""));
        for player in session.players.keys() {
            changes.push(Change::set(self.role_path(&path, player)?, Role::Unassigned.as_str()));
        }
        self.store.update(changes).await?;

        tracing::info!(session = %session_id, "new round");
        Ok(())
    }

    /// Remove a player from the roster. Host only.
    ///
    /// Other roles and the status are untouched; kicking mid-round does not
    /// redeal. Kicking someone who is not seated is a no-op.
    pub async fn kick_player(&self, session_id: &SessionId, target: &PlayerId) -> MoleResult<()> {
        let path = self.session_path(session_id)?;
        let session = self.load(session_id, &path).await?;
        self.authorize(&session)?;

        if *target == self.player_id {
            return Err(MoleError::CannotKickSelf);
        }
        if session.player(target).is_none() {
            tracing::debug!(session = %session_id, player = %target, "kick of absent player");
            return Ok(());
        }

        self.store.delete(&self.player_path(&path, target)?).await?;

        tracing::info!(session = %session_id, player = %target, "player kicked");
        Ok(())
    }

    /// Set the location for the coming round. Host only.
    pub async fn set_location(&self, session_id: &SessionId, location: &str) -> MoleResult<()> {
        let path = self.session_path(session_id)?;
        let session = self.load(session_id, &path).await?;
        self.authorize(&session)?;

        self.store
            .write(&path.child(fields::LOCATION)?, Value::from(location.trim()))
            .await?;
        tracing::debug!(session = %session_id, "location set");
        Ok(())
    }

    /// Set the number of spies for the coming round, clamped into the
    /// configured range. Host only, and only between rounds.
    /// Returns the value written.
    pub async fn set_spy_count(&self, session_id: &SessionId, requested: u32) -> MoleResult<u32> {
        let path = self.session_path(session_id)?;
        let session = self.load(session_id, &path).await?;
        self.authorize(&session)?;

        if session.status == Status::InProgress {
            return Err(MoleError::AlreadyInProgress);
        }

        let spy_count = self.config.clamp_spies(requested);
        self.store
            .write(&path.child(fields::SPY_COUNT)?, Value::from(spy_count))
            .await?;
        tracing::debug!(session = %session_id, requested, spy_count, "spy count set");
        Ok(spy_count)
    }

    /// Point-in-time read of a session
    pub async fn fetch_session(&self, session_id: &SessionId) -> MoleResult<Session> {
        let path = self.session_path(session_id)?;
        self.load(session_id, &path).await
    }

    /// Follow a session, projected for this client
    pub fn watch(&self, session_id: &SessionId) -> MoleResult<SessionWatch> {
        let path = self.session_path(session_id)?;
        let subscription = self.store.subscribe(&path)?;
        Ok(SessionWatch::new(
            session_id.clone(),
            self.player_id.clone(),
            self.config.clone(),
            subscription,
        ))
    }

    /// Read the session, treating a remnant left by a racing delete as gone
    async fn load(&self, session_id: &SessionId, path: &StorePath) -> MoleResult<Session> {
        match self.store.read(path).await? {
            Some(value) if Session::is_complete(&value) => {
                Session::from_value(session_id.clone(), value)
            }
            Some(_) => {
                tracing::warn!(session = %session_id, "ignoring remnant of a deleted game");
                Err(MoleError::GameNotFound(session_id.clone()))
            }
            None => Err(MoleError::GameNotFound(session_id.clone())),
        }
    }

    fn authorize(&self, session: &Session) -> MoleResult<()> {
        if session.is_host(&self.player_id) {
            return Ok(());
        }
        tracing::warn!(session = %session.id, player = %self.player_id, "host-only operation refused");
        Err(MoleError::PermissionDenied {
            player: self.player_id.clone(),
            session: session.id.clone(),
        })
    }

    /// A session id that is not a valid key cannot name an existing session
    fn session_path(&self, session_id: &SessionId) -> MoleResult<StorePath> {
        StorePath::parse(&self.config.collection)?
            .child(session_id.as_str())
            .map_err(|_| MoleError::GameNotFound(session_id.clone()))
    }

    fn player_path(&self, session_path: &StorePath, player: &PlayerId) -> MoleResult<StorePath> {
        session_path.child(fields::PLAYERS)?.child(player.as_str())
    }

    fn role_path(&self, session_path: &StorePath, player: &PlayerId) -> MoleResult<StorePath> {
        self.player_path(session_path, player)?.child(fields::ROLE)
    }
}
