//! Session data model
//!
//! A [`Session`] is one round-table as it is laid out in the shared store:
//!
//! ```text
//! <collection>/<sessionId>/
//!     createdAt, location, status, hostId, spyCount,
//!     players/<playerId>/{ name, role }
//! ```
//!
//! The session identifier is the key of the subtree, not a field inside it.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{MoleError, MoleResult, PlayerId, SessionId, Timestamp};

/// Field names inside a session subtree
pub mod fields {
    pub const CREATED_AT: &str = "createdAt";
    pub const LOCATION: &str = "location";
    pub const STATUS: &str = "status";
    pub const HOST_ID: &str = "hostId";
    pub const SPY_COUNT: &str = "spyCount";
    pub const PLAYERS: &str = "players";
    pub const NAME: &str = "name";
    pub const ROLE: &str = "role";
}

/// Role held by a player for the current round
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    #[default]
    Unassigned,
    Spy,
    Player,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Unassigned => "unassigned",
            Role::Spy => "spy",
            Role::Player => "player",
        }
    }

    #[inline]
    pub fn is_assigned(self) -> bool {
        self != Role::Unassigned
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Session status
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    #[default]
    Waiting,
    InProgress,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Waiting => "waiting",
            Status::InProgress => "in-progress",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One participant; the player id is the key in [`Session::players`]
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Player {
    /// A role write that lands after a kick recreates the entry without a name
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub role: Role,
}

impl Player {
    pub fn new(name: impl Into<String>) -> Self {
        Player {
            name: name.into(),
            role: Role::Unassigned,
        }
    }

    pub fn to_value(&self) -> Value {
        serde_json::json!({
            "name": self.name,
            "role": self.role,
        })
    }
}

/// One active round-table
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    #[serde(skip)]
    pub id: SessionId,
    pub created_at: Timestamp,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub status: Status,
    pub host_id: PlayerId,
    #[serde(default = "default_spy_count")]
    pub spy_count: u32,
    /// The store prunes empty objects, so an empty roster has no key at all
    #[serde(default)]
    pub players: BTreeMap<PlayerId, Player>,
}

fn default_spy_count() -> u32 {
    1
}

impl Session {
    /// Fresh waiting session with an empty roster
    pub fn new(id: SessionId, host_id: PlayerId, created_at: Timestamp, spy_count: u32) -> Self {
        Session {
            id,
            created_at,
            location: String::new(),
            status: Status::Waiting,
            host_id,
            spy_count,
            players: BTreeMap::new(),
        }
    }

    /// Whether a raw subtree carries the fields only `create_game` writes.
    ///
    /// A write racing a delete of the session recreates the subtree without
    /// them; such a remnant is not a session.
    pub fn is_complete(value: &Value) -> bool {
        value.get(fields::CREATED_AT).is_some_and(Value::is_i64)
            && value.get(fields::HOST_ID).is_some_and(Value::is_string)
    }

    /// Decode a raw session subtree
    pub fn from_value(id: SessionId, value: Value) -> MoleResult<Self> {
        let mut session: Session =
            serde_json::from_value(value).map_err(|e| MoleError::corrupt(id.as_str(), e))?;
        session.id = id;
        Ok(session)
    }

    /// Encode as a raw session subtree
    pub fn to_value(&self) -> MoleResult<Value> {
        serde_json::to_value(self).map_err(|e| MoleError::corrupt(self.id.as_str(), e))
    }

    #[inline]
    pub fn is_host(&self, player: &PlayerId) -> bool {
        self.host_id == *player
    }

    pub fn player(&self, id: &PlayerId) -> Option<&Player> {
        self.players.get(id)
    }

    pub fn player_ids(&self) -> Vec<PlayerId> {
        self.players.keys().cloned().collect()
    }

    /// Number of players currently holding the given role
    pub fn count_role(&self, role: Role) -> usize {
        self.players.values().filter(|p| p.role == role).count()
    }

    /// Whether roles agree with the status: all assigned while in progress,
    /// none assigned while waiting
    pub fn roles_match_status(&self) -> bool {
        match self.status {
            Status::Waiting => self.players.values().all(|p| !p.role.is_assigned()),
            Status::InProgress => self.players.values().all(|p| p.role.is_assigned()),
        }
    }
}
