//! Client-visible projection of a session
//!
//! The store hands the full session subtree to every subscriber, spies
//! included. [`RosterView::project`] is where the location is withheld from
//! those who must not see it. That boundary only holds for a cooperative
//! client: anyone reading the raw snapshot sees everything.

use mole_core::{PlayerId, Role, Session, SessionId, Status};

use crate::GameConfig;

/// One line of the roster
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RosterEntry {
    pub player_id: PlayerId,
    pub name: String,
    pub is_self: bool,
    pub is_host: bool,
}

/// The viewer's own role as they should see it
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RoleView {
    /// Viewer has no entry in the roster
    NotJoined,
    /// Entry present but no role yet: joined mid-round, or roles still landing
    Pending,
    Spy,
    Player,
}

impl From<Role> for RoleView {
    fn from(role: Role) -> Self {
        match role {
            Role::Unassigned => RoleView::Pending,
            Role::Spy => RoleView::Spy,
            Role::Player => RoleView::Player,
        }
    }
}

/// What one client is allowed to see of a session
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RosterView {
    pub session_id: SessionId,
    pub status: Status,
    /// Ordered by name, then id
    pub players: Vec<RosterEntry>,
    pub role: RoleView,
    /// `None` when unset or hidden from this viewer
    pub location: Option<String>,
    pub is_host: bool,
    pub spy_count: u32,
    /// Whether the host should be offered the spy-count selector
    pub spy_count_adjustable: bool,
}

impl RosterView {
    /// Derive the view of `session` for `viewer`. Pure: same input, same view.
    pub fn project(session: &Session, viewer: &PlayerId, config: &GameConfig) -> Self {
        let is_host = session.is_host(viewer);
        let role = session
            .player(viewer)
            .map_or(RoleView::NotJoined, |p| RoleView::from(p.role));

        let mut players: Vec<RosterEntry> = session
            .players
            .iter()
            .map(|(id, p)| RosterEntry {
                player_id: id.clone(),
                name: p.name.clone(),
                is_self: id == viewer,
                is_host: session.is_host(id),
            })
            .collect();
        players.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.player_id.cmp(&b.player_id)));

        let location_visible = match session.status {
            // Only the host sees the draft before the round starts
            Status::Waiting => is_host,
            Status::InProgress => match role {
                RoleView::Player => true,
                RoleView::NotJoined => is_host,
                RoleView::Spy | RoleView::Pending => false,
            },
        };
        let location = (location_visible && !session.location.is_empty())
            .then(|| session.location.clone());

        RosterView {
            session_id: session.id.clone(),
            status: session.status,
            spy_count_adjustable: is_host
                && session.status == Status::Waiting
                && players.len() >= config.spy_count_unlock_players,
            players,
            role,
            location,
            is_host,
            spy_count: session.spy_count,
        }
    }

    /// Round started but the viewer's role has not arrived
    pub fn is_assigning_roles(&self) -> bool {
        self.status == Status::InProgress && self.role == RoleView::Pending
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }
}
