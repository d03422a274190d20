//! Mole Game - the session synchronization and role-assignment engine
//!
//! Every client runs its own [`SessionManager`] against the shared store:
//! 1. Translate a client action into path-scoped store mutations
//! 2. Let the store fan the session subtree out to every subscriber
//! 3. Re-derive each client's [`RosterView`] from the snapshot
//!
//! Roles are dealt by [`roles::assign`] inside `start_game` only. The
//! [`StaleSessionReaper`] runs on its own timer, outside any client.

pub mod config;
pub mod manager;
pub mod reaper;
pub mod roles;
pub mod roster;
pub mod watch;

pub use config::*;
pub use manager::*;
pub use reaper::*;
pub use roster::*;
pub use watch::*;
