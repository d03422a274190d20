//! Mole Store - the shared, subscribable session tree
//!
//! This crate implements the store boundary every client talks to:
//! - Hierarchical paths
//! - JSON tree reads, writes and pruning
//! - Multi-path atomic updates
//! - Snapshot subscriptions with per-subscriber ordering
//!
//! [`SessionStore`] is the injected capability; [`MemoryStore`] is the
//! in-process implementation used by tests, simulations and the demo.

pub mod memory;
pub mod path;
pub mod store;
pub mod tree;

pub use memory::*;
pub use path::*;
pub use store::*;
