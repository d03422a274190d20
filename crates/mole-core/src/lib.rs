//! Mole Core - Fundamental types and primitives
//!
//! This crate defines the core types shared by every Mole component:
//! - Identifiers (SessionId, PlayerId) and the identifier issuer
//! - The session data model (Session, Player, Role, Status)
//! - Wall-clock time (Timestamp, Clock)
//! - The error taxonomy

pub mod error;
pub mod id;
pub mod session;
pub mod time;

pub use error::*;
pub use id::*;
pub use session::*;
pub use time::*;
