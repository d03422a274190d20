//! Mole Test Harness
//!
//! Tools for exercising the engine the way a real table does:
//! - `Table`: several clients sharing one store and one manual clock
//! - `FlakyStore`: a store wrapper that fails on demand
//! - End-to-end scenarios over both

pub mod flaky;
pub mod table;

#[cfg(test)]
mod scenarios;

pub use flaky::*;
pub use table::*;
