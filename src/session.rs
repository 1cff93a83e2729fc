//! Session routing
//!
//! Serializes turns per session, runs the dialog engine and carries out the
//! effects it returns against the session store and completion sink.

mod router;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use router::{RouterError, SessionRouter, SessionStatus, TurnEffect, TurnReply};
pub use traits::*;

/// Router wired to the SQLite database
pub type ProductionRouter = SessionRouter<DatabaseStorage, DatabaseStorage>;
