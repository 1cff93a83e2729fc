//! HTTP API for the intake service
//!
//! A thin JSON surface over the session router. All dialog behaviour lives
//! in the engine; handlers only translate requests and errors.

mod handlers;
mod types;

pub use handlers::create_router;
#[allow(unused_imports)] // Public API re-exports
pub use types::*;

use crate::db::Database;
use crate::dialog::Registry;
use crate::session::{DatabaseStorage, ProductionRouter, SessionRouter};
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub router: Arc<ProductionRouter>,
    pub db: Database,
}

impl AppState {
    pub fn new(db: Database, registry: Registry) -> Self {
        let storage = DatabaseStorage::new(db.clone());
        Self {
            router: Arc::new(SessionRouter::new(
                Arc::new(registry),
                storage.clone(),
                storage,
            )),
            db,
        }
    }
}
