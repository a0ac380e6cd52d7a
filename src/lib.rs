pub mod api;
pub mod config;
pub mod db;
pub mod engine;

pub use db::DbPool;

use std::sync::Arc;

use crate::api::identity::IdentityResolver;
use crate::config::Config;
use crate::engine::availability::BookingLocks;

pub struct AppState {
    pub config: Config,
    pub db: DbPool,
    pub identity: IdentityResolver,
    pub booking_locks: Arc<BookingLocks>,
}

impl AppState {
    pub fn new(config: Config, db: DbPool) -> Self {
        let identity = IdentityResolver::new(config.auth.clone());
        Self {
            config,
            db,
            identity,
            booking_locks: Arc::new(BookingLocks::new()),
        }
    }
}
