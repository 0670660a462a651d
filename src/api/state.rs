use crate::error::StoreError;
use diesel::prelude::*;
use diesel::r2d2::{self, ConnectionManager, PooledConnection};
use std::sync::Arc;
use tracing::error;

// Connection pool type
pub type Pool = r2d2::Pool<ConnectionManager<PgConnection>>;
pub type PoolConnection = PooledConnection<ConnectionManager<PgConnection>>;

// Shared state
#[derive(Clone)]
pub struct AppState {
    pub pool: Arc<Pool>,
}

impl AppState {
    pub fn new(pool: Pool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    pub fn conn(&self) -> Result<PoolConnection, StoreError> {
        self.pool.get().map_err(|err| {
            error!("Failed to get connection: {}", err);
            StoreError::from(err)
        })
    }
}
