pub mod categories;
pub mod comments;
pub mod options;
mod state;
pub mod tags;

use axum::Router;
pub use state::{AppState, Pool, PoolConnection};

pub fn create_router(pool: Pool) -> Router {
    let state = AppState::new(pool);

    Router::new()
        .merge(categories::create_router())
        .merge(comments::create_router())
        .merge(options::create_router())
        .merge(tags::create_router())
        .with_state(state)
}
