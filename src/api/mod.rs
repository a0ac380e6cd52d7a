pub mod auth;
mod bookings;
mod error;
pub mod identity;
mod items;
mod messages;
mod validation;

pub use error::{ApiError, ErrorCode};
pub use identity::IdentityResolver;

use axum::{
    extract::State,
    routing::{get, patch, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let auth_routes = Router::new()
        .route("/signup", post(auth::signup))
        .route("/login", post(auth::login))
        .route("/demo", get(auth::demo_user))
        .route("/me", get(auth::me));

    let api_routes = Router::new()
        // Items
        .route("/items", get(items::list_items))
        .route("/items", post(items::create_item))
        .route("/items/:id", get(items::get_item))
        .route("/items/:id", put(items::update_item))
        // Bookings
        .route("/bookings", get(bookings::list_bookings))
        .route("/bookings", post(bookings::create_booking))
        .route("/bookings/:id", patch(bookings::update_booking))
        // Messages
        .route("/messages", get(messages::get_messages))
        .route("/messages", post(messages::send_message))
        .route("/messages/read", patch(messages::mark_messages_read));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/auth", auth_routes)
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Liveness probe; reports 503 when the pool cannot reach the database.
async fn health_check(State(state): State<Arc<AppState>>) -> Result<&'static str, ApiError> {
    sqlx::query("SELECT 1").execute(&state.db).await?;
    Ok("OK")
}
