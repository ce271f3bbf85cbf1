//! Axum routes and middleware for the portón authentication core.
//!
//! The router exposes the authentication boundary of the record-keeping
//! application: login, token refresh, logout (single and everywhere), the
//! authenticated-caller probe, the admin audit listing, and a health check.
//! Authentication is bearer-token only; routes behind [`require_auth`] see
//! the resolved [`porton_core::Identity`] as a request extension.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use porton::{Porton, PortonConfig, SqliteRepositoryProvider};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let repositories = Arc::new(SqliteRepositoryProvider::connect("sqlite:porton.db").await?);
//!     let porton = Arc::new(Porton::new(
//!         repositories,
//!         PortonConfig::new(std::env::var("PORTON_SECRET")?.into_bytes())?,
//!     ));
//!     porton.migrate().await?;
//!
//!     let app = porton_axum::create_router(porton);
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```

mod error;
mod extractors;
mod middleware;
mod routes;
mod types;

pub use error::{ApiError, Result};
pub use extractors::AuthUser;
pub use middleware::{AuthState, require_auth};
pub use routes::create_router;
pub use types::{
    AccessResponse, ConnectionInfo, HealthResponse, LoginRequest, LogoutAllResponse,
    LogoutRequest, LogsQuery, LogsResponse, MessageResponse, RefreshRequest, SessionResponse,
    UserResponse,
};
