//! HTTP and server-sent-events transport for the Postbox messaging core

pub mod auth;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod server;
pub mod state;
pub mod types;

pub use error::{ApiError, ApiResult};
pub use routes::api::build_router;
pub use server::ApiServer;
pub use state::AppState;
