//! Phone Sentry HTTP API
//! Async investigations, synchronous module runs, stats and cache inspection

pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod types;

pub use handlers::AppState;
pub use middleware::{ApiKeyValidator, CallerId, PrefixKeyValidator};
pub use routes::create_router;
pub use types::*;
