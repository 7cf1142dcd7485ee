//! API Module
//!
//! HTTP handlers and routing for inspecting a shared cache.
//!
//! # Endpoints
//! - `PUT /cache`, `DELETE /cache` - Write a value, clear everything
//! - `GET /cache/:key`, `DELETE /cache/:key` - Read or invalidate a key
//! - `GET /keys` - List cached keys
//! - `GET /events/:key` - Server-sent change events
//! - `POST /signals/focus`, `POST /signals/online` - Environment signals
//! - `GET /stats` - Cache statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
