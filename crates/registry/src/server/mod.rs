//! Axum HTTP server, routing, and middleware.
//!
//! # Responsibilities
//! - Define the Axum router with all routes and shared middleware.
//! - Inject shared application state (`AppState`) into handlers.
//! - Keep blocking store and crypto work off the async workers.

pub mod handlers;
pub mod router;
pub mod state;
