//! MultiversX x402 facilitator server.
//!
//! Relays payer-signed transactions under a per-sender quota and verifies
//! payments by simulation, behind Axum route handlers.
//!
//! # Modules
//!
//! - [`config`] - Server configuration with environment variable expansion
//! - [`error`] - HTTP error responses
//! - [`handlers`] - Axum route handlers and router builder
//! - [`probe`] - Startup gateway check
//! - [`util`] - Graceful shutdown signal handling

pub mod config;
pub mod error;
pub mod handlers;
pub mod probe;
pub mod util;

pub use handlers::{Facilitator, FacilitatorState, facilitator_router};
