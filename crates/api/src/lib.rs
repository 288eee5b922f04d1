//! Try-on API server library.
//!
//! Exposes the core building blocks (config, state, error handling,
//! session registry, routes) so integration tests and the binary
//! entrypoint can both access them.

pub mod background;
pub mod config;
pub mod error;
pub mod handlers;
pub mod response;
pub mod router;
pub mod routes;
pub mod sessions;
pub mod state;
