//! Session manager and route guard for the sports-mentoring site.
//!
//! SYSTEM CONTEXT
//! ==============
//! The binary in `main.rs` wires configuration, the identity backend and the
//! router together; everything it needs is exposed from here so integration
//! tests and the binary share one surface.

pub mod config;
pub mod error;
pub mod provider;
pub mod routes;
pub mod services;
pub mod state;
pub mod token;
pub mod validate;
