//! Shelfscan HTTP service: router, handlers and logging setup.
//!
//! The binary in `main.rs` parses the CLI and serves [`server::router`].

pub mod env;
pub mod logging;
pub mod server;
