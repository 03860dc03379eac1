//! confgrid Server - REST surface and maintenance CLI for confgrid
//!
//! - `api`: warp filter tree for the health and configuration routes
//! - `config`: layered `ServerConfig` (defaults, TOML file, environment)
//! - `commands`: seed / restore / inspect helpers used by the binary
//! - `logging`: tracing subscriber setup
//! - `server`: listener lifecycle with graceful shutdown

#![warn(unreachable_pub)]

pub mod api;
pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod server;

pub use api::{routes, AppState};
pub use config::{LogFormat, ServerConfig};
pub use error::{ApiError, ConfigError, Operation, ServerError};
