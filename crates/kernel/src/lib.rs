//! Pergola CMS Kernel Library
//!
//! This library exposes kernel internals for integration testing and
//! embedding. The main entry point for running the server is the
//! `pergola` binary.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod processors;
pub mod routes;
pub mod session;
pub mod state;
pub mod theme;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use state::AppState;
