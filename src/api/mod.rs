//! HTTP surface: one question endpoint plus two liveness helpers.

pub mod routes;
pub mod server;

pub use server::{build_router, serve, AppState};
