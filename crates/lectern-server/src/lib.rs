//! Lectern server: shared state, HTTP routes, and CLI commands.

pub mod cli;
pub mod routes;
pub mod state;

pub use state::AppState;
