//! Athenaeum Library Circulation Server
//!
//! A rules engine for library circulation: borrow/return/reserve
//! transactions over a per-book inventory ledger, due-date and fine
//! arithmetic, and a role/permission gate, exposed as a REST JSON API.
//! Persistence is delegated to a document store consumed through the
//! [`store`] contract.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod policy;
pub mod services;
pub mod store;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}
