//! Shelfmark Library Catalog and Lending Tracker
//!
//! A REST JSON API for managing a book catalog, library members and the
//! lending relation between them. The lending engine coordinates the book
//! copy counts and each member's held-book set atomically against Postgres.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}
