//! API handlers for Shelfmark REST endpoints

pub mod books;
pub mod health;
pub mod lending;
pub mod members;
pub mod openapi;
pub mod stats;
