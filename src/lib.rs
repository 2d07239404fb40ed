//! Clubhouse: a club management portal service.
//!
//! Members accumulate points by completing approved projects; points map
//! to display ranks. Projects move through an explicit admin-gated
//! lifecycle, and the community votes on polls. Everything is served
//! over a JSON REST API backed by SQLite.

pub mod api;
pub mod db;
pub mod error;
pub mod models;

pub use error::{Error, Result};
