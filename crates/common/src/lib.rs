//! Shared foundation for the Herald notification service:
//! configuration, error taxonomy, domain types, database pool.

pub mod config;
pub mod db;
pub mod error;
pub mod types;
