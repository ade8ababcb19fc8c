//! Compliance Tracker Library
//!
//! Forms, recurring task assignment, overdue tracking and completion
//! analytics over SQLite, exposed through a JSON HTTP API.

pub mod api;
pub mod auth;
pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod recurrence;
pub mod types;
