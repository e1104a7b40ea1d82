// ABOUTME: Library root for cutover - exposes public types for testing.
// ABOUTME: The main binary is in main.rs.

pub mod collab;
pub mod config;
pub mod deploy;
pub mod error;
pub mod hooks;
pub mod host;
pub mod release;
pub mod types;
