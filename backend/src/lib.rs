//! Person Registry Backend Library
//!
//! This library exposes modules for testing and external use.
//! The main binary is in `src/main.rs`.

pub mod api;
pub mod config;
pub mod error;
/// Person records and the collaborators the services depend on
///
/// Record store, object store and QR encoder ports with their adapters.
pub mod registry;
pub mod services;
