//! Core business logic for commune.

pub mod services;

pub use services::*;
