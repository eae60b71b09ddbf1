//! Shared types and models for the Farm Management Platform
//!
//! This crate contains the domain models and pure business rules shared
//! between the backend, the web client (via WASM), and tests.

pub mod analytics;
pub mod models;
pub mod types;
pub mod validation;

pub use analytics::*;
pub use models::*;
pub use types::*;
pub use validation::*;
