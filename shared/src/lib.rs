//! Shared types and models for the café costing and inventory platform
//!
//! This crate contains the domain types and the pure costing, stock and
//! profit computations shared between the backend, the dashboards (via WASM),
//! and the test suites. Nothing here touches the database.

pub mod error;
pub mod models;
pub mod types;
pub mod validation;

pub use error::*;
pub use models::*;
pub use types::*;
pub use validation::*;
