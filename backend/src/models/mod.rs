//! Domain models for the café costing platform
//!
//! Re-exports models from the shared crate; row types live next to the
//! services that query them.

pub use shared::models::*;
