//! HTTP request handlers

pub mod accounting;
pub mod auth;
pub mod health;
pub mod inventory;
pub mod order;
pub mod recipe;

pub use accounting::*;
pub use auth::*;
pub use health::*;
pub use inventory::*;
pub use order::*;
pub use recipe::*;
