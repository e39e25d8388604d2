//! Business logic services for the café costing platform

pub mod accounting;
pub mod auth;
pub mod inventory;
pub mod order;
pub mod recipe;

