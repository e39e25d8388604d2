//! Domain models for the café costing and inventory platform

mod accounting;
mod order;
mod recipe;
mod stock;
mod unit;
mod user;

pub use accounting::*;
pub use order::*;
pub use recipe::*;
pub use stock::*;
pub use unit::*;
pub use user::*;
