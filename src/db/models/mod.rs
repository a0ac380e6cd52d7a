//! Database models split into domain-specific modules.

pub mod booking;
pub mod common;
pub mod item;
pub mod message;
pub mod user;

pub use booking::*;
pub use common::*;
pub use item::*;
pub use message::*;
pub use user::*;
