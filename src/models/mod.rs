//! Core data models for the health dashboard.

mod filter;
mod history;
mod player;
mod summary;
mod taxonomy;
mod vip;

pub use filter::*;
pub use history::*;
pub use player::*;
pub use summary::*;
pub use taxonomy::*;
pub use vip::*;
