//! Dashboard orchestration.
//!
//! - **state**: the injectable cache of loaded data and the active filter view
//! - **controller**: drives the backend and keeps the state current

mod controller;
mod state;

pub use controller::DashboardController;
pub use state::{DashboardState, LoadTicket};

use thiserror::Error;

use crate::client::ClientError;

/// Dashboard operation errors.
#[derive(Debug, Error)]
pub enum DashboardError {
    #[error(transparent)]
    Client(#[from] ClientError),

    /// A newer load started while this one was in flight.
    #[error("Load superseded by a newer request")]
    Superseded,

    #[error("No snapshots available")]
    NoHistory,
}
