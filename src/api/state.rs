use crate::dashboard::DashboardController;

#[derive(Clone)]
pub struct AppState {
    pub controller: DashboardController,
    /// Window used when a trend or history request names no `dias`.
    pub default_days: u32,
}

impl AppState {
    pub fn new(controller: DashboardController, default_days: u32) -> Self {
        Self {
            controller,
            default_days,
        }
    }
}
