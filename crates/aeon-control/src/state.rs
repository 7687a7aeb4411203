//! Shared state for the control handlers.

use std::sync::Arc;

use aeon_core::TickTrigger;

/// State shared by every control handler.
#[derive(Clone)]
pub struct AppState {
    /// What a forced tick calls into.
    pub trigger: Arc<dyn TickTrigger>,
}

impl AppState {
    /// Wrap a trigger.
    pub const fn new(trigger: Arc<dyn TickTrigger>) -> Self {
        Self { trigger }
    }

    /// Whether forced ticks are allowed.
    pub fn test_mode(&self) -> bool {
        self.trigger.test_mode()
    }
}
