//! Server state shared across requests

use postbox_core::MessagingService;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<MessagingService>,
}

impl AppState {
    pub fn new(service: Arc<MessagingService>) -> Self {
        Self { service }
    }
}
