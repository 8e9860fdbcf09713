//! Application state for the HTTP server.

use std::sync::Arc;

use crate::auth::JwtManager;
use crate::db::FullRepository;
use crate::services::{Clock, LifecycleSettings, ScheduleLifecycle};

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub repository: Arc<dyn FullRepository>,
    pub lifecycle: ScheduleLifecycle,
    pub clock: Arc<dyn Clock>,
    pub jwt: Arc<JwtManager>,
}

impl AppState {
    pub fn new(
        repository: Arc<dyn FullRepository>,
        clock: Arc<dyn Clock>,
        jwt: JwtManager,
        settings: LifecycleSettings,
    ) -> Self {
        let lifecycle = ScheduleLifecycle::new(repository.clone(), clock.clone(), settings);
        Self {
            repository,
            lifecycle,
            clock,
            jwt: Arc::new(jwt),
        }
    }
}
