// Application state for HTTP handlers
use crate::application::sync_controller::SyncController;

#[derive(Clone)]
pub struct AppState {
    pub controller: SyncController,
}
