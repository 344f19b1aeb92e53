//! Shared router state

use crate::config::RegistrationConfig;
use crate::registry::{ObjectStore, QrEncoder, RecordStore};
use crate::services::{LookupService, RegistrationService};
use std::sync::Arc;

/// State shared by all handlers
///
/// Services are built once at startup from injected collaborators and
/// cloned (by `Arc`) into each request.
#[derive(Clone)]
pub struct AppState {
    /// Registration write path
    pub registration: Arc<RegistrationService>,
    /// Record reads
    pub lookup: Arc<LookupService>,
}

impl AppState {
    /// Build both services over the same record store
    pub fn new(
        store: Arc<dyn RecordStore>,
        objects: Arc<dyn ObjectStore>,
        qr: Arc<dyn QrEncoder>,
        policy: RegistrationConfig,
    ) -> Self {
        Self {
            registration: Arc::new(RegistrationService::new(
                Arc::clone(&store),
                objects,
                qr,
                policy,
            )),
            lookup: Arc::new(LookupService::new(store)),
        }
    }
}
