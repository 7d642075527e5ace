// libs/appointment-cell/src/state.rs
use std::sync::Arc;

use shared_config::{AppConfig, StoreBackend};

use crate::services::conflict::ConflictDetectionService;
use crate::services::negotiation::NegotiationService;
use crate::services::planner::{BusinessHours, ReschedulePlanner};
use crate::services::repository::{
    AppointmentRepository, InMemoryAppointmentRepository, SupabaseAppointmentRepository,
};

/// Router state: configuration plus the shared store when running in memory.
#[derive(Clone)]
pub struct AppointmentState {
    pub config: Arc<AppConfig>,
    memory_store: Option<Arc<InMemoryAppointmentRepository>>,
}

impl AppointmentState {
    pub fn new(config: Arc<AppConfig>) -> Self {
        let memory_store = match config.appointment_store {
            StoreBackend::Memory => Some(Arc::new(InMemoryAppointmentRepository::new())),
            StoreBackend::Supabase => None,
        };
        Self {
            config,
            memory_store,
        }
    }

    /// Serve requests from a caller-provided in-memory store.
    pub fn with_memory_store(
        config: Arc<AppConfig>,
        store: Arc<InMemoryAppointmentRepository>,
    ) -> Self {
        Self {
            config,
            memory_store: Some(store),
        }
    }

    pub fn repository(&self, auth_token: &str) -> Arc<dyn AppointmentRepository> {
        match &self.memory_store {
            Some(store) => store.clone(),
            None => Arc::new(SupabaseAppointmentRepository::new(
                &self.config,
                Some(auth_token.to_string()),
            )),
        }
    }

    pub fn negotiation_service(&self, auth_token: &str) -> NegotiationService {
        NegotiationService::new(
            self.repository(auth_token),
            ReschedulePlanner::new(BusinessHours::from_config(&self.config)),
        )
    }

    pub fn conflict_service(&self, auth_token: &str) -> ConflictDetectionService {
        ConflictDetectionService::new(self.repository(auth_token))
    }
}
