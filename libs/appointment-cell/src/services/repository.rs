// libs/appointment-cell/src/services/repository.rs
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{Appointment, AppointmentMutation, NegotiationError};

/// Storage the negotiation core reads snapshots from and writes transitions to.
#[async_trait]
pub trait AppointmentRepository: Send + Sync {
    async fn load_appointment(&self, appointment_id: Uuid) -> Result<Appointment, NegotiationError>;

    /// Every appointment `actor_id` takes part in, as broker or client.
    async fn load_appointments_for_actor(
        &self,
        actor_id: Uuid,
        excluding_id: Option<Uuid>,
    ) -> Result<Vec<Appointment>, NegotiationError>;

    /// Compare-and-swap on `version`. Returns the stored record with the bumped version.
    async fn save_appointment_transition(
        &self,
        appointment_id: Uuid,
        expected_version: i64,
        mutation: &AppointmentMutation,
    ) -> Result<Appointment, NegotiationError>;

    async fn insert_appointment(&self, appointment: Appointment) -> Result<Appointment, NegotiationError>;

    /// Plain field update outside the status group (e.g. visitor count), still version-guarded.
    async fn save_visitor_count(
        &self,
        appointment_id: Uuid,
        expected_version: i64,
        number_of_visitors: i32,
    ) -> Result<Appointment, NegotiationError>;
}

// ==============================================================================
// IN-MEMORY STORE
// ==============================================================================

/// Process-local store used by tests and `APPOINTMENT_STORE=memory`.
#[derive(Default)]
pub struct InMemoryAppointmentRepository {
    appointments: RwLock<HashMap<Uuid, Appointment>>,
}

impl InMemoryAppointmentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_appointments(appointments: impl IntoIterator<Item = Appointment>) -> Self {
        Self {
            appointments: RwLock::new(
                appointments
                    .into_iter()
                    .map(|apt| (apt.appointment_id, apt))
                    .collect(),
            ),
        }
    }

    fn stale(appointment_id: Uuid, expected_version: i64) -> NegotiationError {
        warn!(
            "Stale write rejected for appointment {} (expected version {})",
            appointment_id, expected_version
        );
        NegotiationError::StaleState {
            appointment_id,
            expected_version,
        }
    }
}

#[async_trait]
impl AppointmentRepository for InMemoryAppointmentRepository {
    async fn load_appointment(&self, appointment_id: Uuid) -> Result<Appointment, NegotiationError> {
        self.appointments
            .read()
            .await
            .get(&appointment_id)
            .cloned()
            .ok_or(NegotiationError::NotFound)
    }

    async fn load_appointments_for_actor(
        &self,
        actor_id: Uuid,
        excluding_id: Option<Uuid>,
    ) -> Result<Vec<Appointment>, NegotiationError> {
        let store = self.appointments.read().await;
        let mut appointments: Vec<Appointment> = store
            .values()
            .filter(|apt| apt.broker_id == actor_id || apt.client_id == actor_id)
            .filter(|apt| Some(apt.appointment_id) != excluding_id)
            .cloned()
            .collect();
        appointments.sort_by_key(|apt| apt.from_date_time);
        Ok(appointments)
    }

    async fn save_appointment_transition(
        &self,
        appointment_id: Uuid,
        expected_version: i64,
        mutation: &AppointmentMutation,
    ) -> Result<Appointment, NegotiationError> {
        let mut store = self.appointments.write().await;
        let current = store
            .get_mut(&appointment_id)
            .ok_or(NegotiationError::NotFound)?;

        if current.version != expected_version {
            return Err(Self::stale(appointment_id, expected_version));
        }

        let mut updated = mutation.apply_to(current);
        updated.version = expected_version + 1;
        *current = updated.clone();

        Ok(updated)
    }

    async fn insert_appointment(&self, appointment: Appointment) -> Result<Appointment, NegotiationError> {
        let mut store = self.appointments.write().await;
        if store.contains_key(&appointment.appointment_id) {
            return Err(NegotiationError::Database(format!(
                "Appointment {} already exists",
                appointment.appointment_id
            )));
        }
        store.insert(appointment.appointment_id, appointment.clone());
        Ok(appointment)
    }

    async fn save_visitor_count(
        &self,
        appointment_id: Uuid,
        expected_version: i64,
        number_of_visitors: i32,
    ) -> Result<Appointment, NegotiationError> {
        let mut store = self.appointments.write().await;
        let current = store
            .get_mut(&appointment_id)
            .ok_or(NegotiationError::NotFound)?;

        if current.version != expected_version {
            return Err(Self::stale(appointment_id, expected_version));
        }

        current.number_of_visitors = Some(number_of_visitors);
        current.version = expected_version + 1;
        Ok(current.clone())
    }
}

// ==============================================================================
// SUPABASE STORE
// ==============================================================================

/// PostgREST-backed store. Built per request so writes run under the caller's token.
pub struct SupabaseAppointmentRepository {
    supabase: Arc<SupabaseClient>,
    auth_token: Option<String>,
}

impl SupabaseAppointmentRepository {
    pub fn new(config: &AppConfig, auth_token: Option<String>) -> Self {
        Self {
            supabase: Arc::new(SupabaseClient::new(config)),
            auth_token,
        }
    }

    pub fn with_client(supabase: Arc<SupabaseClient>, auth_token: Option<String>) -> Self {
        Self {
            supabase,
            auth_token,
        }
    }

    fn parse_rows(rows: Vec<Value>) -> Result<Vec<Appointment>, NegotiationError> {
        rows.into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<Appointment>, _>>()
            .map_err(|e| NegotiationError::Database(format!("Failed to parse appointments: {}", e)))
    }

    async fn fetch(&self, method: Method, path: &str, body: Option<Value>) -> Result<Vec<Appointment>, NegotiationError> {
        let token = self.auth_token.as_deref();
        let rows: Vec<Value> = if method == Method::GET {
            self.supabase.request(method, path, token, body).await
        } else {
            self.supabase.request_returning(method, path, token, body).await
        }
        .map_err(|e| NegotiationError::Database(e.to_string()))?;

        Self::parse_rows(rows)
    }

    /// A guarded PATCH that matched no rows: the record is gone, its version
    /// moved, or the backend refused the write (e.g. a row-level policy).
    async fn classify_missed_write(
        &self,
        appointment_id: Uuid,
        expected_version: i64,
    ) -> NegotiationError {
        match self.load_appointment(appointment_id).await {
            Ok(current) if current.version == expected_version => {
                warn!(
                    "Write to appointment {} at version {} was refused by the backend",
                    appointment_id, expected_version
                );
                NegotiationError::Database(format!(
                    "Update of appointment {} was refused",
                    appointment_id
                ))
            }
            Ok(current) => {
                warn!(
                    "Stale write rejected for appointment {} (expected version {}, found {})",
                    appointment_id, expected_version, current.version
                );
                NegotiationError::StaleState {
                    appointment_id,
                    expected_version,
                }
            }
            Err(e) => e,
        }
    }

    async fn guarded_patch(
        &self,
        appointment_id: Uuid,
        expected_version: i64,
        body: Value,
    ) -> Result<Appointment, NegotiationError> {
        let path = format!(
            "/rest/v1/appointments?appointment_id=eq.{}&version=eq.{}",
            appointment_id, expected_version
        );

        match self.fetch(Method::PATCH, &path, Some(body)).await?.into_iter().next() {
            Some(updated) => {
                info!(
                    "Appointment {} saved at version {}",
                    appointment_id, updated.version
                );
                Ok(updated)
            }
            None => Err(self.classify_missed_write(appointment_id, expected_version).await),
        }
    }
}

#[async_trait]
impl AppointmentRepository for SupabaseAppointmentRepository {
    async fn load_appointment(&self, appointment_id: Uuid) -> Result<Appointment, NegotiationError> {
        debug!("Fetching appointment: {}", appointment_id);

        let path = format!("/rest/v1/appointments?appointment_id=eq.{}", appointment_id);
        self.fetch(Method::GET, &path, None)
            .await?
            .into_iter()
            .next()
            .ok_or(NegotiationError::NotFound)
    }

    async fn load_appointments_for_actor(
        &self,
        actor_id: Uuid,
        excluding_id: Option<Uuid>,
    ) -> Result<Vec<Appointment>, NegotiationError> {
        debug!("Fetching appointments for actor {} (excluding {:?})", actor_id, excluding_id);

        let mut query_parts = vec![format!(
            "or=(broker_id.eq.{0},client_id.eq.{0})",
            actor_id
        )];
        if let Some(exclude_id) = excluding_id {
            query_parts.push(format!("appointment_id=neq.{}", exclude_id));
        }

        let path = format!(
            "/rest/v1/appointments?{}&order=from_date_time.asc",
            query_parts.join("&")
        );
        self.fetch(Method::GET, &path, None).await
    }

    async fn save_appointment_transition(
        &self,
        appointment_id: Uuid,
        expected_version: i64,
        mutation: &AppointmentMutation,
    ) -> Result<Appointment, NegotiationError> {
        debug!(
            "Saving {} on appointment {} at version {}",
            mutation.transition, appointment_id, expected_version
        );

        let body = json!({
            "status": mutation.status,
            "initiated_by": mutation.initiated_by,
            "cancelled_by": mutation.cancelled_by,
            "refusal_reason": mutation.refusal_reason,
            "cancellation_reason": mutation.cancellation_reason,
            "from_date_time": mutation.from_date_time,
            "to_date_time": mutation.to_date_time,
            "version": expected_version + 1,
        });

        self.guarded_patch(appointment_id, expected_version, body).await
    }

    async fn insert_appointment(&self, appointment: Appointment) -> Result<Appointment, NegotiationError> {
        debug!("Inserting appointment {}", appointment.appointment_id);

        let body = serde_json::to_value(&appointment)
            .map_err(|e| NegotiationError::Database(format!("Failed to encode appointment: {}", e)))?;

        self.fetch(Method::POST, "/rest/v1/appointments", Some(body))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| NegotiationError::Database("Insert returned no rows".to_string()))
    }

    async fn save_visitor_count(
        &self,
        appointment_id: Uuid,
        expected_version: i64,
        number_of_visitors: i32,
    ) -> Result<Appointment, NegotiationError> {
        let body = json!({
            "number_of_visitors": number_of_visitors,
            "version": expected_version + 1,
        });

        self.guarded_patch(appointment_id, expected_version, body).await
    }
}
