// libs/appointment-cell/src/services/conflict.rs
use std::sync::Arc;

use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::{Appointment, ConflictCheckResponse, NegotiationError, TimeRange};
use crate::services::repository::AppointmentRepository;

/// Active appointments in `existing` (other than `exclude_id`) that overlap `candidate`.
pub fn find_conflicts<'a>(
    candidate: &TimeRange,
    exclude_id: Option<Uuid>,
    existing: &'a [Appointment],
) -> impl Iterator<Item = &'a Appointment> + 'a {
    let candidate = *candidate;
    existing
        .iter()
        .filter(move |apt| Some(apt.appointment_id) != exclude_id)
        .filter(|apt| apt.is_active())
        .filter(move |apt| candidate.overlaps(&apt.interval()))
}

pub fn has_conflict(
    candidate: &TimeRange,
    exclude_id: Option<Uuid>,
    existing: &[Appointment],
) -> bool {
    find_conflicts(candidate, exclude_id, existing).next().is_some()
}

/// Fail with the first colliding appointment, if any.
pub fn ensure_no_conflict(
    candidate: &TimeRange,
    exclude_id: Option<Uuid>,
    existing: &[Appointment],
) -> Result<(), NegotiationError> {
    match find_conflicts(candidate, exclude_id, existing).next() {
        Some(conflicting) => {
            warn!(
                "Interval {} collides with appointment {}",
                candidate, conflicting.appointment_id
            );
            Err(NegotiationError::Conflict {
                conflicting_appointment_id: conflicting.appointment_id,
            })
        }
        None => Ok(()),
    }
}

/// Conflict checks backed by the appointment store, for live warnings in the UI.
pub struct ConflictDetectionService {
    repository: Arc<dyn AppointmentRepository>,
}

impl ConflictDetectionService {
    pub fn new(repository: Arc<dyn AppointmentRepository>) -> Self {
        Self { repository }
    }

    /// Check a candidate interval against everything `actor_id` is booked on.
    pub async fn check_conflict(
        &self,
        candidate: TimeRange,
        actor_id: Uuid,
        exclude_appointment_id: Option<Uuid>,
    ) -> Result<ConflictCheckResponse, NegotiationError> {
        debug!(
            "Checking conflicts for actor {} over {} (excluding {:?})",
            actor_id, candidate, exclude_appointment_id
        );

        let existing = self
            .repository
            .load_appointments_for_actor(actor_id, exclude_appointment_id)
            .await?;

        let conflicting_appointment_ids: Vec<Uuid> =
            find_conflicts(&candidate, exclude_appointment_id, &existing)
                .map(|apt| apt.appointment_id)
                .collect();

        Ok(ConflictCheckResponse {
            has_conflict: !conflicting_appointment_ids.is_empty(),
            conflicting_appointment_ids,
        })
    }
}
