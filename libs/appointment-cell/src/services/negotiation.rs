// libs/appointment-cell/src/services/negotiation.rs
use std::sync::Arc;

use chrono::NaiveDateTime;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::{
    Appointment, AppointmentMutation, AppointmentStatus, NegotiationError, Party,
    ProposeAppointmentRequest, TimeRange, Transition,
};
use crate::services::conflict::ensure_no_conflict;
use crate::services::lifecycle::{AppointmentLifecycleService, ReasonRule, TransitionPayload};
use crate::services::planner::ReschedulePlanner;
use crate::services::repository::AppointmentRepository;

fn non_empty(reason: Option<&str>) -> Option<String> {
    reason
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(str::to_string)
}

// ==============================================================================
// PURE ORCHESTRATION
// ==============================================================================

/// Validates a requested transition and produces the mutation, without any I/O.
///
/// Every check runs before the mutation is built, so an error never leaves a
/// half-applied change behind. `existing` is the actor's other appointments.
#[derive(Default)]
pub struct NegotiationEngine {
    lifecycle: AppointmentLifecycleService,
}

impl NegotiationEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lifecycle(&self) -> &AppointmentLifecycleService {
        &self.lifecycle
    }

    pub fn confirm(
        &self,
        appointment: &Appointment,
        actor: Party,
        existing: &[Appointment],
    ) -> Result<AppointmentMutation, NegotiationError> {
        let rule = self.lifecycle.authorize(appointment, actor, Transition::Confirm)?;

        ensure_no_conflict(
            &appointment.interval(),
            Some(appointment.appointment_id),
            existing,
        )?;

        Ok(self
            .lifecycle
            .build_mutation(rule, appointment, actor, TransitionPayload::None))
    }

    pub fn decline(
        &self,
        appointment: &Appointment,
        actor: Party,
        reason: &str,
    ) -> Result<AppointmentMutation, NegotiationError> {
        let rule = self.lifecycle.authorize(appointment, actor, Transition::Decline)?;

        let reason = non_empty(Some(reason)).ok_or_else(|| {
            NegotiationError::Validation("A reason is required to decline".to_string())
        })?;

        Ok(self.lifecycle.build_mutation(
            rule,
            appointment,
            actor,
            TransitionPayload::Reason(Some(reason)),
        ))
    }

    /// Withdraw a proposal (reason optional) or call off a confirmed meeting (reason required).
    pub fn cancel(
        &self,
        appointment: &Appointment,
        actor: Party,
        reason: Option<&str>,
    ) -> Result<AppointmentMutation, NegotiationError> {
        let rule = self.lifecycle.authorize(appointment, actor, Transition::Cancel)?;

        let reason = non_empty(reason);
        if rule.reason == ReasonRule::Required && reason.is_none() {
            return Err(NegotiationError::Validation(
                "A reason is required to cancel a confirmed appointment".to_string(),
            ));
        }

        Ok(self.lifecycle.build_mutation(
            rule,
            appointment,
            actor,
            TransitionPayload::Reason(reason),
        ))
    }

    /// One operation for all four reschedule flavours; the table row decides who may
    /// do it and what gets cleared.
    pub fn reschedule(
        &self,
        appointment: &Appointment,
        actor: Party,
        new_start: NaiveDateTime,
        new_end: NaiveDateTime,
        existing: &[Appointment],
    ) -> Result<AppointmentMutation, NegotiationError> {
        if new_start == appointment.from_date_time && new_end == appointment.to_date_time {
            return Err(NegotiationError::Validation(
                "The new interval is identical to the current one".to_string(),
            ));
        }

        let rule = self.lifecycle.authorize(appointment, actor, Transition::Reschedule)?;

        let range = TimeRange::new(new_start, new_end)?;

        ensure_no_conflict(&range, Some(appointment.appointment_id), existing)?;

        Ok(self.lifecycle.build_mutation(
            rule,
            appointment,
            actor,
            TransitionPayload::Interval(range),
        ))
    }

    /// Build a fresh `PROPOSED` appointment on behalf of `actor`.
    pub fn propose(
        &self,
        request: ProposeAppointmentRequest,
        actor: Party,
        existing: &[Appointment],
    ) -> Result<Appointment, NegotiationError> {
        if request.title.trim().is_empty() {
            return Err(NegotiationError::Validation("A title is required".to_string()));
        }
        if request.broker_id == request.client_id {
            return Err(NegotiationError::Validation(
                "Broker and client must be different parties".to_string(),
            ));
        }

        let range = TimeRange::new(request.from_date_time, request.to_date_time)?;
        ensure_no_conflict(&range, None, existing)?;

        Ok(Appointment {
            appointment_id: Uuid::new_v4(),
            title: request.title.trim().to_string(),
            broker_id: request.broker_id,
            client_id: request.client_id,
            broker_name: request.broker_name,
            client_name: request.client_name,
            from_date_time: range.start,
            to_date_time: range.end,
            status: AppointmentStatus::Proposed,
            initiated_by: actor,
            cancelled_by: None,
            refusal_reason: None,
            cancellation_reason: None,
            number_of_visitors: None,
            location: request.location,
            notes: request.notes,
            version: 0,
        })
    }

    /// Check that a visitor count may be recorded on a concluded showing.
    pub fn validate_visitor_count(
        &self,
        appointment: &Appointment,
        actor: Party,
        number_of_visitors: i32,
        now: NaiveDateTime,
    ) -> Result<(), NegotiationError> {
        if actor != Party::Broker {
            return Err(NegotiationError::Permission {
                actor,
                action: "RECORD_VISITORS".to_string(),
                reason: "only the broker records visitor counts".to_string(),
            });
        }
        if !appointment.category().is_showing() {
            return Err(NegotiationError::Validation(
                "Visitor counts only apply to showings".to_string(),
            ));
        }
        if appointment.status != AppointmentStatus::Confirmed {
            return Err(NegotiationError::Validation(format!(
                "Visitor counts require a confirmed showing, found {}",
                appointment.status
            )));
        }
        if appointment.to_date_time > now {
            return Err(NegotiationError::Validation(
                "The showing has not concluded yet".to_string(),
            ));
        }
        if number_of_visitors < 0 {
            return Err(NegotiationError::Validation(
                "Visitor count cannot be negative".to_string(),
            ));
        }
        Ok(())
    }
}

// ==============================================================================
// STORE-BACKED ORCHESTRATION
// ==============================================================================

/// Caller-facing façade: fetches the actor's snapshot, runs the engine and
/// persists the mutation with a version check.
pub struct NegotiationService {
    repository: Arc<dyn AppointmentRepository>,
    engine: NegotiationEngine,
    planner: ReschedulePlanner,
}

impl NegotiationService {
    pub fn new(repository: Arc<dyn AppointmentRepository>, planner: ReschedulePlanner) -> Self {
        Self {
            repository,
            engine: NegotiationEngine::new(),
            planner,
        }
    }

    pub fn engine(&self) -> &NegotiationEngine {
        &self.engine
    }

    pub async fn load_appointment(&self, appointment_id: Uuid) -> Result<Appointment, NegotiationError> {
        self.repository.load_appointment(appointment_id).await
    }

    /// Everything else `actor` is booked on. Fetched per call so it reflects the
    /// actor's latest saved mutations.
    async fn snapshot_for(
        &self,
        appointment: &Appointment,
        actor: Party,
    ) -> Result<Vec<Appointment>, NegotiationError> {
        self.repository
            .load_appointments_for_actor(
                appointment.party_id(actor),
                Some(appointment.appointment_id),
            )
            .await
    }

    async fn persist(
        &self,
        appointment: &Appointment,
        mutation: AppointmentMutation,
    ) -> Result<Appointment, NegotiationError> {
        let saved = self
            .repository
            .save_appointment_transition(appointment.appointment_id, appointment.version, &mutation)
            .await?;

        info!(
            "Appointment {} {} -> {} via {}",
            appointment.appointment_id, appointment.status, saved.status, mutation.transition
        );
        Ok(saved)
    }

    pub async fn confirm(
        &self,
        appointment: &Appointment,
        actor: Party,
    ) -> Result<Appointment, NegotiationError> {
        debug!("{} confirming appointment {}", actor, appointment.appointment_id);

        // Permission first, so an unauthorized caller never triggers a snapshot read.
        self.engine
            .lifecycle()
            .authorize(appointment, actor, Transition::Confirm)?;

        let existing = self.snapshot_for(appointment, actor).await?;
        let mutation = self.engine.confirm(appointment, actor, &existing)?;
        self.persist(appointment, mutation).await
    }

    pub async fn decline(
        &self,
        appointment: &Appointment,
        actor: Party,
        reason: &str,
    ) -> Result<Appointment, NegotiationError> {
        debug!("{} declining appointment {}", actor, appointment.appointment_id);

        let mutation = self.engine.decline(appointment, actor, reason)?;
        self.persist(appointment, mutation).await
    }

    pub async fn cancel(
        &self,
        appointment: &Appointment,
        actor: Party,
        reason: Option<&str>,
    ) -> Result<Appointment, NegotiationError> {
        debug!("{} cancelling appointment {}", actor, appointment.appointment_id);

        let mutation = self.engine.cancel(appointment, actor, reason)?;
        self.persist(appointment, mutation).await
    }

    pub async fn reschedule(
        &self,
        appointment: &Appointment,
        actor: Party,
        new_start: NaiveDateTime,
        new_end: NaiveDateTime,
    ) -> Result<Appointment, NegotiationError> {
        debug!(
            "{} rescheduling appointment {} to [{}, {})",
            actor, appointment.appointment_id, new_start, new_end
        );

        // Run every check that needs no snapshot before touching the store.
        self.engine
            .reschedule(appointment, actor, new_start, new_end, &[])?;

        let existing = self.snapshot_for(appointment, actor).await?;
        let mutation = self
            .engine
            .reschedule(appointment, actor, new_start, new_end, &existing)?;
        self.persist(appointment, mutation).await
    }

    pub async fn propose(
        &self,
        request: ProposeAppointmentRequest,
        actor: Party,
    ) -> Result<Appointment, NegotiationError> {
        let proposer_id = match actor {
            Party::Broker => request.broker_id,
            Party::Client => request.client_id,
        };
        debug!("{} {} proposing '{}'", actor, proposer_id, request.title);

        let existing = self
            .repository
            .load_appointments_for_actor(proposer_id, None)
            .await?;
        let appointment = self.engine.propose(request, actor, &existing)?;
        let saved = self.repository.insert_appointment(appointment).await?;

        info!("Appointment {} proposed by {}", saved.appointment_id, actor);
        Ok(saved)
    }

    pub async fn record_visitors(
        &self,
        appointment: &Appointment,
        actor: Party,
        number_of_visitors: i32,
        now: NaiveDateTime,
    ) -> Result<Appointment, NegotiationError> {
        self.engine
            .validate_visitor_count(appointment, actor, number_of_visitors, now)
            .inspect_err(|e| warn!("Visitor count rejected: {}", e))?;

        self.repository
            .save_visitor_count(appointment.appointment_id, appointment.version, number_of_visitors)
            .await
    }

    pub fn suggest_reschedule_interval(&self, appointment: &Appointment) -> TimeRange {
        self.planner.suggest_reschedule_interval(appointment)
    }

    pub fn available_transitions(&self, appointment: &Appointment, actor: Party) -> Vec<Transition> {
        self.engine.lifecycle().available_transitions(appointment, actor)
    }
}
