// libs/appointment-cell/src/services/lifecycle.rs
use tracing::{debug, warn};

use crate::models::{
    Appointment, AppointmentMutation, AppointmentStatus, NegotiationError, Party, TimeRange,
    Transition,
};

/// Who may fire a transition, relative to the appointment's current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActorRule {
    /// The party that did not propose the current interval.
    Reviewer,
    /// The party that proposed the current interval.
    Initiator,
    EitherParty,
    /// The party recorded in `cancelled_by`.
    Canceller,
}

impl ActorRule {
    fn admits(&self, appointment: &Appointment, actor: Party) -> Result<(), String> {
        match self {
            ActorRule::Reviewer if actor == appointment.initiated_by => Err(format!(
                "{} proposed this interval and cannot review it",
                actor
            )),
            ActorRule::Initiator if actor != appointment.initiated_by => Err(format!(
                "only the initiator ({}) may do this",
                appointment.initiated_by
            )),
            ActorRule::Canceller if appointment.cancelled_by != Some(actor) => Err(format!(
                "only the cancelling party ({}) may revive this appointment",
                appointment
                    .cancelled_by
                    .map(|p| p.to_string())
                    .unwrap_or_else(|| "unknown".to_string())
            )),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReasonRule {
    Required,
    Optional,
    NotApplicable,
}

/// One row of the negotiation transition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionRule {
    pub from: AppointmentStatus,
    pub transition: Transition,
    pub allowed: ActorRule,
    pub to: AppointmentStatus,
    pub reason: ReasonRule,
}

const fn rule(
    from: AppointmentStatus,
    transition: Transition,
    allowed: ActorRule,
    to: AppointmentStatus,
    reason: ReasonRule,
) -> TransitionRule {
    TransitionRule {
        from,
        transition,
        allowed,
        to,
        reason,
    }
}

/// Every legal `(status, transition)` pair. Anything missing is an invalid transition.
#[rustfmt::skip]
pub static TRANSITION_TABLE: [TransitionRule; 8] = [
    rule(AppointmentStatus::Proposed, Transition::Confirm, ActorRule::Reviewer, AppointmentStatus::Confirmed, ReasonRule::NotApplicable),
    rule(AppointmentStatus::Proposed, Transition::Decline, ActorRule::Reviewer, AppointmentStatus::Declined, ReasonRule::Required),
    rule(AppointmentStatus::Proposed, Transition::Cancel, ActorRule::Initiator, AppointmentStatus::Cancelled, ReasonRule::Optional),
    rule(AppointmentStatus::Proposed, Transition::Reschedule, ActorRule::Initiator, AppointmentStatus::Proposed, ReasonRule::NotApplicable),
    rule(AppointmentStatus::Confirmed, Transition::Cancel, ActorRule::EitherParty, AppointmentStatus::Cancelled, ReasonRule::Required),
    rule(AppointmentStatus::Confirmed, Transition::Reschedule, ActorRule::EitherParty, AppointmentStatus::Proposed, ReasonRule::NotApplicable),
    rule(AppointmentStatus::Cancelled, Transition::Reschedule, ActorRule::Canceller, AppointmentStatus::Proposed, ReasonRule::NotApplicable),
    // Product policy: the party whose proposal was declined gets to try again.
    rule(AppointmentStatus::Declined, Transition::Reschedule, ActorRule::Initiator, AppointmentStatus::Proposed, ReasonRule::NotApplicable),
];

/// Input carried by a transition beyond the actor.
#[derive(Debug, Clone, PartialEq)]
pub enum TransitionPayload {
    None,
    Reason(Option<String>),
    Interval(TimeRange),
}

pub struct AppointmentLifecycleService;

impl Default for AppointmentLifecycleService {
    fn default() -> Self {
        Self::new()
    }
}

impl AppointmentLifecycleService {
    pub fn new() -> Self {
        Self
    }

    pub fn rule_for(
        &self,
        status: AppointmentStatus,
        transition: Transition,
    ) -> Option<&'static TransitionRule> {
        TRANSITION_TABLE
            .iter()
            .find(|r| r.from == status && r.transition == transition)
    }

    /// Transitions defined for `status`, regardless of who asks.
    pub fn get_valid_transitions(&self, status: AppointmentStatus) -> Vec<Transition> {
        TRANSITION_TABLE
            .iter()
            .filter(|r| r.from == status)
            .map(|r| r.transition)
            .collect()
    }

    /// Transitions `actor` may fire on this appointment right now.
    pub fn available_transitions(&self, appointment: &Appointment, actor: Party) -> Vec<Transition> {
        TRANSITION_TABLE
            .iter()
            .filter(|r| r.from == appointment.status)
            .filter(|r| r.allowed.admits(appointment, actor).is_ok())
            .map(|r| r.transition)
            .collect()
    }

    /// Look up the table row and check the actor against it.
    pub fn authorize(
        &self,
        appointment: &Appointment,
        actor: Party,
        transition: Transition,
    ) -> Result<&'static TransitionRule, NegotiationError> {
        debug!(
            "Authorizing {} by {} on appointment {} ({})",
            transition, actor, appointment.appointment_id, appointment.status
        );

        let rule = self
            .rule_for(appointment.status, transition)
            .ok_or_else(|| {
                warn!(
                    "Invalid transition attempted: {} from {}",
                    transition, appointment.status
                );
                NegotiationError::InvalidTransition {
                    status: appointment.status,
                    transition,
                }
            })?;

        rule.allowed.admits(appointment, actor).map_err(|reason| {
            warn!(
                "Permission denied: {} may not {} appointment {}: {}",
                actor, transition, appointment.appointment_id, reason
            );
            NegotiationError::Permission {
                actor,
                action: transition.to_string(),
                reason,
            }
        })?;

        Ok(rule)
    }

    /// Produce the full field group for an authorized transition.
    ///
    /// Payload validation (reasons, interval ordering, conflicts) happens in the
    /// orchestrator before this is called.
    pub fn build_mutation(
        &self,
        rule: &TransitionRule,
        appointment: &Appointment,
        actor: Party,
        payload: TransitionPayload,
    ) -> AppointmentMutation {
        let mut mutation = AppointmentMutation::from_current(appointment, rule.transition);
        mutation.status = rule.to;

        match (rule.transition, payload) {
            (Transition::Confirm, _) => {}
            (Transition::Decline, TransitionPayload::Reason(reason)) => {
                mutation.refusal_reason = reason;
            }
            (Transition::Cancel, TransitionPayload::Reason(reason)) => {
                mutation.cancelled_by = Some(actor);
                mutation.cancellation_reason = reason;
            }
            (Transition::Cancel, _) => {
                mutation.cancelled_by = Some(actor);
                mutation.cancellation_reason = None;
            }
            (Transition::Reschedule, TransitionPayload::Interval(range)) => {
                mutation.from_date_time = range.start;
                mutation.to_date_time = range.end;
                mutation.initiated_by = actor;
                mutation.cancelled_by = None;
                mutation.cancellation_reason = None;
                mutation.refusal_reason = None;
            }
            (transition, payload) => {
                warn!("Ignoring payload {:?} for {}", payload, transition);
            }
        }

        mutation
    }
}
