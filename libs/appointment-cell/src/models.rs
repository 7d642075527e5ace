// libs/appointment-cell/src/models.rs
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

/// A meeting negotiated between a broker and a client.
///
/// `from_date_time`/`to_date_time` are local wall-clock times forming the
/// half-open interval `[from, to)`. The status field group (`status`,
/// `initiated_by`, `cancelled_by`, `refusal_reason`, `cancellation_reason` and
/// the interval) only ever changes through an [`AppointmentMutation`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub appointment_id: Uuid,
    pub title: String,
    pub broker_id: Uuid,
    pub client_id: Uuid,
    pub broker_name: Option<String>,
    pub client_name: Option<String>,
    pub from_date_time: NaiveDateTime,
    pub to_date_time: NaiveDateTime,
    pub status: AppointmentStatus,
    pub initiated_by: Party,
    pub cancelled_by: Option<Party>,
    pub refusal_reason: Option<String>,
    pub cancellation_reason: Option<String>,
    pub number_of_visitors: Option<i32>,
    pub location: Option<String>,
    pub notes: Option<String>,
    /// Optimistic-concurrency token, bumped by the store on every saved transition.
    #[serde(default)]
    pub version: i64,
}

impl Appointment {
    pub fn interval(&self) -> TimeRange {
        TimeRange {
            start: self.from_date_time,
            end: self.to_date_time,
        }
    }

    /// Identifier of whoever holds `party` on this appointment.
    pub fn party_id(&self, party: Party) -> Uuid {
        match party {
            Party::Broker => self.broker_id,
            Party::Client => self.client_id,
        }
    }

    /// Resolve a user id to the role it plays on this appointment.
    pub fn party_of(&self, user_id: &str) -> Option<Party> {
        if self.broker_id.to_string() == user_id {
            Some(Party::Broker)
        } else if self.client_id.to_string() == user_id {
            Some(Party::Client)
        } else {
            None
        }
    }

    pub fn category(&self) -> AppointmentCategory {
        AppointmentCategory::from_title(&self.title)
    }

    /// Cancelled and declined appointments never block a slot.
    pub fn is_active(&self) -> bool {
        !self.status.is_terminal()
    }

    pub fn check_invariants(&self) -> Result<(), NegotiationError> {
        if self.from_date_time >= self.to_date_time {
            return Err(NegotiationError::Validation(
                "Appointment must start before it ends".to_string(),
            ));
        }

        let cancelled = self.status == AppointmentStatus::Cancelled;
        if cancelled != self.cancelled_by.is_some() {
            return Err(NegotiationError::Validation(
                "cancelled_by must be set exactly when the appointment is cancelled".to_string(),
            ));
        }
        if !cancelled && self.cancellation_reason.is_some() {
            return Err(NegotiationError::Validation(
                "cancellation_reason is only allowed on cancelled appointments".to_string(),
            ));
        }
        if self.status != AppointmentStatus::Declined && self.refusal_reason.is_some() {
            return Err(NegotiationError::Validation(
                "refusal_reason is only allowed on declined appointments".to_string(),
            ));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppointmentStatus {
    Proposed,
    Confirmed,
    Declined,
    Cancelled,
}

impl AppointmentStatus {
    /// Terminal for negotiation; only a revival reschedule leaves these states.
    pub fn is_terminal(&self) -> bool {
        matches!(self, AppointmentStatus::Declined | AppointmentStatus::Cancelled)
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Proposed => write!(f, "PROPOSED"),
            AppointmentStatus::Confirmed => write!(f, "CONFIRMED"),
            AppointmentStatus::Declined => write!(f, "DECLINED"),
            AppointmentStatus::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

/// The two sides of a negotiation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Party {
    Broker,
    Client,
}

impl fmt::Display for Party {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Party::Broker => write!(f, "BROKER"),
            Party::Client => write!(f, "CLIENT"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Transition {
    Confirm,
    Decline,
    Cancel,
    Reschedule,
}

impl Transition {
    pub const ALL: [Transition; 4] = [
        Transition::Confirm,
        Transition::Decline,
        Transition::Cancel,
        Transition::Reschedule,
    ];
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transition::Confirm => write!(f, "CONFIRM"),
            Transition::Decline => write!(f, "DECLINE"),
            Transition::Cancel => write!(f, "CANCEL"),
            Transition::Reschedule => write!(f, "RESCHEDULE"),
        }
    }
}

/// Recognised titles. Showing-type appointments track a visitor count once concluded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppointmentCategory {
    OpenHouse,
    PrivateShowing,
    Other(String),
}

impl AppointmentCategory {
    pub fn from_title(title: &str) -> Self {
        match title.trim() {
            "open_house" => AppointmentCategory::OpenHouse,
            "private_showing" => AppointmentCategory::PrivateShowing,
            other => AppointmentCategory::Other(other.to_string()),
        }
    }

    pub fn is_showing(&self) -> bool {
        matches!(
            self,
            AppointmentCategory::OpenHouse | AppointmentCategory::PrivateShowing
        )
    }
}

/// Half-open interval `[start, end)` on the local wall clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl TimeRange {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Result<Self, NegotiationError> {
        if start >= end {
            return Err(NegotiationError::Validation(format!(
                "Start {} must be before end {}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    pub fn duration(&self) -> chrono::Duration {
        self.end - self.start
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

// ==============================================================================
// MUTATIONS
// ==============================================================================

/// The complete status field group produced by one transition.
///
/// Every field is written together; there is no way to build a mutation that
/// updates the status without also stating the initiator, the canceller, both
/// reasons and the interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppointmentMutation {
    pub transition: Transition,
    pub status: AppointmentStatus,
    pub initiated_by: Party,
    pub cancelled_by: Option<Party>,
    pub refusal_reason: Option<String>,
    pub cancellation_reason: Option<String>,
    pub from_date_time: NaiveDateTime,
    pub to_date_time: NaiveDateTime,
}

impl AppointmentMutation {
    /// Start from the appointment's current field group.
    pub(crate) fn from_current(appointment: &Appointment, transition: Transition) -> Self {
        Self {
            transition,
            status: appointment.status,
            initiated_by: appointment.initiated_by,
            cancelled_by: appointment.cancelled_by,
            refusal_reason: appointment.refusal_reason.clone(),
            cancellation_reason: appointment.cancellation_reason.clone(),
            from_date_time: appointment.from_date_time,
            to_date_time: appointment.to_date_time,
        }
    }

    /// The appointment as it looks after this mutation. The version is left
    /// untouched; bumping it is the store's job.
    pub fn apply_to(&self, appointment: &Appointment) -> Appointment {
        Appointment {
            status: self.status,
            initiated_by: self.initiated_by,
            cancelled_by: self.cancelled_by,
            refusal_reason: self.refusal_reason.clone(),
            cancellation_reason: self.cancellation_reason.clone(),
            from_date_time: self.from_date_time,
            to_date_time: self.to_date_time,
            ..appointment.clone()
        }
    }
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProposeAppointmentRequest {
    pub title: String,
    pub broker_id: Uuid,
    pub client_id: Uuid,
    pub broker_name: Option<String>,
    pub client_name: Option<String>,
    pub from_date_time: NaiveDateTime,
    pub to_date_time: NaiveDateTime,
    pub location: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeclineAppointmentRequest {
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CancelAppointmentRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RescheduleAppointmentRequest {
    pub from_date_time: NaiveDateTime,
    pub to_date_time: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordVisitorsRequest {
    pub number_of_visitors: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictCheckResponse {
    pub has_conflict: bool,
    pub conflicting_appointment_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailableActionsResponse {
    pub appointment_id: Uuid,
    pub actor: Party,
    pub status: AppointmentStatus,
    pub transitions: Vec<Transition>,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
pub enum NegotiationError {
    #[error("{transition} is not a valid transition from {status}")]
    InvalidTransition {
        status: AppointmentStatus,
        transition: Transition,
    },

    #[error("{actor} is not allowed to {action} this appointment: {reason}")]
    Permission {
        actor: Party,
        action: String,
        reason: String,
    },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Interval collides with appointment {conflicting_appointment_id}")]
    Conflict { conflicting_appointment_id: Uuid },

    #[error("Appointment {appointment_id} changed since version {expected_version}")]
    StaleState {
        appointment_id: Uuid,
        expected_version: i64,
    },

    #[error("Appointment not found")]
    NotFound,

    #[error("Database error: {0}")]
    Database(String),
}
