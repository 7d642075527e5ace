// libs/appointment-cell/src/handlers.rs
use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use axum_extra::TypedHeader;
use chrono::{Local, NaiveDateTime};
use headers::{authorization::Bearer, Authorization};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{
    Appointment, AvailableActionsResponse, CancelAppointmentRequest, DeclineAppointmentRequest,
    NegotiationError, Party, ProposeAppointmentRequest, RecordVisitorsRequest,
    RescheduleAppointmentRequest, TimeRange,
};
use crate::state::AppointmentState;

// ==============================================================================
// QUERY PARAMETER STRUCTS
// ==============================================================================

#[derive(Debug, Deserialize)]
pub struct ConflictCheckQuery {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub exclude_appointment_id: Option<Uuid>,
}

// ==============================================================================
// ERROR MAPPING
// ==============================================================================

impl From<NegotiationError> for AppError {
    fn from(e: NegotiationError) -> Self {
        match e {
            NegotiationError::Permission { .. } => AppError::Forbidden(e.to_string()),
            NegotiationError::InvalidTransition { .. } => AppError::conflict(e.to_string()),
            NegotiationError::Validation(msg) => AppError::ValidationError(msg),
            NegotiationError::Conflict {
                conflicting_appointment_id,
            } => AppError::Conflict {
                message: e.to_string(),
                details: json!({ "conflicting_appointment_id": conflicting_appointment_id }),
            },
            NegotiationError::StaleState { appointment_id, .. } => AppError::Conflict {
                message: "Appointment was changed by the other party, reload and try again"
                    .to_string(),
                details: json!({ "stale": true, "appointment_id": appointment_id }),
            },
            NegotiationError::NotFound => AppError::NotFound("Appointment not found".to_string()),
            NegotiationError::Database(msg) => AppError::Database(msg),
        }
    }
}

/// Which side of the appointment the caller is on.
fn resolve_actor(appointment: &Appointment, user: &User) -> Result<Party, AppError> {
    appointment
        .party_of(&user.id)
        .ok_or_else(|| AppError::Forbidden("Not a party to this appointment".to_string()))
}

fn transition_response(appointment: Appointment, message: &str) -> Json<Value> {
    Json(json!({
        "success": true,
        "appointment": appointment,
        "message": message
    }))
}

// ==============================================================================
// NEGOTIATION HANDLERS
// ==============================================================================

pub async fn propose_appointment(
    State(state): State<AppointmentState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<ProposeAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let actor = if request.broker_id.to_string() == user.id {
        Party::Broker
    } else if request.client_id.to_string() == user.id {
        Party::Client
    } else {
        return Err(AppError::Forbidden(
            "Appointments can only be proposed by one of their parties".to_string(),
        ));
    };

    let appointment = state
        .negotiation_service(auth.token())
        .propose(request, actor)
        .await?;

    Ok(transition_response(appointment, "Appointment proposed"))
}

pub async fn get_appointment(
    State(state): State<AppointmentState>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let appointment = state
        .negotiation_service(auth.token())
        .load_appointment(appointment_id)
        .await?;

    resolve_actor(&appointment, &user)?;

    Ok(Json(json!(appointment)))
}

pub async fn get_available_actions(
    State(state): State<AppointmentState>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<AvailableActionsResponse>, AppError> {
    let service = state.negotiation_service(auth.token());
    let appointment = service.load_appointment(appointment_id).await?;
    let actor = resolve_actor(&appointment, &user)?;

    Ok(Json(AvailableActionsResponse {
        appointment_id,
        actor,
        status: appointment.status,
        transitions: service.available_transitions(&appointment, actor),
    }))
}

pub async fn confirm_appointment(
    State(state): State<AppointmentState>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let service = state.negotiation_service(auth.token());
    let appointment = service.load_appointment(appointment_id).await?;
    let actor = resolve_actor(&appointment, &user)?;

    let confirmed = service.confirm(&appointment, actor).await?;

    Ok(transition_response(confirmed, "Appointment confirmed"))
}

pub async fn decline_appointment(
    State(state): State<AppointmentState>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<DeclineAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let service = state.negotiation_service(auth.token());
    let appointment = service.load_appointment(appointment_id).await?;
    let actor = resolve_actor(&appointment, &user)?;

    let declined = service.decline(&appointment, actor, &request.reason).await?;

    Ok(transition_response(declined, "Appointment declined"))
}

pub async fn cancel_appointment(
    State(state): State<AppointmentState>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CancelAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let service = state.negotiation_service(auth.token());
    let appointment = service.load_appointment(appointment_id).await?;
    let actor = resolve_actor(&appointment, &user)?;

    let cancelled = service
        .cancel(&appointment, actor, request.reason.as_deref())
        .await?;

    Ok(transition_response(cancelled, "Appointment cancelled"))
}

pub async fn reschedule_appointment(
    State(state): State<AppointmentState>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<RescheduleAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let service = state.negotiation_service(auth.token());
    let appointment = service.load_appointment(appointment_id).await?;
    let actor = resolve_actor(&appointment, &user)?;

    let rescheduled = service
        .reschedule(&appointment, actor, request.from_date_time, request.to_date_time)
        .await?;

    Ok(transition_response(rescheduled, "New time proposed"))
}

pub async fn get_reschedule_suggestion(
    State(state): State<AppointmentState>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<TimeRange>, AppError> {
    let service = state.negotiation_service(auth.token());
    let appointment = service.load_appointment(appointment_id).await?;
    resolve_actor(&appointment, &user)?;

    Ok(Json(service.suggest_reschedule_interval(&appointment)))
}

pub async fn record_visitors(
    State(state): State<AppointmentState>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<RecordVisitorsRequest>,
) -> Result<Json<Value>, AppError> {
    let service = state.negotiation_service(auth.token());
    let appointment = service.load_appointment(appointment_id).await?;
    let actor = resolve_actor(&appointment, &user)?;

    let updated = service
        .record_visitors(
            &appointment,
            actor,
            request.number_of_visitors,
            Local::now().naive_local(),
        )
        .await?;

    Ok(transition_response(updated, "Visitor count recorded"))
}

// ==============================================================================
// UTILITY HANDLERS
// ==============================================================================

pub async fn check_appointment_conflicts(
    State(state): State<AppointmentState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(query): Query<ConflictCheckQuery>,
) -> Result<Json<Value>, AppError> {
    let actor_id = Uuid::parse_str(&user.id)
        .map_err(|_| AppError::BadRequest("User id is not a valid identifier".to_string()))?;
    let candidate = TimeRange::new(query.start, query.end)?;

    let response = state
        .conflict_service(auth.token())
        .check_conflict(candidate, actor_id, query.exclude_appointment_id)
        .await?;

    Ok(Json(json!(response)))
}
