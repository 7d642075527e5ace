// libs/appointment-cell/tests/supabase_repository_test.rs
use std::sync::Arc;

use assert_matches::assert_matches;
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use appointment_cell::api::{AppointmentRepository, NegotiationEngine, SupabaseAppointmentRepository};
use appointment_cell::models::{Appointment, AppointmentStatus, NegotiationError, Party};
use shared_database::supabase::SupabaseClient;
use shared_utils::test_utils::{MockSupabaseResponses, TestConfig};

struct TestSetup {
    mock_server: MockServer,
    repository: SupabaseAppointmentRepository,
    appointment_id: Uuid,
    broker_id: Uuid,
    client_id: Uuid,
}

impl TestSetup {
    async fn new() -> Self {
        let mock_server = MockServer::start().await;
        let config = TestConfig::with_supabase_url(&mock_server.uri()).to_app_config();
        let repository = SupabaseAppointmentRepository::with_client(
            Arc::new(SupabaseClient::new(&config)),
            Some("test-token".to_string()),
        );

        Self {
            mock_server,
            repository,
            appointment_id: Uuid::new_v4(),
            broker_id: Uuid::new_v4(),
            client_id: Uuid::new_v4(),
        }
    }

    fn row(&self, status: &str, version: i64) -> serde_json::Value {
        MockSupabaseResponses::appointment_response(
            self.appointment_id,
            self.broker_id,
            self.client_id,
            status,
            "BROKER",
            version,
        )
    }

    async fn mount_load(&self, status: &str, version: i64) {
        Mock::given(method("GET"))
            .and(path("/rest/v1/appointments"))
            .and(query_param("appointment_id", format!("eq.{}", self.appointment_id)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([self.row(status, version)])))
            .mount(&self.mock_server)
            .await;
    }
}

#[tokio::test]
async fn test_load_appointment() {
    let setup = TestSetup::new().await;
    setup.mount_load("PROPOSED", 4).await;

    let appointment = setup
        .repository
        .load_appointment(setup.appointment_id)
        .await
        .unwrap();

    assert_eq!(appointment.status, AppointmentStatus::Proposed);
    assert_eq!(appointment.initiated_by, Party::Broker);
    assert_eq!(appointment.version, 4);
}

#[tokio::test]
async fn test_load_missing_appointment_is_not_found() {
    let setup = TestSetup::new().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&setup.mock_server)
        .await;

    let result = setup.repository.load_appointment(setup.appointment_id).await;

    assert_matches!(result, Err(NegotiationError::NotFound));
}

#[tokio::test]
async fn test_load_appointments_for_actor_filters_by_either_role() {
    let setup = TestSetup::new().await;
    let excluded = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param(
            "or",
            format!("(broker_id.eq.{0},client_id.eq.{0})", setup.client_id),
        ))
        .and(query_param("appointment_id", format!("neq.{}", excluded)))
        .and(query_param("order", "from_date_time.asc"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([setup.row("CONFIRMED", 1)])),
        )
        .expect(1)
        .mount(&setup.mock_server)
        .await;

    let appointments = setup
        .repository
        .load_appointments_for_actor(setup.client_id, Some(excluded))
        .await
        .unwrap();

    assert_eq!(appointments.len(), 1);
    assert_eq!(appointments[0].status, AppointmentStatus::Confirmed);
}

#[tokio::test]
async fn test_guarded_patch_bumps_version() {
    let setup = TestSetup::new().await;
    let current: Appointment = serde_json::from_value(setup.row("PROPOSED", 2)).unwrap();
    let mutation = NegotiationEngine::new()
        .confirm(&current, Party::Client, &[])
        .unwrap();

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("appointment_id", format!("eq.{}", setup.appointment_id)))
        .and(query_param("version", "eq.2"))
        .and(header("Prefer", "return=representation"))
        .and(body_partial_json(json!({ "status": "CONFIRMED", "version": 3 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([setup.row("CONFIRMED", 3)])))
        .expect(1)
        .mount(&setup.mock_server)
        .await;

    let saved = setup
        .repository
        .save_appointment_transition(setup.appointment_id, 2, &mutation)
        .await
        .unwrap();

    assert_eq!(saved.status, AppointmentStatus::Confirmed);
    assert_eq!(saved.version, 3);
}

#[tokio::test]
async fn test_guarded_patch_on_moved_version_is_stale() {
    let setup = TestSetup::new().await;
    let current: Appointment = serde_json::from_value(setup.row("PROPOSED", 2)).unwrap();
    let mutation = NegotiationEngine::new()
        .decline(&current, Party::Client, "Already bought elsewhere")
        .unwrap();

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("version", "eq.2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&setup.mock_server)
        .await;
    // The other party already confirmed.
    setup.mount_load("CONFIRMED", 3).await;

    let result = setup
        .repository
        .save_appointment_transition(setup.appointment_id, 2, &mutation)
        .await;

    assert_matches!(
        result,
        Err(NegotiationError::StaleState { expected_version: 2, .. })
    );
}

#[tokio::test]
async fn test_refused_patch_at_current_version_is_not_stale() {
    let setup = TestSetup::new().await;
    let current: Appointment = serde_json::from_value(setup.row("PROPOSED", 2)).unwrap();
    let mutation = NegotiationEngine::new()
        .confirm(&current, Party::Client, &[])
        .unwrap();

    // Row policy hides the row from the update, but the version never moved.
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("version", "eq.2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&setup.mock_server)
        .await;
    setup.mount_load("PROPOSED", 2).await;

    let result = setup
        .repository
        .save_appointment_transition(setup.appointment_id, 2, &mutation)
        .await;

    assert_matches!(result, Err(NegotiationError::Database(_)));
}

#[tokio::test]
async fn test_backend_error_maps_to_database_error() {
    let setup = TestSetup::new().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(
            ResponseTemplate::new(500)
                .set_body_json(MockSupabaseResponses::error_response("boom", "XX000")),
        )
        .mount(&setup.mock_server)
        .await;

    let result = setup.repository.load_appointment(setup.appointment_id).await;

    assert_matches!(result, Err(NegotiationError::Database(_)));
}
