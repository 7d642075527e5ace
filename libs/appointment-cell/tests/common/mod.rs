#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use uuid::Uuid;

use appointment_cell::models::{Appointment, AppointmentStatus, Party};

pub fn at(hour: u32, minute: u32) -> NaiveDateTime {
    on(2024, 6, 1, hour, minute)
}

pub fn on(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(year, month, day)
        .unwrap()
        .and_hms_opt(hour, minute, 0)
        .unwrap()
}

/// Builder for appointments in a known state.
pub struct AppointmentFixture {
    appointment: Appointment,
}

impl AppointmentFixture {
    pub fn new(broker_id: Uuid, client_id: Uuid) -> Self {
        Self {
            appointment: Appointment {
                appointment_id: Uuid::new_v4(),
                title: "private_showing".to_string(),
                broker_id,
                client_id,
                broker_name: Some("Dana Broker".to_string()),
                client_name: Some("Sam Client".to_string()),
                from_date_time: at(10, 0),
                to_date_time: at(11, 0),
                status: AppointmentStatus::Proposed,
                initiated_by: Party::Broker,
                cancelled_by: None,
                refusal_reason: None,
                cancellation_reason: None,
                number_of_visitors: None,
                location: Some("12 Harbour Street".to_string()),
                notes: None,
                version: 0,
            },
        }
    }

    pub fn between(mut self, from: NaiveDateTime, to: NaiveDateTime) -> Self {
        self.appointment.from_date_time = from;
        self.appointment.to_date_time = to;
        self
    }

    pub fn title(mut self, title: &str) -> Self {
        self.appointment.title = title.to_string();
        self
    }

    pub fn initiated_by(mut self, party: Party) -> Self {
        self.appointment.initiated_by = party;
        self
    }

    pub fn confirmed(mut self) -> Self {
        self.appointment.status = AppointmentStatus::Confirmed;
        self
    }

    pub fn declined(mut self, reason: &str) -> Self {
        self.appointment.status = AppointmentStatus::Declined;
        self.appointment.refusal_reason = Some(reason.to_string());
        self
    }

    pub fn cancelled_by(mut self, party: Party, reason: Option<&str>) -> Self {
        self.appointment.status = AppointmentStatus::Cancelled;
        self.appointment.cancelled_by = Some(party);
        self.appointment.cancellation_reason = reason.map(str::to_string);
        self
    }

    /// A valid appointment in `status`, with whatever terminal fields that status needs.
    pub fn in_status(self, status: AppointmentStatus, canceller: Party) -> Self {
        match status {
            AppointmentStatus::Proposed => self,
            AppointmentStatus::Confirmed => self.confirmed(),
            AppointmentStatus::Declined => self.declined("Not available"),
            AppointmentStatus::Cancelled => self.cancelled_by(canceller, Some("Changed plans")),
        }
    }

    pub fn build(self) -> Appointment {
        self.appointment
    }
}
