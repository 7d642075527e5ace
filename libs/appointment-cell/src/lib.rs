// Appointment Cell - broker/client appointment negotiation
pub mod handlers;
pub mod models;
pub mod router;
pub mod services;
pub mod state;

pub use models::{
    Appointment, AppointmentMutation, AppointmentStatus, NegotiationError, Party, TimeRange,
    Transition,
};

pub use router::appointment_routes;
pub use state::AppointmentState;

pub mod api {
    pub use crate::services::conflict::{has_conflict, ConflictDetectionService};
    pub use crate::services::lifecycle::AppointmentLifecycleService;
    pub use crate::services::negotiation::{NegotiationEngine, NegotiationService};
    pub use crate::services::planner::{BusinessHours, ReschedulePlanner};
    pub use crate::services::repository::{
        AppointmentRepository, InMemoryAppointmentRepository, SupabaseAppointmentRepository,
    };
    pub use crate::services::time_range::overlaps;
}
