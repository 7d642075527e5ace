pub mod conflict;
pub mod lifecycle;
pub mod negotiation;
pub mod planner;
pub mod repository;
pub mod time_range;
