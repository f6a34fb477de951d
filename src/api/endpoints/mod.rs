//! API endpoint handlers.
//!
//! Each module groups the routes of one resource. Handlers do no work of
//! their own: they hand a closure to `CoreState::run_db` and envelope the
//! store result.

pub mod admin;
pub mod appointments;
pub mod auth;
pub mod catalog;
pub mod clinical;
pub mod doctors;
pub mod equipment;
pub mod feedback;
pub mod health;
pub mod patients;
