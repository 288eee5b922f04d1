//! Domain types for the virtual try-on workflow.
//!
//! Pure data and state-machine logic with no network access: garment
//! categories, job statuses, image selection and previews, polling
//! policy, and the per-session state machine driven by the client and
//! API crates.

pub mod category;
pub mod error;
pub mod job_status;
pub mod polling;
pub mod preview;
pub mod selection;
pub mod session;
pub mod types;
