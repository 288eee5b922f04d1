//! HTTP clients and workflow for the virtual try-on services.
//!
//! Wraps the image host (upload) and the try-on service (job submission
//! and status) using [`reqwest`], polls jobs to a terminal status, and
//! drives the full upload -> submit -> poll workflow while broadcasting
//! progress events.

pub mod api;
pub mod config;
pub mod events;
pub mod messages;
pub mod poller;
pub mod upload;
pub mod workflow;
