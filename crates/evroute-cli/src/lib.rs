//! EV route CLI - plan trips against a running server or fully offline.
//!
//! - [`client`]: thin HTTP client for `POST /v1/trips/plan`
//! - [`render`]: human-readable trip summaries

pub mod client;
pub mod render;

pub use client::{PlanOutcome, PlanTripBody, PlannerClient};
