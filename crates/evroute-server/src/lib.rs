//! Shared library surface for the trip planning server and its tests.

pub mod api;
pub mod config;
pub mod state;
pub mod trip_planner;
