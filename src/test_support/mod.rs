//! Shared helpers for unit tests.

pub mod scripted_engine;
pub mod socket_guard;
