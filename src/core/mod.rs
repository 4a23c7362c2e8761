//! Core runtime components: the scoped task lifecycle, the telemetry loop
//! and the message payloads it publishes.

pub mod emitter;
pub mod message;
pub mod task;
