//! brewbee — brewing telemetry service publishing over MQTT
//!
//! This crate is a template for a small telemetry microservice: it loads its
//! configuration from environment variables, connects to an MQTT broker and
//! periodically publishes a service heartbeat plus a synthetic temperature
//! sample. It is designed for long-running operation with graceful shutdown
//! and configurable logging.
//!
//! ## Modules
//!
//! * `config` — Configuration snapshot loaded from `brewbee_*` environment
//!   variables, validated with the `validator` crate, passed explicitly to
//!   every consumer.
//!
//! * `core` — Core runtime components:
//!   - Scoped background task lifecycle ([`core::task::TaskGuard`])
//!   - Periodic telemetry loop ([`core::emitter::Emitter`])
//!   - Published message payloads
//!
//! * `logger` — Centralized logging initialization using `tracing`, with
//!   console output in multiple formats and optional systemd journald
//!   integration.
//!
//! The broker connection itself lives in the `brewbee-mqtt` crate.

pub mod config;
pub mod core;
pub mod logger;
