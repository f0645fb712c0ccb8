//! Observability setup for Coachline: structured logging with optional
//! OpenTelemetry span export.

pub mod tracing_setup;
