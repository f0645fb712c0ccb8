//! Relay logic, services, and repository trait definitions for Coachline.
//!
//! This crate defines the "ports" (repository traits) that the infrastructure
//! layer implements. It depends only on `coachline-types` -- never on
//! `coachline-infra` or any database/IO crate.

pub mod relay;
pub mod repository;
pub mod service;

#[cfg(test)]
pub(crate) mod test_support;
