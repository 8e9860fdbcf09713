//! # Visit Tracker
//!
//! Backend for caregiver home visits: schedules with tasks, a clock-in /
//! clock-out lifecycle, and caller-relative queries that are evaluated in the
//! caller's local timezone.
//!
//! ## Architecture
//!
//! - [`models`]: Schedules, tasks, identities and timezone helpers
//! - [`db`]: Repository traits with in-memory and PostgreSQL backends
//! - [`services`]: Visit lifecycle, missed reconciliation, admin and task rules
//! - [`config`]: TOML configuration with environment overrides
//! - `auth`: JWT verification into a [`models::Caller`] (feature `http-server`)
//! - `http`: Axum REST API (feature `http-server`)
//!
//! Instants are stored in UTC. Conversion to the caller's zone happens only
//! when a read projection is built.

// Allow large error types - RepositoryError contains rich context for debugging
#![allow(clippy::result_large_err)]

pub mod config;
pub mod db;
pub mod models;
pub mod services;

#[cfg(feature = "http-server")]
pub mod auth;
#[cfg(feature = "http-server")]
pub mod http;
