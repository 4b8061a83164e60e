//! Routing control plane service library crate.
//!
//! # Purpose
//! Exposes the HTTP API surface, the resolver and mutator cores, the adapter
//! implementations (record store, cache, event log, audit store), consumers,
//! and configuration for use by the binaries and tests.
//!
//! # Notes
//! Module boundaries mirror the subsystems: adapters own classification of
//! their own failures, the service layer branches only on classified kinds.
pub mod api;
pub mod app;
pub mod audit;
pub mod cache;
pub mod config;
pub mod consumers;
pub mod correlation;
pub mod error;
pub mod events;
pub mod model;
pub mod observability;
pub mod resilience;
pub mod service;
pub mod store;
