//! Visitgen - populate an analytics site with deterministic synthetic visits
//!
//! Test-data fixture generator: drives the tracking HTTP API with a repeatable
//! sequence of visits, e-commerce orders and bulk batches so reporting code
//! can be tested against known totals.
pub mod admin;
pub mod config;
pub mod fixture;
pub mod location;
pub mod tracker;
pub mod types;
