// Shared test fixtures and utilities for integration tests
//
// This module provides:
// - Configuration fixtures (configs.rs)
// - Admin/bulk mock response data (responses.rs)
// - Test helper functions (helpers.rs)
#![allow(dead_code)]

pub mod configs;
pub mod helpers;
pub mod responses;
