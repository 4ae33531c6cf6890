//! End-to-end tests for the request pipeline
//!
//! These tests stand up wiremock servers as the marketplace and drive the
//! coordinator the way a caller would.

mod common;
mod pipeline_tests;
mod proxy_tests;
