//! Integration tests for licitace-watch
//!
//! These tests use wiremock to stand in for the listing page and the mail
//! API and run complete watch cycles end-to-end.

mod fetch_tests;
mod watch_tests;
