//! Integration tests for Sumi-Harvest
//!
//! These tests use wiremock to create mock HTTP servers and exercise the
//! HTTP transport and full harvest runs end-to-end.

mod harvest;
mod http_transport;
