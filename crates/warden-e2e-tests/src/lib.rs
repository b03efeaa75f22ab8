//! End-to-end tests for Warden.
//!
//! These tests exercise the full stack through [`warden_core::Core`]:
//! - Wrapped and unwrapped secret-id issuance
//! - Single-use unwrap and secret-id exhaustion under concurrency
//! - Policy evaluation across attached policies and mounts
//! - State surviving a restart over a data directory

#![cfg(test)]
