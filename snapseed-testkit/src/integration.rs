//! Integration tests for full seed → act → assert workflows.
//!
//! These tests drive the harness against the in-memory store with fixture
//! files written to temp directories, the way a component test would.
