//! Integration tests entry point
//!
//! Includes all integration test modules from the integration/ subdirectory.

mod integration;
