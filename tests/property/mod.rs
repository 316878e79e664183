//! Property-based tests for ordering and reconciliation guarantees

mod ordering;
mod reconcile_idempotence;
