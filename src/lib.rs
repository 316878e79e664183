//! scriptdeploy: Script Deployment Reconciliation
//!
//! Keeps a catalog of live scripts in line with files published in a
//! versioned source repository. Every pass classifies each tracked file by
//! comparing the adopted (`current`) and newest (`top`) snapshots with the
//! live objects, and an adjustment brings the live side up to date.

pub mod adjust;
pub mod autoload;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod diff;
pub mod error;
pub mod instance;
pub mod keywords;
pub mod location;
pub mod lock;
pub mod logging;
pub mod manifest;
pub mod reconcile;
pub mod schedule;
pub mod snapshot;
pub mod tracked;
pub mod types;
