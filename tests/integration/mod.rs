//! Integration tests for scriptdeploy

pub mod test_utils;

mod catalog_persistence;
mod cli_binary;
mod config_layering;
mod deploy_cycle;
mod relocation;

pub use test_utils::*;
