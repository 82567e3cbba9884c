//! Cycle time CLI library.
//!
//! This crate provides the CLI interface for the cycle time estimator.

mod cli;
pub mod commands;
mod config;

pub use cli::{Cli, Commands, MethodArg};
pub use config::Config;
