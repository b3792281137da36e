//! Core types for duopane.
//!
//! This crate provides the configuration and error types shared by the
//! file-operation engine and its front ends.

mod config;
mod error;

pub use config::{
    DEFAULT_BACKUP_BUDGET, DEFAULT_BACKUP_SIZE_LIMIT, EngineConfig, EngineConfigBuilder,
};
pub use error::{OpError, ValidationError, is_system_location};
