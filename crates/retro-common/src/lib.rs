//! # retro-common
//!
//! Shared types, configuration, error handling, and the role hierarchy used
//! across all Retro crates. No I/O lives here: the RBAC evaluator is a set of
//! pure functions over role snapshots.

pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod rbac;
pub mod snowflake;
pub mod validation;
