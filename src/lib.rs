//! Consent Desktop Library
//!
//! Main library crate that re-exports all modules.

pub mod commands;
pub mod config;
pub mod consent;
pub mod notifier;
pub mod storage;
pub mod tray;
pub mod window_manager;
