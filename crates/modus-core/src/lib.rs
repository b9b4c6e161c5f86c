//! # modus-core
//!
//! Core types, traits, configuration, and error handling for Modus.

pub mod classifier;
pub mod config;
pub mod context;
pub mod error;
pub mod message;
pub mod mode;
pub mod traits;
