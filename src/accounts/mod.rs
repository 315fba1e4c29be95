//! Account domain: entity, configuration, error taxonomy, and the action
//! orchestrators.

pub mod config;
pub mod error;
pub mod models;
pub mod service;
