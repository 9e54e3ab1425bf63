//! Application service layer - use cases, config, reference data access

pub mod app;
pub mod config;
pub mod repository;
