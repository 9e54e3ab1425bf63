//! Truck life-cycle inventory: activity registry, technology matrix,
//! linear solver and impact aggregation

pub mod model;
pub mod repository;
pub mod service;
