//! Shared models, storage and services for the staffing backend.

pub mod api;
pub mod db;
pub mod logging;
pub mod service;
pub mod validation;

pub use service::{ServiceError, Staffing, StaffingOptions};
