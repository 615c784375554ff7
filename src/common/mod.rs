// Common utilities shared across the application

pub mod constants;
pub mod error;
