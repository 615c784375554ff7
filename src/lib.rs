pub mod common;
pub mod config;
pub mod logging;
pub mod pipeline;
pub mod server;
