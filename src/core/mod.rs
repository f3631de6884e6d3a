pub mod cache;
pub mod config;
pub mod errors;
pub mod expander;
pub mod kernel;
pub mod types;
