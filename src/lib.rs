// ImageBatch - Parameterized batch processing driver for bio-image analysis
// workflows.
//
// This is the library crate containing the driver, models, and configuration
// handling. The binary crate (main.rs) provides the command-line entry point.

pub mod cli;
pub mod config;
pub mod logging;
pub mod models;
pub mod services;

// Re-export commonly used types for convenience
pub use config::ConfigManager;
pub use models::{OpenerTable, ParametersRecord, RunConfig, RunMode};
pub use services::{RunReport, run};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
