//! Configuration Module
//!
//! Configuration loading for the chart service.

mod settings;

pub use settings::{ConfigError, GeneratorSettings, ServerSettings, ServiceConfig, StreamSettings};
