//! # Configuration Management
//!
//! Settings are read once at startup and handed to [`crate::context::AppContext`].

pub mod settings;

pub use settings::{ConfigError, Settings, DEFAULT_BASE_URL, ENV_PREFIX};
