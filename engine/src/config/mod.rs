//! Configuration module for the navigation engine
//!
//! Layered configuration, lowest precedence first:
//! 1. Defaults (from code)
//! 2. Config file (starnav.toml)
//! 3. Environment variables (STARNAV_* prefix, `__` for nesting)
//!
//! # Example
//!
//! ```no_run
//! use starnav_engine::config::ConfigLoader;
//!
//! let config = ConfigLoader::load_default()?;
//! let config = ConfigLoader::new().with_file("./starnav.toml").load()?;
//! # Ok::<(), starnav_engine::config::ConfigError>(())
//! ```

pub mod error;
pub mod loader;

pub use error::{ConfigError, Result};
pub use loader::{ConfigLoader, EngineConfig, LoggingConfig, NavigationConfig, ToolsConfig};
