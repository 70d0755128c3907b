use crate::config::error::{ConfigError, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Upper bound for any capacity setting.
const MAX_CAPACITY: usize = 100_000;

/// Root configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NavigationConfig {
    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub tools: ToolsConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Engine bookkeeping limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Decision records kept per conversation (oldest dropped first)
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,

    /// Retired sessions remembered so late calls get `session_closed`
    #[serde(default = "default_retired_session_capacity")]
    pub retired_session_capacity: usize,
}

/// Tool-name resolution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Namespace prefixes stripped from incoming tool names
    #[serde(default = "default_strip_prefixes")]
    pub strip_prefixes: Vec<String>,

    /// Tool names treated as the flight-config entry marker
    #[serde(default = "default_flight_entry")]
    pub flight_entry: Vec<String>,

    /// Required ending for flight-config names; empty disables the check
    #[serde(default = "default_flight_config_suffix")]
    pub flight_config_suffix: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive used when RUST_LOG is unset
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

fn default_history_capacity() -> usize {
    256
}
fn default_retired_session_capacity() -> usize {
    crate::stack::DEFAULT_RETIRED_CAPACITY
}
fn default_strip_prefixes() -> Vec<String> {
    vec!["mcp__starlog__".to_string(), "mcp__starship__".to_string()]
}
fn default_flight_entry() -> Vec<String> {
    vec!["start".to_string(), "start_flight_config".to_string()]
}
fn default_flight_config_suffix() -> String {
    "_flight_config".to_string()
}
fn default_log_filter() -> String {
    "info".to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            history_capacity: default_history_capacity(),
            retired_session_capacity: default_retired_session_capacity(),
        }
    }
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            strip_prefixes: default_strip_prefixes(),
            flight_entry: default_flight_entry(),
            flight_config_suffix: default_flight_config_suffix(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

impl NavigationConfig {
    /// Check value ranges and name collisions, collecting every problem.
    pub fn validate(&self) -> Result<()> {
        let mut problems = Vec::new();

        for (field, value) in [
            ("engine.history_capacity", self.engine.history_capacity),
            (
                "engine.retired_session_capacity",
                self.engine.retired_session_capacity,
            ),
        ] {
            if !(1..=MAX_CAPACITY).contains(&value) {
                problems.push(format!("{field} must be in 1..={MAX_CAPACITY}, got {value}"));
            }
        }

        if self.tools.strip_prefixes.iter().any(String::is_empty) {
            problems.push("tools.strip_prefixes must not contain empty prefixes".to_string());
        }

        if self.tools.flight_entry.is_empty() {
            problems.push("tools.flight_entry must name at least one tool".to_string());
        }
        for name in &self.tools.flight_entry {
            if name.is_empty() {
                problems.push("tools.flight_entry must not contain empty names".to_string());
            } else if crate::operation::Operation::from_gated_name(name).is_some() {
                problems.push(format!(
                    "tools.flight_entry entry `{name}` shadows a gated operation"
                ));
            }
        }

        if self
            .tools
            .flight_config_suffix
            .chars()
            .any(char::is_whitespace)
        {
            problems.push("tools.flight_config_suffix must not contain whitespace".to_string());
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid { problems })
        }
    }
}

/// Configuration loader with layered merging support
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self { config_path: None }
    }

    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Load configuration with layered merging:
    /// 1. Start with defaults (from Default implementations)
    /// 2. Merge config file if provided
    /// 3. Override with environment variables (STARNAV_ prefix)
    pub fn load(&self) -> Result<NavigationConfig> {
        let mut builder = Config::builder();

        let defaults_json =
            serde_json::to_string(&NavigationConfig::default()).map_err(ConfigError::Defaults)?;
        builder = builder.add_source(config::File::from_str(
            &defaults_json,
            config::FileFormat::Json,
        ));

        if let Some(ref path) = self.config_path {
            if path.exists() {
                builder = builder.add_source(File::from(path.as_ref()));
            } else {
                return Err(ConfigError::FileNotFound(path.clone()));
            }
        }

        // Example: STARNAV_ENGINE__HISTORY_CAPACITY=32
        // Lists are comma separated, but only for the list-typed keys.
        builder = builder.add_source(
            Environment::with_prefix("STARNAV")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("tools.strip_prefixes")
                .with_list_parse_key("tools.flight_entry"),
        );

        let config = builder.build().map_err(ConfigError::Merge)?;
        let nav_config: NavigationConfig =
            config.try_deserialize().map_err(ConfigError::Shape)?;
        nav_config.validate()?;

        Ok(nav_config)
    }

    /// Locate the default config file in standard locations:
    /// 1. Current directory: ./starnav.toml
    /// 2. XDG config: ~/.config/starnav/config.toml
    /// 3. Home directory: ~/.starnav.toml
    pub fn find_config_file() -> Option<PathBuf> {
        let cwd_config = PathBuf::from("./starnav.toml");
        if cwd_config.exists() {
            return Some(cwd_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let xdg_config = config_dir.join("starnav").join("config.toml");
            if xdg_config.exists() {
                return Some(xdg_config);
            }
        }

        if let Some(home_dir) = dirs::home_dir() {
            let home_config = home_dir.join(".starnav.toml");
            if home_config.exists() {
                return Some(home_config);
            }
        }

        None
    }

    pub fn load_default() -> Result<NavigationConfig> {
        let loader = match Self::find_config_file() {
            Some(config_path) => ConfigLoader::new().with_file(config_path),
            None => ConfigLoader::new(),
        };

        loader.load()
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
