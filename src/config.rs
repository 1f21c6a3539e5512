//! Service configuration module.
//!
//! Handles loading, validating, and overriding the service configuration.
//! Stock defaults reproduce the historical behavior (listen on
//! `localhost:3001`, cap photos at 500px wide, shell out to `ffmpeg`), so the
//! service runs with no config file at all.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [server]
//! address = "localhost:3001"  # host:port to listen on
//! read_buffer_size = 1024     # bytes read for the single request
//! shutdown_grace_secs = 5     # how long in-flight requests may finish
//!
//! [resize]
//! max_resolution = 500        # photos wider than this are downscaled
//! undersized = "skip"         # "skip" or "copy" for photos already small enough
//!
//! [tool]
//! program = "ffmpeg"          # resize tool, looked up on PATH
//! global_args = []            # inserted before `-i`
//! ```
//!
//! ## Override Order
//!
//! Later layers win:
//!
//! 1. stock defaults
//! 2. the file passed with `--config`
//! 3. the `IMGPROC_ADDR` environment variable (listen address only)
//! 4. command-line flags (`--addr`, `--max-resolution`, `--tool`)
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Environment variable that overrides `server.address`.
pub const ADDRESS_ENV: &str = "IMGPROC_ADDR";

/// Largest accepted `server.read_buffer_size`.
pub const MAX_READ_BUFFER: usize = 64 * 1024;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Service configuration loaded from a TOML file.
///
/// All fields have defaults. Config files need only specify the values they
/// want to override. Unknown keys are rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceConfig {
    /// Listener and connection settings.
    pub server: ServerConfig,
    /// Downscale policy.
    pub resize: ResizeConfig,
    /// External resize tool invocation.
    pub tool: ToolConfig,
}

impl ServiceConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.address.trim().is_empty() {
            return Err(ConfigError::Validation(
                "server.address must not be empty".into(),
            ));
        }
        if self.server.read_buffer_size == 0 || self.server.read_buffer_size > MAX_READ_BUFFER {
            return Err(ConfigError::Validation(format!(
                "server.read_buffer_size must be 1-{MAX_READ_BUFFER}"
            )));
        }
        if self.resize.max_resolution == 0 {
            return Err(ConfigError::Validation(
                "resize.max_resolution must be greater than zero".into(),
            ));
        }
        if self.tool.program.trim().is_empty() {
            return Err(ConfigError::Validation(
                "tool.program must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// Apply environment overrides using `lookup` to read variables.
    ///
    /// Takes a lookup function rather than reading the process environment
    /// directly so callers (and tests) control the source.
    pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(address) = lookup(ADDRESS_ENV).filter(|a| !a.trim().is_empty()) {
            self.server.address = address;
        }
        self
    }
}

/// Listener and connection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// `host:port` to bind.
    pub address: String,
    /// Size of the single read that frames a request.
    pub read_buffer_size: usize,
    /// Seconds in-flight connections get to finish after a shutdown signal.
    pub shutdown_grace_secs: u64,
}

impl ServerConfig {
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: "localhost:3001".to_string(),
            read_buffer_size: 1024,
            shutdown_grace_secs: 5,
        }
    }
}

/// What to do with a photo that is already within the maximum resolution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UndersizedPolicy {
    /// Respond `OK` without writing a destination file.
    #[default]
    Skip,
    /// Copy the source unchanged to the destination, then respond `OK`.
    Copy,
}

/// Downscale policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResizeConfig {
    /// Maximum width in pixels; wider photos are downscaled to exactly this width.
    pub max_resolution: u32,
    /// Handling of photos that are already narrow enough.
    pub undersized: UndersizedPolicy,
}

impl Default for ResizeConfig {
    fn default() -> Self {
        Self {
            max_resolution: 500,
            undersized: UndersizedPolicy::Skip,
        }
    }
}

/// External resize tool invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolConfig {
    /// Program name or path.
    pub program: String,
    /// Extra arguments placed before `-i`.
    pub global_args: Vec<String>,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            program: "ffmpeg".to_string(),
            global_args: Vec::new(),
        }
    }
}

// =============================================================================
// Config loading and validation
// =============================================================================

/// Parse a config document, filling unspecified keys from the stock defaults.
pub fn parse_config(content: &str) -> Result<ServiceConfig, ConfigError> {
    let config: ServiceConfig = toml::from_str(content)?;
    config.validate()?;
    Ok(config)
}

/// Load and validate the config file at `path`.
///
/// Unlike an implicit lookup, an explicitly named file must exist.
pub fn load_config(path: &Path) -> Result<ServiceConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Returns a fully-commented stock config file with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# imgproc Configuration
# =====================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# The listen address can also be set with the IMGPROC_ADDR environment
# variable or the --addr flag; the flag wins.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Listener
# ---------------------------------------------------------------------------
[server]
# host:port to listen on.
address = "localhost:3001"

# A request is framed by a single read of at most this many bytes.
# Requests longer than this are truncated (a known protocol limitation).
read_buffer_size = 1024

# Seconds in-flight requests may keep running after SIGINT/SIGTERM.
shutdown_grace_secs = 5

# ---------------------------------------------------------------------------
# Downscale policy
# ---------------------------------------------------------------------------
[resize]
# Photos wider than this many pixels are scaled down to exactly this width,
# keeping their aspect ratio.
max_resolution = 500

# Photos already within max_resolution:
#   "skip" - answer OK and write nothing
#   "copy" - copy the source unchanged to the destination
undersized = "skip"

# ---------------------------------------------------------------------------
# Resize tool
# ---------------------------------------------------------------------------
[tool]
# Invoked as: <program> [global_args...] -i <source> -s <W>x<H> <destination>
program = "ffmpeg"

# For ffmpeg, ["-y"] overwrites existing destinations and
# ["-loglevel", "error"] trims the stderr noise.
global_args = []
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_matches_historical_service() {
        let config = ServiceConfig::default();
        assert_eq!(config.server.address, "localhost:3001");
        assert_eq!(config.server.read_buffer_size, 1024);
        assert_eq!(config.resize.max_resolution, 500);
        assert_eq!(config.resize.undersized, UndersizedPolicy::Skip);
        assert_eq!(config.tool.program, "ffmpeg");
        assert!(config.tool.global_args.is_empty());
    }

    #[test]
    fn default_config_is_valid() {
        assert!(ServiceConfig::default().validate().is_ok());
    }

    #[test]
    fn parse_partial_config() {
        let config = parse_config(
            r#"
[resize]
max_resolution = 1200
"#,
        )
        .unwrap();
        // Overridden value
        assert_eq!(config.resize.max_resolution, 1200);
        // Default values preserved
        assert_eq!(config.resize.undersized, UndersizedPolicy::Skip);
        assert_eq!(config.server.address, "localhost:3001");
    }

    #[test]
    fn parse_copy_policy_and_tool_args() {
        let config = parse_config(
            r#"
[resize]
undersized = "copy"

[tool]
program = "/usr/local/bin/ffmpeg"
global_args = ["-y", "-loglevel", "error"]
"#,
        )
        .unwrap();
        assert_eq!(config.resize.undersized, UndersizedPolicy::Copy);
        assert_eq!(config.tool.program, "/usr/local/bin/ffmpeg");
        assert_eq!(config.tool.global_args, vec!["-y", "-loglevel", "error"]);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let result = parse_config(
            r#"
[server]
adress = "0.0.0.0:3001"
"#,
        );
        assert!(matches!(result, Err(ConfigError::Toml(_))));
    }

    #[test]
    fn unknown_policy_is_rejected() {
        let result = parse_config(
            r#"
[resize]
undersized = "upscale"
"#,
        );
        assert!(matches!(result, Err(ConfigError::Toml(_))));
    }

    #[test]
    fn zero_max_resolution_fails_validation() {
        let result = parse_config("[resize]\nmax_resolution = 0\n");
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn oversized_read_buffer_fails_validation() {
        let result = parse_config("[server]\nread_buffer_size = 1048576\n");
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn empty_program_fails_validation() {
        let result = parse_config("[tool]\nprogram = \"  \"\n");
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn shutdown_grace_converts_to_duration() {
        let config = parse_config("[server]\nshutdown_grace_secs = 12\n").unwrap();
        assert_eq!(config.server.shutdown_grace(), Duration::from_secs(12));
    }

    // =========================================================================
    // Overrides
    // =========================================================================

    #[test]
    fn env_override_replaces_address() {
        let config = ServiceConfig::default().with_env_overrides(|key| {
            (key == ADDRESS_ENV).then(|| "0.0.0.0:4001".to_string())
        });
        assert_eq!(config.server.address, "0.0.0.0:4001");
    }

    #[test]
    fn blank_env_override_is_ignored() {
        let config =
            ServiceConfig::default().with_env_overrides(|_| Some("   ".to_string()));
        assert_eq!(config.server.address, "localhost:3001");
    }

    #[test]
    fn missing_env_leaves_config_untouched() {
        let config = ServiceConfig::default().with_env_overrides(|_| None);
        assert_eq!(config, ServiceConfig::default());
    }

    // =========================================================================
    // File loading
    // =========================================================================

    #[test]
    fn load_config_reads_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("imgproc.toml");
        fs::write(&path, "[server]\naddress = \"127.0.0.1:9000\"\n").unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.server.address, "127.0.0.1:9000");
        assert_eq!(config.resize.max_resolution, 500);
    }

    #[test]
    fn load_config_missing_file_is_error() {
        let tmp = TempDir::new().unwrap();
        let result = load_config(&tmp.path().join("absent.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn load_config_invalid_toml_is_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("imgproc.toml");
        fs::write(&path, "this is not valid toml [[[").unwrap();
        assert!(matches!(load_config(&path), Err(ConfigError::Toml(_))));
    }

    // =========================================================================
    // Stock config
    // =========================================================================

    #[test]
    fn stock_config_parses_to_defaults() {
        let config = parse_config(stock_config_toml()).unwrap();
        assert_eq!(config, ServiceConfig::default());
    }
}
