//! Configuration for the plugdesc annotation processor
//!
//! Settings are layered, later layers winning:
//! 1. built-in defaults ([`ProcessorConfig::default`])
//! 2. the user config file ([`user_config_path`], `PLUGDESC_CONFIG` overrides it)
//! 3. the project file `plugdesc.toml` in the project directory
//! 4. command line flags, applied by the binary through [`ConfigOverlay`]

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

/// Name of the per-project configuration file
pub const PROJECT_CONFIG_FILE: &str = "plugdesc.toml";

/// Environment variable overriding the user config location
pub const CONFIG_ENV_VAR: &str = "PLUGDESC_CONFIG";

pub const DEFAULT_MARKER_ANNOTATION: &str = "com.velocitypowered.api.plugin.Plugin";
pub const DEFAULT_DEPENDENCY_ANNOTATION: &str = "com.velocitypowered.api.plugin.Dependency";
pub const DEFAULT_DESCRIPTOR_FILE: &str = "velocity-plugin.json";
pub const DEFAULT_MAX_ROUNDS: usize = 10;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Unknown config key '{0}'")]
    UnknownKey(String),

    #[error("Invalid value '{value}' for '{key}': {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },
}

/// Which compiler model the processor reads declarations from
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum BackendChoice {
    /// Declaration-based model over Java sources
    #[default]
    Java,
    /// Symbol-resolution model over Kotlin sources
    Kotlin,
}

impl BackendChoice {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendChoice::Java => "java",
            BackendChoice::Kotlin => "kotlin",
        }
    }
}

impl fmt::Display for BackendChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendChoice {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "java" | "javac" => Ok(BackendChoice::Java),
            "kotlin" | "ksp" => Ok(BackendChoice::Kotlin),
            other => Err(ConfigError::InvalidValue {
                key: "backend".to_string(),
                value: other.to_string(),
                reason: "expected 'java' or 'kotlin'".to_string(),
            }),
        }
    }
}

/// Effective processor settings
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default, rename_all = "kebab-case")]
pub struct ProcessorConfig {
    /// Qualified name of the marker annotation
    pub marker_annotation: String,
    /// Qualified name of the nested dependency annotation
    pub dependency_annotation: String,
    /// File name of the emitted descriptor, extension included
    pub descriptor_file: String,
    /// Plugin ids no plugin may claim
    pub reserved_ids: Vec<String>,
    /// Library packages whose wildcard imports may supply types that no
    /// source file declares
    pub library_packages: Vec<String>,
    pub backend: BackendChoice,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
    /// Upper bound on processing rounds driven by the host
    pub max_rounds: usize,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        ProcessorConfig {
            marker_annotation: DEFAULT_MARKER_ANNOTATION.to_string(),
            dependency_annotation: DEFAULT_DEPENDENCY_ANNOTATION.to_string(),
            descriptor_file: DEFAULT_DESCRIPTOR_FILE.to_string(),
            reserved_ids: vec!["velocity".to_string()],
            library_packages: Vec::new(),
            backend: BackendChoice::Java,
            output_dir: None,
            max_rounds: DEFAULT_MAX_ROUNDS,
        }
    }
}

/// A partial set of settings, as found in one config layer
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct ConfigOverlay {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marker_annotation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dependency_annotation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub descriptor_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reserved_ids: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub library_packages: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend: Option<BackendChoice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_rounds: Option<usize>,
}

impl ConfigOverlay {
    /// Read an overlay from disk; a missing file is an empty overlay
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!("No config file at {:?}", path);
            return Ok(ConfigOverlay::default());
        }

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn is_empty(&self) -> bool {
        self == &ConfigOverlay::default()
    }

    /// Set a single key from its textual form, as used by `config set`-style flags
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        match key {
            "marker-annotation" => self.marker_annotation = Some(value.to_string()),
            "dependency-annotation" => self.dependency_annotation = Some(value.to_string()),
            "descriptor-file" => self.descriptor_file = Some(value.to_string()),
            "reserved-ids" => self.reserved_ids = Some(split_list(value)),
            "library-packages" => self.library_packages = Some(split_list(value)),
            "backend" => self.backend = Some(value.parse()?),
            "output-dir" => self.output_dir = Some(PathBuf::from(value)),
            "max-rounds" => {
                let rounds = value.parse().map_err(|_| ConfigError::InvalidValue {
                    key: key.to_string(),
                    value: value.to_string(),
                    reason: "expected a positive integer".to_string(),
                })?;
                self.max_rounds = Some(rounds);
            }
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        }
        Ok(())
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

impl ProcessorConfig {
    /// Apply an overlay on top of these settings
    pub fn merged(mut self, overlay: ConfigOverlay) -> Self {
        if let Some(v) = overlay.marker_annotation {
            self.marker_annotation = v;
        }
        if let Some(v) = overlay.dependency_annotation {
            self.dependency_annotation = v;
        }
        if let Some(v) = overlay.descriptor_file {
            self.descriptor_file = v;
        }
        if let Some(v) = overlay.reserved_ids {
            self.reserved_ids = v;
        }
        if let Some(v) = overlay.library_packages {
            self.library_packages = v;
        }
        if let Some(v) = overlay.backend {
            self.backend = v;
        }
        if let Some(v) = overlay.output_dir {
            self.output_dir = Some(v);
        }
        if let Some(v) = overlay.max_rounds {
            self.max_rounds = v;
        }
        self
    }

    /// Defaults, then the user config, then `plugdesc.toml` in `project_dir`
    pub fn load(project_dir: &Path) -> Result<Self, ConfigError> {
        let mut config = ProcessorConfig::default();

        if let Some(user_path) = user_config_path() {
            config = config.merged(ConfigOverlay::load_from_path(&user_path)?);
        }

        let project_path = project_dir.join(PROJECT_CONFIG_FILE);
        config = config.merged(ConfigOverlay::load_from_path(&project_path)?);

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_rounds == 0 {
            return Err(ConfigError::InvalidValue {
                key: "max-rounds".to_string(),
                value: "0".to_string(),
                reason: "at least one round is required".to_string(),
            });
        }
        if !self.descriptor_file.contains('.') {
            return Err(ConfigError::InvalidValue {
                key: "descriptor-file".to_string(),
                value: self.descriptor_file.clone(),
                reason: "the descriptor file needs an extension".to_string(),
            });
        }
        for (key, name) in [
            ("marker-annotation", &self.marker_annotation),
            ("dependency-annotation", &self.dependency_annotation),
        ] {
            if name.trim().is_empty() || name.starts_with('.') || name.ends_with('.') {
                return Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    value: name.clone(),
                    reason: "expected a qualified type name".to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Look up a setting by its kebab-case key
    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            "marker-annotation" => Some(self.marker_annotation.clone()),
            "dependency-annotation" => Some(self.dependency_annotation.clone()),
            "descriptor-file" => Some(self.descriptor_file.clone()),
            "reserved-ids" => Some(self.reserved_ids.join(",")),
            "library-packages" => Some(self.library_packages.join(",")),
            "backend" => Some(self.backend.to_string()),
            "output-dir" => self
                .output_dir
                .as_ref()
                .map(|p| p.to_string_lossy().to_string()),
            "max-rounds" => Some(self.max_rounds.to_string()),
            _ => None,
        }
    }
}

/// Location of the user-level config file
///
/// `PLUGDESC_CONFIG` wins when set and non-empty.
pub fn user_config_path() -> Option<PathBuf> {
    if let Ok(env_path) = std::env::var(CONFIG_ENV_VAR) {
        let trimmed = env_path.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed));
        }
    }

    #[cfg(not(target_os = "windows"))]
    let base = dirs::home_dir().map(|home| home.join(".config"));

    #[cfg(target_os = "windows")]
    let base = dirs::config_dir();

    base.map(|dir| dir.join("plugdesc").join(PROJECT_CONFIG_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_are_valid() {
        let config = ProcessorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.descriptor_file, "velocity-plugin.json");
        assert_eq!(config.backend, BackendChoice::Java);
    }

    #[test]
    fn test_overlay_wins_over_defaults() {
        let overlay = ConfigOverlay {
            backend: Some(BackendChoice::Kotlin),
            max_rounds: Some(3),
            ..Default::default()
        };
        let config = ProcessorConfig::default().merged(overlay);
        assert_eq!(config.backend, BackendChoice::Kotlin);
        assert_eq!(config.max_rounds, 3);
        assert_eq!(config.marker_annotation, DEFAULT_MARKER_ANNOTATION);
    }

    #[test]
    fn test_project_file_is_read() {
        let Ok(temp_dir) = TempDir::new() else {
            return;
        };
        let content = r#"
backend = "kotlin"
descriptor-file = "plugin.json"
reserved-ids = ["velocity", "proxy"]
"#;
        assert!(fs::write(temp_dir.path().join(PROJECT_CONFIG_FILE), content).is_ok());

        let overlay = ConfigOverlay::load_from_path(&temp_dir.path().join(PROJECT_CONFIG_FILE));
        assert!(overlay.is_ok());
        let config = ProcessorConfig::default().merged(overlay.unwrap_or_default());
        assert_eq!(config.backend, BackendChoice::Kotlin);
        assert_eq!(config.descriptor_file, "plugin.json");
        assert_eq!(config.reserved_ids, vec!["velocity", "proxy"]);
    }

    #[test]
    fn test_missing_file_is_empty_overlay() {
        let overlay = ConfigOverlay::load_from_path(Path::new("/definitely/not/here.toml"));
        assert!(overlay.is_ok_and(|o| o.is_empty()));
    }

    #[test]
    fn test_set_rejects_unknown_key_and_bad_values() {
        let mut overlay = ConfigOverlay::default();
        assert!(matches!(
            overlay.set("colour", "blue"),
            Err(ConfigError::UnknownKey(_))
        ));
        assert!(matches!(
            overlay.set("backend", "scala"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(overlay.set("reserved-ids", "a, b,").is_ok());
        assert_eq!(
            overlay.reserved_ids,
            Some(vec!["a".to_string(), "b".to_string()])
        );
    }

    #[test]
    fn test_library_packages_layer_and_read_back() {
        let mut overlay = ConfigOverlay::default();
        assert!(overlay
            .set("library-packages", "com.google.inject, org.slf4j")
            .is_ok());
        let config = ProcessorConfig::default().merged(overlay);
        assert_eq!(
            config.library_packages,
            vec!["com.google.inject", "org.slf4j"]
        );
        assert_eq!(
            config.get("library-packages").as_deref(),
            Some("com.google.inject,org.slf4j")
        );
        assert!(ProcessorConfig::default().library_packages.is_empty());
    }

    #[test]
    fn test_descriptor_file_needs_extension() {
        let config = ProcessorConfig {
            descriptor_file: "descriptor".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_get_round_trips_through_toml() {
        let config = ProcessorConfig::default();
        assert_eq!(config.get("max-rounds").as_deref(), Some("10"));
        assert_eq!(config.get("output-dir"), None);
        let rendered = config.to_toml();
        assert!(rendered.is_ok_and(|text| text.contains("marker-annotation")));
    }
}
