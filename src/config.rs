//! Configuration for the instrumentation pass
//!
//! Values come from defaults, then an optional `inspector-ids.toml`, then
//! command-line overrides applied through the `with_*` builders.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::instrument::registry::{RegistryScope, SuffixMode};

/// File name looked up in the project root when no config path is given
pub const CONFIG_FILE_NAME: &str = "inspector-ids.toml";

/// Errors that can occur when loading configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Configuration options for the instrumentation pass
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct InstrumentConfig {
    /// Counter or random suffixes for non-grouped ids
    pub suffix_mode: SuffixMode,

    /// Whether ids must be unique per file or across the whole run
    pub scope: RegistryScope,

    /// Random candidates tried before falling back to a timestamp suffix
    pub max_attempts: u32,

    /// Length of random suffixes on element ids
    pub random_suffix_len: usize,

    /// Length of random suffixes on group ids
    pub group_suffix_len: usize,

    /// Seed for reproducible random suffixes
    pub seed: Option<u64>,

    /// Directory file paths are reported relative to
    pub project_root: PathBuf,

    /// Directory under the project root scanned by whole-project runs
    pub source_dir: PathBuf,

    /// File extensions to instrument, without the dot
    pub extensions: Vec<String>,

    /// Directory names skipped during discovery; hidden directories are always skipped
    pub exclude_dirs: Vec<String>,

    /// Method name that marks an iteration construct
    pub iteration_method: String,
}

impl Default for InstrumentConfig {
    fn default() -> Self {
        Self {
            suffix_mode: SuffixMode::Counter,
            scope: RegistryScope::File,
            max_attempts: 100,
            random_suffix_len: 5,
            group_suffix_len: 4,
            seed: None,
            project_root: PathBuf::from("."),
            source_dir: PathBuf::from("src"),
            extensions: vec!["jsx".to_string(), "tsx".to_string()],
            exclude_dirs: vec![
                "node_modules".to_string(),
                "dist".to_string(),
                "build".to_string(),
            ],
            iteration_method: "map".to_string(),
        }
    }
}

impl InstrumentConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_str(&content)
    }

    /// Load configuration from a TOML string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `inspector-ids.toml` from the project root, or defaults if absent
    ///
    /// The returned configuration always uses `root` as its project root.
    pub fn discover(root: &Path) -> Result<Self, ConfigError> {
        let path = root.join(CONFIG_FILE_NAME);
        let config = if path.is_file() {
            tracing::debug!(path = %path.display(), "loading config");
            Self::from_file(&path)?
        } else {
            Self::default()
        };
        Ok(config.with_project_root(root))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::Invalid("max-attempts must be at least 1".to_string()));
        }
        if self.random_suffix_len == 0 || self.group_suffix_len == 0 {
            return Err(ConfigError::Invalid("suffix lengths must be at least 1".to_string()));
        }
        if self.extensions.is_empty() {
            return Err(ConfigError::Invalid("extensions must not be empty".to_string()));
        }
        if self.iteration_method.is_empty() {
            return Err(ConfigError::Invalid("iteration-method must not be empty".to_string()));
        }
        Ok(())
    }

    /// Directory scanned by a whole-project run
    pub fn source_root(&self) -> PathBuf {
        self.project_root.join(&self.source_dir)
    }

    /// Set the suffix mode
    pub fn with_suffix_mode(mut self, mode: SuffixMode) -> Self {
        self.suffix_mode = mode;
        self
    }

    /// Set the registry scope
    pub fn with_scope(mut self, scope: RegistryScope) -> Self {
        self.scope = scope;
        self
    }

    /// Set the random seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Set the project root
    pub fn with_project_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.project_root = root.into();
        self
    }

    /// Set the source directory
    pub fn with_source_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.source_dir = dir.into();
        self
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    pub fn with_iteration_method(mut self, method: impl Into<String>) -> Self {
        self.iteration_method = method.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = InstrumentConfig::default();
        assert_eq!(config.suffix_mode, SuffixMode::Counter);
        assert_eq!(config.scope, RegistryScope::File);
        assert_eq!(config.max_attempts, 100);
        assert_eq!(config.random_suffix_len, 5);
        assert_eq!(config.group_suffix_len, 4);
        assert_eq!(config.source_root(), PathBuf::from("./src"));
        assert_eq!(config.extensions, vec!["jsx", "tsx"]);
        assert_eq!(config.iteration_method, "map");
    }

    #[test]
    fn test_builder_pattern() {
        let config = InstrumentConfig::new()
            .with_suffix_mode(SuffixMode::Random)
            .with_scope(RegistryScope::Global)
            .with_seed(7);

        assert_eq!(config.suffix_mode, SuffixMode::Random);
        assert_eq!(config.scope, RegistryScope::Global);
        assert_eq!(config.seed, Some(7));
    }

    #[test]
    fn test_parse_toml_partial() {
        let toml_str = r#"
suffix-mode = "random"
scope = "global"
source-dir = "app"
exclude-dirs = ["vendor"]
"#;
        let config = InstrumentConfig::from_str(toml_str).expect("Should parse");
        assert_eq!(config.suffix_mode, SuffixMode::Random);
        assert_eq!(config.scope, RegistryScope::Global);
        assert_eq!(config.source_dir, PathBuf::from("app"));
        assert_eq!(config.exclude_dirs, vec!["vendor"]);
        assert_eq!(config.max_attempts, 100);
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(matches!(
            InstrumentConfig::from_str("suffix = \"counter\""),
            Err(ConfigError::Toml(_))
        ));
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            InstrumentConfig::from_str("max-attempts = 0"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            InstrumentConfig::from_str("extensions = []"),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_discover_reads_project_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "group-suffix-len = 6\n").unwrap();

        let config = InstrumentConfig::discover(dir.path()).unwrap();
        assert_eq!(config.group_suffix_len, 6);
        assert_eq!(config.project_root, dir.path());
    }

    #[test]
    fn test_discover_without_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = InstrumentConfig::discover(dir.path()).unwrap();
        assert_eq!(config.group_suffix_len, 4);
        assert_eq!(config.project_root, dir.path());
    }
}
