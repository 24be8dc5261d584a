//! TreeSync settings
//!
//! Everything the engine needs to know about its environment is read from a
//! single YAML file. Missing keys take their defaults, so an empty file is a
//! valid configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// Root of the YAML document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub workspace: WorkspaceConfig,
    pub sync: SyncConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

/// How the workspace is laid out on the remote side
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspaceConfig {
    /// Recorded in workspace ids and in the published location
    pub provider_id: String,
    /// Location hashes are appended to this URL
    pub app_url: String,
    /// Used when a workspace is created without a folder id
    pub root_folder_name: String,
    pub data_folder_name: String,
    pub trash_folder_name: String,
    /// What the provider reports as the mime type of a folder
    pub folder_mime_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Seconds between two change-feed polls
    pub poll_interval: u64,
    /// Ask the provider to report deleted objects too
    pub include_removed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite file holding the ledger and the workspace records
    pub database: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset
    pub level: String,
    /// One JSON object per line
    pub json: bool,
}

const APP_DIR: &str = "treesync";

impl Config {
    /// Reads and parses the YAML file at `path`
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&text)?)
    }

    /// Like [`Config::load`], with every failure mapped to the defaults
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// `<config dir>/treesync/config.yaml`
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join(APP_DIR)
            .join("config.yaml")
    }
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            provider_id: "googleDriveWorkspace".to_string(),
            app_url: "https://localhost/app".to_string(),
            root_folder_name: "TreeSync workspace".to_string(),
            data_folder_name: ".treesync-data".to_string(),
            trash_folder_name: ".treesync-trash".to_string(),
            folder_mime_type: "application/vnd.google-apps.folder".to_string(),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval: 30,
            include_removed: true,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let base = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("~/.local/share"));
        Self {
            database: base.join(APP_DIR).join("treesync.db"),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// One problem with one setting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted key, such as `sync.poll_interval`
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

impl WorkspaceConfig {
    fn check(&self, errors: &mut Vec<ValidationError>) {
        let required = [
            ("workspace.provider_id", &self.provider_id),
            ("workspace.root_folder_name", &self.root_folder_name),
            ("workspace.data_folder_name", &self.data_folder_name),
            ("workspace.trash_folder_name", &self.trash_folder_name),
            ("workspace.folder_mime_type", &self.folder_mime_type),
        ];
        errors.extend(
            required
                .into_iter()
                .filter(|(_, value)| value.trim().is_empty())
                .map(|(field, _)| ValidationError::new(field, "must not be empty")),
        );
        if !self.app_url.contains("://") {
            errors.push(ValidationError::new(
                "workspace.app_url",
                format!("'{}' has no scheme", self.app_url),
            ));
        }
    }
}

impl Config {
    /// Collects every invalid setting; empty when the configuration is usable
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        self.workspace.check(&mut errors);

        if self.sync.poll_interval == 0 {
            errors.push(ValidationError::new(
                "sync.poll_interval",
                "must be at least one second",
            ));
        }
        if !LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError::new(
                "logging.level",
                format!(
                    "unknown level '{}', expected one of {}",
                    self.logging.level,
                    LOG_LEVELS.join("/")
                ),
            ));
        }
        errors
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Programmatic construction, starting from the defaults
///
/// # Example
///
/// ```rust,no_run
/// use treesync_core::config::ConfigBuilder;
///
/// let config = ConfigBuilder::new()
///     .workspace_app_url("https://notes.example.com/app")
///     .sync_poll_interval(60)
///     .logging_level("debug")
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    // --- workspace ---

    pub fn workspace_provider_id(mut self, provider_id: impl Into<String>) -> Self {
        self.config.workspace.provider_id = provider_id.into();
        self
    }

    pub fn workspace_app_url(mut self, app_url: impl Into<String>) -> Self {
        self.config.workspace.app_url = app_url.into();
        self
    }

    pub fn workspace_root_folder_name(mut self, name: impl Into<String>) -> Self {
        self.config.workspace.root_folder_name = name.into();
        self
    }

    pub fn workspace_data_folder_name(mut self, name: impl Into<String>) -> Self {
        self.config.workspace.data_folder_name = name.into();
        self
    }

    pub fn workspace_trash_folder_name(mut self, name: impl Into<String>) -> Self {
        self.config.workspace.trash_folder_name = name.into();
        self
    }

    pub fn workspace_folder_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.config.workspace.folder_mime_type = mime_type.into();
        self
    }

    // --- sync ---

    pub fn sync_poll_interval(mut self, seconds: u64) -> Self {
        self.config.sync.poll_interval = seconds;
        self
    }

    pub fn sync_include_removed(mut self, include_removed: bool) -> Self {
        self.config.sync.include_removed = include_removed;
        self
    }

    // --- storage ---

    pub fn storage_database(mut self, path: PathBuf) -> Self {
        self.config.storage.database = path;
        self
    }

    // --- logging ---

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    pub fn logging_json(mut self, json: bool) -> Self {
        self.config.logging.json = json;
        self
    }

    // --- build ---

    pub fn build(self) -> Config {
        self.config
    }

    /// Returns the configuration only if [`Config::validate`] finds nothing
    pub fn build_validated(self) -> Result<Config, Vec<ValidationError>> {
        match self.config.validate() {
            errors if errors.is_empty() => Ok(self.config),
            errors => Err(errors),
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
