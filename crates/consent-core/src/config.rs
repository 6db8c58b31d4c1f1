//! Configuration management for the consent study.
//!
//! Loads configuration from ${CONSENT_HOME}/config.toml with sensible defaults.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::study::ResponseOption;

/// Returns the default config template with comments.
///
/// This is embedded from default_config.toml at compile time.
/// To update, edit default_config.toml directly.
fn default_config_template() -> &'static str {
    include_str!("../default_config.toml")
}

pub mod paths {
    //! Path resolution for study configuration and data directories.
    //!
    //! CONSENT_HOME resolution order:
    //! 1. CONSENT_HOME environment variable (if set)
    //! 2. ~/.config/consent-study (default)
    //! 3. ./.consent-study when no home directory can be determined

    use std::path::PathBuf;

    /// Returns the study home directory.
    pub fn consent_home() -> PathBuf {
        if let Ok(home) = std::env::var("CONSENT_HOME") {
            return PathBuf::from(home);
        }

        dirs::home_dir().map_or_else(
            || PathBuf::from(".consent-study"),
            |h| h.join(".config").join("consent-study"),
        )
    }

    /// Returns the path to the config.toml file.
    pub fn config_path() -> PathBuf {
        consent_home().join("config.toml")
    }

    /// Returns the default JSONL record file.
    pub fn records_path() -> PathBuf {
        consent_home().join("records.jsonl")
    }

    /// Returns the directory that receives rolling log files.
    pub fn logs_dir() -> PathBuf {
        consent_home().join("logs")
    }
}

/// Browser used to open each site.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Command argv; `{url}` is replaced with the site URL.
    /// Empty means "use the system default opener".
    pub command: Vec<String>,
}

/// Which record sink receives interaction records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    /// Remote Firestore collection.
    Firestore,
    /// Local append-only JSON Lines file.
    #[default]
    Jsonl,
    /// Discard records (dry runs).
    None,
}

/// Firestore REST settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FirestoreConfig {
    pub project_id: Option<String>,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
}

/// Record sink configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SinkConfig {
    pub kind: SinkKind,
    /// Firestore collection name.
    pub collection: String,
    /// JSONL file path (defaults to `paths::records_path()`).
    pub path: Option<PathBuf>,
    pub firestore: FirestoreConfig,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            kind: SinkKind::default(),
            collection: Config::DEFAULT_COLLECTION.to_string(),
            path: None,
            firestore: FirestoreConfig::default(),
        }
    }
}

impl SinkConfig {
    /// Resolved JSONL record file.
    pub fn records_path(&self) -> PathBuf {
        self.path.clone().unwrap_or_else(paths::records_path)
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Sites visited by each participant, in order.
    pub sites: Vec<String>,

    /// Consent choices offered after each site.
    pub options: Vec<ResponseOption>,

    /// Closure poll cadence in milliseconds.
    pub poll_interval_ms: u64,

    /// Delay before opening the next site, in milliseconds.
    pub open_delay_ms: u64,

    /// Optional follow-up survey shown on completion.
    pub survey_url: Option<String>,

    #[serde(default)]
    pub browser: BrowserConfig,

    #[serde(default)]
    pub sink: SinkConfig,
}

impl Config {
    const DEFAULT_SITES: &[&str] = &[
        "https://www.ikea.com",
        "https://www.aa.com",
        "https://www.lemonde.fr",
        "https://www.fifa.com/en",
        "https://www.mcdonalds.com/us/en-us.html",
        "https://www.klaviyo.com/",
        "https://www.catan.com",
    ];
    const DEFAULT_OPTIONS: &[(&str, &str)] = &[
        ("accept-all", "Accept All"),
        ("reject-all", "Reject All"),
        ("manage-preferences", "Manage Preferences"),
        ("no-action", "No Action"),
    ];
    const DEFAULT_POLL_INTERVAL_MS: u64 = 500;
    const DEFAULT_OPEN_DELAY_MS: u64 = 500;
    const DEFAULT_COLLECTION: &str = "interactions";

    /// Loads configuration from the default config path.
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_path())
    }

    /// Loads configuration from a specific path.
    /// Returns defaults if file doesn't exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        let config = if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config from {}", path.display()))?
        } else {
            Config::default()
        };

        config
            .validate()
            .with_context(|| format!("Invalid config at {}", path.display()))?;
        Ok(config)
    }

    /// Checks the invariants the study relies on.
    ///
    /// # Errors
    /// Returns an error describing the first violated constraint.
    pub fn validate(&self) -> Result<()> {
        if self.sites.is_empty() {
            anyhow::bail!("At least one site is required");
        }
        for site in &self.sites {
            url::Url::parse(site).with_context(|| format!("Invalid site URL: {site}"))?;
        }

        if self.options.is_empty() {
            anyhow::bail!("At least one response option is required");
        }
        let mut seen = HashSet::new();
        for option in &self.options {
            if option.id.trim().is_empty() || option.label.trim().is_empty() {
                anyhow::bail!("Response options need a non-empty id and label");
            }
            if !seen.insert(option.id.as_str()) {
                anyhow::bail!("Duplicate response option id: {}", option.id);
            }
        }

        if self.poll_interval_ms == 0 {
            anyhow::bail!("poll_interval_ms must be greater than zero");
        }

        if let Some(survey) = &self.survey_url {
            url::Url::parse(survey).with_context(|| format!("Invalid survey URL: {survey}"))?;
        }

        if self
            .browser
            .command
            .first()
            .is_some_and(|program| program.trim().is_empty())
        {
            anyhow::bail!("browser.command must start with a program name");
        }

        Ok(())
    }

    /// Closure poll cadence.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Delay before each subsequent site open.
    pub fn open_delay(&self) -> Duration {
        Duration::from_millis(self.open_delay_ms)
    }

    /// Creates the config file with the commented default template.
    ///
    /// # Errors
    /// Returns an error if the file already exists or cannot be written.
    pub fn init(path: &Path) -> Result<()> {
        if path.exists() {
            anyhow::bail!("Config file already exists at {}", path.display());
        }

        Self::write_config(path, default_config_template())
    }

    fn write_config(path: &Path, content: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let tmp_path = path.with_extension("toml.tmp");
        fs::write(&tmp_path, content)
            .with_context(|| format!("Failed to write config to {}", tmp_path.display()))?;
        fs::rename(&tmp_path, path).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                tmp_path.display(),
                path.display()
            )
        })?;

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sites: Self::DEFAULT_SITES.iter().map(ToString::to_string).collect(),
            options: Self::DEFAULT_OPTIONS
                .iter()
                .map(|(id, label)| ResponseOption::new(*id, *label))
                .collect(),
            poll_interval_ms: Self::DEFAULT_POLL_INTERVAL_MS,
            open_delay_ms: Self::DEFAULT_OPEN_DELAY_MS,
            survey_url: None,
            browser: BrowserConfig::default(),
            sink: SinkConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_load_missing_file_returns_defaults() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("nonexistent.toml");

        let config = Config::load_from(&config_path).unwrap();
        assert_eq!(config.sites.len(), 7);
        assert_eq!(config.options.len(), 4);
        assert_eq!(config.poll_interval(), Duration::from_millis(500));
        assert_eq!(config.open_delay(), Duration::from_millis(500));
        assert_eq!(config.sink.kind, SinkKind::Jsonl);
    }

    #[test]
    fn test_load_partial_config_merges_defaults() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.toml");

        fs::write(
            &config_path,
            "sites = [\"https://a.example\", \"https://b.example\"]\n",
        )
        .unwrap();

        let config = Config::load_from(&config_path).unwrap();
        assert_eq!(config.sites, vec!["https://a.example", "https://b.example"]);
        assert_eq!(config.options[0].label, "Accept All");
        assert_eq!(config.sink.collection, "interactions");
    }

    #[test]
    fn test_default_template_matches_rust_defaults() {
        let parsed: Config = toml::from_str(default_config_template()).unwrap();
        let defaults = Config::default();

        assert_eq!(parsed.sites, defaults.sites);
        assert_eq!(parsed.options, defaults.options);
        assert_eq!(parsed.poll_interval_ms, defaults.poll_interval_ms);
        assert_eq!(parsed.open_delay_ms, defaults.open_delay_ms);
        assert_eq!(parsed.sink.kind, defaults.sink.kind);
        assert!(parsed.browser.command.is_empty());
    }

    #[test]
    fn test_init_creates_config_with_defaults() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("subdir").join("config.toml");

        Config::init(&config_path).unwrap();

        assert!(config_path.exists());
        let config = Config::load_from(&config_path).unwrap();
        assert_eq!(config.sites.len(), 7);
    }

    #[test]
    fn test_init_fails_if_exists() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.toml");
        fs::write(&config_path, "# existing").unwrap();

        let err = Config::init(&config_path).unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }

    #[test]
    fn test_empty_site_list_is_rejected() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.toml");
        fs::write(&config_path, "sites = []\n").unwrap();

        let err = Config::load_from(&config_path).unwrap_err();
        assert!(format!("{err:#}").contains("At least one site"));
    }

    #[test]
    fn test_invalid_site_url_is_rejected() {
        let config = Config {
            sites: vec!["not a url".to_string()],
            ..Config::default()
        };

        let err = config.validate().unwrap_err();
        assert!(format!("{err:#}").contains("Invalid site URL"));
    }

    #[test]
    fn test_duplicate_option_ids_are_rejected() {
        let config = Config {
            options: vec![
                ResponseOption::new("accept", "Accept"),
                ResponseOption::new("accept", "Accept again"),
            ],
            ..Config::default()
        };

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("Duplicate response option id"));
    }

    #[test]
    fn test_zero_poll_interval_is_rejected() {
        let config = Config {
            poll_interval_ms: 0,
            ..Config::default()
        };

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_sink_records_path_override() {
        let sink = SinkConfig {
            path: Some(PathBuf::from("/tmp/custom.jsonl")),
            ..SinkConfig::default()
        };

        assert_eq!(sink.records_path(), PathBuf::from("/tmp/custom.jsonl"));
    }

    #[test]
    fn test_sink_kind_parses_lowercase() {
        let config: Config = toml::from_str("[sink]\nkind = \"firestore\"\n").unwrap();
        assert_eq!(config.sink.kind, SinkKind::Firestore);
    }
}
