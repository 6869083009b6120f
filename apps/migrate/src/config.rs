//! Migration configuration.
//!
//! Configuration is stored as TOML:
//! - Linux: `~/.config/docferry/config.toml`
//! - Windows: `%APPDATA%/docferry/config.toml`
//!
//! Relative paths inside the file are resolved against the working directory.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use docferry_migration::MigrationSettings;
use docferry_retry::RetryConfig;
use docferry_schedule::OffPeakWindow;
use docferry_transfer::{DEFAULT_MAX_PART_SIZE, DEFAULT_SINGLE_UPLOAD_THRESHOLD, MIN_PART_SIZE};
use serde::{Deserialize, Serialize};

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Checkpoint ledger written after every state change.
    #[serde(default = "default_checkpoint_path")]
    pub checkpoint_path: PathBuf,

    /// JSON array of case-to-folder assignments.
    #[serde(default = "default_mapping_path")]
    pub mapping_path: PathBuf,

    /// Directory receiving the daily `migration.log` files.
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,

    /// Container created under each matter for the migrated tree.
    #[serde(default = "default_root_folder_name")]
    pub root_folder_name: String,

    #[serde(default)]
    pub upload: UploadSection,

    #[serde(default)]
    pub retry: RetrySection,

    #[serde(default)]
    pub schedule: ScheduleSection,

    #[serde(default)]
    pub clio: ClioSection,

    #[serde(default)]
    pub dropbox: DropboxSection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadSection {
    /// Files of at least this many bytes use multipart upload.
    #[serde(default = "default_single_upload_threshold")]
    pub single_upload_threshold: u64,

    #[serde(default = "default_max_part_size")]
    pub max_part_size: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrySection {
    /// Budget for token refreshes.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Budget for provider API calls on the migration path.
    #[serde(default = "default_critical_max_retries")]
    pub critical_max_retries: u32,

    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleSection {
    /// When false, cases start regardless of the time of day.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Offset of the reference time zone, in whole hours east of UTC.
    #[serde(default)]
    pub utc_offset_hours: i32,

    #[serde(default = "default_peak_start_hour")]
    pub peak_start_hour: u32,

    #[serde(default = "default_peak_end_hour")]
    pub peak_end_hour: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClioSection {
    #[serde(default = "default_clio_base_url")]
    pub base_url: String,

    #[serde(default)]
    pub client_id: String,

    #[serde(default)]
    pub client_secret: String,

    #[serde(default = "default_clio_token_path")]
    pub token_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropboxSection {
    #[serde(default = "default_dropbox_api_url")]
    pub api_url: String,

    #[serde(default)]
    pub client_id: String,

    #[serde(default)]
    pub client_secret: String,

    #[serde(default = "default_dropbox_token_path")]
    pub token_path: PathBuf,
}

fn default_checkpoint_path() -> PathBuf {
    PathBuf::from("checkpoints").join("migration_checkpoint.json")
}

fn default_mapping_path() -> PathBuf {
    PathBuf::from("mapping.json")
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_root_folder_name() -> String {
    MigrationSettings::default().root_folder_name
}

fn default_single_upload_threshold() -> u64 {
    DEFAULT_SINGLE_UPLOAD_THRESHOLD
}

fn default_max_part_size() -> u64 {
    DEFAULT_MAX_PART_SIZE
}

fn default_max_retries() -> u32 {
    RetryConfig::default().max_retries
}

fn default_critical_max_retries() -> u32 {
    RetryConfig::critical().max_retries
}

fn default_base_delay_ms() -> u64 {
    1000
}

fn default_true() -> bool {
    true
}

fn default_peak_start_hour() -> u32 {
    7
}

fn default_peak_end_hour() -> u32 {
    22
}

fn default_clio_base_url() -> String {
    docferry_clio::client::DEFAULT_BASE_URL.into()
}

fn default_clio_token_path() -> PathBuf {
    PathBuf::from("tokens").join(".clio_tokens.json")
}

fn default_dropbox_api_url() -> String {
    docferry_dropbox::client::DEFAULT_API_URL.into()
}

fn default_dropbox_token_path() -> PathBuf {
    PathBuf::from("tokens").join(".dropbox_tokens.json")
}

impl Default for UploadSection {
    fn default() -> Self {
        Self {
            single_upload_threshold: default_single_upload_threshold(),
            max_part_size: default_max_part_size(),
        }
    }
}

impl Default for RetrySection {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            critical_max_retries: default_critical_max_retries(),
            base_delay_ms: default_base_delay_ms(),
        }
    }
}

impl Default for ScheduleSection {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            utc_offset_hours: 0,
            peak_start_hour: default_peak_start_hour(),
            peak_end_hour: default_peak_end_hour(),
        }
    }
}

impl Default for ClioSection {
    fn default() -> Self {
        Self {
            base_url: default_clio_base_url(),
            client_id: String::new(),
            client_secret: String::new(),
            token_path: default_clio_token_path(),
        }
    }
}

impl Default for DropboxSection {
    fn default() -> Self {
        Self {
            api_url: default_dropbox_api_url(),
            client_id: String::new(),
            client_secret: String::new(),
            token_path: default_dropbox_token_path(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            checkpoint_path: default_checkpoint_path(),
            mapping_path: default_mapping_path(),
            log_dir: default_log_dir(),
            root_folder_name: default_root_folder_name(),
            upload: UploadSection::default(),
            retry: RetrySection::default(),
            schedule: ScheduleSection::default(),
            clio: ClioSection::default(),
            dropbox: DropboxSection::default(),
        }
    }
}

impl Config {
    /// Loads configuration from `path`, or creates a default file there if
    /// none exists.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            let config: Config = toml::from_str(&content)
                .with_context(|| format!("parsing {}", path.display()))?;
            config
                .validate()
                .with_context(|| format!("validating {}", path.display()))?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save(path)?;
            Ok(config)
        }
    }

    /// Saves the configuration to `path`.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        // May hold client secrets.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
        }

        tracing::debug!(path = %path.display(), "configuration saved");
        Ok(())
    }

    /// Rejects upload sizes and schedule hours the engine cannot use.
    pub fn validate(&self) -> anyhow::Result<()> {
        let upload = &self.upload;
        if upload.max_part_size < MIN_PART_SIZE {
            anyhow::bail!(
                "upload.max_part_size must be at least {MIN_PART_SIZE} bytes, got {}",
                upload.max_part_size
            );
        }
        if upload.single_upload_threshold == 0 {
            anyhow::bail!("upload.single_upload_threshold must be greater than zero");
        }
        self.window()?;
        Ok(())
    }

    /// Off-peak window, or `None` when the schedule is disabled.
    pub fn window(&self) -> anyhow::Result<Option<OffPeakWindow>> {
        if !self.schedule.enabled {
            return Ok(None);
        }
        let s = &self.schedule;
        OffPeakWindow::from_hours(s.utc_offset_hours, s.peak_start_hour, s.peak_end_hour)
            .map(Some)
            .with_context(|| {
                format!(
                    "invalid schedule: offset {}h, peak {}..{}",
                    s.utc_offset_hours, s.peak_start_hour, s.peak_end_hour
                )
            })
    }

    pub fn retry(&self) -> RetryConfig {
        RetryConfig {
            max_retries: self.retry.max_retries,
            base_delay: Duration::from_millis(self.retry.base_delay_ms),
        }
    }

    pub fn critical_retry(&self) -> RetryConfig {
        RetryConfig {
            max_retries: self.retry.critical_max_retries,
            base_delay: Duration::from_millis(self.retry.base_delay_ms),
        }
    }

    pub fn settings(&self) -> MigrationSettings {
        MigrationSettings {
            root_folder_name: self.root_folder_name.clone(),
            single_upload_threshold: self.upload.single_upload_threshold,
            max_part_size: self.upload.max_part_size,
        }
    }
}

/// Returns the platform-specific configuration file path.
pub fn default_path() -> PathBuf {
    #[cfg(target_os = "linux")]
    {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        PathBuf::from(home)
            .join(".config")
            .join("docferry")
            .join("config.toml")
    }

    #[cfg(target_os = "windows")]
    {
        let appdata =
            std::env::var("APPDATA").unwrap_or_else(|_| "C:\\Users\\Default\\AppData".into());
        PathBuf::from(appdata).join("docferry").join("config.toml")
    }

    #[cfg(not(any(target_os = "linux", target_os = "windows")))]
    {
        PathBuf::from("/tmp/docferry/config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(
            config.checkpoint_path,
            PathBuf::from("checkpoints/migration_checkpoint.json")
        );
        assert_eq!(config.root_folder_name, "Dropbox Migration");
        assert_eq!(config.upload.max_part_size, 30 * 1024 * 1024);
        assert_eq!(config.retry.max_retries, 5);
        assert_eq!(config.retry.critical_max_retries, 8);
        assert!(config.schedule.enabled);
        assert_eq!(config.clio.base_url, "https://eu.app.clio.com");
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let toml_str = r#"
            root_folder_name = "Imported"

            [schedule]
            peak_end_hour = 20

            [clio]
            client_id = "abc"
        "#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.root_folder_name, "Imported");
        assert_eq!(config.schedule.peak_end_hour, 20);
        assert_eq!(config.schedule.peak_start_hour, 7);
        assert_eq!(config.clio.client_id, "abc");
        assert_eq!(config.clio.token_path, PathBuf::from("tokens/.clio_tokens.json"));
        assert_eq!(config.upload, UploadSection::default());
    }

    #[test]
    fn load_creates_default_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested").join("config.toml");

        let config = Config::load(&path).unwrap();
        assert_eq!(config, Config::default());
        assert!(path.exists());

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }

    #[test]
    fn save_and_load_roundtrip() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.toml");

        let mut config = Config::default();
        config.dropbox.client_secret = "s3cret".into();
        config.schedule.utc_offset_hours = 2;
        config.save(&path).unwrap();

        assert_eq!(Config::load(&path).unwrap(), config);
    }

    #[test]
    fn load_rejects_invalid_toml() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "root_folder_name = [").unwrap();
        assert!(Config::load(&path).is_err());
    }

    #[test]
    fn load_rejects_unusable_part_sizes() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.toml");

        for body in [
            "[upload]\nmax_part_size = 0\n",
            "[upload]\nmax_part_size = 1024\n",
            "[upload]\nsingle_upload_threshold = 0\n",
        ] {
            std::fs::write(&path, body).unwrap();
            let err = Config::load(&path).unwrap_err();
            assert!(format!("{err:#}").contains("upload."), "{err:#}");
        }

        std::fs::write(&path, "[upload]\nmax_part_size = 5242880\n").unwrap();
        assert_eq!(Config::load(&path).unwrap().upload.max_part_size, MIN_PART_SIZE);
    }

    #[test]
    fn load_rejects_bad_schedule_hours() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "[schedule]\npeak_start_hour = 25\n").unwrap();
        assert!(Config::load(&path).is_err());
    }

    #[test]
    fn default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn window_follows_schedule() {
        let mut config = Config::default();
        assert_eq!(config.window().unwrap(), Some(OffPeakWindow::default()));

        config.schedule.enabled = false;
        assert_eq!(config.window().unwrap(), None);

        config.schedule.enabled = true;
        config.schedule.peak_end_hour = 30;
        assert!(config.window().is_err());
    }

    #[test]
    fn retry_budgets_share_base_delay() {
        let mut config = Config::default();
        config.retry.base_delay_ms = 250;
        assert_eq!(config.retry().max_retries, 5);
        assert_eq!(config.critical_retry().max_retries, 8);
        assert_eq!(config.critical_retry().base_delay, Duration::from_millis(250));
    }

    #[test]
    fn settings_from_config() {
        let mut config = Config::default();
        config.upload.single_upload_threshold = 10;
        let settings = config.settings();
        assert_eq!(settings.single_upload_threshold, 10);
        assert_eq!(settings.root_folder_name, "Dropbox Migration");
    }

    #[test]
    fn default_path_names_app() {
        assert!(default_path().to_string_lossy().contains("docferry"));
    }
}
