use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// POSIX mode bits applied to a finished file, written as `"0o644"` in config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FilePermission(u32);

impl FilePermission {
    pub fn new(mode: u32) -> Self {
        Self(mode & 0o777)
    }

    pub fn mode(self) -> u32 {
        self.0
    }
}

impl FromStr for FilePermission {
    type Err = String;

    /// Accepts `0o` followed by exactly three octal digits.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .trim()
            .strip_prefix("0o")
            .ok_or_else(|| format!("file permission must look like 0o644, got {s:?}"))?;
        if digits.len() != 3 || !digits.chars().all(|c| ('0'..='7').contains(&c)) {
            return Err(format!("file permission must look like 0o644, got {s:?}"));
        }
        u32::from_str_radix(digits, 8)
            .map(FilePermission)
            .map_err(|e| e.to_string())
    }
}

impl TryFrom<String> for FilePermission {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<FilePermission> for String {
    fn from(p: FilePermission) -> Self {
        p.to_string()
    }
}

impl fmt::Display for FilePermission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0o{:03o}", self.0)
    }
}

/// Per-job tuning for the download worker (`[download]` table in config.toml).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThreadOption {
    /// Bytes processed per streaming iteration.
    pub chunk_size: usize,
    /// Minimum seconds between PROGRESS reports.
    pub report_interval_secs: f64,
    /// Number of samples in the speed window.
    pub speedmeter_size: usize,
    /// Mode applied after placement; `None` leaves the umask default.
    #[serde(with = "optional_permission")]
    pub file_permission: Option<FilePermission>,
    /// Treat a response without `Content-Length` as a failure instead of
    /// accepting whatever arrived.
    pub require_content_length: bool,
}

impl Default for ThreadOption {
    fn default() -> Self {
        Self {
            chunk_size: 1024,
            report_interval_secs: 60.0,
            speedmeter_size: 100,
            file_permission: Some(FilePermission::new(0o644)),
            require_content_length: false,
        }
    }
}

impl ThreadOption {
    /// Interval between PROGRESS reports; values too large for a
    /// [`Duration`] saturate, so progress is effectively never reported.
    pub fn report_interval(&self) -> Duration {
        Duration::try_from_secs_f64(self.report_interval_secs.max(0.0)).unwrap_or(Duration::MAX)
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            anyhow::bail!("download.chunk_size must be greater than 0");
        }
        if self.speedmeter_size < 2 {
            anyhow::bail!("download.speedmeter_size must be at least 2");
        }
        if !self.report_interval_secs.is_finite() || self.report_interval_secs < 0.0 {
            anyhow::bail!("download.report_interval_secs must be a non-negative number");
        }
        Ok(())
    }
}

/// `file_permission = "none"` disables chmod; a missing key keeps the default.
mod optional_permission {
    use super::FilePermission;
    use serde::{Deserialize, Deserializer, Serializer};

    const DISABLED: &str = "none";

    pub fn serialize<S: Serializer>(v: &Option<FilePermission>, s: S) -> Result<S::Ok, S::Error> {
        match v {
            Some(p) => s.serialize_str(&p.to_string()),
            None => s.serialize_str(DISABLED),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<FilePermission>, D::Error> {
        let raw = String::deserialize(d)?;
        if raw.trim().eq_ignore_ascii_case(DISABLED) {
            return Ok(None);
        }
        raw.parse().map(Some).map_err(serde::de::Error::custom)
    }
}

/// Global configuration loaded from `~/.config/fetchbot/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchbotConfig {
    /// Directory downloads are saved into when no explicit path is given.
    pub destination_directory: PathBuf,
    /// Finished files smaller than this are deleted by the consumer.
    pub min_file_size: Option<u64>,
    /// How often the consumer drains the report queue.
    pub tick_millis: u64,
    pub download: ThreadOption,
}

impl Default for FetchbotConfig {
    fn default() -> Self {
        Self {
            destination_directory: PathBuf::from("./download"),
            min_file_size: None,
            tick_millis: 500,
            download: ThreadOption::default(),
        }
    }
}

impl FetchbotConfig {
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_millis.max(1))
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("fetchbot")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Parse and validate a config file.
pub fn load_from_path(path: &Path) -> Result<FetchbotConfig> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let cfg: FetchbotConfig =
        toml::from_str(&data).with_context(|| format!("invalid config {}", path.display()))?;
    cfg.download.validate()?;
    Ok(cfg)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<FetchbotConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = FetchbotConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }
    load_from_path(&path)
}
