//! gatetrack configuration loading
//!
//! Loads `~/.config/gatetrack/config.toml` (or the file named by
//! `GATETRACK_CONFIG`, or an explicit path). Every key is optional:
//!
//! ```toml
//! db_path = "~/.local/share/gatetrack/gatetrack.db"
//! checklist_path = "~/programs/master_checklist.toml"
//!
//! [backup]
//! enabled = true
//! dir = "~/.local/share/gatetrack/backups"
//! keep = 30
//! on_startup = true
//!
//! [display]
//! readiness_warn_below = 90.0
//! readiness_critical_below = 75.0
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::backup::DEFAULT_KEEP;
use crate::error::{Result, TrackerError};
use crate::readiness::ReadinessThresholds;

/// Root configuration
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct TrackerConfig {
    /// Path to the SQLite snapshot store
    #[serde(default = "default_db_path")]
    pub db_path: String,

    /// Master checklist TOML; the built-in checklist is used when unset
    #[serde(default)]
    pub checklist_path: Option<String>,

    #[serde(default)]
    pub backup: BackupConfig,

    #[serde(default)]
    pub display: DisplayConfig,
}

fn default_db_path() -> String {
    dirs::home_dir()
        .map(|h| {
            h.join(".local")
                .join("share")
                .join("gatetrack")
                .join("gatetrack.db")
                .to_string_lossy()
                .into_owned()
        })
        .unwrap_or_else(|| "gatetrack.db".to_string())
}

/// Backup settings
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct BackupConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Backup directory; defaults to `backups/` next to the database
    #[serde(default)]
    pub dir: Option<String>,

    /// Number of backups to retain
    #[serde(default = "default_keep")]
    pub keep: usize,

    /// Take a backup whenever the CLI starts
    #[serde(default = "default_true")]
    pub on_startup: bool,
}

fn default_true() -> bool {
    true
}

fn default_keep() -> usize {
    DEFAULT_KEEP
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: None,
            keep: default_keep(),
            on_startup: true,
        }
    }
}

/// Readiness colour bands
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct DisplayConfig {
    #[serde(default = "default_warn_below")]
    pub readiness_warn_below: f64,

    #[serde(default = "default_critical_below")]
    pub readiness_critical_below: f64,
}

fn default_warn_below() -> f64 {
    90.0
}

fn default_critical_below() -> f64 {
    75.0
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            readiness_warn_below: default_warn_below(),
            readiness_critical_below: default_critical_below(),
        }
    }
}

impl DisplayConfig {
    pub fn thresholds(&self) -> ReadinessThresholds {
        ReadinessThresholds {
            warn_below: self.readiness_warn_below,
            critical_below: self.readiness_critical_below,
        }
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            checklist_path: None,
            backup: BackupConfig::default(),
            display: DisplayConfig::default(),
        }
    }
}

impl TrackerConfig {
    /// Environment variable naming the config file
    pub const ENV_CONFIG_PATH: &'static str = "GATETRACK_CONFIG";

    /// Default config filename
    pub const DEFAULT_CONFIG_FILENAME: &'static str = "config.toml";

    /// Load configuration.
    ///
    /// Resolution order:
    /// 1. `explicit` (must exist)
    /// 2. `GATETRACK_CONFIG` environment variable
    /// 3. `~/.config/gatetrack/config.toml`
    ///
    /// A missing file in (2) or (3) yields the defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load_from_path(path);
        }

        let path = Self::resolve_config_path();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "config not found, using defaults");
            return Ok(Self::default());
        }
        Self::load_from_path(&path)
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|source| TrackerError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&contents).map_err(|err| match err {
            TrackerError::ConfigParse { source, .. } => TrackerError::ConfigParse {
                what: format!("config {}", path.display()),
                source,
            },
            other => other,
        })
    }

    /// Parse configuration from a TOML string
    pub fn parse(contents: &str) -> Result<Self> {
        let cfg: TrackerConfig =
            toml::from_str(contents).map_err(|source| TrackerError::ConfigParse {
                what: "config".to_string(),
                source,
            })?;
        Ok(cfg.validated())
    }

    fn resolve_config_path() -> PathBuf {
        if let Ok(path) = std::env::var(Self::ENV_CONFIG_PATH) {
            return PathBuf::from(path);
        }

        dirs::home_dir()
            .map(|h| {
                h.join(".config")
                    .join("gatetrack")
                    .join(Self::DEFAULT_CONFIG_FILENAME)
            })
            .unwrap_or_else(|| PathBuf::from(Self::DEFAULT_CONFIG_FILENAME))
    }

    /// Clamp out-of-range values, warning about each one.
    fn validated(mut self) -> Self {
        let thresholds = &mut self.display;
        for (key, value) in [
            ("readiness_warn_below", &mut thresholds.readiness_warn_below),
            ("readiness_critical_below", &mut thresholds.readiness_critical_below),
        ] {
            let clamped = value.clamp(0.0, 100.0);
            if clamped != *value {
                tracing::warn!(key, value = *value, clamped, "readiness threshold out of range");
                *value = clamped;
            }
        }
        if thresholds.readiness_critical_below > thresholds.readiness_warn_below {
            tracing::warn!(
                critical = thresholds.readiness_critical_below,
                warn = thresholds.readiness_warn_below,
                "critical readiness threshold is above the warning threshold"
            );
        }

        if self.backup.keep == 0 {
            tracing::warn!("backup.keep must be at least 1, using 1");
            self.backup.keep = 1;
        }
        self
    }

    pub fn resolved_db_path(&self) -> PathBuf {
        expand_home(&self.db_path)
    }

    pub fn resolved_checklist_path(&self) -> Option<PathBuf> {
        self.checklist_path.as_deref().map(expand_home)
    }

    pub fn resolved_backup_dir(&self) -> PathBuf {
        match &self.backup.dir {
            Some(dir) => expand_home(dir),
            None => self
                .resolved_db_path()
                .parent()
                .map(|p| p.join("backups"))
                .unwrap_or_else(|| PathBuf::from("backups")),
        }
    }
}

fn expand_home(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(stripped);
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config() {
        let cfg = TrackerConfig::default();
        assert!(cfg.db_path.ends_with("gatetrack.db"));
        assert!(cfg.backup.enabled);
        assert!(cfg.backup.on_startup);
        assert_eq!(cfg.backup.keep, 30);
        assert_eq!(cfg.display.thresholds(), ReadinessThresholds::default());
    }

    #[test]
    fn test_parse_empty_config() {
        assert_eq!(TrackerConfig::parse("").unwrap(), TrackerConfig::default());
    }

    #[test]
    fn test_parse_full_config() {
        let cfg = TrackerConfig::parse(
            r#"
db_path = "/tmp/gt/tracker.db"
checklist_path = "/tmp/gt/checklist.toml"

[backup]
enabled = false
keep = 5
on_startup = false

[display]
readiness_warn_below = 80
readiness_critical_below = 50
"#,
        )
        .unwrap();

        assert_eq!(cfg.resolved_db_path(), PathBuf::from("/tmp/gt/tracker.db"));
        assert_eq!(
            cfg.resolved_checklist_path(),
            Some(PathBuf::from("/tmp/gt/checklist.toml"))
        );
        assert_eq!(cfg.resolved_backup_dir(), PathBuf::from("/tmp/gt/backups"));
        assert!(!cfg.backup.enabled);
        assert_eq!(cfg.backup.keep, 5);
        assert_eq!(cfg.display.readiness_warn_below, 80.0);
        assert_eq!(cfg.display.readiness_critical_below, 50.0);
    }

    #[test]
    fn test_out_of_range_values_are_clamped() {
        let cfg = TrackerConfig::parse(
            "[display]\nreadiness_warn_below = 150.0\nreadiness_critical_below = -5.0\n[backup]\nkeep = 0\n",
        )
        .unwrap();
        assert_eq!(cfg.display.readiness_warn_below, 100.0);
        assert_eq!(cfg.display.readiness_critical_below, 0.0);
        assert_eq!(cfg.backup.keep, 1);
    }

    #[test]
    fn test_inverted_thresholds_are_kept() {
        let cfg = TrackerConfig::parse(
            "[display]\nreadiness_warn_below = 60.0\nreadiness_critical_below = 85.0\n",
        )
        .unwrap();
        assert_eq!(cfg.display.readiness_warn_below, 60.0);
        assert_eq!(cfg.display.readiness_critical_below, 85.0);
        assert_eq!(
            cfg.display.thresholds().band(70.0),
            crate::readiness::ReadinessBand::Critical
        );
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        let err = TrackerConfig::parse("db_path = [").unwrap_err();
        assert!(matches!(err, TrackerError::ConfigParse { .. }));
    }

    #[test]
    fn test_explicit_path_must_exist() {
        let dir = tempfile::TempDir::new().unwrap();
        let missing = dir.path().join("missing.toml");
        assert!(matches!(
            TrackerConfig::load(Some(&missing)),
            Err(TrackerError::FileRead { .. })
        ));

        let path = dir.path().join("config.toml");
        std::fs::write(&path, "db_path = \"/srv/gatetrack.db\"\n").unwrap();
        let cfg = TrackerConfig::load(Some(&path)).unwrap();
        assert_eq!(cfg.db_path, "/srv/gatetrack.db");
    }
}
