//! TOML-based scheduler configuration.
//!
//! Stores the scheduling preferences:
//! - Daily allowed window and slot size
//! - Weekday and weekend work caps
//! - Session length bounds
//! - Grace window for flexible deadlines
//!
//! Configuration is stored at `~/.config/timetable/config.toml`.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::error::{ConfigError, Result};
use crate::scheduler::{DailyCaps, SchedulerConfig};
use crate::task::hours_to_minutes;
use crate::timeline::DailyWindow;

/// Longest accepted grace window for Flexible items (ten years).
pub const MAX_GRACE_DAYS: u32 = 3650;

/// Daily window configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowConfig {
    #[serde(default = "default_window_start")]
    pub start: String,
    #[serde(default = "default_window_end")]
    pub end: String,
    #[serde(default = "default_slot_minutes")]
    pub slot_minutes: u32,
}

/// Daily work caps, in hours.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapsConfig {
    #[serde(default = "default_weekday_hours")]
    pub weekday_hours: f64,
    #[serde(default = "default_weekend_hours")]
    pub weekend_hours: f64,
}

/// Session length bounds, in hours.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionsConfig {
    #[serde(default = "default_min_hours")]
    pub min_hours: f64,
    #[serde(default = "default_max_hours")]
    pub max_hours: f64,
}

/// Flexible deadline configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlexibleConfig {
    #[serde(default = "default_grace_days")]
    pub grace_days: u32,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/timetable/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub window: WindowConfig,
    #[serde(default)]
    pub caps: CapsConfig,
    #[serde(default)]
    pub sessions: SessionsConfig,
    #[serde(default)]
    pub flexible: FlexibleConfig,
}

// Default functions
fn default_window_start() -> String {
    "12:00".into()
}
fn default_window_end() -> String {
    "18:00".into()
}
fn default_slot_minutes() -> u32 {
    30
}
fn default_weekday_hours() -> f64 {
    3.0
}
fn default_weekend_hours() -> f64 {
    6.0
}
fn default_min_hours() -> f64 {
    2.0
}
fn default_max_hours() -> f64 {
    5.0
}
fn default_grace_days() -> u32 {
    5
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            start: default_window_start(),
            end: default_window_end(),
            slot_minutes: default_slot_minutes(),
        }
    }
}

impl Default for CapsConfig {
    fn default() -> Self {
        Self {
            weekday_hours: default_weekday_hours(),
            weekend_hours: default_weekend_hours(),
        }
    }
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            min_hours: default_min_hours(),
            max_hours: default_max_hours(),
        }
    }
}

impl Default for FlexibleConfig {
    fn default() -> Self {
        Self {
            grace_days: default_grace_days(),
        }
    }
}

fn invalid(key: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        message: message.into(),
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || invalid(key, "unknown config key");

        let mut parts = key.split('.').peekable();
        if key.is_empty() {
            return Err(invalid(key, "config key is empty"));
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_some() {
                current = current.get_mut(part).ok_or_else(unknown)?;
                continue;
            }

            let obj = current.as_object_mut().ok_or_else(unknown)?;
            let existing = obj.get(part).ok_or_else(unknown)?;

            let new_value = match existing {
                serde_json::Value::Bool(_) => serde_json::Value::Bool(
                    value
                        .parse::<bool>()
                        .map_err(|_| invalid(key, format!("cannot parse '{value}' as bool")))?,
                ),
                serde_json::Value::Number(_) => {
                    if let Ok(n) = value.parse::<u64>() {
                        serde_json::Value::Number(n.into())
                    } else if let Ok(n) = value.parse::<f64>() {
                        serde_json::Number::from_f64(n)
                            .map(serde_json::Value::Number)
                            .ok_or_else(|| invalid(key, format!("cannot parse '{value}' as number")))?
                    } else {
                        return Err(invalid(key, format!("cannot parse '{value}' as number")));
                    }
                }
                serde_json::Value::Object(_) => return Err(invalid(key, "is a section, not a value")),
                _ => serde_json::Value::String(value.into()),
            };

            obj.insert(part.to_string(), new_value);
            return Ok(());
        }

        Err(unknown())
    }

    /// Location of `config.toml`.
    pub fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from disk, writing the defaults when no file exists yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::path()?;
        if path.exists() {
            Self::load_from(&path)
        } else {
            let cfg = Self::default();
            cfg.save_to(&path)?;
            Ok(cfg)
        }
    }

    /// Load from an explicit file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::LoadFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::ParseFailed(e.to_string()))
    }

    /// Persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Every leaf key with its value, sorted by key.
    pub fn entries(&self) -> Vec<(String, String)> {
        fn walk(prefix: &str, value: &serde_json::Value, out: &mut Vec<(String, String)>) {
            match value {
                serde_json::Value::Object(map) => {
                    for (k, v) in map {
                        let key = if prefix.is_empty() {
                            k.clone()
                        } else {
                            format!("{prefix}.{k}")
                        };
                        walk(&key, v, out);
                    }
                }
                serde_json::Value::String(s) => out.push((prefix.to_string(), s.clone())),
                other => out.push((prefix.to_string(), other.to_string())),
            }
        }

        let mut out = Vec::new();
        if let Ok(json) = serde_json::to_value(self) {
            walk("", &json, &mut out);
        }
        out
    }

    /// Change a value in memory, rejecting unknown keys and values that
    /// would produce an unusable scheduler configuration.
    pub fn apply(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json = serde_json::to_value(&*self).map_err(|e| invalid(key, e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json).map_err(|e| invalid(key, e.to_string()))?;
        updated
            .scheduler_config()
            .map_err(|e| invalid(key, e.to_string()))?;
        *self = updated;
        Ok(())
    }

    /// Set a config value by key and save. Returns error if key is unknown.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed,
    /// or the config cannot be saved.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.apply(key, value)?;
        self.save()
    }

    /// Build the scheduler configuration these settings describe.
    pub fn scheduler_config(&self) -> Result<SchedulerConfig> {
        let window = DailyWindow::parse(&self.window.start, &self.window.end)?;

        if self.window.slot_minutes == 0 {
            return Err(invalid("window.slot_minutes", "must be positive").into());
        }
        for (key, hours) in [
            ("caps.weekday_hours", self.caps.weekday_hours),
            ("caps.weekend_hours", self.caps.weekend_hours),
        ] {
            if !(hours >= 0.0) {
                return Err(invalid(key, "must not be negative").into());
            }
        }
        if !(self.sessions.min_hours > 0.0) {
            return Err(invalid("sessions.min_hours", "must be positive").into());
        }
        if self.sessions.min_hours > self.sessions.max_hours {
            return Err(invalid("sessions.max_hours", "must not be below sessions.min_hours").into());
        }
        if self.flexible.grace_days > MAX_GRACE_DAYS {
            return Err(invalid(
                "flexible.grace_days",
                format!("must be at most {MAX_GRACE_DAYS}"),
            )
            .into());
        }

        Ok(SchedulerConfig {
            window,
            slot_size: Duration::minutes(i64::from(self.window.slot_minutes)),
            caps: DailyCaps::new(
                hours_to_minutes(self.caps.weekday_hours),
                hours_to_minutes(self.caps.weekend_hours),
            ),
            min_session_minutes: hours_to_minutes(self.sessions.min_hours),
            max_session_minutes: hours_to_minutes(self.sessions.max_hours),
            grace: Duration::days(i64::from(self.flexible.grace_days)),
        })
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, cfg);
    }

    #[test]
    fn default_matches_scheduler_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.scheduler_config().unwrap(), SchedulerConfig::default());
    }

    #[test]
    fn partial_file_fills_defaults() {
        let cfg: Config = toml::from_str("[caps]\nweekday_hours = 2.5\n").unwrap();
        assert_eq!(cfg.caps.weekday_hours, 2.5);
        assert_eq!(cfg.caps.weekend_hours, 6.0);
        assert_eq!(cfg.window.start, "12:00");
        assert_eq!(cfg.scheduler_config().unwrap().caps.weekday_minutes, 150);
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("window.start").as_deref(), Some("12:00"));
        assert_eq!(cfg.get("flexible.grace_days").as_deref(), Some("5"));
        assert_eq!(cfg.get("caps.weekday_hours").as_deref(), Some("3.0"));
        assert!(cfg.get("caps.missing_key").is_none());
    }

    #[test]
    fn apply_updates_nested_values() {
        let mut cfg = Config::default();
        cfg.apply("caps.weekday_hours", "4").unwrap();
        cfg.apply("window.end", "20:00").unwrap();
        cfg.apply("flexible.grace_days", "2").unwrap();
        assert_eq!(cfg.caps.weekday_hours, 4.0);
        assert_eq!(cfg.window.end, "20:00");
        assert_eq!(cfg.scheduler_config().unwrap().grace, Duration::days(2));
    }

    #[test]
    fn apply_rejects_unknown_key() {
        let mut cfg = Config::default();
        assert!(cfg.apply("caps.monthly_hours", "1").is_err());
        assert!(cfg.apply("caps", "1").is_err());
        assert!(cfg.apply("", "1").is_err());
    }

    #[test]
    fn apply_rejects_invalid_values() {
        let mut cfg = Config::default();
        assert!(cfg.apply("window.slot_minutes", "half").is_err());
        assert!(cfg.apply("window.start", "19:00").is_err());
        assert!(cfg.apply("sessions.min_hours", "6").is_err());
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn grace_days_are_bounded() {
        let mut cfg = Config::default();
        assert!(cfg.apply("flexible.grace_days", "4000000000").is_err());
        assert_eq!(cfg.flexible.grace_days, 5);

        cfg.apply("flexible.grace_days", &MAX_GRACE_DAYS.to_string()).unwrap();
        assert_eq!(
            cfg.scheduler_config().unwrap().grace,
            Duration::days(i64::from(MAX_GRACE_DAYS))
        );

        let file: Config = toml::from_str("[flexible]\ngrace_days = 4000000000\n").unwrap();
        assert!(file.scheduler_config().is_err());
    }

    #[test]
    fn entries_list_every_leaf() {
        let keys: Vec<String> = Config::default().entries().into_iter().map(|(k, _)| k).collect();
        assert!(keys.contains(&"window.slot_minutes".to_string()));
        assert!(keys.contains(&"sessions.max_hours".to_string()));
        assert_eq!(keys.len(), 8);
    }

    #[test]
    fn save_and_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut cfg = Config::default();
        cfg.apply("sessions.max_hours", "3").unwrap();
        cfg.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap(), cfg);
    }

    #[test]
    fn broken_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[caps\n").unwrap();
        assert!(matches!(Config::load_from(&path), Err(ConfigError::ParseFailed(_))));
    }
}
