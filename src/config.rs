use std::fs;
use std::ops::RangeInclusive;
use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

pub const MIN_QUESTIONS: usize = 5;
pub const MAX_QUESTIONS: usize = 35;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_ref_number_min")]
    pub ref_number_min: u32,
    #[serde(default = "default_ref_number_max")]
    pub ref_number_max: u32,
    #[serde(default = "default_question_count")]
    pub default_question_count: usize,
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
}

fn default_data_dir() -> String {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("qwhizz")
        .to_string_lossy()
        .to_string()
}
fn default_ref_number_min() -> u32 {
    1000
}
fn default_ref_number_max() -> u32 {
    1099
}
fn default_question_count() -> usize {
    10
}
fn default_tick_interval_ms() -> u64 {
    1000
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            ref_number_min: default_ref_number_min(),
            ref_number_max: default_ref_number_max(),
            default_question_count: default_question_count(),
            tick_interval_ms: default_tick_interval_ms(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path();
        if path.exists() {
            let content = fs::read_to_string(&path)?;
            let mut config: Config = toml::from_str(&content)?;
            config.validate();
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("qwhizz")
            .join("config.toml")
    }

    pub fn data_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir)
    }

    pub fn ref_range(&self) -> RangeInclusive<u32> {
        self.ref_number_min..=self.ref_number_max
    }

    /// Clamp out-of-range values loaded from an edited or stale config.
    pub fn validate(&mut self) {
        self.default_question_count = clamp_question_count(self.default_question_count);
        if self.ref_number_min > self.ref_number_max {
            self.ref_number_min = default_ref_number_min();
            self.ref_number_max = default_ref_number_max();
        }
        self.tick_interval_ms = self.tick_interval_ms.max(100);
        if self.data_dir.trim().is_empty() {
            self.data_dir = default_data_dir();
        }
    }
}

pub fn clamp_question_count(count: usize) -> usize {
    count.clamp(MIN_QUESTIONS, MAX_QUESTIONS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_serde_defaults_from_empty() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.ref_range(), 1000..=1099);
        assert_eq!(config.default_question_count, 10);
        assert_eq!(config.tick_interval_ms, 1000);
        assert!(config.data_dir.contains("qwhizz"));
    }

    #[test]
    fn test_config_accepts_wide_ref_range() {
        let toml_str = r#"
ref_number_min = 1000
ref_number_max = 9999
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.ref_range().count(), 9000);
    }

    #[test]
    fn test_config_validate_clamps_values() {
        let mut config = Config::default();
        config.default_question_count = 99;
        config.ref_number_min = 5000;
        config.ref_number_max = 10;
        config.tick_interval_ms = 0;
        config.data_dir = "  ".to_string();
        config.validate();
        assert_eq!(config.default_question_count, MAX_QUESTIONS);
        assert_eq!(config.ref_range(), 1000..=1099);
        assert_eq!(config.tick_interval_ms, 100);
        assert!(!config.data_dir.trim().is_empty());
    }

    #[test]
    fn test_config_serde_roundtrip() {
        let config = Config::default();
        let serialized = toml::to_string_pretty(&config).unwrap();
        let deserialized: Config = toml::from_str(&serialized).unwrap();
        assert_eq!(config.data_dir, deserialized.data_dir);
        assert_eq!(config.ref_range(), deserialized.ref_range());
    }
}
