use std::collections::HashSet;
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use chrono::Local;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{QuizError, QuizResult};
use crate::session::record::{QuizRecord, RECORD_FIELDS};
use crate::store::schema::Settings;

pub const SCOREBOARD_FILE: &str = "scoreboard.json";
pub const SETTINGS_FILE: &str = "settings.json";

/// A scoreboard entry that failed validation on load.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RejectedEntry {
    pub index: usize,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct ScoreboardLoad {
    pub records: Vec<QuizRecord>,
    pub rejected: Vec<RejectedEntry>,
}

/// What to do with the file when some entries were rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RejectPolicy {
    /// Rewrite the file with only the valid entries (a backup is kept).
    Discard,
    /// Leave the file alone and keep the valid entries in memory only.
    KeepFile,
}

/// Reads and writes the scoreboard and settings documents in one directory.
pub struct JsonStore {
    base_dir: PathBuf,
}

impl JsonStore {
    pub fn new(config: &Config) -> QuizResult<Self> {
        Self::with_base_dir(config.data_path())
    }

    pub fn with_base_dir(base_dir: PathBuf) -> QuizResult<Self> {
        let store = Self { base_dir };
        store.ensure_dir()?;
        Ok(store)
    }

    /// Create the data directory again if it went missing.
    pub fn ensure_dir(&self) -> QuizResult<()> {
        fs::create_dir_all(&self.base_dir).map_err(|e| QuizError::io(&self.base_dir, e))
    }

    pub fn file_path(&self, name: &str) -> PathBuf {
        self.base_dir.join(name)
    }

    fn read(&self, name: &str) -> QuizResult<Option<String>> {
        let path = self.file_path(name);
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(QuizError::io(path, e)),
        }
    }

    fn save<T: Serialize + ?Sized>(&self, name: &str, data: &T) -> QuizResult<()> {
        let path = self.file_path(name);
        let tmp_path = path.with_extension("json.tmp");

        let json = serde_json::to_string_pretty(data)
            .map_err(|e| QuizError::corrupt(&path, e))?;
        let write = || -> io::Result<()> {
            let mut file = fs::File::create(&tmp_path)?;
            file.write_all(json.as_bytes())?;
            file.sync_all()?;
            fs::rename(&tmp_path, &path)
        };
        write().map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            QuizError::io(&path, e)
        })?;
        debug!(path = %path.display(), "saved");
        Ok(())
    }

    /// `Ok(None)` when the file does not exist yet.
    pub fn load_scoreboard(&self) -> QuizResult<Option<ScoreboardLoad>> {
        let path = self.file_path(SCOREBOARD_FILE);
        let Some(content) = self.read(SCOREBOARD_FILE)? else {
            return Ok(None);
        };
        let value: Value =
            serde_json::from_str(&content).map_err(|e| QuizError::corrupt(&path, e))?;
        let Value::Array(entries) = value else {
            return Err(QuizError::corrupt(&path, "expected a list of scores"));
        };

        let mut load = ScoreboardLoad::default();
        let mut seen = HashSet::new();
        for (index, entry) in entries.into_iter().enumerate() {
            let parsed = parse_entry(entry).and_then(|record| {
                if seen.insert(record.ref_number) {
                    Ok(record)
                } else {
                    Err(format!("duplicate reference number {}", record.ref_number))
                }
            });
            match parsed {
                Ok(record) => load.records.push(record),
                Err(reason) => {
                    warn!(index, %reason, "rejecting scoreboard entry");
                    load.rejected.push(RejectedEntry { index, reason });
                }
            }
        }
        Ok(Some(load))
    }

    pub fn save_scoreboard(&self, records: &[QuizRecord]) -> QuizResult<()> {
        self.save(SCOREBOARD_FILE, records)
    }

    pub fn reset_scoreboard(&self) -> QuizResult<()> {
        self.save_scoreboard(&[])
    }

    /// Copy the current scoreboard aside before it is rewritten.
    pub fn backup_scoreboard(&self) -> QuizResult<PathBuf> {
        let source = self.file_path(SCOREBOARD_FILE);
        let stamp = Local::now().format("%Y%m%d-%H%M%S");
        let backup = self.file_path(&format!("scoreboard.{stamp}.bak.json"));
        fs::copy(&source, &backup).map_err(|e| QuizError::io(&source, e))?;
        Ok(backup)
    }

    /// `Ok(None)` when the file does not exist yet. All four keys are required.
    pub fn load_settings(&self) -> QuizResult<Option<Settings>> {
        let path = self.file_path(SETTINGS_FILE);
        let Some(content) = self.read(SETTINGS_FILE)? else {
            return Ok(None);
        };
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| QuizError::corrupt(path, e))
    }

    pub fn save_settings(&self, settings: &Settings) -> QuizResult<()> {
        self.save(SETTINGS_FILE, settings)
    }

    pub fn reset_settings(&self) -> QuizResult<Settings> {
        let defaults = Settings::default();
        self.save_settings(&defaults)?;
        Ok(defaults)
    }
}

fn parse_entry(entry: Value) -> Result<QuizRecord, String> {
    match entry.as_array() {
        Some(fields) if fields.len() == RECORD_FIELDS => {}
        Some(fields) => {
            return Err(format!(
                "expected {RECORD_FIELDS} elements, got {}",
                fields.len()
            ));
        }
        None => return Err("entry is not a list".to_string()),
    }
    let record: QuizRecord = serde_json::from_value(entry).map_err(|e| e.to_string())?;
    record.check_consistency()?;
    Ok(record)
}
