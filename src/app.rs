use rand::SeedableRng;
use rand::rngs::SmallRng;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{QuizError, QuizResult};
use crate::generator::{self, Difficulty, Topic};
use crate::session::draft::SessionDraft;
use crate::session::quiz::{Completion, QuizSession, SessionState};
use crate::session::record::QuizRecord;
use crate::session::username::validate_username;
use crate::store::json_store::{JsonStore, RejectPolicy, RejectedEntry, SCOREBOARD_FILE, SETTINGS_FILE};
use crate::store::schema::{HistoryLimit, Settings};
use crate::store::score_store::{DeleteSelector, MatchKey, ScoreStore};
use crate::timer::TickToken;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Page {
    Home,
    Quiz,
    Scoreboard,
    Completion,
}

impl Page {
    pub fn as_str(self) -> &'static str {
        match self {
            Page::Home => "home",
            Page::Quiz => "quiz",
            Page::Scoreboard => "scoreboard",
            Page::Completion => "completion",
        }
    }
}

/// Something the front end should tell the user about after opening the data files.
#[derive(Debug)]
pub enum LoadIssue {
    /// The file was missing and has been created with defaults.
    Created(&'static str),
    /// Scoreboard entries that failed validation and were left out.
    Rejected(Vec<RejectedEntry>),
    /// The file could not be parsed and was replaced with defaults.
    Replaced { file: &'static str, reason: String },
    /// Reading or writing failed; the app runs in temporary mode.
    Failed(QuizError),
}

/// Whether a change reached the data files.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Persisted {
    Saved,
    /// Temporary mode: the change lives in memory until exit.
    MemoryOnly,
}

/// Where a finished quiz ended up on the scoreboard.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SavedScore {
    pub index: usize,
    pub ref_number: u32,
    pub persisted: Persisted,
}

struct Loaded {
    settings: Settings,
    records: Vec<QuizRecord>,
    issues: Vec<LoadIssue>,
    clean: bool,
}

/// Everything the pages share: settings, scores, the in-flight draft and
/// the current page. Every mutation of settings or scores is persisted
/// immediately unless the app is in temporary mode.
pub struct AppState {
    pub config: Config,
    pub page: Page,
    pub draft: Option<SessionDraft>,
    settings: Settings,
    store: ScoreStore,
    json: Option<JsonStore>,
    temporary_mode: bool,
    policy: RejectPolicy,
    load_issues: Vec<LoadIssue>,
    rng: SmallRng,
}

impl AppState {
    /// Open the data files under `config.data_dir`. A directory that cannot
    /// be created puts the app straight into temporary mode.
    pub fn new(config: Config, policy: RejectPolicy) -> Self {
        match JsonStore::new(&config) {
            Ok(json) => Self::load(config, Some(json), policy),
            Err(e) => {
                warn!(error = %e, "data directory unavailable");
                let mut app = Self::load(config, None, policy);
                app.load_issues.push(LoadIssue::Failed(e));
                app
            }
        }
    }

    pub fn load(config: Config, json: Option<JsonStore>, policy: RejectPolicy) -> Self {
        let loaded = match &json {
            Some(json) => load_documents(json, policy),
            None => Loaded {
                settings: Settings::default(),
                records: Vec::new(),
                issues: Vec::new(),
                clean: false,
            },
        };
        let store = ScoreStore::with_records(
            loaded.records,
            config.ref_range(),
            loaded.settings.deletion_history_states,
        );
        let mut app = Self {
            config,
            page: Page::Home,
            draft: None,
            settings: loaded.settings,
            store,
            json,
            temporary_mode: false,
            policy,
            load_issues: loaded.issues,
            rng: SmallRng::from_entropy(),
        };
        if !loaded.clean {
            app.enter_temporary_mode();
        }
        app
    }

    pub fn with_rng(mut self, rng: SmallRng) -> Self {
        self.rng = rng;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn store(&self) -> &ScoreStore {
        &self.store
    }

    pub fn is_temporary(&self) -> bool {
        self.temporary_mode
    }

    /// Issues found by the last load attempt, drained so each is reported once.
    pub fn take_load_issues(&mut self) -> Vec<LoadIssue> {
        std::mem::take(&mut self.load_issues)
    }

    pub fn rng(&mut self) -> &mut SmallRng {
        &mut self.rng
    }

    fn enter_temporary_mode(&mut self) {
        if !self.temporary_mode {
            warn!("entering temporary mode, changes will not be saved");
        }
        self.temporary_mode = true;
    }

    /// Try to read the data files again after an earlier failure. Returns
    /// whether the app left temporary mode. In-memory changes made while
    /// temporary are replaced by the files' contents. The issues of this
    /// attempt replace any earlier ones still waiting to be taken.
    ///
    /// Every operation that changes settings or scores calls this first.
    pub fn reload_if_temporary(&mut self) -> bool {
        if !self.temporary_mode {
            return false;
        }
        if self.json.is_none() {
            match JsonStore::new(&self.config) {
                Ok(json) => self.json = Some(json),
                Err(e) => {
                    debug!(error = %e, "data directory still unavailable");
                    self.load_issues = vec![LoadIssue::Failed(e)];
                    return false;
                }
            }
        }
        let Some(json) = &self.json else {
            return false;
        };
        if let Err(e) = json.ensure_dir() {
            debug!(error = %e, "data directory still unavailable");
            self.load_issues = vec![LoadIssue::Failed(e)];
            return false;
        }
        let loaded = load_documents(json, self.policy);
        self.load_issues = loaded.issues;
        if !loaded.clean {
            debug!("reload failed, staying in temporary mode");
            return false;
        }
        self.settings = loaded.settings;
        self.store.replace_records(loaded.records);
        self.store.set_history_limit(self.settings.deletion_history_states);
        self.temporary_mode = false;
        info!("reloaded data files, leaving temporary mode");
        true
    }

    fn persist_scores(&mut self) -> QuizResult<Persisted> {
        let Some(json) = self.json.as_ref().filter(|_| !self.temporary_mode) else {
            debug!("temporary mode, scoreboard not saved");
            return Ok(Persisted::MemoryOnly);
        };
        if let Err(e) = json.save_scoreboard(self.store.list()) {
            self.enter_temporary_mode();
            return Err(e);
        }
        Ok(Persisted::Saved)
    }

    fn persist_settings(&mut self) -> QuizResult<Persisted> {
        let Some(json) = self.json.as_ref().filter(|_| !self.temporary_mode) else {
            debug!("temporary mode, settings not saved");
            return Ok(Persisted::MemoryOnly);
        };
        if let Err(e) = json.save_settings(&self.settings) {
            self.enter_temporary_mode();
            return Err(e);
        }
        Ok(Persisted::Saved)
    }

    /// Validate the setup form and start a fresh quiz. A name that already
    /// has a score at this difficulty needs `confirm_overwrite`.
    pub fn prepare_quiz(
        &mut self,
        username: &str,
        difficulty: Difficulty,
        question_count: usize,
        confirm_overwrite: bool,
        accept_underscores: bool,
    ) -> QuizResult<QuizSession> {
        let username = validate_username(username, accept_underscores)?;
        self.reload_if_temporary();
        let conflict = self
            .store
            .find_conflict(&username, difficulty)
            .map(|r| r.ref_number);
        if let Some(ref_number) = conflict {
            if !confirm_overwrite {
                return Err(QuizError::DuplicateScoreConflict {
                    username,
                    difficulty,
                    ref_number,
                });
            }
        }
        let topics = self.settings.topics();
        if topics.is_empty() {
            return Err(QuizError::NoTopicsSelected);
        }
        let ref_number = self.store.allocate_ref_number(&mut self.rng)?;
        let questions = generator::generate(difficulty, topics, question_count, &mut self.rng)?;

        let draft = SessionDraft::new(username, difficulty, question_count);
        let mut session = QuizSession::new(
            draft.clone(),
            ref_number,
            conflict.is_some(),
            self.settings.enable_timer,
        );
        session.start(questions)?;
        info!(
            ref_number,
            username = %draft.username,
            %difficulty,
            question_count,
            "quiz started"
        );
        self.draft = Some(draft);
        self.page = Page::Quiz;
        Ok(session)
    }

    /// Replay a saved quiz. `Ok(None)` when no score has that reference number.
    pub fn retry(&mut self, ref_number: u32) -> QuizResult<Option<QuizSession>> {
        self.reload_if_temporary();
        let Some(prior) = self.store.get(ref_number) else {
            return Ok(None);
        };
        let session = QuizSession::retry(prior, self.settings.enable_timer)?;
        self.draft = Some(session.draft().clone());
        self.page = Page::Quiz;
        Ok(Some(session))
    }

    pub fn review(&mut self, ref_number: u32) -> Option<QuizSession> {
        let session = QuizSession::review_answers(self.store.get(ref_number)?);
        self.page = Page::Quiz;
        Some(session)
    }

    /// "New Quiz" from the quiz page. A finished attempt is already on the
    /// scoreboard, so the fresh batch gets a new reference number.
    pub fn new_quiz(&mut self, session: &mut QuizSession) -> QuizResult<TickToken> {
        let topics = self.settings.topics();
        if session.state() != SessionState::Completed {
            return session.restart(true, topics, &mut self.rng);
        }
        self.reload_if_temporary();
        let ref_number = self.store.allocate_ref_number(&mut self.rng)?;
        let token = session.new_quiz(ref_number, topics, &mut self.rng)?;
        info!(ref_number, "new quiz started after completion");
        self.page = Page::Quiz;
        Ok(token)
    }

    /// Save a finished quiz. The score stays on the in-memory scoreboard
    /// even when writing it fails.
    pub fn finish_quiz(&mut self, completion: Completion) -> QuizResult<SavedScore> {
        let Completion {
            mut record,
            overwrite,
        } = completion;
        if self.reload_if_temporary() {
            let key = MatchKey::of(&record);
            let taken = self
                .store
                .get(record.ref_number)
                .is_some_and(|held| !(overwrite && key.matches(held)));
            if taken {
                let ref_number = self.store.allocate_ref_number(&mut self.rng)?;
                info!(old = record.ref_number, ref_number, "reference number taken after reload");
                record.ref_number = ref_number;
            }
        }
        let ref_number = record.ref_number;
        let index = self.store.insert_or_overwrite(record, overwrite);
        self.page = Page::Completion;
        let persisted = self.persist_scores()?;
        Ok(SavedScore {
            index,
            ref_number,
            persisted,
        })
    }

    /// Drop the draft and go to `destination`.
    pub fn leave_quiz(&mut self, destination: Page) {
        debug!(from = self.page.as_str(), to = destination.as_str(), "leaving quiz");
        self.draft = None;
        self.page = destination;
    }

    pub fn delete_scores(&mut self, selector: &DeleteSelector) -> QuizResult<usize> {
        self.reload_if_temporary();
        let removed = self.store.delete(selector);
        if removed > 0 {
            self.persist_scores()?;
        }
        Ok(removed)
    }

    pub fn undo_delete(&mut self) -> QuizResult<usize> {
        self.reload_if_temporary();
        let restored = self.store.undo();
        if restored > 0 {
            self.persist_scores()?;
        }
        Ok(restored)
    }

    pub fn redo_delete(&mut self) -> QuizResult<usize> {
        self.reload_if_temporary();
        let removed = self.store.redo();
        if removed > 0 {
            self.persist_scores()?;
        }
        Ok(removed)
    }

    pub fn set_timer_enabled(&mut self, enabled: bool) -> QuizResult<Persisted> {
        self.reload_if_temporary();
        self.settings.enable_timer = enabled;
        self.persist_settings()
    }

    pub fn set_topic_enabled(&mut self, topic: Topic, enabled: bool) -> QuizResult<Persisted> {
        self.reload_if_temporary();
        match topic {
            Topic::Algebra => self.settings.enable_algebra = enabled,
            Topic::Trigonometry => self.settings.enable_trigonometry = enabled,
        }
        self.persist_settings()
    }

    /// Recovery path for `NoTopicsSelected`.
    pub fn enable_all_topics(&mut self) -> QuizResult<Persisted> {
        self.reload_if_temporary();
        self.settings.enable_algebra = true;
        self.settings.enable_trigonometry = true;
        self.persist_settings()
    }

    pub fn set_history_limit(&mut self, limit: HistoryLimit) -> QuizResult<Persisted> {
        self.reload_if_temporary();
        self.settings.deletion_history_states = limit;
        self.store.set_history_limit(limit);
        self.persist_settings()
    }
}

fn load_documents(json: &JsonStore, policy: RejectPolicy) -> Loaded {
    let mut issues = Vec::new();
    let mut clean = true;

    let settings = match json.load_settings() {
        Ok(Some(settings)) => settings,
        Ok(None) => {
            issues.push(LoadIssue::Created(SETTINGS_FILE));
            json.reset_settings().unwrap_or_else(|e| {
                clean = false;
                issues.push(LoadIssue::Failed(e));
                Settings::default()
            })
        }
        Err(QuizError::CorruptPersistedData { reason, .. }) if policy == RejectPolicy::Discard => {
            warn!(%reason, "replacing unreadable settings");
            issues.push(LoadIssue::Replaced {
                file: SETTINGS_FILE,
                reason,
            });
            json.reset_settings().unwrap_or_else(|e| {
                clean = false;
                issues.push(LoadIssue::Failed(e));
                Settings::default()
            })
        }
        Err(e) => {
            clean = false;
            issues.push(LoadIssue::Failed(e));
            Settings::default()
        }
    };

    let records = match json.load_scoreboard() {
        Ok(Some(load)) => {
            if !load.rejected.is_empty() {
                match policy {
                    RejectPolicy::Discard => {
                        if let Err(e) = json.backup_scoreboard() {
                            warn!(error = %e, "could not back up scoreboard");
                        }
                        if let Err(e) = json.save_scoreboard(&load.records) {
                            clean = false;
                            issues.push(LoadIssue::Failed(e));
                        }
                    }
                    RejectPolicy::KeepFile => clean = false,
                }
                issues.push(LoadIssue::Rejected(load.rejected));
            }
            load.records
        }
        Ok(None) => {
            issues.push(LoadIssue::Created(SCOREBOARD_FILE));
            if let Err(e) = json.reset_scoreboard() {
                clean = false;
                issues.push(LoadIssue::Failed(e));
            }
            Vec::new()
        }
        Err(QuizError::CorruptPersistedData { reason, .. }) if policy == RejectPolicy::Discard => {
            warn!(%reason, "replacing unreadable scoreboard");
            if let Err(e) = json.backup_scoreboard() {
                warn!(error = %e, "could not back up scoreboard");
            }
            issues.push(LoadIssue::Replaced {
                file: SCOREBOARD_FILE,
                reason,
            });
            if let Err(e) = json.reset_scoreboard() {
                clean = false;
                issues.push(LoadIssue::Failed(e));
            }
            Vec::new()
        }
        Err(e) => {
            clean = false;
            issues.push(LoadIssue::Failed(e));
            Vec::new()
        }
    };

    Loaded {
        settings,
        records,
        issues,
        clean,
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use super::*;
    use crate::session::quiz::{SessionMode, SubmitOutcome};
    use crate::session::record::fixtures::record;
    use tempfile::TempDir;

    fn make_app(policy: RejectPolicy) -> (TempDir, AppState) {
        let dir = TempDir::new().unwrap();
        let json = JsonStore::with_base_dir(dir.path().to_path_buf()).unwrap();
        let app = AppState::load(Config::default(), Some(json), policy)
            .with_rng(SmallRng::seed_from_u64(7));
        (dir, app)
    }

    fn play_through(session: &mut QuizSession) -> Completion {
        loop {
            let answer = session.current_question().unwrap().correct_answer.clone();
            if let SubmitOutcome::Completed(completion) = session.submit_answer(&answer).unwrap() {
                return completion;
            }
        }
    }

    #[test]
    fn test_fresh_directory_creates_both_files() {
        let (dir, mut app) = make_app(RejectPolicy::Discard);
        assert!(!app.is_temporary());
        assert!(dir.path().join(SCOREBOARD_FILE).exists());
        assert!(dir.path().join(SETTINGS_FILE).exists());
        let issues = app.take_load_issues();
        assert_eq!(issues.len(), 2);
        assert!(app.take_load_issues().is_empty());
    }

    #[test]
    fn test_prepare_quiz_starts_session_and_sets_draft() {
        let (_dir, mut app) = make_app(RejectPolicy::Discard);
        let session = app
            .prepare_quiz("  alice ", Difficulty::Medium, 6, false, false)
            .unwrap();
        assert_eq!(session.state(), SessionState::InProgress);
        assert_eq!(session.question_count(), 6);
        assert!(app.config.ref_range().contains(&session.ref_number()));
        assert_eq!(app.draft.as_ref().unwrap().username, "alice");
        assert_eq!(app.page, Page::Quiz);
    }

    #[test]
    fn test_duplicate_needs_confirmation_then_overwrites() {
        let (_dir, mut app) = make_app(RejectPolicy::Discard);
        let mut first = app.prepare_quiz("alice", Difficulty::Easy, 5, false, false).unwrap();
        app.finish_quiz(play_through(&mut first)).unwrap();

        let err = app
            .prepare_quiz("ALICE", Difficulty::Easy, 5, false, false)
            .err()
            .unwrap();
        assert!(matches!(err, QuizError::DuplicateScoreConflict { .. }));

        let mut second = app.prepare_quiz("ALICE", Difficulty::Easy, 5, true, false).unwrap();
        let saved = app.finish_quiz(play_through(&mut second)).unwrap();
        assert_eq!(saved.index, 0);
        assert_eq!(saved.persisted, Persisted::Saved);
        assert_eq!(app.store().len(), 1);
        assert_eq!(app.store().list()[0].username, "ALICE");
        assert_eq!(app.page, Page::Completion);
    }

    #[test]
    fn test_no_topics_then_enable_all() {
        let (dir, mut app) = make_app(RejectPolicy::Discard);
        app.set_topic_enabled(Topic::Algebra, false).unwrap();
        app.set_topic_enabled(Topic::Trigonometry, false).unwrap();
        assert!(matches!(
            app.prepare_quiz("alice", Difficulty::Hard, 5, false, false),
            Err(QuizError::NoTopicsSelected)
        ));
        app.enable_all_topics().unwrap();
        let saved = fs::read_to_string(dir.path().join(SETTINGS_FILE)).unwrap();
        assert!(saved.contains("\"enable_algebra\": true"));
        assert!(app.prepare_quiz("alice", Difficulty::Hard, 5, false, false).is_ok());
    }

    #[test]
    fn test_invalid_username_is_reported_before_anything_else() {
        let (_dir, mut app) = make_app(RejectPolicy::Discard);
        assert!(matches!(
            app.prepare_quiz("a b", Difficulty::Easy, 5, false, false),
            Err(QuizError::InvalidUsername(_))
        ));
        assert!(app.draft.is_none());
        assert_eq!(app.page, Page::Home);
    }

    #[test]
    fn test_retry_and_review_unknown_ref() {
        let (_dir, mut app) = make_app(RejectPolicy::Discard);
        assert!(app.retry(4242).unwrap().is_none());
        assert!(app.review(4242).is_none());
    }

    #[test]
    fn test_retry_overwrites_in_place() {
        let (_dir, mut app) = make_app(RejectPolicy::Discard);
        let mut session = app.prepare_quiz("bob", Difficulty::Hard, 5, false, false).unwrap();
        let ref_number = session.ref_number();
        app.finish_quiz(play_through(&mut session)).unwrap();

        let mut retry = app.retry(ref_number).unwrap().unwrap();
        assert_eq!(retry.mode(), SessionMode::Retry);
        app.finish_quiz(play_through(&mut retry)).unwrap();
        assert_eq!(app.store().len(), 1);
        assert_eq!(app.store().list()[0].ref_number, ref_number);
    }

    #[test]
    fn test_delete_undo_redo_persist() {
        let (dir, mut app) = make_app(RejectPolicy::Discard);
        let mut session = app.prepare_quiz("carol", Difficulty::Easy, 5, false, false).unwrap();
        app.finish_quiz(play_through(&mut session)).unwrap();
        let path = dir.path().join(SCOREBOARD_FILE);

        assert_eq!(app.delete_scores(&DeleteSelector::All).unwrap(), 1);
        assert_eq!(fs::read_to_string(&path).unwrap(), "[]");
        assert_eq!(app.undo_delete().unwrap(), 1);
        assert!(fs::read_to_string(&path).unwrap().contains("carol"));
        assert_eq!(app.redo_delete().unwrap(), 1);
        assert_eq!(fs::read_to_string(&path).unwrap(), "[]");
        assert_eq!(app.redo_delete().unwrap(), 0);
    }

    fn make_app_in_subdir(policy: RejectPolicy) -> (TempDir, PathBuf, AppState) {
        let dir = TempDir::new().unwrap();
        let data = dir.path().join("data");
        let json = JsonStore::with_base_dir(data.clone()).unwrap();
        let app = AppState::load(Config::default(), Some(json), policy)
            .with_rng(SmallRng::seed_from_u64(7));
        (dir, data, app)
    }

    #[test]
    fn test_failed_write_enters_temporary_mode() {
        let (_dir, data, mut app) = make_app_in_subdir(RejectPolicy::Discard);
        fs::remove_dir_all(&data).unwrap();
        fs::write(&data, "not a directory").unwrap();
        assert!(matches!(app.set_timer_enabled(false), Err(QuizError::Io { .. })));
        assert!(app.is_temporary());

        // The directory is still blocked, so the change stays in memory.
        assert_eq!(app.set_timer_enabled(true).unwrap(), Persisted::MemoryOnly);
        assert!(!app.reload_if_temporary());
        assert!(app.is_temporary());
    }

    #[test]
    fn test_score_kept_in_memory_is_reported() {
        let (_dir, data, mut app) = make_app_in_subdir(RejectPolicy::Discard);
        let mut session = app.prepare_quiz("erin", Difficulty::Easy, 5, false, false).unwrap();
        fs::remove_dir_all(&data).unwrap();
        fs::write(&data, "not a directory").unwrap();
        assert!(app.set_timer_enabled(false).is_err());

        let saved = app.finish_quiz(play_through(&mut session)).unwrap();
        assert_eq!(saved.persisted, Persisted::MemoryOnly);
        assert!(app.is_temporary());
        assert_eq!(app.store().list()[saved.index].username, "erin");
    }

    #[test]
    fn test_next_change_after_failed_write_reloads_and_saves() {
        let (_dir, data, mut app) = make_app_in_subdir(RejectPolicy::Discard);
        fs::remove_dir_all(&data).unwrap();
        assert!(app.set_timer_enabled(false).is_err());
        assert!(app.is_temporary());

        let mut session = app.prepare_quiz("frank", Difficulty::Medium, 5, false, false).unwrap();
        assert!(!app.is_temporary());
        let saved = app.finish_quiz(play_through(&mut session)).unwrap();
        assert_eq!(saved.persisted, Persisted::Saved);
        let on_disk = fs::read_to_string(data.join(SCOREBOARD_FILE)).unwrap();
        assert!(on_disk.contains("frank"));
        assert!(data.join(SETTINGS_FILE).exists());
    }

    #[test]
    fn test_repeated_failed_reloads_keep_one_set_of_issues() {
        let dir = TempDir::new().unwrap();
        let json = JsonStore::with_base_dir(dir.path().to_path_buf()).unwrap();
        fs::write(dir.path().join(SCOREBOARD_FILE), "[[1, 2, 3]]").unwrap();
        let mut app = AppState::load(Config::default(), Some(json), RejectPolicy::KeepFile);
        assert!(app.is_temporary());

        for _ in 0..50 {
            assert!(!app.reload_if_temporary());
        }
        let issues = app.take_load_issues();
        let rejected = issues
            .iter()
            .filter(|i| matches!(i, LoadIssue::Rejected(_)))
            .count();
        assert_eq!(rejected, 1);
    }

    #[test]
    fn test_new_quiz_after_completion_replaces_score_under_new_ref() {
        let (_dir, mut app) = make_app(RejectPolicy::Discard);
        let mut session = app.prepare_quiz("gina", Difficulty::Hard, 5, false, false).unwrap();
        let first_ref = session.ref_number();
        app.finish_quiz(play_through(&mut session)).unwrap();
        assert_eq!(session.state(), SessionState::Completed);

        app.new_quiz(&mut session).unwrap();
        assert_eq!(session.state(), SessionState::InProgress);
        assert_ne!(session.ref_number(), first_ref);
        assert_eq!(app.page, Page::Quiz);

        let saved = app.finish_quiz(play_through(&mut session)).unwrap();
        assert_eq!(app.store().len(), 1);
        assert_eq!(saved.ref_number, session.ref_number());
        assert_eq!(app.store().list()[0].ref_number, session.ref_number());
    }

    #[test]
    fn test_new_quiz_mid_session_keeps_ref() {
        let (_dir, mut app) = make_app(RejectPolicy::Discard);
        let mut session = app.prepare_quiz("hank", Difficulty::Easy, 5, false, false).unwrap();
        let ref_number = session.ref_number();
        app.new_quiz(&mut session).unwrap();
        assert_eq!(session.ref_number(), ref_number);
        assert!(app.store().is_empty());
    }

    #[test]
    fn test_keep_file_policy_retains_valid_entries_in_memory() {
        let dir = TempDir::new().unwrap();
        let json = JsonStore::with_base_dir(dir.path().to_path_buf()).unwrap();
        let good = serde_json::to_value(record(1001, "alice", Difficulty::Easy)).unwrap();
        let doc = serde_json::json!([good.clone(), [1, 2, 3]]).to_string();
        let path = dir.path().join(SCOREBOARD_FILE);
        fs::write(&path, &doc).unwrap();

        let mut app = AppState::load(Config::default(), Some(json), RejectPolicy::KeepFile);
        assert!(app.is_temporary());
        assert_eq!(app.store().len(), 1);
        assert_eq!(fs::read_to_string(&path).unwrap(), doc);
        assert!(
            app.take_load_issues()
                .iter()
                .any(|i| matches!(i, LoadIssue::Rejected(r) if r.len() == 1))
        );

        // Fixing the file lets the next access leave temporary mode.
        fs::write(&path, serde_json::json!([good]).to_string()).unwrap();
        assert!(app.reload_if_temporary());
        assert!(!app.is_temporary());
        assert_eq!(app.store().list()[0].username, "alice");
    }

    #[test]
    fn test_history_limit_setting_reaches_store() {
        let (_dir, mut app) = make_app(RejectPolicy::Discard);
        app.set_history_limit(HistoryLimit::Off).unwrap();
        assert_eq!(app.store().history_limit(), HistoryLimit::Off);
        assert_eq!(app.settings().deletion_history_states, HistoryLimit::Off);
    }
}
