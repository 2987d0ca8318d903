use std::collections::{HashSet, VecDeque};
use std::ops::RangeInclusive;

use rand::Rng;
use rand::seq::IteratorRandom;
use tracing::{debug, info, warn};

use crate::error::{QuizError, QuizResult};
use crate::generator::Difficulty;
use crate::session::record::QuizRecord;
use crate::store::schema::HistoryLimit;

/// Records an overwrite replaces: same difficulty, username ignoring case.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MatchKey {
    username: String,
    difficulty: Difficulty,
}

impl MatchKey {
    pub fn new(username: &str, difficulty: Difficulty) -> Self {
        Self {
            username: username.to_lowercase(),
            difficulty,
        }
    }

    pub fn of(record: &QuizRecord) -> Self {
        Self::new(&record.username, record.difficulty)
    }

    pub fn matches(&self, record: &QuizRecord) -> bool {
        record.difficulty == self.difficulty && record.username.to_lowercase() == self.username
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeleteSelector {
    All,
    Refs(HashSet<u32>),
}

impl DeleteSelector {
    pub fn refs(refs: impl IntoIterator<Item = u32>) -> Self {
        DeleteSelector::Refs(refs.into_iter().collect())
    }

    fn selects(&self, record: &QuizRecord) -> bool {
        match self {
            DeleteSelector::All => true,
            DeleteSelector::Refs(refs) => refs.contains(&record.ref_number),
        }
    }
}

/// One deletion batch: removed records with their index at removal time,
/// in ascending index order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HistoryEntry {
    removed: Vec<(QuizRecord, usize)>,
}

impl HistoryEntry {
    pub fn len(&self) -> usize {
        self.removed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.removed.is_empty()
    }
}

/// Ordered scoreboard with reference number allocation and bounded,
/// oldest-first-evicting undo/redo over deletions.
///
/// Undo reinserts by original index. If records were appended between a
/// deletion and its undo, the restored order can differ from the original;
/// indices past the end are clamped to the end.
#[derive(Debug)]
pub struct ScoreStore {
    records: Vec<QuizRecord>,
    history: VecDeque<HistoryEntry>,
    redo: Vec<HistoryEntry>,
    history_limit: HistoryLimit,
    ref_range: RangeInclusive<u32>,
}

impl ScoreStore {
    pub fn new(ref_range: RangeInclusive<u32>, history_limit: HistoryLimit) -> Self {
        Self::with_records(Vec::new(), ref_range, history_limit)
    }

    pub fn with_records(
        records: Vec<QuizRecord>,
        ref_range: RangeInclusive<u32>,
        history_limit: HistoryLimit,
    ) -> Self {
        Self {
            records,
            history: VecDeque::new(),
            redo: Vec::new(),
            history_limit,
            ref_range,
        }
    }

    pub fn list(&self) -> &[QuizRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, ref_number: u32) -> Option<&QuizRecord> {
        self.records.iter().find(|r| r.ref_number == ref_number)
    }

    /// Replace the in-memory records, e.g. after a reload. History is dropped
    /// because its indices refer to the old list.
    pub fn replace_records(&mut self, records: Vec<QuizRecord>) {
        self.records = records;
        self.history.clear();
        self.redo.clear();
    }

    pub fn ref_range(&self) -> &RangeInclusive<u32> {
        &self.ref_range
    }

    /// Pick a random unused reference number from the configured range.
    pub fn allocate_ref_number<R: Rng + ?Sized>(&self, rng: &mut R) -> QuizResult<u32> {
        let used: HashSet<u32> = self.records.iter().map(|r| r.ref_number).collect();
        self.ref_range
            .clone()
            .filter(|n| !used.contains(n))
            .choose(rng)
            .ok_or(QuizError::RefNumberCapacityExceeded {
                min: *self.ref_range.start(),
                max: *self.ref_range.end(),
            })
    }

    pub fn find_conflict(&self, username: &str, difficulty: Difficulty) -> Option<&QuizRecord> {
        let key = MatchKey::new(username, difficulty);
        self.records.iter().find(|r| key.matches(r))
    }

    /// Insert `record`, replacing the record that shares its username and
    /// difficulty when `overwrite` is set. Returns the record's index.
    pub fn insert_or_overwrite(&mut self, record: QuizRecord, overwrite: bool) -> usize {
        let key = MatchKey::of(&record);
        self.insert_or_overwrite_matching(record, overwrite, &key)
    }

    pub fn insert_or_overwrite_matching(
        &mut self,
        record: QuizRecord,
        overwrite: bool,
        key: &MatchKey,
    ) -> usize {
        if overwrite {
            if let Some(index) = self.records.iter().position(|r| key.matches(r)) {
                info!(
                    ref_number = record.ref_number,
                    replaced = self.records[index].ref_number,
                    index,
                    "overwriting score"
                );
                self.records[index] = record;
                return index;
            }
        }
        info!(ref_number = record.ref_number, "appending score");
        self.records.push(record);
        self.records.len() - 1
    }

    /// Remove the selected records. Returns how many were removed.
    pub fn delete(&mut self, selector: &DeleteSelector) -> usize {
        let removed: Vec<(QuizRecord, usize)> = self
            .records
            .iter()
            .enumerate()
            .filter(|(_, r)| selector.selects(r))
            .map(|(i, r)| (r.clone(), i))
            .collect();
        if removed.is_empty() {
            return 0;
        }

        let count = removed.len();
        let indices: Vec<usize> = removed.iter().map(|(_, i)| *i).collect();
        if self.history_limit != HistoryLimit::Off {
            self.history.push_back(HistoryEntry { removed });
            self.enforce_history_limit();
        }
        self.redo.clear();
        self.remove_descending(&indices);
        info!(count, "deleted scores");
        count
    }

    /// Restore the most recent deletion batch. Returns the number of records restored.
    pub fn undo(&mut self) -> usize {
        let Some(entry) = self.history.pop_back() else {
            return 0;
        };
        for (record, index) in &entry.removed {
            let at = if *index > self.records.len() {
                warn!(
                    index,
                    len = self.records.len(),
                    "undo index past end of scoreboard, appending instead"
                );
                self.records.len()
            } else {
                *index
            };
            self.records.insert(at, record.clone());
        }
        let count = entry.len();
        self.redo.push(entry);
        info!(count, "undid deletion");
        count
    }

    /// Re-apply the most recently undone deletion. Returns the number removed.
    pub fn redo(&mut self) -> usize {
        let Some(entry) = self.redo.pop() else {
            return 0;
        };
        let indices: Vec<usize> = entry.removed.iter().map(|(_, i)| *i).collect();
        let count = entry.len();
        self.history.push_back(entry);
        self.enforce_history_limit();
        self.remove_descending(&indices);
        info!(count, "redid deletion");
        count
    }

    pub fn can_undo(&self) -> bool {
        !self.history.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn history_limit(&self) -> HistoryLimit {
        self.history_limit
    }

    pub fn set_history_limit(&mut self, limit: HistoryLimit) {
        self.history_limit = limit;
        if limit == HistoryLimit::Off {
            self.history.clear();
            self.redo.clear();
        } else {
            self.enforce_history_limit();
        }
    }

    fn enforce_history_limit(&mut self) {
        while self.history.len() > self.history_limit.depth() {
            if let Some(evicted) = self.history.pop_front() {
                debug!(records = evicted.len(), "evicted oldest deletion from history");
            }
        }
    }

    fn remove_descending(&mut self, indices: &[usize]) {
        let mut sorted = indices.to_vec();
        sorted.sort_unstable_by(|a, b| b.cmp(a));
        for index in sorted {
            if index < self.records.len() {
                self.records.remove(index);
            } else {
                warn!(index, len = self.records.len(), "redo index past end of scoreboard, skipping");
            }
        }
    }
}
