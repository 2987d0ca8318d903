use serde::{Deserialize, Serialize};

use crate::generator::TopicSet;

/// How many deletion batches can be undone. `Off` disables snapshots entirely.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum HistoryLimit {
    Off,
    #[default]
    Ten,
    TwentyFive,
    Fifty,
}

impl HistoryLimit {
    pub const ALL: [HistoryLimit; 4] = [
        HistoryLimit::Off,
        HistoryLimit::Ten,
        HistoryLimit::TwentyFive,
        HistoryLimit::Fifty,
    ];

    pub fn depth(self) -> usize {
        match self {
            HistoryLimit::Off => 0,
            HistoryLimit::Ten => 10,
            HistoryLimit::TwentyFive => 25,
            HistoryLimit::Fifty => 50,
        }
    }
}

impl TryFrom<u32> for HistoryLimit {
    type Error = String;

    fn try_from(n: u32) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|h| h.depth() == n as usize)
            .ok_or_else(|| format!("deletion_history_states must be 0, 10, 25 or 50, got {n}"))
    }
}

impl From<HistoryLimit> for u32 {
    fn from(h: HistoryLimit) -> Self {
        h.depth() as u32
    }
}

/// User-facing settings document. Every key is required on load.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub enable_timer: bool,
    pub enable_trigonometry: bool,
    pub enable_algebra: bool,
    pub deletion_history_states: HistoryLimit,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            enable_timer: true,
            enable_trigonometry: true,
            enable_algebra: true,
            deletion_history_states: HistoryLimit::default(),
        }
    }
}

impl Settings {
    pub fn topics(&self) -> TopicSet {
        TopicSet {
            algebra: self.enable_algebra,
            trigonometry: self.enable_trigonometry,
        }
    }
}
