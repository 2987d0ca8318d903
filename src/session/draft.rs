use crate::generator::Difficulty;

/// Values chosen on the setup screen, carried into the next session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionDraft {
    pub username: String,
    pub difficulty: Difficulty,
    pub question_count: usize,
}

impl SessionDraft {
    pub fn new(username: impl Into<String>, difficulty: Difficulty, question_count: usize) -> Self {
        Self {
            username: username.into(),
            difficulty,
            question_count,
        }
    }
}
