use std::fmt;

use serde::{Deserialize, Serialize};

use crate::generator::{Difficulty, QuestionBody, QuestionSpec, Statement, Topic};

pub const TIMER_DISABLED: &str = "Disabled";

/// A question together with the answer the user picked.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "AnswerRow", into = "AnswerRow")]
pub struct SessionAnswer {
    pub question: QuestionSpec,
    pub user_answer: String,
}

impl SessionAnswer {
    pub fn is_correct(&self) -> bool {
        self.question.is_correct(&self.user_answer)
    }
}

/// On-disk layout: `[topic, title, statement, body, correct, distractors, user_answer]`.
#[derive(Serialize, Deserialize)]
struct AnswerRow(
    Topic,
    String,
    Statement,
    QuestionBody,
    String,
    [String; 3],
    String,
);

impl From<AnswerRow> for SessionAnswer {
    fn from(row: AnswerRow) -> Self {
        let AnswerRow(topic, title, statement, body, correct_answer, distractors, user_answer) = row;
        Self {
            question: QuestionSpec {
                topic,
                title,
                statement,
                body,
                correct_answer,
                distractors,
            },
            user_answer,
        }
    }
}

impl From<SessionAnswer> for AnswerRow {
    fn from(answer: SessionAnswer) -> Self {
        let q = answer.question;
        AnswerRow(
            q.topic,
            q.title,
            q.statement,
            q.body,
            q.correct_answer,
            q.distractors,
            answer.user_answer,
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ElapsedTime {
    Recorded(String),
    Disabled,
}

impl From<String> for ElapsedTime {
    fn from(s: String) -> Self {
        if s == TIMER_DISABLED {
            ElapsedTime::Disabled
        } else {
            ElapsedTime::Recorded(s)
        }
    }
}

impl From<ElapsedTime> for String {
    fn from(t: ElapsedTime) -> Self {
        match t {
            ElapsedTime::Recorded(s) => s,
            ElapsedTime::Disabled => TIMER_DISABLED.to_string(),
        }
    }
}

impl fmt::Display for ElapsedTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElapsedTime::Recorded(s) => f.write_str(s),
            ElapsedTime::Disabled => f.write_str(TIMER_DISABLED),
        }
    }
}

/// Final score, persisted as `"correct/total"`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Score {
    pub correct: usize,
    pub total: usize,
}

impl TryFrom<String> for Score {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        let (correct, total) = s
            .split_once('/')
            .ok_or_else(|| format!("score '{s}' is not in score/total form"))?;
        let correct = correct
            .trim()
            .parse()
            .map_err(|e| format!("bad score '{s}': {e}"))?;
        let total = total
            .trim()
            .parse()
            .map_err(|e| format!("bad score '{s}': {e}"))?;
        if correct > total {
            return Err(format!("score '{s}' exceeds its total"));
        }
        Ok(Score { correct, total })
    }
}

impl From<Score> for String {
    fn from(s: Score) -> Self {
        s.to_string()
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.correct, self.total)
    }
}

/// One completed quiz as stored on the scoreboard.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RecordRow", into = "RecordRow")]
pub struct QuizRecord {
    pub ref_number: u32,
    pub username: String,
    pub difficulty: Difficulty,
    pub question_count: usize,
    pub elapsed: ElapsedTime,
    pub score: Score,
    pub saved_questions: Vec<SessionAnswer>,
}

#[derive(Serialize, Deserialize)]
struct RecordRow(
    u32,
    String,
    Difficulty,
    usize,
    ElapsedTime,
    Score,
    Vec<SessionAnswer>,
);

impl From<RecordRow> for QuizRecord {
    fn from(row: RecordRow) -> Self {
        let RecordRow(ref_number, username, difficulty, question_count, elapsed, score, saved_questions) =
            row;
        Self {
            ref_number,
            username,
            difficulty,
            question_count,
            elapsed,
            score,
            saved_questions,
        }
    }
}

impl From<QuizRecord> for RecordRow {
    fn from(r: QuizRecord) -> Self {
        RecordRow(
            r.ref_number,
            r.username,
            r.difficulty,
            r.question_count,
            r.elapsed,
            r.score,
            r.saved_questions,
        )
    }
}

pub const RECORD_FIELDS: usize = 7;

impl QuizRecord {
    /// Checks the cross-field invariants serde cannot express.
    pub fn check_consistency(&self) -> Result<(), String> {
        if self.saved_questions.len() != self.question_count {
            return Err(format!(
                "expected {} saved questions, got {}",
                self.question_count,
                self.saved_questions.len()
            ));
        }
        if self.score.total != self.question_count {
            return Err(format!(
                "score total {} does not match question count {}",
                self.score.total, self.question_count
            ));
        }
        Ok(())
    }

    /// The question set with previous answers removed, for a retry.
    pub fn questions(&self) -> Vec<QuestionSpec> {
        self.saved_questions
            .iter()
            .map(|a| a.question.clone())
            .collect()
    }

    /// Display columns: ref, username, difficulty, questions, time, score.
    pub fn summary_row(&self) -> [String; 6] {
        [
            self.ref_number.to_string(),
            self.username.clone(),
            self.difficulty.to_string(),
            self.question_count.to_string(),
            self.elapsed.to_string(),
            self.score.to_string(),
        ]
    }
}
