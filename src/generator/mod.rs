pub mod algebra;
pub mod distractors;
pub mod format;
pub mod trigonometry;

use std::fmt;

use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::error::{QuizError, QuizResult};

/// Marker placed in the triangle slot the learner has to solve for.
pub const UNKNOWN_MARKER: &str = "x";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Topic {
    Algebra,
    Trigonometry,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|d| d.as_str().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which topics the generator may draw from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TopicSet {
    pub algebra: bool,
    pub trigonometry: bool,
}

impl TopicSet {
    pub const ALL: TopicSet = TopicSet {
        algebra: true,
        trigonometry: true,
    };

    pub fn is_empty(self) -> bool {
        !self.algebra && !self.trigonometry
    }

    fn pick<R: Rng + ?Sized>(self, rng: &mut R) -> Topic {
        match (self.algebra, self.trigonometry) {
            (true, false) => Topic::Algebra,
            (false, true) => Topic::Trigonometry,
            _ => {
                if rng.gen_bool(0.5) {
                    Topic::Trigonometry
                } else {
                    Topic::Algebra
                }
            }
        }
    }
}

/// Question prompt: a single line, or two lines for the triangle questions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Statement {
    Line(String),
    Lines([String; 2]),
}

impl Statement {
    pub fn lines(&self) -> Vec<&str> {
        match self {
            Statement::Line(line) => vec![line.as_str()],
            Statement::Lines([first, second]) => vec![first.as_str(), second.as_str()],
        }
    }
}

/// Labelled right-angled triangle. Persisted as
/// `[hypotenuse, opposite, adjacent, angle]`, empty slots as `null`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "[Option<String>; 4]", into = "[Option<String>; 4]")]
pub struct Triangle {
    pub hypotenuse: Option<String>,
    pub opposite: Option<String>,
    pub adjacent: Option<String>,
    pub angle: Option<String>,
}

impl Triangle {
    /// Name of the slot holding [`UNKNOWN_MARKER`], if any.
    pub fn unknown_slot(&self) -> Option<&'static str> {
        [
            ("hypotenuse", &self.hypotenuse),
            ("opposite", &self.opposite),
            ("adjacent", &self.adjacent),
            ("angle", &self.angle),
        ]
        .into_iter()
        .find(|(_, slot)| slot.as_deref() == Some(UNKNOWN_MARKER))
        .map(|(name, _)| name)
    }
}

impl From<[Option<String>; 4]> for Triangle {
    fn from([hypotenuse, opposite, adjacent, angle]: [Option<String>; 4]) -> Self {
        Self {
            hypotenuse,
            opposite,
            adjacent,
            angle,
        }
    }
}

impl From<Triangle> for [Option<String>; 4] {
    fn from(t: Triangle) -> Self {
        [t.hypotenuse, t.opposite, t.adjacent, t.angle]
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QuestionBody {
    Expression(String),
    Triangle(Triangle),
}

/// A self-contained multiple-choice question.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuestionSpec {
    pub topic: Topic,
    pub title: String,
    pub statement: Statement,
    pub body: QuestionBody,
    pub correct_answer: String,
    pub distractors: [String; 3],
}

impl QuestionSpec {
    /// Correct answer plus distractors in random order.
    pub fn answer_choices<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<String> {
        let mut choices = Vec::with_capacity(4);
        choices.push(self.correct_answer.clone());
        choices.extend(self.distractors.iter().cloned());
        choices.shuffle(rng);
        choices
    }

    pub fn is_correct(&self, answer: &str) -> bool {
        self.correct_answer == answer
    }
}

/// Build `count` questions for `difficulty`. Each question's topic is drawn
/// independently when both topics are enabled.
pub fn generate<R: Rng + ?Sized>(
    difficulty: Difficulty,
    topics: TopicSet,
    count: usize,
    rng: &mut R,
) -> QuizResult<Vec<QuestionSpec>> {
    if topics.is_empty() {
        return Err(QuizError::NoTopicsSelected);
    }
    let questions = (0..count)
        .map(|_| {
            let topic = topics.pick(rng);
            generate_one(difficulty, topic, rng)
        })
        .collect();
    Ok(questions)
}

pub fn generate_one<R: Rng + ?Sized>(
    difficulty: Difficulty,
    topic: Topic,
    rng: &mut R,
) -> QuestionSpec {
    match (topic, difficulty) {
        (Topic::Algebra, Difficulty::Easy) => algebra::like_terms(rng),
        (Topic::Algebra, Difficulty::Medium) => algebra::one_step_equation(rng),
        (Topic::Algebra, Difficulty::Hard) => algebra::binomial_expansion(rng),
        (Topic::Trigonometry, Difficulty::Easy) => trigonometry::triangle_area(rng),
        (Topic::Trigonometry, Difficulty::Medium) => trigonometry::pythagorean(rng),
        (Topic::Trigonometry, Difficulty::Hard) => trigonometry::trig_ratio(rng),
    }
}
