use std::time::Instant;

use rand::Rng;

use crate::error::{QuizError, QuizResult};
use crate::generator::{self, QuestionSpec, TopicSet};
use crate::session::draft::SessionDraft;
use crate::session::record::{ElapsedTime, QuizRecord, Score, SessionAnswer};
use crate::timer::{TickToken, TimerController};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    NotStarted,
    InProgress,
    Paused,
    Completed,
    Reviewing,
    Exited,
}

impl SessionState {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionState::NotStarted => "not started",
            SessionState::InProgress => "in progress",
            SessionState::Paused => "paused",
            SessionState::Completed => "completed",
            SessionState::Reviewing => "reviewing answers",
            SessionState::Exited => "exited",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionMode {
    Fresh,
    /// Replaying a saved question set; completion overwrites the saved score.
    Retry,
    ReviewAnswers,
}

/// Emitted exactly once when the last question is answered.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Completion {
    pub record: QuizRecord,
    pub overwrite: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubmitOutcome {
    Next { index: usize },
    Completed(Completion),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExitOutcome {
    /// Progress would be lost; ask the user and call `exit(true)`.
    NeedsConfirmation,
    Exited,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReviewStep {
    At(usize),
    Finished,
}

pub struct QuizSession {
    draft: SessionDraft,
    ref_number: u32,
    mode: SessionMode,
    state: SessionState,
    overwrite: bool,
    questions: Vec<QuestionSpec>,
    answers: Vec<SessionAnswer>,
    review: Vec<SessionAnswer>,
    current_index: usize,
    score: usize,
    timer: TimerController,
}

impl QuizSession {
    pub fn new(draft: SessionDraft, ref_number: u32, overwrite: bool, timer_display: bool) -> Self {
        Self {
            draft,
            ref_number,
            mode: SessionMode::Fresh,
            state: SessionState::NotStarted,
            overwrite,
            questions: Vec::new(),
            answers: Vec::new(),
            review: Vec::new(),
            current_index: 0,
            score: 0,
            timer: TimerController::new(timer_display),
        }
    }

    /// Replay `prior`'s questions from scratch. Completion overwrites `prior`.
    pub fn retry(prior: &QuizRecord, timer_display: bool) -> QuizResult<Self> {
        Self::retry_at(prior, timer_display, Instant::now())
    }

    pub fn retry_at(prior: &QuizRecord, timer_display: bool, now: Instant) -> QuizResult<Self> {
        let draft = SessionDraft::new(
            prior.username.clone(),
            prior.difficulty,
            prior.saved_questions.len(),
        );
        let mut session = Self::new(draft, prior.ref_number, true, timer_display);
        session.mode = SessionMode::Retry;
        session.start_at(prior.questions(), now)?;
        Ok(session)
    }

    /// Walk through `prior`'s answers. No timer, no scoring.
    pub fn review_answers(prior: &QuizRecord) -> Self {
        let draft = SessionDraft::new(
            prior.username.clone(),
            prior.difficulty,
            prior.saved_questions.len(),
        );
        let mut session = Self::new(draft, prior.ref_number, false, false);
        session.mode = SessionMode::ReviewAnswers;
        session.review = prior.saved_questions.clone();
        session.state = SessionState::Reviewing;
        session
    }

    fn invalid(&self, action: &'static str) -> QuizError {
        QuizError::InvalidSessionTransition {
            action,
            state: self.state.as_str(),
        }
    }

    pub fn start(&mut self, questions: Vec<QuestionSpec>) -> QuizResult<TickToken> {
        self.start_at(questions, Instant::now())
    }

    pub fn start_at(&mut self, questions: Vec<QuestionSpec>, now: Instant) -> QuizResult<TickToken> {
        if self.state != SessionState::NotStarted {
            return Err(self.invalid("start"));
        }
        if questions.is_empty() {
            return Err(self.invalid("start without questions"));
        }
        self.draft.question_count = questions.len();
        self.questions = questions;
        self.begin(now)
    }

    fn begin(&mut self, now: Instant) -> QuizResult<TickToken> {
        self.timer.reset();
        self.answers.clear();
        self.current_index = 0;
        self.score = 0;
        let token = self.timer.start_at(now)?;
        self.state = SessionState::InProgress;
        Ok(token)
    }

    pub fn pause(&mut self) -> QuizResult<()> {
        self.pause_at(Instant::now())
    }

    pub fn pause_at(&mut self, now: Instant) -> QuizResult<()> {
        if self.state != SessionState::InProgress {
            return Err(self.invalid("pause"));
        }
        self.timer.pause_at(now)?;
        self.state = SessionState::Paused;
        Ok(())
    }

    pub fn resume(&mut self) -> QuizResult<TickToken> {
        self.resume_at(Instant::now())
    }

    pub fn resume_at(&mut self, now: Instant) -> QuizResult<TickToken> {
        if self.state != SessionState::Paused {
            return Err(self.invalid("resume"));
        }
        let token = self.timer.resume_at(now)?;
        self.state = SessionState::InProgress;
        Ok(token)
    }

    pub fn submit_answer(&mut self, answer: &str) -> QuizResult<SubmitOutcome> {
        self.submit_answer_at(answer, Instant::now())
    }

    pub fn submit_answer_at(&mut self, answer: &str, now: Instant) -> QuizResult<SubmitOutcome> {
        if self.state != SessionState::InProgress {
            return Err(self.invalid("submit an answer"));
        }
        let question = self.questions[self.current_index].clone();
        if question.is_correct(answer) {
            self.score += 1;
        }
        self.answers.push(SessionAnswer {
            question,
            user_answer: answer.to_string(),
        });

        if self.current_index + 1 < self.questions.len() {
            self.current_index += 1;
            return Ok(SubmitOutcome::Next {
                index: self.current_index,
            });
        }

        self.timer.stop_at(now);
        self.state = SessionState::Completed;
        let elapsed = if self.timer.display_enabled() {
            ElapsedTime::Recorded(self.timer.formatted_at(now))
        } else {
            ElapsedTime::Disabled
        };
        let saved_questions = std::mem::take(&mut self.answers);
        let record = QuizRecord {
            ref_number: self.ref_number,
            username: self.draft.username.clone(),
            difficulty: self.draft.difficulty,
            question_count: saved_questions.len(),
            elapsed,
            score: Score {
                correct: self.score,
                total: saved_questions.len(),
            },
            saved_questions,
        };
        Ok(SubmitOutcome::Completed(Completion {
            record,
            overwrite: self.overwrite,
        }))
    }

    /// Start over with the same questions, or with a fresh batch when
    /// `regenerate` is set. Score, answers and timer are reset either way.
    pub fn restart<R: Rng + ?Sized>(
        &mut self,
        regenerate: bool,
        topics: TopicSet,
        rng: &mut R,
    ) -> QuizResult<TickToken> {
        self.restart_at(regenerate, topics, rng, Instant::now())
    }

    pub fn restart_at<R: Rng + ?Sized>(
        &mut self,
        regenerate: bool,
        topics: TopicSet,
        rng: &mut R,
        now: Instant,
    ) -> QuizResult<TickToken> {
        let completed = self.state == SessionState::Completed;
        if !matches!(
            self.state,
            SessionState::InProgress | SessionState::Paused | SessionState::Completed
        ) {
            return Err(self.invalid("restart"));
        }
        if regenerate {
            // The finished attempt holds the reference number; see `new_quiz_at`.
            if completed {
                return Err(self.invalid("start a new quiz without a new reference number"));
            }
            if self.mode != SessionMode::Fresh {
                return Err(self.invalid("start a new quiz"));
            }
            self.regenerate(topics, rng)?;
        } else if completed {
            // The finished attempt is already on the scoreboard; replace it.
            self.mode = SessionMode::Retry;
            self.overwrite = true;
        }
        self.begin(now)
    }

    /// "New Quiz" once this attempt is on the scoreboard: a fresh batch under
    /// `ref_number`, which must be unused. The new score replaces the saved
    /// one, as both share username and difficulty.
    pub fn new_quiz<R: Rng + ?Sized>(
        &mut self,
        ref_number: u32,
        topics: TopicSet,
        rng: &mut R,
    ) -> QuizResult<TickToken> {
        self.new_quiz_at(ref_number, topics, rng, Instant::now())
    }

    pub fn new_quiz_at<R: Rng + ?Sized>(
        &mut self,
        ref_number: u32,
        topics: TopicSet,
        rng: &mut R,
        now: Instant,
    ) -> QuizResult<TickToken> {
        if self.state != SessionState::Completed {
            return Err(self.invalid("start a new quiz under a new reference number"));
        }
        self.regenerate(topics, rng)?;
        self.ref_number = ref_number;
        self.mode = SessionMode::Fresh;
        self.overwrite = true;
        self.begin(now)
    }

    fn regenerate<R: Rng + ?Sized>(&mut self, topics: TopicSet, rng: &mut R) -> QuizResult<()> {
        self.questions = generator::generate(
            self.draft.difficulty,
            topics,
            self.draft.question_count,
            rng,
        )?;
        Ok(())
    }

    /// Leave the session. Active quizzes need explicit confirmation first.
    pub fn exit(&mut self, confirmed: bool) -> QuizResult<ExitOutcome> {
        match self.state {
            SessionState::Exited => return Err(self.invalid("exit")),
            SessionState::InProgress | SessionState::Paused if !confirmed => {
                return Ok(ExitOutcome::NeedsConfirmation);
            }
            _ => {}
        }
        self.timer.reset();
        self.answers.clear();
        self.review.clear();
        self.current_index = 0;
        self.score = 0;
        self.state = SessionState::Exited;
        Ok(ExitOutcome::Exited)
    }

    pub fn previous(&mut self) -> QuizResult<ReviewStep> {
        if self.state != SessionState::Reviewing {
            return Err(self.invalid("go to the previous answer"));
        }
        self.current_index = self.current_index.saturating_sub(1);
        Ok(ReviewStep::At(self.current_index))
    }

    pub fn next(&mut self) -> QuizResult<ReviewStep> {
        if self.state != SessionState::Reviewing {
            return Err(self.invalid("go to the next answer"));
        }
        if self.current_index + 1 < self.review.len() {
            self.current_index += 1;
            return Ok(ReviewStep::At(self.current_index));
        }
        self.review.clear();
        self.current_index = 0;
        self.state = SessionState::Exited;
        Ok(ReviewStep::Finished)
    }

    pub fn tick(&mut self, token: TickToken) -> Option<String> {
        self.tick_at(token, Instant::now())
    }

    pub fn tick_at(&mut self, token: TickToken, now: Instant) -> Option<String> {
        if self.state != SessionState::InProgress {
            return None;
        }
        self.timer.tick_at(token, now)
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    pub fn draft(&self) -> &SessionDraft {
        &self.draft
    }

    pub fn ref_number(&self) -> u32 {
        self.ref_number
    }

    pub fn score(&self) -> usize {
        self.score
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn question_count(&self) -> usize {
        match self.mode {
            SessionMode::ReviewAnswers => self.review.len(),
            _ => self.questions.len(),
        }
    }

    pub fn current_question(&self) -> Option<&QuestionSpec> {
        match self.state {
            SessionState::InProgress | SessionState::Paused => self.questions.get(self.current_index),
            SessionState::Reviewing => self.review.get(self.current_index).map(|a| &a.question),
            _ => None,
        }
    }

    /// The saved answer under the review cursor.
    pub fn reviewed_answer(&self) -> Option<&SessionAnswer> {
        if self.state != SessionState::Reviewing {
            return None;
        }
        self.review.get(self.current_index)
    }

    pub fn timer(&self) -> &TimerController {
        &self.timer
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;
    use crate::generator::{Difficulty, generate};
    use crate::session::record::fixtures;

    fn questions(n: usize) -> Vec<QuestionSpec> {
        let mut rng = SmallRng::seed_from_u64(21);
        generate(Difficulty::Easy, TopicSet::ALL, n, &mut rng).unwrap()
    }

    fn started(n: usize, t0: Instant) -> QuizSession {
        let mut s = QuizSession::new(SessionDraft::new("alice", Difficulty::Easy, n), 1050, false, true);
        s.start_at(questions(n), t0).unwrap();
        s
    }

    #[test]
    fn test_completion_emits_one_full_record() {
        let t0 = Instant::now();
        let mut s = started(3, t0);
        let mut completions = 0;
        for i in 0..3 {
            let correct = s.current_question().unwrap().correct_answer.clone();
            let answer = if i == 1 { "wrong".to_string() } else { correct };
            match s.submit_answer_at(&answer, t0 + Duration::from_secs(10 * (i + 1))).unwrap() {
                SubmitOutcome::Next { index } => assert_eq!(index, i as usize + 1),
                SubmitOutcome::Completed(c) => {
                    completions += 1;
                    assert_eq!(c.record.saved_questions.len(), c.record.question_count);
                    assert_eq!(c.record.question_count, 3);
                    assert_eq!(c.record.score.to_string(), "2/3");
                    assert_eq!(c.record.elapsed, ElapsedTime::Recorded("00:00:30".into()));
                    assert_eq!(c.record.saved_questions[1].user_answer, "wrong");
                    assert!(!c.overwrite);
                }
            }
        }
        assert_eq!(completions, 1);
        assert_eq!(s.state(), SessionState::Completed);
        assert!(s.submit_answer("again").is_err());
    }

    #[test]
    fn test_disabled_timer_records_disabled() {
        let t0 = Instant::now();
        let mut s = QuizSession::new(SessionDraft::new("bob", Difficulty::Easy, 1), 1001, false, false);
        s.start_at(questions(1), t0).unwrap();
        match s.submit_answer_at("x", t0 + Duration::from_secs(5)).unwrap() {
            SubmitOutcome::Completed(c) => assert_eq!(c.record.elapsed, ElapsedTime::Disabled),
            other => panic!("expected completion, got {other:?}"),
        }
    }

    #[test]
    fn test_submit_while_paused_is_rejected() {
        let t0 = Instant::now();
        let mut s = started(2, t0);
        s.pause_at(t0 + Duration::from_secs(1)).unwrap();
        assert!(matches!(
            s.submit_answer("x"),
            Err(QuizError::InvalidSessionTransition { .. })
        ));
        assert!(s.pause().is_err());
        s.resume_at(t0 + Duration::from_secs(4)).unwrap();
        assert!(s.resume().is_err());
        assert_eq!(s.timer().elapsed_at(t0 + Duration::from_secs(6)).as_secs(), 3);
    }

    #[test]
    fn test_restart_reuses_questions_and_resets_progress() {
        let t0 = Instant::now();
        let mut s = started(3, t0);
        let before: Vec<String> = s.questions.iter().map(|q| q.correct_answer.clone()).collect();
        let first = s.current_question().unwrap().correct_answer.clone();
        s.submit_answer(&first).unwrap();
        assert_eq!(s.score(), 1);

        let mut rng = SmallRng::seed_from_u64(99);
        s.restart_at(false, TopicSet::ALL, &mut rng, t0 + Duration::from_secs(20)).unwrap();
        let after: Vec<String> = s.questions.iter().map(|q| q.correct_answer.clone()).collect();
        assert_eq!(before, after);
        assert_eq!(s.score(), 0);
        assert_eq!(s.current_index(), 0);
        assert_eq!(s.timer().elapsed_at(t0 + Duration::from_secs(25)).as_secs(), 5);
    }

    #[test]
    fn test_new_quiz_regenerates_and_respects_topics() {
        let t0 = Instant::now();
        let mut s = started(4, t0);
        let mut rng = SmallRng::seed_from_u64(1234);
        let none = TopicSet {
            algebra: false,
            trigonometry: false,
        };
        assert!(matches!(
            s.restart(true, none, &mut rng),
            Err(QuizError::NoTopicsSelected)
        ));
        assert_eq!(s.state(), SessionState::InProgress);
        s.restart(true, TopicSet::ALL, &mut rng).unwrap();
        assert_eq!(s.question_count(), 4);
    }

    #[test]
    fn test_retry_overwrites_and_blocks_new_quiz() {
        let prior = fixtures::record(1077, "carol", Difficulty::Medium);
        let t0 = Instant::now();
        let mut s = QuizSession::retry_at(&prior, true, t0).unwrap();
        assert_eq!(s.state(), SessionState::InProgress);
        assert_eq!(s.mode(), SessionMode::Retry);
        assert_eq!(s.score(), 0);
        let mut rng = SmallRng::seed_from_u64(1);
        assert!(s.restart(true, TopicSet::ALL, &mut rng).is_err());

        s.submit_answer("5 cm").unwrap();
        let done = s.submit_answer("5 cm").unwrap();
        match done {
            SubmitOutcome::Completed(c) => {
                assert!(c.overwrite);
                assert_eq!(c.record.ref_number, 1077);
                assert_eq!(c.record.score.to_string(), "2/2");
            }
            other => panic!("expected completion, got {other:?}"),
        }
    }

    #[test]
    fn test_restart_after_completion_becomes_retry() {
        let t0 = Instant::now();
        let mut s = started(1, t0);
        s.submit_answer("x").unwrap();
        let mut rng = SmallRng::seed_from_u64(1);
        assert!(s.restart(true, TopicSet::ALL, &mut rng).is_err());
        s.restart(false, TopicSet::ALL, &mut rng).unwrap();
        assert_eq!(s.mode(), SessionMode::Retry);
        match s.submit_answer("x").unwrap() {
            SubmitOutcome::Completed(c) => assert!(c.overwrite),
            other => panic!("expected completion, got {other:?}"),
        }
    }

    #[test]
    fn test_new_quiz_after_completion_takes_new_ref() {
        let t0 = Instant::now();
        let mut s = started(5, t0);
        let before: Vec<String> = s.questions.iter().map(|q| q.correct_answer.clone()).collect();
        for _ in 0..5 {
            s.submit_answer("x").unwrap();
        }
        assert_eq!(s.state(), SessionState::Completed);

        let mut rng = SmallRng::seed_from_u64(5);
        assert!(s.new_quiz_at(1051, TopicSet::ALL, &mut rng, t0).is_ok());
        assert_eq!(s.state(), SessionState::InProgress);
        assert_eq!(s.mode(), SessionMode::Fresh);
        assert_eq!(s.ref_number(), 1051);
        assert_eq!(s.score(), 0);
        assert_eq!(s.question_count(), 5);
        let after: Vec<String> = s.questions.iter().map(|q| q.correct_answer.clone()).collect();
        assert_ne!(before, after);

        // Only a finished attempt hands over its reference number.
        assert!(s.new_quiz(1052, TopicSet::ALL, &mut rng).is_err());
        for _ in 0..5 {
            if let SubmitOutcome::Completed(c) = s.submit_answer("x").unwrap() {
                assert_eq!(c.record.ref_number, 1051);
                assert!(c.overwrite);
            }
        }
    }

    #[test]
    fn test_review_navigation_has_no_timer() {
        let prior = fixtures::record(1010, "dave", Difficulty::Hard);
        let mut s = QuizSession::review_answers(&prior);
        assert_eq!(s.state(), SessionState::Reviewing);
        assert!(s.pause().is_err());
        assert!(s.submit_answer("5 cm").is_err());
        assert_eq!(s.previous().unwrap(), ReviewStep::At(0));
        assert!(s.reviewed_answer().unwrap().is_correct());
        assert_eq!(s.next().unwrap(), ReviewStep::At(1));
        assert!(!s.reviewed_answer().unwrap().is_correct());
        assert_eq!(s.next().unwrap(), ReviewStep::Finished);
        assert_eq!(s.state(), SessionState::Exited);
    }

    #[test]
    fn test_exit_confirmation_rules() {
        let t0 = Instant::now();
        let mut s = started(2, t0);
        assert_eq!(s.exit(false).unwrap(), ExitOutcome::NeedsConfirmation);
        assert_eq!(s.state(), SessionState::InProgress);
        s.pause().unwrap();
        assert_eq!(s.exit(false).unwrap(), ExitOutcome::NeedsConfirmation);
        assert_eq!(s.exit(true).unwrap(), ExitOutcome::Exited);
        assert!(s.timer().pending_tick().is_none());

        let prior = fixtures::record(1010, "dave", Difficulty::Hard);
        let mut review = QuizSession::review_answers(&prior);
        assert_eq!(review.exit(false).unwrap(), ExitOutcome::Exited);
    }

    #[test]
    fn test_ticks_stop_after_exit() {
        let t0 = Instant::now();
        let mut s = started(2, t0);
        let token = s.timer().pending_tick().unwrap();
        assert_eq!(s.tick_at(token, t0 + Duration::from_secs(2)).as_deref(), Some("00:00:02"));
        s.exit(true).unwrap();
        assert_eq!(s.tick_at(token, t0 + Duration::from_secs(3)), None);
    }
}
