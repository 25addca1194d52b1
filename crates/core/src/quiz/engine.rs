use std::collections::HashSet;

use thiserror::Error;

use crate::model::{OPTION_COUNT, Player, PlayerId, Question, QuestionId};
use crate::quiz::rotation::current_player_index;
use crate::quiz::scoring::compute_points;
use crate::quiz::standings::{FinalStandings, finalize};

/// Answers given with at least this many seconds left count as quick.
pub const QUICK_ANSWER_SECONDS: u32 = 12;
/// A streak this long (or longer) is worth celebrating.
pub const STREAK_MILESTONE: u32 = 3;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// Preconditions checked when a session starts. Nothing fails mid-game.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionError {
    #[error("a session needs at least one player")]
    EmptyRoster,

    #[error("a session needs at least one question")]
    EmptyQuestionBank,

    #[error("player {0} joined twice")]
    DuplicatePlayer(PlayerId),

    #[error("seconds per question must be > 0")]
    InvalidDuration,
}

//
// ─── CONFIG ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    seconds_per_question: u32,
}

impl SessionConfig {
    pub const DEFAULT_SECONDS_PER_QUESTION: u32 = 15;

    /// # Errors
    ///
    /// Returns `SessionError::InvalidDuration` for a zero-second answer window.
    pub fn new(seconds_per_question: u32) -> Result<Self, SessionError> {
        if seconds_per_question == 0 {
            return Err(SessionError::InvalidDuration);
        }
        Ok(Self {
            seconds_per_question,
        })
    }

    #[must_use]
    pub fn seconds_per_question(&self) -> u32 {
        self.seconds_per_question
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            seconds_per_question: Self::DEFAULT_SECONDS_PER_QUESTION,
        }
    }
}

//
// ─── STATE ─────────────────────────────────────────────────────────────────────
//

/// Where the current question stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Accepting input, timer running.
    Active,
    /// Input locked, correctness shown.
    Revealed,
    /// All questions played. Terminal.
    Complete,
}

/// Snapshot of a running game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    current_question_index: usize,
    seconds_remaining: u32,
    selected_option_index: Option<usize>,
    phase: Phase,
    streak: u32,
    roster: Vec<Player>,
}

impl SessionState {
    #[must_use]
    pub fn current_question_index(&self) -> usize {
        self.current_question_index
    }

    #[must_use]
    pub fn seconds_remaining(&self) -> u32 {
        self.seconds_remaining
    }

    #[must_use]
    pub fn selected_option_index(&self) -> Option<usize> {
        self.selected_option_index
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// True once the current question was answered or timed out.
    #[must_use]
    pub fn result_revealed(&self) -> bool {
        self.phase != Phase::Active
    }

    #[must_use]
    pub fn streak(&self) -> u32 {
        self.streak
    }

    #[must_use]
    pub fn roster(&self) -> &[Player] {
        &self.roster
    }
}

/// What happened to the current question, kept for result persistence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerRecord {
    pub question_id: QuestionId,
    pub player_id: PlayerId,
    /// `None` when the timer ran out.
    pub selected: Option<usize>,
    pub correct: bool,
    pub points: u32,
    pub seconds_remaining: u32,
}

//
// ─── OUTCOMES ──────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Not in `Active`; the tick was stale.
    Ignored,
    Counting { seconds_remaining: u32 },
    TimedOut { correct_option_index: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerOutcome {
    /// Already revealed, complete, or the option does not exist.
    Ignored,
    Correct {
        player_id: PlayerId,
        points: u32,
        streak: u32,
        streak_milestone: bool,
        quick_answer: bool,
    },
    Incorrect {
        correct_option_index: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdvanceOutcome {
    /// Only `Revealed` questions can be advanced past.
    Ignored,
    NextQuestion { index: usize },
    Complete(FinalStandings),
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// One game: the questions drawn for it, the roster, and the per-question state machine.
///
/// Each of `tick`, `select_answer` and `advance` runs to completion and never
/// fails; calls that do not apply to the current phase are reported as
/// `Ignored` and leave the state untouched.
#[derive(Debug, Clone)]
pub struct QuizSession {
    questions: Vec<Question>,
    config: SessionConfig,
    state: SessionState,
    answers: Vec<AnswerRecord>,
}

/// Start a game with the given questions and roster.
///
/// # Errors
///
/// See [`QuizSession::start`].
pub fn start_session(
    questions: Vec<Question>,
    players: Vec<Player>,
    config: SessionConfig,
) -> Result<QuizSession, SessionError> {
    QuizSession::start(questions, players, config)
}

impl QuizSession {
    /// # Errors
    ///
    /// Returns `SessionError::EmptyRoster`, `SessionError::EmptyQuestionBank`, or
    /// `SessionError::DuplicatePlayer` when the inputs cannot make a game.
    pub fn start(
        questions: Vec<Question>,
        players: Vec<Player>,
        config: SessionConfig,
    ) -> Result<Self, SessionError> {
        if players.is_empty() {
            return Err(SessionError::EmptyRoster);
        }
        if questions.is_empty() {
            return Err(SessionError::EmptyQuestionBank);
        }
        let mut seen = HashSet::with_capacity(players.len());
        for player in &players {
            if !seen.insert(player.id()) {
                return Err(SessionError::DuplicatePlayer(player.id().clone()));
            }
        }

        let answers = Vec::with_capacity(questions.len());
        Ok(Self {
            questions,
            config,
            state: SessionState {
                current_question_index: 0,
                seconds_remaining: config.seconds_per_question(),
                selected_option_index: None,
                phase: Phase::Active,
                streak: 0,
                roster: players,
            },
            answers,
        })
    }

    #[must_use]
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    #[must_use]
    pub fn config(&self) -> SessionConfig {
        self.config
    }

    #[must_use]
    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn current_question(&self) -> &Question {
        &self.questions[self.state.current_question_index]
    }

    /// The player who is credited if the current question is answered correctly.
    #[must_use]
    pub fn current_player(&self) -> &Player {
        &self.state.roster[self.current_player_index()]
    }

    #[must_use]
    pub fn answers(&self) -> &[AnswerRecord] {
        &self.answers
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.state.phase == Phase::Complete
    }

    /// Standings once the last question has been advanced past.
    #[must_use]
    pub fn final_standings(&self) -> Option<FinalStandings> {
        self.is_complete()
            .then(|| finalize(self.state.roster.clone()))
    }

    /// One second elapsed.
    pub fn tick(&mut self) -> TickOutcome {
        if self.state.phase != Phase::Active {
            return TickOutcome::Ignored;
        }

        self.state.seconds_remaining = self.state.seconds_remaining.saturating_sub(1);
        if self.state.seconds_remaining > 0 {
            return TickOutcome::Counting {
                seconds_remaining: self.state.seconds_remaining,
            };
        }

        self.state.selected_option_index = None;
        self.state.phase = Phase::Revealed;
        self.state.streak = 0;
        let question = self.current_question();
        let correct_option_index = question.correct_option_index();
        let record = AnswerRecord {
            question_id: question.id(),
            player_id: self.current_player().id().clone(),
            selected: None,
            correct: false,
            points: 0,
            seconds_remaining: 0,
        };
        self.answers.push(record);
        TickOutcome::TimedOut {
            correct_option_index,
        }
    }

    /// The acting player picked an option.
    pub fn select_answer(&mut self, option_index: usize) -> AnswerOutcome {
        if self.state.phase != Phase::Active || option_index >= OPTION_COUNT {
            return AnswerOutcome::Ignored;
        }

        let seconds_remaining = self.state.seconds_remaining;
        let question_id = self.current_question().id();
        let correct_option_index = self.current_question().correct_option_index();
        let player_index = self.current_player_index();

        self.state.selected_option_index = Some(option_index);
        self.state.phase = Phase::Revealed;

        if option_index != correct_option_index {
            self.state.streak = 0;
            self.answers.push(AnswerRecord {
                question_id,
                player_id: self.state.roster[player_index].id().clone(),
                selected: Some(option_index),
                correct: false,
                points: 0,
                seconds_remaining,
            });
            return AnswerOutcome::Incorrect {
                correct_option_index,
            };
        }

        let points = compute_points(seconds_remaining, self.state.streak);
        let player = &mut self.state.roster[player_index];
        player.credit(points);
        let player_id = player.id().clone();
        self.state.streak = self.state.streak.saturating_add(1);

        self.answers.push(AnswerRecord {
            question_id,
            player_id: player_id.clone(),
            selected: Some(option_index),
            correct: true,
            points,
            seconds_remaining,
        });

        AnswerOutcome::Correct {
            player_id,
            points,
            streak: self.state.streak,
            streak_milestone: self.state.streak >= STREAK_MILESTONE,
            quick_answer: seconds_remaining >= QUICK_ANSWER_SECONDS,
        }
    }

    /// Move past a revealed question.
    pub fn advance(&mut self) -> AdvanceOutcome {
        if self.state.phase != Phase::Revealed {
            return AdvanceOutcome::Ignored;
        }

        if self.state.current_question_index + 1 >= self.questions.len() {
            self.state.phase = Phase::Complete;
            return AdvanceOutcome::Complete(finalize(self.state.roster.clone()));
        }

        self.state.current_question_index += 1;
        self.state.seconds_remaining = self.config.seconds_per_question();
        self.state.selected_option_index = None;
        self.state.phase = Phase::Active;
        AdvanceOutcome::NextQuestion {
            index: self.state.current_question_index,
        }
    }

    fn current_player_index(&self) -> usize {
        // Roster is non-empty by construction.
        current_player_index(self.state.current_question_index, self.state.roster.len())
            .unwrap_or_default()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
