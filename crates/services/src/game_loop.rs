//! Drives a [`QuizSession`] from a ticker and a stream of player input.

use quiz_core::model::{Player, Question};
use quiz_core::quiz::{
    AdvanceOutcome, AnswerOutcome, AnswerRecord, FinalStandings, Phase, QuizSession, TickOutcome,
};
use tokio::sync::mpsc;

use crate::ticker::Ticker;

/// What a player (or the presenter acting for them) can do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerInput {
    Select(usize),
    Advance,
    Quit,
}

/// Everything the presenter needs to redraw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameEvent {
    QuestionShown {
        index: usize,
        total: usize,
        question: Question,
        player: Player,
        seconds_remaining: u32,
    },
    Tick {
        seconds_remaining: u32,
    },
    Answered(AnswerOutcome),
    TimedOut {
        correct_option_index: usize,
    },
    Completed(FinalStandings),
    Abandoned,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameOutcome {
    Completed {
        standings: FinalStandings,
        answers: Vec<AnswerRecord>,
    },
    /// Quit, or the input side went away before the last question.
    Abandoned,
}

pub struct GameLoop<T> {
    session: QuizSession,
    ticker: T,
    inputs: mpsc::Receiver<PlayerInput>,
    events: mpsc::Sender<GameEvent>,
}

impl<T: Ticker> GameLoop<T> {
    #[must_use]
    pub fn new(
        session: QuizSession,
        ticker: T,
        inputs: mpsc::Receiver<PlayerInput>,
        events: mpsc::Sender<GameEvent>,
    ) -> Self {
        Self {
            session,
            ticker,
            inputs,
            events,
        }
    }

    /// Run the game to completion or abandonment.
    ///
    /// The ticker is polled only while the current question is `Active` and
    /// is reset every time a new question becomes active, so a tick scheduled
    /// for one question never lands on the next.
    pub async fn run(mut self) -> GameOutcome {
        tracing::info!(
            questions = self.session.question_count(),
            players = self.session.state().roster().len(),
            "game started"
        );
        self.ticker.reset();
        self.show_question().await;
        let mut ticking = true;

        loop {
            let input = match self.session.state().phase() {
                Phase::Active => {
                    tokio::select! {
                        alive = self.ticker.tick(), if ticking => {
                            if alive {
                                self.on_tick().await;
                            } else {
                                tracing::warn!("ticker stopped; waiting on input only");
                                ticking = false;
                            }
                            continue;
                        }
                        input = self.inputs.recv() => input,
                    }
                }
                Phase::Revealed => self.inputs.recv().await,
                Phase::Complete => {
                    // advance() reports completion, so this is only reachable
                    // if the loop is handed an already finished session
                    return self.finish();
                }
            };

            match input {
                None | Some(PlayerInput::Quit) => {
                    tracing::info!(
                        question = self.session.state().current_question_index(),
                        "game abandoned"
                    );
                    self.emit(GameEvent::Abandoned).await;
                    return GameOutcome::Abandoned;
                }
                Some(PlayerInput::Select(option)) => self.on_select(option).await,
                Some(PlayerInput::Advance) => match self.session.advance() {
                    AdvanceOutcome::Ignored => {}
                    AdvanceOutcome::NextQuestion { .. } => {
                        self.ticker.reset();
                        self.show_question().await;
                    }
                    AdvanceOutcome::Complete(standings) => {
                        self.emit(GameEvent::Completed(standings)).await;
                        return self.finish();
                    }
                },
            }
        }
    }

    async fn on_tick(&mut self) {
        match self.session.tick() {
            TickOutcome::Ignored => {}
            TickOutcome::Counting { seconds_remaining } => {
                self.emit(GameEvent::Tick { seconds_remaining }).await;
            }
            TickOutcome::TimedOut {
                correct_option_index,
            } => {
                tracing::debug!(
                    question = self.session.state().current_question_index(),
                    "question timed out"
                );
                self.emit(GameEvent::TimedOut {
                    correct_option_index,
                })
                .await;
            }
        }
    }

    async fn on_select(&mut self, option: usize) {
        let outcome = self.session.select_answer(option);
        if outcome == AnswerOutcome::Ignored {
            return;
        }
        tracing::debug!(
            question = self.session.state().current_question_index(),
            option,
            correct = matches!(outcome, AnswerOutcome::Correct { .. }),
            "answer selected"
        );
        self.emit(GameEvent::Answered(outcome)).await;
    }

    async fn show_question(&mut self) {
        let state = self.session.state();
        let event = GameEvent::QuestionShown {
            index: state.current_question_index(),
            total: self.session.question_count(),
            question: self.session.current_question().clone(),
            player: self.session.current_player().clone(),
            seconds_remaining: state.seconds_remaining(),
        };
        self.emit(event).await;
    }

    fn finish(self) -> GameOutcome {
        match self.session.final_standings() {
            Some(standings) => {
                tracing::info!(
                    winner = standings.winner().map(Player::name),
                    "game completed"
                );
                GameOutcome::Completed {
                    standings,
                    answers: self.session.answers().to_vec(),
                }
            }
            None => GameOutcome::Abandoned,
        }
    }

    async fn emit(&self, event: GameEvent) {
        if self.events.send(event).await.is_err() {
            tracing::debug!("event receiver dropped");
        }
    }
}
