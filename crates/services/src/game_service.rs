use std::sync::Arc;

use quiz_core::bank::QuestionBank;
use quiz_core::quiz::{AnswerRecord, FinalStandings, Lobby, QuizSession, SessionConfig};

use crate::error::GameError;
use crate::profile_service::ProfileService;

/// Builds games from the question bank and records finished ones.
#[derive(Clone)]
pub struct GameService {
    bank: Arc<QuestionBank>,
    profiles: Arc<ProfileService>,
    session_config: SessionConfig,
    questions_per_game: usize,
    seed: Option<u64>,
}

impl GameService {
    #[must_use]
    pub fn new(
        bank: Arc<QuestionBank>,
        profiles: Arc<ProfileService>,
        session_config: SessionConfig,
        questions_per_game: usize,
    ) -> Self {
        Self {
            bank,
            profiles,
            session_config,
            questions_per_game,
            seed: None,
        }
    }

    /// Fix the shuffle so repeated games draw the same questions.
    #[must_use]
    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    #[must_use]
    pub fn bank(&self) -> &QuestionBank {
        &self.bank
    }

    /// Draw questions (optionally from one category) and seat the lobby.
    ///
    /// # Errors
    ///
    /// Returns `GameError::Session` if the lobby is empty or no question matches.
    pub fn start(&self, lobby: Lobby, category: Option<&str>) -> Result<QuizSession, GameError> {
        let questions = match category {
            Some(category) => {
                self.bank
                    .by_category(category, self.questions_per_game, self.seed)
            }
            None => self.bank.draw(self.questions_per_game, self.seed),
        };
        tracing::debug!(
            drawn = questions.len(),
            category = category.unwrap_or("any"),
            "drew questions"
        );
        Ok(lobby.start(questions, self.session_config)?)
    }

    /// Persist the result of every account-linked seat.
    ///
    /// # Errors
    ///
    /// Returns `GameError::Profile` when storing fails.
    pub async fn record(
        &self,
        standings: &FinalStandings,
        answers: &[AnswerRecord],
    ) -> Result<Vec<i64>, GameError> {
        Ok(self.profiles.record_game(standings, answers).await?)
    }
}
