//! The quiz session state machine and the pure policies it applies.

mod engine;
mod lobby;
pub mod rotation;
pub mod scoring;
mod standings;

pub use engine::{
    AdvanceOutcome, AnswerOutcome, AnswerRecord, Phase, QUICK_ANSWER_SECONDS, QuizSession,
    STREAK_MILESTONE, SessionConfig, SessionError, SessionState, TickOutcome, start_session,
};
pub use lobby::{Lobby, LobbyError, MAX_PLAYERS};
pub use rotation::current_player_index;
pub use scoring::compute_points;
pub use standings::{FinalStandings, finalize};
