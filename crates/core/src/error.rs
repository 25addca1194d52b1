use thiserror::Error;

use crate::bank::BankError;
use crate::model::{CredentialError, PlayerError, QuestionError};
use crate::quiz::{LobbyError, SessionError};

/// Umbrella error for callers that do not care which core rule was broken.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error(transparent)]
    Player(#[from] PlayerError),
    #[error(transparent)]
    Credential(#[from] CredentialError),
    #[error(transparent)]
    Bank(#[from] BankError),
    #[error(transparent)]
    Lobby(#[from] LobbyError),
    #[error(transparent)]
    Session(#[from] SessionError),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seat(name: &str) -> Result<(), Error> {
        let mut lobby = crate::quiz::Lobby::new();
        lobby.join(name, None)?;
        Ok(())
    }

    #[test]
    fn lower_errors_convert_with_question_mark() {
        assert!(seat("Ana").is_ok());
        let err = seat("   ").unwrap_err();
        assert!(matches!(err, Error::Lobby(LobbyError::Player(_))));
        assert_eq!(err.to_string(), LobbyError::Player(PlayerError::EmptyName).to_string());
    }
}
