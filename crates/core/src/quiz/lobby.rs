use thiserror::Error;

use crate::model::{AVATAR_TAGS, Player, PlayerError, PlayerId, Question, User, UserId};
use crate::quiz::engine::{QuizSession, SessionConfig, SessionError};

/// Table size of a single game.
pub const MAX_PLAYERS: usize = 8;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum LobbyError {
    #[error("lobby is full ({max} players)")]
    Full { max: usize },

    #[error("player {0} is not in the lobby")]
    UnknownPlayer(PlayerId),

    #[error("account {0} already has a seat")]
    AlreadySeated(UserId),

    #[error(transparent)]
    Player(#[from] PlayerError),
}

/// Players gathering before a game starts.
#[derive(Debug, Clone, Default)]
pub struct Lobby {
    players: Vec<Player>,
    joins: usize,
}

impl Lobby {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seat a new player, handing out the next avatar in the palette.
    ///
    /// # Errors
    ///
    /// Returns `LobbyError::Full` past `MAX_PLAYERS`, `LobbyError::AlreadySeated`
    /// if the account already has a seat, or `LobbyError::Player` for a blank name.
    pub fn join(&mut self, name: &str, account: Option<UserId>) -> Result<&Player, LobbyError> {
        if self.players.len() >= MAX_PLAYERS {
            return Err(LobbyError::Full { max: MAX_PLAYERS });
        }
        if let Some(account) = account {
            if self.players.iter().any(|p| p.account() == Some(account)) {
                return Err(LobbyError::AlreadySeated(account));
            }
        }

        let avatar = AVATAR_TAGS[self.joins % AVATAR_TAGS.len()];
        let mut player = Player::new(PlayerId::generate(), name, avatar)?;
        if let Some(account) = account {
            player = player.with_account(account);
        }
        self.joins += 1;
        self.players.push(player);
        Ok(&self.players[self.players.len() - 1])
    }

    /// Seat the signed-in (or guest) user under their display name.
    ///
    /// # Errors
    ///
    /// See [`Lobby::join`].
    pub fn join_user(&mut self, user: &User) -> Result<&Player, LobbyError> {
        self.join(user.display_name(), user.account_id())
    }

    /// # Errors
    ///
    /// Returns `LobbyError::UnknownPlayer` if no seat has that id.
    pub fn leave(&mut self, id: &PlayerId) -> Result<Player, LobbyError> {
        let idx = self
            .players
            .iter()
            .position(|p| p.id() == id)
            .ok_or_else(|| LobbyError::UnknownPlayer(id.clone()))?;
        Ok(self.players.remove(idx))
    }

    #[must_use]
    pub fn players(&self) -> &[Player] {
        &self.players
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.players.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.players.len() >= MAX_PLAYERS
    }

    /// Turn the lobby into a running game. Seats keep their join order.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if the lobby or question list is empty.
    pub fn start(
        self,
        questions: Vec<Question>,
        config: SessionConfig,
    ) -> Result<QuizSession, SessionError> {
        QuizSession::start(questions, self.players, config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AuthProvider, AuthenticatedUser, GuestUser, QuestionId};

    #[test]
    fn assigns_avatars_in_join_order() {
        let mut lobby = Lobby::new();
        let first = lobby.join("Ana", None).unwrap().avatar_tag().to_owned();
        let second = lobby.join("Luis", None).unwrap().avatar_tag().to_owned();
        assert_eq!(first, AVATAR_TAGS[0]);
        assert_eq!(second, AVATAR_TAGS[1]);
    }

    #[test]
    fn refuses_ninth_player() {
        let mut lobby = Lobby::new();
        for i in 0..MAX_PLAYERS {
            lobby.join(&format!("P{i}"), None).unwrap();
        }
        assert!(lobby.is_full());
        assert_eq!(
            lobby.join("late", None).unwrap_err(),
            LobbyError::Full { max: MAX_PLAYERS }
        );
    }

    #[test]
    fn same_account_cannot_sit_twice() {
        let mut lobby = Lobby::new();
        let user = User::Authenticated(AuthenticatedUser {
            id: UserId::generate(),
            email: "a@b.co".into(),
            name: "Ana".into(),
            provider: AuthProvider::Email,
            has_password: true,
            google_linked: false,
        });
        lobby.join_user(&user).unwrap();
        assert!(matches!(
            lobby.join_user(&user),
            Err(LobbyError::AlreadySeated(_))
        ));
    }

    #[test]
    fn leave_removes_seat() {
        let mut lobby = Lobby::new();
        let id = lobby.join("Ana", None).unwrap().id().clone();
        lobby
            .join_user(&User::Guest(GuestUser {
                id: "g".into(),
                name: "Guest".into(),
            }))
            .unwrap();
        let gone = lobby.leave(&id).unwrap();
        assert_eq!(gone.name(), "Ana");
        assert_eq!(lobby.len(), 1);
        assert!(matches!(lobby.leave(&id), Err(LobbyError::UnknownPlayer(_))));
    }

    #[test]
    fn empty_lobby_cannot_start() {
        let q = Question::new(
            QuestionId::new(1),
            "Q",
            ["a", "b", "c", "d"].map(String::from),
            0,
            "General",
        )
        .unwrap();
        let err = Lobby::new()
            .start(vec![q], SessionConfig::default())
            .unwrap_err();
        assert_eq!(err, SessionError::EmptyRoster);
    }
}
