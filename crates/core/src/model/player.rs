use thiserror::Error;

use crate::model::ids::{PlayerId, UserId};
use crate::model::user::GUEST_NAME;

/// Avatar palette handed out to players in join order.
pub const AVATAR_TAGS: [&str; 8] = [
    "red", "blue", "green", "yellow", "purple", "pink", "indigo", "teal",
];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PlayerError {
    #[error("player name cannot be empty")]
    EmptyName,
}

/// A seat at the table for one game.
///
/// Players live only as long as a lobby or session. `score` is mutated by the
/// session engine when the player is credited for a correct answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    id: PlayerId,
    name: String,
    score: u32,
    avatar_tag: String,
    account: Option<UserId>,
}

impl Player {
    /// Create a player with a zero score.
    ///
    /// # Errors
    ///
    /// Returns `PlayerError::EmptyName` if the name is blank after trimming.
    pub fn new(
        id: PlayerId,
        name: impl Into<String>,
        avatar_tag: impl Into<String>,
    ) -> Result<Self, PlayerError> {
        let name = name.into().trim().to_owned();
        if name.is_empty() {
            return Err(PlayerError::EmptyName);
        }
        Ok(Self {
            id,
            name,
            score: 0,
            avatar_tag: avatar_tag.into(),
            account: None,
        })
    }

    /// Link this seat to an authenticated account so results can be recorded.
    #[must_use]
    pub fn with_account(mut self, account: UserId) -> Self {
        self.account = Some(account);
        self
    }

    /// Override the starting score. Used by tests and when rehydrating standings.
    #[must_use]
    pub fn with_score(mut self, score: u32) -> Self {
        self.score = score;
        self
    }

    #[must_use]
    pub fn id(&self) -> &PlayerId {
        &self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    #[must_use]
    pub fn avatar_tag(&self) -> &str {
        &self.avatar_tag
    }

    #[must_use]
    pub fn account(&self) -> Option<UserId> {
        self.account
    }

    /// Badge text: the first letters of the first two words, or the first two
    /// letters of a single-word name. The guest seat shows a single letter.
    #[must_use]
    pub fn initials(&self) -> String {
        if self.name == GUEST_NAME {
            return GUEST_NAME.chars().take(1).collect();
        }
        let words: Vec<&str> = self.name.split_whitespace().collect();
        let letters: String = match words.as_slice() {
            [first, second, ..] => first.chars().take(1).chain(second.chars().take(1)).collect(),
            _ => self.name.chars().take(2).collect(),
        };
        letters.to_uppercase()
    }

    pub(crate) fn credit(&mut self, points: u32) {
        self.score = self.score.saturating_add(points);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_name_and_starts_at_zero() {
        let p = Player::new(PlayerId::new("p1"), "  Ada  ", "red").unwrap();
        assert_eq!(p.name(), "Ada");
        assert_eq!(p.score(), 0);
        assert_eq!(p.account(), None);
    }

    #[test]
    fn rejects_blank_name() {
        let err = Player::new(PlayerId::new("p1"), " ", "red").unwrap_err();
        assert_eq!(err, PlayerError::EmptyName);
    }

    #[test]
    fn initials_take_first_two_words() {
        let p = Player::new(PlayerId::new("p1"), "gabriel garcía márquez", "red").unwrap();
        assert_eq!(p.initials(), "GG");
        let single = Player::new(PlayerId::new("p2"), "ada", "blue").unwrap();
        assert_eq!(single.initials(), "AD");
        let short = Player::new(PlayerId::new("p3"), "x", "teal").unwrap();
        assert_eq!(short.initials(), "X");
    }

    #[test]
    fn guest_seat_shows_one_letter() {
        let guest = Player::new(PlayerId::new("g"), GUEST_NAME, "red").unwrap();
        assert_eq!(guest.initials(), "G");
    }

    #[test]
    fn credit_saturates() {
        let mut p = Player::new(PlayerId::new("p1"), "Ada", "red")
            .unwrap()
            .with_score(u32::MAX - 1);
        p.credit(10);
        assert_eq!(p.score(), u32::MAX);
    }
}
