use crate::model::{Player, PlayerId};

/// Final ordering of a finished game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalStandings {
    players: Vec<Player>,
}

/// Sort a roster by score, highest first.
///
/// The sort is stable: players with equal scores keep their roster (join) order.
#[must_use]
pub fn finalize(mut roster: Vec<Player>) -> FinalStandings {
    roster.sort_by(|a, b| b.score().cmp(&a.score()));
    FinalStandings { players: roster }
}

impl FinalStandings {
    /// First place. `None` only for an empty roster, which a session never produces.
    #[must_use]
    pub fn winner(&self) -> Option<&Player> {
        self.players.first()
    }

    #[must_use]
    pub fn players(&self) -> &[Player] {
        &self.players
    }

    #[must_use]
    pub fn into_players(self) -> Vec<Player> {
        self.players
    }

    /// 1-based position of a player in the standings.
    #[must_use]
    pub fn rank_of(&self, id: &PlayerId) -> Option<usize> {
        self.players
            .iter()
            .position(|p| p.id() == id)
            .map(|idx| idx + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(id: &str, score: u32) -> Player {
        Player::new(PlayerId::new(id), id, "red")
            .unwrap()
            .with_score(score)
    }

    #[test]
    fn sorts_descending_and_keeps_tie_order() {
        let standings = finalize(vec![player("A", 50), player("B", 90), player("C", 90)]);
        let order: Vec<_> = standings.players().iter().map(Player::name).collect();
        assert_eq!(order, vec!["B", "C", "A"]);
        assert_eq!(standings.winner().unwrap().name(), "B");
    }

    #[test]
    fn rank_is_one_based() {
        let standings = finalize(vec![player("A", 10), player("B", 20)]);
        assert_eq!(standings.rank_of(&PlayerId::new("B")), Some(1));
        assert_eq!(standings.rank_of(&PlayerId::new("A")), Some(2));
        assert_eq!(standings.rank_of(&PlayerId::new("Z")), None);
    }
}
