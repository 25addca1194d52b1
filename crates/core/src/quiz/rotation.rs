/// Index of the roster entry credited for the question at `question_index`.
///
/// Plain round-robin by position. Returns `None` for an empty roster.
#[must_use]
pub fn current_player_index(question_index: usize, roster_size: usize) -> Option<usize> {
    question_index.checked_rem(roster_size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotates_through_three_players() {
        let picks: Vec<_> = (0..5)
            .map(|q| current_player_index(q, 3).unwrap())
            .collect();
        assert_eq!(picks, vec![0, 1, 2, 0, 1]);
    }

    #[test]
    fn single_player_always_acts() {
        assert!((0..10).all(|q| current_player_index(q, 1) == Some(0)));
    }

    #[test]
    fn empty_roster_has_no_player() {
        assert_eq!(current_player_index(4, 0), None);
    }
}
