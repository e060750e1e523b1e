/// Rating change applied to a decisive result against an equal opponent is K/2
pub const K_FACTOR: f64 = 32.0;

/// Probability that a player rated `rating` beats one rated `opponent`
pub fn expected_score(rating: i32, opponent: i32) -> f64 {
    1.0 / (1.0 + 10f64.powf((opponent - rating) as f64 / 400.0))
}

/// Returns `(winner_new, loser_new)`.
///
/// No floor is applied; a long losing streak can push a rating below zero.
pub fn update_ratings(winner: i32, loser: i32) -> (i32, i32) {
    let winner_expected = expected_score(winner, loser);
    let loser_expected = expected_score(loser, winner);

    let winner_new = (winner as f64 + K_FACTOR * (1.0 - winner_expected)).round() as i32;
    let loser_new = (loser as f64 + K_FACTOR * (0.0 - loser_expected)).round() as i32;

    (winner_new, loser_new)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(1000, 1000, 1016, 984)]
    #[case(1200, 1000, 1208, 992)]
    #[case(1000, 1200, 1024, 1176)]
    #[case(0, 0, 16, -16)]
    fn updates_match_logistic_model(
        #[case] winner: i32,
        #[case] loser: i32,
        #[case] expected_winner: i32,
        #[case] expected_loser: i32,
    ) {
        assert_eq!(
            update_ratings(winner, loser),
            (expected_winner, expected_loser)
        );
    }

    #[test]
    fn favourite_gains_less_than_half_k() {
        let (winner, loser) = update_ratings(1200, 1000);
        assert!(winner - 1200 < 16);
        assert!(1000 - loser < 16);
    }

    #[test]
    fn expected_scores_sum_to_one() {
        let total = expected_score(1337, 1010) + expected_score(1010, 1337);
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn swapping_outcome_is_not_a_mirror() {
        let (favourite_wins, _) = update_ratings(1200, 1000);
        let (underdog_wins, _) = update_ratings(1000, 1200);
        assert_ne!(favourite_wins - 1200, underdog_wins - 1000);
    }
}
