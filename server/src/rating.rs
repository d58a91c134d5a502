//! Rating updates applied when a match ends
//!
//! The engine only knows two groups, winners and losers. [`MultiElo`] generalises Elo
//! to any number of players finishing in any order: every player is compared with every
//! other one, and players sharing a place split the score of the places they span.

/// Maps ranked groups of ratings to updated ratings. Must be free of side effects.
pub trait RatingUpdater: Send + Sync {
    /// Returns the new ratings of `winners` followed by `losers`, in the same order.
    fn update(&self, winners: &[f64], losers: &[f64]) -> Vec<f64>;
}

/// Multi-player Elo with a linear score distribution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MultiElo {
    /// Maximum rating change for a two player match.
    pub k: f64,
    /// Rating difference at which the stronger player is expected to score ten times more.
    pub d: f64,
}

impl Default for MultiElo {
    fn default() -> Self {
        Self { k: 32.0, d: 400.0 }
    }
}

impl MultiElo {
    /// Updates `ratings` given each player's 1-based finishing place. Equal places are ties.
    pub fn new_ratings(&self, ratings: &[f64], places: &[usize]) -> Vec<f64> {
        let n = ratings.len();
        if n < 2 || places.len() != n {
            return ratings.to_vec();
        }

        let actual = self.actual_scores(places);
        let expected = self.expected_scores(ratings);
        let scale = self.k * (n - 1) as f64;

        ratings
            .iter()
            .zip(actual.iter().zip(&expected))
            .map(|(rating, (actual, expected))| rating + scale * (actual - expected))
            .collect()
    }

    fn pairings(n: usize) -> f64 {
        (n * (n - 1)) as f64 / 2.0
    }

    fn actual_scores(&self, places: &[usize]) -> Vec<f64> {
        let n = places.len();
        let pairings = Self::pairings(n);
        // Score for finishing at 0-based slot `i`; they sum to one
        let slot_score = |i: usize| (n - 1 - i) as f64 / pairings;

        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by_key(|&i| places[i]);

        let mut scores = vec![0.0; n];
        let mut start = 0;
        while start < n {
            let place = places[order[start]];
            let end = order[start..]
                .iter()
                .position(|&i| places[i] != place)
                .map_or(n, |offset| start + offset);
            let shared = (start..end).map(slot_score).sum::<f64>() / (end - start) as f64;
            for &i in &order[start..end] {
                scores[i] = shared;
            }
            start = end;
        }
        scores
    }

    fn expected_scores(&self, ratings: &[f64]) -> Vec<f64> {
        let pairings = Self::pairings(ratings.len());
        ratings
            .iter()
            .enumerate()
            .map(|(i, own)| {
                let total: f64 = ratings
                    .iter()
                    .enumerate()
                    .filter(|(j, _)| *j != i)
                    .map(|(_, other)| 1.0 / (1.0 + 10f64.powf((other - own) / self.d)))
                    .sum();
                total / pairings
            })
            .collect()
    }
}

impl RatingUpdater for MultiElo {
    fn update(&self, winners: &[f64], losers: &[f64]) -> Vec<f64> {
        let ratings: Vec<f64> = winners.iter().chain(losers).copied().collect();
        let places: Vec<usize> = std::iter::repeat(1)
            .take(winners.len())
            .chain(std::iter::repeat(2).take(losers.len()))
            .collect();
        self.new_ratings(&ratings, &places)
    }
}
