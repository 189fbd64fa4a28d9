//! Elo rating updates.

use serde::{Deserialize, Serialize};

pub const INITIAL_RATING: i32 = 1200;
/// Games a player needs before they are rated.
pub const GAMES_UNTIL_RATED: u32 = 10;
/// Below this many games the faster K-factor applies.
pub const PROVISIONAL_GAMES: u32 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameOutcome {
    Win,
    Draw,
    Loss,
}

impl GameOutcome {
    pub fn score(self) -> f64 {
        match self {
            Self::Win => 1.0,
            Self::Draw => 0.5,
            Self::Loss => 0.0,
        }
    }
}

impl std::str::FromStr for GameOutcome {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "win" => Ok(Self::Win),
            "draw" => Ok(Self::Draw),
            "loss" => Ok(Self::Loss),
            other => Err(format!("unknown game outcome: {other}")),
        }
    }
}

pub fn k_factor(games_played: u32) -> f64 {
    if games_played < PROVISIONAL_GAMES {
        32.0
    } else {
        24.0
    }
}

pub fn expected_score(rating: i32, opponent: i32) -> f64 {
    1.0 / (1.0 + 10f64.powf(f64::from(opponent - rating) / 400.0))
}

/// New Elo rating after one game.
pub fn update_rating(current: i32, opponent: i32, outcome: GameOutcome, games_played: u32) -> i32 {
    let delta = k_factor(games_played) * (outcome.score() - expected_score(current, opponent));
    (f64::from(current) + delta).round() as i32
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingChange {
    pub before: i32,
    pub after: i32,
    pub change: i32,
}

/// A player's rating and rated status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRatingState {
    pub rating: i32,
    pub games_played: u32,
    pub is_rated: bool,
}

impl Default for PlayerRatingState {
    fn default() -> Self {
        Self {
            rating: INITIAL_RATING,
            games_played: 0,
            is_rated: false,
        }
    }
}

impl PlayerRatingState {
    /// Apply one finished game. The K-factor uses the count before this game.
    pub fn record_game(&mut self, opponent: i32, outcome: GameOutcome) -> RatingChange {
        let before = self.rating;
        let after = update_rating(before, opponent, outcome, self.games_played);

        self.rating = after;
        self.games_played += 1;
        self.is_rated = self.games_played >= GAMES_UNTIL_RATED;

        tracing::debug!(
            before,
            after,
            games_played = self.games_played,
            ?outcome,
            "Rating updated"
        );

        RatingChange {
            before,
            after,
            change: after - before,
        }
    }

    /// Games left until rated, 0 once rated.
    pub fn games_until_rated(&self) -> u32 {
        GAMES_UNTIL_RATED.saturating_sub(self.games_played)
    }
}
