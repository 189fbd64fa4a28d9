//! Player-level aggregates over finished games and the derived skill
//! breakdown.

use serde::{Deserialize, Serialize};

use crate::analyzer::MoveAnalysis;
use crate::rating::{GameOutcome, GAMES_UNTIL_RATED};
use crate::summary::GameAnalyticsSummary;

/// Remaining clock below which a move counts as played under pressure.
pub const PRESSURE_CLOCK_MS: u64 = 10_000;
pub const LOW_CLOCK_MS: u64 = 5_000;
/// Player moves needed to count the opening as survived.
pub const OPENING_SURVIVAL_MOVES: u32 = 10;
/// Pressure rating when there is no time-pressure data.
pub const DEFAULT_PRESSURE_RATING: u32 = 50;

/// One finished game from the player's side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameRecord {
    pub outcome: GameOutcome,
    /// Moves made by the player.
    pub total_moves: u32,
    pub duration_seconds: Option<u32>,
    /// `None` until the game has been analyzed.
    pub summary: Option<GameAnalyticsSummary>,
    pub moves_under_5s: u32,
    pub moves_under_10s: u32,
    /// Mistakes and blunders made with under 10 s on the clock.
    pub time_pressure_mistakes: u32,
    pub survived_opening: bool,
}

impl GameRecord {
    /// Build from the player's analyzed moves. `clock_ms[i]` is the time
    /// left after `analyses[i]`; missing entries count as no pressure.
    pub fn from_analyses(
        outcome: GameOutcome,
        analyses: &[MoveAnalysis],
        clock_ms: &[u64],
        duration_seconds: Option<u32>,
    ) -> Self {
        let total_moves = analyses.len() as u32;
        let under = |limit: u64| clock_ms.iter().filter(|&&ms| ms < limit).count() as u32;
        let time_pressure_mistakes = analyses
            .iter()
            .zip(clock_ms)
            .filter(|(a, &ms)| ms < PRESSURE_CLOCK_MS && (a.is_mistake || a.is_blunder))
            .count() as u32;

        Self {
            outcome,
            total_moves,
            duration_seconds,
            summary: Some(GameAnalyticsSummary::from_analyses(analyses)),
            moves_under_5s: under(LOW_CLOCK_MS),
            moves_under_10s: under(PRESSURE_CLOCK_MS),
            time_pressure_mistakes,
            survived_opening: total_moves >= OPENING_SURVIVAL_MOVES,
        }
    }
}

/// Aggregates over all of a player's finished games.
///
/// Rates and accuracies are percentages rounded to two decimals.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerAnalytics {
    pub total_games: u32,
    pub wins: u32,
    pub losses: u32,
    pub draws: u32,
    pub win_rate: f64,
    pub is_rated: bool,
    pub games_until_rated: u32,
    pub avg_accuracy: f64,
    pub total_mistakes: u32,
    pub total_blunders: u32,
    pub total_brilliant_moves: u32,
    pub avg_game_duration_seconds: u32,
    pub avg_time_per_move_ms: u64,
    /// Share of time-pressure moves that were not mistakes.
    pub pressure_rating: u32,
    pub conversion_rate: f64,
    pub opening_survival_rate: f64,
    pub clutch_factor: u32,
    /// Move strength index.
    pub msi: f64,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn percent(part: u32, whole: u32) -> f64 {
    if whole == 0 {
        0.0
    } else {
        f64::from(part) / f64::from(whole) * 100.0
    }
}

impl PlayerAnalytics {
    pub fn from_games(games: &[GameRecord]) -> Self {
        if games.is_empty() {
            return Self {
                games_until_rated: GAMES_UNTIL_RATED,
                ..Default::default()
            };
        }

        let total_games = games.len() as u32;
        let count = |outcome: GameOutcome| {
            games.iter().filter(|g| g.outcome == outcome).count() as u32
        };
        let wins = count(GameOutcome::Win);
        let win_rate = percent(wins, total_games);

        let durations: Vec<u32> = games.iter().filter_map(|g| g.duration_seconds).collect();
        let total_duration: u64 = durations.iter().map(|&d| u64::from(d)).sum();
        let avg_game_duration_seconds = if durations.is_empty() {
            0
        } else {
            (total_duration / durations.len() as u64) as u32
        };

        let total_moves: u64 = games.iter().map(|g| u64::from(g.total_moves)).sum();
        let avg_time_per_move_ms = if total_moves == 0 {
            0
        } else {
            (total_duration as f64 * 1000.0 / total_moves as f64).round() as u64
        };

        let summaries: Vec<&GameAnalyticsSummary> =
            games.iter().filter_map(|g| g.summary.as_ref()).collect();
        let avg_accuracy = if summaries.is_empty() {
            0.0
        } else {
            summaries.iter().map(|s| s.accuracy).sum::<f64>() / summaries.len() as f64
        };
        let sum = |field: fn(&GameAnalyticsSummary) -> u32| {
            summaries.iter().map(|s| field(s)).sum::<u32>()
        };

        // Same as win rate until won positions are tracked
        let conversion_rate = if wins > 0 { win_rate } else { 0.0 };

        let pressure_moves: u32 = games.iter().map(|g| g.moves_under_10s).sum();
        let pressure_mistakes: u32 = games.iter().map(|g| g.time_pressure_mistakes).sum();
        let pressure_rating = if pressure_moves > 0 {
            percent(pressure_moves.saturating_sub(pressure_mistakes), pressure_moves).round() as u32
        } else {
            DEFAULT_PRESSURE_RATING
        };

        let survived = games.iter().filter(|g| g.survived_opening).count() as u32;
        let clutch_factor = ((win_rate + conversion_rate) / 2.0).round() as u32;

        let mut analytics = Self {
            total_games,
            wins,
            losses: count(GameOutcome::Loss),
            draws: count(GameOutcome::Draw),
            win_rate: round2(win_rate),
            is_rated: total_games >= GAMES_UNTIL_RATED,
            games_until_rated: GAMES_UNTIL_RATED.saturating_sub(total_games),
            avg_accuracy: round2(avg_accuracy),
            total_mistakes: sum(|s| s.mistakes),
            total_blunders: sum(|s| s.blunders),
            total_brilliant_moves: sum(|s| s.brilliant_moves),
            avg_game_duration_seconds,
            avg_time_per_move_ms,
            pressure_rating,
            conversion_rate: round2(conversion_rate),
            opening_survival_rate: round2(percent(survived, total_games)),
            clutch_factor,
            msi: 0.0,
        };
        analytics.msi = analytics.move_strength_index();

        tracing::debug!(
            total_games,
            win_rate = analytics.win_rate,
            avg_accuracy = analytics.avg_accuracy,
            msi = analytics.msi,
            "Player analytics aggregated"
        );
        analytics
    }

    /// `accuracy·0.4 + conversion·0.3 + clutch·0.2 + accuracy·0.1`, 0 with
    /// no accuracy data.
    pub fn move_strength_index(&self) -> f64 {
        if self.avg_accuracy <= 0.0 {
            return 0.0;
        }
        // Opening accuracy is approximated by overall accuracy
        let msi = self.avg_accuracy * 0.4
            + self.conversion_rate * 0.3
            + f64::from(self.clutch_factor) * 0.2
            + self.avg_accuracy * 0.1;
        round2(msi)
    }
}

/// Player-facing skill scores, each 0-100.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillBreakdown {
    /// Move quality.
    pub difficulty: u32,
    /// Time management.
    pub speed: u32,
    /// Performance under pressure.
    pub pressure: u32,
    /// Weighted composite of the other three.
    pub accuracy: u32,
}

/// Speed score for an average time per move, in seconds.
pub fn speed_score(avg_seconds: f64) -> u32 {
    let score = if avg_seconds < 3.0 {
        50.0 + avg_seconds / 3.0 * 50.0
    } else if avg_seconds <= 15.0 {
        100.0
    } else if avg_seconds <= 20.0 {
        100.0 - (avg_seconds - 15.0) * 2.0
    } else {
        (100.0 - (avg_seconds - 20.0) * 5.0).max(0.0)
    };
    score.clamp(0.0, 100.0).round() as u32
}

pub fn skill_breakdown(analytics: Option<&PlayerAnalytics>) -> SkillBreakdown {
    let Some(analytics) = analytics else {
        return SkillBreakdown::default();
    };

    let games = f64::from(analytics.total_games.max(1));
    let brilliant_bonus = (f64::from(analytics.total_brilliant_moves) / games * 2.0).min(10.0);
    let mistake_penalty = (f64::from(analytics.total_mistakes + analytics.total_blunders * 2)
        / games
        * 2.0)
        .min(20.0);
    let difficulty = (analytics.avg_accuracy + brilliant_bonus - mistake_penalty).clamp(0.0, 100.0);

    let speed = speed_score(analytics.avg_time_per_move_ms as f64 / 1000.0);

    // Zero means no data for either input
    let or_default = |value: u32| if value == 0 { 50 } else { value };
    let pressure = (f64::from(
        or_default(analytics.clutch_factor) + or_default(analytics.pressure_rating),
    ) / 2.0)
        .round() as u32;

    let accuracy =
        (difficulty * 0.5 + f64::from(speed) * 0.3 + f64::from(pressure) * 0.2).round() as u32;

    SkillBreakdown {
        difficulty: difficulty.round() as u32,
        speed,
        pressure,
        accuracy,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::tests::analysis_with_loss;

    fn summary(accuracy: f64, mistakes: u32, blunders: u32, brilliant: u32) -> GameAnalyticsSummary {
        GameAnalyticsSummary {
            accuracy,
            mistakes,
            blunders,
            brilliant_moves: brilliant,
            ..Default::default()
        }
    }

    fn two_games() -> Vec<GameRecord> {
        vec![
            GameRecord {
                outcome: GameOutcome::Win,
                total_moves: 30,
                duration_seconds: Some(600),
                summary: Some(summary(80.0, 2, 1, 1)),
                moves_under_5s: 1,
                moves_under_10s: 4,
                time_pressure_mistakes: 1,
                survived_opening: true,
            },
            GameRecord {
                outcome: GameOutcome::Loss,
                total_moves: 20,
                duration_seconds: Some(300),
                summary: Some(summary(60.0, 0, 0, 0)),
                moves_under_5s: 0,
                moves_under_10s: 0,
                time_pressure_mistakes: 0,
                survived_opening: false,
            },
        ]
    }

    #[test]
    fn test_aggregates_games() {
        let analytics = PlayerAnalytics::from_games(&two_games());

        assert_eq!(analytics.total_games, 2);
        assert_eq!((analytics.wins, analytics.losses, analytics.draws), (1, 1, 0));
        assert_eq!(analytics.win_rate, 50.0);
        assert_eq!(analytics.conversion_rate, 50.0);
        assert_eq!(analytics.clutch_factor, 50);
        assert_eq!(analytics.avg_accuracy, 70.0);
        assert_eq!(analytics.total_mistakes, 2);
        assert_eq!(analytics.total_blunders, 1);
        assert_eq!(analytics.total_brilliant_moves, 1);
        assert_eq!(analytics.avg_game_duration_seconds, 450);
        assert_eq!(analytics.avg_time_per_move_ms, 18_000);
        assert_eq!(analytics.pressure_rating, 75);
        assert_eq!(analytics.opening_survival_rate, 50.0);
        assert_eq!(analytics.msi, 60.0);
        assert!(!analytics.is_rated);
        assert_eq!(analytics.games_until_rated, 8);
    }

    #[test]
    fn test_no_games() {
        let analytics = PlayerAnalytics::from_games(&[]);
        assert_eq!(analytics.total_games, 0);
        assert_eq!(analytics.games_until_rated, 10);
        assert_eq!(analytics.msi, 0.0);
    }

    #[test]
    fn test_pressure_defaults_without_pressure_moves() {
        let mut games = two_games();
        games[0].moves_under_10s = 0;
        games[0].time_pressure_mistakes = 0;
        assert_eq!(PlayerAnalytics::from_games(&games).pressure_rating, 50);
    }

    #[test]
    fn test_msi_is_zero_without_accuracy() {
        let mut games = two_games();
        for game in &mut games {
            game.summary = None;
        }
        let analytics = PlayerAnalytics::from_games(&games);
        assert_eq!(analytics.avg_accuracy, 0.0);
        assert_eq!(analytics.msi, 0.0);
    }

    #[test]
    fn test_game_record_from_analyses() {
        let analyses: Vec<_> = [0, 150, 400, 20, 0, 0, 0, 0, 0, 0]
            .iter()
            .map(|&l| analysis_with_loss(l))
            .collect();
        let clocks = [60_000, 9_000, 4_000, 3_000, 30_000];
        let record = GameRecord::from_analyses(GameOutcome::Draw, &analyses, &clocks, None);

        assert_eq!(record.total_moves, 10);
        assert!(record.survived_opening);
        assert_eq!(record.moves_under_10s, 3);
        assert_eq!(record.moves_under_5s, 2);
        // The mistake at 9 s and the blunder at 4 s
        assert_eq!(record.time_pressure_mistakes, 2);
        assert_eq!(record.summary.as_ref().map(|s| s.blunders), Some(1));
    }

    #[test]
    fn test_skill_breakdown() {
        let analytics = PlayerAnalytics::from_games(&two_games());
        let skills = skill_breakdown(Some(&analytics));
        assert_eq!(
            skills,
            SkillBreakdown {
                difficulty: 67,
                speed: 94,
                pressure: 63,
                accuracy: 74,
            }
        );
    }

    #[test]
    fn test_skill_breakdown_without_analytics() {
        assert_eq!(skill_breakdown(None), SkillBreakdown::default());
    }

    #[test]
    fn test_zero_pressure_inputs_count_as_fifty() {
        let analytics = PlayerAnalytics::default();
        assert_eq!(skill_breakdown(Some(&analytics)).pressure, 50);
    }

    #[test]
    fn test_speed_bands() {
        assert_eq!(speed_score(0.0), 50);
        assert_eq!(speed_score(1.5), 75);
        assert_eq!(speed_score(3.0), 100);
        assert_eq!(speed_score(15.0), 100);
        assert_eq!(speed_score(16.0), 98);
        assert_eq!(speed_score(20.0), 90);
        assert_eq!(speed_score(21.0), 95);
        assert_eq!(speed_score(45.0), 0);
    }
}
