//! Weekly activity buckets

use crate::types::{Game, TeamId};
use crate::utils::week_key;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Activity of one ISO week
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyStats {
    /// "<iso year>.<iso week>", e.g. "2024.07"
    pub week: String,
    /// Games played that week
    pub total_count: usize,
    /// Games the actor played that week
    pub players_count: usize,
    /// Distinct teams that played that week
    pub player_count: usize,
    /// 2 * total_count / player_count
    pub avg_game_per_player: f64,
}

#[derive(Default)]
struct Bucket {
    total: usize,
    actor: usize,
    teams: BTreeSet<TeamId>,
}

/// Bucket `games` by ISO week, oldest week first
pub fn weekly_stats(actor: &str, games: &[Game]) -> Vec<WeeklyStats> {
    let mut buckets: BTreeMap<String, Bucket> = BTreeMap::new();

    for game in games {
        let bucket = buckets.entry(week_key(game.date)).or_default();
        bucket.total += 1;
        if game.involves(actor) {
            bucket.actor += 1;
        }
        bucket.teams.insert(game.winner.id);
        bucket.teams.insert(game.loser.id);
    }

    buckets
        .into_iter()
        .map(|(week, bucket)| {
            let player_count = bucket.teams.len();
            let avg_game_per_player = if player_count == 0 {
                0.0
            } else {
                (2 * bucket.total) as f64 / player_count as f64
            };

            WeeklyStats {
                week,
                total_count: bucket.total,
                players_count: bucket.actor,
                player_count,
                avg_game_per_player,
            }
        })
        .collect()
}
