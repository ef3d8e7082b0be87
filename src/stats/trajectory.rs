//! Per-game trajectory reconstruction
//!
//! Replays a window of recent games and, after each one, places every player
//! of the competition on a leaderboard by their skill at that point. Players
//! who sat a game out carry their last known skill forward.
//!
//! History rows for the whole window are fetched once up front, so each
//! played-game lookup is a map access.

use crate::error::{LedgerError, Result};
use crate::ledger::HistoryLedger;
use crate::store::{GameOrder, HistoryBound, Store};
use crate::types::{Competition, Game, GameId, HistoricalScoreId, PlayerId, TeamId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::debug;

/// A player's state after one game of the window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryPoint {
    pub game: GameId,
    pub skill: f64,
    pub played: bool,
    /// Only set for games the player took part in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub win: Option<bool>,
    /// 1 = highest skill after this game
    pub position: usize,
}

/// Series of trajectory points per player, oldest game first
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    pub games: Vec<GameId>,
    pub series: BTreeMap<PlayerId, Vec<TrajectoryPoint>>,
}

impl Trajectory {
    pub fn for_player(&self, player_id: &str) -> Option<&[TrajectoryPoint]> {
        self.series.get(player_id).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }

    /// The series keyed by display name, falling back to the player id
    pub fn to_json(&self, names: &BTreeMap<PlayerId, String>) -> Result<serde_json::Value> {
        let mut object = serde_json::Map::new();
        for (player_id, points) in &self.series {
            let key = names.get(player_id).unwrap_or(player_id).clone();
            object.insert(key, serde_json::to_value(points)?);
        }
        Ok(serde_json::Value::Object(object))
    }
}

/// Rebuild the trajectory of the `count` most recent games after skipping `offset`
pub async fn reconstruct(
    store: &dyn Store,
    history: &HistoryLedger,
    competition: &Competition,
    count: usize,
    offset: usize,
    default_skill: f64,
) -> Result<Trajectory> {
    let mut games = store
        .games(competition.id, GameOrder::Recorded, offset, Some(count))
        .await?;
    games.reverse();

    if games.is_empty() {
        return Ok(Trajectory::default());
    }

    let game_ids: Vec<GameId> = games.iter().map(|game| game.id).collect();
    let rows = history.for_games(competition.id, &game_ids).await?;

    let mut first_row: HashMap<GameId, HistoricalScoreId> = HashMap::new();
    for ((game_id, _), row) in &rows {
        first_row
            .entry(*game_id)
            .and_modify(|id| *id = (*id).min(row.id))
            .or_insert(row.id);
    }

    let mut players: BTreeSet<PlayerId> = competition.players.clone();
    for game in &games {
        players.extend(game.winner.players.iter().cloned());
        players.extend(game.loser.players.iter().cloned());
    }

    let mut teams_of: HashMap<&PlayerId, Vec<TeamId>> = HashMap::new();
    for player_id in &players {
        let team_ids = store
            .teams_with_player(player_id)
            .await?
            .into_iter()
            .map(|team| team.id)
            .collect();
        teams_of.insert(player_id, team_ids);
    }

    debug!(
        "Reconstructing trajectory of {} games for {} players in {}",
        games.len(),
        players.len(),
        competition.name
    );

    let mut series: BTreeMap<PlayerId, Vec<TrajectoryPoint>> = players
        .iter()
        .map(|player_id| (player_id.clone(), Vec::with_capacity(games.len())))
        .collect();

    for game in &games {
        for player_id in &players {
            let point = match game.team_of(player_id) {
                Some(team) => {
                    let row = rows.get(&(game.id, team.id)).ok_or_else(|| {
                        LedgerError::store(format!(
                            "no history row for game {} and team {} in competition {}",
                            game.id, team.id, competition.id
                        ))
                    })?;
                    TrajectoryPoint {
                        game: game.id,
                        skill: row.score,
                        played: true,
                        win: Some(game.is_won_by(player_id)),
                        position: 0,
                    }
                }
                None => {
                    let skill = match series.get(player_id).and_then(|points| points.last()) {
                        Some(previous) => previous.skill,
                        None => {
                            let team_ids = &teams_of[player_id];
                            prior_skill(store, competition, game, &first_row, team_ids)
                                .await?
                                .unwrap_or(default_skill)
                        }
                    };
                    TrajectoryPoint {
                        game: game.id,
                        skill,
                        played: false,
                        win: None,
                        position: 0,
                    }
                }
            };

            if let Some(points) = series.get_mut(player_id) {
                points.push(point);
            }
        }

        assign_positions(&mut series);
    }

    Ok(Trajectory {
        games: games.iter().map(|game| game.id).collect(),
        series,
    })
}

/// Skill of the player before the first game of the window they appear in
async fn prior_skill(
    store: &dyn Store,
    competition: &Competition,
    game: &Game,
    first_row: &HashMap<GameId, HistoricalScoreId>,
    team_ids: &[TeamId],
) -> Result<Option<f64>> {
    if team_ids.is_empty() {
        return Ok(None);
    }

    let bound = match first_row.get(&game.id) {
        Some(id) => HistoryBound::AtOrBefore(*id),
        None => HistoryBound::BeforeGame(game.id),
    };

    Ok(store
        .latest_history_for_teams(competition.id, team_ids, bound)
        .await?
        .map(|row| row.score))
}

/// Rank the last point of every series by skill, highest first
///
/// Ties keep player id order, so positions always form 1..=N.
fn assign_positions(series: &mut BTreeMap<PlayerId, Vec<TrajectoryPoint>>) {
    let mut ranking: Vec<(&PlayerId, f64)> = series
        .iter()
        .filter_map(|(player_id, points)| points.last().map(|point| (player_id, point.skill)))
        .collect();
    ranking.sort_by(|a, b| b.1.total_cmp(&a.1));

    let positions: HashMap<PlayerId, usize> = ranking
        .into_iter()
        .enumerate()
        .map(|(index, (player_id, _))| (player_id.clone(), index + 1))
        .collect();

    for (player_id, points) in series.iter_mut() {
        if let (Some(point), Some(position)) = (points.last_mut(), positions.get(player_id)) {
            point.position = *position;
        }
    }
}
