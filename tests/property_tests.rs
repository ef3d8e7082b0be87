//! Property tests over random game sequences
//!
//! Async bodies run through `tokio_test::block_on`; each case builds a
//! fresh in-memory ledger.

mod fixtures;

use proptest::prelude::*;
use rating_ledger::config::RatingConfig;
use rating_ledger::rating::{RatingKernel, TrueSkillKernel};
use rating_ledger::store::{GameOrder, Store};
use rating_ledger::types::{Game, Rating, TeamId};
use std::collections::HashMap;

use fixtures::{create_test_ledger, TestLedger};

const ROSTER: [&str; 5] = ["alice", "bob", "carol", "dave", "erin"];

/// Pairs of distinct roster indices: (winner, loser)
fn matchup_sequences(max_len: usize) -> impl Strategy<Value = Vec<(usize, usize)>> {
    prop::collection::vec((0..ROSTER.len(), 0..ROSTER.len()), 1..max_len)
        .prop_map(|pairs| pairs.into_iter().filter(|(w, l)| w != l).collect())
}

async fn replay(ledger: &TestLedger, matchups: &[(usize, usize)]) -> Vec<Game> {
    let mut games = Vec::with_capacity(matchups.len());
    for &(winner, loser) in matchups {
        games.push(ledger.play(&[ROSTER[winner]], &[ROSTER[loser]]).await);
    }
    games
}

type ScoreBits = (TeamId, u64, u64, u32, u32);
type RowBits = (u64, u64, TeamId, u64);

/// Scores and history of a ledger, without competition ids
async fn snapshot(ledger: &TestLedger) -> (Vec<ScoreBits>, Vec<RowBits>) {
    let mut scores: Vec<_> = ledger
        .store
        .scores(ledger.league)
        .await
        .unwrap()
        .into_iter()
        .map(|s| (s.team_id, s.mu.to_bits(), s.sigma.to_bits(), s.wins, s.defeats))
        .collect();
    scores.sort_unstable();

    let games: Vec<u64> = ledger
        .store
        .games(ledger.league, GameOrder::Recorded, 0, None)
        .await
        .unwrap()
        .iter()
        .map(|game| game.id)
        .collect();
    let rows = ledger
        .store
        .history_for_games(ledger.league, &games)
        .await
        .unwrap()
        .into_iter()
        .map(|row| (row.id, row.game_id, row.team_id, row.score.to_bits()))
        .collect();

    (scores, rows)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_replay_is_deterministic(matchups in matchup_sequences(30)) {
        tokio_test::block_on(async {
            let first = create_test_ledger().await;
            replay(&first, &matchups).await;
            let second = create_test_ledger().await;
            replay(&second, &matchups).await;

            prop_assert_eq!(snapshot(&first).await, snapshot(&second).await);
            Ok(())
        })?;
    }

    #[test]
    fn prop_two_history_rows_per_game(matchups in matchup_sequences(30)) {
        tokio_test::block_on(async {
            let ledger = create_test_ledger().await;
            let games = replay(&ledger, &matchups).await;

            let count = ledger.store.history_count(ledger.league).await.unwrap();
            prop_assert_eq!(count, 2 * games.len());
            prop_assert_eq!(ledger.store.history_count(ledger.cup).await.unwrap(), 0);
            Ok(())
        })?;
    }

    #[test]
    fn prop_scores_match_kernel_fold(matchups in matchup_sequences(30)) {
        tokio_test::block_on(async {
            let ledger = create_test_ledger().await;
            let games = replay(&ledger, &matchups).await;

            let kernel = TrueSkillKernel::new(RatingConfig::default()).unwrap();
            let mut ratings: HashMap<TeamId, Rating> = HashMap::new();
            for game in &games {
                let winner = *ratings.get(&game.winner.id).unwrap_or(&kernel.initial_rating());
                let loser = *ratings.get(&game.loser.id).unwrap_or(&kernel.initial_rating());
                let (winner_post, loser_post) = kernel.update(winner, loser).unwrap();

                // The winner always gains and the loser always drops
                prop_assert!(winner_post.mu > winner.mu);
                prop_assert!(loser_post.mu < loser.mu);

                ratings.insert(game.winner.id, winner_post);
                ratings.insert(game.loser.id, loser_post);
            }

            for (team_id, expected) in &ratings {
                let score = ledger.score(ledger.league, *team_id).await;
                prop_assert!((score.mu - expected.mu).abs() <= 1e-9);
                prop_assert!((score.sigma - expected.sigma).abs() <= 1e-9);
            }
            Ok(())
        })?;
    }

    #[test]
    fn prop_team_resolution_is_canonical(
        members in prop::collection::btree_set(0..ROSTER.len(), 1..=ROSTER.len()),
        reversed in any::<bool>(),
    ) {
        tokio_test::block_on(async {
            let ledger = create_test_ledger().await;
            let mut players: Vec<&str> = members.iter().map(|&i| ROSTER[i]).collect();

            let (first, created) = ledger
                .service
                .intake()
                .resolve_team(players.clone())
                .await
                .unwrap();
            prop_assert!(created);

            if reversed {
                players.reverse();
            }
            players.push(players[0]);
            let (second, created) = ledger
                .service
                .intake()
                .resolve_team(players)
                .await
                .unwrap();
            prop_assert!(!created);
            prop_assert_eq!(first.id, second.id);
            prop_assert_eq!(ledger.store.team_count().await, 1);
            Ok(())
        })?;
    }

    #[test]
    fn prop_positions_rank_skill(matchups in matchup_sequences(20), window in 1usize..12) {
        tokio_test::block_on(async {
            let ledger = create_test_ledger().await;
            let games = replay(&ledger, &matchups).await;

            let trajectory = ledger
                .service
                .stats()
                .latest_results_by_player(ledger.league, window, 0)
                .await
                .unwrap();
            prop_assert_eq!(trajectory.games.len(), window.min(games.len()));

            let players = trajectory.series.len();
            for index in 0..trajectory.games.len() {
                let mut slice: Vec<(usize, f64)> = trajectory
                    .series
                    .values()
                    .map(|points| (points[index].position, points[index].skill))
                    .collect();
                slice.sort_by_key(|(position, _)| *position);

                let positions: Vec<usize> = slice.iter().map(|(position, _)| *position).collect();
                prop_assert_eq!(positions, (1..=players).collect::<Vec<_>>());
                for pair in slice.windows(2) {
                    prop_assert!(pair[0].1 >= pair[1].1);
                }
            }
            Ok(())
        })?;
    }
}
