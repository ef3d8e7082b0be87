//! Performance benchmarks for rating updates and history reads

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rating_ledger::config::{AppConfig, RatingConfig};
use rating_ledger::rating::{RatingKernel, TrueSkillKernel};
use rating_ledger::service::LedgerService;
use rating_ledger::types::{Competition, CompetitionId, Player, Rating};
use rating_ledger::utils::SystemClock;
use rating_ledger::{InMemoryStore, StaticPlayerDirectory};
use std::sync::Arc;

const ROSTER: [&str; 8] = [
    "player_0", "player_1", "player_2", "player_3", "player_4", "player_5", "player_6",
    "player_7",
];

async fn create_bench_system() -> (LedgerService, CompetitionId) {
    let store = InMemoryStore::new();
    let competition = Competition::new("bench", chrono::Utc::now()).with_players(ROSTER);
    let competition_id = competition.id;
    store.insert_competition(competition).await;

    let directory =
        StaticPlayerDirectory::with_players(ROSTER.iter().map(|id| Player::new(*id, *id)));

    let service = LedgerService::new(
        AppConfig::default(),
        Arc::new(store),
        Arc::new(directory),
        Arc::new(SystemClock),
    )
    .unwrap();

    (service, competition_id)
}

/// Round-robin of solo games plus one doubles game per round
async fn play_rounds(service: &LedgerService, competition_id: CompetitionId, rounds: usize) {
    for round in 0..rounds {
        let winner = ROSTER[round % ROSTER.len()];
        let loser = ROSTER[(round + 3) % ROSTER.len()];
        let _ = service
            .intake()
            .announce([winner], [loser], competition_id)
            .await;

        let partner = ROSTER[(round + 1) % ROSTER.len()];
        let rival = ROSTER[(round + 5) % ROSTER.len()];
        let _ = service
            .intake()
            .announce([winner, partner], [loser, rival], competition_id)
            .await;
    }
}

fn bench_rating_updates(c: &mut Criterion) {
    let kernel = TrueSkillKernel::new(RatingConfig::default()).unwrap();
    let favourite = Rating::new(1200.0, 150.0);
    let underdog = Rating::new(900.0, 300.0);

    c.bench_function("trueskill_update", |b| {
        b.iter(|| black_box(kernel.update(black_box(favourite), black_box(underdog))))
    });

    c.bench_function("trueskill_quality", |b| {
        b.iter(|| black_box(kernel.quality(black_box(favourite), black_box(underdog))))
    });
}

fn bench_single_announce(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let (service, competition_id) = rt.block_on(create_bench_system());

    c.bench_function("single_announce", |b| {
        b.iter(|| {
            rt.block_on(async {
                black_box(
                    service
                        .intake()
                        .announce(["player_0"], ["player_1"], competition_id)
                        .await,
                )
            })
        })
    });
}

fn bench_trajectory(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let (service, competition_id) = rt.block_on(async {
        let (service, competition_id) = create_bench_system().await;
        play_rounds(&service, competition_id, 100).await;
        (service, competition_id)
    });

    c.bench_function("latest_results_by_player_50", |b| {
        b.iter(|| {
            rt.block_on(async {
                black_box(
                    service
                        .stats()
                        .latest_results_by_player(competition_id, 50, 0)
                        .await,
                )
            })
        })
    });

    c.bench_function("player_report", |b| {
        b.iter(|| {
            rt.block_on(async {
                black_box(service.player_report("player_0", competition_id).await)
            })
        })
    });
}

criterion_group!(
    benches,
    bench_rating_updates,
    bench_single_announce,
    bench_trajectory
);
criterion_main!(benches);
