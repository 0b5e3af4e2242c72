//! Registration capacity under concurrent load.
//!
//! However many registrations race for the same tournament, exactly
//! `min(attempts, max_teams)` succeed and seeds stay dense.

use chrono::{Duration, Utc};
use nexus_tournaments::db::MemoryStore;
use nexus_tournaments::events::EventHub;
use nexus_tournaments::tournament::{
    BracketType, NewTournament, RegisterTeam, TournamentError, TournamentService,
};
use proptest::prelude::*;
use std::sync::Arc;
use uuid::Uuid;

fn service() -> TournamentService {
    TournamentService::new(Arc::new(MemoryStore::new()), EventHub::new(256))
}

fn cup(max_teams: u32) -> NewTournament {
    let start = Utc::now();
    NewTournament {
        name: "Concurrency Cup".to_string(),
        game_id: Uuid::new_v4(),
        bracket_type: BracketType::RoundRobin,
        max_teams,
        prize_pool_cents: 0,
        start_date: start,
        end_date: start + Duration::hours(6),
        rules: String::new(),
    }
}

/// Race `attempts` registrations; returns (successes, capacity rejections)
async fn race(service: &TournamentService, max_teams: u32, attempts: u32) -> (u32, u32) {
    let t = service
        .create_tournament(cup(max_teams), Uuid::new_v4())
        .await
        .expect("create tournament");

    let tournament_id = t.id;
    let mut handles = Vec::new();
    for i in 0..attempts {
        let service = service.clone();
        handles.push(tokio::spawn(async move {
            service
                .register_team(
                    tournament_id,
                    RegisterTeam {
                        name: format!("team-{i}"),
                        members: vec![],
                    },
                    Uuid::new_v4(),
                )
                .await
        }));
    }

    let mut successes = 0;
    let mut rejected = 0;
    for handle in handles {
        match handle.await.expect("task panicked") {
            Ok(_) => successes += 1,
            Err(TournamentError::CapacityExceeded { max_teams: max, .. }) => {
                assert_eq!(max, max_teams);
                rejected += 1;
            }
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    let stored = service.get_tournament(t.id).await.expect("get tournament");
    assert_eq!(stored.current_teams, successes);
    assert!(stored.current_teams <= stored.max_teams);

    let seeds: Vec<u32> = service
        .list_teams(t.id)
        .await
        .expect("list teams")
        .iter()
        .map(|team| team.seed)
        .collect();
    assert_eq!(seeds, (1..=successes).collect::<Vec<_>>());

    (successes, rejected)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_last_slot_goes_to_exactly_one_caller() {
    let service = service();
    let (successes, rejected) = race(&service, 1, 32).await;
    assert_eq!(successes, 1);
    assert_eq!(rejected, 31);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_oversubscribed_tournament_fills_exactly() {
    let service = service();
    let (successes, rejected) = race(&service, 16, 50).await;
    assert_eq!(successes, 16);
    assert_eq!(rejected, 34);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_registrations_in_different_tournaments_do_not_interfere() {
    let service = service();
    let (a, b) = tokio::join!(race(&service, 4, 10), race(&service, 6, 3));
    assert_eq!(a, (4, 6));
    assert_eq!(b, (3, 0));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_successes_never_exceed_capacity(max_teams in 1u32..8, attempts in 0u32..20) {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(4)
            .enable_all()
            .build()
            .unwrap();

        let (successes, rejected) = runtime.block_on(async {
            race(&service(), max_teams, attempts).await
        });

        prop_assert_eq!(successes, attempts.min(max_teams));
        prop_assert_eq!(successes + rejected, attempts);
    }
}
