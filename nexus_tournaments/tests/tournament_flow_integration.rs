//! End-to-end tournament flow against the in-memory store.
//!
//! Covers registration, match lifecycle and the events an observer sees.

use chrono::{Duration, Utc};
use nexus_tournaments::db::MemoryStore;
use nexus_tournaments::events::{DomainEvent, EventHub, ObserverHandle};
use nexus_tournaments::tournament::{
    BracketType, MatchStatus, MatchUpdate, NewMatch, NewTournament, RegisterTeam,
    TournamentError, TournamentService,
};
use std::sync::Arc;
use uuid::Uuid;

fn service() -> TournamentService {
    TournamentService::new(Arc::new(MemoryStore::new()), EventHub::new(64))
}

fn two_team_cup() -> NewTournament {
    let start = Utc::now();
    NewTournament {
        name: "Two Team Cup".to_string(),
        game_id: Uuid::new_v4(),
        bracket_type: BracketType::SingleElimination,
        max_teams: 2,
        prize_pool_cents: 50_000,
        start_date: start,
        end_date: start + Duration::days(2),
        rules: "best of three".to_string(),
    }
}

fn team(name: &str) -> RegisterTeam {
    RegisterTeam {
        name: name.to_string(),
        members: vec![Uuid::new_v4(), Uuid::new_v4()],
    }
}

fn drain(observer: &mut ObserverHandle) -> Vec<DomainEvent> {
    let mut events = Vec::new();
    while let Some(event) = observer.try_recv() {
        events.push((*event).clone());
    }
    events
}

#[tokio::test]
async fn test_full_tournament_flow_event_order() {
    let service = service();
    let t = service
        .create_tournament(two_team_cup(), Uuid::new_v4())
        .await
        .expect("create tournament");
    let mut observer = service.subscribe(t.id).await.expect("subscribe");

    let first = service
        .register_team(t.id, team("Falcons"), Uuid::new_v4())
        .await
        .expect("first registration");
    let second = service
        .register_team(t.id, team("Ravens"), Uuid::new_v4())
        .await
        .expect("second registration");
    assert_eq!(service.get_tournament(t.id).await.unwrap().current_teams, 2);

    let third = service
        .register_team(t.id, team("Latecomers"), Uuid::new_v4())
        .await;
    assert!(matches!(
        third,
        Err(TournamentError::CapacityExceeded { max_teams: 2, .. })
    ));

    let m = service
        .create_match(
            t.id,
            NewMatch {
                round: 1,
                match_number: 1,
                team1_id: Some(first.id),
                team2_id: Some(second.id),
                scheduled_at: None,
            },
        )
        .await
        .expect("create match");
    assert_eq!(m.status, MatchStatus::Scheduled);

    service
        .update_match(m.id, MatchUpdate::new(MatchStatus::InProgress))
        .await
        .expect("start match");
    let finished = service
        .update_match(
            m.id,
            MatchUpdate::new(MatchStatus::Completed)
                .with_winner(first.id)
                .with_score("2-1"),
        )
        .await
        .expect("complete match");
    assert_eq!(finished.winner_id, Some(first.id));
    assert!(finished.completed_at >= finished.started_at);

    let events = drain(&mut observer);
    let kinds: Vec<_> = events.iter().map(DomainEvent::event_type).collect();
    assert_eq!(
        kinds,
        vec![
            "team_registered",
            "team_registered",
            "match_created",
            "match_updated",
            "match_updated",
        ]
    );

    let updates: Vec<_> = events
        .iter()
        .filter_map(|event| match event {
            DomainEvent::MatchUpdated { status, winner, .. } => Some((*status, *winner)),
            _ => None,
        })
        .collect();
    assert_eq!(
        updates,
        vec![
            (MatchStatus::InProgress, None),
            (MatchStatus::Completed, Some(first.id)),
        ]
    );
}

#[tokio::test]
async fn test_terminal_retry_is_idempotent_with_single_event() {
    let service = service();
    let t = service
        .create_tournament(two_team_cup(), Uuid::new_v4())
        .await
        .unwrap();
    let a = service.register_team(t.id, team("A"), Uuid::new_v4()).await.unwrap();
    let b = service.register_team(t.id, team("B"), Uuid::new_v4()).await.unwrap();
    let m = service
        .create_match(
            t.id,
            NewMatch {
                round: 1,
                match_number: 1,
                team1_id: Some(a.id),
                team2_id: Some(b.id),
                scheduled_at: None,
            },
        )
        .await
        .unwrap();
    service
        .update_match(m.id, MatchUpdate::new(MatchStatus::InProgress))
        .await
        .unwrap();

    let mut observer = service.subscribe(t.id).await.unwrap();
    let complete = MatchUpdate::new(MatchStatus::Completed)
        .with_winner(b.id)
        .with_score("0-2");

    let first = service.update_match(m.id, complete.clone()).await.unwrap();
    let retry = service.update_match(m.id, complete).await.unwrap();
    assert_eq!(first, retry);

    let events = drain(&mut observer);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_type(), "match_updated");

    // a different terminal update is a real transition attempt and fails
    let conflicting = service
        .update_match(m.id, MatchUpdate::new(MatchStatus::Completed).with_winner(a.id))
        .await;
    assert!(matches!(
        conflicting,
        Err(TournamentError::InvalidTransition { .. })
    ));
    assert!(drain(&mut observer).is_empty());
}

#[tokio::test]
async fn test_invalid_winner_leaves_match_untouched() {
    let service = service();
    let t = service
        .create_tournament(two_team_cup(), Uuid::new_v4())
        .await
        .unwrap();
    let a = service.register_team(t.id, team("A"), Uuid::new_v4()).await.unwrap();
    let b = service.register_team(t.id, team("B"), Uuid::new_v4()).await.unwrap();
    let m = service
        .create_match(
            t.id,
            NewMatch {
                round: 1,
                match_number: 1,
                team1_id: Some(a.id),
                team2_id: Some(b.id),
                scheduled_at: None,
            },
        )
        .await
        .unwrap();
    service
        .update_match(m.id, MatchUpdate::new(MatchStatus::InProgress))
        .await
        .unwrap();

    let outsider = Uuid::new_v4();
    let result = service
        .update_match(
            m.id,
            MatchUpdate::new(MatchStatus::Completed).with_winner(outsider),
        )
        .await;
    assert!(matches!(result, Err(TournamentError::InvalidWinner { .. })));

    let stored = service.get_match(m.id).await.unwrap();
    assert_eq!(stored.status, MatchStatus::InProgress);
    assert_eq!(stored.winner_id, None);
}

#[tokio::test]
async fn test_cancel_from_scheduled_and_no_way_back() {
    let service = service();
    let t = service
        .create_tournament(two_team_cup(), Uuid::new_v4())
        .await
        .unwrap();
    let m = service
        .create_match(
            t.id,
            NewMatch {
                round: 1,
                match_number: 1,
                team1_id: None,
                team2_id: None,
                scheduled_at: None,
            },
        )
        .await
        .unwrap();

    let cancelled = service
        .update_match(m.id, MatchUpdate::new(MatchStatus::Cancelled))
        .await
        .unwrap();
    assert_eq!(cancelled.status, MatchStatus::Cancelled);

    let restart = service
        .update_match(m.id, MatchUpdate::new(MatchStatus::InProgress))
        .await;
    assert!(matches!(
        restart,
        Err(TournamentError::InvalidTransition {
            from: MatchStatus::Cancelled,
            to: MatchStatus::InProgress
        })
    ));
}

#[tokio::test]
async fn test_match_rejects_foreign_team() {
    let service = service();
    let home = service
        .create_tournament(two_team_cup(), Uuid::new_v4())
        .await
        .unwrap();
    let away = service
        .create_tournament(two_team_cup(), Uuid::new_v4())
        .await
        .unwrap();
    let local = service
        .register_team(home.id, team("Local"), Uuid::new_v4())
        .await
        .unwrap();
    let foreign = service
        .register_team(away.id, team("Foreign"), Uuid::new_v4())
        .await
        .unwrap();

    let result = service
        .create_match(
            home.id,
            NewMatch {
                round: 1,
                match_number: 1,
                team1_id: Some(local.id),
                team2_id: Some(foreign.id),
                scheduled_at: None,
            },
        )
        .await;
    assert!(matches!(result, Err(TournamentError::NotFound { .. })));
    assert!(service.list_matches(home.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unknown_ids_are_not_found() {
    let service = service();
    let missing = Uuid::new_v4();

    assert!(matches!(
        service.get_tournament(missing).await,
        Err(TournamentError::NotFound { .. })
    ));
    assert!(matches!(
        service.register_team(missing, team("Ghosts"), Uuid::new_v4()).await,
        Err(TournamentError::NotFound { .. })
    ));
    assert!(matches!(
        service
            .update_match(missing, MatchUpdate::new(MatchStatus::InProgress))
            .await,
        Err(TournamentError::NotFound { .. })
    ));
    assert!(matches!(
        service.get_bracket(missing).await,
        Err(TournamentError::NotFound { .. })
    ));
}
