//! Match lifecycle state machine.
//!
//! ```text
//! scheduled ──> in_progress ──> completed
//!     │              │
//!     └──────────────┴──────> cancelled
//! ```
//!
//! `completed` and `cancelled` are terminal. Re-applying the exact update that
//! produced a terminal state is accepted as a no-op so client retries do not
//! produce duplicate notifications.

use chrono::{DateTime, Utc};
use std::sync::Arc;

use super::{
    errors::{TournamentError, TournamentResult},
    models::{Match, MatchId, MatchStatus, MatchUpdate, NewMatch, TournamentId},
};
use crate::db::{Applied, TournamentStore};

/// Outcome of applying an update to a match snapshot
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// State changed; persist the new snapshot
    Applied(Match),
    /// Identical retry of a terminal update
    Unchanged,
}

/// Whether `from -> to` is an edge of the lifecycle graph
pub fn is_legal(from: MatchStatus, to: MatchStatus) -> bool {
    matches!(
        (from, to),
        (MatchStatus::Scheduled, MatchStatus::InProgress)
            | (MatchStatus::InProgress, MatchStatus::Completed)
            | (MatchStatus::Scheduled, MatchStatus::Cancelled)
            | (MatchStatus::InProgress, MatchStatus::Cancelled)
    )
}

/// Compute the next snapshot of `current` under `update`.
///
/// Pure: no I/O, `now` is supplied by the caller. All validation happens
/// here so nothing is written for a rejected update.
pub fn apply_update(
    current: &Match,
    update: &MatchUpdate,
    now: DateTime<Utc>,
) -> TournamentResult<Transition> {
    if current.status.is_terminal()
        && current.status == update.status
        && current.winner_id == update.winner_id
        && current.score == update.score
    {
        return Ok(Transition::Unchanged);
    }

    if !is_legal(current.status, update.status) {
        return Err(TournamentError::InvalidTransition {
            from: current.status,
            to: update.status,
        });
    }

    if let Some(winner) = update.winner_id
        && !current.has_team(winner)
    {
        return Err(TournamentError::InvalidWinner {
            match_id: current.id,
            winner,
        });
    }

    let mut next = current.clone();
    next.status = update.status;

    match update.status {
        MatchStatus::InProgress => {
            if update.winner_id.is_some() {
                return Err(TournamentError::InvalidInput(
                    "a winner can only be recorded when completing a match".into(),
                ));
            }
            next.started_at = Some(now);
            if update.score.is_some() {
                next.score.clone_from(&update.score);
            }
        }
        MatchStatus::Completed => {
            let Some(winner) = update.winner_id else {
                return Err(TournamentError::InvalidInput(
                    "completing a match requires a winner".into(),
                ));
            };
            next.winner_id = Some(winner);
            next.score.clone_from(&update.score);
            // started_at <= completed_at even if clocks disagree
            let started = current.started_at.unwrap_or(now);
            next.completed_at = Some(now.max(started));
        }
        MatchStatus::Cancelled => {
            if update.winner_id.is_some() {
                return Err(TournamentError::InvalidInput(
                    "a cancelled match cannot have a winner".into(),
                ));
            }
            if update.score.is_some() {
                next.score.clone_from(&update.score);
            }
        }
        MatchStatus::Scheduled => {
            return Err(TournamentError::InvalidTransition {
                from: current.status,
                to: update.status,
            });
        }
    }

    debug_assert_eq!(next.invariant_violation(), None);
    Ok(Transition::Applied(next))
}

/// Applies match commands against the store with per-match serialization
#[derive(Clone)]
pub struct MatchStateMachine {
    store: Arc<dyn TournamentStore>,
}

impl MatchStateMachine {
    pub fn new(store: Arc<dyn TournamentStore>) -> Self {
        Self { store }
    }

    /// Create a `scheduled` match inside an existing tournament.
    ///
    /// Both team references, when present, must belong to the tournament.
    pub async fn create_match(
        &self,
        tournament_id: TournamentId,
        request: NewMatch,
    ) -> TournamentResult<Match> {
        request.validate()?;

        if self.store.get_tournament(tournament_id).await?.is_none() {
            return Err(TournamentError::tournament_not_found(tournament_id));
        }

        let teams = self.store.list_teams(tournament_id).await?;
        for team_id in [request.team1_id, request.team2_id].into_iter().flatten() {
            if !teams.iter().any(|t| t.id == team_id) {
                return Err(TournamentError::team_not_found(team_id));
            }
        }

        let new_match = request.into_match(tournament_id, Utc::now());
        self.store.insert_match(&new_match).await?;

        log::info!(
            "Created match {} (round {}, match {}) in tournament {}",
            new_match.id,
            new_match.round,
            new_match.match_number,
            tournament_id
        );

        Ok(new_match)
    }

    /// Apply `update` to a match atomically.
    ///
    /// `changed` is false when the update was an identical terminal retry.
    pub async fn update_match(
        &self,
        match_id: MatchId,
        update: MatchUpdate,
    ) -> TournamentResult<Applied<Match>> {
        let mutate = |current: &Match| -> TournamentResult<Option<Match>> {
            match apply_update(current, &update, Utc::now())? {
                Transition::Applied(next) => Ok(Some(next)),
                Transition::Unchanged => Ok(None),
            }
        };

        let applied = self.store.update_match(match_id, &mutate).await?;

        if applied.changed {
            log::info!(
                "Match {} is now {} (tournament {})",
                match_id,
                applied.entity.status,
                applied.entity.tournament_id
            );
        } else {
            log::debug!(
                "Match {} update repeated terminal state {}, ignoring",
                match_id,
                applied.entity.status
            );
        }

        Ok(applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use uuid::Uuid;

    fn scheduled() -> Match {
        NewMatch {
            round: 1,
            match_number: 1,
            team1_id: Some(Uuid::new_v4()),
            team2_id: Some(Uuid::new_v4()),
            scheduled_at: None,
        }
        .into_match(Uuid::new_v4(), Utc::now())
    }

    fn applied(result: TournamentResult<Transition>) -> Match {
        match result {
            Ok(Transition::Applied(m)) => m,
            other => panic!("expected applied transition, got {other:?}"),
        }
    }

    #[test]
    fn test_legal_edges() {
        use MatchStatus::*;
        assert!(is_legal(Scheduled, InProgress));
        assert!(is_legal(InProgress, Completed));
        assert!(is_legal(Scheduled, Cancelled));
        assert!(is_legal(InProgress, Cancelled));

        assert!(!is_legal(Scheduled, Completed));
        assert!(!is_legal(Completed, Scheduled));
        assert!(!is_legal(Completed, Cancelled));
        assert!(!is_legal(Cancelled, InProgress));
        assert!(!is_legal(InProgress, InProgress));
    }

    #[test]
    fn test_start_sets_started_at() {
        let m = scheduled();
        let now = Utc::now();
        let next = applied(apply_update(&m, &MatchUpdate::new(MatchStatus::InProgress), now));
        assert_eq!(next.status, MatchStatus::InProgress);
        assert_eq!(next.started_at, Some(now));
        assert_eq!(next.completed_at, None);
        assert_eq!(next.winner_id, None);
    }

    #[test]
    fn test_start_with_winner_is_rejected() {
        let m = scheduled();
        let winner = m.team1_id.unwrap();
        let update = MatchUpdate::new(MatchStatus::InProgress).with_winner(winner);
        assert!(matches!(
            apply_update(&m, &update, Utc::now()),
            Err(TournamentError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_complete_records_winner_score_and_time() {
        let started = Utc::now();
        let m = applied(apply_update(
            &scheduled(),
            &MatchUpdate::new(MatchStatus::InProgress),
            started,
        ));
        let winner = m.team2_id.unwrap();
        let finished = started + Duration::minutes(40);
        let update = MatchUpdate::new(MatchStatus::Completed)
            .with_winner(winner)
            .with_score("2-1");

        let done = applied(apply_update(&m, &update, finished));
        assert_eq!(done.status, MatchStatus::Completed);
        assert_eq!(done.winner_id, Some(winner));
        assert_eq!(done.score.as_deref(), Some("2-1"));
        assert_eq!(done.started_at, Some(started));
        assert_eq!(done.completed_at, Some(finished));
    }

    #[test]
    fn test_completed_at_never_precedes_started_at() {
        let started = Utc::now();
        let m = applied(apply_update(
            &scheduled(),
            &MatchUpdate::new(MatchStatus::InProgress),
            started,
        ));
        let skewed = started - Duration::seconds(5);
        let update = MatchUpdate::new(MatchStatus::Completed).with_winner(m.team1_id.unwrap());
        let done = applied(apply_update(&m, &update, skewed));
        assert!(done.completed_at.unwrap() >= done.started_at.unwrap());
    }

    #[test]
    fn test_skipping_in_progress_is_invalid_transition() {
        let m = scheduled();
        let update = MatchUpdate::new(MatchStatus::Completed).with_winner(m.team1_id.unwrap());
        assert!(matches!(
            apply_update(&m, &update, Utc::now()),
            Err(TournamentError::InvalidTransition {
                from: MatchStatus::Scheduled,
                to: MatchStatus::Completed,
            })
        ));
    }

    #[test]
    fn test_outsider_winner_is_invalid_winner() {
        let m = applied(apply_update(
            &scheduled(),
            &MatchUpdate::new(MatchStatus::InProgress),
            Utc::now(),
        ));
        let update = MatchUpdate::new(MatchStatus::Completed).with_winner(Uuid::new_v4());
        assert!(matches!(
            apply_update(&m, &update, Utc::now()),
            Err(TournamentError::InvalidWinner { .. })
        ));
    }

    #[test]
    fn test_complete_without_winner_is_rejected() {
        let m = applied(apply_update(
            &scheduled(),
            &MatchUpdate::new(MatchStatus::InProgress),
            Utc::now(),
        ));
        assert!(matches!(
            apply_update(&m, &MatchUpdate::new(MatchStatus::Completed), Utc::now()),
            Err(TournamentError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_identical_terminal_retry_is_unchanged() {
        let m = applied(apply_update(
            &scheduled(),
            &MatchUpdate::new(MatchStatus::InProgress),
            Utc::now(),
        ));
        let update = MatchUpdate::new(MatchStatus::Completed)
            .with_winner(m.team1_id.unwrap())
            .with_score("3-0");
        let done = applied(apply_update(&m, &update, Utc::now()));

        assert_eq!(
            apply_update(&done, &update, Utc::now()).unwrap(),
            Transition::Unchanged
        );
    }

    #[test]
    fn test_conflicting_terminal_retry_is_rejected() {
        let m = applied(apply_update(
            &scheduled(),
            &MatchUpdate::new(MatchStatus::InProgress),
            Utc::now(),
        ));
        let update = MatchUpdate::new(MatchStatus::Completed).with_winner(m.team1_id.unwrap());
        let done = applied(apply_update(&m, &update, Utc::now()));

        let flipped = MatchUpdate::new(MatchStatus::Completed).with_winner(m.team2_id.unwrap());
        assert!(matches!(
            apply_update(&done, &flipped, Utc::now()),
            Err(TournamentError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_completed_match_cannot_be_rescheduled() {
        let m = applied(apply_update(
            &scheduled(),
            &MatchUpdate::new(MatchStatus::InProgress),
            Utc::now(),
        ));
        let done = applied(apply_update(
            &m,
            &MatchUpdate::new(MatchStatus::Completed).with_winner(m.team1_id.unwrap()),
            Utc::now(),
        ));
        assert!(matches!(
            apply_update(&done, &MatchUpdate::new(MatchStatus::Scheduled), Utc::now()),
            Err(TournamentError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_nothing_moves_back_to_scheduled() {
        let pending = scheduled();
        let started = applied(apply_update(
            &pending,
            &MatchUpdate::new(MatchStatus::InProgress),
            Utc::now(),
        ));

        for current in [&pending, &started] {
            match apply_update(current, &MatchUpdate::new(MatchStatus::Scheduled), Utc::now()) {
                Err(TournamentError::InvalidTransition { from, to }) => {
                    assert_eq!(from, current.status);
                    assert_eq!(to, MatchStatus::Scheduled);
                }
                other => panic!("expected invalid transition, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_cancel_keeps_existing_timestamps() {
        let started = Utc::now();
        let m = applied(apply_update(
            &scheduled(),
            &MatchUpdate::new(MatchStatus::InProgress),
            started,
        ));
        let cancelled = applied(apply_update(
            &m,
            &MatchUpdate::new(MatchStatus::Cancelled),
            Utc::now(),
        ));
        assert_eq!(cancelled.status, MatchStatus::Cancelled);
        assert_eq!(cancelled.started_at, Some(started));
        assert_eq!(cancelled.completed_at, None);

        assert_eq!(
            apply_update(&cancelled, &MatchUpdate::new(MatchStatus::Cancelled), Utc::now())
                .unwrap(),
            Transition::Unchanged
        );
    }

    #[test]
    fn test_cancel_scheduled_match() {
        let m = scheduled();
        let cancelled = applied(apply_update(
            &m,
            &MatchUpdate::new(MatchStatus::Cancelled),
            Utc::now(),
        ));
        assert_eq!(cancelled.started_at, None);
        assert_eq!(cancelled.invariant_violation(), None);
    }

    #[test]
    fn test_bye_match_cannot_be_won_by_empty_slot() {
        let mut m = scheduled();
        m.team2_id = None;
        let m = applied(apply_update(
            &m,
            &MatchUpdate::new(MatchStatus::InProgress),
            Utc::now(),
        ));
        let update = MatchUpdate::new(MatchStatus::Completed).with_winner(Uuid::new_v4());
        assert!(matches!(
            apply_update(&m, &update, Utc::now()),
            Err(TournamentError::InvalidWinner { .. })
        ));
        let update = MatchUpdate::new(MatchStatus::Completed).with_winner(m.team1_id.unwrap());
        assert!(apply_update(&m, &update, Utc::now()).is_ok());
    }
}
