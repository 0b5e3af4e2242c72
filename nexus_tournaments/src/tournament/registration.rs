//! Team registration with capacity gating.

use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use super::{
    errors::{TournamentError, TournamentResult},
    models::{RegisterTeam, Team, TeamStatus, Tournament, TournamentId, UserId},
};
use crate::db::TournamentStore;

/// Admits teams into tournaments without ever exceeding `max_teams`
#[derive(Clone)]
pub struct RegistrationManager {
    store: Arc<dyn TournamentStore>,
}

impl RegistrationManager {
    pub fn new(store: Arc<dyn TournamentStore>) -> Self {
        Self { store }
    }

    /// Register a team for a tournament
    ///
    /// The capacity check, team insert and `current_teams` increment happen in
    /// one atomic unit in the store, so concurrent registrations for the last
    /// open slot cannot both succeed.
    ///
    /// # Errors
    ///
    /// * `TournamentError::InvalidInput` - Empty name
    /// * `TournamentError::NotFound` - Tournament does not exist
    /// * `TournamentError::CapacityExceeded` - No open slot left
    pub async fn register_team(
        &self,
        tournament_id: TournamentId,
        request: RegisterTeam,
        captain_id: UserId,
    ) -> TournamentResult<Team> {
        let name = request.name.trim();
        if name.is_empty() {
            return Err(TournamentError::InvalidInput(
                "team name must not be empty".into(),
            ));
        }

        let decide =
            |tournament: &Tournament| admit(tournament, name, &request.members, captain_id);
        let team = self.store.admit_team(tournament_id, &decide).await?;

        log::info!(
            "Team '{}' ({}) registered for tournament {} with seed {}",
            team.name,
            team.id,
            tournament_id,
            team.seed
        );

        Ok(team)
    }
}

/// Decide admission against a locked tournament snapshot
fn admit(
    tournament: &Tournament,
    name: &str,
    members: &[UserId],
    captain_id: UserId,
) -> TournamentResult<Team> {
    if tournament.is_full() {
        log::debug!(
            "Rejecting registration for full tournament {} ({}/{})",
            tournament.id,
            tournament.current_teams,
            tournament.max_teams
        );
        return Err(TournamentError::CapacityExceeded {
            tournament_id: tournament.id,
            max_teams: tournament.max_teams,
        });
    }

    Ok(Team {
        id: Uuid::new_v4(),
        tournament_id: tournament.id,
        name: name.to_string(),
        captain_id,
        members: members.to_vec(),
        seed: tournament.current_teams + 1,
        status: TeamStatus::Registered,
        created_at: Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tournament::models::{BracketType, NewTournament, TournamentStatus};

    fn tournament(max_teams: u32, current_teams: u32) -> Tournament {
        let now = Utc::now();
        let mut t = Tournament::create(
            NewTournament {
                name: "Cup".to_string(),
                game_id: Uuid::new_v4(),
                bracket_type: BracketType::SingleElimination,
                max_teams,
                prize_pool_cents: 0,
                start_date: now,
                end_date: now,
                rules: String::new(),
            },
            Uuid::new_v4(),
            now,
        );
        t.current_teams = current_teams;
        t
    }

    #[test]
    fn test_admit_assigns_next_seed() {
        let t = tournament(4, 2);
        let captain = Uuid::new_v4();
        let team = admit(&t, "Falcons", &[captain], captain).unwrap();
        assert_eq!(team.seed, 3);
        assert_eq!(team.tournament_id, t.id);
        assert_eq!(team.status, TeamStatus::Registered);
        assert_eq!(team.members, vec![captain]);
    }

    #[test]
    fn test_admit_rejects_full_tournament() {
        let t = tournament(2, 2);
        assert!(matches!(
            admit(&t, "Late", &[], Uuid::new_v4()),
            Err(TournamentError::CapacityExceeded { max_teams: 2, .. })
        ));
    }

    #[test]
    fn test_admit_gated_by_capacity_only() {
        for status in [
            TournamentStatus::Upcoming,
            TournamentStatus::Active,
            TournamentStatus::Completed,
            TournamentStatus::Cancelled,
        ] {
            let mut t = tournament(8, 3);
            t.status = status;
            let team = admit(&t, "Team", &[], Uuid::new_v4()).unwrap();
            assert_eq!(team.seed, 4, "{status}");
        }
    }
}
