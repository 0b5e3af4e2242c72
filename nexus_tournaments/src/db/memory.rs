//! In-memory implementation of `TournamentStore`.
//!
//! Each tournament and each match sits behind its own mutex, so conditional
//! updates lock one row at a time. The outer maps are only write-locked to
//! insert or remove rows. Lock order is always tournaments before matches.

use async_trait::async_trait;
use chrono::Utc;
use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};
use tokio::sync::{Mutex, RwLock};

use super::repository::{Applied, MatchMutation, TeamAdmission, TournamentMutation, TournamentStore};
use crate::tournament::{
    Match, MatchId, Team, Tournament, TournamentError, TournamentFilter, TournamentId,
    TournamentResult,
};

struct TournamentEntry {
    tournament: Tournament,
    teams: Vec<Team>,
    /// Set when the row is removed while another task still holds the entry
    deleted: bool,
}

#[derive(Default)]
struct MatchTable {
    by_id: HashMap<MatchId, Arc<Mutex<Match>>>,
    /// (tournament, round, match number) slots already taken
    slots: HashSet<(TournamentId, u32, u32)>,
}

/// Process-local store for tests and database-less runs
#[derive(Default)]
pub struct MemoryStore {
    tournaments: RwLock<HashMap<TournamentId, Arc<Mutex<TournamentEntry>>>>,
    matches: RwLock<MatchTable>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn entry(&self, id: TournamentId) -> TournamentResult<Arc<Mutex<TournamentEntry>>> {
        self.tournaments
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| TournamentError::tournament_not_found(id))
    }

    async fn match_cell(&self, id: MatchId) -> TournamentResult<Arc<Mutex<Match>>> {
        self.matches
            .read()
            .await
            .by_id
            .get(&id)
            .cloned()
            .ok_or_else(|| TournamentError::match_not_found(id))
    }
}

#[async_trait]
impl TournamentStore for MemoryStore {
    async fn health_check(&self) -> TournamentResult<()> {
        Ok(())
    }

    async fn insert_tournament(&self, tournament: &Tournament) -> TournamentResult<()> {
        let mut tournaments = self.tournaments.write().await;
        if tournaments.contains_key(&tournament.id) {
            return Err(TournamentError::InvalidInput(format!(
                "tournament {} already exists",
                tournament.id
            )));
        }

        tournaments.insert(
            tournament.id,
            Arc::new(Mutex::new(TournamentEntry {
                tournament: tournament.clone(),
                teams: Vec::new(),
                deleted: false,
            })),
        );
        Ok(())
    }

    async fn get_tournament(&self, id: TournamentId) -> TournamentResult<Option<Tournament>> {
        let Ok(entry) = self.entry(id).await else {
            return Ok(None);
        };
        let entry = entry.lock().await;
        Ok((!entry.deleted).then(|| entry.tournament.clone()))
    }

    async fn list_tournaments(
        &self,
        filter: &TournamentFilter,
    ) -> TournamentResult<Vec<Tournament>> {
        let entries: Vec<_> = self.tournaments.read().await.values().cloned().collect();

        let mut found = Vec::new();
        for entry in entries {
            let entry = entry.lock().await;
            if !entry.deleted && filter.matches(&entry.tournament) {
                found.push(entry.tournament.clone());
            }
        }

        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(found)
    }

    async fn update_tournament(
        &self,
        id: TournamentId,
        mutate: TournamentMutation<'_>,
    ) -> TournamentResult<Tournament> {
        let entry = self.entry(id).await?;
        let mut entry = entry.lock().await;
        if entry.deleted {
            return Err(TournamentError::tournament_not_found(id));
        }

        let next = mutate(&entry.tournament)?;
        next.check_capacity()?;
        entry.tournament = next.clone();
        Ok(next)
    }

    async fn delete_tournament(&self, id: TournamentId) -> TournamentResult<bool> {
        let mut tournaments = self.tournaments.write().await;
        let Some(entry) = tournaments.remove(&id) else {
            return Ok(false);
        };
        entry.lock().await.deleted = true;

        let mut matches = self.matches.write().await;
        let table = &mut *matches;
        table.slots.retain(|(tournament_id, _, _)| *tournament_id != id);
        let mut orphaned = Vec::new();
        for (match_id, cell) in &table.by_id {
            if cell.lock().await.tournament_id == id {
                orphaned.push(*match_id);
            }
        }
        for match_id in orphaned {
            table.by_id.remove(&match_id);
        }

        Ok(true)
    }

    async fn admit_team(
        &self,
        tournament_id: TournamentId,
        admit: TeamAdmission<'_>,
    ) -> TournamentResult<Team> {
        let entry = self.entry(tournament_id).await?;
        let mut entry = entry.lock().await;
        if entry.deleted {
            return Err(TournamentError::tournament_not_found(tournament_id));
        }

        let team = admit(&entry.tournament)?;
        if entry.tournament.is_full() {
            return Err(TournamentError::CapacityExceeded {
                tournament_id,
                max_teams: entry.tournament.max_teams,
            });
        }

        entry.tournament.current_teams += 1;
        entry.tournament.updated_at = Utc::now();
        entry.teams.push(team.clone());
        Ok(team)
    }

    async fn list_teams(&self, tournament_id: TournamentId) -> TournamentResult<Vec<Team>> {
        let Ok(entry) = self.entry(tournament_id).await else {
            return Ok(Vec::new());
        };
        let entry = entry.lock().await;
        let mut teams = entry.teams.clone();
        teams.sort_by_key(|team| team.seed);
        Ok(teams)
    }

    async fn insert_match(&self, new_match: &Match) -> TournamentResult<()> {
        // Holding the tournaments map keeps a concurrent delete out until the match is in
        let tournaments = self.tournaments.read().await;
        if !tournaments.contains_key(&new_match.tournament_id) {
            return Err(TournamentError::tournament_not_found(new_match.tournament_id));
        }

        let mut matches = self.matches.write().await;
        let slot = (
            new_match.tournament_id,
            new_match.round,
            new_match.match_number,
        );
        if !matches.slots.insert(slot) {
            return Err(TournamentError::InvalidInput(format!(
                "match {} already exists in round {}",
                new_match.match_number, new_match.round
            )));
        }
        matches
            .by_id
            .insert(new_match.id, Arc::new(Mutex::new(new_match.clone())));
        Ok(())
    }

    async fn get_match(&self, id: MatchId) -> TournamentResult<Option<Match>> {
        let Ok(cell) = self.match_cell(id).await else {
            return Ok(None);
        };
        let found = cell.lock().await.clone();
        Ok(Some(found))
    }

    async fn list_matches(&self, tournament_id: TournamentId) -> TournamentResult<Vec<Match>> {
        let cells: Vec<_> = self.matches.read().await.by_id.values().cloned().collect();

        let mut found = Vec::new();
        for cell in cells {
            let m = cell.lock().await;
            if m.tournament_id == tournament_id {
                found.push(m.clone());
            }
        }

        found.sort_by_key(|m| (m.round, m.match_number));
        Ok(found)
    }

    async fn update_match(
        &self,
        id: MatchId,
        mutate: MatchMutation<'_>,
    ) -> TournamentResult<Applied<Match>> {
        let cell = self.match_cell(id).await?;
        let mut current = cell.lock().await;

        match mutate(&current)? {
            Some(next) => {
                *current = next.clone();
                Ok(Applied {
                    entity: next,
                    changed: true,
                })
            }
            None => Ok(Applied {
                entity: current.clone(),
                changed: false,
            }),
        }
    }
}
