//! Tournament service: the single entry point for commands and queries.
//!
//! Every committed mutation is published to the [`EventHub`] after the store
//! confirms it. Failed commands publish nothing. A mutation and its event run
//! under one lock per tournament or per match, so observers receive events
//! in the order the store committed them.

use chrono::Utc;
use std::sync::Arc;

use super::{
    errors::{TournamentError, TournamentResult},
    models::{
        Bracket, Match, MatchId, MatchUpdate, NewMatch, NewTournament, RegisterTeam, Team,
        Tournament, TournamentFilter, TournamentId, TournamentUpdate, UserId, group_by_round,
    },
    ordering::KeyedLocks,
    registration::RegistrationManager,
    state_machine::MatchStateMachine,
};
use crate::{
    db::TournamentStore,
    events::{DomainEvent, EventHub, ObserverHandle, PublishReport},
};

/// Composition root wiring the store, registration, match flow and events
#[derive(Clone)]
pub struct TournamentService {
    store: Arc<dyn TournamentStore>,
    registration: RegistrationManager,
    matches: MatchStateMachine,
    hub: EventHub,
    tournament_order: Arc<KeyedLocks>,
    match_order: Arc<KeyedLocks>,
}

impl TournamentService {
    pub fn new(store: Arc<dyn TournamentStore>, hub: EventHub) -> Self {
        Self {
            registration: RegistrationManager::new(Arc::clone(&store)),
            matches: MatchStateMachine::new(Arc::clone(&store)),
            store,
            hub,
            tournament_order: Arc::new(KeyedLocks::new()),
            match_order: Arc::new(KeyedLocks::new()),
        }
    }

    pub fn hub(&self) -> &EventHub {
        &self.hub
    }

    pub async fn health_check(&self) -> TournamentResult<()> {
        self.store.health_check().await
    }

    fn emit(&self, event: DomainEvent) -> PublishReport {
        let event_type = event.event_type();
        let tournament_id = event.tournament_id();
        let report = self.hub.publish(event);
        log::debug!(
            "Published {} for tournament {}: {} delivered, {} dropped",
            event_type,
            tournament_id,
            report.delivered,
            report.dropped
        );
        report
    }

    // === Tournaments ===

    pub async fn create_tournament(
        &self,
        request: NewTournament,
        organizer_id: UserId,
    ) -> TournamentResult<Tournament> {
        request.validate()?;
        let tournament = Tournament::create(request, organizer_id, Utc::now());
        self.store.insert_tournament(&tournament).await?;

        log::info!(
            "Created tournament '{}' ({}) with {} slots",
            tournament.name,
            tournament.id,
            tournament.max_teams
        );

        self.emit(DomainEvent::TournamentCreated {
            tournament: tournament.clone(),
        });
        Ok(tournament)
    }

    pub async fn list_tournaments(
        &self,
        filter: &TournamentFilter,
    ) -> TournamentResult<Vec<Tournament>> {
        self.store.list_tournaments(filter).await
    }

    pub async fn get_tournament(&self, id: TournamentId) -> TournamentResult<Tournament> {
        self.store
            .get_tournament(id)
            .await?
            .ok_or_else(|| TournamentError::tournament_not_found(id))
    }

    /// Replace the editable fields of a tournament
    ///
    /// # Errors
    ///
    /// * `TournamentError::InvalidInput` - Invalid fields, or `max_teams` below
    ///   the number of registered teams
    /// * `TournamentError::NotFound` - Tournament does not exist
    pub async fn update_tournament(
        &self,
        id: TournamentId,
        update: TournamentUpdate,
    ) -> TournamentResult<Tournament> {
        update.validate()?;
        let _order = self.tournament_order.lock(id).await;
        let mutate = |current: &Tournament| update.apply(current, Utc::now());
        let tournament = self.store.update_tournament(id, &mutate).await?;

        log::info!("Updated tournament {} ({})", tournament.id, tournament.status);

        self.emit(DomainEvent::TournamentUpdated {
            tournament_id: id,
            tournament: tournament.clone(),
        });
        Ok(tournament)
    }

    /// Delete a tournament with its teams and matches, then disconnect its observers
    pub async fn delete_tournament(&self, id: TournamentId) -> TournamentResult<()> {
        let _order = self.tournament_order.lock(id).await;
        if !self.store.delete_tournament(id).await? {
            return Err(TournamentError::tournament_not_found(id));
        }

        log::info!("Deleted tournament {}", id);

        self.emit(DomainEvent::TournamentDeleted { tournament_id: id });
        self.hub.close_partition(id);
        Ok(())
    }

    // === Teams ===

    pub async fn register_team(
        &self,
        tournament_id: TournamentId,
        request: RegisterTeam,
        captain_id: UserId,
    ) -> TournamentResult<Team> {
        let _order = self.tournament_order.lock(tournament_id).await;
        let team = self
            .registration
            .register_team(tournament_id, request, captain_id)
            .await?;
        self.emit(DomainEvent::team_registered(&team));
        Ok(team)
    }

    pub async fn list_teams(&self, tournament_id: TournamentId) -> TournamentResult<Vec<Team>> {
        self.get_tournament(tournament_id).await?;
        self.store.list_teams(tournament_id).await
    }

    // === Matches ===

    pub async fn create_match(
        &self,
        tournament_id: TournamentId,
        request: NewMatch,
    ) -> TournamentResult<Match> {
        let _order = self.tournament_order.lock(tournament_id).await;
        let created = self.matches.create_match(tournament_id, request).await?;
        self.emit(DomainEvent::match_created(&created));
        Ok(created)
    }

    pub async fn get_match(&self, match_id: MatchId) -> TournamentResult<Match> {
        self.store
            .get_match(match_id)
            .await?
            .ok_or_else(|| TournamentError::match_not_found(match_id))
    }

    /// Fetch a match, treating a match of another tournament as missing
    pub async fn get_tournament_match(
        &self,
        tournament_id: TournamentId,
        match_id: MatchId,
    ) -> TournamentResult<Match> {
        let found = self.get_match(match_id).await?;
        if found.tournament_id != tournament_id {
            return Err(TournamentError::match_not_found(match_id));
        }
        Ok(found)
    }

    pub async fn list_matches(&self, tournament_id: TournamentId) -> TournamentResult<Vec<Match>> {
        self.get_tournament(tournament_id).await?;
        self.store.list_matches(tournament_id).await
    }

    /// Matches grouped by round
    pub async fn get_bracket(&self, tournament_id: TournamentId) -> TournamentResult<Bracket> {
        let matches = self.list_matches(tournament_id).await?;
        Ok(group_by_round(matches))
    }

    /// Apply a status change to a match
    ///
    /// An identical retry of a terminal update succeeds without publishing a
    /// second event.
    pub async fn update_match(
        &self,
        match_id: MatchId,
        update: MatchUpdate,
    ) -> TournamentResult<Match> {
        let _order = self.match_order.lock(match_id).await;
        let applied = self.matches.update_match(match_id, update).await?;
        if applied.changed {
            self.emit(DomainEvent::match_updated(&applied.entity));
        }
        Ok(applied.entity)
    }

    /// Same as [`update_match`](Self::update_match), scoped to one tournament
    pub async fn update_tournament_match(
        &self,
        tournament_id: TournamentId,
        match_id: MatchId,
        update: MatchUpdate,
    ) -> TournamentResult<Match> {
        self.get_tournament_match(tournament_id, match_id).await?;
        self.update_match(match_id, update).await
    }

    // === Observers ===

    /// Observe one tournament's events
    ///
    /// Subscribing is ordered against deletion: the observer either receives
    /// `tournament_deleted` or the call fails with `NotFound`.
    pub async fn subscribe(&self, tournament_id: TournamentId) -> TournamentResult<ObserverHandle> {
        let _order = self.tournament_order.lock(tournament_id).await;
        self.get_tournament(tournament_id).await?;
        Ok(self.hub.subscribe(tournament_id))
    }

    /// Observe tournament lifecycle events across all tournaments
    pub fn subscribe_lobby(&self) -> ObserverHandle {
        self.hub.subscribe_lobby()
    }
}
