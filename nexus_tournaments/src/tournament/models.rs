//! Tournament, team and match data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::errors::{TournamentError, TournamentResult};

/// Tournament ID type
pub type TournamentId = Uuid;

/// Team ID type
pub type TeamId = Uuid;

/// Match ID type
pub type MatchId = Uuid;

/// Caller/user ID type (resolved before reaching the core)
pub type UserId = Uuid;

/// Matches grouped by round number, each round ordered by match number
pub type Bracket = BTreeMap<u32, Vec<Match>>;

/// Bracket format. Stored only; no generation algorithm acts on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BracketType {
    SingleElimination,
    DoubleElimination,
    RoundRobin,
}

/// Tournament lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TournamentStatus {
    Upcoming,
    Active,
    Completed,
    Cancelled,
}

/// Team status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TeamStatus {
    Registered,
    Withdrawn,
    Disqualified,
}

/// Match lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
}

impl BracketType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BracketType::SingleElimination => "single_elimination",
            BracketType::DoubleElimination => "double_elimination",
            BracketType::RoundRobin => "round_robin",
        }
    }
}

impl TournamentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TournamentStatus::Upcoming => "upcoming",
            TournamentStatus::Active => "active",
            TournamentStatus::Completed => "completed",
            TournamentStatus::Cancelled => "cancelled",
        }
    }
}

impl TeamStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TeamStatus::Registered => "registered",
            TeamStatus::Withdrawn => "withdrawn",
            TeamStatus::Disqualified => "disqualified",
        }
    }
}

impl MatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::Scheduled => "scheduled",
            MatchStatus::InProgress => "in_progress",
            MatchStatus::Completed => "completed",
            MatchStatus::Cancelled => "cancelled",
        }
    }

    /// `completed` and `cancelled` admit no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, MatchStatus::Completed | MatchStatus::Cancelled)
    }
}

macro_rules! impl_status_text {
    ($ty:ty, $label:literal, [$($variant:expr),+ $(,)?]) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = TournamentError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                [$($variant),+]
                    .into_iter()
                    .find(|v| v.as_str() == s)
                    .ok_or_else(|| TournamentError::InvalidInput(format!("unknown {} '{}'", $label, s)))
            }
        }
    };
}

impl_status_text!(
    BracketType,
    "bracket type",
    [
        BracketType::SingleElimination,
        BracketType::DoubleElimination,
        BracketType::RoundRobin,
    ]
);
impl_status_text!(
    TournamentStatus,
    "tournament status",
    [
        TournamentStatus::Upcoming,
        TournamentStatus::Active,
        TournamentStatus::Completed,
        TournamentStatus::Cancelled,
    ]
);
impl_status_text!(
    TeamStatus,
    "team status",
    [
        TeamStatus::Registered,
        TeamStatus::Withdrawn,
        TeamStatus::Disqualified,
    ]
);
impl_status_text!(
    MatchStatus,
    "match status",
    [
        MatchStatus::Scheduled,
        MatchStatus::InProgress,
        MatchStatus::Completed,
        MatchStatus::Cancelled,
    ]
);

/// Tournament record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tournament {
    pub id: TournamentId,
    pub name: String,
    pub game_id: Uuid,
    pub organizer_id: UserId,
    pub bracket_type: BracketType,
    /// Capacity limit
    pub max_teams: u32,
    /// Count of non-withdrawn teams; never exceeds `max_teams`
    pub current_teams: u32,
    /// Prize pool in minor currency units
    pub prize_pool_cents: i64,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub status: TournamentStatus,
    pub rules: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Tournament {
    /// Build a fresh `upcoming` tournament from a validated command
    pub fn create(request: NewTournament, organizer_id: UserId, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: request.name.trim().to_string(),
            game_id: request.game_id,
            organizer_id,
            bracket_type: request.bracket_type,
            max_teams: request.max_teams,
            current_teams: 0,
            prize_pool_cents: request.prize_pool_cents,
            start_date: request.start_date,
            end_date: request.end_date,
            status: TournamentStatus::Upcoming,
            rules: request.rules,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_full(&self) -> bool {
        self.current_teams >= self.max_teams
    }

    /// Check the capacity invariant `0 <= current_teams <= max_teams`
    pub fn check_capacity(&self) -> TournamentResult<()> {
        if self.current_teams > self.max_teams {
            return Err(TournamentError::InvalidInput(format!(
                "current_teams {} exceeds max_teams {}",
                self.current_teams, self.max_teams
            )));
        }
        Ok(())
    }
}

/// Team record. Belongs to exactly one tournament for its lifetime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub id: TeamId,
    pub tournament_id: TournamentId,
    pub name: String,
    pub captain_id: UserId,
    pub members: Vec<UserId>,
    /// 1-based registration order
    pub seed: u32,
    pub status: TeamStatus,
    pub created_at: DateTime<Utc>,
}

/// Match record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub id: MatchId,
    pub tournament_id: TournamentId,
    pub round: u32,
    pub match_number: u32,
    /// Either slot may be empty (bye or not yet determined)
    pub team1_id: Option<TeamId>,
    pub team2_id: Option<TeamId>,
    pub winner_id: Option<TeamId>,
    pub score: Option<String>,
    pub status: MatchStatus,
    pub scheduled_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Match {
    /// Whether `team_id` occupies one of the two slots
    pub fn has_team(&self, team_id: TeamId) -> bool {
        self.team1_id == Some(team_id) || self.team2_id == Some(team_id)
    }

    /// Describe the first broken consistency rule, if any
    pub fn invariant_violation(&self) -> Option<&'static str> {
        if self.round == 0 {
            return Some("round must be at least 1");
        }
        if let Some(winner) = self.winner_id
            && !self.has_team(winner)
        {
            return Some("winner is not one of the match teams");
        }
        if self.status == MatchStatus::Completed && self.winner_id.is_none() {
            return Some("completed match has no winner");
        }
        if self.status == MatchStatus::InProgress && self.started_at.is_none() {
            return Some("in-progress match has no start time");
        }
        if let (Some(started), Some(completed)) = (self.started_at, self.completed_at)
            && completed < started
        {
            return Some("match completed before it started");
        }
        None
    }
}

/// Create-tournament command
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTournament {
    pub name: String,
    pub game_id: Uuid,
    pub bracket_type: BracketType,
    pub max_teams: u32,
    #[serde(default)]
    pub prize_pool_cents: i64,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    #[serde(default)]
    pub rules: String,
}

impl NewTournament {
    pub fn validate(&self) -> TournamentResult<()> {
        validate_fields(
            &self.name,
            self.max_teams,
            self.prize_pool_cents,
            self.start_date,
            self.end_date,
        )
    }
}

/// Administrative update; replaces every editable field
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TournamentUpdate {
    pub name: String,
    pub bracket_type: BracketType,
    pub max_teams: u32,
    #[serde(default)]
    pub prize_pool_cents: i64,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    #[serde(default)]
    pub rules: String,
    #[serde(default)]
    pub status: Option<TournamentStatus>,
}

impl TournamentUpdate {
    pub fn validate(&self) -> TournamentResult<()> {
        validate_fields(
            &self.name,
            self.max_teams,
            self.prize_pool_cents,
            self.start_date,
            self.end_date,
        )
    }

    /// Produce the updated record. Capacity may not shrink below the
    /// number of teams already registered.
    pub fn apply(&self, current: &Tournament, now: DateTime<Utc>) -> TournamentResult<Tournament> {
        if self.max_teams < current.current_teams {
            return Err(TournamentError::InvalidInput(format!(
                "max_teams {} is below the {} teams already registered",
                self.max_teams, current.current_teams
            )));
        }

        let mut next = current.clone();
        next.name = self.name.trim().to_string();
        next.bracket_type = self.bracket_type;
        next.max_teams = self.max_teams;
        next.prize_pool_cents = self.prize_pool_cents;
        next.start_date = self.start_date;
        next.end_date = self.end_date;
        next.rules = self.rules.clone();
        if let Some(status) = self.status {
            next.status = status;
        }
        next.updated_at = now;
        Ok(next)
    }
}

fn validate_fields(
    name: &str,
    max_teams: u32,
    prize_pool_cents: i64,
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
) -> TournamentResult<()> {
    if name.trim().is_empty() {
        return Err(TournamentError::InvalidInput("name must not be empty".into()));
    }
    if max_teams == 0 {
        return Err(TournamentError::InvalidInput("max_teams must be at least 1".into()));
    }
    if prize_pool_cents < 0 {
        return Err(TournamentError::InvalidInput("prize pool must not be negative".into()));
    }
    if end_date < start_date {
        return Err(TournamentError::InvalidInput("end date precedes start date".into()));
    }
    Ok(())
}

/// Team registration command. The captain comes from the caller identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterTeam {
    pub name: String,
    #[serde(default)]
    pub members: Vec<UserId>,
}

/// Create-match command
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMatch {
    pub round: u32,
    pub match_number: u32,
    #[serde(default)]
    pub team1_id: Option<TeamId>,
    #[serde(default)]
    pub team2_id: Option<TeamId>,
    #[serde(default)]
    pub scheduled_at: Option<DateTime<Utc>>,
}

impl NewMatch {
    pub fn validate(&self) -> TournamentResult<()> {
        if self.round == 0 {
            return Err(TournamentError::InvalidInput("round must be at least 1".into()));
        }
        if self.match_number == 0 {
            return Err(TournamentError::InvalidInput(
                "match number must be at least 1".into(),
            ));
        }
        if let (Some(a), Some(b)) = (self.team1_id, self.team2_id)
            && a == b
        {
            return Err(TournamentError::InvalidInput(
                "a team cannot play against itself".into(),
            ));
        }
        Ok(())
    }

    /// Build a `scheduled` match owned by `tournament_id`
    pub fn into_match(self, tournament_id: TournamentId, now: DateTime<Utc>) -> Match {
        Match {
            id: Uuid::new_v4(),
            tournament_id,
            round: self.round,
            match_number: self.match_number,
            team1_id: self.team1_id,
            team2_id: self.team2_id,
            winner_id: None,
            score: None,
            status: MatchStatus::Scheduled,
            scheduled_at: self.scheduled_at.unwrap_or(now),
            started_at: None,
            completed_at: None,
        }
    }
}

/// Match update command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchUpdate {
    pub status: MatchStatus,
    #[serde(default)]
    pub winner_id: Option<TeamId>,
    #[serde(default)]
    pub score: Option<String>,
}

impl MatchUpdate {
    pub fn new(status: MatchStatus) -> Self {
        Self {
            status,
            winner_id: None,
            score: None,
        }
    }

    pub fn with_winner(mut self, winner_id: TeamId) -> Self {
        self.winner_id = Some(winner_id);
        self
    }

    pub fn with_score(mut self, score: impl Into<String>) -> Self {
        self.score = Some(score.into());
        self
    }
}

/// Typed filter for listing tournaments
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TournamentFilter {
    #[serde(default)]
    pub status: Option<TournamentStatus>,
    #[serde(default)]
    pub game_id: Option<Uuid>,
}

impl TournamentFilter {
    pub fn matches(&self, tournament: &Tournament) -> bool {
        self.status.is_none_or(|s| s == tournament.status)
            && self.game_id.is_none_or(|g| g == tournament.game_id)
    }
}

/// Group matches by round, ordering each round by match number
pub fn group_by_round(matches: impl IntoIterator<Item = Match>) -> Bracket {
    let mut bracket = Bracket::new();
    for m in matches {
        bracket.entry(m.round).or_default().push(m);
    }
    for round in bracket.values_mut() {
        round.sort_by_key(|m| m.match_number);
    }
    bracket
}
