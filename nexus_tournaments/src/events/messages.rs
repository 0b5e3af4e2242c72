//! Domain events fanned out to observers.

use serde::{Deserialize, Serialize};

use crate::tournament::{
    Match, MatchId, MatchStatus, Team, TeamId, Tournament, TournamentId,
};

/// Committed state change, serialized with a `type` tag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    TournamentCreated {
        tournament: Tournament,
    },
    TournamentUpdated {
        tournament_id: TournamentId,
        tournament: Tournament,
    },
    TournamentDeleted {
        tournament_id: TournamentId,
    },
    TeamRegistered {
        tournament_id: TournamentId,
        team_id: TeamId,
        team_name: String,
    },
    MatchCreated {
        match_id: MatchId,
        tournament_id: TournamentId,
        round: u32,
        match_number: u32,
    },
    MatchUpdated {
        match_id: MatchId,
        tournament_id: TournamentId,
        status: MatchStatus,
        winner: Option<TeamId>,
        score: Option<String>,
    },
}

impl DomainEvent {
    pub fn team_registered(team: &Team) -> Self {
        DomainEvent::TeamRegistered {
            tournament_id: team.tournament_id,
            team_id: team.id,
            team_name: team.name.clone(),
        }
    }

    pub fn match_created(m: &Match) -> Self {
        DomainEvent::MatchCreated {
            match_id: m.id,
            tournament_id: m.tournament_id,
            round: m.round,
            match_number: m.match_number,
        }
    }

    pub fn match_updated(m: &Match) -> Self {
        DomainEvent::MatchUpdated {
            match_id: m.id,
            tournament_id: m.tournament_id,
            status: m.status,
            winner: m.winner_id,
            score: m.score.clone(),
        }
    }

    /// Tournament the event belongs to
    pub fn tournament_id(&self) -> TournamentId {
        match self {
            DomainEvent::TournamentCreated { tournament } => tournament.id,
            DomainEvent::TournamentUpdated { tournament_id, .. }
            | DomainEvent::TournamentDeleted { tournament_id }
            | DomainEvent::TeamRegistered { tournament_id, .. }
            | DomainEvent::MatchCreated { tournament_id, .. }
            | DomainEvent::MatchUpdated { tournament_id, .. } => *tournament_id,
        }
    }

    /// Wire name of the event, as found in the `type` field
    pub fn event_type(&self) -> &'static str {
        match self {
            DomainEvent::TournamentCreated { .. } => "tournament_created",
            DomainEvent::TournamentUpdated { .. } => "tournament_updated",
            DomainEvent::TournamentDeleted { .. } => "tournament_deleted",
            DomainEvent::TeamRegistered { .. } => "team_registered",
            DomainEvent::MatchCreated { .. } => "match_created",
            DomainEvent::MatchUpdated { .. } => "match_updated",
        }
    }

    /// Whether lobby observers also receive this event
    pub fn is_lobby_event(&self) -> bool {
        matches!(
            self,
            DomainEvent::TournamentCreated { .. }
                | DomainEvent::TournamentUpdated { .. }
                | DomainEvent::TournamentDeleted { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_match_updated_wire_format() {
        let event = DomainEvent::MatchUpdated {
            match_id: Uuid::nil(),
            tournament_id: Uuid::nil(),
            status: MatchStatus::Completed,
            winner: Some(Uuid::nil()),
            score: Some("2-1".to_string()),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "match_updated");
        assert_eq!(json["status"], "completed");
        assert_eq!(json["score"], "2-1");
        assert_eq!(event.event_type(), "match_updated");
    }

    #[test]
    fn test_lobby_events() {
        let id = Uuid::new_v4();
        assert!(DomainEvent::TournamentDeleted { tournament_id: id }.is_lobby_event());
        let registered = DomainEvent::TeamRegistered {
            tournament_id: id,
            team_id: Uuid::new_v4(),
            team_name: "Owls".to_string(),
        };
        assert!(!registered.is_lobby_event());
        assert_eq!(registered.tournament_id(), id);
    }

    #[test]
    fn test_event_deserializes_from_tag() {
        let id = Uuid::new_v4();
        let json = format!(r#"{{"type":"tournament_deleted","tournament_id":"{id}"}}"#);
        let event: DomainEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(event, DomainEvent::TournamentDeleted { tournament_id: id });
    }
}
