use std::collections::{BTreeMap, HashMap};

use parking_lot::Mutex;
use swisscut_core::{
    Match, MatchId, MatchKey, Participant, ParticipantId, Round, RoundId, RoundStatus, Stage,
    Tournament, TournamentId,
};

use super::{id, Generated, Generation, Store, StoreError};

/// A [`Store`] keeping all records in memory. Used in tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    tournaments: HashMap<TournamentId, Tournament>,
    participants: BTreeMap<ParticipantId, Participant>,
    rounds: BTreeMap<RoundId, Round>,
    matches: BTreeMap<MatchId, Match>,
}

impl MemoryStore {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_tournament(&self, tournament: Tournament) {
        self.inner
            .lock()
            .tournaments
            .insert(tournament.id, tournament);
    }

    pub fn insert_participant(&self, participant: Participant) {
        self.inner
            .lock()
            .participants
            .insert(participant.id, participant);
    }
}

impl Store for MemoryStore {
    async fn get_tournament(&self, id: TournamentId) -> Result<Option<Tournament>, StoreError> {
        Ok(self.inner.lock().tournaments.get(&id).cloned())
    }

    async fn get_participants(
        &self,
        tournament_id: TournamentId,
    ) -> Result<Vec<Participant>, StoreError> {
        let inner = self.inner.lock();

        Ok(inner
            .participants
            .values()
            .filter(|p| p.tournament_id == tournament_id)
            .cloned()
            .collect())
    }

    async fn get_participant(&self, id: ParticipantId) -> Result<Option<Participant>, StoreError> {
        Ok(self.inner.lock().participants.get(&id).cloned())
    }

    async fn drop_participant(&self, id: ParticipantId) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();

        match inner.participants.get_mut(&id) {
            Some(participant) => {
                participant.dropped = true;
                Ok(())
            }
            None => Err(StoreError::NotFound("participant")),
        }
    }

    async fn get_matches(
        &self,
        tournament_id: TournamentId,
        stage: Stage,
    ) -> Result<Vec<Match>, StoreError> {
        let inner = self.inner.lock();

        let mut matches: Vec<Match> = inner
            .matches
            .values()
            .filter(|m| m.tournament_id == tournament_id && m.stage == stage)
            .cloned()
            .collect();

        matches.sort_unstable_by_key(|m| (m.round, m.match_number));
        Ok(matches)
    }

    async fn get_match(&self, id: MatchId) -> Result<Option<Match>, StoreError> {
        Ok(self.inner.lock().matches.get(&id).cloned())
    }

    async fn find_match(&self, key: MatchKey) -> Result<Option<Match>, StoreError> {
        let inner = self.inner.lock();

        Ok(inner.matches.values().find(|m| m.key() == key).cloned())
    }

    async fn update_match(&self, r#match: &Match) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();

        match inner.matches.get_mut(&r#match.id) {
            Some(stored) => {
                *stored = r#match.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound("match")),
        }
    }

    async fn get_round(
        &self,
        tournament_id: TournamentId,
        round_number: u32,
    ) -> Result<Option<Round>, StoreError> {
        let inner = self.inner.lock();

        Ok(inner
            .rounds
            .values()
            .find(|r| r.tournament_id == tournament_id && r.round_number == round_number)
            .cloned())
    }

    async fn complete_round(&self, id: RoundId) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();

        match inner.rounds.get_mut(&id) {
            Some(round) => {
                round.status = RoundStatus::Complete;
                Ok(())
            }
            None => Err(StoreError::NotFound("round")),
        }
    }

    async fn insert_generation(&self, generation: Generation) -> Result<Generated, StoreError> {
        let mut inner = self.inner.lock();

        let Some(tournament) = inner.tournaments.get(&generation.tournament_id) else {
            return Err(StoreError::NotFound("tournament"));
        };

        if tournament.progress != generation.expected {
            return Err(StoreError::Conflict);
        }

        let exists = inner.matches.values().any(|m| {
            m.tournament_id == generation.tournament_id
                && m.stage == generation.stage
                && m.round == generation.round
        });

        let round_exists = generation.swiss_round.as_ref().map_or(false, |round| {
            inner.rounds.values().any(|r| {
                r.tournament_id == round.tournament_id && r.round_number == round.round_number
            })
        });

        if exists || round_exists {
            return Err(StoreError::Conflict);
        }

        let swiss_round = generation.swiss_round.map(|mut round| {
            round.id = RoundId(id::ROUND.generate());
            inner.rounds.insert(round.id, round.clone());
            round
        });

        let mut matches = Vec::with_capacity(generation.matches.len());
        for mut r#match in generation.matches {
            r#match.id = MatchId(id::MATCH.generate());
            r#match.round_id = swiss_round.as_ref().map(|round| round.id);

            inner.matches.insert(r#match.id, r#match.clone());
            matches.push(r#match);
        }

        if let Some(tournament) = inner.tournaments.get_mut(&generation.tournament_id) {
            tournament.progress = generation.progress;
        }

        Ok(Generated {
            swiss_round,
            matches,
        })
    }
}
