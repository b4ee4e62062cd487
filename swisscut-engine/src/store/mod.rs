//! Persistence of tournaments, participants, rounds and matches.
//!
//! The engine keeps no state between calls, every decision is made from the records returned
//! by a [`Store`].
mod id;
mod memory;
mod mysql;

pub use memory::MemoryStore;
pub use mysql::MySqlStore;

use swisscut_core::{
    Match, MatchId, MatchKey, Participant, ParticipantId, Progress, Round, RoundId, Stage,
    Tournament, TournamentId,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("{0}")]
    Json(#[from] serde_json::Error),
    /// A concurrent write got there first. Nothing was written.
    #[error("conflicting write")]
    Conflict,
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("corrupt record: invalid {0}")]
    Corrupt(&'static str),
}

/// A batch of rows created by generating a single round.
#[derive(Clone, Debug)]
pub struct Generation {
    pub tournament_id: TournamentId,
    pub stage: Stage,
    pub round: u32,
    /// The Swiss round record the matches are attached to. `None` for the top cut.
    pub swiss_round: Option<Round>,
    pub matches: Vec<Match>,
    /// The progress of the tournament the batch was computed from.
    pub expected: Progress,
    /// The progress of the tournament after the batch was written.
    pub progress: Progress,
}

/// The stored rows of a [`Generation`], with their ids assigned.
#[derive(Clone, Debug, Default)]
pub struct Generated {
    pub swiss_round: Option<Round>,
    pub matches: Vec<Match>,
}

/// A persistent store.
///
/// Participant and tournament rows are owned by the registration system; the engine only reads
/// them and flips `dropped` / the tournament progress.
#[allow(async_fn_in_trait)]
pub trait Store {
    async fn get_tournament(&self, id: TournamentId) -> Result<Option<Tournament>, StoreError>;

    async fn get_participants(
        &self,
        tournament_id: TournamentId,
    ) -> Result<Vec<Participant>, StoreError>;

    async fn get_participant(&self, id: ParticipantId) -> Result<Option<Participant>, StoreError>;

    /// Marks the participant as dropped. Dropping is permanent.
    async fn drop_participant(&self, id: ParticipantId) -> Result<(), StoreError>;

    /// Returns all matches of `stage`, ordered by round and match number.
    async fn get_matches(
        &self,
        tournament_id: TournamentId,
        stage: Stage,
    ) -> Result<Vec<Match>, StoreError>;

    async fn get_match(&self, id: MatchId) -> Result<Option<Match>, StoreError>;

    async fn find_match(&self, key: MatchKey) -> Result<Option<Match>, StoreError>;

    /// Overwrites the participants, scores, status, winner, kind and metadata of a match.
    async fn update_match(&self, r#match: &Match) -> Result<(), StoreError>;

    async fn get_round(
        &self,
        tournament_id: TournamentId,
        round_number: u32,
    ) -> Result<Option<Round>, StoreError>;

    async fn complete_round(&self, id: RoundId) -> Result<(), StoreError>;

    /// Atomically writes a generated round.
    ///
    /// Returns [`StoreError::Conflict`] without writing anything if the stored progress of the
    /// tournament differs from `generation.expected` or if any match of
    /// `(tournament, stage, round)` already exists.
    async fn insert_generation(&self, generation: Generation) -> Result<Generated, StoreError>;
}
