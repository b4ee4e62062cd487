//! # swisscut-core
//!
//! This crate contains the types and algorithms to run a tournament consisting of a Swiss stage
//! followed by a single elimination top cut. It performs no I/O, all functions operate on
//! records loaded by the caller.
//!
//! Important types:
//! - [`Match`]: A match between two participants or a bye. Shared by both stages.
//! - [`Standings`]: The ranked performance table computed from settled matches.
//! - [`swiss::pair_round`]: Pairs a single Swiss round.
//! - [`seeding::seed_bracket`]: Seeds the first top cut round from the Swiss ranking.
//! - [`bracket::Advance`]: Builds the next top cut round from a completed one.
//!
//! ## Feature Flags
//!
//! `serde`: Adds `Serialize` and `Deserialize` impls to all records.
//!
pub mod bracket;
pub mod seeding;
pub mod standings;
pub mod swiss;

mod id;
mod matches;
mod tournament;

pub use id::{MatchId, ParticipantId, RoundId, TournamentId};
pub use matches::{Match, MatchKey, MatchKind, MatchStatus, Metadata, Slot, Stage};
pub use standings::{Standing, Standings};
pub use tournament::{Participant, Progress, Round, RoundStatus, Tournament, TournamentConfig};

use thiserror::Error;

use std::result;

/// An `Result<T>` using [`enum@Error`] as an error type.
pub type Result<T> = result::Result<T, Error>;

/// The category of an [`enum@Error`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request cannot be served in the current state. Nothing was written.
    Precondition,
    /// The stored records contradict each other. Nothing was written.
    Inconsistency,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("tournament {0} not found")]
    TournamentNotFound(TournamentId),
    #[error("match {0} not found")]
    MatchNotFound(MatchId),
    #[error("participant {0} not found")]
    ParticipantNotFound(ParticipantId),
    #[error("round {round} is out of range: the swiss stage has {max} rounds")]
    RoundOutOfRange { round: u32, max: u32 },
    #[error("{stage} round {round} has already been generated")]
    RoundAlreadyGenerated { stage: Stage, round: u32 },
    #[error("swiss round {round} has not been generated yet")]
    PreviousRoundMissing { round: u32 },
    #[error("swiss round {round} is incomplete: {pending} matches are pending")]
    PreviousRoundIncomplete { round: u32, pending: usize },
    #[error("fewer than two active participants: found {found}")]
    NotEnoughParticipants { found: usize },
    #[error("invalid cut size {0}: expected one of 4, 8, 12, 16, 24, 32, 48 or 64")]
    InvalidCutSize(u32),
    #[error("the swiss stage is incomplete: {pending} matches are pending")]
    SwissIncomplete { pending: usize },
    #[error("the swiss stage is closed: the top cut has already started")]
    SwissStageClosed,
    #[error("the top cut has not started yet")]
    TopCutNotStarted,
    #[error("the bracket is complete: the finals have already been generated")]
    BracketComplete,
    #[error("bracket round {round} is incomplete: {pending} matches are pending")]
    RoundIncomplete { round: u32, pending: usize },
    #[error("match {0} is not part of the top cut")]
    NotBracketMatch(MatchId),
    #[error("match {0} is a bye and takes no result")]
    ByeHasNoResult(MatchId),
    #[error("match {0} is part of the top cut and cannot end in a draw")]
    DrawNotAllowed(MatchId),
    #[error("match {match_number} of bracket round {round} is already settled")]
    SuccessorSettled { round: u32, match_number: u32 },
    #[error("bracket round {round} has no matches")]
    MissingRound { round: u32 },
    #[error("match {match_number} of bracket round {round} is missing")]
    MissingMatch { round: u32, match_number: u32 },
    #[error("match {match_number} does not fit into bracket round {round}")]
    UnexpectedMatch { round: u32, match_number: u32 },
    #[error("match {match_number} of bracket round {round} is complete without a winner")]
    UndecidedMatch { round: u32, match_number: u32 },
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingRound { .. }
            | Self::MissingMatch { .. }
            | Self::UnexpectedMatch { .. }
            | Self::UndecidedMatch { .. } => ErrorKind::Inconsistency,
            _ => ErrorKind::Precondition,
        }
    }
}
