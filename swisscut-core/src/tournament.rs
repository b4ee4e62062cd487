use crate::{ParticipantId, RoundId, Stage, TournamentId};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A registered participant. Owned by the registration system, the engine only flips `dropped`.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Participant {
    pub id: ParticipantId,
    pub tournament_id: TournamentId,
    pub name: String,
    pub dropped: bool,
    pub checked_in: bool,
    pub user_id: Option<u64>,
}

impl Participant {
    /// Returns `true` if the participant takes part in new pairings.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.checked_in && !self.dropped
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum RoundStatus {
    Active,
    Complete,
}

impl RoundStatus {
    #[inline]
    pub const fn to_u8(self) -> u8 {
        match self {
            Self::Active => 0,
            Self::Complete => 1,
        }
    }

    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Active),
            1 => Some(Self::Complete),
            _ => None,
        }
    }
}

/// A Swiss round.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Round {
    pub id: RoundId,
    pub tournament_id: TournamentId,
    pub round_number: u32,
    pub status: RoundStatus,
}

impl Round {
    #[inline]
    pub fn new(tournament_id: TournamentId, round_number: u32) -> Self {
        Self {
            id: RoundId(0),
            tournament_id,
            round_number,
            status: RoundStatus::Active,
        }
    }
}

/// The settings of a tournament that drive pairing and bracket generation.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TournamentConfig {
    /// Points required to win a regular match.
    pub match_target_points: u32,
    /// Points required to win the grand final.
    pub final_target_points: u32,
    pub swiss_rounds: u32,
    pub cut_size: u32,
}

impl Default for TournamentConfig {
    fn default() -> Self {
        Self {
            match_target_points: 4,
            final_target_points: 7,
            swiss_rounds: 5,
            cut_size: 8,
        }
    }
}

/// The most recently generated round of a tournament.
///
/// Updated in the same write as the matches of that round, so it can be used to detect
/// concurrent generations.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Progress {
    /// `None` until the first round is generated.
    pub stage: Option<Stage>,
    pub round: u32,
    /// The cut size the top cut was started with.
    pub cut_size: Option<u32>,
}

impl Progress {
    #[inline]
    pub const fn swiss(round: u32) -> Self {
        Self {
            stage: Some(Stage::Swiss),
            round,
            cut_size: None,
        }
    }

    #[inline]
    pub const fn top_cut(round: u32, cut_size: u32) -> Self {
        Self {
            stage: Some(Stage::TopCut),
            round,
            cut_size: Some(cut_size),
        }
    }

    #[inline]
    pub fn is_top_cut(&self) -> bool {
        self.stage == Some(Stage::TopCut)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Tournament {
    pub id: TournamentId,
    pub config: TournamentConfig,
    pub progress: Progress,
}

impl Tournament {
    #[inline]
    pub fn new(id: TournamentId, config: TournamentConfig) -> Self {
        Self {
            id,
            config,
            progress: Progress::default(),
        }
    }
}
