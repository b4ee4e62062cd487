use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};

use crate::{Error, MatchId, ParticipantId, Result, RoundId, TournamentId};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Opaque bookkeeping attached to a match (judges, streams, sessions). Never read by the engine.
pub type Metadata = BTreeMap<String, String>;

/// The stage of the tournament a match belongs to.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Stage {
    Swiss,
    TopCut,
}

impl Stage {
    #[inline]
    pub const fn to_u8(self) -> u8 {
        match self {
            Self::Swiss => 0,
            Self::TopCut => 1,
        }
    }

    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Swiss),
            1 => Some(Self::TopCut),
            _ => None,
        }
    }
}

impl Display for Stage {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Swiss => f.write_str("swiss"),
            Self::TopCut => f.write_str("top cut"),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum MatchStatus {
    Pending,
    Complete,
    Draw,
}

impl MatchStatus {
    /// Returns `true` if the match needs no further result.
    #[inline]
    pub const fn is_settled(self) -> bool {
        !matches!(self, Self::Pending)
    }

    #[inline]
    pub const fn to_u8(self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Complete => 1,
            Self::Draw => 2,
        }
    }

    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Pending),
            1 => Some(Self::Complete),
            2 => Some(Self::Draw),
            _ => None,
        }
    }
}

/// What a match represents within its round.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum MatchKind {
    Standard,
    /// A participant advanced without an opponent.
    Bye,
    GrandFinal,
    ThirdPlace,
}

impl MatchKind {
    #[inline]
    pub const fn to_u8(self) -> u8 {
        match self {
            Self::Standard => 0,
            Self::Bye => 1,
            Self::GrandFinal => 2,
            Self::ThirdPlace => 3,
        }
    }

    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Standard),
            1 => Some(Self::Bye),
            2 => Some(Self::GrandFinal),
            3 => Some(Self::ThirdPlace),
            _ => None,
        }
    }

    /// Returns `true` for the matches of the last bracket round.
    #[inline]
    pub const fn is_final(self) -> bool {
        matches!(self, Self::GrandFinal | Self::ThirdPlace)
    }
}

/// One of the two participant spots of a [`Match`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Slot {
    A,
    B,
}

impl Slot {
    /// Returns the slot a match feeds in the following bracket round. Odd match numbers feed
    /// slot A, even ones slot B.
    #[inline]
    pub const fn for_match_number(match_number: u32) -> Self {
        if match_number % 2 == 1 {
            Self::A
        } else {
            Self::B
        }
    }
}

/// The identity of a match. No two matches may share the same key.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MatchKey {
    pub tournament_id: TournamentId,
    pub stage: Stage,
    pub round: u32,
    pub match_number: u32,
}

impl MatchKey {
    #[inline]
    pub const fn new(
        tournament_id: TournamentId,
        stage: Stage,
        round: u32,
        match_number: u32,
    ) -> Self {
        Self {
            tournament_id,
            stage,
            round,
            match_number,
        }
    }
}

/// A match between two participants, or a bye for a single one.
///
/// `round` is the Swiss round number for [`Stage::Swiss`] and the bracket round for
/// [`Stage::TopCut`]. `match_number` starts at 1 within each round.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Match {
    pub id: MatchId,
    pub tournament_id: TournamentId,
    pub stage: Stage,
    pub round: u32,
    pub match_number: u32,
    /// The Swiss round record this match belongs to.
    pub round_id: Option<RoundId>,
    pub kind: MatchKind,
    pub participant_a: ParticipantId,
    pub participant_b: Option<ParticipantId>,
    pub score_a: u32,
    pub score_b: u32,
    pub target_points: u32,
    pub status: MatchStatus,
    pub winner: Option<ParticipantId>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub metadata: Metadata,
}

impl Match {
    /// Creates a new pending match. The id is assigned once the match is stored.
    pub fn new(
        key: MatchKey,
        kind: MatchKind,
        participant_a: ParticipantId,
        participant_b: Option<ParticipantId>,
        target_points: u32,
    ) -> Self {
        Self {
            id: MatchId(0),
            tournament_id: key.tournament_id,
            stage: key.stage,
            round: key.round,
            match_number: key.match_number,
            round_id: None,
            kind,
            participant_a,
            participant_b,
            score_a: 0,
            score_b: 0,
            target_points,
            status: MatchStatus::Pending,
            winner: None,
            metadata: Metadata::new(),
        }
    }

    /// Creates a match that `participant` wins without an opponent, scored `target` to
    /// `target - 1`.
    pub fn bye(
        key: MatchKey,
        kind: MatchKind,
        participant: ParticipantId,
        target_points: u32,
    ) -> Self {
        let mut this = Self::new(key, kind, participant, None, target_points);
        this.walkover(Slot::A);
        this
    }

    #[inline]
    pub fn key(&self) -> MatchKey {
        MatchKey::new(self.tournament_id, self.stage, self.round, self.match_number)
    }

    /// Returns `true` if the match has no second participant.
    #[inline]
    pub fn is_bye(&self) -> bool {
        self.participant_b.is_none()
    }

    #[inline]
    pub fn is_settled(&self) -> bool {
        self.status.is_settled()
    }

    #[inline]
    pub fn get(&self, slot: Slot) -> Option<ParticipantId> {
        match slot {
            Slot::A => Some(self.participant_a),
            Slot::B => self.participant_b,
        }
    }

    /// Returns the slot `participant` occupies in this match.
    pub fn slot_of(&self, participant: ParticipantId) -> Option<Slot> {
        if self.participant_a == participant {
            Some(Slot::A)
        } else if self.participant_b == Some(participant) {
            Some(Slot::B)
        } else {
            None
        }
    }

    #[inline]
    pub fn involves(&self, participant: ParticipantId) -> bool {
        self.slot_of(participant).is_some()
    }

    /// Returns the participant that lost the match. Byes and undecided matches have no loser.
    pub fn loser(&self) -> Option<ParticipantId> {
        let winner = self.winner?;
        let b = self.participant_b?;

        if winner == self.participant_a {
            Some(b)
        } else {
            Some(self.participant_a)
        }
    }

    /// Records a played result. The higher score wins, equal scores are a draw.
    ///
    /// # Errors
    ///
    /// Returns an [`enum@Error`] if the match is a bye or if the scores are equal in a
    /// [`Stage::TopCut`] match.
    pub fn record(&mut self, score_a: u32, score_b: u32) -> Result<()> {
        let Some(participant_b) = self.participant_b else {
            return Err(Error::ByeHasNoResult(self.id));
        };

        let (status, winner) = match score_a.cmp(&score_b) {
            std::cmp::Ordering::Greater => (MatchStatus::Complete, Some(self.participant_a)),
            std::cmp::Ordering::Less => (MatchStatus::Complete, Some(participant_b)),
            std::cmp::Ordering::Equal => {
                if self.stage == Stage::TopCut {
                    return Err(Error::DrawNotAllowed(self.id));
                }

                (MatchStatus::Draw, None)
            }
        };

        self.score_a = score_a;
        self.score_b = score_b;
        self.status = status;
        self.winner = winner;
        Ok(())
    }

    /// Completes the match in favor of `winner` by `target` to `target - 1`.
    pub fn walkover(&mut self, winner: Slot) {
        let high = self.target_points;
        let low = self.target_points.saturating_sub(1);

        let (score_a, score_b) = match winner {
            Slot::A => (high, low),
            Slot::B => (low, high),
        };

        self.score_a = score_a;
        self.score_b = score_b;
        self.status = MatchStatus::Complete;
        self.winner = self.get(winner);
    }

    /// Completes the match with a 0-0 score when neither side can play.
    pub fn double_forfeit(&mut self, winner: Slot) {
        self.score_a = 0;
        self.score_b = 0;
        self.status = MatchStatus::Complete;
        self.winner = self.get(winner);
    }
}
