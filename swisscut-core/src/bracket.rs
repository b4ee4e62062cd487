//! Advancement of the single elimination top cut.
//!
//! Round `r` of a bracket with `size` slots has `size >> r` match positions. Positions `2i - 1`
//! and `2i` of a round feed position `i` of the following round. The round after the
//! semifinals is the finals round: it holds the grand final as match 1 and the third place
//! decider as match 2.
use crate::{Error, Match, MatchKey, MatchKind, ParticipantId, Result, Slot, Stage, TournamentId};

/// Returns the number of match positions in `round` of a bracket with `bracket_size` slots.
#[inline]
pub const fn ideal_matches(bracket_size: u32, round: u32) -> u32 {
    bracket_size >> round
}

/// Returns the round number of the finals round of a bracket with `bracket_size` slots.
#[inline]
pub const fn finals_round(bracket_size: u32) -> u32 {
    bracket_size.trailing_zeros()
}

/// The settings required to build the next bracket round.
#[derive(Copy, Clone, Debug)]
pub struct Advance {
    pub tournament_id: TournamentId,
    pub bracket_size: u32,
    /// The round that was just completed.
    pub round: u32,
    pub target_points: u32,
    pub final_target_points: u32,
}

impl Advance {
    /// Builds the round following `self.round` from its matches.
    ///
    /// # Errors
    ///
    /// Returns an [`enum@Error`] if the round is already the finals round, if any of its
    /// matches is still pending or without a winner, or if `current` does not look like a
    /// round of this bracket.
    pub fn next_round(&self, current: &[Match]) -> Result<Vec<Match>> {
        let finals = finals_round(self.bracket_size);
        if self.round >= finals {
            return Err(Error::BracketComplete);
        }

        let ideal = ideal_matches(self.bracket_size, self.round);

        if current.is_empty() {
            return Err(Error::MissingRound { round: self.round });
        }

        for r#match in current {
            if r#match.match_number == 0 || r#match.match_number > ideal {
                return Err(Error::UnexpectedMatch {
                    round: self.round,
                    match_number: r#match.match_number,
                });
            }
        }

        let pending = current.iter().filter(|m| !m.is_settled()).count();
        if pending > 0 {
            return Err(Error::RoundIncomplete {
                round: self.round,
                pending,
            });
        }

        if let Some(r#match) = current.iter().find(|m| m.winner.is_none()) {
            return Err(Error::UndecidedMatch {
                round: self.round,
                match_number: r#match.match_number,
            });
        }

        let next = self.round + 1;
        log::debug!(
            "Building bracket round {} from {} matches of round {}",
            next,
            current.len(),
            self.round
        );

        if next == finals {
            self.finals(current)
        } else {
            Ok(self.merge(current, ideal / 2))
        }
    }

    fn merge(&self, current: &[Match], size: u32) -> Vec<Match> {
        let mut matches = Vec::with_capacity(size as usize);

        for index in 1..=size {
            let key = self.key(index);

            let a = winner(current, index * 2 - 1);
            let b = winner(current, index * 2);

            let r#match = match (a, b) {
                (Some(a), Some(b)) => {
                    Match::new(key, MatchKind::Standard, a, Some(b), self.target_points)
                }
                (Some(participant), None) | (None, Some(participant)) => {
                    Match::bye(key, MatchKind::Bye, participant, self.target_points)
                }
                (None, None) => continue,
            };

            matches.push(r#match);
        }

        matches
    }

    fn finals(&self, current: &[Match]) -> Result<Vec<Match>> {
        let semifinal = |match_number| {
            find(current, match_number).ok_or(Error::MissingMatch {
                round: self.round,
                match_number,
            })
        };

        let first = semifinal(1)?;
        let second = semifinal(2)?;

        let (Some(a), Some(b)) = (first.winner, second.winner) else {
            return Err(Error::UndecidedMatch {
                round: self.round,
                match_number: if first.winner.is_none() { 1 } else { 2 },
            });
        };

        let mut matches = vec![Match::new(
            self.key(1),
            MatchKind::GrandFinal,
            a,
            Some(b),
            self.final_target_points,
        )];

        let key = self.key(2);
        match (first.loser(), second.loser()) {
            (Some(a), Some(b)) => matches.push(Match::new(
                key,
                MatchKind::ThirdPlace,
                a,
                Some(b),
                self.target_points,
            )),
            // A semifinal was a bye, the other loser takes third place without playing.
            (Some(participant), None) | (None, Some(participant)) => matches.push(Match::bye(
                key,
                MatchKind::ThirdPlace,
                participant,
                self.target_points,
            )),
            (None, None) => (),
        }

        Ok(matches)
    }

    #[inline]
    fn key(&self, match_number: u32) -> MatchKey {
        MatchKey::new(
            self.tournament_id,
            Stage::TopCut,
            self.round + 1,
            match_number,
        )
    }
}

fn find(matches: &[Match], match_number: u32) -> Option<&Match> {
    matches.iter().find(|m| m.match_number == match_number)
}

fn winner(matches: &[Match], match_number: u32) -> Option<ParticipantId> {
    find(matches, match_number).and_then(|m| m.winner)
}

/// The spot in the following round that a bracket match feeds.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Successor {
    pub round: u32,
    pub match_number: u32,
    pub slot: Slot,
}

impl Successor {
    /// Returns the spot fed by the winner of `match`. Finals round matches have no successor.
    pub fn of(r#match: &Match) -> Option<Self> {
        if r#match.stage != Stage::TopCut || r#match.kind.is_final() {
            return None;
        }

        Some(Self {
            round: r#match.round + 1,
            match_number: (r#match.match_number + 1) / 2,
            slot: Slot::for_match_number(r#match.match_number),
        })
    }

    /// Returns the spot in the third place decider fed by the loser of a semifinal, given that
    /// `self` points to the grand final.
    #[inline]
    pub fn third_place(self) -> Self {
        Self {
            match_number: 2,
            ..self
        }
    }
}

/// Places `participant` into `slot` of the successor match `next`.
///
/// A successor without a second participant is a forwarded bye: its only participant sits in
/// slot A and wins it. Returns `true` if `next` was changed, writing the participant that
/// already occupies the slot is a no-op.
///
/// # Errors
///
/// Returns [`Error::SuccessorSettled`] if `next` is a played match that already has a result.
pub fn feed(next: &mut Match, slot: Slot, participant: ParticipantId) -> Result<bool> {
    let slot = if next.is_bye() { Slot::A } else { slot };

    if next.get(slot) == Some(participant) {
        return Ok(false);
    }

    if next.is_settled() && !next.is_bye() {
        return Err(Error::SuccessorSettled {
            round: next.round,
            match_number: next.match_number,
        });
    }

    match slot {
        Slot::A => next.participant_a = participant,
        Slot::B => next.participant_b = Some(participant),
    }

    if next.is_bye() {
        next.winner = Some(participant);
    }

    Ok(true)
}
