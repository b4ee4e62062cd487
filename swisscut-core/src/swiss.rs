//! Pairing for a single Swiss round.
//!
//! Entrants are grouped by their number of wins, highest first. Each group is shuffled and
//! paired greedily, preferring opponents that have not been played yet. An odd entrant out
//! floats down into the next lower group, and whoever is left after the lowest group receives
//! a bye.
use std::cmp::Reverse;
use std::collections::{BTreeMap, HashSet, VecDeque};

use rand::seq::SliceRandom;
use rand::Rng;

use crate::{Match, MatchKey, MatchKind, ParticipantId, Stage, TournamentId};

/// A participant that takes part in the next round.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SwissEntrant {
    pub id: ParticipantId,
    pub wins: u32,
}

impl SwissEntrant {
    #[inline]
    pub const fn new(id: ParticipantId, wins: u32) -> Self {
        Self { id, wins }
    }
}

/// The unordered set of pairs that already played each other.
#[derive(Clone, Debug, Default)]
pub struct PairHistory {
    pairs: HashSet<(ParticipantId, ParticipantId)>,
}

impl PairHistory {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Collects every pair from `matches`, regardless of their status. Byes are skipped.
    pub fn from_matches<'a, I>(matches: I) -> Self
    where
        I: IntoIterator<Item = &'a Match>,
    {
        let mut this = Self::new();

        for r#match in matches {
            if let Some(b) = r#match.participant_b {
                this.insert(r#match.participant_a, b);
            }
        }

        this
    }

    pub fn insert(&mut self, a: ParticipantId, b: ParticipantId) {
        self.pairs.insert(Self::key(a, b));
    }

    pub fn contains(&self, a: ParticipantId, b: ParticipantId) -> bool {
        self.pairs.contains(&Self::key(a, b))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    #[inline]
    fn key(a: ParticipantId, b: ParticipantId) -> (ParticipantId, ParticipantId) {
        if a <= b {
            (a, b)
        } else {
            (b, a)
        }
    }
}

/// The outcome of pairing a round.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Pairings {
    pub pairs: Vec<(ParticipantId, ParticipantId)>,
    pub bye: Option<ParticipantId>,
}

impl Pairings {
    /// Builds the matches of Swiss round `round`. Pairs are numbered in order, the bye comes
    /// last and is already complete.
    pub fn into_matches(
        self,
        tournament_id: TournamentId,
        round: u32,
        target_points: u32,
    ) -> Vec<Match> {
        let mut matches = Vec::with_capacity(self.pairs.len() + 1);

        let mut match_number = 1;
        for (a, b) in self.pairs {
            let key = MatchKey::new(tournament_id, Stage::Swiss, round, match_number);
            matches.push(Match::new(key, MatchKind::Standard, a, Some(b), target_points));

            match_number += 1;
        }

        if let Some(participant) = self.bye {
            let key = MatchKey::new(tournament_id, Stage::Swiss, round, match_number);
            matches.push(Match::bye(key, MatchKind::Bye, participant, target_points));
        }

        matches
    }
}

/// Pairs `entrants` for a single round.
///
/// The result only depends on `entrants`, `history` and the state of `rng`, never on the order
/// of `entrants`.
pub fn pair_round<R>(entrants: &[SwissEntrant], history: &PairHistory, rng: &mut R) -> Pairings
where
    R: Rng + ?Sized,
{
    let mut groups: BTreeMap<Reverse<u32>, Vec<ParticipantId>> = BTreeMap::new();
    for entrant in entrants {
        groups
            .entry(Reverse(entrant.wins))
            .or_default()
            .push(entrant.id);
    }

    let mut pairings = Pairings {
        pairs: Vec::with_capacity(entrants.len() / 2),
        bye: None,
    };

    let mut floater = None;
    for (Reverse(wins), mut group) in groups {
        group.sort_unstable();
        group.shuffle(rng);

        let mut pool = VecDeque::from(group);
        if let Some(participant) = floater.take() {
            log::debug!("Floating {} down into the {} win group", participant, wins);
            pool.push_front(participant);
        }

        while let Some(participant) = pool.pop_front() {
            if pool.is_empty() {
                floater = Some(participant);
                break;
            }

            let index = match pool
                .iter()
                .position(|opponent| !history.contains(participant, *opponent))
            {
                Some(index) => index,
                None => {
                    log::debug!("No new opponent left for {}, allowing a rematch", participant);
                    0
                }
            };

            if let Some(opponent) = pool.remove(index) {
                pairings.pairs.push((participant, opponent));
            }
        }
    }

    pairings.bye = floater;
    pairings
}
