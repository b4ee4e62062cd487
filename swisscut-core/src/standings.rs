use std::cmp::Ordering;
use std::collections::HashMap;
use std::iter::FusedIterator;

use crate::{Match, Participant, ParticipantId};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The performance of a single participant.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Standing {
    pub participant_id: ParticipantId,
    pub wins: u32,
    pub matches_played: u32,
    /// Own points minus opponent points over all decided matches.
    pub differential: i64,
}

impl Standing {
    #[inline]
    const fn new(participant_id: ParticipantId) -> Self {
        Self {
            participant_id,
            wins: 0,
            matches_played: 0,
            differential: 0,
        }
    }
}

impl PartialOrd for Standing {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Better standings compare as smaller: wins descending, then differential descending, then
/// participant id ascending.
impl Ord for Standing {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .wins
            .cmp(&self.wins)
            .then_with(|| other.differential.cmp(&self.differential))
            .then_with(|| self.participant_id.cmp(&other.participant_id))
    }
}

/// A ranked table of [`Standing`]s, best first.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Standings {
    entries: Vec<Standing>,
}

impl Standings {
    /// Ranks `participants` using the settled matches in `matches`.
    ///
    /// Every participant is ranked, including dropped ones. Pending matches are ignored, draws
    /// only count as played. Matches referring to unknown participants are skipped.
    pub fn calculate<'a, I>(participants: &[Participant], matches: I) -> Self
    where
        I: IntoIterator<Item = &'a Match>,
    {
        let mut table: HashMap<ParticipantId, Standing> = participants
            .iter()
            .map(|p| (p.id, Standing::new(p.id)))
            .collect();

        for r#match in matches {
            if !r#match.is_settled() {
                continue;
            }

            let sides = [
                (
                    Some(r#match.participant_a),
                    r#match.score_a,
                    r#match.score_b,
                ),
                (r#match.participant_b, r#match.score_b, r#match.score_a),
            ];

            for (participant, own, opponent) in sides {
                let Some(participant) = participant else {
                    continue;
                };

                let Some(entry) = table.get_mut(&participant) else {
                    log::debug!(
                        "Skipping unknown participant {} in match {}",
                        participant,
                        r#match.id
                    );
                    continue;
                };

                entry.matches_played += 1;

                if let Some(winner) = r#match.winner {
                    entry.differential += i64::from(own) - i64::from(opponent);

                    if winner == participant {
                        entry.wins += 1;
                    }
                }
            }
        }

        let mut entries: Vec<Standing> = table.into_values().collect();
        entries.sort_unstable();

        Self { entries }
    }

    /// Returns the standing of `participant`.
    pub fn get(&self, participant: ParticipantId) -> Option<&Standing> {
        self.entries
            .iter()
            .find(|entry| entry.participant_id == participant)
    }

    /// Returns the 1-based rank of `participant`.
    pub fn rank(&self, participant: ParticipantId) -> Option<usize> {
        self.entries
            .iter()
            .position(|entry| entry.participant_id == participant)
            .map(|index| index + 1)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            inner: self,
            next: 0,
        }
    }
}

impl<'a> IntoIterator for &'a Standings {
    type Item = &'a Standing;
    type IntoIter = Iter<'a>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[derive(Clone, Debug)]
pub struct Iter<'a> {
    inner: &'a Standings,
    next: usize,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a Standing;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let entry = self.inner.entries.get(self.next)?;
        self.next += 1;
        Some(entry)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.len(), Some(self.len()))
    }
}

impl<'a> ExactSizeIterator for Iter<'a> {
    #[inline]
    fn len(&self) -> usize {
        self.inner.entries.len() - self.next
    }
}

impl<'a> FusedIterator for Iter<'a> {}
