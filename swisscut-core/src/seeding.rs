//! Seeding of the first top cut round.
use std::fmt::{self, Display, Formatter};

use crate::{Error, Match, MatchKey, MatchKind, ParticipantId, Result, Stage, TournamentId};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A validated number of participants advancing into the top cut.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "u32", into = "u32"))]
pub struct CutSize(u32);

impl CutSize {
    /// All supported cut sizes.
    pub const ALLOWED: [u32; 8] = [4, 8, 12, 16, 24, 32, 48, 64];

    #[inline]
    pub const fn get(self) -> u32 {
        self.0
    }

    /// Returns the number of slots in the bracket, the smallest power of two that fits the cut.
    #[inline]
    pub const fn bracket_size(self) -> u32 {
        self.0.next_power_of_two()
    }
}

impl TryFrom<u32> for CutSize {
    type Error = Error;

    fn try_from(value: u32) -> Result<Self> {
        if Self::ALLOWED.contains(&value) {
            Ok(Self(value))
        } else {
            Err(Error::InvalidCutSize(value))
        }
    }
}

impl From<CutSize> for u32 {
    #[inline]
    fn from(value: CutSize) -> Self {
        value.0
    }
}

impl Display for CutSize {
    #[inline]
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Returns the 1-based seeds in bracket slot order for a bracket with `size` slots.
///
/// Adjacent slots play each other in the first round. The two best seeds can only meet in the
/// final, the best four only in the semifinals and so on. `size` must be a power of two.
///
/// ```
/// # use swisscut_core::seeding::seeding_order;
/// assert_eq!(seeding_order(8), vec![1, 8, 4, 5, 2, 7, 3, 6]);
/// ```
pub fn seeding_order(size: usize) -> Vec<usize> {
    debug_assert!(size.is_power_of_two());

    if size < 2 {
        return vec![1; size];
    }

    let mut order = vec![1, 2];
    while order.len() < size {
        let sum = order.len() * 2 + 1;
        order = order.iter().flat_map(|&seed| [seed, sum - seed]).collect();
    }

    order
}

/// Builds the first top cut round from the final Swiss ranking.
///
/// `ranked` is ordered best first; only the first `cut` entries qualify. Seeds without an
/// opponent receive a completed bye, slot pairs without any seed produce no match. Match numbers
/// follow the slot pairs, so they can skip numbers when slot pairs are empty.
///
/// # Errors
///
/// Returns [`Error::NotEnoughParticipants`] if less than 2 participants qualify.
pub fn seed_bracket(
    tournament_id: TournamentId,
    ranked: &[ParticipantId],
    cut: CutSize,
    target_points: u32,
) -> Result<Vec<Match>> {
    let qualified = &ranked[..ranked.len().min(cut.get() as usize)];
    if qualified.len() < 2 {
        return Err(Error::NotEnoughParticipants {
            found: qualified.len(),
        });
    }

    let size = cut.bracket_size() as usize;
    log::debug!(
        "Seeding {} participants into a bracket of {}",
        qualified.len(),
        size
    );

    let slots: Vec<Option<ParticipantId>> = seeding_order(size)
        .into_iter()
        .map(|seed| qualified.get(seed - 1).copied())
        .collect();

    let mut matches = Vec::with_capacity(size / 2);
    for (index, pair) in slots.chunks_exact(2).enumerate() {
        let key = MatchKey::new(tournament_id, Stage::TopCut, 1, index as u32 + 1);

        let r#match = match (pair[0], pair[1]) {
            (Some(a), Some(b)) => Match::new(key, MatchKind::Standard, a, Some(b), target_points),
            (Some(seed), None) | (None, Some(seed)) => {
                Match::bye(key, MatchKind::Bye, seed, target_points)
            }
            (None, None) => continue,
        };

        matches.push(r#match);
    }

    Ok(matches)
}
