//! The tournament operations.
//!
//! Every operation loads the records it needs from the [`Store`], computes the change with
//! `swisscut_core` and writes it back. Round generation goes through
//! [`Store::insert_generation`], so two concurrent calls for the same round cannot both succeed.
mod bracket;
mod results;
mod swiss;
mod top_cut;

#[cfg(test)]
mod tests;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::SeedableRng;
use swisscut_core::{Match, MatchKey, Round, Tournament, TournamentId};

use serde::Serialize;

use crate::store::{Generated, Generation, Store, StoreError};
use crate::Result;

/// A newly generated Swiss round.
#[derive(Clone, Debug, Serialize)]
pub struct SwissRound {
    pub round: Round,
    pub matches: Vec<Match>,
}

#[derive(Debug)]
pub struct Engine<S> {
    store: S,
    rng: Mutex<StdRng>,
}

impl<S> Engine<S>
where
    S: Store,
{
    /// Creates a new `Engine` shuffling Swiss groups with system entropy.
    pub fn new(store: S) -> Self {
        Self {
            store,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Creates a new `Engine` with reproducible Swiss pairings.
    pub fn with_seed(store: S, seed: u64) -> Self {
        Self {
            store,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    #[inline]
    pub fn store(&self) -> &S {
        &self.store
    }

    async fn tournament(&self, id: TournamentId) -> Result<Tournament> {
        match self.store.get_tournament(id).await? {
            Some(tournament) => Ok(tournament),
            None => Err(swisscut_core::Error::TournamentNotFound(id).into()),
        }
    }

    async fn find_match(&self, key: MatchKey) -> Result<Option<Match>> {
        Ok(self.store.find_match(key).await?)
    }

    /// Writes a generated round, reporting a lost race as an already generated round.
    async fn insert(&self, generation: Generation) -> Result<Generated> {
        let (stage, round) = (generation.stage, generation.round);

        match self.store.insert_generation(generation).await {
            Ok(generated) => Ok(generated),
            Err(StoreError::Conflict) => {
                Err(swisscut_core::Error::RoundAlreadyGenerated { stage, round }.into())
            }
            Err(err) => Err(err.into()),
        }
    }
}
