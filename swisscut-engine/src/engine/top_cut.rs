use std::collections::HashSet;

use swisscut_core::seeding::{self, CutSize};
use swisscut_core::{Error, Match, ParticipantId, Progress, Stage, Standings, TournamentId};

use super::Engine;
use crate::store::{Generation, Store};
use crate::Result;

impl<S> Engine<S>
where
    S: Store,
{
    /// Seeds the first top cut round from the final Swiss standings.
    ///
    /// Only active participants qualify. With fewer than `cut_size` of them the best seeds get
    /// byes in the first round.
    pub async fn generate_top_cut(
        &self,
        tournament_id: TournamentId,
        cut_size: u32,
    ) -> Result<Vec<Match>> {
        let cut = CutSize::try_from(cut_size)?;
        let tournament = self.tournament(tournament_id).await?;

        let started = tournament.progress.is_top_cut()
            || !self
                .store
                .get_matches(tournament_id, Stage::TopCut)
                .await?
                .is_empty();

        if started {
            return Err(Error::RoundAlreadyGenerated {
                stage: Stage::TopCut,
                round: 1,
            }
            .into());
        }

        let swiss = self.store.get_matches(tournament_id, Stage::Swiss).await?;
        let pending = swiss.iter().filter(|m| !m.is_settled()).count();
        if pending > 0 {
            return Err(Error::SwissIncomplete { pending }.into());
        }

        let participants = self.store.get_participants(tournament_id).await?;
        let active: HashSet<ParticipantId> = participants
            .iter()
            .filter(|p| p.is_active())
            .map(|p| p.id)
            .collect();

        let standings = Standings::calculate(&participants, &swiss);
        let ranked: Vec<ParticipantId> = standings
            .iter()
            .map(|s| s.participant_id)
            .filter(|id| active.contains(id))
            .collect();

        let matches = seeding::seed_bracket(
            tournament_id,
            &ranked,
            cut,
            tournament.config.match_target_points,
        )?;

        let generation = Generation {
            tournament_id,
            stage: Stage::TopCut,
            round: 1,
            swiss_round: None,
            matches,
            expected: tournament.progress,
            progress: Progress::top_cut(1, cut.get()),
        };

        let generated = self.insert(generation).await?;

        log::info!(
            "Seeded top {} of tournament {} from {} qualified participants",
            cut,
            tournament_id,
            ranked.len().min(cut.get() as usize)
        );

        Ok(generated.matches)
    }
}
