use swisscut_core::swiss::{self, PairHistory, SwissEntrant};
use swisscut_core::{Error, Match, Progress, Round, RoundStatus, Stage, Standings, TournamentId};

use super::{Engine, SwissRound};
use crate::store::{Generation, Store, StoreError};
use crate::Result;

impl<S> Engine<S>
where
    S: Store,
{
    /// Generates the pairings of Swiss round `round_number`.
    ///
    /// Active participants are grouped by their number of wins and paired within their group,
    /// avoiding rematches where possible. An odd participant out receives a bye that counts as
    /// a win.
    pub async fn generate_swiss_round(
        &self,
        tournament_id: TournamentId,
        round_number: u32,
    ) -> Result<SwissRound> {
        let tournament = self.tournament(tournament_id).await?;

        let max = tournament.config.swiss_rounds;
        if round_number == 0 || round_number > max {
            return Err(Error::RoundOutOfRange {
                round: round_number,
                max,
            }
            .into());
        }

        if tournament.progress.is_top_cut() {
            return Err(Error::SwissStageClosed.into());
        }

        let matches = self.store.get_matches(tournament_id, Stage::Swiss).await?;
        if matches.iter().any(|m| m.round == round_number) {
            return Err(Error::RoundAlreadyGenerated {
                stage: Stage::Swiss,
                round: round_number,
            }
            .into());
        }

        if round_number > 1 {
            self.ensure_round_complete(tournament_id, round_number - 1, &matches)
                .await?;
        }

        let participants = self.store.get_participants(tournament_id).await?;
        let standings = Standings::calculate(&participants, &matches);

        let entrants: Vec<SwissEntrant> = participants
            .iter()
            .filter(|p| p.is_active())
            .map(|p| {
                let wins = standings.get(p.id).map_or(0, |s| s.wins);
                SwissEntrant::new(p.id, wins)
            })
            .collect();

        if entrants.len() < 2 {
            return Err(Error::NotEnoughParticipants {
                found: entrants.len(),
            }
            .into());
        }

        let history = PairHistory::from_matches(&matches);
        let pairings = {
            let mut rng = self.rng.lock();
            swiss::pair_round(&entrants, &history, &mut *rng)
        };

        let generation = Generation {
            tournament_id,
            stage: Stage::Swiss,
            round: round_number,
            swiss_round: Some(Round::new(tournament_id, round_number)),
            matches: pairings.into_matches(
                tournament_id,
                round_number,
                tournament.config.match_target_points,
            ),
            expected: tournament.progress,
            progress: Progress::swiss(round_number),
        };

        let generated = self.insert(generation).await?;
        let Some(round) = generated.swiss_round else {
            return Err(StoreError::Corrupt("swiss round").into());
        };

        log::info!(
            "Generated swiss round {} of tournament {} with {} matches",
            round_number,
            tournament_id,
            generated.matches.len()
        );

        Ok(SwissRound {
            round,
            matches: generated.matches,
        })
    }

    /// Checks that the Swiss round `round_number` can be followed by the next one.
    ///
    /// A round that is still active although all of its matches are settled is completed.
    async fn ensure_round_complete(
        &self,
        tournament_id: TournamentId,
        round_number: u32,
        matches: &[Match],
    ) -> Result<()> {
        let Some(round) = self.store.get_round(tournament_id, round_number).await? else {
            return Err(Error::PreviousRoundMissing {
                round: round_number,
            }
            .into());
        };

        if round.status == RoundStatus::Complete {
            return Ok(());
        }

        let pending = matches
            .iter()
            .filter(|m| m.round == round_number && !m.is_settled())
            .count();

        if pending > 0 {
            return Err(Error::PreviousRoundIncomplete {
                round: round_number,
                pending,
            }
            .into());
        }

        log::warn!(
            "Swiss round {} of tournament {} is settled but still active, completing it",
            round_number,
            tournament_id
        );

        self.store.complete_round(round.id).await?;
        Ok(())
    }

    /// Completes the Swiss round `round_number` once none of its matches is pending.
    pub(super) async fn close_round_if_settled(
        &self,
        tournament_id: TournamentId,
        round_number: u32,
    ) -> Result<()> {
        let Some(round) = self.store.get_round(tournament_id, round_number).await? else {
            log::debug!(
                "Swiss round {} of tournament {} has no round record",
                round_number,
                tournament_id
            );
            return Ok(());
        };

        if round.status == RoundStatus::Complete {
            return Ok(());
        }

        let matches = self.store.get_matches(tournament_id, Stage::Swiss).await?;
        let settled = matches
            .iter()
            .filter(|m| m.round == round_number)
            .all(Match::is_settled);

        if settled {
            self.store.complete_round(round.id).await?;
            log::info!(
                "Completed swiss round {} of tournament {}",
                round_number,
                tournament_id
            );
        }

        Ok(())
    }
}
