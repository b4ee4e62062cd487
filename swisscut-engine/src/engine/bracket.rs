use std::collections::HashSet;

use swisscut_core::bracket::{self, Advance, Successor};
use swisscut_core::seeding::CutSize;
use swisscut_core::{
    Error, Match, MatchId, MatchKey, MatchKind, ParticipantId, Progress, Stage, Standings,
    TournamentId,
};

use super::results::forfeit;
use super::Engine;
use crate::store::{Generation, Store};
use crate::Result;

impl<S> Engine<S>
where
    S: Store,
{
    /// Generates the bracket round following the current one.
    ///
    /// After the semifinals this creates the grand final and the third place decider. Matches
    /// of the new round involving a dropped participant are forfeited immediately.
    pub async fn advance_bracket(&self, tournament_id: TournamentId) -> Result<Vec<Match>> {
        let tournament = self.tournament(tournament_id).await?;

        let Progress {
            stage: Some(Stage::TopCut),
            round,
            cut_size,
        } = tournament.progress
        else {
            return Err(Error::TopCutNotStarted.into());
        };

        let cut = CutSize::try_from(cut_size.unwrap_or(tournament.config.cut_size))?;

        let matches = self.store.get_matches(tournament_id, Stage::TopCut).await?;
        if matches.iter().any(|m| m.round == round + 1) {
            return Err(Error::RoundAlreadyGenerated {
                stage: Stage::TopCut,
                round: round + 1,
            }
            .into());
        }

        let current: Vec<Match> = matches.into_iter().filter(|m| m.round == round).collect();

        let advance = Advance {
            tournament_id,
            bracket_size: cut.bracket_size(),
            round,
            target_points: tournament.config.match_target_points,
            final_target_points: tournament.config.final_target_points,
        };

        let mut next = advance.next_round(&current)?;

        // Participants that dropped after winning their last match forfeit straight away.
        let participants = self.store.get_participants(tournament_id).await?;
        let dropped: HashSet<ParticipantId> = participants
            .iter()
            .filter(|p| p.dropped)
            .map(|p| p.id)
            .collect();

        if !dropped.is_empty() {
            let swiss = self.store.get_matches(tournament_id, Stage::Swiss).await?;
            let standings = Standings::calculate(&participants, &swiss);

            for r#match in &mut next {
                if forfeit(r#match, &dropped, &standings) {
                    log::info!(
                        "Match {} of bracket round {} forfeited by dropped participants",
                        r#match.match_number,
                        r#match.round
                    );
                }
            }
        }

        let generation = Generation {
            tournament_id,
            stage: Stage::TopCut,
            round: round + 1,
            swiss_round: None,
            matches: next,
            expected: tournament.progress,
            progress: Progress::top_cut(round + 1, cut.get()),
        };

        let generated = self.insert(generation).await?;

        log::info!(
            "Generated bracket round {} of tournament {} with {} matches",
            round + 1,
            tournament_id,
            generated.matches.len()
        );

        Ok(generated.matches)
    }

    /// Moves the winner of a settled bracket match into its spot in the following round.
    ///
    /// Does nothing if the match has no winner yet, feeds no further match, or its successor
    /// has not been generated. Repeating the call changes nothing.
    pub async fn promote_winner_to_next_round(&self, match_id: MatchId) -> Result<()> {
        let Some(r#match) = self.store.get_match(match_id).await? else {
            return Err(Error::MatchNotFound(match_id).into());
        };

        if r#match.stage != Stage::TopCut {
            return Err(Error::NotBracketMatch(match_id).into());
        }

        for next in self.successor_updates(&r#match).await? {
            self.store.update_match(&next).await?;
            log::info!(
                "Updated match {} of bracket round {} from match {}",
                next.match_number,
                next.round,
                match_id
            );
        }

        Ok(())
    }

    /// Returns the successor matches of `match` with its winner, and for semifinals its loser,
    /// placed into their spots. Only changed matches are returned.
    ///
    /// Nothing is written, so callers can reject a result before storing anything.
    pub(super) async fn successor_updates(&self, r#match: &Match) -> Result<Vec<Match>> {
        let mut updates = Vec::new();

        let Some(winner) = r#match.winner else {
            log::debug!("Match {} has no winner to promote", r#match.id);
            return Ok(updates);
        };

        let Some(successor) = Successor::of(r#match) else {
            log::debug!("Match {} feeds no further match", r#match.id);
            return Ok(updates);
        };

        let key = successor_key(r#match, successor);
        let Some(mut next) = self.find_match(key).await? else {
            log::debug!(
                "Bracket round {} of tournament {} has not been generated yet",
                successor.round,
                r#match.tournament_id
            );
            return Ok(updates);
        };

        let grand_final = next.kind == MatchKind::GrandFinal;

        if bracket::feed(&mut next, successor.slot, winner)? {
            log::debug!(
                "Placing {} into match {} of bracket round {}",
                winner,
                next.match_number,
                next.round
            );
            updates.push(next);
        }

        if !grand_final {
            return Ok(updates);
        }

        let Some(loser) = r#match.loser() else {
            return Ok(updates);
        };

        let third_place = successor.third_place();
        if let Some(mut next) = self.find_match(successor_key(r#match, third_place)).await? {
            if bracket::feed(&mut next, third_place.slot, loser)? {
                log::debug!("Placing {} into the third place decider", loser);
                updates.push(next);
            }
        }

        Ok(updates)
    }
}

fn successor_key(r#match: &Match, successor: Successor) -> MatchKey {
    MatchKey::new(
        r#match.tournament_id,
        Stage::TopCut,
        successor.round,
        successor.match_number,
    )
}
