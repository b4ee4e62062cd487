use std::collections::{BTreeSet, HashSet};

use swisscut_core::{Error, Match, MatchId, ParticipantId, Slot, Stage, Standings};

use super::Engine;
use crate::store::Store;
use crate::Result;

impl<S> Engine<S>
where
    S: Store,
{
    /// Records the score of a played match and carries the outcome forward.
    ///
    /// A Swiss round is completed once its last match is settled. The winner of a top cut
    /// match is moved into the following round if that round already exists. Recording a new
    /// score for a settled match corrects it.
    pub async fn record_result(
        &self,
        match_id: MatchId,
        score_a: u32,
        score_b: u32,
    ) -> Result<Match> {
        let Some(mut r#match) = self.store.get_match(match_id).await? else {
            return Err(Error::MatchNotFound(match_id).into());
        };

        r#match.record(score_a, score_b)?;

        // Rejects corrections that would rewrite an already played successor before anything
        // is written.
        let updates = match r#match.stage {
            Stage::Swiss => Vec::new(),
            Stage::TopCut => self.successor_updates(&r#match).await?,
        };

        self.store.update_match(&r#match).await?;
        for next in &updates {
            self.store.update_match(next).await?;
        }

        log::info!(
            "Recorded {}-{} for match {} of {} round {}",
            score_a,
            score_b,
            match_id,
            r#match.stage,
            r#match.round
        );

        if r#match.stage == Stage::Swiss {
            self.close_round_if_settled(r#match.tournament_id, r#match.round)
                .await?;
        }

        Ok(r#match)
    }

    /// Withdraws a participant from the tournament.
    ///
    /// The participant is left out of all future pairings and loses each of its pending
    /// matches by walkover. If both sides of a pending match have dropped, the side with the
    /// better Swiss standing wins it 0-0. Returns the matches that were resolved; dropping a
    /// participant twice resolves nothing.
    pub async fn drop_participant(&self, participant_id: ParticipantId) -> Result<Vec<Match>> {
        let Some(participant) = self.store.get_participant(participant_id).await? else {
            return Err(Error::ParticipantNotFound(participant_id).into());
        };

        if participant.dropped {
            log::debug!("Participant {} has already dropped", participant_id);
            return Ok(Vec::new());
        }

        let tournament_id = participant.tournament_id;

        let mut participants = self.store.get_participants(tournament_id).await?;
        for p in participants.iter_mut().filter(|p| p.id == participant_id) {
            p.dropped = true;
        }

        let dropped: HashSet<ParticipantId> = participants
            .iter()
            .filter(|p| p.dropped)
            .map(|p| p.id)
            .collect();

        let swiss = self.store.get_matches(tournament_id, Stage::Swiss).await?;
        let top_cut = self.store.get_matches(tournament_id, Stage::TopCut).await?;
        let standings = Standings::calculate(&participants, &swiss);

        let pending = swiss
            .into_iter()
            .chain(top_cut)
            .filter(|m| !m.is_settled() && m.involves(participant_id));

        let mut resolved = Vec::new();
        let mut updates = Vec::new();
        for mut r#match in pending {
            if !forfeit(&mut r#match, &dropped, &standings) {
                continue;
            }

            if r#match.stage == Stage::TopCut {
                updates.extend(self.successor_updates(&r#match).await?);
            }

            resolved.push(r#match);
        }

        self.store.drop_participant(participant_id).await?;
        for r#match in resolved.iter().chain(&updates) {
            self.store.update_match(r#match).await?;
        }

        log::info!(
            "Dropped participant {} from tournament {}, resolved {} pending matches",
            participant_id,
            tournament_id,
            resolved.len()
        );

        let rounds: BTreeSet<u32> = resolved
            .iter()
            .filter(|m| m.stage == Stage::Swiss)
            .map(|m| m.round)
            .collect();

        for round in rounds {
            self.close_round_if_settled(tournament_id, round).await?;
        }

        Ok(resolved)
    }
}

/// Resolves a pending match in which at least one side has dropped.
///
/// The remaining side wins by walkover. If both sides have dropped, the one ranked higher in
/// `standings` wins 0-0. Returns `false` if the match was left untouched.
pub(super) fn forfeit(
    r#match: &mut Match,
    dropped: &HashSet<ParticipantId>,
    standings: &Standings,
) -> bool {
    let Some(b) = r#match.participant_b else {
        return false;
    };
    let a = r#match.participant_a;

    if r#match.is_settled() {
        return false;
    }

    match (dropped.contains(&a), dropped.contains(&b)) {
        (true, false) => r#match.walkover(Slot::B),
        (false, true) => r#match.walkover(Slot::A),
        (true, true) => {
            let rank = |id| standings.rank(id).unwrap_or(usize::MAX);
            let winner = if rank(a) <= rank(b) { Slot::A } else { Slot::B };

            r#match.double_forfeit(winner);
        }
        (false, false) => return false,
    }

    true
}
