use std::collections::HashSet;
use std::fmt::Debug;

use swisscut_core::{
    Error, Match, MatchKind, MatchStatus, Participant, ParticipantId, Progress, RoundStatus, Stage,
    Standings, Tournament, TournamentConfig, TournamentId,
};

use super::Engine;
use crate::store::{Generation, MemoryStore, Store, StoreError};

const TOURNAMENT: TournamentId = TournamentId(1);

fn engine(participants: u64) -> Engine<MemoryStore> {
    engine_with(participants, TournamentConfig::default())
}

fn engine_with(participants: u64, config: TournamentConfig) -> Engine<MemoryStore> {
    let store = MemoryStore::new();
    store.insert_tournament(Tournament::new(TOURNAMENT, config));

    for id in 1..=participants {
        store.insert_participant(Participant {
            id: ParticipantId(id),
            tournament_id: TOURNAMENT,
            name: format!("Team {}", id),
            dropped: false,
            checked_in: true,
            user_id: None,
        });
    }

    Engine::with_seed(store, 7)
}

fn tournament_error<T>(res: crate::Result<T>) -> Error
where
    T: Debug,
{
    match res {
        Err(crate::Error::Tournament(err)) => err,
        res => panic!("expected a tournament error, got {:?}", res),
    }
}

async fn matches(engine: &Engine<MemoryStore>, stage: Stage) -> Vec<Match> {
    engine.store().get_matches(TOURNAMENT, stage).await.unwrap()
}

async fn round(engine: &Engine<MemoryStore>, stage: Stage, round: u32) -> Vec<Match> {
    let mut matches = matches(engine, stage).await;
    matches.retain(|m| m.round == round);
    matches
}

async fn progress(engine: &Engine<MemoryStore>) -> Progress {
    let tournament = engine.store().get_tournament(TOURNAMENT).await.unwrap();
    tournament.unwrap().progress
}

async fn standings(engine: &Engine<MemoryStore>) -> Vec<ParticipantId> {
    let participants = engine.store().get_participants(TOURNAMENT).await.unwrap();
    let swiss = matches(engine, Stage::Swiss).await;

    Standings::calculate(&participants, &swiss)
        .iter()
        .map(|s| s.participant_id)
        .collect()
}

/// Lets the participant with the lower id win every pending match of the round 4-1.
async fn play(engine: &Engine<MemoryStore>, stage: Stage, number: u32) {
    for m in round(engine, stage, number).await {
        if m.is_settled() {
            continue;
        }

        let (score_a, score_b) = if m.participant_a < m.participant_b.unwrap() {
            (4, 1)
        } else {
            (1, 4)
        };

        engine.record_result(m.id, score_a, score_b).await.unwrap();
    }
}

/// Plays `rounds` Swiss rounds.
async fn play_swiss(engine: &Engine<MemoryStore>, rounds: u32) {
    for number in 1..=rounds {
        engine.generate_swiss_round(TOURNAMENT, number).await.unwrap();
        play(engine, Stage::Swiss, number).await;
    }
}

fn involved(matches: &[Match]) -> Vec<ParticipantId> {
    let mut ids: Vec<_> = matches
        .iter()
        .flat_map(|m| [Some(m.participant_a), m.participant_b])
        .flatten()
        .collect();

    ids.sort_unstable();
    ids
}

#[tokio::test]
async fn test_generate_swiss_round() {
    for count in [2, 4, 5, 8, 9, 16, 17] {
        let engine = engine(count);
        let generated = engine.generate_swiss_round(TOURNAMENT, 1).await.unwrap();

        let matches = &generated.matches;
        assert_eq!(matches.len() as u64, count / 2 + count % 2);
        assert_eq!(
            matches.iter().filter(|m| m.is_bye()).count() as u64,
            count % 2
        );
        assert_eq!(involved(matches), (1..=count).map(ParticipantId).collect::<Vec<_>>());

        assert_eq!(generated.round.round_number, 1);
        assert_eq!(generated.round.status, RoundStatus::Active);
        assert!(matches.iter().all(|m| m.round_id == Some(generated.round.id)));

        assert_eq!(progress(&engine).await, Progress::swiss(1));
    }
}

#[tokio::test]
async fn test_generate_swiss_round_bye() {
    let engine = engine(5);
    let generated = engine.generate_swiss_round(TOURNAMENT, 1).await.unwrap();

    let numbers: Vec<_> = generated.matches.iter().map(|m| m.match_number).collect();
    assert_eq!(numbers, vec![1, 2, 3]);

    let bye = &generated.matches[2];
    assert_eq!(bye.kind, MatchKind::Bye);
    assert_eq!(bye.status, MatchStatus::Complete);
    assert_eq!((bye.score_a, bye.score_b), (4, 3));
    assert_eq!(bye.winner, Some(bye.participant_a));

    for m in &generated.matches[..2] {
        assert_eq!(m.kind, MatchKind::Standard);
        assert_eq!(m.status, MatchStatus::Pending);
        assert_eq!(m.target_points, 4);
    }
}

#[tokio::test]
async fn test_generate_swiss_round_twice() {
    let engine = engine(4);
    engine.generate_swiss_round(TOURNAMENT, 1).await.unwrap();
    let before = matches(&engine, Stage::Swiss).await;

    let err = tournament_error(engine.generate_swiss_round(TOURNAMENT, 1).await);
    assert_eq!(
        err,
        Error::RoundAlreadyGenerated {
            stage: Stage::Swiss,
            round: 1
        }
    );

    assert_eq!(matches(&engine, Stage::Swiss).await, before);
    assert_eq!(progress(&engine).await, Progress::swiss(1));
}

#[tokio::test]
async fn test_generate_swiss_round_concurrent() {
    let engine = engine(8);

    let (a, b) = tokio::join!(
        engine.generate_swiss_round(TOURNAMENT, 1),
        engine.generate_swiss_round(TOURNAMENT, 1)
    );

    assert_eq!(u8::from(a.is_ok()) + u8::from(b.is_ok()), 1);
    assert_eq!(matches(&engine, Stage::Swiss).await.len(), 4);
}

#[tokio::test]
async fn test_generate_swiss_round_out_of_range() {
    let config = TournamentConfig {
        swiss_rounds: 3,
        ..Default::default()
    };
    let engine = engine_with(4, config);

    assert_eq!(
        tournament_error(engine.generate_swiss_round(TOURNAMENT, 0).await),
        Error::RoundOutOfRange { round: 0, max: 3 }
    );
    assert_eq!(
        tournament_error(engine.generate_swiss_round(TOURNAMENT, 4).await),
        Error::RoundOutOfRange { round: 4, max: 3 }
    );
    assert_eq!(
        tournament_error(engine.generate_swiss_round(TournamentId(2), 1).await),
        Error::TournamentNotFound(TournamentId(2))
    );
}

#[tokio::test]
async fn test_generate_swiss_round_previous_round() {
    let engine = engine(4);

    assert_eq!(
        tournament_error(engine.generate_swiss_round(TOURNAMENT, 2).await),
        Error::PreviousRoundMissing { round: 1 }
    );

    engine.generate_swiss_round(TOURNAMENT, 1).await.unwrap();
    assert_eq!(
        tournament_error(engine.generate_swiss_round(TOURNAMENT, 2).await),
        Error::PreviousRoundIncomplete {
            round: 1,
            pending: 2
        }
    );

    play(&engine, Stage::Swiss, 1).await;
    let record = engine.store().get_round(TOURNAMENT, 1).await.unwrap();
    assert_eq!(record.unwrap().status, RoundStatus::Complete);

    engine.generate_swiss_round(TOURNAMENT, 2).await.unwrap();
}

#[tokio::test]
async fn test_generate_swiss_round_completes_settled_round() {
    let engine = engine(4);
    engine.generate_swiss_round(TOURNAMENT, 1).await.unwrap();

    // Results written past the engine leave the round record active.
    for mut m in round(&engine, Stage::Swiss, 1).await {
        m.record(4, 0).unwrap();
        engine.store().update_match(&m).await.unwrap();
    }

    engine.generate_swiss_round(TOURNAMENT, 2).await.unwrap();

    let record = engine.store().get_round(TOURNAMENT, 1).await.unwrap();
    assert_eq!(record.unwrap().status, RoundStatus::Complete);
}

#[tokio::test]
async fn test_generate_swiss_round_groups_by_wins() {
    let engine = engine(4);
    engine.generate_swiss_round(TOURNAMENT, 1).await.unwrap();
    play(&engine, Stage::Swiss, 1).await;

    let winners: HashSet<_> = round(&engine, Stage::Swiss, 1)
        .await
        .iter()
        .filter_map(|m| m.winner)
        .collect();

    let generated = engine.generate_swiss_round(TOURNAMENT, 2).await.unwrap();
    for m in &generated.matches {
        let b = m.participant_b.unwrap();
        assert_eq!(
            winners.contains(&m.participant_a),
            winners.contains(&b),
            "{} and {} come from different groups",
            m.participant_a,
            b
        );
    }
}

#[tokio::test]
async fn test_generate_swiss_round_not_enough_participants() {
    let engine = engine(1);
    engine.store().insert_participant(Participant {
        id: ParticipantId(2),
        tournament_id: TOURNAMENT,
        name: String::from("Late"),
        dropped: false,
        checked_in: false,
        user_id: None,
    });

    assert_eq!(
        tournament_error(engine.generate_swiss_round(TOURNAMENT, 1).await),
        Error::NotEnoughParticipants { found: 1 }
    );
    assert!(matches(&engine, Stage::Swiss).await.is_empty());
}

#[tokio::test]
async fn test_insert_generation_conflict() {
    let engine = engine(4);

    let generation = Generation {
        tournament_id: TOURNAMENT,
        stage: Stage::TopCut,
        round: 1,
        swiss_round: None,
        matches: Vec::new(),
        expected: Progress::swiss(3),
        progress: Progress::top_cut(1, 4),
    };

    let res = engine.store().insert_generation(generation).await;
    assert!(matches!(res, Err(StoreError::Conflict)));
    assert_eq!(progress(&engine).await, Progress::default());
}

#[tokio::test]
async fn test_drop_before_pairing() {
    let engine = engine(5);

    let resolved = engine.drop_participant(ParticipantId(5)).await.unwrap();
    assert!(resolved.is_empty());

    let generated = engine.generate_swiss_round(TOURNAMENT, 1).await.unwrap();
    assert_eq!(generated.matches.len(), 2);
    assert!(generated.matches.iter().all(|m| !m.is_bye()));
    assert!(!involved(&generated.matches).contains(&ParticipantId(5)));
}

#[tokio::test]
async fn test_drop_walkover() {
    let engine = engine(4);
    let generated = engine.generate_swiss_round(TOURNAMENT, 1).await.unwrap();

    let target = generated.matches[0].clone();
    let resolved = engine.drop_participant(target.participant_a).await.unwrap();

    assert_eq!(resolved.len(), 1);
    let m = &resolved[0];
    assert_eq!(m.id, target.id);
    assert_eq!(m.status, MatchStatus::Complete);
    assert_eq!(m.winner, target.participant_b);
    assert_eq!((m.score_a, m.score_b), (3, 4));
    assert_eq!(engine.store().get_match(m.id).await.unwrap().as_ref(), Some(m));

    // Dropping is permanent and only resolves matches once.
    let resolved = engine.drop_participant(target.participant_a).await.unwrap();
    assert!(resolved.is_empty());

    play(&engine, Stage::Swiss, 1).await;
    let record = engine.store().get_round(TOURNAMENT, 1).await.unwrap();
    assert_eq!(record.unwrap().status, RoundStatus::Complete);

    assert_eq!(
        tournament_error(engine.drop_participant(ParticipantId(99)).await),
        Error::ParticipantNotFound(ParticipantId(99))
    );
}

#[tokio::test]
async fn test_drop_both_sides() {
    let engine = engine(4);
    engine.generate_swiss_round(TOURNAMENT, 1).await.unwrap();

    // Both lower ids win, the first one by a wider margin.
    let first = round(&engine, Stage::Swiss, 1).await;
    let mut winners = Vec::new();
    for (m, loser_score) in first.iter().zip([0, 3]) {
        let b = m.participant_b.unwrap();
        let res = if m.participant_a < b {
            engine.record_result(m.id, 4, loser_score).await
        } else {
            engine.record_result(m.id, loser_score, 4).await
        };
        winners.push(res.unwrap().winner.unwrap());
    }

    let generated = engine.generate_swiss_round(TOURNAMENT, 2).await.unwrap();
    let top = generated
        .matches
        .iter()
        .find(|m| m.involves(winners[0]))
        .unwrap();
    assert!(top.involves(winners[1]));

    engine.store().drop_participant(winners[1]).await.unwrap();
    let resolved = engine.drop_participant(winners[0]).await.unwrap();

    assert_eq!(resolved.len(), 1);
    let m = &resolved[0];
    assert_eq!(m.id, top.id);
    assert_eq!((m.score_a, m.score_b), (0, 0));
    assert_eq!(m.status, MatchStatus::Complete);
    assert_eq!(m.winner, Some(winners[0]));
}

#[tokio::test]
async fn test_record_result_rejects() {
    let engine = engine(5);
    let generated = engine.generate_swiss_round(TOURNAMENT, 1).await.unwrap();

    let bye = generated.matches.iter().find(|m| m.is_bye()).unwrap();
    assert_eq!(
        tournament_error(engine.record_result(bye.id, 4, 0).await),
        Error::ByeHasNoResult(bye.id)
    );

    // Swiss matches may end in a draw.
    let m = engine
        .record_result(generated.matches[0].id, 2, 2)
        .await
        .unwrap();
    assert_eq!(m.status, MatchStatus::Draw);
    assert_eq!(m.winner, None);

    let unknown = swisscut_core::MatchId(42);
    assert_eq!(
        tournament_error(engine.record_result(unknown, 4, 0).await),
        Error::MatchNotFound(unknown)
    );
}

#[tokio::test]
async fn test_generate_top_cut_requires_complete_swiss() {
    let engine = engine(8);
    engine.generate_swiss_round(TOURNAMENT, 1).await.unwrap();

    assert_eq!(
        tournament_error(engine.generate_top_cut(TOURNAMENT, 8).await),
        Error::SwissIncomplete { pending: 4 }
    );
    assert_eq!(
        tournament_error(engine.generate_top_cut(TOURNAMENT, 6).await),
        Error::InvalidCutSize(6)
    );
    assert!(matches(&engine, Stage::TopCut).await.is_empty());
}

#[tokio::test]
async fn test_generate_top_cut_8() {
    let engine = engine(10);
    play_swiss(&engine, 3).await;

    let ranked = standings(&engine).await;
    let seeded = engine.generate_top_cut(TOURNAMENT, 8).await.unwrap();

    assert_eq!(seeded.len(), 4);
    assert!(seeded
        .iter()
        .all(|m| m.kind == MatchKind::Standard && m.round == 1 && m.stage == Stage::TopCut));

    assert_eq!(seeded[0].participant_a, ranked[0]);
    assert_eq!(seeded[0].participant_b, Some(ranked[7]));

    // The two best seeds are in opposite halves of the bracket.
    let half = |id| seeded.iter().find(|m| m.involves(id)).unwrap().match_number <= 2;
    assert!(half(ranked[0]));
    assert!(!half(ranked[1]));

    // Ranks 9 and 10 did not qualify.
    assert!(!involved(&seeded).contains(&ranked[8]));
    assert!(!involved(&seeded).contains(&ranked[9]));

    assert_eq!(progress(&engine).await, Progress::top_cut(1, 8));

    assert_eq!(
        tournament_error(engine.generate_top_cut(TOURNAMENT, 8).await),
        Error::RoundAlreadyGenerated {
            stage: Stage::TopCut,
            round: 1
        }
    );
    assert_eq!(
        tournament_error(engine.generate_swiss_round(TOURNAMENT, 4).await),
        Error::SwissStageClosed
    );
}

#[tokio::test]
async fn test_generate_top_cut_12() {
    let engine = engine(16);
    play_swiss(&engine, 2).await;

    let ranked = standings(&engine).await;
    let seeded = engine.generate_top_cut(TOURNAMENT, 12).await.unwrap();

    assert_eq!(seeded.len(), 8);

    let byes: Vec<_> = seeded.iter().filter(|m| m.is_bye()).collect();
    assert_eq!(byes.len(), 4);
    for bye in &byes {
        assert_eq!(bye.kind, MatchKind::Bye);
        assert_eq!(bye.status, MatchStatus::Complete);
        assert!(ranked[..4].contains(&bye.participant_a));
    }

    assert_eq!(seeded.iter().filter(|m| !m.is_settled()).count(), 4);
}

#[tokio::test]
async fn test_generate_top_cut_skips_dropped() {
    let engine = engine(6);
    play_swiss(&engine, 1).await;

    let ranked = standings(&engine).await;
    engine.drop_participant(ranked[0]).await.unwrap();

    let seeded = engine.generate_top_cut(TOURNAMENT, 4).await.unwrap();
    assert_eq!(involved(&seeded).len(), 4);
    assert!(!involved(&seeded).contains(&ranked[0]));
    assert_eq!(seeded[0].participant_a, ranked[1]);
}

#[tokio::test]
async fn test_advance_bracket_4() {
    let engine = engine(4);
    play_swiss(&engine, 1).await;

    assert_eq!(
        tournament_error(engine.advance_bracket(TOURNAMENT).await),
        Error::TopCutNotStarted
    );

    engine.generate_top_cut(TOURNAMENT, 4).await.unwrap();
    assert_eq!(
        tournament_error(engine.advance_bracket(TOURNAMENT).await),
        Error::RoundIncomplete {
            round: 1,
            pending: 2
        }
    );

    play(&engine, Stage::TopCut, 1).await;
    let semifinals = round(&engine, Stage::TopCut, 1).await;

    let finals = engine.advance_bracket(TOURNAMENT).await.unwrap();
    assert_eq!(finals.len(), 2);

    let grand_final = &finals[0];
    assert_eq!(grand_final.kind, MatchKind::GrandFinal);
    assert_eq!((grand_final.round, grand_final.match_number), (2, 1));
    assert_eq!(grand_final.target_points, 7);
    assert_eq!(grand_final.participant_a, semifinals[0].winner.unwrap());
    assert_eq!(grand_final.participant_b, semifinals[1].winner);

    let third_place = &finals[1];
    assert_eq!(third_place.kind, MatchKind::ThirdPlace);
    assert_eq!((third_place.round, third_place.match_number), (2, 2));
    assert_eq!(third_place.target_points, 4);
    assert_eq!(third_place.participant_a, semifinals[0].loser().unwrap());
    assert_eq!(third_place.participant_b, semifinals[1].loser());

    assert_eq!(progress(&engine).await, Progress::top_cut(2, 4));
    assert_eq!(
        tournament_error(engine.advance_bracket(TOURNAMENT).await),
        Error::BracketComplete
    );

    // The grand final cannot end in a draw.
    assert_eq!(
        tournament_error(engine.record_result(grand_final.id, 3, 3).await),
        Error::DrawNotAllowed(grand_final.id)
    );
}

#[tokio::test]
async fn test_advance_bracket_8() {
    let engine = engine(8);
    play_swiss(&engine, 2).await;
    engine.generate_top_cut(TOURNAMENT, 8).await.unwrap();

    play(&engine, Stage::TopCut, 1).await;
    let semifinals = engine.advance_bracket(TOURNAMENT).await.unwrap();
    assert_eq!(semifinals.len(), 2);
    assert!(semifinals.iter().all(|m| m.kind == MatchKind::Standard));

    play(&engine, Stage::TopCut, 2).await;
    let finals = engine.advance_bracket(TOURNAMENT).await.unwrap();
    assert_eq!(
        finals.iter().map(|m| m.kind).collect::<Vec<_>>(),
        vec![MatchKind::GrandFinal, MatchKind::ThirdPlace]
    );
    assert_eq!(progress(&engine).await, Progress::top_cut(3, 8));
}

#[tokio::test]
async fn test_promote_corrected_result() {
    let engine = engine(8);
    play_swiss(&engine, 1).await;
    engine.generate_top_cut(TOURNAMENT, 8).await.unwrap();
    play(&engine, Stage::TopCut, 1).await;
    engine.advance_bracket(TOURNAMENT).await.unwrap();

    let first = round(&engine, Stage::TopCut, 1).await[1].clone();
    let previous = first.winner.unwrap();

    // Correct the result of match 2, which feeds slot B of semifinal 1.
    let corrected = engine
        .record_result(first.id, first.score_b, first.score_a)
        .await
        .unwrap();
    let winner = corrected.winner.unwrap();
    assert_ne!(winner, previous);

    let semifinal = round(&engine, Stage::TopCut, 2).await.remove(0);
    assert_eq!(semifinal.participant_b, Some(winner));

    // Promoting again changes nothing.
    let before = matches(&engine, Stage::TopCut).await;
    engine.promote_winner_to_next_round(first.id).await.unwrap();
    engine.promote_winner_to_next_round(first.id).await.unwrap();
    assert_eq!(matches(&engine, Stage::TopCut).await, before);

    // Pending matches have nothing to promote.
    engine.promote_winner_to_next_round(semifinal.id).await.unwrap();
    assert_eq!(matches(&engine, Stage::TopCut).await, before);

    // Once the semifinal is played the correction is rejected without writing anything.
    play(&engine, Stage::TopCut, 2).await;
    assert_eq!(
        tournament_error(
            engine
                .record_result(first.id, first.score_a, first.score_b)
                .await
        ),
        Error::SuccessorSettled {
            round: 2,
            match_number: 1
        }
    );
    assert_eq!(
        engine.store().get_match(first.id).await.unwrap(),
        Some(corrected)
    );
}

#[tokio::test]
async fn test_promote_semifinal_feeds_third_place() {
    let engine = engine(4);
    play_swiss(&engine, 1).await;
    engine.generate_top_cut(TOURNAMENT, 4).await.unwrap();
    play(&engine, Stage::TopCut, 1).await;
    engine.advance_bracket(TOURNAMENT).await.unwrap();

    let semifinal = round(&engine, Stage::TopCut, 1).await[0].clone();
    let corrected = engine
        .record_result(semifinal.id, semifinal.score_b, semifinal.score_a)
        .await
        .unwrap();

    let finals = round(&engine, Stage::TopCut, 2).await;
    assert_eq!(finals[0].participant_a, corrected.winner.unwrap());
    assert_eq!(finals[1].participant_a, corrected.loser().unwrap());

    // Matches of the finals round feed nothing.
    let before = matches(&engine, Stage::TopCut).await;
    engine.record_result(finals[0].id, 7, 5).await.unwrap();
    engine.promote_winner_to_next_round(finals[0].id).await.unwrap();

    let after = matches(&engine, Stage::TopCut).await;
    assert_eq!(after.len(), before.len());
    assert_eq!(after[3], finals[1]);
}

#[tokio::test]
async fn test_promote_rejects() {
    let engine = engine(4);
    let generated = engine.generate_swiss_round(TOURNAMENT, 1).await.unwrap();

    let swiss = generated.matches[0].id;
    assert_eq!(
        tournament_error(engine.promote_winner_to_next_round(swiss).await),
        Error::NotBracketMatch(swiss)
    );

    let unknown = swisscut_core::MatchId(42);
    assert_eq!(
        tournament_error(engine.promote_winner_to_next_round(unknown).await),
        Error::MatchNotFound(unknown)
    );
}

#[tokio::test]
async fn test_drop_in_top_cut() {
    let engine = engine(4);
    play_swiss(&engine, 1).await;
    let seeded = engine.generate_top_cut(TOURNAMENT, 4).await.unwrap();

    // The top seed walks out of its semifinal.
    let semifinal = &seeded[0];
    let resolved = engine
        .drop_participant(semifinal.participant_a)
        .await
        .unwrap();
    assert_eq!(resolved.len(), 1);
    assert_eq!(resolved[0].winner, semifinal.participant_b);

    play(&engine, Stage::TopCut, 1).await;
    let other = round(&engine, Stage::TopCut, 1).await[1].clone();

    let finals = engine.advance_bracket(TOURNAMENT).await.unwrap();
    assert_eq!(finals[0].participant_a, semifinal.participant_b.unwrap());
    assert_eq!(finals[0].status, MatchStatus::Pending);

    // The dropped semifinal loser forfeits the third place decider.
    let third_place = &finals[1];
    assert_eq!(third_place.participant_a, semifinal.participant_a);
    assert_eq!(third_place.status, MatchStatus::Complete);
    assert_eq!(third_place.winner, other.loser());
}
