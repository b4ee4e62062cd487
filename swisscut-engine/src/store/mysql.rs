use std::time::Duration;

use futures::TryStreamExt;
use sqlx::mysql::{MySqlPool, MySqlRow};
use sqlx::pool::PoolOptions;
use sqlx::{MySql, Row, Transaction};
use swisscut_core::{
    Match, MatchId, MatchKey, MatchKind, MatchStatus, Metadata, Participant, ParticipantId,
    Progress, Round, RoundId, RoundStatus, Stage, Tournament, TournamentConfig, TournamentId,
};

use super::{id, Generated, Generation, Store, StoreError};
use crate::config::Database;

/// SQLSTATE class of integrity constraint violations, returned for duplicate keys.
const INTEGRITY_VIOLATION: &str = "23000";

const MATCH_COLUMNS: &str = "id, tournament_id, stage, round_number, match_number, round_id, \
    kind, participant_a, participant_b, score_a, score_b, target_points, status, winner_id, \
    metadata";

/// A [`Store`] backed by a MySQL database. All tables share the configured prefix.
#[derive(Clone, Debug)]
pub struct MySqlStore {
    pub pool: MySqlPool,
    pub table_prefix: String,
}

impl MySqlStore {
    pub async fn connect(config: &Database) -> Result<Self, StoreError> {
        let pool: MySqlPool = PoolOptions::new()
            .max_connections(8)
            .max_lifetime(Duration::new(3600, 0))
            .idle_timeout(Duration::new(60, 0))
            .connect(&config.connect_string())
            .await?;

        Ok(Self {
            pool,
            table_prefix: config.prefix.clone(),
        })
    }

    /// Creates all tables that don't exist yet.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        let prefix = &self.table_prefix;

        let statements = [
            format!(
                "CREATE TABLE IF NOT EXISTS {prefix}tournaments (
                    id BIGINT UNSIGNED PRIMARY KEY,
                    match_target_points INT UNSIGNED NOT NULL DEFAULT 4,
                    final_target_points INT UNSIGNED NOT NULL DEFAULT 7,
                    swiss_rounds INT UNSIGNED NOT NULL DEFAULT 5,
                    cut_size INT UNSIGNED NOT NULL DEFAULT 8,
                    current_stage TINYINT UNSIGNED NULL,
                    current_round INT UNSIGNED NOT NULL DEFAULT 0,
                    active_cut_size INT UNSIGNED NULL
                )"
            ),
            format!(
                "CREATE TABLE IF NOT EXISTS {prefix}participants (
                    id BIGINT UNSIGNED PRIMARY KEY,
                    tournament_id BIGINT UNSIGNED NOT NULL,
                    name TEXT NOT NULL,
                    dropped BOOLEAN NOT NULL DEFAULT FALSE,
                    checked_in BOOLEAN NOT NULL DEFAULT FALSE,
                    user_id BIGINT UNSIGNED NULL,
                    INDEX (tournament_id)
                )"
            ),
            format!(
                "CREATE TABLE IF NOT EXISTS {prefix}rounds (
                    id BIGINT UNSIGNED PRIMARY KEY,
                    tournament_id BIGINT UNSIGNED NOT NULL,
                    round_number INT UNSIGNED NOT NULL,
                    status TINYINT UNSIGNED NOT NULL,
                    UNIQUE KEY (tournament_id, round_number)
                )"
            ),
            format!(
                "CREATE TABLE IF NOT EXISTS {prefix}matches (
                    id BIGINT UNSIGNED PRIMARY KEY,
                    tournament_id BIGINT UNSIGNED NOT NULL,
                    stage TINYINT UNSIGNED NOT NULL,
                    round_number INT UNSIGNED NOT NULL,
                    match_number INT UNSIGNED NOT NULL,
                    round_id BIGINT UNSIGNED NULL,
                    kind TINYINT UNSIGNED NOT NULL,
                    participant_a BIGINT UNSIGNED NOT NULL,
                    participant_b BIGINT UNSIGNED NULL,
                    score_a INT UNSIGNED NOT NULL,
                    score_b INT UNSIGNED NOT NULL,
                    target_points INT UNSIGNED NOT NULL,
                    status TINYINT UNSIGNED NOT NULL,
                    winner_id BIGINT UNSIGNED NULL,
                    metadata BLOB NOT NULL,
                    UNIQUE KEY (tournament_id, stage, round_number, match_number)
                )"
            ),
        ];

        for sql in statements {
            sqlx::query(&sql).execute(&self.pool).await?;
        }

        Ok(())
    }

    async fn insert_match(
        &self,
        tx: &mut Transaction<'_, MySql>,
        r#match: &Match,
    ) -> Result<(), StoreError> {
        sqlx::query(&format!(
            "INSERT INTO {}matches ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            self.table_prefix, MATCH_COLUMNS
        ))
        .bind(r#match.id.0)
        .bind(r#match.tournament_id.0)
        .bind(r#match.stage.to_u8())
        .bind(r#match.round)
        .bind(r#match.match_number)
        .bind(r#match.round_id.map(|id| id.0))
        .bind(r#match.kind.to_u8())
        .bind(r#match.participant_a.0)
        .bind(r#match.participant_b.map(|id| id.0))
        .bind(r#match.score_a)
        .bind(r#match.score_b)
        .bind(r#match.target_points)
        .bind(r#match.status.to_u8())
        .bind(r#match.winner.map(|id| id.0))
        .bind(serde_json::to_vec(&r#match.metadata)?)
        .execute(&mut *tx)
        .await
        .map_err(conflict)?;

        Ok(())
    }
}

impl Store for MySqlStore {
    async fn get_tournament(&self, id: TournamentId) -> Result<Option<Tournament>, StoreError> {
        let row = match sqlx::query(&format!(
            "SELECT match_target_points, final_target_points, swiss_rounds, cut_size, \
                current_stage, current_round, active_cut_size FROM {}tournaments WHERE id = ?",
            self.table_prefix
        ))
        .bind(id.0)
        .fetch_one(&self.pool)
        .await
        {
            Ok(v) => v,
            Err(sqlx::Error::RowNotFound) => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        Ok(Some(Tournament {
            id,
            config: TournamentConfig {
                match_target_points: row.try_get("match_target_points")?,
                final_target_points: row.try_get("final_target_points")?,
                swiss_rounds: row.try_get("swiss_rounds")?,
                cut_size: row.try_get("cut_size")?,
            },
            progress: progress_from_row(&row)?,
        }))
    }

    async fn get_participants(
        &self,
        tournament_id: TournamentId,
    ) -> Result<Vec<Participant>, StoreError> {
        let sql = format!(
            "SELECT id, tournament_id, name, dropped, checked_in, user_id FROM {}participants \
                WHERE tournament_id = ? ORDER BY id",
            self.table_prefix
        );

        let mut rows = sqlx::query(&sql).bind(tournament_id.0).fetch(&self.pool);

        let mut participants = Vec::new();
        while let Some(row) = rows.try_next().await? {
            participants.push(participant_from_row(&row)?);
        }

        Ok(participants)
    }

    async fn get_participant(&self, id: ParticipantId) -> Result<Option<Participant>, StoreError> {
        let row = match sqlx::query(&format!(
            "SELECT id, tournament_id, name, dropped, checked_in, user_id FROM {}participants \
                WHERE id = ?",
            self.table_prefix
        ))
        .bind(id.0)
        .fetch_one(&self.pool)
        .await
        {
            Ok(v) => v,
            Err(sqlx::Error::RowNotFound) => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        Ok(Some(participant_from_row(&row)?))
    }

    async fn drop_participant(&self, id: ParticipantId) -> Result<(), StoreError> {
        let res = sqlx::query(&format!(
            "UPDATE {}participants SET dropped = TRUE WHERE id = ?",
            self.table_prefix
        ))
        .bind(id.0)
        .execute(&self.pool)
        .await?;

        // Affected rows only count changed rows, an already dropped participant reports 0.
        if res.rows_affected() == 0 && self.get_participant(id).await?.is_none() {
            return Err(StoreError::NotFound("participant"));
        }

        Ok(())
    }

    async fn get_matches(
        &self,
        tournament_id: TournamentId,
        stage: Stage,
    ) -> Result<Vec<Match>, StoreError> {
        let sql = format!(
            "SELECT {} FROM {}matches WHERE tournament_id = ? AND stage = ? \
                ORDER BY round_number, match_number",
            MATCH_COLUMNS, self.table_prefix
        );

        let mut rows = sqlx::query(&sql)
            .bind(tournament_id.0)
            .bind(stage.to_u8())
            .fetch(&self.pool);

        let mut matches = Vec::new();
        while let Some(row) = rows.try_next().await? {
            matches.push(match_from_row(&row)?);
        }

        Ok(matches)
    }

    async fn get_match(&self, id: MatchId) -> Result<Option<Match>, StoreError> {
        let row = match sqlx::query(&format!(
            "SELECT {} FROM {}matches WHERE id = ?",
            MATCH_COLUMNS, self.table_prefix
        ))
        .bind(id.0)
        .fetch_one(&self.pool)
        .await
        {
            Ok(v) => v,
            Err(sqlx::Error::RowNotFound) => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        Ok(Some(match_from_row(&row)?))
    }

    async fn find_match(&self, key: MatchKey) -> Result<Option<Match>, StoreError> {
        let row = match sqlx::query(&format!(
            "SELECT {} FROM {}matches WHERE tournament_id = ? AND stage = ? AND round_number = ? \
                AND match_number = ?",
            MATCH_COLUMNS, self.table_prefix
        ))
        .bind(key.tournament_id.0)
        .bind(key.stage.to_u8())
        .bind(key.round)
        .bind(key.match_number)
        .fetch_one(&self.pool)
        .await
        {
            Ok(v) => v,
            Err(sqlx::Error::RowNotFound) => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        Ok(Some(match_from_row(&row)?))
    }

    async fn update_match(&self, r#match: &Match) -> Result<(), StoreError> {
        sqlx::query(&format!(
            "UPDATE {}matches SET kind = ?, participant_a = ?, participant_b = ?, score_a = ?, \
                score_b = ?, status = ?, winner_id = ?, metadata = ? WHERE id = ?",
            self.table_prefix
        ))
        .bind(r#match.kind.to_u8())
        .bind(r#match.participant_a.0)
        .bind(r#match.participant_b.map(|id| id.0))
        .bind(r#match.score_a)
        .bind(r#match.score_b)
        .bind(r#match.status.to_u8())
        .bind(r#match.winner.map(|id| id.0))
        .bind(serde_json::to_vec(&r#match.metadata)?)
        .bind(r#match.id.0)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_round(
        &self,
        tournament_id: TournamentId,
        round_number: u32,
    ) -> Result<Option<Round>, StoreError> {
        let row = match sqlx::query(&format!(
            "SELECT id, status FROM {}rounds WHERE tournament_id = ? AND round_number = ?",
            self.table_prefix
        ))
        .bind(tournament_id.0)
        .bind(round_number)
        .fetch_one(&self.pool)
        .await
        {
            Ok(v) => v,
            Err(sqlx::Error::RowNotFound) => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        let status = RoundStatus::from_u8(row.try_get("status")?)
            .ok_or(StoreError::Corrupt("round status"))?;

        Ok(Some(Round {
            id: RoundId(row.try_get("id")?),
            tournament_id,
            round_number,
            status,
        }))
    }

    async fn complete_round(&self, id: RoundId) -> Result<(), StoreError> {
        sqlx::query(&format!(
            "UPDATE {}rounds SET status = ? WHERE id = ?",
            self.table_prefix
        ))
        .bind(RoundStatus::Complete.to_u8())
        .bind(id.0)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn insert_generation(&self, generation: Generation) -> Result<Generated, StoreError> {
        let mut tx = self.pool.begin().await?;

        // Locks the tournament row until the transaction ends, concurrent generations for the
        // same tournament queue up here.
        let row = sqlx::query(&format!(
            "SELECT current_stage, current_round, active_cut_size FROM {}tournaments \
                WHERE id = ? FOR UPDATE",
            self.table_prefix
        ))
        .bind(generation.tournament_id.0)
        .fetch_optional(&mut tx)
        .await?;

        let Some(row) = row else {
            return Err(StoreError::NotFound("tournament"));
        };

        if progress_from_row(&row)? != generation.expected {
            return Err(StoreError::Conflict);
        }

        let row = sqlx::query(&format!(
            "SELECT COUNT(*) AS count FROM {}matches WHERE tournament_id = ? AND stage = ? \
                AND round_number = ?",
            self.table_prefix
        ))
        .bind(generation.tournament_id.0)
        .bind(generation.stage.to_u8())
        .bind(generation.round)
        .fetch_one(&mut tx)
        .await?;

        let count: i64 = row.try_get("count")?;
        if count > 0 {
            return Err(StoreError::Conflict);
        }

        let swiss_round = match generation.swiss_round {
            Some(mut round) => {
                round.id = RoundId(id::ROUND.generate());

                sqlx::query(&format!(
                    "INSERT INTO {}rounds (id, tournament_id, round_number, status) \
                        VALUES (?, ?, ?, ?)",
                    self.table_prefix
                ))
                .bind(round.id.0)
                .bind(round.tournament_id.0)
                .bind(round.round_number)
                .bind(round.status.to_u8())
                .execute(&mut tx)
                .await
                .map_err(conflict)?;

                Some(round)
            }
            None => None,
        };

        let mut matches = Vec::with_capacity(generation.matches.len());
        for mut r#match in generation.matches {
            r#match.id = MatchId(id::MATCH.generate());
            r#match.round_id = swiss_round.as_ref().map(|round| round.id);

            self.insert_match(&mut tx, &r#match).await?;
            matches.push(r#match);
        }

        let progress = generation.progress;
        sqlx::query(&format!(
            "UPDATE {}tournaments SET current_stage = ?, current_round = ?, active_cut_size = ? \
                WHERE id = ?",
            self.table_prefix
        ))
        .bind(progress.stage.map(Stage::to_u8))
        .bind(progress.round)
        .bind(progress.cut_size)
        .bind(generation.tournament_id.0)
        .execute(&mut tx)
        .await?;

        tx.commit().await?;

        Ok(Generated {
            swiss_round,
            matches,
        })
    }
}

/// Maps duplicate key errors to [`StoreError::Conflict`].
fn conflict(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        if db.code().as_deref() == Some(INTEGRITY_VIOLATION) {
            return StoreError::Conflict;
        }
    }

    StoreError::Sqlx(err)
}

fn progress_from_row(row: &MySqlRow) -> Result<Progress, StoreError> {
    let stage = match row.try_get::<Option<u8>, _>("current_stage")? {
        Some(stage) => Some(Stage::from_u8(stage).ok_or(StoreError::Corrupt("stage"))?),
        None => None,
    };

    Ok(Progress {
        stage,
        round: row.try_get("current_round")?,
        cut_size: row.try_get("active_cut_size")?,
    })
}

fn participant_from_row(row: &MySqlRow) -> Result<Participant, StoreError> {
    Ok(Participant {
        id: ParticipantId(row.try_get("id")?),
        tournament_id: TournamentId(row.try_get("tournament_id")?),
        name: row.try_get("name")?,
        dropped: row.try_get("dropped")?,
        checked_in: row.try_get("checked_in")?,
        user_id: row.try_get("user_id")?,
    })
}

fn match_from_row(row: &MySqlRow) -> Result<Match, StoreError> {
    let stage = Stage::from_u8(row.try_get("stage")?).ok_or(StoreError::Corrupt("stage"))?;
    let kind =
        MatchKind::from_u8(row.try_get("kind")?).ok_or(StoreError::Corrupt("match kind"))?;
    let status =
        MatchStatus::from_u8(row.try_get("status")?).ok_or(StoreError::Corrupt("match status"))?;

    let metadata: Vec<u8> = row.try_get("metadata")?;
    let metadata: Metadata = serde_json::from_slice(&metadata)?;

    Ok(Match {
        id: MatchId(row.try_get("id")?),
        tournament_id: TournamentId(row.try_get("tournament_id")?),
        stage,
        round: row.try_get("round_number")?,
        match_number: row.try_get("match_number")?,
        round_id: row.try_get::<Option<u64>, _>("round_id")?.map(RoundId),
        kind,
        participant_a: ParticipantId(row.try_get("participant_a")?),
        participant_b: row
            .try_get::<Option<u64>, _>("participant_b")?
            .map(ParticipantId),
        score_a: row.try_get("score_a")?,
        score_b: row.try_get("score_b")?,
        target_points: row.try_get("target_points")?,
        status,
        winner: row.try_get::<Option<u64>, _>("winner_id")?.map(ParticipantId),
        metadata,
    })
}
