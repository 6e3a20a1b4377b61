//! Append-only persistence for players and rotations.

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use tracing::debug;

use crate::model::{PlayerRecord, ScheduleRecord, StagePair};
use crate::Result;

/// What the scrape orchestrator needs from storage.
///
/// Upserts skip rows whose natural key already exists and are all-or-nothing
/// per call. Both rotation lookups are read-only.
pub trait XRankStore {
    fn ensure_player_table(&self) -> Result<()>;
    fn ensure_schedule_table(&self) -> Result<()>;

    /// Returns the number of rows actually inserted.
    fn upsert_players(&mut self, players: &[PlayerRecord]) -> Result<usize>;
    fn upsert_schedules(&mut self, rotations: &[ScheduleRecord]) -> Result<usize>;

    /// Rotation with `start_time <= now < end_time`, latest `end_time` first.
    fn current_rotation(&self, now: DateTime<Utc>) -> Result<Option<ScheduleRecord>>;
    /// Latest rotation with `end_time <= now`.
    fn previous_rotation(&self, now: DateTime<Utc>) -> Result<Option<ScheduleRecord>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreCounts {
    pub players: i64,
    pub rotations: i64,
}

const PLAYERS_DDL: &str = r#"
    CREATE TABLE IF NOT EXISTS players (
        timestamp TEXT NOT NULL,
        id TEXT NOT NULL,
        mode TEXT NOT NULL,
        region TEXT NOT NULL,
        name TEXT NOT NULL,
        name_id TEXT NOT NULL,
        rank INTEGER NOT NULL,
        x_power REAL NOT NULL,
        weapon TEXT NOT NULL,
        weapon_id TEXT NOT NULL,
        weapon_sub TEXT NOT NULL,
        weapon_sub_id TEXT NOT NULL,
        weapon_special TEXT NOT NULL,
        weapon_special_id TEXT NOT NULL,
        rotation_start TEXT,
        UNIQUE(timestamp, id, mode, region)
    );

    CREATE INDEX IF NOT EXISTS idx_players_ts ON players(timestamp);
    CREATE INDEX IF NOT EXISTS idx_players_rotation ON players(rotation_start);
"#;

const SCHEDULE_DDL: &str = r#"
    CREATE TABLE IF NOT EXISTS schedule (
        start_time TEXT NOT NULL,
        end_time TEXT NOT NULL,
        splatfest INTEGER NOT NULL,
        mode TEXT,
        stage_1_id INTEGER,
        stage_1_name TEXT,
        stage_2_id INTEGER,
        stage_2_name TEXT,
        UNIQUE(start_time, end_time)
    );

    CREATE INDEX IF NOT EXISTS idx_schedule_end ON schedule(end_time);
"#;

const SCHEDULE_COLUMNS: &str =
    "start_time, end_time, splatfest, mode, stage_1_id, stage_1_name, stage_2_id, stage_2_name";

/// Fixed-width UTC text so that string order is time order.
fn db_time(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn utc_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e)))
}

fn schedule_from_row(row: &Row<'_>) -> rusqlite::Result<ScheduleRecord> {
    let splatfest: bool = row.get(2)?;
    let mode: Option<String> = row.get(3)?;
    let stage_1_id: Option<i64> = row.get(4)?;
    let stage_1_name: Option<String> = row.get(5)?;
    let stage_2_id: Option<i64> = row.get(6)?;
    let stage_2_name: Option<String> = row.get(7)?;

    let stages = match (stage_1_id, stage_1_name, stage_2_id, stage_2_name) {
        (Some(stage_1_id), Some(stage_1_name), Some(stage_2_id), Some(stage_2_name)) => Some(StagePair {
            stage_1_id,
            stage_1_name,
            stage_2_id,
            stage_2_name,
        }),
        _ => None,
    };

    Ok(ScheduleRecord {
        start_time: utc_col(row, 0)?,
        end_time: utc_col(row, 1)?,
        splatfest,
        mode,
        stages,
    })
}

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }

        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL").ok();
        conn.pragma_update(None, "synchronous", "NORMAL").ok();
        Ok(Self { conn })
    }

    /// Throwaway store, used by tests.
    pub fn in_memory() -> Result<Self> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
        })
    }

    fn has_table(&self, name: &str) -> Result<bool> {
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
                params![name],
                |r| r.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Newest scrape timestamp and the mode it was taken for.
    pub fn latest_snapshot(&self) -> Result<Option<(DateTime<Utc>, String)>> {
        if !self.has_table("players")? {
            return Ok(None);
        }
        Ok(self
            .conn
            .query_row(
                "SELECT timestamp, mode FROM players ORDER BY timestamp DESC LIMIT 1",
                [],
                |r| Ok((utc_col(r, 0)?, r.get(1)?)),
            )
            .optional()?)
    }

    pub fn counts(&self) -> Result<StoreCounts> {
        let count = |table: &str| -> Result<i64> {
            if !self.has_table(table)? {
                return Ok(0);
            }
            Ok(self
                .conn
                .query_row(&format!("SELECT COUNT(1) FROM {table}"), [], |r| r.get(0))?)
        };

        Ok(StoreCounts {
            players: count("players")?,
            rotations: count("schedule")?,
        })
    }
}

impl XRankStore for SqliteStore {
    fn ensure_player_table(&self) -> Result<()> {
        self.conn.execute_batch(PLAYERS_DDL)?;
        Ok(())
    }

    fn ensure_schedule_table(&self) -> Result<()> {
        self.conn.execute_batch(SCHEDULE_DDL)?;
        Ok(())
    }

    fn upsert_players(&mut self, players: &[PlayerRecord]) -> Result<usize> {
        let tx = self.conn.transaction()?;
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare_cached(
                r#"
                INSERT INTO players(timestamp, id, mode, region, name, name_id, rank, x_power,
                                    weapon, weapon_id, weapon_sub, weapon_sub_id,
                                    weapon_special, weapon_special_id, rotation_start)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
                ON CONFLICT(timestamp, id, mode, region) DO NOTHING
                "#,
            )?;
            for p in players {
                inserted += stmt.execute(params![
                    db_time(p.timestamp),
                    p.id,
                    p.mode.display_name(),
                    p.region.display_name(),
                    p.name,
                    p.name_id,
                    p.rank,
                    p.x_power,
                    p.weapon,
                    p.weapon_id,
                    p.weapon_sub,
                    p.weapon_sub_id,
                    p.weapon_special,
                    p.weapon_special_id,
                    p.rotation_start.map(db_time),
                ])?;
            }
        }
        // dropping an uncommitted tx rolls it back, so any `?` above leaves no rows behind
        tx.commit()?;

        debug!(received = players.len(), inserted, "players upserted");
        Ok(inserted)
    }

    fn upsert_schedules(&mut self, rotations: &[ScheduleRecord]) -> Result<usize> {
        let tx = self.conn.transaction()?;
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare_cached(&format!(
                "INSERT INTO schedule({SCHEDULE_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                 ON CONFLICT(start_time, end_time) DO NOTHING"
            ))?;
            for r in rotations {
                let stages = r.stages.as_ref();
                inserted += stmt.execute(params![
                    db_time(r.start_time),
                    db_time(r.end_time),
                    r.splatfest,
                    r.mode,
                    stages.map(|s| s.stage_1_id),
                    stages.map(|s| s.stage_1_name.as_str()),
                    stages.map(|s| s.stage_2_id),
                    stages.map(|s| s.stage_2_name.as_str()),
                ])?;
            }
        }
        tx.commit()?;

        debug!(received = rotations.len(), inserted, "rotations upserted");
        Ok(inserted)
    }

    fn current_rotation(&self, now: DateTime<Utc>) -> Result<Option<ScheduleRecord>> {
        let now = db_time(now);
        Ok(self
            .conn
            .query_row(
                &format!(
                    "SELECT {SCHEDULE_COLUMNS} FROM schedule
                     WHERE start_time <= ?1 AND end_time > ?1
                     ORDER BY end_time DESC LIMIT 1"
                ),
                params![now],
                schedule_from_row,
            )
            .optional()?)
    }

    fn previous_rotation(&self, now: DateTime<Utc>) -> Result<Option<ScheduleRecord>> {
        let now = db_time(now);
        Ok(self
            .conn
            .query_row(
                &format!(
                    "SELECT {SCHEDULE_COLUMNS} FROM schedule
                     WHERE end_time <= ?1
                     ORDER BY end_time DESC LIMIT 1"
                ),
                params![now],
                schedule_from_row,
            )
            .optional()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Mode, Region};
    use crate::ScrapeError;
    use chrono::TimeZone;
    use rstest::{fixture, rstest};

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, h, m, 0).unwrap()
    }

    fn player(id: &str, region: Region) -> PlayerRecord {
        PlayerRecord {
            id: id.to_string(),
            name: "Inkling".to_string(),
            name_id: "1234".to_string(),
            rank: 1,
            x_power: 3200.0,
            weapon: "Splattershot".to_string(),
            weapon_id: "V2VhcG9uLTQw".to_string(),
            weapon_sub: "Burst Bomb".to_string(),
            weapon_sub_id: "U3ViV2VhcG9uLTI=".to_string(),
            weapon_special: "Trizooka".to_string(),
            weapon_special_id: "U3BlY2lhbFdlYXBvbi0x".to_string(),
            mode: Mode::Ar,
            region,
            timestamp: at(14, 3),
            rotation_start: Some(at(14, 0)),
        }
    }

    fn rotation(start_h: u32, mode: &str) -> ScheduleRecord {
        ScheduleRecord {
            start_time: at(start_h, 0),
            end_time: at(start_h + 2, 0),
            splatfest: false,
            mode: Some(mode.to_string()),
            stages: Some(StagePair {
                stage_1_id: 1,
                stage_1_name: "Scorch Gorge".to_string(),
                stage_2_id: 2,
                stage_2_name: "Eeltail Alley".to_string(),
            }),
        }
    }

    #[fixture]
    fn store() -> SqliteStore {
        let store = SqliteStore::in_memory().unwrap();
        store.ensure_player_table().unwrap();
        store.ensure_schedule_table().unwrap();
        store
    }

    #[rstest]
    fn ensure_tables_is_idempotent(store: SqliteStore) {
        store.ensure_player_table().unwrap();
        store.ensure_schedule_table().unwrap();
        assert_eq!(store.counts().unwrap(), StoreCounts { players: 0, rotations: 0 });
    }

    #[rstest]
    fn duplicate_player_is_skipped(mut store: SqliteStore) {
        let p = player("u-1", Region::Atlantic);
        assert_eq!(store.upsert_players(&[p.clone()]).unwrap(), 1);
        assert_eq!(store.upsert_players(&[p.clone(), p]).unwrap(), 0);
        assert_eq!(store.counts().unwrap().players, 1);
    }

    #[rstest]
    fn same_player_in_both_regions_is_two_rows(mut store: SqliteStore) {
        let n = store
            .upsert_players(&[player("u-1", Region::Atlantic), player("u-1", Region::Pacific)])
            .unwrap();
        assert_eq!(n, 2);
        assert_eq!(store.counts().unwrap().players, 2);
    }

    #[rstest]
    fn different_scrape_timestamp_is_a_new_row(mut store: SqliteStore) {
        let first = player("u-1", Region::Atlantic);
        let mut later = first.clone();
        later.timestamp = at(14, 8);
        store.upsert_players(&[first, later]).unwrap();
        assert_eq!(store.counts().unwrap().players, 2);
    }

    #[rstest]
    fn failed_batch_leaves_nothing_behind() {
        // no tables yet, so the insert fails after the transaction opened
        let mut store = SqliteStore::in_memory().unwrap();
        assert!(store.upsert_players(&[player("u-1", Region::Atlantic)]).is_err());

        store.ensure_player_table().unwrap();
        assert_eq!(store.counts().unwrap().players, 0);
    }

    #[rstest]
    fn batch_failing_midway_rolls_back_earlier_rows(mut store: SqliteStore) {
        store
            .upsert_players(&[player("u-0", Region::Atlantic)])
            .unwrap();
        store
            .conn
            .execute_batch(
                "CREATE TRIGGER reject_u2 BEFORE INSERT ON players
                 WHEN NEW.id = 'u-2'
                 BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
            )
            .unwrap();

        let batch = [
            player("u-1", Region::Atlantic),
            player("u-2", Region::Atlantic),
            player("u-3", Region::Atlantic),
        ];
        assert!(matches!(
            store.upsert_players(&batch),
            Err(ScrapeError::Persistence(_))
        ));

        // u-1 was written inside the failed transaction and must be gone
        let ids: Vec<String> = store
            .conn
            .prepare("SELECT id FROM players ORDER BY id")
            .unwrap()
            .query_map([], |r| r.get(0))
            .unwrap()
            .collect::<rusqlite::Result<_>>()
            .unwrap();
        assert_eq!(ids, ["u-0"]);
    }

    #[rstest]
    fn schedule_round_trips_through_current_rotation(mut store: SqliteStore) {
        let rot = rotation(14, "Clam Blitz");
        assert_eq!(store.upsert_schedules(&[rot.clone()]).unwrap(), 1);
        assert_eq!(store.upsert_schedules(&[rot.clone()]).unwrap(), 0);

        assert_eq!(store.current_rotation(at(14, 0)).unwrap(), Some(rot.clone()));
        assert_eq!(store.current_rotation(at(15, 59)).unwrap(), Some(rot));
        assert_eq!(store.current_rotation(at(16, 0)).unwrap(), None);
    }

    #[rstest]
    fn splatfest_rotation_round_trips_without_mode(mut store: SqliteStore) {
        let fest = ScheduleRecord::splatfest(at(0, 0), at(2, 0));
        store.upsert_schedules(&[fest.clone()]).unwrap();
        assert_eq!(store.current_rotation(at(1, 0)).unwrap(), Some(fest));
    }

    #[rstest]
    fn previous_rotation_is_latest_ended(mut store: SqliteStore) {
        store
            .upsert_schedules(&[rotation(10, "Rainmaker"), rotation(12, "Splat Zones"), rotation(14, "Clam Blitz")])
            .unwrap();

        let prev = store.previous_rotation(at(14, 10)).unwrap().unwrap();
        assert_eq!(prev.mode.as_deref(), Some("Splat Zones"));
        assert_eq!(prev.end_time, at(14, 0));

        assert_eq!(store.previous_rotation(at(11, 0)).unwrap(), None);
    }

    #[rstest]
    fn latest_snapshot_reports_newest_timestamp(mut store: SqliteStore) {
        assert_eq!(store.latest_snapshot().unwrap(), None);

        let mut later = player("u-2", Region::Pacific);
        later.timestamp = at(16, 5);
        later.mode = Mode::Lf;
        store.upsert_players(&[player("u-1", Region::Atlantic), later]).unwrap();

        assert_eq!(
            store.latest_snapshot().unwrap(),
            Some((at(16, 5), "Tower Control".to_string()))
        );
    }
}
