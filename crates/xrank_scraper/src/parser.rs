//! Node → record translation. Pure, no I/O.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, NaiveDateTime, Utc};
use splatnet_query::{path, QueryResponse};

use crate::model::{RankedPlayer, ScheduleRecord, StagePair};
use crate::{Result, ScrapeError};

const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Upstream ids look like base64("XRankingPlayerData-a:5:1706745600:u-qwertyuiop").
/// Only the last segment is stable across seasons, so that is the key we keep.
pub fn decode_player_id(raw: &str) -> Result<String> {
    let malformed = || ScrapeError::MalformedId { value: raw.to_string() };

    let bytes = BASE64.decode(raw).map_err(|_| malformed())?;
    let decoded = String::from_utf8(bytes).map_err(|_| malformed())?;
    decoded
        .rsplit(':')
        .next()
        .map(str::to_string)
        .ok_or_else(malformed)
}

pub fn parse_player(node: &QueryResponse) -> Result<RankedPlayer> {
    Ok(RankedPlayer {
        id: decode_player_id(node.str_at(path!["id"])?)?,
        name: node.str_at(path!["name"])?.to_string(),
        name_id: node.str_at(path!["nameId"])?.to_string(),
        rank: node.i64_at(path!["rank"])?,
        x_power: node.f64_at(path!["xPower"])?,
        weapon: node.str_at(path!["weapon", "name"])?.to_string(),
        weapon_id: node.str_at(path!["weapon", "id"])?.to_string(),
        weapon_sub: node.str_at(path!["weapon", "subWeapon", "name"])?.to_string(),
        weapon_sub_id: node.str_at(path!["weapon", "subWeapon", "id"])?.to_string(),
        weapon_special: node.str_at(path!["weapon", "specialWeapon", "name"])?.to_string(),
        weapon_special_id: node.str_at(path!["weapon", "specialWeapon", "id"])?.to_string(),
    })
}

/// All `edges[*].node` entries of one leaderboard connection.
pub fn parse_player_edges(connection: &QueryResponse) -> Result<Vec<RankedPlayer>> {
    connection
        .array_at(path!["edges"])?
        .iter()
        .map(|edge| -> Result<RankedPlayer> { parse_player(&edge.node(path!["node"])?) })
        .collect()
}

/// Exact `YYYY-MM-DDTHH:MM:SSZ`, nothing else.
pub fn parse_time(raw: &str) -> Result<DateTime<Utc>> {
    let malformed = || ScrapeError::MalformedTimestamp { value: raw.to_string() };

    // chrono skips padding and signs and accepts second 60, so pin the shape first
    if !has_time_shape(raw.as_bytes()) || &raw[17..19] == "60" {
        return Err(malformed());
    }
    NaiveDateTime::parse_from_str(raw, TIME_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|_| malformed())
}

fn has_time_shape(bytes: &[u8]) -> bool {
    bytes.len() == TIME_SHAPE.len()
        && bytes.iter().zip(TIME_SHAPE).all(|(&b, &want)| match want {
            b'0' => b.is_ascii_digit(),
            sep => b == sep,
        })
}

const TIME_SHAPE: &[u8; 20] = b"0000-00-00T00:00:00Z";

pub fn parse_schedule_entry(node: &QueryResponse) -> Result<ScheduleRecord> {
    let start_time = parse_time(node.str_at(path!["startTime"])?)?;
    let end_time = parse_time(node.str_at(path!["endTime"])?)?;

    if node.is_null_at(path!["xMatchSetting"])? {
        return Ok(ScheduleRecord::splatfest(start_time, end_time));
    }

    let setting = node.node(path!["xMatchSetting"])?;
    let stages = StagePair {
        stage_1_id: setting.i64_at(path!["vsStages", 0, "vsStageId"])?,
        stage_1_name: setting.str_at(path!["vsStages", 0, "name"])?.to_string(),
        stage_2_id: setting.i64_at(path!["vsStages", 1, "vsStageId"])?,
        stage_2_name: setting.str_at(path!["vsStages", 1, "name"])?.to_string(),
    };

    Ok(ScheduleRecord {
        start_time,
        end_time,
        splatfest: false,
        mode: Some(setting.str_at(path!["vsRule", "name"])?.to_string()),
        stages: Some(stages),
    })
}
