#![allow(dead_code)]

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::{json, Value};
use splatnet_query::{QueryClient, QueryError, QueryResponse};
use std::sync::Mutex;

use xrank_scraper::{PlayerRecord, ScheduleRecord, XRankStore};

pub fn at(h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, h, m, 0).unwrap()
}

/// Upstream stand-in. Every leaderboard page is `steps` cursor hops long and
/// each hop yields `per_step` players.
pub struct ScriptedClient {
    pub steps: usize,
    pub per_step: usize,
    pub schedule: Value,
    pub fail_on: Option<String>,
    pub calls: Mutex<Vec<(String, Value)>>,
}

impl ScriptedClient {
    pub fn new(steps: usize, per_step: usize) -> Self {
        Self {
            steps,
            per_step,
            schedule: default_schedule(),
            fail_on: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn detail_calls(&self) -> Vec<Value> {
        self.calls()
            .into_iter()
            .filter(|(name, _)| name.starts_with("DetailTabView"))
            .map(|(_, vars)| vars)
            .collect()
    }

    fn leaderboard(&self, name: &str, vars: &Value) -> Value {
        let mode = name
            .trim_start_matches("DetailTabViewXRanking")
            .trim_end_matches("RefetchQuery");
        let season = vars["id"].as_str().unwrap();
        let page = vars["page"].as_u64().unwrap();
        let step = match vars["cursor"].as_str() {
            None => 0,
            Some(c) => c.trim_start_matches('c').parse::<usize>().unwrap(),
        };

        let edges: Vec<Value> = (0..self.per_step)
            .map(|i| {
                let raw = format!("XRankingPlayerData-a:{season}:{page}:u-{season}-{mode}-{page}-{step}-{i}");
                json!({ "node": player_node(&BASE64.encode(raw), (step * self.per_step + i + 1) as i64) })
            })
            .collect();

        let has_next = step + 1 < self.steps;
        json!({
            "node": {
                format!("xRanking{mode}"): {
                    "edges": edges,
                    "pageInfo": {
                        "hasNextPage": has_next,
                        "endCursor": if has_next { Value::from(format!("c{}", step + 1)) } else { Value::Null },
                    }
                }
            }
        })
    }
}

#[async_trait]
impl QueryClient for ScriptedClient {
    async fn query(&self, name: &str, variables: Value) -> Result<QueryResponse, QueryError> {
        self.calls.lock().unwrap().push((name.to_string(), variables.clone()));

        if self.fail_on.as_deref() == Some(name) {
            return Err(QueryError::Status { status: 503, body: "maintenance".to_string() });
        }

        let data = match name {
            "XRankingQuery" => {
                let region = variables["region"].as_str().unwrap();
                json!({ "xRanking": { "currentSeason": { "id": format!("season-{region}") } } })
            }
            "StageScheduleQuery" => self.schedule.clone(),
            n if n.starts_with("DetailTabViewXRanking") => self.leaderboard(n, &variables),
            other => panic!("unexpected query {other}"),
        };
        Ok(QueryResponse::new(data))
    }
}

pub fn player_node(raw_id: &str, rank: i64) -> Value {
    json!({
        "id": raw_id,
        "name": "Inkling",
        "nameId": "1234",
        "rank": rank,
        "xPower": 3000.5,
        "weapon": {
            "id": "V2VhcG9uLTQw",
            "name": "Splattershot Pro",
            "subWeapon": { "id": "U3ViV2VhcG9uLTI=", "name": "Angle Shooter" },
            "specialWeapon": { "id": "U3BlY2lhbFdlYXBvbi0xMw==", "name": "Crab Tank" }
        }
    })
}

fn rotation(start: &str, end: &str, rule: &str) -> Value {
    json!({
        "startTime": start,
        "endTime": end,
        "xMatchSetting": {
            "vsRule": { "name": rule },
            "vsStages": [
                { "vsStageId": 1, "name": "Scorch Gorge" },
                { "vsStageId": 2, "name": "Eeltail Alley" }
            ]
        }
    })
}

/// 12:00-14:00 Splat Zones, 14:00-16:00 Clam Blitz, 16:00-18:00 Splatfest.
pub fn default_schedule() -> Value {
    json!({
        "xSchedules": {
            "nodes": [
                rotation("2024-01-01T12:00:00Z", "2024-01-01T14:00:00Z", "Splat Zones"),
                rotation("2024-01-01T14:00:00Z", "2024-01-01T16:00:00Z", "Clam Blitz"),
                { "startTime": "2024-01-01T16:00:00Z", "endTime": "2024-01-01T18:00:00Z", "xMatchSetting": null }
            ]
        }
    })
}

/// Vec-backed store with the same selection rules as the SQLite one.
#[derive(Default)]
pub struct MemoryStore {
    pub players: Vec<PlayerRecord>,
    pub rotations: Vec<ScheduleRecord>,
}

impl XRankStore for MemoryStore {
    fn ensure_player_table(&self) -> xrank_scraper::Result<()> {
        Ok(())
    }

    fn ensure_schedule_table(&self) -> xrank_scraper::Result<()> {
        Ok(())
    }

    fn upsert_players(&mut self, players: &[PlayerRecord]) -> xrank_scraper::Result<usize> {
        let before = self.players.len();
        for p in players {
            let dup = self.players.iter().any(|q| {
                q.timestamp == p.timestamp && q.id == p.id && q.mode == p.mode && q.region == p.region
            });
            if !dup {
                self.players.push(p.clone());
            }
        }
        Ok(self.players.len() - before)
    }

    fn upsert_schedules(&mut self, rotations: &[ScheduleRecord]) -> xrank_scraper::Result<usize> {
        let before = self.rotations.len();
        for r in rotations {
            let dup = self
                .rotations
                .iter()
                .any(|q| q.start_time == r.start_time && q.end_time == r.end_time);
            if !dup {
                self.rotations.push(r.clone());
            }
        }
        Ok(self.rotations.len() - before)
    }

    fn current_rotation(&self, now: DateTime<Utc>) -> xrank_scraper::Result<Option<ScheduleRecord>> {
        Ok(self
            .rotations
            .iter()
            .filter(|r| r.contains(now))
            .max_by_key(|r| r.end_time)
            .cloned())
    }

    fn previous_rotation(&self, now: DateTime<Utc>) -> xrank_scraper::Result<Option<ScheduleRecord>> {
        Ok(self
            .rotations
            .iter()
            .filter(|r| r.end_time <= now)
            .max_by_key(|r| r.end_time)
            .cloned())
    }
}
