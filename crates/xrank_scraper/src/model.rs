use chrono::{DateTime, Utc};
use std::fmt;

// ── Mode / Region ────────────────────────────────────────────────────────────

/// Competitive X Battle modes. The code addresses the API, the display name is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    Ar,
    Cl,
    Gl,
    Lf,
}

impl Mode {
    pub const ALL: [Mode; 4] = [Mode::Ar, Mode::Cl, Mode::Gl, Mode::Lf];

    pub fn code(self) -> &'static str {
        match self {
            Mode::Ar => "Ar",
            Mode::Cl => "Cl",
            Mode::Gl => "Gl",
            Mode::Lf => "Lf",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Mode::Ar => "Splat Zones",
            Mode::Cl => "Clam Blitz",
            Mode::Gl => "Rainmaker",
            Mode::Lf => "Tower Control",
        }
    }

    pub fn from_code(code: &str) -> Option<Mode> {
        Mode::ALL.into_iter().find(|m| m.code() == code)
    }

    pub fn from_display_name(name: &str) -> Option<Mode> {
        Mode::ALL.into_iter().find(|m| m.display_name() == name)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Region {
    Atlantic,
    Pacific,
}

impl Region {
    pub const ALL: [Region; 2] = [Region::Atlantic, Region::Pacific];

    /// Value of the `region` query variable.
    pub fn api_name(self) -> &'static str {
        match self {
            Region::Atlantic => "ATLANTIC",
            Region::Pacific => "PACIFIC",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Region::Atlantic => "Tentatek",
            Region::Pacific => "Takoroka",
        }
    }

    pub fn from_api_name(name: &str) -> Option<Region> {
        Region::ALL.into_iter().find(|r| r.api_name() == name)
    }

    pub fn from_display_name(name: &str) -> Option<Region> {
        Region::ALL.into_iter().find(|r| r.display_name() == name)
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

// ── Records ──────────────────────────────────────────────────────────────────

/// One leaderboard edge as it comes off the wire, before run metadata is attached.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedPlayer {
    pub id: String,
    pub name: String,
    pub name_id: String,
    pub rank: i64,
    pub x_power: f64,
    pub weapon: String,
    pub weapon_id: String,
    pub weapon_sub: String,
    pub weapon_sub_id: String,
    pub weapon_special: String,
    pub weapon_special_id: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerRecord {
    pub id: String,
    pub name: String,
    pub name_id: String,
    pub rank: i64,
    pub x_power: f64,
    pub weapon: String,
    pub weapon_id: String,
    pub weapon_sub: String,
    pub weapon_sub_id: String,
    pub weapon_special: String,
    pub weapon_special_id: String,
    pub mode: Mode,
    pub region: Region,
    pub timestamp: DateTime<Utc>,
    pub rotation_start: Option<DateTime<Utc>>,
}

impl PlayerRecord {
    pub fn from_ranked(p: RankedPlayer, mode: Mode, region: Region, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: p.id,
            name: p.name,
            name_id: p.name_id,
            rank: p.rank,
            x_power: p.x_power,
            weapon: p.weapon,
            weapon_id: p.weapon_id,
            weapon_sub: p.weapon_sub,
            weapon_sub_id: p.weapon_sub_id,
            weapon_special: p.weapon_special,
            weapon_special_id: p.weapon_special_id,
            mode,
            region,
            timestamp,
            rotation_start: None,
        }
    }

    pub fn with_rotation_start(mut self, start: DateTime<Utc>) -> Self {
        self.rotation_start = Some(start);
        self
    }
}

/// A pair of stages active during one rotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagePair {
    pub stage_1_id: i64,
    pub stage_1_name: String,
    pub stage_2_id: i64,
    pub stage_2_name: String,
}

/// One rotation window, `[start_time, end_time)`.
///
/// Splatfest rotations carry no mode and no stages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleRecord {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub splatfest: bool,
    pub mode: Option<String>,
    pub stages: Option<StagePair>,
}

impl ScheduleRecord {
    pub fn splatfest(start_time: DateTime<Utc>, end_time: DateTime<Utc>) -> Self {
        Self {
            start_time,
            end_time,
            splatfest: true,
            mode: None,
            stages: None,
        }
    }

    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        self.start_time <= t && t < self.end_time
    }
}
