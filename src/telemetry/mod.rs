pub mod provider;

use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize};

use crate::PitwallError;

pub use provider::{FileLapProvider, LapProvider};

/// One timestamped telemetry point on a lap
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct TelemetrySample {
    /// Meters traveled from S/F this lap
    pub distance: f64,
    /// Seconds elapsed since the start of the lap
    pub time: f64,
    /// Speed in km/h
    pub speed: f64,
    /// Throttle use. 0=off throttle to 100=full throttle
    pub throttle: f64,
    /// Brake use. 0=released to 100=full pedal. Boolean feeds are read as 0 or 100
    #[serde(deserialize_with = "deserialize_brake")]
    pub brake: f64,
    /// Track X coordinate, when the feed provides positions
    #[serde(default)]
    pub position_x: Option<f64>,
    /// Track Y coordinate, when the feed provides positions
    #[serde(default)]
    pub position_y: Option<f64>,
}

impl TelemetrySample {
    pub fn new(distance: f64, time: f64, speed: f64) -> Self {
        Self {
            distance,
            time,
            speed,
            ..Default::default()
        }
    }

    pub fn with_inputs(mut self, throttle: f64, brake: f64) -> Self {
        self.throttle = throttle;
        self.brake = brake;
        self
    }

    pub fn with_position(mut self, x: f64, y: f64) -> Self {
        self.position_x = Some(x);
        self.position_y = Some(y);
        self
    }

    /// Track coordinates, only when both axes are present
    pub fn position(&self) -> Option<(f64, f64)> {
        Some((self.position_x?, self.position_y?))
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum BrakeInput {
    Pressed(bool),
    Percent(f64),
}

fn deserialize_brake<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match BrakeInput::deserialize(deserializer)? {
        BrakeInput::Pressed(true) => 100.,
        BrakeInput::Pressed(false) => 0.,
        BrakeInput::Percent(pct) => pct,
    })
}

/// One driver's traversal of the circuit within a session
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Lap {
    pub driver_id: String,
    /// Chronological lap number, starting at 1
    pub lap_number: u32,
    /// Total lap time in seconds. Missing for laps the timing feed did not close
    #[serde(default)]
    pub lap_time: Option<f64>,
    /// Sector durations in seconds, `None` where the feed did not record one
    #[serde(default)]
    pub sector_times: Vec<Option<f64>>,
    /// Samples ordered by distance
    #[serde(default)]
    pub telemetry: Vec<TelemetrySample>,
}

impl Lap {
    pub fn new(driver_id: impl Into<String>, lap_number: u32, lap_time: f64) -> Self {
        Self {
            driver_id: driver_id.into(),
            lap_number,
            lap_time: Some(lap_time),
            ..Default::default()
        }
    }

    pub fn with_sectors(mut self, sectors: [f64; 3]) -> Self {
        self.sector_times = sectors.into_iter().map(Some).collect();
        self
    }

    pub fn with_telemetry(mut self, telemetry: Vec<TelemetrySample>) -> Self {
        self.telemetry = telemetry;
        self
    }

    /// Lap time usable for ranking laps against each other
    pub fn timed_lap_time(&self) -> Option<f64> {
        self.lap_time.filter(|t| t.is_finite() && *t > 0.)
    }

    /// Number of leading sector times that were actually recorded
    pub fn recorded_sectors(&self) -> usize {
        self.sector_times
            .iter()
            .take_while(|s| s.is_some_and(f64::is_finite))
            .count()
    }

    /// First and last distance covered by the telemetry
    pub fn distance_range(&self) -> Option<(f64, f64)> {
        Some((self.telemetry.first()?.distance, self.telemetry.last()?.distance))
    }
}

/// Serialized with the same short codes as [`SessionType::code`]
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SessionType {
    FP1,
    FP2,
    FP3,
    Q,
    R,
    #[serde(rename = "S")]
    Sprint,
    #[serde(rename = "SQ")]
    SprintQualifying,
}

impl SessionType {
    pub const ALL: [SessionType; 7] = [
        SessionType::FP1,
        SessionType::FP2,
        SessionType::FP3,
        SessionType::Q,
        SessionType::R,
        SessionType::Sprint,
        SessionType::SprintQualifying,
    ];

    /// Short code used in session file names
    pub fn code(&self) -> &'static str {
        match self {
            SessionType::FP1 => "FP1",
            SessionType::FP2 => "FP2",
            SessionType::FP3 => "FP3",
            SessionType::Q => "Q",
            SessionType::R => "R",
            SessionType::Sprint => "S",
            SessionType::SprintQualifying => "SQ",
        }
    }
}

impl fmt::Display for SessionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for SessionType {
    type Err = PitwallError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_uppercase();
        SessionType::ALL
            .into_iter()
            .find(|session_type| session_type.code() == normalized)
            .ok_or_else(|| PitwallError::InvalidUserInput {
                field: "session".to_string(),
                reason: format!(
                    "unknown session type '{s}', expected one of FP1, FP2, FP3, Q, R, S, SQ"
                ),
            })
    }
}

/// Which lap of a driver to pick within a session.
///
/// `0` selects the fastest lap, `1..N` select the chronological lap number.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum LapSelector {
    #[default]
    Fastest,
    Number(u32),
}

impl From<u32> for LapSelector {
    fn from(value: u32) -> Self {
        match value {
            0 => LapSelector::Fastest,
            lap_number => LapSelector::Number(lap_number),
        }
    }
}

impl fmt::Display for LapSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LapSelector::Fastest => f.write_str("fastest"),
            LapSelector::Number(n) => write!(f, "{n}"),
        }
    }
}

impl FromStr for LapSelector {
    type Err = PitwallError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("fastest") {
            return Ok(LapSelector::Fastest);
        }
        s.parse::<u32>()
            .map(LapSelector::from)
            .map_err(|e| PitwallError::InvalidUserInput {
                field: "lap".to_string(),
                reason: format!("'{s}' is neither 'fastest' nor a lap number: {e}"),
            })
    }
}

/// Identifies one session of a race weekend
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionKey {
    pub year: u16,
    pub event: String,
    pub session_type: SessionType,
}

impl SessionKey {
    pub fn new(year: u16, event: impl Into<String>, session_type: SessionType) -> Self {
        Self {
            year,
            event: event.into(),
            session_type,
        }
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.year, self.event, self.session_type)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct LapQuery {
    pub session: SessionKey,
    pub driver: String,
    pub lap: LapSelector,
}

impl fmt::Display for LapQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} lap {}", self.session, self.driver, self.lap)
    }
}
