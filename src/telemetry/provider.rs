// Lap providers hand finished laps to the comparison engine

use std::fs;
use std::path::{Path, PathBuf};

use itertools::Itertools;
use log::{debug, info};

use super::{Lap, LapQuery, LapSelector, SessionKey, SessionType};
use crate::PitwallError;

/// Source of laps for a (year, event, session, driver, lap) query.
///
/// Implementations own their I/O and caching. Every failure, whatever its cause, is reported
/// as [`PitwallError::LapUnavailable`] and never retried by the caller.
pub trait LapProvider {
    /// Seasons with at least one stored event
    fn years(&self) -> Result<Vec<u16>, PitwallError>;

    /// Events stored for a season
    fn events(&self, year: u16) -> Result<Vec<String>, PitwallError>;

    /// Session types available for an event
    fn sessions(&self, year: u16, event: &str) -> Result<Vec<SessionType>, PitwallError>;

    /// Sorted, de-duplicated driver identifiers that set a lap in the session
    fn drivers(&self, session: &SessionKey) -> Result<Vec<String>, PitwallError>;

    /// Chronological lap numbers of a driver in the session
    fn lap_numbers(&self, session: &SessionKey, driver: &str) -> Result<Vec<u32>, PitwallError>;

    /// Resolve a single lap
    fn lap(&self, query: &LapQuery) -> Result<Lap, PitwallError>;
}

/// Serves laps from JSON lines session files stored as
/// `<root>/<year>/<event-slug>/<SESSION>.jsonl`, one [`Lap`] per line.
///
/// Files are re-read on every call.
pub struct FileLapProvider {
    root: PathBuf,
}

impl FileLapProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Normalize an event name for consistent directory naming
    pub fn event_slug(event: &str) -> String {
        event
            .trim()
            .to_lowercase()
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { '_' })
            .collect()
    }

    fn event_dir(&self, year: u16, event: &str) -> PathBuf {
        self.root.join(year.to_string()).join(Self::event_slug(event))
    }

    /// File path holding every lap of a session
    pub fn session_file(&self, session: &SessionKey) -> PathBuf {
        self.event_dir(session.year, &session.event)
            .join(format!("{}.jsonl", session.session_type.code()))
    }

    /// Load every lap stored for a session
    pub fn load_session(&self, session: &SessionKey) -> Result<Vec<Lap>, PitwallError> {
        let path = self.session_file(session);
        if !path.exists() {
            return Err(PitwallError::LapUnavailable {
                reason: format!("no data stored for session {session} ({path:?})"),
            });
        }

        debug!("Reading session file {:?}", path);
        let laps = serde_jsonlines::json_lines(&path)
            .map_err(|e| PitwallError::LapUnavailable {
                reason: format!("cannot open {path:?}: {e}"),
            })?
            .collect::<Result<Vec<Lap>, std::io::Error>>()
            .map_err(|e| PitwallError::LapUnavailable {
                reason: format!("cannot parse {path:?}: {e}"),
            })?;

        info!("Loaded {} with {} laps", session, laps.len());
        Ok(laps)
    }

    fn list_dir(&self, dir: &Path) -> Result<Vec<(String, bool)>, PitwallError> {
        let entries = fs::read_dir(dir).map_err(|e| PitwallError::LapUnavailable {
            reason: format!("cannot read {dir:?}: {e}"),
        })?;

        let mut names = Vec::new();
        for entry in entries.flatten() {
            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
            if let Some(name) = entry.file_name().to_str() {
                names.push((name.to_string(), is_dir));
            }
        }
        Ok(names)
    }
}

/// Pick a driver's lap following the [`LapSelector`] convention.
///
/// The fastest lap is the lowest timed lap; ties go to the earliest lap.
pub fn select_lap<'a>(laps: &'a [Lap], driver: &str, selector: LapSelector) -> Option<&'a Lap> {
    let mut driver_laps = laps
        .iter()
        .filter(|lap| lap.driver_id.eq_ignore_ascii_case(driver))
        .sorted_by_key(|lap| lap.lap_number);

    match selector {
        LapSelector::Fastest => driver_laps
            .filter_map(|lap| lap.timed_lap_time().map(|t| (t, lap)))
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, lap)| lap),
        LapSelector::Number(lap_number) => driver_laps.find(|lap| lap.lap_number == lap_number),
    }
}

impl LapProvider for FileLapProvider {
    fn years(&self) -> Result<Vec<u16>, PitwallError> {
        Ok(self
            .list_dir(&self.root)?
            .into_iter()
            .filter(|(_, is_dir)| *is_dir)
            .filter_map(|(name, _)| name.parse::<u16>().ok())
            .sorted()
            .collect())
    }

    fn events(&self, year: u16) -> Result<Vec<String>, PitwallError> {
        Ok(self
            .list_dir(&self.root.join(year.to_string()))?
            .into_iter()
            .filter(|(_, is_dir)| *is_dir)
            .map(|(name, _)| name)
            .sorted()
            .collect())
    }

    fn sessions(&self, year: u16, event: &str) -> Result<Vec<SessionType>, PitwallError> {
        let dir = self.event_dir(year, event);
        if !dir.is_dir() {
            return Err(PitwallError::LapUnavailable {
                reason: format!("no event '{event}' stored for {year}"),
            });
        }
        Ok(SessionType::ALL
            .into_iter()
            .filter(|session_type| dir.join(format!("{}.jsonl", session_type.code())).is_file())
            .collect())
    }

    fn drivers(&self, session: &SessionKey) -> Result<Vec<String>, PitwallError> {
        Ok(self
            .load_session(session)?
            .into_iter()
            .map(|lap| lap.driver_id)
            .sorted()
            .dedup()
            .collect())
    }

    fn lap_numbers(&self, session: &SessionKey, driver: &str) -> Result<Vec<u32>, PitwallError> {
        let lap_numbers = self
            .load_session(session)?
            .iter()
            .filter(|lap| lap.driver_id.eq_ignore_ascii_case(driver))
            .map(|lap| lap.lap_number)
            .sorted()
            .dedup()
            .collect_vec();
        if lap_numbers.is_empty() {
            return Err(PitwallError::LapUnavailable {
                reason: format!("no laps found for {driver} in {session}"),
            });
        }
        Ok(lap_numbers)
    }

    fn lap(&self, query: &LapQuery) -> Result<Lap, PitwallError> {
        let laps = self.load_session(&query.session)?;
        if !laps
            .iter()
            .any(|lap| lap.driver_id.eq_ignore_ascii_case(&query.driver))
        {
            return Err(PitwallError::LapUnavailable {
                reason: format!("no laps found for {} in {}", query.driver, query.session),
            });
        }
        select_lap(&laps, &query.driver, query.lap)
            .cloned()
            .ok_or_else(|| PitwallError::LapUnavailable {
                reason: match query.lap {
                    LapSelector::Fastest => format!("{} has no timed lap", query.driver),
                    LapSelector::Number(n) => format!("{} has no lap {n}", query.driver),
                },
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn laps() -> Vec<Lap> {
        let mut untimed = Lap::new("HAM", 1, 0.);
        untimed.lap_time = None;
        vec![
            untimed,
            Lap::new("HAM", 3, 71.2),
            Lap::new("HAM", 2, 71.2),
            Lap::new("VER", 1, 70.9),
            Lap::new("HAM", 4, 72.0),
        ]
    }

    #[test]
    fn test_event_slug() {
        assert_eq!(
            FileLapProvider::event_slug("Monaco Grand Prix"),
            "monaco_grand_prix"
        );
        assert_eq!(
            FileLapProvider::event_slug("monaco_grand_prix"),
            "monaco_grand_prix"
        );
        assert_eq!(
            FileLapProvider::event_slug(" São Paulo Grand Prix "),
            "são_paulo_grand_prix"
        );
    }

    #[test]
    fn test_select_fastest_prefers_earliest_tie() {
        let laps = laps();
        let fastest = select_lap(&laps, "ham", LapSelector::Fastest).unwrap();
        assert_eq!(fastest.lap_number, 2);
    }

    #[test]
    fn test_select_by_number() {
        let laps = laps();
        let lap = select_lap(&laps, "HAM", LapSelector::Number(4)).unwrap();
        assert_eq!(lap.timed_lap_time(), Some(72.0));
        assert!(select_lap(&laps, "HAM", LapSelector::Number(9)).is_none());
    }

    #[test]
    fn test_select_fastest_without_timed_laps() {
        let laps = vec![{
            let mut lap = Lap::new("LEC", 1, 0.);
            lap.lap_time = None;
            lap
        }];
        assert!(select_lap(&laps, "LEC", LapSelector::Fastest).is_none());
    }

    #[test]
    fn test_missing_session_is_unavailable() {
        let provider = FileLapProvider::new("/nonexistent/pitwall");
        let session = SessionKey::new(2023, "Monaco Grand Prix", SessionType::Q);
        assert!(matches!(
            provider.load_session(&session),
            Err(PitwallError::LapUnavailable { .. })
        ));
        assert!(matches!(
            provider.years(),
            Err(PitwallError::LapUnavailable { .. })
        ));
    }
}
