//! Arena zones and the per-zone bookkeeping the trial engine keeps.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One of the three arena regions being timed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Zone {
    Corner,
    Lateral,
    Center,
}

impl Zone {
    /// All zones, in report order.
    pub const ALL: [Zone; 3] = [Zone::Corner, Zone::Lateral, Zone::Center];

    /// Capitalized label used in reports.
    pub fn label(self) -> &'static str {
        match self {
            Zone::Corner => "Corner",
            Zone::Lateral => "Lateral",
            Zone::Center => "Center",
        }
    }

    /// Chart colour for this zone.
    pub fn color(self) -> &'static str {
        match self {
            Zone::Corner => "red",
            Zone::Lateral => "skyblue",
            Zone::Center => "forestgreen",
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            Zone::Corner => 0,
            Zone::Lateral => 1,
            Zone::Center => 2,
        }
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Zone::Corner => "corner",
            Zone::Lateral => "lateral",
            Zone::Center => "center",
        })
    }
}

/// Unknown zone name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown zone '{0}' (expected corner, lateral or center)")]
pub struct ParseZoneError(pub String);

impl FromStr for Zone {
    type Err = ParseZoneError;

    /// Accepts full names (any case) and the keyboard shortcuts `c`, `l`, `m`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "corner" | "c" => Ok(Zone::Corner),
            "lateral" | "l" => Ok(Zone::Lateral),
            "center" | "centre" | "m" => Ok(Zone::Center),
            _ => Err(ParseZoneError(s.to_string())),
        }
    }
}

/// Accumulated time and press status of one zone.
///
/// `press_started_at` is `Some` exactly when the zone is active.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ZoneState {
    accumulated_seconds: f64,
    press_started_at: Option<DateTime<Utc>>,
}

impl ZoneState {
    pub fn accumulated_seconds(&self) -> f64 {
        self.accumulated_seconds
    }

    pub fn is_active(&self) -> bool {
        self.press_started_at.is_some()
    }

    pub fn press_started_at(&self) -> Option<DateTime<Utc>> {
        self.press_started_at
    }

    pub(crate) fn activate(&mut self, at: DateTime<Utc>) {
        self.press_started_at = Some(at);
    }

    /// Closes the open press and banks `elapsed` seconds.
    pub(crate) fn deactivate(&mut self, elapsed: f64) {
        self.accumulated_seconds += elapsed.max(0.0);
        self.press_started_at = None;
    }
}

/// Fixed-size map from every zone to a value.
///
/// Serializes as an object keyed by zone name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ZoneMap<T>([T; 3]);

impl<T> ZoneMap<T> {
    pub fn from_fn(mut f: impl FnMut(Zone) -> T) -> Self {
        Self(Zone::ALL.map(&mut f))
    }

    pub fn get(&self, zone: Zone) -> &T {
        &self.0[zone.index()]
    }

    pub fn get_mut(&mut self, zone: Zone) -> &mut T {
        &mut self.0[zone.index()]
    }

    /// Iterates in report order.
    pub fn iter(&self) -> impl Iterator<Item = (Zone, &T)> {
        Zone::ALL.into_iter().zip(self.0.iter())
    }
}

impl<T: Serialize> Serialize for ZoneMap<T> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(Zone::ALL.len()))?;
        for (zone, value) in self.iter() {
            map.serialize_entry(&zone, value)?;
        }
        map.end()
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for ZoneMap<T> {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut entries = std::collections::BTreeMap::<Zone, T>::deserialize(deserializer)?;
        let [corner, lateral, center] = Zone::ALL.map(|zone| entries.remove(&zone));
        match (corner, lateral, center) {
            (Some(corner), Some(lateral), Some(center)) => Ok(Self([corner, lateral, center])),
            _ => Err(serde::de::Error::custom(
                "expected an entry for corner, lateral and center",
            )),
        }
    }
}

impl<T> std::ops::Index<Zone> for ZoneMap<T> {
    type Output = T;

    fn index(&self, zone: Zone) -> &T {
        self.get(zone)
    }
}
