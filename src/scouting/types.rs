use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ScoutError;

/// The two record kinds the queue can deliver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Pit,
    Match,
}

impl EntryKind {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pit => "pit",
            Self::Match => "match",
        }
    }

    /// Parse a stored kind.
    ///
    /// # Errors
    ///
    /// Returns `ScoutError::Config` for unknown kinds.
    pub fn parse(s: &str) -> Result<Self, ScoutError> {
        match s.to_lowercase().as_str() {
            "pit" => Ok(Self::Pit),
            "match" => Ok(Self::Match),
            other => Err(ScoutError::Config(format!("Unknown entry kind: {other}"))),
        }
    }
}

impl std::fmt::Display for EntryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alliance {
    Red,
    Blue,
}

impl std::fmt::Display for Alliance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Alliance::Red => write!(f, "red"),
            Alliance::Blue => write!(f, "blue"),
        }
    }
}

/// A pit scouting observation, recorded once per team per event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PitEntry {
    pub event_key: String,
    pub team_number: u32,
    #[serde(default)]
    pub scout_name: Option<String>,
    #[serde(default)]
    pub drivetrain: Option<String>,
    #[serde(default)]
    pub weight_lbs: Option<f64>,
    #[serde(default)]
    pub width_in: Option<f64>,
    #[serde(default)]
    pub length_in: Option<f64>,
    #[serde(default)]
    pub mechanisms: Vec<String>,
    #[serde(default)]
    pub notes: String,
    /// Season-specific form fields the engine carries without interpreting.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A match scouting observation for one robot in one match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchEntry {
    pub event_key: String,
    pub match_number: u32,
    pub team_number: u32,
    #[serde(default)]
    pub alliance: Option<Alliance>,
    #[serde(default)]
    pub scout_name: Option<String>,
    #[serde(default)]
    pub auto_points: u32,
    #[serde(default)]
    pub teleop_points: u32,
    #[serde(default)]
    pub endgame: Option<String>,
    #[serde(default)]
    pub fouls: u32,
    #[serde(default)]
    pub notes: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A record as handed over by the form layer, before it is queued.
#[derive(Debug, Clone, PartialEq)]
pub enum ScoutingRecord {
    Pit(PitEntry),
    Match(MatchEntry),
}

impl ScoutingRecord {
    #[must_use]
    pub const fn kind(&self) -> EntryKind {
        match self {
            Self::Pit(_) => EntryKind::Pit,
            Self::Match(_) => EntryKind::Match,
        }
    }

    #[must_use]
    pub fn team_number(&self) -> u32 {
        match self {
            Self::Pit(p) => p.team_number,
            Self::Match(m) => m.team_number,
        }
    }

    /// Reject records the remote API could never accept.
    ///
    /// # Errors
    ///
    /// Returns `ScoutError::Config` describing the first problem found.
    pub fn validate(&self) -> Result<(), ScoutError> {
        let event_key = match self {
            Self::Pit(p) => &p.event_key,
            Self::Match(m) => &m.event_key,
        };
        if event_key.trim().is_empty() {
            return Err(ScoutError::Config("Event key is required".to_string()));
        }
        if self.team_number() == 0 {
            return Err(ScoutError::Config("Team number must be positive".to_string()));
        }
        if let Self::Match(m) = self {
            if m.match_number == 0 {
                return Err(ScoutError::Config("Match number must be positive".to_string()));
            }
        }
        Ok(())
    }

    /// Serialize the record body for storage.
    ///
    /// # Errors
    ///
    /// Returns `ScoutError::Parse` if serialization fails.
    pub fn to_payload(&self) -> Result<String, ScoutError> {
        Ok(match self {
            Self::Pit(p) => serde_json::to_string(p)?,
            Self::Match(m) => serde_json::to_string(m)?,
        })
    }

    /// Rebuild a record from a stored kind and payload.
    ///
    /// # Errors
    ///
    /// Returns `ScoutError::Parse` if the payload does not match the kind.
    pub fn from_payload(kind: EntryKind, payload: &str) -> Result<Self, ScoutError> {
        Ok(match kind {
            EntryKind::Pit => Self::Pit(serde_json::from_str(payload)?),
            EntryKind::Match => Self::Match(serde_json::from_str(payload)?),
        })
    }
}

impl From<PitEntry> for ScoutingRecord {
    fn from(entry: PitEntry) -> Self {
        Self::Pit(entry)
    }
}

impl From<MatchEntry> for ScoutingRecord {
    fn from(entry: MatchEntry) -> Self {
        Self::Match(entry)
    }
}

impl PitEntry {
    #[must_use]
    pub fn new(event_key: impl Into<String>, team_number: u32) -> Self {
        Self {
            event_key: event_key.into(),
            team_number,
            scout_name: None,
            drivetrain: None,
            weight_lbs: None,
            width_in: None,
            length_in: None,
            mechanisms: Vec::new(),
            notes: String::new(),
            extra: Map::new(),
        }
    }
}

impl MatchEntry {
    #[must_use]
    pub fn new(event_key: impl Into<String>, match_number: u32, team_number: u32) -> Self {
        Self {
            event_key: event_key.into(),
            match_number,
            team_number,
            alliance: None,
            scout_name: None,
            auto_points: 0,
            teleop_points: 0,
            endgame: None,
            fouls: 0,
            notes: String::new(),
            extra: Map::new(),
        }
    }
}
