use std::fs;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// A single match event handed to the commentary pipelines.
/// Owned by the caller; the pipelines only ever borrow it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameEvent {
    pub id: u32,
    pub event_type: EventType,
    pub time_min: u32,
    pub primary_player: String,
    #[serde(default)]
    pub secondary_player: String,
    pub team: String,

    /// Free-text insight derived from motion/tracking data
    #[serde(default)]
    pub motion_context: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home_team: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub away_team: Option<String>,

    #[serde(flatten)]
    pub tracking: Tracking,

    /// Prior sub-events, oldest first
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub build_up_events: Vec<BuildUpEvent>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventType {
    Goal,
    Pass,
    Foul,
    Save,
}

impl EventType {
    pub fn label(&self) -> &'static str {
        match self {
            EventType::Goal => "Goal",
            EventType::Pass => "Pass",
            EventType::Foul => "Foul",
            EventType::Save => "Save",
        }
    }
}

/// Spatial snapshot at the moment of the event.
/// Coordinates are pitch-normalized (0.0 - 1.0).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tracking {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attacker_x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attacker_y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub defender_x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub defender_y: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub teammates: Vec<PitchPoint>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub opponents: Vec<PitchPoint>,
    #[serde(default)]
    pub has_tracking: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PitchPoint {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildUpEvent {
    pub time_s: f64,
    pub time_min: u32,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub subtype: String,
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub to: String,
    #[serde(default)]
    pub team: String,
}

/// Load a batch of events from a JSON array on disk
/// (the processed real-match export format).
pub fn load_events(path: &Path) -> anyhow::Result<Vec<GameEvent>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading events from {}", path.display()))?;
    let events = serde_json::from_str(&raw)
        .with_context(|| format!("decoding events in {}", path.display()))?;
    Ok(events)
}
