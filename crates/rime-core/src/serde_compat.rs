//! JSON serde for the snapshot wire format.
//!
//! The snapshot is a single object: `tick`, `active_frame`,
//! `processed_index`, `event_log` and `frames`, an object keyed by frame id.
//! Contradictions are `[tick, token]` pairs. The `frames` object is written
//! in registry order and read back in document order, so a reloaded manager
//! breaks ties the same way the saved one did.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::config::EngineConfig;
use crate::constants::{ADAPT_THRESHOLD, TRUST_MAX, TRUST_MIN};
use crate::event::ManagerEvent;
use crate::frame::{Adaptation, Contradiction, Frame, FrameEvent, Token};
use crate::manager::FrameManager;
use crate::registry::FrameRegistry;

// --- Wire format types ---

#[derive(Serialize, Deserialize, Debug)]
pub struct WireSnapshot {
    pub tick: u64,
    pub active_frame: Option<String>,
    pub processed_index: u64,
    pub event_log: Vec<ManagerEvent>,
    #[serde(with = "ordered_frames")]
    pub frames: Vec<(String, WireFrame)>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub pattern_counts: BTreeMap<Token, u64>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct WireFrame {
    pub axioms: Vec<Token>,
    pub trust: BTreeMap<Token, f64>,
    pub contradictions: Vec<(u64, Token)>,
    pub history: Vec<Adaptation>,
    pub events: Vec<FrameEvent>,
    pub tick: u64,
    #[serde(default = "default_threshold")]
    pub threshold: usize,
    #[serde(default)]
    pub last_active_tick: u64,
}

fn default_threshold() -> usize {
    ADAPT_THRESHOLD
}

/// A snapshot that parsed but cannot describe a valid manager.
#[derive(Debug)]
pub enum SnapshotError {
    Json(serde_json::Error),
    UnknownActiveFrame(String),
    TrustOutOfRange {
        frame: String,
        token: Token,
        value: f64,
    },
}

impl fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnapshotError::Json(e) => write!(f, "malformed snapshot: {e}"),
            SnapshotError::UnknownActiveFrame(id) => {
                write!(f, "active frame '{id}' is not in frames")
            }
            SnapshotError::TrustOutOfRange { frame, token, value } => write!(
                f,
                "trust for '{token}' in frame '{frame}' is {value}, outside [0, 1]"
            ),
        }
    }
}

impl std::error::Error for SnapshotError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SnapshotError::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for SnapshotError {
    fn from(e: serde_json::Error) -> Self {
        SnapshotError::Json(e)
    }
}

// --- Conversion: Wire → Domain ---

impl WireSnapshot {
    /// Rebuild a manager, validating what serde cannot.
    pub fn into_manager(self, config: EngineConfig) -> Result<FrameManager, SnapshotError> {
        let mut frames = FrameRegistry::new();
        for (id, wire) in self.frames {
            frames.insert(wire_frame_to_domain(id, wire)?);
        }

        if let Some(active) = &self.active_frame
            && !frames.contains(active)
        {
            return Err(SnapshotError::UnknownActiveFrame(active.clone()));
        }

        let mut mgr = FrameManager::new(config);
        mgr.frames = frames;
        mgr.active_frame = self.active_frame;
        mgr.tick = self.tick;
        mgr.processed_index = self.processed_index;
        mgr.event_log = self.event_log;
        mgr.pattern_counts = self.pattern_counts;
        Ok(mgr)
    }

    pub fn from_manager(mgr: &FrameManager) -> Self {
        WireSnapshot {
            tick: mgr.tick,
            active_frame: mgr.active_frame.clone(),
            processed_index: mgr.processed_index,
            event_log: mgr.event_log.clone(),
            frames: mgr
                .frames
                .iter()
                .map(|f| (f.id.clone(), domain_frame_to_wire(f)))
                .collect(),
            pattern_counts: mgr.pattern_counts.clone(),
        }
    }
}

fn wire_frame_to_domain(id: String, wire: WireFrame) -> Result<Frame, SnapshotError> {
    for (token, value) in &wire.trust {
        if !(TRUST_MIN..=TRUST_MAX).contains(value) {
            return Err(SnapshotError::TrustOutOfRange {
                frame: id,
                token: token.clone(),
                value: *value,
            });
        }
    }

    let mut frame = Frame::with_threshold(id, wire.threshold);
    frame.axioms = wire.axioms.into_iter().collect();
    frame.trust = wire.trust;
    frame.contradictions = wire
        .contradictions
        .into_iter()
        .map(|(tick, token)| Contradiction { tick, token })
        .collect();
    frame.history = wire.history;
    frame.events = wire.events;
    frame.tick = wire.tick;
    frame.last_active_tick = wire.last_active_tick;
    Ok(frame)
}

fn domain_frame_to_wire(frame: &Frame) -> WireFrame {
    WireFrame {
        axioms: frame.axioms.iter().cloned().collect(),
        trust: frame.trust.clone(),
        contradictions: frame
            .contradictions
            .iter()
            .map(|c| (c.tick, c.token.clone()))
            .collect(),
        history: frame.history.clone(),
        events: frame.events.clone(),
        tick: frame.tick,
        threshold: frame.threshold,
        last_active_tick: frame.last_active_tick,
    }
}

/// `Vec<(id, frame)>` as a JSON object, preserving order both ways.
/// Duplicate ids are rejected here, so decoded frame ids are unique.
mod ordered_frames {
    use super::*;

    pub fn serialize<S>(frames: &[(String, WireFrame)], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_map(frames.iter().map(|(id, frame)| (id, frame)))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<(String, WireFrame)>, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct FramesVisitor;

        impl<'de> Visitor<'de> for FramesVisitor {
            type Value = Vec<(String, WireFrame)>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an object of frames keyed by id")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut seen = HashSet::new();
                let mut frames = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((id, frame)) = map.next_entry::<String, WireFrame>()? {
                    if !seen.insert(id.clone()) {
                        return Err(serde::de::Error::custom(format!(
                            "duplicate frame id '{id}'"
                        )));
                    }
                    frames.push((id, frame));
                }
                Ok(frames)
            }
        }

        deserializer.deserialize_map(FramesVisitor)
    }
}

/// Deserialize a snapshot JSON document into a manager running `config`.
pub fn import_json(json: &str, config: EngineConfig) -> Result<FrameManager, SnapshotError> {
    let wire: WireSnapshot = serde_json::from_str(json)?;
    wire.into_manager(config)
}

/// Serialize a manager to the snapshot JSON wire format.
pub fn export_json(mgr: &FrameManager) -> Result<String, serde_json::Error> {
    let wire = WireSnapshot::from_manager(mgr);
    serde_json::to_string_pretty(&wire)
}
