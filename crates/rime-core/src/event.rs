use serde::{Deserialize, Serialize};

/// Entry in the manager's append-only event log.
///
/// Serialized with an `event` tag carrying the kind, e.g.
/// `{"event": "frame_switch", "tick": 3, "from": "..", "to": ".."}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ManagerEvent {
    FrameCreated {
        tick: u64,
        new_frame: String,
    },
    FrameSwitch {
        tick: u64,
        from: Option<String>,
        to: String,
    },
    FramesMerged {
        tick: u64,
        from: [String; 2],
        new_frame: String,
    },
    FramePruned {
        tick: u64,
        frame: String,
    },
}

impl ManagerEvent {
    pub fn tick(&self) -> u64 {
        match self {
            Self::FrameCreated { tick, .. }
            | Self::FrameSwitch { tick, .. }
            | Self::FramesMerged { tick, .. }
            | Self::FramePruned { tick, .. } => *tick,
        }
    }

    /// The serialized kind name.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::FrameCreated { .. } => "frame_created",
            Self::FrameSwitch { .. } => "frame_switch",
            Self::FramesMerged { .. } => "frames_merged",
            Self::FramePruned { .. } => "frame_pruned",
        }
    }
}
