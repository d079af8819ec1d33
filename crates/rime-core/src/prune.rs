use crate::config::PruneConfig;
use crate::event::ManagerEvent;
use crate::frame::Frame;
use crate::manager::FrameManager;

/// Whether `frame` is both unproductive and stale at `tick`.
///
/// Stale means inactive for more than `base + |axioms| * scale` ticks, so
/// larger frames get a longer grace period.
pub fn is_decayed(frame: &Frame, tick: u64, config: &PruneConfig) -> bool {
    let inactivity = tick.saturating_sub(frame.last_active_tick);
    let decay_limit = config
        .base
        .saturating_add((frame.axioms.len() as u64).saturating_mul(config.scale));
    frame.score() <= config.min_score && inactivity > decay_limit
}

impl FrameManager {
    /// Remove every decayed frame, logging one `frame_pruned` per removal.
    ///
    /// Candidates are picked before anything is removed. If the active frame
    /// goes, the first remaining frame in registry order takes over.
    pub fn prune_frames(&mut self, config: &PruneConfig) -> Vec<String> {
        let tick = self.tick;
        let doomed: Vec<String> = self
            .frames
            .iter()
            .filter(|f| is_decayed(f, tick, config))
            .map(|f| f.id.clone())
            .collect();

        for id in &doomed {
            self.frames.remove(id);
            self.event_log.push(ManagerEvent::FramePruned {
                tick,
                frame: id.clone(),
            });
        }

        if self
            .active_frame
            .as_ref()
            .is_some_and(|active| doomed.contains(active))
        {
            self.active_frame = self.frames.first_id().map(str::to_string);
        }
        doomed
    }
}
