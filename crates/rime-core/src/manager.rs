use std::collections::BTreeMap;

use rand::Rng;
use serde::Serialize;

use crate::config::EngineConfig;
use crate::event::ManagerEvent;
use crate::frame::{Frame, Token, new_frame_id};
use crate::registry::FrameRegistry;

/// Read-only digest of manager state. Two managers with equal summaries
/// explain the stream identically.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Summary {
    pub tick: u64,
    pub active_frame: Option<String>,
    /// Score per frame, keyed and ordered by frame id.
    pub frame_scores: BTreeMap<String, i64>,
    pub abstract_patterns: Vec<Token>,
    pub event_log: Vec<ManagerEvent>,
}

/// Population of competing frames plus the bookkeeping that makes a run
/// resumable: a shared tick, an input cursor and the event log.
///
/// Whenever `active_frame` is `Some`, it names a frame in `frames`.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameManager {
    pub frames: FrameRegistry,
    pub active_frame: Option<String>,
    pub tick: u64,
    /// Inputs consumed so far; a resumed run skips this many.
    pub processed_index: u64,
    pub event_log: Vec<ManagerEvent>,
    /// How many times each token ended a tick as an axiom of some frame.
    pub pattern_counts: BTreeMap<Token, u64>,
    pub config: EngineConfig,
}

impl Default for FrameManager {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl FrameManager {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            frames: FrameRegistry::new(),
            active_frame: None,
            tick: 0,
            processed_index: 0,
            event_log: Vec::new(),
            pattern_counts: BTreeMap::new(),
            config,
        }
    }

    /// Create an empty frame, named or with a fresh id, and return its id.
    /// It becomes active only if no frame was active.
    pub fn add_frame(&mut self, name: Option<&str>, rng: &mut impl Rng) -> String {
        let id = self.create_frame(name, rng);
        if self.active_frame.is_none() {
            self.active_frame = Some(id.clone());
        }
        id
    }

    /// Register an already-built frame, e.g. one seeded with axioms.
    pub fn insert_frame(&mut self, frame: Frame) {
        if self.active_frame.is_none() {
            self.active_frame = Some(frame.id.clone());
        }
        self.frames.insert(frame);
    }

    pub fn active(&self) -> Option<&Frame> {
        self.active_frame.as_deref().and_then(|id| self.frames.get(id))
    }

    /// Feed one token through the whole population.
    ///
    /// Order: bootstrap a frame if none exist (not logged), evaluate and adapt every frame
    /// (first strictly-best score wins), spawn a frame if nobody accepts the
    /// token, log a switch, merge, advance the tick, prune, advance the cursor.
    pub fn process_input(&mut self, token: &str, rng: &mut impl Rng) {
        let tick = self.tick;

        if self.frames.is_empty() {
            let id = self.create_frame(None, rng);
            self.active_frame = Some(id);
        }

        let mut best: Option<(i64, String)> = None;
        for frame in self.frames.iter_mut() {
            frame.evaluate(tick, token);
            frame.adapt(tick);
            if frame.axioms.contains(token) {
                *self.pattern_counts.entry(token.to_string()).or_insert(0) += 1;
            }
            let score = frame.score();
            if best.as_ref().is_none_or(|(lead, _)| score > *lead) {
                best = Some((score, frame.id.clone()));
            }
        }
        let mut elected = best.map(|(_, id)| id);

        if !self.frames.any_accepts(token) {
            let id = self.create_frame(None, rng);
            if let Some(frame) = self.frames.get_mut(&id) {
                frame.evaluate(tick, token);
                frame.adapt(tick);
                if frame.axioms.contains(token) {
                    *self.pattern_counts.entry(token.to_string()).or_insert(0) += 1;
                }
            }
            self.event_log.push(ManagerEvent::FrameCreated {
                tick,
                new_frame: id.clone(),
            });
            elected = Some(id);
        }

        if let Some(to) = elected
            && self.active_frame.as_deref() != Some(to.as_str())
        {
            self.event_log.push(ManagerEvent::FrameSwitch {
                tick,
                from: self.active_frame.take(),
                to: to.clone(),
            });
            self.active_frame = Some(to);
        }

        let merge_threshold = self.config.merge_threshold;
        self.merge_similar_frames(merge_threshold, rng);

        self.tick += 1;

        let prune = self.config.prune.clone();
        self.prune_frames(&prune);

        self.processed_index += 1;
    }

    /// Feed a sequence of tokens in order.
    pub fn process_all<I, T>(&mut self, tokens: I, rng: &mut impl Rng)
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        for token in tokens {
            self.process_input(token.as_ref(), rng);
        }
    }

    /// Tokens seen as an axiom at least twice, sorted.
    pub fn abstract_patterns(&self) -> Vec<Token> {
        self.pattern_counts
            .iter()
            .filter(|(_, count)| **count >= 2)
            .map(|(token, _)| token.clone())
            .collect()
    }

    pub fn summarize(&self) -> Summary {
        Summary {
            tick: self.tick,
            active_frame: self.active_frame.clone(),
            frame_scores: self
                .frames
                .iter()
                .map(|f| (f.id.clone(), f.score()))
                .collect(),
            abstract_patterns: self.abstract_patterns(),
            event_log: self.event_log.clone(),
        }
    }

    pub(crate) fn create_frame(&mut self, name: Option<&str>, rng: &mut impl Rng) -> String {
        let id = match name {
            Some(name) => name.to_string(),
            None => new_frame_id(rng),
        };
        self.frames
            .insert(Frame::with_threshold(id.clone(), self.config.frame_threshold));
        id
    }
}
