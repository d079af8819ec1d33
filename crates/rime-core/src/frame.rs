use std::collections::{BTreeMap, BTreeSet};

use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Builder;

use crate::constants::{ADAPT_THRESHOLD, TRUST_DEFAULT, TRUST_MAX, TRUST_MIN, TRUST_STEP};

/// An opaque unit from the input stream.
pub type Token = String;

/// Random UUID v4 identifier drawn from the caller's RNG.
pub fn new_frame_id(rng: &mut impl Rng) -> String {
    let mut bytes = [0u8; 16];
    rng.fill(&mut bytes);
    Builder::from_random_bytes(bytes).into_uuid().to_string()
}

/// A token a frame rejected, with the tick it was seen.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Contradiction {
    pub tick: u64,
    pub token: Token,
}

/// One firing of [`Frame::adapt`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Adaptation {
    pub tick: u64,
    pub new_axioms: Vec<Token>,
}

/// Trace record appended by every [`Frame::evaluate`] call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FrameEvent {
    pub tick: u64,
    pub input: Token,
    pub accepted: bool,
    /// Trust after the update, rounded to two decimals.
    pub trust: f64,
}

/// A single belief unit.
///
/// Accepts tokens that are already axioms and records everything else as a
/// contradiction. Once `threshold` contradictions pile up, [`Frame::adapt`]
/// folds the most recent ones into the axiom set.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    pub id: String,
    pub axioms: BTreeSet<Token>,
    pub(crate) trust: BTreeMap<Token, f64>,
    pub contradictions: Vec<Contradiction>,
    pub history: Vec<Adaptation>,
    pub events: Vec<FrameEvent>,
    pub threshold: usize,
    /// Local clock for standalone streams; the manager uses its own tick.
    pub tick: u64,
    /// Tick of the most recent trust change or adaptation. A bootstrap
    /// accept also counts, though it leaves trust unchanged.
    pub last_active_tick: u64,
}

impl Frame {
    pub fn new(id: impl Into<String>) -> Self {
        Self::with_threshold(id, ADAPT_THRESHOLD)
    }

    pub fn with_threshold(id: impl Into<String>, threshold: usize) -> Self {
        Self {
            id: id.into(),
            axioms: BTreeSet::new(),
            trust: BTreeMap::new(),
            contradictions: Vec::new(),
            history: Vec::new(),
            events: Vec::new(),
            threshold,
            tick: 0,
            last_active_tick: 0,
        }
    }

    /// Frame seeded with an initial axiom set.
    pub fn with_axioms<I, T>(id: impl Into<String>, axioms: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Token>,
    {
        let mut frame = Self::new(id);
        frame.axioms = axioms.into_iter().map(Into::into).collect();
        frame
    }

    /// Trust for `token`, or [`TRUST_DEFAULT`] if the frame never saw it.
    pub fn trust_of(&self, token: &str) -> f64 {
        self.trust.get(token).copied().unwrap_or(TRUST_DEFAULT)
    }

    /// All stored trust entries, sorted by token.
    pub fn trust(&self) -> &BTreeMap<Token, f64> {
        &self.trust
    }

    /// Overwrite the trust for `token`, clamped to `[0, 1]`.
    pub fn set_trust(&mut self, token: impl Into<Token>, value: f64) {
        self.trust
            .insert(token.into(), value.clamp(TRUST_MIN, TRUST_MAX));
    }

    /// Judge `token` against the axiom set. Returns whether it was accepted.
    ///
    /// An empty frame accepts whatever it sees first and takes it as its
    /// founding axiom. The bootstrap counts as activity and sets
    /// `last_active_tick` even though trust stays capped at 1.0.
    pub fn evaluate(&mut self, tick: u64, token: &str) -> bool {
        let accepted = if self.axioms.is_empty() {
            self.axioms.insert(token.to_string());
            self.last_active_tick = tick;
            true
        } else {
            self.axioms.contains(token)
        };

        let before = self.trust_of(token);
        let after = if accepted {
            (before + TRUST_STEP).min(TRUST_MAX)
        } else {
            self.contradictions.push(Contradiction {
                tick,
                token: token.to_string(),
            });
            (before - TRUST_STEP).max(TRUST_MIN)
        };
        self.trust.insert(token.to_string(), after);
        if after != before {
            self.last_active_tick = tick;
        }

        self.events.push(FrameEvent {
            tick,
            input: token.to_string(),
            accepted,
            trust: round2(after),
        });
        accepted
    }

    /// Promote the most recent `threshold` contradictions to axioms once the
    /// queue is long enough. The whole queue is cleared, not just the
    /// promoted entries. Returns whether adaptation fired.
    ///
    /// A threshold of zero behaves like one.
    pub fn adapt(&mut self, tick: u64) -> bool {
        let threshold = self.threshold.max(1);
        if self.contradictions.len() < threshold {
            return false;
        }

        let start = self.contradictions.len() - threshold;
        let recent: Vec<Token> = self.contradictions[start..]
            .iter()
            .map(|c| c.token.clone())
            .collect();
        self.axioms.extend(recent.iter().cloned());
        self.history.push(Adaptation {
            tick,
            new_axioms: recent,
        });
        self.contradictions.clear();
        self.last_active_tick = tick;
        true
    }

    /// Fitness: axiom count minus outstanding contradictions.
    pub fn score(&self) -> i64 {
        self.axioms.len() as i64 - self.contradictions.len() as i64
    }

    /// Run a whole stream through this frame on its local clock.
    pub fn process_stream<I, T>(&mut self, tokens: I)
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        for token in tokens {
            self.evaluate(self.tick, token.as_ref());
            self.adapt(self.tick);
            self.tick += 1;
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    fn rng() -> SmallRng {
        SmallRng::seed_from_u64(42)
    }

    #[test]
    fn test_bootstrap_accepts_first_token() {
        let mut frame = Frame::new("f");
        assert!(frame.evaluate(4, "a"));
        assert!(frame.axioms.contains("a"));
        assert!(frame.contradictions.is_empty());
        // Trust is capped and unchanged, yet the bootstrap is still activity.
        assert_relative_eq!(frame.trust_of("a"), 1.0);
        assert_eq!(frame.last_active_tick, 4);
    }

    #[test]
    fn test_accept_caps_trust() {
        let mut frame = Frame::with_axioms("f", ["a"]);
        assert!(frame.evaluate(0, "a"));
        assert_relative_eq!(frame.trust_of("a"), 1.0);
        // Already at the ceiling, so no activity is recorded.
        assert_eq!(frame.last_active_tick, 0);
    }

    #[test]
    fn test_reject_lowers_trust_and_queues() {
        let mut frame = Frame::with_axioms("f", ["a"]);
        assert!(!frame.evaluate(7, "b"));
        assert_relative_eq!(frame.trust_of("b"), 0.9, epsilon = 1e-10);
        assert_eq!(
            frame.contradictions,
            vec![Contradiction {
                tick: 7,
                token: "b".to_string()
            }]
        );
        assert_eq!(frame.last_active_tick, 7);
    }

    #[test]
    fn test_trust_floor() {
        let mut frame = Frame::with_axioms("f", ["a"]);
        frame.threshold = 100;
        for tick in 0..20 {
            frame.evaluate(tick, "b");
        }
        assert_relative_eq!(frame.trust_of("b"), 0.0);
        // Once trust sits at the floor, further rejections are not activity.
        assert!(frame.last_active_tick < 19);
    }

    #[test]
    fn test_trust_recovers_after_adapt() {
        let mut frame = Frame::with_axioms("f", ["a"]);
        frame.threshold = 1;
        frame.evaluate(0, "b");
        frame.adapt(0);
        frame.evaluate(1, "b");
        assert_relative_eq!(frame.trust_of("b"), 1.0);
    }

    #[test]
    fn test_unseen_trust_defaults() {
        let frame = Frame::new("f");
        assert_relative_eq!(frame.trust_of("never"), 1.0);
        assert!(frame.trust().is_empty());
    }

    #[test]
    fn test_event_trust_rounded() {
        let mut frame = Frame::with_axioms("f", ["a"]);
        frame.threshold = 100;
        for tick in 0..3 {
            frame.evaluate(tick, "b");
        }
        let last = frame.events.last().unwrap();
        assert_eq!(last.trust, 0.7);
        assert!(!last.accepted);
        assert_eq!(frame.events.len(), 3);
    }

    #[test]
    fn test_adapt_takes_most_recent() {
        let mut frame = Frame::with_axioms("f", ["a"]);
        frame.threshold = 2;
        frame.contradictions = vec![
            Contradiction {
                tick: 1,
                token: "x".into(),
            },
            Contradiction {
                tick: 2,
                token: "y".into(),
            },
            Contradiction {
                tick: 3,
                token: "z".into(),
            },
        ];
        assert!(frame.adapt(9));
        assert!(!frame.axioms.contains("x"));
        assert!(frame.axioms.contains("y"));
        assert!(frame.axioms.contains("z"));
        assert!(frame.contradictions.is_empty());
        assert_eq!(frame.history[0].new_axioms, vec!["y", "z"]);
        assert_eq!(frame.history[0].tick, 9);
        assert_eq!(frame.last_active_tick, 9);
    }

    #[test]
    fn test_adapt_below_threshold_noop() {
        let mut frame = Frame::with_axioms("f", ["a"]);
        frame.evaluate(0, "b");
        frame.evaluate(1, "c");
        assert!(!frame.adapt(1));
        assert_eq!(frame.contradictions.len(), 2);
        assert!(frame.history.is_empty());
    }

    #[test]
    fn test_adapt_idempotent() {
        let mut frame = Frame::with_axioms("f", ["a"]);
        for (tick, t) in ["b", "c", "d"].iter().enumerate() {
            frame.evaluate(tick as u64, t);
        }
        assert!(frame.adapt(3));
        let snapshot = frame.clone();
        assert!(!frame.adapt(4));
        assert_eq!(frame, snapshot);
    }

    #[test]
    fn test_zero_threshold_acts_as_one() {
        let mut frame = Frame::with_threshold("f", 0);
        assert!(!frame.adapt(0));
        frame.evaluate(0, "a");
        frame.evaluate(1, "b");
        assert!(frame.adapt(1));
        assert!(frame.axioms.contains("b"));
    }

    #[test]
    fn test_stream_scenario() {
        let mut frame = Frame::new("f");
        frame.process_stream(["a", "a", "b", "c", "d"]);

        let expected: BTreeSet<Token> =
            ["a", "b", "c", "d"].iter().map(|s| s.to_string()).collect();
        assert_eq!(frame.axioms, expected);
        assert!(frame.contradictions.is_empty());
        assert_eq!(frame.history.len(), 1);
        assert_eq!(frame.history[0].new_axioms, vec!["b", "c", "d"]);
        assert_eq!(frame.history[0].tick, 4);
        assert_eq!(frame.tick, 5);
        assert_eq!(frame.score(), 4);
    }

    #[test]
    fn test_score_counts_outstanding() {
        let mut frame = Frame::with_axioms("f", ["a", "b"]);
        frame.evaluate(0, "c");
        assert_eq!(frame.score(), 1);
    }

    #[test]
    fn test_new_frame_id_is_uuid_and_seeded() {
        let a = new_frame_id(&mut rng());
        let b = new_frame_id(&mut rng());
        assert_eq!(a, b);
        let parsed = uuid::Uuid::parse_str(&a).unwrap();
        assert_eq!(parsed.get_version_num(), 4);
    }

    #[test]
    fn test_set_trust_clamps() {
        let mut frame = Frame::new("f");
        frame.set_trust("a", 1.7);
        frame.set_trust("b", -0.3);
        assert_relative_eq!(frame.trust_of("a"), 1.0);
        assert_relative_eq!(frame.trust_of("b"), 0.0);
    }

    proptest! {
        #[test]
        fn prop_trust_stays_bounded(tokens in prop::collection::vec(0u8..6, 0..200)) {
            let mut frame = Frame::new("p");
            for (tick, t) in tokens.iter().enumerate() {
                let token = t.to_string();
                frame.evaluate(tick as u64, &token);
                frame.adapt(tick as u64);
                for value in frame.trust().values() {
                    prop_assert!((0.0..=1.0).contains(value));
                }
            }
        }

        #[test]
        fn prop_score_identity(
            tokens in prop::collection::vec(0u8..8, 0..100),
            threshold in 1usize..5,
        ) {
            let mut frame = Frame::with_threshold("p", threshold);
            for (tick, t) in tokens.iter().enumerate() {
                frame.evaluate(tick as u64, &t.to_string());
                prop_assert_eq!(
                    frame.score(),
                    frame.axioms.len() as i64 - frame.contradictions.len() as i64
                );
                frame.adapt(tick as u64);
                prop_assert_eq!(
                    frame.score(),
                    frame.axioms.len() as i64 - frame.contradictions.len() as i64
                );
            }
        }
    }
}
