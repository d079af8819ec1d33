//! Similarity-based merging of near-duplicate frames.
//!
//! Pairs are scanned in sorted id order. After each merge the scan restarts
//! from the top of the (changed) registry, so one pass can cascade: a merged
//! frame is a fresh id and may itself merge again in the same pass.

use std::collections::{BTreeSet, HashSet};

use rand::Rng;

use crate::event::ManagerEvent;
use crate::frame::{Frame, Token, new_frame_id};
use crate::manager::FrameManager;

/// Jaccard similarity `|A ∩ B| / |A ∪ B|`. `None` when both sets are empty.
pub fn jaccard(a: &BTreeSet<Token>, b: &BTreeSet<Token>) -> Option<f64> {
    let union = a.union(b).count();
    if union == 0 {
        return None;
    }
    Some(a.intersection(b).count() as f64 / union as f64)
}

/// Combine two frames under a new id.
///
/// Axioms are unioned. Trust held by both is averaged, trust held by one is
/// kept. Contradictions, history and events are concatenated, `a` first.
pub fn combine(id: impl Into<String>, a: &Frame, b: &Frame) -> Frame {
    let mut merged = Frame::with_threshold(id, a.threshold);
    merged.axioms = a.axioms.union(&b.axioms).cloned().collect();

    merged.trust = a.trust.clone();
    for (token, value) in &b.trust {
        merged
            .trust
            .entry(token.clone())
            .and_modify(|existing| *existing = (*existing + value) / 2.0)
            .or_insert(*value);
    }

    merged.contradictions = a
        .contradictions
        .iter()
        .chain(&b.contradictions)
        .cloned()
        .collect();
    merged.history = a.history.iter().chain(&b.history).cloned().collect();
    merged.events = a.events.iter().chain(&b.events).cloned().collect();
    merged.tick = a.tick.max(b.tick);
    merged.last_active_tick = a.last_active_tick.max(b.last_active_tick);
    merged
}

impl FrameManager {
    /// Merge `id1` and `id2` into a frame with a fresh id, log it and
    /// repoint the active frame if it was one of the sources. Returns the
    /// new id, or `None` if either source is missing or they are the same.
    pub fn merge_frames(&mut self, id1: &str, id2: &str, rng: &mut impl Rng) -> Option<String> {
        if id1 == id2 || !self.frames.contains(id1) || !self.frames.contains(id2) {
            return None;
        }
        let a = self.frames.remove(id1)?;
        let b = self.frames.remove(id2)?;

        let new_id = new_frame_id(rng);
        self.frames.insert(combine(new_id.clone(), &a, &b));
        self.event_log.push(ManagerEvent::FramesMerged {
            tick: self.tick,
            from: [a.id.clone(), b.id.clone()],
            new_frame: new_id.clone(),
        });

        if self
            .active_frame
            .as_deref()
            .is_some_and(|active| active == a.id || active == b.id)
        {
            self.active_frame = Some(new_id.clone());
        }
        Some(new_id)
    }

    /// Merge every pair whose axiom similarity reaches `threshold`.
    /// Returns the ids of the frames created, in order.
    pub fn merge_similar_frames(&mut self, threshold: f64, rng: &mut impl Rng) -> Vec<String> {
        let mut consumed: HashSet<String> = HashSet::new();
        let mut created = Vec::new();

        while let Some((a, b)) = self.find_similar_pair(threshold, &consumed) {
            if let Some(new_id) = self.merge_frames(&a, &b, rng) {
                created.push(new_id);
            }
            consumed.insert(a);
            consumed.insert(b);
        }
        created
    }

    /// First qualifying pair in sorted id order, skipping consumed ids.
    fn find_similar_pair(
        &self,
        threshold: f64,
        consumed: &HashSet<String>,
    ) -> Option<(String, String)> {
        let ids = self.frames.sorted_ids();
        for (i, a) in ids.iter().enumerate() {
            if consumed.contains(a) {
                continue;
            }
            for b in &ids[i + 1..] {
                if consumed.contains(b) {
                    continue;
                }
                let (Some(fa), Some(fb)) = (self.frames.get(a), self.frames.get(b)) else {
                    continue;
                };
                if jaccard(&fa.axioms, &fb.axioms).is_some_and(|sim| sim >= threshold) {
                    return Some((a.clone(), b.clone()));
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{Adaptation, Contradiction};
    use approx::assert_relative_eq;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    fn rng() -> SmallRng {
        SmallRng::seed_from_u64(42)
    }

    fn set(tokens: &[&str]) -> BTreeSet<Token> {
        tokens.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_jaccard_values() {
        let sim = jaccard(&set(&["x", "y"]), &set(&["x", "y", "z"])).unwrap();
        assert_relative_eq!(sim, 2.0 / 3.0);
        assert_relative_eq!(jaccard(&set(&["a"]), &set(&["a"])).unwrap(), 1.0);
        assert_relative_eq!(jaccard(&set(&["a"]), &set(&["b"])).unwrap(), 0.0);
    }

    #[test]
    fn test_jaccard_empty_union() {
        assert!(jaccard(&set(&[]), &set(&[])).is_none());
        assert_relative_eq!(jaccard(&set(&[]), &set(&["a"])).unwrap(), 0.0);
    }

    #[test]
    fn test_below_threshold_no_merge() {
        let mut rng = rng();
        let mut mgr = FrameManager::default();
        mgr.insert_frame(Frame::with_axioms("f1", ["x", "y"]));
        mgr.insert_frame(Frame::with_axioms("f2", ["x", "y", "z"]));

        assert!(mgr.merge_similar_frames(0.8, &mut rng).is_empty());
        assert_eq!(mgr.frames.len(), 2);
    }

    #[test]
    fn test_lower_threshold_merges() {
        let mut rng = rng();
        let mut mgr = FrameManager::default();
        mgr.insert_frame(Frame::with_axioms("f1", ["x", "y"]));
        mgr.insert_frame(Frame::with_axioms("f2", ["x", "y", "z"]));

        let created = mgr.merge_similar_frames(0.6, &mut rng);
        assert_eq!(created.len(), 1);
        assert_eq!(mgr.frames.len(), 1);

        let merged = mgr.frames.get(&created[0]).unwrap();
        assert_eq!(merged.axioms, set(&["x", "y", "z"]));
        assert_ne!(merged.id, "f1");
        assert_ne!(merged.id, "f2");
        assert_eq!(mgr.active_frame.as_deref(), Some(created[0].as_str()));

        match mgr.event_log.last().unwrap() {
            ManagerEvent::FramesMerged { from, new_frame, .. } => {
                assert_eq!(from, &["f1".to_string(), "f2".to_string()]);
                assert_eq!(new_frame, &created[0]);
            }
            other => panic!("expected frames_merged, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_frames_never_merge() {
        let mut rng = rng();
        let mut mgr = FrameManager::default();
        mgr.insert_frame(Frame::new("e1"));
        mgr.insert_frame(Frame::new("e2"));
        assert!(mgr.merge_similar_frames(0.0, &mut rng).is_empty());
        assert_eq!(mgr.frames.len(), 2);
    }

    #[test]
    fn test_combine_trust_and_logs() {
        let mut a = Frame::with_axioms("a", ["x"]);
        a.set_trust("x", 0.4);
        a.set_trust("only_a", 0.3);
        a.contradictions.push(Contradiction {
            tick: 1,
            token: "q".into(),
        });
        a.history.push(Adaptation {
            tick: 2,
            new_axioms: vec!["x".into()],
        });
        a.last_active_tick = 5;

        let mut b = Frame::with_axioms("b", ["y"]);
        b.set_trust("x", 0.8);
        b.set_trust("only_b", 0.6);
        b.contradictions.push(Contradiction {
            tick: 3,
            token: "r".into(),
        });
        b.last_active_tick = 9;
        b.threshold = 5;

        let merged = combine("m", &a, &b);
        assert_relative_eq!(merged.trust_of("x"), 0.6, epsilon = 1e-10);
        assert_relative_eq!(merged.trust_of("only_a"), 0.3);
        assert_relative_eq!(merged.trust_of("only_b"), 0.6);
        assert_eq!(merged.contradictions[0].token, "q");
        assert_eq!(merged.contradictions[1].token, "r");
        assert_eq!(merged.history.len(), 1);
        assert_eq!(merged.last_active_tick, 9);
        assert_eq!(merged.threshold, 3);
        assert_eq!(merged.axioms, set(&["x", "y"]));
    }

    #[test]
    fn test_merge_cascades_within_pass() {
        let mut rng = rng();
        let mut mgr = FrameManager::default();
        mgr.insert_frame(Frame::with_axioms("a", ["p", "q"]));
        mgr.insert_frame(Frame::with_axioms("b", ["p", "q"]));
        mgr.insert_frame(Frame::with_axioms("c", ["p", "q"]));

        let created = mgr.merge_similar_frames(0.8, &mut rng);
        assert_eq!(created.len(), 2);
        assert_eq!(mgr.frames.len(), 1);
        assert_eq!(mgr.frames.first_id(), Some(created[1].as_str()));
    }

    #[test]
    fn test_merge_pairs_in_sorted_order() {
        let mut rng = rng();
        let mut mgr = FrameManager::default();
        mgr.insert_frame(Frame::with_axioms("z", ["p"]));
        mgr.insert_frame(Frame::with_axioms("m", ["p"]));
        mgr.insert_frame(Frame::with_axioms("b", ["p"]));

        mgr.merge_similar_frames(0.8, &mut rng);
        match &mgr.event_log[0] {
            ManagerEvent::FramesMerged { from, .. } => {
                assert_eq!(from, &["b".to_string(), "m".to_string()]);
            }
            other => panic!("expected frames_merged, got {other:?}"),
        }
    }

    #[test]
    fn test_merge_frames_missing_source() {
        let mut rng = rng();
        let mut mgr = FrameManager::default();
        mgr.insert_frame(Frame::with_axioms("a", ["p"]));
        assert!(mgr.merge_frames("a", "ghost", &mut rng).is_none());
        assert!(mgr.merge_frames("a", "a", &mut rng).is_none());
        assert!(mgr.frames.contains("a"));
        assert!(mgr.event_log.is_empty());
    }

    proptest! {
        #[test]
        fn prop_jaccard_symmetric(
            a in prop::collection::btree_set("[a-e]", 0..5),
            b in prop::collection::btree_set("[a-e]", 0..5),
        ) {
            prop_assert_eq!(jaccard(&a, &b), jaccard(&b, &a));
        }

        #[test]
        fn prop_combine_axiom_lossless(
            a in prop::collection::btree_set("[a-h]", 0..6),
            b in prop::collection::btree_set("[a-h]", 0..6),
        ) {
            let fa = Frame::with_axioms("a", a.clone());
            let fb = Frame::with_axioms("b", b.clone());
            let merged = combine("m", &fa, &fb);
            let expected: BTreeSet<Token> = a.union(&b).cloned().collect();
            prop_assert_eq!(merged.axioms, expected);
        }
    }
}
