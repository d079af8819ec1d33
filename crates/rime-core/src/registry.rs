use crate::frame::Frame;

/// Frames owned by the manager, kept in insertion order.
///
/// Insertion order is the tie-break order for best-frame election and the
/// fallback order when the active frame is pruned. Ids are unique:
/// inserting a frame whose id is already present replaces it in place.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrameRegistry {
    frames: Vec<Frame>,
}

impl FrameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.position(id).is_some()
    }

    pub fn get(&self, id: &str) -> Option<&Frame> {
        self.frames.iter().find(|f| f.id == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Frame> {
        self.frames.iter_mut().find(|f| f.id == id)
    }

    /// Append a frame, or replace the frame with the same id in place.
    pub fn insert(&mut self, frame: Frame) {
        match self.position(&frame.id) {
            Some(idx) => self.frames[idx] = frame,
            None => self.frames.push(frame),
        }
    }

    pub fn remove(&mut self, id: &str) -> Option<Frame> {
        self.position(id).map(|idx| self.frames.remove(idx))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Frame> {
        self.frames.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Frame> {
        self.frames.iter_mut()
    }

    /// Ids in insertion order.
    pub fn ids(&self) -> Vec<String> {
        self.frames.iter().map(|f| f.id.clone()).collect()
    }

    /// Ids in lexicographic order, used for the pairwise merge scan.
    pub fn sorted_ids(&self) -> Vec<String> {
        let mut ids = self.ids();
        ids.sort();
        ids
    }

    pub fn first_id(&self) -> Option<&str> {
        self.frames.first().map(|f| f.id.as_str())
    }

    /// Whether any frame currently holds `token` as an axiom.
    pub fn any_accepts(&self, token: &str) -> bool {
        self.frames.iter().any(|f| f.axioms.contains(token))
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.frames.iter().position(|f| f.id == id)
    }
}
