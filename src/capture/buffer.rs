//! Frame store: unbounded session sequences and the rolling buffer.

use std::collections::VecDeque;
use std::ops::Index;

use crate::schema::FrameSnapshot;

/// Upper bound on frames reserved up front by [`RollingBuffer::new`].
const MAX_PREALLOC: usize = 1024;

/// Ordered, indexable sequence of frames. The unit of recording and
/// persistence.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameSequence {
    frames: Vec<FrameSnapshot>,
}

impl FrameSequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            frames: Vec::with_capacity(capacity),
        }
    }

    /// Append a frame at the end.
    pub fn push(&mut self, frame: FrameSnapshot) {
        self.frames.push(frame);
    }

    pub fn get(&self, index: usize) -> Option<&FrameSnapshot> {
        self.frames.get(index)
    }

    pub fn first(&self) -> Option<&FrameSnapshot> {
        self.frames.first()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FrameSnapshot> {
        self.frames.iter()
    }

    pub fn as_slice(&self) -> &[FrameSnapshot] {
        &self.frames
    }
}

impl Index<usize> for FrameSequence {
    type Output = FrameSnapshot;

    fn index(&self, index: usize) -> &FrameSnapshot {
        &self.frames[index]
    }
}

impl From<Vec<FrameSnapshot>> for FrameSequence {
    fn from(frames: Vec<FrameSnapshot>) -> Self {
        Self { frames }
    }
}

impl FromIterator<FrameSnapshot> for FrameSequence {
    fn from_iter<I: IntoIterator<Item = FrameSnapshot>>(iter: I) -> Self {
        Self {
            frames: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a FrameSequence {
    type Item = &'a FrameSnapshot;
    type IntoIter = std::slice::Iter<'a, FrameSnapshot>;

    fn into_iter(self) -> Self::IntoIter {
        self.frames.iter()
    }
}

/// Fixed-capacity FIFO of the most recent frames.
///
/// Once full, each push evicts the oldest frame in O(1).
#[derive(Debug, Clone)]
pub struct RollingBuffer {
    frames: VecDeque<FrameSnapshot>,
    capacity: usize,
}

impl RollingBuffer {
    /// Create a buffer holding at most `capacity` frames.
    pub fn new(capacity: usize) -> Self {
        Self {
            frames: VecDeque::with_capacity(capacity.min(MAX_PREALLOC)),
            capacity,
        }
    }

    /// Append a frame, evicting from the front when full.
    ///
    /// Returns the evicted frame, if any.
    pub fn push(&mut self, frame: FrameSnapshot) -> Option<FrameSnapshot> {
        if self.capacity == 0 {
            return Some(frame);
        }
        let evicted = if self.frames.len() >= self.capacity {
            self.frames.pop_front()
        } else {
            None
        };
        self.frames.push_back(frame);
        evicted
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.frames.len() >= self.capacity
    }

    pub fn get(&self, index: usize) -> Option<&FrameSnapshot> {
        self.frames.get(index)
    }

    pub fn iter(&self) -> std::collections::vec_deque::Iter<'_, FrameSnapshot> {
        self.frames.iter()
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }

    /// Copy the buffered frames, oldest first, into an owned sequence.
    pub fn to_sequence(&self) -> FrameSequence {
        self.frames.iter().cloned().collect()
    }
}
