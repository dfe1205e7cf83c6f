//! Approximate LRU replacement policy.
//!
//! Candidates are ordered by the moment they were last unpinned: the victim
//! is the frame that has gone longest without a holder. Accesses to a pinned
//! page are not tracked, only pin/unpin transitions.

use parking_lot::Mutex;

use crate::buffer::replacer::Replacer;
use crate::common::FrameId;

const NIL: usize = usize::MAX;

/// LRU replacer backed by an intrusive doubly-linked list over a fixed arena.
///
/// # Layout
/// ```text
///  head (oldest)                              tail (most recently unpinned)
///     │                                           │
///     ▼                                           ▼
///  ┌──────┐ next ┌──────┐ next ┌──────┐ next ┌──────┐
///  │ F3   │─────▶│ F0   │─────▶│ F7   │─────▶│ F1   │
///  │      │◀─────│      │◀─────│      │◀─────│      │
///  └──────┘ prev └──────┘ prev └──────┘ prev └──────┘
/// ```
/// Slot `i` of the arena holds the links of frame `i`, so membership, insert,
/// remove and victim are all O(1) and no node owns another.
pub struct LruReplacer {
    inner: Mutex<LruList>,
}

struct LruList {
    links: Vec<Link>,
    head: usize,
    tail: usize,
    len: usize,
}

#[derive(Clone, Copy)]
struct Link {
    prev: usize,
    next: usize,
    linked: bool,
}

impl Link {
    const UNLINKED: Link = Link {
        prev: NIL,
        next: NIL,
        linked: false,
    };
}

impl LruList {
    fn contains(&self, idx: usize) -> bool {
        self.links.get(idx).is_some_and(|l| l.linked)
    }

    fn push_back(&mut self, idx: usize) {
        self.links[idx] = Link {
            prev: self.tail,
            next: NIL,
            linked: true,
        };
        if self.tail == NIL {
            self.head = idx;
        } else {
            self.links[self.tail].next = idx;
        }
        self.tail = idx;
        self.len += 1;
    }

    fn unlink(&mut self, idx: usize) {
        let Link { prev, next, .. } = self.links[idx];
        if prev == NIL {
            self.head = next;
        } else {
            self.links[prev].next = next;
        }
        if next == NIL {
            self.tail = prev;
        } else {
            self.links[next].prev = prev;
        }
        self.links[idx] = Link::UNLINKED;
        self.len -= 1;
    }
}

impl LruReplacer {
    /// Create a replacer able to track frames `0..capacity`.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(LruList {
                links: vec![Link::UNLINKED; capacity],
                head: NIL,
                tail: NIL,
                len: 0,
            }),
        }
    }

    /// Maximum number of candidates.
    pub fn capacity(&self) -> usize {
        self.inner.lock().links.len()
    }

    /// Candidates from oldest to most recently unpinned.
    pub fn candidates(&self) -> Vec<FrameId> {
        let list = self.inner.lock();
        let mut out = Vec::with_capacity(list.len);
        let mut cur = list.head;
        while cur != NIL {
            out.push(FrameId::new(cur));
            cur = list.links[cur].next;
        }
        out
    }
}

impl Replacer for LruReplacer {
    fn record_unpin(&self, frame_id: FrameId) {
        let mut list = self.inner.lock();
        // Out-of-range ids can never be tracked; the arena doubles as the
        // capacity bound.
        if frame_id.0 >= list.links.len() || list.contains(frame_id.0) {
            return;
        }
        if list.len >= list.links.len() {
            return;
        }
        list.push_back(frame_id.0);
    }

    fn record_pin(&self, frame_id: FrameId) {
        let mut list = self.inner.lock();
        if list.contains(frame_id.0) {
            list.unlink(frame_id.0);
        }
    }

    fn victim(&self) -> Option<FrameId> {
        let mut list = self.inner.lock();
        if list.head == NIL {
            return None;
        }
        let idx = list.head;
        list.unlink(idx);
        Some(FrameId::new(idx))
    }

    fn size(&self) -> usize {
        self.inner.lock().len
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fid(i: usize) -> FrameId {
        FrameId::new(i)
    }

    #[test]
    fn test_lru_sample() {
        let replacer = LruReplacer::new(7);

        for i in [1, 2, 3, 4, 5, 6, 1] {
            replacer.record_unpin(fid(i));
        }
        // Re-unpinning frame 1 must not duplicate or reorder it.
        assert_eq!(replacer.size(), 6);

        assert_eq!(replacer.victim(), Some(fid(1)));
        assert_eq!(replacer.victim(), Some(fid(2)));
        assert_eq!(replacer.victim(), Some(fid(3)));

        replacer.record_pin(fid(3));
        replacer.record_pin(fid(4));
        assert_eq!(replacer.size(), 2);

        replacer.record_unpin(fid(4));
        assert_eq!(replacer.victim(), Some(fid(5)));
        assert_eq!(replacer.victim(), Some(fid(6)));
        assert_eq!(replacer.victim(), Some(fid(4)));
        assert_eq!(replacer.victim(), None);
        assert_eq!(replacer.size(), 0);
    }

    #[test]
    fn test_oldest_unpinned_first() {
        let replacer = LruReplacer::new(8);
        replacer.record_unpin(fid(5));
        replacer.record_unpin(fid(3));

        assert_eq!(replacer.victim(), Some(fid(5)));
        assert_eq!(replacer.victim(), Some(fid(3)));
    }

    #[test]
    fn test_pinned_frame_is_never_victim() {
        let replacer = LruReplacer::new(8);
        replacer.record_unpin(fid(5));
        replacer.record_unpin(fid(3));
        replacer.record_pin(fid(3));

        assert_eq!(replacer.victim(), Some(fid(5)));
        assert_eq!(replacer.victim(), None);
    }

    #[test]
    fn test_pin_untracked_is_noop() {
        let replacer = LruReplacer::new(4);
        replacer.record_pin(fid(2));
        replacer.record_pin(fid(100));
        assert_eq!(replacer.size(), 0);
    }

    #[test]
    fn test_pin_middle_keeps_order() {
        let replacer = LruReplacer::new(4);
        for i in 0..4 {
            replacer.record_unpin(fid(i));
        }
        replacer.record_pin(fid(1));
        replacer.record_pin(fid(3));

        assert_eq!(replacer.candidates(), vec![fid(0), fid(2)]);

        replacer.record_unpin(fid(1));
        assert_eq!(replacer.candidates(), vec![fid(0), fid(2), fid(1)]);
    }

    #[test]
    fn test_out_of_range_is_ignored() {
        let replacer = LruReplacer::new(2);
        replacer.record_unpin(fid(0));
        replacer.record_unpin(fid(1));
        replacer.record_unpin(fid(2));

        assert_eq!(replacer.size(), 2);
        assert_eq!(replacer.capacity(), 2);
    }

    #[test]
    fn test_concurrent_unpin_and_victim() {
        use std::sync::Arc;
        use std::thread;

        let replacer = Arc::new(LruReplacer::new(64));
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let r = Arc::clone(&replacer);
                thread::spawn(move || {
                    for i in 0..16 {
                        r.record_unpin(fid(t * 16 + i));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(replacer.size(), 64);

        let mut seen = std::collections::HashSet::new();
        while let Some(f) = replacer.victim() {
            assert!(seen.insert(f));
        }
        assert_eq!(seen.len(), 64);
    }
}
