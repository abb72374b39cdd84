//! Array-backed binary min-heap used as the event queue.
//!
//! The root (index 0) always holds the smallest item. Children of node `i` live at
//! `2i + 1` and `2i + 2`. Storage grows by a fixed increment rather than doubling,
//! since the event count grows roughly linearly over a run; it never shrinks.

/// Number of slots added to the backing storage each time it fills up.
pub const GROWTH_INCREMENT: usize = 128;

/// Binary min-heap over any totally ordered item type.
///
/// Items comparing equal come out in unspecified order.
#[derive(Debug, Clone)]
pub struct MinHeap<T> {
    items: Vec<T>,
}

impl<T: Ord> MinHeap<T> {
    /// Create an empty heap with one growth increment of capacity.
    pub fn new() -> Self {
        Self {
            items: Vec::with_capacity(GROWTH_INCREMENT),
        }
    }

    /// Number of items currently held. O(1).
    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Allocated slots in the backing storage.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.items.capacity()
    }

    /// The smallest item, without removing it.
    #[inline]
    pub fn peek(&self) -> Option<&T> {
        self.items.first()
    }

    /// Drop every item, keeping the allocation.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Insert an item in O(log n).
    pub fn push(&mut self, item: T) {
        if self.items.len() == self.items.capacity() {
            self.items.reserve_exact(GROWTH_INCREMENT);
        }
        self.items.push(item);
        self.bubble_up(self.items.len() - 1);
    }

    /// Remove and return the smallest item, or `None` when empty.
    pub fn pop(&mut self) -> Option<T> {
        let last = self.items.pop()?;
        if self.items.is_empty() {
            return Some(last);
        }
        let root = std::mem::replace(&mut self.items[0], last);
        self.trickle_down(0);
        Some(root)
    }

    fn bubble_up(&mut self, mut i: usize) {
        while let Some(p) = parent(i) {
            if self.items[i] < self.items[p] {
                self.items.swap(i, p);
                i = p;
            } else {
                break;
            }
        }
    }

    fn trickle_down(&mut self, mut i: usize) {
        while let Some(c) = self.smallest_child(i) {
            if self.items[i] > self.items[c] {
                self.items.swap(i, c);
                i = c;
            } else {
                break;
            }
        }
    }

    #[inline]
    fn left_child(&self, i: usize) -> Option<usize> {
        let c = 2 * i + 1;
        (c < self.items.len()).then_some(c)
    }

    #[inline]
    fn right_child(&self, i: usize) -> Option<usize> {
        let c = 2 * i + 2;
        (c < self.items.len()).then_some(c)
    }

    /// Index of the smaller child of `i`, or `None` for a leaf.
    fn smallest_child(&self, i: usize) -> Option<usize> {
        match (self.left_child(i), self.right_child(i)) {
            (Some(l), Some(r)) => Some(if self.items[r] < self.items[l] { r } else { l }),
            (Some(l), None) => Some(l),
            // A complete tree never has a right child without a left one.
            _ => None,
        }
    }
}

impl<T: Ord> Default for MinHeap<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[inline]
fn parent(i: usize) -> Option<usize> {
    (i > 0).then(|| (i - 1) / 2)
}
