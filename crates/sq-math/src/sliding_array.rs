//! A fixed-capacity window that discards its oldest observation as a
//! new one arrives.
//!
//! Used by autoregressive noise to keep the trailing window of past
//! values a recurrence needs without retaining the whole history.

use std::collections::VecDeque;

/// A fixed-capacity sliding window over `T`, oldest-first.
///
/// Capacity 0 is allowed and simply discards every push.
#[derive(Debug, Clone)]
pub struct SlidingArray<T> {
    capacity: usize,
    data: VecDeque<T>,
}

impl<T: Clone> SlidingArray<T> {
    /// Construct a window of the given capacity, every slot initially
    /// holding a copy of `fill`.
    pub fn new(capacity: usize, fill: T) -> Self {
        let mut data = VecDeque::with_capacity(capacity);
        for _ in 0..capacity {
            data.push_back(fill.clone());
        }
        SlidingArray { capacity, data }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append `value`, discarding the oldest entry if the window is
    /// already full.
    pub fn push_back(&mut self, value: T) {
        if self.capacity == 0 {
            return;
        }
        if self.data.len() == self.capacity {
            self.data.pop_front();
        }
        self.data.push_back(value);
    }

    /// Iterate the window's contents, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.data.iter()
    }

    /// The value `steps_back` pushes before the most recent one
    /// (`steps_back == 0` is the most recent push), if that many
    /// pushes have happened yet.
    pub fn lag(&self, steps_back: usize) -> Option<&T> {
        let len = self.data.len();
        if steps_back >= len {
            return None;
        }
        self.data.get(len - 1 - steps_back)
    }
}
