use std::collections::VecDeque;

/// Fixed-capacity window over the most recent items.
///
/// Pushing into a full buffer evicts the oldest item. Used for live
/// introspection only; aggregates always read the unbounded streams.
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T> RingBuffer<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append an item, returning the evicted one if the buffer was full.
    pub fn push(&mut self, item: T) -> Option<T> {
        if self.capacity == 0 {
            return Some(item);
        }
        let evicted = if self.items.len() >= self.capacity {
            self.items.pop_front()
        } else {
            None
        };
        self.items.push_back(item);
        evicted
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.items.len() >= self.capacity
    }

    /// Oldest to newest.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + ExactSizeIterator {
        self.items.iter()
    }

    pub fn latest(&self) -> Option<&T> {
        self.items.back()
    }
}

impl RingBuffer<f64> {
    /// Mean of the buffered samples, `None` when empty.
    pub fn mean(&self) -> Option<f64> {
        if self.items.is_empty() {
            return None;
        }
        Some(self.items.iter().sum::<f64>() / self.items.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::RingBuffer;

    #[test]
    fn push_evicts_oldest_when_full() {
        let mut ring = RingBuffer::new(3);
        assert_eq!(ring.push(1), None);
        assert_eq!(ring.push(2), None);
        assert_eq!(ring.push(3), None);
        assert!(ring.is_full());
        assert_eq!(ring.push(4), Some(1));
        assert_eq!(ring.iter().copied().collect::<Vec<_>>(), vec![2, 3, 4]);
        assert_eq!(ring.latest(), Some(&4));
        assert_eq!(ring.len(), 3);
    }

    #[test]
    fn zero_capacity_never_stores() {
        let mut ring = RingBuffer::new(0);
        assert_eq!(ring.push("x"), Some("x"));
        assert!(ring.is_empty());
    }

    #[test]
    fn mean_covers_only_buffered_samples() {
        let mut ring = RingBuffer::new(2);
        assert_eq!(ring.mean(), None);
        ring.push(1.0);
        ring.push(3.0);
        ring.push(5.0);
        assert_eq!(ring.mean(), Some(4.0));
    }
}
