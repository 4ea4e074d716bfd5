use crate::Value;
use parking_lot::Mutex;
use std::sync::Arc;

/// Backing storage for [`RingBuffer`]: a flat slot array, the index of the
/// oldest live slot and the number of live slots.
#[derive(Debug)]
struct Slots {
    data: Box<[Value]>,
    head: usize,
    len: usize,
    overwritten: u64,
}

/// A fixed-capacity ring buffer that overwrites its oldest value when full.
///
/// Every operation takes the same lock, so a [`push`](RingBuffer::push) racing
/// a [`flush`](RingBuffer::flush) lands entirely before or entirely after it.
/// Cloning yields another handle to the same storage.
#[derive(Debug, Clone)]
pub struct RingBuffer {
    slots: Arc<Mutex<Slots>>,
}

impl RingBuffer {
    /// Create a new ring buffer with the specified capacity
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "ring buffer capacity must be non-zero");
        Self {
            slots: Arc::new(Mutex::new(Slots {
                data: vec![0; capacity].into_boxed_slice(),
                head: 0,
                len: 0,
                overwritten: 0,
            })),
        }
    }

    /// Insert `value` as the newest element.
    ///
    /// When the buffer is already full the oldest element is evicted and
    /// returned. This never blocks and never fails.
    pub fn push(&self, value: Value) -> Option<Value> {
        let mut slots = self.slots.lock();
        let capacity = slots.data.len();
        let tail = (slots.head + slots.len) % capacity;

        if slots.len == capacity {
            // tail == head here, so the write below replaces the oldest value
            let evicted = slots.data[tail];
            slots.data[tail] = value;
            slots.head = (slots.head + 1) % capacity;
            slots.overwritten += 1;
            Some(evicted)
        } else {
            slots.data[tail] = value;
            slots.len += 1;
            None
        }
    }

    /// Take every live value, oldest first, leaving the buffer empty.
    pub fn flush(&self) -> Vec<Value> {
        let mut slots = self.slots.lock();
        let capacity = slots.data.len();
        let drained = (0..slots.len)
            .map(|offset| slots.data[(slots.head + offset) % capacity])
            .collect();
        slots.head = 0;
        slots.len = 0;
        drained
    }

    /// Get the number of live values
    pub fn len(&self) -> usize {
        self.slots.lock().len
    }

    /// Check if the buffer is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get the capacity of the buffer
    pub fn capacity(&self) -> usize {
        self.slots.lock().data.len()
    }

    /// Total number of values evicted by overflow since creation
    pub fn overwritten_count(&self) -> u64 {
        self.slots.lock().overwritten
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::thread;

    #[test]
    fn test_push_then_flush_in_insertion_order() {
        let buffer = RingBuffer::new(5);
        for value in [3, 9, 6] {
            assert_eq!(buffer.push(value), None);
        }
        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.flush(), vec![3, 9, 6]);
    }

    #[test]
    fn test_overflow_keeps_newest() {
        let buffer = RingBuffer::new(2);
        buffer.push(3);
        buffer.push(9);
        assert_eq!(buffer.push(6), Some(3));
        assert_eq!(buffer.overwritten_count(), 1);
        assert_eq!(buffer.flush(), vec![9, 6]);
    }

    #[test]
    fn test_empty_flush() {
        let buffer = RingBuffer::new(4);
        assert!(buffer.flush().is_empty());
    }

    #[test]
    fn test_second_flush_is_empty() {
        let buffer = RingBuffer::new(3);
        buffer.push(1);
        buffer.push(2);
        assert_eq!(buffer.flush(), vec![1, 2]);
        assert!(buffer.flush().is_empty());
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_wraps_after_partial_flush() {
        let buffer = RingBuffer::new(3);
        buffer.push(1);
        buffer.push(2);
        buffer.flush();
        for value in [4, 5, 6, 7] {
            buffer.push(value);
        }
        assert_eq!(buffer.flush(), vec![5, 6, 7]);
    }

    #[test]
    fn test_capacity() {
        let buffer = RingBuffer::new(42);
        assert_eq!(buffer.capacity(), 42);
    }

    #[test]
    #[should_panic(expected = "non-zero")]
    fn test_zero_capacity_rejected() {
        let _ = RingBuffer::new(0);
    }

    #[test]
    fn test_concurrent_push_and_flush_lose_nothing_but_overflow() {
        let buffer = RingBuffer::new(1024);
        let writer = {
            let buffer = buffer.clone();
            thread::spawn(move || {
                for value in 0..500 {
                    buffer.push(value);
                }
            })
        };

        let mut seen = Vec::new();
        while !writer.is_finished() {
            seen.extend(buffer.flush());
        }
        writer.join().unwrap();
        seen.extend(buffer.flush());

        // Every flush is a contiguous, ordered slice of the pushes
        assert_eq!(seen, (0..500).collect::<Vec<_>>());
    }

    proptest! {
        #[test]
        fn prop_flush_returns_last_capacity_values(
            capacity in 1usize..16,
            values in proptest::collection::vec(any::<i64>(), 0..64),
        ) {
            let buffer = RingBuffer::new(capacity);
            for &value in &values {
                buffer.push(value);
            }
            let keep = values.len().min(capacity);
            let expected = values[values.len() - keep..].to_vec();
            prop_assert_eq!(buffer.flush(), expected);
            prop_assert!(buffer.flush().is_empty());
        }
    }
}
