use std::collections::VecDeque;

/// Bounded FIFO of readings that could not be delivered. When full, the
/// oldest reading is dropped to make room.
///
/// The server stamps readings on arrival, so a flushed backlog lands as a
/// burst of readings timestamped at delivery time and weighs on the
/// server's trailing averages until it ages out of their windows.
pub struct ReadingBuffer<T> {
    buffer: VecDeque<T>,
    max_size: usize,
}

impl<T> ReadingBuffer<T> {
    pub fn new(max_size: usize) -> Self {
        Self {
            buffer: VecDeque::with_capacity(max_size.min(1024)),
            max_size,
        }
    }

    /// Returns the number of readings dropped to stay within `max_size`.
    pub fn push(&mut self, item: T) -> usize {
        let mut dropped = 0;
        while self.buffer.len() >= self.max_size {
            self.buffer.pop_front();
            dropped += 1;
        }
        self.buffer.push_back(item);
        dropped
    }

    pub fn pop_oldest(&mut self) -> Option<T> {
        self.buffer.pop_front()
    }

    /// Puts back a reading taken with `pop_oldest` that failed to send.
    pub fn restore_oldest(&mut self, item: T) {
        if self.buffer.len() >= self.max_size {
            return;
        }
        self.buffer.push_front(item);
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}
