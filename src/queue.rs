//! Rendezvous queue: the task set's (inert) handoff channel
//!
//! A fixed-capacity FIFO of machine-word messages. The demo task set
//! creates one and never touches it again; it stays implemented and tested
//! so a task set that re-enables producer/consumer handoff gets FIFO order,
//! a hard capacity bound, and back-pressure on a full queue.

use core::mem;

/// Error returned when sending into a full queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueFull;

/// Fixed-capacity FIFO of `usize` messages. Capacity is exactly `N`.
#[derive(Debug, Clone)]
pub struct RendezvousQueue<const N: usize> {
    slots: [usize; N],
    head: usize,
    len: usize,
}

impl<const N: usize> RendezvousQueue<N> {
    pub const fn new() -> Self {
        Self {
            slots: [0; N],
            head: 0,
            len: 0,
        }
    }

    /// Bytes of message storage, charged against the kernel budget.
    pub const fn footprint() -> usize {
        N * mem::size_of::<usize>()
    }

    /// Enqueue a word. Fails (back-pressure) when the queue is full.
    pub fn send(&mut self, word: usize) -> Result<(), QueueFull> {
        if self.len == N {
            return Err(QueueFull);
        }
        let tail = (self.head + self.len) % N;
        self.slots[tail] = word;
        self.len += 1;
        Ok(())
    }

    /// Dequeue the oldest word, if any.
    pub fn recv(&mut self) -> Option<usize> {
        if self.len == 0 {
            return None;
        }
        let word = self.slots[self.head];
        self.head = (self.head + 1) % N;
        self.len -= 1;
        Some(word)
    }

    pub const fn len(&self) -> usize {
        self.len
    }

    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub const fn is_full(&self) -> bool {
        self.len == N
    }

    pub const fn capacity(&self) -> usize {
        N
    }
}

impl<const N: usize> Default for RendezvousQueue<N> {
    fn default() -> Self {
        Self::new()
    }
}
