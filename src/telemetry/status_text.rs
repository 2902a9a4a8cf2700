//! # Status Text Queue
//!
//! Bounded queue of pending status messages and the chunk cursor that feeds
//! them over the passthrough link four characters at a time.
//!
//! The link is lossy and unacknowledged, so each chunk is repeated a fixed
//! number of times before the cursor advances. A message leaves the queue
//! only after its last chunk has been repeated.
//!
//! ## Chunk layout
//!
//! ```text
//! bits 31..24  char n      bits 15..8  char n+2
//! bits 23..16  char n+1    bits  7..0  char n+3
//! ```
//!
//! Characters are 7-bit ASCII, which leaves bit 7 of each byte free. The
//! final chunk of a message carries the severity there: bit 2 of the
//! severity at bit 23, bit 1 at bit 15, bit 0 at bit 7.

use std::collections::VecDeque;

use serde::Deserialize;
use tracing::debug;

use crate::error::{Result, TelemetryError};

/// Number of messages waiting to be sent
pub const QUEUE_CAPACITY: usize = 5;

/// Characters per chunk
pub const CHUNK_LEN: usize = 4;

/// Longest text carried; longer messages are truncated
pub const MAX_TEXT_LEN: usize = 50;

/// Default number of times each chunk is sent
pub const DEFAULT_REPEATS: u8 = 3;

/// Message severity, MAVLink numbering
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum Severity {
    Emergency = 0,
    Alert = 1,
    Critical = 2,
    Error = 3,
    Warning = 4,
    Notice = 5,
    Info = 6,
    Debug = 7,
}

impl Severity {
    /// Severity bits spread over the spare MSBs of a chunk
    pub fn chunk_bits(self) -> u32 {
        let sev = self as u32;
        ((sev & 0x4) << 21) | ((sev & 0x2) << 14) | ((sev & 0x1) << 7)
    }

    /// Recover a severity from a final chunk
    pub fn from_chunk(chunk: u32) -> Self {
        let sev = ((chunk >> 21) & 0x4) | ((chunk >> 14) & 0x2) | ((chunk >> 7) & 0x1);
        match sev {
            0 => Severity::Emergency,
            1 => Severity::Alert,
            2 => Severity::Critical,
            3 => Severity::Error,
            4 => Severity::Warning,
            5 => Severity::Notice,
            6 => Severity::Info,
            _ => Severity::Debug,
        }
    }
}

/// What to do when a message arrives and the queue is full
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Discard the new message, queue unchanged
    #[default]
    DropNewest,
    /// Discard the oldest message (even if partially sent) to make room
    OverwriteOldest,
}

/// One queued message, immutable once enqueued
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusText {
    text: Vec<u8>,
    severity: Severity,
}

impl StatusText {
    /// Build a message, truncating it and replacing non-ASCII characters
    pub fn new(text: &str, severity: Severity) -> Self {
        let text = text
            .chars()
            .take(MAX_TEXT_LEN)
            .map(|c| if c.is_ascii() && c != '\0' { c as u8 } else { b'?' })
            .collect();
        Self { text, severity }
    }

    pub fn text(&self) -> &[u8] {
        &self.text
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    /// Number of chunks needed to carry the text
    pub fn chunk_count(&self) -> usize {
        self.text.len().div_ceil(CHUNK_LEN)
    }

    /// Build the chunk starting at `char_index`
    fn chunk_at(&self, char_index: usize) -> u32 {
        let end = (char_index + CHUNK_LEN).min(self.text.len());
        let mut chunk = 0u32;
        for (i, &byte) in self.text[char_index..end].iter().enumerate() {
            chunk |= u32::from(byte) << ((CHUNK_LEN - 1 - i) * 8);
        }
        if end == self.text.len() {
            chunk |= self.severity.chunk_bits();
        }
        chunk
    }
}

/// Position inside the message at the head of the queue
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChunkCursor {
    pub char_index: usize,
    pub repeat_count: u8,
}

/// Bounded FIFO of status messages with a chunking cursor
#[derive(Debug, Clone)]
pub struct StatusTextQueue {
    messages: VecDeque<StatusText>,
    cursor: ChunkCursor,
    repeats: u8,
    policy: OverflowPolicy,
}

impl Default for StatusTextQueue {
    fn default() -> Self {
        Self::new(DEFAULT_REPEATS, OverflowPolicy::DropNewest)
    }
}

impl StatusTextQueue {
    /// Create an empty queue
    ///
    /// # Arguments
    ///
    /// * `repeats` - Times each chunk is sent, at least 1
    /// * `policy` - Behaviour when a message arrives while full
    #[must_use]
    pub fn new(repeats: u8, policy: OverflowPolicy) -> Self {
        Self {
            messages: VecDeque::with_capacity(QUEUE_CAPACITY),
            cursor: ChunkCursor::default(),
            repeats: repeats.max(1),
            policy,
        }
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.messages.len() >= QUEUE_CAPACITY
    }

    pub fn cursor(&self) -> ChunkCursor {
        self.cursor
    }

    /// Message currently being chunked
    pub fn front(&self) -> Option<&StatusText> {
        self.messages.front()
    }

    /// Queue a message
    ///
    /// Empty messages are ignored.
    ///
    /// # Errors
    ///
    /// Returns `QueueFull` when the queue is full and the policy is
    /// [`OverflowPolicy::DropNewest`]; the queue is left untouched.
    pub fn enqueue(&mut self, text: &str, severity: Severity) -> Result<()> {
        let message = StatusText::new(text, severity);
        if message.text.is_empty() {
            return Ok(());
        }

        if self.is_full() {
            match self.policy {
                OverflowPolicy::DropNewest => return Err(TelemetryError::QueueFull),
                OverflowPolicy::OverwriteOldest => {
                    debug!("Status text queue full, discarding oldest message");
                    self.retire();
                }
            }
        }

        self.messages.push_back(message);
        Ok(())
    }

    /// Chunk the cursor points at, without advancing
    pub fn peek_chunk(&self) -> Option<u32> {
        self.messages
            .front()
            .map(|message| message.chunk_at(self.cursor.char_index))
    }

    /// Next chunk to transmit
    ///
    /// Advances the cursor: each chunk is handed out `repeats` times, then the
    /// cursor moves four characters on. After the last chunk's final repeat
    /// the message is retired and the cursor moves to the next one.
    pub fn next_chunk(&mut self) -> Option<u32> {
        let chunk = self.peek_chunk()?;

        self.cursor.repeat_count += 1;
        if self.cursor.repeat_count >= self.repeats {
            self.cursor.repeat_count = 0;
            self.cursor.char_index += CHUNK_LEN;

            let finished = self
                .messages
                .front()
                .is_some_and(|message| self.cursor.char_index >= message.text.len());
            if finished {
                self.retire();
            }
        }

        Some(chunk)
    }

    /// Drop the message at the head of the queue and reset the cursor
    pub fn retire(&mut self) -> Option<StatusText> {
        self.cursor = ChunkCursor::default();
        self.messages.pop_front()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(queue: &mut StatusTextQueue) -> Vec<u32> {
        std::iter::from_fn(|| queue.next_chunk()).collect()
    }

    fn text_of(chunks: &[u32]) -> String {
        chunks
            .iter()
            .flat_map(|c| c.to_be_bytes())
            .map(|b| b & 0x7F)
            .filter(|&b| b != 0)
            .map(char::from)
            .collect()
    }

    #[test]
    fn test_severity_bits_roundtrip() {
        for sev in [
            Severity::Emergency,
            Severity::Alert,
            Severity::Critical,
            Severity::Error,
            Severity::Warning,
            Severity::Notice,
            Severity::Info,
            Severity::Debug,
        ] {
            let bits = sev.chunk_bits();
            assert_eq!(bits & !0x0080_8080, 0);
            assert_eq!(Severity::from_chunk(bits), sev);
        }
    }

    #[test]
    fn test_chunk_layout() {
        let mut queue = StatusTextQueue::new(1, OverflowPolicy::DropNewest);
        queue.enqueue("ABCDEF", Severity::Emergency).unwrap();

        assert_eq!(queue.next_chunk(), Some(0x4142_4344));
        assert_eq!(queue.next_chunk(), Some(0x4546_0000));
        assert_eq!(queue.next_chunk(), None);
    }

    #[test]
    fn test_last_chunk_carries_severity() {
        let mut queue = StatusTextQueue::new(1, OverflowPolicy::DropNewest);
        queue.enqueue("Hi", Severity::Warning).unwrap();

        let chunk = queue.next_chunk().unwrap();
        assert_eq!(chunk & 0x7F7F_7F7F, 0x4869_0000);
        assert_eq!(Severity::from_chunk(chunk), Severity::Warning);
    }

    #[test]
    fn test_each_chunk_repeated_consecutively() {
        let mut queue = StatusTextQueue::default();
        let text = "Bad Compass Health";
        queue.enqueue(text, Severity::Critical).unwrap();

        let chunks = drain(&mut queue);
        let distinct = text.len().div_ceil(CHUNK_LEN);
        assert_eq!(chunks.len(), distinct * usize::from(DEFAULT_REPEATS));

        for group in chunks.chunks(usize::from(DEFAULT_REPEATS)) {
            assert!(group.iter().all(|&c| c == group[0]));
        }
        let firsts: Vec<u32> = chunks.iter().step_by(usize::from(DEFAULT_REPEATS)).copied().collect();
        assert_eq!(text_of(&firsts), text);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_exact_multiple_of_chunk_len() {
        let mut queue = StatusTextQueue::new(2, OverflowPolicy::DropNewest);
        queue.enqueue("ABCDEFGH", Severity::Info).unwrap();

        let chunks = drain(&mut queue);
        assert_eq!(chunks.len(), 4);
        assert_eq!(Severity::from_chunk(chunks[3]), Severity::Info);
        assert_eq!(chunks[0], 0x4142_4344);
    }

    #[test]
    fn test_message_retired_only_after_last_repeat() {
        let mut queue = StatusTextQueue::new(3, OverflowPolicy::DropNewest);
        queue.enqueue("OK", Severity::Info).unwrap();

        queue.next_chunk();
        queue.next_chunk();
        assert_eq!(queue.len(), 1);
        queue.next_chunk();
        assert_eq!(queue.len(), 0);
        assert_eq!(queue.cursor(), ChunkCursor::default());
    }

    #[test]
    fn test_moves_on_to_next_message() {
        let mut queue = StatusTextQueue::new(1, OverflowPolicy::DropNewest);
        queue.enqueue("one", Severity::Info).unwrap();
        queue.enqueue("two", Severity::Info).unwrap();

        let chunks = drain(&mut queue);
        assert_eq!(chunks.len(), 2);
        assert_eq!(text_of(&chunks[..1]), "one");
        assert_eq!(text_of(&chunks[1..]), "two");
    }

    #[test]
    fn test_capacity_and_drop_newest() {
        let mut queue = StatusTextQueue::default();
        for i in 0..QUEUE_CAPACITY {
            queue.enqueue(&format!("msg {}", i), Severity::Info).unwrap();
        }
        assert!(queue.is_full());

        let result = queue.enqueue("overflow", Severity::Info);
        assert!(matches!(result, Err(TelemetryError::QueueFull)));
        assert_eq!(queue.len(), QUEUE_CAPACITY);
        assert_eq!(queue.front().unwrap().text(), b"msg 0");
    }

    #[test]
    fn test_drop_newest_keeps_cursor() {
        let mut queue = StatusTextQueue::new(1, OverflowPolicy::DropNewest);
        for i in 0..QUEUE_CAPACITY {
            queue.enqueue(&format!("message {}", i), Severity::Info).unwrap();
        }
        queue.next_chunk();
        let cursor = queue.cursor();

        assert!(queue.enqueue("late", Severity::Info).is_err());
        assert_eq!(queue.cursor(), cursor);
        assert_eq!(queue.peek_chunk(), Some(0x7361_6765)); // "sage"
    }

    #[test]
    fn test_overwrite_oldest() {
        let mut queue = StatusTextQueue::new(1, OverflowPolicy::OverwriteOldest);
        for i in 0..QUEUE_CAPACITY {
            queue.enqueue(&format!("msg {}", i), Severity::Info).unwrap();
        }
        queue.next_chunk();

        queue.enqueue("newest", Severity::Alert).unwrap();
        assert_eq!(queue.len(), QUEUE_CAPACITY);
        assert_eq!(queue.front().unwrap().text(), b"msg 1");
        assert_eq!(queue.cursor(), ChunkCursor::default());
    }

    #[test]
    fn test_truncates_and_sanitizes() {
        let long = "x".repeat(80);
        let message = StatusText::new(&long, Severity::Info);
        assert_eq!(message.text().len(), MAX_TEXT_LEN);

        let message = StatusText::new("temp 25°C", Severity::Info);
        assert_eq!(message.text(), b"temp 25?C");
    }

    #[test]
    fn test_empty_message_ignored() {
        let mut queue = StatusTextQueue::default();
        queue.enqueue("", Severity::Info).unwrap();
        assert!(queue.is_empty());
        assert_eq!(queue.next_chunk(), None);
    }

    #[test]
    fn test_peek_does_not_advance() {
        let mut queue = StatusTextQueue::default();
        queue.enqueue("PreArm", Severity::Critical).unwrap();
        assert_eq!(queue.peek_chunk(), queue.peek_chunk());
        assert_eq!(queue.cursor(), ChunkCursor::default());
    }
}
