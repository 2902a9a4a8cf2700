//! Byte transport seen by the encoder
//!
//! The encoder runs from a fixed-rate tick and must never wait on the UART,
//! so it talks to a non-blocking [`Transport`]. [`LinkBuffer`] is the
//! in-memory implementation the binary bridges to the async serial port.

use std::collections::VecDeque;

use bytes::{Bytes, BytesMut};

/// Non-blocking byte transport
#[cfg_attr(test, mockall::automock)]
pub trait Transport {
    /// Whether the link is up; a tick on a down link does nothing
    fn is_ready(&self) -> bool;

    /// Bytes that can be written right now without dropping any
    fn tx_space(&self) -> usize;

    /// Write as much of `data` as fits, returning the count written
    fn write(&mut self, data: &[u8]) -> usize;

    /// Next received byte, if any
    fn read_byte(&mut self) -> Option<u8>;
}

/// Default outbound capacity, a few worst-case frames
pub const DEFAULT_LINK_CAPACITY: usize = 128;

/// Buffered transport between the encoder and a serial port
#[derive(Debug, Clone)]
pub struct LinkBuffer {
    inbound: VecDeque<u8>,
    outbound: BytesMut,
    capacity: usize,
    ready: bool,
}

impl Default for LinkBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_LINK_CAPACITY)
    }
}

impl LinkBuffer {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            inbound: VecDeque::new(),
            outbound: BytesMut::with_capacity(capacity),
            capacity,
            ready: true,
        }
    }

    pub fn set_ready(&mut self, ready: bool) {
        self.ready = ready;
    }

    /// Queue bytes received from the serial port
    pub fn push_inbound(&mut self, data: &[u8]) {
        self.inbound.extend(data);
    }

    /// Bytes waiting to go out
    pub fn outbound_len(&self) -> usize {
        self.outbound.len()
    }

    /// Take up to `max` outbound bytes for the serial port
    pub fn take_outbound_up_to(&mut self, max: usize) -> Bytes {
        let count = max.min(self.outbound.len());
        self.outbound.split_to(count).freeze()
    }

    /// Take every outbound byte
    pub fn take_outbound(&mut self) -> Bytes {
        self.outbound.split().freeze()
    }
}

impl Transport for LinkBuffer {
    fn is_ready(&self) -> bool {
        self.ready
    }

    fn tx_space(&self) -> usize {
        self.capacity.saturating_sub(self.outbound.len())
    }

    fn write(&mut self, data: &[u8]) -> usize {
        let count = data.len().min(self.tx_space());
        self.outbound.extend_from_slice(&data[..count]);
        count
    }

    fn read_byte(&mut self) -> Option<u8> {
        self.inbound.pop_front()
    }
}
