//! Reader over the TLV encoded payload of a command.
//!
//! Decoding the payload is up to the command callback, the reader only keeps
//! track of the position. It implements [`bytes::Buf`] so the usual
//! `get_u8`/`get_u16_le`... accessors are available.

use bytes::Buf;

#[derive(Debug, Clone, Copy)]
pub struct TlvReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> TlvReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// The whole payload, regardless of the position
    pub fn payload(&self) -> &'a [u8] {
        self.data
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn peek(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }
}

impl<'a> Buf for TlvReader<'a> {
    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn chunk(&self) -> &[u8] {
        &self.data[self.pos..]
    }

    fn advance(&mut self, cnt: usize) {
        assert!(cnt <= self.remaining(), "advance past the end of the payload");
        self.pos += cnt;
    }
}
