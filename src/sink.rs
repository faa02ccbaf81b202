//! Growable output buffer with patchable length reservations
//!
//! A [`ByteSink`] is handed by mutable reference to every converter taking
//! part in one encode call. Besides plain appends it offers the two framing
//! primitives of the wire format:
//!
//!   * [`ByteSink::extend_write`] appends `[4-byte LE length][bytes]` for a
//!     block whose length is already known.
//!   * [`ByteSink::reserve_length`] / [`ByteSink::patch`] bracket a block whose
//!     length is *not* known until it has been written, such as a nested
//!     composite. The reservation writes a 4-byte placeholder; patching it later
//!     stores the number of bytes appended since, however many nested
//!     reservations were opened and patched in between.
//!
//! This makes encoding single-pass: no converter needs to measure a value
//! before writing it.
//!
//! The contents of a sink can only be observed by consuming it through
//! [`ByteSink::finalize`], so an encode call that faults part-way leaves
//! nothing behind.

use crate::error::{Fault, OverflowError};

/// Width of every length prefix in the wire format
pub const PREFIX_LEN: usize = 4;

/// Opaque marker for a length placeholder written by [`ByteSink::reserve_length`]
///
/// Must be passed back to [`ByteSink::patch`] on the same sink once the
/// bracketed block has been written.
#[must_use = "an unpatched reservation leaves a zero length prefix in the buffer"]
#[derive(Debug)]
pub struct Reservation {
    end: usize,
}

/// Newtype around `Vec<u8>` used as the target of every encode call
#[derive(Default)]
#[repr(transparent)]
pub struct ByteSink(Vec<u8>);

impl ByteSink {
    #[must_use]
    pub fn new() -> Self {
        Self(Vec::new())
    }

    #[must_use]
    pub fn with_capacity(cap: usize) -> Self {
        Self(Vec::with_capacity(cap))
    }

    /// Number of bytes written so far
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Amortizes reallocation ahead of `extra` further bytes
    pub fn anticipate(&mut self, extra: usize) {
        self.0.reserve(extra)
    }

    /// Appends a single byte
    pub fn push_one(&mut self, b: u8) -> usize {
        self.0.push(b);
        1
    }

    /// Appends the bytes of a known-length array
    pub fn push_many<const N: usize>(&mut self, arr: [u8; N]) -> usize {
        self.0.extend_from_slice(&arr);
        N
    }

    /// Appends every byte of `buf`
    pub fn push_all(&mut self, buf: &[u8]) -> usize {
        self.0.extend_from_slice(buf);
        buf.len()
    }

    /// Appends `n` zeroed bytes and returns them for the caller to fill in
    pub fn allocate(&mut self, n: usize) -> &mut [u8] {
        let start = self.0.len();
        self.0.resize(start + n, 0);
        &mut self.0[start..]
    }

    /// Appends `[4-byte LE length][buf]`
    pub fn extend_write(&mut self, buf: &[u8]) -> Result<(), Fault> {
        let prefix = encode_prefix(buf.len())?;
        self.anticipate(PREFIX_LEN + buf.len());
        self.push_many(prefix);
        self.push_all(buf);
        Ok(())
    }

    /// Writes a 4-byte placeholder for a length that will be known later
    pub fn reserve_length(&mut self) -> Reservation {
        self.push_many([0u8; PREFIX_LEN]);
        Reservation { end: self.0.len() }
    }

    /// Overwrites the placeholder of `token` with the number of bytes written
    /// after it
    pub fn patch(&mut self, token: Reservation) -> Result<(), Fault> {
        let Some(length) = self.0.len().checked_sub(token.end) else {
            return Err(Fault::truncated(token.end, self.0.len()));
        };
        let prefix = encode_prefix(length)?;
        self.0[token.end - PREFIX_LEN..token.end].copy_from_slice(&prefix);
        Ok(())
    }

    /// Runs `body` between a reservation and its patch, so that whatever it
    /// writes ends up as one length-prefixed block
    pub fn framed<F>(&mut self, body: F) -> Result<(), Fault>
    where
        F: FnOnce(&mut Self) -> Result<(), Fault>,
    {
        let token = self.reserve_length();
        body(self)?;
        self.patch(token)
    }

    /// Consumes the sink and yields the encoded bytes
    #[must_use]
    pub fn finalize(self) -> Vec<u8> {
        self.0
    }
}

/// Little-endian 4-byte length prefix for a block of `length` bytes
pub(crate) fn encode_prefix(length: usize) -> Result<[u8; PREFIX_LEN], Fault> {
    u32::try_from(length)
        .map(u32::to_le_bytes)
        .map_err(|_| Fault::Overflow(OverflowError::PrefixTooLarge { length }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extend_write_prefixes_length() {
        let mut sink = ByteSink::new();
        sink.extend_write(b"abc").unwrap();
        assert_eq!(sink.finalize(), [3, 0, 0, 0, b'a', b'b', b'c']);
    }

    #[test]
    fn nested_reservations_patch_inner_first() {
        let mut sink = ByteSink::new();
        let outer = sink.reserve_length();
        sink.push_one(0xaa);
        let inner = sink.reserve_length();
        sink.push_all(&[1, 2, 3]);
        sink.patch(inner).unwrap();
        sink.patch(outer).unwrap();
        assert_eq!(
            sink.finalize(),
            [8, 0, 0, 0, 0xaa, 3, 0, 0, 0, 1, 2, 3]
        );
    }

    #[test]
    fn framed_empty_body() {
        let mut sink = ByteSink::new();
        sink.framed(|_| Ok(())).unwrap();
        assert_eq!(sink.finalize(), [0, 0, 0, 0]);
    }

    #[test]
    fn allocate_returns_tail() {
        let mut sink = ByteSink::new();
        sink.push_one(9);
        sink.allocate(2).copy_from_slice(&[7, 8]);
        assert_eq!(sink.len(), 3);
        assert_eq!(sink.finalize(), [9, 7, 8]);
    }
}
