//! Zero-copy views and cursors over an encoded buffer
//!
//! Decoding never copies the input: a [`DecodedBlock`] is a `(buffer, offset,
//! length)` view whose lifetime is tied to the input slice, and everything
//! built on top of it ([`DecodeCursor`], [`FieldDictionary`]) hands out further
//! blocks rather than owned bytes.
//!
//! # Modes
//!
//! A composite is decoded in *named* mode: [`FieldDictionary::scan`] walks the
//! buffer once, pairing each length-prefixed field name with the
//! length-prefixed value that follows it, and the composite then looks up the
//! fields it expects by name.
//!
//! Sequences are decoded in *positional* mode through [`DecodeCursor`], either
//! one element at a time with [`DecodeCursor::next`] or in bulk with
//! [`DecodeCursor::collection`], which indexes fixed-width elements directly
//! by stride instead of scanning.

use std::any::{type_name, Any};
use std::collections::HashMap;
use std::fmt::{Debug, Formatter, Result as FmtResult};

use crate::conv::Converter;
use crate::error::{Fault, FieldError, OverflowError};
use crate::sink::PREFIX_LEN;

/// Borrowed `(buffer, offset, length)` view into a decode input
#[derive(Clone, Copy)]
pub struct DecodedBlock<'b> {
    buffer: &'b [u8],
    offset: usize,
    length: usize,
}

impl<'b> DecodedBlock<'b> {
    /// View over all of `buffer`
    #[must_use]
    pub fn new(buffer: &'b [u8]) -> Self {
        Self {
            buffer,
            offset: 0,
            length: buffer.len(),
        }
    }

    /// The viewed bytes
    #[must_use]
    pub fn as_slice(&self) -> &'b [u8] {
        &self.buffer[self.offset..self.offset + self.length]
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.length
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Narrower view of `length` bytes starting `start` bytes into `self`
    pub fn slice(&self, start: usize, length: usize) -> Result<Self, Fault> {
        match start.checked_add(length) {
            Some(end) if end <= self.length => Ok(Self {
                buffer: self.buffer,
                offset: self.offset + start,
                length,
            }),
            _ => Err(Fault::truncated(length, self.length.saturating_sub(start))),
        }
    }

    /// Leading `width` bytes of `self`, or `Overflow` if there are fewer
    pub fn leading(&self, width: usize) -> Result<Self, Fault> {
        self.slice(0, width)
    }
}

impl Debug for DecodedBlock<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("DecodedBlock")
            .field("offset", &self.offset)
            .field("length", &self.length)
            .finish()
    }
}

impl PartialEq for DecodedBlock<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

/// Sequential reader over the bytes of one [`DecodedBlock`]
#[derive(Clone, Debug)]
pub struct DecodeCursor<'b> {
    block: DecodedBlock<'b>,
    index: usize,
}

impl<'b> DecodeCursor<'b> {
    #[must_use]
    pub fn new(block: DecodedBlock<'b>) -> Self {
        Self { block, index: 0 }
    }

    /// Whether any unread bytes remain
    #[must_use]
    pub fn has_more(&self) -> bool {
        self.index < self.block.len()
    }

    /// Number of unread bytes
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.block.len() - self.index
    }

    /// View over the unread bytes, without consuming them
    #[must_use]
    pub fn rest(&self) -> DecodedBlock<'b> {
        DecodedBlock {
            buffer: self.block.buffer,
            offset: self.block.offset + self.index,
            length: self.remaining(),
        }
    }

    /// Consumes exactly `width` bytes
    pub fn take(&mut self, width: usize) -> Result<DecodedBlock<'b>, Fault> {
        let ret = self.rest().leading(width)?;
        self.index += width;
        Ok(ret)
    }

    /// Consumes one `[4-byte LE length][bytes]` block and returns the bytes
    pub fn take_prefixed(&mut self) -> Result<DecodedBlock<'b>, Fault> {
        let rest = self.rest();
        let header = rest.leading(PREFIX_LEN)?.as_slice();
        let length = u32::from_le_bytes([header[0], header[1], header[2], header[3]]) as usize;
        let body = rest.slice(PREFIX_LEN, length)?;
        self.index += PREFIX_LEN + length;
        Ok(body)
    }

    /// Consumes the block for the next value of `converter`: exactly its
    /// fixed width if it has one, or else one length-prefixed block
    pub fn next_block(&mut self, width: Option<usize>) -> Result<DecodedBlock<'b>, Fault> {
        match width {
            Some(width) => self.take(width),
            None => self.take_prefixed(),
        }
    }

    /// Decodes the next value with `converter`
    pub fn next<E, C>(&mut self, converter: &C) -> Result<E, Fault>
    where
        C: Converter<E> + ?Sized,
    {
        let block = self.next_block(converter.fixed_width())?;
        converter.decode(block)
    }

    /// Decodes every remaining byte as a sequence of `converter` values.
    ///
    /// # Fast paths
    ///
    ///   * An empty remainder yields no elements.
    ///   * `u8` and `i8` elements are returned as a view of the input, with no
    ///     per-element step (any converter registered for those types is
    ///     bypassed).
    ///   * Fixed-width elements are indexed by stride; the remainder must be an
    ///     exact multiple of the width.
    ///   * Variable-width elements are read one length-prefixed block at a time.
    pub fn collection<E, C>(mut self, converter: &C) -> Result<Elements<'b, E>, Fault>
    where
        E: 'static,
        C: Converter<E> + ?Sized,
    {
        let rest = self.rest();
        if rest.is_empty() {
            return Ok(Elements::Items(Vec::new()));
        }
        if let Some(lift) = byte_lift::<E>() {
            return Ok(Elements::Bytes {
                view: rest.as_slice(),
                lift,
            });
        }
        match converter.fixed_width() {
            Some(width) => {
                let total = rest.len();
                if width == 0 || total % width != 0 {
                    return Err(OverflowError::Stride { total, width }.into());
                }
                let count = total / width;
                let mut items = Vec::with_capacity(count);
                for ix in 0..count {
                    items.push(converter.decode(rest.slice(ix * width, width)?)?);
                }
                Ok(Elements::Items(items))
            }
            None => {
                let mut items = Vec::new();
                while self.has_more() {
                    let block = self.take_prefixed()?;
                    items.push(converter.decode(block)?);
                }
                Ok(Elements::Items(items))
            }
        }
    }
}

fn unsigned_bytes(view: &[u8]) -> Vec<u8> {
    view.to_vec()
}

fn signed_bytes(view: &[u8]) -> Vec<i8> {
    view.iter().map(|&b| b as i8).collect()
}

/// Returns a byte-slice conversion for `E` if it is `u8` or `i8`
fn byte_lift<E: 'static>() -> Option<fn(&[u8]) -> Vec<E>> {
    let unsigned: fn(&[u8]) -> Vec<u8> = unsigned_bytes;
    let signed: fn(&[u8]) -> Vec<i8> = signed_bytes;
    (&unsigned as &dyn Any)
        .downcast_ref::<fn(&[u8]) -> Vec<E>>()
        .or_else(|| (&signed as &dyn Any).downcast_ref::<fn(&[u8]) -> Vec<E>>())
        .copied()
}

/// Result of a bulk sequence decode
pub enum Elements<'b, E> {
    /// Single-byte elements, still borrowed from the input
    Bytes {
        view: &'b [u8],
        lift: fn(&[u8]) -> Vec<E>,
    },
    /// Individually decoded elements
    Items(Vec<E>),
}

impl<'b, E> Elements<'b, E> {
    /// Number of elements
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Elements::Bytes { view, .. } => view.len(),
            Elements::Items(items) => items.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The borrowed input bytes, when the elements are single bytes
    #[must_use]
    pub fn as_bytes(&self) -> Option<&'b [u8]> {
        match self {
            Elements::Bytes { view, .. } => Some(view),
            Elements::Items(_) => None,
        }
    }

    /// Owned elements, copying the view in one step if necessary
    #[must_use]
    pub fn into_vec(self) -> Vec<E> {
        match self {
            Elements::Bytes { view, lift } => lift(view),
            Elements::Items(items) => items,
        }
    }
}

impl<E> Debug for Elements<'_, E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Elements::Bytes { view, .. } => f.debug_tuple("Bytes").field(&view.len()).finish(),
            Elements::Items(items) => f.debug_tuple("Items").field(&items.len()).finish(),
        }
    }
}

/// Name-indexed field blocks of one encoded composite
///
/// Duplicate names are rejected while scanning.
#[derive(Clone, Debug)]
pub struct FieldDictionary<'b> {
    order: Vec<(&'b [u8], DecodedBlock<'b>)>,
    index: HashMap<&'b [u8], usize>,
}

impl<'b> FieldDictionary<'b> {
    /// Scans `block` as repeated `[prefixed name][prefixed value]` pairs.
    ///
    /// `owner` names the composite being decoded, for error reporting.
    pub fn scan(block: DecodedBlock<'b>, owner: &'static str) -> Result<Self, Fault> {
        let mut cursor = DecodeCursor::new(block);
        let mut order = Vec::new();
        let mut index = HashMap::new();
        while cursor.has_more() {
            let name = cursor.take_prefixed()?.as_slice();
            let value = cursor.take_prefixed()?;
            if index.insert(name, order.len()).is_some() {
                let dup = String::from_utf8_lossy(name).into_owned();
                return Err(Fault::convert_named(owner, FieldError::Duplicate(dup)));
            }
            order.push((name, value));
        }
        Ok(Self { order, index })
    }

    /// Block of the field called `name`, if present
    #[must_use]
    pub fn get(&self, name: &str) -> Option<DecodedBlock<'b>> {
        self.index
            .get(name.as_bytes())
            .map(|&ix| self.order[ix].1)
    }

    /// Block of the field called `name`, faulting on behalf of `owner` if absent
    pub fn require(&self, name: &str, owner: &'static str) -> Result<DecodedBlock<'b>, Fault> {
        self.get(name)
            .ok_or_else(|| Fault::convert_named(owner, FieldError::Missing(name.to_owned())))
    }

    /// Raw field names, in scan order
    pub fn names(&self) -> impl Iterator<Item = &'b [u8]> + '_ {
        self.order.iter().map(|(name, _)| *name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
