//! Host byte-order detection and word-wise swap copies
//!
//! The wire order of every primitive is little-endian. The host order is
//! probed exactly once per process; when it is not little-endian, every
//! primitive copy is performed word-by-word with the bytes of each word
//! reversed, instead of as one block copy.
//!
//! The word size matters: a 16-byte [`Decimal`](crate::decimal::Decimal)
//! is four independent 32-bit words, so it is swapped with a 4-byte word
//! size and its word order is left alone.

use lazy_static::lazy_static;

/// Byte order of a machine word
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Endian {
    Little,
    Big,
}

impl Endian {
    fn probe() -> Self {
        if u16::from_ne_bytes([0x01, 0x00]) == 0x0001 {
            Endian::Little
        } else {
            Endian::Big
        }
    }

    /// Byte order of the running host, as detected at first use
    #[inline]
    #[must_use]
    pub fn host() -> Self {
        *HOST_ENDIAN
    }

    /// Whether a native-order copy already matches the little-endian wire order
    #[inline]
    #[must_use]
    pub fn matches_wire(self) -> bool {
        self == Endian::Little
    }
}

lazy_static! {
    static ref HOST_ENDIAN: Endian = Endian::probe();
}

/// Copies `src` into `dst` reversing the bytes of every `word`-byte chunk.
///
/// Both slices must have the same length, which must be a multiple of `word`.
pub fn swap_copy(dst: &mut [u8], src: &[u8], word: usize) {
    debug_assert_eq!(dst.len(), src.len());
    debug_assert!(word > 0 && src.len() % word == 0);
    for (out, inp) in dst.chunks_exact_mut(word).zip(src.chunks_exact(word)) {
        for (o, i) in out.iter_mut().zip(inp.iter().rev()) {
            *o = *i;
        }
    }
}

/// Copies host-order bytes into wire-order (or the reverse; the operation is
/// its own inverse), choosing between a block copy and [`swap_copy`] based on
/// `order`.
#[inline]
pub fn copy_words(dst: &mut [u8], src: &[u8], word: usize, order: Endian) {
    if order.matches_wire() {
        dst.copy_from_slice(src);
    } else {
        swap_copy(dst, src, word);
    }
}

/// [`copy_words`] against the detected host byte-order
#[inline]
pub fn copy_host(dst: &mut [u8], src: &[u8], word: usize) {
    copy_words(dst, src, word, Endian::host())
}
