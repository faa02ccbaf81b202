//! Core of the conversion API
//!
//! A [`Converter<T>`] is the encode/decode pair for one shape `T`. Every
//! converter either declares a fixed byte-width (in which case each encoded
//! value has exactly that many bytes, with no framing) or is variable-width
//! (in which case its enclosing context frames it with a 4-byte length
//! prefix).
//!
//! Converters are shared as [`ConverterRef<T>`] trait objects and are
//! immutable once built, so the same instance may be used by any number of
//! threads at once.
//!
//! The compound converters (for sequences, records, enumerations and
//! transparent wrappers) live in the sub-modules of this one and are built by
//! [`crate::factory`]; converters for scalar shapes live in [`crate::prim`],
//! [`crate::string`] and [`crate::well_known`].

use std::sync::Arc;

use crate::cursor::DecodedBlock;
use crate::error::{Fault, OverflowError, WidthError};
use crate::sink::ByteSink;

pub mod enumerated;
pub mod record;
pub mod seq;
pub mod transparent;

/// Encode/decode pair for values of type `T`
///
/// Implementations must uphold the width contract: when
/// [`fixed_width`](Converter::fixed_width) returns `Some(w)`, every call to
/// [`encode`](Converter::encode) appends exactly `w` bytes, and
/// [`decode`](Converter::decode) is only ever handed blocks of exactly `w`
/// bytes. Callers within this crate go through [`encode_value`] and
/// [`decode_value`], which enforce both halves.
pub trait Converter<T>: Send + Sync + 'static {
    /// Byte-width of every encoded value, or `None` if it varies
    fn fixed_width(&self) -> Option<usize>;

    /// Appends the encoding of `value` to `sink`
    fn encode(&self, sink: &mut ByteSink, value: &T) -> Result<(), Fault>;

    /// Reconstructs a value from exactly the bytes of `block`
    fn decode(&self, block: DecodedBlock<'_>) -> Result<T, Fault>;
}

/// Shared handle to a converter for `T`
pub type ConverterRef<T> = Arc<dyn Converter<T>>;

/// Encodes `value` with `converter`, checking that a fixed-width converter
/// wrote exactly its declared number of bytes
pub fn encode_value<T, C>(converter: &C, sink: &mut ByteSink, value: &T) -> Result<(), Fault>
where
    C: Converter<T> + ?Sized,
{
    let before = sink.len();
    converter.encode(sink, value)?;
    match converter.fixed_width() {
        Some(exact) => {
            let actual = sink.len() - before;
            if actual == exact {
                Ok(())
            } else {
                Err(OverflowError::Width(WidthError::WrongWidth { exact, actual }).into())
            }
        }
        None => Ok(()),
    }
}

/// Encodes one element of a positional sequence: raw if fixed-width,
/// otherwise as one length-prefixed block
pub fn encode_element<T, C>(converter: &C, sink: &mut ByteSink, value: &T) -> Result<(), Fault>
where
    C: Converter<T> + ?Sized,
{
    match converter.fixed_width() {
        Some(_) => encode_value(converter, sink, value),
        None => sink.framed(|sink| encode_value(converter, sink, value)),
    }
}

/// Decodes a value from a block whose extent was decided by an enclosing
/// frame rather than by the converter itself.
///
/// A fixed-width converter faults `Overflow` on a block shorter than its
/// width. A longer block is truncated to the leading `width` bytes, unless the
/// `check_complete_decode` feature is enabled, in which case it faults as well.
pub fn decode_value<T, C>(converter: &C, block: DecodedBlock<'_>) -> Result<T, Fault>
where
    C: Converter<T> + ?Sized,
{
    match converter.fixed_width() {
        Some(width) => {
            if block.len() < width {
                return Err(Fault::truncated(width, block.len()));
            }
            check_trailing(width, block.len())?;
            converter.decode(block.leading(width)?)
        }
        None => converter.decode(block),
    }
}

cfg_if::cfg_if! {
    if #[cfg(feature = "check_complete_decode")] {
        fn check_trailing(width: usize, actual: usize) -> Result<(), Fault> {
            if actual > width {
                Err(OverflowError::Trailing { width, actual }.into())
            } else {
                Ok(())
            }
        }
    } else {
        #[inline(always)]
        fn check_trailing(_width: usize, _actual: usize) -> Result<(), Fault> {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prim::PrimitiveConverter;
    use crate::string::StringConverter;

    struct Liar;

    impl Converter<u32> for Liar {
        fn fixed_width(&self) -> Option<usize> {
            Some(4)
        }

        fn encode(&self, sink: &mut ByteSink, _: &u32) -> Result<(), Fault> {
            sink.push_many([0u8; 3]);
            Ok(())
        }

        fn decode(&self, _: DecodedBlock<'_>) -> Result<u32, Fault> {
            Ok(0)
        }
    }

    #[test]
    fn wrong_width_is_overflow() {
        let mut sink = ByteSink::new();
        let err = encode_value(&Liar, &mut sink, &7).unwrap_err();
        assert!(matches!(
            err,
            Fault::Overflow(OverflowError::Width(WidthError::WrongWidth {
                exact: 4,
                actual: 3
            }))
        ));
    }

    #[test]
    fn element_framing_follows_width() {
        let mut sink = ByteSink::new();
        encode_element(&PrimitiveConverter::<u16>::new(), &mut sink, &0x0102).unwrap();
        encode_element(&StringConverter, &mut sink, &"ab".to_owned()).unwrap();
        assert_eq!(sink.finalize(), [0x02, 0x01, 2, 0, 0, 0, b'a', b'b']);
    }

    #[test]
    fn short_block_is_overflow() {
        let buf = [1u8, 2];
        let err = decode_value(&PrimitiveConverter::<i32>::new(), DecodedBlock::new(&buf))
            .unwrap_err();
        assert!(err.is_overflow());
    }

    #[cfg(not(feature = "check_complete_decode"))]
    #[test]
    fn long_block_reads_leading_bytes() {
        let buf = [1u8, 0, 0, 0, 0xff];
        let val: i32 =
            decode_value(&PrimitiveConverter::<i32>::new(), DecodedBlock::new(&buf)).unwrap();
        assert_eq!(val, 1);
    }

    #[cfg(feature = "check_complete_decode")]
    #[test]
    fn long_block_is_rejected() {
        let buf = [1u8, 0, 0, 0, 0xff];
        let err = decode_value(&PrimitiveConverter::<i32>::new(), DecodedBlock::new(&buf))
            .unwrap_err();
        assert!(matches!(
            err,
            Fault::Overflow(OverflowError::Trailing {
                width: 4,
                actual: 5
            })
        ));
    }
}
