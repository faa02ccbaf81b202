//! Raw fixed-width converters for primitive scalars
//!
//! Every primitive is encoded as its little-endian byte image with no
//! framing. On a big-endian host the bytes of each machine word are swapped
//! on the way in and out (see [`crate::endian`]); the word size is a property
//! of the type, which is what keeps [`Decimal`] correct.
//!
//! `bool` and `char` are the two primitives whose byte image has invalid
//! values: `bool` is a single byte that must be `0` or `1`, and `char` is
//! four bytes that must hold a Unicode scalar value.

use std::any::type_name;
use std::fmt::Debug;
use std::marker::PhantomData;

use crate::conv::Converter;
use crate::cursor::DecodedBlock;
use crate::decimal::Decimal;
use crate::endian::copy_host;
use crate::error::Fault;
use crate::sink::ByteSink;

/// Widest primitive, in bytes
const SCRATCH_LEN: usize = 16;

/// Scalar with a fixed-width native byte image
pub trait Primitive: Copy + Debug + Send + Sync + 'static {
    /// Byte-width of the whole value
    const WIDTH: usize;

    /// Byte-width of the independently-ordered words making up the value
    const WORD: usize;

    /// Writes the native-order byte image of `self` into `out`, which is
    /// exactly [`WIDTH`](Primitive::WIDTH) bytes long
    fn write_native(self, out: &mut [u8]);

    /// Reads a value back from a native-order byte image
    fn read_native(raw: &[u8]) -> Result<Self, Fault>;
}

fn native<const N: usize, T>(raw: &[u8]) -> Result<[u8; N], Fault> {
    <[u8; N]>::try_from(raw).map_err(|_| {
        Fault::convert::<T, _>(format!("expected {N} bytes, found {}", raw.len()))
    })
}

macro_rules! impl_primitive {
    ( $( $t:ty ),+ $(,)? ) => {
        $(
            impl Primitive for $t {
                const WIDTH: usize = std::mem::size_of::<$t>();
                const WORD: usize = std::mem::size_of::<$t>();

                #[inline]
                fn write_native(self, out: &mut [u8]) {
                    out.copy_from_slice(&self.to_ne_bytes())
                }

                #[inline]
                fn read_native(raw: &[u8]) -> Result<Self, Fault> {
                    native::<{ std::mem::size_of::<$t>() }, $t>(raw).map(<$t>::from_ne_bytes)
                }
            }
        )+
    };
}

impl_primitive!(u8, i8, u16, i16, u32, i32, u64, i64, f32, f64);

impl Primitive for bool {
    const WIDTH: usize = 1;
    const WORD: usize = 1;

    fn write_native(self, out: &mut [u8]) {
        out[0] = u8::from(self)
    }

    fn read_native(raw: &[u8]) -> Result<Self, Fault> {
        match raw {
            [0] => Ok(false),
            [1] => Ok(true),
            [other] => Err(Fault::convert::<bool, _>(format!(
                "byte 0x{other:02x} is not a boolean"
            ))),
            _ => Err(Fault::truncated(1, raw.len())),
        }
    }
}

impl Primitive for char {
    const WIDTH: usize = 4;
    const WORD: usize = 4;

    fn write_native(self, out: &mut [u8]) {
        out.copy_from_slice(&u32::from(self).to_ne_bytes())
    }

    fn read_native(raw: &[u8]) -> Result<Self, Fault> {
        let code = native::<4, char>(raw).map(u32::from_ne_bytes)?;
        char::from_u32(code).ok_or_else(|| {
            Fault::convert::<char, _>(format!("0x{code:x} is not a Unicode scalar value"))
        })
    }
}

impl Primitive for Decimal {
    const WIDTH: usize = 16;
    const WORD: usize = 4;

    fn write_native(self, out: &mut [u8]) {
        for (chunk, word) in out.chunks_exact_mut(4).zip(self.words()) {
            chunk.copy_from_slice(&word.to_ne_bytes());
        }
    }

    fn read_native(raw: &[u8]) -> Result<Self, Fault> {
        let raw = native::<16, Decimal>(raw)?;
        let mut words = [0u32; 4];
        for (word, chunk) in words.iter_mut().zip(raw.chunks_exact(4)) {
            *word = u32::from_ne_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }
        Decimal::from_words(words).map_err(Fault::convert::<Decimal, _>)
    }
}

/// Stateless converter for any [`Primitive`]
pub struct PrimitiveConverter<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T: Primitive> PrimitiveConverter<T> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T: Primitive> Default for PrimitiveConverter<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Primitive> Converter<T> for PrimitiveConverter<T> {
    fn fixed_width(&self) -> Option<usize> {
        Some(T::WIDTH)
    }

    fn encode(&self, sink: &mut ByteSink, value: &T) -> Result<(), Fault> {
        let mut scratch = [0u8; SCRATCH_LEN];
        let image = &mut scratch[..T::WIDTH];
        value.write_native(image);
        copy_host(sink.allocate(T::WIDTH), image, T::WORD);
        Ok(())
    }

    fn decode(&self, block: DecodedBlock<'_>) -> Result<T, Fault> {
        let wire = block.leading(T::WIDTH)?.as_slice();
        let mut scratch = [0u8; SCRATCH_LEN];
        let image = &mut scratch[..T::WIDTH];
        copy_host(image, wire, T::WORD);
        T::read_native(image)
    }
}

impl<T> Debug for PrimitiveConverter<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PrimitiveConverter<{}>", type_name::<T>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode<T: Primitive>(val: T) -> Vec<u8> {
        let mut sink = ByteSink::new();
        PrimitiveConverter::<T>::new()
            .encode(&mut sink, &val)
            .unwrap();
        sink.finalize()
    }

    fn decode<T: Primitive>(buf: &[u8]) -> Result<T, Fault> {
        PrimitiveConverter::<T>::new().decode(DecodedBlock::new(buf))
    }

    #[test]
    fn int_wire_order() {
        assert_eq!(encode(1i32), [1, 0, 0, 0]);
        assert_eq!(encode(-2i16), [0xfe, 0xff]);
        assert_eq!(encode(0x0102_0304_0506_0708u64), [8, 7, 6, 5, 4, 3, 2, 1]);
        assert_eq!(decode::<u32>(&[0x78, 0x56, 0x34, 0x12]).unwrap(), 0x1234_5678);
    }

    #[test]
    fn float_bits() {
        assert_eq!(encode(1.5f64), 1.5f64.to_le_bytes());
        assert_eq!(decode::<f32>(&(-0.25f32).to_le_bytes()).unwrap(), -0.25);
    }

    #[test]
    fn bool_rejects_other_bytes() {
        assert_eq!(encode(true), [1]);
        assert!(!decode::<bool>(&[0]).unwrap());
        assert!(decode::<bool>(&[2]).unwrap_err().is_convert_error());
    }

    #[test]
    fn char_rejects_surrogates() {
        assert_eq!(encode('A'), [0x41, 0, 0, 0]);
        assert_eq!(decode::<char>(&[0x1f, 0xf6, 0x01, 0]).unwrap(), '\u{1f61f}');
        assert!(decode::<char>(&[0x00, 0xd8, 0, 0])
            .unwrap_err()
            .is_convert_error());
    }

    #[test]
    fn decimal_words_in_order() {
        let d = Decimal::from_parts(0x0403_0201, 0, 0, true, 2).unwrap();
        assert_eq!(
            encode(d),
            [1, 2, 3, 4, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 2, 0x80]
        );
        let back: Decimal = decode(&encode(d)).unwrap();
        assert_eq!(back, d);
        let mut bad = encode(d);
        bad[12] = 1;
        assert!(decode::<Decimal>(&bad).unwrap_err().is_convert_error());
    }

    #[test]
    fn short_input_overflows() {
        assert!(decode::<u64>(&[0; 7]).unwrap_err().is_overflow());
    }
}
