//! Converter for integer-backed enumerations

use crate::conv::Converter;
use crate::cursor::DecodedBlock;
use crate::error::Fault;
use crate::prim::{Primitive, PrimitiveConverter};
use crate::sink::ByteSink;

/// Encodes each variant as its backing primitive `R`
pub struct EnumConverter<T, R> {
    to_repr: fn(&T) -> R,
    from_repr: fn(R) -> Option<T>,
    repr: PrimitiveConverter<R>,
}

impl<T: 'static, R: Primitive> EnumConverter<T, R> {
    #[must_use]
    pub fn new(to_repr: fn(&T) -> R, from_repr: fn(R) -> Option<T>) -> Self {
        Self {
            to_repr,
            from_repr,
            repr: PrimitiveConverter::new(),
        }
    }
}

impl<T: 'static, R: Primitive> Converter<T> for EnumConverter<T, R> {
    fn fixed_width(&self) -> Option<usize> {
        Some(R::WIDTH)
    }

    fn encode(&self, sink: &mut ByteSink, value: &T) -> Result<(), Fault> {
        self.repr.encode(sink, &(self.to_repr)(value))
    }

    fn decode(&self, block: DecodedBlock<'_>) -> Result<T, Fault> {
        let raw = self.repr.decode(block)?;
        (self.from_repr)(raw)
            .ok_or_else(|| Fault::convert::<T, _>(format!("no variant with discriminant {raw:?}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, Clone, Copy)]
    enum Light {
        Red,
        Green,
    }

    fn conv() -> EnumConverter<Light, u16> {
        EnumConverter::new(
            |l| *l as u16,
            |r| match r {
                0 => Some(Light::Red),
                1 => Some(Light::Green),
                _ => None,
            },
        )
    }

    #[test]
    fn backing_width_is_used() {
        let mut sink = ByteSink::new();
        conv().encode(&mut sink, &Light::Green).unwrap();
        assert_eq!(sink.finalize(), [1, 0]);
        assert_eq!(conv().fixed_width(), Some(2));
    }

    #[test]
    fn unknown_discriminant_faults() {
        assert_eq!(conv().decode(DecodedBlock::new(&[0, 0])).unwrap(), Light::Red);
        assert!(conv()
            .decode(DecodedBlock::new(&[7, 0]))
            .unwrap_err()
            .is_convert_error());
    }
}
