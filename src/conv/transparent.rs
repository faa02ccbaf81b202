//! Converter for wrappers that encode exactly as the value they own

use crate::conv::{Converter, ConverterRef};
use crate::cursor::DecodedBlock;
use crate::error::Fault;
use crate::sink::ByteSink;

pub struct TransparentConverter<T, I> {
    inner: ConverterRef<I>,
    wrap: fn(I) -> T,
    unwrap: fn(&T) -> &I,
}

impl<T: 'static, I: 'static> TransparentConverter<T, I> {
    #[must_use]
    pub fn new(inner: ConverterRef<I>, wrap: fn(I) -> T, unwrap: fn(&T) -> &I) -> Self {
        Self {
            inner,
            wrap,
            unwrap,
        }
    }
}

impl<T: 'static, I: 'static> Converter<T> for TransparentConverter<T, I> {
    fn fixed_width(&self) -> Option<usize> {
        self.inner.fixed_width()
    }

    fn encode(&self, sink: &mut ByteSink, value: &T) -> Result<(), Fault> {
        self.inner.encode(sink, (self.unwrap)(value))
    }

    fn decode(&self, block: DecodedBlock<'_>) -> Result<T, Fault> {
        self.inner.decode(block).map(self.wrap)
    }
}
