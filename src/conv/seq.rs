//! Positional converter for arrays and sequences
//!
//! Fixed-width elements are concatenated raw, and the element count is
//! recovered on decode as `total / width`. Variable-width elements are written
//! as one length-prefixed block each. Either way the sequence itself is
//! variable-width and relies on its enclosing frame for its extent.

use std::marker::PhantomData;

use crate::conv::{encode_element, Converter, ConverterRef};
use crate::cursor::{DecodeCursor, DecodedBlock};
use crate::error::Fault;
use crate::shape::Sequence;
use crate::sink::ByteSink;

pub struct SequenceConverter<T, E> {
    element: ConverterRef<E>,
    _marker: PhantomData<fn() -> T>,
}

impl<T, E> SequenceConverter<T, E>
where
    T: Sequence<E>,
    E: 'static,
{
    #[must_use]
    pub fn new(element: ConverterRef<E>) -> Self {
        Self {
            element,
            _marker: PhantomData,
        }
    }

    /// Converter used for each element
    #[must_use]
    pub fn element(&self) -> &ConverterRef<E> {
        &self.element
    }
}

impl<T, E> Converter<T> for SequenceConverter<T, E>
where
    T: Sequence<E>,
    E: 'static,
{
    fn fixed_width(&self) -> Option<usize> {
        None
    }

    fn encode(&self, sink: &mut ByteSink, value: &T) -> Result<(), Fault> {
        for item in value.elements() {
            encode_element(&*self.element, sink, item)?;
        }
        Ok(())
    }

    fn decode(&self, block: DecodedBlock<'_>) -> Result<T, Fault> {
        let items = DecodeCursor::new(block)
            .collection(&*self.element)?
            .into_vec();
        T::from_elements(items)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::prim::PrimitiveConverter;
    use crate::string::StringConverter;

    #[test]
    fn fixed_elements_are_unframed() {
        let conv = SequenceConverter::<Vec<u16>, u16>::new(Arc::new(PrimitiveConverter::new()));
        let mut sink = ByteSink::new();
        conv.encode(&mut sink, &vec![1, 0x0203]).unwrap();
        let bytes = sink.finalize();
        assert_eq!(bytes, [1, 0, 3, 2]);
        assert_eq!(
            conv.decode(DecodedBlock::new(&bytes)).unwrap(),
            vec![1, 0x0203]
        );
    }

    #[test]
    fn variable_elements_are_framed() {
        let conv = SequenceConverter::<Vec<String>, String>::new(Arc::new(StringConverter));
        let mut sink = ByteSink::new();
        conv.encode(&mut sink, &vec!["a".to_owned(), "bc".to_owned()])
            .unwrap();
        assert_eq!(
            sink.finalize(),
            [1, 0, 0, 0, b'a', 2, 0, 0, 0, b'b', b'c']
        );
    }

    #[test]
    fn empty_block_is_empty_sequence() {
        let conv = SequenceConverter::<Vec<i64>, i64>::new(Arc::new(PrimitiveConverter::new()));
        assert!(conv.decode(DecodedBlock::new(&[])).unwrap().is_empty());
    }
}
