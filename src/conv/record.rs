//! Named-field converter for record shapes
//!
//! A record is encoded as its fields in declaration order, each as
//! `[extend-write: name][extend-write: value]`, with no count and no
//! terminator. The value block is bracketed by a length reservation, so
//! nested variable-width values are written in a single pass.
//!
//! Decoding scans the whole block into a [`FieldDictionary`] and then looks
//! up each expected field by name; the order of fields in the buffer does not
//! matter, but every expected field must be present.

use std::any::Any;
use std::sync::Arc;

use crate::conv::{decode_value, encode_value, Converter, ConverterRef};
use crate::cursor::{DecodedBlock, FieldDictionary};
use crate::error::Fault;
use crate::shape::ConstructorArgs;
use crate::sink::ByteSink;

/// A record field whose converter has been resolved
pub(crate) trait BoundField<T>: Send + Sync {
    /// Writes the field value of `value` as one length-prefixed block
    fn encode(&self, sink: &mut ByteSink, value: &T) -> Result<(), Fault>;

    /// Decodes the field from `block` and stores it into `target`
    fn assign(&self, target: &mut T, block: DecodedBlock<'_>) -> Result<(), Fault>;

    /// Decodes the field from `block` as a constructor argument
    fn decode_any(&self, block: DecodedBlock<'_>) -> Result<Box<dyn Any>, Fault>;
}

pub(crate) struct BoundFieldOf<T, F> {
    pub(crate) get: fn(&T) -> &F,
    pub(crate) set: Option<fn(&mut T, F)>,
    pub(crate) converter: ConverterRef<F>,
}

impl<T: 'static, F: 'static> BoundField<T> for BoundFieldOf<T, F> {
    fn encode(&self, sink: &mut ByteSink, value: &T) -> Result<(), Fault> {
        let field = (self.get)(value);
        sink.framed(|sink| encode_value(&*self.converter, sink, field))
    }

    fn assign(&self, target: &mut T, block: DecodedBlock<'_>) -> Result<(), Fault> {
        let Some(set) = self.set else {
            return Err(Fault::convert::<T, _>("field has no setter"));
        };
        let field = decode_value(&*self.converter, block)?;
        set(target, field);
        Ok(())
    }

    fn decode_any(&self, block: DecodedBlock<'_>) -> Result<Box<dyn Any>, Fault> {
        let field: F = decode_value(&*self.converter, block)?;
        Ok(Box::new(field))
    }
}

/// One field of a [`RecordConverter`], with its interned name
pub(crate) struct Slot<T> {
    pub(crate) name: &'static str,
    pub(crate) interned: Arc<[u8]>,
    pub(crate) field: Box<dyn BoundField<T>>,
}

/// How a decoded record is put together
pub(crate) enum Build<T> {
    /// Default-construct, then assign every field
    Assign(fn() -> T),
    /// Pass every field, in order, to one constructor
    Construct(fn(&mut ConstructorArgs) -> Result<T, Fault>),
}

pub struct RecordConverter<T> {
    type_name: &'static str,
    slots: Vec<Slot<T>>,
    build: Build<T>,
}

impl<T: 'static> RecordConverter<T> {
    pub(crate) fn new(type_name: &'static str, slots: Vec<Slot<T>>, build: Build<T>) -> Self {
        Self {
            type_name,
            slots,
            build,
        }
    }

    /// Field names in encode order
    pub fn field_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.slots.iter().map(|slot| slot.name)
    }
}

impl<T: 'static> Converter<T> for RecordConverter<T> {
    fn fixed_width(&self) -> Option<usize> {
        None
    }

    fn encode(&self, sink: &mut ByteSink, value: &T) -> Result<(), Fault> {
        for slot in self.slots.iter() {
            sink.extend_write(&slot.interned)?;
            slot.field.encode(sink, value)?;
        }
        Ok(())
    }

    fn decode(&self, block: DecodedBlock<'_>) -> Result<T, Fault> {
        let dict = FieldDictionary::scan(block, self.type_name)?;
        match &self.build {
            Build::Assign(make) => {
                let mut ret = make();
                for slot in self.slots.iter() {
                    let block = dict.require(slot.name, self.type_name)?;
                    slot.field.assign(&mut ret, block)?;
                }
                Ok(ret)
            }
            Build::Construct(build) => {
                let mut values = Vec::with_capacity(self.slots.len());
                for slot in self.slots.iter() {
                    let block = dict.require(slot.name, self.type_name)?;
                    values.push(slot.field.decode_any(block)?);
                }
                build(&mut ConstructorArgs::new(self.type_name, values))
            }
        }
    }
}
