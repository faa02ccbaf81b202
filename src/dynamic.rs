//! Late-bound access to encoded buffers
//!
//! A [`DynamicReader`] inspects an encoded buffer without knowing its shape
//! up front. It can look fields up by name, as if the buffer held a record,
//! and it can convert the buffer to a shape chosen at the call site using
//! only the converters the cache already holds:
//!
//!   * if the cache has a converter for the target shape, that converter
//!     decodes the buffer;
//!   * otherwise, if the target is a sequence with a single element type (or a
//!     rank-1 array, or a transparent wrapper of either), each element is
//!     converted in turn by the same rules;
//!   * otherwise the conversion faults with [`TypeInvalid`].
//!
//! Element boundaries follow from the element's encoded width, which is
//! resolved from the cache as well: fixed-width elements are stepped by
//! stride and variable-width ones by their length prefixes. An element whose
//! width cannot be known this way makes the conversion fault with
//! [`TypeInvalid`].
//!
//! Nothing is ever derived by a `DynamicReader`.

use std::cell::OnceCell;

use crate::cache::PacketCache;
use crate::conv::decode_value;
use crate::cursor::{DecodedBlock, FieldDictionary};
use crate::error::{Fault, FieldError, TypeInvalid};
use crate::factory::distinct_capabilities;
use crate::shape::{ShapeKind, Shaped};

const OWNER: &str = "DynamicReader";

pub struct DynamicReader<'c, 'b> {
    cache: &'c PacketCache,
    block: DecodedBlock<'b>,
    fields: OnceCell<FieldDictionary<'b>>,
}

impl<'c, 'b> DynamicReader<'c, 'b> {
    #[must_use]
    pub fn new(cache: &'c PacketCache, bytes: &'b [u8]) -> Self {
        Self::over(cache, DecodedBlock::new(bytes))
    }

    fn over(cache: &'c PacketCache, block: DecodedBlock<'b>) -> Self {
        Self {
            cache,
            block,
            fields: OnceCell::new(),
        }
    }

    /// Reader over a sub-block of the same buffer
    pub(crate) fn nested(&self, block: DecodedBlock<'b>) -> Self {
        Self::over(self.cache, block)
    }

    #[must_use]
    pub fn cache(&self) -> &'c PacketCache {
        self.cache
    }

    /// The bytes under this reader
    #[must_use]
    pub fn block(&self) -> DecodedBlock<'b> {
        self.block
    }

    fn dictionary(&self) -> Result<&FieldDictionary<'b>, Fault> {
        if let Some(dict) = self.fields.get() {
            return Ok(dict);
        }
        let dict = FieldDictionary::scan(self.block, OWNER)?;
        Ok(self.fields.get_or_init(|| dict))
    }

    /// Value block of the field called `name`
    pub fn get_field(&self, name: &str) -> Result<DecodedBlock<'b>, Fault> {
        self.dictionary()?.require(name, OWNER)
    }

    /// Reader over the value of the field called `name`
    pub fn get(&self, name: &str) -> Result<DynamicReader<'c, 'b>, Fault> {
        self.get_field(name).map(|block| self.nested(block))
    }

    /// Names of every field, in buffer order
    pub fn field_names(&self) -> Result<Vec<&'b str>, Fault> {
        self.dictionary()?
            .names()
            .map(|raw| {
                std::str::from_utf8(raw)
                    .map_err(|_| Fault::convert_named(OWNER, FieldError::NonUtf8Name(raw.to_vec())))
            })
            .collect()
    }

    /// Converts the whole block to `T` using only cached converters
    pub fn convert_to<T: Shaped>(&self) -> Result<T, Fault> {
        if let Some(converter) = self.cache.lookup::<T>() {
            return decode_value(&*converter, self.block);
        }
        let shape = T::shape();
        let type_name = shape.type_name();
        match shape.into_kind() {
            ShapeKind::Sequence(capabilities) => match distinct_capabilities(&capabilities).as_slice() {
                [single] => single.element().convert_late(self),
                _ => Err(TypeInvalid { type_name }.into()),
            },
            ShapeKind::Array(shape) if shape.rank() == 1 => shape.element().convert_late(self),
            ShapeKind::Transparent(shape) => shape.convert_late(self),
            _ => Err(TypeInvalid { type_name }.into()),
        }
    }
}

/// Encoded width of `T`, as far as it can be resolved without deriving
/// anything: `Some(w)` for fixed-width shapes and `None` for variable-width
/// ones.
pub(crate) fn resolve_width<T: Shaped>(cache: &PacketCache) -> Result<Option<usize>, Fault> {
    if let Some(converter) = cache.lookup::<T>() {
        return Ok(converter.fixed_width());
    }
    let shape = T::shape();
    let type_name = shape.type_name();
    match shape.into_kind() {
        ShapeKind::Enumerated(shape) => Ok(Some(shape.width())),
        ShapeKind::Transparent(shape) => shape.resolve_width(cache),
        ShapeKind::Array(_) | ShapeKind::Sequence(_) | ShapeKind::Record(_) => Ok(None),
        ShapeKind::Scalar | ShapeKind::Opaque => Err(TypeInvalid { type_name }.into()),
    }
}
