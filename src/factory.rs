//! Derivation of converters from shapes
//!
//! [`derive`] turns the [`Shape`](crate::shape::Shape) of a type not yet in
//! the cache into a converter, resolving every nested shape through the cache
//! (and so deriving those too, as needed). Each shape kind is handled as
//! follows:
//!
//!   1. Enumerated shapes reuse the integer converter of their backing width.
//!   2. Arrays must have rank 1, and their element shape must not be opaque.
//!   3. Sequences must expose exactly one element type across all their
//!      capabilities; the element is then handled as for arrays.
//!   4. Records need a construction strategy: default construction plus a
//!      setter for every field, or else exactly one constructor matching the
//!      fields in order.
//!
//! Scalar and opaque shapes are never derived: the former must be seeded or
//! registered, and the latter cannot be converted at all.
//!
//! A shape that contains itself (directly or through a container) recurses
//! without bound.

use std::sync::Arc;

use crate::cache::PacketCache;
use crate::conv::record::{Build, RecordConverter, Slot};
use crate::conv::ConverterRef;
use crate::error::{Fault, SchemaViolation};
use crate::shape::{ArrayShape, ElementPlan, RecordShape, SequenceShape, ShapeKind, Shaped};

pub(crate) fn derive<T: Shaped>(cache: &PacketCache) -> Result<ConverterRef<T>, Fault> {
    let shape = T::shape();
    let type_name = shape.type_name();
    let kind = shape.kind().label();
    let result = match shape.into_kind() {
        ShapeKind::Enumerated(shape) => Ok(shape.build()),
        ShapeKind::Array(shape) => derive_array(cache, type_name, &shape),
        ShapeKind::Sequence(capabilities) => derive_sequence(cache, type_name, &capabilities),
        ShapeKind::Transparent(shape) => shape.build(cache),
        ShapeKind::Record(shape) => derive_record(cache, type_name, shape),
        ShapeKind::Scalar => Err(Fault::schema(type_name, SchemaViolation::Unregistered)),
        ShapeKind::Opaque => Err(Fault::schema(type_name, SchemaViolation::Opaque)),
    };
    match &result {
        Ok(converter) => tracing::debug!(
            shape = type_name,
            kind,
            fixed_width = ?converter.fixed_width(),
            "derived converter"
        ),
        Err(Fault::InvalidSchema(err)) => tracing::debug!(
            shape = type_name,
            kind,
            rejected = err.type_name,
            violation = %err.violation,
            "shape rejected"
        ),
        Err(_) => {}
    }
    result
}

/// Capabilities of a sequence shape with duplicate element types removed,
/// in declaration order
pub(crate) fn distinct_capabilities<T>(capabilities: &[SequenceShape<T>]) -> Vec<&SequenceShape<T>>
where
    T: 'static,
{
    let mut distinct: Vec<&SequenceShape<T>> = Vec::with_capacity(capabilities.len());
    for cap in capabilities {
        let id = cap.element().element_id();
        if !distinct.iter().any(|seen| seen.element().element_id() == id) {
            distinct.push(cap);
        }
    }
    distinct
}

fn element_converter<T: 'static>(
    cache: &PacketCache,
    type_name: &'static str,
    element: &dyn ElementPlan<T>,
) -> Result<ConverterRef<T>, Fault> {
    if element.element_is_opaque() && !cache.contains_id(element.element_id()) {
        return Err(Fault::schema(
            type_name,
            SchemaViolation::OpaqueElement {
                element: element.element_name(),
            },
        ));
    }
    element.build(cache)
}

fn derive_array<T: 'static>(
    cache: &PacketCache,
    type_name: &'static str,
    shape: &ArrayShape<T>,
) -> Result<ConverterRef<T>, Fault> {
    if shape.rank() != 1 {
        return Err(Fault::schema(
            type_name,
            SchemaViolation::MultiDimensional { rank: shape.rank() },
        ));
    }
    element_converter(cache, type_name, shape.element())
}

fn derive_sequence<T: 'static>(
    cache: &PacketCache,
    type_name: &'static str,
    capabilities: &[SequenceShape<T>],
) -> Result<ConverterRef<T>, Fault> {
    match distinct_capabilities(capabilities).as_slice() {
        [] => Err(Fault::schema(type_name, SchemaViolation::Opaque)),
        [single] => element_converter(cache, type_name, single.element()),
        many => Err(Fault::schema(
            type_name,
            SchemaViolation::AmbiguousSequence {
                elements: many.iter().map(|cap| cap.element_name()).collect(),
            },
        )),
    }
}

fn derive_record<T: 'static>(
    cache: &PacketCache,
    type_name: &'static str,
    shape: RecordShape<T>,
) -> Result<ConverterRef<T>, Fault> {
    let build = match shape.default {
        Some(make) if shape.is_assignable() => Build::Assign(make),
        _ => {
            let mut matching = shape.matching_constructors();
            match (matching.next(), matching.next()) {
                (Some(ctor), None) => Build::Construct(ctor.build),
                _ => {
                    return Err(Fault::schema(type_name, SchemaViolation::NoConstruction));
                }
            }
        }
    };
    let mut slots = Vec::with_capacity(shape.fields.len());
    for field in shape.fields.iter() {
        slots.push(Slot {
            name: field.name(),
            interned: cache.intern(field.name()),
            field: field.bind(cache)?,
        });
    }
    Ok(Arc::new(RecordConverter::new(type_name, slots, build)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SchemaError;
    use crate::shape::{Constructor, Sequence, Shape};

    struct Grid(Vec<u8>);

    impl Sequence<u8> for Grid {
        fn elements(&self) -> Box<dyn Iterator<Item = &u8> + '_> {
            Box::new(self.0.iter())
        }

        fn from_elements(items: Vec<u8>) -> Result<Self, Fault> {
            Ok(Grid(items))
        }
    }

    impl Shaped for Grid {
        fn shape() -> Shape<Self> {
            Shape::array(ArrayShape::of::<u8>(2))
        }
    }

    struct Handle;

    impl Shaped for Handle {
        fn shape() -> Shape<Self> {
            Shape::opaque()
        }
    }

    struct Handles(Vec<Handle>);

    impl Sequence<Handle> for Handles {
        fn elements(&self) -> Box<dyn Iterator<Item = &Handle> + '_> {
            Box::new(self.0.iter())
        }

        fn from_elements(items: Vec<Handle>) -> Result<Self, Fault> {
            Ok(Handles(items))
        }
    }

    impl Shaped for Handles {
        fn shape() -> Shape<Self> {
            Shape::sequence([SequenceShape::of::<Handle>()])
        }
    }

    struct Twice(Vec<u16>);

    impl Sequence<u16> for Twice {
        fn elements(&self) -> Box<dyn Iterator<Item = &u16> + '_> {
            Box::new(self.0.iter())
        }

        fn from_elements(items: Vec<u16>) -> Result<Self, Fault> {
            Ok(Twice(items))
        }
    }

    impl Shaped for Twice {
        fn shape() -> Shape<Self> {
            Shape::sequence([SequenceShape::of::<u16>(), SequenceShape::of::<u16>()])
        }
    }

    struct Sealed {
        id: u32,
    }

    impl Shaped for Sealed {
        fn shape() -> Shape<Self> {
            Shape::record(
                RecordShape::<Self>::new()
                    .field::<u32>("id", |s| &s.id)
                    .constructor(
                        Constructor::<Self>::new(|args| Ok(Sealed { id: args.take()? }))
                            .param::<u64>("id"),
                    ),
            )
        }
    }

    fn violation(fault: Fault) -> SchemaViolation {
        match fault {
            Fault::InvalidSchema(SchemaError { violation, .. }) => violation,
            other => panic!("unexpected fault {other:?}"),
        }
    }

    #[test]
    fn multi_dimensional_rejected() {
        let cache = PacketCache::new();
        let err = derive::<Grid>(&cache).err().unwrap();
        assert_eq!(violation(err), SchemaViolation::MultiDimensional { rank: 2 });
    }

    #[test]
    fn opaque_element_rejected_unless_registered() {
        let cache = PacketCache::new();
        let err = derive::<Handles>(&cache).err().unwrap();
        assert!(matches!(
            violation(err),
            SchemaViolation::OpaqueElement { .. }
        ));
    }

    #[test]
    fn duplicate_capabilities_collapse() {
        let cache = PacketCache::new();
        assert!(derive::<Twice>(&cache).is_ok());
    }

    #[test]
    fn constructor_type_mismatch_is_no_construction() {
        let cache = PacketCache::new();
        let err = derive::<Sealed>(&cache).err().unwrap();
        assert_eq!(violation(err), SchemaViolation::NoConstruction);
    }

    #[test]
    fn scalars_are_never_derived() {
        let cache = PacketCache::new();
        let err = derive::<u32>(&cache).err().unwrap();
        assert_eq!(violation(err), SchemaViolation::Unregistered);
    }
}
