//! Compile-time shape descriptions
//!
//! A [`Shaped`] type describes its own structure as a [`Shape`]: a runtime
//! plan that the converter factory interprets, once, to derive the
//! type's [`Converter`](crate::conv::Converter). Shapes are cheap to build
//! and are discarded after derivation.
//!
//! Most types get their `Shaped` impl from `#[derive(Packet)]`, which
//! expands to calls on the public builders of this module
//! ([`RecordShape`], [`Constructor`], [`EnumShape`]). The impls for the
//! standard library types this crate knows about are in [`std_impls`].
//!
//! A shape falls into exactly one [`ShapeKind`]:
//!
//!   * `Scalar` shapes are converted by whatever converter was seeded or
//!     registered for them; nothing is derived.
//!   * `Opaque` shapes have no representation and cannot be converted unless a
//!     converter is registered for them.
//!   * `Enumerated` shapes reuse the fixed-width integer converter of their
//!     backing representation.
//!   * `Transparent` shapes encode exactly as the value they wrap.
//!   * `Array` and `Sequence` shapes encode their elements positionally.
//!   * `Record` shapes encode named fields.

use std::any::{type_name, TypeId};
use std::marker::PhantomData;
use std::sync::Arc;

use crate::cache::PacketCache;
use crate::conv::enumerated::EnumConverter;
use crate::conv::seq::SequenceConverter;
use crate::conv::transparent::TransparentConverter;
use crate::conv::ConverterRef;
use crate::cursor::DecodeCursor;
use crate::dynamic::{resolve_width, DynamicReader};
use crate::error::{Fault, OverflowError};
use crate::prim::Primitive;

pub mod record;
pub mod std_impls;

pub use record::{Constructor, ConstructorArgs, Param, RecordShape};

/// Types that can describe their own structure to the converter factory
pub trait Shaped: Sized + 'static {
    fn shape() -> Shape<Self>;
}

/// Structural description of `T`
pub struct Shape<T> {
    type_name: &'static str,
    kind: ShapeKind<T>,
}

/// Classification of a [`Shape`]
pub enum ShapeKind<T> {
    Scalar,
    Opaque,
    Enumerated(EnumShape<T>),
    Transparent(TransparentShape<T>),
    Array(ArrayShape<T>),
    /// Every single-element-type sequence capability the shape exposes
    Sequence(Vec<SequenceShape<T>>),
    Record(RecordShape<T>),
}

impl<T> ShapeKind<T> {
    /// Short lowercase label, for diagnostics
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            ShapeKind::Scalar => "scalar",
            ShapeKind::Opaque => "opaque",
            ShapeKind::Enumerated(_) => "enumerated",
            ShapeKind::Transparent(_) => "transparent",
            ShapeKind::Array(_) => "array",
            ShapeKind::Sequence(_) => "sequence",
            ShapeKind::Record(_) => "record",
        }
    }
}

impl<T: 'static> Shape<T> {
    fn with_kind(kind: ShapeKind<T>) -> Self {
        Self {
            type_name: type_name::<T>(),
            kind,
        }
    }

    /// Shape whose converter must be seeded or registered
    #[must_use]
    pub fn scalar() -> Self {
        Self::with_kind(ShapeKind::Scalar)
    }

    /// Shape with no derivable representation
    #[must_use]
    pub fn opaque() -> Self {
        Self::with_kind(ShapeKind::Opaque)
    }

    #[must_use]
    pub fn enumerated(shape: EnumShape<T>) -> Self {
        Self::with_kind(ShapeKind::Enumerated(shape))
    }

    #[must_use]
    pub fn transparent(shape: TransparentShape<T>) -> Self {
        Self::with_kind(ShapeKind::Transparent(shape))
    }

    #[must_use]
    pub fn array(shape: ArrayShape<T>) -> Self {
        Self::with_kind(ShapeKind::Array(shape))
    }

    /// Sequence shape exposing each of `capabilities`
    #[must_use]
    pub fn sequence<I>(capabilities: I) -> Self
    where
        I: IntoIterator<Item = SequenceShape<T>>,
    {
        Self::with_kind(ShapeKind::Sequence(capabilities.into_iter().collect()))
    }

    #[must_use]
    pub fn record(shape: RecordShape<T>) -> Self {
        Self::with_kind(ShapeKind::Record(shape))
    }

    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    #[must_use]
    pub fn kind(&self) -> &ShapeKind<T> {
        &self.kind
    }

    #[must_use]
    pub fn into_kind(self) -> ShapeKind<T> {
        self.kind
    }
}

/// Container of `E` elements that can be enumerated and rebuilt
pub trait Sequence<E: 'static>: Sized + 'static {
    /// Elements in encode order
    fn elements(&self) -> Box<dyn Iterator<Item = &E> + '_>;

    /// Rebuilds the container from decoded elements
    fn from_elements(items: Vec<E>) -> Result<Self, Fault>;
}

/// Integer-backed shape whose variants map to and from a primitive
pub struct EnumShape<T> {
    width: usize,
    plan: Box<dyn EnumPlan<T>>,
}

impl<T: 'static> EnumShape<T> {
    /// Shape backed by the primitive `R`; `from_repr` returns `None` for
    /// values with no corresponding variant
    #[must_use]
    pub fn of<R: Primitive>(to_repr: fn(&T) -> R, from_repr: fn(R) -> Option<T>) -> Self {
        Self {
            width: R::WIDTH,
            plan: Box::new(ReprPlan { to_repr, from_repr }),
        }
    }

    /// Byte-width of the backing representation
    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    pub(crate) fn build(&self) -> ConverterRef<T> {
        self.plan.build()
    }
}

trait EnumPlan<T> {
    fn build(&self) -> ConverterRef<T>;
}

struct ReprPlan<T, R> {
    to_repr: fn(&T) -> R,
    from_repr: fn(R) -> Option<T>,
}

impl<T: 'static, R: Primitive> EnumPlan<T> for ReprPlan<T, R> {
    fn build(&self) -> ConverterRef<T> {
        Arc::new(EnumConverter::new(self.to_repr, self.from_repr))
    }
}

/// Shape that encodes exactly as an inner value it owns
pub struct TransparentShape<T> {
    plan: Box<dyn WrapPlan<T>>,
}

impl<T: 'static> TransparentShape<T> {
    #[must_use]
    pub fn of<I: Shaped>(wrap: fn(I) -> T, unwrap: fn(&T) -> &I) -> Self {
        Self {
            plan: Box::new(WrapOf { wrap, unwrap }),
        }
    }

    pub(crate) fn build(&self, cache: &PacketCache) -> Result<ConverterRef<T>, Fault> {
        self.plan.build(cache)
    }

    pub(crate) fn convert_late(&self, reader: &DynamicReader<'_, '_>) -> Result<T, Fault> {
        self.plan.convert_late(reader)
    }

    pub(crate) fn resolve_width(&self, cache: &PacketCache) -> Result<Option<usize>, Fault> {
        self.plan.resolve_width(cache)
    }
}

trait WrapPlan<T> {
    fn build(&self, cache: &PacketCache) -> Result<ConverterRef<T>, Fault>;
    fn convert_late(&self, reader: &DynamicReader<'_, '_>) -> Result<T, Fault>;
    fn resolve_width(&self, cache: &PacketCache) -> Result<Option<usize>, Fault>;
}

struct WrapOf<T, I> {
    wrap: fn(I) -> T,
    unwrap: fn(&T) -> &I,
}

impl<T: 'static, I: Shaped> WrapPlan<T> for WrapOf<T, I> {
    fn build(&self, cache: &PacketCache) -> Result<ConverterRef<T>, Fault> {
        let inner = cache.converter::<I>()?;
        Ok(Arc::new(TransparentConverter::new(
            inner,
            self.wrap,
            self.unwrap,
        )))
    }

    fn convert_late(&self, reader: &DynamicReader<'_, '_>) -> Result<T, Fault> {
        reader.convert_to::<I>().map(self.wrap)
    }

    fn resolve_width(&self, cache: &PacketCache) -> Result<Option<usize>, Fault> {
        resolve_width::<I>(cache)
    }
}

/// Single-dimensional (or rejected multi-dimensional) array of `E` elements
pub struct ArrayShape<T> {
    rank: usize,
    element: Box<dyn ElementPlan<T>>,
}

impl<T: 'static> ArrayShape<T> {
    #[must_use]
    pub fn of<E>(rank: usize) -> Self
    where
        T: Sequence<E>,
        E: Shaped,
    {
        Self {
            rank,
            element: Box::new(ElementOf::<E>(PhantomData)),
        }
    }

    #[must_use]
    pub fn rank(&self) -> usize {
        self.rank
    }

    pub(crate) fn element(&self) -> &dyn ElementPlan<T> {
        self.element.as_ref()
    }
}

/// One single-element-type sequence capability of a shape
pub struct SequenceShape<T> {
    element: Box<dyn ElementPlan<T>>,
}

impl<T: 'static> SequenceShape<T> {
    #[must_use]
    pub fn of<E>() -> Self
    where
        T: Sequence<E>,
        E: Shaped,
    {
        Self {
            element: Box::new(ElementOf::<E>(PhantomData)),
        }
    }

    /// Name of the element type
    #[must_use]
    pub fn element_name(&self) -> &'static str {
        self.element.element_name()
    }

    pub(crate) fn element(&self) -> &dyn ElementPlan<T> {
        self.element.as_ref()
    }
}

/// Element-type-erased half of an array or sequence shape
pub(crate) trait ElementPlan<T> {
    fn element_id(&self) -> TypeId;

    fn element_name(&self) -> &'static str;

    /// Whether the element shape itself has no derivable representation
    fn element_is_opaque(&self) -> bool;

    fn build(&self, cache: &PacketCache) -> Result<ConverterRef<T>, Fault>;

    /// Decodes the container using only converters already in the cache,
    /// recursing per element where the element has none
    fn convert_late(&self, reader: &DynamicReader<'_, '_>) -> Result<T, Fault>;
}

struct ElementOf<E>(PhantomData<fn() -> E>);

impl<T, E> ElementPlan<T> for ElementOf<E>
where
    T: Sequence<E>,
    E: Shaped,
{
    fn element_id(&self) -> TypeId {
        TypeId::of::<E>()
    }

    fn element_name(&self) -> &'static str {
        type_name::<E>()
    }

    fn element_is_opaque(&self) -> bool {
        matches!(E::shape().kind(), ShapeKind::Opaque)
    }

    fn build(&self, cache: &PacketCache) -> Result<ConverterRef<T>, Fault> {
        let element = cache.converter::<E>()?;
        Ok(Arc::new(SequenceConverter::<T, E>::new(element)))
    }

    fn convert_late(&self, reader: &DynamicReader<'_, '_>) -> Result<T, Fault> {
        let items = match reader.cache().lookup::<E>() {
            Some(element) => DecodeCursor::new(reader.block())
                .collection(&*element)?
                .into_vec(),
            None => {
                let width = resolve_width::<E>(reader.cache())?;
                let mut cursor = DecodeCursor::new(reader.block());
                if let Some(width) = width {
                    let total = cursor.remaining();
                    if width == 0 || total % width != 0 {
                        return Err(OverflowError::Stride { total, width }.into());
                    }
                }
                let mut items = Vec::new();
                while cursor.has_more() {
                    let block = cursor.next_block(width)?;
                    items.push(reader.nested(block).convert_to::<E>()?);
                }
                items
            }
        };
        T::from_elements(items)
    }
}
