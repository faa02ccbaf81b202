//! Fault taxonomy for deriving, encoding, and decoding
//!
//! Every fallible operation in this crate reports a [`Fault`]. The four
//! variants are deliberately coarse (they mirror the classes of failure a
//! caller can act on) and each carries a detail type that explains the
//! particular circumstance:
//!
//!   * [`Fault::Overflow`] wraps an [`OverflowError`]: the buffer was shorter than
//!     a width demanded of it, or a fixed-width converter produced the wrong number
//!     of bytes.
//!   * [`Fault::ConvertError`] wraps a [`ConvertError`]: the body of a converter
//!     rejected the bytes or value it was given.
//!   * [`Fault::InvalidSchema`] wraps a [`SchemaError`]: a shape cannot be turned
//!     into a converter at all.
//!   * [`Fault::TypeInvalid`] wraps a [`TypeInvalid`]: a late-bound conversion was
//!     requested for a shape with no resolvable converter.
//!
//! Faults raised by a nested converter propagate through enclosing converters
//! unchanged; they are never re-wrapped into a `ConvertError`. Panics are not
//! faults and are never caught.

use std::error::Error;
use std::fmt::{Debug, Display, Formatter, Result as FmtResult};

/// Boxed error type carried as the source of a [`ConvertError`]
pub type BoxError = Box<dyn Error + Send + Sync + 'static>;

/// Enumerated error type for failures related to converters that impose
/// a check on the byte-width of the values they produce.
#[derive(Clone, PartialEq, PartialOrd, Eq, Ord, Debug)]
pub enum WidthError {
    /// Requirement of precise byte-width not satisfied
    WrongWidth { exact: usize, actual: usize },
}

impl Display for WidthError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            WidthError::WrongWidth { exact, actual } => {
                write!(
                    f,
                    "{actual}-byte value violated requirement of {exact} bytes"
                )
            }
        }
    }
}

impl Error for WidthError {}

/// Enumerated error type for failures related to shapes that impose a
/// check on the element-count of their values, such as fixed-size arrays.
#[derive(Clone, PartialEq, PartialOrd, Eq, Ord, Debug)]
pub enum LengthError {
    /// Requirement of precise element-count not satisfied
    WrongLength { exact: usize, actual: usize },
}

impl Display for LengthError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            LengthError::WrongLength { exact, actual } => {
                write!(
                    f,
                    "{actual}-element value violated requirement of {exact} elements"
                )
            }
        }
    }
}

impl Error for LengthError {}

/// Conditions under which a read or a write runs past what the buffer allows.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum OverflowError {
    /// A read of `requested` bytes was attempted with only `available` left
    Truncated { requested: usize, available: usize },
    /// A fixed-width element sequence whose total length is not a multiple
    /// of the element width
    Stride { total: usize, width: usize },
    /// A fixed-width converter wrote a different number of bytes than it declared
    Width(WidthError),
    /// A length that does not fit in the 4-byte length prefix
    PrefixTooLarge { length: usize },
    /// Buffer longer than the fixed width of the shape being decoded
    Trailing { width: usize, actual: usize },
}

impl Display for OverflowError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            OverflowError::Truncated {
                requested,
                available,
            } => {
                if *available == 0 {
                    write!(f, "cannot read {requested} bytes: buffer exhausted")
                } else {
                    write!(
                        f,
                        "cannot read {requested} bytes: only {available} bytes remaining"
                    )
                }
            }
            OverflowError::Stride { total, width } => {
                write!(
                    f,
                    "{total}-byte sequence is not a whole number of {width}-byte elements"
                )
            }
            OverflowError::Width(err) => Display::fmt(err, f),
            OverflowError::PrefixTooLarge { length } => {
                write!(f, "{length}-byte block does not fit a 4-byte length prefix")
            }
            OverflowError::Trailing { width, actual } => {
                write!(
                    f,
                    "{actual}-byte buffer has trailing bytes past fixed width {width}"
                )
            }
        }
    }
}

impl Error for OverflowError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            OverflowError::Width(err) => Some(err),
            _ => None,
        }
    }
}

/// Data-level failures of the composite (record) codec.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum FieldError {
    /// A field expected by the decoding shape is absent from the buffer
    Missing(String),
    /// The same field name occurs more than once in one encoded composite
    Duplicate(String),
    /// A field name in the buffer is not valid UTF-8
    NonUtf8Name(Vec<u8>),
    /// A constructor pulled an argument of a different type than it declared
    ArgumentMismatch {
        position: usize,
        expected: &'static str,
    },
    /// A constructor pulled more arguments than were decoded
    ArgumentsExhausted { position: usize },
}

impl Display for FieldError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            FieldError::Missing(name) => write!(f, "field `{name}` missing from buffer"),
            FieldError::Duplicate(name) => {
                write!(f, "field `{name}` occurs more than once in buffer")
            }
            FieldError::NonUtf8Name(raw) => {
                write!(f, "field name is not valid UTF-8 ({} bytes)", raw.len())
            }
            FieldError::ArgumentMismatch { position, expected } => {
                write!(
                    f,
                    "constructor argument {position} is not of declared type `{expected}`"
                )
            }
            FieldError::ArgumentsExhausted { position } => {
                write!(f, "constructor requested argument {position} past the last field")
            }
        }
    }
}

impl Error for FieldError {}

/// A fault raised inside the body of a converter
pub struct ConvertError {
    type_name: &'static str,
    source: BoxError,
}

impl ConvertError {
    /// Name of the shape whose converter raised the fault
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Borrows the underlying error
    #[must_use]
    pub fn inner(&self) -> &(dyn Error + Send + Sync + 'static) {
        self.source.as_ref()
    }

    /// Returns the underlying error as `E`, if that is its concrete type
    #[must_use]
    pub fn downcast_ref<E: Error + 'static>(&self) -> Option<&E> {
        self.source.downcast_ref::<E>()
    }
}

impl Debug for ConvertError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("ConvertError")
            .field("type_name", &self.type_name)
            .field("source", &self.source)
            .finish()
    }
}

impl Display for ConvertError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "converter for `{}` failed: {}", self.type_name, self.source)
    }
}

impl Error for ConvertError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(self.source.as_ref())
    }
}

/// Reasons a shape cannot be given a converter
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum SchemaViolation {
    /// Element type of an array or sequence has no fixed representation
    OpaqueElement { element: &'static str },
    /// The shape itself has no derivable representation and nothing is registered for it
    Opaque,
    /// Arrays of rank other than one
    MultiDimensional { rank: usize },
    /// More than one single-element-type sequence capability, over different element types
    AmbiguousSequence { elements: Vec<&'static str> },
    /// No default-plus-setters path and no constructor matching the readable fields
    NoConstruction,
    /// A scalar shape with neither a seeded nor a registered converter
    Unregistered,
}

impl Display for SchemaViolation {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            SchemaViolation::OpaqueElement { element } => {
                write!(f, "element type `{element}` has no fixed representation")
            }
            SchemaViolation::Opaque => write!(f, "shape has no derivable representation"),
            SchemaViolation::MultiDimensional { rank } => {
                write!(
                    f,
                    "rank-{rank} arrays are not supported, use array of arrays instead"
                )
            }
            SchemaViolation::AmbiguousSequence { elements } => {
                write!(f, "ambiguous element type, one of {elements:?}")
            }
            SchemaViolation::NoConstruction => {
                write!(
                    f,
                    "neither default construction with setters nor a matching constructor"
                )
            }
            SchemaViolation::Unregistered => write!(f, "scalar shape has no registered converter"),
        }
    }
}

/// A shape that cannot be converted
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct SchemaError {
    pub type_name: &'static str,
    pub violation: SchemaViolation,
}

impl Display for SchemaError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "invalid schema `{}`: {}", self.type_name, self.violation)
    }
}

impl Error for SchemaError {}

/// A late-bound conversion target with no resolvable converter
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct TypeInvalid {
    pub type_name: &'static str,
}

impl Display for TypeInvalid {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(
            f,
            "no converter for `{}` and it is not a single-element-type sequence",
            self.type_name
        )
    }
}

impl Error for TypeInvalid {}

/// Enumeration over every fault that deriving, encoding, or decoding may report
#[derive(Debug)]
#[non_exhaustive]
pub enum Fault {
    Overflow(OverflowError),
    ConvertError(ConvertError),
    InvalidSchema(SchemaError),
    TypeInvalid(TypeInvalid),
}

impl Fault {
    /// Shorthand for a truncated read
    #[must_use]
    pub fn truncated(requested: usize, available: usize) -> Self {
        Self::Overflow(OverflowError::Truncated {
            requested,
            available,
        })
    }

    /// Wraps an error raised inside the converter for `T`
    #[must_use]
    pub fn convert<T: ?Sized, E>(err: E) -> Self
    where
        E: Into<BoxError>,
    {
        Self::ConvertError(ConvertError {
            type_name: std::any::type_name::<T>(),
            source: err.into(),
        })
    }

    /// Wraps an error raised inside a converter known only by name
    #[must_use]
    pub fn convert_named<E>(type_name: &'static str, err: E) -> Self
    where
        E: Into<BoxError>,
    {
        Self::ConvertError(ConvertError {
            type_name,
            source: err.into(),
        })
    }

    /// Shorthand for a schema violation on `type_name`
    #[must_use]
    pub fn schema(type_name: &'static str, violation: SchemaViolation) -> Self {
        Self::InvalidSchema(SchemaError {
            type_name,
            violation,
        })
    }

    #[must_use]
    pub fn is_overflow(&self) -> bool {
        matches!(self, Fault::Overflow(_))
    }

    #[must_use]
    pub fn is_convert_error(&self) -> bool {
        matches!(self, Fault::ConvertError(_))
    }

    #[must_use]
    pub fn is_invalid_schema(&self) -> bool {
        matches!(self, Fault::InvalidSchema(_))
    }

    #[must_use]
    pub fn is_type_invalid(&self) -> bool {
        matches!(self, Fault::TypeInvalid(_))
    }
}

impl From<OverflowError> for Fault {
    fn from(err: OverflowError) -> Self {
        Self::Overflow(err)
    }
}

impl From<SchemaError> for Fault {
    fn from(err: SchemaError) -> Self {
        Self::InvalidSchema(err)
    }
}

impl From<TypeInvalid> for Fault {
    fn from(err: TypeInvalid) -> Self {
        Self::TypeInvalid(err)
    }
}

impl Display for Fault {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Fault::Overflow(err) => write!(f, "overflow: {err}"),
            Fault::ConvertError(err) => Display::fmt(err, f),
            Fault::InvalidSchema(err) => Display::fmt(err, f),
            Fault::TypeInvalid(err) => Display::fmt(err, f),
        }
    }
}

impl Error for Fault {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Fault::Overflow(err) => Some(err),
            Fault::ConvertError(err) => Some(err),
            Fault::InvalidSchema(err) => Some(err),
            Fault::TypeInvalid(err) => Some(err),
        }
    }
}

/// Type alias for Result with an error type of [`Fault`]
pub type FaultResult<T> = std::result::Result<T, Fault>;

#[cfg(test)]
mod tests {
    use super::*;

    fn dummy<T: Send + Sync>() {}

    #[test]
    fn fault_threadsafe() {
        dummy::<Fault>()
    }

    #[test]
    fn convert_keeps_source() {
        let fault = Fault::convert::<u32, _>(FieldError::Missing("id".to_owned()));
        match &fault {
            Fault::ConvertError(err) => {
                assert_eq!(err.type_name(), "u32");
                assert_eq!(
                    err.downcast_ref::<FieldError>(),
                    Some(&FieldError::Missing("id".to_owned()))
                );
                assert_eq!(err.inner().to_string(), "field `id` missing from buffer");
            }
            other => panic!("unexpected fault {other:?}"),
        }
        assert!(fault.source().is_some());
    }

    #[test]
    fn stride_display() {
        let err = OverflowError::Stride { total: 10, width: 4 };
        assert_eq!(
            err.to_string(),
            "10-byte sequence is not a whole number of 4-byte elements"
        );
    }
}
