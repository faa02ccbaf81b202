//! Shape-derived binary converters with a concurrent converter cache
//!
//! # Overview
//!
//! This library turns structured values into a compact byte representation
//! and back, without hand-written per-type encode/decode code. Each type
//! describes its own structure by implementing [`Shaped`] (usually through
//! `#[derive(Packet)]`), and the first time a [`PacketCache`] sees that type it
//! derives a [`Converter`] from the description and keeps it for every later
//! call.
//!
//! ```
//! use packet::{Packet, PacketCache};
//!
//! #[derive(Packet, Debug, PartialEq)]
//! struct Reading {
//!     sensor: String,
//!     samples: Vec<i32>,
//! }
//!
//! let cache = PacketCache::new();
//! let value = Reading { sensor: "t0".into(), samples: vec![1, 2, 3] };
//! let bytes = cache.serialize(&value).unwrap();
//! assert_eq!(cache.deserialize::<Reading>(&bytes).unwrap(), value);
//! ```
//!
//! # Wire format
//!
//! | Element                        | Layout                                                   |
//! |--------------------------------|----------------------------------------------------------|
//! | Fixed-width scalar             | raw little-endian bytes, no prefix                       |
//! | Variable-width value           | `[4-byte LE length][bytes]` (an *extend write*)          |
//! | Record field                   | `[extend write: name][extend write: value]`, repeated    |
//! | Sequence of fixed-width values | concatenated raw elements                                |
//! | Sequence of variable values    | one extend write per element                             |
//!
//! The top-level value of a buffer is never prefixed; its extent is the
//! buffer itself.
//!
//! # Structure
//!
//!   * [`shape`] holds the [`Shaped`] trait and the builders shapes are made of.
//!   * [`cache`] is the converter registry, and [`factory`] derives converters
//!     for shapes the registry has not seen.
//!   * [`conv`] defines the [`Converter`] trait and the compound converters;
//!     [`prim`] and [`string`] hold the scalar converters, as does `well_known`
//!     when the feature of the same name is enabled.
//!   * [`sink`] and [`cursor`] are the encode-side buffer and the decode-side
//!     zero-copy views.
//!   * [`dynamic`] and [`framing`] build on the core: late-bound access to
//!     encoded buffers, and message framing over streams.

extern crate self as packet;

pub mod cache;
pub mod conv;
pub mod cursor;
pub mod decimal;
pub mod dynamic;
pub mod endian;
pub mod error;
pub mod factory;
pub mod framing;
pub mod prelude;
pub mod prim;
pub mod shape;
pub mod sink;
pub mod string;
#[cfg(feature = "well_known")]
pub mod well_known;

pub use cache::{CacheConfig, Origin, PacketCache, PacketCacheBuilder};
pub use conv::{Converter, ConverterRef};
pub use cursor::{DecodeCursor, DecodedBlock, FieldDictionary};
pub use decimal::Decimal;
pub use dynamic::DynamicReader;
pub use error::{Fault, FaultResult};
pub use framing::{FrameConfig, FrameError};
pub use shape::{
    ArrayShape, Constructor, ConstructorArgs, EnumShape, RecordShape, Sequence, SequenceShape,
    Shape, ShapeKind, Shaped, TransparentShape,
};
pub use sink::ByteSink;

pub use packet_derive::Packet;
