//! Assorted imports for code that defines shapes or converters by hand

pub use crate::cache::PacketCache;
pub use crate::conv::{Converter, ConverterRef};
pub use crate::cursor::DecodedBlock;
pub use crate::error::Fault;
pub use crate::shape::{
    ArrayShape, Constructor, ConstructorArgs, EnumShape, RecordShape, Sequence, SequenceShape,
    Shape, Shaped, TransparentShape,
};
pub use crate::sink::ByteSink;
pub use crate::Packet;
