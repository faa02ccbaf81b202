//! UTF-8 text converter

use crate::conv::Converter;
use crate::cursor::DecodedBlock;
use crate::error::Fault;
use crate::sink::ByteSink;

/// Variable-width converter writing the UTF-8 bytes of a `String` unframed;
/// the enclosing context supplies the length
#[derive(Clone, Copy, Debug, Default)]
pub struct StringConverter;

impl Converter<String> for StringConverter {
    fn fixed_width(&self) -> Option<usize> {
        None
    }

    fn encode(&self, sink: &mut ByteSink, value: &String) -> Result<(), Fault> {
        sink.push_all(value.as_bytes());
        Ok(())
    }

    fn decode(&self, block: DecodedBlock<'_>) -> Result<String, Fault> {
        std::str::from_utf8(block.as_slice())
            .map(str::to_owned)
            .map_err(Fault::convert::<String, _>)
    }
}
