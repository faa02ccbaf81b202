//! Message framing over byte streams
//!
//! Whole serialized messages are sent over a stream as
//! `[4-byte LE length][payload]`. This is an outer framing, independent of the
//! length prefixes inside a payload.

use std::error::Error;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::io::{self, ErrorKind, Read, Write};

use crate::cache::PacketCache;
use crate::error::Fault;
use crate::shape::Shaped;
use crate::sink::PREFIX_LEN;

/// Default for [`FrameConfig::max_frame_len`]
pub const DEFAULT_MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

/// Limits applied when reading frames
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameConfig {
    /// Largest payload accepted by [`read_frame`]
    pub max_frame_len: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
        }
    }
}

/// Writes `payload` as one frame
pub fn write_frame<W: Write + ?Sized>(writer: &mut W, payload: &[u8]) -> io::Result<()> {
    let length = u32::try_from(payload.len()).map_err(|_| {
        io::Error::new(
            ErrorKind::InvalidInput,
            format!("{}-byte payload does not fit a frame header", payload.len()),
        )
    })?;
    writer.write_all(&length.to_le_bytes())?;
    writer.write_all(payload)
}

/// Reads one frame.
///
/// Returns `Ok(None)` if the stream ends cleanly before a header. A stream
/// that ends part-way through a frame fails with `UnexpectedEof`, and a
/// header announcing more than `config.max_frame_len` bytes fails with
/// `InvalidData` without reading the payload.
pub fn read_frame<R: Read + ?Sized>(
    reader: &mut R,
    config: &FrameConfig,
) -> io::Result<Option<Vec<u8>>> {
    let mut header = [0u8; PREFIX_LEN];
    let mut filled = 0;
    while filled < PREFIX_LEN {
        match reader.read(&mut header[filled..]) {
            Ok(0) if filled == 0 => return Ok(None),
            Ok(0) => {
                return Err(io::Error::new(
                    ErrorKind::UnexpectedEof,
                    "stream ended inside a frame header",
                ))
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    let length = u32::from_le_bytes(header) as usize;
    if length > config.max_frame_len {
        return Err(io::Error::new(
            ErrorKind::InvalidData,
            format!(
                "{length}-byte frame exceeds limit of {} bytes",
                config.max_frame_len
            ),
        ));
    }
    let mut payload = vec![0u8; length];
    reader.read_exact(&mut payload)?;
    Ok(Some(payload))
}

/// Failure of a framed message read or write
#[derive(Debug)]
pub enum FrameError {
    Io(io::Error),
    Fault(Fault),
}

impl Display for FrameError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            FrameError::Io(err) => write!(f, "framing i/o failed: {err}"),
            FrameError::Fault(err) => write!(f, "framed message rejected: {err}"),
        }
    }
}

impl Error for FrameError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            FrameError::Io(err) => Some(err),
            FrameError::Fault(err) => Some(err),
        }
    }
}

impl From<io::Error> for FrameError {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<Fault> for FrameError {
    fn from(err: Fault) -> Self {
        Self::Fault(err)
    }
}

impl PacketCache {
    /// Serializes `value` and writes it as one frame
    pub fn write_message<T, W>(&self, writer: &mut W, value: &T) -> Result<(), FrameError>
    where
        T: Shaped,
        W: Write + ?Sized,
    {
        let payload = self.serialize(value)?;
        write_frame(writer, &payload)?;
        Ok(())
    }

    /// Reads one frame and deserializes it, or returns `None` at a clean end
    /// of stream
    pub fn read_message<T, R>(
        &self,
        reader: &mut R,
        config: &FrameConfig,
    ) -> Result<Option<T>, FrameError>
    where
        T: Shaped,
        R: Read + ?Sized,
    {
        match read_frame(reader, config)? {
            Some(payload) => Ok(Some(self.deserialize(&payload)?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn frame_roundtrip_then_eof() {
        let mut wire = Vec::new();
        write_frame(&mut wire, b"abc").unwrap();
        write_frame(&mut wire, b"").unwrap();
        assert_eq!(hex::encode(&wire), "0300000061626300000000");
        let mut stream = Cursor::new(wire);
        let config = FrameConfig::default();
        assert_eq!(read_frame(&mut stream, &config).unwrap().unwrap(), b"abc");
        assert_eq!(read_frame(&mut stream, &config).unwrap().unwrap(), b"");
        assert!(read_frame(&mut stream, &config).unwrap().is_none());
    }

    #[test]
    fn truncated_frames() {
        let config = FrameConfig::default();
        let err = read_frame(&mut Cursor::new(vec![5, 0]), &config).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnexpectedEof);
        let err = read_frame(&mut Cursor::new(vec![5, 0, 0, 0, 1]), &config).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnexpectedEof);
    }

    #[test]
    fn oversized_frame_rejected() {
        let config = FrameConfig { max_frame_len: 4 };
        let err = read_frame(&mut Cursor::new(vec![5, 0, 0, 0]), &config).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidData);
    }

    #[test]
    fn messages_over_a_stream() {
        let cache = PacketCache::new();
        let mut wire = Vec::new();
        cache.write_message(&mut wire, &vec![1u16, 2]).unwrap();
        cache
            .write_message(&mut wire, &"hi".to_owned())
            .unwrap();
        let mut stream = Cursor::new(wire);
        let config = FrameConfig::default();
        let first: Option<Vec<u16>> = cache.read_message(&mut stream, &config).unwrap();
        assert_eq!(first, Some(vec![1, 2]));
        let second: Option<String> = cache.read_message(&mut stream, &config).unwrap();
        assert_eq!(second.as_deref(), Some("hi"));
        let end: Option<String> = cache.read_message(&mut stream, &config).unwrap();
        assert!(end.is_none());
    }
}
