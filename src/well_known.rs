//! Converters for common standard-library and `num-bigint` types
//!
//! | Type         | Width | Layout                                                  |
//! |--------------|-------|---------------------------------------------------------|
//! | `IpAddr`     | var.  | 4 or 16 address bytes, network order                    |
//! | `SocketAddr` | var.  | address bytes, then the port as a 2-byte LE integer     |
//! | `SystemTime` | 8     | signed LE nanoseconds relative to the UNIX epoch        |
//! | `Duration`   | 12    | 8-byte LE seconds, then 4-byte LE sub-second nanos      |
//! | `BigInt`     | var.  | two's-complement LE bytes                               |
//! | `BigUint`    | var.  | LE magnitude bytes                                      |
//!
//! The shapes of these types are scalar, and every new cache is seeded with
//! these converters. This module exists only with the `well_known` feature.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use num_bigint::{BigInt, BigUint};

use crate::conv::Converter;
use crate::cursor::{DecodeCursor, DecodedBlock};
use crate::error::Fault;
use crate::prim::PrimitiveConverter;
use crate::shape::{Shape, Shaped};
use crate::sink::ByteSink;

macro_rules! impl_scalar {
    ( $( $t:ty ),+ $(,)? ) => {
        $(
            impl Shaped for $t {
                fn shape() -> Shape<Self> {
                    Shape::scalar()
                }
            }
        )+
    };
}

impl_scalar!(IpAddr, SocketAddr, SystemTime, Duration, BigInt, BigUint);

const NANOS_PER_SEC: u32 = 1_000_000_000;

fn ip_from_octets<T>(raw: &[u8]) -> Result<IpAddr, Fault> {
    if let Ok(v4) = <[u8; 4]>::try_from(raw) {
        Ok(IpAddr::V4(Ipv4Addr::from(v4)))
    } else if let Ok(v6) = <[u8; 16]>::try_from(raw) {
        Ok(IpAddr::V6(Ipv6Addr::from(v6)))
    } else {
        Err(Fault::convert::<T, _>(format!(
            "{}-byte address is neither IPv4 nor IPv6",
            raw.len()
        )))
    }
}

fn push_ip(sink: &mut ByteSink, addr: &IpAddr) {
    match addr {
        IpAddr::V4(v4) => sink.push_many(v4.octets()),
        IpAddr::V6(v6) => sink.push_many(v6.octets()),
    };
}

#[derive(Clone, Copy, Debug, Default)]
pub struct IpAddrConverter;

impl Converter<IpAddr> for IpAddrConverter {
    fn fixed_width(&self) -> Option<usize> {
        None
    }

    fn encode(&self, sink: &mut ByteSink, value: &IpAddr) -> Result<(), Fault> {
        push_ip(sink, value);
        Ok(())
    }

    fn decode(&self, block: DecodedBlock<'_>) -> Result<IpAddr, Fault> {
        ip_from_octets::<IpAddr>(block.as_slice())
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SocketAddrConverter;

impl Converter<SocketAddr> for SocketAddrConverter {
    fn fixed_width(&self) -> Option<usize> {
        None
    }

    fn encode(&self, sink: &mut ByteSink, value: &SocketAddr) -> Result<(), Fault> {
        push_ip(sink, &value.ip());
        PrimitiveConverter::<u16>::new().encode(sink, &value.port())
    }

    fn decode(&self, block: DecodedBlock<'_>) -> Result<SocketAddr, Fault> {
        let Some(addr_len) = block.len().checked_sub(2) else {
            return Err(Fault::truncated(2, block.len()));
        };
        let ip = ip_from_octets::<SocketAddr>(block.leading(addr_len)?.as_slice())?;
        let port = PrimitiveConverter::<u16>::new().decode(block.slice(addr_len, 2)?)?;
        Ok(SocketAddr::new(ip, port))
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemTimeConverter;

impl Converter<SystemTime> for SystemTimeConverter {
    fn fixed_width(&self) -> Option<usize> {
        Some(8)
    }

    fn encode(&self, sink: &mut ByteSink, value: &SystemTime) -> Result<(), Fault> {
        let out_of_range = |_| Fault::convert::<SystemTime, _>("timestamp outside i64 nanoseconds");
        let signed = match value.duration_since(UNIX_EPOCH) {
            Ok(after) => i128::try_from(after.as_nanos()),
            Err(before) => i128::try_from(before.duration().as_nanos()).map(|n| -n),
        };
        let nanos = i64::try_from(signed.map_err(out_of_range)?).map_err(out_of_range)?;
        PrimitiveConverter::<i64>::new().encode(sink, &nanos)
    }

    fn decode(&self, block: DecodedBlock<'_>) -> Result<SystemTime, Fault> {
        let nanos = PrimitiveConverter::<i64>::new().decode(block)?;
        let offset = Duration::from_nanos(nanos.unsigned_abs());
        let time = if nanos >= 0 {
            UNIX_EPOCH.checked_add(offset)
        } else {
            UNIX_EPOCH.checked_sub(offset)
        };
        time.ok_or_else(|| {
            Fault::convert::<SystemTime, _>(format!("{nanos}ns from epoch is not representable"))
        })
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct DurationConverter;

impl Converter<Duration> for DurationConverter {
    fn fixed_width(&self) -> Option<usize> {
        Some(12)
    }

    fn encode(&self, sink: &mut ByteSink, value: &Duration) -> Result<(), Fault> {
        PrimitiveConverter::<u64>::new().encode(sink, &value.as_secs())?;
        PrimitiveConverter::<u32>::new().encode(sink, &value.subsec_nanos())
    }

    fn decode(&self, block: DecodedBlock<'_>) -> Result<Duration, Fault> {
        let mut cursor = DecodeCursor::new(block);
        let secs = cursor.next(&PrimitiveConverter::<u64>::new())?;
        let nanos = cursor.next(&PrimitiveConverter::<u32>::new())?;
        if nanos >= NANOS_PER_SEC {
            return Err(Fault::convert::<Duration, _>(format!(
                "{nanos} sub-second nanoseconds"
            )));
        }
        Ok(Duration::new(secs, nanos))
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct BigIntConverter;

impl Converter<BigInt> for BigIntConverter {
    fn fixed_width(&self) -> Option<usize> {
        None
    }

    fn encode(&self, sink: &mut ByteSink, value: &BigInt) -> Result<(), Fault> {
        sink.push_all(&value.to_signed_bytes_le());
        Ok(())
    }

    fn decode(&self, block: DecodedBlock<'_>) -> Result<BigInt, Fault> {
        Ok(BigInt::from_signed_bytes_le(block.as_slice()))
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct BigUintConverter;

impl Converter<BigUint> for BigUintConverter {
    fn fixed_width(&self) -> Option<usize> {
        None
    }

    fn encode(&self, sink: &mut ByteSink, value: &BigUint) -> Result<(), Fault> {
        sink.push_all(&value.to_bytes_le());
        Ok(())
    }

    fn decode(&self, block: DecodedBlock<'_>) -> Result<BigUint, Fault> {
        Ok(BigUint::from_bytes_le(block.as_slice()))
    }
}

pub(crate) fn seeds() -> Vec<crate::cache::Seed> {
    use crate::cache::seed;

    vec![
        seed::<IpAddr, _>(IpAddrConverter),
        seed::<SocketAddr, _>(SocketAddrConverter),
        seed::<SystemTime, _>(SystemTimeConverter),
        seed::<Duration, _>(DurationConverter),
        seed::<BigInt, _>(BigIntConverter),
        seed::<BigUint, _>(BigUintConverter),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode<T, C: Converter<T>>(conv: &C, value: &T) -> Vec<u8> {
        let mut sink = ByteSink::new();
        conv.encode(&mut sink, value).unwrap();
        sink.finalize()
    }

    #[test]
    fn socket_addr_layout() {
        let addr: SocketAddr = "10.0.0.1:8080".parse().unwrap();
        let bytes = encode(&SocketAddrConverter, &addr);
        assert_eq!(hex::encode(&bytes), "0a000001901f");
        assert_eq!(
            SocketAddrConverter.decode(DecodedBlock::new(&bytes)).unwrap(),
            addr
        );
        assert!(SocketAddrConverter
            .decode(DecodedBlock::new(&[1, 2, 3]))
            .unwrap_err()
            .is_convert_error());
    }

    #[test]
    fn ip_v6_is_sixteen_bytes() {
        let addr: IpAddr = "::1".parse().unwrap();
        let bytes = encode(&IpAddrConverter, &addr);
        assert_eq!(bytes.len(), 16);
        assert_eq!(IpAddrConverter.decode(DecodedBlock::new(&bytes)).unwrap(), addr);
    }

    #[test]
    fn system_time_before_epoch() {
        let before = UNIX_EPOCH - Duration::from_nanos(1_500);
        let bytes = encode(&SystemTimeConverter, &before);
        assert_eq!(bytes, (-1_500i64).to_le_bytes());
        assert_eq!(
            SystemTimeConverter.decode(DecodedBlock::new(&bytes)).unwrap(),
            before
        );
    }

    #[test]
    fn system_time_spans_full_i64_range() {
        let earliest = UNIX_EPOCH - Duration::from_nanos(1 << 63);
        let bytes = encode(&SystemTimeConverter, &earliest);
        assert_eq!(bytes, i64::MIN.to_le_bytes());
        assert_eq!(
            SystemTimeConverter.decode(DecodedBlock::new(&bytes)).unwrap(),
            earliest
        );

        let mut sink = ByteSink::new();
        let too_early = earliest - Duration::from_nanos(1);
        assert!(SystemTimeConverter
            .encode(&mut sink, &too_early)
            .unwrap_err()
            .is_convert_error());
        let too_late = UNIX_EPOCH + Duration::from_nanos(1 << 63);
        assert!(SystemTimeConverter
            .encode(&mut sink, &too_late)
            .unwrap_err()
            .is_convert_error());
    }

    #[test]
    fn duration_rejects_excess_nanos() {
        let d = Duration::new(3, 250);
        let bytes = encode(&DurationConverter, &d);
        assert_eq!(hex::encode(&bytes), "0300000000000000fa000000");
        let mut bad = bytes.clone();
        bad[8..].copy_from_slice(&NANOS_PER_SEC.to_le_bytes());
        assert!(DurationConverter
            .decode(DecodedBlock::new(&bad))
            .unwrap_err()
            .is_convert_error());
    }

    #[test]
    fn bigint_twos_complement() {
        let n = BigInt::from(-256);
        let bytes = encode(&BigIntConverter, &n);
        assert_eq!(bytes, [0x00, 0xff]);
        assert_eq!(BigIntConverter.decode(DecodedBlock::new(&bytes)).unwrap(), n);
        assert_eq!(
            BigUintConverter.decode(DecodedBlock::new(&[])).unwrap(),
            BigUint::from(0u8)
        );
    }
}
