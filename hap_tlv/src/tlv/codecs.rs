use std::{
    convert::TryFrom,
    fmt,
    net::{Ipv4Addr, Ipv6Addr},
};

use super::{Custom, Format, ValueCodec};
use crate::error::*;
use log::info;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct MacAddress(pub [u8; 6]);

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = &self.0;
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            b[0], b[1], b[2], b[3], b[4], b[5]
        )
    }
}

fn value_of<T: 'static>(value: &Custom) -> &T {
    value
        .downcast_ref::<T>()
        .unwrap_or_else(|| panic!("Unexpected value type {:?}", value))
}

fn put(buf: &mut [u8], bytes: &[u8]) -> Result<usize, Error> {
    if buf.len() < bytes.len() {
        return Err(Error::OutOfResources);
    }
    buf[..bytes.len()].copy_from_slice(bytes);
    Ok(bytes.len())
}

fn exact<const N: usize>(bytes: &[u8]) -> Result<[u8; N], Error> {
    <[u8; N]>::try_from(bytes).map_err(|e| {
        info!("Expected {} bytes, got {}.", N, bytes.len());
        Error::from(e)
    })
}

/// 48-bit MAC address as [`MacAddress`]
pub struct MacAddressCodec;

impl ValueCodec for MacAddressCodec {
    fn decode(&self, bytes: &[u8]) -> Result<Custom, Error> {
        Ok(Custom::new(MacAddress(exact(bytes)?)))
    }

    fn encode(&self, value: &Custom, buf: &mut [u8]) -> Result<usize, Error> {
        put(buf, &value_of::<MacAddress>(value).0)
    }

    fn describe(&self, value: &Custom, f: &mut dyn fmt::Write) -> fmt::Result {
        write!(f, "{}", value_of::<MacAddress>(value))
    }
}

/// IPv4 address as [`Ipv4Addr`], in network byte order
pub struct Ipv4AddressCodec;

impl ValueCodec for Ipv4AddressCodec {
    fn decode(&self, bytes: &[u8]) -> Result<Custom, Error> {
        Ok(Custom::new(Ipv4Addr::from(exact::<4>(bytes)?)))
    }

    fn encode(&self, value: &Custom, buf: &mut [u8]) -> Result<usize, Error> {
        put(buf, &value_of::<Ipv4Addr>(value).octets())
    }

    fn describe(&self, value: &Custom, f: &mut dyn fmt::Write) -> fmt::Result {
        write!(f, "{}", value_of::<Ipv4Addr>(value))
    }
}

/// IPv6 address as [`Ipv6Addr`], in network byte order
pub struct Ipv6AddressCodec;

impl ValueCodec for Ipv6AddressCodec {
    fn decode(&self, bytes: &[u8]) -> Result<Custom, Error> {
        Ok(Custom::new(Ipv6Addr::from(exact::<16>(bytes)?)))
    }

    fn encode(&self, value: &Custom, buf: &mut [u8]) -> Result<usize, Error> {
        put(buf, &value_of::<Ipv6Addr>(value).octets())
    }

    fn describe(&self, value: &Custom, f: &mut dyn fmt::Write) -> fmt::Result {
        write!(f, "{}", value_of::<Ipv6Addr>(value))
    }
}

pub static MAC_ADDRESS: Format = Format::Value(&MacAddressCodec);
pub static IPV4_ADDRESS: Format = Format::Value(&Ipv4AddressCodec);
pub static IPV6_ADDRESS: Format = Format::Value(&Ipv6AddressCodec);
