/*! Ethernet II framing.

DCP is carried directly in Ethernet II frames with EtherType `0x8892`.
The hand-off to the transport sits below the FCS layer on both backends,
so neither side sees a frame check sequence; a frame is just the 14-octet
header followed by the payload.
*/

use crate::addr::MacAddress;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use thiserror::Error;

/// EtherType of all PROFINET frames, DCP included.
pub const ETHER_TYPE_DCP: u16 = 0x8892;

/// Length of the Ethernet II header: destination, source, EtherType.
pub const HEADER_LEN: usize = 14;

/// A received buffer is too short to contain what its headers announce.
///
/// Such frames are dropped by the engine; this error never reaches the
/// public API.
#[derive(Debug, Error)]
pub enum WireError {
    #[error("not enough bytes")]
    Truncated,
}

macro_rules! ensure_remaining {
    ($buf:expr, $len:expr) => {
        if $buf.remaining() < $len {
            return Err($crate::frame::WireError::Truncated);
        }
    };
}
pub(crate) use ensure_remaining;

/// An Ethernet II frame: two MAC addresses, an EtherType, and the payload.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct EthernetFrame {
    pub destination: MacAddress,
    pub source: MacAddress,
    pub ether_type: u16,
    pub payload: Bytes,
}

impl EthernetFrame {
    pub fn new(
        destination: MacAddress,
        source: MacAddress,
        ether_type: u16,
        payload: Bytes,
    ) -> EthernetFrame {
        EthernetFrame {
            destination,
            source,
            ether_type,
            payload,
        }
    }

    pub fn parse(mut buf: Bytes) -> Result<EthernetFrame, WireError> {
        ensure_remaining!(buf, HEADER_LEN);
        let destination = MacAddress::from_slice(&buf.split_to(6));
        let source = MacAddress::from_slice(&buf.split_to(6));
        let ether_type = buf.get_u16();
        Ok(EthernetFrame {
            destination,
            source,
            ether_type,
            payload: buf,
        })
    }

    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(HEADER_LEN + self.payload.len());
        buf.put_slice(&self.destination.octets());
        buf.put_slice(&self.source.octets());
        buf.put_u16(self.ether_type);
        buf.put_slice(&self.payload);
        buf.freeze()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let frame = EthernetFrame::new(
            "01:0e:cf:00:00:00".parse().unwrap(),
            "00:50:56:ac:dd:2e".parse().unwrap(),
            ETHER_TYPE_DCP,
            Bytes::from_static(&[0xde, 0xad, 0xbe, 0xef]),
        );
        let wire = frame.encode();
        assert_eq!(&wire[..6], &[0x01, 0x0e, 0xcf, 0x00, 0x00, 0x00]);
        assert_eq!(&wire[12..14], &[0x88, 0x92]);
        assert_eq!(EthernetFrame::parse(wire).unwrap(), frame);
    }

    #[test]
    fn truncated_header_is_rejected() {
        let buf = Bytes::from_static(&[0x01, 0x0e, 0xcf]);
        assert!(EthernetFrame::parse(buf).is_err());
    }
}
