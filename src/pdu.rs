/*! The DCP PDU header and the protocol constants it carries.

A DCP PDU starts with a fixed 12-octet header, big-endian throughout:

```text
+----------+------------+--------------+---------+----------------+-------------+
| frame_id | service_id | service_type |   xid   | response_delay | data_length |
|   u16    |     u8     |      u8      |   u32   |      u16       |     u16     |
+----------+------------+--------------+---------+----------------+-------------+
```

`data_length` octets of block data follow.  Anything after that is link
padding (Ethernet pads short frames to the minimum size) and must be
ignored.
*/

use crate::addr::MacAddress;
use crate::frame::{ensure_remaining, WireError};
use bytes::{Buf, BufMut, Bytes, BytesMut};

/// Every device on the segment answers an identify request sent to this
/// multicast address.
pub const PROFINET_MULTICAST_MAC: MacAddress =
    MacAddress([0x01, 0x0e, 0xcf, 0x00, 0x00, 0x00]);

/// Frame ID selecting the get/set service family.
pub const FRAME_ID_GET_SET: u16 = 0xFEFD;
/// Frame ID of an identify request.
pub const FRAME_ID_IDENTIFY_REQUEST: u16 = 0xFEFE;
/// Frame ID of an identify response.
pub const FRAME_ID_IDENTIFY_RESPONSE: u16 = 0xFEFF;

/// Response delay announced on identify requests.  Devices spread their
/// answers over this window so a multicast does not flood the segment.
/// Meaningless on unicast requests, which carry zero.
pub const RESPONSE_DELAY_IDENTIFY: u16 = 0x0080;

pub const SERVICE_TYPE_REQUEST: u8 = 0;
pub const SERVICE_TYPE_RESPONSE: u8 = 1;

/// The DCP service invoked by a request.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[repr(u8)]
pub enum ServiceId {
    Get = 3,
    Set = 4,
    Identify = 5,
}

/// A DCP PDU: the fixed header plus `data_length` octets of block data.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct DcpPdu {
    pub frame_id: u16,
    pub service_id: u8,
    pub service_type: u8,
    pub xid: u32,
    pub response_delay: u16,
    pub payload: Bytes,
}

impl DcpPdu {
    pub const HEADER_LEN: usize = 12;

    /// Parse the header and take exactly `data_length` octets of payload.
    /// Trailing link padding is discarded here.
    pub fn parse(mut buf: Bytes) -> Result<DcpPdu, WireError> {
        ensure_remaining!(buf, Self::HEADER_LEN);
        let frame_id = buf.get_u16();
        let service_id = buf.get_u8();
        let service_type = buf.get_u8();
        let xid = buf.get_u32();
        let response_delay = buf.get_u16();
        let data_length = buf.get_u16() as usize;
        ensure_remaining!(buf, data_length);
        let payload = buf.split_to(data_length);
        Ok(DcpPdu {
            frame_id,
            service_id,
            service_type,
            xid,
            response_delay,
            payload,
        })
    }

    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(Self::HEADER_LEN + self.payload.len());
        buf.put_u16(self.frame_id);
        buf.put_u8(self.service_id);
        buf.put_u8(self.service_type);
        buf.put_u32(self.xid);
        buf.put_u16(self.response_delay);
        buf.put_u16(self.payload.len() as u16);
        buf.put_slice(&self.payload);
        buf.freeze()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let pdu = DcpPdu {
            frame_id: FRAME_ID_IDENTIFY_REQUEST,
            service_id: ServiceId::Identify as u8,
            service_type: SERVICE_TYPE_REQUEST,
            xid: 0x0701_0052,
            response_delay: RESPONSE_DELAY_IDENTIFY,
            payload: Bytes::from_static(&[0xff, 0xff, 0x00, 0x00]),
        };
        let wire = pdu.encode();
        assert_eq!(wire.len(), 16);
        assert_eq!(&wire[..2], &[0xfe, 0xfe]);
        assert_eq!(wire[2], 5);
        assert_eq!(wire[3], 0);
        assert_eq!(&wire[4..8], &[0x07, 0x01, 0x00, 0x52]);
        assert_eq!(&wire[8..10], &[0x00, 0x80]);
        assert_eq!(&wire[10..12], &[0x00, 0x04]);
        assert_eq!(DcpPdu::parse(wire).unwrap(), pdu);
    }

    #[test]
    fn link_padding_is_discarded() {
        // data_length 2, followed by four octets of minimum-size padding
        let wire = Bytes::from_static(&[
            0xfe, 0xfd, 0x03, 0x01, 0x00, 0x00, 0x00, 0x07, 0x00, 0x00, 0x00, 0x02, //
            0x01, 0x02, 0x00, 0x00, 0x00, 0x00,
        ]);
        let pdu = DcpPdu::parse(wire).unwrap();
        assert_eq!(pdu.payload.as_ref(), &[0x01, 0x02]);
    }

    #[test]
    fn announced_length_must_be_present() {
        let wire = Bytes::from_static(&[
            0xfe, 0xfd, 0x03, 0x01, 0x00, 0x00, 0x00, 0x07, 0x00, 0x00, 0x00, 0x10, //
            0x01, 0x02,
        ]);
        assert!(DcpPdu::parse(wire).is_err());
    }
}
