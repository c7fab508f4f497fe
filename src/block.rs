/*! DCP blocks: the TLV units carried in a PDU's payload.

A request block is `option (u8) || sub_option (u8) || length (u16) ||
payload`.  A response block carries an extra u16 of block info (the
"status" word) between the length field and the payload; its `length`
counts that word.  Blocks are aligned to even offsets: an odd-length
payload is followed by a single zero octet which is *not* counted in the
block's own `length`, only in the PDU's `data_length`.
*/

use crate::frame::{ensure_remaining, WireError};
use bytes::{Buf, BufMut, Bytes, BytesMut};

/// Option/sub-option pairs naming the configurable parameters.
pub mod options {
    pub const IP_ADDRESS: (u8, u8) = (1, 2);
    pub const DEVICE_FAMILY: (u8, u8) = (2, 1);
    pub const NAME_OF_STATION: (u8, u8) = (2, 2);
    pub const DEVICE_ID: (u8, u8) = (2, 3);
    pub const BLINK_LED: (u8, u8) = (5, 3);
    pub const FACTORY_RESET: (u8, u8) = (5, 5);
    pub const RESET_TO_FACTORY: (u8, u8) = (5, 6);
    pub const ALL_SELECTOR: (u8, u8) = (0xFF, 0xFF);
}

/// The control option; set/reset responses answer with a control block.
pub const OPTION_CONTROL: u8 = 5;

/// Qualifier asking the device to keep the value across power cycles.
pub const QUALIFIER_STORE_PERMANENT: u16 = 0x0001;
/// Qualifier for a value that is discarded on the next power cycle.
pub const QUALIFIER_STORE_TEMPORARY: u16 = 0x0000;
/// Qualifier for control blocks whose sub-option takes no mode, e.g. blink.
pub const QUALIFIER_RESERVED: u16 = 0x0000;

/// Signal value that makes the device flash its LEDs once.
pub const SIGNAL_FLASH_ONCE: u16 = 0x0100;

/// What a reset-to-factory request resets, encoded as the block qualifier.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
#[repr(u16)]
pub enum ResetMode {
    ApplicationData = 0x0002,
    #[default]
    Communication = 0x0004,
    Engineering = 0x0006,
    AllData = 0x0008,
    Device = 0x0010,
    AndRestore = 0x0012,
}

impl ResetMode {
    pub fn qualifier(self) -> u16 {
        self as u16
    }
}

/// A block as written into an outgoing request.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct RequestBlock {
    pub option: u8,
    pub sub_option: u8,
    pub payload: Bytes,
}

impl RequestBlock {
    pub fn new(option: (u8, u8), payload: Bytes) -> RequestBlock {
        RequestBlock {
            option: option.0,
            sub_option: option.1,
            payload,
        }
    }

    /// Wire size of the block: header, payload, and the alignment octet
    /// for odd payload lengths.
    pub fn encoded_len(&self) -> usize {
        4 + self.payload.len() + self.payload.len() % 2
    }

    /// The `length` field reports the unpadded payload length; the pad
    /// octet is appended after the payload.
    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_u8(self.option);
        buf.put_u8(self.sub_option);
        buf.put_u16(self.payload.len() as u16);
        buf.put_slice(&self.payload);
        if self.payload.len() % 2 != 0 {
            buf.put_u8(0);
        }
    }
}

/// A block parsed out of a response.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ResponseBlock {
    pub option: u8,
    pub sub_option: u8,
    /// The block info word.  Identify responses use it to flag the block
    /// state; set/reset responses echo the addressed option here.
    pub status: u16,
    pub payload: Bytes,
}

impl ResponseBlock {
    /// Parse one block off the front of `buf`, leaving the cursor on the
    /// next even boundary.  A device may omit the pad octet after the
    /// final block; that is tolerated.
    pub fn parse(buf: &mut Bytes) -> Result<ResponseBlock, WireError> {
        ensure_remaining!(buf, 6);
        let option = buf.get_u8();
        let sub_option = buf.get_u8();
        let length = buf.get_u16() as usize;
        if length < 2 {
            return Err(WireError::Truncated);
        }
        let status = buf.get_u16();
        ensure_remaining!(buf, length - 2);
        let payload = buf.split_to(length - 2);
        if length % 2 != 0 && buf.has_remaining() {
            buf.advance(1);
        }
        Ok(ResponseBlock {
            option,
            sub_option,
            status,
            payload,
        })
    }

    pub fn option_pair(&self) -> (u8, u8) {
        (self.option, self.sub_option)
    }
}

/// Decode an ASCII value padded with trailing NULs to even length.
pub(crate) fn ascii_unpadded(payload: &[u8]) -> String {
    let end = payload
        .iter()
        .rposition(|b| *b != 0)
        .map_or(0, |i| i + 1);
    String::from_utf8_lossy(&payload[..end]).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn odd_payload_is_padded_but_not_counted() {
        let block = RequestBlock::new(options::NAME_OF_STATION, Bytes::from_static(b"\x00\x01abc"));
        assert_eq!(block.encoded_len(), 10);
        let mut buf = BytesMut::new();
        block.encode(&mut buf);
        assert_eq!(
            buf.as_ref(),
            [0x02, 0x02, 0x00, 0x05, 0x00, 0x01, b'a', b'b', b'c', 0x00]
        );
    }

    #[test]
    fn even_payload_is_not_padded() {
        let block = RequestBlock::new(options::BLINK_LED, Bytes::from_static(&[0, 0, 1, 0]));
        assert_eq!(block.encoded_len(), 8);
        let mut buf = BytesMut::new();
        block.encode(&mut buf);
        assert_eq!(buf.as_ref(), [0x05, 0x03, 0x00, 0x04, 0x00, 0x00, 0x01, 0x00]);
    }

    #[test]
    fn response_walk_advances_past_padding() {
        // name block with odd length, then an ip-address block
        let mut buf = Bytes::from_static(&[
            0x02, 0x02, 0x00, 0x07, 0x00, 0x00, b's', b'p', b's', b'w', b'7', 0x00, //
            0x01, 0x02, 0x00, 0x0e, 0x00, 0x01, //
            10, 0, 0, 30, 255, 255, 240, 0, 10, 0, 0, 1,
        ]);
        let name = ResponseBlock::parse(&mut buf).unwrap();
        assert_eq!(name.option_pair(), options::NAME_OF_STATION);
        assert_eq!(name.status, 0x0000);
        assert_eq!(ascii_unpadded(&name.payload), "spsw7");

        let ip = ResponseBlock::parse(&mut buf).unwrap();
        assert_eq!(ip.option_pair(), options::IP_ADDRESS);
        assert_eq!(ip.status, 0x0001);
        assert_eq!(ip.payload.len(), 12);
        assert!(!buf.has_remaining());
    }

    #[test]
    fn missing_final_pad_octet_is_tolerated() {
        let mut buf = Bytes::from_static(&[0x02, 0x01, 0x00, 0x05, 0x00, 0x00, b'W', b'i', b'n']);
        let block = ResponseBlock::parse(&mut buf).unwrap();
        assert_eq!(ascii_unpadded(&block.payload), "Win");
        assert!(!buf.has_remaining());
    }

    #[test]
    fn truncated_block_is_rejected() {
        let mut buf = Bytes::from_static(&[0x02, 0x02, 0x00, 0x10, 0x00, 0x00, b'x']);
        assert!(ResponseBlock::parse(&mut buf).is_err());
    }

    #[test]
    fn reset_mode_qualifiers() {
        assert_eq!(ResetMode::default().qualifier(), 0x0004);
        assert_eq!(ResetMode::AllData.qualifier(), 0x0008);
        assert_eq!(ResetMode::AndRestore.qualifier(), 0x0012);
    }
}
