/*! What a DCP conversation yields: discovered devices and set/reset
response codes. */

use crate::addr::MacAddress;
use crate::block::{ascii_unpadded, options, ResponseBlock};
use std::fmt;
use std::net::Ipv4Addr;
use tracing::*;

/// A device as described by an identify or get response.
///
/// Fields not present in the response keep their empty defaults.  `mac` is
/// always the Ethernet source address of the response frame, regardless of
/// any addresses that may appear inside blocks.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Device {
    pub name_of_station: String,
    pub mac: MacAddress,
    pub ip: Option<Ipv4Addr>,
    pub netmask: Option<Ipv4Addr>,
    pub gateway: Option<Ipv4Addr>,
    pub family: String,
}

impl Device {
    pub(crate) fn new(mac: MacAddress) -> Device {
        Device {
            name_of_station: String::new(),
            mac,
            ip: None,
            netmask: None,
            gateway: None,
            family: String::new(),
        }
    }

    /// Fold one response block into the record.  Unknown blocks are
    /// ignored.
    pub(crate) fn apply_block(&mut self, block: &ResponseBlock) {
        match block.option_pair() {
            options::NAME_OF_STATION => {
                self.name_of_station = ascii_unpadded(&block.payload);
            }
            options::IP_ADDRESS => {
                if block.payload.len() < 12 {
                    warn!(
                        "ip parameter block is {} bytes, expected 12; ignoring",
                        block.payload.len()
                    );
                    return;
                }
                let quad = |i: usize| -> Ipv4Addr {
                    let mut octets = [0; 4];
                    octets.copy_from_slice(&block.payload[i..i + 4]);
                    Ipv4Addr::from(octets)
                };
                self.ip = Some(quad(0));
                self.netmask = Some(quad(4));
                self.gateway = Some(quad(8));
            }
            options::DEVICE_FAMILY => {
                self.family = ascii_unpadded(&block.payload);
            }
            _ => trace!(
                "ignoring block ({}, {})",
                block.option,
                block.sub_option
            ),
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name_of_station, self.mac)?;
        if let Some(ip) = self.ip {
            write!(f, " ip={ip}")?;
        }
        if let Some(netmask) = self.netmask {
            write!(f, " netmask={netmask}")?;
        }
        if let Some(gateway) = self.gateway {
            write!(f, " gateway={gateway}")?;
        }
        if !self.family.is_empty() {
            write!(f, " family={:?}", self.family)?;
        }
        Ok(())
    }
}

/// The code a device returns in answer to a set or reset request.
///
/// Zero means the request was carried out; everything else names a reason
/// it was not.  The caller decides whether that is fatal.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct ResponseCode(pub u8);

impl ResponseCode {
    pub fn code(&self) -> u8 {
        self.0
    }

    pub fn is_success(&self) -> bool {
        self.0 == 0
    }

    pub fn message(&self) -> &'static str {
        match self.0 {
            0 => "set successful",
            1 => "option unsupported",
            2 => "sub-option unsupported or no data set available",
            3 => "sub-option not set",
            4 => "resource error",
            5 => "set not possible by local reasons",
            6 => "in operation, set not possible",
            _ => "unknown response code",
        }
    }
}

impl fmt::Display for ResponseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "code {:02}: {}", self.0, self.message())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn mac() -> MacAddress {
        "00:0c:29:66:47:a5".parse().unwrap()
    }

    #[test]
    fn blocks_populate_the_record() {
        let mut device = Device::new(mac());
        device.apply_block(&ResponseBlock {
            option: 2,
            sub_option: 2,
            status: 0,
            payload: Bytes::from_static(b"cp1604-11\x00"),
        });
        device.apply_block(&ResponseBlock {
            option: 1,
            sub_option: 2,
            status: 1,
            payload: Bytes::from_static(&[10, 0, 0, 20, 255, 255, 240, 0, 10, 0, 0, 1]),
        });
        device.apply_block(&ResponseBlock {
            option: 2,
            sub_option: 1,
            status: 0,
            payload: Bytes::from_static(b"CP16"),
        });
        // unknown block leaves everything alone
        device.apply_block(&ResponseBlock {
            option: 5,
            sub_option: 4,
            status: 0x0203,
            payload: Bytes::from_static(&[0]),
        });

        assert_eq!(device.name_of_station, "cp1604-11");
        assert_eq!(device.ip, Some(Ipv4Addr::new(10, 0, 0, 20)));
        assert_eq!(device.netmask, Some(Ipv4Addr::new(255, 255, 240, 0)));
        assert_eq!(device.gateway, Some(Ipv4Addr::new(10, 0, 0, 1)));
        assert_eq!(device.family, "CP16");
    }

    #[test]
    fn short_ip_block_is_ignored() {
        let mut device = Device::new(mac());
        device.apply_block(&ResponseBlock {
            option: 1,
            sub_option: 2,
            status: 1,
            payload: Bytes::from_static(&[10, 0, 0]),
        });
        assert_eq!(device.ip, None);
    }

    #[test]
    fn response_codes() {
        assert!(ResponseCode(0).is_success());
        assert!(!ResponseCode(4).is_success());
        assert_eq!(ResponseCode(4).message(), "resource error");
        assert_eq!(ResponseCode(9).message(), "unknown response code");
        assert_eq!(ResponseCode(6).to_string(), "code 06: in operation, set not possible");
    }
}
