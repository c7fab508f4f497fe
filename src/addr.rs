/*! Link- and IP-layer address value types. */

use crate::error::{Error, Result};
use bytes::BufMut;
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

/// A 48-bit IEEE 802 MAC address.
///
/// Parses from the usual `hh:hh:hh:hh:hh:hh` notation (`-` separators and
/// upper-case digits are accepted too) and displays as lower-case
/// colon-separated hex.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct MacAddress(pub [u8; 6]);

impl MacAddress {
    pub fn octets(&self) -> [u8; 6] {
        self.0
    }

    pub(crate) fn from_slice(bytes: &[u8]) -> MacAddress {
        let mut octets = [0; 6];
        octets.copy_from_slice(&bytes[..6]);
        MacAddress(octets)
    }
}

impl From<[u8; 6]> for MacAddress {
    fn from(octets: [u8; 6]) -> Self {
        MacAddress(octets)
    }
}

impl FromStr for MacAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<MacAddress> {
        let mut octets = [0; 6];
        let mut parts = s.split([':', '-']);
        for octet in octets.iter_mut() {
            let part = parts
                .next()
                .filter(|p| p.len() == 2)
                .ok_or_else(|| Error::InvalidMacAddress(s.to_string()))?;
            *octet = u8::from_str_radix(part, 16)
                .map_err(|_| Error::InvalidMacAddress(s.to_string()))?;
        }
        if parts.next().is_some() {
            return Err(Error::InvalidMacAddress(s.to_string()));
        }
        Ok(MacAddress(octets))
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}

impl fmt::Debug for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// An IP parameter set as carried by the IP-address block: address, subnet
/// mask and standard gateway, each four octets on the wire.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct IpConfig {
    pub address: Ipv4Addr,
    pub netmask: Ipv4Addr,
    pub gateway: Ipv4Addr,
}

impl IpConfig {
    pub fn new(address: Ipv4Addr, netmask: Ipv4Addr, gateway: Ipv4Addr) -> IpConfig {
        IpConfig {
            address,
            netmask,
            gateway,
        }
    }

    /// Build an [`IpConfig`] from dotted-quad strings, validating each octet.
    pub fn from_parts(address: &str, netmask: &str, gateway: &str) -> Result<IpConfig> {
        Ok(IpConfig {
            address: parse_dotted_quad(address)?,
            netmask: parse_dotted_quad(netmask)?,
            gateway: parse_dotted_quad(gateway)?,
        })
    }

    /// Append the 12-octet wire form: address, netmask, gateway.
    pub(crate) fn encode(&self, buf: &mut impl BufMut) {
        buf.put_slice(&self.address.octets());
        buf.put_slice(&self.netmask.octets());
        buf.put_slice(&self.gateway.octets());
    }
}

pub(crate) fn parse_dotted_quad(s: &str) -> Result<Ipv4Addr> {
    Ipv4Addr::from_str(s).map_err(|_| Error::InvalidIpAddress(s.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mac_roundtrip() {
        let mac: MacAddress = "00:0C:29:66:47:A5".parse().unwrap();
        assert_eq!(mac.octets(), [0x00, 0x0c, 0x29, 0x66, 0x47, 0xa5]);
        assert_eq!(mac.to_string(), "00:0c:29:66:47:a5");
        assert_eq!(mac.to_string().parse::<MacAddress>().unwrap(), mac);
    }

    #[test]
    fn mac_accepts_dash_separators() {
        let mac: MacAddress = "00-50-56-ac-dd-2e".parse().unwrap();
        assert_eq!(mac.to_string(), "00:50:56:ac:dd:2e");
    }

    #[test]
    fn mac_rejects_garbage() {
        for bad in ["", "00:0c:29:66:47", "00:0c:29:66:47:a5:ff", "0:c:2:6:4:a", "zz:0c:29:66:47:a5"] {
            assert!(bad.parse::<MacAddress>().is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn ip_config_roundtrip() {
        let cfg = IpConfig::from_parts("10.0.0.31", "255.255.240.0", "10.0.0.1").unwrap();
        let mut buf = Vec::new();
        cfg.encode(&mut buf);
        assert_eq!(
            buf,
            [0x0a, 0x00, 0x00, 0x1f, 0xff, 0xff, 0xf0, 0x00, 0x0a, 0x00, 0x00, 0x01]
        );
    }

    #[test]
    fn ip_config_rejects_invalid_octets() {
        for bad in ["260.0.270.31", "255..240.0", "10.0.1", "-10.0.0.1", "ten.0.0.1"] {
            assert!(
                IpConfig::from_parts(bad, "255.255.255.0", "0.0.0.0").is_err(),
                "accepted {bad:?}"
            );
        }
    }
}
