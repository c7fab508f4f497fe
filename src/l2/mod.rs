/*! The raw L2 socket the engine talks through.

Two backends exist: a packet-capture adapter on Windows and a kernel raw
packet socket on Linux.  Both hand frames across unmodified (a transport
never interprets payload bytes), and both push the coarse filtering
(our MAC, the DCP EtherType) down into the capture driver or kernel so
unrelated traffic dies before it reaches us.
*/

use crate::addr::MacAddress;
use crate::error::Result;
use std::fmt;

#[cfg(windows)]
mod npcap;
#[cfg(target_os = "linux")]
mod raw;

#[cfg(windows)]
pub use npcap::PcapTransport;
#[cfg(target_os = "linux")]
pub use raw::RawTransport;

/// The packet filter a transport installs: keep frames addressed to `mac`
/// with EtherType `ether_type`, drop the rest.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct LinkFilter {
    pub mac: MacAddress,
    pub ether_type: u16,
}

impl fmt::Display for LinkFilter {
    /// The pcap filter expression form.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ether host {} and ether proto 0x{:04x}",
            self.mac, self.ether_type
        )
    }
}

/// A raw L2 socket: send a frame, receive the next frame, install a
/// filter, close.
pub trait L2Transport {
    fn send(&mut self, frame: &[u8]) -> Result<()>;

    /// The next frame, or `None` if none arrived within the transport's
    /// receive timeout.  The timeout is what keeps the engine's receive
    /// loop from spinning.
    fn recv(&mut self) -> Result<Option<Vec<u8>>>;

    fn set_filter(&mut self, filter: &LinkFilter) -> Result<()>;

    fn close(&mut self) -> Result<()>;
}

/// Open the platform backend for the given host address and interface.
#[allow(unused_variables)]
pub(crate) fn open(host_ip: &str, interface: &str) -> Result<Box<dyn L2Transport>> {
    #[cfg(windows)]
    {
        Ok(Box::new(PcapTransport::open(host_ip)?))
    }
    #[cfg(target_os = "linux")]
    {
        Ok(Box::new(RawTransport::open(interface)?))
    }
    #[cfg(not(any(windows, target_os = "linux")))]
    {
        Err(crate::error::Error::Io(std::io::Error::new(
            std::io::ErrorKind::Unsupported,
            "no L2 transport backend for this platform",
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_expression() {
        let filter = LinkFilter {
            mac: "00:50:56:AC:DD:2E".parse().unwrap(),
            ether_type: 0x8892,
        };
        assert_eq!(
            filter.to_string(),
            "ether host 00:50:56:ac:dd:2e and ether proto 0x8892"
        );
    }
}
