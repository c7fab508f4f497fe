/*! Mapping a host IP address to the interface that carries it.

The engine is configured with nothing but a host IP.  Everything else,
namely the source MAC written into outgoing frames and the interface the
raw socket binds to, is derived here by scanning the system's interfaces.
*/

use crate::addr::MacAddress;
use crate::error::{Error, Result};

/// The interface a host address resolved to.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Interface {
    pub name: String,
    pub mac: MacAddress,
}

/// Find the interface whose address list contains `host_ip`.
///
/// Addresses must match exactly; an IPv6 scope identifier is carried
/// beside the address by the OS and takes no part in the comparison.
/// An interface without a link-layer address cannot source Ethernet
/// frames and is skipped.
#[cfg(unix)]
pub fn lookup(host_ip: &str) -> Result<Interface> {
    use std::collections::HashMap;
    use std::net::IpAddr;
    use std::str::FromStr;

    let wanted =
        IpAddr::from_str(host_ip).map_err(|_| Error::NoInterface(host_ip.to_string()))?;
    let addrs = nix::ifaddrs::getifaddrs().map_err(|e| Error::Io(e.into()))?;

    let mut macs: HashMap<String, MacAddress> = HashMap::new();
    let mut matched: Option<String> = None;
    for entry in addrs {
        let Some(address) = entry.address else { continue };
        if let Some(link) = address.as_link_addr() {
            if let Some(octets) = link.addr() {
                macs.insert(entry.interface_name.clone(), MacAddress(octets));
            }
        }
        let found = match (address.as_sockaddr_in(), address.as_sockaddr_in6()) {
            (Some(v4), _) => IpAddr::V4(v4.ip()) == wanted,
            (_, Some(v6)) => IpAddr::V6(v6.ip()) == wanted,
            _ => false,
        };
        if found {
            matched.get_or_insert_with(|| entry.interface_name.clone());
        }
    }

    let name = matched.ok_or_else(|| Error::NoInterface(host_ip.to_string()))?;
    let mac = macs
        .get(&name)
        .copied()
        .ok_or_else(|| Error::NoInterface(host_ip.to_string()))?;
    Ok(Interface { name, mac })
}

#[cfg(windows)]
pub fn lookup(host_ip: &str) -> Result<Interface> {
    use std::net::IpAddr;
    use std::str::FromStr;

    let wanted =
        IpAddr::from_str(host_ip).map_err(|_| Error::NoInterface(host_ip.to_string()))?;
    for iface in pnet_datalink::interfaces() {
        if !iface.ips.iter().any(|network| network.ip() == wanted) {
            continue;
        }
        let Some(mac) = iface.mac else { continue };
        return Ok(Interface {
            name: iface.name,
            mac: MacAddress(mac.octets()),
        });
    }
    Err(Error::NoInterface(host_ip.to_string()))
}
