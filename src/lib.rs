/*!

A client for the PROFINET Discovery and basic Configuration Protocol
(DCP).

DCP is a link-layer protocol carried directly in Ethernet II frames with
EtherType `0x8892`.  On an industrial Ethernet segment it is the way a
commissioning host finds PROFINET devices and gives them their initial
identity: scan the segment, read and write station names and IP
configurations, flash a device's LEDs to locate it physically, and reset
devices to factory state.  There is no IP involved: requests are unicast
or multicast raw Ethernet frames, and responses are correlated by a 32-bit
transaction identifier.

The [`Dcp`] engine owns a raw L2 socket on one network interface (a packet
capture handle on Windows, an `AF_PACKET` socket on Linux) and offers one
method per DCP operation:

```no_run
use profidcp::{Dcp, IpConfig};

let mut dcp = Dcp::open("10.0.2.124")?;

// Who is out there?
for device in dcp.identify_all(None)? {
    println!("{device}");
}

// Give one of them an address.
let mac = "00:0c:29:66:47:a5".parse()?;
let config = IpConfig::from_parts("10.0.0.31", "255.255.240.0", "10.0.0.1")?;
let outcome = dcp.set_ip(mac, &config, true)?;
if !outcome.is_success() {
    eprintln!("device refused: {outcome}");
}
# Ok::<(), profidcp::Error>(())
```

Discovery is inherently multi-response: `identify_all` multicasts one
request and then collects answers for the whole receive window, since
there is no way to know how many devices will speak up.  Unicast
operations return as soon as the matching response arrives, or fail with
[`Error::Timeout`] when the window closes empty.

The wire-format modules ([`frame`], [`pdu`], [`block`]) are public for
the curious, but the engine API above is the supported surface.

*/

mod addr;
pub mod block;
mod dcp;
mod device;
mod error;
pub mod frame;
pub mod iface;
pub mod l2;
pub mod pdu;

pub use addr::{IpConfig, MacAddress};
pub use block::ResetMode;
pub use dcp::Dcp;
pub use device::{Device, ResponseCode};
pub use error::{Error, Result};
pub use frame::ETHER_TYPE_DCP;
pub use l2::{L2Transport, LinkFilter};
pub use pdu::PROFINET_MULTICAST_MAC;
