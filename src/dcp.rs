/*! The DCP transaction engine and the client operations built on it. */

use crate::addr::{IpConfig, MacAddress};
use crate::block::{
    options, RequestBlock, ResetMode, ResponseBlock, OPTION_CONTROL, QUALIFIER_RESERVED,
    QUALIFIER_STORE_PERMANENT, QUALIFIER_STORE_TEMPORARY, SIGNAL_FLASH_ONCE,
};
use crate::device::{Device, ResponseCode};
use crate::error::{Error, Result};
use crate::frame::{EthernetFrame, ETHER_TYPE_DCP};
use crate::iface;
use crate::l2::{self, L2Transport, LinkFilter};
use crate::pdu::{
    DcpPdu, ServiceId, FRAME_ID_GET_SET, FRAME_ID_IDENTIFY_REQUEST, PROFINET_MULTICAST_MAC,
    RESPONSE_DELAY_IDENTIFY, SERVICE_TYPE_RESPONSE, SERVICE_TYPE_REQUEST,
};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::net::Ipv4Addr;
use std::thread;
use std::time::{Duration, Instant};
use tracing::*;

/// How long a receive loop runs when the caller gives no timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(7);

/// Pause between transmitting a set/reset request and listening for the
/// answer, giving the device time to commit the change.
const SETTLE_TIME: Duration = Duration::from_secs(2);

/// A DCP client bound to one network interface.
///
/// One engine owns one L2 transport and one transaction-ID counter.  Calls
/// block until they complete or their deadline passes; the engine is not
/// reentrant, so sharing it across threads needs external synchronisation.
///
/// ```no_run
/// use profidcp::Dcp;
///
/// let mut dcp = Dcp::open("10.0.2.124")?;
/// for device in dcp.identify_all(None)? {
///     println!("{device}");
/// }
/// # Ok::<(), profidcp::Error>(())
/// ```
pub struct Dcp {
    transport: Box<dyn L2Transport>,
    source_mac: MacAddress,
    xid: u32,
    default_timeout: Duration,
    settle_time: Duration,
}

impl Dcp {
    /// Open an engine on the interface that carries `host_ip`.
    ///
    /// Resolves the interface and its MAC address, opens the platform L2
    /// backend, and installs the packet filter that keeps unrelated
    /// traffic away from the receive loop.
    pub fn open(host_ip: &str) -> Result<Dcp> {
        let interface = iface::lookup(host_ip)?;
        let mut transport = l2::open(host_ip, &interface.name)?;
        transport.set_filter(&LinkFilter {
            mac: interface.mac,
            ether_type: ETHER_TYPE_DCP,
        })?;
        debug!(
            "engine on {} ({}) for host {host_ip}",
            interface.name, interface.mac
        );
        Ok(Dcp::with_transport(transport, interface.mac))
    }

    /// Build an engine on an already-open transport.
    ///
    /// This is the seam for custom backends and for tests; `open` is the
    /// usual entry point.  The transaction ID starts at a random value so
    /// two engines on the same segment are unlikely to collide.
    pub fn with_transport(transport: Box<dyn L2Transport>, source_mac: MacAddress) -> Dcp {
        Dcp {
            transport,
            source_mac,
            xid: rand::random(),
            default_timeout: DEFAULT_TIMEOUT,
            settle_time: SETTLE_TIME,
        }
    }

    pub fn source_mac(&self) -> MacAddress {
        self.source_mac
    }

    /// Replace the 7 s default receive window.
    pub fn set_default_timeout(&mut self, timeout: Duration) {
        self.default_timeout = timeout;
    }

    /// Replace the 2 s pause between a set/reset send and its receive
    /// loop.
    pub fn set_settle_time(&mut self, settle_time: Duration) {
        self.settle_time = settle_time;
    }

    /// Release the transport.  Dropping the engine does the same.
    pub fn close(mut self) -> Result<()> {
        self.transport.close()
    }

    /// Discover every device on the segment.
    ///
    /// The request goes to the identify multicast address and responses
    /// are collected for the whole window, since it is unknown how many
    /// devices will answer, so there is no early return and an empty list
    /// is a legitimate result.
    pub fn identify_all(&mut self, timeout: Option<Duration>) -> Result<Vec<Device>> {
        self.send_request(
            PROFINET_MULTICAST_MAC,
            FRAME_ID_IDENTIFY_REQUEST,
            ServiceId::Identify,
            options::ALL_SELECTOR,
            None,
        )?;
        self.collect_devices(timeout, false)
    }

    /// Identify the single device with the given MAC address.
    pub fn identify(&mut self, mac: MacAddress) -> Result<Device> {
        self.send_request(
            mac,
            FRAME_ID_IDENTIFY_REQUEST,
            ServiceId::Identify,
            options::ALL_SELECTOR,
            None,
        )?;
        let devices = self.collect_devices(None, true)?;
        devices.into_iter().next().ok_or(Error::Timeout)
    }

    /// Read the device's IP address.
    pub fn get_ip(&mut self, mac: MacAddress) -> Result<Ipv4Addr> {
        self.send_request(
            mac,
            FRAME_ID_GET_SET,
            ServiceId::Get,
            options::IP_ADDRESS,
            None,
        )?;
        let devices = self.collect_devices(None, true)?;
        devices
            .into_iter()
            .next()
            .and_then(|device| device.ip)
            .ok_or(Error::Timeout)
    }

    /// Read the device's name of station.
    pub fn get_name(&mut self, mac: MacAddress) -> Result<String> {
        self.send_request(
            mac,
            FRAME_ID_GET_SET,
            ServiceId::Get,
            options::NAME_OF_STATION,
            None,
        )?;
        let devices = self.collect_devices(None, true)?;
        devices
            .into_iter()
            .next()
            .map(|device| device.name_of_station)
            .ok_or(Error::Timeout)
    }

    /// Write the device's IP configuration.
    ///
    /// With `permanent` the device stores the configuration across power
    /// cycles; otherwise it is discarded on the next restart.
    pub fn set_ip(
        &mut self,
        mac: MacAddress,
        ip: &IpConfig,
        permanent: bool,
    ) -> Result<ResponseCode> {
        let mut value = BytesMut::with_capacity(14);
        value.put_u16(store_qualifier(permanent));
        ip.encode(&mut value);
        self.send_request(
            mac,
            FRAME_ID_GET_SET,
            ServiceId::Set,
            options::IP_ADDRESS,
            Some(value.freeze()),
        )?;
        thread::sleep(self.settle_time);
        self.read_control(None)
    }

    /// Write the device's name of station.
    ///
    /// The name must start with a lower-case letter and may continue with
    /// letters, digits, `-` and `.` (it is lower-cased before
    /// transmission).  Anything else fails validation and nothing is
    /// sent.
    pub fn set_name(
        &mut self,
        mac: MacAddress,
        name: &str,
        permanent: bool,
    ) -> Result<ResponseCode> {
        validate_station_name(name)?;
        let name = name.to_ascii_lowercase();
        let mut value = BytesMut::with_capacity(2 + name.len());
        value.put_u16(store_qualifier(permanent));
        value.put_slice(name.as_bytes());
        self.send_request(
            mac,
            FRAME_ID_GET_SET,
            ServiceId::Set,
            options::NAME_OF_STATION,
            Some(value.freeze()),
        )?;
        thread::sleep(self.settle_time);
        self.read_control(None)
    }

    /// Make the device flash its LEDs once, to find it on the shop floor.
    pub fn blink(&mut self, mac: MacAddress) -> Result<ResponseCode> {
        let mut value = BytesMut::with_capacity(4);
        value.put_u16(QUALIFIER_RESERVED);
        value.put_u16(SIGNAL_FLASH_ONCE);
        self.send_request(
            mac,
            FRAME_ID_GET_SET,
            ServiceId::Set,
            options::BLINK_LED,
            Some(value.freeze()),
        )?;
        self.read_control(None)
    }

    /// Reset part of the device's configuration to factory state; `mode`
    /// selects which part (default: the communication parameters).
    pub fn reset_to_factory(&mut self, mac: MacAddress, mode: ResetMode) -> Result<ResponseCode> {
        let mut value = BytesMut::with_capacity(2);
        value.put_u16(mode.qualifier());
        self.send_request(
            mac,
            FRAME_ID_GET_SET,
            ServiceId::Set,
            options::RESET_TO_FACTORY,
            Some(value.freeze()),
        )?;
        thread::sleep(self.settle_time);
        self.read_control(None)
    }

    /// Reset the whole device to factory state.
    pub fn factory_reset(&mut self, mac: MacAddress) -> Result<ResponseCode> {
        let mut value = BytesMut::with_capacity(2);
        value.put_u16(QUALIFIER_RESERVED);
        self.send_request(
            mac,
            FRAME_ID_GET_SET,
            ServiceId::Set,
            options::FACTORY_RESET,
            Some(value.freeze()),
        )?;
        thread::sleep(self.settle_time);
        self.read_control(None)
    }

    fn send_request(
        &mut self,
        destination: MacAddress,
        frame_id: u16,
        service: ServiceId,
        option: (u8, u8),
        value: Option<Bytes>,
    ) -> Result<()> {
        self.xid = self.xid.wrapping_add(1);

        // A get request carries a bare two-octet body; everything else a
        // full block with alignment padding.
        let payload = match service {
            ServiceId::Get => Bytes::copy_from_slice(&[option.0, option.1]),
            _ => {
                let block = RequestBlock::new(option, value.unwrap_or_default());
                let mut buf = BytesMut::with_capacity(block.encoded_len());
                block.encode(&mut buf);
                buf.freeze()
            }
        };
        let response_delay = match service {
            ServiceId::Identify => RESPONSE_DELAY_IDENTIFY,
            _ => 0,
        };
        let pdu = DcpPdu {
            frame_id,
            service_id: service as u8,
            service_type: SERVICE_TYPE_REQUEST,
            xid: self.xid,
            response_delay,
            payload,
        };
        let frame = EthernetFrame::new(destination, self.source_mac, ETHER_TYPE_DCP, pdu.encode());
        debug!(
            "request {:?} ({}, {}) to {destination}, xid {:#010x}",
            service, option.0, option.1, self.xid
        );
        self.transport.send(&frame.encode())
    }

    /// Receive loop for identify/get responses.  Runs to the deadline
    /// collecting one `Device` per valid response, or returns at the first
    /// one when `first_only` is set.
    fn collect_devices(
        &mut self,
        timeout: Option<Duration>,
        first_only: bool,
    ) -> Result<Vec<Device>> {
        let deadline = Instant::now() + timeout.unwrap_or(self.default_timeout);
        let mut found = Vec::new();
        while Instant::now() < deadline {
            let Some(data) = self.transport.recv()? else {
                continue;
            };
            let Some((pdu, source)) = self.match_response(data) else {
                continue;
            };
            let device = decode_device(&pdu, source);
            debug!("response from {device}");
            found.push(device);
            if first_only {
                break;
            }
        }
        Ok(found)
    }

    /// Receive loop for set/reset responses.  A set request produces
    /// exactly one response, so the first control block ends the loop.
    fn read_control(&mut self, timeout: Option<Duration>) -> Result<ResponseCode> {
        let deadline = Instant::now() + timeout.unwrap_or(self.default_timeout);
        while Instant::now() < deadline {
            let Some(data) = self.transport.recv()? else {
                continue;
            };
            let Some((pdu, _)) = self.match_response(data) else {
                continue;
            };
            let mut blocks = pdu.payload.clone();
            match ResponseBlock::parse(&mut blocks) {
                Ok(block) if block.option == OPTION_CONTROL && !block.payload.is_empty() => {
                    let code = ResponseCode(block.payload[0]);
                    debug!("device answered: {code}");
                    return Ok(code);
                }
                Ok(block) => trace!(
                    "ignoring non-control block ({}, {}) in set response",
                    block.option,
                    block.sub_option
                ),
                Err(_) => trace!("ignoring malformed control response"),
            }
        }
        Err(Error::Timeout)
    }

    /// Apply the correlation predicate.  A frame survives iff it is
    /// addressed to us, carries the DCP EtherType, is a response, and
    /// belongs to the current transaction.  Everything else, including
    /// structurally broken frames, is dropped without touching the
    /// deadline.
    fn match_response(&self, data: Vec<u8>) -> Option<(DcpPdu, MacAddress)> {
        let frame = match EthernetFrame::parse(Bytes::from(data)) {
            Ok(frame) => frame,
            Err(_) => {
                trace!("dropping truncated frame");
                return None;
            }
        };
        if frame.destination != self.source_mac || frame.ether_type != ETHER_TYPE_DCP {
            trace!("dropping frame for {}", frame.destination);
            return None;
        }
        let pdu = match DcpPdu::parse(frame.payload.clone()) {
            Ok(pdu) => pdu,
            Err(_) => {
                trace!("dropping frame with truncated DCP payload");
                return None;
            }
        };
        if pdu.service_type != SERVICE_TYPE_RESPONSE {
            return None;
        }
        if pdu.xid != self.xid {
            debug!(
                "ignoring response with stale xid {:#010x} (current {:#010x})",
                pdu.xid, self.xid
            );
            return None;
        }
        Some((pdu, frame.source))
    }
}

fn decode_device(pdu: &DcpPdu, source: MacAddress) -> Device {
    let mut device = Device::new(source);
    let mut blocks = pdu.payload.clone();
    while blocks.remaining() > 6 {
        match ResponseBlock::parse(&mut blocks) {
            Ok(block) => device.apply_block(&block),
            Err(_) => {
                trace!("stopping device decode on malformed block");
                break;
            }
        }
    }
    device
}

fn store_qualifier(permanent: bool) -> u16 {
    if permanent {
        QUALIFIER_STORE_PERMANENT
    } else {
        QUALIFIER_STORE_TEMPORARY
    }
}

fn validate_station_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let first_ok = chars.next().is_some_and(|c| c.is_ascii_lowercase());
    let rest_ok = chars.all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.');
    if first_ok && rest_ok {
        Ok(())
    } else {
        Err(Error::InvalidStationName(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn station_name_grammar() {
        for ok in ["a", "plc-7", "conveyor.station.4", "name-0"] {
            assert!(validate_station_name(ok).is_ok(), "rejected {ok:?}");
        }
        for bad in ["", "name xx", "na&/$%&me", "1name", "name*:><", ".name", "Xyz"] {
            assert!(validate_station_name(bad).is_err(), "accepted {bad:?}");
        }
    }
}
