//! Windows backend: a live capture through the Npcap/WinPcap runtime.
//!
//! The capture library buffers aggressively.  If the buffer is full of
//! unrelated traffic when we transmit, the paired response can be dropped
//! before we ever see it.  So every send is preceded by draining whatever
//! the capture has queued, bounded by a drain deadline.  Immediate mode
//! keeps single packets from being held back for batching, and the
//! device-level copy threshold is set to zero so the driver surfaces
//! each packet without waiting to fill its buffer first.

use crate::error::{Error, Result};
use crate::l2::{L2Transport, LinkFilter};
use pcap::{Active, Capture, Device};
use std::io;
use std::net::IpAddr;
use std::str::FromStr;
use std::time::{Duration, Instant};
use tracing::*;

/// Read timeout handed to the capture; the engine polls in units of this.
const READ_TIMEOUT_MS: i32 = 100;

/// Upper bound on the pre-send drain.
const DRAIN_DEADLINE: Duration = Duration::from_millis(500);

pub struct PcapTransport {
    capture: Capture<Active>,
}

fn pcap_io(err: pcap::Error) -> Error {
    Error::Io(io::Error::new(io::ErrorKind::Other, err))
}

impl PcapTransport {
    /// Open a live capture on the device that carries `host_ip`.
    ///
    /// The device list comes from the capture runtime's own enumeration;
    /// a host address matching none of the listed devices is a
    /// configuration error, reported before anything is sent.
    pub fn open(host_ip: &str) -> Result<PcapTransport> {
        let wanted = IpAddr::from_str(host_ip)
            .map_err(|_| Error::NoInterface(host_ip.to_string()))?;
        let device = Device::list()
            .map_err(pcap_io)?
            .into_iter()
            .find(|device| device.addresses.iter().any(|addr| addr.addr == wanted))
            .ok_or_else(|| Error::NoInterface(host_ip.to_string()))?;
        debug!("opening capture on {} for {host_ip}", device.name);
        let capture = Capture::from_device(device)
            .map_err(pcap_io)?
            .promisc(true)
            .immediate_mode(true)
            .min_to_copy(0)
            .timeout(READ_TIMEOUT_MS)
            .open()
            .map_err(pcap_io)?;
        Ok(PcapTransport { capture })
    }

    fn next_packet(&mut self) -> Result<Option<Vec<u8>>> {
        match self.capture.next_packet() {
            Ok(packet) => Ok(Some(packet.data.to_vec())),
            Err(pcap::Error::TimeoutExpired) => Ok(None),
            Err(err) => Err(pcap_io(err)),
        }
    }

    /// Read the capture dry so the buffer has room for the response to the
    /// frame we are about to transmit.
    fn drain(&mut self) -> Result<()> {
        let deadline = Instant::now() + DRAIN_DEADLINE;
        let mut drained = 0usize;
        while Instant::now() < deadline {
            match self.next_packet()? {
                Some(_) => drained += 1,
                None => break,
            }
        }
        if drained > 0 {
            trace!("drained {drained} buffered packets before send");
        }
        Ok(())
    }
}

impl L2Transport for PcapTransport {
    fn send(&mut self, frame: &[u8]) -> Result<()> {
        self.drain()?;
        self.capture.sendpacket(frame).map_err(pcap_io)
    }

    fn recv(&mut self) -> Result<Option<Vec<u8>>> {
        self.next_packet()
    }

    fn set_filter(&mut self, filter: &LinkFilter) -> Result<()> {
        self.capture
            .filter(&filter.to_string(), true)
            .map_err(pcap_io)
    }

    fn close(&mut self) -> Result<()> {
        // dropping the capture handle releases it; nothing to flush
        Ok(())
    }
}
