use std::io;
use std::result;
use thiserror::Error;

pub type Result<T> = result::Result<T, Error>;

/// The errors surfaced by this crate.
///
/// Structurally invalid frames arriving on the wire are *not* errors: the
/// engine discards them silently and keeps listening.  A device answering a
/// set/reset request with a non-success code is not an error either; that
/// outcome is reported as a [`ResponseCode`](crate::ResponseCode) value.
#[derive(Debug, Error)]
pub enum Error {
    /// No network interface carries the given host address.  Raised before
    /// any frame is transmitted.
    #[error("no network interface with address {0}")]
    NoInterface(String),
    /// The MAC address string is not six `:`- or `-`-separated hex octets.
    #[error("invalid MAC address {0:?}")]
    InvalidMacAddress(String),
    /// The string is not a dotted-quad IPv4 address.
    #[error("invalid IP address {0:?}")]
    InvalidIpAddress(String),
    /// The station name violates the DNS-label subset PROFINET mandates.
    /// Nothing is transmitted for such a name.
    #[error("invalid station name {0:?}")]
    InvalidStationName(String),
    /// The deadline elapsed without a usable response to a unicast request.
    #[error("timed out waiting for a DCP response")]
    Timeout,
    /// The underlying socket or capture handle failed.
    #[error("transport error: {0}")]
    Io(#[from] io::Error),
}
