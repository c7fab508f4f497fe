//! Linux backend: an `AF_PACKET`/`SOCK_RAW` socket bound to one interface.
//!
//! The socket is opened for the DCP EtherType only, so the kernel already
//! refuses everything else; `set_filter` additionally attaches a classic
//! BPF program matching destination MAC and EtherType, which drops foreign
//! traffic before it is queued.  No user-space drain is needed on this
//! backend.

use crate::error::{Error, Result};
use crate::frame::ETHER_TYPE_DCP;
use crate::l2::{L2Transport, LinkFilter};
use std::ffi::CString;
use std::io;
use std::os::unix::io::RawFd;
use std::time::Duration;
use tracing::*;

/// Largest frame the receive path accepts.
const RECV_BUFFER_LEN: usize = 65535;

/// Default receive timeout; the engine polls in units of this.
const DEFAULT_RECV_TIMEOUT: Duration = Duration::from_secs(1);

pub struct RawTransport {
    fd: RawFd,
}

macro_rules! check_os {
    ($ret:expr) => {
        if $ret < 0 {
            return Err(Error::Io(io::Error::last_os_error()));
        }
    };
}

impl RawTransport {
    /// Open on the named interface with the default 1 s receive timeout.
    pub fn open(interface: &str) -> Result<RawTransport> {
        Self::with_timeout(interface, DEFAULT_RECV_TIMEOUT)
    }

    pub fn with_timeout(interface: &str, recv_timeout: Duration) -> Result<RawTransport> {
        let protocol = (ETHER_TYPE_DCP).to_be() as libc::c_int;
        let fd = unsafe { libc::socket(libc::AF_PACKET, libc::SOCK_RAW, protocol) };
        check_os!(fd);
        let transport = RawTransport { fd };

        let ifindex = transport.interface_index(interface)?;
        let mut addr: libc::sockaddr_ll = unsafe { std::mem::zeroed() };
        addr.sll_family = libc::AF_PACKET as libc::c_ushort;
        addr.sll_protocol = protocol as libc::c_ushort;
        addr.sll_ifindex = ifindex;
        let ret = unsafe {
            libc::bind(
                transport.fd,
                &addr as *const libc::sockaddr_ll as *const libc::sockaddr,
                std::mem::size_of::<libc::sockaddr_ll>() as libc::socklen_t,
            )
        };
        check_os!(ret);

        let timeout = libc::timeval {
            tv_sec: recv_timeout.as_secs() as libc::time_t,
            tv_usec: recv_timeout.subsec_micros() as libc::suseconds_t,
        };
        let ret = unsafe {
            libc::setsockopt(
                transport.fd,
                libc::SOL_SOCKET,
                libc::SO_RCVTIMEO,
                &timeout as *const libc::timeval as *const libc::c_void,
                std::mem::size_of::<libc::timeval>() as libc::socklen_t,
            )
        };
        check_os!(ret);

        debug!("opened raw packet socket on {interface} (ifindex {ifindex})");
        Ok(transport)
    }

    fn interface_index(&self, interface: &str) -> Result<libc::c_int> {
        let name = CString::new(interface)
            .map_err(|_| Error::NoInterface(interface.to_string()))?;
        let index = unsafe { libc::if_nametoindex(name.as_ptr()) };
        if index == 0 {
            return Err(Error::NoInterface(interface.to_string()));
        }
        Ok(index as libc::c_int)
    }
}

impl L2Transport for RawTransport {
    fn send(&mut self, frame: &[u8]) -> Result<()> {
        let ret = unsafe {
            libc::send(
                self.fd,
                frame.as_ptr() as *const libc::c_void,
                frame.len(),
                0,
            )
        };
        check_os!(ret);
        if ret as usize != frame.len() {
            return Err(Error::Io(io::Error::new(
                io::ErrorKind::WriteZero,
                "short write on packet socket",
            )));
        }
        Ok(())
    }

    fn recv(&mut self) -> Result<Option<Vec<u8>>> {
        let mut buf = vec![0u8; RECV_BUFFER_LEN];
        let ret = unsafe {
            libc::recv(self.fd, buf.as_mut_ptr() as *mut libc::c_void, buf.len(), 0)
        };
        if ret < 0 {
            let err = io::Error::last_os_error();
            return match err.raw_os_error() {
                Some(libc::EAGAIN) | Some(libc::EWOULDBLOCK) | Some(libc::EINTR) => Ok(None),
                _ => Err(Error::Io(err)),
            };
        }
        buf.truncate(ret as usize);
        Ok(Some(buf))
    }

    fn set_filter(&mut self, filter: &LinkFilter) -> Result<()> {
        let mut program = compile_filter(filter);
        let prog = libc::sock_fprog {
            len: program.len() as libc::c_ushort,
            filter: program.as_mut_ptr(),
        };
        let ret = unsafe {
            libc::setsockopt(
                self.fd,
                libc::SOL_SOCKET,
                libc::SO_ATTACH_FILTER,
                &prog as *const libc::sock_fprog as *const libc::c_void,
                std::mem::size_of::<libc::sock_fprog>() as libc::socklen_t,
            )
        };
        check_os!(ret);
        trace!("attached BPF program for {filter}");
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if self.fd >= 0 {
            let ret = unsafe { libc::close(self.fd) };
            self.fd = -1;
            check_os!(ret);
        }
        Ok(())
    }
}

impl Drop for RawTransport {
    fn drop(&mut self) {
        if self.fd >= 0 {
            unsafe { libc::close(self.fd) };
        }
    }
}

const BPF_LD_H_ABS: u16 = 0x28;
const BPF_LD_W_ABS: u16 = 0x20;
const BPF_JEQ_K: u16 = 0x15;
const BPF_RET_K: u16 = 0x06;

fn insn(code: u16, jt: u8, jf: u8, k: u32) -> libc::sock_filter {
    libc::sock_filter { code, jt, jf, k }
}

/// The classic-BPF rendering of "ether dst <mac> and ether proto <type>",
/// matching what tcpdump compiles for that expression.
fn compile_filter(filter: &LinkFilter) -> [libc::sock_filter; 8] {
    let mac = filter.mac.octets();
    let dst_hi = u32::from(u16::from_be_bytes([mac[0], mac[1]]));
    let dst_lo = u32::from_be_bytes([mac[2], mac[3], mac[4], mac[5]]);
    [
        insn(BPF_LD_H_ABS, 0, 0, 12),                      // EtherType
        insn(BPF_JEQ_K, 0, 5, u32::from(filter.ether_type)),
        insn(BPF_LD_W_ABS, 0, 0, 2),                       // dst MAC, last 4 octets
        insn(BPF_JEQ_K, 0, 3, dst_lo),
        insn(BPF_LD_H_ABS, 0, 0, 0),                       // dst MAC, first 2 octets
        insn(BPF_JEQ_K, 0, 1, dst_hi),
        insn(BPF_RET_K, 0, 0, RECV_BUFFER_LEN as u32),     // accept
        insn(BPF_RET_K, 0, 0, 0),                          // drop
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_program_matches_the_address() {
        let filter = LinkFilter {
            mac: "00:0c:29:66:47:a5".parse().unwrap(),
            ether_type: ETHER_TYPE_DCP,
        };
        let program = compile_filter(&filter);
        assert_eq!(program[1].k, 0x8892);
        assert_eq!(program[3].k, 0x2966_47a5);
        assert_eq!(program[5].k, 0x000c);
        // every failure path lands on the drop instruction
        assert_eq!(program[1].jf as usize + 2, 7);
        assert_eq!(program[3].jf as usize + 4, 7);
        assert_eq!(program[5].jf as usize + 6, 7);
        assert_eq!(program[7].k, 0);
    }
}
