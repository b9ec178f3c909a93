//! AF_PACKET raw socket transport (Linux).
//!
//! GOOSE and SV are bare Ethernet protocols: no IP, no ports. Publishing
//! and sniffing them requires a packet socket bound to the interface,
//! which in turn requires CAP_NET_RAW. The receive timeout is set short
//! (100 ms default) so the sniffer thread re-checks its stop flag at a
//! bounded interval.

use crate::{FrameTransport, TransportError, TransportResult, TransportStats};
use std::io;
use std::os::unix::io::RawFd;
use std::time::Duration;
use tracing::{debug, info};

const ETH_P_ALL: u16 = 0x0003;
const DEFAULT_RECV_TIMEOUT: Duration = Duration::from_millis(100);

/// A packet socket bound to one interface.
pub struct RawSocket {
    fd: RawFd,
    interface: String,
    stats: TransportStats,
}

impl RawSocket {
    /// Open and bind a packet socket on `interface`.
    pub fn open(interface: &str) -> TransportResult<Self> {
        let ifindex = nix::net::if_::if_nametoindex(interface).map_err(|_| {
            TransportError::InterfaceNotFound {
                name: interface.to_string(),
            }
        })?;

        let fd = unsafe {
            libc::socket(
                libc::AF_PACKET,
                libc::SOCK_RAW,
                ETH_P_ALL.to_be() as libc::c_int,
            )
        };
        if fd < 0 {
            return Err(TransportError::Open {
                interface: interface.to_string(),
                source: io::Error::last_os_error(),
            });
        }

        let mut addr: libc::sockaddr_ll = unsafe { std::mem::zeroed() };
        addr.sll_family = libc::AF_PACKET as libc::sa_family_t;
        addr.sll_protocol = ETH_P_ALL.to_be();
        addr.sll_ifindex = ifindex as libc::c_int;

        let rc = unsafe {
            libc::bind(
                fd,
                &addr as *const libc::sockaddr_ll as *const libc::sockaddr,
                std::mem::size_of::<libc::sockaddr_ll>() as libc::socklen_t,
            )
        };
        if rc < 0 {
            let source = io::Error::last_os_error();
            unsafe { libc::close(fd) };
            return Err(TransportError::Open {
                interface: interface.to_string(),
                source,
            });
        }

        let socket = Self {
            fd,
            interface: interface.to_string(),
            stats: TransportStats::new(),
        };
        socket.set_recv_timeout(DEFAULT_RECV_TIMEOUT)?;

        info!(interface, ifindex, "opened AF_PACKET socket");
        Ok(socket)
    }

    pub fn stats(&self) -> &TransportStats {
        &self.stats
    }
}

impl FrameTransport for RawSocket {
    fn send(&self, frame: &[u8]) -> TransportResult<()> {
        let rc = unsafe {
            libc::send(
                self.fd,
                frame.as_ptr() as *const libc::c_void,
                frame.len(),
                0,
            )
        };
        if rc < 0 {
            self.stats.record_send_error();
            return Err(TransportError::Send {
                source: io::Error::last_os_error(),
            });
        }
        self.stats.record_send(frame.len());
        Ok(())
    }

    fn recv(&self, buf: &mut [u8]) -> TransportResult<Option<usize>> {
        let rc = unsafe {
            libc::recv(
                self.fd,
                buf.as_mut_ptr() as *mut libc::c_void,
                buf.len(),
                0,
            )
        };
        if rc < 0 {
            let err = io::Error::last_os_error();
            return match err.raw_os_error() {
                // Timeout or signal: not an error, just a stop-flag
                // re-check opportunity for the caller.
                Some(libc::EAGAIN) | Some(libc::EWOULDBLOCK) | Some(libc::EINTR) => Ok(None),
                _ => {
                    self.stats.record_recv_error();
                    Err(TransportError::Recv { source: err })
                }
            };
        }
        let n = rc as usize;
        self.stats.record_recv(n);
        Ok(Some(n))
    }

    fn set_recv_timeout(&self, timeout: Duration) -> TransportResult<()> {
        let tv = libc::timeval {
            tv_sec: timeout.as_secs() as libc::time_t,
            tv_usec: timeout.subsec_micros() as libc::suseconds_t,
        };
        let rc = unsafe {
            libc::setsockopt(
                self.fd,
                libc::SOL_SOCKET,
                libc::SO_RCVTIMEO,
                &tv as *const libc::timeval as *const libc::c_void,
                std::mem::size_of::<libc::timeval>() as libc::socklen_t,
            )
        };
        if rc < 0 {
            return Err(TransportError::Configure {
                what: "receive timeout",
                source: io::Error::last_os_error(),
            });
        }
        Ok(())
    }
}

impl Drop for RawSocket {
    fn drop(&mut self) {
        debug!(interface = %self.interface, "closing AF_PACKET socket");
        unsafe { libc::close(self.fd) };
    }
}
