//! Administrative link control.
//!
//! The only network-interface operation the controller performs is
//! bringing the AP interface administratively up before the daemon
//! starts. IP configuration is somebody else's job.

use std::io;

use tracing::debug;

/// Brings network interfaces administratively up.
pub trait LinkControl {
    fn bring_up(&self, ifname: &str) -> io::Result<()>;
}

/// Production implementation using `SIOCGIFFLAGS` / `SIOCSIFFLAGS` on a
/// throwaway datagram socket.
#[derive(Debug, Clone, Copy, Default)]
pub struct IoctlLinkControl;

/// Closes the control socket when dropped.
struct ControlSocket(libc::c_int);

impl ControlSocket {
    fn open() -> io::Result<Self> {
        // SAFETY: plain socket(2) call, result checked below.
        let fd = unsafe { libc::socket(libc::AF_INET, libc::SOCK_DGRAM, 0) };
        if fd < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(Self(fd))
    }
}

impl Drop for ControlSocket {
    fn drop(&mut self) {
        // SAFETY: fd was returned by socket(2) and is owned by us.
        unsafe {
            libc::close(self.0);
        }
    }
}

impl LinkControl for IoctlLinkControl {
    fn bring_up(&self, ifname: &str) -> io::Result<()> {
        let name_bytes = ifname.as_bytes();
        if name_bytes.is_empty() || name_bytes.len() >= libc::IFNAMSIZ {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid interface name: {ifname:?}"),
            ));
        }

        let sock = ControlSocket::open()?;

        // SAFETY: ifreq is plain-old-data; zeroed is a valid value.
        let mut ifr: libc::ifreq = unsafe { std::mem::zeroed() };
        for (dst, src) in ifr.ifr_name.iter_mut().zip(name_bytes.iter()) {
            *dst = *src as libc::c_char;
        }

        // SAFETY: ifr is properly initialized and outlives both ioctls.
        unsafe {
            if libc::ioctl(sock.0, libc::SIOCGIFFLAGS, &mut ifr) < 0 {
                return Err(io::Error::last_os_error());
            }
            ifr.ifr_ifru.ifru_flags |= libc::IFF_UP as libc::c_short;
            if libc::ioctl(sock.0, libc::SIOCSIFFLAGS, &ifr) < 0 {
                return Err(io::Error::last_os_error());
            }
        }

        debug!(ifname, "interface administratively up");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bring_up_rejects_empty_name() {
        let link = IoctlLinkControl;
        let err = link.bring_up("").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[test]
    fn test_bring_up_rejects_oversized_name() {
        let link = IoctlLinkControl;
        let err = link.bring_up("averylonginterfacename0").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }
}
