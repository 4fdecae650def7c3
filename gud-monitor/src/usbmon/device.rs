//! Memory-mapped usbmon ring
//!
//! Opens `/dev/usbmonN`, sizes and maps its ring, then fetches one record at
//! a time with `MON_IOCX_MFETCH`.
//!
//! Records are flushed and the ring is polled with a timeout before each
//! fetch, so a cancellation that lands just before the wait is still seen
//! within [`POLL_INTERVAL_MS`].

use std::fs::File;
use std::io;
use std::os::fd::{AsRawFd, RawFd};
use std::path::PathBuf;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicBool, Ordering};

use log::{debug, trace, warn};

use super::header::{MonHeader, HEADER_SIZE};
use super::{EventSource, Fetch, Record};
use crate::error::{MonitorError, Result};

const MON_IOC_MAGIC: u32 = 0x92;

/// Upper bound on how long a cancellation can go unnoticed
pub const POLL_INTERVAL_MS: i32 = 100;

const IOC_NONE: u32 = 0;
const IOC_WRITE: u32 = 1;
const IOC_READ: u32 = 2;

const fn ioc(dir: u32, nr: u32, size: usize) -> u32 {
    (dir << 30) | ((size as u32) << 16) | (MON_IOC_MAGIC << 8) | nr
}

#[repr(C)]
struct BinStats {
    queued: u32,
    dropped: u32,
}

#[repr(C)]
struct Mfetch {
    offvec: *mut u32,
    nfetch: u32,
    nflush: u32,
}

pub const MON_IOCG_STATS: u32 = ioc(IOC_READ, 3, core::mem::size_of::<BinStats>());
pub const MON_IOCT_RING_SIZE: u32 = ioc(IOC_NONE, 4, 0);
pub const MON_IOCX_MFETCH: u32 = ioc(IOC_READ | IOC_WRITE, 7, core::mem::size_of::<Mfetch>());
pub const MON_IOCH_MFLUSH: u32 = ioc(IOC_NONE, 8, 0);

/// Wait up to `timeout_ms` for `fd` to become readable
fn wait_readable(fd: RawFd, timeout_ms: i32) -> io::Result<bool> {
    let mut pfd = libc::pollfd {
        fd,
        events: libc::POLLIN,
        revents: 0,
    };
    let rc = unsafe { libc::poll(&mut pfd, 1, timeout_ms) };
    if rc < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(rc > 0)
}

/// Kernel event counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RingStats {
    pub queued: u32,
    pub dropped: u32,
}

pub struct UsbmonDevice {
    file: File,
    ring: NonNull<u8>,
    size: usize,
    /// Records handed out by the last fetch, released on the next one
    nflush: u32,
    cancel: Option<&'static AtomicBool>,
}

impl UsbmonDevice {
    pub fn path(busnum: u16) -> PathBuf {
        PathBuf::from(format!("/dev/usbmon{}", busnum))
    }

    pub fn open(busnum: u16, ring_size: usize) -> Result<Self> {
        let path = Self::path(busnum);
        let file = File::open(&path).map_err(|source| MonitorError::Open {
            path: path.clone(),
            source,
        })?;
        let fd = file.as_raw_fd();

        let rc = unsafe { libc::ioctl(fd, MON_IOCT_RING_SIZE as _, ring_size as libc::c_int) };
        if rc < 0 {
            return Err(MonitorError::Ioctl {
                op: "MON_IOCT_RING_SIZE",
                source: io::Error::last_os_error(),
            });
        }

        let map = unsafe {
            libc::mmap(
                core::ptr::null_mut(),
                ring_size,
                libc::PROT_READ,
                libc::MAP_SHARED,
                fd,
                0,
            )
        };
        if map == libc::MAP_FAILED {
            return Err(MonitorError::Map(io::Error::last_os_error()));
        }
        let ring = NonNull::new(map.cast::<u8>())
            .ok_or_else(|| MonitorError::Map(io::Error::from(io::ErrorKind::AddrNotAvailable)))?;

        debug!("{}: mapped {} byte ring", path.display(), ring_size);
        Ok(Self {
            file,
            ring,
            size: ring_size,
            nflush: 0,
            cancel: None,
        })
    }

    /// Return `Fetch::Cancelled` once `flag` is set
    pub fn with_cancel(mut self, flag: &'static AtomicBool) -> Self {
        self.cancel = Some(flag);
        self
    }

    fn cancelled(&self) -> bool {
        self.cancel.is_some_and(|flag| flag.load(Ordering::SeqCst))
    }

    pub fn stats(&self) -> Result<RingStats> {
        let mut stats = BinStats {
            queued: 0,
            dropped: 0,
        };
        let rc = unsafe {
            libc::ioctl(
                self.file.as_raw_fd(),
                MON_IOCG_STATS as _,
                &mut stats as *mut BinStats,
            )
        };
        if rc < 0 {
            return Err(MonitorError::Ioctl {
                op: "MON_IOCG_STATS",
                source: io::Error::last_os_error(),
            });
        }
        Ok(RingStats {
            queued: stats.queued,
            dropped: stats.dropped,
        })
    }

    /// Release the records handed out by the last fetch
    fn flush_fetched(&mut self) -> io::Result<()> {
        if self.nflush == 0 {
            return Ok(());
        }
        let rc = unsafe {
            libc::ioctl(
                self.file.as_raw_fd(),
                MON_IOCH_MFLUSH as _,
                self.nflush as libc::c_int,
            )
        };
        if rc < 0 {
            return Err(io::Error::last_os_error());
        }
        self.nflush = 0;
        Ok(())
    }

    /// Fetch the next record and return its ring offset
    fn fetch(&mut self) -> io::Result<Option<usize>> {
        let mut offset: u32 = 0;
        let mut arg = Mfetch {
            offvec: &mut offset,
            nfetch: 1,
            nflush: self.nflush,
        };
        let rc = unsafe {
            libc::ioctl(
                self.file.as_raw_fd(),
                MON_IOCX_MFETCH as _,
                &mut arg as *mut Mfetch,
            )
        };
        // The flush happens before the wait, also when interrupted
        self.nflush = 0;
        if rc < 0 {
            return Err(io::Error::last_os_error());
        }
        self.nflush = arg.nfetch;
        if arg.nfetch == 0 {
            return Ok(None);
        }
        Ok(Some(offset as usize))
    }

    fn copy_out(&self, offset: usize, len: usize) -> Result<Vec<u8>> {
        let end = offset
            .checked_add(len)
            .filter(|&end| end <= self.size)
            .ok_or(MonitorError::BadOffset {
                offset,
                size: self.size,
            })?;
        let mut out = vec![0u8; end - offset];
        // The kernel leaves fetched records alone until they are flushed
        unsafe {
            core::ptr::copy_nonoverlapping(
                self.ring.as_ptr().add(offset),
                out.as_mut_ptr(),
                out.len(),
            );
        }
        Ok(out)
    }

    fn read_record(&self, offset: usize) -> Result<Record> {
        let raw = self.copy_out(offset, HEADER_SIZE)?;
        let header = MonHeader::decode(&raw)?;
        let data = if header.has_data() && header.len_cap > 0 {
            self.copy_out(offset + HEADER_SIZE, header.len_cap as usize)?
        } else {
            Vec::new()
        };
        trace!("{}", header);
        Ok(Record { header, data })
    }
}

impl EventSource for UsbmonDevice {
    fn next_event(&mut self) -> Result<Fetch> {
        loop {
            if self.cancelled() {
                return Ok(Fetch::Cancelled);
            }
            // An unflushed record keeps the ring readable
            self.flush_fetched().map_err(|source| MonitorError::Ioctl {
                op: "MON_IOCH_MFLUSH",
                source,
            })?;
            match wait_readable(self.file.as_raw_fd(), POLL_INTERVAL_MS) {
                Ok(true) => {}
                Ok(false) => continue,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(source) => return Err(MonitorError::Ioctl { op: "poll", source }),
            }
            match self.fetch() {
                Ok(Some(offset)) => return self.read_record(offset).map(Fetch::Event),
                Ok(None) => continue,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(source) => {
                    return Err(MonitorError::Ioctl {
                        op: "MON_IOCX_MFETCH",
                        source,
                    })
                }
            }
        }
    }

    fn dropped(&mut self) -> Option<u32> {
        match self.stats() {
            Ok(stats) => Some(stats.dropped),
            Err(err) => {
                warn!("{}", err);
                None
            }
        }
    }
}

impl Drop for UsbmonDevice {
    fn drop(&mut self) {
        let rc = unsafe { libc::munmap(self.ring.as_ptr().cast(), self.size) };
        if rc != 0 {
            warn!("munmap: {}", io::Error::last_os_error());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ioctl_numbers() {
        assert_eq!(MON_IOCT_RING_SIZE, 0x9204);
        assert_eq!(MON_IOCG_STATS, 0x8008_9203);
        assert_eq!(MON_IOCH_MFLUSH, 0x9208);
    }

    #[test]
    fn test_wait_readable_times_out() {
        use std::io::Write;
        use std::os::unix::net::UnixStream;

        let (mut writer, reader) = UnixStream::pair().unwrap();
        let start = std::time::Instant::now();
        assert!(!wait_readable(reader.as_raw_fd(), 20).unwrap());
        assert!(start.elapsed() >= std::time::Duration::from_millis(15));

        writer.write_all(&[1]).unwrap();
        assert!(wait_readable(reader.as_raw_fd(), POLL_INTERVAL_MS).unwrap());
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn test_mfetch_number() {
        assert_eq!(MON_IOCX_MFETCH, 0xc010_9207);
    }

    #[test]
    fn test_device_path() {
        assert_eq!(UsbmonDevice::path(0), PathBuf::from("/dev/usbmon0"));
        assert_eq!(UsbmonDevice::path(3), PathBuf::from("/dev/usbmon3"));
    }
}
