//! SIGINT cancellation
//!
//! The handler only sets a flag. It is installed without `SA_RESTART` so a
//! blocking fetch returns `EINTR` and the capture loop sees the flag.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};

static CANCEL: AtomicBool = AtomicBool::new(false);

extern "C" fn on_sigint(_signal: libc::c_int) {
    CANCEL.store(true, Ordering::SeqCst);
}

/// Install the handler and return the flag it sets
pub fn install_sigint() -> io::Result<&'static AtomicBool> {
    unsafe {
        let mut action: libc::sigaction = std::mem::zeroed();
        action.sa_sigaction = on_sigint as extern "C" fn(libc::c_int) as libc::sighandler_t;
        action.sa_flags = 0;
        libc::sigemptyset(&mut action.sa_mask);
        if libc::sigaction(libc::SIGINT, &action, std::ptr::null_mut()) != 0 {
            return Err(io::Error::last_os_error());
        }
    }
    Ok(&CANCEL)
}
