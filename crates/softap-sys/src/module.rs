//! Kernel module loading and unloading.
//!
//! The driver lifecycle needs exactly two primitives: hand a module
//! image (already read into memory) to the kernel, and ask the kernel to
//! delete a module by name. Unload distinguishes the transient busy
//! condition from hard failures so the caller can retry contention
//! without retrying real errors.

use std::ffi::CString;
use std::io;

/// Result of one unload attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnloadOutcome {
    /// The module is gone.
    Unloaded,
    /// The kernel reported `EAGAIN`; the module still has users and the
    /// attempt may be retried.
    Busy,
}

/// Loads and unloads kernel modules.
///
/// Implementations report plain [`io::Error`]s; the caller attaches the
/// module path or name for diagnostics.
pub trait ModuleLoader {
    /// Passes a raw module image with a parameter string to the kernel.
    /// Single-shot; no retry semantics.
    fn load(&self, image: &[u8], params: &str) -> io::Result<()>;

    /// Asks the kernel to delete the named module, non-blocking.
    fn unload(&self, name: &str) -> io::Result<UnloadOutcome>;
}

/// Production loader backed by the `init_module` / `delete_module`
/// syscalls.
#[derive(Debug, Clone, Copy, Default)]
pub struct KernelModuleLoader;

impl ModuleLoader for KernelModuleLoader {
    fn load(&self, image: &[u8], params: &str) -> io::Result<()> {
        let params = CString::new(params)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "NUL in module params"))?;

        // SAFETY: the image buffer and params CString outlive the call;
        // the kernel copies both before returning.
        let rc = unsafe {
            libc::syscall(
                libc::SYS_init_module,
                image.as_ptr() as *const libc::c_void,
                image.len() as libc::c_ulong,
                params.as_ptr(),
            )
        };

        if rc == 0 {
            Ok(())
        } else {
            Err(io::Error::last_os_error())
        }
    }

    fn unload(&self, name: &str) -> io::Result<UnloadOutcome> {
        let name = CString::new(name)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "NUL in module name"))?;

        // SAFETY: the name CString outlives the call.
        let rc = unsafe {
            libc::syscall(
                libc::SYS_delete_module,
                name.as_ptr(),
                (libc::O_NONBLOCK | libc::O_EXCL) as libc::c_uint,
            )
        };

        if rc == 0 {
            return Ok(UnloadOutcome::Unloaded);
        }

        let err = io::Error::last_os_error();
        if err.raw_os_error() == Some(libc::EAGAIN) {
            Ok(UnloadOutcome::Busy)
        } else {
            Err(err)
        }
    }
}
