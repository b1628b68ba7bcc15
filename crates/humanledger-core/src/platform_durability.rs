//! Durable sync for WAL files
//!
//! `durable_sync` maps to the strongest "data is on the media" primitive of
//! the target platform.

use std::fs::File;
use std::io;

/// Block until the file's data has reached persistent storage.
///
/// - Linux: fdatasync()
/// - macOS/iOS: fcntl(F_FULLFSYNC), plain fsync only reaches the drive cache
/// - Windows: FlushFileBuffers()
/// - Other: File::sync_data()
///
/// May block for a long time under heavy I/O; do not call while holding the
/// store's map lock.
pub fn durable_sync(file: &File) -> io::Result<()> {
    sync_impl(file)
}

#[cfg(any(target_os = "linux", target_os = "macos", target_os = "ios", target_os = "windows"))]
fn check(ok: bool) -> io::Result<()> {
    if ok { Ok(()) } else { Err(io::Error::last_os_error()) }
}

#[cfg(target_os = "linux")]
fn sync_impl(file: &File) -> io::Result<()> {
    use std::os::unix::io::AsRawFd;
    // SAFETY: the descriptor comes from a live File borrowed for this call.
    let ret = unsafe { libc::fdatasync(file.as_raw_fd()) };
    check(ret == 0)
}

#[cfg(any(target_os = "macos", target_os = "ios"))]
fn sync_impl(file: &File) -> io::Result<()> {
    use std::os::unix::io::AsRawFd;
    // SAFETY: the descriptor comes from a live File borrowed for this call.
    let ret = unsafe { libc::fcntl(file.as_raw_fd(), libc::F_FULLFSYNC) };
    check(ret == 0)
}

#[cfg(target_os = "windows")]
fn sync_impl(file: &File) -> io::Result<()> {
    use std::os::windows::io::AsRawHandle;
    use winapi::um::fileapi::FlushFileBuffers;
    // SAFETY: the handle comes from a live File borrowed for this call.
    let ret = unsafe { FlushFileBuffers(file.as_raw_handle() as *mut _) };
    check(ret != 0)
}

#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "ios", target_os = "windows")))]
fn sync_impl(file: &File) -> io::Result<()> {
    file.sync_data()
}
