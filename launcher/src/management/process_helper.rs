use std::io;

#[cfg(unix)]
use nix::sys::signal::{kill as nix_kill, Signal};
#[cfg(unix)]
use nix::unistd::Pid;
#[cfg(windows)]
use winapi::shared::minwindef::FALSE;
#[cfg(windows)]
use winapi::um::handleapi::CloseHandle;
#[cfg(windows)]
use winapi::um::processthreadsapi::{OpenProcess, TerminateProcess};
#[cfg(windows)]
use winapi::um::winnt::{PROCESS_QUERY_LIMITED_INFORMATION, PROCESS_TERMINATE};

/// OS-level liveness check by pid. This is the ground truth the state
/// enum may lag behind, e.g. right after an external kill.
pub fn alive(pid: u32) -> bool {
    #[cfg(unix)]
    {
        // signal 0: existence probe, nothing is delivered
        nix_kill(Pid::from_raw(pid as i32), None).is_ok()
    }
    #[cfg(windows)]
    {
        let handle = unsafe { OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, FALSE, pid) };
        if handle.is_null() {
            return false;
        }
        unsafe { CloseHandle(handle) };
        true
    }
}

/// Unconditional OS termination (SIGKILL / TerminateProcess), used
/// when the child handle is no longer held.
pub fn kill(pid: u32) -> io::Result<()> {
    #[cfg(unix)]
    {
        nix_kill(Pid::from_raw(pid as i32), Signal::SIGKILL)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))
    }
    #[cfg(windows)]
    {
        let handle = unsafe { OpenProcess(PROCESS_TERMINATE, FALSE, pid) };
        if handle.is_null() {
            return Err(io::Error::last_os_error());
        }
        let result = unsafe { TerminateProcess(handle, 1) };
        unsafe { CloseHandle(handle) };
        if result == 0 {
            Err(io::Error::last_os_error())
        } else {
            Ok(())
        }
    }
}
