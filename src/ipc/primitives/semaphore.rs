//! # Named Counting Semaphore Primitive
//!
//! A thin adapter over POSIX named semaphores (`sem_open`/`sem_close`/
//! `sem_post`/`sem_unlink`, plus the wait family). No crate in the reference
//! codebase's dependency stack exposes named semaphores, so this wraps the
//! `libc` bindings directly — the same approach the example pack's own
//! shared-memory notification bus takes for POSIX semaphore access.
//!
//! `sem_wait` surfaces exactly three outcomes: success, `Timeout`, or a
//! non-timeout `Transport` failure, per §4.1 of the design. The timeout value
//! selects one of three underlying syscalls:
//! - `Some(Duration::ZERO)` → `sem_trywait` (non-blocking probe)
//! - `Some(d)` with `d > 0` → `sem_timedwait` against a `CLOCK_REALTIME` deadline
//! - `None` → `sem_wait` (unbounded; only reachable via explicit configuration)

use crate::error::RpcError;
use std::ffi::CString;
use std::time::Duration;

/// A named POSIX counting semaphore.
///
/// The semaphore name must start with `/` per POSIX; callers pass the bare
/// channel-derived name and this wrapper does not prepend anything further.
pub struct NamedSemaphore {
    handle: *mut libc::sem_t,
    name: String,
}

unsafe impl Send for NamedSemaphore {}
unsafe impl Sync for NamedSemaphore {}

impl NamedSemaphore {
    /// Create a new named semaphore, failing if one with this name already
    /// exists (`O_CREAT | O_EXCL`).
    pub fn create(name: &str, initial_value: u32, mode: u32) -> Result<Self, RpcError> {
        let cname = cstring(name)?;
        let handle = unsafe {
            libc::sem_open(
                cname.as_ptr(),
                libc::O_CREAT | libc::O_EXCL,
                mode,
                initial_value,
            )
        };
        if handle == libc::SEM_FAILED {
            return Err(translate_errno("sem_open (create)", name));
        }
        Ok(Self {
            handle,
            name: name.to_string(),
        })
    }

    /// Open an existing named semaphore. Fails if it does not exist.
    pub fn open(name: &str) -> Result<Self, RpcError> {
        let cname = cstring(name)?;
        let handle = unsafe { libc::sem_open(cname.as_ptr(), 0) };
        if handle == libc::SEM_FAILED {
            return Err(translate_errno("sem_open (open)", name));
        }
        Ok(Self {
            handle,
            name: name.to_string(),
        })
    }

    /// Wait on the semaphore, bounded by an optional timeout.
    ///
    /// `Some(Duration::ZERO)` is a non-blocking probe; `None` blocks
    /// indefinitely. Any other duration bounds the wait with
    /// `sem_timedwait`. Expiry is reported as `RpcError::Timeout`, distinct
    /// from any other primitive failure.
    pub fn wait(&self, timeout: Option<Duration>) -> Result<(), RpcError> {
        match timeout {
            Some(d) if d.is_zero() => {
                let rc = unsafe { libc::sem_trywait(self.handle) };
                if rc == 0 {
                    Ok(())
                } else if errno() == libc::EAGAIN {
                    Err(RpcError::Timeout(format!("semaphore {} not available", self.name)))
                } else {
                    Err(translate_errno("sem_trywait", &self.name))
                }
            }
            Some(d) => {
                let deadline = deadline_timespec(d)?;
                let rc = unsafe { libc::sem_timedwait(self.handle, &deadline) };
                if rc == 0 {
                    Ok(())
                } else if errno() == libc::ETIMEDOUT {
                    Err(RpcError::Timeout(format!(
                        "semaphore {} wait timed out after {:?}",
                        self.name, d
                    )))
                } else {
                    Err(translate_errno("sem_timedwait", &self.name))
                }
            }
            None => {
                let rc = unsafe { libc::sem_wait(self.handle) };
                if rc == 0 {
                    Ok(())
                } else {
                    Err(translate_errno("sem_wait", &self.name))
                }
            }
        }
    }

    /// Increment the semaphore, releasing one waiter.
    pub fn post(&self) -> Result<(), RpcError> {
        let rc = unsafe { libc::sem_post(self.handle) };
        if rc == 0 {
            Ok(())
        } else {
            Err(translate_errno("sem_post", &self.name))
        }
    }

    /// Close this process's handle to the semaphore. Does not unlink it.
    pub fn close(&self) {
        unsafe {
            libc::sem_close(self.handle);
        }
    }

    /// Unlink (destroy) the named semaphore. Only the creator should call
    /// this during normal shutdown.
    pub fn unlink(name: &str) -> Result<(), RpcError> {
        let cname = cstring(name)?;
        let rc = unsafe { libc::sem_unlink(cname.as_ptr()) };
        if rc == 0 || errno() == libc::ENOENT {
            Ok(())
        } else {
            Err(translate_errno("sem_unlink", name))
        }
    }
}

impl Drop for NamedSemaphore {
    fn drop(&mut self) {
        self.close();
    }
}

fn cstring(name: &str) -> Result<CString, RpcError> {
    CString::new(name).map_err(|_| RpcError::Transport(format!("invalid semaphore name: {name}")))
}

fn errno() -> i32 {
    std::io::Error::last_os_error().raw_os_error().unwrap_or(0)
}

fn translate_errno(op: &str, name: &str) -> RpcError {
    let err = std::io::Error::last_os_error();
    match err.raw_os_error() {
        Some(libc::ENOENT) => RpcError::Transport(format!("{op} on {name}: not found")),
        Some(libc::EEXIST) => RpcError::Transport(format!("{op} on {name}: already exists")),
        Some(libc::EACCES) => RpcError::Transport(format!("{op} on {name}: permission denied")),
        _ => RpcError::Transport(format!("{op} on {name}: {err}")),
    }
}

/// Compute a `CLOCK_REALTIME` deadline timespec for `sem_timedwait`.
fn deadline_timespec(timeout: Duration) -> Result<libc::timespec, RpcError> {
    let mut now = libc::timespec {
        tv_sec: 0,
        tv_nsec: 0,
    };
    let rc = unsafe { libc::clock_gettime(libc::CLOCK_REALTIME, &mut now) };
    if rc != 0 {
        return Err(translate_errno("clock_gettime", "CLOCK_REALTIME"));
    }

    let mut sec = now.tv_sec + timeout.as_secs() as i64;
    let mut nsec = now.tv_nsec + timeout.subsec_nanos() as i64;
    if nsec >= 1_000_000_000 {
        sec += 1;
        nsec -= 1_000_000_000;
    }
    Ok(libc::timespec {
        tv_sec: sec,
        tv_nsec: nsec,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn unique_name(label: &str) -> String {
        format!("/shm_rpc_bridge_test_{}_{}", label, Uuid::new_v4().simple())
    }

    #[test]
    fn create_wait_post_round_trip() {
        let name = unique_name("sem_basic");
        let sem = NamedSemaphore::create(&name, 0, 0o600).unwrap();
        sem.post().unwrap();
        sem.wait(Some(Duration::from_secs(1))).unwrap();
        NamedSemaphore::unlink(&name).unwrap();
    }

    #[test]
    fn zero_timeout_times_out_when_not_posted() {
        let name = unique_name("sem_zero_timeout");
        let sem = NamedSemaphore::create(&name, 0, 0o600).unwrap();
        let err = sem.wait(Some(Duration::ZERO)).unwrap_err();
        assert!(err.is_timeout());
        NamedSemaphore::unlink(&name).unwrap();
    }

    #[test]
    fn bounded_timeout_expires() {
        let name = unique_name("sem_bounded_timeout");
        let sem = NamedSemaphore::create(&name, 0, 0o600).unwrap();
        let err = sem.wait(Some(Duration::from_millis(50))).unwrap_err();
        assert!(err.is_timeout());
        NamedSemaphore::unlink(&name).unwrap();
    }

    #[test]
    fn open_nonexistent_fails_transport() {
        let name = unique_name("sem_missing");
        let err = NamedSemaphore::open(&name).unwrap_err();
        assert!(!err.is_timeout());
    }

    #[test]
    fn create_twice_fails_already_exists() {
        let name = unique_name("sem_dup");
        let _sem = NamedSemaphore::create(&name, 1, 0o600).unwrap();
        let err = NamedSemaphore::create(&name, 1, 0o600).unwrap_err();
        assert!(!err.is_timeout());
        NamedSemaphore::unlink(&name).unwrap();
    }
}
