//! # Named Shared Memory Primitive
//!
//! A thin adapter over POSIX named shared memory, built on the `shared_memory`
//! crate the way the reference codebase's own shared-memory transport does
//! (`ShmemConf::new().size(..).os_id(..).create()/.open()`). This layer only
//! owns the mapping; framing and synchronization live in
//! [`crate::transport`].

use crate::error::RpcError;
use shared_memory::{Shmem, ShmemConf, ShmemError};
use std::ffi::CString;

/// A mapped, named shared-memory segment.
pub struct ShmSegment {
    shmem: Shmem,
}

unsafe impl Send for ShmSegment {}
unsafe impl Sync for ShmSegment {}

impl ShmSegment {
    /// Create a new segment of exactly `size` bytes, failing if one with
    /// this name already exists.
    pub fn create(name: &str, size: usize) -> Result<Self, RpcError> {
        let shmem = ShmemConf::new()
            .size(size)
            .os_id(name)
            .create()
            .map_err(|e| translate(e, name))?;
        Ok(Self { shmem })
    }

    /// Open an existing segment. The caller's requested `size` must not
    /// exceed the segment's actual size.
    pub fn open(name: &str, size: usize) -> Result<Self, RpcError> {
        let shmem = ShmemConf::new()
            .os_id(name)
            .open()
            .map_err(|e| translate(e, name))?;
        if shmem.len() < size {
            return Err(RpcError::Transport(format!(
                "shared memory {name}: size mismatch (segment is {} bytes, caller requested {size})",
                shmem.len()
            )));
        }
        Ok(Self { shmem })
    }

    /// Raw pointer to the start of the mapped region.
    pub fn as_mut_ptr(&self) -> *mut u8 {
        self.shmem.as_ptr()
    }

    pub fn len(&self) -> usize {
        self.shmem.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shmem.len() == 0
    }

    pub fn is_owner(&self) -> bool {
        self.shmem.is_owner()
    }

    /// Unlink a named shared-memory object directly, without first opening
    /// a mapping to it.
    ///
    /// Used by the crash-recovery cleanup utility (§6), which must remove
    /// stale kernel objects whose size or contents it never inspects. Idempotent:
    /// unlinking a name that does not exist is not an error, mirroring
    /// [`crate::ipc::primitives::NamedSemaphore::unlink`].
    pub fn unlink_by_name(name: &str) -> Result<(), RpcError> {
        let cname = CString::new(name)
            .map_err(|_| RpcError::Transport(format!("invalid shared memory name: {name}")))?;
        let rc = unsafe { libc::shm_unlink(cname.as_ptr()) };
        if rc == 0 {
            Ok(())
        } else {
            let err = std::io::Error::last_os_error();
            match err.raw_os_error() {
                Some(libc::ENOENT) => Ok(()),
                _ => Err(RpcError::Transport(format!("shm_unlink {name}: {err}"))),
            }
        }
    }
}

/// Translate a `shared_memory` crate error into the transport taxonomy.
///
/// `ShmemError`'s variants differ across platforms; classification stays on
/// the rendered message rather than matching specific variants, so this is
/// correct regardless of which `ShmemError` the crate raises.
fn translate(err: ShmemError, name: &str) -> RpcError {
    RpcError::Transport(format!("shared memory {name}: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn unique_name(label: &str) -> String {
        format!("shm_rpc_bridge_test_{}_{}", label, Uuid::new_v4().simple())
    }

    #[test]
    fn create_then_open_share_memory() {
        let name = unique_name("shm_basic");
        let creator = ShmSegment::create(&name, 4096).unwrap();
        assert!(creator.is_owner());

        unsafe {
            *creator.as_mut_ptr() = 42;
        }

        let opener = ShmSegment::open(&name, 4096).unwrap();
        assert!(!opener.is_owner());
        let byte = unsafe { *opener.as_mut_ptr() };
        assert_eq!(byte, 42);
    }

    #[test]
    fn open_with_larger_size_than_segment_fails() {
        let name = unique_name("shm_size_mismatch");
        let _creator = ShmSegment::create(&name, 64).unwrap();
        let err = ShmSegment::open(&name, 4096).unwrap_err();
        assert!(matches!(err, RpcError::Transport(_)));
    }

    #[test]
    fn create_twice_fails() {
        let name = unique_name("shm_dup");
        let _creator = ShmSegment::create(&name, 64).unwrap();
        let err = ShmSegment::create(&name, 64).unwrap_err();
        assert!(matches!(err, RpcError::Transport(_)));
    }

    #[test]
    fn unlink_by_name_removes_segment_then_is_idempotent() {
        let name = format!("/{}", unique_name("shm_unlink"));
        let creator = ShmSegment::create(&name, 64).unwrap();
        // Simulate a crashed creator that never ran its own Drop-time cleanup.
        std::mem::forget(creator);

        let opener = ShmSegment::open(&name, 64).unwrap();
        drop(opener);

        ShmSegment::unlink_by_name(&name).unwrap();
        let err = ShmSegment::open(&name, 64).unwrap_err();
        assert!(matches!(err, RpcError::Transport(_)));

        // Unlinking again is not an error.
        ShmSegment::unlink_by_name(&name).unwrap();
    }
}
