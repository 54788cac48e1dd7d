//! # Shared-Memory Transport
//!
//! The producer–consumer channel at the heart of the bridge: two fixed-size
//! mapped regions (request, response) plus four counting semaphores forming
//! two single-slot rings. This is the largest single piece of the core
//! (§2 budgets it at roughly 40%), so it owns framing, size validation, and
//! the full lifecycle of the six kernel objects a channel resolves to.
//!
//! Grounded on the reference codebase's `SharedMemoryTransport` (its own
//! ring-buffer framing, header layout, and close-policy shape), adapted from
//! a spin-and-sleep polling loop to genuine named-semaphore blocking, which
//! is what lets `send`/`receive` expose real bounded timeouts instead of a
//! busy loop.

use crate::config::ChannelConfig;
use crate::error::RpcError;
use crate::ipc::primitives::{NamedSemaphore, ShmSegment};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tracing::debug;

/// Header length: a 4-byte little-endian payload length prefix.
const HEADER_SIZE: usize = 4;

/// Owner-only permissions (octal 600) for created shared memory and
/// semaphores, per §6.
const CREATE_MODE: u32 = 0o600;

/// Per-direction single-slot buffer. Exists only to name the two regions a
/// channel maps; framing/locking live on [`SharedMemoryTransport`] itself.
struct Slot {
    shm: ShmSegment,
    empty: NamedSemaphore,
    full: NamedSemaphore,
    /// Serializes the wait+read/write+post sequence for sends into this
    /// slot, independently of the paired receive side. Guards against
    /// `close` racing an in-progress operation from another thread.
    send_lock: Mutex<()>,
    recv_lock: Mutex<()>,
}

impl Slot {
    fn buffer_size(&self) -> usize {
        self.shm.len()
    }

    fn max_payload(&self) -> usize {
        self.buffer_size().saturating_sub(HEADER_SIZE)
    }

    fn write(&self, data: &[u8], timeout: Option<Duration>) -> Result<(), RpcError> {
        if data.len() > self.max_payload() {
            return Err(RpcError::Transport(format!(
                "message too large: {} bytes exceeds maximum payload of {} bytes",
                data.len(),
                self.max_payload()
            )));
        }

        let _guard = self.send_lock.lock().unwrap();
        self.empty.wait(timeout)?;

        // Single copy from caller memory straight into the mapped region.
        unsafe {
            let base = self.shm.as_mut_ptr();
            let len = data.len() as u32;
            std::ptr::copy_nonoverlapping(len.to_le_bytes().as_ptr(), base, HEADER_SIZE);
            std::ptr::copy_nonoverlapping(data.as_ptr(), base.add(HEADER_SIZE), data.len());
        }

        self.full.post()
    }

    fn read(&self, timeout: Option<Duration>) -> Result<Vec<u8>, RpcError> {
        let _guard = self.recv_lock.lock().unwrap();
        self.full.wait(timeout)?;

        let len = unsafe {
            let base = self.shm.as_mut_ptr();
            let mut header = [0u8; HEADER_SIZE];
            std::ptr::copy_nonoverlapping(base, header.as_mut_ptr(), HEADER_SIZE);
            u32::from_le_bytes(header) as usize
        };

        if len > self.max_payload() {
            return Err(RpcError::Transport(format!(
                "invalid message size: header declares {len} bytes, maximum payload is {}",
                self.max_payload()
            )));
        }

        let mut data = vec![0u8; len];
        unsafe {
            let base = self.shm.as_mut_ptr();
            std::ptr::copy_nonoverlapping(base.add(HEADER_SIZE), data.as_mut_ptr(), len);
        }

        self.empty.post()?;
        Ok(data)
    }
}

/// Whether this endpoint created the channel's kernel objects (server) or
/// opened existing ones (client). Only the creator unlinks on close.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Creator,
    Opener,
}

/// Names of the six kernel objects a channel named `N` resolves to.
struct ChannelNames {
    request_shm: String,
    response_shm: String,
    req_empty: String,
    req_full: String,
    resp_empty: String,
    resp_full: String,
}

impl ChannelNames {
    fn for_channel(name: &str) -> Self {
        Self {
            request_shm: format!("/{name}_request"),
            response_shm: format!("/{name}_response"),
            req_empty: format!("/{name}_req_empty"),
            req_full: format!("/{name}_req_full"),
            resp_empty: format!("/{name}_resp_empty"),
            resp_full: format!("/{name}_resp_full"),
        }
    }
}

/// The shared-memory transport for one channel.
///
/// Construction is by role: [`SharedMemoryTransport::create`] allocates and
/// owns the six kernel objects (server role); [`SharedMemoryTransport::open`]
/// attaches to objects a creator already made (client role). Both expose the
/// same four framed operations.
pub struct SharedMemoryTransport {
    role: Role,
    channel_name: String,
    request: Slot,
    response: Slot,
    timeout: Option<Duration>,
    closed: AtomicBool,
}

impl SharedMemoryTransport {
    /// Create a channel's kernel objects. Fails `Transport` if any object
    /// with these names already exists.
    pub fn create(name: &str, buffer_size: usize, timeout: Option<Duration>) -> Result<Self, RpcError> {
        let names = ChannelNames::for_channel(name);
        debug!(channel = name, buffer_size, "creating shared memory channel");

        let request = Slot {
            shm: ShmSegment::create(&names.request_shm, buffer_size)?,
            empty: NamedSemaphore::create(&names.req_empty, 1, CREATE_MODE)?,
            full: NamedSemaphore::create(&names.req_full, 0, CREATE_MODE)?,
            send_lock: Mutex::new(()),
            recv_lock: Mutex::new(()),
        };
        let response = Slot {
            shm: ShmSegment::create(&names.response_shm, buffer_size)?,
            empty: NamedSemaphore::create(&names.resp_empty, 1, CREATE_MODE)?,
            full: NamedSemaphore::create(&names.resp_full, 0, CREATE_MODE)?,
            send_lock: Mutex::new(()),
            recv_lock: Mutex::new(()),
        };

        Ok(Self {
            role: Role::Creator,
            channel_name: name.to_string(),
            request,
            response,
            timeout,
            closed: AtomicBool::new(false),
        })
    }

    /// Open an existing channel's kernel objects. `buffer_size` must equal
    /// the creator's; a mismatch fails `Transport`.
    pub fn open(name: &str, buffer_size: usize, timeout: Option<Duration>) -> Result<Self, RpcError> {
        let names = ChannelNames::for_channel(name);
        debug!(channel = name, buffer_size, "opening shared memory channel");

        let request = Slot {
            shm: ShmSegment::open(&names.request_shm, buffer_size)?,
            empty: NamedSemaphore::open(&names.req_empty)?,
            full: NamedSemaphore::open(&names.req_full)?,
            send_lock: Mutex::new(()),
            recv_lock: Mutex::new(()),
        };
        let response = Slot {
            shm: ShmSegment::open(&names.response_shm, buffer_size)?,
            empty: NamedSemaphore::open(&names.resp_empty)?,
            full: NamedSemaphore::open(&names.resp_full)?,
            send_lock: Mutex::new(()),
            recv_lock: Mutex::new(()),
        };

        Ok(Self {
            role: Role::Opener,
            channel_name: name.to_string(),
            request,
            response,
            timeout,
            closed: AtomicBool::new(false),
        })
    }

    /// Create a channel from a [`ChannelConfig`] instead of separate
    /// arguments; see [`SharedMemoryTransport::create`].
    pub fn create_with_config(name: &str, config: &ChannelConfig) -> Result<Self, RpcError> {
        Self::create(name, config.buffer_size, config.timeout)
    }

    /// Open a channel from a [`ChannelConfig`] instead of separate
    /// arguments; see [`SharedMemoryTransport::open`].
    pub fn open_with_config(name: &str, config: &ChannelConfig) -> Result<Self, RpcError> {
        Self::open(name, config.buffer_size, config.timeout)
    }

    fn check_open(&self) -> Result<(), RpcError> {
        if self.closed.load(Ordering::Acquire) {
            Err(RpcError::State(format!(
                "channel {} is closed",
                self.channel_name
            )))
        } else {
            Ok(())
        }
    }

    /// Client → server. Rejects oversized payloads before touching any
    /// semaphore.
    pub fn send_request(&self, data: &[u8]) -> Result<(), RpcError> {
        self.check_open()?;
        self.request.write(data, self.timeout)
    }

    /// Server side of `send_request`.
    pub fn receive_request(&self) -> Result<Vec<u8>, RpcError> {
        self.check_open()?;
        self.request.read(self.timeout)
    }

    /// Server → client.
    pub fn send_response(&self, data: &[u8]) -> Result<(), RpcError> {
        self.check_open()?;
        self.response.write(data, self.timeout)
    }

    /// Client side of `send_response`.
    pub fn receive_response(&self) -> Result<Vec<u8>, RpcError> {
        self.check_open()?;
        self.response.read(self.timeout)
    }

    pub fn buffer_size(&self) -> usize {
        self.request.buffer_size()
    }

    pub fn max_message_size(&self) -> usize {
        self.request.max_payload()
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// Unmap both regions and close all four semaphore handles; if this
    /// endpoint is the creator, additionally unlink all six kernel objects.
    /// Idempotent and safe to call from a signal handler.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return; // already closed
        }

        debug!(channel = self.channel_name, role = ?self.role, "closing channel");

        // Acquiring each lock before dropping handles ensures we never
        // unlink a semaphore a waiter in this process is blocked on.
        let _ = self.request.send_lock.lock().unwrap();
        let _ = self.request.recv_lock.lock().unwrap();
        let _ = self.response.send_lock.lock().unwrap();
        let _ = self.response.recv_lock.lock().unwrap();

        self.request.empty.close();
        self.request.full.close();
        self.response.empty.close();
        self.response.full.close();

        if self.role == Role::Creator {
            let names = ChannelNames::for_channel(&self.channel_name);
            let _ = NamedSemaphore::unlink(&names.req_empty);
            let _ = NamedSemaphore::unlink(&names.req_full);
            let _ = NamedSemaphore::unlink(&names.resp_empty);
            let _ = NamedSemaphore::unlink(&names.resp_full);
            // The `shared_memory` crate's owning `Shmem` would unlink on its
            // own `Drop`, but that drop does not happen until this
            // `SharedMemoryTransport` itself is dropped, which can be long
            // after `close()` returns. Unlink the segment names directly so
            // the kernel objects are gone the instant `close()` returns, per
            // the "creator-only unlinker" invariant (§3).
            let _ = ShmSegment::unlink_by_name(&names.request_shm);
            let _ = ShmSegment::unlink_by_name(&names.response_shm);
        }
    }
}

impl Drop for SharedMemoryTransport {
    fn drop(&mut self) {
        self.close();
    }
}
