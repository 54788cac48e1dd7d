//! # IPC Primitives Wrapper
//!
//! Thin adapters over the two POSIX kernel object families this bridge uses:
//! named shared memory ([`shm`]) and named counting semaphores ([`semaphore`]).
//! Nothing above the transport layer touches `libc` or `shared_memory`
//! directly — every primitive failure is already translated into the
//! [`crate::error::RpcError`] taxonomy here.

pub mod semaphore;
pub mod shm;

pub use semaphore::NamedSemaphore;
pub use shm::ShmSegment;
