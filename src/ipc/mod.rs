//! # IPC Primitives Wrapper
//!
//! This module is the leaf layer of the bridge (§4.1 of the design): thin,
//! directly-tested adapters over the two POSIX kernel object families the
//! shared-memory transport composes — named shared memory and named
//! counting semaphores. Everything above [`primitives`] works in terms of
//! [`crate::error::RpcError`] only; no caller above this module touches
//! `libc` or `shared_memory` directly.

pub mod primitives;
