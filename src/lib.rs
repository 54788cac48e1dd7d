//! # Shared-Memory RPC Bridge
//!
//! A low-latency remote-procedure-call bridge whose defining property is a
//! shared-memory transport synchronized by named counting semaphores. A
//! client process invokes named methods on a server process; arguments and
//! results cross the process boundary as serialized messages placed in two
//! fixed-size buffers mapped into both address spaces.
//!
//! ## Layers
//!
//! - [`ipc::primitives`] — thin adapters over POSIX named shared memory and
//!   named counting semaphores.
//! - [`transport`] — the producer-consumer shared-memory channel: two
//!   single-slot rings, framing, size validation, and kernel-object
//!   lifecycle.
//! - [`codec`] and [`value`] — the request/response wire format and the
//!   small recursive value type carried in parameters and results.
//! - [`client`] and [`server`] — the synchronous RPC endpoints built on top
//!   of the other three layers.
//!
//! [`config::ChannelConfig`] and [`error::RpcError`] are the two types every
//! layer shares: the former configures a channel, the latter is what every
//! fallible operation returns.

pub mod client;
pub mod codec;
pub mod config;
pub mod error;
pub mod ipc;
pub mod logging;
pub mod server;
pub mod transport;
pub mod value;

pub use client::RpcClient;
pub use config::ChannelConfig;
pub use error::{Result, RpcError};
pub use server::{RpcServer, ServerStatus};
pub use transport::{Role, SharedMemoryTransport};
pub use value::{Params, Value};

/// The current version of this crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
