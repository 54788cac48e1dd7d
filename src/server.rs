//! # RPC Server
//!
//! Hosts a method registry against one shared-memory channel this endpoint
//! creates (and therefore owns for unlink purposes). The dispatch loop is
//! single-threaded and cooperative per §5 of the design: one call is
//! received, dispatched, and answered before the next receive begins. There
//! is no internal worker pool — callers wanting concurrency run multiple
//! `RpcServer`s on distinct channels.

use crate::client::RpcClient;
use crate::codec::{self, Response};
use crate::config::ChannelConfig;
use crate::error::RpcError;
use crate::transport::SharedMemoryTransport;
use crate::value::{Params, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Name reserved for the server's own liveness probe. Registering a handler
/// under this name is rejected.
pub const RUNNING_METHOD: &str = "__running__";

type Handler = Box<dyn Fn(Params) -> Result<Value, RpcError> + Send + Sync>;

/// A method registry bound to one owned channel.
pub struct RpcServer {
    transport: SharedMemoryTransport,
    methods: HashMap<String, Handler>,
    channel_name: String,
    /// Flipped by a registered signal handler; checked between dispatch
    /// iterations in [`RpcServer::start`]. Never touched from within the
    /// handler itself beyond this single store, per §4.5 of the design.
    shutdown: Arc<AtomicBool>,
}

impl RpcServer {
    /// Create and own a new channel's kernel objects. Registers the built-in
    /// `__running__` method, which always answers `true`: a successful call
    /// to it is itself the liveness signal, so it does not consult the
    /// shutdown flag.
    pub fn create(channel: &str, buffer_size: usize, timeout: Option<Duration>) -> Result<Self, RpcError> {
        let transport = SharedMemoryTransport::create(channel, buffer_size, timeout)?;
        let mut methods: HashMap<String, Handler> = HashMap::new();
        methods.insert(RUNNING_METHOD.to_string(), Box::new(|_| Ok(Value::Bool(true))));
        Ok(Self {
            transport,
            methods,
            channel_name: channel.to_string(),
            shutdown: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Create and own a new channel using a [`ChannelConfig`] instead of
    /// separate arguments; see [`RpcServer::create`].
    pub fn create_with_config(channel: &str, config: &ChannelConfig) -> Result<Self, RpcError> {
        Self::create(channel, config.buffer_size, config.timeout)
    }

    /// Register a method handler. Panics if `name` is [`RUNNING_METHOD`];
    /// that name is reserved for the built-in liveness probe.
    pub fn register<F>(&mut self, name: &str, handler: F)
    where
        F: Fn(Params) -> Result<Value, RpcError> + Send + Sync + 'static,
    {
        assert_ne!(
            name, RUNNING_METHOD,
            "{RUNNING_METHOD} is reserved and cannot be overridden"
        );
        self.methods.insert(name.to_string(), Box::new(handler));
    }

    /// Register SIGINT/SIGTERM handlers that flip an internal flag checked
    /// between dispatch iterations of [`RpcServer::start`]. The handler
    /// itself performs no work beyond the flag store, satisfying the
    /// constraint that signal handlers may not run arbitrary code.
    pub fn install_signal_handlers(&self) -> Result<(), RpcError> {
        signal_hook::flag::register(signal_hook::consts::SIGINT, Arc::clone(&self.shutdown))
            .map_err(|e| RpcError::Transport(format!("failed to install SIGINT handler: {e}")))?;
        signal_hook::flag::register(signal_hook::consts::SIGTERM, Arc::clone(&self.shutdown))
            .map_err(|e| RpcError::Transport(format!("failed to install SIGTERM handler: {e}")))?;
        Ok(())
    }

    /// Run the dispatch loop until a registered signal fires or
    /// [`RpcServer::request_shutdown`] is called. Each iteration is
    /// [`RpcServer::handle_one`]; a receive timeout is not fatal and simply
    /// loops back around to re-check the shutdown flag.
    pub fn start(&mut self) -> Result<(), RpcError> {
        info!(channel = self.channel_name, "server dispatch loop starting");
        while !self.shutdown.load(Ordering::Relaxed) {
            match self.handle_one() {
                Ok(()) => {}
                Err(e) if e.is_timeout() => continue,
                Err(e) => return Err(e),
            }
        }
        info!(channel = self.channel_name, "server dispatch loop stopping");
        Ok(())
    }

    /// Receive one request, dispatch it, and send the response.
    ///
    /// A decode failure or an unknown method does not abort the loop: both
    /// are reported to the caller as an error response. Only a failure to
    /// *send* the response (including its own timeout) is propagated, since
    /// at that point the channel's state can no longer be trusted.
    pub fn handle_one(&self) -> Result<(), RpcError> {
        let raw = self.transport.receive_request()?;

        let response = match codec::decode_request(&raw) {
            Ok(request) => {
                let result = self.dispatch(&request.method, &request.params);
                match result {
                    Ok(value) => Response::ok(request.request_id, value),
                    Err(e) => Response::failure(request.request_id, e.to_string()),
                }
            }
            Err(e) => {
                warn!(error = %e, "failed to decode request");
                Response::failure(String::new(), format!("Decode: {e}"))
            }
        };

        let encoded = codec::encode_response(&response)?;
        self.transport.send_response(&encoded)
    }

    fn dispatch(&self, method: &str, params: &std::collections::BTreeMap<String, Value>) -> Result<Value, RpcError> {
        match self.methods.get(method) {
            Some(handler) => handler(Params(params)).map_err(|e| {
                error!(method, error = %e, "method handler failed");
                e
            }),
            None => Err(RpcError::Protocol(format!("Unknown method: {method}"))),
        }
    }

    /// Request that [`RpcServer::start`]'s loop exit after its current
    /// iteration, without going through a signal.
    pub fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }

    /// Open a short-lived second transport on the same channel and issue
    /// [`RUNNING_METHOD`] over it, without disturbing the primary
    /// transport's framing state. Used by external tooling (e.g. the
    /// cleanup utility) that wants to check before unlinking.
    ///
    /// A channel whose kernel objects don't exist at all is [`ServerStatus::Closed`].
    /// One that exists and answers `__running__` is [`ServerStatus::Running`].
    /// One that exists but never answers within the probe timeout is
    /// [`ServerStatus::Initialized`]: its objects were created but nothing is
    /// pulling from the request slot, which is indistinguishable from "not
    /// started yet" and "its owner crashed mid-idle" from outside the
    /// process — the crash-recovery cleanup utility unlinks in both cases
    /// regardless. Any other response (a decode failure, a mismatched
    /// request id) is [`ServerStatus::Error`].
    pub fn status(channel: &str, buffer_size: usize) -> ServerStatus {
        let probe_timeout = Some(Duration::from_millis(200));
        let client = match RpcClient::connect(channel, buffer_size, probe_timeout) {
            Ok(client) => client,
            Err(_) => return ServerStatus::Closed,
        };
        match client.call_no_args(RUNNING_METHOD) {
            Ok(Value::Bool(true)) => ServerStatus::Running,
            Err(RpcError::Timeout(_)) => ServerStatus::Initialized,
            _ => ServerStatus::Error,
        }
    }

    /// Unlink all six kernel objects this server owns. Idempotent.
    pub fn close(&self) {
        self.transport.close();
    }
}

/// Result of an external liveness probe against a channel name, without a
/// live `RpcServer` handle to query directly. Mirrors the server's own
/// lifecycle (`INITIALIZED` → `RUNNING` → `CLOSED`, with `ERROR` reachable
/// from either of the first two) as far as an outside observer can tell it
/// apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerStatus {
    /// Kernel objects exist but nothing answered `__running__` in time.
    Initialized,
    /// `__running__` answered `true`: a dispatch loop is actively servicing
    /// this channel.
    Running,
    /// No kernel objects for this channel name were found.
    Closed,
    /// The channel answered, but not with the expected `__running__` result.
    Error,
}
