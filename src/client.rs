//! # RPC Client
//!
//! The caller-facing half of the bridge: encodes a method name and keyword
//! arguments into a [`crate::codec::Request`], sends it over a
//! [`SharedMemoryTransport`] opened in the [`Role::Opener`](crate::transport::Role)
//! role, and correlates the response by `request_id`.

use crate::codec::{self, Request, Response};
use crate::config::ChannelConfig;
use crate::error::RpcError;
use crate::transport::SharedMemoryTransport;
use crate::value::Value;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

/// A client bound to one existing channel.
///
/// Every [`RpcClient::call`] is serialized behind an internal lock: the
/// transport's single-slot ring only ever holds one in-flight request per
/// direction, so concurrent callers from multiple threads must queue rather
/// than race for the slot.
pub struct RpcClient {
    transport: SharedMemoryTransport,
    call_lock: Mutex<()>,
    closed: AtomicBool,
}

impl RpcClient {
    /// Attach to a channel a server has already created.
    pub fn connect(channel: &str, buffer_size: usize, timeout: Option<Duration>) -> Result<Self, RpcError> {
        let transport = SharedMemoryTransport::open(channel, buffer_size, timeout)?;
        Ok(Self {
            transport,
            call_lock: Mutex::new(()),
            closed: AtomicBool::new(false),
        })
    }

    /// Attach to a channel using a [`ChannelConfig`] instead of separate
    /// arguments; see [`RpcClient::connect`].
    pub fn connect_with_config(channel: &str, config: &ChannelConfig) -> Result<Self, RpcError> {
        Self::connect(channel, config.buffer_size, config.timeout)
    }

    /// Invoke `method` with keyword arguments `params` and wait for the
    /// matching response.
    ///
    /// A decode failure, an id mismatch, or a remote-reported error are all
    /// distinct [`RpcError`] variants: [`RpcError::Serialization`],
    /// [`RpcError::Protocol`], and [`RpcError::RemoteMethod`] respectively.
    pub fn call(&self, method: &str, params: BTreeMap<String, Value>) -> Result<Value, RpcError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(RpcError::State("client is closed".to_string()));
        }

        let _guard = self.call_lock.lock().unwrap();

        let request_id = Uuid::new_v4().to_string();
        let request = Request {
            request_id: request_id.clone(),
            method: method.to_string(),
            params,
        };

        debug!(%request_id, method, "sending request");
        let encoded = codec::encode_request(&request)?;
        self.transport.send_request(&encoded)?;

        let raw = self.transport.receive_response()?;
        let response = codec::decode_response(&raw)?;

        if response.request_id != request_id {
            return Err(RpcError::Protocol(format!(
                "response id {} does not match request id {request_id}",
                response.request_id
            )));
        }

        match response.into_result() {
            Ok(value) => Ok(value),
            Err(message) => Err(RpcError::RemoteMethod(message)),
        }
    }

    /// Convenience for `call` with no arguments.
    pub fn call_no_args(&self, method: &str) -> Result<Value, RpcError> {
        self.call(method, BTreeMap::new())
    }

    /// Probe whether the server is still accepting requests by invoking the
    /// reserved `__running__` method.
    pub fn is_server_running(&self) -> bool {
        matches!(self.call_no_args("__running__"), Ok(Value::Bool(true)))
    }

    /// Close this client's handle. Does not unlink the channel; only the
    /// creating server does that. Idempotent.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        warn_if_in_flight(&self.call_lock);
        self.transport.close();
    }
}

fn warn_if_in_flight(lock: &Mutex<()>) {
    if lock.try_lock().is_err() {
        warn!("closing client while a call is in flight");
    }
}

impl Drop for RpcClient {
    fn drop(&mut self) {
        self.close();
    }
}

trait ResponseExt {
    fn into_result(self) -> Result<Value, String>;
}

impl ResponseExt for Response {
    fn into_result(self) -> Result<Value, String> {
        match self.error {
            Some(message) => Err(message),
            None => Ok(self.result.unwrap_or(Value::Null)),
        }
    }
}
