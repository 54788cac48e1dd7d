//! # Error Taxonomy
//!
//! This module defines the discriminated error kinds surfaced by every layer of
//! the bridge: IPC primitives, the shared-memory transport, the codec, and the
//! RPC client/server. Callers match on [`RpcError`] variants to decide whether
//! to retry (`Timeout`), reconnect (`Transport`, `State`), or simply surface the
//! failure to their own caller (`RemoteMethod`, `Protocol`, `Serialization`).
//!
//! Unlike the ad hoc `anyhow::Error` used for glue code (CLI entry points,
//! tests), every operation that a client or server can observe returns
//! `Result<T, RpcError>` so the kind survives across the API boundary.

use thiserror::Error;

/// The distinct, observable error kinds for the shared-memory RPC bridge.
///
/// Each variant carries a human-readable message. Kinds are chosen so a caller
/// can discriminate mechanically:
/// - `Timeout` never indicates data corruption; the slot is left unchanged.
/// - `Transport` covers creation/open/map/framing failures that are not timeouts.
/// - `Protocol` covers correlation mismatches and malformed records.
/// - `Serialization` covers encode/decode failures for unsupported values.
/// - `RemoteMethod` carries the remote method's own failure message.
/// - `State` covers operations attempted on a closed endpoint.
#[derive(Debug, Error)]
pub enum RpcError {
    /// Creation/open/map failure, invalid framing, message-too-large, or any
    /// other non-timeout primitive failure.
    #[error("Transport: {0}")]
    Transport(String),

    /// A bounded semaphore wait expired.
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Request/response correlation mismatch, or a malformed record after
    /// codec decode.
    #[error("Protocol: {0}")]
    Protocol(String),

    /// Encode or decode failure for a well-formed record containing
    /// unsupported values.
    #[error("Serialization: {0}")]
    Serialization(String),

    /// The remote method raised; carries the remote kind+message string.
    #[error("RemoteMethod: {0}")]
    RemoteMethod(String),

    /// Operation attempted on a closed endpoint.
    #[error("State: {0}")]
    State(String),
}

impl RpcError {
    /// True if this error indicates a bounded wait expired rather than a
    /// genuine transport failure.
    pub fn is_timeout(&self) -> bool {
        matches!(self, RpcError::Timeout(_))
    }
}

pub type Result<T> = std::result::Result<T, RpcError>;
