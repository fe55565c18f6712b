//! Stop-and-wait handshake over a byte stream.
//!
//! The side about to receive announces it with the READY token; the side
//! about to send blocks until it has seen that token. Each round moves one
//! state byte and optionally one payload, so the two controllers never need
//! a shared clock:
//!
//! ```text
//!   receiver                       sender
//!   ────────                       ──────
//!   send_token()   ── 0xFF ──►     await_token()
//!   receive_*()    ◄── data ──     send_*()
//! ```
//!
//! Waits are unbounded unless [`LinkConfig::wait_timeout`] is set, in which
//! case an expired wait becomes [`ProtocolError::Stall`]. A dropped byte on
//! an unbounded link deadlocks both sides; the wire is assumed reliable.

use crate::{
    codec::PayloadCodec,
    error::{ProtocolError, Result},
};
use bytes::{Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use std::{future::Future, time::Duration};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::codec::{Decoder, Encoder};
use tracing::{debug, trace, warn};
use twinlock_core::{AuthResult, GateStatus, SystemState, UserOption, constants::READY_TOKEN};

/// Link configuration.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use twinlock_protocol::LinkConfig;
///
/// // Default: unbounded waits, as on the wired link
/// assert!(LinkConfig::default().wait_timeout.is_none());
///
/// let hardened = LinkConfig::bounded(Duration::from_millis(500));
/// assert_eq!(hardened.wait_timeout, Some(Duration::from_millis(500)));
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkConfig {
    /// Upper bound for any single wait; `None` waits forever.
    #[serde(default)]
    pub wait_timeout: Option<Duration>,
}

impl LinkConfig {
    pub fn bounded(wait_timeout: Duration) -> Self {
        Self {
            wait_timeout: Some(wait_timeout),
        }
    }
}

/// One end of the serial link.
#[derive(Debug)]
pub struct Link<S> {
    stream: S,
    codec: PayloadCodec,
    config: LinkConfig,
    name: &'static str,
}

impl<S> Link<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S, config: LinkConfig) -> Self {
        Self {
            stream,
            codec: PayloadCodec::new(),
            config,
            name: "link",
        }
    }

    /// Label used in log output.
    pub fn with_name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    pub fn with_codec(mut self, codec: PayloadCodec) -> Self {
        self.codec = codec;
        self
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    pub fn into_inner(self) -> S {
        self.stream
    }

    async fn bounded<T>(
        timeout: Option<Duration>,
        name: &'static str,
        waiting_for: &'static str,
        operation: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        match timeout {
            None => operation.await,
            Some(limit) => match tokio::time::timeout(limit, operation).await {
                Ok(result) => result,
                Err(_) => {
                    warn!(
                        link = name,
                        waited_ms = limit.as_millis() as u64,
                        "Link stalled waiting for {waiting_for}"
                    );
                    Err(ProtocolError::stall(limit.as_millis() as u64, waiting_for))
                }
            },
        }
    }

    // ------------------------------------------------------------------------
    // Raw bytes
    // ------------------------------------------------------------------------

    /// Write one byte and flush.
    pub async fn send_byte(&mut self, byte: u8) -> Result<()> {
        trace!(link = self.name, "tx 0x{byte:02X}");
        Self::bounded(
            self.config.wait_timeout,
            self.name,
            "write",
            write_all(&mut self.stream, &[byte]),
        )
        .await
    }

    /// Block until one byte arrives.
    pub async fn receive_byte(&mut self) -> Result<u8> {
        let byte = Self::bounded(
            self.config.wait_timeout,
            self.name,
            "a byte",
            read_byte(&mut self.stream),
        )
        .await?;
        trace!(link = self.name, "rx 0x{byte:02X}");
        Ok(byte)
    }

    // ------------------------------------------------------------------------
    // Handshake
    // ------------------------------------------------------------------------

    /// Announce readiness to receive.
    pub async fn send_token(&mut self) -> Result<()> {
        self.send_byte(READY_TOKEN).await
    }

    /// Block until the READY token arrives, discarding anything before it.
    pub async fn await_token(&mut self) -> Result<()> {
        Self::bounded(
            self.config.wait_timeout,
            self.name,
            "READY token",
            read_until_token(&mut self.stream, self.name),
        )
        .await
    }

    // ------------------------------------------------------------------------
    // Typed single-byte fields
    // ------------------------------------------------------------------------

    pub async fn send_state(&mut self, state: SystemState) -> Result<()> {
        self.send_byte(state.to_u8()).await
    }

    /// Receive a state byte.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Decode`] for bytes outside the state range.
    pub async fn receive_state(&mut self) -> Result<SystemState> {
        let byte = self.receive_byte().await?;
        Ok(SystemState::from_u8(byte)?)
    }

    pub async fn send_option(&mut self, option: UserOption) -> Result<()> {
        self.send_byte(option.to_u8()).await
    }

    pub async fn receive_option(&mut self) -> Result<UserOption> {
        let byte = self.receive_byte().await?;
        Ok(UserOption::from_u8(byte)?)
    }

    pub async fn send_auth_result(&mut self, result: AuthResult) -> Result<()> {
        self.send_byte(result.to_u8()).await
    }

    pub async fn receive_auth_result(&mut self) -> Result<AuthResult> {
        let byte = self.receive_byte().await?;
        Ok(AuthResult::from_u8(byte)?)
    }

    pub async fn send_gate_status(&mut self, status: GateStatus) -> Result<()> {
        self.send_byte(status.to_u8()).await
    }

    pub async fn receive_gate_status(&mut self) -> Result<GateStatus> {
        let byte = self.receive_byte().await?;
        Ok(GateStatus::from_u8(byte)?)
    }

    // ------------------------------------------------------------------------
    // Payloads
    // ------------------------------------------------------------------------

    /// Send `payload` followed by the terminator.
    ///
    /// The receiver must already have signalled READY; see
    /// [`Link::send_payload_on_ready`].
    pub async fn send_payload(&mut self, payload: &[u8]) -> Result<()> {
        let mut frame = BytesMut::with_capacity(payload.len() + 1);
        self.codec.encode(payload, &mut frame)?;

        trace!(link = self.name, len = payload.len(), "tx payload");
        Self::bounded(
            self.config.wait_timeout,
            self.name,
            "write",
            write_all(&mut self.stream, &frame),
        )
        .await
    }

    /// Receive bytes up to and including the terminator.
    ///
    /// Returns at most the codec's `max_payload` bytes preceding the
    /// terminator.
    pub async fn receive_payload(&mut self) -> Result<Bytes> {
        let payload = Self::bounded(
            self.config.wait_timeout,
            self.name,
            "payload",
            read_payload(&mut self.stream, &mut self.codec),
        )
        .await?;

        trace!(link = self.name, len = payload.len(), "rx payload");
        Ok(payload)
    }

    // ------------------------------------------------------------------------
    // Rounds
    // ------------------------------------------------------------------------

    /// Wait for READY, then send the state.
    pub async fn send_state_on_ready(&mut self, state: SystemState) -> Result<()> {
        self.await_token().await?;
        self.send_state(state).await
    }

    /// Send READY, then receive the state.
    pub async fn request_state(&mut self) -> Result<SystemState> {
        self.send_token().await?;
        self.receive_state().await
    }

    /// Wait for READY, then send the payload.
    pub async fn send_payload_on_ready(&mut self, payload: &[u8]) -> Result<()> {
        self.await_token().await?;
        self.send_payload(payload).await
    }

    /// Send READY, then receive a payload.
    pub async fn request_payload(&mut self) -> Result<Bytes> {
        self.send_token().await?;
        self.receive_payload().await
    }

    pub async fn send_option_on_ready(&mut self, option: UserOption) -> Result<()> {
        self.await_token().await?;
        self.send_option(option).await
    }

    /// Send READY, then receive the raw option byte.
    ///
    /// Returned undecoded so the caller can decide how to handle values
    /// outside the option range.
    pub async fn request_option_byte(&mut self) -> Result<u8> {
        self.send_token().await?;
        self.receive_byte().await
    }

    pub async fn send_auth_result_on_ready(&mut self, result: AuthResult) -> Result<()> {
        self.await_token().await?;
        self.send_auth_result(result).await
    }

    pub async fn request_auth_result(&mut self) -> Result<AuthResult> {
        self.send_token().await?;
        self.receive_auth_result().await
    }

    pub async fn send_gate_status_on_ready(&mut self, status: GateStatus) -> Result<()> {
        self.await_token().await?;
        self.send_gate_status(status).await
    }

    pub async fn request_gate_status(&mut self) -> Result<GateStatus> {
        self.send_token().await?;
        self.receive_gate_status().await
    }
}

async fn write_all<S: AsyncWrite + Unpin>(stream: &mut S, bytes: &[u8]) -> Result<()> {
    stream.write_all(bytes).await?;
    stream.flush().await?;
    Ok(())
}

async fn read_byte<S: AsyncRead + Unpin>(stream: &mut S) -> Result<u8> {
    Ok(stream.read_u8().await?)
}

async fn read_until_token<S: AsyncRead + Unpin>(stream: &mut S, name: &'static str) -> Result<()> {
    loop {
        let byte = stream.read_u8().await?;
        if byte == READY_TOKEN {
            trace!(link = name, "rx READY");
            return Ok(());
        }
        debug!(link = name, "Discarding 0x{byte:02X} while waiting for READY");
    }
}

async fn read_payload<S: AsyncRead + Unpin>(
    stream: &mut S,
    codec: &mut PayloadCodec,
) -> Result<Bytes> {
    let mut buffer = BytesMut::new();
    loop {
        buffer.extend_from_slice(&[stream.read_u8().await?]);
        if let Some(payload) = codec.decode(&mut buffer)? {
            return Ok(payload);
        }
    }
}
