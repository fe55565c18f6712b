//! Serial link between the UI and authority controllers.
//!
//! Every exchange is a stop-and-wait round: the receiving side sends the
//! READY token (`0xFF`), the sending side waits for it and then writes one
//! field. Fields are single bytes ([`SystemState`](twinlock_core::SystemState),
//! [`UserOption`](twinlock_core::UserOption),
//! [`AuthResult`](twinlock_core::AuthResult),
//! [`GateStatus`](twinlock_core::GateStatus)) or a `#`-terminated credential
//! payload framed by [`PayloadCodec`].
//!
//! # Example
//!
//! ```
//! use twinlock_core::SystemState;
//! use twinlock_protocol::{Link, LinkConfig};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> twinlock_protocol::Result<()> {
//! let (ui, authority) = tokio::io::duplex(64);
//! let mut ui = Link::new(ui, LinkConfig::default()).with_name("ui");
//! let mut authority = Link::new(authority, LinkConfig::default()).with_name("authority");
//!
//! let sender = tokio::spawn(async move {
//!     authority.send_state_on_ready(SystemState::NewPassword).await
//! });
//!
//! assert_eq!(ui.request_state().await?, SystemState::NewPassword);
//! sender.await.unwrap()?;
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod error;
pub mod link;

pub use codec::PayloadCodec;
pub use error::{ProtocolError, Result};
pub use link::{Link, LinkConfig};
