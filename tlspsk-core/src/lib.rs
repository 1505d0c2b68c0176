//! # tlspsk-core
//!
//! The TLS 1.3 `pre_shared_key` extension (RFC 8446 Section 4.2.11) and the
//! pieces it needs around it.
//!
//! A client offers up to two PSKs per handshake: a resumption PSK derived
//! from a session ticket, and an external PSK configured out of band. Each
//! identity carries a binder, an HMAC over the ClientHello as it looks
//! before the binders, which proves possession of the key. The server picks
//! the first identity it can resolve, verifies that identity's binder and
//! answers with its index.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │   handler::encode / handler::decode     │
//! └──────────┬───────────────────┬──────────┘
//!            │                   │
//! ┌──────────▼─────────┐ ┌───────▼──────────┐
//! │  client (offer,    │ │ server (resolve, │
//! │  selection)        │ │ verify, select)  │
//! └──────────┬─────────┘ └───────┬──────────┘
//!            │                   │
//! ┌──────────▼───────────────────▼──────────┐
//! │  psk codec · binder · transcript ·      │
//! │  key schedule · tickets · credentials   │
//! └─────────────────┬───────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────┐
//! │      tlspsk-crypto (trait interface)    │
//! └─────────────────────────────────────────┘
//! ```
//!
//! Soft outcomes (nothing to offer, stale ticket, unknown identity) are
//! reported as [`ExtensionOutcome::NotApplicable`]. Anything returned as an
//! [`Error`] must abort the handshake; [`Error::alert`] names the alert.

#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub,
    unused_qualifications
)]
#![forbid(unsafe_code)]

// Re-export crypto interface
pub use tlspsk_crypto;

pub mod binder;
pub mod cipher;
pub mod client;
pub mod client_hello;
pub mod codec;
pub mod context;
pub mod credentials;
pub mod error;
pub mod handler;
pub mod key_schedule;
pub mod protocol;
pub mod psk;
pub mod psk_ke_modes;
pub mod resolver;
pub mod server;
pub mod session;
pub mod ticket;
pub mod ticket_encryption;
pub mod transcript;

// Re-exports
pub use binder::BinderMode;
pub use context::{ClientContext, ExtensionContext, ServerContext};
pub use credentials::{ClientPskCredentials, CredentialStore, ExternalPskStore, ServerPskCredentials};
pub use error::{AlertDescription, Error, Result};
pub use protocol::ProtocolVersion;
pub use psk_ke_modes::PskKeyExchangeMode;
pub use session::{PskState, Role, Session};
pub use ticket::{SessionTicket, TicketCodec, TicketRecord};
pub use ticket_encryption::TicketEncryptor;

/// What an extension entry point did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtensionOutcome {
    /// Nothing to send, or the received extension was ignored.
    NotApplicable,
    /// Bytes appended to the outgoing message, extension header included.
    Written(usize),
    /// The received extension was accepted.
    Processed,
}

/// PSK configuration.
///
/// # Example
///
/// ```rust
/// use tlspsk_core::{PskConfig, PskKeyExchangeMode};
///
/// let config = PskConfig::builder()
///     .with_key_exchange_modes(&[PskKeyExchangeMode::PskDheKe, PskKeyExchangeMode::PskKe])
///     .with_session_tickets(false)
///     .build()
///     .unwrap();
/// assert!(!config.session_tickets);
/// ```
#[derive(Debug, Clone)]
pub struct PskConfig {
    /// Offer and accept session tickets
    pub session_tickets: bool,

    /// Key exchange modes sent (client) or accepted (server)
    pub key_exchange_modes: Vec<PskKeyExchangeMode>,

    /// Longest identity the server looks up as an external PSK username
    pub max_identity_len: usize,

    /// Treat a `selected_identity` matching no offered PSK as illegal
    /// instead of ignoring it (client only)
    pub require_selected_match: bool,
}

impl Default for PskConfig {
    fn default() -> Self {
        Self {
            session_tickets: true,
            key_exchange_modes: vec![PskKeyExchangeMode::PskDheKe],
            max_identity_len: 128,
            require_selected_match: false,
        }
    }
}

impl PskConfig {
    /// Create a new configuration builder.
    pub fn builder() -> PskConfigBuilder {
        PskConfigBuilder::default()
    }
}

/// Builder for [`PskConfig`].
#[derive(Debug, Default)]
pub struct PskConfigBuilder {
    config: PskConfig,
}

impl PskConfigBuilder {
    /// Enable or disable session tickets.
    pub fn with_session_tickets(mut self, enable: bool) -> Self {
        self.config.session_tickets = enable;
        self
    }

    /// Set the key exchange modes.
    pub fn with_key_exchange_modes(mut self, modes: &[PskKeyExchangeMode]) -> Self {
        self.config.key_exchange_modes = modes.to_vec();
        self
    }

    /// Set the longest external PSK username.
    pub fn with_max_identity_len(mut self, len: usize) -> Self {
        self.config.max_identity_len = len;
        self
    }

    /// Reject a selected index that matches no offered PSK.
    pub fn with_selected_match_required(mut self, required: bool) -> Self {
        self.config.require_selected_match = required;
        self
    }

    /// Build the configuration.
    pub fn build(self) -> Result<PskConfig> {
        let modes = &self.config.key_exchange_modes;
        if modes.is_empty() || modes.len() > 255 {
            return Err(Error::InvalidConfig(
                "Key exchange modes must list 1..255 entries".into(),
            ));
        }

        if self.config.max_identity_len == 0
            || self.config.max_identity_len > credentials::MAX_IDENTITY_LEN
        {
            return Err(Error::InvalidConfig(
                "Maximum identity length must be in 1..=65535".into(),
            ));
        }

        Ok(self.config)
    }
}
