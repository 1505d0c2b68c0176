//! Handles passed into the extension entry points.
//!
//! Nothing here is process-wide: each handshake hands in its provider,
//! configuration and credentials explicitly. All handles are shared
//! references, so one set of credentials serves many concurrent sessions.

use crate::credentials::{ClientPskCredentials, ServerPskCredentials};
use crate::ticket::{unix_time, TicketCodec};
use crate::PskConfig;
use std::fmt;
use tlspsk_crypto::CryptoProvider;

/// Everything a client needs to build a PSK offer.
#[derive(Clone, Copy)]
pub struct ClientContext<'a> {
    /// Crypto backend
    pub provider: &'a dyn CryptoProvider,

    /// PSK configuration
    pub config: &'a PskConfig,

    /// External PSK to offer, if any
    pub credentials: Option<&'a ClientPskCredentials>,

    /// Current UNIX time in seconds, used for ticket ages
    pub now: u64,
}

impl<'a> ClientContext<'a> {
    /// Context reading the system clock.
    pub fn new(provider: &'a dyn CryptoProvider, config: &'a PskConfig) -> Self {
        Self {
            provider,
            config,
            credentials: None,
            now: unix_time(),
        }
    }

    /// Offer `credentials` as an external PSK.
    pub fn with_credentials(mut self, credentials: &'a ClientPskCredentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Pin the clock, e.g. for tests.
    pub fn at(mut self, now: u64) -> Self {
        self.now = now;
        self
    }

    /// Whether an external PSK is configured.
    pub(crate) fn has_credentials(&self) -> bool {
        self.credentials.is_some_and(ClientPskCredentials::is_usable)
    }
}

impl fmt::Debug for ClientContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientContext")
            .field("config", self.config)
            .field("credentials", &self.credentials)
            .field("now", &self.now)
            .finish_non_exhaustive()
    }
}

/// Everything a server needs to select a PSK.
#[derive(Clone, Copy)]
pub struct ServerContext<'a> {
    /// Crypto backend
    pub provider: &'a dyn CryptoProvider,

    /// PSK configuration
    pub config: &'a PskConfig,

    /// External PSK lookup, if configured
    pub credentials: Option<&'a ServerPskCredentials>,

    /// Session ticket protection, if tickets are issued
    pub tickets: Option<&'a dyn TicketCodec>,
}

impl<'a> ServerContext<'a> {
    /// Context with neither credentials nor tickets.
    pub fn new(provider: &'a dyn CryptoProvider, config: &'a PskConfig) -> Self {
        Self {
            provider,
            config,
            credentials: None,
            tickets: None,
        }
    }

    /// Accept external PSKs from `credentials`.
    pub fn with_credentials(mut self, credentials: &'a ServerPskCredentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Accept session tickets opened by `tickets`.
    pub fn with_tickets(mut self, tickets: &'a dyn TicketCodec) -> Self {
        self.tickets = Some(tickets);
        self
    }

    /// Codec to try candidates with, unless tickets are switched off.
    pub(crate) fn ticket_codec(&self) -> Option<&'a dyn TicketCodec> {
        if self.config.session_tickets {
            self.tickets
        } else {
            None
        }
    }
}

impl fmt::Debug for ServerContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerContext")
            .field("config", self.config)
            .field("credentials", &self.credentials)
            .field("tickets", &self.tickets.is_some())
            .finish_non_exhaustive()
    }
}

/// Context for whichever side the session is.
#[derive(Debug, Clone, Copy)]
pub enum ExtensionContext<'a> {
    /// Client side
    Client(ClientContext<'a>),
    /// Server side
    Server(ServerContext<'a>),
}

impl<'a> From<ClientContext<'a>> for ExtensionContext<'a> {
    fn from(ctx: ClientContext<'a>) -> Self {
        ExtensionContext::Client(ctx)
    }
}

impl<'a> From<ServerContext<'a>> for ExtensionContext<'a> {
    fn from(ctx: ServerContext<'a>) -> Self {
        ExtensionContext::Server(ctx)
    }
}
