//! Per-connection PSK negotiation state.
//!
//! A [`Session`] owns everything the PSK extension reads and writes while a
//! handshake is in flight: the retry transcript, the binder slots, the
//! stored ticket and the flags left by `psk_key_exchange_modes`. The
//! application reads the outcome; only the extension handlers mutate it.
//!
//! ```text
//! NotOffered ──offer built──> Offered ──┬──> Selected(Resumption)
//!                                       ├──> Selected(External)
//!                                       └──> NotSelected
//! ```

use crate::binder::BinderMode;
use crate::error::{Error, Result};
use crate::key_schedule::EarlySecret;
use crate::protocol::ProtocolVersion;
use crate::psk_ke_modes::PskKeyExchangeMode;
use crate::ticket::SessionTicket;
use crate::transcript::HandshakeLog;
use std::fmt;
use tlspsk_crypto::{CryptoProvider, HashAlgorithm};
use zeroize::Zeroizing;

/// Number of binder slots: one resumption PSK and one external PSK.
pub const BINDER_SLOTS: usize = 2;

/// Which end of the handshake this session is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Sends ClientHello
    Client,
    /// Receives ClientHello
    Server,
}

/// PSK negotiation progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PskState {
    /// Nothing offered (client) or nothing received yet (server).
    NotOffered,
    /// The client sent an offer and awaits the server's choice.
    Offered,
    /// A PSK was agreed on; it sits in slot 0.
    Selected(BinderMode),
    /// An offer was made but no PSK was agreed on.
    NotSelected,
}

/// A PSK that was offered (client) or accepted (server).
pub struct BinderSlot {
    /// The PSK itself (resumption PSK or external key)
    pub psk: Zeroizing<Vec<u8>>,

    /// Hash the binder is computed with
    pub prf: HashAlgorithm,

    /// Derived from a session ticket
    pub resumption: bool,

    /// Zero-based position in the offered identity list
    pub idx: u16,
}

impl BinderSlot {
    /// Binder label family of this slot.
    pub fn mode(&self) -> BinderMode {
        BinderMode::from_resumption(self.resumption)
    }
}

impl fmt::Debug for BinderSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BinderSlot")
            .field("prf", &self.prf)
            .field("resumption", &self.resumption)
            .field("idx", &self.idx)
            .finish_non_exhaustive()
    }
}

/// Flags left by the psk_key_exchange_modes extension.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyExchangeModeFlags {
    /// Client: the extension went out.
    pub sent: bool,
    /// Server: the extension came in.
    pub received: bool,
    /// Server: the received list holds no mode we know.
    pub invalid: bool,
    /// Server: the client offers psk_dhe_ke.
    pub dhe_psk: bool,
    /// Server: the client offers psk_ke.
    pub psk_only: bool,
}

/// PSK state of one handshake.
pub struct Session {
    role: Role,
    version: ProtocolVersion,
    log: HandshakeLog,
    retried: bool,
    slots: [Option<BinderSlot>; BINDER_SLOTS],
    state: PskState,
    resumed: bool,
    psk_username: Option<String>,
    ticket: Option<SessionTicket>,
    ticket_sent: bool,
    ke_modes: KeyExchangeModeFlags,
    selected_ke_mode: Option<PskKeyExchangeMode>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("role", &self.role)
            .field("version", &self.version)
            .field("retried", &self.retried)
            .field("slots", &self.slots)
            .field("state", &self.state)
            .field("resumed", &self.resumed)
            .field("psk_username", &self.psk_username)
            .field("has_ticket", &self.ticket.is_some())
            .field("ke_modes", &self.ke_modes)
            .finish_non_exhaustive()
    }
}

impl Session {
    fn new(role: Role, version: ProtocolVersion) -> Self {
        Self {
            role,
            version,
            log: HandshakeLog::new(),
            retried: false,
            slots: [None, None],
            state: PskState::NotOffered,
            resumed: false,
            psk_username: None,
            ticket: None,
            ticket_sent: false,
            ke_modes: KeyExchangeModeFlags::default(),
            selected_ke_mode: None,
        }
    }

    /// Client session offering `max_version` as its highest version.
    pub fn client(max_version: ProtocolVersion) -> Self {
        Self::new(Role::Client, max_version)
    }

    /// Server session that negotiated `version`.
    pub fn server(version: ProtocolVersion) -> Self {
        Self::new(Role::Server, version)
    }

    /// Client session that will try to resume with `ticket`.
    pub fn resuming(max_version: ProtocolVersion, ticket: SessionTicket) -> Self {
        let mut session = Self::client(max_version);
        session.ticket = Some(ticket);
        session
    }

    /// Handshake role.
    pub fn role(&self) -> Role {
        self.role
    }

    /// Highest offered (client) or negotiated (server) version.
    pub fn version(&self) -> ProtocolVersion {
        self.version
    }

    /// Handshake log.
    ///
    /// After a HelloRetryRequest the client's log holds ClientHello1 (or its
    /// `message_hash`) and the HRR; the server's additionally ends with the
    /// ClientHello2 being processed.
    pub fn log(&self) -> &HandshakeLog {
        &self.log
    }

    /// Mutable handshake log, for the driving state machine.
    pub fn log_mut(&mut self) -> &mut HandshakeLog {
        &mut self.log
    }

    /// Note that the server asked for a retry; later binders cover the log.
    pub fn set_hello_retry(&mut self) {
        self.retried = true;
    }

    /// Whether a HelloRetryRequest happened.
    pub fn hello_retried(&self) -> bool {
        self.retried
    }

    /// Log to prefix to binder transcripts, if a retry happened.
    pub(crate) fn retry_log(&self) -> Option<&HandshakeLog> {
        self.retried.then_some(&self.log)
    }

    /// Store a ticket for the next offer.
    pub fn set_ticket(&mut self, ticket: SessionTicket) {
        self.ticket = Some(ticket);
    }

    /// The stored ticket, if still usable.
    pub fn ticket(&self) -> Option<&SessionTicket> {
        self.ticket.as_ref()
    }

    /// Drop the stored ticket.
    pub fn clear_ticket(&mut self) {
        self.ticket = None;
    }

    /// Whether the last offer included a ticket.
    pub fn ticket_sent(&self) -> bool {
        self.ticket_sent
    }

    pub(crate) fn set_ticket_sent(&mut self) {
        self.ticket_sent = true;
    }

    /// Binder slot `index` (0 or 1).
    pub fn slot(&self, index: usize) -> Option<&BinderSlot> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    pub(crate) fn slots_mut(&mut self) -> &mut [Option<BinderSlot>; BINDER_SLOTS] {
        &mut self.slots
    }

    /// The agreed PSK, once selection is final.
    pub fn selected_slot(&self) -> Option<&BinderSlot> {
        match self.state {
            PskState::Selected(_) => self.slot(0),
            _ => None,
        }
    }

    /// Early secret of the agreed PSK.
    pub fn early_secret(&self, provider: &dyn CryptoProvider) -> Result<EarlySecret> {
        let slot = self
            .selected_slot()
            .ok_or_else(|| Error::InternalError("no PSK selected".into()))?;
        EarlySecret::from_slot(provider, slot)
    }

    /// Negotiation progress.
    pub fn psk_state(&self) -> PskState {
        self.state
    }

    pub(crate) fn set_psk_state(&mut self, state: PskState) {
        self.state = state;
    }

    /// Whether a PSK was agreed on.
    pub fn is_psk_selected(&self) -> bool {
        matches!(self.state, PskState::Selected(_))
    }

    /// Whether the handshake resumes an earlier session.
    pub fn is_resumed(&self) -> bool {
        self.resumed
    }

    pub(crate) fn set_resumed(&mut self) {
        self.resumed = true;
    }

    /// External PSK identity the peer authenticated with.
    pub fn psk_username(&self) -> Option<&str> {
        self.psk_username.as_deref()
    }

    pub(crate) fn set_psk_username(&mut self, username: String) {
        self.psk_username = Some(username);
    }

    /// psk_key_exchange_modes flags.
    pub fn key_exchange_modes(&self) -> KeyExchangeModeFlags {
        self.ke_modes
    }

    pub(crate) fn key_exchange_modes_mut(&mut self) -> &mut KeyExchangeModeFlags {
        &mut self.ke_modes
    }

    /// Key exchange mode chosen alongside the PSK (server).
    pub fn selected_key_exchange_mode(&self) -> Option<PskKeyExchangeMode> {
        self.selected_ke_mode
    }

    pub(crate) fn set_selected_key_exchange_mode(&mut self, mode: PskKeyExchangeMode) {
        self.selected_ke_mode = Some(mode);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_defaults() {
        let session = Session::client(ProtocolVersion::Tls13);
        assert_eq!(session.role(), Role::Client);
        assert_eq!(session.psk_state(), PskState::NotOffered);
        assert!(session.slot(0).is_none());
        assert!(session.slot(5).is_none());
        assert!(session.retry_log().is_none());
        assert!(!session.is_resumed());
    }

    #[test]
    fn test_selected_slot_requires_selection() {
        let mut session = Session::server(ProtocolVersion::Tls13);
        session.slots_mut()[0] = Some(BinderSlot {
            psk: Zeroizing::new(vec![1; 32]),
            prf: HashAlgorithm::Sha256,
            resumption: false,
            idx: 0,
        });
        assert!(session.selected_slot().is_none());

        session.set_psk_state(PskState::Selected(BinderMode::External));
        assert_eq!(session.selected_slot().map(|s| s.mode()), Some(BinderMode::External));
    }

    #[test]
    fn test_retry_log_after_hrr() {
        let mut session = Session::client(ProtocolVersion::Tls13);
        session.log_mut().append(b"\x01\x00\x00\x00").unwrap();
        session.set_hello_retry();
        assert_eq!(session.retry_log().map(|l| l.len()), Some(4));
    }

    #[test]
    fn test_debug_hides_psk() {
        let slot = BinderSlot {
            psk: Zeroizing::new(vec![0xab; 4]),
            prf: HashAlgorithm::Sha256,
            resumption: true,
            idx: 1,
        };
        let shown = format!("{:?}", slot);
        assert!(!shown.contains("171"));
        assert!(shown.contains("idx: 1"));
    }
}
