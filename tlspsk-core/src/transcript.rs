//! Handshake transcript log and binder transcript reconstruction.
//!
//! A PSK binder is a MAC over `Transcript-Hash(Truncate(ClientHello))`: the
//! ClientHello up to and including the PSK identity list, with every length
//! field already counting the binder list that follows (RFC 8446 Section
//! 4.2.11.2). After a HelloRetryRequest the first ClientHello and the HRR
//! precede it.
//!
//! The client reconstructs that byte string from the message it is still
//! building; the server truncates the message it received. Both must yield
//! identical bytes for the binder to verify.

use crate::codec::HandshakeBuilder;
use crate::error::{Error, Result};
use crate::key_schedule;
use crate::protocol::HandshakeType;
use tlspsk_crypto::{CryptoProvider, HashAlgorithm};

/// Size of the `binders_len` prefix in front of the binder list.
pub const BINDERS_LEN_PREFIX: usize = 2;

/// Append-only record of the handshake messages of one session.
///
/// Each entry is a complete handshake message including its 4-byte header.
#[derive(Debug, Clone, Default)]
pub struct HandshakeLog {
    bytes: Vec<u8>,
    message_count: usize,
}

impl HandshakeLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a handshake message.
    pub fn append(&mut self, message: &[u8]) -> Result<()> {
        self.bytes.try_reserve(message.len())?;
        self.bytes.extend_from_slice(message);
        self.message_count += 1;
        Ok(())
    }

    /// All logged bytes in order.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Total size of all messages in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Check if the log is empty.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Get the number of messages in the log.
    pub fn message_count(&self) -> usize {
        self.message_count
    }

    /// `Transcript-Hash` of everything logged so far.
    pub fn hash(&self, provider: &dyn CryptoProvider, prf: HashAlgorithm) -> Result<Vec<u8>> {
        key_schedule::transcript_hash(provider, prf, &self.bytes)
    }

    /// Replace the log with the synthetic `message_hash` message used after a
    /// HelloRetryRequest (RFC 8446 Section 4.4.1):
    ///
    /// ```text
    /// message_hash (254) || 00 00 Hash.length || Hash(ClientHello1)
    /// ```
    ///
    /// Must be called when the log holds exactly ClientHello1.
    pub fn collapse_to_message_hash(
        &mut self,
        provider: &dyn CryptoProvider,
        prf: HashAlgorithm,
    ) -> Result<()> {
        if self.message_count != 1 {
            return Err(Error::InternalError(format!(
                "message_hash needs exactly one logged message, have {}",
                self.message_count
            )));
        }
        let hash = self.hash(provider, prf)?;
        let mut synthetic = Vec::new();
        synthetic.try_reserve_exact(4 + hash.len())?;
        synthetic.extend_from_slice(&[HandshakeType::MessageHash.to_u8(), 0, 0, hash.len() as u8]);
        synthetic.extend_from_slice(&hash);
        self.bytes = synthetic;
        Ok(())
    }
}

/// Client side: bytes to MAC for the ClientHello still being built.
///
/// `pending` holds the in-progress ClientHello starting at its handshake
/// header and ending right after the identity list. Its open length fields
/// are resolved as if the `binders_len` prefix and `binder_list_len` bytes of
/// binders were present, and its type byte is forced to ClientHello.
/// `retry_log` is the logged ClientHello1 + HelloRetryRequest when a retry
/// happened.
pub fn client_binder_transcript(
    retry_log: Option<&HandshakeLog>,
    pending: &HandshakeBuilder,
    binder_list_len: usize,
) -> Result<Vec<u8>> {
    if pending.len() < 4 {
        return Err(Error::InternalError(
            "binder transcript requested before the handshake header".into(),
        ));
    }
    let mut hello = pending.render_pending(BINDERS_LEN_PREFIX + binder_list_len)?;
    hello[0] = HandshakeType::ClientHello.to_u8();

    match retry_log {
        Some(log) => {
            let mut out = Vec::new();
            out.try_reserve_exact(log.len() + hello.len())?;
            out.extend_from_slice(log.bytes());
            out.extend_from_slice(&hello);
            Ok(out)
        },
        None => Ok(hello),
    }
}

/// Server side: bytes to MAC for a received ClientHello.
///
/// `client_hello` is the complete message as received (header included);
/// its trailing `binders_len` prefix and binder list are cut off. When a
/// retry happened `log` is the server's handshake log, which already ends
/// with `client_hello`; everything before it is prefixed.
pub fn server_binder_transcript(
    log: Option<&HandshakeLog>,
    client_hello: &[u8],
    binder_list_len: usize,
) -> Result<Vec<u8>> {
    let trailing = binder_list_len
        .checked_add(BINDERS_LEN_PREFIX)
        .ok_or_else(|| Error::IllegalParameter("binder list length overflow".into()))?;
    if client_hello.len() <= trailing {
        return Err(Error::IllegalParameter(
            "ClientHello shorter than its binder list".into(),
        ));
    }
    let truncated = &client_hello[..client_hello.len() - trailing];

    let prefix: &[u8] = match log {
        Some(log) => {
            if log.len() <= client_hello.len() {
                return Err(Error::IllegalParameter(
                    "handshake log shorter than the retried ClientHello".into(),
                ));
            }
            &log.bytes()[..log.len() - client_hello.len()]
        },
        None => &[],
    };

    let mut out = Vec::new();
    out.try_reserve_exact(prefix.len() + truncated.len())?;
    out.extend_from_slice(prefix);
    out.extend_from_slice(truncated);
    Ok(out)
}
