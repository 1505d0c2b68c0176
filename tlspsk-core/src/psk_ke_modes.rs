//! psk_key_exchange_modes extension (RFC 8446 Section 4.2.9).
//!
//! ```text
//! enum { psk_ke(0), psk_dhe_ke(1), (255) } PskKeyExchangeMode;
//!
//! struct {
//!     PskKeyExchangeMode ke_modes<1..255>;
//! } PskKeyExchangeModes;
//! ```
//!
//! A client that offers pre_shared_key must send this extension first; the
//! PSK handlers check the flags it leaves on the session.

use crate::codec::{HandshakeBuilder, LengthPrefix};
use crate::context::{ClientContext, ServerContext};
use crate::error::{Error, Result};
use crate::protocol::ExtensionType;
use crate::session::{Role, Session};
use crate::ExtensionOutcome;

/// PSK key exchange mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PskKeyExchangeMode {
    /// PSK-only key exchange (no (EC)DHE)
    PskKe = 0,
    /// PSK with (EC)DHE key exchange (recommended for forward secrecy)
    PskDheKe = 1,
}

impl PskKeyExchangeMode {
    /// Convert from u8
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(PskKeyExchangeMode::PskKe),
            1 => Some(PskKeyExchangeMode::PskDheKe),
            _ => None,
        }
    }

    /// Convert to u8
    pub const fn to_u8(self) -> u8 {
        self as u8
    }
}

/// Decoded psk_key_exchange_modes payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PskKeyExchangeModesExtension {
    /// Known modes, in wire order
    pub modes: Vec<PskKeyExchangeMode>,
}

impl PskKeyExchangeModesExtension {
    /// Create a new PskKeyExchangeModes extension
    pub fn new(modes: Vec<PskKeyExchangeMode>) -> Result<Self> {
        if modes.is_empty() || modes.len() > 255 {
            return Err(Error::InvalidConfig(
                "PskKeyExchangeModes needs 1..255 modes".into(),
            ));
        }
        Ok(Self { modes })
    }

    /// Append the payload (without the extension header).
    pub fn encode(&self, builder: &mut HandshakeBuilder) -> Result<()> {
        let list = builder.open(LengthPrefix::U8)?;
        for mode in &self.modes {
            builder.put_u8(mode.to_u8())?;
        }
        builder.close(list)
    }

    /// Decode a payload. Unknown modes are dropped, so the result may hold
    /// no modes at all.
    pub fn decode(data: &[u8]) -> Result<Self> {
        let (&len, modes) = data
            .split_first()
            .ok_or_else(|| Error::DecodeError("PskKeyExchangeModes extension is empty".into()))?;
        if len == 0 || modes.len() != len as usize {
            return Err(Error::DecodeError(
                "Invalid PskKeyExchangeModes length".into(),
            ));
        }
        Ok(Self {
            modes: modes
                .iter()
                .filter_map(|&m| PskKeyExchangeMode::from_u8(m))
                .collect(),
        })
    }

    /// Whether `mode` is listed.
    pub fn contains(&self, mode: PskKeyExchangeMode) -> bool {
        self.modes.contains(&mode)
    }
}

fn write_extension(ext: &PskKeyExchangeModesExtension, builder: &mut HandshakeBuilder) -> Result<()> {
    let marker = builder.begin_extension(ExtensionType::PskKeyExchangeModes)?;
    ext.encode(builder)?;
    builder.close(marker)
}

/// Client: write the configured modes and remember that they went out.
pub fn client_encode(
    session: &mut Session,
    ctx: &ClientContext<'_>,
    builder: &mut HandshakeBuilder,
) -> Result<ExtensionOutcome> {
    if session.role() != Role::Client {
        return Err(Error::InternalError("client encode on a server session".into()));
    }
    if !session.version().supports_psk_extension() {
        return Ok(ExtensionOutcome::NotApplicable);
    }
    let have_tickets = ctx.config.session_tickets && session.ticket().is_some();
    if !have_tickets && !ctx.has_credentials() {
        return Ok(ExtensionOutcome::NotApplicable);
    }

    let ext = PskKeyExchangeModesExtension::new(ctx.config.key_exchange_modes.clone())?;
    let checkpoint = builder.checkpoint();
    let start = builder.len();
    if let Err(e) = write_extension(&ext, builder) {
        builder.rollback(checkpoint);
        return Err(e);
    }

    session.key_exchange_modes_mut().sent = true;
    Ok(ExtensionOutcome::Written(builder.len() - start))
}

/// Server: record which modes the client supports.
///
/// A list with no known mode is not an error; it leaves the session marked
/// so the PSK extension is ignored.
pub fn server_decode(
    session: &mut Session,
    ctx: &ServerContext<'_>,
    data: &[u8],
) -> Result<ExtensionOutcome> {
    if session.role() != Role::Server {
        return Err(Error::InternalError("server decode on a client session".into()));
    }
    if !session.version().supports_psk_extension() {
        return Ok(ExtensionOutcome::NotApplicable);
    }

    let ext = PskKeyExchangeModesExtension::decode(data)?;
    let accepted = &ctx.config.key_exchange_modes;
    let flags = session.key_exchange_modes_mut();
    flags.received = true;
    flags.dhe_psk = ext.contains(PskKeyExchangeMode::PskDheKe)
        && accepted.contains(&PskKeyExchangeMode::PskDheKe);
    flags.psk_only = ext.contains(PskKeyExchangeMode::PskKe)
        && accepted.contains(&PskKeyExchangeMode::PskKe);
    flags.invalid = !flags.dhe_psk && !flags.psk_only;

    tracing::debug!(
        "received psk_key_exchange_modes: dhe_psk={} psk_only={}",
        flags.dhe_psk,
        flags.psk_only
    );
    Ok(ExtensionOutcome::Processed)
}
