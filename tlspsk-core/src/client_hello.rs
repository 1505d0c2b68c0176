//! ClientHello framing (RFC 8446 Section 4.1.2).
//!
//! ```text
//! struct {
//!     ProtocolVersion legacy_version = 0x0303;    /* TLS v1.2 */
//!     Random random;
//!     opaque legacy_session_id<0..32>;
//!     CipherSuite cipher_suites<2..2^16-2>;
//!     opaque legacy_compression_methods<1..2^8-1>;
//!     Extension extensions<8..2^16-1>;
//! } ClientHello;
//! ```
//!
//! Only the framing needed around the PSK extension lives here: writing the
//! fixed fields and opening the extensions block, and locating extensions in
//! a received message.

use crate::cipher::CipherSuite;
use crate::codec::{HandshakeBuilder, LengthMarker, LengthPrefix};
use crate::error::{Error, Result};
use crate::protocol::{ExtensionType, HandshakeType, ProtocolVersion};
use bytes::Buf;

/// Fixed ClientHello fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientHello {
    /// Random bytes (32 bytes)
    pub random: [u8; 32],

    /// Legacy session ID (for middlebox compatibility)
    pub legacy_session_id: Vec<u8>,

    /// Cipher suites offered by client
    pub cipher_suites: Vec<CipherSuite>,
}

/// Open length prefixes of a ClientHello under construction.
#[derive(Debug, Clone, Copy)]
pub struct ClientHelloFrame {
    message: LengthMarker,
    extensions: LengthMarker,
}

impl ClientHello {
    /// Create a new ClientHello.
    pub fn new(random: [u8; 32], cipher_suites: Vec<CipherSuite>) -> Self {
        Self {
            random,
            legacy_session_id: Vec::new(),
            cipher_suites,
        }
    }

    /// Set the legacy session ID (for compatibility mode).
    pub fn with_session_id(mut self, session_id: Vec<u8>) -> Self {
        self.legacy_session_id = session_id;
        self
    }

    /// Write the handshake header and fixed fields, then open the
    /// extensions block. Extensions are appended by the caller.
    pub fn begin(&self, builder: &mut HandshakeBuilder) -> Result<ClientHelloFrame> {
        if self.legacy_session_id.len() > 32 {
            return Err(Error::IllegalParameter("Session ID too long".into()));
        }
        if self.cipher_suites.is_empty() {
            return Err(Error::InvalidConfig("No cipher suites".into()));
        }

        let message = builder.begin_handshake(HandshakeType::ClientHello)?;
        builder.put_u16(ProtocolVersion::Tls12.to_u16())?;
        builder.put_slice(&self.random)?;

        let sid = builder.open(LengthPrefix::U8)?;
        builder.put_slice(&self.legacy_session_id)?;
        builder.close(sid)?;

        let suites = builder.open(LengthPrefix::U16)?;
        for suite in &self.cipher_suites {
            builder.put_u16(suite.to_u16())?;
        }
        builder.close(suites)?;

        // legacy_compression_methods = [null]
        builder.put_u8(1)?;
        builder.put_u8(0)?;

        let extensions = builder.open(LengthPrefix::U16)?;
        Ok(ClientHelloFrame {
            message,
            extensions,
        })
    }
}

impl ClientHelloFrame {
    /// Close the extensions block and the handshake message.
    pub fn end(self, builder: &mut HandshakeBuilder) -> Result<()> {
        builder.close(self.extensions)?;
        builder.close(self.message)
    }
}

/// Extension located inside a received ClientHello.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawExtension<'a> {
    /// Wire extension type
    pub ext_type: u16,
    /// extension_data
    pub data: &'a [u8],
}

/// Read-only view over a complete ClientHello handshake message.
#[derive(Debug, Clone)]
pub struct ClientHelloView<'a> {
    message: &'a [u8],
    extensions: Vec<RawExtension<'a>>,
}

fn take<'a>(data: &mut &'a [u8], n: usize, what: &str) -> Result<&'a [u8]> {
    if data.len() < n {
        return Err(Error::DecodeError(format!("ClientHello truncated in {}", what)));
    }
    let current: &'a [u8] = *data;
    let (head, tail) = current.split_at(n);
    *data = tail;
    Ok(head)
}

impl<'a> ClientHelloView<'a> {
    /// Parse a ClientHello including its 4-byte handshake header.
    pub fn parse(message: &'a [u8]) -> Result<Self> {
        let mut data = message;
        if data.len() < 4 {
            return Err(Error::DecodeError("ClientHello too short".into()));
        }
        if data.get_u8() != HandshakeType::ClientHello.to_u8() {
            return Err(Error::DecodeError("not a ClientHello".into()));
        }
        let body_len = (data.get_u16() as usize) << 8 | data.get_u8() as usize;
        if body_len != data.len() {
            return Err(Error::DecodeError("ClientHello length mismatch".into()));
        }

        take(&mut data, 2 + 32, "version/random")?;
        let sid_len = take(&mut data, 1, "session id")?[0] as usize;
        take(&mut data, sid_len, "session id")?;
        let suites_len = take(&mut data, 2, "cipher suites")?.get_u16() as usize;
        take(&mut data, suites_len, "cipher suites")?;
        let comp_len = take(&mut data, 1, "compression")?[0] as usize;
        take(&mut data, comp_len, "compression")?;

        let mut extensions = Vec::new();
        if !data.is_empty() {
            let exts_len = take(&mut data, 2, "extensions")?.get_u16() as usize;
            let mut exts = take(&mut data, exts_len, "extensions")?;
            if !data.is_empty() {
                return Err(Error::DecodeError("trailing bytes after extensions".into()));
            }
            while !exts.is_empty() {
                let ext_type = take(&mut exts, 2, "extension type")?.get_u16();
                let len = take(&mut exts, 2, "extension length")?.get_u16() as usize;
                let ext_data = take(&mut exts, len, "extension data")?;
                extensions.push(RawExtension {
                    ext_type,
                    data: ext_data,
                });
            }
        }

        Ok(Self {
            message,
            extensions,
        })
    }

    /// The complete message bytes this view was parsed from.
    pub fn message(&self) -> &'a [u8] {
        self.message
    }

    /// Extensions in wire order.
    pub fn extensions(&self) -> &[RawExtension<'a>] {
        &self.extensions
    }

    /// Find an extension by type.
    pub fn extension(&self, ext_type: ExtensionType) -> Option<&'a [u8]> {
        self.extensions
            .iter()
            .find(|e| e.ext_type == ext_type.to_u16())
            .map(|e| e.data)
    }

    /// The pre_shared_key payload, which RFC 8446 requires to be the last
    /// extension of the ClientHello.
    pub fn pre_shared_key(&self) -> Result<Option<&'a [u8]>> {
        let psk = ExtensionType::PreSharedKey.to_u16();
        match self.extensions.iter().position(|e| e.ext_type == psk) {
            None => Ok(None),
            Some(pos) if pos + 1 == self.extensions.len() => Ok(Some(self.extensions[pos].data)),
            Some(_) => Err(Error::IllegalParameter(
                "pre_shared_key is not the last extension".into(),
            )),
        }
    }
}
