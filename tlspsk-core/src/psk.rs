//! pre_shared_key extension wire format (RFC 8446 Section 4.2.11).
//!
//! ```text
//! struct {
//!     opaque identity<1..2^16-1>;
//!     uint32 obfuscated_ticket_age;
//! } PskIdentity;
//!
//! opaque PskBinderEntry<32..255>;
//!
//! struct {
//!     PskIdentity identities<7..2^16-1>;
//!     PskBinderEntry binders<33..2^16-1>;
//! } OfferedPsks;
//!
//! struct {
//!     select (Handshake.msg_type) {
//!         case client_hello: OfferedPsks;
//!         case server_hello: uint16 selected_identity;
//!     };
//! } PreSharedKeyExtension;
//! ```
//!
//! The server side never materialises the offer: [`PskExtensionParser`]
//! validates the payload once and then hands out borrowed candidates and
//! binders.

use crate::binder::{MAX_BINDER_LEN, MIN_BINDER_LEN};
use crate::codec::{HandshakeBuilder, LengthPrefix};
use crate::credentials::MAX_IDENTITY_LEN;
use crate::error::{Error, Result};
use bytes::Buf;

/// PSK identity sent by client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PskIdentity {
    /// Opaque identity value
    pub identity: Vec<u8>,
    /// Obfuscated ticket age
    pub obfuscated_ticket_age: u32,
}

impl PskIdentity {
    /// Create a new PSK identity
    pub fn new(identity: Vec<u8>, obfuscated_ticket_age: u32) -> Self {
        Self {
            identity,
            obfuscated_ticket_age,
        }
    }

    /// Append to `builder`.
    pub fn encode(&self, builder: &mut HandshakeBuilder) -> Result<()> {
        write_identity(builder, &self.identity, self.obfuscated_ticket_age)
    }

    /// Bytes this identity occupies on the wire.
    pub fn encoded_len(&self) -> usize {
        2 + self.identity.len() + 4
    }
}

/// Write one `PskIdentity` entry.
pub(crate) fn write_identity(
    builder: &mut HandshakeBuilder,
    identity: &[u8],
    obfuscated_ticket_age: u32,
) -> Result<()> {
    if identity.is_empty() || identity.len() > MAX_IDENTITY_LEN {
        return Err(Error::InvalidIdentity(identity.len()));
    }
    let marker = builder.open(LengthPrefix::U16)?;
    builder.put_slice(identity)?;
    builder.close(marker)?;
    builder.put_u32(obfuscated_ticket_age)
}

/// PSK binder value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PskBinder {
    /// HMAC of the truncated handshake transcript
    pub binder: Vec<u8>,
}

impl PskBinder {
    /// Wrap a binder value.
    pub fn new(binder: Vec<u8>) -> Self {
        Self { binder }
    }

    /// Append to `builder`.
    pub fn encode(&self, builder: &mut HandshakeBuilder) -> Result<()> {
        write_binder(builder, &self.binder)
    }

    /// Bytes this binder occupies on the wire.
    pub fn encoded_len(&self) -> usize {
        1 + self.binder.len()
    }
}

/// Write one `PskBinderEntry`.
pub(crate) fn write_binder(builder: &mut HandshakeBuilder, binder: &[u8]) -> Result<()> {
    if !(MIN_BINDER_LEN..=MAX_BINDER_LEN).contains(&binder.len()) {
        return Err(Error::InternalError(format!(
            "binder of {} bytes cannot be encoded",
            binder.len()
        )));
    }
    builder.put_u8(binder.len() as u8)?;
    builder.put_slice(binder)
}

/// ClientHello pre_shared_key payload.
///
/// It MUST be the last extension in ClientHello.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreSharedKeyExtension {
    /// PSK identities offered by the client
    pub identities: Vec<PskIdentity>,
    /// PSK binders (one per identity)
    pub binders: Vec<PskBinder>,
}

impl PreSharedKeyExtension {
    /// Create a new PreSharedKey extension
    pub fn new(identities: Vec<PskIdentity>, binders: Vec<PskBinder>) -> Result<Self> {
        if identities.len() != binders.len() {
            return Err(Error::InternalError(
                "Number of identities must match number of binders".into(),
            ));
        }
        if identities.is_empty() {
            return Err(Error::InternalError(
                "PreSharedKey extension must have at least one identity".into(),
            ));
        }
        Ok(Self {
            identities,
            binders,
        })
    }

    /// Append the payload (without the extension header).
    pub fn encode(&self, builder: &mut HandshakeBuilder) -> Result<()> {
        let identities = builder.open(LengthPrefix::U16)?;
        for identity in &self.identities {
            identity.encode(builder)?;
        }
        builder.close(identities)?;

        let binders = builder.open(LengthPrefix::U16)?;
        for binder in &self.binders {
            binder.encode(builder)?;
        }
        builder.close(binders)
    }

    /// Decode an owned copy of a payload.
    pub fn decode(data: &[u8]) -> Result<Self> {
        let parser = PskExtensionParser::parse(data)?
            .ok_or_else(|| Error::IllegalParameter("no PSK identities".into()))?;
        let identities = parser
            .candidates()
            .map(|c| PskIdentity::new(c.identity.to_vec(), c.obfuscated_ticket_age))
            .collect();
        let binders = parser.binders().map(|b| PskBinder::new(b.to_vec())).collect();
        Self::new(identities, binders)
    }

    /// Size of the binder list including its length prefix.
    pub fn binders_size(&self) -> usize {
        2 + self.binders.iter().map(PskBinder::encoded_len).sum::<usize>()
    }
}

/// ServerHello pre_shared_key payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreSharedKeyServerExtension {
    /// Index of the selected PSK identity (0-based)
    pub selected_identity: u16,
}

impl PreSharedKeyServerExtension {
    /// Create a new server PreSharedKey extension
    pub fn new(selected_identity: u16) -> Self {
        Self { selected_identity }
    }

    /// Append the payload (without the extension header).
    pub fn encode(&self, builder: &mut HandshakeBuilder) -> Result<()> {
        builder.put_u16(self.selected_identity)
    }

    /// Decode a payload; it must be exactly two bytes.
    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() != 2 {
            return Err(Error::DecodeError(
                "Server PreSharedKey extension must be 2 bytes".into(),
            ));
        }
        let mut data = data;
        Ok(Self {
            selected_identity: data.get_u16(),
        })
    }
}

/// One identity from a received offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PskCandidate<'a> {
    /// Position in the identity list
    pub index: u16,
    /// Opaque identity bytes
    pub identity: &'a [u8],
    /// Obfuscated ticket age; zero for external PSKs
    pub obfuscated_ticket_age: u32,
}

/// Validated view over a received ClientHello pre_shared_key payload.
#[derive(Debug, Clone, Copy)]
pub struct PskExtensionParser<'a> {
    identities: &'a [u8],
    binders: &'a [u8],
    count: usize,
}

fn split_vec16<'a>(data: &mut &'a [u8], what: &str) -> Result<&'a [u8]> {
    if data.len() < 2 {
        return Err(Error::DecodeError(format!("missing {} length", what)));
    }
    let len = data.get_u16() as usize;
    if data.len() < len {
        return Err(Error::IllegalParameter(format!(
            "{} length {} exceeds the {} bytes left",
            what,
            len,
            data.len()
        )));
    }
    let current: &'a [u8] = *data;
    let (head, tail) = current.split_at(len);
    *data = tail;
    Ok(head)
}

impl<'a> PskExtensionParser<'a> {
    /// Validate `data` completely.
    ///
    /// Returns `Ok(None)` when the identity list is empty (nothing was
    /// offered). Every structural problem is reported here, before any
    /// identity is looked at.
    pub fn parse(data: &'a [u8]) -> Result<Option<Self>> {
        let mut rest = data;
        let identities = split_vec16(&mut rest, "identity list")?;
        if identities.is_empty() {
            return Ok(None);
        }

        let mut count = 0usize;
        let mut ids = identities;
        while !ids.is_empty() {
            let identity = split_vec16(&mut ids, "identity")?;
            if identity.is_empty() {
                return Err(Error::IllegalParameter("empty PSK identity".into()));
            }
            if ids.len() < 4 {
                return Err(Error::IllegalParameter(
                    "identity without obfuscated_ticket_age".into(),
                ));
            }
            ids.advance(4);
            count += 1;
        }
        if count > usize::from(u16::MAX) {
            return Err(Error::IllegalParameter("too many PSK identities".into()));
        }

        let binders = split_vec16(&mut rest, "binder list")?;
        if !rest.is_empty() {
            return Err(Error::IllegalParameter(format!(
                "{} bytes after the binder list",
                rest.len()
            )));
        }

        let mut binder_count = 0usize;
        let mut list = binders;
        while let Some((&len, tail)) = list.split_first() {
            let len = len as usize;
            if len < MIN_BINDER_LEN {
                return Err(Error::IllegalParameter(format!("binder of {} bytes", len)));
            }
            if tail.len() < len {
                return Err(Error::IllegalParameter("binder list truncated".into()));
            }
            list = &tail[len..];
            binder_count += 1;
        }
        if binder_count != count {
            return Err(Error::IllegalParameter(format!(
                "{} identities but {} binders",
                count, binder_count
            )));
        }

        Ok(Some(Self {
            identities,
            binders,
            count,
        }))
    }

    /// Number of offered identities.
    pub fn len(&self) -> usize {
        self.count
    }

    /// Always false for a parsed offer.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Offered identities in wire order.
    pub fn candidates(&self) -> Candidates<'a> {
        Candidates {
            rest: self.identities,
            index: 0,
        }
    }

    /// Binder values in wire order.
    pub fn binders(&self) -> Binders<'a> {
        Binders { rest: self.binders }
    }

    /// Binder of the identity at `index`.
    pub fn binder(&self, index: u16) -> Result<&'a [u8]> {
        self.binders()
            .nth(usize::from(index))
            .ok_or_else(|| Error::IllegalParameter(format!("no binder for identity {}", index)))
    }

    /// Byte length of the binder list, without its `uint16` prefix.
    pub fn binders_len(&self) -> usize {
        self.binders.len()
    }
}

/// Iterator over [`PskCandidate`]s of a validated offer.
#[derive(Debug, Clone)]
pub struct Candidates<'a> {
    rest: &'a [u8],
    index: u16,
}

impl<'a> Iterator for Candidates<'a> {
    type Item = PskCandidate<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let rest = self.rest;
        if rest.len() < 2 {
            return None;
        }
        let len = u16::from_be_bytes([rest[0], rest[1]]) as usize;
        let entry = rest.get(..2 + len + 4)?;
        let identity = &entry[2..2 + len];
        let mut age = &entry[2 + len..];
        self.rest = &rest[entry.len()..];

        let candidate = PskCandidate {
            index: self.index,
            identity,
            obfuscated_ticket_age: age.get_u32(),
        };
        self.index = self.index.wrapping_add(1);
        Some(candidate)
    }
}

/// Iterator over binder values of a validated offer.
#[derive(Debug, Clone)]
pub struct Binders<'a> {
    rest: &'a [u8],
}

impl<'a> Iterator for Binders<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        let rest = self.rest;
        let (&len, tail) = rest.split_first()?;
        let binder = tail.get(..len as usize)?;
        self.rest = &tail[binder.len()..];
        Some(binder)
    }
}
