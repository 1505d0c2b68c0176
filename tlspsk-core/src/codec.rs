//! Handshake message building with deferred length fields.
//!
//! TLS nests variable-length vectors (handshake body, extensions block,
//! single extension, identity list). Their length prefixes are only known
//! once the contents are written, so [`HandshakeBuilder`] writes a
//! placeholder, remembers it as a pending patch and fills every prefix in
//! a single [`HandshakeBuilder::finish`] step.
//!
//! The PSK binder additionally needs a byte-exact view of a message that is
//! not finished yet: [`HandshakeBuilder::render_pending`] resolves all open
//! prefixes as if a given number of trailing bytes had already been written.

use crate::error::{Error, Result};
use crate::protocol::{ExtensionType, HandshakeType};
use bytes::BufMut;

/// Width of a length prefix in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthPrefix {
    /// `uint8` prefix
    U8,
    /// `uint16` prefix
    U16,
    /// `uint24` prefix (handshake message bodies)
    U24,
}

impl LengthPrefix {
    const fn width(self) -> usize {
        match self {
            LengthPrefix::U8 => 1,
            LengthPrefix::U16 => 2,
            LengthPrefix::U24 => 3,
        }
    }

    const fn max(self) -> usize {
        match self {
            LengthPrefix::U8 => 0xff,
            LengthPrefix::U16 => 0xffff,
            LengthPrefix::U24 => 0xff_ffff,
        }
    }
}

/// Handle to an open length prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub struct LengthMarker(usize);

#[derive(Debug, Clone, Copy)]
struct LengthPatch {
    offset: usize,
    prefix: LengthPrefix,
    end: Option<usize>,
}

impl LengthPatch {
    fn body_start(&self) -> usize {
        self.offset + self.prefix.width()
    }
}

/// Saved builder position, see [`HandshakeBuilder::rollback`].
#[derive(Debug, Clone, Copy)]
pub struct Checkpoint {
    len: usize,
    patches: usize,
}

/// Byte builder with deferred length patches.
///
/// Every append reserves capacity fallibly; allocation failure surfaces as
/// [`Error::MemoryError`].
#[derive(Debug, Default, Clone)]
pub struct HandshakeBuilder {
    buf: Vec<u8>,
    patches: Vec<LengthPatch>,
}

impl HandshakeBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of bytes written so far (placeholders included).
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Whether nothing has been written yet.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    fn reserve(&mut self, additional: usize) -> Result<()> {
        self.buf.try_reserve(additional)?;
        Ok(())
    }

    /// Append a single byte.
    pub fn put_u8(&mut self, value: u8) -> Result<()> {
        self.reserve(1)?;
        self.buf.put_u8(value);
        Ok(())
    }

    /// Append a big-endian `uint16`.
    pub fn put_u16(&mut self, value: u16) -> Result<()> {
        self.reserve(2)?;
        self.buf.put_u16(value);
        Ok(())
    }

    /// Append a big-endian `uint32`.
    pub fn put_u32(&mut self, value: u32) -> Result<()> {
        self.reserve(4)?;
        self.buf.put_u32(value);
        Ok(())
    }

    /// Append raw bytes.
    pub fn put_slice(&mut self, data: &[u8]) -> Result<()> {
        self.reserve(data.len())?;
        self.buf.put_slice(data);
        Ok(())
    }

    /// Write a placeholder length prefix and start tracking it.
    pub fn open(&mut self, prefix: LengthPrefix) -> Result<LengthMarker> {
        self.patches.try_reserve(1)?;
        let offset = self.buf.len();
        self.reserve(prefix.width())?;
        self.buf.put_bytes(0, prefix.width());
        self.patches.push(LengthPatch {
            offset,
            prefix,
            end: None,
        });
        Ok(LengthMarker(self.patches.len() - 1))
    }

    /// Close a prefix: its vector ends at the current position.
    pub fn close(&mut self, marker: LengthMarker) -> Result<()> {
        let patch = self
            .patches
            .get_mut(marker.0)
            .ok_or_else(|| Error::InternalError("unknown length marker".into()))?;
        if patch.end.is_some() {
            return Err(Error::InternalError("length marker closed twice".into()));
        }
        patch.end = Some(self.buf.len());
        Ok(())
    }

    /// Start a handshake message: type byte plus open `uint24` body length.
    pub fn begin_handshake(&mut self, msg_type: HandshakeType) -> Result<LengthMarker> {
        self.put_u8(msg_type.to_u8())?;
        self.open(LengthPrefix::U24)
    }

    /// Start an extension: type plus open `uint16` extension_data length.
    pub fn begin_extension(&mut self, ext_type: ExtensionType) -> Result<LengthMarker> {
        self.put_u16(ext_type.to_u16())?;
        self.open(LengthPrefix::U16)
    }

    /// Remember the current position so a failed writer can undo its output.
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            len: self.buf.len(),
            patches: self.patches.len(),
        }
    }

    /// Discard everything written after `checkpoint`.
    pub fn rollback(&mut self, checkpoint: Checkpoint) {
        self.buf.truncate(checkpoint.len);
        self.patches.truncate(checkpoint.patches);
    }

    fn resolve(buf: &mut [u8], patch: &LengthPatch, end: usize) -> Result<()> {
        let len = end
            .checked_sub(patch.body_start())
            .ok_or_else(|| Error::InternalError("length patch ends before it starts".into()))?;
        if len > patch.prefix.max() {
            return Err(Error::IllegalParameter(format!(
                "vector of {} bytes does not fit a {}-byte length",
                len,
                patch.prefix.width()
            )));
        }
        let be = (len as u32).to_be_bytes();
        let width = patch.prefix.width();
        buf[patch.offset..patch.offset + width].copy_from_slice(&be[4 - width..]);
        Ok(())
    }

    /// Render the bytes written so far with every length resolved.
    ///
    /// Prefixes that are still open are filled in as if `trailing` more
    /// bytes followed the current position; closed ones keep their value.
    pub fn render_pending(&self, trailing: usize) -> Result<Vec<u8>> {
        let virtual_end = self
            .buf
            .len()
            .checked_add(trailing)
            .ok_or(Error::MemoryError)?;
        let mut out = Vec::new();
        out.try_reserve_exact(self.buf.len())?;
        out.extend_from_slice(&self.buf);
        for patch in &self.patches {
            Self::resolve(&mut out, patch, patch.end.unwrap_or(virtual_end))?;
        }
        Ok(out)
    }

    /// Resolve all length prefixes and return the finished bytes.
    ///
    /// Every opened prefix must have been closed.
    pub fn finish(mut self) -> Result<Vec<u8>> {
        for patch in &self.patches {
            let end = patch
                .end
                .ok_or_else(|| Error::InternalError("unclosed length prefix".into()))?;
            Self::resolve(&mut self.buf, patch, end)?;
        }
        Ok(self.buf)
    }
}
