//! TLS protocol constants used by the PSK extension.

/// TLS protocol version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u16)]
pub enum ProtocolVersion {
    /// TLS 1.2 (RFC 5246), also the legacy_version of every TLS 1.3 hello
    Tls12 = 0x0303,

    /// TLS 1.3 (RFC 8446)
    Tls13 = 0x0304,
}

impl ProtocolVersion {
    /// Convert to wire format (u16 big-endian).
    pub const fn to_u16(self) -> u16 {
        self as u16
    }

    /// Whether this version carries the TLS 1.3 PSK extension.
    pub const fn supports_psk_extension(self) -> bool {
        matches!(self, ProtocolVersion::Tls13)
    }
}

/// Handshake message type (RFC 8446 Section 4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum HandshakeType {
    /// ClientHello (1)
    ClientHello = 1,
    /// ServerHello (2), also used for HelloRetryRequest
    ServerHello = 2,
    /// MessageHash (254), the synthetic message replacing ClientHello1 after HRR
    MessageHash = 254,
}

impl HandshakeType {
    /// Convert to wire format (u8).
    pub const fn to_u8(self) -> u8 {
        self as u8
    }
}

/// Extension types relevant to PSK negotiation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ExtensionType {
    /// pre_shared_key (41), must be the last ClientHello extension
    PreSharedKey = 41,
    /// psk_key_exchange_modes (45)
    PskKeyExchangeModes = 45,
}

impl ExtensionType {
    /// Convert to wire format (u16).
    pub const fn to_u16(self) -> u16 {
        self as u16
    }
}
