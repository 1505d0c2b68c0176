//! Session tickets as PSK sources (RFC 8446 Section 4.6.1).
//!
//! A ticket carries the resumption master secret of an earlier connection.
//! The PSK for resumption is
//!
//! ```text
//! HKDF-Expand-Label(resumption_master_secret, "resumption", ticket_nonce, Hash.length)
//! ```
//!
//! and the client reports the ticket's age obfuscated with `ticket_age_add`
//! modulo 2^32.

use crate::error::{Error, Result};
use crate::key_schedule;
use std::time::{SystemTime, UNIX_EPOCH};
use tlspsk_crypto::{CryptoProvider, HashAlgorithm};
use zeroize::Zeroizing;

/// Longest ticket lifetime a server may announce (7 days).
pub const MAX_TICKET_LIFETIME: u32 = 604_800;

/// Current UNIX time in seconds; a clock before the epoch reads as 0.
pub fn unix_time() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// Age obfuscation helpers (32-bit modular arithmetic).
#[derive(Debug, Clone, Copy)]
pub struct ObfuscatedAge;

impl ObfuscatedAge {
    /// `obfuscated = age_ms + age_add mod 2^32`.
    pub const fn wrap(age_ms: u32, age_add: u32) -> u32 {
        age_ms.wrapping_add(age_add)
    }

    /// `age_ms = obfuscated - age_add mod 2^32`.
    pub const fn unwrap(obfuscated: u32, age_add: u32) -> u32 {
        obfuscated.wrapping_sub(age_add)
    }
}

/// Resumption material of an issued ticket.
pub struct TicketRecord {
    /// Hash the ticket's session used; `None` if the suite is unknown here.
    pub prf: Option<HashAlgorithm>,

    /// Ticket nonce from NewSessionTicket
    pub nonce: Vec<u8>,

    /// Resumption master secret of the issuing connection
    pub resumption_master_secret: Zeroizing<Vec<u8>>,

    /// `ticket_age_add`
    pub age_add: u32,

    /// Issue time (UNIX seconds)
    pub issued_at: u64,

    /// `ticket_lifetime` in seconds
    pub lifetime: u32,
}

impl std::fmt::Debug for TicketRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TicketRecord")
            .field("prf", &self.prf)
            .field("nonce_len", &self.nonce.len())
            .field("age_add", &self.age_add)
            .field("issued_at", &self.issued_at)
            .field("lifetime", &self.lifetime)
            .finish_non_exhaustive()
    }
}

impl Clone for TicketRecord {
    fn clone(&self) -> Self {
        Self {
            prf: self.prf,
            nonce: self.nonce.clone(),
            resumption_master_secret: Zeroizing::new(self.resumption_master_secret.to_vec()),
            age_add: self.age_add,
            issued_at: self.issued_at,
            lifetime: self.lifetime,
        }
    }
}

impl TicketRecord {
    /// Derive the resumption PSK of this ticket.
    pub fn derive_psk(&self, provider: &dyn CryptoProvider) -> Result<Zeroizing<Vec<u8>>> {
        let prf = self
            .prf
            .ok_or_else(|| Error::InternalError("ticket has no hash algorithm".into()))?;
        derive_resumption_psk(provider, prf, &self.resumption_master_secret, &self.nonce)
    }

    /// Server-side freshness check of a client-reported obfuscated age.
    ///
    /// Returns the de-obfuscated age in milliseconds, or `None` when the
    /// age is negative as a signed 32-bit value or exceeds the lifetime.
    pub fn check_reported_age(&self, obfuscated_age: u32) -> Option<u32> {
        let age_ms = ObfuscatedAge::unwrap(obfuscated_age, self.age_add);
        if (age_ms as i32) < 0 {
            return None;
        }
        if age_ms / 1000 > self.lifetime {
            return None;
        }
        Some(age_ms)
    }
}

/// `HKDF-Expand-Label(resumption_master_secret, "resumption", nonce, Hash.length)`.
pub fn derive_resumption_psk(
    provider: &dyn CryptoProvider,
    prf: HashAlgorithm,
    resumption_master_secret: &[u8],
    nonce: &[u8],
) -> Result<Zeroizing<Vec<u8>>> {
    let length = key_schedule::prf_output_size(provider, prf)?;
    key_schedule::expand_label(
        provider,
        prf,
        resumption_master_secret,
        b"resumption",
        nonce,
        length,
    )
}

/// Client-side ticket: the opaque identity plus its resumption material.
#[derive(Debug, Clone)]
pub struct SessionTicket {
    /// Opaque ticket sent back as the PSK identity
    pub ticket: Vec<u8>,

    /// Resumption material remembered from NewSessionTicket
    pub record: TicketRecord,
}

/// Why a client refused to offer its stored ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TicketAge {
    /// Usable; age in seconds.
    Fresh(u64),
    /// Issue time lies in the future or before the epoch.
    Implausible,
    /// Older than its lifetime.
    Expired,
}

impl SessionTicket {
    /// Classify the ticket's age at `now` (UNIX seconds).
    pub fn age_at(&self, now: u64) -> TicketAge {
        let age = now as i128 - self.record.issued_at as i128;
        if age < 0 || age > now as i128 {
            return TicketAge::Implausible;
        }
        let age = age as u64;
        if age > u64::from(self.record.lifetime) {
            return TicketAge::Expired;
        }
        TicketAge::Fresh(age)
    }

    /// Obfuscated age for an age in seconds.
    pub fn obfuscated_age(&self, age_secs: u64) -> u32 {
        ObfuscatedAge::wrap((age_secs.wrapping_mul(1000)) as u32, self.record.age_add)
    }
}

/// Result of asking the ticket codec about a candidate identity.
#[derive(Debug)]
pub enum TicketUnwrap {
    /// The identity decrypted to a ticket.
    Ticket(TicketRecord),
    /// The identity is not in this codec's ticket format.
    NotATicket,
    /// The identity looked like a ticket but failed to open.
    Invalid(String),
}

/// Server-side ticket protection.
pub trait TicketCodec: Send + Sync {
    /// Open a candidate identity.
    fn unwrap_ticket(&self, provider: &dyn CryptoProvider, identity: &[u8]) -> TicketUnwrap;
}

#[cfg(test)]
mod tests {
    use super::*;
    use tlspsk_crypto_rustcrypto::RustCryptoProvider;

    fn record(age_add: u32, issued_at: u64, lifetime: u32) -> TicketRecord {
        TicketRecord {
            prf: Some(HashAlgorithm::Sha256),
            nonce: vec![0, 1],
            resumption_master_secret: Zeroizing::new(vec![0x5a; 32]),
            age_add,
            issued_at,
            lifetime,
        }
    }

    #[test]
    fn test_obfuscated_age_wraps() {
        let cases = [
            (0u32, 0u32),
            (10_000, 0xffff_fff0),
            (u32::MAX, 1),
            (4_000_000, u32::MAX - 1_000),
        ];
        for (age, add) in cases {
            assert_eq!(ObfuscatedAge::unwrap(ObfuscatedAge::wrap(age, add), add), age);
        }
        assert_eq!(ObfuscatedAge::wrap(20, u32::MAX - 9), 10);
    }

    #[test]
    fn test_server_age_check() {
        let rec = record(0x8000_0000, 0, 3600);
        let obf = ObfuscatedAge::wrap(10_000, rec.age_add);
        assert_eq!(rec.check_reported_age(obf), Some(10_000));

        // negative once de-obfuscated
        let obf = ObfuscatedAge::wrap(u32::MAX - 5, rec.age_add);
        assert_eq!(rec.check_reported_age(obf), None);

        // older than the lifetime
        let obf = ObfuscatedAge::wrap(3_601_000, rec.age_add);
        assert_eq!(rec.check_reported_age(obf), None);

        // exactly at the lifetime boundary is still fresh
        let obf = ObfuscatedAge::wrap(3_600_999, rec.age_add);
        assert_eq!(rec.check_reported_age(obf), Some(3_600_999));
    }

    #[test]
    fn test_client_age_classification() {
        let now = 1_700_000_000;
        let ticket = SessionTicket {
            ticket: vec![1, 2, 3],
            record: record(7, now - 10, 3600),
        };
        assert_eq!(ticket.age_at(now), TicketAge::Fresh(10));
        assert_eq!(ticket.obfuscated_age(10), 10_007);

        let expired = SessionTicket {
            ticket: vec![1],
            record: record(7, now - 4000, 3600),
        };
        assert_eq!(expired.age_at(now), TicketAge::Expired);

        let future = SessionTicket {
            ticket: vec![1],
            record: record(7, now + 5, 3600),
        };
        assert_eq!(future.age_at(now), TicketAge::Implausible);
    }

    #[test]
    fn test_derive_psk_depends_on_nonce() {
        let provider = RustCryptoProvider::new();
        let a = record(0, 0, 1);
        let mut b = a.clone();
        b.nonce = vec![0, 2];
        let psk_a = a.derive_psk(&provider).unwrap();
        assert_eq!(psk_a.len(), 32);
        assert_ne!(*psk_a, *b.derive_psk(&provider).unwrap());
    }

    #[test]
    fn test_derive_psk_without_prf() {
        let provider = RustCryptoProvider::new();
        let mut rec = record(0, 0, 1);
        rec.prf = None;
        assert!(matches!(rec.derive_psk(&provider), Err(Error::InternalError(_))));
    }
}
