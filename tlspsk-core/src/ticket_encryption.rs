//! Ticket Encryption for Session Resumption (RFC 8446 Section 4.6.1)
//!
//! Tickets carry the resumption master secret and MUST be encrypted and
//! authenticated. Keys rotate; the previous few keys are kept so tickets
//! issued just before a rotation still open.
//!
//! # Ticket Format
//!
//! ```text
//! struct EncryptedTicket {
//!     version: u8,              // Ticket format version (current: 1)
//!     key_id: u8,               // Key ID for rotation support
//!     nonce: [u8; 12],          // GCM nonce (96 bits)
//!     encrypted_data: Vec<u8>,  // AES-256-GCM encrypted payload
//!     tag: [u8; 16],            // GCM authentication tag
//! }
//!
//! Plaintext payload:
//! struct TicketPayload {
//!     prf: u8,                                  // HashAlgorithm::to_u8
//!     age_add: u32,                             // ticket_age_add
//!     issued_at: u64,                           // UNIX timestamp (seconds)
//!     lifetime: u32,                            // ticket_lifetime (seconds)
//!     ticket_nonce: opaque<0..255>,
//!     resumption_master_secret: opaque<0..255>,
//! }
//! ```

use crate::error::{Error, Result};
use crate::ticket::{
    unix_time, SessionTicket, TicketCodec, TicketRecord, TicketUnwrap, MAX_TICKET_LIFETIME,
};
use bytes::{Buf, BufMut};
use tlspsk_crypto::{AeadAlgorithm, CryptoProvider, HashAlgorithm};
use zeroize::Zeroizing;

/// Current ticket format version
pub const TICKET_VERSION: u8 = 1;

/// Ticket encryption key size (AES-256)
pub const TICKET_KEY_SIZE: usize = 32;

/// GCM nonce size
pub const GCM_NONCE_SIZE: usize = 12;

/// GCM tag size
pub const GCM_TAG_SIZE: usize = 16;

/// Default length of the per-ticket nonce used for PSK derivation
pub const TICKET_NONCE_SIZE: usize = 8;

const HEADER_SIZE: usize = 2 + GCM_NONCE_SIZE;

/// Ticket encryption key with metadata
#[derive(Clone)]
pub struct TicketKey {
    /// Key ID (for rotation)
    pub key_id: u8,

    /// AES-256 key
    key: Zeroizing<[u8; TICKET_KEY_SIZE]>,

    /// When this key was created (UNIX timestamp)
    pub created_at: u64,

    /// Key lifetime in seconds
    pub lifetime: u64,
}

impl std::fmt::Debug for TicketKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TicketKey")
            .field("key_id", &self.key_id)
            .field("created_at", &self.created_at)
            .field("lifetime", &self.lifetime)
            .finish_non_exhaustive()
    }
}

impl TicketKey {
    /// Create a new ticket key with random material
    pub fn generate(provider: &dyn CryptoProvider, key_id: u8, lifetime: u64) -> Result<Self> {
        let mut key = Zeroizing::new([0u8; TICKET_KEY_SIZE]);
        provider.random().fill(&mut key[..])?;
        Ok(Self::from_bytes(key_id, *key, lifetime))
    }

    /// Create a ticket key from existing key material
    pub fn from_bytes(key_id: u8, key: [u8; TICKET_KEY_SIZE], lifetime: u64) -> Self {
        Self {
            key_id,
            key: Zeroizing::new(key),
            created_at: unix_time(),
            lifetime,
        }
    }

    /// Check if key is still valid
    pub fn is_valid(&self) -> bool {
        unix_time() < self.created_at.saturating_add(self.lifetime)
    }
}

/// Ticket encryption manager and server-side [`TicketCodec`].
///
/// The server maintains up to four keys:
/// - Current key (for encrypting new tickets)
/// - Previous key(s) (for decrypting old tickets during rotation)
#[derive(Debug)]
pub struct TicketEncryptor {
    /// Current key for encryption
    current_key: TicketKey,

    /// Previous keys for decryption (during rotation)
    previous_keys: Vec<TicketKey>,
}

impl TicketEncryptor {
    /// Create a new ticket encryptor with a random key
    ///
    /// # Arguments
    /// * `key_lifetime` - Key lifetime in seconds (recommended: 24 hours = 86400)
    pub fn new(provider: &dyn CryptoProvider, key_lifetime: u64) -> Result<Self> {
        Ok(Self::with_key(TicketKey::generate(provider, 0, key_lifetime)?))
    }

    /// Create with a specific key
    pub fn with_key(key: TicketKey) -> Self {
        Self {
            current_key: key,
            previous_keys: Vec::new(),
        }
    }

    /// Key ID new tickets are sealed with.
    pub fn current_key_id(&self) -> u8 {
        self.current_key.key_id
    }

    /// Rotate to a new encryption key
    ///
    /// The current key becomes a previous key (for decryption of old tickets).
    pub fn rotate_key(&mut self, provider: &dyn CryptoProvider) -> Result<()> {
        let next_key_id = self.current_key.key_id.wrapping_add(1);
        let key_lifetime = self.current_key.lifetime;

        let old_key = std::mem::replace(
            &mut self.current_key,
            TicketKey::generate(provider, next_key_id, key_lifetime)?,
        );
        self.previous_keys.push(old_key);
        self.previous_keys.retain(|key| key.is_valid());

        // Keep at most 3 previous keys
        if self.previous_keys.len() > 3 {
            self.previous_keys.drain(0..self.previous_keys.len() - 3);
        }
        tracing::debug!("rotated ticket key to id {}", next_key_id);
        Ok(())
    }

    /// Issue a ticket for a finished connection.
    ///
    /// Generates the ticket nonce and `ticket_age_add`, seals the resumption
    /// material and returns what the client stores from NewSessionTicket.
    pub fn issue_ticket(
        &self,
        provider: &dyn CryptoProvider,
        prf: HashAlgorithm,
        resumption_master_secret: &[u8],
        lifetime: u32,
    ) -> Result<SessionTicket> {
        if lifetime > MAX_TICKET_LIFETIME {
            return Err(Error::InvalidConfig(format!(
                "ticket lifetime {} exceeds {} seconds",
                lifetime, MAX_TICKET_LIFETIME
            )));
        }
        let record = TicketRecord {
            prf: Some(prf),
            nonce: provider.random().generate(TICKET_NONCE_SIZE)?,
            resumption_master_secret: Zeroizing::new(resumption_master_secret.to_vec()),
            age_add: provider.random().next_u32()?,
            issued_at: unix_time(),
            lifetime,
        };
        let ticket = self.encrypt_ticket(provider, &record)?;
        Ok(SessionTicket { ticket, record })
    }

    /// Encrypt a ticket payload
    pub fn encrypt_ticket(
        &self,
        provider: &dyn CryptoProvider,
        record: &TicketRecord,
    ) -> Result<Vec<u8>> {
        let prf = record
            .prf
            .ok_or_else(|| Error::InternalError("ticket without hash algorithm".into()))?;
        if record.nonce.len() > 255 {
            return Err(Error::InvalidConfig("Ticket nonce too long".into()));
        }
        if record.resumption_master_secret.len() > 255 {
            return Err(Error::InvalidConfig("Resumption secret too long".into()));
        }

        let mut payload = Zeroizing::new(Vec::<u8>::new());
        payload.put_u8(prf.to_u8());
        payload.put_u32(record.age_add);
        payload.put_u64(record.issued_at);
        payload.put_u32(record.lifetime);
        payload.put_u8(record.nonce.len() as u8);
        payload.put_slice(&record.nonce);
        payload.put_u8(record.resumption_master_secret.len() as u8);
        payload.put_slice(&record.resumption_master_secret);

        let mut nonce = [0u8; GCM_NONCE_SIZE];
        provider.random().fill(&mut nonce)?;

        let aead = provider.aead(AeadAlgorithm::Aes256Gcm)?;

        // AAD: version || key_id
        let aad = [TICKET_VERSION, self.current_key.key_id];
        let ciphertext = aead.seal(&self.current_key.key[..], &nonce, &aad, &payload[..])?;

        // version || key_id || nonce || ciphertext_with_tag
        let mut encrypted_ticket = Vec::with_capacity(HEADER_SIZE + ciphertext.len());
        encrypted_ticket.extend_from_slice(&aad);
        encrypted_ticket.extend_from_slice(&nonce);
        encrypted_ticket.extend_from_slice(&ciphertext);

        Ok(encrypted_ticket)
    }

    fn decrypt_ticket(
        &self,
        provider: &dyn CryptoProvider,
        encrypted_ticket: &[u8],
    ) -> TicketUnwrap {
        if encrypted_ticket.len() < HEADER_SIZE + GCM_TAG_SIZE
            || encrypted_ticket[0] != TICKET_VERSION
        {
            return TicketUnwrap::NotATicket;
        }

        let mut data = encrypted_ticket;
        let version = data.get_u8();
        let key_id = data.get_u8();

        let key = if key_id == self.current_key.key_id {
            &self.current_key
        } else {
            match self.previous_keys.iter().find(|k| k.key_id == key_id) {
                Some(key) => key,
                None => return TicketUnwrap::Invalid(format!("unknown ticket key id {}", key_id)),
            }
        };
        if !key.is_valid() {
            return TicketUnwrap::Invalid("ticket key expired".into());
        }

        let nonce = &data[..GCM_NONCE_SIZE];
        data.advance(GCM_NONCE_SIZE);

        let aead = match provider.aead(AeadAlgorithm::Aes256Gcm) {
            Ok(aead) => aead,
            Err(e) => return TicketUnwrap::Invalid(e.to_string()),
        };
        let plaintext = match aead.open(&key.key[..], nonce, &[version, key_id], data) {
            Ok(pt) => Zeroizing::new(pt),
            Err(_) => return TicketUnwrap::Invalid("ticket decryption failed".into()),
        };

        match parse_payload(&plaintext) {
            Some(record) => TicketUnwrap::Ticket(record),
            None => TicketUnwrap::Invalid("malformed ticket payload".into()),
        }
    }
}

fn parse_payload(mut payload: &[u8]) -> Option<TicketRecord> {
    if payload.remaining() < 1 + 4 + 8 + 4 + 1 {
        return None;
    }
    // An unknown hash id is not a decode failure: the ticket stays
    // recognisable but unusable.
    let prf = HashAlgorithm::from_u8(payload.get_u8());
    let age_add = payload.get_u32();
    let issued_at = payload.get_u64();
    let lifetime = payload.get_u32();

    let nonce_len = payload.get_u8() as usize;
    if payload.remaining() < nonce_len + 1 {
        return None;
    }
    let nonce = payload[..nonce_len].to_vec();
    payload.advance(nonce_len);

    let secret_len = payload.get_u8() as usize;
    if payload.remaining() != secret_len {
        return None;
    }
    let resumption_master_secret = Zeroizing::new(payload.to_vec());

    Some(TicketRecord {
        prf,
        nonce,
        resumption_master_secret,
        age_add,
        issued_at,
        lifetime,
    })
}

impl TicketCodec for TicketEncryptor {
    fn unwrap_ticket(&self, provider: &dyn CryptoProvider, identity: &[u8]) -> TicketUnwrap {
        self.decrypt_ticket(provider, identity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tlspsk_crypto_rustcrypto::RustCryptoProvider;

    fn unwrap_record(result: TicketUnwrap) -> TicketRecord {
        match result {
            TicketUnwrap::Ticket(record) => record,
            other => panic!("expected a ticket, got {:?}", other),
        }
    }

    #[test]
    fn test_ticket_key_creation() {
        let provider = RustCryptoProvider::new();
        let key = TicketKey::generate(&provider, 0, 86400).unwrap();
        assert_eq!(key.key_id, 0);
        assert!(key.is_valid());
    }

    #[test]
    fn test_issue_and_unwrap() {
        let provider = RustCryptoProvider::new();
        let encryptor = TicketEncryptor::new(&provider, 86400).unwrap();

        let issued = encryptor
            .issue_ticket(&provider, HashAlgorithm::Sha384, &[0x42; 48], 3600)
            .unwrap();
        assert_eq!(issued.ticket[0], TICKET_VERSION);
        assert_eq!(issued.record.nonce.len(), TICKET_NONCE_SIZE);

        let record = unwrap_record(encryptor.unwrap_ticket(&provider, &issued.ticket));
        assert_eq!(record.prf, Some(HashAlgorithm::Sha384));
        assert_eq!(&record.resumption_master_secret[..], &[0x42; 48][..]);
        assert_eq!(record.nonce, issued.record.nonce);
        assert_eq!(record.age_add, issued.record.age_add);
        assert_eq!(record.lifetime, 3600);
    }

    #[test]
    fn test_lifetime_capped() {
        let provider = RustCryptoProvider::new();
        let encryptor = TicketEncryptor::new(&provider, 86400).unwrap();
        assert!(encryptor
            .issue_ticket(&provider, HashAlgorithm::Sha256, &[0; 32], MAX_TICKET_LIFETIME + 1)
            .is_err());
    }

    #[test]
    fn test_plain_identity_is_not_a_ticket() {
        let provider = RustCryptoProvider::new();
        let encryptor = TicketEncryptor::new(&provider, 86400).unwrap();
        assert!(matches!(
            encryptor.unwrap_ticket(&provider, b"alice"),
            TicketUnwrap::NotATicket
        ));
    }

    #[test]
    fn test_ticket_key_rotation() {
        let provider = RustCryptoProvider::new();
        let mut encryptor = TicketEncryptor::new(&provider, 86400).unwrap();

        let t0 = encryptor
            .issue_ticket(&provider, HashAlgorithm::Sha256, &[1; 32], 3600)
            .unwrap();
        assert_eq!(t0.ticket[1], 0);

        encryptor.rotate_key(&provider).unwrap();
        assert_eq!(encryptor.current_key_id(), 1);

        let t1 = encryptor
            .issue_ticket(&provider, HashAlgorithm::Sha256, &[2; 32], 3600)
            .unwrap();
        assert_eq!(t1.ticket[1], 1);

        let r0 = unwrap_record(encryptor.unwrap_ticket(&provider, &t0.ticket));
        assert_eq!(&r0.resumption_master_secret[..], &[1; 32][..]);
        let r1 = unwrap_record(encryptor.unwrap_ticket(&provider, &t1.ticket));
        assert_eq!(&r1.resumption_master_secret[..], &[2; 32][..]);
    }

    #[test]
    fn test_multiple_key_rotations() {
        let provider = RustCryptoProvider::new();
        let mut encryptor = TicketEncryptor::new(&provider, 86400).unwrap();

        let mut tickets = Vec::new();
        for _ in 0..5 {
            tickets.push(
                encryptor
                    .issue_ticket(&provider, HashAlgorithm::Sha256, &[9; 32], 3600)
                    .unwrap(),
            );
            encryptor.rotate_key(&provider).unwrap();
        }

        assert!(encryptor.previous_keys.len() <= 3);
        assert!(matches!(
            encryptor.unwrap_ticket(&provider, &tickets[0].ticket),
            TicketUnwrap::Invalid(_)
        ));
        for issued in &tickets[tickets.len() - 3..] {
            unwrap_record(encryptor.unwrap_ticket(&provider, &issued.ticket));
        }
    }

    #[test]
    fn test_wrong_key_and_corruption() {
        let provider = RustCryptoProvider::new();
        let encryptor1 = TicketEncryptor::new(&provider, 86400).unwrap();
        let encryptor2 = TicketEncryptor::new(&provider, 86400).unwrap();

        let issued = encryptor1
            .issue_ticket(&provider, HashAlgorithm::Sha256, &[0x42; 32], 3600)
            .unwrap();
        assert!(matches!(
            encryptor2.unwrap_ticket(&provider, &issued.ticket),
            TicketUnwrap::Invalid(_)
        ));

        let mut corrupted = issued.ticket.clone();
        corrupted[20] ^= 0xff;
        assert!(matches!(
            encryptor1.unwrap_ticket(&provider, &corrupted),
            TicketUnwrap::Invalid(_)
        ));
    }

    #[test]
    fn test_unknown_hash_id_yields_ticket_without_prf() {
        let mut payload = vec![0xee];
        payload.extend_from_slice(&[0u8; 4 + 8 + 4]);
        payload.extend_from_slice(&[0, 2, 0xab, 0xcd]);

        let record = parse_payload(&payload).unwrap();
        assert!(record.prf.is_none());
        assert!(record.nonce.is_empty());
        assert_eq!(&record.resumption_master_secret[..], &[0xab, 0xcd][..]);
    }

    #[test]
    fn test_truncated_payload() {
        let mut payload = vec![HashAlgorithm::Sha256.to_u8()];
        payload.extend_from_slice(&[0u8; 4 + 8 + 4]);
        payload.extend_from_slice(&[0, 4, 0xab]);
        assert!(parse_payload(&payload).is_none());
    }
}
