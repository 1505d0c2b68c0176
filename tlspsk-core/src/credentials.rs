//! External (out-of-band) PSK credentials.
//!
//! The client holds one identity/key pair; the server resolves identities
//! through a [`CredentialStore`]. Both sides name the hash the binder is
//! computed with, since an external PSK carries no cipher suite of its own.

use crate::error::{Error, Result};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tlspsk_crypto::HashAlgorithm;
use zeroize::Zeroizing;

/// Longest identity representable on the wire.
pub const MAX_IDENTITY_LEN: usize = u16::MAX as usize;

/// Client-side external PSK.
#[derive(Clone)]
pub struct ClientPskCredentials {
    identity: Vec<u8>,
    key: Zeroizing<Vec<u8>>,
    binder_prf: Option<HashAlgorithm>,
}

impl fmt::Debug for ClientPskCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientPskCredentials")
            .field("identity", &String::from_utf8_lossy(&self.identity))
            .field("binder_prf", &self.binder_prf)
            .finish_non_exhaustive()
    }
}

impl ClientPskCredentials {
    /// Credentials binding `key` to `identity` with binder hash `binder_prf`.
    pub fn new(identity: impl Into<Vec<u8>>, key: &[u8], binder_prf: HashAlgorithm) -> Self {
        Self {
            identity: identity.into(),
            key: Zeroizing::new(key.to_vec()),
            binder_prf: Some(binder_prf),
        }
    }

    /// Credentials without a binder hash. Offering them fails with
    /// [`Error::InsufficientCredentials`].
    pub fn without_binder_prf(identity: impl Into<Vec<u8>>, key: &[u8]) -> Self {
        Self {
            identity: identity.into(),
            key: Zeroizing::new(key.to_vec()),
            binder_prf: None,
        }
    }

    /// The identity sent on the wire.
    pub fn identity(&self) -> &[u8] {
        &self.identity
    }

    /// The shared key.
    pub fn key(&self) -> &[u8] {
        &self.key
    }

    /// Hash the binder is computed with.
    pub fn binder_prf(&self) -> Option<HashAlgorithm> {
        self.binder_prf
    }

    /// Whether there is anything to offer.
    pub fn is_usable(&self) -> bool {
        !self.key.is_empty()
    }

    /// Identity length must be in `1..=65535`.
    pub fn validate_identity(&self) -> Result<()> {
        let len = self.identity.len();
        if len == 0 || len > MAX_IDENTITY_LEN {
            return Err(Error::InvalidIdentity(len));
        }
        Ok(())
    }
}

/// Server-side lookup of external PSKs by identity.
///
/// `Ok(None)` means the identity is unknown. `Err` is reserved for store
/// failures and aborts the handshake.
pub trait CredentialStore: Send + Sync {
    /// Look up the key for `identity`.
    fn lookup_external_psk(&self, identity: &str) -> Result<Option<Zeroizing<Vec<u8>>>>;
}

/// In-memory [`CredentialStore`].
#[derive(Default)]
pub struct ExternalPskStore {
    keys: HashMap<String, Zeroizing<Vec<u8>>>,
}

impl fmt::Debug for ExternalPskStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExternalPskStore")
            .field("identities", &self.keys.len())
            .finish()
    }
}

impl ExternalPskStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a key.
    pub fn insert(&mut self, identity: impl Into<String>, key: &[u8]) -> Result<()> {
        if key.is_empty() {
            return Err(Error::InvalidConfig("empty external PSK".into()));
        }
        self.keys
            .insert(identity.into(), Zeroizing::new(key.to_vec()));
        Ok(())
    }

    /// Number of stored identities.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl CredentialStore for ExternalPskStore {
    fn lookup_external_psk(&self, identity: &str) -> Result<Option<Zeroizing<Vec<u8>>>> {
        Ok(self
            .keys
            .get(identity)
            .map(|key| Zeroizing::new(key.to_vec())))
    }
}

/// The part of an external identity used as the lookup key: everything
/// before the first NUL byte.
pub fn identity_name(identity: &[u8]) -> &[u8] {
    match identity.iter().position(|&b| b == 0) {
        Some(end) => &identity[..end],
        None => identity,
    }
}

/// Server-side external PSK configuration.
#[derive(Clone)]
pub struct ServerPskCredentials {
    store: Arc<dyn CredentialStore>,
    binder_prf: HashAlgorithm,
}

impl fmt::Debug for ServerPskCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerPskCredentials")
            .field("binder_prf", &self.binder_prf)
            .finish_non_exhaustive()
    }
}

impl ServerPskCredentials {
    /// Credentials resolving identities through `store`.
    pub fn new(store: Arc<dyn CredentialStore>, binder_prf: HashAlgorithm) -> Self {
        Self { store, binder_prf }
    }

    /// Hash every external binder is verified with.
    pub fn binder_prf(&self) -> HashAlgorithm {
        self.binder_prf
    }

    /// Look up `identity` by its [`identity_name`]. Non-UTF-8 and empty
    /// names are unknown.
    pub fn lookup(&self, identity: &[u8]) -> Result<Option<Zeroizing<Vec<u8>>>> {
        match std::str::from_utf8(identity_name(identity)) {
            Ok("") | Err(_) => Ok(None),
            Ok(name) => self.store.lookup_external_psk(name),
        }
    }
}
