//! PSK binder key derivation and binder computation (RFC 8446 Section 4.2.11.2).
//!
//! ```text
//! early_secret = HKDF-Extract(0, PSK)
//! binder_key   = Derive-Secret(early_secret, "res binder" | "ext binder", "")
//! binder       = HMAC(finished_key(binder_key), Transcript-Hash(Truncate(CH)))
//! ```

use crate::error::{Error, Result};
use crate::key_schedule;
use subtle::ConstantTimeEq;
use tlspsk_crypto::{CryptoProvider, HashAlgorithm};
use zeroize::Zeroizing;

/// Smallest binder accepted on the wire.
pub const MIN_BINDER_LEN: usize = 32;

/// Largest binder representable with its `uint8` length.
pub const MAX_BINDER_LEN: usize = 255;

/// Which binder label a PSK uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinderMode {
    /// PSK derived from a session ticket ("res binder").
    Resumption,
    /// Out-of-band provisioned PSK ("ext binder").
    External,
}

impl BinderMode {
    /// Derive-Secret label for this mode.
    pub const fn label(self) -> &'static [u8] {
        match self {
            BinderMode::Resumption => b"res binder",
            BinderMode::External => b"ext binder",
        }
    }

    /// Mode for a slot's resumption flag.
    pub const fn from_resumption(resumption: bool) -> Self {
        if resumption {
            BinderMode::Resumption
        } else {
            BinderMode::External
        }
    }
}

/// Derive the binder key for `secret`.
///
/// Fails with [`Error::DerivationError`] when the provider reports no
/// output size for `prf`.
pub fn derive_binder_key(
    provider: &dyn CryptoProvider,
    prf: HashAlgorithm,
    secret: &[u8],
    mode: BinderMode,
) -> Result<Zeroizing<Vec<u8>>> {
    let output_size = key_schedule::prf_output_size(provider, prf)?;
    if output_size == 0 {
        return Err(Error::DerivationError(format!(
            "{} has no output size",
            prf.name()
        )));
    }

    let early_secret = key_schedule::extract(provider, prf, None, secret)?;
    key_schedule::derive_secret(provider, prf, &early_secret, mode.label(), &[])
}

/// Compute the binder for `secret` over the reconstructed `transcript`.
pub fn compute_binder(
    provider: &dyn CryptoProvider,
    prf: HashAlgorithm,
    secret: &[u8],
    mode: BinderMode,
    transcript: &[u8],
) -> Result<Vec<u8>> {
    let binder_key = derive_binder_key(provider, prf, secret, mode)?;
    key_schedule::finished_mac(provider, prf, &binder_key, transcript)
}

/// Recompute the binder and compare it against `received`.
///
/// Length and content mismatches both yield [`Error::BinderMismatch`]; the
/// content comparison runs in constant time.
pub fn verify_binder(
    provider: &dyn CryptoProvider,
    prf: HashAlgorithm,
    secret: &[u8],
    mode: BinderMode,
    transcript: &[u8],
    received: &[u8],
) -> Result<()> {
    let expected = Zeroizing::new(compute_binder(provider, prf, secret, mode, transcript)?);
    if expected.len() != received.len() {
        return Err(Error::BinderMismatch);
    }
    if bool::from(expected.as_slice().ct_eq(received)) {
        Ok(())
    } else {
        Err(Error::BinderMismatch)
    }
}
