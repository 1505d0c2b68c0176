//! Cryptographically secure random number generation from the OS.

use rand::rngs::OsRng;
use rand::RngCore;
use tlspsk_crypto::{Error, Random, Result};

/// Random number generator backed by `rand::rngs::OsRng`.
#[derive(Debug, Clone, Copy)]
pub struct OsRandom;

impl Random for OsRandom {
    fn fill(&self, dest: &mut [u8]) -> Result<()> {
        OsRng.try_fill_bytes(dest).map_err(|e| {
            tracing::warn!("OS RNG failure: {}", e);
            Error::RandomUnavailable
        })
    }
}
