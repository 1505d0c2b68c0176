//! Server-side resolution of offered PSK identities.
//!
//! Candidates are tried lazily in wire order. Each one either resolves to a
//! PSK, is skipped (unknown identity, stale or undecryptable ticket), or
//! aborts the handshake (credential store failure). Skips are normal: a
//! client may hold tickets from a server instance that rotated its keys.

use crate::binder::BinderMode;
use crate::context::ServerContext;
use crate::error::{Error, Result};
use crate::psk::{Candidates, PskCandidate};
use crate::ticket::TicketUnwrap;
use std::fmt;
use tlspsk_crypto::HashAlgorithm;
use zeroize::Zeroizing;

/// Why a candidate was passed over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// External identity not in the credential store
    UnknownIdentity,
    /// Tickets are disabled or no ticket codec is configured
    TicketsDisabled,
    /// The codec does not recognise the identity
    NotATicket,
    /// The ticket failed to decrypt or parse
    InvalidTicket(String),
    /// The ticket names no usable hash
    MissingPrf,
    /// Reported age is negative or beyond the ticket lifetime
    StaleTicket,
    /// The resumption PSK could not be derived
    DerivationFailed,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::UnknownIdentity => write!(f, "unknown identity"),
            SkipReason::TicketsDisabled => write!(f, "tickets disabled"),
            SkipReason::NotATicket => write!(f, "not a ticket"),
            SkipReason::InvalidTicket(msg) => write!(f, "invalid ticket: {}", msg),
            SkipReason::MissingPrf => write!(f, "ticket without hash algorithm"),
            SkipReason::StaleTicket => write!(f, "stale ticket"),
            SkipReason::DerivationFailed => write!(f, "PSK derivation failed"),
        }
    }
}

/// A candidate that produced a PSK.
pub struct ResolvedPsk<'a> {
    /// The candidate as offered
    pub candidate: PskCandidate<'a>,
    /// The PSK
    pub psk: Zeroizing<Vec<u8>>,
    /// Hash its binder is verified with
    pub prf: HashAlgorithm,
    /// Resumption or external
    pub mode: BinderMode,
}

impl fmt::Debug for ResolvedPsk<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedPsk")
            .field("index", &self.candidate.index)
            .field("prf", &self.prf)
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

/// Outcome of trying one candidate.
#[derive(Debug)]
pub enum Resolution<'a> {
    /// Use this PSK.
    Resolved(ResolvedPsk<'a>),
    /// Move on to the next candidate.
    Skip {
        /// Candidate position
        index: u16,
        /// Why it was passed over
        reason: SkipReason,
    },
    /// Abort the handshake.
    HardError(Error),
}

/// Lazy per-candidate resolver.
///
/// Yields one [`Resolution`] per candidate and fuses after a
/// [`Resolution::HardError`].
pub struct CandidateResolver<'a, 'c> {
    ctx: &'c ServerContext<'c>,
    candidates: Candidates<'a>,
    failed: bool,
}

impl fmt::Debug for CandidateResolver<'_, '_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CandidateResolver")
            .field("failed", &self.failed)
            .finish_non_exhaustive()
    }
}

impl<'a, 'c> CandidateResolver<'a, 'c> {
    /// Resolve `candidates` against the server's credentials and tickets.
    pub fn new(ctx: &'c ServerContext<'c>, candidates: Candidates<'a>) -> Self {
        Self {
            ctx,
            candidates,
            failed: false,
        }
    }

    /// Consume until the first resolved candidate.
    ///
    /// `Ok(None)` when every candidate was skipped.
    pub fn first_resolved(&mut self) -> Result<Option<ResolvedPsk<'a>>> {
        for resolution in self.by_ref() {
            match resolution {
                Resolution::Resolved(psk) => return Ok(Some(psk)),
                Resolution::Skip { index, reason } => {
                    tracing::debug!("skipping PSK candidate {}: {}", index, reason);
                },
                Resolution::HardError(e) => return Err(e),
            }
        }
        Ok(None)
    }

    fn resolve(&self, candidate: PskCandidate<'a>) -> Resolution<'a> {
        let skip = |reason| Resolution::Skip {
            index: candidate.index,
            reason,
        };

        let max_len = self.ctx.config.max_identity_len;
        if candidate.obfuscated_ticket_age == 0
            && (1..=max_len).contains(&candidate.identity.len())
        {
            let Some(credentials) = self.ctx.credentials else {
                return Resolution::HardError(Error::InsufficientCredentials(
                    "external PSK offered but no credential store is configured".into(),
                ));
            };
            match credentials.lookup(candidate.identity) {
                Ok(Some(psk)) => {
                    return Resolution::Resolved(ResolvedPsk {
                        candidate,
                        psk,
                        prf: credentials.binder_prf(),
                        mode: BinderMode::External,
                    })
                },
                Ok(None) => {},
                Err(e) => return Resolution::HardError(e),
            }
        }

        let Some(codec) = self.ctx.ticket_codec() else {
            return skip(if candidate.obfuscated_ticket_age == 0 {
                SkipReason::UnknownIdentity
            } else {
                SkipReason::TicketsDisabled
            });
        };

        let record = match codec.unwrap_ticket(self.ctx.provider, candidate.identity) {
            TicketUnwrap::Ticket(record) => record,
            TicketUnwrap::NotATicket if candidate.obfuscated_ticket_age == 0 => {
                return skip(SkipReason::UnknownIdentity)
            },
            TicketUnwrap::NotATicket => return skip(SkipReason::NotATicket),
            TicketUnwrap::Invalid(msg) => return skip(SkipReason::InvalidTicket(msg)),
        };
        let Some(prf) = record.prf else {
            return skip(SkipReason::MissingPrf);
        };
        if record
            .check_reported_age(candidate.obfuscated_ticket_age)
            .is_none()
        {
            return skip(SkipReason::StaleTicket);
        }
        match record.derive_psk(self.ctx.provider) {
            Ok(psk) => Resolution::Resolved(ResolvedPsk {
                candidate,
                psk,
                prf,
                mode: BinderMode::Resumption,
            }),
            Err(_) => skip(SkipReason::DerivationFailed),
        }
    }
}

impl<'a, 'c> Iterator for CandidateResolver<'a, 'c> {
    type Item = Resolution<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let candidate = self.candidates.next()?;
        let resolution = self.resolve(candidate);
        if matches!(resolution, Resolution::HardError(_)) {
            self.failed = true;
        }
        Some(resolution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{HandshakeBuilder, LengthPrefix};
    use crate::credentials::{CredentialStore, ExternalPskStore, ServerPskCredentials};
    use crate::psk::{write_binder, write_identity, PskExtensionParser};
    use crate::ticket::{ObfuscatedAge, TicketCodec, TicketRecord};
    use crate::PskConfig;
    use std::sync::Arc;
    use tlspsk_crypto::CryptoProvider;
    use tlspsk_crypto_rustcrypto::RustCryptoProvider;

    /// Codec that treats identities starting with "T" as tickets.
    struct PrefixCodec {
        record: TicketRecord,
    }

    impl TicketCodec for PrefixCodec {
        fn unwrap_ticket(&self, _: &dyn CryptoProvider, identity: &[u8]) -> TicketUnwrap {
            match identity.first() {
                Some(b'T') => TicketUnwrap::Ticket(self.record.clone()),
                Some(b'X') => TicketUnwrap::Invalid("corrupt".into()),
                _ => TicketUnwrap::NotATicket,
            }
        }
    }

    struct FailingStore;

    impl CredentialStore for FailingStore {
        fn lookup_external_psk(&self, _: &str) -> Result<Option<Zeroizing<Vec<u8>>>> {
            Err(Error::InternalError("store offline".into()))
        }
    }

    fn record(prf: Option<HashAlgorithm>) -> TicketRecord {
        TicketRecord {
            prf,
            nonce: vec![1],
            resumption_master_secret: Zeroizing::new(vec![9; 32]),
            age_add: 1000,
            issued_at: 0,
            lifetime: 60,
        }
    }

    fn offer(ids: &[(&[u8], u32)]) -> Vec<u8> {
        let mut b = HandshakeBuilder::new();
        let list = b.open(LengthPrefix::U16).unwrap();
        for (id, age) in ids {
            write_identity(&mut b, id, *age).unwrap();
        }
        b.close(list).unwrap();
        let binders = b.open(LengthPrefix::U16).unwrap();
        for _ in ids {
            write_binder(&mut b, &[0; 32]).unwrap();
        }
        b.close(binders).unwrap();
        b.finish().unwrap()
    }

    fn store() -> ServerPskCredentials {
        let mut store = ExternalPskStore::new();
        store.insert("alice", &[5; 32]).unwrap();
        ServerPskCredentials::new(Arc::new(store), HashAlgorithm::Sha256)
    }

    fn outcomes(ctx: &ServerContext<'_>, data: &[u8]) -> Vec<String> {
        let parser = PskExtensionParser::parse(data).unwrap().unwrap();
        CandidateResolver::new(ctx, parser.candidates())
            .map(|r| match r {
                Resolution::Resolved(p) => format!("resolved {} {:?}", p.candidate.index, p.mode),
                Resolution::Skip { index, reason } => format!("skip {} {}", index, reason),
                Resolution::HardError(e) => format!("error {}", e),
            })
            .collect()
    }

    #[test]
    fn test_skips_until_external_match() {
        let provider = RustCryptoProvider::new();
        let config = PskConfig::default();
        let creds = store();
        let codec = PrefixCodec {
            record: record(Some(HashAlgorithm::Sha256)),
        };
        let ctx = ServerContext::new(&provider, &config)
            .with_credentials(&creds)
            .with_tickets(&codec);

        let stale = ObfuscatedAge::wrap(61_000, 1000);
        let data = offer(&[
            (b"Tstale", stale),
            (b"Xbroken", 5),
            (b"bob", 0),
            (b"alice", 0),
            (b"Tfresh", ObfuscatedAge::wrap(100, 1000)),
        ]);
        assert_eq!(
            outcomes(&ctx, &data),
            vec![
                "skip 0 stale ticket",
                "skip 1 invalid ticket: corrupt",
                "skip 2 unknown identity",
                "resolved 3 External",
                "resolved 4 Resumption",
            ]
        );
    }

    #[test]
    fn test_external_identity_matches_up_to_nul() {
        let provider = RustCryptoProvider::new();
        let config = PskConfig::default();
        let creds = store();
        let ctx = ServerContext::new(&provider, &config).with_credentials(&creds);
        let data = offer(&[(b"\0alice", 0), (b"alice\0junk", 0)]);
        assert_eq!(
            outcomes(&ctx, &data),
            vec!["skip 0 unknown identity", "resolved 1 External"]
        );
    }

    #[test]
    fn test_ticket_without_prf_skipped() {
        let provider = RustCryptoProvider::new();
        let config = PskConfig::default();
        let codec = PrefixCodec { record: record(None) };
        let ctx = ServerContext::new(&provider, &config).with_tickets(&codec);
        let data = offer(&[(b"Tx", ObfuscatedAge::wrap(100, 1000))]);
        assert_eq!(outcomes(&ctx, &data), vec!["skip 0 ticket without hash algorithm"]);
    }

    #[test]
    fn test_store_failure_aborts_and_fuses() {
        let provider = RustCryptoProvider::new();
        let config = PskConfig::default();
        let creds = ServerPskCredentials::new(Arc::new(FailingStore), HashAlgorithm::Sha256);
        let ctx = ServerContext::new(&provider, &config).with_credentials(&creds);
        let data = offer(&[(b"alice", 0), (b"bob", 0)]);
        let out = outcomes(&ctx, &data);
        assert_eq!(out.len(), 1);
        assert!(out[0].starts_with("error"));
    }

    #[test]
    fn test_external_without_store_is_insufficient_credentials() {
        let provider = RustCryptoProvider::new();
        let config = PskConfig::default();
        let codec = PrefixCodec {
            record: record(Some(HashAlgorithm::Sha256)),
        };
        let ctx = ServerContext::new(&provider, &config).with_tickets(&codec);
        let data = offer(&[(b"alice", 0)]);
        let parser = PskExtensionParser::parse(&data).unwrap().unwrap();
        assert!(matches!(
            CandidateResolver::new(&ctx, parser.candidates()).first_resolved(),
            Err(Error::InsufficientCredentials(_))
        ));
    }

    #[test]
    fn test_tickets_disabled() {
        let provider = RustCryptoProvider::new();
        let config = PskConfig::builder().with_session_tickets(false).build().unwrap();
        let creds = store();
        let codec = PrefixCodec {
            record: record(Some(HashAlgorithm::Sha256)),
        };
        let ctx = ServerContext::new(&provider, &config)
            .with_credentials(&creds)
            .with_tickets(&codec);
        let data = offer(&[(b"Tfresh", ObfuscatedAge::wrap(100, 1000))]);
        assert_eq!(outcomes(&ctx, &data), vec!["skip 0 tickets disabled"]);
    }

    #[test]
    fn test_long_zero_age_identity_goes_to_ticket_path() {
        let provider = RustCryptoProvider::new();
        let config = PskConfig::default();
        let creds = store();
        let ctx = ServerContext::new(&provider, &config).with_credentials(&creds);
        let long = vec![b'a'; 129];
        let data = offer(&[(&long, 0)]);
        assert_eq!(outcomes(&ctx, &data), vec!["skip 0 unknown identity"]);
    }
}
