//! Client side of the pre_shared_key extension.
//!
//! [`build_offer`] appends the extension to a ClientHello under
//! construction: the identity list first, then one binder per identity
//! computed over the message as it will look once the binders are in
//! place. [`process_selection`] applies the server's choice.

use crate::binder::{self, BinderMode};
use crate::codec::{HandshakeBuilder, LengthPrefix};
use crate::context::ClientContext;
use crate::error::{Error, Result};
use crate::key_schedule;
use crate::protocol::ExtensionType;
use crate::psk::{write_binder, write_identity, PreSharedKeyServerExtension};
use crate::session::{BinderSlot, PskState, Session, BINDER_SLOTS};
use crate::ticket::TicketAge;
use crate::transcript;
use crate::ExtensionOutcome;
use tlspsk_crypto::HashAlgorithm;
use zeroize::Zeroizing;

struct PendingPsk {
    psk: Zeroizing<Vec<u8>>,
    prf: HashAlgorithm,
    resumption: bool,
}

enum TicketOffer {
    Offer {
        identity: Vec<u8>,
        obfuscated_age: u32,
        psk: Zeroizing<Vec<u8>>,
        prf: HashAlgorithm,
    },
    Discard(&'static str),
}

fn prepare_ticket(session: &Session, ctx: &ClientContext<'_>) -> Result<Option<TicketOffer>> {
    if !ctx.config.session_tickets {
        return Ok(None);
    }
    let Some(ticket) = session.ticket() else {
        return Ok(None);
    };
    let Some(prf) = ticket.record.prf else {
        return Err(Error::InternalError("stored ticket has no hash algorithm".into()));
    };

    let age = match ticket.age_at(ctx.now) {
        TicketAge::Fresh(age) => age,
        TicketAge::Implausible => return Ok(Some(TicketOffer::Discard("implausible age"))),
        TicketAge::Expired => return Ok(Some(TicketOffer::Discard("expired"))),
    };
    let psk = match ticket.record.derive_psk(ctx.provider) {
        Ok(psk) => psk,
        Err(_) => return Ok(Some(TicketOffer::Discard("PSK derivation failed"))),
    };

    Ok(Some(TicketOffer::Offer {
        identity: ticket.ticket.clone(),
        obfuscated_age: ticket.obfuscated_age(age),
        psk,
        prf,
    }))
}

/// Append the pre_shared_key extension.
///
/// `builder` must hold the ClientHello under construction starting at its
/// handshake header, with the extensions block open and every other
/// extension already written. On error the builder is rolled back and the
/// session's binder slots are left untouched.
pub fn build_offer(
    session: &mut Session,
    ctx: &ClientContext<'_>,
    builder: &mut HandshakeBuilder,
) -> Result<ExtensionOutcome> {
    let checkpoint = builder.checkpoint();
    let start = builder.len();
    match write_offer(session, ctx, builder) {
        Ok(true) => Ok(ExtensionOutcome::Written(builder.len() - start)),
        Ok(false) => {
            builder.rollback(checkpoint);
            Ok(ExtensionOutcome::NotApplicable)
        },
        Err(e) => {
            builder.rollback(checkpoint);
            Err(e)
        },
    }
}

fn write_offer(
    session: &mut Session,
    ctx: &ClientContext<'_>,
    builder: &mut HandshakeBuilder,
) -> Result<bool> {
    let provider = ctx.provider;
    let mut pending: [Option<PendingPsk>; BINDER_SLOTS] = [None, None];
    let mut count = 0;
    let mut ticket_offered = false;

    let ext = builder.begin_extension(ExtensionType::PreSharedKey)?;
    let identities = builder.open(LengthPrefix::U16)?;

    let ticket = match prepare_ticket(session, ctx) {
        Ok(offer) => offer,
        Err(e) => {
            session.clear_ticket();
            return Err(e);
        },
    };
    match ticket {
        Some(TicketOffer::Offer {
            identity,
            obfuscated_age,
            psk,
            prf,
        }) => {
            write_identity(builder, &identity, obfuscated_age)?;
            pending[count] = Some(PendingPsk {
                psk,
                prf,
                resumption: true,
            });
            count += 1;
            ticket_offered = true;
        },
        Some(TicketOffer::Discard(reason)) => {
            tracing::debug!("discarding session ticket: {}", reason);
            session.clear_ticket();
        },
        None => {},
    }

    if let Some(credentials) = ctx.credentials.filter(|c| c.is_usable()) {
        let prf = credentials.binder_prf().ok_or_else(|| {
            Error::InsufficientCredentials("external PSK has no binder hash".into())
        })?;
        credentials.validate_identity()?;
        write_identity(builder, credentials.identity(), 0)?;
        pending[count] = Some(PendingPsk {
            psk: Zeroizing::new(credentials.key().to_vec()),
            prf,
            resumption: false,
        });
        count += 1;
    }

    if count == 0 {
        return Ok(false);
    }
    builder.close(identities)?;

    let mut binder_list_len = 0;
    for psk in pending.iter().flatten() {
        binder_list_len += 1 + key_schedule::prf_output_size(provider, psk.prf)?;
    }
    let transcript =
        transcript::client_binder_transcript(session.retry_log(), builder, binder_list_len)?;

    let binders = builder.open(LengthPrefix::U16)?;
    for psk in pending.iter().flatten() {
        let mode = BinderMode::from_resumption(psk.resumption);
        let binder = binder::compute_binder(provider, psk.prf, &psk.psk, mode, &transcript)?;
        if binder.len() != key_schedule::prf_output_size(provider, psk.prf)? {
            return Err(Error::InternalError(
                "binder length differs from the reserved size".into(),
            ));
        }
        write_binder(builder, &binder)?;
    }
    builder.close(binders)?;
    builder.close(ext)?;

    let slots = session.slots_mut();
    *slots = [None, None];
    for (idx, psk) in pending.into_iter().flatten().enumerate() {
        if psk.resumption {
            tracing::debug!("sent PSK resumption identity ({})", idx);
        } else {
            tracing::debug!(
                "sent PSK identity '{}' ({})",
                ctx.credentials
                    .map(|c| String::from_utf8_lossy(c.identity()).into_owned())
                    .unwrap_or_default(),
                idx
            );
        }
        slots[idx] = Some(BinderSlot {
            psk: psk.psk,
            prf: psk.prf,
            resumption: psk.resumption,
            idx: idx as u16,
        });
    }
    if ticket_offered {
        session.set_ticket_sent();
    }
    session.set_psk_state(PskState::Offered);
    Ok(true)
}

/// Apply the server's `selected_identity`.
///
/// The matching slot is moved to position 0. An index that matches no
/// offered identity is ignored unless `require_selected_match` is set, in
/// which case it is an illegal parameter.
pub fn process_selection(
    session: &mut Session,
    ctx: &ClientContext<'_>,
    data: &[u8],
) -> Result<ExtensionOutcome> {
    let selected = PreSharedKeyServerExtension::decode(data)?.selected_identity;

    let slots = session.slots_mut();
    let position = slots
        .iter()
        .position(|slot| slot.as_ref().is_some_and(|s| s.idx == selected));
    let Some(position) = position else {
        if ctx.config.require_selected_match {
            return Err(Error::IllegalParameter(format!(
                "server selected PSK identity {} which was not offered",
                selected
            )));
        }
        tracing::debug!("ignoring selection of unknown PSK identity {}", selected);
        session.set_psk_state(PskState::NotSelected);
        return Ok(ExtensionOutcome::NotApplicable);
    };

    if position != 0 {
        slots.swap(0, position);
    }
    let mode = slots[0]
        .as_ref()
        .map(BinderSlot::mode)
        .ok_or_else(|| Error::InternalError("selected slot vanished".into()))?;

    match mode {
        BinderMode::Resumption => {
            session.set_resumed();
            tracing::info!("selected PSK-resumption mode ({})", selected);
        },
        BinderMode::External => tracing::info!("selected PSK mode ({})", selected),
    }
    session.set_psk_state(PskState::Selected(mode));
    Ok(ExtensionOutcome::Processed)
}

/// The ServerHello carried no pre_shared_key: the offer was declined.
pub fn offer_declined(session: &mut Session) {
    if session.psk_state() == PskState::Offered {
        session.set_psk_state(PskState::NotSelected);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client_hello::ClientHello;
    use crate::cipher::CipherSuite;
    use crate::credentials::ClientPskCredentials;
    use crate::protocol::ProtocolVersion;
    use crate::ticket::{SessionTicket, TicketRecord};
    use crate::PskConfig;
    use tlspsk_crypto::CryptoProvider;
    use tlspsk_crypto_rustcrypto::RustCryptoProvider;

    const NOW: u64 = 1_700_000_000;

    fn ticket(age: u64, prf: Option<HashAlgorithm>) -> SessionTicket {
        SessionTicket {
            ticket: b"opaque-ticket".to_vec(),
            record: TicketRecord {
                prf,
                nonce: vec![0, 0],
                resumption_master_secret: Zeroizing::new(vec![0x11; 32]),
                age_add: 5,
                issued_at: NOW - age,
                lifetime: 3600,
            },
        }
    }

    fn hello_builder() -> (HandshakeBuilder, crate::client_hello::ClientHelloFrame) {
        let mut builder = HandshakeBuilder::new();
        let frame = ClientHello::new([3; 32], vec![CipherSuite::Aes128GcmSha256])
            .begin(&mut builder)
            .unwrap();
        (builder, frame)
    }

    #[test]
    fn test_ticket_and_external_slots_in_order() {
        let provider = RustCryptoProvider::new();
        let config = PskConfig::default();
        let creds = ClientPskCredentials::new("alice", &[2; 32], HashAlgorithm::Sha384);
        let ctx = ClientContext::new(&provider, &config)
            .with_credentials(&creds)
            .at(NOW);

        let mut session = Session::resuming(
            ProtocolVersion::Tls13,
            ticket(10, Some(HashAlgorithm::Sha256)),
        );
        let (mut builder, _frame) = hello_builder();
        let outcome = build_offer(&mut session, &ctx, &mut builder).unwrap();
        // 4 + 2 + (2+13+4) + (2+5+4) + 2 + 33 + 49
        assert_eq!(outcome, ExtensionOutcome::Written(120));

        let first = session.slot(0).unwrap();
        assert!(first.resumption);
        assert_eq!((first.idx, first.prf), (0, HashAlgorithm::Sha256));
        let second = session.slot(1).unwrap();
        assert!(!second.resumption);
        assert_eq!((second.idx, second.prf), (1, HashAlgorithm::Sha384));
        assert_eq!(session.psk_state(), PskState::Offered);
        assert!(session.ticket_sent());
    }

    #[test]
    fn test_expired_ticket_discarded() {
        let provider = RustCryptoProvider::new();
        let config = PskConfig::default();
        let ctx = ClientContext::new(&provider, &config).at(NOW);

        let mut session = Session::resuming(
            ProtocolVersion::Tls13,
            ticket(4000, Some(HashAlgorithm::Sha256)),
        );
        let (mut builder, _frame) = hello_builder();
        let before = builder.len();
        assert_eq!(
            build_offer(&mut session, &ctx, &mut builder).unwrap(),
            ExtensionOutcome::NotApplicable
        );
        assert_eq!(builder.len(), before);
        assert!(session.ticket().is_none());
        assert_eq!(session.psk_state(), PskState::NotOffered);
    }

    #[test]
    fn test_ticket_without_prf_is_internal_error() {
        let provider = RustCryptoProvider::new();
        let config = PskConfig::default();
        let ctx = ClientContext::new(&provider, &config).at(NOW);
        let mut session = Session::resuming(ProtocolVersion::Tls13, ticket(10, None));
        let (mut builder, _frame) = hello_builder();
        let before = builder.len();
        assert!(matches!(
            build_offer(&mut session, &ctx, &mut builder),
            Err(Error::InternalError(_))
        ));
        assert!(session.ticket().is_none());
        assert_eq!(builder.len(), before);
    }

    #[test]
    fn test_credentials_without_binder_prf() {
        let provider = RustCryptoProvider::new();
        let config = PskConfig::default();
        let creds = ClientPskCredentials::without_binder_prf("alice", &[2; 32]);
        let ctx = ClientContext::new(&provider, &config)
            .with_credentials(&creds)
            .at(NOW);
        let mut session = Session::client(ProtocolVersion::Tls13);
        let (mut builder, _frame) = hello_builder();
        assert!(matches!(
            build_offer(&mut session, &ctx, &mut builder),
            Err(Error::InsufficientCredentials(_))
        ));
        assert!(session.slot(0).is_none());
    }

    #[test]
    fn test_empty_identity_rejected_and_rolled_back() {
        let provider = RustCryptoProvider::new();
        let config = PskConfig::default();
        let creds = ClientPskCredentials::new(Vec::<u8>::new(), &[2; 32], HashAlgorithm::Sha256);
        let ctx = ClientContext::new(&provider, &config)
            .with_credentials(&creds)
            .at(NOW);
        let mut session = Session::resuming(
            ProtocolVersion::Tls13,
            ticket(10, Some(HashAlgorithm::Sha256)),
        );
        let (mut builder, _frame) = hello_builder();
        let before = builder.len();
        assert_eq!(
            build_offer(&mut session, &ctx, &mut builder),
            Err(Error::InvalidIdentity(0))
        );
        assert_eq!(builder.len(), before);
        assert!(session.slot(0).is_none());
        assert_eq!(session.psk_state(), PskState::NotOffered);
    }

    fn offered_session() -> Session {
        let mut session = Session::client(ProtocolVersion::Tls13);
        for idx in 0..2u16 {
            session.slots_mut()[idx as usize] = Some(BinderSlot {
                psk: Zeroizing::new(vec![idx as u8; 32]),
                prf: HashAlgorithm::Sha256,
                resumption: idx == 0,
                idx,
            });
        }
        session.set_psk_state(PskState::Offered);
        session
    }

    #[test]
    fn test_selection_swaps_slots() {
        let provider = RustCryptoProvider::new();
        let config = PskConfig::default();
        let ctx = ClientContext::new(&provider, &config);
        let mut session = offered_session();

        process_selection(&mut session, &ctx, &[0, 1]).unwrap();
        assert_eq!(session.psk_state(), PskState::Selected(BinderMode::External));
        let slot = session.selected_slot().unwrap();
        assert_eq!(slot.idx, 1);
        assert_eq!(&slot.psk[..], &[1u8; 32][..]);
        assert!(!session.is_resumed());
    }

    #[test]
    fn test_selection_of_first_keeps_order() {
        let provider = RustCryptoProvider::new();
        let config = PskConfig::default();
        let ctx = ClientContext::new(&provider, &config);
        let mut session = offered_session();

        process_selection(&mut session, &ctx, &[0, 0]).unwrap();
        assert_eq!(session.slot(0).unwrap().idx, 0);
        assert_eq!(session.slot(1).unwrap().idx, 1);
        assert!(session.is_resumed());
    }

    #[test]
    fn test_unknown_selection_lenient_and_strict() {
        let provider = RustCryptoProvider::new();
        let config = PskConfig::default();
        let ctx = ClientContext::new(&provider, &config);
        let mut session = offered_session();
        assert_eq!(
            process_selection(&mut session, &ctx, &[0, 7]).unwrap(),
            ExtensionOutcome::NotApplicable
        );
        assert_eq!(session.psk_state(), PskState::NotSelected);

        let strict = PskConfig::builder().with_selected_match_required(true).build().unwrap();
        let ctx = ClientContext::new(&provider, &strict);
        let mut session = offered_session();
        assert!(matches!(
            process_selection(&mut session, &ctx, &[0, 7]),
            Err(Error::IllegalParameter(_))
        ));
    }

    #[test]
    fn test_offer_declined() {
        let mut session = offered_session();
        offer_declined(&mut session);
        assert_eq!(session.psk_state(), PskState::NotSelected);
    }
}
