//! Server side of the pre_shared_key extension.
//!
//! Selection walks the offered identities in order and stops at the first
//! one that resolves to a key. Only that candidate's binder is verified; a
//! mismatch is fatal rather than a reason to try the next identity.

use crate::binder;
use crate::codec::HandshakeBuilder;
use crate::context::ServerContext;
use crate::credentials::identity_name;
use crate::error::Result;
use crate::protocol::ExtensionType;
use crate::psk::{PreSharedKeyServerExtension, PskExtensionParser};
use crate::psk_ke_modes::PskKeyExchangeMode;
use crate::resolver::CandidateResolver;
use crate::session::{BinderSlot, PskState, Session};
use crate::transcript;
use crate::{binder::BinderMode, ExtensionOutcome};

/// Select a PSK from the client's offer.
///
/// `client_hello` is the complete ClientHello (handshake header included)
/// that carried `data` as its last extension. When the handshake was
/// retried, the session's log must already end with that ClientHello.
pub fn select(
    session: &mut Session,
    ctx: &ServerContext<'_>,
    client_hello: &[u8],
    data: &[u8],
) -> Result<ExtensionOutcome> {
    let Some(parser) = PskExtensionParser::parse(data)? else {
        tracing::debug!("client offered an empty PSK identity list");
        return Ok(ExtensionOutcome::NotApplicable);
    };

    let resolved = CandidateResolver::new(ctx, parser.candidates()).first_resolved()?;
    let Some(resolved) = resolved else {
        tracing::debug!("none of the {} offered PSK identities is usable", parser.len());
        session.set_psk_state(PskState::NotSelected);
        return Ok(ExtensionOutcome::NotApplicable);
    };

    let index = resolved.candidate.index;
    let received = parser.binder(index)?;
    let transcript = transcript::server_binder_transcript(
        session.retry_log(),
        client_hello,
        parser.binders_len(),
    )?;
    binder::verify_binder(
        ctx.provider,
        resolved.prf,
        &resolved.psk,
        resolved.mode,
        &transcript,
        received,
    )?;

    if session.key_exchange_modes().dhe_psk {
        session.set_selected_key_exchange_mode(PskKeyExchangeMode::PskDheKe);
        tracing::debug!("selected DHE-PSK mode");
    } else {
        session.set_selected_key_exchange_mode(PskKeyExchangeMode::PskKe);
        tracing::debug!("selected PSK mode");
    }

    match resolved.mode {
        BinderMode::External => {
            let name = identity_name(resolved.candidate.identity);
            let username = String::from_utf8_lossy(name).into_owned();
            tracing::info!("selected PSK identity: {} ({})", username, index);
            session.set_psk_username(username);
        },
        BinderMode::Resumption => {
            tracing::info!("selected resumption PSK identity ({})", index);
            session.set_resumed();
        },
    }

    *session.slots_mut() = [
        Some(BinderSlot {
            psk: resolved.psk,
            prf: resolved.prf,
            resumption: resolved.mode == BinderMode::Resumption,
            idx: index,
        }),
        None,
    ];
    session.set_psk_state(PskState::Selected(resolved.mode));
    Ok(ExtensionOutcome::Processed)
}

/// Write the ServerHello extension carrying the selected index.
pub fn send_selection(
    session: &Session,
    builder: &mut HandshakeBuilder,
) -> Result<ExtensionOutcome> {
    let Some(slot) = session.selected_slot() else {
        return Ok(ExtensionOutcome::NotApplicable);
    };

    let checkpoint = builder.checkpoint();
    let start = builder.len();
    let written = builder
        .begin_extension(ExtensionType::PreSharedKey)
        .and_then(|ext| {
            PreSharedKeyServerExtension::new(slot.idx).encode(builder)?;
            builder.close(ext)
        });
    if let Err(e) = written {
        builder.rollback(checkpoint);
        return Err(e);
    }
    Ok(ExtensionOutcome::Written(builder.len() - start))
}
