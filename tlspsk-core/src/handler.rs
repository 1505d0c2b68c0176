//! Entry points called by the extension dispatcher.
//!
//! [`encode`] and [`decode`] route to the client or server half depending
//! on the session's role and apply the gates shared by both: the PSK
//! extension only exists in TLS 1.3 and must travel together with
//! psk_key_exchange_modes.

use crate::client;
use crate::client_hello::ClientHelloView;
use crate::codec::HandshakeBuilder;
use crate::context::ExtensionContext;
use crate::error::{Error, Result};
use crate::server;
use crate::session::{Role, Session};
use crate::ExtensionOutcome;

fn role_mismatch(session: &Session) -> Error {
    Error::InternalError(format!(
        "{:?} session used with the other side's context",
        session.role()
    ))
}

/// Produce the pre_shared_key extension for the session's next message.
///
/// Client: the ClientHello offer. `builder` must hold the ClientHello from
/// its handshake header on, with all other extensions already written.
/// Server: the ServerHello `selected_identity`.
pub fn encode(
    session: &mut Session,
    ctx: &ExtensionContext<'_>,
    builder: &mut HandshakeBuilder,
) -> Result<ExtensionOutcome> {
    if !session.version().supports_psk_extension() {
        return Ok(ExtensionOutcome::NotApplicable);
    }

    match (session.role(), ctx) {
        (Role::Client, ExtensionContext::Client(ctx)) => {
            // A server must not select a PSK without psk_key_exchange_modes
            // (RFC 8446 4.2.9), so nothing is offered here, tickets included.
            if !session.key_exchange_modes().sent {
                return Ok(ExtensionOutcome::NotApplicable);
            }
            client::build_offer(session, ctx, builder)
        },
        (Role::Server, ExtensionContext::Server(_)) => server::send_selection(session, builder),
        _ => Err(role_mismatch(session)),
    }
}

/// Process a received pre_shared_key extension.
///
/// `message` is the complete handshake message (header included) that
/// carried `data`.
pub fn decode(
    session: &mut Session,
    ctx: &ExtensionContext<'_>,
    message: &[u8],
    data: &[u8],
) -> Result<ExtensionOutcome> {
    if !session.version().supports_psk_extension() {
        return Ok(ExtensionOutcome::NotApplicable);
    }

    match (session.role(), ctx) {
        (Role::Client, ExtensionContext::Client(ctx)) => {
            if !session.key_exchange_modes().sent {
                return Err(Error::IllegalExtension(
                    "pre_shared_key in ServerHello without an offer".into(),
                ));
            }
            client::process_selection(session, ctx, data)
        },
        (Role::Server, ExtensionContext::Server(ctx)) => {
            let modes = session.key_exchange_modes();
            if !modes.received {
                return Err(Error::IllegalExtension(
                    "pre_shared_key without psk_key_exchange_modes".into(),
                ));
            }
            if modes.invalid {
                tracing::debug!("ignoring PSK offer: no acceptable key exchange mode");
                return Ok(ExtensionOutcome::NotApplicable);
            }
            if ctx.credentials.is_none() && ctx.ticket_codec().is_none() {
                return Ok(ExtensionOutcome::NotApplicable);
            }

            let view = ClientHelloView::parse(message)?;
            if view.pre_shared_key()? != Some(data) {
                return Err(Error::IllegalParameter(
                    "pre_shared_key payload does not belong to this ClientHello".into(),
                ));
            }
            server::select(session, ctx, message, data)
        },
        _ => Err(role_mismatch(session)),
    }
}

/// The ServerHello arrived without pre_shared_key.
pub fn server_hello_without_psk(session: &mut Session) {
    if session.role() == Role::Client {
        client::offer_declined(session);
    }
}
