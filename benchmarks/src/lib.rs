//! Shared fixtures for the PSK benchmarks.

use std::sync::Arc;
use tlspsk_core::{
    cipher::CipherSuite,
    client_hello::{ClientHello, ClientHelloView},
    codec::HandshakeBuilder,
    handler, psk_ke_modes, ClientContext, ExtensionContext, ExternalPskStore, Result,
    ServerContext, ServerPskCredentials, Session,
};
use tlspsk_crypto::HashAlgorithm;

/// External PSK identity known to [`server_credentials`].
pub const IDENTITY: &str = "bench-client";

/// External PSK value shared by both sides.
pub const KEY: [u8; 32] = [0x5a; 32];

/// Server credentials holding [`IDENTITY`].
pub fn server_credentials(prf: HashAlgorithm) -> ServerPskCredentials {
    let mut store = ExternalPskStore::new();
    // A non-empty key cannot be rejected.
    let _ = store.insert(IDENTITY, &KEY);
    ServerPskCredentials::new(Arc::new(store), prf)
}

/// Build a ClientHello carrying psk_key_exchange_modes and pre_shared_key.
pub fn client_hello(session: &mut Session, ctx: &ClientContext<'_>) -> Result<Vec<u8>> {
    let mut builder = HandshakeBuilder::new();
    let frame = ClientHello::new([0x42; 32], vec![CipherSuite::Aes128GcmSha256])
        .begin(&mut builder)?;
    psk_ke_modes::client_encode(session, ctx, &mut builder)?;
    handler::encode(session, &ExtensionContext::Client(*ctx), &mut builder)?;
    frame.end(&mut builder)?;
    builder.finish()
}

/// Run server selection over `client_hello` and return the ServerHello
/// extension bytes.
pub fn select(
    session: &mut Session,
    ctx: &ServerContext<'_>,
    client_hello: &[u8],
) -> Result<Vec<u8>> {
    let view = ClientHelloView::parse(client_hello)?;
    if let Some(modes) = view.extension(tlspsk_core::protocol::ExtensionType::PskKeyExchangeModes) {
        psk_ke_modes::server_decode(session, ctx, modes)?;
    }
    let ctx = ExtensionContext::Server(*ctx);
    if let Some(psk) = view.pre_shared_key()? {
        handler::decode(session, &ctx, client_hello, psk)?;
    }
    let mut builder = HandshakeBuilder::new();
    handler::encode(session, &ctx, &mut builder)?;
    builder.finish()
}
