//! PSK Handshake Benchmarks
//!
//! This benchmark suite measures:
//! - ClientHello offer construction (external PSK, ticket + external PSK)
//! - Server selection including ticket decryption and binder verification
//! - The full offer / select / acknowledge round trip

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tlspsk_benchmarks::{client_hello, select, server_credentials, IDENTITY, KEY};
use tlspsk_core::{
    handler, ClientContext, ClientPskCredentials, ExtensionContext, ProtocolVersion, PskConfig,
    ServerContext, Session, TicketEncryptor,
};
use tlspsk_crypto::{CryptoProvider, HashAlgorithm};
use tlspsk_crypto_rustcrypto::RustCryptoProvider;

fn benchmark_offer(c: &mut Criterion) {
    let mut group = c.benchmark_group("psk_offer");
    let provider = RustCryptoProvider::new();
    let config = PskConfig::default();
    let creds = ClientPskCredentials::new(IDENTITY, &KEY, HashAlgorithm::Sha256);
    let tickets = TicketEncryptor::new(&provider, 86_400).unwrap();
    let ticket = tickets
        .issue_ticket(&provider, HashAlgorithm::Sha256, &[0x33; 32], 3600)
        .unwrap();
    let ctx = ClientContext::new(&provider, &config)
        .with_credentials(&creds)
        .at(ticket.record.issued_at + 10);

    group.bench_function("external", |b| {
        b.iter(|| {
            let mut session = Session::client(ProtocolVersion::Tls13);
            black_box(client_hello(&mut session, &ctx).unwrap())
        });
    });

    group.bench_function("ticket_and_external", |b| {
        b.iter(|| {
            let mut session = Session::resuming(ProtocolVersion::Tls13, ticket.clone());
            black_box(client_hello(&mut session, &ctx).unwrap())
        });
    });

    group.finish();
}

fn benchmark_select(c: &mut Criterion) {
    let mut group = c.benchmark_group("psk_select");
    let provider = RustCryptoProvider::new();
    let config = PskConfig::default();
    let client_creds = ClientPskCredentials::new(IDENTITY, &KEY, HashAlgorithm::Sha256);
    let server_creds = server_credentials(HashAlgorithm::Sha256);
    let tickets = TicketEncryptor::new(&provider, 86_400).unwrap();
    let ticket = tickets
        .issue_ticket(&provider, HashAlgorithm::Sha256, &[0x33; 32], 3600)
        .unwrap();
    let now = ticket.record.issued_at + 10;

    let external_hello = {
        let ctx = ClientContext::new(&provider, &config).with_credentials(&client_creds);
        client_hello(&mut Session::client(ProtocolVersion::Tls13), &ctx).unwrap()
    };
    let ticket_hello = {
        let ctx = ClientContext::new(&provider, &config).at(now);
        client_hello(&mut Session::resuming(ProtocolVersion::Tls13, ticket), &ctx).unwrap()
    };
    let server_ctx = ServerContext::new(&provider, &config)
        .with_credentials(&server_creds)
        .with_tickets(&tickets);

    group.bench_function("external", |b| {
        b.iter(|| {
            let mut session = Session::server(ProtocolVersion::Tls13);
            black_box(select(&mut session, &server_ctx, &external_hello).unwrap())
        });
    });

    group.bench_function("ticket", |b| {
        b.iter(|| {
            let mut session = Session::server(ProtocolVersion::Tls13);
            black_box(select(&mut session, &server_ctx, &ticket_hello).unwrap())
        });
    });

    group.finish();
}

fn benchmark_round_trip(c: &mut Criterion) {
    let provider = RustCryptoProvider::new();
    let config = PskConfig::default();
    let client_creds = ClientPskCredentials::new(IDENTITY, &KEY, HashAlgorithm::Sha256);
    let server_creds = server_credentials(HashAlgorithm::Sha256);
    let client_ctx = ClientContext::new(&provider, &config).with_credentials(&client_creds);
    let server_ctx = ServerContext::new(&provider, &config).with_credentials(&server_creds);

    c.bench_function("psk_round_trip", |b| {
        b.iter(|| {
            let mut client = Session::client(ProtocolVersion::Tls13);
            let mut server = Session::server(ProtocolVersion::Tls13);
            let hello = client_hello(&mut client, &client_ctx).unwrap();
            let reply = select(&mut server, &server_ctx, &hello).unwrap();
            handler::decode(
                &mut client,
                &ExtensionContext::Client(client_ctx),
                &reply,
                &reply[4..],
            )
            .unwrap();
            black_box((client, server))
        });
    });
}

criterion_group!(benches, benchmark_offer, benchmark_select, benchmark_round_trip);
criterion_main!(benches);
