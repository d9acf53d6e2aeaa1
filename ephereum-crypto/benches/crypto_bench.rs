//! Criterion benchmarks for Ephereum crypto: keygen, ECDH, HKDF, AEAD, view tag, derivation.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use ephereum_crypto::derive;
use ephereum_crypto::{
    compute_view_tag, decrypt, derive_symmetric_key, ecdh, encrypt, generate_keypair,
};

fn bench_keygen(c: &mut Criterion) {
    let mut g = c.benchmark_group("keygen");
    g.throughput(Throughput::Elements(1));
    g.bench_function("generate_keypair", |b| {
        b.iter(|| black_box(generate_keypair()));
    });
    g.finish();
}

fn bench_ecdh(c: &mut Criterion) {
    let a = generate_keypair();
    let b_pair = generate_keypair();
    let mut g = c.benchmark_group("ecdh");
    g.throughput(Throughput::Elements(1));
    g.bench_function("ecdh", |b| {
        b.iter(|| black_box(ecdh(&a.private_key, &b_pair.public_key)).unwrap());
    });
    g.finish();
}

fn bench_symmetric(c: &mut Criterion) {
    let shared = [0x42u8; 32];
    let key = derive_symmetric_key(shared, "stealth-chat-v1").unwrap();
    let plaintext = vec![0xABu8; 1024];
    let sealed = encrypt(&key, &plaintext, None).unwrap();

    let mut g = c.benchmark_group("symmetric");
    g.throughput(Throughput::Bytes(plaintext.len() as u64));
    g.bench_function("hkdf", |b| {
        b.iter(|| black_box(derive_symmetric_key(shared, "stealth-chat-v1")).unwrap());
    });
    g.bench_function("encrypt_1k", |b| {
        b.iter(|| black_box(encrypt(&key, &plaintext, None)).unwrap());
    });
    g.bench_function("decrypt_1k", |b| {
        b.iter(|| black_box(decrypt(&key, &sealed.ciphertext, &sealed.nonce, None)).unwrap());
    });
    g.finish();
}

fn bench_view_tag(c: &mut Criterion) {
    let shared = [0x17u8; 32];
    let mut g = c.benchmark_group("view_tag");
    g.throughput(Throughput::Elements(1));
    g.bench_function("compute_view_tag", |b| {
        b.iter(|| black_box(compute_view_tag(&shared)));
    });
    g.finish();
}

fn bench_stealth_derivation(c: &mut Criterion) {
    let spending = generate_keypair();
    let viewing = generate_keypair();
    let ephemeral = generate_keypair();
    let shared = ecdh(&ephemeral.private_key, &viewing.public_key).unwrap();
    let ss = shared.as_bytes();
    let tag = compute_view_tag(ss);

    let mut g = c.benchmark_group("stealth_derivation");
    g.throughput(Throughput::Elements(1));
    g.bench_function("derive_stealth_address", |b| {
        b.iter(|| black_box(derive::derive_stealth_address(&spending.public_key, ss, tag)).unwrap());
    });
    g.bench_function("derive_stealth_keys", |b| {
        b.iter(|| {
            black_box(derive::derive_stealth_keys(
                &spending.public_key,
                &spending.private_key,
                ss,
                tag,
            ))
            .unwrap()
        });
    });
    g.finish();
}

criterion_group!(
    benches,
    bench_keygen,
    bench_ecdh,
    bench_symmetric,
    bench_view_tag,
    bench_stealth_derivation
);
criterion_main!(benches);
