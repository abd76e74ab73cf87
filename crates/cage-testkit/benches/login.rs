use criterion::{black_box, criterion_group, criterion_main, Criterion};

use cage_core::{DigestAlgorithm, PasswordHasher, PermissionTable, PermissionValue, DEFAULT_SALT};
use cage_perms::{ChallengeVerifier, LoginChallenge, DEFAULT_LOGIN_WINDOW_MS};
use cage_render::RendererRegistry;

const NOW: i64 = 1_700_000_000_000;

fn bench_digest(c: &mut Criterion) {
    let sha1 = PasswordHasher::new(DigestAlgorithm::Sha1, DEFAULT_SALT);
    let blake3 = PasswordHasher::new(DigestAlgorithm::Blake3, DEFAULT_SALT);

    c.bench_function("hash_password_sha1", |b| {
        b.iter(|| sha1.hash_password(black_box("password-123")))
    });
    c.bench_function("hash_password_blake3", |b| {
        b.iter(|| blake3.hash_password(black_box("password-123")))
    });
}

fn bench_verify(c: &mut Criterion) {
    let verifier = ChallengeVerifier::new(PasswordHasher::default(), DEFAULT_LOGIN_WINDOW_MS);
    let stored = verifier.hasher().hash_password("password-123");
    let challenge = LoginChallenge::new(
        "alice",
        verifier.client_cipher("password-123", NOW),
        NOW,
    );

    c.bench_function("verify_challenge", |b| {
        b.iter(|| verifier.verify(&stored, black_box(&challenge), NOW))
    });
}

fn bench_permissions(c: &mut Criterion) {
    let table = PermissionTable::standard().unwrap();
    let names: Vec<&str> = table.names(PermissionValue::AUTHOR);

    c.bench_function("parse_flag_names", |b| b.iter(|| table.parse(black_box(&names))));
    c.bench_function("decode_author", |b| {
        b.iter(|| table.names(black_box(PermissionValue::AUTHOR)))
    });
}

fn bench_render(c: &mut Criterion) {
    let registry = RendererRegistry::with_builtins().unwrap();
    let source = "# Title\n\nSome *emphasis*, a [link](https://example.com).\n\n```rust\nfn main() {}\n```\n"
        .repeat(20);

    c.bench_function("render_markdown", |b| {
        b.iter(|| registry.render("md", black_box(&source)))
    });
}

criterion_group!(benches, bench_digest, bench_verify, bench_permissions, bench_render);
criterion_main!(benches);
