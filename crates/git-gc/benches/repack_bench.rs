use criterion::{criterion_group, criterion_main, Criterion};
use git_hash::ObjectId;
use git_object::{Blob, Object};
use git_pack::delta::engine::DeltaEngine;
use git_repository::Repository;
use git_utils::cancel::CancellationToken;
use std::path::PathBuf;

fn fixture_repo() -> (tempfile::TempDir, Repository, Vec<ObjectId>) {
    let dir = tempfile::tempdir().expect("tempdir");
    let repo = Repository::init(dir.path()).expect("init");

    let mut oids = Vec::new();
    let mut content = String::from("line of blob content\n").repeat(64);
    for i in 0..50 {
        content.push_str(&format!("revision marker {i}\n"));
        let oid = repo
            .odb()
            .write(&Object::Blob(Blob::new(content.as_bytes().to_vec())))
            .expect("write blob");
        oids.push(oid);
    }

    (dir, repo, oids)
}

fn bench_repack_reachable(c: &mut Criterion) {
    let (dir, repo, oids) = fixture_repo();
    let pack_dir: PathBuf = dir.path().join(".git/objects/pack");
    std::fs::create_dir_all(&pack_dir).expect("mkdir pack dir");
    let engine = DeltaEngine::git_native();

    c.bench_function("repack_50_similar_blobs", |b| {
        b.iter(|| {
            let name = format!("bench-{}", oids.len());
            git_gc::repack::repack_reachable(
                &repo,
                &oids,
                &pack_dir,
                &name,
                &engine,
                &CancellationToken::new(),
            )
            .expect("repack");
        });
    });
}

criterion_group!(benches, bench_repack_reachable);
criterion_main!(benches);
