//! Tests for the content-verified artifact cache.

mod common;

use std::fs;
use std::path::Path;
use std::sync::{Arc, Barrier};

use kiln_isolation::ArtifactJail;
use kiln_runtime::{ArtifactCache, FailureKind, RuntimeError};
use tempfile::TempDir;

use common::{artifact, manifest, FakeFetcher};

fn entries(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .expect("read dir")
        .map(|e| e.expect("entry").file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

// ---------------------------------------------------------------------------
// Hits and misses
// ---------------------------------------------------------------------------

#[test]
fn second_ensure_is_a_cache_hit() {
    let dir = TempDir::new().expect("tmp");
    let fetcher = FakeFetcher::new();
    let a = artifact("demo.zip", b"demo bytes");
    fetcher.serve(&a.url, b"demo bytes".to_vec());
    let cache = ArtifactCache::new(fetcher.clone(), 3);
    let target = dir.path().join("demo").join("1.0").join("demo.zip");

    cache.ensure(&a, &target).expect("first");
    cache.ensure(&a, &target).expect("second");

    assert_eq!(fetcher.hits(&a.url), 1);
    assert_eq!(fs::read(&target).expect("read"), b"demo bytes");
}

#[test]
fn uppercase_declared_digest_still_hits() {
    let dir = TempDir::new().expect("tmp");
    let fetcher = FakeFetcher::new();
    let mut a = artifact("demo.zip", b"demo bytes");
    a.sha256 = a.sha256.to_uppercase();
    fetcher.serve(&a.url, b"demo bytes".to_vec());
    let cache = ArtifactCache::new(fetcher.clone(), 3);
    let target = dir.path().join("demo.zip");

    cache.ensure(&a, &target).expect("first");
    cache.ensure(&a, &target).expect("second");
    assert_eq!(fetcher.hits(&a.url), 1);
}

#[test]
fn corrupted_file_is_replaced() {
    let dir = TempDir::new().expect("tmp");
    let fetcher = FakeFetcher::new();
    let a = artifact("demo.zip", b"good");
    fetcher.serve(&a.url, b"good".to_vec());
    let cache = ArtifactCache::new(fetcher.clone(), 3);
    let target = dir.path().join("demo.zip");

    cache.ensure(&a, &target).expect("first");
    fs::write(&target, b"tampered").expect("tamper");
    cache.ensure(&a, &target).expect("second");

    assert_eq!(fetcher.hits(&a.url), 2);
    assert_eq!(fs::read(&target).expect("read"), b"good");
}

// ---------------------------------------------------------------------------
// Failures
// ---------------------------------------------------------------------------

#[test]
fn mismatched_download_leaves_nothing_behind() {
    let dir = TempDir::new().expect("tmp");
    let fetcher = FakeFetcher::new();
    let a = artifact("demo.zip", b"expected");
    fetcher.serve(&a.url, b"evil".to_vec());
    let cache = ArtifactCache::new(fetcher, 3);
    let target = dir.path().join("demo.zip");

    let err = cache.ensure(&a, &target).expect_err("mismatch");
    match &err {
        RuntimeError::Integrity {
            file_name,
            expected,
            actual,
        } => {
            assert_eq!(file_name, "demo.zip");
            assert_eq!(expected, &a.sha256);
            assert_eq!(actual, &kiln_runtime::digest_bytes(b"evil"));
        }
        other => panic!("expected integrity error, got {other:?}"),
    }
    assert!(!target.exists());
    assert!(entries(dir.path()).is_empty());
    assert_eq!(cache.failure_count(&target), 1);
}

#[test]
fn corrupted_cache_with_bad_source_never_keeps_bad_bytes() {
    let dir = TempDir::new().expect("tmp");
    let fetcher = FakeFetcher::new();
    let a = artifact("demo.zip", b"expected");
    fetcher.serve(&a.url, b"evil".to_vec());
    let cache = ArtifactCache::new(fetcher, 3);
    let target = dir.path().join("demo.zip");
    fs::write(&target, b"stale").expect("stale");

    assert!(cache.ensure(&a, &target).is_err());
    assert!(!target.exists());
}

#[test]
fn redownload_is_bounded() {
    let dir = TempDir::new().expect("tmp");
    let fetcher = FakeFetcher::new();
    let a = artifact("demo.zip", b"expected");
    fetcher.serve(&a.url, b"evil".to_vec());
    let cache = ArtifactCache::new(fetcher.clone(), 2);
    let target = dir.path().join("demo.zip");

    for _ in 0..2 {
        let err = cache.ensure(&a, &target).expect_err("mismatch");
        assert!(matches!(err, RuntimeError::Integrity { .. }));
    }
    let err = cache.ensure(&a, &target).expect_err("limit");
    assert!(matches!(
        err,
        RuntimeError::RedownloadLimit { attempts: 2, .. }
    ));
    assert_eq!(err.failure_kind(), FailureKind::Integrity);
    assert_eq!(fetcher.hits(&a.url), 2);

    cache.reset_failures();
    fetcher.serve(&a.url, b"expected".to_vec());
    cache.ensure(&a, &target).expect("after reset");
    assert_eq!(cache.failure_count(&target), 0);
}

#[test]
fn zero_limit_is_unbounded() {
    let dir = TempDir::new().expect("tmp");
    let fetcher = FakeFetcher::new();
    let a = artifact("demo.zip", b"expected");
    fetcher.serve(&a.url, b"evil".to_vec());
    let cache = ArtifactCache::new(fetcher.clone(), 0);
    let target = dir.path().join("demo.zip");

    for _ in 0..5 {
        assert!(matches!(
            cache.ensure(&a, &target),
            Err(RuntimeError::Integrity { .. })
        ));
    }
    assert_eq!(fetcher.hits(&a.url), 5);
}

#[test]
fn success_clears_failure_count() {
    let dir = TempDir::new().expect("tmp");
    let fetcher = FakeFetcher::new();
    let a = artifact("demo.zip", b"expected");
    fetcher.serve(&a.url, b"evil".to_vec());
    let cache = ArtifactCache::new(fetcher.clone(), 3);
    let target = dir.path().join("demo.zip");

    assert!(cache.ensure(&a, &target).is_err());
    fetcher.serve(&a.url, b"expected".to_vec());
    cache.ensure(&a, &target).expect("recovered");
    assert_eq!(cache.failure_count(&target), 0);
}

#[test]
fn network_error_leaves_no_temp_file() {
    let dir = TempDir::new().expect("tmp");
    let fetcher = FakeFetcher::new();
    let a = artifact("demo.zip", b"expected");
    let cache = ArtifactCache::new(fetcher, 3);
    let target = dir.path().join("v").join("demo.zip");

    let err = cache.ensure(&a, &target).expect_err("404");
    assert!(matches!(
        err,
        RuntimeError::Network {
            status: Some(404),
            ..
        }
    ));
    assert!(entries(&dir.path().join("v")).is_empty());
    assert_eq!(cache.failure_count(&target), 0);
}

// ---------------------------------------------------------------------------
// Manifest-wide
// ---------------------------------------------------------------------------

#[test]
fn ensure_all_uses_jail_layout_in_order() {
    let dir = TempDir::new().expect("tmp");
    let fetcher = FakeFetcher::new();
    let b = artifact("b.zip", b"bbb");
    let a = artifact("a.zip", b"aaa");
    fetcher.serve(&a.url, b"aaa".to_vec());
    fetcher.serve(&b.url, b"bbb".to_vec());
    let m = manifest("demo", "1.0", vec![b, a]);
    let jail = ArtifactJail::new(dir.path());
    let cache = ArtifactCache::new(fetcher, 3);

    let paths = cache.ensure_all(&jail, &m).expect("ensure all");
    let root = dir.path().join("demo").join("1.0");
    assert_eq!(paths, vec![root.join("b.zip"), root.join("a.zip")]);
    assert_eq!(entries(&root), vec!["a.zip", "b.zip"]);
}

#[test]
fn ensure_all_stops_at_first_failure() {
    let dir = TempDir::new().expect("tmp");
    let fetcher = FakeFetcher::new();
    let a = artifact("a.zip", b"aaa");
    let b = artifact("b.zip", b"bbb");
    fetcher.serve(&b.url, b"bbb".to_vec());
    let m = manifest("demo", "1.0", vec![a.clone(), b.clone()]);
    let cache = ArtifactCache::new(fetcher.clone(), 3);

    let err = cache
        .ensure_all(&ArtifactJail::new(dir.path()), &m)
        .expect_err("a missing");
    assert_eq!(err.failure_kind(), FailureKind::Network);
    assert_eq!(fetcher.hits(&b.url), 0);
}

#[test]
fn shared_cache_across_threads() {
    let dir = TempDir::new().expect("tmp");
    let fetcher = FakeFetcher::new();
    let a = artifact("demo.zip", b"concurrent");
    fetcher.serve(&a.url, b"concurrent".to_vec());
    let cache = Arc::new(ArtifactCache::new(fetcher, 3));
    let target = dir.path().join("demo.zip");

    std::thread::scope(|s| {
        for _ in 0..4 {
            s.spawn(|| cache.ensure(&a, &target).expect("ensure"));
        }
    });
    assert_eq!(fs::read(&target).expect("read"), b"concurrent");
    assert_eq!(entries(dir.path()), vec!["demo.zip"]);
}

#[test]
fn concurrent_repair_of_corrupted_target() {
    let dir = TempDir::new().expect("tmp");
    let fetcher = FakeFetcher::new();
    let a = artifact("demo.zip", b"repaired");
    fetcher.serve(&a.url, b"repaired".to_vec());
    let cache = ArtifactCache::new(fetcher.clone(), 3);
    let target = dir.path().join("demo.zip");
    fs::write(&target, b"corrupted on disk").expect("seed");

    let threads = 8;
    let barrier = Barrier::new(threads);
    std::thread::scope(|s| {
        let handles: Vec<_> = (0..threads)
            .map(|_| {
                s.spawn(|| {
                    barrier.wait();
                    cache.ensure(&a, &target)
                })
            })
            .collect();
        for handle in handles {
            handle
                .join()
                .expect("thread")
                .expect("every racer ends with a verified file");
        }
    });

    assert_eq!(fs::read(&target).expect("read"), b"repaired");
    assert_eq!(entries(dir.path()), vec!["demo.zip"]);
    assert!(fetcher.hits(&a.url) >= 1);
    assert_eq!(cache.failure_count(&target), 0);
}
