// tests/provider_tests.rs
//! Cache-backed provider, alone and driven by the pipeline

use std::collections::HashMap;
use std::sync::Mutex;

use crypt_memo::{CachingProvider, CoreError, CryptoProvider, Generation, Pipeline, ValueJob};

mod common;
use common::{FakeProvider, TestCache};

#[test]
fn encrypt_miss_populates_both_directions() {
    let tc = TestCache::new();
    let cache = tc.open();
    let provider = CachingProvider::new(FakeProvider::default(), &cache);

    let ciphertext = provider.encrypt("s3cr3t").unwrap();
    assert_eq!(ciphertext, FakeProvider::seal("s3cr3t"));
    assert_eq!(provider.inner().encrypt_calls(), 1);

    // both directions are now answered without the inner provider
    assert_eq!(provider.encrypt("s3cr3t").unwrap(), ciphertext);
    assert_eq!(provider.decrypt(&ciphertext).unwrap(), "s3cr3t");
    assert_eq!(provider.inner().encrypt_calls(), 1);
    assert_eq!(provider.inner().decrypt_calls(), 0);

    drop(provider);
    cache.close().unwrap();
}

#[test]
fn decrypt_miss_populates_both_directions() {
    let tc = TestCache::new();
    let cache = tc.open();
    let provider = CachingProvider::new(FakeProvider::default(), &cache);
    let ciphertext = FakeProvider::seal("from-disk");

    assert_eq!(provider.decrypt(&ciphertext).unwrap(), "from-disk");
    assert_eq!(provider.encrypt("from-disk").unwrap(), ciphertext);
    assert_eq!(provider.inner().decrypt_calls(), 1);
    assert_eq!(provider.inner().encrypt_calls(), 0);

    drop(provider);
    cache.close().unwrap();
}

#[test]
fn provider_failure_is_not_cached() {
    let tc = TestCache::new();
    let cache = tc.open();
    let provider = CachingProvider::new(FakeProvider::default(), &cache);

    assert!(provider.encrypt(FakeProvider::POISON).is_err());
    assert!(provider.encrypt(FakeProvider::POISON).is_err());
    assert_eq!(provider.inner().encrypt_calls(), 2);
    assert!(cache[Generation::Young].is_empty().unwrap());

    drop(provider);
    cache.close().unwrap();
}

#[test]
fn second_run_over_same_document_hits_the_cache() {
    let tc = TestCache::new();
    let pipeline = Pipeline::new(4).unwrap();
    let document: Vec<(String, String)> = (0..30)
        .map(|i| (format!("env[{i}].value"), format!("secret-{i}")))
        .collect();
    let jobs = || {
        document
            .iter()
            .map(|(path, value)| ValueJob::new(path.clone(), None, value.clone()))
            .collect::<Vec<_>>()
    };
    let never_equal = |_: &Vec<u8>, _: &String| false;

    // first process: everything goes to the inner provider
    let cache = tc.open();
    let provider = CachingProvider::new(FakeProvider::default(), &cache);
    let first = Mutex::new(HashMap::new());
    pipeline
        .encrypt_values(&provider, jobs(), never_equal, |path: &str, ct: Vec<u8>| {
            first.lock().unwrap().insert(path.to_string(), ct);
        })
        .unwrap();
    assert_eq!(provider.inner().encrypt_calls(), 30);
    drop(provider);
    cache.close().unwrap();

    // second process: same values are served from disk
    let cache = tc.open();
    let provider = CachingProvider::new(FakeProvider::default(), &cache);
    let second = Mutex::new(HashMap::new());
    let report = pipeline
        .encrypt_values(&provider, jobs(), never_equal, |path: &str, ct: Vec<u8>| {
            second.lock().unwrap().insert(path.to_string(), ct);
        })
        .unwrap();
    assert_eq!(report.transformed, 30);
    assert_eq!(provider.inner().encrypt_calls(), 0);
    assert_eq!(first.into_inner().unwrap(), second.into_inner().unwrap());
    drop(provider);
    cache.close().unwrap();
}

#[test]
fn provider_error_surfaces_as_transform_error_with_path() {
    let tc = TestCache::new();
    let cache = tc.open();
    let provider = CachingProvider::new(FakeProvider::default(), &cache);
    let pipeline = Pipeline::new(2).unwrap();

    let result = pipeline.decrypt_values(
        &provider,
        vec![ValueJob::new("broken", None, b"not a ciphertext".to_vec())],
        false,
        |_, _| false,
        |_, _| {},
    );

    match result {
        Err(CoreError::Transform { path, .. }) => assert_eq!(path, "broken"),
        other => panic!("expected transform error, got {other:?}"),
    }
    drop(provider);
    cache.close().unwrap();
}
