// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

mod common;

use alloy::primitives::{Address, Signature};
use anyhow::anyhow;
use async_trait::async_trait;
use common::{mock_engine, CountingSigner};
use nebula_data::{InMemoryStorage, StringStorage};
use nebula_session::{
    DecryptionPermit, PermitCacheKey, PermitSigner, PERMIT_DURATION_DAYS,
};
use std::sync::atomic::Ordering;

fn contract_a() -> Address {
    "0x50157CFfD6bBFA2DECe204a89ec419c23ef5755D".parse().unwrap()
}

fn contract_b() -> Address {
    "0x901F8942346f7AB3a01F6D7613119Bca447Bb030".parse().unwrap()
}

#[test]
fn cache_keys_ignore_contract_order_and_duplicates() {
    let engine = mock_engine();
    let user = Address::repeat_byte(0x11);

    let sorted = PermitCacheKey::derive(engine.as_ref(), &[contract_a(), contract_b()], user, None);
    let reversed =
        PermitCacheKey::derive(engine.as_ref(), &[contract_b(), contract_a()], user, None);
    let duplicated = PermitCacheKey::derive(
        engine.as_ref(),
        &[contract_a(), contract_b(), contract_a()],
        user,
        None,
    );
    assert_eq!(sorted, reversed);
    assert_eq!(sorted, duplicated);
}

#[test]
fn cache_keys_separate_users_contract_sets_and_key_hints() {
    let engine = mock_engine();
    let user = Address::repeat_byte(0x11);

    let base = PermitCacheKey::derive(engine.as_ref(), &[contract_a()], user, None);
    let other_user = PermitCacheKey::derive(
        engine.as_ref(),
        &[contract_a()],
        Address::repeat_byte(0x22),
        None,
    );
    let other_set = PermitCacheKey::derive(engine.as_ref(), &[contract_b()], user, None);
    let hinted = PermitCacheKey::derive(engine.as_ref(), &[contract_a()], user, Some("0xabcd"));
    assert_ne!(base, other_user);
    assert_ne!(base, other_set);
    assert_ne!(base, hinted);
}

#[tokio::test]
async fn load_or_create_signs_once_then_reuses_the_cache() {
    let engine = mock_engine();
    let storage = InMemoryStorage::new();
    let signer = CountingSigner::random();
    let contracts = [contract_a(), contract_b()];

    let first = DecryptionPermit::load_or_create(&storage, engine.as_ref(), &signer, &contracts)
        .await
        .unwrap();
    assert_eq!(signer.signs.load(Ordering::SeqCst), 1);

    let second = DecryptionPermit::load_or_create(&storage, engine.as_ref(), &signer, &contracts)
        .await
        .unwrap();
    assert_eq!(signer.signs.load(Ordering::SeqCst), 1);
    assert_eq!(first, second);
}

#[tokio::test]
async fn clearing_storage_forces_a_fresh_signature() {
    let engine = mock_engine();
    let storage = InMemoryStorage::new();
    let signer = CountingSigner::random();
    let contracts = [contract_a()];

    DecryptionPermit::load_or_create(&storage, engine.as_ref(), &signer, &contracts)
        .await
        .unwrap();
    storage.clear().await;
    DecryptionPermit::load_or_create(&storage, engine.as_ref(), &signer, &contracts)
        .await
        .unwrap();
    assert_eq!(signer.signs.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn an_expired_cached_permit_is_replaced() {
    let engine = mock_engine();
    let storage = InMemoryStorage::new();
    let signer = CountingSigner::random();
    let contracts = [contract_a()];

    // Plant an expired permit in the exact slot load_or_create will consult.
    let key = PermitCacheKey::derive(engine.as_ref(), &contracts, signer.address(), None);
    let expired = serde_json::json!({
        "user": signer.address(),
        "public_key": "0xabcd",
        "private_key": "0x1234",
        "signature": format!("0x{}", hex::encode([7u8; 65])),
        "contract_addresses": [contract_a()],
        "start_timestamp": 0,
        "duration_days": 1,
        "eip712": engine.create_eip712("0xabcd", &contracts, 0, 1),
    });
    storage
        .set_item(key.as_str(), &expired.to_string())
        .await
        .unwrap();

    let permit = DecryptionPermit::load_or_create(&storage, engine.as_ref(), &signer, &contracts)
        .await
        .unwrap();
    assert_eq!(signer.signs.load(Ordering::SeqCst), 1);
    assert!(permit.is_valid());
}

#[tokio::test]
async fn unreadable_cache_entries_are_misses() {
    let engine = mock_engine();
    let storage = InMemoryStorage::new();
    let signer = CountingSigner::random();
    let contracts = [contract_a()];

    let key = PermitCacheKey::derive(engine.as_ref(), &contracts, signer.address(), None);
    storage.set_item(key.as_str(), "not json").await.unwrap();
    assert!(DecryptionPermit::load(
        &storage,
        engine.as_ref(),
        &contracts,
        signer.address(),
        None
    )
    .await
    .is_none());
}

#[tokio::test]
async fn caching_the_public_key_selects_the_key_bound_slot() {
    let engine = mock_engine();
    let storage = InMemoryStorage::new();
    let signer = CountingSigner::random();
    let contracts = [contract_a()];

    let permit = DecryptionPermit::create(engine.as_ref(), &signer, &contracts)
        .await
        .unwrap();
    permit.save(&storage, engine.as_ref(), true).await;

    // The blinded slot stays empty; only a hint-bearing load finds the permit.
    assert!(DecryptionPermit::load(
        &storage,
        engine.as_ref(),
        &contracts,
        signer.address(),
        None
    )
    .await
    .is_none());
    let found = DecryptionPermit::load(
        &storage,
        engine.as_ref(),
        &contracts,
        signer.address(),
        Some(permit.public_key()),
    )
    .await
    .unwrap();
    assert_eq!(found, permit);
}

#[tokio::test]
async fn the_typed_payload_survives_a_storage_round_trip() {
    let engine = mock_engine();
    let storage = InMemoryStorage::new();
    let signer = CountingSigner::random();
    let contracts = [contract_a()];

    let created = DecryptionPermit::load_or_create(&storage, engine.as_ref(), &signer, &contracts)
        .await
        .unwrap();
    let loaded = DecryptionPermit::load(
        &storage,
        engine.as_ref(),
        &contracts,
        signer.address(),
        None,
    )
    .await
    .unwrap();

    assert_eq!(loaded.eip712(), created.eip712());
    assert_eq!(
        loaded.eip712().message.start_timestamp,
        created.start_timestamp()
    );
}

#[test]
fn validity_window_is_start_plus_duration() {
    let engine = mock_engine();
    let start = 1_700_000_000u64;
    let end = start + PERMIT_DURATION_DAYS * 86_400;
    let permit: DecryptionPermit = serde_json::from_value(serde_json::json!({
        "user": Address::repeat_byte(0x11),
        "public_key": "0xabcd",
        "private_key": "0x1234",
        "signature": format!("0x{}", hex::encode([7u8; 65])),
        "contract_addresses": [contract_a()],
        "start_timestamp": start,
        "duration_days": PERMIT_DURATION_DAYS,
        "eip712": engine.create_eip712("0xabcd", &[contract_a()], start, PERMIT_DURATION_DAYS),
    }))
    .unwrap();
    assert!(permit.is_valid_at(end - 1));
    assert!(!permit.is_valid_at(end));
}

struct BrokenStorage;

#[async_trait]
impl StringStorage for BrokenStorage {
    async fn get_item(&self, _key: &str) -> anyhow::Result<Option<String>> {
        Ok(None)
    }

    async fn set_item(&self, _key: &str, _value: &str) -> anyhow::Result<()> {
        Err(anyhow!("storage offline"))
    }

    async fn remove_item(&self, _key: &str) -> anyhow::Result<()> {
        Err(anyhow!("storage offline"))
    }
}

#[tokio::test]
async fn save_failures_do_not_block_permit_creation() {
    let engine = mock_engine();
    let signer = CountingSigner::random();
    let permit =
        DecryptionPermit::load_or_create(&BrokenStorage, engine.as_ref(), &signer, &[contract_a()])
            .await
            .unwrap();
    assert!(permit.is_valid());
}

#[tokio::test]
async fn the_stored_signature_recovers_to_the_signer() {
    let engine = mock_engine();
    let storage = InMemoryStorage::new();
    let signer = CountingSigner::random();
    let permit =
        DecryptionPermit::load_or_create(&storage, engine.as_ref(), &signer, &[contract_a()])
            .await
            .unwrap();

    let raw = hex::decode(permit.signature().trim_start_matches("0x")).unwrap();
    let signature = Signature::try_from(raw.as_slice()).unwrap();
    let recovered = signature
        .recover_address_from_prehash(&permit.eip712().signing_hash())
        .unwrap();
    assert_eq!(recovered, signer.address());
    assert_eq!(permit.user(), signer.address());
}
