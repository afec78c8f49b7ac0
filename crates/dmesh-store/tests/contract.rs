//! Behavioral contract shared by every `Store` backend.

use dmesh_crypto::ReplayCheck as _;
use dmesh_proto::MessageEnvelope;
use dmesh_store::{
    Contact, MemoryStore, OutboxStatus, RedbStore, Store, StoreReplayCheck, VerificationState,
};

fn envelope(msg_id: &str) -> MessageEnvelope {
    MessageEnvelope {
        v: 1,
        kind: "dmesh-msg".to_string(),
        msg_id: Some(msg_id.to_string()),
        ts: 0,
        exp: None,
        sender_sign_pk: "x".to_string(),
        sender_box_pk: "x".to_string(),
        recipient_box_pk: "x".to_string(),
        eph_pk: "x".to_string(),
        nonce: "x".to_string(),
        ciphertext: "x".to_string(),
        signature: "x".to_string(),
    }
}

fn exercise(store: impl Store) {
    store
        .save_contact(Contact {
            fingerprint: "fp1".to_string(),
            signing_pk: "sk".to_string(),
            box_pk: "bk".to_string(),
            display_name: "alice".to_string(),
            verification: VerificationState::Unverified,
            added_at: 1,
            updated_at: 1,
            verified_at: None,
            compromised_at: None,
            compromised_reason: None,
        })
        .unwrap();
    store.verify_contact("fp1").unwrap();
    assert_eq!(
        store
            .contacts_where(VerificationState::Verified)
            .unwrap()
            .len(),
        1
    );

    store.add("m1".to_string(), envelope("m1"), "fp1".to_string()).unwrap();
    assert_eq!(store.pending().unwrap().len(), 1);
    store.update_status("m1", OutboxStatus::Delivered).unwrap();
    assert_eq!(store.pending().unwrap().len(), 0);

    assert!(store.check_and_mark("m1", "fp1").unwrap());
    assert!(!store.check_and_mark("m1", "fp1").unwrap());

    store.mark_forwarded("peer1", "m1").unwrap();
    assert!(store.was_forwarded("peer1", "m1").unwrap());

    store.run_maintenance().unwrap();

    let stats = store.stats().unwrap();
    assert_eq!(stats.contacts, 1);
    assert_eq!(stats.outbox, 1);
}

#[test]
fn memory_store_satisfies_contract() {
    exercise(MemoryStore::new());
}

#[test]
fn redb_store_satisfies_contract() {
    let dir = tempfile::tempdir().unwrap();
    let store = RedbStore::open(dir.path().join("dmesh.redb")).unwrap();
    exercise(store);
}

#[test]
fn replay_check_adapter_drives_dmesh_crypto() {
    let store = MemoryStore::new();
    let mut check = StoreReplayCheck(store.clone());
    let msg_id = [7u8; 32];
    let sender_fp = [9u8; 16];

    assert!(check.check_and_mark(&msg_id, &sender_fp).unwrap());
    assert!(!check.check_and_mark(&msg_id, &sender_fp).unwrap());
}
