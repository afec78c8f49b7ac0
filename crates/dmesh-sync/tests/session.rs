//! Two-peer integration test driving a full `sync-hello`/`sync-inv`/
//! `sync-get`/`sync-data`/`sync-ack` handshake end to end, backed by a real
//! [`MemoryStore`] for the outbox/forwarded/seen collections a production
//! driver would consult.

use std::collections::HashSet;

use dmesh_crypto::{BoxKeyPair, EncryptRequest, SigningKeyPair, derive_fingerprint};
use dmesh_proto::{Capabilities, PayloadContent, primitives::b64_encode};
use dmesh_store::{ForwardedStore, MemoryStore, OutboxStore, SeenStore};
use dmesh_sync::{InventoryCandidate, SyncAction, SyncConfig, SyncFrame, SyncSession};

struct Node {
    fp: String,
    signing: SigningKeyPair,
    sign_pk: [u8; 32],
    boxkeys: BoxKeyPair,
    store: MemoryStore,
}

fn node() -> Node {
    let signing = SigningKeyPair::generate().unwrap();
    let sign_pk = signing.public_key_bytes();
    let fp = b64_encode(&derive_fingerprint(&sign_pk));
    Node { fp, signing, sign_pk, boxkeys: BoxKeyPair::generate(), store: MemoryStore::new() }
}

fn capabilities() -> Capabilities {
    Capabilities {
        max_msg_size: 64 * 1024,
        max_inv_count: 500,
        max_chunks: 64,
        supported_kinds: vec!["text".to_string()],
        protocol_version: 1,
    }
}

fn send_one_message(from: &Node, to: &Node, text: &str) -> String {
    let envelope = dmesh_crypto::encrypt(EncryptRequest {
        content: PayloadContent::Text { content: text.to_string() },
        sender_signing: &from.signing,
        sender_box: &from.boxkeys,
        recipient_box_pk: &to.boxkeys.public_key_bytes(),
        ts: Some(0),
        ttl_ms: None,
    })
    .unwrap();
    let msg_id = envelope.msg_id.clone().unwrap();
    from.store.add(msg_id.clone(), envelope, to.fp.clone()).unwrap();
    msg_id
}

fn outbox_candidates(node: &Node) -> Vec<InventoryCandidate> {
    node.store
        .pending()
        .unwrap()
        .into_iter()
        .map(|entry| InventoryCandidate {
            msg_id: entry.msg_id,
            exp: entry.message_envelope.exp.unwrap_or(u64::MAX),
            size: entry.message_envelope.to_json_bytes().unwrap().len() as u32,
            priority: 1,
            sender_fp: node.fp.clone(),
        })
        .collect()
}

/// A full handshake in one direction: `a` offers, `b` wants and receives,
/// `b` acks, `a` records the forward.
#[test]
fn full_handshake_delivers_one_message_and_suppresses_it_on_resync() {
    let a = node();
    let b = node();

    let mut a_session = SyncSession::new(a.fp.clone(), a.sign_pk, capabilities(), SyncConfig::default());
    let mut b_session = SyncSession::new(b.fp.clone(), b.sign_pk, capabilities(), SyncConfig::default());

    let a_hello_actions = a_session.start(&a.signing, 0);
    let b_hello_actions = b_session.start(&b.signing, 0);
    let SyncAction::SendFrame(SyncFrame::Hello(a_hello)) = &a_hello_actions[0] else { panic!() };
    let SyncAction::SendFrame(SyncFrame::Hello(b_hello)) = &b_hello_actions[0] else { panic!() };
    b_session.receive_hello(a_hello, 0).unwrap();
    a_session.receive_hello(b_hello, 0).unwrap();

    let msg_id = send_one_message(&a, &b, "need water at shelter 4");

    let forwarded_to_b: HashSet<String> = a.store.forwarded_to(&b.fp).unwrap().into_iter().collect();
    let inv_actions =
        a_session.build_inventory(&outbox_candidates(&a), &forwarded_to_b, 0, &a.signing).unwrap();
    let SyncAction::SendFrame(SyncFrame::Inv(inv)) = &inv_actions[0] else { panic!() };
    assert_eq!(inv.items.len(), 1);
    assert_eq!(inv.items[0].msg_id, msg_id);

    let already_seen_by_b: HashSet<String> = HashSet::new();
    let get_actions = b_session.receive_inv(inv, &already_seen_by_b, 0, &b.signing).unwrap();
    let SyncAction::SendFrame(SyncFrame::Get(get)) = &get_actions[0] else { panic!() };
    assert_eq!(get.want, vec![msg_id.clone()]);

    let resolver = |id: &str| {
        a.store.pending().unwrap().into_iter().find(|e| e.msg_id == id).map(|e| e.message_envelope)
    };
    let data_actions = a_session.receive_get(get, resolver, 0, &a.signing).unwrap();
    let SyncAction::SendFrame(SyncFrame::Data(data)) = &data_actions[0] else { panic!() };
    assert_eq!(data.messages.len(), 1);

    let deliver_actions = b_session.receive_data(data, 0).unwrap();
    assert_eq!(deliver_actions.len(), 1);
    let SyncAction::DeliverEnvelope(delivered) = &deliver_actions[0] else { panic!() };
    assert_eq!(delivered.msg_id.as_deref(), Some(msg_id.as_str()));
    b.store.check_and_mark(&msg_id, &a.fp).unwrap();

    let ack_actions = b_session.build_ack(0, &b.signing).unwrap();
    let SyncAction::SendFrame(SyncFrame::Ack(ack)) = &ack_actions[0] else { panic!() };
    assert_eq!(ack.received, vec![msg_id.clone()]);

    let forward_actions = a_session.receive_ack(ack, 0).unwrap();
    assert_eq!(forward_actions.len(), 1);
    for action in &forward_actions {
        let SyncAction::MarkForwarded { peer_fp, msg_id } = action else { panic!() };
        a.store.mark_forwarded(peer_fp, msg_id).unwrap();
    }

    // A fresh session between the same two peers must not re-offer the
    // message `b` already acknowledged.
    let mut a_session2 = SyncSession::new(a.fp.clone(), a.sign_pk, capabilities(), SyncConfig::default());
    let mut b_session2 = SyncSession::new(b.fp.clone(), b.sign_pk, capabilities(), SyncConfig::default());
    let a_hello2 = a_session2.start(&a.signing, 1000);
    let b_hello2 = b_session2.start(&b.signing, 1000);
    let SyncAction::SendFrame(SyncFrame::Hello(a_hello2)) = &a_hello2[0] else { panic!() };
    let SyncAction::SendFrame(SyncFrame::Hello(b_hello2)) = &b_hello2[0] else { panic!() };
    b_session2.receive_hello(a_hello2, 1000).unwrap();
    a_session2.receive_hello(b_hello2, 1000).unwrap();

    let forwarded_to_b_now: HashSet<String> = a.store.forwarded_to(&b.fp).unwrap().into_iter().collect();
    assert!(forwarded_to_b_now.contains(&msg_id));
    let inv_actions2 = a_session2
        .build_inventory(&outbox_candidates(&a), &forwarded_to_b_now, 1000, &a.signing)
        .unwrap();
    let SyncAction::SendFrame(SyncFrame::Inv(inv2)) = &inv_actions2[0] else { panic!() };
    assert!(inv2.items.is_empty(), "forwarded message must not be re-offered");
}

#[test]
fn sender_never_offers_its_own_message_back_to_its_originator() {
    // `a` sends to `b`; the inventory `a` would build for `b` must never
    // include a message whose original sender is `b` itself.
    let a = node();
    let b = node();

    let msg_id = send_one_message(&b, &a, "ack from b");
    let candidates = vec![InventoryCandidate {
        msg_id,
        exp: u64::MAX,
        size: 10,
        priority: 1,
        sender_fp: b.fp.clone(),
    }];

    let mut a_session = SyncSession::new(a.fp.clone(), a.sign_pk, capabilities(), SyncConfig::default());
    a_session.start(&a.signing, 0);
    let b_hello_actions =
        SyncSession::new(b.fp.clone(), b.sign_pk, capabilities(), SyncConfig::default()).start(&b.signing, 0);
    let SyncAction::SendFrame(SyncFrame::Hello(b_hello)) = &b_hello_actions[0] else { panic!() };
    a_session.receive_hello(b_hello, 0).unwrap();

    let inv_actions = a_session.build_inventory(&candidates, &HashSet::new(), 0, &a.signing).unwrap();
    let SyncAction::SendFrame(SyncFrame::Inv(inv)) = &inv_actions[0] else { panic!() };
    assert!(inv.items.is_empty());
}
