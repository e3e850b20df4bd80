use liveset_types::{ChannelId, ConnectionId, EntityKey, Error, SubscriptionId};
use proptest::prelude::*;
use serde_json::json;
use std::collections::HashSet;
use std::str::FromStr;

// ── ConnectionId ──────────────────────────────────────────────────

#[test]
fn connection_id_new_is_unique() {
    let a = ConnectionId::new();
    let b = ConnectionId::new();
    assert_ne!(a, b);
}

#[test]
fn connection_id_display_and_parse() {
    let id = ConnectionId::new();
    let parsed = ConnectionId::parse(&id.to_string()).unwrap();
    assert_eq!(id, parsed);
}

#[test]
fn connection_id_from_str_invalid() {
    assert!(ConnectionId::from_str("garbage").is_err());
}

#[test]
fn connection_id_parse_error_is_invalid_uuid() {
    let err = ConnectionId::parse("not-a-uuid").unwrap_err();
    assert!(matches!(err, Error::InvalidUuid(_)));
    assert!(err.to_string().starts_with("invalid UUID"));
}

#[test]
fn connection_id_from_uuid_roundtrip() {
    let uuid = uuid::Uuid::now_v7();
    assert_eq!(ConnectionId::from_uuid(uuid).as_uuid(), uuid);
}

// ── ChannelId ─────────────────────────────────────────────────────

#[test]
fn channel_id_from_str_and_string() {
    let a = ChannelId::from("feed");
    let b = ChannelId::from("feed".to_string());
    assert_eq!(a, b);
    assert_eq!(a.as_str(), "feed");
    assert_eq!(a.to_string(), "feed");
}

#[test]
fn channel_id_serializes_transparently() {
    let c = ChannelId::new("profile");
    assert_eq!(serde_json::to_value(&c).unwrap(), json!("profile"));
}

// ── SubscriptionId ────────────────────────────────────────────────

#[test]
fn subscription_id_ordering_and_display() {
    let a = SubscriptionId::new(1);
    let b = SubscriptionId::new(2);
    assert!(a < b);
    assert_eq!(b.get(), 2);
    assert_eq!(a.to_string(), "sub-1");
}

// ── EntityKey ─────────────────────────────────────────────────────

#[test]
fn entity_key_from_json_number_and_string() {
    assert_eq!(EntityKey::from_value(&json!(7)), Some(EntityKey::Int(7)));
    assert_eq!(
        EntityKey::from_value(&json!("u1")),
        Some(EntityKey::Str("u1".into()))
    );
}

#[test]
fn entity_key_rejects_non_keys() {
    assert_eq!(EntityKey::from_value(&json!(1.5)), None);
    assert_eq!(EntityKey::from_value(&json!(true)), None);
    assert_eq!(EntityKey::from_value(&json!({"id": 1})), None);
    assert!(EntityKey::try_from(&json!(null)).is_err());
}

#[test]
fn entity_key_deserializes_untagged() {
    let keys: Vec<EntityKey> = serde_json::from_value(json!([1, "a"])).unwrap();
    assert_eq!(keys, vec![EntityKey::Int(1), EntityKey::Str("a".into())]);
}

#[test]
fn entity_key_conversions() {
    assert_eq!(EntityKey::from(3i32), EntityKey::Int(3));
    assert_eq!(EntityKey::from(3u32), EntityKey::Int(3));
    assert_eq!(EntityKey::from("x"), EntityKey::Str("x".into()));
    let uuid = uuid::Uuid::now_v7();
    assert_eq!(EntityKey::from(uuid), EntityKey::Str(uuid.to_string()));
}

#[test]
fn entity_key_hash_dedupes() {
    let mut set = HashSet::new();
    set.insert(EntityKey::from(1i64));
    set.insert(EntityKey::from(1i64));
    set.insert(EntityKey::from("1"));
    assert_eq!(set.len(), 2);
}

proptest! {
    #[test]
    fn entity_key_value_roundtrip_int(n in any::<i64>()) {
        let key = EntityKey::Int(n);
        prop_assert_eq!(EntityKey::from_value(&key.to_value()), Some(key));
    }

    #[test]
    fn entity_key_value_roundtrip_str(s in "[a-z0-9-]{0,24}") {
        let key = EntityKey::Str(s);
        prop_assert_eq!(EntityKey::from_value(&key.to_value()), Some(key));
    }
}
