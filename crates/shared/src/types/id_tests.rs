use super::*;
use std::collections::HashSet;

#[test]
fn test_remote_object_id_format() {
    let id = RemoteObjectId::generate("store/all_1_1_0/data.bin");
    let (prefix, suffix) = id.as_str().rsplit_once('_').expect("has suffix");
    assert_eq!(prefix, "store/all_1_1_0/data.bin");
    assert_eq!(suffix.len(), REMOTE_SUFFIX_LEN);
    assert!(suffix.chars().all(|c| c.is_ascii_alphanumeric()));
}

#[test]
fn test_remote_object_ids_differ_per_call() {
    let ids: HashSet<_> = (0..64)
        .map(|_| RemoteObjectId::generate("tmp_insert/data.bin"))
        .collect();
    assert_eq!(ids.len(), 64);
}

#[test]
fn test_block_id_length() {
    let id = BlockId::generate();
    assert_eq!(id.as_str().len(), BLOCK_ID_LEN);
    assert!(id.as_str().chars().all(|c| c.is_ascii_alphanumeric()));
}

#[test]
fn test_typed_name_display_and_eq() {
    let id = RemoteObjectId::from_string("foo");
    assert_eq!(id.to_string(), "foo");
    assert_eq!(id, "foo");
    assert_eq!(id.clone().into_inner(), "foo".to_string());
}

#[test]
fn test_typed_name_serde_transparent() {
    let id = BlockId::from("abc");
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, "\"abc\"");
    let back: BlockId = serde_json::from_str(&json).unwrap();
    assert_eq!(back, id);
}
