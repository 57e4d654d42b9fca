use convodec::shorten::{SHORT_ID_LEN, shorten_batch};
use convodec::{DecodeError, decode_batch};
use serde_json::{Value, json};

fn fixture_records() -> Vec<Value> {
    let raw: Value = serde_json::from_str(include_str!(
        "../../../fixtures/export/conversations_small.json"
    ))
    .expect("fixture parses as JSON");
    match raw {
        Value::Array(records) => records,
        other => panic!("fixture must be an array, found {other}"),
    }
}

#[test]
fn shortened_batch_still_decodes_and_stays_consistent() {
    let (shortened, stats) = shorten_batch(fixture_records()).expect("no collisions in fixture");
    assert_eq!(stats.identifiers_seen, stats.suffixes_produced);
    // Root + 2 nodes + conversation id, then root + 4 nodes + conversation id.
    assert_eq!(stats.identifiers_seen, 10);

    let conversations = decode_batch(shortened)
        .into_iter()
        .collect::<Result<Vec<_>, _>>()
        .expect("shortened records still validate");

    for conversation in &conversations {
        assert_eq!(conversation.conversation_id.len(), SHORT_ID_LEN);
        for (key, node) in &conversation.mapping {
            assert_eq!(key.len(), SHORT_ID_LEN);
            assert_eq!(key, &node.id);
        }
        assert!(conversation.mapping.contains_key(&conversation.current_node));
    }
}

#[test]
fn shortening_rewrites_cross_references_uniformly() {
    let (shortened, _) = shorten_batch(fixture_records()).expect("no collisions in fixture");
    let conversations = decode_batch(shortened)
        .into_iter()
        .collect::<Result<Vec<_>, _>>()
        .expect("shortened records decode");

    // The assistant metadata's parent_id reference was rewritten to the
    // same suffix as the node it names.
    let first = &conversations[0];
    let user_suffix = "000-8000-000000000002";
    let assistant_suffix = "000-8000-000000000003";
    let node = first.mapping.get(assistant_suffix).expect("assistant node");
    let Some(convodec::Message::Assistant(assistant)) = &node.message else {
        panic!("expected assistant message");
    };
    assert_eq!(assistant.parent, user_suffix);
    assert_eq!(assistant.metadata.parent_id.as_deref(), Some(user_suffix));
}

#[test]
fn a_cross_conversation_suffix_collision_fails_the_batch() {
    // Two conversations reuse distinct identifiers that agree on the last
    // 21 characters.
    let records = vec![
        json!({"conversation_id": "aaaaaaaa-aaaa-4aaa-8aaa-aaaaaaaaaaaa"}),
        json!({"conversation_id": "bbbbbbbb-bbbb-4aaa-8aaa-aaaaaaaaaaaa"}),
    ];
    let err = shorten_batch(records).expect_err("collision must fail the batch");
    assert!(matches!(err, DecodeError::Collision { .. }), "{err}");
    assert!(err.is_batch_fatal());
    let text = err.to_string();
    assert!(text.contains("aaaaaaaa-aaaa-4aaa-8aaa-aaaaaaaaaaaa"), "{text}");
    assert!(text.contains("bbbbbbbb-bbbb-4aaa-8aaa-aaaaaaaaaaaa"), "{text}");
}

#[test]
fn injectivity_holds_for_the_fixture_batch() {
    let records = fixture_records();
    let mut originals = std::collections::BTreeSet::new();
    collect_identifiers(&Value::Array(records.clone()), &mut originals);

    let (_, stats) = shorten_batch(records).expect("no collisions in fixture");
    assert_eq!(stats.identifiers_seen, originals.len());
    assert_eq!(stats.suffixes_produced, originals.len());
}

fn collect_identifiers(value: &Value, out: &mut std::collections::BTreeSet<String>) {
    match value {
        Value::Object(map) => {
            for (key, item) in map {
                if convodec::shorten::is_long_identifier(key) {
                    out.insert(key.clone());
                }
                collect_identifiers(item, out);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_identifiers(item, out);
            }
        }
        Value::String(text) => {
            if convodec::shorten::is_long_identifier(text) {
                out.insert(text.clone());
            }
        }
        _ => {}
    }
}
