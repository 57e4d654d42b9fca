use convodec::models::message::Role;
use convodec::{Conversation, decode_batch, decode_conversation};
use serde_json::Value;

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

fn decode_fixture() -> Vec<Conversation> {
    decode_batch(fixture_records())
        .into_iter()
        .collect::<Result<Vec<Conversation>, _>>()
        .expect("every fixture record decodes")
}

#[test]
fn fixture_decodes_with_expected_counts() {
    let conversations = decode_fixture();
    assert_eq!(conversations.len(), 2);
    assert_eq!(conversations[0].message_count(), 2);
    assert_eq!(conversations[1].message_count(), 4);

    let mut users = 0;
    let mut assistants = 0;
    let mut tools = 0;
    for conversation in &conversations {
        for node in conversation.mapping.values() {
            match node.message.as_ref().map(|message| message.role()) {
                Some(Role::User) => users += 1,
                Some(Role::Assistant) => assistants += 1,
                Some(Role::Tool) => tools += 1,
                Some(Role::System) | None => {}
            }
        }
    }
    assert_eq!((users, assistants, tools), (2, 3, 1));
}

#[test]
fn canonical_order_follows_the_chain() {
    let conversations = decode_fixture();
    let ordered: Vec<&str> = conversations[1]
        .canonical_order()
        .iter()
        .map(|node| node.id.as_str())
        .collect();
    assert_eq!(
        ordered,
        vec![
            "bbbbbbbb-0000-4000-8000-000000000021",
            "bbbbbbbb-0000-4000-8000-000000000022",
            "bbbbbbbb-0000-4000-8000-000000000023",
            "bbbbbbbb-0000-4000-8000-000000000024",
            "bbbbbbbb-0000-4000-8000-000000000025",
        ]
    );
}

#[test]
fn paths_cover_each_leaf_without_the_root() {
    let conversations = decode_fixture();
    let paths: Vec<Vec<&str>> = conversations[0]
        .root_to_leaf_paths()
        .map(|path| path.iter().map(|message| message.id()).collect())
        .collect();
    assert_eq!(
        paths,
        vec![vec![
            "aaaaaaaa-0000-4000-8000-000000000002",
            "aaaaaaaa-0000-4000-8000-000000000003",
        ]]
    );

    // The browsing conversation is a single four-message chain.
    let lengths: Vec<usize> = conversations[1]
        .root_to_leaf_paths()
        .map(|path| path.len())
        .collect();
    assert_eq!(lengths, vec![4]);
}

#[test]
fn decoding_canonical_output_reproduces_the_typed_result() {
    for original in decode_fixture() {
        let reserialized =
            serde_json::to_value(&original).expect("canonical form serializes");
        let redecoded = decode_conversation(reserialized).expect("canonical form re-decodes");
        assert_eq!(redecoded, original);

        let original_order: Vec<&str> = original
            .canonical_order()
            .iter()
            .map(|node| node.id.as_str())
            .collect();
        let redecoded_order: Vec<&str> = redecoded
            .canonical_order()
            .iter()
            .map(|node| node.id.as_str())
            .collect();
        assert_eq!(original_order, redecoded_order);
    }
}

#[test]
fn sorted_mapping_survives_a_round_trip_in_order() {
    let mut conversation = decode_fixture().remove(1);
    conversation.sort_mapping();
    let keys: Vec<String> = conversation.mapping.keys().cloned().collect();

    // Serialize straight to text: mapping order must match the canonical
    // re-keying in the bytes a re-run would produce.
    let rendered = serde_json::to_string(&conversation).expect("serializes");
    let mut last_position = 0;
    for key in &keys {
        let marker = format!("\"{key}\":");
        let position = rendered.find(&marker).expect("key present in output");
        assert!(position >= last_position, "mapping keys out of order");
        last_position = position;
    }
}

#[test]
fn tool_turn_keeps_its_command_metadata() {
    let conversations = decode_fixture();
    let node = conversations[1]
        .mapping
        .get("bbbbbbbb-0000-4000-8000-000000000024")
        .expect("tool node present");
    let Some(convodec::Message::Tool(tool)) = &node.message else {
        panic!("expected a tool message");
    };
    assert_eq!(tool.name.as_str(), "browser");
    assert_eq!(tool.metadata.command.as_deref(), Some("search"));
    assert_eq!(tool.update_time, Some(1714100003.5));
    assert_eq!(
        tool.content.plain_text(),
        "L0: indexmap - Rust docs.rs page"
    );
}
