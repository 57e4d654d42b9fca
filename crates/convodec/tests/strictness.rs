use convodec::{DecodeError, decode_conversation};
use serde_json::{Value, json};

fn fixture_record(index: usize) -> Value {
    let raw: Value = serde_json::from_str(include_str!(
        "../../../fixtures/export/conversations_small.json"
    ))
    .expect("fixture parses as JSON");
    match raw {
        Value::Array(mut records) => records.remove(index),
        other => panic!("fixture must be an array, found {other}"),
    }
}

#[test]
fn one_undeclared_metadata_attribute_is_a_schema_mismatch() {
    let mut record = fixture_record(0);
    record["mapping"]["aaaaaaaa-0000-4000-8000-000000000002"]["message"]["metadata"]
        ["shiny_new_field"] = json!(true);
    let err = decode_conversation(record).expect_err("extra field must fail");
    assert!(matches!(err, DecodeError::SchemaMismatch { .. }), "{err}");
    insta::assert_snapshot!(
        err.to_string(),
        @r#"schema mismatch at conversation["11111111-1111-4111-8111-111111111111"].mapping["aaaaaaaa-0000-4000-8000-000000000002"].message.metadata: undeclared attribute(s) present: shiny_new_field"#
    );
}

#[test]
fn unknown_content_tag_reports_the_registry() {
    let mut record = fixture_record(0);
    record["mapping"]["aaaaaaaa-0000-4000-8000-000000000002"]["message"]["content"] =
        json!({"content_type": "hologram", "text": "hi"});
    let err = decode_conversation(record).expect_err("unknown tag must fail");
    match &err {
        DecodeError::UnknownVariant { family, tag, .. } => {
            assert_eq!(*family, "content");
            assert_eq!(tag, "hologram");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    insta::assert_snapshot!(
        err.to_string(),
        @r#"unknown content tag `hologram` at conversation["11111111-1111-4111-8111-111111111111"].mapping["aaaaaaaa-0000-4000-8000-000000000002"].message.content (accepted: text, code, thoughts, reasoning_recap, multimodal_text, system_error, execution_output, tether_browsing_display, tether_quote)"#
    );
}

#[test]
fn unknown_role_is_rejected_at_dispatch() {
    let mut record = fixture_record(0);
    record["mapping"]["aaaaaaaa-0000-4000-8000-000000000002"]["message"]["author"]["role"] =
        json!("moderator");
    let err = decode_conversation(record).expect_err("unknown role must fail");
    assert!(matches!(err, DecodeError::UnknownVariant { .. }), "{err}");
    assert!(err.to_string().contains("moderator"), "{err}");
    assert!(
        err.to_string()
            .contains("accepted: user, assistant, system, tool"),
        "{err}"
    );
}

#[test]
fn type_coercion_is_never_applied() {
    let mut record = fixture_record(0);
    record["mapping"]["aaaaaaaa-0000-4000-8000-000000000002"]["message"]["weight"] =
        json!("1.0");
    let err = decode_conversation(record).expect_err("string weight must fail");
    let text = err.to_string();
    assert!(text.contains("expected number"), "{text}");
    assert!(text.contains("\"1.0\""), "{text}");
}

#[test]
fn assistant_text_parts_assert_length_one() {
    let mut record = fixture_record(0);
    let content = &mut record["mapping"]["aaaaaaaa-0000-4000-8000-000000000003"]["message"]
        ["content"];
    content["parts"] = json!(["first", "second"]);
    let err = decode_conversation(record).expect_err("two parts must fail");
    assert!(matches!(err, DecodeError::Normalization { .. }), "{err}");

    let mut record = fixture_record(0);
    record["mapping"]["aaaaaaaa-0000-4000-8000-000000000003"]["message"]["content"]["parts"] =
        json!([]);
    let err = decode_conversation(record).expect_err("zero parts must fail");
    assert!(matches!(err, DecodeError::Normalization { .. }), "{err}");
}

#[test]
fn tool_role_rejects_assistant_only_content() {
    let mut record = fixture_record(1);
    record["mapping"]["bbbbbbbb-0000-4000-8000-000000000024"]["message"]["content"] = json!({
        "content_type": "thoughts",
        "thoughts": [{"summary": "s", "content": "c"}],
        "source_analysis_msg_id": "am-1"
    });
    let err = decode_conversation(record).expect_err("role/content cross-reference must fail");
    assert!(matches!(err, DecodeError::SchemaMismatch { .. }), "{err}");
    assert!(err.to_string().contains("not legal for this role"), "{err}");
}

#[test]
fn double_shape_author_input_fails_normalization() {
    let mut record = fixture_record(0);
    // Flat name next to a nested author block is ambiguous.
    record["mapping"]["aaaaaaaa-0000-4000-8000-000000000002"]["message"]["name"] =
        json!("sneaky");
    let err = decode_conversation(record).expect_err("double shape must fail");
    assert!(matches!(err, DecodeError::Normalization { .. }), "{err}");
    assert!(err.to_string().contains("already present"), "{err}");
}

#[test]
fn unlisted_model_slug_is_rejected_with_guidance() {
    let mut record = fixture_record(0);
    record["mapping"]["aaaaaaaa-0000-4000-8000-000000000003"]["message"]["metadata"]
        ["model_slug"] = json!("gpt-11-preview");
    let err = decode_conversation(record).expect_err("unlisted slug must fail");
    assert!(err.to_string().contains("gpt-11-preview"), "{err}");
    assert!(err.to_string().contains("name table"), "{err}");
}

#[test]
fn structural_errors_name_conversation_and_nodes() {
    let mut record = fixture_record(0);
    record["mapping"]["aaaaaaaa-0000-4000-8000-000000000003"]["parent"] =
        json!("aaaaaaaa-0000-4000-8000-000000000001");
    let err = decode_conversation(record).expect_err("broken back-reference must fail");
    assert!(matches!(err, DecodeError::Structural { .. }), "{err}");
    let text = err.to_string();
    assert!(text.contains("11111111-1111-4111-8111-111111111111"), "{text}");
    assert!(text.contains("aaaaaaaa-0000-4000-8000-000000000002"), "{text}");
    assert!(text.contains("aaaaaaaa-0000-4000-8000-000000000003"), "{text}");
}
