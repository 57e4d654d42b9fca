//! User-role messages and their metadata shape.

use serde::Serialize;
use serde_json::Value;

use crate::decode::{FieldPath, ObjectReader};
use crate::error::{DecodeError, DecodeResult};
use crate::models::content::{CodeLanguageRule, Content, ContentPolicy};
use crate::models::message::{
    ChannelRule, EndTurnRule, NameRule, NullableFieldRule, Recipient, RecipientRule, RolePolicy,
    Status, TimestampKind, decode_common, required_timestamp_kind,
};
use crate::normalize::CollapsePolicy;

const USER_CONTENT: ContentPolicy = ContentPolicy {
    allowed_tags: &["text", "multimodal_text"],
    text_collapse: CollapsePolicy::JoinedStrings,
    allowed_parts: &["text", "image_asset_pointer"],
    code_language: CodeLanguageRule::Any,
};

const USER_POLICY: RolePolicy = RolePolicy {
    statuses: &["finished_successfully"],
    create_time_required: true,
    update_time: NullableFieldRule::NullOnly,
    end_turn: EndTurnRule::NullOnly,
    recipient: RecipientRule::AllOnly,
    channel: ChannelRule::NullOnly,
    name: NameRule::NullOnly,
    author: None,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserMessage {
    pub id: String,
    pub parent: String,
    pub children: Vec<String>,
    pub create_time: f64,
    pub status: Status,
    pub weight: f64,
    pub recipient: Recipient,
    pub content: Content,
    pub metadata: UserMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp_: TimestampKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachments: Option<Vec<Attachment>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub targeted_reply: Option<String>,
}

/// Uploaded files referenced by the turn. The export distinguishes text
/// files by the presence of a token-size field, not by a tag.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Attachment {
    TextFile(TextFileAttachment),
    Image(ImageAttachment),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageAttachment {
    pub name: String,
    pub id: String,
    pub size: i64,
    #[serde(rename = "mimeType", skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextFileAttachment {
    pub name: String,
    pub id: String,
    pub size: i64,
    #[serde(rename = "mimeType")]
    pub mime_type: String,
    #[serde(rename = "fileTokenSize")]
    pub file_token_size: i64,
}

impl UserMessage {
    pub(crate) fn decode(mut obj: ObjectReader) -> DecodeResult<Self> {
        let common = decode_common(&mut obj, &USER_POLICY)?;

        let content_path = obj.path().key("content");
        let content = match obj.take_value("content") {
            None | Some(Value::Null) => {
                return Err(DecodeError::schema(
                    content_path.as_str(),
                    "required attribute is missing",
                ));
            }
            Some(value) => Content::decode(value, content_path, &USER_CONTENT)?,
        };

        let metadata_obj = obj.required_object("metadata")?;
        let metadata = UserMetadata::decode(metadata_obj)?;
        obj.finish()?;

        Ok(Self {
            id: common.id,
            parent: common.parent,
            children: common.children,
            create_time: common.create_time.unwrap_or_default(),
            status: common.status,
            weight: common.weight,
            recipient: common.recipient,
            content,
            metadata,
        })
    }
}

impl UserMetadata {
    fn decode(mut obj: ObjectReader) -> DecodeResult<Self> {
        let request_id = obj.optional_string("request_id")?;
        let timestamp_ = required_timestamp_kind(&mut obj)?;
        obj.expect_null("message_type")?;
        let attachments = match obj.optional_array("attachments")? {
            None => None,
            Some((items, path)) => Some(
                items
                    .into_iter()
                    .enumerate()
                    .map(|(index, item)| Attachment::decode(item, path.index(index)))
                    .collect::<DecodeResult<Vec<Attachment>>>()?,
            ),
        };
        let targeted_reply = obj.optional_string("targeted_reply")?;
        obj.finish()?;
        Ok(Self {
            request_id,
            timestamp_,
            attachments,
            targeted_reply,
        })
    }
}

impl Attachment {
    fn decode(value: Value, path: FieldPath) -> DecodeResult<Self> {
        let mut obj = ObjectReader::from_value(value, path)?;
        let name = obj.required_string("name")?;
        let id = obj.required_string("id")?;
        let size = obj.required_i64("size")?;

        if obj.contains("fileTokenSize") {
            let mime_path = obj.path().key("mimeType");
            let mime_type = obj.required_string("mimeType")?;
            if mime_type != "text/plain" {
                return Err(DecodeError::schema(
                    mime_path.as_str(),
                    format!("expected literal `text/plain`, found `{mime_type}`"),
                ));
            }
            let file_token_size = obj.required_i64("fileTokenSize")?;
            obj.finish()?;
            Ok(Self::TextFile(TextFileAttachment {
                name,
                id,
                size,
                mime_type,
                file_token_size,
            }))
        } else {
            let mime_type = obj.optional_string("mimeType")?;
            let width = obj.optional_i64("width")?;
            let height = obj.optional_i64("height")?;
            obj.finish()?;
            Ok(Self::Image(ImageAttachment {
                name,
                id,
                size,
                mime_type,
                width,
                height,
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::models::message::Message;

    use super::*;

    fn decode_user(value: Value) -> DecodeResult<Message> {
        Message::decode(value, FieldPath::root("message"))
    }

    fn base_message() -> Value {
        json!({
            "id": "m1",
            "role": "user",
            "parent": "r",
            "children": [],
            "create_time": 1700000000.5,
            "update_time": null,
            "status": "finished_successfully",
            "end_turn": null,
            "weight": 1.0,
            "recipient": "all",
            "content": {"content_type": "text", "parts": ["hello"]},
            "metadata": {"timestamp_": "absolute", "message_type": null, "request_id": "req-1"}
        })
    }

    #[test]
    fn decodes_a_plain_text_user_message() {
        let message = decode_user(base_message()).unwrap();
        let Message::User(user) = message else {
            panic!("expected user message");
        };
        assert_eq!(user.id, "m1");
        assert_eq!(user.content.plain_text(), "hello");
        assert_eq!(user.metadata.request_id.as_deref(), Some("req-1"));
    }

    #[test]
    fn multi_part_user_text_joins_instead_of_asserting() {
        let mut raw = base_message();
        raw["content"] = json!({"content_type": "text", "parts": ["a", "b"]});
        let message = decode_user(raw).unwrap();
        assert_eq!(message.content().plain_text(), "a\nb");
    }

    #[test]
    fn rejects_one_undeclared_metadata_attribute() {
        let mut raw = base_message();
        raw["metadata"]["shiny_new_field"] = json!(true);
        let err = decode_user(raw).unwrap_err();
        assert!(matches!(err, DecodeError::SchemaMismatch { .. }), "{err}");
        assert!(err.to_string().contains("shiny_new_field"), "{err}");
    }

    #[test]
    fn rejects_assistant_only_content_for_users() {
        let mut raw = base_message();
        raw["content"] = json!({
            "content_type": "thoughts",
            "thoughts": [],
            "source_analysis_msg_id": "x"
        });
        let err = decode_user(raw).unwrap_err();
        assert!(err.to_string().contains("not legal for this role"), "{err}");
    }

    #[test]
    fn attachments_discriminate_text_files_by_token_size() {
        let mut raw = base_message();
        raw["metadata"]["attachments"] = json!([
            {"name": "notes.txt", "id": "file-1", "size": 12, "mimeType": "text/plain",
             "fileTokenSize": 4},
            {"name": "photo.png", "id": "file-2", "size": 2048, "mimeType": "image/png",
             "width": 64, "height": 64}
        ]);
        let message = decode_user(raw).unwrap();
        let Message::User(user) = message else {
            panic!("expected user message");
        };
        let attachments = user.metadata.attachments.expect("attachments decoded");
        assert!(matches!(attachments[0], Attachment::TextFile(_)));
        assert!(matches!(attachments[1], Attachment::Image(_)));
    }

    #[test]
    fn user_end_turn_must_stay_null() {
        let mut raw = base_message();
        raw["end_turn"] = json!(true);
        let err = decode_user(raw).unwrap_err();
        assert!(err.to_string().contains("end_turn"), "{err}");
    }
}
