//! System-role messages. The narrowest role: plain text content and a
//! small visibility-oriented metadata record.

use serde::Serialize;
use serde_json::Value;

use crate::decode::ObjectReader;
use crate::error::{DecodeError, DecodeResult};
use crate::models::content::{CodeLanguageRule, Content, ContentPolicy};
use crate::models::message::{
    ChannelRule, EndTurnRule, NameRule, NullableFieldRule, Recipient, RecipientRule, RolePolicy,
    Status, TimestampKind, decode_common, optional_timestamp_kind,
};
use crate::normalize::CollapsePolicy;

const SYSTEM_CONTENT: ContentPolicy = ContentPolicy {
    allowed_tags: &["text"],
    text_collapse: CollapsePolicy::JoinedStrings,
    allowed_parts: &[],
    code_language: CodeLanguageRule::Any,
};

const SYSTEM_POLICY: RolePolicy = RolePolicy {
    statuses: &["finished_successfully"],
    create_time_required: false,
    update_time: NullableFieldRule::NullOnly,
    end_turn: EndTurnRule::LiteralTrueOrNull,
    recipient: RecipientRule::AllOnly,
    channel: ChannelRule::NullOnly,
    name: NameRule::NullOnly,
    author: None,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemMessage {
    pub id: String,
    pub parent: String,
    pub children: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub create_time: Option<f64>,
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_turn: Option<bool>,
    pub weight: f64,
    pub recipient: Recipient,
    pub content: Content,
    pub metadata: SystemMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemMetadata {
    pub is_visually_hidden_from_conversation: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_complete: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_user_system_message: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_context_message_data: Option<UserContextMessageData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rebase_system_message: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_slug: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_model_slug: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp_: Option<TimestampKind>,
}

/// Custom-instructions payload carried by user system messages.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserContextMessageData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub about_user_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub about_model_message: Option<String>,
}

impl SystemMessage {
    pub(crate) fn decode(mut obj: ObjectReader) -> DecodeResult<Self> {
        let common = decode_common(&mut obj, &SYSTEM_POLICY)?;

        let content_path = obj.path().key("content");
        let content = match obj.take_value("content") {
            None | Some(Value::Null) => {
                return Err(DecodeError::schema(
                    content_path.as_str(),
                    "required attribute is missing",
                ));
            }
            Some(value) => Content::decode(value, content_path, &SYSTEM_CONTENT)?,
        };

        let metadata_obj = obj.required_object("metadata")?;
        let metadata = SystemMetadata::decode(metadata_obj)?;
        obj.finish()?;

        Ok(Self {
            id: common.id,
            parent: common.parent,
            children: common.children,
            create_time: common.create_time,
            status: common.status,
            end_turn: common.end_turn,
            weight: common.weight,
            recipient: common.recipient,
            content,
            metadata,
        })
    }
}

impl SystemMetadata {
    fn decode(mut obj: ObjectReader) -> DecodeResult<Self> {
        let is_visually_hidden_from_conversation =
            obj.literal_bool("is_visually_hidden_from_conversation", true)?;
        let is_complete = obj.optional_literal_bool("is_complete", true)?;
        let is_user_system_message = obj.optional_literal_bool("is_user_system_message", true)?;
        let user_context_message_data = match obj.optional_object("user_context_message_data")? {
            None => None,
            Some(mut inner) => {
                let data = UserContextMessageData {
                    about_user_message: inner.optional_string("about_user_message")?,
                    about_model_message: inner.optional_string("about_model_message")?,
                };
                inner.finish()?;
                Some(data)
            }
        };
        let rebase_system_message = obj.optional_literal_bool("rebase_system_message", true)?;
        obj.expect_null("message_type")?;
        let model_slug = obj.optional_string("model_slug")?;
        let default_model_slug = obj.optional_string("default_model_slug")?;
        let parent_id = obj.optional_string("parent_id")?;
        let request_id = obj.optional_string("request_id")?;
        let timestamp_ = optional_timestamp_kind(&mut obj)?;
        obj.finish()?;
        Ok(Self {
            is_visually_hidden_from_conversation,
            is_complete,
            is_user_system_message,
            user_context_message_data,
            rebase_system_message,
            model_slug,
            default_model_slug,
            parent_id,
            request_id,
            timestamp_,
        })
    }
}
