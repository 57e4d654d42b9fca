//! Message variant registry: the closed role set, the shared field
//! contract every role validates once, and the metadata shapes more than
//! one role carries.

use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::decode::{FieldPath, ObjectReader};
use crate::error::{DecodeError, DecodeResult};
use crate::models::assistant::AssistantMessage;
use crate::models::content::Content;
use crate::models::names::ToolName;
use crate::models::system::SystemMessage;
use crate::models::tool::ToolMessage;
use crate::models::user::UserMessage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
    System,
    Tool,
}

impl Role {
    pub const TAGS: &'static [&'static str] = &["user", "assistant", "system", "tool"];

    #[must_use]
    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "user" => Some(Self::User),
            "assistant" => Some(Self::Assistant),
            "system" => Some(Self::System),
            "tool" => Some(Self::Tool),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::System => "system",
            Self::Tool => "tool",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    FinishedSuccessfully,
    InProgress,
    FinishedPartialCompletion,
}

impl Status {
    fn from_tag(tag: &str, path: &FieldPath) -> DecodeResult<Self> {
        match tag {
            "finished_successfully" => Ok(Self::FinishedSuccessfully),
            "in_progress" => Ok(Self::InProgress),
            "finished_partial_completion" => Ok(Self::FinishedPartialCompletion),
            other => Err(DecodeError::schema(
                path.as_str(),
                format!("`{other}` is not a message status"),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Final,
    Commentary,
}

/// Who a message is addressed to. Serialized as the raw tag string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipient {
    All,
    Assistant,
    Tool(ToolName),
}

impl Recipient {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::All => "all",
            Self::Assistant => "assistant",
            Self::Tool(name) => name.as_str(),
        }
    }
}

impl Serialize for Recipient {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Which recipients a role may address.
#[derive(Debug, Clone, Copy)]
pub(crate) enum RecipientRule {
    AllOnly,
    AllOrAssistant,
    AllOrTool,
}

fn decode_recipient(text: String, path: &FieldPath, rule: RecipientRule) -> DecodeResult<Recipient> {
    match (text.as_str(), rule) {
        ("all", _) => Ok(Recipient::All),
        ("assistant", RecipientRule::AllOrAssistant) => Ok(Recipient::Assistant),
        (_, RecipientRule::AllOrTool) => ToolName::parse(text, path).map(Recipient::Tool),
        (other, _) => Err(DecodeError::schema(
            path.as_str(),
            format!("`{other}` is not a legal recipient for this role"),
        )),
    }
}

/// The only timestamp discipline the export has ever declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimestampKind {
    Absolute,
}

pub(crate) fn required_timestamp_kind(obj: &mut ObjectReader) -> DecodeResult<TimestampKind> {
    obj.literal_str("timestamp_", "absolute")?;
    Ok(TimestampKind::Absolute)
}

pub(crate) fn optional_timestamp_kind(obj: &mut ObjectReader) -> DecodeResult<Option<TimestampKind>> {
    if obj.optional_literal_str("timestamp_", "absolute")? {
        Ok(Some(TimestampKind::Absolute))
    } else {
        Ok(None)
    }
}

/// Hoisted `author.metadata` for roles that carry one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthorMetadata {
    pub real_author: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sonicberry_model_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct AuthorRule {
    pub real_authors: &'static [&'static str],
    pub allow_model_fields: bool,
}

fn decode_author_metadata(
    value: Value,
    path: FieldPath,
    rule: AuthorRule,
) -> DecodeResult<AuthorMetadata> {
    let mut obj = ObjectReader::from_value(value, path)?;
    let real_author = obj.required_enum("real_author", rule.real_authors)?;
    let (sonicberry_model_id, source) = if rule.allow_model_fields {
        (
            obj.optional_enum(
                "sonicberry_model_id",
                &["current_sonicberry_paid", "alpha.sonicberry_2s_p"],
            )?,
            obj.optional_enum("source", &["sonic_tool"])?,
        )
    } else {
        (None, None)
    };
    obj.finish()?;
    Ok(AuthorMetadata {
        real_author,
        sonicberry_model_id,
        source,
    })
}

/// How the model run ended. Shared by assistant and tool metadata; tool
/// messages only ever record interruptions.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum FinishDetails {
    #[serde(rename = "stop")]
    Stop {
        #[serde(skip_serializing_if = "Option::is_none")]
        stop_tokens: Option<Vec<i64>>,
        #[serde(skip_serializing_if = "Option::is_none")]
        stop: Option<String>,
    },
    #[serde(rename = "interrupted")]
    Interrupted {
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
    #[serde(rename = "max_tokens")]
    MaxTokens {},
}

impl FinishDetails {
    pub fn decode(
        value: Value,
        path: FieldPath,
        allowed: &'static [&'static str],
    ) -> DecodeResult<Self> {
        let mut obj = ObjectReader::from_value(value, path)?;
        let kind = obj.required_enum("type", allowed)?;
        let details = match kind.as_str() {
            "stop" => {
                let stop_tokens = match obj.optional_array("stop_tokens")? {
                    None => None,
                    Some((items, items_path)) => Some(
                        items
                            .into_iter()
                            .enumerate()
                            .map(|(index, item)| {
                                crate::decode::i64_value(item, &items_path.index(index))
                            })
                            .collect::<DecodeResult<Vec<i64>>>()?,
                    ),
                };
                let stop = obj.optional_string("stop")?;
                Self::Stop { stop_tokens, stop }
            }
            "interrupted" => Self::Interrupted {
                reason: obj.optional_enum("reason", &["client_stopped"])?,
            },
            "max_tokens" => Self::MaxTokens {},
            _ => unreachable!("enum membership checked above"),
        };
        obj.finish()?;
        Ok(details)
    }
}

/// Canvas state attached to textdoc-producing turns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Canvas {
    pub textdoc_id: String,
    pub textdoc_type: String,
    pub version: i64,
    pub title: String,
    pub create_source: String,
}

impl Canvas {
    pub fn decode(value: Value, path: FieldPath) -> DecodeResult<Self> {
        let mut obj = ObjectReader::from_value(value, path)?;
        let textdoc_id = obj.required_string("textdoc_id")?;
        let textdoc_type = obj.required_enum("textdoc_type", &["document", "code/python"])?;
        let version = obj.literal_i64("version", 1)?;
        let title = obj.required_string("title")?;
        let create_source = obj.required_enum("create_source", &["model"])?;
        obj.finish()?;
        Ok(Self {
            textdoc_id,
            textdoc_type,
            version,
            title,
            create_source,
        })
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum NullableFieldRule {
    NullOnly,
    OptionalF64,
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum EndTurnRule {
    OptionalBool,
    LiteralTrueOrNull,
    LiteralFalseOrNull,
    NullOnly,
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum ChannelRule {
    Allowed,
    NullOnly,
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum NameRule {
    NullOnly,
    RequiredTool,
}

/// Per-role constraints over the shared field contract.
pub(crate) struct RolePolicy {
    pub statuses: &'static [&'static str],
    pub create_time_required: bool,
    pub update_time: NullableFieldRule,
    pub end_turn: EndTurnRule,
    pub recipient: RecipientRule,
    pub channel: ChannelRule,
    pub name: NameRule,
    pub author: Option<AuthorRule>,
}

/// The fields every role shares, validated once.
pub(crate) struct CommonFields {
    pub id: String,
    pub parent: String,
    pub children: Vec<String>,
    pub create_time: Option<f64>,
    pub update_time: Option<f64>,
    pub status: Status,
    pub end_turn: Option<bool>,
    pub weight: f64,
    pub recipient: Recipient,
    pub channel: Option<Channel>,
    pub name: Option<ToolName>,
    pub author_metadata: Option<AuthorMetadata>,
}

pub(crate) fn decode_common(
    obj: &mut ObjectReader,
    policy: &RolePolicy,
) -> DecodeResult<CommonFields> {
    let id = obj.required_string("id")?;
    let parent = obj.required_string("parent")?;
    let children = obj.required_string_array("children")?;

    let create_time = if policy.create_time_required {
        Some(obj.required_f64("create_time")?)
    } else {
        obj.optional_f64("create_time")?
    };
    let update_time = match policy.update_time {
        NullableFieldRule::NullOnly => {
            obj.expect_null("update_time")?;
            None
        }
        NullableFieldRule::OptionalF64 => obj.optional_f64("update_time")?,
    };

    let status_tag = obj.required_enum("status", policy.statuses)?;
    let status = Status::from_tag(&status_tag, &obj.path().key("status"))?;

    let end_turn = match policy.end_turn {
        EndTurnRule::OptionalBool => obj.optional_bool("end_turn")?,
        EndTurnRule::LiteralTrueOrNull => obj.optional_literal_bool("end_turn", true)?,
        EndTurnRule::LiteralFalseOrNull => obj.optional_literal_bool("end_turn", false)?,
        EndTurnRule::NullOnly => {
            obj.expect_null("end_turn")?;
            None
        }
    };

    let weight = obj.required_f64("weight")?;

    let recipient_raw = obj.required_string("recipient")?;
    let recipient = decode_recipient(recipient_raw, &obj.path().key("recipient"), policy.recipient)?;

    let channel = match policy.channel {
        ChannelRule::Allowed => match obj.optional_enum("channel", &["final", "commentary"])? {
            None => None,
            Some(tag) if tag == "final" => Some(Channel::Final),
            Some(_) => Some(Channel::Commentary),
        },
        ChannelRule::NullOnly => {
            obj.expect_null("channel")?;
            None
        }
    };

    let name = match policy.name {
        NameRule::NullOnly => {
            obj.expect_null("name")?;
            None
        }
        NameRule::RequiredTool => {
            let raw = obj.required_string("name")?;
            Some(ToolName::parse(raw, &obj.path().key("name"))?)
        }
    };

    let author_metadata = match policy.author {
        None => {
            obj.expect_null("author_metadata")?;
            None
        }
        Some(rule) => match obj.take_present("author_metadata") {
            None => None,
            Some((value, path)) => Some(decode_author_metadata(value, path, rule)?),
        },
    };

    Ok(CommonFields {
        id,
        parent,
        children,
        create_time,
        update_time,
        status,
        end_turn,
        weight,
        recipient,
        channel,
        name,
        author_metadata,
    })
}

/// A validated message, polymorphic over the closed role set.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    User(UserMessage),
    Assistant(AssistantMessage),
    System(SystemMessage),
    Tool(ToolMessage),
}

impl Message {
    /// Validates a normalized message payload whose role is already flat.
    pub fn decode(value: Value, path: FieldPath) -> DecodeResult<Self> {
        let mut obj = ObjectReader::from_value(value, path)?;
        let role_tag = obj.required_string("role")?;
        let Some(role) = Role::parse(&role_tag) else {
            return Err(DecodeError::unknown_variant(
                obj.path().key("role").as_str(),
                "role",
                role_tag,
                Role::TAGS,
            ));
        };
        match role {
            Role::User => UserMessage::decode(obj).map(Self::User),
            Role::Assistant => AssistantMessage::decode(obj).map(Self::Assistant),
            Role::System => SystemMessage::decode(obj).map(Self::System),
            Role::Tool => ToolMessage::decode(obj).map(Self::Tool),
        }
    }

    #[must_use]
    pub const fn role(&self) -> Role {
        match self {
            Self::User(_) => Role::User,
            Self::Assistant(_) => Role::Assistant,
            Self::System(_) => Role::System,
            Self::Tool(_) => Role::Tool,
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::User(message) => &message.id,
            Self::Assistant(message) => &message.id,
            Self::System(message) => &message.id,
            Self::Tool(message) => &message.id,
        }
    }

    #[must_use]
    pub fn parent(&self) -> &str {
        match self {
            Self::User(message) => &message.parent,
            Self::Assistant(message) => &message.parent,
            Self::System(message) => &message.parent,
            Self::Tool(message) => &message.parent,
        }
    }

    #[must_use]
    pub fn children(&self) -> &[String] {
        match self {
            Self::User(message) => &message.children,
            Self::Assistant(message) => &message.children,
            Self::System(message) => &message.children,
            Self::Tool(message) => &message.children,
        }
    }

    #[must_use]
    pub fn content(&self) -> &Content {
        match self {
            Self::User(message) => &message.content,
            Self::Assistant(message) => &message.content,
            Self::System(message) => &message.content,
            Self::Tool(message) => &message.content,
        }
    }

    #[must_use]
    pub fn create_time(&self) -> Option<f64> {
        match self {
            Self::User(message) => Some(message.create_time),
            Self::Assistant(message) => Some(message.create_time),
            Self::System(message) => message.create_time,
            Self::Tool(message) => Some(message.create_time),
        }
    }

    #[must_use]
    pub fn weight(&self) -> f64 {
        match self {
            Self::User(message) => message.weight,
            Self::Assistant(message) => message.weight,
            Self::System(message) => message.weight,
            Self::Tool(message) => message.weight,
        }
    }

    #[must_use]
    pub fn status(&self) -> Status {
        match self {
            Self::User(message) => message.status,
            Self::Assistant(message) => message.status,
            Self::System(message) => message.status,
            Self::Tool(message) => message.status,
        }
    }

    #[must_use]
    pub fn end_turn(&self) -> Option<bool> {
        match self {
            Self::User(_) => None,
            Self::Assistant(message) => message.end_turn,
            Self::System(message) => message.end_turn,
            Self::Tool(message) => message.end_turn,
        }
    }

    #[must_use]
    pub fn recipient(&self) -> &Recipient {
        match self {
            Self::User(message) => &message.recipient,
            Self::Assistant(message) => &message.recipient,
            Self::System(message) => &message.recipient,
            Self::Tool(message) => &message.recipient,
        }
    }

    #[must_use]
    pub fn channel(&self) -> Option<Channel> {
        match self {
            Self::Assistant(message) => message.channel,
            Self::User(_) | Self::System(_) | Self::Tool(_) => None,
        }
    }

    /// Canonical raw form: the role struct's fields plus the flat role tag.
    pub fn to_raw(&self) -> Result<Value, serde_json::Error> {
        let mut value = match self {
            Self::User(message) => serde_json::to_value(message)?,
            Self::Assistant(message) => serde_json::to_value(message)?,
            Self::System(message) => serde_json::to_value(message)?,
            Self::Tool(message) => serde_json::to_value(message)?,
        };
        if let Value::Object(map) = &mut value {
            map.insert(
                "role".to_string(),
                Value::String(self.role().as_str().to_string()),
            );
        }
        Ok(value)
    }
}

impl Serialize for Message {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::Error as _;
        let value = self.to_raw().map_err(S::Error::custom)?;
        value.serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn unknown_role_is_an_unknown_variant_error() {
        let err = Message::decode(
            json!({"role": "moderator", "id": "m1"}),
            FieldPath::root("message"),
        )
        .unwrap_err();
        match err {
            DecodeError::UnknownVariant { family, tag, .. } => {
                assert_eq!(family, "role");
                assert_eq!(tag, "moderator");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn finish_details_variants_decode_and_restrict() {
        let path = FieldPath::root("metadata").key("finish_details");
        let stop = FinishDetails::decode(
            json!({"type": "stop", "stop_tokens": [200002]}),
            path.clone(),
            &["stop", "interrupted", "max_tokens"],
        )
        .unwrap();
        assert!(matches!(stop, FinishDetails::Stop { .. }));

        // Tool metadata only ever records interruptions.
        let err = FinishDetails::decode(
            json!({"type": "stop"}),
            path,
            &["interrupted"],
        )
        .unwrap_err();
        assert!(err.to_string().contains("interrupted"), "{err}");
    }

    #[test]
    fn recipient_rules_gate_tool_addressing() {
        let path = FieldPath::root("message").key("recipient");
        assert_eq!(
            decode_recipient("all".into(), &path, RecipientRule::AllOnly).unwrap(),
            Recipient::All
        );
        assert!(decode_recipient("assistant".into(), &path, RecipientRule::AllOnly).is_err());
        assert_eq!(
            decode_recipient("assistant".into(), &path, RecipientRule::AllOrAssistant).unwrap(),
            Recipient::Assistant
        );
        let tool = decode_recipient("python".into(), &path, RecipientRule::AllOrTool).unwrap();
        assert_eq!(tool.as_str(), "python");
        assert!(decode_recipient("made_up".into(), &path, RecipientRule::AllOrTool).is_err());
    }

    #[test]
    fn canvas_pins_version_and_create_source() {
        let canvas = Canvas::decode(
            json!({
                "textdoc_id": "doc-1",
                "textdoc_type": "document",
                "version": 1,
                "title": "Notes",
                "create_source": "model"
            }),
            FieldPath::root("metadata").key("canvas"),
        )
        .unwrap();
        assert_eq!(canvas.version, 1);

        let err = Canvas::decode(
            json!({
                "textdoc_id": "doc-1",
                "textdoc_type": "document",
                "version": 2,
                "title": "Notes",
                "create_source": "model"
            }),
            FieldPath::root("metadata").key("canvas"),
        )
        .unwrap_err();
        assert!(err.to_string().contains("version"), "{err}");
    }
}
