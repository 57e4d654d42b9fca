//! Tool-role messages: browser, python, DALL·E and plugin output, with the
//! command/invocation metadata those runs leave behind.

use serde::Serialize;
use serde_json::Value;

use crate::decode::{FieldPath, ObjectReader, i64_value, render_value, string_value};
use crate::error::{DecodeError, DecodeResult};
use crate::models::content::{CodeLanguageRule, Content, ContentPolicy};
use crate::models::contentref::{SearchResultGroup, decode_optional_vec};
use crate::models::message::{
    AuthorMetadata, AuthorRule, Canvas, ChannelRule, EndTurnRule, FinishDetails, NameRule,
    NullableFieldRule, Recipient, RecipientRule, RolePolicy, Status, TimestampKind, decode_common,
    required_timestamp_kind,
};
use crate::models::names::{ModelSlug, ToolName};
use crate::normalize::CollapsePolicy;

const TOOL_CONTENT: ContentPolicy = ContentPolicy {
    allowed_tags: &[
        "text",
        "code",
        "system_error",
        "execution_output",
        "tether_browsing_display",
        "tether_quote",
        "multimodal_text",
    ],
    text_collapse: CollapsePolicy::SingleString,
    allowed_parts: &["text", "image_asset_pointer"],
    code_language: CodeLanguageRule::Any,
};

const TOOL_POLICY: RolePolicy = RolePolicy {
    statuses: &["finished_successfully", "in_progress"],
    create_time_required: true,
    update_time: NullableFieldRule::OptionalF64,
    end_turn: EndTurnRule::LiteralFalseOrNull,
    recipient: RecipientRule::AllOrAssistant,
    channel: ChannelRule::NullOnly,
    name: NameRule::RequiredTool,
    author: Some(AuthorRule {
        real_authors: &["tool:web.run"],
        allow_model_fields: false,
    }),
};

/// Browser verbs recorded by tool turns.
pub const COMMANDS: &[&str] = &[
    "search",
    "mclick",
    "click",
    "quote_lines",
    "back",
    "quote",
    "open_url",
    "scroll",
    "context_stuff",
    "create_textdoc",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolMessage {
    pub id: String,
    pub parent: String,
    pub children: Vec<String>,
    pub name: ToolName,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_metadata: Option<AuthorMetadata>,
    pub create_time: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_time: Option<f64>,
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_turn: Option<bool>,
    pub weight: f64,
    pub recipient: Recipient,
    pub content: Content,
    pub metadata: ToolMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct ToolMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_slug: Option<ModelSlug>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp_: Option<TimestampKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_model_slug: Option<ModelSlug>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requested_model_slug: Option<ModelSlug>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_complete: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aggregate_result: Option<Value>,
    #[serde(rename = "_cite_metadata", skip_serializing_if = "Option::is_none")]
    pub cite_metadata: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_visually_hidden_from_conversation: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pad: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jit_plugin_data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gizmo_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice_mode_message: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug_sonic_thread_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_duration_sec: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub args: Option<CommandArgs>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kwargs: Option<ToolKwargs>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_details: Option<FinishDetails>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoked_plugin: Option<InvokedPlugin>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_result_groups: Option<Vec<SearchResultGroup>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ada_visualizations: Option<Vec<Visualization>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub canvas: Option<Canvas>,
}

/// Positional command arguments: uniformly strings, integers, or integer
/// pairs (line ranges), never mixed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CommandArgs {
    Strings(Vec<String>),
    Ints(Vec<i64>),
    IntLists(Vec<Vec<i64>>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolKwargs {
    pub message_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_message_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sync_write: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvokedPlugin {
    #[serde(rename = "type")]
    pub plugin_kind: String,
    pub namespace: String,
    pub plugin_id: String,
    pub http_response_status: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum Visualization {
    #[serde(rename = "table")]
    Table { file_id: String, title: String },
    #[serde(rename = "chart")]
    Chart {
        #[serde(skip_serializing_if = "Option::is_none")]
        file_id: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        chart_type: String,
        fallback_to_image: bool,
    },
}

impl ToolMessage {
    pub(crate) fn decode(mut obj: ObjectReader) -> DecodeResult<Self> {
        let common = decode_common(&mut obj, &TOOL_POLICY)?;

        let Some(name) = common.name else {
            return Err(DecodeError::schema(
                obj.path().key("name").as_str(),
                "tool messages must name their tool",
            ));
        };

        let content_path = obj.path().key("content");
        let content = match obj.take_value("content") {
            None | Some(Value::Null) => {
                return Err(DecodeError::schema(
                    content_path.as_str(),
                    "required attribute is missing",
                ));
            }
            Some(value) => Content::decode(value, content_path, &TOOL_CONTENT)?,
        };

        let metadata_obj = obj.required_object("metadata")?;
        let metadata = ToolMetadata::decode(metadata_obj)?;
        obj.finish()?;

        Ok(Self {
            id: common.id,
            parent: common.parent,
            children: common.children,
            name,
            author_metadata: common.author_metadata,
            create_time: common.create_time.unwrap_or_default(),
            update_time: common.update_time,
            status: common.status,
            end_turn: common.end_turn,
            weight: common.weight,
            recipient: common.recipient,
            content,
            metadata,
        })
    }
}

fn take_model_slug(obj: &mut ObjectReader, key: &str) -> DecodeResult<Option<ModelSlug>> {
    match obj.optional_string(key)? {
        None => Ok(None),
        Some(raw) => ModelSlug::parse(raw, &obj.path().key(key)).map(Some),
    }
}

impl ToolMetadata {
    fn decode(mut obj: ObjectReader) -> DecodeResult<Self> {
        obj.expect_null("message_type")?;
        let model_slug = take_model_slug(&mut obj, "model_slug")?;
        let timestamp_ = Some(required_timestamp_kind(&mut obj)?);
        let default_model_slug = take_model_slug(&mut obj, "default_model_slug")?;
        let requested_model_slug = take_model_slug(&mut obj, "requested_model_slug")?;
        let parent_id = obj.optional_string("parent_id")?;
        let request_id = obj.optional_string("request_id")?;
        let is_complete = obj.optional_bool("is_complete")?;
        let aggregate_result = obj.optional_opaque("aggregate_result");
        let cite_metadata = obj.optional_opaque("_cite_metadata");
        let status = obj.optional_enum("status", &["finished", "failed"])?;
        let is_visually_hidden_from_conversation =
            obj.optional_literal_bool("is_visually_hidden_from_conversation", true)?;
        let pad = obj.optional_string("pad")?;
        let jit_plugin_data = obj.optional_opaque("jit_plugin_data");
        let gizmo_id = obj.optional_string("gizmo_id")?;
        let voice_mode_message = obj.optional_bool("voice_mode_message")?;
        let reasoning_status = obj.optional_enum("reasoning_status", &["is_reasoning"])?;
        let debug_sonic_thread_id = obj.optional_string("debug_sonic_thread_id")?;
        let initial_text = obj.optional_string("initial_text")?;
        let finished_duration_sec = obj.optional_i64("finished_duration_sec")?;
        let finished_text = obj.optional_string("finished_text")?;
        obj.expect_null_list("cloud_doc_urls")?;
        let command = obj.optional_enum("command", COMMANDS)?;
        let args = match obj.take_present("args") {
            None => None,
            Some((value, path)) => Some(CommandArgs::decode(value, path)?),
        };
        let kwargs = match obj.optional_object("kwargs")? {
            None => None,
            Some(inner) => Some(ToolKwargs::decode(inner)?),
        };
        let finish_details = match obj.take_present("finish_details") {
            None => None,
            Some((value, path)) => Some(FinishDetails::decode(value, path, &["interrupted"])?),
        };
        let invoked_plugin = match obj.optional_object("invoked_plugin")? {
            None => None,
            Some(inner) => Some(InvokedPlugin::decode(inner)?),
        };
        let search_result_groups =
            decode_optional_vec(&mut obj, "search_result_groups", SearchResultGroup::decode)?;
        let ada_visualizations =
            decode_optional_vec(&mut obj, "ada_visualizations", Visualization::decode)?;
        let canvas = match obj.take_present("canvas") {
            None => None,
            Some((value, path)) => Some(Canvas::decode(value, path)?),
        };
        obj.finish()?;

        Ok(Self {
            model_slug,
            timestamp_,
            default_model_slug,
            requested_model_slug,
            parent_id,
            request_id,
            is_complete,
            aggregate_result,
            cite_metadata,
            status,
            is_visually_hidden_from_conversation,
            pad,
            jit_plugin_data,
            gizmo_id,
            voice_mode_message,
            reasoning_status,
            debug_sonic_thread_id,
            initial_text,
            finished_duration_sec,
            finished_text,
            command,
            args,
            kwargs,
            finish_details,
            invoked_plugin,
            search_result_groups,
            ada_visualizations,
            canvas,
        })
    }
}

impl CommandArgs {
    fn decode(value: Value, path: FieldPath) -> DecodeResult<Self> {
        let items = match value {
            Value::Array(items) => items,
            other => {
                return Err(DecodeError::schema(
                    path.as_str(),
                    format!("expected array, found {}", render_value(&other)),
                ));
            }
        };

        match items.first() {
            None | Some(Value::String(_)) => items
                .into_iter()
                .enumerate()
                .map(|(index, item)| string_value(item, &path.index(index)))
                .collect::<DecodeResult<Vec<String>>>()
                .map(Self::Strings),
            Some(Value::Number(_)) => items
                .into_iter()
                .enumerate()
                .map(|(index, item)| i64_value(item, &path.index(index)))
                .collect::<DecodeResult<Vec<i64>>>()
                .map(Self::Ints),
            Some(Value::Array(_)) => items
                .into_iter()
                .enumerate()
                .map(|(index, item)| {
                    let inner_path = path.index(index);
                    let inner = match item {
                        Value::Array(inner) => inner,
                        other => {
                            return Err(DecodeError::schema(
                                inner_path.as_str(),
                                format!("expected array, found {}", render_value(&other)),
                            ));
                        }
                    };
                    inner
                        .into_iter()
                        .enumerate()
                        .map(|(inner_index, entry)| {
                            i64_value(entry, &inner_path.index(inner_index))
                        })
                        .collect::<DecodeResult<Vec<i64>>>()
                })
                .collect::<DecodeResult<Vec<Vec<i64>>>>()
                .map(Self::IntLists),
            Some(other) => Err(DecodeError::schema(
                path.index(0).as_str(),
                format!(
                    "expected string, integer or integer-list arguments, found {}",
                    render_value(other)
                ),
            )),
        }
    }
}

impl ToolKwargs {
    fn decode(mut obj: ObjectReader) -> DecodeResult<Self> {
        let message_id = obj.required_string("message_id")?;
        let pending_message_id = obj.optional_string("pending_message_id")?;
        let sync_write = obj.optional_literal_bool("sync_write", false)?;
        obj.finish()?;
        Ok(Self {
            message_id,
            pending_message_id,
            sync_write,
        })
    }
}

impl InvokedPlugin {
    fn decode(mut obj: ObjectReader) -> DecodeResult<Self> {
        let plugin_kind = obj.required_enum("type", &["remote"])?;
        let namespace = obj.required_string("namespace")?;
        let plugin_id = obj.required_string("plugin_id")?;
        let http_response_status = obj.required_i64("http_response_status")?;
        obj.finish()?;
        Ok(Self {
            plugin_kind,
            namespace,
            plugin_id,
            http_response_status,
        })
    }
}

impl Visualization {
    pub fn decode(value: Value, path: FieldPath) -> DecodeResult<Self> {
        let mut obj = ObjectReader::from_value(value, path)?;
        let kind = obj.required_enum("type", &["table", "chart"])?;
        let visualization = match kind.as_str() {
            "table" => Self::Table {
                file_id: obj.required_string("file_id")?,
                title: obj.required_string("title")?,
            },
            "chart" => {
                let file_id = obj.optional_string("file_id")?;
                let title = obj.optional_string("title")?;
                let chart_type = obj.required_enum("chart_type", &["bar"])?;
                let fallback_to_image = obj.literal_bool("fallback_to_image", false)?;
                Self::Chart {
                    file_id,
                    title,
                    chart_type,
                    fallback_to_image,
                }
            }
            _ => unreachable!("enum membership checked above"),
        };
        obj.finish()?;
        Ok(visualization)
    }
}
