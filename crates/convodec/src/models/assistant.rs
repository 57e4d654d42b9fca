//! Assistant-role messages: the widest content set and the metadata record
//! that absorbs most of the export's schema churn. Every field the export
//! is known to emit is named here; an unnamed field fails decoding, which
//! is how upstream format changes surface.

use serde::Serialize;
use serde_json::Value;

use crate::decode::{FieldPath, ObjectReader};
use crate::error::{DecodeError, DecodeResult};
use crate::models::content::{CodeLanguageRule, Content, ContentPolicy};
use crate::models::contentref::{
    ContentReference, RefImage, SearchQuery, SearchResultGroup, decode_optional_vec,
};
use crate::models::message::{
    AuthorMetadata, AuthorRule, Canvas, Channel, ChannelRule, EndTurnRule, FinishDetails, NameRule,
    NullableFieldRule, Recipient, RecipientRule, RolePolicy, Status, TimestampKind, decode_common,
    required_timestamp_kind,
};
use crate::models::names::ModelSlug;
use crate::normalize::CollapsePolicy;

const ASSISTANT_CONTENT: ContentPolicy = ContentPolicy {
    allowed_tags: &["text", "code", "thoughts", "reasoning_recap", "multimodal_text"],
    text_collapse: CollapsePolicy::SingleString,
    allowed_parts: &[
        "text",
        "audio_transcription",
        "audio_asset_pointer",
        "real_time_user_audio_video_asset_pointer",
    ],
    code_language: CodeLanguageRule::Closed(&["unknown", "json"]),
};

const ASSISTANT_POLICY: RolePolicy = RolePolicy {
    statuses: &[
        "finished_successfully",
        "in_progress",
        "finished_partial_completion",
    ],
    create_time_required: true,
    update_time: NullableFieldRule::NullOnly,
    end_turn: EndTurnRule::OptionalBool,
    recipient: RecipientRule::AllOrTool,
    channel: ChannelRule::Allowed,
    name: NameRule::NullOnly,
    author: Some(AuthorRule {
        real_authors: &["tool:web"],
        allow_model_fields: true,
    }),
};

pub const SEARCH_SOURCES: &[&str] = &[
    "composer_auto",
    "composer_search",
    "conversation_composer_web_icon",
    "conversation_composer_previous_web_mode",
    "url_no_search_hint",
];

pub const CLASSIFIER_CONFIG_NAMES: &[&str] = &[
    "sonic_force_pg_switcher_renderer_config",
    "sonic_classifier_ev3",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssistantMessage {
    pub id: String,
    pub parent: String,
    pub children: Vec<String>,
    pub create_time: f64,
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_turn: Option<bool>,
    pub weight: f64,
    pub recipient: Recipient,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<Channel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_metadata: Option<AuthorMetadata>,
    pub content: Content,
    pub metadata: AssistantMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct AssistantMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_slug: Option<ModelSlug>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp_: Option<TimestampKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_locale: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_model_slug: Option<ModelSlug>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pad: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gizmo_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice_mode_message: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requested_model_slug: Option<ModelSlug>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_duration_sec: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_reported_search_source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_display_string: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub searched_display_string: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_complete: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_visually_hidden_from_conversation: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter_out_for_training: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug_sonic_thread_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub augmented_paragen_prompt_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub safe_urls: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_details: Option<FinishDetails>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub citations: Option<Vec<Citation>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_references: Option<Vec<ContentReference>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_queries: Option<Vec<SearchQuery>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_result_groups: Option<Vec<SearchResultGroup>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sonic_classification_result: Option<SonicClassificationResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_results: Option<Vec<RefImage>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_turns_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_async_task_result_message: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub b1de6e2_rm: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub async_task_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub async_task_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_loading_message: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n7jupd_message: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning_group_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n7jupd_subtool: Option<SubTool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n7jupd_schedulable: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n7jupd_summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n7jupd_crefs: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n7jupd_crefs_by_file: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_references_by_file: Option<std::collections::BTreeMap<String, Vec<ContentReference>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_visually_hidden_reasoning_group: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub canvas: Option<Canvas>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub safety_plugin_status_code: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_switcher_deny: Option<Vec<ModelSwitcherDeny>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Citation {
    pub start_ix: i64,
    pub end_ix: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub citation_format_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invalid_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<CitationMetadata>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum CitationMetadata {
    #[serde(rename = "webpage")]
    Webpage {
        #[serde(skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        url: String,
        text: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub_date: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        extra: Option<CitationExtra>,
    },
    #[serde(rename = "file")]
    File {
        #[serde(skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        url: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        text: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        source: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        extra: Option<Value>,
    },
    #[serde(rename = "image_inline")]
    ImageInline {
        asset_pointer_links: Vec<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        clicked_from_url: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        clicked_from_title: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CitationExtra {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evidence_text: Option<String>,
    pub cited_message_idx: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_result_idx: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cited_message_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_line_num: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_line_num: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connector_source: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SonicClassificationResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_prob: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub force_search_threshold: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classifier_config_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub complex_search_prob: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_complexity: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubTool {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generic_api_func: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtool: Option<String>,
    pub used_internet: bool,
    pub changed_url: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_of_subtool: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelSwitcherDeny {
    pub slug: ModelSlug,
    pub context: String,
    pub reason: String,
    pub description: String,
}

impl AssistantMessage {
    pub(crate) fn decode(mut obj: ObjectReader) -> DecodeResult<Self> {
        let common = decode_common(&mut obj, &ASSISTANT_POLICY)?;

        let content_path = obj.path().key("content");
        let content = match obj.take_value("content") {
            None | Some(Value::Null) => {
                return Err(DecodeError::schema(
                    content_path.as_str(),
                    "required attribute is missing",
                ));
            }
            Some(value) => Content::decode(value, content_path, &ASSISTANT_CONTENT)?,
        };

        let metadata_obj = obj.required_object("metadata")?;
        let metadata = AssistantMetadata::decode(metadata_obj)?;
        obj.finish()?;

        Ok(Self {
            id: common.id,
            parent: common.parent,
            children: common.children,
            create_time: common.create_time.unwrap_or_default(),
            status: common.status,
            end_turn: common.end_turn,
            weight: common.weight,
            recipient: common.recipient,
            channel: common.channel,
            author_metadata: common.author_metadata,
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

impl AssistantMetadata {
    fn decode(mut obj: ObjectReader) -> DecodeResult<Self> {
        let model_slug = take_model_slug(&mut obj, "model_slug")?;
        let message_type = obj.optional_enum("message_type", &["next"])?;
        let timestamp_ = Some(required_timestamp_kind(&mut obj)?);
        let message_locale = obj.optional_string("message_locale")?;
        let default_model_slug = take_model_slug(&mut obj, "default_model_slug")?;
        let pad = obj.optional_string("pad")?;
        let parent_id = obj.optional_string("parent_id")?;
        let request_id = obj.optional_string("request_id")?;
        let gizmo_id = obj.optional_string("gizmo_id")?;
        let voice_mode_message = obj.optional_bool("voice_mode_message")?;
        let requested_model_slug = take_model_slug(&mut obj, "requested_model_slug")?;
        let reasoning_status =
            obj.optional_enum("reasoning_status", &["is_reasoning", "reasoning_ended"])?;
        let finished_duration_sec = obj.optional_i64("finished_duration_sec")?;
        let search_source = obj.optional_enum("search_source", SEARCH_SOURCES)?;
        let client_reported_search_source =
            obj.optional_enum("client_reported_search_source", SEARCH_SOURCES)?;
        let search_display_string = obj.optional_string("search_display_string")?;
        let searched_display_string = obj.optional_string("searched_display_string")?;
        let is_complete = obj.optional_literal_bool("is_complete", true)?;
        let is_visually_hidden_from_conversation =
            obj.optional_literal_bool("is_visually_hidden_from_conversation", true)?;
        let filter_out_for_training = obj.optional_literal_bool("filter_out_for_training", true)?;
        let debug_sonic_thread_id = obj.optional_string("debug_sonic_thread_id")?;
        let augmented_paragen_prompt_label =
            obj.optional_string("augmented_paragen_prompt_label")?;
        let safe_urls = obj.optional_string_array("safe_urls")?;
        let finish_details = match obj.take_present("finish_details") {
            None => None,
            Some((value, path)) => Some(FinishDetails::decode(
                value,
                path,
                &["stop", "interrupted", "max_tokens"],
            )?),
        };
        let citations = decode_optional_vec(&mut obj, "citations", Citation::decode)?;
        let content_references =
            decode_optional_vec(&mut obj, "content_references", ContentReference::decode)?;
        let search_queries = decode_optional_vec(&mut obj, "search_queries", SearchQuery::decode)?;
        let search_result_groups =
            decode_optional_vec(&mut obj, "search_result_groups", SearchResultGroup::decode)?;
        let sonic_classification_result = match obj.optional_object("sonic_classification_result")? {
            None => None,
            Some(inner) => Some(SonicClassificationResult::decode(inner)?),
        };
        let image_results = decode_optional_vec(&mut obj, "image_results", RefImage::decode)?;
        let search_turns_count = obj.optional_i64("search_turns_count")?;
        let is_async_task_result_message = obj.optional_bool("is_async_task_result_message")?;
        let b1de6e2_rm = obj.optional_bool("b1de6e2_rm")?;
        let async_task_id = obj.optional_string("async_task_id")?;
        let async_task_title = obj.optional_string("async_task_title")?;
        let is_loading_message = obj.optional_bool("is_loading_message")?;
        let n7jupd_message = obj.optional_bool("n7jupd_message")?;
        let reasoning_group_id = obj.optional_string("reasoning_group_id")?;
        obj.expect_null("stop_reason")?;
        let n7jupd_subtool = match obj.optional_object("n7jupd_subtool")? {
            None => None,
            Some(inner) => Some(SubTool::decode(inner)?),
        };
        let n7jupd_schedulable = obj.optional_bool("n7jupd_schedulable")?;
        let n7jupd_summary = obj.optional_string("n7jupd_summary")?;
        let n7jupd_crefs = match obj.optional_array("n7jupd_crefs")? {
            None => None,
            Some((items, _)) => Some(items),
        };
        let n7jupd_crefs_by_file = obj.optional_opaque("n7jupd_crefs_by_file");
        let content_references_by_file = match obj.optional_object("content_references_by_file")? {
            None => None,
            Some(mut by_file) => {
                let mut map = std::collections::BTreeMap::new();
                for file in by_file.remaining_keys() {
                    let refs = crate::models::contentref::decode_required_vec(
                        &mut by_file,
                        &file,
                        ContentReference::decode,
                    )?;
                    map.insert(file, refs);
                }
                by_file.finish()?;
                Some(map)
            }
        };
        let is_visually_hidden_reasoning_group =
            obj.optional_bool("is_visually_hidden_reasoning_group")?;
        let canvas = match obj.take_present("canvas") {
            None => None,
            Some((value, path)) => Some(Canvas::decode(value, path)?),
        };
        let safety_plugin_status_code = obj.optional_i64("safety_plugin_status_code")?;
        let model_switcher_deny =
            decode_optional_vec(&mut obj, "model_switcher_deny", ModelSwitcherDeny::decode)?;
        obj.expect_null("message_source")?;
        obj.finish()?;

        Ok(Self {
            model_slug,
            message_type,
            timestamp_,
            message_locale,
            default_model_slug,
            pad,
            parent_id,
            request_id,
            gizmo_id,
            voice_mode_message,
            requested_model_slug,
            reasoning_status,
            finished_duration_sec,
            search_source,
            client_reported_search_source,
            search_display_string,
            searched_display_string,
            is_complete,
            is_visually_hidden_from_conversation,
            filter_out_for_training,
            debug_sonic_thread_id,
            augmented_paragen_prompt_label,
            safe_urls,
            finish_details,
            citations,
            content_references,
            search_queries,
            search_result_groups,
            sonic_classification_result,
            image_results,
            search_turns_count,
            is_async_task_result_message,
            b1de6e2_rm,
            async_task_id,
            async_task_title,
            is_loading_message,
            n7jupd_message,
            reasoning_group_id,
            n7jupd_subtool,
            n7jupd_schedulable,
            n7jupd_summary,
            n7jupd_crefs,
            n7jupd_crefs_by_file,
            content_references_by_file,
            is_visually_hidden_reasoning_group,
            canvas,
            safety_plugin_status_code,
            model_switcher_deny,
        })
    }
}

impl Citation {
    pub fn decode(value: Value, path: FieldPath) -> DecodeResult<Self> {
        let mut obj = ObjectReader::from_value(value, path)?;
        let start_ix = obj.required_i64("start_ix")?;
        let end_ix = obj.required_i64("end_ix")?;
        let citation_format_type =
            obj.optional_enum("citation_format_type", &["tether_og", "tether_v4"])?;
        let invalid_reason = obj.optional_string("invalid_reason")?;
        let metadata = match obj.take_present("metadata") {
            None => None,
            Some((value, path)) => Some(CitationMetadata::decode(value, path)?),
        };
        obj.finish()?;
        Ok(Self {
            start_ix,
            end_ix,
            citation_format_type,
            invalid_reason,
            metadata,
        })
    }
}

impl CitationMetadata {
    pub fn decode(value: Value, path: FieldPath) -> DecodeResult<Self> {
        let mut obj = ObjectReader::from_value(value, path)?;
        let kind = obj.required_enum("type", &["webpage", "file", "image_inline"])?;
        let metadata = match kind.as_str() {
            "webpage" => {
                let title = obj.optional_string("title")?;
                let url = obj.required_string("url")?;
                let text = obj.required_string("text")?;
                let pub_date = obj.optional_string("pub_date")?;
                obj.expect_null("og_tags")?;
                let extra = match obj.optional_object("extra")? {
                    None => None,
                    Some(inner) => Some(CitationExtra::decode(inner)?),
                };
                Self::Webpage {
                    title,
                    url,
                    text,
                    pub_date,
                    extra,
                }
            }
            "file" => {
                let title = obj.optional_string("title")?;
                let url = obj.optional_string("url")?;
                let text = obj.optional_string("text")?;
                obj.expect_null("pub_date")?;
                let name = obj.optional_string("name")?;
                let id = obj.optional_string("id")?;
                let source = obj.optional_string("source")?;
                let extra = obj.optional_opaque("extra");
                Self::File {
                    title,
                    url,
                    text,
                    name,
                    id,
                    source,
                    extra,
                }
            }
            "image_inline" => {
                let asset_pointer_links = obj.required_string_array("asset_pointer_links")?;
                let clicked_from_url = obj.optional_string("clicked_from_url")?;
                let clicked_from_title = obj.optional_string("clicked_from_title")?;
                Self::ImageInline {
                    asset_pointer_links,
                    clicked_from_url,
                    clicked_from_title,
                }
            }
            _ => unreachable!("enum membership checked above"),
        };
        obj.finish()?;
        Ok(metadata)
    }
}

impl CitationExtra {
    fn decode(mut obj: ObjectReader) -> DecodeResult<Self> {
        let evidence_text = obj.optional_string("evidence_text")?;
        let cited_message_idx = obj.required_i64("cited_message_idx")?;
        let search_result_idx = obj.optional_i64("search_result_idx")?;
        obj.expect_null("cloud_doc_url")?;
        let cited_message_id = obj.optional_string("cited_message_id")?;
        let start_line_num = obj.optional_i64("start_line_num")?;
        let end_line_num = obj.optional_i64("end_line_num")?;
        let connector_source = obj.optional_string("connector_source")?;
        obj.finish()?;
        Ok(Self {
            evidence_text,
            cited_message_idx,
            search_result_idx,
            cited_message_id,
            start_line_num,
            end_line_num,
            connector_source,
        })
    }
}

impl SonicClassificationResult {
    fn decode(mut obj: ObjectReader) -> DecodeResult<Self> {
        let latency_ms = obj.optional_f64("latency_ms")?;
        let search_prob = obj.optional_f64("search_prob")?;
        let force_search_threshold = obj.optional_f64("force_search_threshold")?;
        let classifier_config_name =
            obj.optional_enum("classifier_config_name", CLASSIFIER_CONFIG_NAMES)?;
        let complex_search_prob = obj.optional_f64("complex_search_prob")?;
        let search_complexity = obj.optional_enum("search_complexity", &["simple"])?;
        obj.finish()?;
        Ok(Self {
            latency_ms,
            search_prob,
            force_search_threshold,
            classifier_config_name,
            complex_search_prob,
            search_complexity,
        })
    }
}

impl SubTool {
    fn decode(mut obj: ObjectReader) -> DecodeResult<Self> {
        let generic_api_func = obj.optional_string("generic_api_func")?;
        let subtool = obj.optional_string("subtool")?;
        let used_internet = obj.optional_bool("used_internet")?.unwrap_or(false);
        let changed_url = obj.optional_bool("changed_url")?.unwrap_or(false);
        let result_of_subtool = obj.optional_string("result_of_subtool")?;
        obj.finish()?;
        Ok(Self {
            generic_api_func,
            subtool,
            used_internet,
            changed_url,
            result_of_subtool,
        })
    }
}

impl ModelSwitcherDeny {
    pub fn decode(value: Value, path: FieldPath) -> DecodeResult<Self> {
        let mut obj = ObjectReader::from_value(value, path)?;
        let slug_raw = obj.required_string("slug")?;
        let slug = ModelSlug::parse_or_auto(slug_raw, &obj.path().key("slug"))?;
        let context = obj.required_enum("context", &["regenerate", "conversation"])?;
        let reason = obj.required_enum("reason", &["unsupported_canvas"])?;
        let description = obj.required_string("description")?;
        obj.finish()?;
        Ok(Self {
            slug,
            context,
            reason,
            description,
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::models::message::Message;

    use super::*;

    fn base_message() -> Value {
        json!({
            "id": "a1",
            "role": "assistant",
            "parent": "m1",
            "children": [],
            "create_time": 1700000100.0,
            "status": "finished_successfully",
            "end_turn": true,
            "weight": 1.0,
            "recipient": "all",
            "channel": "final",
            "author_metadata": null,
            "content": {"content_type": "text", "parts": ["The answer is 4."]},
            "metadata": {
                "model_slug": "gpt-4o",
                "timestamp_": "absolute",
                "message_type": "next",
                "finish_details": {"type": "stop", "stop_tokens": [200002]},
                "citations": [],
                "request_id": "req-9"
            }
        })
    }

    fn decode_assistant(value: Value) -> DecodeResult<Message> {
        Message::decode(value, FieldPath::root("message"))
    }

    #[test]
    fn decodes_a_finished_answer() {
        let Message::Assistant(message) = decode_assistant(base_message()).unwrap() else {
            panic!("expected assistant message");
        };
        assert_eq!(message.channel, Some(Channel::Final));
        assert_eq!(
            message.metadata.model_slug.as_ref().map(ModelSlug::as_str),
            Some("gpt-4o")
        );
        assert!(matches!(
            message.metadata.finish_details,
            Some(FinishDetails::Stop { .. })
        ));
    }

    #[test]
    fn assistant_text_must_hold_exactly_one_part() {
        let mut raw = base_message();
        raw["content"] = json!({"content_type": "text", "parts": ["a", "b"]});
        let err = decode_assistant(raw).unwrap_err();
        assert!(matches!(err, DecodeError::Normalization { .. }), "{err}");
    }

    #[test]
    fn recipient_may_name_a_known_tool() {
        let mut raw = base_message();
        raw["recipient"] = json!("python");
        raw["content"] = json!({
            "content_type": "code", "language": "unknown",
            "text": "print(2 + 2)", "response_format_name": null
        });
        let Message::Assistant(message) = decode_assistant(raw).unwrap() else {
            panic!("expected assistant message");
        };
        assert_eq!(message.recipient.as_str(), "python");
    }

    #[test]
    fn assistant_code_language_is_a_closed_set() {
        let mut raw = base_message();
        raw["content"] = json!({
            "content_type": "code", "language": "python",
            "text": "print(1)", "response_format_name": null
        });
        let err = decode_assistant(raw).unwrap_err();
        assert!(err.to_string().contains("language"), "{err}");
    }

    #[test]
    fn one_unknown_metadata_key_fails_the_record() {
        let mut raw = base_message();
        raw["metadata"]["brand_new_flag"] = json!(1);
        let err = decode_assistant(raw).unwrap_err();
        assert!(err.to_string().contains("brand_new_flag"), "{err}");
    }

    #[test]
    fn citation_metadata_dispatches_on_type() {
        let webpage = CitationMetadata::decode(
            json!({
                "type": "webpage",
                "title": "Example",
                "url": "https://example.com",
                "text": "quoted text",
                "extra": {"cited_message_idx": 3, "evidence_text": "quoted"}
            }),
            FieldPath::root("citation").key("metadata"),
        )
        .unwrap();
        assert!(matches!(webpage, CitationMetadata::Webpage { .. }));

        let err = CitationMetadata::decode(
            json!({"type": "video", "url": "https://example.com"}),
            FieldPath::root("citation").key("metadata"),
        )
        .unwrap_err();
        assert!(err.to_string().contains("video"), "{err}");
    }

    #[test]
    fn thoughts_content_is_assistant_only_and_decodes() {
        let mut raw = base_message();
        raw["content"] = json!({
            "content_type": "thoughts",
            "thoughts": [{"summary": "Consider parity", "content": "2 + 2 is even."}],
            "source_analysis_msg_id": "am-1"
        });
        let Message::Assistant(message) = decode_assistant(raw).unwrap() else {
            panic!("expected assistant message");
        };
        assert_eq!(message.content.plain_text(), "2 + 2 is even.");
    }
}
