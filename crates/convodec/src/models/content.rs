//! Content variant registry.
//!
//! Every message payload carries a `content` object discriminated by its
//! `content_type` tag. The registry is role-agnostic: it validates a
//! payload given its own tag, and the per-role tag subsets (which roles may
//! hold which variants) are enforced by the message registry through the
//! [`ContentPolicy`] it passes in.

use serde::Serialize;
use serde_json::Value;

use crate::decode::{FieldPath, ObjectReader, render_value};
use crate::error::{DecodeError, DecodeResult};
use crate::normalize::{CollapsePolicy, collapse_parts};

/// Every tag the registry knows, across all roles.
pub const CONTENT_TAGS: &[&str] = &[
    "text",
    "code",
    "thoughts",
    "reasoning_recap",
    "multimodal_text",
    "system_error",
    "execution_output",
    "tether_browsing_display",
    "tether_quote",
];

/// Every tag a multimodal part may carry.
pub const PART_TAGS: &[&str] = &[
    "text",
    "image_asset_pointer",
    "audio_transcription",
    "audio_asset_pointer",
    "real_time_user_audio_video_asset_pointer",
];

/// How the `code` variant's `language` field is constrained.
#[derive(Debug, Clone, Copy)]
pub enum CodeLanguageRule {
    Closed(&'static [&'static str]),
    Any,
}

/// Role-specific restrictions threaded into the role-agnostic registry.
#[derive(Debug, Clone, Copy)]
pub struct ContentPolicy {
    pub allowed_tags: &'static [&'static str],
    pub text_collapse: CollapsePolicy,
    pub allowed_parts: &'static [&'static str],
    pub code_language: CodeLanguageRule,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "content_type")]
pub enum Content {
    #[serde(rename = "text")]
    Text(TextContent),
    #[serde(rename = "code")]
    Code(CodeContent),
    #[serde(rename = "thoughts")]
    Thoughts(ThoughtsContent),
    #[serde(rename = "reasoning_recap")]
    ReasoningRecap(ReasoningRecapContent),
    #[serde(rename = "multimodal_text")]
    Multimodal(MultimodalContent),
    #[serde(rename = "system_error")]
    SystemError(SystemErrorContent),
    #[serde(rename = "execution_output")]
    ExecutionOutput(ExecutionOutputContent),
    #[serde(rename = "tether_browsing_display")]
    BrowserDisplay(BrowserDisplayContent),
    #[serde(rename = "tether_quote")]
    BrowserQuote(BrowserQuoteContent),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextContent {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CodeContent {
    pub language: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThoughtsContent {
    pub thoughts: Vec<Thought>,
    pub source_analysis_msg_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Thought {
    pub summary: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReasoningRecapContent {
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MultimodalContent {
    pub parts: Vec<ContentPart>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemErrorContent {
    pub name: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionOutputContent {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BrowserDisplayContent {
    pub result: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BrowserQuoteContent {
    pub url: String,
    pub domain: String,
    pub text: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "content_type")]
pub enum ContentPart {
    #[serde(rename = "text")]
    Text(TextPart),
    #[serde(rename = "image_asset_pointer")]
    Image(ImagePointer),
    #[serde(rename = "audio_transcription")]
    AudioTranscription(AudioTranscription),
    #[serde(rename = "audio_asset_pointer")]
    AudioAsset(AudioAssetPointer),
    #[serde(rename = "real_time_user_audio_video_asset_pointer")]
    RealTimeAudio(RealTimeAudioPointer),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextPart {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImagePointer {
    pub asset_pointer: String,
    pub size_bytes: i64,
    pub width: i64,
    pub height: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fovea: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ImageMetadata>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dalle: Option<DalleMetadata>,
    pub sanitized: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DalleMetadata {
    pub gen_id: String,
    pub prompt: String,
    pub seed: i64,
    pub serialization_title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AudioTranscription {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AudioAssetPointer {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry_datetime: Option<String>,
    pub asset_pointer: String,
    pub size_bytes: i64,
    pub format: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<AudioMetadata>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AudioMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_timestamp: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_timestamp: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcription: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RealTimeAudioPointer {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry_datetime: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frames_asset_pointers: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_container_asset_pointer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_asset_pointer: Option<AudioAssetPointer>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_start_timestamp: Option<f64>,
}

impl Content {
    /// The discriminator tag this variant serializes under.
    #[must_use]
    pub const fn tag(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Code(_) => "code",
            Self::Thoughts(_) => "thoughts",
            Self::ReasoningRecap(_) => "reasoning_recap",
            Self::Multimodal(_) => "multimodal_text",
            Self::SystemError(_) => "system_error",
            Self::ExecutionOutput(_) => "execution_output",
            Self::BrowserDisplay(_) => "tether_browsing_display",
            Self::BrowserQuote(_) => "tether_quote",
        }
    }

    /// Validates a normalized content payload against the variant selected
    /// by its tag, restricted to the tags the caller's role may hold.
    pub fn decode(value: Value, path: FieldPath, policy: &ContentPolicy) -> DecodeResult<Self> {
        let mut obj = ObjectReader::from_value(value, path)?;
        let tag = obj.required_string("content_type")?;

        if !CONTENT_TAGS.contains(&tag.as_str()) {
            return Err(DecodeError::unknown_variant(
                obj.path().as_str(),
                "content",
                tag,
                CONTENT_TAGS,
            ));
        }
        if !policy.allowed_tags.contains(&tag.as_str()) {
            return Err(DecodeError::schema(
                obj.path().as_str(),
                format!(
                    "content type `{tag}` is not legal for this role (legal: {})",
                    policy.allowed_tags.join(", ")
                ),
            ));
        }

        let content = match tag.as_str() {
            "text" => {
                let parts_raw = obj.take_value("parts");
                let text = match parts_raw {
                    Some(raw) => {
                        let parts_path = obj.path().key("parts");
                        collapse_parts(raw, &parts_path, policy.text_collapse)?
                    }
                    None => obj.required_string("text")?,
                };
                Self::Text(TextContent { text })
            }
            "code" => {
                let language = match policy.code_language {
                    CodeLanguageRule::Closed(accepted) => obj.required_enum("language", accepted)?,
                    CodeLanguageRule::Any => obj.required_string("language")?,
                };
                let text = obj.required_string("text")?;
                obj.expect_null("response_format_name")?;
                Self::Code(CodeContent { language, text })
            }
            "thoughts" => {
                let (items, items_path) = obj.required_array("thoughts")?;
                let thoughts = items
                    .into_iter()
                    .enumerate()
                    .map(|(index, item)| decode_thought(item, items_path.index(index)))
                    .collect::<DecodeResult<Vec<Thought>>>()?;
                let source_analysis_msg_id = obj.required_string("source_analysis_msg_id")?;
                Self::Thoughts(ThoughtsContent {
                    thoughts,
                    source_analysis_msg_id,
                })
            }
            "reasoning_recap" => Self::ReasoningRecap(ReasoningRecapContent {
                content: obj.required_string("content")?,
            }),
            "multimodal_text" => {
                let (items, items_path) = obj.required_array("parts")?;
                let parts = items
                    .into_iter()
                    .enumerate()
                    .map(|(index, item)| {
                        ContentPart::decode(item, items_path.index(index), policy.allowed_parts)
                    })
                    .collect::<DecodeResult<Vec<ContentPart>>>()?;
                Self::Multimodal(MultimodalContent { parts })
            }
            "system_error" => Self::SystemError(SystemErrorContent {
                name: obj.required_string("name")?,
                text: obj.required_string("text")?,
            }),
            "execution_output" => Self::ExecutionOutput(ExecutionOutputContent {
                text: obj.required_string("text")?,
            }),
            "tether_browsing_display" => {
                let result = obj.required_string("result")?;
                let summary = obj.optional_string("summary")?;
                expect_empty_list(&mut obj, "assets")?;
                obj.expect_null("tether_id")?;
                Self::BrowserDisplay(BrowserDisplayContent { result, summary })
            }
            "tether_quote" => {
                let url = obj.required_string("url")?;
                let domain = obj.required_string("domain")?;
                let text = obj.required_string("text")?;
                let title = obj.required_string("title")?;
                obj.expect_null("tether_id")?;
                Self::BrowserQuote(BrowserQuoteContent {
                    url,
                    domain,
                    text,
                    title,
                })
            }
            _ => unreachable!("tag membership checked above"),
        };

        obj.finish()?;
        Ok(content)
    }

    /// Flattens this content to the text a token counter sees.
    ///
    /// Image and audio-pointer parts contribute nothing; multimodal text
    /// parts join with a single space.
    #[must_use]
    pub fn plain_text(&self) -> String {
        match self {
            Self::Text(content) => content.text.clone(),
            Self::Code(content) => content.text.clone(),
            Self::Thoughts(content) => content
                .thoughts
                .iter()
                .map(|thought| thought.content.as_str())
                .collect::<Vec<&str>>()
                .join("\n"),
            Self::ReasoningRecap(content) => content.content.clone(),
            Self::Multimodal(content) => content
                .parts
                .iter()
                .filter_map(|part| match part {
                    ContentPart::Text(text) => Some(text.text.as_str()),
                    _ => None,
                })
                .collect::<Vec<&str>>()
                .join(" "),
            Self::SystemError(content) => content.text.clone(),
            Self::ExecutionOutput(content) => content.text.clone(),
            Self::BrowserDisplay(content) => content.result.clone(),
            Self::BrowserQuote(content) => content.text.clone(),
        }
    }
}

impl ContentPart {
    /// Decodes one multimodal part. A bare string is the historical shape
    /// of a text part and normalizes into one before validation.
    pub fn decode(
        value: Value,
        path: FieldPath,
        allowed: &'static [&'static str],
    ) -> DecodeResult<Self> {
        if let Value::String(text) = value {
            if !allowed.contains(&"text") {
                return Err(DecodeError::schema(
                    path.as_str(),
                    "text parts are not legal for this role",
                ));
            }
            return Ok(Self::Text(TextPart { text }));
        }

        let mut obj = ObjectReader::from_value(value, path)?;
        let tag = obj.required_string("content_type")?;

        if !PART_TAGS.contains(&tag.as_str()) {
            return Err(DecodeError::unknown_variant(
                obj.path().as_str(),
                "content part",
                tag,
                PART_TAGS,
            ));
        }
        if !allowed.contains(&tag.as_str()) {
            return Err(DecodeError::schema(
                obj.path().as_str(),
                format!(
                    "part type `{tag}` is not legal for this role (legal: {})",
                    allowed.join(", ")
                ),
            ));
        }

        let part = match tag.as_str() {
            "text" => Self::Text(TextPart {
                text: obj.required_string("text")?,
            }),
            "image_asset_pointer" => Self::Image(decode_image_pointer(&mut obj)?),
            "audio_transcription" => {
                let text = obj.required_string("text")?;
                let direction = obj.optional_enum("direction", &["out"])?;
                obj.expect_null("decoding_id")?;
                Self::AudioTranscription(AudioTranscription { text, direction })
            }
            "audio_asset_pointer" => Self::AudioAsset(decode_audio_asset(&mut obj)?),
            "real_time_user_audio_video_asset_pointer" => {
                let expiry_datetime = obj.optional_string("expiry_datetime")?;
                let frames_asset_pointers = obj.optional_string_array("frames_asset_pointers")?;
                let video_container_asset_pointer =
                    obj.optional_string("video_container_asset_pointer")?;
                let audio_asset_pointer = match obj.optional_object("audio_asset_pointer")? {
                    None => None,
                    Some(mut inner) => {
                        inner.literal_str("content_type", "audio_asset_pointer")?;
                        let pointer = decode_audio_asset(&mut inner)?;
                        inner.finish()?;
                        Some(pointer)
                    }
                };
                let audio_start_timestamp = obj.optional_f64("audio_start_timestamp")?;
                Self::RealTimeAudio(RealTimeAudioPointer {
                    expiry_datetime,
                    frames_asset_pointers,
                    video_container_asset_pointer,
                    audio_asset_pointer,
                    audio_start_timestamp,
                })
            }
            _ => unreachable!("tag membership checked above"),
        };

        obj.finish()?;
        Ok(part)
    }
}

fn decode_thought(value: Value, path: FieldPath) -> DecodeResult<Thought> {
    let mut obj = ObjectReader::from_value(value, path)?;
    let summary = obj.required_string("summary")?;
    let content = obj.required_string("content")?;
    obj.finish()?;
    Ok(Thought { summary, content })
}

fn decode_image_pointer(obj: &mut ObjectReader) -> DecodeResult<ImagePointer> {
    let asset_pointer = obj.required_string("asset_pointer")?;
    let size_bytes = obj.required_i64("size_bytes")?;
    let width = obj.required_i64("width")?;
    let height = obj.required_i64("height")?;
    let fovea = obj.optional_i64("fovea")?;
    let metadata = match obj.optional_object("metadata")? {
        None => None,
        Some(mut inner) => {
            let dalle = match inner.optional_object("dalle")? {
                None => None,
                Some(mut dalle) => {
                    let gen_id = dalle.required_string("gen_id")?;
                    let prompt = dalle.required_string("prompt")?;
                    let seed = dalle.required_i64("seed")?;
                    dalle.expect_null("parent_gen_id")?;
                    dalle.expect_null("edit_op")?;
                    let serialization_title = dalle.required_string("serialization_title")?;
                    dalle.finish()?;
                    Some(DalleMetadata {
                        gen_id,
                        prompt,
                        seed,
                        serialization_title,
                    })
                }
            };
            inner.expect_null("gizmo")?;
            inner.expect_null("generation")?;
            inner.expect_null("container_pixel_height")?;
            inner.expect_null("container_pixel_width")?;
            inner.expect_null("emu_omit_glimpse_image")?;
            inner.expect_null("emu_patches_override")?;
            let sanitized = inner.required_bool("sanitized")?;
            inner.expect_null("asset_pointer_link")?;
            inner.expect_null("watermarked_asset_pointer")?;
            inner.finish()?;
            Some(ImageMetadata { dalle, sanitized })
        }
    };
    Ok(ImagePointer {
        asset_pointer,
        size_bytes,
        width,
        height,
        fovea,
        metadata,
    })
}

fn decode_audio_asset(obj: &mut ObjectReader) -> DecodeResult<AudioAssetPointer> {
    let expiry_datetime = obj.optional_string("expiry_datetime")?;
    let asset_pointer = obj.required_string("asset_pointer")?;
    let size_bytes = obj.required_i64("size_bytes")?;
    let format = obj.required_enum("format", &["wav"])?;
    let metadata = match obj.optional_object("metadata")? {
        None => None,
        Some(mut inner) => {
            let start_timestamp = inner.optional_f64("start_timestamp")?;
            let end_timestamp = inner.optional_f64("end_timestamp")?;
            inner.expect_null("pretokenized_vq")?;
            inner.expect_null("interruptions")?;
            inner.expect_null("original_audio_source")?;
            let transcription = inner.optional_string("transcription")?;
            inner.expect_null_list("word_transcription")?;
            let start = inner.optional_f64("start")?;
            let end = inner.optional_f64("end")?;
            inner.finish()?;
            Some(AudioMetadata {
                start_timestamp,
                end_timestamp,
                transcription,
                start,
                end,
            })
        }
    };
    Ok(AudioAssetPointer {
        expiry_datetime,
        asset_pointer,
        size_bytes,
        format,
        metadata,
    })
}

fn expect_empty_list(obj: &mut ObjectReader, key: &str) -> DecodeResult<()> {
    match obj.take_value(key) {
        None | Some(Value::Null) => Ok(()),
        Some(Value::Array(items)) if items.is_empty() => Ok(()),
        Some(other) => Err(DecodeError::schema(
            obj.path().key(key).as_str(),
            format!("expected empty list or null, found {}", render_value(&other)),
        )),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    const TEST_POLICY: ContentPolicy = ContentPolicy {
        allowed_tags: &["text", "code", "multimodal_text"],
        text_collapse: CollapsePolicy::SingleString,
        allowed_parts: &["text", "image_asset_pointer"],
        code_language: CodeLanguageRule::Any,
    };

    fn root() -> FieldPath {
        FieldPath::root("content")
    }

    #[test]
    fn text_collapses_single_part_lists() {
        let content = Content::decode(
            json!({"content_type": "text", "parts": ["hi"]}),
            root(),
            &TEST_POLICY,
        )
        .unwrap();
        assert_eq!(content, Content::Text(TextContent { text: "hi".into() }));
    }

    #[test]
    fn text_accepts_canonical_scalar_form() {
        let content = Content::decode(
            json!({"content_type": "text", "text": "hi"}),
            root(),
            &TEST_POLICY,
        )
        .unwrap();
        assert_eq!(content.plain_text(), "hi");
    }

    #[test]
    fn unknown_tag_reports_accepted_set() {
        let err = Content::decode(
            json!({"content_type": "hologram", "text": "hi"}),
            root(),
            &TEST_POLICY,
        )
        .unwrap_err();
        match err {
            DecodeError::UnknownVariant { family, tag, .. } => {
                assert_eq!(family, "content");
                assert_eq!(tag, "hologram");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn known_but_illegal_tag_for_role_is_a_schema_mismatch() {
        let err = Content::decode(
            json!({"content_type": "execution_output", "text": "ok"}),
            root(),
            &TEST_POLICY,
        )
        .unwrap_err();
        assert!(matches!(err, DecodeError::SchemaMismatch { .. }), "{err}");
        assert!(err.to_string().contains("not legal for this role"), "{err}");
    }

    #[test]
    fn undeclared_attribute_in_content_is_rejected() {
        let err = Content::decode(
            json!({"content_type": "text", "parts": ["hi"], "surprise": 1}),
            root(),
            &TEST_POLICY,
        )
        .unwrap_err();
        assert!(err.to_string().contains("surprise"), "{err}");
    }

    #[test]
    fn multimodal_preserves_part_order_and_normalizes_bare_strings() {
        let content = Content::decode(
            json!({
                "content_type": "multimodal_text",
                "parts": [
                    "before",
                    {
                        "content_type": "image_asset_pointer",
                        "asset_pointer": "file-service://file-abc",
                        "size_bytes": 1024,
                        "width": 512,
                        "height": 512
                    },
                    {"content_type": "text", "text": "after"}
                ]
            }),
            root(),
            &TEST_POLICY,
        )
        .unwrap();
        let Content::Multimodal(multimodal) = &content else {
            panic!("expected multimodal content");
        };
        assert_eq!(multimodal.parts.len(), 3);
        assert!(matches!(multimodal.parts[0], ContentPart::Text(_)));
        assert!(matches!(multimodal.parts[1], ContentPart::Image(_)));
        assert_eq!(content.plain_text(), "before after");
    }

    #[test]
    fn part_errors_carry_the_full_indexed_path() {
        let err = Content::decode(
            json!({
                "content_type": "multimodal_text",
                "parts": [{
                    "content_type": "image_asset_pointer",
                    "asset_pointer": "file-service://file-abc",
                    "size_bytes": "1024",
                    "width": 512,
                    "height": 512
                }]
            }),
            root(),
            &TEST_POLICY,
        )
        .unwrap_err();
        assert!(
            err.to_string().contains("content.parts[0].size_bytes"),
            "{err}"
        );
    }

    #[test]
    fn audio_parts_are_rejected_where_only_images_are_legal() {
        let err = Content::decode(
            json!({
                "content_type": "multimodal_text",
                "parts": [{"content_type": "audio_transcription", "text": "hi"}]
            }),
            root(),
            &TEST_POLICY,
        )
        .unwrap_err();
        assert!(err.to_string().contains("not legal for this role"), "{err}");
    }

    #[test]
    fn code_requires_null_response_format_name() {
        let ok = Content::decode(
            json!({"content_type": "code", "language": "python", "text": "print(1)",
                   "response_format_name": null}),
            root(),
            &TEST_POLICY,
        );
        assert!(ok.is_ok());
        let err = Content::decode(
            json!({"content_type": "code", "language": "python", "text": "print(1)",
                   "response_format_name": "json_object"}),
            root(),
            &TEST_POLICY,
        )
        .unwrap_err();
        assert!(err.to_string().contains("response_format_name"), "{err}");
    }

    #[test]
    fn canonical_serialization_is_tagged() {
        let content = Content::Code(CodeContent {
            language: "python".into(),
            text: "print(1)".into(),
        });
        assert_eq!(
            serde_json::to_value(&content).unwrap(),
            json!({"content_type": "code", "language": "python", "text": "print(1)"})
        );
    }
}
