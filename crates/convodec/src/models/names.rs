//! Closed name sets carried by the export.
//!
//! These tables are the schema-drift tripwire for names: when the upstream
//! service ships a new model slug or tool, decoding fails on the unlisted
//! literal and the table gets extended deliberately.

use serde::Serialize;

use crate::decode::FieldPath;
use crate::error::{DecodeError, DecodeResult};

pub const MODEL_SLUGS: &[&str] = &[
    "gpt-4",
    "gpt-4-1",
    "gpt-4-5",
    "gpt-4-all-tools-hogwild-topk",
    "gpt-4-browsing",
    "gpt-4-code-interpreter",
    "gpt-4-dalle",
    "gpt-4-gizmo",
    "gpt-4-mobile",
    "gpt-4-plugins",
    "gpt-4o",
    "gpt-4o-canmore",
    "gpt-4o-mini",
    "gpt-4o-jawbone",
    "gpt-5",
    "gpt-5-thinking",
    "o1",
    "o1-mini",
    "o1-preview",
    "o3",
    "o3-mini",
    "o3-mini-high",
    "o4-mini",
    "o4-mini-high",
    "text-davinci-002-plugins",
    "text-davinci-002-render",
    "text-davinci-002-render-sha",
    "text-davinci-002-render-sha-mobile",
    "research",
];

pub const DEFAULT_TOOL_NAMES: &[&str] = &[
    "python",
    "browser",
    "bio",
    "web",
    "web.run",
    "dalle.text2im",
    "myfiles_browser",
    "research_kickoff_tool.start_research_task",
    "research_kickoff_tool.clarify_with_text",
    "browser.open",
    "n7jupd.metadata",
    "computer.sync_file",
    "container.exec",
    "computer.initialize",
    "browser.find",
    "browser.search",
    "image_gen",
    "image_gen.edit_image",
    "web.search",
    "canmore.update_textdoc",
    "canmore.comment_textdoc",
    "file_search",
    "computer.do",
    "computer.get",
];

pub const PLUGIN_NAMES: &[&str] = &[
    "AskTheCode.GetRepositoryStructure",
    "a8km123",
    "canmore.create_textdoc",
    "whimsical_com__jit_plugin.postRenderSequenceDiagram",
    "whimsical_com__jit_plugin.postRenderMindmap",
    "spotify_playlistai_app__jit_plugin.createPost",
    "api_spotify_com__jit_plugin.createPlaylist",
    "chat_consensus_app__jit_plugin.search_papers",
    "BrowserPilot.transcodeWebPage",
    "Wolfram.getWolframAlphaResults",
    "expedia.lodgingProducts",
    "t2uay3k.sj1i4kz",
];

fn unlisted(path: &FieldPath, kind: &str, value: &str) -> DecodeError {
    DecodeError::schema(
        path.as_str(),
        format!("`{value}` is not a known {kind}; extend the name table if the export added one"),
    )
}

/// A model slug validated against [`MODEL_SLUGS`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ModelSlug(String);

impl ModelSlug {
    pub fn parse(raw: String, path: &FieldPath) -> DecodeResult<Self> {
        if MODEL_SLUGS.contains(&raw.as_str()) {
            Ok(Self(raw))
        } else {
            Err(unlisted(path, "model slug", &raw))
        }
    }

    /// Accepts the sentinel `auto` alongside real slugs (used by the
    /// model-switcher denial records).
    pub fn parse_or_auto(raw: String, path: &FieldPath) -> DecodeResult<Self> {
        if raw == "auto" || MODEL_SLUGS.contains(&raw.as_str()) {
            Ok(Self(raw))
        } else {
            Err(unlisted(path, "model slug", &raw))
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A default tool or plugin name validated against the union of
/// [`DEFAULT_TOOL_NAMES`] and [`PLUGIN_NAMES`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ToolName(String);

impl ToolName {
    pub fn parse(raw: String, path: &FieldPath) -> DecodeResult<Self> {
        if DEFAULT_TOOL_NAMES.contains(&raw.as_str()) || PLUGIN_NAMES.contains(&raw.as_str()) {
            Ok(Self(raw))
        } else {
            Err(unlisted(path, "tool or plugin name", &raw))
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}
