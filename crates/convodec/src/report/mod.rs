//! Row-oriented reporting over assembled conversations.
//!
//! Flattens canonical trees into message and conversation rows for
//! downstream tabular tooling, plus a batch usage summary priced at
//! API-equivalent rates. Reads only; never mutates a conversation.

use schemars::JsonSchema;
use serde::Serialize;
use serde_json::{Value, json};

use crate::accounting::{PricingModel, TokenCounter, Usage, path_usage};
use crate::models::conversation::Conversation;
use crate::utils::text::derive_excerpt;
use crate::utils::time::format_epoch_seconds;

pub const ROWS_SCHEMA_VERSION: &str = "convodec.rows.v1";

const EXCERPT_MAX_CHARS: usize = 120;

/// One message-bearing node, flattened.
#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct MessageRow {
    pub conversation_id: String,
    pub node_id: String,
    pub parent: String,
    pub children: Vec<String>,
    pub role: String,
    pub content_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub create_time_utc: Option<String>,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_turn: Option<bool>,
    pub weight: f64,
    pub recipient: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_excerpt: Option<String>,
}

/// One conversation, flattened.
#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct ConversationRow {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub create_time_utc: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_time_utc: Option<String>,
    pub node_count: usize,
    pub message_count: usize,
    pub leaf_count: usize,
    pub current_node: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_model_slug: Option<String>,
}

/// Batch usage totals, priced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsageSummary {
    pub conversations: usize,
    pub messages: usize,
    pub paths: usize,
    pub input_tokens: usize,
    pub output_tokens: usize,
    pub total_tokens: usize,
    pub pricing_model: String,
    pub estimated_cost_usd: f64,
}

fn status_key(status: crate::models::message::Status) -> &'static str {
    use crate::models::message::Status;
    match status {
        Status::FinishedSuccessfully => "finished_successfully",
        Status::InProgress => "in_progress",
        Status::FinishedPartialCompletion => "finished_partial_completion",
    }
}

fn channel_key(channel: crate::models::message::Channel) -> &'static str {
    use crate::models::message::Channel;
    match channel {
        Channel::Final => "final",
        Channel::Commentary => "commentary",
    }
}

/// Message rows in canonical order, roots excluded.
#[must_use]
pub fn message_rows(conversations: &[Conversation]) -> Vec<MessageRow> {
    let mut rows = Vec::new();
    for conversation in conversations {
        for node in conversation.canonical_order() {
            let Some(message) = &node.message else {
                continue;
            };
            rows.push(MessageRow {
                conversation_id: conversation.conversation_id.clone(),
                node_id: node.id.clone(),
                parent: message.parent().to_string(),
                children: message.children().to_vec(),
                role: message.role().as_str().to_string(),
                content_type: message.content().tag().to_string(),
                create_time_utc: message.create_time().and_then(format_epoch_seconds),
                status: status_key(message.status()).to_string(),
                end_turn: message.end_turn(),
                weight: message.weight(),
                recipient: message.recipient().as_str().to_string(),
                channel: message.channel().map(|channel| channel_key(channel).to_string()),
                text_excerpt: derive_excerpt(
                    &message.content().plain_text(),
                    EXCERPT_MAX_CHARS,
                ),
            });
        }
    }
    rows
}

#[must_use]
pub fn conversation_rows(conversations: &[Conversation]) -> Vec<ConversationRow> {
    conversations
        .iter()
        .map(|conversation| ConversationRow {
            id: conversation.id.clone(),
            title: conversation.title.clone(),
            create_time_utc: format_epoch_seconds(conversation.create_time),
            update_time_utc: format_epoch_seconds(conversation.update_time),
            node_count: conversation.mapping.len(),
            message_count: conversation.message_count(),
            leaf_count: conversation.root_to_leaf_paths().count(),
            current_node: conversation.current_node.clone(),
            default_model_slug: conversation
                .default_model_slug
                .as_ref()
                .map(|slug| slug.as_str().to_string()),
        })
        .collect()
}

/// Aggregates per-path token usage over the whole batch.
#[must_use]
pub fn usage_summary(
    conversations: &[Conversation],
    counter: &dyn TokenCounter,
    pricing: PricingModel,
) -> UsageSummary {
    let mut totals = Usage::default();
    let mut paths = 0usize;
    let mut messages = 0usize;
    for conversation in conversations {
        messages += conversation.message_count();
        for path in conversation.root_to_leaf_paths() {
            paths += 1;
            totals.accumulate(path_usage(&path, counter));
        }
    }
    UsageSummary {
        conversations: conversations.len(),
        messages,
        paths,
        input_tokens: totals.input_tokens,
        output_tokens: totals.output_tokens,
        total_tokens: totals.total_tokens,
        pricing_model: match pricing {
            PricingModel::Gpt4 => "gpt-4".to_string(),
            PricingModel::Gpt35Turbo => "gpt-3.5-turbo".to_string(),
        },
        estimated_cost_usd: pricing.cost(totals),
    }
}

/// Generated schema document for the row artifacts.
#[must_use]
pub fn rows_schema() -> Value {
    let message_row = schemars::schema_for!(MessageRow);
    let conversation_row = schemars::schema_for!(ConversationRow);
    json!({
        "schema_version": ROWS_SCHEMA_VERSION,
        "message_row": serde_json::to_value(message_row).unwrap_or(Value::Null),
        "conversation_row": serde_json::to_value(conversation_row).unwrap_or(Value::Null),
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::accounting::CharEstimateCounter;
    use crate::models::conversation::decode_conversation;

    use super::*;

    fn fixture() -> Conversation {
        decode_conversation(json!({
            "title": "rows",
            "create_time": 1700000000.0,
            "update_time": 1700000300.0,
            "mapping": {
                "m1": {
                    "id": "m1",
                    "parent": "r",
                    "children": [],
                    "message": {
                        "id": "m1",
                        "author": {"role": "user", "name": null, "metadata": {}},
                        "create_time": 1700000001.0,
                        "update_time": null,
                        "content": {"content_type": "text", "parts": ["what is rust"]},
                        "status": "finished_successfully",
                        "end_turn": null,
                        "weight": 1.0,
                        "metadata": {"timestamp_": "absolute"},
                        "recipient": "all"
                    }
                },
                "r": {"id": "r", "message": null, "parent": null, "children": ["m1"]}
            },
            "moderation_results": [],
            "current_node": "m1",
            "plugin_ids": null,
            "conversation_id": "c-rows",
            "conversation_template_id": null,
            "gizmo_id": null,
            "is_archived": false,
            "safe_urls": [],
            "default_model_slug": "gpt-4",
            "id": "c-rows"
        }))
        .expect("row fixture decodes")
    }

    #[test]
    fn message_rows_follow_canonical_order_and_skip_roots() {
        let conversations = vec![fixture()];
        let rows = message_rows(&conversations);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].node_id, "m1");
        assert_eq!(rows[0].role, "user");
        assert_eq!(rows[0].content_type, "text");
        assert_eq!(rows[0].text_excerpt.as_deref(), Some("what is rust"));
    }

    #[test]
    fn conversation_rows_count_nodes_messages_and_leaves() {
        let conversations = vec![fixture()];
        let rows = conversation_rows(&conversations);
        assert_eq!(rows[0].node_count, 2);
        assert_eq!(rows[0].message_count, 1);
        assert_eq!(rows[0].leaf_count, 1);
        assert_eq!(rows[0].default_model_slug.as_deref(), Some("gpt-4"));
    }

    #[test]
    fn usage_summary_prices_the_batch() {
        let conversations = vec![fixture()];
        let summary = usage_summary(
            &conversations,
            &CharEstimateCounter::default(),
            PricingModel::Gpt4,
        );
        assert_eq!(summary.conversations, 1);
        assert_eq!(summary.messages, 1);
        assert_eq!(summary.paths, 1);
        // "what is rust" is 12 chars -> 3 tokens of user input.
        assert_eq!(summary.input_tokens, 3);
        assert_eq!(summary.output_tokens, 0);
        assert!(summary.estimated_cost_usd > 0.0);
    }

    #[test]
    fn rows_schema_names_both_row_shapes() {
        let schema = rows_schema();
        assert_eq!(schema["schema_version"], json!(ROWS_SCHEMA_VERSION));
        assert!(schema["message_row"].is_object());
        assert!(schema["conversation_row"].is_object());
    }
}
