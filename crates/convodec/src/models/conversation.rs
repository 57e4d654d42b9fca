//! One exported conversation: scalar provenance fields plus the node
//! mapping that the tree engine assembles and verifies.

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

use crate::decode::{FieldPath, ObjectReader, object_value};
use crate::error::{DecodeError, DecodeResult};
use crate::models::message::Message;
use crate::models::names::ModelSlug;
use crate::normalize::{flatten_author, inject_linkage, nullify_empty_objects, synthesize_role_field};

/// A vertex in the conversation tree: the root marker or a message holder.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    pub id: String,
    pub parent: Option<String>,
    pub children: Vec<String>,
    pub message: Option<Message>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Conversation {
    pub title: String,
    pub create_time: f64,
    pub update_time: f64,
    pub mapping: IndexMap<String, Node>,
    pub moderation_results: Vec<()>,
    pub current_node: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plugin_ids: Option<Vec<String>>,
    pub conversation_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_template_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gizmo_id: Option<String>,
    pub is_archived: bool,
    pub safe_urls: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_model_slug: Option<ModelSlug>,
    pub id: String,
    /// Verified at assembly; not part of the serialized form.
    #[serde(skip)]
    pub(crate) root_id: String,
}

impl Conversation {
    /// Identifier of the single parentless node.
    #[must_use]
    pub fn root_id(&self) -> &str {
        &self.root_id
    }

    /// Count of message-bearing nodes (everything but the root marker).
    #[must_use]
    pub fn message_count(&self) -> usize {
        self.mapping
            .values()
            .filter(|node| node.message.is_some())
            .count()
    }
}

/// Decodes, normalizes and assembles one raw conversation record.
///
/// The record is rewritten by the normalizer, validated strictly against
/// the variant registries, and the resulting tree's invariants are
/// verified before the conversation is returned.
pub fn decode_conversation(raw: Value) -> DecodeResult<Conversation> {
    let raw = nullify_empty_objects(raw);
    let label = raw
        .get("conversation_id")
        .or_else(|| raw.get("id"))
        .and_then(Value::as_str)
        .unwrap_or("?")
        .to_string();
    let path = FieldPath::root(format!("conversation[\"{label}\"]"));
    let mut obj = ObjectReader::from_value(raw, path)?;

    let title = obj.required_string("title")?;
    let create_time = obj.required_f64("create_time")?;
    let update_time = obj.required_f64("update_time")?;

    let mapping_path = obj.path().key("mapping");
    let mapping_raw = match obj.take_value("mapping") {
        None | Some(Value::Null) => {
            return Err(DecodeError::schema(
                mapping_path.as_str(),
                "required attribute is missing",
            ));
        }
        Some(value) => object_value(value, &mapping_path)?,
    };
    let mut mapping = IndexMap::with_capacity(mapping_raw.len());
    for (key, node_raw) in mapping_raw {
        let node_path = mapping_path.entry(&key);
        let node = decode_node(node_raw, node_path)?;
        mapping.insert(key, node);
    }

    obj.expect_null_list("moderation_results")?;
    let moderation_results = Vec::new();
    let current_node = obj.required_string("current_node")?;
    let plugin_ids = obj.optional_string_array("plugin_ids")?;
    let conversation_id = obj.required_string("conversation_id")?;
    let conversation_template_id = obj.optional_string("conversation_template_id")?;
    let gizmo_id = obj.optional_string("gizmo_id")?;
    let is_archived = obj.literal_bool("is_archived", false)?;
    let safe_urls = obj.required_string_array("safe_urls")?;
    let default_model_slug = match obj.optional_string("default_model_slug")? {
        None => None,
        Some(raw_slug) => {
            Some(ModelSlug::parse(raw_slug, &obj.path().key("default_model_slug"))?)
        }
    };
    let id = obj.required_string("id")?;
    obj.finish()?;

    let conversation = Conversation {
        title,
        create_time,
        update_time,
        mapping,
        moderation_results,
        current_node,
        plugin_ids,
        conversation_id,
        conversation_template_id,
        gizmo_id,
        is_archived,
        safe_urls,
        default_model_slug,
        id,
        root_id: String::new(),
    };
    crate::tree::assemble(conversation)
}

fn decode_node(raw: Value, path: FieldPath) -> DecodeResult<Node> {
    let mut obj = ObjectReader::from_value(raw, path)?;
    let id = obj.required_string("id")?;
    let parent = obj.optional_string("parent")?;
    let children = obj.required_string_array("children")?;

    let message = match obj.take_value("message") {
        None | Some(Value::Null) => None,
        Some(value) => {
            let message_path = obj.path().key("message");
            let mut map = object_value(value, &message_path)?;
            synthesize_role_field(&mut map, &message_path)?;
            flatten_author(&mut map, &message_path)?;
            if let Some(parent_id) = parent.as_deref() {
                inject_linkage(&mut map, parent_id, &children);
            }
            Some(Message::decode(Value::Object(map), message_path)?)
        }
    };
    obj.finish()?;

    Ok(Node {
        id,
        parent,
        children,
        message,
    })
}

/// Decodes a whole export batch, one result per record.
///
/// Record-scoped failures stay attached to their record; the caller
/// decides whether to skip or abort.
#[must_use]
pub fn decode_batch(raws: Vec<Value>) -> Vec<DecodeResult<Conversation>> {
    raws.into_iter().map(decode_conversation).collect()
}
