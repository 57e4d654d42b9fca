//! Tree assembly and deterministic traversal.
//!
//! [`assemble`] enforces the structural invariants once, so every later
//! consumer can traverse without re-checking for dangling references,
//! duplicate parentage or unreachable islands. [`Conversation`] then gains
//! the two read operations downstream consumers depend on: canonical
//! parent-first ordering and root-to-leaf path enumeration.

use indexmap::IndexMap;

use crate::error::{DecodeError, DecodeResult};
use crate::models::conversation::{Conversation, Node};
use crate::models::message::Message;

/// Verifies the tree invariants of a freshly decoded conversation and
/// stamps its root id. Fatal for this conversation only.
pub(crate) fn assemble(mut conversation: Conversation) -> DecodeResult<Conversation> {
    let conversation_id = conversation.conversation_id.clone();
    let mapping = &conversation.mapping;

    let mut roots: Vec<&str> = Vec::new();
    for (key, node) in mapping {
        if *key != node.id {
            return Err(DecodeError::structural(
                conversation_id.as_str(),
                format!("mapping key `{key}` does not match its node id `{}`", node.id),
            ));
        }
        match &node.parent {
            None => {
                roots.push(&node.id);
                if node.message.is_some() {
                    return Err(DecodeError::structural(
                        conversation_id.as_str(),
                        format!("root node `{}` carries a message", node.id),
                    ));
                }
            }
            Some(parent) => {
                if !mapping.contains_key(parent) {
                    return Err(DecodeError::structural(
                        conversation_id.as_str(),
                        format!("node `{}` names missing parent `{parent}`", node.id),
                    ));
                }
                if node.message.is_none() {
                    return Err(DecodeError::structural(
                        conversation_id.as_str(),
                        format!("non-root node `{}` has no message", node.id),
                    ));
                }
            }
        }
        for child_id in &node.children {
            let Some(child) = mapping.get(child_id) else {
                return Err(DecodeError::structural(
                    conversation_id.as_str(),
                    format!("node `{}` lists missing child `{child_id}`", node.id),
                ));
            };
            if child.parent.as_deref() != Some(node.id.as_str()) {
                return Err(DecodeError::structural(
                    conversation_id.as_str(),
                    format!(
                        "child `{child_id}` of node `{}` points back to {}",
                        node.id,
                        match &child.parent {
                            Some(parent) => format!("`{parent}`"),
                            None => "no parent".to_string(),
                        }
                    ),
                ));
            }
        }
    }

    let root_id = match roots.as_slice() {
        [single] => (*single).to_string(),
        [] => {
            return Err(DecodeError::structural(
                conversation_id.as_str(),
                "no root node (every node names a parent)",
            ));
        }
        several => {
            return Err(DecodeError::structural(
                conversation_id.as_str(),
                format!("multiple root nodes: {}", several.join(", ")),
            ));
        }
    };

    if !mapping.contains_key(&conversation.current_node) {
        return Err(DecodeError::structural(
            conversation_id.as_str(),
            format!(
                "current_node `{}` is not in the mapping",
                conversation.current_node
            ),
        ));
    }

    // Bounded traversal: every node reachable from the root exactly once.
    let mut visited: Vec<&str> = Vec::with_capacity(mapping.len());
    let mut seen = std::collections::BTreeSet::new();
    let mut stack: Vec<&str> = vec![&root_id];
    while let Some(id) = stack.pop() {
        if !seen.insert(id) {
            return Err(DecodeError::structural(
                conversation_id.as_str(),
                format!("node `{id}` is reachable via more than one path"),
            ));
        }
        visited.push(id);
        if let Some(node) = mapping.get(id) {
            for child in node.children.iter().rev() {
                stack.push(child);
            }
        }
    }
    if visited.len() != mapping.len() {
        let unreachable: Vec<&str> = mapping
            .keys()
            .map(String::as_str)
            .filter(|id| !seen.contains(id))
            .collect();
        return Err(DecodeError::structural(
            conversation_id.as_str(),
            format!("unreachable node(s): {}", unreachable.join(", ")),
        ));
    }

    conversation.root_id = root_id;
    Ok(conversation)
}

impl Conversation {
    /// Parent-first, depth-first pre-order over the stored child order.
    ///
    /// A pure read: no node is added, removed or mutated, and two calls on
    /// the same conversation yield identical sequences.
    #[must_use]
    pub fn canonical_order(&self) -> Vec<&Node> {
        let mut ordered = Vec::with_capacity(self.mapping.len());
        let mut stack: Vec<&str> = vec![self.root_id.as_str()];
        while let Some(id) = stack.pop() {
            let Some(node) = self.mapping.get(id) else {
                continue;
            };
            ordered.push(node);
            for child in node.children.iter().rev() {
                stack.push(child);
            }
        }
        ordered
    }

    /// Re-keys `mapping` into canonical order: same entries, re-linearized
    /// so serialized output is byte-stable across re-runs.
    pub fn sort_mapping(&mut self) {
        let order: Vec<String> = self
            .canonical_order()
            .iter()
            .map(|node| node.id.clone())
            .collect();
        let mut sorted = IndexMap::with_capacity(order.len());
        for id in order {
            if let Some((key, node)) = self.mapping.swap_remove_entry(&id) {
                sorted.insert(key, node);
            }
        }
        self.mapping = sorted;
    }

    /// Lazily enumerates every root-to-leaf path, excluding the root
    /// marker. One path per leaf, in canonical child order; each call
    /// returns a fresh, independent iterator.
    #[must_use]
    pub fn root_to_leaf_paths(&self) -> RootToLeafPaths<'_> {
        let mut stack = Vec::new();
        if let Some(root) = self.mapping.get(&self.root_id) {
            for child in root.children.iter().rev() {
                stack.push((child.as_str(), 0usize));
            }
        }
        RootToLeafPaths {
            conversation: self,
            stack,
            path: Vec::new(),
        }
    }
}

/// Iterator state for [`Conversation::root_to_leaf_paths`].
pub struct RootToLeafPaths<'a> {
    conversation: &'a Conversation,
    stack: Vec<(&'a str, usize)>,
    path: Vec<&'a Node>,
}

impl<'a> Iterator for RootToLeafPaths<'a> {
    type Item = Vec<&'a Message>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((id, depth)) = self.stack.pop() {
            self.path.truncate(depth);
            let Some(node) = self.conversation.mapping.get(id) else {
                continue;
            };
            self.path.push(node);
            if node.children.is_empty() {
                return Some(
                    self.path
                        .iter()
                        .filter_map(|step| step.message.as_ref())
                        .collect(),
                );
            }
            for child in node.children.iter().rev() {
                self.stack.push((child.as_str(), depth + 1));
            }
        }
        None
    }
}
