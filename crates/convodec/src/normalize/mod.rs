//! Pre-validation fixups for raw export records.
//!
//! Export shapes drift between vintages: author blocks nest and then
//! flatten, one-element `parts` lists become scalars, absent sub-objects
//! arrive as `{}`. All shape migration lives here, as pure rewrites over
//! `serde_json::Value`, so the variant registries downstream stay plain
//! schema definitions. None of these fixups weaken validation: a shape
//! matching neither the historical nor the canonical form fails loudly.

use serde_json::{Map, Value};

use crate::decode::{FieldPath, render_value};
use crate::error::{DecodeError, DecodeResult};

/// How a `parts` list folds into canonical text. Picked per content
/// variant, never globally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollapsePolicy {
    /// The list must hold exactly one string.
    SingleString,
    /// Any number of string elements, joined with a newline.
    JoinedStrings,
}

/// Recursively replaces every empty object with an explicit null.
///
/// Total and pure: arrays and maps are traversed, scalars pass through.
#[must_use]
pub fn nullify_empty_objects(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            if map.is_empty() {
                Value::Null
            } else {
                Value::Object(
                    map.into_iter()
                        .map(|(key, item)| (key, nullify_empty_objects(item)))
                        .collect(),
                )
            }
        }
        Value::Array(items) => {
            Value::Array(items.into_iter().map(nullify_empty_objects).collect())
        }
        scalar => scalar,
    }
}

/// Folds a historical `parts` list into its canonical scalar text.
///
/// A value that is already a string (a canonical record being re-decoded)
/// passes through unchanged. Anything else signals an unmodeled export
/// shape and fails rather than coercing.
pub fn collapse_parts(value: Value, path: &FieldPath, policy: CollapsePolicy) -> DecodeResult<String> {
    match value {
        Value::String(text) => Ok(text),
        Value::Array(items) => {
            let mut parts = Vec::with_capacity(items.len());
            for (index, item) in items.into_iter().enumerate() {
                match item {
                    Value::String(text) => parts.push(text),
                    other => {
                        return Err(DecodeError::normalization(
                            path.index(index).as_str(),
                            format!("expected string part, found {}", render_value(&other)),
                        ));
                    }
                }
            }
            match policy {
                CollapsePolicy::SingleString => {
                    if parts.len() == 1 {
                        Ok(parts.pop().unwrap_or_default())
                    } else {
                        Err(DecodeError::normalization(
                            path.as_str(),
                            format!(
                                "expected exactly one part in a single-string field, found {}",
                                parts.len()
                            ),
                        ))
                    }
                }
                CollapsePolicy::JoinedStrings => {
                    if parts.is_empty() {
                        Err(DecodeError::normalization(
                            path.as_str(),
                            "expected at least one part in a joined-string field, found none",
                        ))
                    } else {
                        Ok(parts.join("\n"))
                    }
                }
            }
        }
        other => Err(DecodeError::normalization(
            path.as_str(),
            format!(
                "expected string or list of strings, found {}",
                render_value(&other)
            ),
        )),
    }
}

/// Copies `message.author.role` to a flat `message.role`, so role dispatch
/// never re-descends into the author block. A record already carrying a
/// flat role passes through; carrying both with different values fails.
pub fn synthesize_role_field(message: &mut Map<String, Value>, path: &FieldPath) -> DecodeResult<()> {
    let nested_role = message
        .get("author")
        .and_then(|author| author.get("role"))
        .and_then(Value::as_str)
        .map(str::to_owned);

    match (nested_role, message.get("role").and_then(Value::as_str)) {
        (Some(nested), Some(flat)) if nested != flat => Err(DecodeError::normalization(
            path.key("role").as_str(),
            format!("author.role `{nested}` disagrees with flat role `{flat}`"),
        )),
        (Some(nested), None) => {
            message.insert("role".to_string(), Value::String(nested));
            Ok(())
        }
        (_, Some(_)) => Ok(()),
        (None, None) => Err(DecodeError::normalization(
            path.as_str(),
            "message carries neither an author block nor a flat role",
        )),
    }
}

/// Hoists `author.{role,name,metadata}` to flat siblings on the message,
/// removing the author block. Ambiguous double-shape input (a flat field
/// next to a nested author) fails rather than guessing which wins.
pub fn flatten_author(message: &mut Map<String, Value>, path: &FieldPath) -> DecodeResult<()> {
    let Some(author_value) = message.remove("author") else {
        // Already flat; the role must have been synthesized or present.
        if message.contains_key("role") {
            return Ok(());
        }
        return Err(DecodeError::normalization(
            path.as_str(),
            "message carries neither an author block nor a flat role",
        ));
    };

    let author_path = path.key("author");
    let mut author = match author_value {
        Value::Object(map) => map,
        Value::Null => {
            return Err(DecodeError::normalization(
                author_path.as_str(),
                "author block is null",
            ));
        }
        other => {
            return Err(DecodeError::normalization(
                author_path.as_str(),
                format!("author block is not an object: {}", render_value(&other)),
            ));
        }
    };

    for (source, target) in [("role", "role"), ("name", "name"), ("metadata", "author_metadata")] {
        let hoisted = author.remove(source).unwrap_or(Value::Null);
        match message.get(target) {
            // A synthesized flat role equal to the nested one is fine.
            Some(existing) if target == "role" && *existing == hoisted => {}
            Some(_) => {
                return Err(DecodeError::normalization(
                    path.key(target).as_str(),
                    format!("flat `{target}` already present alongside a nested author block"),
                ));
            }
            None => {
                message.insert(target.to_string(), hoisted);
            }
        }
    }

    if !author.is_empty() {
        let mut leftovers: Vec<&str> = author.keys().map(String::as_str).collect();
        leftovers.sort_unstable();
        return Err(DecodeError::normalization(
            author_path.as_str(),
            format!("unexpected attribute(s) in author block: {}", leftovers.join(", ")),
        ));
    }

    Ok(())
}

/// Copies the enclosing node's linkage onto the message when absent, so
/// every canonical message carries `parent` and `children` regardless of
/// export vintage.
pub fn inject_linkage(
    message: &mut Map<String, Value>,
    parent: &str,
    children: &[String],
) {
    message
        .entry("parent")
        .or_insert_with(|| Value::String(parent.to_string()));
    message.entry("children").or_insert_with(|| {
        Value::Array(
            children
                .iter()
                .map(|child| Value::String(child.clone()))
                .collect(),
        )
    });
}
