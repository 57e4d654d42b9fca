//! Batch-wide identifier shortening.
//!
//! Long hyphenated-hex identifiers appear as conversation ids, node ids,
//! mapping keys and inside reference fields, and are referenced across
//! conversation boundaries. Shortening therefore walks the whole batch,
//! rewriting every matching string (keys included) to its fixed-length
//! suffix, and verifies afterwards that the rewrite was injective: two
//! distinct identifiers sharing a suffix would silently merge entities,
//! so a collision fails the entire batch before any output is written.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

use crate::error::{DecodeError, DecodeResult};

/// Suffix length kept from a 36-character identifier.
pub const SHORT_ID_LEN: usize = 21;

fn lower_uuid_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"^[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}$")
            .unwrap_or_else(|error| panic!("invalid lower uuid pattern: {error}"))
    })
}

fn upper_uuid_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"^[0-9A-F]{8}-[0-9A-F]{4}-[0-9A-F]{4}-[0-9A-F]{4}-[0-9A-F]{12}$")
            .unwrap_or_else(|error| panic!("invalid upper uuid pattern: {error}"))
    })
}

/// True for strings in the canonical unique-identifier format, uniformly
/// lower- or upper-case.
#[must_use]
pub fn is_long_identifier(text: &str) -> bool {
    lower_uuid_regex().is_match(text) || upper_uuid_regex().is_match(text)
}

/// Tracking state for one batch run. Never global: a fresh context per
/// batch keeps unrelated runs from cross-contaminating.
#[derive(Debug, Default)]
pub struct ShortenContext {
    originals: BTreeSet<String>,
    by_suffix: BTreeMap<String, String>,
    collision: Option<(String, String, String)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShortenStats {
    pub identifiers_seen: usize,
    pub suffixes_produced: usize,
}

impl ShortenContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn shorten_identifier(&mut self, identifier: &str) -> String {
        let suffix: String = identifier
            .chars()
            .skip(identifier.chars().count().saturating_sub(SHORT_ID_LEN))
            .collect();
        self.originals.insert(identifier.to_string());
        match self.by_suffix.get(&suffix) {
            Some(existing) if existing != identifier && self.collision.is_none() => {
                self.collision = Some((existing.clone(), identifier.to_string(), suffix.clone()));
            }
            Some(_) => {}
            None => {
                self.by_suffix.insert(suffix.clone(), identifier.to_string());
            }
        }
        suffix
    }

    /// Recursively rewrites every matching string in one value, keys
    /// included.
    #[must_use]
    pub fn shorten_value(&mut self, value: Value) -> Value {
        match value {
            Value::Object(map) => Value::Object(
                map.into_iter()
                    .map(|(key, item)| {
                        let key = if is_long_identifier(&key) {
                            self.shorten_identifier(&key)
                        } else {
                            key
                        };
                        (key, self.shorten_value(item))
                    })
                    .collect(),
            ),
            Value::Array(items) => Value::Array(
                items
                    .into_iter()
                    .map(|item| self.shorten_value(item))
                    .collect(),
            ),
            Value::String(text) => {
                if is_long_identifier(&text) {
                    Value::String(self.shorten_identifier(&text))
                } else {
                    Value::String(text)
                }
            }
            scalar => scalar,
        }
    }

    /// Verifies the rewrite was injective over the whole batch.
    pub fn finish(self) -> DecodeResult<ShortenStats> {
        if let Some((original_a, original_b, suffix)) = self.collision {
            return Err(DecodeError::Collision {
                original_a,
                original_b,
                suffix,
                originals: self.originals.len(),
                shortened: self.by_suffix.len(),
            });
        }
        let stats = ShortenStats {
            identifiers_seen: self.originals.len(),
            suffixes_produced: self.by_suffix.len(),
        };
        debug_assert_eq!(stats.identifiers_seen, stats.suffixes_produced);
        Ok(stats)
    }
}

/// Shortens every identifier across a batch of raw records, failing the
/// whole batch on a suffix collision.
pub fn shorten_batch(raws: Vec<Value>) -> DecodeResult<(Vec<Value>, ShortenStats)> {
    let mut context = ShortenContext::new();
    let shortened: Vec<Value> = raws
        .into_iter()
        .map(|raw| context.shorten_value(raw))
        .collect();
    let stats = context.finish()?;
    Ok((shortened, stats))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    const ID_A: &str = "0f7a9e7e-9d4e-4c67-9a3a-1f2e3d4c5b6a";
    const ID_B: &str = "9b1deb4d-3b7d-4bad-9bdd-2b0d7b3dcb6d";

    #[test]
    fn shortens_values_and_keys_to_the_suffix() {
        let raw = json!({
            ID_A: {"id": ID_A, "parent": null, "note": "not-a-uuid"},
            "list": [ID_B, "plain"]
        });
        let (shortened, stats) = shorten_batch(vec![raw]).unwrap();
        let suffix_a = &ID_A[ID_A.len() - SHORT_ID_LEN..];
        let suffix_b = &ID_B[ID_B.len() - SHORT_ID_LEN..];
        assert_eq!(shortened[0]["list"][0], json!(suffix_b));
        assert_eq!(shortened[0][suffix_a]["id"], json!(suffix_a));
        assert_eq!(shortened[0][suffix_a]["note"], json!("not-a-uuid"));
        assert_eq!(stats.identifiers_seen, 2);
        assert_eq!(stats.suffixes_produced, 2);
    }

    #[test]
    fn shortening_is_deterministic_per_identifier() {
        let mut context = ShortenContext::new();
        let first = context.shorten_value(json!(ID_A));
        let second = context.shorten_value(json!(ID_A));
        assert_eq!(first, second);
        let stats = context.finish().unwrap();
        assert_eq!(stats.identifiers_seen, 1);
    }

    #[test]
    fn mixed_case_identifiers_are_left_alone() {
        let mixed = "0F7a9e7e-9d4e-4c67-9a3a-1f2e3d4c5b6a";
        let mut context = ShortenContext::new();
        assert_eq!(context.shorten_value(json!(mixed)), json!(mixed));
        assert_eq!(context.finish().unwrap().identifiers_seen, 0);
    }

    #[test]
    fn uppercase_identifiers_match() {
        let upper = ID_A.to_uppercase();
        let mut context = ShortenContext::new();
        let shortened = context.shorten_value(json!(upper.clone()));
        assert_eq!(shortened, json!(upper[upper.len() - SHORT_ID_LEN..]));
    }

    #[test]
    fn colliding_suffixes_fail_the_whole_batch() {
        // Distinct in the head, identical in the last 21 characters.
        let suffix = &ID_A[ID_A.len() - SHORT_ID_LEN..];
        let collide_a = format!("aaaaaaaa-aaaa-4{suffix}");
        let collide_b = format!("bbbbbbbb-bbbb-4{suffix}");
        assert!(is_long_identifier(&collide_a) && is_long_identifier(&collide_b));

        let err =
            shorten_batch(vec![json!({"x": collide_a}), json!({"y": collide_b})]).unwrap_err();
        assert!(err.is_batch_fatal());
        let text = err.to_string();
        assert!(text.contains("collision"), "{text}");
        assert!(text.contains(&collide_a) && text.contains(&collide_b), "{text}");
    }

    #[test]
    fn context_state_does_not_leak_across_batches() {
        let (_, first) = shorten_batch(vec![json!(ID_A)]).unwrap();
        let (_, second) = shorten_batch(vec![json!(ID_B)]).unwrap();
        assert_eq!(first.identifiers_seen, 1);
        assert_eq!(second.identifiers_seen, 1);
    }
}
