//! Reference shapes embedded in assistant and tool metadata: content
//! references attached to browsed answers, search queries and result
//! groups, and the indexed refs they point through.

use serde::Serialize;
use serde_json::Value;

use crate::decode::{FieldPath, ObjectReader, render_value};
use crate::error::{DecodeError, DecodeResult};

pub const CONTENT_REFERENCE_TYPES: &[&str] = &[
    "webpage",
    "webpage_extended",
    "nav_list",
    "navigation",
    "grouped_webpages",
    "sources_footnote",
    "hidden",
    "image_v2",
    "attribution",
    "grouped_webpages_model_predicted_fallback",
    "tldr",
];

pub const NAMED_REFS: &[&str] = &["malformed", "hidden", "optimistic_image"];

pub const REF_TYPES: &[&str] = &["search", "image", "view", "news", "fetch"];

/// An indexed pointer into a prior search/browse turn.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ref {
    pub ref_type: String,
    pub turn_index: i64,
    pub ref_index: i64,
}

/// `refs` entries are either well-known sentinel names or indexed refs.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RefEntry {
    Named(String),
    Indexed(Ref),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RefSize {
    pub width: i64,
    pub height: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RefImage {
    pub url: String,
    pub content_url: String,
    pub thumbnail_url: String,
    pub title: String,
    pub content_size: RefSize,
    pub thumbnail_size: RefSize,
    pub attribution: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RefDomain {
    pub title: String,
    pub subtitle: String,
    pub domain: String,
    pub url: String,
    pub attribution: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RefSource {
    pub title: String,
    pub url: String,
    pub attribution: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SupportingWebsite {
    pub title: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pub_date: Option<f64>,
    pub attribution: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RefItem {
    pub title: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pub_date: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribution: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribution_segments: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supporting_websites: Option<Vec<SupportingWebsite>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refs: Option<Vec<Ref>>,
}

/// One annotation anchored to a span of the answer text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentReference {
    #[serde(rename = "type")]
    pub ref_kind: String,
    pub matched_text: String,
    pub start_idx: i64,
    pub end_idx: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribution: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pub_date: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub safe_urls: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refs: Option<Vec<RefEntry>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<RefItem>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_images: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<RefSource>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invalid: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attributable_index: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<RefImage>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domains: Option<Vec<RefDomain>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub leaf_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub used_as_navigation: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breadcrumbs: Option<Vec<String>>,
}

/// A search issued during the turn.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchQuery {
    #[serde(rename = "type")]
    pub query_kind: String,
    pub q: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResultEntry {
    #[serde(rename = "type")]
    pub entry_kind: String,
    pub url: String,
    pub title: String,
    pub snippet: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ref_id: Option<Ref>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pub_date: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribution: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResultGroup {
    #[serde(rename = "type")]
    pub group_kind: String,
    pub domain: String,
    pub entries: Vec<SearchResultEntry>,
}

impl Ref {
    pub fn decode(value: Value, path: FieldPath) -> DecodeResult<Self> {
        let mut obj = ObjectReader::from_value(value, path)?;
        let decoded = Self::decode_fields(&mut obj)?;
        obj.finish()?;
        Ok(decoded)
    }

    fn decode_fields(obj: &mut ObjectReader) -> DecodeResult<Self> {
        Ok(Self {
            ref_type: obj.required_enum("ref_type", REF_TYPES)?,
            turn_index: obj.required_i64("turn_index")?,
            ref_index: obj.required_i64("ref_index")?,
        })
    }
}

impl RefEntry {
    pub fn decode(value: Value, path: FieldPath) -> DecodeResult<Self> {
        match value {
            Value::String(name) => {
                if NAMED_REFS.contains(&name.as_str()) {
                    Ok(Self::Named(name))
                } else {
                    Err(DecodeError::schema(
                        path.as_str(),
                        format!(
                            "`{name}` is not a named ref (accepted: {})",
                            NAMED_REFS.join(", ")
                        ),
                    ))
                }
            }
            object @ Value::Object(_) => Ref::decode(object, path).map(Self::Indexed),
            other => Err(DecodeError::schema(
                path.as_str(),
                format!(
                    "expected a named ref or a ref object, found {}",
                    render_value(&other)
                ),
            )),
        }
    }
}

impl RefSize {
    fn decode(value: Value, path: FieldPath) -> DecodeResult<Self> {
        let mut obj = ObjectReader::from_value(value, path)?;
        let width = obj.required_i64("width")?;
        let height = obj.required_i64("height")?;
        obj.finish()?;
        Ok(Self { width, height })
    }
}

impl RefImage {
    pub fn decode(value: Value, path: FieldPath) -> DecodeResult<Self> {
        let mut obj = ObjectReader::from_value(value, path)?;
        let url = obj.required_string("url")?;
        let content_url = obj.required_string("content_url")?;
        let thumbnail_url = obj.required_string("thumbnail_url")?;
        let title = obj.required_string("title")?;
        let content_size = take_size(&mut obj, "content_size")?;
        let thumbnail_size = take_size(&mut obj, "thumbnail_size")?;
        obj.expect_null("thumbnail_crop_info")?;
        let attribution = obj.required_string("attribution")?;
        obj.finish()?;
        Ok(Self {
            url,
            content_url,
            thumbnail_url,
            title,
            content_size,
            thumbnail_size,
            attribution,
        })
    }
}

fn take_size(obj: &mut ObjectReader, key: &str) -> DecodeResult<RefSize> {
    let path = obj.path().key(key);
    match obj.take_value(key) {
        None | Some(Value::Null) => Err(DecodeError::schema(
            path.as_str(),
            "required attribute is missing",
        )),
        Some(value) => RefSize::decode(value, path),
    }
}

impl RefDomain {
    pub fn decode(value: Value, path: FieldPath) -> DecodeResult<Self> {
        let mut obj = ObjectReader::from_value(value, path)?;
        let title = obj.required_string("title")?;
        let subtitle = obj.required_string("subtitle")?;
        let domain = obj.required_string("domain")?;
        let url = obj.required_string("url")?;
        obj.expect_null_list("sub_domains")?;
        let attribution = obj.required_string("attribution")?;
        obj.finish()?;
        Ok(Self {
            title,
            subtitle,
            domain,
            url,
            attribution,
        })
    }
}

impl RefSource {
    pub fn decode(value: Value, path: FieldPath) -> DecodeResult<Self> {
        let mut obj = ObjectReader::from_value(value, path)?;
        let source = Self {
            title: obj.required_string("title")?,
            url: obj.required_string("url")?,
            attribution: obj.required_string("attribution")?,
        };
        obj.finish()?;
        Ok(source)
    }
}

impl SupportingWebsite {
    pub fn decode(value: Value, path: FieldPath) -> DecodeResult<Self> {
        let mut obj = ObjectReader::from_value(value, path)?;
        let website = Self {
            title: obj.required_string("title")?,
            url: obj.required_string("url")?,
            pub_date: obj.optional_f64("pub_date")?,
            attribution: obj.required_string("attribution")?,
            snippet: obj.optional_string("snippet")?,
        };
        obj.finish()?;
        Ok(website)
    }
}

impl RefItem {
    pub fn decode(value: Value, path: FieldPath) -> DecodeResult<Self> {
        let mut obj = ObjectReader::from_value(value, path)?;
        let title = obj.required_string("title")?;
        let url = obj.required_string("url")?;
        let thumbnail_url = obj.optional_string("thumbnail_url")?;
        let pub_date = obj.optional_f64("pub_date")?;
        let snippet = obj.optional_string("snippet")?;
        obj.expect_null("hue")?;
        obj.expect_null("attributions")?;
        let attribution = obj.optional_string("attribution")?;
        let attribution_segments = obj.optional_string_array("attribution_segments")?;
        let supporting_websites = decode_optional_vec(&mut obj, "supporting_websites", SupportingWebsite::decode)?;
        let refs = decode_optional_vec(&mut obj, "refs", Ref::decode)?;
        obj.finish()?;
        Ok(Self {
            title,
            url,
            thumbnail_url,
            pub_date,
            snippet,
            attribution,
            attribution_segments,
            supporting_websites,
            refs,
        })
    }
}

impl ContentReference {
    pub fn decode(value: Value, path: FieldPath) -> DecodeResult<Self> {
        let mut obj = ObjectReader::from_value(value, path)?;
        let ref_kind = obj.required_enum("type", CONTENT_REFERENCE_TYPES)?;
        let matched_text = obj.required_string("matched_text")?;
        let start_idx = obj.required_i64("start_idx")?;
        let end_idx = obj.required_i64("end_idx")?;
        let title = obj.optional_string("title")?;
        let url = obj.optional_string("url")?;
        let snippet = obj.optional_string("snippet")?;
        let attribution = obj.optional_string("attribution")?;
        let pub_date = obj.optional_f64("pub_date")?;
        let status = obj.optional_enum("status", &["done"])?;
        let safe_urls = obj.optional_string_array("safe_urls")?;
        let refs = decode_optional_vec(&mut obj, "refs", RefEntry::decode)?;
        let alt = obj.optional_string("alt")?;
        let prompt_text = obj.optional_string("prompt_text")?;
        let items = decode_optional_vec(&mut obj, "items", RefItem::decode)?;
        obj.expect_null("error")?;
        let style = obj.optional_string("style")?;
        let has_images = obj.optional_bool("has_images")?;
        let sources = decode_optional_vec(&mut obj, "sources", RefSource::decode)?;
        let invalid = obj.optional_bool("invalid")?;
        obj.expect_null("attributions")?;
        obj.expect_null("attributions_debug")?;
        let attributable_index = obj.optional_string("attributable_index")?;
        let images = decode_optional_vec(&mut obj, "images", RefImage::decode)?;
        let domains = decode_optional_vec(&mut obj, "domains", RefDomain::decode)?;
        let display_title = obj.optional_string("display_title")?;
        let page_title = obj.optional_string("page_title")?;
        let leaf_description = obj.optional_string("leaf_description")?;
        let used_as_navigation = obj.optional_literal_bool("used_as_navigation", true)?;
        let breadcrumbs = obj.optional_string_array("breadcrumbs")?;
        obj.expect_null("icon_type")?;
        obj.finish()?;
        Ok(Self {
            ref_kind,
            matched_text,
            start_idx,
            end_idx,
            title,
            url,
            snippet,
            attribution,
            pub_date,
            status,
            safe_urls,
            refs,
            alt,
            prompt_text,
            items,
            style,
            has_images,
            sources,
            invalid,
            attributable_index,
            images,
            domains,
            display_title,
            page_title,
            leaf_description,
            used_as_navigation,
            breadcrumbs,
        })
    }
}

impl SearchQuery {
    pub fn decode(value: Value, path: FieldPath) -> DecodeResult<Self> {
        let mut obj = ObjectReader::from_value(value, path)?;
        let query_kind = obj.required_enum("type", &["search"])?;
        let q = obj.required_string("q")?;
        obj.finish()?;
        Ok(Self { query_kind, q })
    }
}

impl SearchResultEntry {
    pub fn decode(value: Value, path: FieldPath) -> DecodeResult<Self> {
        let mut obj = ObjectReader::from_value(value, path)?;
        let entry_kind = obj.required_enum("type", &["search_result"])?;
        let url = obj.required_string("url")?;
        let title = obj.required_string("title")?;
        let snippet = obj.required_string("snippet")?;
        let ref_id = match obj.take_present("ref_id") {
            None => None,
            Some((value, path)) => Some(Ref::decode(value, path)?),
        };
        let pub_date = obj.optional_f64("pub_date")?;
        let attribution = obj.optional_string("attribution")?;
        obj.expect_null("attributions")?;
        obj.expect_null("attributions_debug")?;
        obj.expect_null("content_type")?;
        obj.finish()?;
        Ok(Self {
            entry_kind,
            url,
            title,
            snippet,
            ref_id,
            pub_date,
            attribution,
        })
    }
}

impl SearchResultGroup {
    pub fn decode(value: Value, path: FieldPath) -> DecodeResult<Self> {
        let mut obj = ObjectReader::from_value(value, path)?;
        let group_kind = obj.required_enum("type", &["search_result_group"])?;
        let domain = obj.required_string("domain")?;
        let (entries_raw, entries_path) = obj.required_array("entries")?;
        let entries = entries_raw
            .into_iter()
            .enumerate()
            .map(|(index, entry)| SearchResultEntry::decode(entry, entries_path.index(index)))
            .collect::<DecodeResult<Vec<SearchResultEntry>>>()?;
        obj.finish()?;
        Ok(Self {
            group_kind,
            domain,
            entries,
        })
    }
}

/// Decodes an optional homogeneous list field with one decoder per element.
pub fn decode_optional_vec<T>(
    obj: &mut ObjectReader,
    key: &str,
    decode: fn(Value, FieldPath) -> DecodeResult<T>,
) -> DecodeResult<Option<Vec<T>>> {
    match obj.optional_array(key)? {
        None => Ok(None),
        Some((items, path)) => items
            .into_iter()
            .enumerate()
            .map(|(index, item)| decode(item, path.index(index)))
            .collect::<DecodeResult<Vec<T>>>()
            .map(Some),
    }
}

/// Same as [`decode_optional_vec`] for a required list field.
pub fn decode_required_vec<T>(
    obj: &mut ObjectReader,
    key: &str,
    decode: fn(Value, FieldPath) -> DecodeResult<T>,
) -> DecodeResult<Vec<T>> {
    let (items, path) = obj.required_array(key)?;
    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| decode(item, path.index(index)))
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn content_reference_rejects_unknown_kind() {
        let err = ContentReference::decode(
            json!({"type": "sidebar", "matched_text": "x", "start_idx": 0, "end_idx": 1}),
            FieldPath::root("metadata").key("content_references").index(0),
        )
        .unwrap_err();
        assert!(err.to_string().contains("sidebar"), "{err}");
    }

    #[test]
    fn ref_entries_accept_names_and_indexed_refs() {
        let path = FieldPath::root("refs").index(0);
        let named = RefEntry::decode(json!("hidden"), path.clone()).unwrap();
        assert_eq!(named, RefEntry::Named("hidden".into()));

        let indexed = RefEntry::decode(
            json!({"ref_type": "search", "turn_index": 1, "ref_index": 2}),
            FieldPath::root("refs").index(1),
        )
        .unwrap();
        assert!(matches!(indexed, RefEntry::Indexed(_)));

        let err = RefEntry::decode(json!("mystery"), FieldPath::root("refs").index(2)).unwrap_err();
        assert!(err.to_string().contains("named ref"), "{err}");
    }

    #[test]
    fn search_result_group_validates_nested_entries() {
        let group = SearchResultGroup::decode(
            json!({
                "type": "search_result_group",
                "domain": "example.com",
                "entries": [{
                    "type": "search_result",
                    "url": "https://example.com/a",
                    "title": "A",
                    "snippet": "first hit",
                    "ref_id": {"ref_type": "search", "turn_index": 0, "ref_index": 0},
                    "pub_date": null,
                    "attribution": "example.com"
                }]
            }),
            FieldPath::root("metadata").key("search_result_groups").index(0),
        )
        .unwrap();
        assert_eq!(group.entries.len(), 1);
        assert_eq!(group.entries[0].title, "A");
    }
}
