//! Strict field-level decoding over raw `serde_json::Value` trees.
//!
//! Every typed model in this crate is built by draining an [`ObjectReader`]:
//! required fields are taken out one by one with type-strict accessors, and
//! [`ObjectReader::finish`] rejects whatever is left over, so an attribute
//! the schema does not name is always a loud failure. Accessors never
//! coerce: a string holding `"1"` does not satisfy a number field, and a
//! float does not satisfy an integer field.

use serde_json::{Map, Value};

use crate::error::{DecodeError, DecodeResult};

const RENDERED_VALUE_MAX_CHARS: usize = 120;

/// Dotted path from a record root to the field being validated, e.g.
/// `conversation.mapping["abc"].message.content.parts[2].size_bytes`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath(String);

impl FieldPath {
    #[must_use]
    pub fn root(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    #[must_use]
    pub fn key(&self, name: &str) -> Self {
        Self(format!("{}.{name}", self.0))
    }

    #[must_use]
    pub fn entry(&self, key: &str) -> Self {
        Self(format!("{}[\"{key}\"]", self.0))
    }

    #[must_use]
    pub fn index(&self, index: usize) -> Self {
        Self(format!("{}[{index}]", self.0))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for FieldPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Compact rendering of an offending value for error messages.
#[must_use]
pub fn render_value(value: &Value) -> String {
    let rendered = value.to_string();
    if rendered.chars().count() <= RENDERED_VALUE_MAX_CHARS {
        return rendered;
    }
    let mut truncated: String = rendered.chars().take(RENDERED_VALUE_MAX_CHARS).collect();
    truncated.push_str("...");
    truncated
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn expected(path: &FieldPath, what: &str, found: &Value) -> DecodeError {
    DecodeError::schema(
        path.as_str(),
        format!(
            "expected {what}, found {} {}",
            type_name(found),
            render_value(found)
        ),
    )
}

pub fn string_value(value: Value, path: &FieldPath) -> DecodeResult<String> {
    match value {
        Value::String(text) => Ok(text),
        other => Err(expected(path, "string", &other)),
    }
}

pub fn f64_value(value: Value, path: &FieldPath) -> DecodeResult<f64> {
    match value {
        Value::Number(number) => number
            .as_f64()
            .ok_or_else(|| expected(path, "finite number", &Value::Number(number))),
        other => Err(expected(path, "number", &other)),
    }
}

pub fn i64_value(value: Value, path: &FieldPath) -> DecodeResult<i64> {
    match value {
        Value::Number(number) => number
            .as_i64()
            .ok_or_else(|| expected(path, "integer", &Value::Number(number))),
        other => Err(expected(path, "integer", &other)),
    }
}

pub fn bool_value(value: Value, path: &FieldPath) -> DecodeResult<bool> {
    match value {
        Value::Bool(flag) => Ok(flag),
        other => Err(expected(path, "bool", &other)),
    }
}

pub fn array_value(value: Value, path: &FieldPath) -> DecodeResult<Vec<Value>> {
    match value {
        Value::Array(items) => Ok(items),
        other => Err(expected(path, "array", &other)),
    }
}

pub fn object_value(value: Value, path: &FieldPath) -> DecodeResult<Map<String, Value>> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(expected(path, "object", &other)),
    }
}

/// Validates a string against a closed enumeration.
pub fn enum_value(
    value: Value,
    path: &FieldPath,
    accepted: &'static [&'static str],
) -> DecodeResult<String> {
    let text = string_value(value, path)?;
    if accepted.contains(&text.as_str()) {
        Ok(text)
    } else {
        Err(DecodeError::schema(
            path.as_str(),
            format!("`{text}` is not one of the accepted literals: {}", accepted.join(", ")),
        ))
    }
}

/// Drains one raw JSON object, key by key, and fails on leftovers.
#[derive(Debug)]
pub struct ObjectReader {
    map: Map<String, Value>,
    path: FieldPath,
}

impl ObjectReader {
    pub fn from_value(value: Value, path: FieldPath) -> DecodeResult<Self> {
        let map = object_value(value, &path)?;
        Ok(Self { map, path })
    }

    #[must_use]
    pub fn from_map(map: Map<String, Value>, path: FieldPath) -> Self {
        Self { map, path }
    }

    #[must_use]
    pub fn path(&self) -> &FieldPath {
        &self.path
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.map.contains_key(key)
    }

    /// Remaining (not yet drained) attribute names, sorted.
    #[must_use]
    pub fn remaining_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.map.keys().cloned().collect();
        keys.sort_unstable();
        keys
    }

    /// Removes a key; `Some(Value::Null)` is distinct from an absent key.
    pub fn take_value(&mut self, key: &str) -> Option<Value> {
        self.map.remove(key)
    }

    /// Removes a key, treating explicit null the same as absence.
    pub fn take_present(&mut self, key: &str) -> Option<(Value, FieldPath)> {
        match self.map.remove(key) {
            None | Some(Value::Null) => None,
            Some(value) => Some((value, self.path.key(key))),
        }
    }

    fn required(&mut self, key: &str) -> DecodeResult<(Value, FieldPath)> {
        let field_path = self.path.key(key);
        match self.map.remove(key) {
            None => Err(DecodeError::schema(
                field_path.as_str(),
                "required attribute is missing",
            )),
            Some(Value::Null) => Err(DecodeError::schema(
                field_path.as_str(),
                "required attribute is null",
            )),
            Some(value) => Ok((value, field_path)),
        }
    }

    pub fn required_string(&mut self, key: &str) -> DecodeResult<String> {
        let (value, path) = self.required(key)?;
        string_value(value, &path)
    }

    pub fn optional_string(&mut self, key: &str) -> DecodeResult<Option<String>> {
        match self.take_present(key) {
            None => Ok(None),
            Some((value, path)) => string_value(value, &path).map(Some),
        }
    }

    pub fn required_f64(&mut self, key: &str) -> DecodeResult<f64> {
        let (value, path) = self.required(key)?;
        f64_value(value, &path)
    }

    pub fn optional_f64(&mut self, key: &str) -> DecodeResult<Option<f64>> {
        match self.take_present(key) {
            None => Ok(None),
            Some((value, path)) => f64_value(value, &path).map(Some),
        }
    }

    pub fn required_i64(&mut self, key: &str) -> DecodeResult<i64> {
        let (value, path) = self.required(key)?;
        i64_value(value, &path)
    }

    pub fn optional_i64(&mut self, key: &str) -> DecodeResult<Option<i64>> {
        match self.take_present(key) {
            None => Ok(None),
            Some((value, path)) => i64_value(value, &path).map(Some),
        }
    }

    pub fn required_bool(&mut self, key: &str) -> DecodeResult<bool> {
        let (value, path) = self.required(key)?;
        bool_value(value, &path)
    }

    pub fn optional_bool(&mut self, key: &str) -> DecodeResult<Option<bool>> {
        match self.take_present(key) {
            None => Ok(None),
            Some((value, path)) => bool_value(value, &path).map(Some),
        }
    }

    pub fn required_array(&mut self, key: &str) -> DecodeResult<(Vec<Value>, FieldPath)> {
        let (value, path) = self.required(key)?;
        let items = array_value(value, &path)?;
        Ok((items, path))
    }

    pub fn optional_array(&mut self, key: &str) -> DecodeResult<Option<(Vec<Value>, FieldPath)>> {
        match self.take_present(key) {
            None => Ok(None),
            Some((value, path)) => {
                let items = array_value(value, &path)?;
                Ok(Some((items, path)))
            }
        }
    }

    pub fn required_string_array(&mut self, key: &str) -> DecodeResult<Vec<String>> {
        let (items, path) = self.required_array(key)?;
        items
            .into_iter()
            .enumerate()
            .map(|(index, item)| string_value(item, &path.index(index)))
            .collect()
    }

    pub fn optional_string_array(&mut self, key: &str) -> DecodeResult<Option<Vec<String>>> {
        match self.optional_array(key)? {
            None => Ok(None),
            Some((items, path)) => items
                .into_iter()
                .enumerate()
                .map(|(index, item)| string_value(item, &path.index(index)))
                .collect::<DecodeResult<Vec<String>>>()
                .map(Some),
        }
    }

    /// A field whose only legal values are null or absence.
    pub fn expect_null(&mut self, key: &str) -> DecodeResult<()> {
        match self.take_present(key) {
            None => Ok(()),
            Some((value, path)) => Err(expected(&path, "null", &value)),
        }
    }

    /// A field whose only legal non-null values are nulls inside a list.
    pub fn expect_null_list(&mut self, key: &str) -> DecodeResult<()> {
        match self.take_present(key) {
            None => Ok(()),
            Some((value, path)) => {
                let items = array_value(value, &path)?;
                for (index, item) in items.iter().enumerate() {
                    if !item.is_null() {
                        return Err(expected(&path.index(index), "null", item));
                    }
                }
                Ok(())
            }
        }
    }

    /// Required string that must equal one specific literal.
    pub fn literal_str(&mut self, key: &str, literal: &'static str) -> DecodeResult<()> {
        let (value, path) = self.required(key)?;
        let text = string_value(value, &path)?;
        if text == literal {
            Ok(())
        } else {
            Err(DecodeError::schema(
                path.as_str(),
                format!("expected literal `{literal}`, found `{text}`"),
            ))
        }
    }

    /// Optional string literal; returns whether the literal was present.
    pub fn optional_literal_str(&mut self, key: &str, literal: &'static str) -> DecodeResult<bool> {
        match self.take_present(key) {
            None => Ok(false),
            Some((value, path)) => {
                let text = string_value(value, &path)?;
                if text == literal {
                    Ok(true)
                } else {
                    Err(DecodeError::schema(
                        path.as_str(),
                        format!("expected literal `{literal}`, found `{text}`"),
                    ))
                }
            }
        }
    }

    /// Required bool that must equal one specific literal.
    pub fn literal_bool(&mut self, key: &str, literal: bool) -> DecodeResult<bool> {
        let (value, path) = self.required(key)?;
        let flag = bool_value(value, &path)?;
        if flag == literal {
            Ok(flag)
        } else {
            Err(DecodeError::schema(
                path.as_str(),
                format!("expected literal `{literal}`, found `{flag}`"),
            ))
        }
    }

    /// Optional bool that must equal one specific literal when present.
    pub fn optional_literal_bool(&mut self, key: &str, literal: bool) -> DecodeResult<Option<bool>> {
        match self.take_present(key) {
            None => Ok(None),
            Some((value, path)) => {
                let flag = bool_value(value, &path)?;
                if flag == literal {
                    Ok(Some(flag))
                } else {
                    Err(DecodeError::schema(
                        path.as_str(),
                        format!("expected literal `{literal}`, found `{flag}`"),
                    ))
                }
            }
        }
    }

    /// Required integer that must equal one specific literal.
    pub fn literal_i64(&mut self, key: &str, literal: i64) -> DecodeResult<i64> {
        let (value, path) = self.required(key)?;
        let number = i64_value(value, &path)?;
        if number == literal {
            Ok(number)
        } else {
            Err(DecodeError::schema(
                path.as_str(),
                format!("expected literal `{literal}`, found `{number}`"),
            ))
        }
    }

    pub fn required_enum(
        &mut self,
        key: &str,
        accepted: &'static [&'static str],
    ) -> DecodeResult<String> {
        let (value, path) = self.required(key)?;
        enum_value(value, &path, accepted)
    }

    pub fn optional_enum(
        &mut self,
        key: &str,
        accepted: &'static [&'static str],
    ) -> DecodeResult<Option<String>> {
        match self.take_present(key) {
            None => Ok(None),
            Some((value, path)) => enum_value(value, &path, accepted).map(Some),
        }
    }

    pub fn required_object(&mut self, key: &str) -> DecodeResult<ObjectReader> {
        let (value, path) = self.required(key)?;
        ObjectReader::from_value(value, path)
    }

    pub fn optional_object(&mut self, key: &str) -> DecodeResult<Option<ObjectReader>> {
        match self.take_present(key) {
            None => Ok(None),
            Some((value, path)) => ObjectReader::from_value(value, path).map(Some),
        }
    }

    /// Opaque passthrough for named fields whose payload is documented as
    /// free-form JSON (`jit_plugin_data` and friends). The field name is
    /// still strictly enumerated; only its value is untyped.
    pub fn optional_opaque(&mut self, key: &str) -> Option<Value> {
        self.take_present(key).map(|(value, _)| value)
    }

    /// Rejects every attribute not drained by the accessors above.
    pub fn finish(self) -> DecodeResult<()> {
        if self.map.is_empty() {
            return Ok(());
        }
        let mut leftovers: Vec<&str> = self.map.keys().map(String::as_str).collect();
        leftovers.sort_unstable();
        Err(DecodeError::schema(
            self.path.as_str(),
            format!(
                "undeclared attribute(s) present: {}",
                leftovers.join(", ")
            ),
        ))
    }
}
