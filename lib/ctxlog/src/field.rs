/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::borrow::Cow;
use std::error::Error;
use std::fmt;
use std::panic::{RefUnwindSafe, UnwindSafe};
use std::sync::Arc;

use slog::{KV, Record, Serializer};

use ctxlog_report::TagMap;

/// Shared handle to an error attached to a log event.
#[derive(Clone)]
pub struct ErrorValue(Arc<dyn Error + Send + Sync + 'static>);

// only read through shared references while logging
impl RefUnwindSafe for ErrorValue {}
impl UnwindSafe for ErrorValue {}

impl ErrorValue {
    pub fn new<E>(error: E) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        ErrorValue(Arc::new(error))
    }

    pub fn from_arc(error: Arc<dyn Error + Send + Sync + 'static>) -> Self {
        ErrorValue(error)
    }

    pub fn as_error(&self) -> &(dyn Error + 'static) {
        &*self.0
    }
}

impl fmt::Debug for ErrorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

impl fmt::Display for ErrorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.0, f)
    }
}

#[derive(Clone, Debug)]
pub enum FieldValue {
    Str(String),
    Int(i64),
    Error(ErrorValue),
}

/// A typed key/value pair attached to log events.
#[derive(Clone, Debug)]
pub struct Field {
    key: Cow<'static, str>,
    value: FieldValue,
}

impl Field {
    pub fn new(key: impl Into<Cow<'static, str>>, value: FieldValue) -> Self {
        Field {
            key: key.into(),
            value,
        }
    }

    pub fn string(key: impl Into<Cow<'static, str>>, value: impl Into<String>) -> Self {
        Field::new(key, FieldValue::Str(value.into()))
    }

    pub fn int(key: impl Into<Cow<'static, str>>, value: impl Into<i64>) -> Self {
        Field::new(key, FieldValue::Int(value.into()))
    }

    /// Error field under the conventional `error` key
    pub fn error<E>(error: E) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        Field::named_error("error", error)
    }

    pub fn named_error<E>(key: impl Into<Cow<'static, str>>, error: E) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        Field::new(key, FieldValue::Error(ErrorValue::new(error)))
    }

    #[inline]
    pub fn key(&self) -> &str {
        &self.key
    }

    #[inline]
    pub fn value(&self) -> &FieldValue {
        &self.value
    }

    fn slog_key(&self) -> slog::Key {
        match &self.key {
            Cow::Borrowed(s) => slog::Key::from(*s),
            Cow::Owned(s) => slog::Key::from(s.clone()),
        }
    }

    /// Tag form of the field, errors have none
    pub fn tag_value(&self) -> Option<String> {
        match &self.value {
            FieldValue::Str(s) => Some(s.clone()),
            FieldValue::Int(i) => Some(itoa::Buffer::new().format(*i).to_string()),
            FieldValue::Error(_) => None,
        }
    }
}

impl KV for Field {
    fn serialize(&self, _record: &Record, serializer: &mut dyn Serializer) -> slog::Result {
        match &self.value {
            FieldValue::Str(s) => serializer.emit_str(self.slog_key(), s),
            FieldValue::Int(i) => serializer.emit_i64(self.slog_key(), *i),
            FieldValue::Error(e) => serializer.emit_error(self.slog_key(), e.as_error()),
        }
    }
}

/// Fields owned by a logger handle, serialized in insertion order.
#[derive(Clone)]
pub(crate) struct FieldList(pub(crate) Arc<Vec<Field>>);

impl KV for FieldList {
    fn serialize(&self, record: &Record, serializer: &mut dyn Serializer) -> slog::Result {
        FieldSlice(&self.0).serialize(record, serializer)
    }
}

/// Fields of a single event, serialized in insertion order.
pub(crate) struct FieldSlice<'a>(pub(crate) &'a [Field]);

impl KV for FieldSlice<'_> {
    fn serialize(&self, record: &Record, serializer: &mut dyn Serializer) -> slog::Result {
        for f in self.0 {
            f.serialize(record, serializer)?;
        }
        Ok(())
    }
}

/// Fold string and integer fields into a tag map, last key wins.
pub(crate) fn tags_of(fields: &[Field]) -> TagMap {
    let mut tags = TagMap::new();
    for f in fields {
        if let Some(v) = f.tag_value() {
            tags.insert(f.key().to_string(), v);
        }
    }
    tags
}

/// Replace fields of `base` that share a key with `update`, append the rest.
///
/// A key repeated in `base` collapses into its first position.
pub(crate) fn merge_overwrite(base: &[Field], update: &[Field]) -> Vec<Field> {
    let mut merged = base.to_vec();
    for f in update {
        match merged.iter().position(|v| v.key == f.key) {
            Some(pos) => {
                merged[pos] = f.clone();
                let mut i = pos + 1;
                while i < merged.len() {
                    if merged[i].key == f.key {
                        merged.remove(i);
                    } else {
                        i += 1;
                    }
                }
            }
            None => merged.push(f.clone()),
        }
    }
    merged
}
