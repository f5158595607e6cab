/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::error::Error;
use std::fmt::{Arguments, Write};
use std::panic::{RefUnwindSafe, UnwindSafe};
use std::sync::Arc;

use itoa::Integer;
use ryu::Float;
use slog::{Drain, KV, Never, OwnedKVList, Record, Serializer};

use ctxlog_types::Level;

use super::{CapturedError, ErrorTracker, TagMap};

/// Turns error tier records into tracker captures.
///
/// Logger values are folded first and record values after them, so on a
/// repeated key the value closest to the call site wins. Error values are
/// kept out of the tag map, and the last one seen turns the capture into an
/// error capture.
pub struct ReportEncoder {
    tracker: Arc<dyn ErrorTracker>,
}

// tracker state is guarded by the tracker's own locks
impl RefUnwindSafe for ReportEncoder {}
impl UnwindSafe for ReportEncoder {}

impl ReportEncoder {
    pub fn new(tracker: Arc<dyn ErrorTracker>) -> Self {
        ReportEncoder { tracker }
    }

    pub fn encode(&self, record: &Record, logger_values: &OwnedKVList) {
        let message = record.msg().to_string();
        let mut collector = TagCollector::new(&message);

        // keep whatever was collected before a failing value
        let _ = logger_values
            .serialize(record, &mut collector)
            .and_then(|_| record.kv().serialize(record, &mut collector));

        let TagCollector { tags, error, .. } = collector;
        match error {
            Some(e) => self.tracker.capture_error(e, tags),
            None => self.tracker.capture_message(&message, tags),
        }
    }
}

impl Drain for ReportEncoder {
    type Ok = ();
    type Err = Never;

    fn log(&self, record: &Record, logger_values: &OwnedKVList) -> Result<(), Never> {
        if Level::from(record.level()) == Level::Error {
            self.encode(record, logger_values);
        }
        Ok(())
    }

    #[inline]
    fn is_enabled(&self, level: slog::Level) -> bool {
        Level::from(level) == Level::Error
    }
}

struct TagCollector<'a> {
    context: &'a str,
    tags: TagMap,
    error: Option<CapturedError>,
}

impl<'a> TagCollector<'a> {
    fn new(context: &'a str) -> Self {
        TagCollector {
            context,
            tags: TagMap::new(),
            error: None,
        }
    }

    fn emit_integer<T: Integer>(&mut self, key: slog::Key, value: T) -> slog::Result {
        let mut buffer = itoa::Buffer::new();
        let value_s = buffer.format(value);
        self.emit_str(key, value_s)
    }

    fn emit_float<T: Float>(&mut self, key: slog::Key, value: T) -> slog::Result {
        let mut buffer = ryu::Buffer::new();
        let value_s = buffer.format(value);
        self.emit_str(key, value_s)
    }
}

impl Serializer for TagCollector<'_> {
    impl_integer_by_itoa! {
        /// Emit `usize`
        usize => emit_usize
    }
    impl_integer_by_itoa! {
        /// Emit `isize`
        isize => emit_isize
    }
    impl_integer_by_itoa! {
        /// Emit `u8`
        u8 => emit_u8
    }
    impl_integer_by_itoa! {
        /// Emit `i8`
        i8 => emit_i8
    }
    impl_integer_by_itoa! {
        /// Emit `u16`
        u16 => emit_u16
    }
    impl_integer_by_itoa! {
        /// Emit `i16`
        i16 => emit_i16
    }
    impl_integer_by_itoa! {
        /// Emit `u32`
        u32 => emit_u32
    }
    impl_integer_by_itoa! {
        /// Emit `i32`
        i32 => emit_i32
    }
    impl_float_by_ryu! {
        /// Emit `f32`
        f32 => emit_f32
    }
    impl_integer_by_itoa! {
        /// Emit `u64`
        u64 => emit_u64
    }
    impl_integer_by_itoa! {
        /// Emit `i64`
        i64 => emit_i64
    }
    impl_float_by_ryu! {
        /// Emit `f64`
        f64 => emit_f64
    }

    fn emit_bool(&mut self, key: slog::Key, value: bool) -> slog::Result {
        self.emit_str(key, if value { "true" } else { "false" })
    }

    fn emit_char(&mut self, key: slog::Key, value: char) -> slog::Result {
        self.emit_str(key, value.encode_utf8(&mut [0u8; 4]))
    }

    fn emit_unit(&mut self, _key: slog::Key) -> slog::Result {
        Ok(())
    }

    fn emit_none(&mut self, _key: slog::Key) -> slog::Result {
        Ok(())
    }

    fn emit_str(&mut self, key: slog::Key, value: &str) -> slog::Result {
        self.tags.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn emit_arguments(&mut self, key: slog::Key, value: &Arguments) -> slog::Result {
        if let Some(s) = value.as_str() {
            self.emit_str(key, s)
        } else {
            let mut s = String::new();
            s.write_fmt(*value)?;
            self.emit_str(key, &s)
        }
    }

    fn emit_error(&mut self, _key: slog::Key, error: &(dyn Error + 'static)) -> slog::Result {
        self.error = Some(CapturedError::new(self.context, error));
        Ok(())
    }
}
