/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::backtrace::Backtrace;
use std::fmt::Arguments;
use std::io::{self, Write};

use anstyle::{AnsiColor, Color, Style};
use chrono::Local;
use itoa::Integer;
use ryu::Float;
use slog::{KV, Level, OwnedKVList, Record, Serializer};

const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f%:z";

const COLOR_MAGENTA: Style = Style::new().fg_color(Some(Color::Ansi(AnsiColor::Magenta)));
const COLOR_RED: Style = Style::new().fg_color(Some(Color::Ansi(AnsiColor::Red)));
const COLOR_YELLOW: Style = Style::new().fg_color(Some(Color::Ansi(AnsiColor::Yellow)));
const COLOR_GREEN: Style = Style::new().fg_color(Some(Color::Ansi(AnsiColor::Green)));
const COLOR_CYAN: Style = Style::new().fg_color(Some(Color::Ansi(AnsiColor::Cyan)));
const COLOR_BLUE: Style = Style::new().fg_color(Some(Color::Ansi(AnsiColor::Blue)));
const STYLE_BOLD: Style = Style::new().bold();
const STYLE_ITALIC: Style = Style::new().italic();

/// Decoration settings for console lines.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StdLogConfig {
    /// Append `<file:line>` of the call site to every line
    pub append_code_position: bool,
    /// Append a captured backtrace to records at or above this level
    pub backtrace_level: Option<Level>,
}

impl StdLogConfig {
    /// Call site on every line, backtrace for errors.
    pub fn verbose() -> Self {
        StdLogConfig {
            append_code_position: true,
            backtrace_level: Some(Level::Error),
        }
    }

    /// Backtrace only for critical records.
    pub fn terse() -> Self {
        StdLogConfig {
            append_code_position: false,
            backtrace_level: Some(Level::Critical),
        }
    }
}

fn level_label(level: Level) -> &'static str {
    match level {
        Level::Critical => "CRITICAL",
        Level::Error => "ERROR",
        Level::Warning => "WARN",
        Level::Info => "INFO",
        Level::Debug => "DEBUG",
        Level::Trace => "TRACE",
    }
}

pub(crate) struct StdLogFormatter {
    config: StdLogConfig,
}

impl StdLogFormatter {
    pub(crate) fn new(config: StdLogConfig) -> Self {
        StdLogFormatter { config }
    }

    fn want_backtrace(&self, level: Level) -> bool {
        match self.config.backtrace_level {
            // slog orders levels from Critical (most severe) to Trace
            Some(min) => level.is_at_least(min),
            None => false,
        }
    }

    pub(crate) fn format(
        &self,
        buf: &mut Vec<u8>,
        styled: bool,
        record: &Record,
        logger_values: &OwnedKVList,
    ) -> Result<(), slog::Error> {
        write!(buf, "{}", Local::now().format(TIME_FORMAT))?;

        let level = record.level();
        if styled {
            let level_color = match level {
                Level::Critical => COLOR_MAGENTA,
                Level::Error => COLOR_RED,
                Level::Warning => COLOR_YELLOW,
                Level::Info => COLOR_GREEN,
                Level::Debug => COLOR_CYAN,
                Level::Trace => COLOR_BLUE,
            };
            write!(
                buf,
                " {}{}{} {}{}{}",
                level_color.render(),
                level_label(level),
                level_color.render_reset(),
                STYLE_BOLD.render(),
                record.msg(),
                STYLE_BOLD.render_reset(),
            )?;
        } else {
            write!(buf, " {} {}", level_label(level), record.msg())?;
        }

        let mut kv_formatter = FormatterKv {
            buf: &mut *buf,
            styled,
        };
        logger_values.serialize(record, &mut kv_formatter)?;
        record.kv().serialize(record, &mut kv_formatter)?;

        if self.config.append_code_position {
            if styled {
                write!(
                    buf,
                    " <{}{}:{}{}>",
                    STYLE_ITALIC.render(),
                    record.file(),
                    record.line(),
                    STYLE_ITALIC.render_reset()
                )?;
            } else {
                write!(buf, " <{}:{}>", record.file(), record.line())?;
            }
        }
        buf.push(b'\n');

        if self.want_backtrace(level) {
            let bt = Backtrace::force_capture();
            writeln!(buf, "{bt}")?;
        }
        Ok(())
    }
}

struct FormatterKv<'a> {
    buf: &'a mut Vec<u8>,
    styled: bool,
}

impl FormatterKv<'_> {
    fn push_key(&mut self, key: &slog::Key) -> io::Result<()> {
        if self.styled {
            write!(
                self.buf,
                " {}{key}{}=",
                STYLE_BOLD.render(),
                STYLE_BOLD.render_reset()
            )
        } else {
            write!(self.buf, " {key}=")
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

impl Serializer for FormatterKv<'_> {
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

    fn emit_none(&mut self, key: slog::Key) -> slog::Result {
        self.emit_str(key, "None")
    }

    fn emit_str(&mut self, key: slog::Key, value: &str) -> slog::Result {
        self.push_key(&key)?;
        self.buf.extend_from_slice(value.as_bytes());
        self.buf.push(b',');
        Ok(())
    }

    fn emit_arguments(&mut self, key: slog::Key, value: &Arguments) -> slog::Result {
        if let Some(s) = value.as_str() {
            self.emit_str(key, s)
        } else {
            self.push_key(&key)?;
            self.buf.write_fmt(*value)?;
            self.buf.push(b',');
            Ok(())
        }
    }
}
