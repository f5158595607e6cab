/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::fmt;

/// Coarse severity tier used for routing.
///
/// The six `slog` levels collapse into three tiers:
/// `Trace` and `Debug` are [`Level::Debug`], `Info` and `Warning` are
/// [`Level::Info`], `Error` and `Critical` are [`Level::Error`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Level {
    Debug = 0,
    Info = 1,
    Error = 2,
}

impl Level {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Error => "error",
        }
    }

    #[inline]
    pub const fn as_u8(&self) -> u8 {
        *self as u8
    }

    pub const fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Level::Debug),
            1 => Some(Level::Info),
            2 => Some(Level::Error),
            _ => None,
        }
    }

    /// The `slog` level used when emitting an event of this tier
    pub const fn as_slog(&self) -> slog::Level {
        match self {
            Level::Debug => slog::Level::Debug,
            Level::Info => slog::Level::Info,
            Level::Error => slog::Level::Error,
        }
    }
}

impl From<slog::Level> for Level {
    fn from(level: slog::Level) -> Self {
        match level {
            slog::Level::Trace | slog::Level::Debug => Level::Debug,
            slog::Level::Info | slog::Level::Warning => Level::Info,
            slog::Level::Error | slog::Level::Critical => Level::Error,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
