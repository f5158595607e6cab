/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::panic::{RefUnwindSafe, UnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use slog::{Drain, Never, OwnedKVList, Record};

use ctxlog_report::ReportEncoder;
use ctxlog_stdlog::{ConsoleSink, ConsoleStream, StdLogConfig};
use ctxlog_types::Level;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OperatingMode {
    #[default]
    Default,
    Verbose,
}

impl OperatingMode {
    #[inline]
    pub fn is_verbose(&self) -> bool {
        matches!(self, OperatingMode::Verbose)
    }

    pub(crate) fn console_config(&self) -> StdLogConfig {
        match self {
            OperatingMode::Default => StdLogConfig::terse(),
            OperatingMode::Verbose => StdLogConfig::verbose(),
        }
    }
}

impl From<bool> for OperatingMode {
    fn from(verbose: bool) -> Self {
        if verbose {
            OperatingMode::Verbose
        } else {
            OperatingMode::Default
        }
    }
}

/// Minimum console level that can be changed at runtime.
pub struct LevelSwitch(AtomicU8);

impl LevelSwitch {
    pub fn new(level: Level) -> Self {
        LevelSwitch(AtomicU8::new(level.as_u8()))
    }

    pub fn get(&self) -> Level {
        Level::from_u8(self.0.load(Ordering::Relaxed)).unwrap_or(Level::Info)
    }

    pub fn set(&self, level: Level) {
        self.0.store(level.as_u8(), Ordering::Relaxed);
    }
}

impl Default for LevelSwitch {
    fn default() -> Self {
        LevelSwitch::new(Level::Info)
    }
}

/// Destinations chosen for one record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Route {
    pub console: Option<ConsoleStream>,
    pub report: bool,
}

impl Route {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.console.is_none() && !self.report
    }
}

/// Picks the destinations of a record from its severity tier.
///
/// Error tier records always go to the error tracker, whatever the console
/// levels are. Debug tier records only reach the console in verbose mode.
pub struct SeverityRouter {
    mode: OperatingMode,
    static_level: Level,
    dynamic_level: LevelSwitch,
}

impl SeverityRouter {
    pub fn new(mode: OperatingMode, static_level: Level, initial_level: Level) -> Self {
        SeverityRouter {
            mode,
            static_level,
            dynamic_level: LevelSwitch::new(initial_level),
        }
    }

    #[inline]
    pub fn mode(&self) -> OperatingMode {
        self.mode
    }

    #[inline]
    pub fn level(&self) -> Level {
        self.dynamic_level.get()
    }

    #[inline]
    pub fn set_level(&self, level: Level) {
        self.dynamic_level.set(level);
    }

    pub fn route(&self, level: slog::Level) -> Route {
        let tier = Level::from(level);
        let (console, report) = match tier {
            Level::Error => (Some(ConsoleStream::Stderr), true),
            Level::Info => (Some(ConsoleStream::Stdout), false),
            Level::Debug if self.mode.is_verbose() => (Some(ConsoleStream::Stdout), false),
            Level::Debug => (None, false),
        };
        let console = console.filter(|_| tier >= self.static_level && tier >= self.level());
        Route { console, report }
    }
}

impl Default for SeverityRouter {
    fn default() -> Self {
        SeverityRouter::new(OperatingMode::Default, Level::Debug, Level::Info)
    }
}

/// The drain fanning records out to the console and the error tracker.
pub struct RouterDrain {
    router: Arc<SeverityRouter>,
    console: ConsoleSink,
    encoder: ReportEncoder,
}

// console writers and tracker state sit behind their own locks
impl RefUnwindSafe for RouterDrain {}
impl UnwindSafe for RouterDrain {}

impl RouterDrain {
    pub fn new(
        router: Arc<SeverityRouter>,
        console: ConsoleSink,
        encoder: ReportEncoder,
    ) -> Self {
        RouterDrain {
            router,
            console,
            encoder,
        }
    }
}

impl Drain for RouterDrain {
    type Ok = ();
    type Err = Never;

    fn log(&self, record: &Record, logger_values: &OwnedKVList) -> Result<(), Never> {
        let route = self.router.route(record.level());
        if let Some(stream) = route.console {
            // counted in the sink stats
            let _ = self.console.write(stream, record, logger_values);
        }
        if route.report {
            self.encoder.encode(record, logger_values);
        }
        Ok(())
    }

    #[inline]
    fn is_enabled(&self, level: slog::Level) -> bool {
        !self.router.route(level).is_empty()
    }
}
